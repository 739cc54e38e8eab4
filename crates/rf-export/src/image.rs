use std::path::Path;

use anyhow::{Context, Result};
use image::{ImageFormat, RgbImage};
use rf_core::frame::FrameBuffer;

/// Write `frame` as a PNG file. Output is always PNG regardless of the
/// extension of `path`.
///
/// # Errors
/// Returns an error if the buffer is inconsistent or the file cannot be written.
///
/// # Example
/// ```no_run
/// use rf_export::image::save_png;
/// use rf_core::frame::FrameBuffer;
/// use std::path::Path;
/// save_png(&FrameBuffer::new(320, 200), Path::new("out.png")).unwrap();
/// ```
pub fn save_png(frame: &FrameBuffer, path: &Path) -> Result<()> {
    let img = RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("Frame buffer size does not match its dimensions")?;
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Cannot write {}", path.display()))?;
    log::debug!("save_png: {}x{} -> {}", frame.width, frame.height, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::frame::Rgb;

    #[test]
    fn png_round_trip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nes.png");
        let frame = FrameBuffer::from_pixels(2, 1, &[Rgb::from_hex("#F83800"), Rgb::from_hex("#3CBCFC")]).unwrap();
        save_png(&frame, &path).unwrap();
        let back = image::open(&path).unwrap().to_rgb8();
        assert_eq!(back.into_raw(), frame.data);
    }
}
