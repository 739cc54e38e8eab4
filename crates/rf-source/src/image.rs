use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use rf_core::frame::FrameBuffer;

/// Decode an image file into an RGB frame. Alpha, if any, is dropped.
///
/// # Errors
/// Returns an error if the file cannot be read or decoded.
///
/// # Example
/// ```no_run
/// use rf_source::image::load_image;
/// use std::path::Path;
/// let frame = load_image(Path::new("photo.png")).unwrap();
/// ```
pub fn load_image(path: &Path) -> Result<FrameBuffer> {
    let img = image::open(path).with_context(|| format!("Cannot load image {}", path.display()))?;
    let rgb = img.to_rgb8();
    log::debug!("load_image: {}x{} from {}", rgb.width(), rgb.height(), path.display());
    Ok(frame_from_rgb(rgb))
}

/// Take ownership of an `image` RGB buffer without copying.
///
/// # Example
/// ```
/// use rf_source::image::frame_from_rgb;
/// let frame = frame_from_rgb(image::RgbImage::new(4, 2));
/// assert_eq!(frame.data.len(), 24);
/// ```
#[must_use]
pub fn frame_from_rgb(img: RgbImage) -> FrameBuffer {
    let (width, height) = img.dimensions();
    FrameBuffer {
        data: img.into_raw(),
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use rf_core::frame::Rgb;

    #[test]
    fn load_image_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgba.png");
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(2, 1, Rgba([10, 20, 30, 0]));
        img.save(&path).unwrap();

        let frame = load_image(&path).unwrap();
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(frame.pixel(2, 1), Rgb::new(10, 20, 30));
    }

    #[test]
    fn load_image_reports_missing_file() {
        let err = load_image(Path::new("/nonexistent/photo.png")).unwrap_err();
        assert!(format!("{err:#}").contains("photo.png"));
    }
}
