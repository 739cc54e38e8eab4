use std::cell::RefCell;

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer as FirResizer};
use rf_core::error::CoreError;
use rf_core::frame::FrameBuffer;

/// Bilinear resizer wrapping fast_image_resize.
///
/// Keeps its scratch buffers between calls; `letterbox` holds one per
/// worker thread.
///
/// # Example
/// ```
/// use rf_retro::letterbox::Resizer;
/// let r = Resizer::new();
/// ```
pub struct Resizer {
    inner: FirResizer,
    options: ResizeOptions,
    /// Owned copy of the source; fast_image_resize wants `&mut` on it.
    src_buf: Vec<u8>,
}

impl Resizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FirResizer::new(),
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
            src_buf: Vec::new(),
        }
    }

    /// Resize `src` into `dst`. Dimensions of `dst` determine output size.
    ///
    /// # Errors
    /// Returns `Resize` if either buffer is rejected by the resampler.
    ///
    /// # Example
    /// ```
    /// use rf_retro::letterbox::Resizer;
    /// use rf_core::frame::FrameBuffer;
    /// let mut r = Resizer::new();
    /// let src = FrameBuffer::new(100, 100);
    /// let mut dst = FrameBuffer::new(50, 50);
    /// r.resize_into(&src, &mut dst).unwrap();
    /// ```
    pub fn resize_into(&mut self, src: &FrameBuffer, dst: &mut FrameBuffer) -> Result<(), CoreError> {
        if src.width == dst.width && src.height == dst.height {
            dst.data.copy_from_slice(&src.data);
            return Ok(());
        }

        self.src_buf.clear();
        self.src_buf.extend_from_slice(&src.data);

        let src_image = Image::from_slice_u8(src.width, src.height, &mut self.src_buf, PixelType::U8x3)
            .map_err(|e| CoreError::Resize(format!("source {}x{}: {e}", src.width, src.height)))?;
        let mut dst_image = Image::from_slice_u8(dst.width, dst.height, &mut dst.data, PixelType::U8x3)
            .map_err(|e| CoreError::Resize(format!("destination {}x{}: {e}", dst.width, dst.height)))?;

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .map_err(|e| CoreError::Resize(e.to_string()))
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static RESIZER: RefCell<Resizer> = RefCell::new(Resizer::new());
}

/// Size of the scaled image inside a `target_w`×`target_h` frame.
///
/// A wider source fits the width, anything else fits the height. The other
/// side is truncated toward zero and never drops below 1.
///
/// # Example
/// ```
/// use rf_retro::letterbox::fit_dimensions;
/// assert_eq!(fit_dimensions(640, 480, 320, 224), (298, 224));
/// assert_eq!(fit_dimensions(1920, 1080, 320, 200), (320, 180));
/// ```
#[must_use]
pub fn fit_dimensions(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    let (sw, sh) = (u64::from(src_w), u64::from(src_h));
    let (tw, th) = (u64::from(target_w), u64::from(target_h));
    // src_w / src_h > target_w / target_h, cross-multiplied.
    let (w, h) = if sw * th > tw * sh {
        (tw, tw * sh / sw)
    } else {
        (th * sw / sh, th)
    };
    (w.clamp(1, tw) as u32, h.clamp(1, th) as u32)
}

/// Scale `frame` to fit inside `target_w`×`target_h` keeping its aspect
/// ratio, centered on black. The output is always exactly the target size.
///
/// # Errors
/// Returns `InvalidDimensions` for an empty source or target, `Resize` if
/// resampling fails.
///
/// # Example
/// ```
/// use rf_retro::letterbox::letterbox;
/// use rf_core::frame::FrameBuffer;
/// let out = letterbox(&FrameBuffer::new(640, 480), 320, 224).unwrap();
/// assert_eq!((out.width, out.height), (320, 224));
/// ```
pub fn letterbox(frame: &FrameBuffer, target_w: u32, target_h: u32) -> Result<FrameBuffer, CoreError> {
    if frame.is_empty() {
        return Err(CoreError::InvalidDimensions {
            width: frame.width,
            height: frame.height,
        });
    }
    if target_w == 0 || target_h == 0 {
        return Err(CoreError::InvalidDimensions {
            width: target_w,
            height: target_h,
        });
    }

    let (new_w, new_h) = fit_dimensions(frame.width, frame.height, target_w, target_h);
    let mut scaled = FrameBuffer::new(new_w, new_h);
    RESIZER.with_borrow_mut(|resizer| resizer.resize_into(frame, &mut scaled))?;

    let mut canvas = FrameBuffer::new(target_w, target_h);
    let (off_x, off_y) = ((target_w - new_w) / 2, (target_h - new_h) / 2);
    canvas.blit(&scaled, off_x, off_y);
    log::trace!(
        "letterbox {}x{} -> {new_w}x{new_h} at ({off_x},{off_y}) in {target_w}x{target_h}",
        frame.width,
        frame.height
    );
    Ok(canvas)
}
