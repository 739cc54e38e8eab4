use anyhow::Result;

use crate::frame::FrameBuffer;

/// Supplies decoded frames in presentation order.
///
/// Implemented by `VideoReader` (ffmpeg pipe) and by in-memory sources in tests.
///
/// # Example
/// ```
/// use rf_core::traits::FrameSource;
/// use rf_core::frame::FrameBuffer;
///
/// struct Empty;
/// impl FrameSource for Empty {
///     fn next_frame(&mut self) -> anyhow::Result<Option<FrameBuffer>> { Ok(None) }
///     fn frame_count_hint(&self) -> Option<u64> { Some(0) }
/// }
/// ```
pub trait FrameSource: Send {
    /// Next frame, or `None` once the stream is exhausted.
    ///
    /// # Errors
    /// Returns an error if decoding fails mid-stream.
    fn next_frame(&mut self) -> Result<Option<FrameBuffer>>;

    /// Expected number of frames, used for progress reporting.
    fn frame_count_hint(&self) -> Option<u64>;
}

/// Consumes transformed frames in presentation order.
///
/// # Example
/// ```
/// use rf_core::traits::FrameSink;
/// use rf_core::frame::FrameBuffer;
///
/// struct Discard;
/// impl FrameSink for Discard {
///     fn write_frame(&mut self, _frame: &FrameBuffer) -> anyhow::Result<()> { Ok(()) }
/// }
/// ```
pub trait FrameSink {
    /// Append one frame.
    ///
    /// # Errors
    /// Returns an error if the frame cannot be written.
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()>;
}
