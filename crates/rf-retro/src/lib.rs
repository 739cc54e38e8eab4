//! Pixel transform core: palette quantization, ordered dithering and
//! letterbox scaling, chained by `FrameTransformPipeline`.

pub mod dither;
pub mod letterbox;
pub mod pipeline;
pub mod quantize;

pub use pipeline::{FrameTransformPipeline, transform_frame};
