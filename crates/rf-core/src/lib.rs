//! Palettes, frames, configuration and shared types for retroframe.
//!
//! This crate holds everything the transform core and the media adapters
//! agree on: the pixel buffer, the immutable palette catalog, the job
//! configuration and the error taxonomy.

pub mod config;
pub mod error;
pub mod frame;
pub mod media;
pub mod palette;
pub mod traits;

pub use config::{ConvertConfig, DitherMode, PipelineConfig};
pub use error::CoreError;
pub use frame::{FrameBuffer, Rgb};
pub use media::MediaKind;
pub use palette::{Palette, PaletteCatalog, PaletteKind};
