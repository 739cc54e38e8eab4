use thiserror::Error;

/// Errors originating from the transform core and its validation steps.
///
/// None of these are transient: each one describes a configuration the
/// caller has to fix before the job can run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Requested palette name or slug is not registered.
    #[error("Unknown palette: {name}")]
    UnknownPalette {
        /// Name as requested by the caller.
        name: String,
    },

    /// Palette definition cannot be used for quantization.
    #[error("Invalid palette {name}: {reason}")]
    InvalidPalette {
        /// Palette name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Input file extension is neither a known image nor a known video type.
    #[error("Unsupported media type: {path} (use PNG/JPEG/BMP or MP4/MOV/AVI/MKV)")]
    UnsupportedMediaType {
        /// Offending input path.
        path: String,
    },

    /// Option combination rejected before any processing starts.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Invalid width/height dimensions.
    #[error("Invalid dimensions: {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// The resampler rejected the source or destination buffer.
    #[error("Resize failed: {0}")]
    Resize(String),
}
