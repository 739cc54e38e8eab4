use std::path::Path;

use crate::error::CoreError;

/// Extensions handled as still images.
pub const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Extensions handled as video.
pub const VIDEO_EXTS: &[&str] = &["mp4", "mov", "avi", "mkv"];

/// Kind of input media, decided from the file extension.
///
/// # Example
/// ```
/// use rf_core::media::MediaKind;
/// use std::path::Path;
/// assert_eq!(MediaKind::from_path(Path::new("clip.MKV")).unwrap(), MediaKind::Video);
/// assert!(MediaKind::from_path(Path::new("notes.txt")).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify `path` by its extension (case-insensitive).
    ///
    /// # Errors
    /// Returns `UnsupportedMediaType` for unknown or missing extensions.
    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if IMAGE_EXTS.contains(&ext.as_str()) {
            Ok(Self::Image)
        } else if VIDEO_EXTS.contains(&ext.as_str()) {
            Ok(Self::Video)
        } else {
            Err(CoreError::UnsupportedMediaType {
                path: path.display().to_string(),
            })
        }
    }

    /// Extension of the converted file.
    #[must_use]
    pub fn output_extension(self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Video => "mp4",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions() {
        for name in ["a.png", "a.JPG", "a.jpeg", "a.bmp"] {
            assert_eq!(MediaKind::from_path(Path::new(name)), Ok(MediaKind::Image));
        }
        for name in ["a.mp4", "a.mov", "a.Avi", "a.mkv"] {
            assert_eq!(MediaKind::from_path(Path::new(name)), Ok(MediaKind::Video));
        }
    }

    #[test]
    fn rejects_unknown_and_missing_extensions() {
        for name in ["a.gif", "a.webm", "noext"] {
            assert!(matches!(
                MediaKind::from_path(Path::new(name)),
                Err(CoreError::UnsupportedMediaType { .. })
            ));
        }
    }
}
