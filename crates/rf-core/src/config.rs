use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Dithering applied before quantization.
///
/// # Example
/// ```
/// use rf_core::config::DitherMode;
/// let mode: DitherMode = "bayer".parse().unwrap();
/// assert_eq!(mode, DitherMode::Bayer8x8);
/// assert_eq!(mode.to_string(), "Bayer Ordered (8×8)");
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub enum DitherMode {
    /// Straight nearest-color mapping.
    #[default]
    None,
    /// Bayer 8×8 ordered threshold, explicit palettes only.
    #[serde(alias = "Bayer", alias = "OrderedBayer8x8")]
    Bayer8x8,
}

impl fmt::Display for DitherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bayer8x8 => f.write_str("Bayer Ordered (8×8)"),
        }
    }
}

impl FromStr for DitherMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "bayer" | "bayer8x8" | "bayer8" | "ordered" => Ok(Self::Bayer8x8),
            other => Err(format!("unknown dither mode '{other}' (expected none or bayer8x8)")),
        }
    }
}

/// Per-frame transform settings. Fixed for the duration of a job.
///
/// # Example
/// ```
/// use rf_core::config::PipelineConfig;
/// let config = PipelineConfig::default();
/// assert_eq!(config.palette, "CGA Mode #1");
/// assert!(!config.letterbox);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Palette name or slug.
    pub palette: String,
    pub dither_mode: DitherMode,
    /// Letterbox into the palette's native resolution first.
    pub letterbox: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            palette: "CGA Mode #1".to_string(),
            dither_mode: DitherMode::None,
            letterbox: false,
        }
    }
}

/// Complete settings of one conversion job.
///
/// Loaded from TOML, then overridden by command-line flags.
///
/// # Example
/// ```
/// use rf_core::config::ConvertConfig;
/// let config = ConvertConfig::default();
/// assert_eq!(config.frames_in_flight, 16);
/// assert_eq!(config.crf, 0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertConfig {
    pub pipeline: PipelineConfig,
    /// Write a plain-text sidecar next to image outputs.
    pub debug_log: bool,
    /// Output folder. `None` writes next to the input.
    pub output_dir: Option<PathBuf>,
    /// Video frames decoded and transformed per parallel batch [1, 256].
    pub frames_in_flight: usize,
    /// x264 constant rate factor [0, 51]. 0 = lossless.
    pub crf: u8,
    /// x264 preset name.
    pub preset: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            debug_log: false,
            output_dir: None,
            frames_in_flight: 16,
            crf: 0,
            preset: "veryslow".to_string(),
        }
    }
}

const X264_PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

impl ConvertConfig {
    /// Clamp numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.frames_in_flight = self.frames_in_flight.clamp(1, 256);
        self.crf = self.crf.min(51);
        if !X264_PRESETS.contains(&self.preset.as_str()) {
            log::warn!("Unknown x264 preset '{}', using veryslow.", self.preset);
            self.preset = "veryslow".to_string();
        }
    }
}

/// Intermediate TOML structure, every field optional for partial override.
#[derive(Deserialize)]
struct ConfigFile {
    pipeline: Option<PipelineSection>,
    output: Option<OutputSection>,
    video: Option<VideoSection>,
}

#[derive(Deserialize)]
struct PipelineSection {
    palette: Option<String>,
    dither: Option<DitherMode>,
    native_resolution: Option<bool>,
}

#[derive(Deserialize)]
struct OutputSection {
    directory: Option<PathBuf>,
    debug_log: Option<bool>,
}

#[derive(Deserialize)]
struct VideoSection {
    frames_in_flight: Option<usize>,
    crf: Option<u8>,
    preset: Option<String>,
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML for this schema.
///
/// # Example
/// ```
/// use rf_core::config::{parse_config, DitherMode};
/// let config = parse_config("[pipeline]\npalette = \"NES\"\ndither = \"Bayer8x8\"\n").unwrap();
/// assert_eq!(config.pipeline.palette, "NES");
/// assert_eq!(config.pipeline.dither_mode, DitherMode::Bayer8x8);
/// ```
pub fn parse_config(content: &str) -> Result<ConvertConfig> {
    let file: ConfigFile = toml::from_str(content).context("TOML parse error")?;
    let mut config = ConvertConfig::default();

    if let Some(p) = file.pipeline {
        if let Some(v) = p.palette {
            config.pipeline.palette = v;
        }
        if let Some(v) = p.dither {
            config.pipeline.dither_mode = v;
        }
        if let Some(v) = p.native_resolution {
            config.pipeline.letterbox = v;
        }
    }
    if let Some(o) = file.output {
        if o.directory.is_some() {
            config.output_dir = o.directory;
        }
        if let Some(v) = o.debug_log {
            config.debug_log = v;
        }
    }
    if let Some(v) = file.video {
        if let Some(n) = v.frames_in_flight {
            config.frames_in_flight = n;
        }
        if let Some(n) = v.crf {
            config.crf = n;
        }
        if let Some(s) = v.preset {
            config.preset = s;
        }
    }

    config.clamp_all();
    Ok(config)
}

/// Load a TOML file and merge it with the defaults.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use rf_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("retroframe.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<ConvertConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config in {}", path.display()))
}
