use std::path::PathBuf;

use clap::Parser;
use rf_core::config::{ConvertConfig, DitherMode};

/// Default config file, read only if present.
pub const DEFAULT_CONFIG: &str = "retroframe.toml";

/// retroframe: convert images and video to retro console palettes.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Input file: image (PNG, JPEG, BMP) or video (MP4, MOV, AVI, MKV).
    #[arg(required_unless_present = "list_palettes")]
    pub input: Option<PathBuf>,

    /// Target palette, by name ("CGA Mode #1") or slug (cga1, nes, genesis, ...).
    #[arg(short, long)]
    pub palette: Option<String>,

    /// Dithering: none or bayer8x8.
    #[arg(short, long)]
    pub dither: Option<DitherMode>,

    /// Letterbox into the palette's native resolution.
    #[arg(long, default_value_t = false)]
    pub native: bool,

    /// Write a `.log.txt` sidecar next to the output (images only).
    #[arg(long, default_value_t = false)]
    pub debug_log: bool,

    /// Output folder. Defaults to the input's folder.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// TOML configuration file. Default: retroframe.toml if it exists.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Video frames transformed per parallel batch.
    #[arg(long)]
    pub frames_in_flight: Option<usize>,

    /// x264 constant rate factor for video output (0 = lossless).
    #[arg(long)]
    pub crf: Option<u8>,

    /// Print every palette and exit.
    #[arg(long, default_value_t = false)]
    pub list_palettes: bool,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Apply command-line flags on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut ConvertConfig) {
        if let Some(ref palette) = self.palette {
            config.pipeline.palette.clone_from(palette);
        }
        if let Some(mode) = self.dither {
            config.pipeline.dither_mode = mode;
        }
        if self.native {
            config.pipeline.letterbox = true;
        }
        if self.debug_log {
            config.debug_log = true;
        }
        if self.output_dir.is_some() {
            config.output_dir.clone_from(&self.output_dir);
        }
        if let Some(n) = self.frames_in_flight {
            config.frames_in_flight = n;
        }
        if let Some(crf) = self.crf {
            config.crf = crf;
        }
        config.clamp_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "retroframe",
            "clip.mp4",
            "--palette",
            "genesis",
            "--dither",
            "bayer8x8",
            "--native",
            "--frames-in-flight",
            "999",
        ]);
        let mut config = ConvertConfig {
            crf: 18,
            ..Default::default()
        };
        cli.apply_overrides(&mut config);
        assert_eq!(config.pipeline.palette, "genesis");
        assert_eq!(config.pipeline.dither_mode, DitherMode::Bayer8x8);
        assert!(config.pipeline.letterbox);
        assert_eq!(config.frames_in_flight, 256);
        assert_eq!(config.crf, 18);
    }

    #[test]
    fn input_is_optional_only_for_listing() {
        assert!(Cli::try_parse_from(["retroframe"]).is_err());
        assert!(Cli::try_parse_from(["retroframe", "--list-palettes"]).is_ok());
        assert!(Cli::try_parse_from(["retroframe", "a.png", "--dither", "fs"]).is_err());
    }
}
