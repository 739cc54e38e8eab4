use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rf_core::config::DitherMode;

/// What a conversion did, as recorded in the sidecar log.
#[derive(Clone, Debug)]
pub struct ConversionRecord<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub palette: &'a str,
    pub native_resolution: bool,
    pub dither_mode: DitherMode,
}

/// Sidecar path: the output path with `.log.txt` appended.
///
/// # Example
/// ```
/// use rf_export::debug_log::log_path_for;
/// use std::path::{Path, PathBuf};
/// assert_eq!(log_path_for(Path::new("out/cat_NES.png")), PathBuf::from("out/cat_NES.png.log.txt"));
/// ```
#[must_use]
pub fn log_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".log.txt");
    PathBuf::from(name)
}

/// Render the log text.
#[must_use]
pub fn render_debug_log(record: &ConversionRecord<'_>) -> String {
    let mut text = String::from("ModernMedia2Retro Conversion Log\n");
    let _ = writeln!(text, "Input: {}", record.input.display());
    let _ = writeln!(text, "Output: {}", record.output.display());
    let _ = writeln!(text, "Palette: {}", record.palette);
    let _ = writeln!(
        text,
        "Native Resolution Mode: {}",
        if record.native_resolution { "True" } else { "False" }
    );
    let _ = writeln!(text, "Dithering: {}", record.dither_mode);
    let _ = writeln!(text, "Created: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    text
}

/// Write the sidecar log next to `record.output` and return its path.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_debug_log(record: &ConversionRecord<'_>) -> Result<PathBuf> {
    let path = log_path_for(record.output);
    std::fs::write(&path, render_debug_log(record))
        .with_context(|| format!("Cannot write debug log {}", path.display()))?;
    log::info!("Debug log written to {}", path.display());
    Ok(path)
}
