use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use rf_core::config::{ConvertConfig, load_config};

pub mod cli;
pub mod job;
pub mod palettes;

use job::{ConversionJob, JobEvent};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    if cli.list_palettes {
        print!("{}", palettes::render_palette_list(rf_core::PaletteCatalog::global()));
        return Ok(());
    }

    let input = cli
        .input
        .as_deref()
        .context("No input file given")?;

    let mut config = resolve_config(&cli)?;
    cli.apply_overrides(&mut config);
    log::info!(
        "Palette {} | dithering {} | native resolution {}",
        config.pipeline.palette,
        config.pipeline.dither_mode,
        config.pipeline.letterbox
    );

    let job = ConversionJob::prepare(input, config)?;
    log::info!("{:?} job: {} -> {}", job.kind(), input.display(), job.output().display());

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            log::warn!("Interrupt received, stopping after the current batch.");
            stop.store(true, Ordering::Relaxed);
        })
        .context("Cannot install the Ctrl-C handler")?;
    }

    let (handle, events) = job::spawn_job(job, stop)?;
    let outcome = report_progress(&events);
    if handle.join().is_err() {
        anyhow::bail!("Conversion thread panicked");
    }
    outcome
}

/// Print progress until the job reports its final event.
fn report_progress(events: &flume::Receiver<JobEvent>) -> Result<()> {
    for event in events.iter() {
        match event {
            JobEvent::Progress(fraction) => {
                eprint!("\r{:5.1}%", f64::from(fraction) * 100.0);
            }
            JobEvent::Finished(path) => {
                eprintln!();
                println!("File completed and saved as: {}", path.display());
                return Ok(());
            }
            JobEvent::Failed(reason) => {
                eprintln!();
                anyhow::bail!("Conversion failed: {reason}");
            }
        }
    }
    anyhow::bail!("Conversion thread exited without a result")
}

/// Explicit `--config` must exist; the default file is optional.
fn resolve_config(cli: &cli::Cli) -> Result<ConvertConfig> {
    if let Some(ref path) = cli.config {
        return load_config(path);
    }
    let default = Path::new(cli::DEFAULT_CONFIG);
    if default.exists() {
        load_config(default)
    } else {
        log::debug!("No {} found, using defaults.", cli::DEFAULT_CONFIG);
        Ok(ConvertConfig::default())
    }
}
