//! Conversion jobs: validation, the image and video paths, and the
//! background worker that reports progress over a channel.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Context, Result};
use flume::{Receiver, Sender};
use rf_core::config::ConvertConfig;
use rf_core::error::CoreError;
use rf_core::media::MediaKind;
use rf_core::palette::Palette;
use rf_core::traits::{FrameSink, FrameSource};
use rf_export::debug_log::{ConversionRecord, write_debug_log};
use rf_export::muxer::{EncoderSettings, Mp4Muxer, mux_audio_video};
use rf_retro::FrameTransformPipeline;
use rf_source::video::{VideoReader, probe_video};

/// Discrete updates from the job thread to the presenter.
#[derive(Clone, Debug, PartialEq)]
pub enum JobEvent {
    /// Fraction complete, always in [0, 1].
    Progress(f32),
    /// Job succeeded; path of the final output.
    Finished(PathBuf),
    /// Job failed or was cancelled; human-readable reason.
    Failed(String),
}

/// `done / total`, clamped to [0, 1]. An unknown total counts as 1.
///
/// # Example
/// ```ignore
/// assert_eq!(progress_fraction(3, 2), 1.0);
/// ```
#[must_use]
pub fn progress_fraction(done: u64, total: u64) -> f32 {
    (done as f64 / total.max(1) as f64).clamp(0.0, 1.0) as f32
}

/// `<dir>/<stem>_<palette tag>.<png|mp4>`.
#[must_use]
pub fn output_path(input: &Path, out_dir: &Path, palette: &Palette, kind: MediaKind) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "output".into(), |s| s.to_string_lossy());
    out_dir.join(format!(
        "{stem}_{}.{}",
        palette.file_tag(),
        kind.output_extension()
    ))
}

/// A validated conversion, ready to run.
pub struct ConversionJob {
    input: PathBuf,
    output: PathBuf,
    kind: MediaKind,
    config: ConvertConfig,
    pipeline: FrameTransformPipeline,
}

impl ConversionJob {
    /// Check everything that can be checked before touching a frame.
    ///
    /// # Errors
    /// Fails on a missing input or output folder, `UnsupportedMediaType`,
    /// `InvalidConfiguration` (debug log with video), `UnknownPalette`
    /// or `InvalidPalette`.
    pub fn prepare(input: &Path, config: ConvertConfig) -> Result<Self> {
        if !input.is_file() {
            anyhow::bail!("Input is not a file: {}", input.display());
        }
        let kind = MediaKind::from_path(input)?;
        if kind == MediaKind::Video && config.debug_log {
            return Err(CoreError::InvalidConfiguration(
                "the debug log option is for images only; disable it for video".into(),
            )
            .into());
        }
        let pipeline = FrameTransformPipeline::new(&config.pipeline)?;

        let out_dir = match config.output_dir {
            Some(ref dir) => dir.clone(),
            None => input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        let out_dir = if out_dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            out_dir
        };
        if !out_dir.is_dir() {
            anyhow::bail!("Output folder does not exist: {}", out_dir.display());
        }

        let output = output_path(input, &out_dir, pipeline.palette(), kind);
        Ok(Self {
            input: input.to_path_buf(),
            output,
            kind,
            config,
            pipeline,
        })
    }

    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Run to completion on the current thread.
    ///
    /// # Errors
    /// Returns any decode, transform or encode failure, or cancellation.
    pub fn run(&self, events: &Sender<JobEvent>, stop: &AtomicBool) -> Result<PathBuf> {
        match self.kind {
            MediaKind::Image => self.run_image(events),
            MediaKind::Video => self.run_video(events, stop),
        }
    }

    fn run_image(&self, events: &Sender<JobEvent>) -> Result<PathBuf> {
        let frame = rf_source::image::load_image(&self.input)?;
        let out = self.pipeline.apply(&frame)?;
        rf_export::image::save_png(&out, &self.output)?;

        if self.config.debug_log {
            write_debug_log(&ConversionRecord {
                input: &self.input,
                output: &self.output,
                palette: self.pipeline.palette().name,
                native_resolution: self.config.pipeline.letterbox,
                dither_mode: self.config.pipeline.dither_mode,
            })?;
        }
        let _ = events.send(JobEvent::Progress(1.0));
        Ok(self.output.clone())
    }

    fn run_video(&self, events: &Sender<JobEvent>, stop: &AtomicBool) -> Result<PathBuf> {
        let info = probe_video(&self.input)?;
        let (width, height) = if self.config.pipeline.letterbox {
            self.pipeline.palette().native
        } else {
            (info.width, info.height)
        };
        let temp = self.output.with_extension("temp.mp4");
        let settings = EncoderSettings {
            crf: self.config.crf,
            preset: self.config.preset.clone(),
        };

        let result = (|| -> Result<()> {
            let mut source = VideoReader::open(&self.input, info.clone())?;
            let mut muxer = Mp4Muxer::new(&temp, width, height, &info.frame_rate, &settings)?;
            let transcoded = transcode_frames(
                &self.pipeline,
                &mut source,
                &mut muxer,
                self.config.frames_in_flight,
                stop,
                |done, total| {
                    let _ = events.send(JobEvent::Progress(progress_fraction(done, total)));
                },
            );
            if let Err(e) = transcoded {
                muxer.abort();
                return Err(e);
            }
            let frames = muxer.finish()?;
            log::info!("Encoded {frames} frames into {}", temp.display());

            if info.has_audio {
                mux_audio_video(&temp, &self.input, &self.output)?;
                std::fs::remove_file(&temp)
                    .with_context(|| format!("Cannot remove {}", temp.display()))?;
            } else {
                log::warn!("No audio stream in {}; output is video only.", self.input.display());
                std::fs::rename(&temp, &self.output)
                    .with_context(|| format!("Cannot move {} into place", temp.display()))?;
            }
            Ok(())
        })();

        if let Err(e) = result {
            // A failed job leaves no output behind.
            let _ = std::fs::remove_file(&temp);
            let _ = std::fs::remove_file(&self.output);
            return Err(e);
        }
        Ok(self.output.clone())
    }
}

/// Pull frames from `source` in batches of `batch_size`, transform each
/// batch in parallel and write the results to `sink` in source order.
///
/// `on_progress(written, total)` runs after every written frame. `stop` is
/// checked between batches.
///
/// # Errors
/// Returns source, transform or sink failures, or an error if `stop` was set.
pub fn transcode_frames<S, K, F>(
    pipeline: &FrameTransformPipeline,
    source: &mut S,
    sink: &mut K,
    batch_size: usize,
    stop: &AtomicBool,
    mut on_progress: F,
) -> Result<u64>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
    F: FnMut(u64, u64),
{
    let batch_size = batch_size.max(1);
    let total = source.frame_count_hint().unwrap_or(0);
    let mut written = 0u64;
    let mut batch = Vec::with_capacity(batch_size);

    loop {
        if stop.load(Ordering::Relaxed) {
            anyhow::bail!("Conversion cancelled after {written} frames");
        }

        batch.clear();
        while batch.len() < batch_size {
            match source.next_frame()? {
                Some(frame) => batch.push(frame),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }
        let exhausted = batch.len() < batch_size;

        let transformed = pipeline
            .apply_batch(&batch)
            .with_context(|| format!("Transform failed near frame {written}"))?;
        for frame in &transformed {
            sink.write_frame(frame)?;
            written += 1;
            on_progress(written, total);
        }
        log::debug!("batch of {} frames written ({written}/{total})", transformed.len());

        if exhausted {
            break;
        }
    }
    Ok(written)
}

/// Run `job` on a dedicated background thread.
///
/// The returned receiver yields `Progress` events followed by exactly one
/// `Finished` or `Failed`.
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
pub fn spawn_job(
    job: ConversionJob,
    stop: Arc<AtomicBool>,
) -> Result<(thread::JoinHandle<()>, Receiver<JobEvent>)> {
    let (tx, rx) = flume::unbounded();
    let handle = thread::Builder::new()
        .name("rf-job".to_string())
        .spawn(move || {
            let event = match job.run(&tx, &stop) {
                Ok(path) => JobEvent::Finished(path),
                Err(e) => {
                    log::error!("Job failed: {e:#}");
                    JobEvent::Failed(format!("{e:#}"))
                }
            };
            let _ = tx.send(event);
        })
        .context("Cannot spawn the job thread")?;
    Ok((handle, rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::config::{DitherMode, PipelineConfig};
    use rf_core::frame::{FrameBuffer, Rgb};
    use std::collections::VecDeque;

    struct VecSource {
        frames: VecDeque<FrameBuffer>,
        hint: u64,
    }

    impl FrameSource for VecSource {
        fn next_frame(&mut self) -> Result<Option<FrameBuffer>> {
            Ok(self.frames.pop_front())
        }

        fn frame_count_hint(&self) -> Option<u64> {
            Some(self.hint)
        }
    }

    #[derive(Default)]
    struct VecSink {
        frames: Vec<FrameBuffer>,
    }

    impl FrameSink for VecSink {
        fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }
    }

    /// Frame `i` is a solid gray of value `i * 9`, distinct per index.
    fn numbered_frames(count: u8) -> VecDeque<FrameBuffer> {
        (0..count)
            .map(|i| {
                let v = i * 9;
                FrameBuffer::from_pixels(6, 4, &[Rgb::new(v, v, v); 24]).unwrap()
            })
            .collect()
    }

    fn sms_pipeline() -> FrameTransformPipeline {
        FrameTransformPipeline::new(&PipelineConfig {
            palette: "Sega Master System".into(),
            ..Default::default()
        })
        .unwrap()
    }

    fn config(palette: &str) -> ConvertConfig {
        ConvertConfig {
            pipeline: PipelineConfig {
                palette: palette.into(),
                dither_mode: DitherMode::None,
                letterbox: false,
            },
            ..Default::default()
        }
    }

    #[test]
    fn transcode_keeps_presentation_order() {
        let pipeline = sms_pipeline();
        let frames = numbered_frames(23);
        let expected: Vec<FrameBuffer> = frames.iter().map(|f| pipeline.apply(f).unwrap()).collect();

        for batch_size in [1, 4, 23, 64] {
            let mut source = VecSource {
                frames: frames.clone(),
                hint: 23,
            };
            let mut sink = VecSink::default();
            let stop = AtomicBool::new(false);
            let n = transcode_frames(&pipeline, &mut source, &mut sink, batch_size, &stop, |_, _| {})
                .unwrap();
            assert_eq!(n, 23);
            assert_eq!(sink.frames, expected, "batch size {batch_size}");
        }
    }

    #[test]
    fn progress_is_monotonic_and_clamped() {
        let pipeline = sms_pipeline();
        // Header under-reports the frame count.
        let mut source = VecSource {
            frames: numbered_frames(10),
            hint: 8,
        };
        let mut sink = VecSink::default();
        let stop = AtomicBool::new(false);
        let mut seen = Vec::new();
        transcode_frames(&pipeline, &mut source, &mut sink, 3, &stop, |done, total| {
            seen.push(progress_fraction(done, total));
        })
        .unwrap();
        assert_eq!(seen.len(), 10);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen.iter().all(|f| (0.0..=1.0).contains(f)));
        assert!((seen[9] - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn stop_flag_cancels_before_next_batch() {
        let pipeline = sms_pipeline();
        let mut source = VecSource {
            frames: numbered_frames(10),
            hint: 10,
        };
        let mut sink = VecSink::default();
        let stop = AtomicBool::new(false);
        let err = transcode_frames(&pipeline, &mut source, &mut sink, 4, &stop, |done, _| {
            if done == 4 {
                stop.store(true, Ordering::Relaxed);
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        assert_eq!(sink.frames.len(), 4);
    }

    #[test]
    fn output_name_uses_palette_tag() {
        let palette = rf_core::palette::PaletteCatalog::global().lookup("c64").unwrap();
        let path = output_path(Path::new("/in/holiday.jpeg"), Path::new("/out"), palette, MediaKind::Image);
        assert_eq!(path, PathBuf::from("/out/holiday_Commodore_64.png"));
        let path = output_path(Path::new("clip.mkv"), Path::new("."), palette, MediaKind::Video);
        assert_eq!(path, PathBuf::from("./clip_Commodore_64.mp4"));
    }

    #[test]
    fn debug_log_with_video_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"not really a video").unwrap();
        let mut cfg = config("NES");
        cfg.debug_log = true;

        let err = ConversionJob::prepare(&input, cfg).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn unsupported_and_unknown_inputs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, b"hello").unwrap();
        let err = ConversionJob::prepare(&notes, config("NES")).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::UnsupportedMediaType { .. })
        ));

        let photo = dir.path().join("photo.png");
        std::fs::write(&photo, b"png").unwrap();
        let err = ConversionJob::prepare(&photo, config("Virtual Boy")).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::UnknownPalette { .. })
        ));

        assert!(ConversionJob::prepare(&dir.path().join("missing.png"), config("NES")).is_err());
    }

    #[test]
    fn image_job_writes_png_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        let pixels: Vec<Rgb> = (0..64u32)
            .map(|i| Rgb::new((i * 4) as u8, (255 - i * 3) as u8, (i * 11 % 256) as u8))
            .collect();
        let frame = FrameBuffer::from_pixels(8, 8, &pixels).unwrap();
        rf_export::image::save_png(&frame, &input).unwrap();

        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        let mut cfg = config("CGA Mode #1");
        cfg.debug_log = true;
        cfg.output_dir = Some(out_dir.clone());
        cfg.pipeline.dither_mode = DitherMode::Bayer8x8;

        let job = ConversionJob::prepare(&input, cfg).unwrap();
        let (handle, events) = spawn_job(job, Arc::new(AtomicBool::new(false))).unwrap();
        let events: Vec<JobEvent> = events.iter().collect();
        handle.join().unwrap();

        let expected = out_dir.join("photo_CGA_Mode_#1.png");
        assert_eq!(events.last(), Some(&JobEvent::Finished(expected.clone())));

        let out = rf_source::image::load_image(&expected).unwrap();
        assert_eq!((out.width, out.height), (8, 8));
        let cga = [
            Rgb::new(255, 0, 255),
            Rgb::new(0, 255, 255),
            Rgb::new(255, 255, 255),
            Rgb::BLACK,
        ];
        assert!(out.pixels().all(|p| cga.contains(&p)));

        let log = std::fs::read_to_string(out_dir.join("photo_CGA_Mode_#1.png.log.txt")).unwrap();
        assert!(log.contains("Palette: CGA Mode #1"));
        assert!(log.contains("Dithering: Bayer Ordered (8×8)"));
    }

    #[test]
    fn image_job_letterboxes_to_native() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("wide.png");
        rf_export::image::save_png(&FrameBuffer::new(64, 16), &input).unwrap();

        let mut cfg = config("nes");
        cfg.pipeline.letterbox = true;
        let job = ConversionJob::prepare(&input, cfg).unwrap();
        let (tx, _rx) = flume::unbounded();
        let path = job.run(&tx, &AtomicBool::new(false)).unwrap();
        let out = rf_source::image::load_image(&path).unwrap();
        assert_eq!((out.width, out.height), (256, 224));
    }
}
