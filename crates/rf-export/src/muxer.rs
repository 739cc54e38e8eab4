use anyhow::{Context, Result};
use rf_core::frame::FrameBuffer;
use rf_core::traits::FrameSink;
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// x264 settings for the video stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Constant rate factor, 0 = lossless.
    pub crf: u8,
    /// x264 preset name.
    pub preset: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            crf: 0,
            preset: "veryslow".to_string(),
        }
    }
}

/// Encodes raw rgb24 frames into an MP4 file through ffmpeg.
///
/// Uses `libx264rgb` so palette colors are not disturbed by YUV chroma
/// subsampling.
pub struct Mp4Muxer {
    ffmpeg_child: Child,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl Mp4Muxer {
    /// Start an encoder writing to `output_path`.
    ///
    /// `frame_rate` is passed to ffmpeg verbatim ("25", "30000/1001").
    ///
    /// # Errors
    /// Returns an error if ffmpeg is not installed or cannot be started.
    pub fn new(
        output_path: &Path,
        width: u32,
        height: u32,
        frame_rate: &str,
        settings: &EncoderSettings,
    ) -> Result<Self> {
        let child = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-vcodec",
                "rawvideo",
                "-s",
                &format!("{width}x{height}"),
                "-pix_fmt",
                "rgb24",
                "-r",
                frame_rate,
                "-i",
                "-",
                "-c:v",
                "libx264rgb",
                "-crf",
                &settings.crf.to_string(),
                "-preset",
                &settings.preset,
                "-pix_fmt",
                "rgb24",
                "-color_range",
                "pc",
                "-hide_banner",
                "-loglevel",
                "error",
            ])
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Cannot start the ffmpeg encoder. (Is it on PATH?)")?;

        log::info!(
            "ffmpeg encoder started: {width}x{height} @ {frame_rate}, crf {} ({}) -> {}",
            settings.crf,
            settings.preset,
            output_path.display()
        );

        Ok(Self {
            ffmpeg_child: child,
            width,
            height,
            frames_written: 0,
        })
    }

    /// Close the stream and wait for the encoder.
    ///
    /// # Errors
    /// Returns an error if ffmpeg reports a failure.
    pub fn finish(mut self) -> Result<u64> {
        drop(self.ffmpeg_child.stdin.take());

        let output = self.ffmpeg_child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg encoder error: {stderr}");
        }
        Ok(self.frames_written)
    }

    /// Kill the encoder without finalizing the file.
    pub fn abort(mut self) {
        let _ = self.ffmpeg_child.kill();
        let _ = self.ffmpeg_child.wait();
    }
}

impl FrameSink for Mp4Muxer {
    fn write_frame(&mut self, fb: &FrameBuffer) -> Result<()> {
        if fb.width != self.width || fb.height != self.height {
            anyhow::bail!(
                "Frame {}x{} does not match encoder size {}x{}",
                fb.width,
                fb.height,
                self.width,
                self.height
            );
        }
        let stdin = self
            .ffmpeg_child
            .stdin
            .as_mut()
            .context("ffmpeg encoder stdin already closed")?;
        stdin
            .write_all(&fb.data)
            .context("ffmpeg encoder closed its input")?;
        self.frames_written += 1;
        Ok(())
    }
}

/// How the source audio stream is carried into the MP4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCodec {
    /// Stream copy, bit-exact.
    Copy,
    /// Re-encode to AAC, for codecs the MP4 container cannot hold (PCM, Vorbis).
    Aac,
}

impl AudioCodec {
    fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Aac => "aac",
        }
    }
}

/// Combine the video stream of `video_path` with the audio of `audio_source`.
///
/// Audio is stream-copied first; if the container rejects the codec the mux
/// is retried with AAC. Sources without an audio stream produce a video-only
/// file.
///
/// # Errors
/// Returns an error if both attempts fail.
pub fn mux_audio_video(video_path: &Path, audio_source: &Path, final_path: &Path) -> Result<()> {
    mux_with_fallback(|codec| mux_once(video_path, audio_source, final_path, codec))
}

/// Run `attempt` with `AudioCodec::Copy`, then once more with `AudioCodec::Aac`
/// if the copy fails.
///
/// # Errors
/// Returns the AAC attempt's error, with the copy failure as context.
pub fn mux_with_fallback<F>(mut attempt: F) -> Result<()>
where
    F: FnMut(AudioCodec) -> Result<()>,
{
    let copy_err = match attempt(AudioCodec::Copy) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    log::warn!("Audio stream copy failed ({copy_err:#}); re-encoding audio to AAC.");
    attempt(AudioCodec::Aac)
        .with_context(|| format!("audio copy also failed: {copy_err:#}"))
}

fn mux_once(video_path: &Path, audio_source: &Path, final_path: &Path, codec: AudioCodec) -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .arg("-i")
        .arg(audio_source)
        .args([
            "-map",
            "0:v:0",
            "-map",
            "1:a?",
            "-c:v",
            "copy",
            "-c:a",
            codec.ffmpeg_name(),
            "-shortest",
            "-hide_banner",
            "-loglevel",
            "error",
        ])
        .arg(final_path)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .context("Cannot start ffmpeg for audio muxing")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Mux audio/video error ({}): {stderr}", codec.ffmpeg_name());
    }
    log::debug!("muxed audio ({}) into {}", codec.ffmpeg_name(), final_path.display());
    Ok(())
}
