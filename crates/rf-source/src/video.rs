// Video decoding goes through `ffmpeg`/`ffprobe` subprocesses; both must be on PATH.
//
//   - `probe_video`  : ffprobe JSON -> size, frame rate, frame count, audio presence
//   - `VideoReader`  : ffmpeg -> raw rgb24 frames on stdout, one `FrameBuffer` each

use anyhow::{Context, Result};
use rf_core::frame::FrameBuffer;
use rf_core::traits::FrameSource;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

/// Metadata extracted via ffprobe.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    /// Display width, after applying rotation metadata.
    pub width: u32,
    /// Display height, after applying rotation metadata.
    pub height: u32,
    /// Clockwise display rotation in degrees: 0, 90, 180 or 270.
    pub rotation: u32,
    /// Frames per second (e.g. 23.976, 24.0, 30.0).
    pub fps: f64,
    /// Rate as ffprobe reports it ("30000/1001"), passed back to the encoder verbatim.
    pub frame_rate: String,
    /// Number of frames, from the stream header or `fps * duration`.
    pub frame_count: u64,
    /// True if the container holds at least one audio stream.
    pub has_audio: bool,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    tags: Option<ProbeTags>,
}

#[derive(Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse an ffprobe rational ("24/1", "30000/1001") or plain number.
///
/// # Example
/// ```
/// use rf_source::video::parse_frame_rate;
/// assert_eq!(parse_frame_rate("24/1"), Some(24.0));
/// assert_eq!(parse_frame_rate("0/0"), None);
/// ```
#[must_use]
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let value = value.trim();
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Rotation of a stream from its display matrix side data, or the legacy
/// `rotate` tag, normalized to 0/90/180/270 degrees clockwise.
///
/// The display matrix reports counter-clockwise angles (-90 for a clip that
/// must be turned 90° clockwise), the tag reports clockwise ones.
fn stream_rotation(stream: &ProbeStream) -> u32 {
    let clockwise = stream
        .side_data_list
        .iter()
        .find_map(|d| d.rotation)
        .map(|r| -r)
        .or_else(|| {
            stream
                .tags
                .as_ref()
                .and_then(|t| t.rotate.as_deref())
                .and_then(|r| r.trim().parse::<f64>().ok())
        })
        .unwrap_or(0.0);
    let quarter_turns = (clockwise / 90.0).round() as i64;
    (quarter_turns.rem_euclid(4) * 90) as u32
}

/// Interpret `ffprobe -print_format json -show_streams -show_format` output.
///
/// # Errors
/// Returns an error if the JSON is malformed or holds no usable video stream.
pub fn parse_probe(json: &str) -> Result<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(json).context("Malformed ffprobe output")?;

    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));
    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .context("No video stream found")?;

    let stored_w = video.width.unwrap_or(0);
    let stored_h = video.height.unwrap_or(0);
    if stored_w == 0 || stored_h == 0 {
        anyhow::bail!("Video stream has invalid dimensions {stored_w}x{stored_h}");
    }
    // ffmpeg applies rotation metadata when decoding, so quarter turns swap
    // the size of the frames it emits.
    let rotation = stream_rotation(video);
    let (width, height) = if rotation % 180 == 90 {
        (stored_h, stored_w)
    } else {
        (stored_w, stored_h)
    };

    let (frame_rate, fps) = [&video.r_frame_rate, &video.avg_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|r| parse_frame_rate(r).map(|fps| (r.clone(), fps)))
        .context("Video stream has no usable frame rate")?;

    let header_count = video
        .nb_frames
        .as_deref()
        .and_then(|n| n.trim().parse::<u64>().ok())
        .filter(|&n| n > 0);
    let duration = video
        .duration
        .as_deref()
        .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.trim().parse::<f64>().ok());
    let frame_count = match (header_count, duration) {
        (Some(n), _) => n,
        (None, Some(d)) => ((fps * d) as u64).max(1),
        (None, None) => {
            log::warn!("ffprobe reported neither frame count nor duration; progress will be approximate");
            1
        }
    };

    Ok(VideoInfo {
        width,
        height,
        rotation,
        fps,
        frame_rate,
        frame_count,
        has_audio,
    })
}

/// Query `ffprobe` for the main video stream and audio presence.
///
/// # Errors
/// Returns an error if `ffprobe` cannot be started or the file has no
/// decodable video stream.
///
/// # Example
/// ```no_run
/// use rf_source::video::probe_video;
/// use std::path::Path;
/// let info = probe_video(Path::new("clip.mp4")).unwrap();
/// println!("{}x{} @ {:.3}fps", info.width, info.height, info.fps);
/// ```
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-show_format"])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .context("Cannot run ffprobe. Check that ffprobe is installed and on PATH.")?;

    if !output.status.success() {
        anyhow::bail!("ffprobe could not read {}", path.display());
    }

    let info = parse_probe(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("Cannot probe {}", path.display()))?;
    log::info!(
        "probe_video: {}x{} (rotation {}) @ {:.3}fps, {} frames, audio: {}, {}",
        info.width,
        info.height,
        info.rotation,
        info.fps,
        info.frame_count,
        info.has_audio,
        path.display()
    );
    Ok(info)
}

/// Read exactly `buf.len()` bytes from `reader`.
///
/// # Errors
/// Returns `Ok(true)` on success, `Ok(false)` on EOF before completion,
/// `Err` on a fatal I/O error.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => return Ok(false),
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Sequential frame decoder backed by an `ffmpeg` child process.
///
/// Frames come out at the probed display size (ffmpeg auto-rotates) and
/// constant frame rate. Audio is ignored here (it is re-attached from the source when muxing).
pub struct VideoReader {
    child: Child,
    stdout: ChildStdout,
    info: VideoInfo,
    frames_read: u64,
    finished: bool,
}

impl VideoReader {
    /// Start decoding `path`.
    ///
    /// # Errors
    /// Returns an error if `ffmpeg` cannot be started.
    pub fn open(path: &Path, info: VideoInfo) -> Result<Self> {
        let mut child = Command::new("ffmpeg")
            .arg("-i")
            .arg(path)
            .args([
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-r",
                &info.frame_rate,
                "-an",
                "-hide_banner",
                "-loglevel",
                "error",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("Cannot start ffmpeg decoder. Check that ffmpeg is installed and on PATH.")?;

        let stdout = child.stdout.take().context("ffmpeg stdout not captured")?;
        log::debug!("ffmpeg decoder started: {}x{} @ {}", info.width, info.height, info.frame_rate);

        Ok(Self {
            child,
            stdout,
            info,
            frames_read: 0,
            finished: false,
        })
    }
}

impl FrameSource for VideoReader {
    fn next_frame(&mut self) -> Result<Option<FrameBuffer>> {
        if self.finished {
            return Ok(None);
        }
        let mut frame = FrameBuffer::new(self.info.width, self.info.height);
        if read_exact_or_eof(&mut self.stdout, &mut frame.data)? {
            self.frames_read += 1;
            return Ok(Some(frame));
        }

        self.finished = true;
        let status = self.child.wait().context("Cannot wait for ffmpeg decoder")?;
        if !status.success() {
            anyhow::bail!("ffmpeg decoder exited with {status} after {} frames", self.frames_read);
        }
        log::info!("Video decoder: EOF after {} frames.", self.frames_read);
        Ok(None)
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.info.frame_count)
    }
}

impl Drop for VideoReader {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_WITH_AUDIO: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "width": 1920, "height": 1080,
             "r_frame_rate": "30000/1001", "avg_frame_rate": "30000/1001", "nb_frames": "300"},
            {"index": 1, "codec_type": "audio", "sample_rate": "48000"}
        ],
        "format": {"duration": "10.010000"}
    }"#;

    const PROBE_NO_COUNT: &str = r#"{
        "streams": [
            {"codec_type": "video", "width": 640, "height": 480,
             "r_frame_rate": "0/0", "avg_frame_rate": "25/1"}
        ],
        "format": {"duration": "4.0"}
    }"#;

    #[test]
    fn parses_stream_header() {
        let info = parse_probe(PROBE_WITH_AUDIO).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.frame_rate, "30000/1001");
        assert_eq!(info.frame_count, 300);
        assert_eq!(info.rotation, 0);
        assert!(info.has_audio);
    }

    #[test]
    fn falls_back_to_avg_rate_and_duration() {
        let info = parse_probe(PROBE_NO_COUNT).unwrap();
        assert_eq!(info.frame_rate, "25/1");
        assert_eq!(info.frame_count, 100);
        assert!(!info.has_audio);
    }

    #[test]
    fn quarter_turn_swaps_decoded_size() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080,
                 "r_frame_rate": "30/1", "nb_frames": "90",
                 "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]}
            ]
        }"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.rotation, 90);
        assert_eq!((info.width, info.height), (1080, 1920));
    }

    #[test]
    fn rotate_tag_and_half_turn() {
        let tagged = r#"{
            "streams": [
                {"codec_type": "video", "width": 1280, "height": 720,
                 "r_frame_rate": "25/1", "tags": {"rotate": "270"}}
            ]
        }"#;
        let info = parse_probe(tagged).unwrap();
        assert_eq!(info.rotation, 270);
        assert_eq!((info.width, info.height), (720, 1280));

        let upside_down = r#"{
            "streams": [
                {"codec_type": "video", "width": 1280, "height": 720,
                 "r_frame_rate": "25/1", "side_data_list": [{"rotation": 180}]}
            ]
        }"#;
        let info = parse_probe(upside_down).unwrap();
        assert_eq!(info.rotation, 180);
        assert_eq!((info.width, info.height), (1280, 720));
    }

    #[test]
    fn rejects_audio_only_files() {
        let json = r#"{"streams": [{"codec_type": "audio"}]}"#;
        assert!(parse_probe(json).is_err());
    }

    #[test]
    fn read_exact_or_eof_detects_short_reads() {
        let mut full: &[u8] = &[1, 2, 3, 4, 5, 6];
        let mut buf = [0u8; 3];
        assert!(read_exact_or_eof(&mut full, &mut buf).unwrap());
        assert_eq!(buf, [1, 2, 3]);
        assert!(read_exact_or_eof(&mut full, &mut buf).unwrap());
        assert!(!read_exact_or_eof(&mut full, &mut buf).unwrap());
    }
}
