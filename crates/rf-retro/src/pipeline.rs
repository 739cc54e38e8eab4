use rayon::prelude::*;
use rf_core::config::{DitherMode, PipelineConfig};
use rf_core::error::CoreError;
use rf_core::frame::FrameBuffer;
use rf_core::palette::{Palette, PaletteCatalog};

use crate::dither::{BAYER_8X8, dither};
use crate::letterbox::letterbox;
use crate::quantize::quantize;

/// Letterbox → dither → quantize, for one frame at a time.
///
/// The palette is resolved and validated at construction, so a bad name
/// fails before any frame is touched. Holds no per-frame state: one instance
/// can be shared by every worker of a job.
///
/// # Example
/// ```
/// use rf_retro::pipeline::FrameTransformPipeline;
/// use rf_core::config::PipelineConfig;
/// use rf_core::frame::FrameBuffer;
///
/// let config = PipelineConfig { palette: "NES".into(), ..Default::default() };
/// let pipeline = FrameTransformPipeline::new(&config).unwrap();
/// let out = pipeline.apply(&FrameBuffer::new(4, 4)).unwrap();
/// assert_eq!((out.width, out.height), (4, 4));
/// ```
#[derive(Clone, Debug)]
pub struct FrameTransformPipeline {
    palette: Palette,
    dither_mode: DitherMode,
    letterbox: bool,
}

impl FrameTransformPipeline {
    /// Resolve `config` against the built-in catalog.
    ///
    /// # Errors
    /// Returns `UnknownPalette` or `InvalidPalette`.
    pub fn new(config: &PipelineConfig) -> Result<Self, CoreError> {
        Self::with_catalog(config, PaletteCatalog::global())
    }

    /// Resolve `config` against a specific catalog.
    ///
    /// # Errors
    /// Returns `UnknownPalette` or `InvalidPalette`.
    pub fn with_catalog(config: &PipelineConfig, catalog: &PaletteCatalog) -> Result<Self, CoreError> {
        let palette = *catalog.lookup(&config.palette)?;
        palette.validate()?;
        Ok(Self {
            palette,
            dither_mode: config.dither_mode,
            letterbox: config.letterbox,
        })
    }

    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// True when this pipeline will run the ordered dither stage.
    #[must_use]
    pub fn dithers(&self) -> bool {
        self.palette.is_explicit() && self.dither_mode == DitherMode::Bayer8x8
    }

    /// Transform one frame.
    ///
    /// # Errors
    /// Returns `InvalidDimensions`/`Resize` from the letterbox stage.
    pub fn apply(&self, frame: &FrameBuffer) -> Result<FrameBuffer, CoreError> {
        let letterboxed;
        let mut current = frame;
        if self.letterbox {
            let (w, h) = self.palette.native;
            letterboxed = letterbox(current, w, h)?;
            current = &letterboxed;
        }

        let dithered;
        if self.dithers() {
            dithered = dither(current, &BAYER_8X8);
            current = &dithered;
        }

        quantize(current, &self.palette)
    }

    /// Transform a batch of frames in parallel. Output order matches input order.
    ///
    /// # Errors
    /// Returns the first error encountered.
    pub fn apply_batch(&self, frames: &[FrameBuffer]) -> Result<Vec<FrameBuffer>, CoreError> {
        frames.par_iter().map(|f| self.apply(f)).collect()
    }
}

/// One-shot transform: resolve `config` and apply it to `frame`.
///
/// # Errors
/// Returns any error of `FrameTransformPipeline::new` or `apply`.
///
/// # Example
/// ```
/// use rf_retro::transform_frame;
/// use rf_core::config::PipelineConfig;
/// use rf_core::frame::FrameBuffer;
///
/// let config = PipelineConfig { palette: "Atari".into(), ..Default::default() };
/// assert!(transform_frame(&FrameBuffer::new(1, 1), &config).is_err());
/// ```
pub fn transform_frame(frame: &FrameBuffer, config: &PipelineConfig) -> Result<FrameBuffer, CoreError> {
    FrameTransformPipeline::new(config)?.apply(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::frame::Rgb;
    use rf_core::palette::PaletteKind;

    fn config(palette: &str, dither_mode: DitherMode, letterbox: bool) -> PipelineConfig {
        PipelineConfig {
            palette: palette.into(),
            dither_mode,
            letterbox,
        }
    }

    fn noise(width: u32, height: u32) -> FrameBuffer {
        let data = (0..width * height * 3)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect();
        FrameBuffer::from_raw(width, height, data).unwrap()
    }

    #[test]
    fn unknown_palette_fails_at_construction() {
        let err = FrameTransformPipeline::new(&config("Atari 2600", DitherMode::None, false)).unwrap_err();
        assert!(matches!(err, CoreError::UnknownPalette { .. }));
    }

    #[test]
    fn invalid_palette_fails_at_construction() {
        let catalog = PaletteCatalog::new(vec![Palette {
            name: "Mono",
            slug: "mono",
            kind: PaletteKind::BitDepth { levels: 0 },
            native: (8, 8),
        }]);
        let err = FrameTransformPipeline::with_catalog(&config("Mono", DitherMode::None, false), &catalog)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPalette { .. }));
    }

    #[test]
    fn dither_then_quantize_stays_in_palette() {
        let pipeline = FrameTransformPipeline::new(&config("c64", DitherMode::Bayer8x8, false)).unwrap();
        let PaletteKind::Explicit(colors) = pipeline.palette().kind else {
            unreachable!()
        };
        let out = pipeline.apply(&noise(24, 16)).unwrap();
        assert!(out.pixels().all(|p| colors.contains(&p)));
    }

    #[test]
    fn dither_equals_manual_chain() {
        let frame = noise(16, 16);
        let pipeline = FrameTransformPipeline::new(&config("EGA Mode #2", DitherMode::Bayer8x8, false)).unwrap();
        let manual = quantize(&dither(&frame, &BAYER_8X8), pipeline.palette()).unwrap();
        assert_eq!(pipeline.apply(&frame).unwrap(), manual);
    }

    #[test]
    fn dither_is_skipped_for_bit_depth_palettes() {
        let frame = noise(16, 16);
        let plain = FrameTransformPipeline::new(&config("sms", DitherMode::None, false)).unwrap();
        let dithered = FrameTransformPipeline::new(&config("sms", DitherMode::Bayer8x8, false)).unwrap();
        assert!(!dithered.dithers());
        assert_eq!(plain.apply(&frame).unwrap(), dithered.apply(&frame).unwrap());
    }

    #[test]
    fn letterbox_uses_native_resolution() {
        let pipeline = FrameTransformPipeline::new(&config("Sega Genesis", DitherMode::None, true)).unwrap();
        let out = pipeline.apply(&noise(640, 480)).unwrap();
        assert_eq!((out.width, out.height), (320, 224));
        for y in 0..224 {
            assert_eq!(out.pixel(0, y), Rgb::BLACK);
            assert_eq!(out.pixel(319, y), Rgb::BLACK);
        }
    }

    #[test]
    fn batch_preserves_order_and_matches_single_frames() {
        let pipeline = FrameTransformPipeline::new(&config("NES", DitherMode::Bayer8x8, true)).unwrap();
        let frames: Vec<FrameBuffer> = (1..=6).map(|i| noise(40 + i, 30)).collect();
        let batch = pipeline.apply_batch(&frames).unwrap();
        assert_eq!(batch.len(), frames.len());
        for (f, b) in frames.iter().zip(&batch) {
            assert_eq!(&pipeline.apply(f).unwrap(), b);
        }
    }

    #[test]
    fn pipeline_is_stateless() {
        let pipeline = FrameTransformPipeline::new(&config("NES", DitherMode::Bayer8x8, false)).unwrap();
        let a = noise(9, 9);
        let first = pipeline.apply(&a).unwrap();
        let _ = pipeline.apply(&noise(33, 7)).unwrap();
        assert_eq!(pipeline.apply(&a).unwrap(), first);
    }
}
