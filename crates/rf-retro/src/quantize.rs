use rayon::prelude::*;
use rf_core::error::CoreError;
use rf_core::frame::{FrameBuffer, Rgb};
use rf_core::palette::{Palette, PaletteKind};

/// Map one channel value onto a bit-depth palette.
///
/// `round(c / 255 * (levels - 1)) * (255 / (levels - 1))`, the step being an
/// integer division. Exact integer rounding; `2c(L-1)` is even and `255` odd,
/// so a half-way tie never occurs.
///
/// # Example
/// ```
/// use rf_retro::quantize::quantize_channel;
/// assert_eq!(quantize_channel(128, 4), 170);
/// assert_eq!(quantize_channel(255, 8), 252);
/// ```
#[inline(always)]
#[must_use]
pub fn quantize_channel(c: u8, levels: u16) -> u8 {
    debug_assert!(levels >= 2);
    let span = u32::from(levels) - 1;
    let level = (2 * u32::from(c) * span + 255) / 510;
    (level * (255 / span)) as u8
}

/// Per-channel lookup table for a bit-depth palette.
fn bit_depth_lut(levels: u16) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (c, slot) in lut.iter_mut().enumerate() {
        *slot = quantize_channel(c as u8, levels);
    }
    lut
}

/// Exact nearest-color search over an explicit palette.
///
/// Squared Euclidean RGB distance; on equal distance the earliest entry wins.
///
/// # Example
/// ```
/// use rf_retro::quantize::ColorIndex;
/// use rf_core::frame::Rgb;
/// let colors = [Rgb::new(0, 0, 0), Rgb::new(255, 255, 255)];
/// let index = ColorIndex::new(&colors);
/// assert_eq!(index.nearest(Rgb::new(200, 200, 200)), Rgb::new(255, 255, 255));
/// ```
pub struct ColorIndex<'a> {
    colors: &'a [Rgb],
}

impl<'a> ColorIndex<'a> {
    #[must_use]
    pub fn new(colors: &'a [Rgb]) -> Self {
        Self { colors }
    }

    /// Index of the closest palette entry. Returns 0 for an empty palette.
    #[inline]
    #[must_use]
    pub fn nearest_index(&self, color: Rgb) -> usize {
        let mut best_idx = 0;
        let mut best_dist = u32::MAX;
        for (i, &candidate) in self.colors.iter().enumerate() {
            let d = color.distance_sq(candidate);
            if d < best_dist {
                best_dist = d;
                best_idx = i;
                if d == 0 {
                    break;
                }
            }
        }
        best_idx
    }

    #[inline]
    #[must_use]
    pub fn nearest(&self, color: Rgb) -> Rgb {
        self.colors
            .get(self.nearest_index(color))
            .copied()
            .unwrap_or(Rgb::BLACK)
    }
}

/// Replace every pixel with the palette's closest representable color.
///
/// # Errors
/// Returns `InvalidPalette` for an empty color list or fewer than 2 levels.
///
/// # Example
/// ```
/// use rf_retro::quantize::quantize;
/// use rf_core::frame::{FrameBuffer, Rgb};
/// use rf_core::palette::PaletteCatalog;
///
/// let frame = FrameBuffer::from_pixels(1, 1, &[Rgb::new(250, 10, 240)]).unwrap();
/// let cga = PaletteCatalog::global().lookup("CGA Mode #1").unwrap();
/// let out = quantize(&frame, cga).unwrap();
/// assert_eq!(out.pixel(0, 0), Rgb::new(255, 0, 255));
/// ```
pub fn quantize(frame: &FrameBuffer, palette: &Palette) -> Result<FrameBuffer, CoreError> {
    palette.validate()?;
    let mut out = FrameBuffer::new(frame.width, frame.height);
    if frame.is_empty() {
        return Ok(out);
    }
    let stride = frame.stride();

    match palette.kind {
        PaletteKind::BitDepth { levels } => {
            let lut = bit_depth_lut(levels);
            out.data
                .par_chunks_mut(stride)
                .zip(frame.data.par_chunks(stride))
                .for_each(|(dst, src)| {
                    for (o, &c) in dst.iter_mut().zip(src) {
                        *o = lut[c as usize];
                    }
                });
        }
        PaletteKind::Explicit(colors) => {
            let index = ColorIndex::new(colors);
            out.data
                .par_chunks_mut(stride)
                .zip(frame.data.par_chunks(stride))
                .for_each(|(dst, src)| {
                    // Runs of identical pixels are common, and after dithering
                    // only eight inputs exist at all.
                    let mut last: Option<(Rgb, Rgb)> = None;
                    for (o, s) in dst
                        .chunks_exact_mut(FrameBuffer::CHANNELS)
                        .zip(src.chunks_exact(FrameBuffer::CHANNELS))
                    {
                        let input = Rgb::new(s[0], s[1], s[2]);
                        let mapped = match last {
                            Some((prev_in, prev_out)) if prev_in == input => prev_out,
                            _ => {
                                let m = index.nearest(input);
                                last = Some((input, m));
                                m
                            }
                        };
                        o.copy_from_slice(&[mapped.r, mapped.g, mapped.b]);
                    }
                });
        }
    }
    Ok(out)
}
