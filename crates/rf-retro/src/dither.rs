//! Ordered dithering with an 8×8 Bayer threshold table.
//!
//! Each channel is binarized against the tiled threshold before the palette
//! lookup; the quantizer then snaps the resulting on/off color to the closest
//! palette entry.

use rayon::prelude::*;
use rf_core::frame::FrameBuffer;

/// 8×8 threshold table, values 0 to 63.
pub type DitherMatrix = [[u8; 8]; 8];

/// Bayer 8×8 matrix, row-major, indexed `[y % 8][x % 8]`.
pub const BAYER_8X8: DitherMatrix = [
    [0, 48, 12, 60, 3, 51, 15, 63],
    [32, 16, 44, 28, 35, 19, 47, 31],
    [8, 56, 4, 52, 11, 59, 7, 55],
    [40, 24, 36, 20, 43, 27, 39, 23],
    [2, 50, 14, 62, 1, 49, 13, 61],
    [34, 18, 46, 30, 33, 17, 45, 29],
    [10, 58, 6, 54, 9, 57, 5, 53],
    [42, 26, 38, 22, 41, 25, 37, 21],
];

/// `c > t / 64 * 255`, evaluated exactly as `64c > 255t`.
///
/// # Example
/// ```
/// use rf_retro::dither::exceeds_threshold;
/// assert!(exceeds_threshold(1, 0));
/// assert!(!exceeds_threshold(0, 0));
/// assert!(!exceeds_threshold(251, 63));
/// ```
#[inline(always)]
#[must_use]
pub fn exceeds_threshold(c: u8, t: u8) -> bool {
    64 * u32::from(c) > 255 * u32::from(t)
}

/// Binarize every channel against the tiled threshold table.
///
/// Output channels are 0 or 255. Each pixel depends only on its own value
/// and coordinates.
///
/// # Example
/// ```
/// use rf_retro::dither::{dither, BAYER_8X8};
/// use rf_core::frame::{FrameBuffer, Rgb};
/// let frame = FrameBuffer::from_pixels(2, 1, &[Rgb::new(100, 0, 255), Rgb::new(100, 0, 255)]).unwrap();
/// let out = dither(&frame, &BAYER_8X8);
/// assert_eq!(out.pixel(0, 0), Rgb::new(255, 0, 255)); // t = 0
/// assert_eq!(out.pixel(1, 0), Rgb::new(0, 0, 255)); // t = 48 -> 191.25
/// ```
#[must_use]
pub fn dither(frame: &FrameBuffer, matrix: &DitherMatrix) -> FrameBuffer {
    let mut out = FrameBuffer::new(frame.width, frame.height);
    if frame.is_empty() {
        return out;
    }
    let stride = frame.stride();

    out.data
        .par_chunks_mut(stride)
        .zip(frame.data.par_chunks(stride))
        .enumerate()
        .for_each(|(y, (dst, src))| {
            let row = &matrix[y % 8];
            for (x, (o, s)) in dst
                .chunks_exact_mut(FrameBuffer::CHANNELS)
                .zip(src.chunks_exact(FrameBuffer::CHANNELS))
                .enumerate()
            {
                let t = row[x % 8];
                for (oc, &sc) in o.iter_mut().zip(s) {
                    *oc = if exceeds_threshold(sc, t) { 255 } else { 0 };
                }
            }
        });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::frame::Rgb;

    fn gradient(width: u32, height: u32) -> FrameBuffer {
        let data = (0..width * height)
            .flat_map(|i| {
                let v = (i * 7 % 256) as u8;
                [v, v.wrapping_mul(3), 255 - v]
            })
            .collect();
        FrameBuffer::from_raw(width, height, data).unwrap()
    }

    fn crop(frame: &FrameBuffer, x0: u32, y0: u32, w: u32, h: u32) -> FrameBuffer {
        let mut out = FrameBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                out.set_pixel(x, y, frame.pixel(x0 + x, y0 + y));
            }
        }
        out
    }

    #[test]
    fn matrix_is_a_permutation_of_0_to_63() {
        let mut seen = [false; 64];
        for v in BAYER_8X8.iter().flatten() {
            assert!(!seen[*v as usize], "duplicate {v}");
            seen[*v as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn threshold_matches_float_formula() {
        for t in 0..64u8 {
            let threshold = f64::from(t) / 64.0 * 255.0;
            for c in 0..=255u8 {
                assert_eq!(exceeds_threshold(c, t), f64::from(c) > threshold, "c={c} t={t}");
            }
        }
    }

    #[test]
    fn output_is_binary_and_deterministic() {
        let frame = gradient(19, 13);
        let a = dither(&frame, &BAYER_8X8);
        let b = dither(&frame, &BAYER_8X8);
        assert_eq!(a, b);
        assert!(a.data.iter().all(|&v| v == 0 || v == 255));
    }

    #[test]
    fn translation_by_tile_period_commutes() {
        let frame = gradient(32, 32);
        let full = dither(&frame, &BAYER_8X8);

        let shifted = dither(&crop(&frame, 8, 16, 16, 16), &BAYER_8X8);
        assert_eq!(shifted, crop(&full, 8, 16, 16, 16));

        // Off-period shift lands on different thresholds.
        let flat = FrameBuffer::from_pixels(16, 16, &[Rgb::new(128, 128, 128); 256]).unwrap();
        let flat_full = dither(&flat, &BAYER_8X8);
        let off = dither(&crop(&flat, 3, 0, 8, 8), &BAYER_8X8);
        assert_ne!(off, crop(&flat_full, 3, 0, 8, 8));
    }

    #[test]
    fn extremes_are_fixed_points() {
        let frame = FrameBuffer::from_pixels(8, 1, &[Rgb::new(255, 0, 255); 8]).unwrap();
        let out = dither(&frame, &BAYER_8X8);
        assert!(out.pixels().all(|p| p == Rgb::new(255, 0, 255)));
    }
}
