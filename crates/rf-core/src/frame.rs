use crate::error::CoreError;

/// 8-bit RGB triple.
///
/// # Example
/// ```
/// use rf_core::frame::Rgb;
/// let c = Rgb::from_hex("#FF00FF");
/// assert_eq!(c, Rgb::new(255, 0, 255));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Pure black, used for letterbox padding.
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RRGGBB` literal. Evaluated at compile time for the palette table.
    ///
    /// # Panics
    /// Panics on a malformed literal. In const context this is a build error.
    #[must_use]
    pub const fn from_hex(hex: &str) -> Self {
        let bytes = hex.as_bytes();
        assert!(bytes.len() == 7 && bytes[0] == b'#', "expected #RRGGBB");
        Self {
            r: hex_byte(bytes[1], bytes[2]),
            g: hex_byte(bytes[3], bytes[4]),
            b: hex_byte(bytes[5], bytes[6]),
        }
    }

    /// Squared Euclidean distance in RGB space.
    ///
    /// # Example
    /// ```
    /// use rf_core::frame::Rgb;
    /// assert_eq!(Rgb::new(3, 4, 0).distance_sq(Rgb::BLACK), 25);
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn distance_sq(self, other: Rgb) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }

    /// `#RRGGBB` representation.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

const fn hex_nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => panic!("invalid hex digit"),
    }
}

const fn hex_byte(hi: u8, lo: u8) -> u8 {
    (hex_nibble(hi) << 4) | hex_nibble(lo)
}

/// Pixel buffer, RGB row-major, 3 bytes per pixel, no alpha.
///
/// Every pipeline stage reads one buffer and produces a new one.
///
/// # Example
/// ```
/// use rf_core::frame::FrameBuffer;
/// let fb = FrameBuffer::new(10, 10);
/// assert_eq!(fb.data.len(), 300);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Pixels RGB, row-major, 3 bytes per pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Bytes per pixel.
    pub const CHANNELS: usize = 3;

    /// Allocate a black buffer of the given size.
    ///
    /// # Example
    /// ```
    /// use rf_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::new(100, 50);
    /// assert_eq!(fb.width, 100);
    /// assert_eq!(fb.height, 50);
    /// assert_eq!(fb.data.len(), 100 * 50 * 3);
    /// ```
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * Self::CHANNELS],
            width,
            height,
        }
    }

    /// Wrap raw RGB bytes.
    ///
    /// # Errors
    /// Returns `InvalidDimensions` if `data` is not exactly `width * height * 3` bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CoreError> {
        if data.len() != width as usize * height as usize * Self::CHANNELS {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Build a buffer from a row-major list of pixels.
    ///
    /// # Errors
    /// Returns `InvalidDimensions` if the pixel count does not match.
    ///
    /// # Example
    /// ```
    /// use rf_core::frame::{FrameBuffer, Rgb};
    /// let fb = FrameBuffer::from_pixels(2, 1, &[Rgb::new(1, 2, 3), Rgb::BLACK]).unwrap();
    /// assert_eq!(fb.pixel(0, 0), Rgb::new(1, 2, 3));
    /// ```
    pub fn from_pixels(width: u32, height: u32, pixels: &[Rgb]) -> Result<Self, CoreError> {
        let data = pixels.iter().flat_map(|p| [p.r, p.g, p.b]).collect();
        Self::from_raw(width, height, data)
    }

    /// Byte length of one row.
    #[inline(always)]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.width as usize * Self::CHANNELS
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel at (x, y). Out-of-bounds reads return black.
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        match self.data.get(idx..idx + Self::CHANNELS) {
            Some(px) => Rgb::new(px[0], px[1], px[2]),
            None => Rgb::BLACK,
        }
    }

    /// Overwrite pixel at (x, y). Out-of-bounds writes are ignored.
    #[inline(always)]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        let idx = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        if let Some(px) = self.data.get_mut(idx..idx + Self::CHANNELS) {
            px.copy_from_slice(&[color.r, color.g, color.b]);
        }
    }

    /// Iterate over all pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = Rgb> + '_ {
        self.data
            .chunks_exact(Self::CHANNELS)
            .map(|px| Rgb::new(px[0], px[1], px[2]))
    }

    /// Copy `src` into this buffer with its top-left corner at (`x`, `y`).
    /// Parts that fall outside are clipped.
    pub fn blit(&mut self, src: &FrameBuffer, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let cols = src.width.min(self.width - x) as usize;
        let rows = src.height.min(self.height - y);
        let row_bytes = cols * Self::CHANNELS;
        for row in 0..rows {
            let s = row as usize * src.stride();
            let d = (y + row) as usize * self.stride() + x as usize * Self::CHANNELS;
            self.data[d..d + row_bytes].copy_from_slice(&src.data[s..s + row_bytes]);
        }
    }
}
