//! Registry of target console palettes.
//!
//! The table is built once per process and never mutated; lookups are
//! plain reads and safe from any number of worker threads.

use std::sync::OnceLock;

use crate::error::CoreError;
use crate::frame::Rgb;

/// How a palette constrains colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaletteKind {
    /// Fixed list of representable colors. Order matters for tie-breaking.
    Explicit(&'static [Rgb]),
    /// Per-channel reduction to `levels` values.
    BitDepth {
        /// Levels per channel, at least 2.
        levels: u16,
    },
}

/// A named target palette with the console's native frame size.
///
/// # Example
/// ```
/// use rf_core::palette::PaletteCatalog;
/// let nes = PaletteCatalog::global().lookup("NES").unwrap();
/// assert_eq!(nes.native, (256, 224));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    /// Display name, the primary lookup key.
    pub name: &'static str,
    /// Short command-line alias.
    pub slug: &'static str,
    pub kind: PaletteKind,
    /// Native resolution (width, height) in pixels.
    pub native: (u32, u32),
}

impl Palette {
    /// Check that the palette can be quantized against.
    ///
    /// # Errors
    /// Returns `InvalidPalette` for an empty color list or fewer than 2 levels.
    ///
    /// # Example
    /// ```
    /// use rf_core::palette::{Palette, PaletteKind};
    /// let broken = Palette {
    ///     name: "Broken",
    ///     slug: "broken",
    ///     kind: PaletteKind::BitDepth { levels: 1 },
    ///     native: (8, 8),
    /// };
    /// assert!(broken.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), CoreError> {
        let reason = match self.kind {
            PaletteKind::Explicit(colors) if colors.is_empty() => "color list is empty",
            PaletteKind::BitDepth { levels } if levels < 2 => "bit-depth palettes need at least 2 levels",
            _ => return Ok(()),
        };
        Err(CoreError::InvalidPalette {
            name: self.name.to_string(),
            reason: reason.to_string(),
        })
    }

    #[must_use]
    pub fn is_explicit(&self) -> bool {
        matches!(self.kind, PaletteKind::Explicit(_))
    }

    /// Representable values of one channel for a bit-depth palette.
    ///
    /// Spacing uses the truncated step `255 / (levels - 1)`, so the top level
    /// falls short of 255 whenever the division is inexact.
    ///
    /// # Example
    /// ```
    /// use rf_core::palette::PaletteCatalog;
    /// let sms = PaletteCatalog::global().lookup("Sega Master System").unwrap();
    /// assert_eq!(sms.channel_levels(), Some(vec![0, 85, 170, 255]));
    /// ```
    #[must_use]
    pub fn channel_levels(&self) -> Option<Vec<u8>> {
        match self.kind {
            PaletteKind::BitDepth { levels } if levels >= 2 => {
                let step = 255 / u32::from(levels - 1);
                Some((0..u32::from(levels)).map(|k| (k * step) as u8).collect())
            }
            _ => None,
        }
    }

    /// Name with spaces replaced by underscores, used in output file names.
    ///
    /// # Example
    /// ```
    /// use rf_core::palette::PaletteCatalog;
    /// let cga = PaletteCatalog::global().lookup("CGA Mode #1").unwrap();
    /// assert_eq!(cga.file_tag(), "CGA_Mode_#1");
    /// ```
    #[must_use]
    pub fn file_tag(&self) -> String {
        self.name.replace(' ', "_")
    }
}

const CGA_MODE_1: &[Rgb] = &[
    Rgb::from_hex("#FF00FF"),
    Rgb::from_hex("#00FFFF"),
    Rgb::from_hex("#FFFFFF"),
    Rgb::from_hex("#000000"),
];

const CGA_MODE_2: &[Rgb] = &[
    Rgb::from_hex("#FF0000"),
    Rgb::from_hex("#FFFF00"),
    Rgb::from_hex("#00FF00"),
    Rgb::from_hex("#000000"),
];

const EGA_MODE_2: &[Rgb] = &[
    Rgb::from_hex("#FF00FF"),
    Rgb::from_hex("#00FFFF"),
    Rgb::from_hex("#FFFFFF"),
    Rgb::from_hex("#FF0000"),
    Rgb::from_hex("#FFFF00"),
    Rgb::from_hex("#00FF00"),
    Rgb::from_hex("#0000FF"),
    Rgb::from_hex("#555555"),
    Rgb::from_hex("#AAAAAA"),
    Rgb::from_hex("#AA00AA"),
    Rgb::from_hex("#00AAAA"),
    Rgb::from_hex("#AA0000"),
    Rgb::from_hex("#AA5500"),
    Rgb::from_hex("#00AA00"),
    Rgb::from_hex("#0000AA"),
];

const COMMODORE_64: &[Rgb] = &[
    Rgb::from_hex("#FFFFFF"),
    Rgb::from_hex("#000000"),
    Rgb::from_hex("#A14D43"),
    Rgb::from_hex("#6AC1C8"),
    Rgb::from_hex("#A257A5"),
    Rgb::from_hex("#5CAD5F"),
    Rgb::from_hex("#4F449C"),
    Rgb::from_hex("#CBD689"),
    Rgb::from_hex("#A3683A"),
    Rgb::from_hex("#6E540B"),
    Rgb::from_hex("#CC7F76"),
    Rgb::from_hex("#636363"),
    Rgb::from_hex("#8B8B8B"),
    Rgb::from_hex("#8A7FCD"),
    Rgb::from_hex("#AFAFAF"),
];

const NES: &[Rgb] = &[
    Rgb::from_hex("#7C7C7C"),
    Rgb::from_hex("#0000FC"),
    Rgb::from_hex("#0000BC"),
    Rgb::from_hex("#4428BC"),
    Rgb::from_hex("#940084"),
    Rgb::from_hex("#A80020"),
    Rgb::from_hex("#A81000"),
    Rgb::from_hex("#881400"),
    Rgb::from_hex("#503000"),
    Rgb::from_hex("#007800"),
    Rgb::from_hex("#006800"),
    Rgb::from_hex("#005800"),
    Rgb::from_hex("#004058"),
    Rgb::from_hex("#000000"),
    Rgb::from_hex("#BCBCBC"),
    Rgb::from_hex("#0078F8"),
    Rgb::from_hex("#0058F8"),
    Rgb::from_hex("#6844FC"),
    Rgb::from_hex("#D800CC"),
    Rgb::from_hex("#E40058"),
    Rgb::from_hex("#F83800"),
    Rgb::from_hex("#E45C10"),
    Rgb::from_hex("#AC7C00"),
    Rgb::from_hex("#00B800"),
    Rgb::from_hex("#00A800"),
    Rgb::from_hex("#00A844"),
    Rgb::from_hex("#008888"),
    Rgb::from_hex("#F8F8F8"),
    Rgb::from_hex("#3CBCFC"),
    Rgb::from_hex("#6888FC"),
    Rgb::from_hex("#9878F8"),
    Rgb::from_hex("#F878F8"),
    Rgb::from_hex("#F85898"),
    Rgb::from_hex("#F87858"),
    Rgb::from_hex("#FCA044"),
    Rgb::from_hex("#F8B800"),
    Rgb::from_hex("#B8F818"),
    Rgb::from_hex("#58D854"),
    Rgb::from_hex("#58F898"),
    Rgb::from_hex("#00E8D8"),
    Rgb::from_hex("#787878"),
    Rgb::from_hex("#FCFCFC"),
    Rgb::from_hex("#A4E4FC"),
    Rgb::from_hex("#B8B8F8"),
    Rgb::from_hex("#D8B8F8"),
    Rgb::from_hex("#F8B8F8"),
    Rgb::from_hex("#F8A4C0"),
    Rgb::from_hex("#F0D0B0"),
    Rgb::from_hex("#FCE0A8"),
    Rgb::from_hex("#F8D878"),
    Rgb::from_hex("#D8F878"),
    Rgb::from_hex("#B8F8B8"),
    Rgb::from_hex("#B8F8D8"),
    Rgb::from_hex("#00FCFC"),
    Rgb::from_hex("#F8D8F8"),
];

/// The built-in console palettes, in menu order.
pub const BUILTIN_PALETTES: &[Palette] = &[
    Palette {
        name: "CGA Mode #1",
        slug: "cga1",
        kind: PaletteKind::Explicit(CGA_MODE_1),
        native: (320, 200),
    },
    Palette {
        name: "CGA Mode #2",
        slug: "cga2",
        kind: PaletteKind::Explicit(CGA_MODE_2),
        native: (320, 200),
    },
    Palette {
        name: "EGA Mode #2",
        slug: "ega2",
        kind: PaletteKind::Explicit(EGA_MODE_2),
        native: (320, 200),
    },
    Palette {
        name: "Commodore 64",
        slug: "c64",
        kind: PaletteKind::Explicit(COMMODORE_64),
        native: (320, 200),
    },
    Palette {
        name: "NES",
        slug: "nes",
        kind: PaletteKind::Explicit(NES),
        native: (256, 224),
    },
    // 6-bit RGB, 2 bits per channel.
    Palette {
        name: "Sega Master System",
        slug: "sms",
        kind: PaletteKind::BitDepth { levels: 4 },
        native: (256, 192),
    },
    // 9-bit RGB, 3 bits per channel.
    Palette {
        name: "Sega Genesis",
        slug: "genesis",
        kind: PaletteKind::BitDepth { levels: 8 },
        native: (320, 224),
    },
];

/// Earlier display names that still resolve, as (old name, current name).
const LEGACY_NAMES: &[(&str, &str)] = &[
    ("Sega Master System (6-bit RGB)", "Sega Master System"),
    ("Sega Genesis (9-bit RGB)", "Sega Genesis"),
];

/// Immutable palette registry.
///
/// # Example
/// ```
/// use rf_core::palette::PaletteCatalog;
/// let catalog = PaletteCatalog::global();
/// assert!(catalog.lookup("c64").is_ok());
/// assert!(catalog.lookup("Amiga").is_err());
/// ```
#[derive(Debug)]
pub struct PaletteCatalog {
    palettes: Vec<Palette>,
}

impl PaletteCatalog {
    /// Build a catalog from an arbitrary palette list.
    #[must_use]
    pub fn new(palettes: Vec<Palette>) -> Self {
        Self { palettes }
    }

    /// Process-wide catalog of the built-in palettes, built on first use.
    pub fn global() -> &'static PaletteCatalog {
        static CATALOG: OnceLock<PaletteCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| PaletteCatalog::new(BUILTIN_PALETTES.to_vec()))
    }

    /// Find a palette by exact name, then by an earlier display name, then
    /// by slug (case-insensitive).
    ///
    /// # Errors
    /// Returns `UnknownPalette` if nothing matches.
    pub fn lookup(&self, name: &str) -> Result<&Palette, CoreError> {
        let current = LEGACY_NAMES
            .iter()
            .find(|(old, _)| *old == name)
            .map_or(name, |(_, new)| *new);
        self.palettes
            .iter()
            .find(|p| p.name == current)
            .or_else(|| {
                self.palettes
                    .iter()
                    .find(|p| p.slug.eq_ignore_ascii_case(name.trim()))
            })
            .ok_or_else(|| CoreError::UnknownPalette {
                name: name.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Palette> {
        self.palettes.iter()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.palettes.iter().map(|p| p.name).collect()
    }
}
