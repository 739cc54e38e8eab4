use std::fmt::Write as _;

use rf_core::palette::{PaletteCatalog, PaletteKind};

const COLORS_PER_ROW: usize = 8;

/// Human-readable listing for `--list-palettes`.
#[must_use]
pub fn render_palette_list(catalog: &PaletteCatalog) -> String {
    let mut out = String::new();
    for palette in catalog.iter() {
        let (w, h) = palette.native;
        let _ = writeln!(out, "{} [{}] native {w}x{h}", palette.name, palette.slug);
        match palette.kind {
            PaletteKind::Explicit(colors) => {
                let _ = writeln!(out, "  {} colors", colors.len());
                for row in colors.chunks(COLORS_PER_ROW) {
                    let hex: Vec<String> = row.iter().map(|c| c.to_hex()).collect();
                    let _ = writeln!(out, "    {}", hex.join(" "));
                }
            }
            PaletteKind::BitDepth { levels } => {
                let _ = writeln!(out, "  {levels} levels per channel");
                if let Some(values) = palette.channel_levels() {
                    let values: Vec<String> = values.iter().map(u8::to_string).collect();
                    let _ = writeln!(out, "    {}", values.join(" "));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_covers_every_palette() {
        let catalog = PaletteCatalog::global();
        let text = render_palette_list(catalog);
        for name in catalog.names() {
            assert!(text.contains(name), "{name} missing");
        }
        assert!(text.contains("CGA Mode #1 [cga1] native 320x200"));
        assert!(text.contains("  8 levels per channel"));
        assert!(text.contains("    0 36 72 108 144 180 216 252"));
        assert!(text.contains("    0 85 170 255"));
        assert!(text.contains("#FF00FF #00FFFF #FFFFFF #000000"));
    }
}
