//! Access to embedded TrueType/OpenType programs through skrifa.

use skrifa::instance::{LocationRef, Size};
use skrifa::metrics::GlyphMetrics;
use skrifa::raw::TableProvider;
use skrifa::{FontRef, GlyphId, MetadataProvider};
use std::sync::Arc;

/// An embedded sfnt-housed font program.
///
/// The bytes are kept and re-parsed per lookup; skrifa's zero-copy views
/// make that cheap, and it avoids a self-referential struct.
#[derive(Clone)]
pub struct Face {
    data: Arc<[u8]>,
    n_glyphs: u16,
    units_per_em: u16,
}

impl std::fmt::Debug for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Face({} glyphs)", self.n_glyphs)
    }
}

impl Face {
    /// Parse a TrueType/OpenType program.
    pub fn parse(data: Arc<[u8]>) -> Option<Face> {
        let font = FontRef::from_index(&data, 0).ok()?;
        let n_glyphs = font.maxp().ok()?.num_glyphs();
        let units_per_em = font
            .head()
            .ok()
            .map(|h| h.units_per_em())
            .filter(|u| *u > 0)
            .unwrap_or(1000);

        Some(Face {
            data: data.clone(),
            n_glyphs,
            units_per_em,
        })
    }

    fn font(&self) -> Option<FontRef> {
        FontRef::from_index(&self.data, 0).ok()
    }

    /// The raw program bytes.
    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    /// The number of glyphs.
    pub fn n_glyphs(&self) -> u16 {
        self.n_glyphs
    }

    /// Map a Unicode character through the font's `cmap`.
    pub fn glyph_for_char(&self, c: char) -> Option<u16> {
        let font = self.font()?;
        let gid = font.charmap().map(c)?;
        gid_u16(gid)
    }

    /// Map a raw character code, trying the code itself and then the
    /// `0xF000` symbol-range alias.
    pub fn glyph_for_code(&self, code: u32) -> Option<u16> {
        let font = self.font()?;
        let cmap = font.cmap().ok()?;

        cmap.map_codepoint(code)
            .or_else(|| cmap.map_codepoint(0xf000 + code))
            .and_then(gid_u16)
    }

    /// The advance width of a glyph, normalized to 1000 units per em.
    pub fn advance(&self, gid: u16) -> Option<f32> {
        let font = self.font()?;
        let metrics = GlyphMetrics::new(&font, Size::unscaled(), LocationRef::default());
        let advance = metrics.advance_width(GlyphId::new(gid as u32))?;

        Some(advance * 1000.0 / self.units_per_em as f32)
    }
}

fn gid_u16(gid: GlyphId) -> Option<u16> {
    u16::try_from(gid.to_u32()).ok()
}
