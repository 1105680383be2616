//! The character map: input code → output Unicode (+ glyph).
//!
//! Two constructors build the same type for the two uses. The embedding map
//! keeps the SVG text's code points in unambiguous correspondence with glyph
//! indices: every output is a single scalar that maps to exactly one glyph,
//! with collisions (and unusable outputs) reassigned to fresh Private Use
//! Area code points. The extraction map keeps the richest text instead and
//! never reassigns.

use super::glyph_names::normalize_ligatures;
use rustc_hash::FxHashMap;

const PUA_FIRST: u32 = 0xe000;
const PUA_LAST: u32 = 0xf8ff;

/// What the priority chain produced for one input code, before the map's
/// own rules are applied.
#[derive(Debug, Clone, Default)]
pub struct CodeInfo {
    /// The input code.
    pub code: u32,
    /// A single-character `/ToUnicode` target (one scalar; a surrogate pair
    /// counts as one character).
    pub single_to_unicode: Option<String>,
    /// Text from the explicit single-byte encoding, through the glyph list.
    pub encoding_text: Option<String>,
    /// Text from the font program's own encoding or `cmap`.
    pub builtin_text: Option<String>,
    /// A multi-character `/ToUnicode` target.
    pub multi_to_unicode: Option<String>,
    /// The glyph index the code selects in the embedded program; 0 when
    /// unknown or `.notdef`.
    pub glyph_id: u16,
}

/// One resolved mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct CharMapEntry {
    /// The output text. Empty when the code produces no text.
    pub text: String,
    /// The glyph index in the embedded program.
    pub glyph_id: u16,
}

/// The mapping a shown text string goes through.
#[derive(Debug, Default)]
pub struct CharMap {
    entries: FxHashMap<u32, CharMapEntry>,
}

impl CharMap {
    /// Build the map for output that references the embedded font's glyphs.
    pub fn for_embedding(mut codes: Vec<CodeInfo>) -> CharMap {
        // Deterministic assignment order.
        codes.sort_by_key(|c| c.code);
        codes.dedup_by_key(|c| c.code);

        let mut entries = FxHashMap::default();
        // scalar → glyph, the uniqueness ledger.
        let mut assigned: FxHashMap<char, u16> = FxHashMap::default();
        let mut next_pua = PUA_FIRST;

        for info in codes {
            let preferred = info
                .single_to_unicode
                .clone()
                .or_else(|| info.encoding_text.clone())
                .or_else(|| info.builtin_text.clone())
                .or_else(|| info.multi_to_unicode.clone())
                .map(|t| normalize_ligatures(&t));

            let usable = preferred.as_ref().and_then(|t| {
                let mut chars = t.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if !c.is_control() => Some(c),
                    _ => None,
                }
            });

            let text = match usable {
                Some(c) => match assigned.get(&c) {
                    None => {
                        assigned.insert(c, info.glyph_id);
                        c.to_string()
                    }
                    Some(gid) if *gid == info.glyph_id => c.to_string(),
                    // The scalar already names a different glyph.
                    Some(_) => allocate_pua(&mut assigned, &mut next_pua, info.glyph_id),
                },
                None => allocate_pua(&mut assigned, &mut next_pua, info.glyph_id),
            };

            entries.insert(
                info.code,
                CharMapEntry {
                    text,
                    glyph_id: info.glyph_id,
                },
            );
        }

        CharMap { entries }
    }

    /// Build the map for text extraction: the richest text wins and nothing
    /// is reassigned.
    pub fn for_extraction(mut codes: Vec<CodeInfo>) -> CharMap {
        codes.sort_by_key(|c| c.code);
        // First wins.
        codes.dedup_by_key(|c| c.code);

        let entries = codes
            .into_iter()
            .map(|info| {
                let text = info
                    .single_to_unicode
                    .or(info.multi_to_unicode)
                    .or(info.encoding_text)
                    .or(info.builtin_text)
                    .unwrap_or_default();

                (
                    info.code,
                    CharMapEntry {
                        text,
                        glyph_id: info.glyph_id,
                    },
                )
            })
            .collect();

        CharMap { entries }
    }

    /// The entry for an input code.
    pub fn get(&self, code: u32) -> Option<&CharMapEntry> {
        self.entries.get(&code)
    }

    /// All entries, unordered.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &CharMapEntry)> + '_ {
        self.entries.iter().map(|(c, e)| (*c, e))
    }

    /// The `(scalar, glyph)` pairs an embedded font's rebuilt `cmap` must
    /// carry: single-scalar outputs with a real glyph.
    pub fn font_mappings(&self) -> Vec<(u32, u16)> {
        let mut out: Vec<(u32, u16)> = self
            .entries
            .values()
            .filter(|e| e.glyph_id != 0)
            .filter_map(|e| {
                let mut chars = e.text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some((c as u32, e.glyph_id)),
                    _ => None,
                }
            })
            .collect();

        out.sort();
        out.dedup();
        out
    }
}

/// The next free Private Use Area scalar, or no text at all once the area is
/// exhausted (the glyph stays `.notdef`).
fn allocate_pua(
    assigned: &mut FxHashMap<char, u16>,
    next_pua: &mut u32,
    glyph_id: u16,
) -> String {
    while *next_pua <= PUA_LAST {
        let c = char::from_u32(*next_pua).expect("the PUA contains no surrogates");
        *next_pua += 1;

        if !assigned.contains_key(&c) {
            assigned.insert(c, glyph_id);
            return c.to_string();
        }
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::{CharMap, CodeInfo};

    fn info(code: u32, text: &str, glyph_id: u16) -> CodeInfo {
        CodeInfo {
            code,
            single_to_unicode: Some(text.to_string()),
            glyph_id,
            ..CodeInfo::default()
        }
    }

    #[test]
    fn embedding_keeps_unique_outputs() {
        let map = CharMap::for_embedding(vec![info(1, "A", 10), info(2, "B", 11)]);
        assert_eq!(map.get(1).unwrap().text, "A");
        assert_eq!(map.get(2).unwrap().text, "B");
    }

    #[test]
    fn colliding_outputs_move_to_pua() {
        // Two glyphs, both claiming "A": the later code is reassigned.
        let map = CharMap::for_embedding(vec![info(1, "A", 10), info(2, "A", 11)]);
        assert_eq!(map.get(1).unwrap().text, "A");
        assert_eq!(map.get(2).unwrap().text, "\u{e000}");
    }

    #[test]
    fn same_glyph_may_share_its_scalar() {
        let map = CharMap::for_embedding(vec![info(1, "A", 10), info(2, "A", 10)]);
        assert_eq!(map.get(2).unwrap().text, "A");
    }

    #[test]
    fn control_characters_are_never_used() {
        let map = CharMap::for_embedding(vec![info(1, "\u{0007}", 10)]);
        assert_eq!(map.get(1).unwrap().text, "\u{e000}");
    }

    #[test]
    fn multi_char_output_moves_to_pua_when_embedding() {
        let mut c = CodeInfo {
            code: 1,
            glyph_id: 9,
            ..CodeInfo::default()
        };
        c.multi_to_unicode = Some("a/b".to_string());

        let map = CharMap::for_embedding(vec![c]);
        assert_eq!(map.get(1).unwrap().text, "\u{e000}");
    }

    #[test]
    fn ligatures_normalize_before_the_collision_check() {
        // U+FB01 normalizes to "fi", two chars, so it cannot address a
        // glyph and is reassigned.
        let map = CharMap::for_embedding(vec![info(1, "\u{fb01}", 4)]);
        assert_eq!(map.get(1).unwrap().text, "\u{e000}");
    }

    #[test]
    fn surrogate_pairs_count_as_one_character() {
        let map = CharMap::for_embedding(vec![info(1, "\u{1f600}", 21)]);
        assert_eq!(map.get(1).unwrap().text, "\u{1f600}");
    }

    #[test]
    fn pua_exhaustion_falls_back() {
        // One code claims "X" outright; 6400 more exhaust the area; the
        // straggler keeps .notdef semantics (no text).
        let mut codes: Vec<CodeInfo> = (0..=(0xf8ff - 0xe000 + 1) as u32)
            .map(|i| info(i, "X", (i + 1) as u16))
            .collect();
        codes.push(info(99999, "X", 60001));

        let map = CharMap::for_embedding(codes);
        assert_eq!(map.get(99999).unwrap().text, "");
    }

    #[test]
    fn extraction_keeps_rich_text() {
        let mut c = CodeInfo {
            code: 5,
            glyph_id: 0,
            ..CodeInfo::default()
        };
        c.multi_to_unicode = Some("ffi".to_string());

        let map = CharMap::for_extraction(vec![c]);
        assert_eq!(map.get(5).unwrap().text, "ffi");
    }

    #[test]
    fn extraction_allows_duplicates() {
        let map = CharMap::for_extraction(vec![info(1, "A", 10), info(2, "A", 11)]);
        assert_eq!(map.get(1).unwrap().text, "A");
        assert_eq!(map.get(2).unwrap().text, "A");
    }

    #[test]
    fn empty_to_unicode_yields_empty_text() {
        let mut c = CodeInfo {
            code: 9,
            glyph_id: 0,
            ..CodeInfo::default()
        };
        c.multi_to_unicode = Some(String::new());

        let map = CharMap::for_extraction(vec![c]);
        assert_eq!(map.get(9).unwrap().text, "");
    }

    #[test]
    fn font_mappings_cover_single_scalars() {
        let map = CharMap::for_embedding(vec![info(1, "A", 10), info(2, "A", 11)]);
        let mappings = map.font_mappings();

        assert!(mappings.contains(&(0x41, 10)));
        assert!(mappings.contains(&(0xe000, 11)));
    }
}
