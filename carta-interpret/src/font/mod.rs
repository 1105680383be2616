//! The font subsystem.
//!
//! A [`Font`] is materialized lazily from a resource dictionary and cached
//! per document. It carries the pieces §9.6 of the PDF reference scatters
//! across several dictionaries: the encoding, the widths, the embedded
//! program, the CMaps, and the [`CharMap`] built from all of them.

mod cff;
mod charmap;
mod cmap;
mod encoding;
mod glyph_names;
mod sfnt;
mod truetype;
mod type1;

pub use charmap::{CharMap, CharMapEntry, CodeInfo};
pub use cmap::CMap;
pub use encoding::{BaseEncoding, Encoding};

use carta_syntax::object::name::keys::*;
use carta_syntax::object::Array;
use carta_syntax::{Dict, Name, Object, Stream, XRef};
use glyph_names::unicode_for_glyph_name;
use log::warn;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};

/// What the caller knows about a font that needs a substitute.
#[derive(Debug, Clone, PartialEq)]
pub struct FontQuery {
    /// The `/BaseFont` name, with any subset prefix removed.
    pub base_name: String,
    /// Bold, from the name or descriptor.
    pub bold: bool,
    /// Italic, from the name or the descriptor flags.
    pub italic: bool,
    /// The serif descriptor flag.
    pub serif: bool,
    /// The fixed-pitch descriptor flag.
    pub monospace: bool,
}

/// The substitute a resolver picked: a CSS font-family plus style bits.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstituteFont {
    /// The family list, ready for a `font-family` attribute.
    pub family: String,
    /// Whether the substitute renders bold.
    pub bold: bool,
    /// Whether the substitute renders italic.
    pub italic: bool,
}

/// A pluggable substitute-font resolver.
pub type FontResolverFn = Arc<dyn Fn(&FontQuery) -> SubstituteFont + Send + Sync>;

/// The built-in resolver: the standard-14 alias table with generic
/// fallbacks by descriptor flags.
pub fn default_font_resolver() -> FontResolverFn {
    Arc::new(|query: &FontQuery| {
        let name = query.base_name.as_str();

        let family = if name.contains("Helvetica") || name.contains("Arial") {
            "Helvetica, Arial, sans-serif"
        } else if name.contains("Times") {
            "'Times New Roman', Times, serif"
        } else if name.contains("Courier") {
            "'Courier New', Courier, monospace"
        } else if name.contains("Symbol") {
            "Symbol"
        } else if name.contains("ZapfDingbats") || name.contains("Dingbats") {
            "'Zapf Dingbats', 'ITC Zapf Dingbats'"
        } else if query.monospace {
            "monospace"
        } else if query.serif {
            "serif"
        } else {
            "sans-serif"
        };

        SubstituteFont {
            family: family.to_string(),
            bold: query.bold,
            italic: query.italic,
        }
    })
}

/// One code decoded out of a shown string.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CodeUnit {
    /// The character code.
    pub code: u32,
    /// How many bytes the code spanned.
    pub byte_len: usize,
}

impl CodeUnit {
    /// Whether word spacing applies: a single-byte code 32.
    pub fn is_word_space(&self) -> bool {
        self.code == 32 && self.byte_len == 1
    }
}

#[derive(Debug)]
enum Kind {
    Simple(SimpleFont),
    Composite(CompositeFont),
    Type3(Type3Font),
}

#[derive(Debug)]
struct SimpleFont {
    encoding: Encoding,
    /// Whether `/Encoding` was given explicitly (priority 2) as opposed to
    /// being the non-symbolic default.
    explicit_encoding: bool,
    builtin_type1: Option<type1::Type1Font>,
    builtin_cff: Option<cff::CffFont>,
    first_char: u32,
    widths: Vec<f32>,
    missing_width: f32,
}

#[derive(Debug)]
struct CompositeFont {
    cmap: CMap,
    cid_to_gid: CidToGid,
    default_width: f32,
    widths: FxHashMap<u32, f32>,
    cff: Option<cff::CffFont>,
}

#[derive(Debug)]
enum CidToGid {
    Identity,
    Map(Vec<u16>),
}

#[derive(Debug)]
struct Type3Font {
    char_procs: Dict,
    resources: Option<Dict>,
    encoding: Encoding,
    font_matrix: [f32; 6],
    first_char: u32,
    widths: Vec<f32>,
}

struct Repr {
    base_name: String,
    kind: Kind,
    to_unicode: Option<CMap>,
    face: Option<truetype::Face>,
    substitute: SubstituteFont,
    char_map: OnceLock<CharMap>,
    embedded_output: OnceLock<Option<Arc<Vec<u8>>>>,
    xref: XRef,
}

/// A font entity, cheap to clone.
#[derive(Clone)]
pub struct Font(Arc<Repr>);

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Font({})", self.0.base_name)
    }
}

impl Font {
    /// Materialize a font from its dictionary. Returns `None` when the
    /// dictionary is too damaged to use; text shown in it is then skipped.
    pub fn load(dict: &Dict, xref: &XRef, resolver: &FontResolverFn) -> Option<Font> {
        let subtype = dict.get::<Name>(SUBTYPE, xref)?;
        let base_name = dict
            .get::<Name>(BASE_FONT, xref)
            .map(|n| strip_subset_prefix(n.as_str()).to_string())
            .unwrap_or_default();

        let (descriptor, kind) = match subtype.as_str() {
            "Type0" => load_composite(dict, xref)?,
            "Type3" => (None, load_type3(dict, xref)?),
            "Type1" | "MMType1" | "TrueType" => load_simple(dict, xref)?,
            other => {
                warn!("unknown font subtype {other}");
                return None;
            }
        };

        let flags = descriptor
            .as_ref()
            .and_then(|d| d.get::<u32>(FLAGS, xref))
            .unwrap_or(0);

        let query = FontQuery {
            base_name: base_name.clone(),
            bold: base_name.contains("Bold") || base_name.contains("bold"),
            italic: flags & (1 << 6) != 0
                || base_name.contains("Italic")
                || base_name.contains("Oblique"),
            serif: flags & (1 << 1) != 0,
            monospace: flags & 1 != 0,
        };

        let face = descriptor
            .as_ref()
            .and_then(|d| load_sfnt_program(d, xref))
            .and_then(truetype::Face::parse);

        let to_unicode = dict
            .get::<Stream>(TO_UNICODE, xref)
            .and_then(|s| s.decoded(xref).ok())
            .map(|data| cmap::parse(&data));

        Some(Font(Arc::new(Repr {
            base_name,
            kind,
            to_unicode,
            face,
            substitute: resolver(&query),
            char_map: OnceLock::new(),
            embedded_output: OnceLock::new(),
            xref: xref.clone(),
        })))
    }

    /// The `/BaseFont` name without its subset prefix.
    pub fn base_name(&self) -> &str {
        &self.0.base_name
    }

    /// The substitute picked by the resolver, used when the font is not
    /// embedded in the output.
    pub fn substitute(&self) -> &SubstituteFont {
        &self.0.substitute
    }

    /// Whether two handles denote the same materialized font.
    pub fn same_identity(&self, other: &Font) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// A stable key for deduplication.
    pub fn identity_key(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Split a shown string into character codes.
    pub fn decode_string(&self, bytes: &[u8]) -> Vec<CodeUnit> {
        match &self.0.kind {
            Kind::Simple(_) | Kind::Type3(_) => bytes
                .iter()
                .map(|b| CodeUnit {
                    code: *b as u32,
                    byte_len: 1,
                })
                .collect(),
            Kind::Composite(c) => {
                let mut out = vec![];
                let mut offset = 0;

                while offset < bytes.len() {
                    let (code, len) = c.cmap.read_code(bytes, offset);
                    out.push(CodeUnit {
                        code,
                        byte_len: len,
                    });
                    offset += len;
                }

                out
            }
        }
    }

    /// The advance width of a code, in glyph-space units (1000 per em).
    pub fn width(&self, code: u32) -> f32 {
        match &self.0.kind {
            Kind::Simple(s) => {
                if let Some(w) = code
                    .checked_sub(s.first_char)
                    .and_then(|i| s.widths.get(i as usize))
                {
                    return *w;
                }

                if let Some(advance) = self
                    .glyph_id(code)
                    .filter(|g| *g != 0)
                    .and_then(|g| self.0.face.as_ref()?.advance(g))
                {
                    return advance;
                }

                s.missing_width
            }
            Kind::Composite(c) => {
                let cid = c.cmap.lookup(code).unwrap_or(0);
                c.widths.get(&cid).copied().unwrap_or(c.default_width)
            }
            Kind::Type3(t) => code
                .checked_sub(t.first_char)
                .and_then(|i| t.widths.get(i as usize))
                .copied()
                .unwrap_or(0.0),
        }
    }

    /// The glyph index a code selects in the embedded program, when one can
    /// be determined.
    fn glyph_id(&self, code: u32) -> Option<u16> {
        match &self.0.kind {
            Kind::Simple(s) => {
                // A glyph name through the encodings first.
                let name = s
                    .encoding
                    .lookup(code as u8)
                    .map(str::to_string)
                    .or_else(|| builtin_glyph_name(s, code));

                if let Some(face) = &self.0.face {
                    if let Some(c) = name
                        .as_deref()
                        .and_then(unicode_for_glyph_name)
                        .and_then(|t| t.chars().next())
                    {
                        if let Some(gid) = face.glyph_for_char(c) {
                            return Some(gid);
                        }
                    }

                    return face.glyph_for_code(code);
                }

                if let Some(cff) = &s.builtin_cff {
                    return cff.glyph_for_code(code as u8);
                }

                None
            }
            Kind::Composite(c) => {
                let cid = c.cmap.lookup(code)?;

                match &c.cid_to_gid {
                    CidToGid::Identity => {
                        if let Some(cff) = &c.cff {
                            cff.glyph_for_cid(cid as u16)
                        } else {
                            Some(cid as u16)
                        }
                    }
                    CidToGid::Map(map) => map.get(cid as usize).copied(),
                }
            }
            Kind::Type3(_) => None,
        }
    }

    /// The character map, populated on first use. The embedding map is
    /// built when the output can reference the embedded program's glyphs;
    /// otherwise the extraction map.
    pub fn char_map(&self) -> &CharMap {
        self.0.char_map.get_or_init(|| {
            let codes = self.collect_code_infos();

            if self.0.face.is_some() {
                CharMap::for_embedding(codes)
            } else {
                CharMap::for_extraction(codes)
            }
        })
    }

    /// The output text for a code.
    pub fn text_for_code(&self, code: u32) -> String {
        self.char_map()
            .get(code)
            .map(|e| e.text.clone())
            .unwrap_or_default()
    }

    /// The glyph a code selects, through the character map.
    pub fn glyph_for_code(&self, code: u32) -> u16 {
        self.char_map().get(code).map(|e| e.glyph_id).unwrap_or(0)
    }

    /// The font program re-packaged for the output, with a `cmap` built
    /// from the character map. `None` when the font cannot be embedded.
    pub fn embedded_output_program(&self) -> Option<Arc<Vec<u8>>> {
        self.0
            .embedded_output
            .get_or_init(|| {
                let face = self.0.face.as_ref()?;
                let mappings = self.char_map().font_mappings();
                sfnt::rebuild_with_cmap(face.data(), &mappings).map(Arc::new)
            })
            .clone()
    }

    /// Whether the writing mode is vertical. Vertical text is laid out
    /// horizontally with a warning.
    pub fn is_vertical(&self) -> bool {
        match &self.0.kind {
            Kind::Composite(c) => c.cmap.is_vertical(),
            _ => false,
        }
    }

    /// Type 3 glyph procedure for a code, with the font's matrix and
    /// resources.
    pub fn type3_glyph(&self, code: u32) -> Option<(Stream, [f32; 6], Option<Dict>)> {
        let Kind::Type3(t) = &self.0.kind else {
            return None;
        };

        let name = t.encoding.lookup(code as u8)?;
        let proc = t.char_procs.get::<Stream>(name, &self.0.xref)?;

        Some((proc, t.font_matrix, t.resources.clone()))
    }

    /// Whether this is a Type 3 font.
    pub fn is_type3(&self) -> bool {
        matches!(self.0.kind, Kind::Type3(_))
    }

    fn collect_code_infos(&self) -> Vec<CodeInfo> {
        let to_unicode = self.0.to_unicode.as_ref();

        let split_to_unicode = |code: u32| -> (Option<String>, Option<String>) {
            match to_unicode.and_then(|c| c.lookup_text(code)) {
                Some(text) => {
                    let scalars = text.chars().count();
                    if scalars == 1 {
                        (Some(text), None)
                    } else {
                        (None, Some(text))
                    }
                }
                None => (None, None),
            }
        };

        match &self.0.kind {
            Kind::Simple(s) => (0u32..=255)
                .map(|code| {
                    let (single, multi) = split_to_unicode(code);

                    let encoding_text = if s.explicit_encoding {
                        s.encoding
                            .lookup(code as u8)
                            .and_then(unicode_for_glyph_name)
                    } else {
                        None
                    };

                    let builtin_text = builtin_glyph_name(s, code)
                        .as_deref()
                        .and_then(unicode_for_glyph_name)
                        .or_else(|| {
                            if s.explicit_encoding {
                                None
                            } else {
                                s.encoding
                                    .lookup(code as u8)
                                    .and_then(unicode_for_glyph_name)
                            }
                        });

                    CodeInfo {
                        code,
                        single_to_unicode: single,
                        encoding_text,
                        builtin_text,
                        multi_to_unicode: multi,
                        glyph_id: self.glyph_id(code).unwrap_or(0),
                    }
                })
                .collect(),
            Kind::Composite(c) => {
                let mut codes: Vec<u32> = c
                    .cmap
                    .codes()
                    .chain(to_unicode.into_iter().flat_map(|t| t.codes()))
                    .collect();
                codes.sort_unstable();
                codes.dedup();

                codes
                    .into_iter()
                    .map(|code| {
                        let (single, multi) = split_to_unicode(code);

                        CodeInfo {
                            code,
                            single_to_unicode: single,
                            encoding_text: None,
                            builtin_text: None,
                            multi_to_unicode: multi,
                            glyph_id: self.glyph_id(code).unwrap_or(0),
                        }
                    })
                    .collect()
            }
            Kind::Type3(t) => (0u32..=255)
                .map(|code| {
                    let (single, multi) = split_to_unicode(code);

                    CodeInfo {
                        code,
                        single_to_unicode: single,
                        encoding_text: t
                            .encoding
                            .lookup(code as u8)
                            .and_then(unicode_for_glyph_name),
                        builtin_text: None,
                        multi_to_unicode: multi,
                        glyph_id: 0,
                    }
                })
                .collect(),
        }
    }
}

/// The glyph name the font program itself maps a code to.
fn builtin_glyph_name(s: &SimpleFont, code: u32) -> Option<String> {
    if let Some(t1) = &s.builtin_type1 {
        if let Some(names) = &t1.builtin_encoding {
            let name = names.get(code as usize)?.clone()?;
            if t1.has_glyph(&name) {
                return Some(name);
            }
            return None;
        }
        if t1.standard_encoding {
            return Encoding::base(BaseEncoding::Standard)
                .lookup(code as u8)
                .filter(|n| t1.has_glyph(n))
                .map(str::to_string);
        }
    }

    if let Some(cff) = &s.builtin_cff {
        return cff.name_for_code(code as u8).map(str::to_string);
    }

    None
}

fn strip_subset_prefix(name: &str) -> &str {
    // Subset names look like `ABCDEF+Real-Name`.
    match name.split_once('+') {
        Some((prefix, rest)) if prefix.len() == 6 && prefix.bytes().all(|b| b.is_ascii_uppercase()) => {
            rest
        }
        _ => name,
    }
}

fn load_simple(dict: &Dict, xref: &XRef) -> Option<(Option<Dict>, Kind)> {
    let descriptor = dict.get::<Dict>(FONT_DESCRIPTOR, xref);
    let flags = descriptor
        .as_ref()
        .and_then(|d| d.get::<u32>(FLAGS, xref))
        .unwrap_or(0);
    let symbolic = flags & (1 << 2) != 0;

    let builtin_type1 = descriptor
        .as_ref()
        .and_then(|d| d.get::<Stream>(FONT_FILE, xref))
        .and_then(|s| s.decoded(xref).ok())
        .map(|data| type1::parse(&data));

    let builtin_cff = descriptor
        .as_ref()
        .and_then(|d| d.get::<Stream>(FONT_FILE3, xref))
        .filter(|s| {
            s.dict()
                .get::<Name>(SUBTYPE, xref)
                .is_some_and(|n| n.as_str() == "Type1C" || n.as_str() == "CIDFontType0C")
        })
        .and_then(|s| s.decoded(xref).ok())
        .and_then(|data| cff::parse(&data));

    // Symbolic fonts default to their built-in encoding; others to
    // StandardEncoding.
    let fallback = if symbolic {
        BaseEncoding::MacExpert // an empty table; the built-in takes over
    } else {
        BaseEncoding::Standard
    };

    let explicit_encoding = dict.contains_key(ENCODING);
    let encoding = Encoding::from_font_entry(dict.get_raw(ENCODING), fallback, xref);

    let first_char = dict.get::<u32>(FIRST_CHAR, xref).unwrap_or(0);
    let widths = dict.get::<Vec<f32>>(WIDTHS, xref).unwrap_or_default();
    let missing_width = descriptor
        .as_ref()
        .and_then(|d| d.get::<f32>(MISSING_WIDTH, xref))
        .unwrap_or(0.0);

    Some((
        descriptor,
        Kind::Simple(SimpleFont {
            encoding,
            explicit_encoding,
            builtin_type1,
            builtin_cff,
            first_char,
            widths,
            missing_width,
        }),
    ))
}

fn load_composite(dict: &Dict, xref: &XRef) -> Option<(Option<Dict>, Kind)> {
    let descendant = dict
        .get::<Array>(DESCENDANT_FONTS, xref)?
        .get::<Dict>(0, xref)?;

    let descriptor = descendant.get::<Dict>(FONT_DESCRIPTOR, xref);

    let cmap = match dict.get_raw(ENCODING).map(|o| xref.resolve(o)) {
        Some(Object::Name(n)) => match n.as_str() {
            "Identity-H" => CMap::identity_h(),
            "Identity-V" => CMap::identity_v(),
            other => {
                // Predefined CMaps beyond the identity pair would need the
                // CMap resource files; fall back to two-byte identity.
                warn!("predefined CMap {other} is not bundled, assuming Identity-H");
                CMap::identity_h()
            }
        },
        Some(Object::Stream(s)) => {
            let data = s.decoded(xref).ok()?;
            cmap::parse(&data)
        }
        _ => CMap::identity_h(),
    };

    let cid_to_gid = match descendant.get_raw(CID_TO_GID_MAP).map(|o| xref.resolve(o)) {
        Some(Object::Stream(s)) => {
            let data = s.decoded(xref).ok()?;
            CidToGid::Map(
                data.chunks(2)
                    .map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]))
                    .collect(),
            )
        }
        _ => CidToGid::Identity,
    };

    let default_width = descendant.get::<f32>(DW, xref).unwrap_or(1000.0);
    let widths = parse_cid_widths(&descendant, xref);

    let cff = descriptor
        .as_ref()
        .and_then(|d| d.get::<Stream>(FONT_FILE3, xref))
        .and_then(|s| s.decoded(xref).ok())
        .and_then(|data| cff::parse(&data));

    Some((
        descriptor,
        Kind::Composite(CompositeFont {
            cmap,
            cid_to_gid,
            default_width,
            widths,
            cff,
        }),
    ))
}

/// The `/W` array: `c [w…]` runs and `cFirst cLast w` ranges.
fn parse_cid_widths(descendant: &Dict, xref: &XRef) -> FxHashMap<u32, f32> {
    let mut out = FxHashMap::default();

    let Some(w) = descendant.get::<Array>(W, xref) else {
        return out;
    };

    let items: Vec<Object> = w.iter().map(|o| xref.resolve(o)).collect();
    let mut i = 0;

    while i < items.len() {
        let Some(first) = items[i].as_i64() else {
            break;
        };

        match items.get(i + 1) {
            Some(Object::Array(list)) => {
                for (k, width) in list.typed::<f32>(xref).enumerate() {
                    out.insert(first as u32 + k as u32, width);
                }
                i += 2;
            }
            Some(other) => {
                let (Some(last), Some(width)) =
                    (other.as_i64(), items.get(i + 2).and_then(Object::as_f32))
                else {
                    break;
                };

                for cid in first..=last.min(first + 65535) {
                    out.insert(cid as u32, width);
                }
                i += 3;
            }
            None => break,
        }
    }

    out
}

fn load_type3(dict: &Dict, xref: &XRef) -> Option<Kind> {
    let char_procs = dict.get::<Dict>(CHAR_PROCS, xref)?;
    let encoding = Encoding::from_font_entry(dict.get_raw(ENCODING), BaseEncoding::MacExpert, xref);

    let font_matrix = dict
        .get::<Vec<f32>>(FONT_MATRIX, xref)
        .filter(|m| m.len() == 6)
        .map(|m| [m[0], m[1], m[2], m[3], m[4], m[5]])
        .unwrap_or([0.001, 0.0, 0.0, 0.001, 0.0, 0.0]);

    Some(Kind::Type3(Type3Font {
        char_procs,
        resources: dict.get::<Dict>(RESOURCES, xref),
        encoding,
        font_matrix,
        first_char: dict.get::<u32>(FIRST_CHAR, xref).unwrap_or(0),
        widths: dict.get::<Vec<f32>>(WIDTHS, xref).unwrap_or_default(),
    }))
}

/// The sfnt-housed program of a font, from `/FontFile2` or an OpenType
/// `/FontFile3`.
fn load_sfnt_program(descriptor: &Dict, xref: &XRef) -> Option<Arc<[u8]>> {
    if let Some(stream) = descriptor.get::<Stream>(FONT_FILE2, xref) {
        return stream.decoded(xref).ok().map(|d| Arc::from(d.to_vec()));
    }

    let stream = descriptor.get::<Stream>(FONT_FILE3, xref)?;
    let subtype = stream.dict().get::<Name>(SUBTYPE, xref)?;

    if subtype.as_str() == "OpenType" {
        return stream.decoded(xref).ok().map(|d| Arc::from(d.to_vec()));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use carta_syntax::Document;

    fn load_font(font_body: &[u8], extra: impl FnOnce(carta_syntax::test_pdf::PdfBuilder) -> carta_syntax::test_pdf::PdfBuilder) -> Font {
        let builder = carta_syntax::test_pdf::PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [] /Count 0 >>")
            .object(3, font_body);
        let data = extra(builder).build();

        let doc = Document::load(data).unwrap();
        let xref = doc.xref().clone();
        let dict = xref.get(carta_syntax::ObjRef::new(3, 0));

        Font::load(
            dict.as_dict().unwrap(),
            &xref,
            &default_font_resolver(),
        )
        .unwrap()
    }

    #[test]
    fn simple_font_widths() {
        let font = load_font(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
              /FirstChar 65 /LastChar 67 /Widths [500 600 700] >>",
            |b| b,
        );

        assert_eq!(font.width(65), 500.0);
        assert_eq!(font.width(67), 700.0);
        assert_eq!(font.width(68), 0.0);
    }

    #[test]
    fn win_ansi_text() {
        let font = load_font(
            b"<< /Type /Font /Subtype /TrueType /BaseFont /ABCDEF+Arial \
              /Encoding /WinAnsiEncoding >>",
            |b| b,
        );

        assert_eq!(font.base_name(), "Arial");
        assert_eq!(font.text_for_code(b'H' as u32), "H");
        assert_eq!(font.text_for_code(0x95), "\u{2022}");
    }

    #[test]
    fn to_unicode_takes_priority() {
        let font = load_font(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /F \
              /Encoding /WinAnsiEncoding /ToUnicode 4 0 R >>",
            |b| {
                b.stream(
                    4,
                    b"<< >>",
                    b"1 beginbfchar\n<41> <0058>\nendbfchar",
                )
            },
        );

        // /ToUnicode says code 0x41 is "X", overriding WinAnsi's "A".
        assert_eq!(font.text_for_code(0x41), "X");
        assert_eq!(font.text_for_code(0x42), "B");
    }

    #[test]
    fn to_unicode_empty_string_survives() {
        let font = load_font(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /F /ToUnicode 4 0 R >>",
            |b| b.stream(4, b"<< >>", b"1 beginbfchar\n<41> <>\nendbfchar"),
        );

        assert_eq!(font.text_for_code(0x41), "");
    }

    #[test]
    fn composite_code_decoding() {
        let font = load_font(
            b"<< /Type /Font /Subtype /Type0 /BaseFont /F /Encoding /Identity-H \
              /DescendantFonts [4 0 R] >>",
            |b| {
                b.object(
                    4,
                    b"<< /Type /Font /Subtype /CIDFontType2 /BaseFont /F \
                      /DW 750 /W [1 [500] 5 9 600] >>",
                )
            },
        );

        let units = font.decode_string(&[0x00, 0x01, 0x00, 0x05]);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].code, 1);
        assert_eq!(units[1].code, 5);

        assert_eq!(font.width(1), 500.0);
        assert_eq!(font.width(7), 600.0);
        assert_eq!(font.width(100), 750.0);
    }

    #[test]
    fn subset_prefix_is_stripped() {
        assert_eq!(strip_subset_prefix("ABCDEF+Foo"), "Foo");
        assert_eq!(strip_subset_prefix("AbCDEF+Foo"), "AbCDEF+Foo");
        assert_eq!(strip_subset_prefix("Foo"), "Foo");
    }
}
