//! Reading bare CFF font programs: enough structure to recover the built-in
//! encoding (code → glyph) and the charset (glyph → name), which feed the
//! character map. Charstrings are never interpreted.

use log::warn;

/// The parts of a CFF program the font subsystem consumes.
#[derive(Debug, Default)]
pub struct CffFont {
    /// code → glyph id, from the built-in encoding.
    encoding: Vec<(u8, u16)>,
    /// glyph id → name, from the charset.
    names: Vec<Option<String>>,
    /// Whether the program is CID-keyed; such programs map charset entries
    /// to CIDs instead of names.
    pub is_cid: bool,
    /// glyph id → CID for CID-keyed programs.
    cids: Vec<u16>,
    /// The number of glyphs.
    pub n_glyphs: u16,
}

impl CffFont {
    /// The glyph id selected by a code through the built-in encoding.
    pub fn glyph_for_code(&self, code: u8) -> Option<u16> {
        self.encoding
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, gid)| *gid)
    }

    /// The name of a glyph, from the charset.
    pub fn glyph_name(&self, gid: u16) -> Option<&str> {
        self.names.get(gid as usize)?.as_deref()
    }

    /// The glyph name selected by a code: encoding then charset.
    pub fn name_for_code(&self, code: u8) -> Option<&str> {
        self.glyph_name(self.glyph_for_code(code)?)
    }

    /// The glyph id for a CID in a CID-keyed program.
    pub fn glyph_for_cid(&self, cid: u16) -> Option<u16> {
        if self.cids.is_empty() {
            // An absent charset means identity.
            return (cid < self.n_glyphs).then_some(cid);
        }

        self.cids
            .iter()
            .position(|c| *c == cid)
            .map(|gid| gid as u16)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn u8(&mut self) -> Option<u8> {
        let v = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    fn u16(&mut self) -> Option<u16> {
        Some(u16::from_be_bytes([self.u8()?, self.u8()?]))
    }

    fn offset(&mut self, off_size: u8) -> Option<usize> {
        let mut v = 0usize;
        for _ in 0..off_size {
            v = (v << 8) | self.u8()? as usize;
        }
        Some(v)
    }
}

/// An INDEX: count, offset size, offsets, data. The reader is left at the
/// first byte after the INDEX.
struct Index<'a> {
    items: Vec<&'a [u8]>,
}

fn read_index<'a>(r: &mut Reader<'a>) -> Option<Index<'a>> {
    let count = r.u16()? as usize;

    if count == 0 {
        return Some(Index { items: vec![] });
    }

    let off_size = r.u8()?;
    if !(1..=4).contains(&off_size) {
        return None;
    }

    let mut offsets = Vec::with_capacity(count + 1);
    for _ in 0..=count {
        offsets.push(r.offset(off_size)?);
    }

    let data_start = r.pos;
    let mut items = Vec::with_capacity(count);
    for pair in offsets.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a < 1 || b < a {
            return None;
        }
        items.push(r.data.get(data_start + a - 1..data_start + b - 1)?);
    }

    r.pos = data_start + offsets.last()? - 1;
    Some(Index { items })
}

/// Parse a CFF program.
pub fn parse(data: &[u8]) -> Option<CffFont> {
    let hdr_size = *data.get(2)?;
    let mut r = Reader::new(data, hdr_size as usize);

    let _names = read_index(&mut r)?;
    let top_dicts = read_index(&mut r)?;
    let strings = read_index(&mut r)?;

    let top = parse_dict(top_dicts.items.first()?);

    let get1 = |op: u16| -> Option<f64> {
        top.iter()
            .find(|(o, _)| *o == op)
            .and_then(|(_, v)| v.last().copied())
    };

    let is_cid = top.iter().any(|(op, _)| *op == 0x0c1e);
    let charstrings_off = get1(17)? as usize;
    let charset_off = get1(15).unwrap_or(0.0) as usize;
    let encoding_off = get1(16).unwrap_or(0.0) as usize;

    let n_glyphs = {
        let mut cr = Reader::new(data, charstrings_off);
        read_index(&mut cr)?;
        let mut cr = Reader::new(data, charstrings_off);
        cr.u16()?
    };

    let mut font = CffFont {
        is_cid,
        n_glyphs,
        ..CffFont::default()
    };

    // Charset: glyph → SID (or CID).
    let sids: Vec<u16> = match charset_off {
        // ISOAdobe / predefined charsets: SID equals glyph id closely
        // enough for the name range this reader carries.
        0 | 1 | 2 => (0..n_glyphs).collect(),
        off => read_charset(data, off, n_glyphs).unwrap_or_default(),
    };

    if is_cid {
        font.cids = sids;
    } else {
        font.names = sids
            .iter()
            .map(|sid| sid_to_name(*sid, &strings))
            .collect();
    }

    if !is_cid {
        font.encoding = match encoding_off {
            // The standard encodings are resolved by name through the
            // charset, matching how codes reach glyphs there.
            0 | 1 => standard_encoding_mapping(&font),
            off => read_encoding(data, off).unwrap_or_default(),
        };
    }

    Some(font)
}

/// Map codes through Adobe StandardEncoding names onto this font's glyphs.
fn standard_encoding_mapping(font: &CffFont) -> Vec<(u8, u16)> {
    use super::encoding::{BaseEncoding, Encoding};

    let table = Encoding::base(BaseEncoding::Standard);
    let mut out = vec![];

    for code in 0..=255u8 {
        if let Some(name) = table.lookup(code) {
            if let Some(gid) = font
                .names
                .iter()
                .position(|n| n.as_deref() == Some(name))
            {
                out.push((code, gid as u16));
            }
        }
    }

    out
}

fn read_charset(data: &[u8], offset: usize, n_glyphs: u16) -> Option<Vec<u16>> {
    let mut r = Reader::new(data, offset);
    let format = r.u8()?;

    // Glyph 0 is always .notdef with SID 0.
    let mut sids = vec![0u16];

    match format {
        0 => {
            while sids.len() < n_glyphs as usize {
                sids.push(r.u16()?);
            }
        }
        1 | 2 => {
            while sids.len() < n_glyphs as usize {
                let first = r.u16()?;
                let n_left = if format == 1 {
                    r.u8()? as u16
                } else {
                    r.u16()?
                };

                for i in 0..=n_left {
                    if sids.len() >= n_glyphs as usize {
                        break;
                    }
                    sids.push(first + i);
                }
            }
        }
        other => {
            warn!("unknown CFF charset format {other}");
            return None;
        }
    }

    Some(sids)
}

fn read_encoding(data: &[u8], offset: usize) -> Option<Vec<(u8, u16)>> {
    let mut r = Reader::new(data, offset);
    let format = r.u8()?;
    let mut out = vec![];

    match format & 0x7f {
        0 => {
            let n_codes = r.u8()?;
            for gid in 1..=n_codes as u16 {
                out.push((r.u8()?, gid));
            }
        }
        1 => {
            let n_ranges = r.u8()?;
            let mut gid = 1u16;
            for _ in 0..n_ranges {
                let first = r.u8()?;
                let n_left = r.u8()?;
                for i in 0..=n_left as u16 {
                    out.push((first.saturating_add(i as u8), gid));
                    gid += 1;
                }
            }
        }
        other => {
            warn!("unknown CFF encoding format {other}");
            return None;
        }
    }

    // Supplements re-map additional codes to SIDs; rare, skipped.
    Some(out)
}

/// Operands in a CFF DICT, keyed by operator (two-byte operators are
/// `0x0c00 | b1`).
fn parse_dict(data: &[u8]) -> Vec<(u16, Vec<f64>)> {
    let mut out = vec![];
    let mut operands: Vec<f64> = vec![];
    let mut pos = 0usize;

    while pos < data.len() {
        let b0 = data[pos];

        match b0 {
            0..=21 => {
                let op = if b0 == 12 {
                    pos += 1;
                    0x0c00 | *data.get(pos).unwrap_or(&0) as u16
                } else {
                    b0 as u16
                };
                pos += 1;
                out.push((op, std::mem::take(&mut operands)));
            }
            28 => {
                let v = i16::from_be_bytes([
                    *data.get(pos + 1).unwrap_or(&0),
                    *data.get(pos + 2).unwrap_or(&0),
                ]);
                operands.push(v as f64);
                pos += 3;
            }
            29 => {
                let mut v = 0i32;
                for i in 1..=4 {
                    v = (v << 8) | *data.get(pos + i).unwrap_or(&0) as i32;
                }
                operands.push(v as f64);
                pos += 5;
            }
            30 => {
                // Packed BCD real; consumed but only needed as a number.
                let (value, len) = parse_real(&data[pos + 1..]);
                operands.push(value);
                pos += 1 + len;
            }
            32..=246 => {
                operands.push(b0 as f64 - 139.0);
                pos += 1;
            }
            247..=250 => {
                let b1 = *data.get(pos + 1).unwrap_or(&0) as f64;
                operands.push((b0 as f64 - 247.0) * 256.0 + b1 + 108.0);
                pos += 2;
            }
            251..=254 => {
                let b1 = *data.get(pos + 1).unwrap_or(&0) as f64;
                operands.push(-(b0 as f64 - 251.0) * 256.0 - b1 - 108.0);
                pos += 2;
            }
            _ => pos += 1,
        }
    }

    out
}

fn parse_real(data: &[u8]) -> (f64, usize) {
    let mut text = String::new();
    let mut len = 0usize;

    'outer: for b in data {
        len += 1;
        for nibble in [b >> 4, b & 0xf] {
            match nibble {
                0..=9 => text.push((b'0' + nibble) as char),
                0xa => text.push('.'),
                0xb => text.push('E'),
                0xc => text.push_str("E-"),
                0xe => text.push('-'),
                0xf => break 'outer,
                _ => {}
            }
        }
    }

    (text.parse().unwrap_or(0.0), len)
}

fn sid_to_name(sid: u16, strings: &Index) -> Option<String> {
    if sid >= 391 {
        return strings
            .items
            .get(sid as usize - 391)
            .and_then(|s| std::str::from_utf8(s).ok())
            .map(|s| s.to_string());
    }

    STANDARD_STRINGS
        .get(sid as usize)
        .map(|s| (*s).to_string())
}

/// The leading portion of the CFF standard strings: `.notdef` plus the Latin
/// text set. Expert-set SIDs above this range resolve to no name.
#[rustfmt::skip]
const STANDARD_STRINGS: &[&str] = &[
    ".notdef", "space", "exclam", "quotedbl", "numbersign", "dollar",
    "percent", "ampersand", "quoteright", "parenleft", "parenright",
    "asterisk", "plus", "comma", "hyphen", "period", "slash", "zero", "one",
    "two", "three", "four", "five", "six", "seven", "eight", "nine", "colon",
    "semicolon", "less", "equal", "greater", "question", "at", "A", "B", "C",
    "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q",
    "R", "S", "T", "U", "V", "W", "X", "Y", "Z", "bracketleft", "backslash",
    "bracketright", "asciicircum", "underscore", "quoteleft", "a", "b", "c",
    "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q",
    "r", "s", "t", "u", "v", "w", "x", "y", "z", "braceleft", "bar",
    "braceright", "asciitilde", "exclamdown", "cent", "sterling", "fraction",
    "yen", "florin", "section", "currency", "quotesingle", "quotedblleft",
    "guillemotleft", "guilsinglleft", "guilsinglright", "fi", "fl", "endash",
    "dagger", "daggerdbl", "periodcentered", "paragraph", "bullet",
    "quotesinglbase", "quotedblbase", "quotedblright", "guillemotright",
    "ellipsis", "perthousand", "questiondown", "grave", "acute",
    "circumflex", "tilde", "macron", "breve", "dotaccent", "dieresis",
    "ring", "cedilla", "hungarumlaut", "ogonek", "caron", "emdash", "AE",
    "ordfeminine", "Lslash", "Oslash", "OE", "ordmasculine", "ae",
    "dotlessi", "lslash", "oslash", "oe", "germandbls", "onesuperior",
    "logicalnot", "mu", "trademark", "Eth", "onehalf", "plusminus", "Thorn",
    "onequarter", "divide", "brokenbar", "degree", "thorn", "threequarters",
    "twosuperior", "registered", "minus", "eth", "multiply",
    "threesuperior", "copyright", "Aacute", "Acircumflex", "Adieresis",
    "Agrave", "Aring", "Atilde", "Ccedilla", "Eacute", "Ecircumflex",
    "Edieresis", "Egrave", "Iacute", "Icircumflex", "Idieresis", "Igrave",
    "Ntilde", "Oacute", "Ocircumflex", "Odieresis", "Ograve", "Otilde",
    "Scaron", "Uacute", "Ucircumflex", "Udieresis", "Ugrave", "Yacute",
    "Ydieresis", "Zcaron", "aacute", "acircumflex", "adieresis", "agrave",
    "aring", "atilde", "ccedilla", "eacute", "ecircumflex", "edieresis",
    "egrave", "iacute", "icircumflex", "idieresis", "igrave", "ntilde",
    "oacute", "ocircumflex", "odieresis", "ograve", "otilde", "scaron",
    "uacute", "ucircumflex", "udieresis", "ugrave", "yacute", "ydieresis",
    "zcaron",
];

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a minimal CFF with two glyphs (.notdef, eacute), a format-0
    /// charset and a format-0 encoding mapping code 0xE9.
    fn tiny_cff() -> Vec<u8> {
        let mut out = vec![1, 0, 4, 2]; // header: major, minor, hdrSize, offSize
        // Name INDEX: one name.
        out.extend_from_slice(&[0, 1, 1, 1, 5]);
        out.extend_from_slice(b"Tiny");

        // Top DICT INDEX built after the fact; compute the dict body first.
        // charset op 15, encoding op 16, charstrings op 17.
        // Offsets are patched below once positions are known.
        let dict_placeholder = |off: u8, op: u8| -> Vec<u8> {
            // 29 = 4-byte int operand.
            vec![29, 0, 0, 0, off, op]
        };

        // Layout after Top DICT INDEX and String INDEX and gsubr INDEX:
        // positions are computed by building the tail first.
        let mut tail: Vec<u8> = vec![];

        // String INDEX: empty.
        let string_index = vec![0u8, 0];
        // Global subr INDEX: empty.
        let gsubr_index = vec![0u8, 0];

        // charset (format 0): glyph 1 has SID 233 (eacute = 391? no:
        // standard SID for eacute is 0xE9-ish; use the table index).
        let eacute_sid = STANDARD_STRINGS
            .iter()
            .position(|s| *s == "eacute")
            .unwrap() as u16;
        let charset = {
            let mut v = vec![0u8];
            v.extend_from_slice(&eacute_sid.to_be_bytes());
            v
        };

        // encoding (format 0): one code, 0xE9 → glyph 1.
        let encoding = vec![0u8, 1, 0xE9];

        // CharStrings INDEX: two one-byte dummy strings.
        let charstrings = vec![0u8, 2, 1, 1, 2, 3, 0x0e, 0x0e];

        // The top dict references tail positions; lay the tail out at a
        // fixed base and patch the operand bytes.
        let top_dict_body_len = dict_placeholder(0, 15).len() * 3;
        let top_dict_index_len = 2 + 1 + 2 + top_dict_body_len;
        let base = out.len()
            + top_dict_index_len
            + string_index.len()
            + gsubr_index.len();

        let charset_pos = base;
        let encoding_pos = charset_pos + charset.len();
        let charstrings_pos = encoding_pos + encoding.len();

        let mut top_dict = vec![];
        for (pos, op) in [
            (charset_pos, 15u8),
            (encoding_pos, 16),
            (charstrings_pos, 17),
        ] {
            top_dict.push(29);
            top_dict.extend_from_slice(&(pos as u32).to_be_bytes());
            top_dict.push(op);
        }
        assert_eq!(top_dict.len(), top_dict_body_len);

        // Top DICT INDEX: one item.
        out.extend_from_slice(&[0, 1, 1, 1]);
        out.push(1 + top_dict.len() as u8);
        out.extend_from_slice(&top_dict);

        out.extend_from_slice(&string_index);
        out.extend_from_slice(&gsubr_index);

        tail.extend_from_slice(&charset);
        tail.extend_from_slice(&encoding);
        tail.extend_from_slice(&charstrings);
        out.extend_from_slice(&tail);

        out
    }

    #[test]
    fn charset_and_encoding() {
        let font = parse(&tiny_cff()).unwrap();

        assert_eq!(font.n_glyphs, 2);
        assert_eq!(font.glyph_for_code(0xE9), Some(1));
        assert_eq!(font.glyph_name(1), Some("eacute"));
        assert_eq!(font.name_for_code(0xE9), Some("eacute"));
        assert_eq!(font.glyph_for_code(0x41), None);
    }

    #[test]
    fn dict_number_forms() {
        // 139 encodes 0; 247/108 pairs; 28 = i16.
        let ops = parse_dict(&[139, 17]);
        assert_eq!(ops, vec![(17u16, vec![0.0])]);

        let ops = parse_dict(&[28, 0x01, 0x00, 15]);
        assert_eq!(ops, vec![(15u16, vec![256.0])]);
    }
}
