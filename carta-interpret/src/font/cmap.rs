//! Parsing CMaps: the code → CID tables of composite fonts and the
//! code → Unicode tables of `/ToUnicode` streams.

use log::warn;
use rustc_hash::FxHashMap;

const MAX_RANGE: u32 = (1 << 24) - 1;

/// A parsed CMap.
#[derive(Debug, Clone, Default)]
pub struct CMap {
    /// Codespace ranges by byte length (1 to 4).
    codespace: [Vec<(u32, u32)>; 4],
    /// Single-value targets: CIDs, or single-scalar Unicode.
    map: FxHashMap<u32, u32>,
    /// Multi-scalar Unicode targets from `bfchar`/`bfrange` strings.
    strings: FxHashMap<u32, String>,
    name: String,
    vertical: bool,
}

impl CMap {
    /// The predefined Identity-H CMap: two-byte codes, code = CID.
    pub fn identity_h() -> Self {
        let mut cmap = CMap {
            name: "Identity-H".into(),
            ..CMap::default()
        };
        cmap.codespace[1].push((0, 0xffff));
        cmap
    }

    /// The predefined Identity-V CMap.
    pub fn identity_v() -> Self {
        let mut cmap = Self::identity_h();
        cmap.name = "Identity-V".into();
        cmap.vertical = true;
        cmap
    }

    /// Whether the writing mode is vertical.
    pub fn is_vertical(&self) -> bool {
        self.vertical
    }

    fn is_identity(&self) -> bool {
        self.name.starts_with("Identity-") && self.map.is_empty()
    }

    /// All codes with an explicit mapping.
    pub fn codes(&self) -> impl Iterator<Item = u32> + '_ {
        self.map.keys().copied().chain(self.strings.keys().copied())
    }

    /// The single-value target (a CID, or a single Unicode scalar) for a
    /// code.
    pub fn lookup(&self, code: u32) -> Option<u32> {
        if let Some(v) = self.map.get(&code) {
            Some(*v)
        } else if self.is_identity() && code <= 0xffff {
            Some(code)
        } else {
            None
        }
    }

    /// The Unicode text for a code, for ToUnicode CMaps.
    pub fn lookup_text(&self, code: u32) -> Option<String> {
        if let Some(s) = self.strings.get(&code) {
            return Some(s.clone());
        }

        self.map
            .get(&code)
            .and_then(|v| char::from_u32(*v))
            .map(|c| c.to_string())
    }

    /// Read the next code from `bytes` at `offset`, returning the code and
    /// how many bytes it spans. Codes outside every codespace range consume
    /// one byte.
    pub fn read_code(&self, bytes: &[u8], offset: usize) -> (u32, usize) {
        if offset >= bytes.len() {
            return (0, 1);
        }

        let mut code = 0u32;

        for n in 0..4usize.min(bytes.len() - offset) {
            code = (code << 8) | bytes[offset + n] as u32;

            for (low, high) in &self.codespace[n] {
                if (*low..=*high).contains(&code) {
                    return (code, n + 1);
                }
            }
        }

        (bytes[offset] as u32, 1)
    }

    /// The longest codespace byte length, a fallback for fonts whose CMap
    /// has no codespace declaration.
    pub fn max_code_len(&self) -> usize {
        (0..4)
            .rev()
            .find(|n| !self.codespace[*n].is_empty())
            .map(|n| n + 1)
            .unwrap_or(1)
    }

    fn add_codespace(&mut self, byte_len: usize, low: u32, high: u32) {
        if (1..=4).contains(&byte_len) {
            self.codespace[byte_len - 1].push((low, high));
        }
    }

    fn map_range(&mut self, low: u32, high: u32, dst: u32) {
        if high.saturating_sub(low) > MAX_RANGE {
            warn!("CMap range too large, ignoring");
            return;
        }

        for (i, code) in (low..=high).enumerate() {
            self.map.insert(code, dst + i as u32);
        }
    }
}

/// Parse the bytes of a CMap program.
pub fn parse(data: &[u8]) -> CMap {
    let mut cmap = CMap::default();
    let mut lexer = CMapLexer::new(data);
    // The two most recent non-command tokens, for name/value definitions.
    let mut pending: Vec<Tok> = vec![];

    while let Some(tok) = lexer.next() {
        match &tok {
            Tok::Command(cmd) => {
                match cmd.as_slice() {
                    b"endcmap" => break,
                    b"begincodespacerange" => parse_codespace(&mut cmap, &mut lexer),
                    b"begincidchar" => parse_cid_char(&mut cmap, &mut lexer),
                    b"begincidrange" => parse_cid_range(&mut cmap, &mut lexer),
                    b"beginbfchar" => parse_bf_char(&mut cmap, &mut lexer),
                    b"beginbfrange" => parse_bf_range(&mut cmap, &mut lexer),
                    b"def" => {
                        if let [Tok::Name(key), value] = pending.as_slice() {
                            match (key.as_slice(), value) {
                                (b"WMode", Tok::Int(v)) => cmap.vertical = *v != 0,
                                (b"CMapName", Tok::Name(n)) => {
                                    cmap.name = String::from_utf8_lossy(n).into_owned();
                                }
                                _ => {}
                            }
                        }
                        pending.clear();
                    }
                    _ => pending.clear(),
                }
            }
            other => {
                if pending.len() >= 2 {
                    pending.remove(0);
                }
                pending.push(other.clone());
            }
        }
    }

    cmap
}

fn parse_codespace(cmap: &mut CMap, lexer: &mut CMapLexer) {
    while let Some(tok) = lexer.next() {
        match tok {
            Tok::Command(c) if c == b"endcodespacerange" => return,
            Tok::Hex(low) => {
                let Some(Tok::Hex(high)) = lexer.next() else {
                    return;
                };
                cmap.add_codespace(high.len(), be_value(&low), be_value(&high));
            }
            _ => {}
        }
    }
}

fn parse_cid_char(cmap: &mut CMap, lexer: &mut CMapLexer) {
    while let Some(tok) = lexer.next() {
        match tok {
            Tok::Command(c) if c == b"endcidchar" => return,
            Tok::Hex(src) => {
                let Some(Tok::Int(dst)) = lexer.next() else {
                    return;
                };
                cmap.map.insert(be_value(&src), dst as u32);
            }
            _ => {}
        }
    }
}

fn parse_cid_range(cmap: &mut CMap, lexer: &mut CMapLexer) {
    while let Some(tok) = lexer.next() {
        match tok {
            Tok::Command(c) if c == b"endcidrange" => return,
            Tok::Hex(low) => {
                let (Some(Tok::Hex(high)), Some(Tok::Int(dst))) = (lexer.next(), lexer.next())
                else {
                    return;
                };
                cmap.map_range(be_value(&low), be_value(&high), dst as u32);
            }
            _ => {}
        }
    }
}

fn parse_bf_char(cmap: &mut CMap, lexer: &mut CMapLexer) {
    while let Some(tok) = lexer.next() {
        match tok {
            Tok::Command(c) if c == b"endbfchar" => return,
            Tok::Hex(src) => {
                let Some(Tok::Hex(dst)) = lexer.next() else {
                    return;
                };
                insert_bf_target(cmap, be_value(&src), &dst);
            }
            _ => {}
        }
    }
}

fn parse_bf_range(cmap: &mut CMap, lexer: &mut CMapLexer) {
    while let Some(tok) = lexer.next() {
        match tok {
            Tok::Command(c) if c == b"endbfrange" => return,
            Tok::Hex(low) => {
                let (Some(Tok::Hex(high)), Some(dst)) = (lexer.next(), lexer.next()) else {
                    return;
                };
                let (low, high) = (be_value(&low), be_value(&high));

                match dst {
                    Tok::Hex(first) => {
                        // The final bytes increment across the range.
                        let base = be_value(&first);
                        if first.len() > 2 {
                            for (i, code) in (low..=high.min(low + MAX_RANGE)).enumerate()
                            {
                                let mut bytes = first.clone();
                                let n = bytes.len();
                                let tail =
                                    u16::from_be_bytes([bytes[n - 2], bytes[n - 1]]);
                                let tail = tail.wrapping_add(i as u16);
                                bytes[n - 2..].copy_from_slice(&tail.to_be_bytes());
                                insert_bf_target(cmap, code, &bytes);
                            }
                        } else {
                            cmap.map_range(low, high, base);
                        }
                    }
                    Tok::Int(base) => cmap.map_range(low, high, base as u32),
                    Tok::ArrayOpen => {
                        let mut code = low;
                        while let Some(item) = lexer.next() {
                            match item {
                                Tok::ArrayClose => break,
                                Tok::Hex(bytes) => {
                                    insert_bf_target(cmap, code, &bytes);
                                    code += 1;
                                }
                                _ => {}
                            }
                        }
                    }
                    _ => return,
                }
            }
            _ => {}
        }
    }
}

/// A bf target is UTF-16BE text: one scalar goes into the single-value map,
/// several into the string map.
fn insert_bf_target(cmap: &mut CMap, code: u32, bytes: &[u8]) {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]))
        .collect();

    let text = String::from_utf16_lossy(&units);
    let mut chars = text.chars();

    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            cmap.map.insert(code, c as u32);
        }
        (Some(_), Some(_)) => {
            cmap.strings.insert(code, text);
        }
        // An empty target is meaningful: the code produces no text.
        (None, _) => {
            cmap.strings.insert(code, String::new());
        }
    }
}

fn be_value(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Int(i64),
    Hex(Vec<u8>),
    Name(Vec<u8>),
    Command(Vec<u8>),
    ArrayOpen,
    ArrayClose,
}

struct CMapLexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CMapLexer<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next(&mut self) -> Option<Tok> {
        loop {
            self.skip_ws();
            let b = *self.data.get(self.pos)?;

            return Some(match b {
                b'%' => {
                    while let Some(&c) = self.data.get(self.pos) {
                        self.pos += 1;
                        if c == b'\n' || c == b'\r' {
                            break;
                        }
                    }
                    continue;
                }
                b'[' => {
                    self.pos += 1;
                    Tok::ArrayOpen
                }
                b']' => {
                    self.pos += 1;
                    Tok::ArrayClose
                }
                b'<' => {
                    if self.data.get(self.pos + 1) == Some(&b'<') {
                        self.pos += 2;
                        Tok::Command(b"<<".to_vec())
                    } else {
                        self.hex()
                    }
                }
                b'>' => {
                    if self.data.get(self.pos + 1) == Some(&b'>') {
                        self.pos += 2;
                        Tok::Command(b">>".to_vec())
                    } else {
                        self.pos += 1;
                        continue;
                    }
                }
                b'/' => {
                    self.pos += 1;
                    Tok::Name(self.regular_run())
                }
                b'(' => {
                    // Literal strings appear in CIDSystemInfo; skip their
                    // content.
                    self.pos += 1;
                    let mut depth = 1;
                    while depth > 0 {
                        match self.data.get(self.pos) {
                            Some(b'(') => depth += 1,
                            Some(b')') => depth -= 1,
                            Some(b'\\') => self.pos += 1,
                            None => break,
                            _ => {}
                        }
                        self.pos += 1;
                    }
                    continue;
                }
                b'-' | b'+' | b'0'..=b'9' => {
                    let run = self.regular_run();
                    match std::str::from_utf8(&run).ok().and_then(|s| {
                        s.parse::<i64>()
                            .ok()
                            .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                    }) {
                        Some(i) => Tok::Int(i),
                        None => continue,
                    }
                }
                _ => Tok::Command(self.regular_run()),
            });
        }
    }

    fn hex(&mut self) -> Tok {
        self.pos += 1;
        let mut nibbles = vec![];

        while let Some(&b) = self.data.get(self.pos) {
            self.pos += 1;
            if b == b'>' {
                break;
            }
            if b.is_ascii_hexdigit() {
                nibbles.push(b);
            }
        }

        let mut bytes = Vec::with_capacity(nibbles.len().div_ceil(2));
        for pair in nibbles.chunks(2) {
            let hi = hex_val(pair[0]);
            let lo = pair.get(1).map(|b| hex_val(*b)).unwrap_or(0);
            bytes.push((hi << 4) | lo);
        }

        Tok::Hex(bytes)
    }

    fn regular_run(&mut self) -> Vec<u8> {
        let start = self.pos;
        while let Some(&b) = self.data.get(self.pos) {
            if b.is_ascii_whitespace() || b"[]<>(){}/%".contains(&b) {
                break;
            }
            self.pos += 1;
        }
        self.data[start..self.pos].to_vec()
    }

    fn skip_ws(&mut self) {
        while let Some(b) = self.data.get(self.pos) {
            if b.is_ascii_whitespace() || *b == 0 {
                self.pos += 1;
            } else {
                break;
            }
        }
    }
}

fn hex_val(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, CMap};

    #[test]
    fn bf_char() {
        let cmap = parse(b"2 beginbfchar\n<03> <0041>\n<04> <0042>\nendbfchar");
        assert_eq!(cmap.lookup_text(0x03).as_deref(), Some("A"));
        assert_eq!(cmap.lookup_text(0x04).as_deref(), Some("B"));
        assert_eq!(cmap.lookup_text(0x05), None);
    }

    #[test]
    fn bf_char_multi_scalar() {
        let cmap = parse(b"1 beginbfchar\n<05> <006600660069>\nendbfchar");
        assert_eq!(cmap.lookup_text(0x05).as_deref(), Some("ffi"));
        // Multi-scalar targets have no single-value mapping.
        assert_eq!(cmap.lookup(0x05), None);
    }

    #[test]
    fn bf_char_empty_target() {
        let cmap = parse(b"1 beginbfchar\n<06> <>\nendbfchar");
        assert_eq!(cmap.lookup_text(0x06).as_deref(), Some(""));
    }

    #[test]
    fn bf_range_increments() {
        let cmap = parse(b"1 beginbfrange\n<06> <0B> <0030>\nendbfrange");
        assert_eq!(cmap.lookup_text(0x06).as_deref(), Some("0"));
        assert_eq!(cmap.lookup_text(0x0b).as_deref(), Some("5"));
    }

    #[test]
    fn bf_range_array() {
        let cmap = parse(b"1 beginbfrange\n<0D> <0F> [<0058> <0059> <005A>]\nendbfrange");
        assert_eq!(cmap.lookup_text(0x0d).as_deref(), Some("X"));
        assert_eq!(cmap.lookup_text(0x0f).as_deref(), Some("Z"));
    }

    #[test]
    fn cid_range() {
        let cmap = parse(b"1 begincidrange\n<0016> <001B> 10\nendcidrange");
        assert_eq!(cmap.lookup(0x16), Some(10));
        assert_eq!(cmap.lookup(0x1b), Some(15));
        assert_eq!(cmap.lookup(0x1c), None);
    }

    #[test]
    fn codespace_drives_code_length() {
        let cmap = parse(
            b"1 begincodespacerange\n<00> <80>\nendcodespacerange\n\
              1 begincodespacerange\n<8140> <FEFE>\nendcodespacerange",
        );

        assert_eq!(cmap.read_code(&[0x42, 0x43], 0), (0x42, 1));
        assert_eq!(cmap.read_code(&[0x81, 0x50], 0), (0x8150, 2));
    }

    #[test]
    fn identity_h() {
        let cmap = CMap::identity_h();
        assert_eq!(cmap.lookup(0x1234), Some(0x1234));
        assert_eq!(cmap.read_code(&[0x12, 0x34], 0), (0x1234, 2));
        assert!(!cmap.is_vertical());
    }

    #[test]
    fn wmode_and_name() {
        let cmap = parse(b"/CMapName /Custom-V def /WMode 1 def");
        assert!(cmap.is_vertical());
    }

    #[test]
    fn postscript_wrapper_is_ignored() {
        let cmap = parse(
            b"/CIDInit /ProcSet findresource begin 12 dict begin begincmap\n\
              /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> def\n\
              /CMapName /Identity-H def /CMapType 2 def\n\
              1 begincodespacerange <0000> <FFFF> endcodespacerange\n\
              1 begincidrange <0000> <00FF> 0 endcidrange\n\
              endcmap CMapName currentdict /CMap defineresource pop end end",
        );

        assert_eq!(cmap.lookup(0x41), Some(0x41));
        assert_eq!(cmap.read_code(&[0x00, 0x41], 0), (0x41, 2));
    }
}
