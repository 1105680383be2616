//! Reading Type 1 font programs.
//!
//! Only the cleartext portion matters here: the built-in `/Encoding` array
//! feeds the character map. The eexec-encrypted portion is decrypted so the
//! cleartext scan cannot run off into ciphertext, but charstrings themselves
//! are never interpreted.

use log::warn;

/// The parts of a Type 1 program the font subsystem consumes.
#[derive(Debug, Default)]
pub struct Type1Font {
    /// The built-in encoding, when the program declares a custom one.
    pub builtin_encoding: Option<Vec<Option<String>>>,
    /// Whether the program declares `StandardEncoding`.
    pub standard_encoding: bool,
    /// The glyph names defined in `/CharStrings`.
    pub glyph_names: Vec<String>,
}

impl Type1Font {
    /// Whether the program defines a glyph with the given name. An empty
    /// glyph list (a program whose private section failed to decrypt) is
    /// treated as covering everything.
    pub fn has_glyph(&self, name: &str) -> bool {
        self.glyph_names.is_empty() || self.glyph_names.iter().any(|n| n == name)
    }
}

/// Parse a Type 1 program: the cleartext `/Encoding`, plus the glyph names
/// from the eexec-encrypted `/CharStrings`.
pub fn parse(data: &[u8]) -> Type1Font {
    let data = strip_pfb(data);

    // The cleartext runs up to the `eexec` keyword.
    let clear_end = find(data, b"eexec").unwrap_or(data.len());
    let clear = &data[..clear_end];

    let mut font = Type1Font::default();

    if clear_end < data.len() {
        let encrypted = &data[clear_end + b"eexec".len()..];
        let private = eexec_decrypt(skip_eexec_whitespace(encrypted), 55665, 4);
        font.glyph_names = charstring_names(&private);
    }

    let Some(enc_pos) = find(clear, b"/Encoding") else {
        return font;
    };
    let tail = &clear[enc_pos + b"/Encoding".len()..];

    if find(&tail[..tail.len().min(64)], b"StandardEncoding").is_some() {
        font.standard_encoding = true;
        return font;
    }

    // Custom encodings are a run of `dup <code> /<name> put` statements.
    let mut names: Vec<Option<String>> = vec![None; 256];
    let mut found_any = false;
    let mut pos = 0;

    while let Some(dup) = find(&tail[pos..], b"dup ") {
        let stmt_start = pos + dup + 4;

        // The encoding section ends at its `def`.
        if let Some(def) = find(&tail[pos..], b" def") {
            if def < dup {
                break;
            }
        }

        let rest = &tail[stmt_start..];
        match parse_dup(rest) {
            Some((code, name, consumed)) => {
                if code < 256 {
                    names[code] = Some(name);
                    found_any = true;
                }
                pos = stmt_start + consumed;
            }
            None => pos = stmt_start,
        }
    }

    if found_any {
        font.builtin_encoding = Some(names);
    }

    font
}

/// Parse `<code> /<name> put` after a `dup`.
fn parse_dup(data: &[u8]) -> Option<(usize, String, usize)> {
    let mut pos = 0;

    let skip_ws = |pos: &mut usize| {
        while data.get(*pos).is_some_and(|b| b.is_ascii_whitespace()) {
            *pos += 1;
        }
    };

    skip_ws(&mut pos);
    let digits_start = pos;
    while data.get(pos).is_some_and(|b| b.is_ascii_digit()) {
        pos += 1;
    }
    let code: usize = std::str::from_utf8(&data[digits_start..pos])
        .ok()?
        .parse()
        .ok()?;

    skip_ws(&mut pos);
    if data.get(pos) != Some(&b'/') {
        return None;
    }
    pos += 1;

    let name_start = pos;
    while data
        .get(pos)
        .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'/')
    {
        pos += 1;
    }
    let name = std::str::from_utf8(&data[name_start..pos]).ok()?.to_string();

    skip_ws(&mut pos);
    if !data[pos..].starts_with(b"put") {
        return None;
    }

    Some((code, name, pos + 3))
}

/// Drop PFB segment headers (0x80 0x01/0x02 + length), leaving the raw
/// program bytes.
fn strip_pfb(data: &[u8]) -> &[u8] {
    if data.first() == Some(&0x80) {
        // Only the first (cleartext) segment is needed.
        if data.len() >= 6 {
            let len = u32::from_le_bytes([data[2], data[3], data[4], data[5]]) as usize;
            if let Some(segment) = data.get(6..6 + len) {
                return segment;
            }
            warn!("truncated PFB segment");
        }
        return &data[data.len().min(6)..];
    }

    data
}

/// Decrypt an eexec-encrypted block. `skip` leading plaintext bytes are
/// produced by the cipher but discarded (4 for the outer block).
pub fn eexec_decrypt(data: &[u8], key: u16, skip: usize) -> Vec<u8> {
    let mut r: u32 = key as u32;
    let mut out = Vec::with_capacity(data.len().saturating_sub(skip));

    // Hex-form eexec data is detected by its first four bytes.
    let is_hex = data
        .iter()
        .take(4)
        .all(|b| b.is_ascii_hexdigit() || b.is_ascii_whitespace());

    let decrypt_byte = |cipher: u8, r: &mut u32| -> u8 {
        let cipher = cipher as u32;
        let plain = cipher ^ (*r >> 8);
        *r = ((cipher + *r).wrapping_mul(52845).wrapping_add(22719)) & 0xffff;
        (plain & 0xff) as u8
    };

    let mut produced = 0usize;
    let mut push = |b: u8, r: &mut u32, out: &mut Vec<u8>| {
        let plain = decrypt_byte(b, r);
        if produced >= skip {
            out.push(plain);
        }
        produced += 1;
    };

    if is_hex {
        let mut pending: Option<u8> = None;
        for &b in data {
            let Some(nibble) = hex_val(b) else {
                continue;
            };
            match pending.take() {
                Some(hi) => push((hi << 4) | nibble, &mut r, &mut out),
                None => pending = Some(nibble),
            }
        }
    } else {
        for &b in data {
            push(b, &mut r, &mut out);
        }
    }

    out
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn skip_eexec_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .unwrap_or(data.len());
    &data[start..]
}

/// Collect the `/name ## RD` definitions inside a decrypted `/CharStrings`
/// dictionary.
fn charstring_names(private: &[u8]) -> Vec<String> {
    let Some(start) = find(private, b"/CharStrings") else {
        return vec![];
    };

    let mut names = vec![];
    let mut pos = start + b"/CharStrings".len();

    while let Some(slash) = find(&private[pos..], b"/") {
        pos += slash + 1;
        let name_start = pos;

        while private
            .get(pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && !b"/{}()[]<>".contains(b))
        {
            pos += 1;
        }

        if let Ok(name) = std::str::from_utf8(&private[name_start..pos]) {
            if name == "end" || name.is_empty() {
                break;
            }
            names.push(name.to_string());
        }

        // Skip the binary charstring by honoring its declared length, so a
        // `/` inside the cipher bytes is not taken for a name.
        let mut ws = pos;
        while private.get(ws).is_some_and(|b| b.is_ascii_whitespace()) {
            ws += 1;
        }
        let len_start = ws;
        while private.get(ws).is_some_and(|b| b.is_ascii_digit()) {
            ws += 1;
        }
        if let Ok(len) = std::str::from_utf8(&private[len_start..ws])
            .unwrap_or("")
            .parse::<usize>()
        {
            // `<len> RD <bytes> ND` with a keyword and one space on each
            // side of the payload.
            if let Some(rd) = find(&private[ws..(ws + 16).min(private.len())], b" ") {
                let after_kw = private[ws + rd + 1..]
                    .iter()
                    .position(|b| *b == b' ')
                    .map(|p| ws + rd + 1 + p + 1)
                    .unwrap_or(ws);
                pos = (after_kw + len).min(private.len());
            }
        }
    }

    names
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::{eexec_decrypt, parse};

    #[test]
    fn standard_encoding_flag() {
        let program = b"%!PS-AdobeFont-1.0\n/Encoding StandardEncoding def\neexec";
        let font = parse(program);
        assert!(font.standard_encoding);
        assert!(font.builtin_encoding.is_none());
    }

    #[test]
    fn custom_encoding() {
        let program = b"%!PS\n/Encoding 256 array\n\
            0 1 255 {1 index exch /.notdef put} for\n\
            dup 65 /alpha put\ndup 66 /beta put\nreadonly def\neexec";
        let font = parse(program);

        let enc = font.builtin_encoding.unwrap();
        assert_eq!(enc[65].as_deref(), Some("alpha"));
        assert_eq!(enc[66].as_deref(), Some("beta"));
        assert_eq!(enc[67], None);
    }

    #[test]
    fn eexec_round_trip() {
        // Encrypt a known plaintext with the inverse recurrence, then check
        // the decryption recovers it after the four lead bytes.
        let plain = b"/CharStrings 1 dict";
        let mut r: u32 = 55665;
        let mut cipher = vec![];

        for &p in [0u8, 0, 0, 0].iter().chain(plain.iter()) {
            let c = (p as u32 ^ (r >> 8)) & 0xff;
            r = ((c + r).wrapping_mul(52845).wrapping_add(22719)) & 0xffff;
            cipher.push(c as u8);
        }

        assert_eq!(eexec_decrypt(&cipher, 55665, 4), plain);
    }
}
