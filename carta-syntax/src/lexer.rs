//! Lexing raw bytes into PDF tokens.

use crate::cursor::Cursor;
use crate::trivia::{is_regular, is_white_space, skip_ws};
use log::warn;

/// A single lexed token. `start` is the byte offset of the token's first
/// byte, so callers can seek relative to token starts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token<'a> {
    pub(crate) kind: TokenKind<'a>,
    pub(crate) start: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind<'a> {
    Integer(i64),
    Real(f32),
    /// A name with `#xx` hex escapes already decoded.
    Name(String),
    /// A literal string with escapes already decoded.
    LiteralString(Vec<u8>),
    /// A hex string with whitespace stripped and nibbles paired.
    HexString(Vec<u8>),
    ArrayOpen,
    ArrayClose,
    DictOpen,
    DictClose,
    /// A bare keyword: `true`, `obj`, `stream`, a content-stream operator, ...
    Keyword(&'a [u8]),
}

#[derive(Clone, Debug)]
pub(crate) struct Lexer<'a> {
    pub(crate) cursor: Cursor<'a>,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub(crate) fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            cursor: Cursor::at(data, pos),
        }
    }

    pub(crate) fn pos(&self) -> usize {
        self.cursor.pos()
    }

    pub(crate) fn seek(&mut self, pos: usize) {
        self.cursor.seek(pos);
    }

    /// Lex the next token, skipping white space and comments. Returns `None`
    /// at the end of the data or on an unlexable byte (the cursor is left on
    /// the offending byte in that case).
    pub(crate) fn next_token(&mut self) -> Option<Token<'a>> {
        skip_ws(&mut self.cursor);
        let start = self.cursor.pos();

        let kind = match self.cursor.peek()? {
            b'[' => {
                self.cursor.advance(1);
                TokenKind::ArrayOpen
            }
            b']' => {
                self.cursor.advance(1);
                TokenKind::ArrayClose
            }
            b'<' => {
                if self.cursor.peek_at(1) == Some(b'<') {
                    self.cursor.advance(2);
                    TokenKind::DictOpen
                } else {
                    TokenKind::HexString(self.hex_string()?)
                }
            }
            b'>' => {
                if self.cursor.peek_at(1) == Some(b'>') {
                    self.cursor.advance(2);
                    TokenKind::DictClose
                } else {
                    return None;
                }
            }
            b'(' => TokenKind::LiteralString(self.literal_string()?),
            b'/' => TokenKind::Name(self.name()?),
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.number()?,
            b if is_regular(b) => TokenKind::Keyword(self.cursor.take_while(is_regular)),
            _ => return None,
        };

        Some(Token { kind, start })
    }

    /// Lex a token, restoring the cursor on failure.
    pub(crate) fn try_token(&mut self) -> Option<Token<'a>> {
        let saved = self.cursor.clone();
        match self.next_token() {
            Some(t) => Some(t),
            None => {
                self.cursor = saved;
                None
            }
        }
    }

    fn name(&mut self) -> Option<String> {
        debug_assert_eq!(self.cursor.peek(), Some(b'/'));
        self.cursor.advance(1);

        let raw = self.cursor.take_while(is_regular);

        // Resolve `#xx` escapes on the byte level first; the result is one
        // byte sequence, decoded as UTF-8 as a whole. Anything that isn't
        // valid UTF-8 gets the replacement character rather than a silent
        // byte-to-codepoint widening.
        let mut bytes = Vec::with_capacity(raw.len());

        let mut i = 0;
        while i < raw.len() {
            let b = raw[i];
            if b == b'#' {
                let hi = raw.get(i + 1).copied().and_then(hex_digit);
                let lo = raw.get(i + 2).copied().and_then(hex_digit);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    bytes.push((hi << 4) | lo);
                    i += 3;
                    continue;
                }
            }
            bytes.push(b);
            i += 1;
        }

        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn number(&mut self) -> Option<TokenKind<'a>> {
        let start = self.cursor.pos();
        self.cursor.take_while(|b| matches!(b, b'+' | b'-'));
        let int_digits = self.cursor.take_while(|b| b.is_ascii_digit()).len();
        let mut is_real = false;

        if self.cursor.peek() == Some(b'.') {
            is_real = true;
            self.cursor.advance(1);
            self.cursor.take_while(|b| b.is_ascii_digit());
        }

        let raw = self.cursor.slice(start, self.cursor.pos())?;
        if int_digits == 0 && !is_real {
            return None;
        }

        // Values like `--3` or `+-1` appear in the wild; normalize the sign
        // by keeping only the last one.
        let sign_end = raw.iter().take_while(|b| matches!(b, b'+' | b'-')).count();
        let negative = sign_end > 0 && raw[sign_end - 1] == b'-';
        let body = std::str::from_utf8(&raw[sign_end..]).ok()?;

        if is_real {
            let with_lead = if body.starts_with('.') {
                format!("0{body}")
            } else if body.ends_with('.') {
                format!("{body}0")
            } else {
                body.to_string()
            };
            let val: f32 = with_lead.parse().ok()?;
            Some(TokenKind::Real(if negative { -val } else { val }))
        } else {
            let val: i64 = body.parse().ok().or_else(|| {
                warn!("integer out of range: {body}");
                None
            })?;
            Some(TokenKind::Integer(if negative { -val } else { val }))
        }
    }

    fn hex_string(&mut self) -> Option<Vec<u8>> {
        debug_assert_eq!(self.cursor.peek(), Some(b'<'));
        self.cursor.advance(1);

        let mut out = vec![];
        let mut pending: Option<u8> = None;

        loop {
            let b = self.cursor.bump()?;
            match b {
                b'>' => break,
                b if is_white_space(b) => {}
                b => {
                    let nibble = hex_digit(b)?;
                    match pending.take() {
                        Some(hi) => out.push((hi << 4) | nibble),
                        None => pending = Some(nibble),
                    }
                }
            }
        }

        // An odd final nibble is read as if followed by `0`.
        if let Some(hi) = pending {
            out.push(hi << 4);
        }

        Some(out)
    }

    fn literal_string(&mut self) -> Option<Vec<u8>> {
        debug_assert_eq!(self.cursor.peek(), Some(b'('));
        self.cursor.advance(1);

        let mut out = vec![];
        let mut depth = 1u32;

        loop {
            let b = self.cursor.bump()?;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                b'\\' => {
                    let esc = self.cursor.bump()?;
                    match esc {
                        b'n' => out.push(0x0a),
                        b'r' => out.push(0x0d),
                        b't' => out.push(0x09),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'(' | b')' | b'\\' => out.push(esc),
                        b'0'..=b'7' => {
                            let mut val = (esc - b'0') as u16;
                            for _ in 0..2 {
                                match self.cursor.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        val = val * 8 + (d - b'0') as u16;
                                        self.cursor.advance(1);
                                    }
                                    _ => break,
                                }
                            }
                            out.push((val & 0xff) as u8);
                        }
                        // A backslash before an end-of-line marker splits the
                        // string across lines; both are dropped.
                        b'\r' => {
                            if self.cursor.peek() == Some(b'\n') {
                                self.cursor.advance(1);
                            }
                        }
                        b'\n' => {}
                        other => out.push(other),
                    }
                }
                // A bare end-of-line marker reads as a single line feed.
                b'\r' => {
                    out.push(0x0a);
                    if self.cursor.peek() == Some(b'\n') {
                        self.cursor.advance(1);
                    }
                }
                other => out.push(other),
            }
        }

        Some(out)
    }

    /// Consume the end-of-line marker after the `stream` keyword: exactly one
    /// of LF or CRLF, never a lone CR.
    pub(crate) fn eat_stream_eol(&mut self) {
        match self.cursor.peek() {
            Some(b'\n') => self.cursor.advance(1),
            Some(b'\r') => {
                if self.cursor.peek_at(1) == Some(b'\n') {
                    self.cursor.advance(2);
                } else {
                    warn!("lone CR after stream keyword");
                    self.cursor.advance(1);
                }
            }
            Some(b' ') => {
                // Seen in damaged files.
                self.cursor.advance(1);
                self.eat_stream_eol();
            }
            _ => {}
        }
    }
}

#[inline(always)]
fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Lexer, TokenKind};

    fn kinds(data: &[u8]) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(data);
        let mut out = vec![];
        while let Some(t) = lexer.try_token() {
            out.push(t.kind);
        }
        out
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds(b"1 -2 +3 4. .5 -.002 --7"),
            vec![
                TokenKind::Integer(1),
                TokenKind::Integer(-2),
                TokenKind::Integer(3),
                TokenKind::Real(4.0),
                TokenKind::Real(0.5),
                TokenKind::Real(-0.002),
                TokenKind::Integer(-7),
            ]
        );
    }

    #[test]
    fn name_with_hex_escape() {
        assert_eq!(
            kinds(b"/Adobe#20Green /A#42"),
            vec![
                TokenKind::Name("Adobe Green".into()),
                TokenKind::Name("AB".into())
            ]
        );
    }

    #[test]
    fn name_with_utf8_bytes() {
        // Raw multi-byte UTF-8 and its escaped spelling decode the same.
        assert_eq!(
            kinds(b"/Caf\xc3\xa9 /Caf#C3#A9"),
            vec![
                TokenKind::Name("Café".into()),
                TokenKind::Name("Café".into())
            ]
        );
    }

    #[test]
    fn name_with_invalid_utf8_gets_a_placeholder() {
        assert_eq!(
            kinds(b"/Bad\xff"),
            vec![TokenKind::Name("Bad\u{fffd}".into())]
        );
    }

    #[test]
    fn empty_name() {
        assert_eq!(kinds(b"/ 5"), vec![
            TokenKind::Name(String::new()),
            TokenKind::Integer(5)
        ]);
    }

    #[test]
    fn literal_string_nesting() {
        assert_eq!(
            kinds(b"(a (b) c)"),
            vec![TokenKind::LiteralString(b"a (b) c".to_vec())]
        );
    }

    #[test]
    fn literal_string_escapes() {
        assert_eq!(
            kinds(b"(\\n\\t\\(\\)\\\\)"),
            vec![TokenKind::LiteralString(b"\n\t()\\".to_vec())]
        );
    }

    #[test]
    fn literal_string_octal() {
        assert_eq!(
            kinds(b"(\\053\\53a)"),
            vec![TokenKind::LiteralString(b"++a".to_vec())]
        );
    }

    #[test]
    fn literal_string_line_split() {
        assert_eq!(
            kinds(b"(Hi \\\nthere)"),
            vec![TokenKind::LiteralString(b"Hi there".to_vec())]
        );
    }

    #[test]
    fn hex_string_odd_nibble() {
        assert_eq!(
            kinds(b"<901FA>"),
            vec![TokenKind::HexString(vec![0x90, 0x1f, 0xa0])]
        );
    }

    #[test]
    fn hex_string_whitespace() {
        assert_eq!(
            kinds(b"<90 1F\nA3>"),
            vec![TokenKind::HexString(vec![0x90, 0x1f, 0xa3])]
        );
    }

    #[test]
    fn dict_delimiters() {
        assert_eq!(
            kinds(b"<< /K true >>"),
            vec![
                TokenKind::DictOpen,
                TokenKind::Name("K".into()),
                TokenKind::Keyword(b"true"),
                TokenKind::DictClose,
            ]
        );
    }

    #[test]
    fn starred_operators() {
        assert_eq!(
            kinds(b"W* f* T* '"),
            vec![
                TokenKind::Keyword(b"W*"),
                TokenKind::Keyword(b"f*"),
                TokenKind::Keyword(b"T*"),
                TokenKind::Keyword(b"'"),
            ]
        );
    }

    #[test]
    fn token_positions_are_preserved() {
        let mut lexer = Lexer::new(b"  12 0 obj");
        assert_eq!(lexer.try_token().unwrap().start, 2);
        assert_eq!(lexer.try_token().unwrap().start, 5);
        assert_eq!(lexer.try_token().unwrap().start, 7);
    }
}
