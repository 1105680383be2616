//! Building objects from tokens.

use crate::lexer::{Lexer, Token, TokenKind};
use crate::object::name::keys::LENGTH;
use crate::object::{Array, Dict, Name, ObjRef, Object, PdfString, Stream};
use crate::trivia::is_white_space;
use crate::xref::XRef;
use log::warn;

// Generous; real files nest a handful of levels deep.
const MAX_DEPTH: u32 = 100;

pub(crate) struct Parser<'a> {
    pub(crate) lexer: Lexer<'a>,
    /// In content streams an integer can never start an indirect reference,
    /// so the reference look-ahead is skipped.
    plain: bool,
    depth: u32,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            plain: false,
            depth: 0,
        }
    }

    pub(crate) fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            lexer: Lexer::at(data, pos),
            plain: false,
            depth: 0,
        }
    }

    pub(crate) fn in_content_stream(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            plain: true,
            depth: 0,
        }
    }

    pub(crate) fn pos(&self) -> usize {
        self.lexer.pos()
    }

    /// Parse the next object. The lexer is restored on failure.
    pub(crate) fn parse_object(&mut self, xref: &XRef) -> Option<Object> {
        let saved = self.lexer.clone();
        match self.parse_object_inner(xref) {
            Some(obj) => Some(obj),
            None => {
                self.lexer = saved;
                None
            }
        }
    }

    fn parse_object_inner(&mut self, xref: &XRef) -> Option<Object> {
        let token = self.lexer.try_token()?;
        self.parse_from_token(token, xref)
    }

    pub(crate) fn parse_from_token(
        &mut self,
        token: Token<'a>,
        xref: &XRef,
    ) -> Option<Object> {
        if self.depth > MAX_DEPTH {
            warn!("maximum object nesting depth exceeded");
            return None;
        }

        Some(match token.kind {
            TokenKind::Integer(i) => {
                if !self.plain {
                    if let Some(r) = self.try_reference(i) {
                        return Some(Object::Ref(r));
                    }
                }
                Object::Integer(i)
            }
            TokenKind::Real(r) => Object::Real(r),
            TokenKind::Name(n) => Object::Name(Name::from(n)),
            TokenKind::LiteralString(s) | TokenKind::HexString(s) => {
                Object::String(PdfString::new(s))
            }
            TokenKind::ArrayOpen => {
                self.depth += 1;
                let arr = self.parse_array_body(xref);
                self.depth -= 1;
                Object::Array(arr?)
            }
            TokenKind::DictOpen => {
                self.depth += 1;
                let dict = self.parse_dict_body(xref);
                self.depth -= 1;
                let dict = dict?;

                if self.depth == 0 && self.peek_keyword(b"stream") {
                    Object::Stream(self.parse_stream_body(dict, xref)?)
                } else {
                    Object::Dict(dict)
                }
            }
            TokenKind::Keyword(b"true") => Object::Boolean(true),
            TokenKind::Keyword(b"false") => Object::Boolean(false),
            TokenKind::Keyword(b"null") => Object::Null,
            _ => return None,
        })
    }

    /// Look ahead for `G R` after an integer that might be an object number.
    fn try_reference(&mut self, num: i64) -> Option<ObjRef> {
        let num = u32::try_from(num).ok()?;

        let saved = self.lexer.clone();
        let gen = match self.lexer.try_token()?.kind {
            TokenKind::Integer(g) => u16::try_from(g).ok(),
            _ => None,
        };

        let is_ref = gen.is_some()
            && matches!(self.lexer.try_token().map(|t| t.kind), Some(TokenKind::Keyword(b"R")));

        if is_ref {
            Some(ObjRef::new(num, gen.unwrap_or(0)))
        } else {
            self.lexer = saved;
            None
        }
    }

    fn parse_array_body(&mut self, xref: &XRef) -> Option<Array> {
        let mut items = vec![];

        loop {
            let token = self.lexer.try_token()?;
            if token.kind == TokenKind::ArrayClose {
                return Some(Array::new(items));
            }

            items.push(self.parse_from_token(token, xref)?);
        }
    }

    fn parse_dict_body(&mut self, xref: &XRef) -> Option<Dict> {
        let mut entries = vec![];

        loop {
            let token = self.lexer.try_token()?;
            match token.kind {
                TokenKind::DictClose => return Some(Dict::new(entries)),
                TokenKind::Name(key) => {
                    let value_token = self.lexer.try_token()?;
                    // `/Key >>` appears in damaged files; read the key as null.
                    if value_token.kind == TokenKind::DictClose {
                        entries.push((Name::from(key), Object::Null));
                        return Some(Dict::new(entries));
                    }
                    let value = self.parse_from_token(value_token, xref)?;
                    entries.push((Name::from(key), value));
                }
                _ => return None,
            }
        }
    }

    fn peek_keyword(&mut self, keyword: &[u8]) -> bool {
        let saved = self.lexer.clone();
        let matched = matches!(
            self.lexer.try_token().map(|t| t.kind),
            Some(TokenKind::Keyword(k)) if k == keyword
        );
        if !matched {
            self.lexer = saved;
        }
        matched
    }

    /// Locate the stream bytes after a consumed `stream` keyword.
    fn parse_stream_body(&mut self, dict: Dict, xref: &XRef) -> Option<Stream> {
        self.lexer.eat_stream_eol();

        let data = self.lexer.cursor.data();
        let start = self.lexer.pos();

        // `/Length` may itself be indirect; during xref bootstrap the
        // resolution can come back empty, in which case the `endstream`
        // keyword is searched for instead.
        if let Some(len) = dict.get::<i64>(LENGTH, xref) {
            if len >= 0 {
                let end = start + len as usize;
                if end <= data.len() && endstream_follows(data, end) {
                    self.lexer.seek(end);
                    self.eat_endstream();
                    return Some(Stream::new(dict, data[start..end].to_vec()));
                }
            }
        }

        let end = find_endstream(data, start)?;
        self.lexer.seek(end);
        self.eat_endstream();

        Some(Stream::new(dict, data[start..trim_eol(data, start, end)].to_vec()))
    }

    fn eat_endstream(&mut self) {
        let saved = self.lexer.clone();
        if !matches!(
            self.lexer.try_token().map(|t| t.kind),
            Some(TokenKind::Keyword(b"endstream"))
        ) {
            warn!("missing endstream keyword");
            self.lexer = saved;
        }
    }

    /// Parse an `N G obj … endobj` definition.
    pub(crate) fn parse_indirect(&mut self, xref: &XRef) -> Option<(ObjRef, Object)> {
        let saved = self.lexer.clone();
        match self.parse_indirect_inner(xref) {
            Some(v) => Some(v),
            None => {
                self.lexer = saved;
                None
            }
        }
    }

    fn parse_indirect_inner(&mut self, xref: &XRef) -> Option<(ObjRef, Object)> {
        let num = match self.lexer.try_token()?.kind {
            TokenKind::Integer(i) => u32::try_from(i).ok()?,
            _ => return None,
        };
        let gen = match self.lexer.try_token()?.kind {
            TokenKind::Integer(i) => u16::try_from(i).ok()?,
            _ => return None,
        };

        match self.lexer.try_token()?.kind {
            TokenKind::Keyword(b"obj") => {}
            _ => return None,
        }

        let object = self.parse_object_inner(xref)?;

        // Lenient: a missing `endobj` doesn't invalidate the object.
        let saved = self.lexer.clone();
        if !matches!(
            self.lexer.try_token().map(|t| t.kind),
            Some(TokenKind::Keyword(b"endobj"))
        ) {
            self.lexer = saved;
        }

        Some((ObjRef::new(num, gen), object))
    }
}

fn endstream_follows(data: &[u8], mut pos: usize) -> bool {
    while pos < data.len() && is_white_space(data[pos]) {
        pos += 1;
    }
    data[pos..].starts_with(b"endstream")
}

fn find_endstream(data: &[u8], start: usize) -> Option<usize> {
    let needle = b"endstream";
    let mut pos = start;

    while pos + needle.len() <= data.len() {
        if data[pos..].starts_with(needle) {
            return Some(pos);
        }
        pos += 1;
    }

    None
}

/// Exclude the end-of-line marker before `endstream` from the stream data.
fn trim_eol(data: &[u8], start: usize, end: usize) -> usize {
    let mut end = end;
    if end > start && data[end - 1] == b'\n' {
        end -= 1;
    }
    if end > start && data[end - 1] == b'\r' {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::Parser;
    use crate::object::{ObjRef, Object};
    use crate::xref::XRef;

    fn parse(data: &[u8]) -> Option<Object> {
        Parser::new(data).parse_object(&XRef::empty())
    }

    #[test]
    fn scalars() {
        assert!(matches!(parse(b"null"), Some(Object::Null)));
        assert!(matches!(parse(b"true"), Some(Object::Boolean(true))));
        assert!(matches!(parse(b"34.5"), Some(Object::Real(_))));
        assert!(matches!(parse(b"-17"), Some(Object::Integer(-17))));
        assert!(matches!(parse(b"/Name"), Some(Object::Name(_))));
        assert!(matches!(parse(b"(Hi)"), Some(Object::String(_))));
        assert!(matches!(parse(b"<34>"), Some(Object::String(_))));
    }

    #[test]
    fn reference_lookahead() {
        assert_eq!(parse(b"12 0 R"), Some(Object::Ref(ObjRef::new(12, 0))));
        // Three integers, no `R`: the first one is just a number.
        assert_eq!(parse(b"12 0 5"), Some(Object::Integer(12)));
    }

    #[test]
    fn no_references_in_content_streams() {
        let mut p = Parser::in_content_stream(b"12 0 R");
        assert_eq!(p.parse_object(&XRef::empty()), Some(Object::Integer(12)));
    }

    #[test]
    fn nested_containers() {
        let obj = parse(b"<< /A [1 2 [3]] /B << /C (x) >> >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert!(dict.contains_key("A"));
        assert!(dict.contains_key("B"));
    }

    #[test]
    fn dict_with_reference_value() {
        let obj = parse(b"<< /Parent 3 0 R /K 7 >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get_ref("Parent"), Some(ObjRef::new(3, 0)));
    }

    #[test]
    fn stream_with_length() {
        let obj = parse(b"<< /Length 3 >> stream\nabc\nendstream").unwrap();
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.raw(), b"abc");
    }

    #[test]
    fn stream_with_broken_length_falls_back() {
        let obj = parse(b"<< /Length 9999 >> stream\nabcdef\nendstream").unwrap();
        assert_eq!(obj.as_stream().unwrap().raw(), b"abcdef");
    }

    #[test]
    fn indirect_object() {
        let (id, obj) = Parser::new(b"7 0 obj << /K 1 >> endobj")
            .parse_indirect(&XRef::empty())
            .unwrap();
        assert_eq!(id, ObjRef::new(7, 0));
        assert!(matches!(obj, Object::Dict(_)));
    }

    #[test]
    fn comments_between_tokens() {
        let obj = parse(b"[ 1 % comment\n 2 ]").unwrap();
        assert_eq!(obj.as_array().unwrap().len(), 2);
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let mut data = vec![];
        data.extend(std::iter::repeat(b'[').take(500));
        data.extend(std::iter::repeat(b']').take(500));
        assert!(parse(&data).is_none());
    }

    #[test]
    fn empty_dict() {
        let obj = parse(b"<<>>").unwrap();
        assert_eq!(obj.as_dict().unwrap().len(), 0);
    }
}
