//! White space, delimiters and comments.

use crate::cursor::Cursor;

#[inline(always)]
pub(crate) fn is_white_space(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0a | 0x0c | 0x0d | 0x20)
}

#[inline(always)]
pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

#[inline(always)]
pub(crate) fn is_regular(b: u8) -> bool {
    !is_white_space(b) && !is_delimiter(b)
}

#[inline(always)]
pub(crate) fn is_eol(b: u8) -> bool {
    matches!(b, 0x0a | 0x0d)
}

/// Skip white space and `%` comments. Comments run to the end of the line.
pub(crate) fn skip_ws(c: &mut Cursor) {
    loop {
        match c.peek() {
            Some(b) if is_white_space(b) => {
                c.advance(1);
            }
            Some(b'%') => {
                c.take_while(|b| !is_eol(b));
            }
            _ => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_run_to_eol() {
        let mut c = Cursor::new(b"  % a comment\n 42");
        skip_ws(&mut c);
        assert_eq!(c.peek(), Some(b'4'));
    }
}
