//! A decoder for ASCII-85-encoded streams.

use crate::error::FilterError;
use crate::trivia::is_white_space;

pub(crate) fn decode(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut out = Vec::with_capacity(data.len() / 5 * 4);
    let mut group = [0u8; 5];
    let mut filled = 0usize;

    let err = |offset| FilterError::new("ASCII85Decode", offset);

    for (offset, &b) in data.iter().enumerate() {
        match b {
            b if is_white_space(b) => {}
            b'~' => break,
            b'z' if filled == 0 => out.extend_from_slice(&[0; 4]),
            0x21..=0x75 => {
                group[filled] = b - 0x21;
                filled += 1;

                if filled == 5 {
                    out.extend_from_slice(&word(group, offset)?);
                    filled = 0;
                }
            }
            _ => return Err(err(offset)),
        }
    }

    // A partial final group of n symbols encodes n - 1 bytes; missing symbols
    // pad with the maximum digit.
    if filled > 0 {
        if filled == 1 {
            return Err(err(data.len()));
        }

        let mut padded = group;
        for slot in padded.iter_mut().skip(filled) {
            *slot = 84;
        }

        let bytes = word(padded, data.len())?;
        out.extend_from_slice(&bytes[..filled - 1]);
    }

    Ok(out)
}

fn word(group: [u8; 5], offset: usize) -> Result<[u8; 4], FilterError> {
    let mut value = 0u64;
    for digit in group {
        value = value * 85 + digit as u64;
    }

    // 85^5 exceeds 256^4, so the sum can overflow four bytes.
    let value =
        u32::try_from(value).map_err(|_| FilterError::new("ASCII85Decode", offset))?;

    Ok(value.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::decode;

    #[test]
    fn simple() {
        assert_eq!(decode(b"87cURDZ~>").unwrap(), b"Hello");
    }

    #[test]
    fn whitespace_ignored() {
        assert_eq!(decode(b"87  cURD  Z~>").unwrap(), b"Hello");
    }

    #[test]
    fn z_shortcut() {
        assert_eq!(decode(b"z~>").unwrap(), [0, 0, 0, 0]);
    }

    #[test]
    fn missing_terminator_still_decodes() {
        assert_eq!(decode(b"87cURDZ").unwrap(), b"Hello");
    }

    #[test]
    fn invalid_symbol_reports_offset() {
        let err = decode(b"87\xffcU").unwrap_err();
        assert_eq!(err.offset, 2);
    }
}
