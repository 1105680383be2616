//! A decoder for run-length-encoded streams.

use crate::cursor::Cursor;
use crate::error::FilterError;
use log::warn;

pub(crate) fn decode(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut c = Cursor::new(data);
    let mut out = vec![];

    loop {
        let Some(length) = c.bump() else {
            // A missing end-of-data marker is common enough to tolerate.
            warn!("run-length stream ended without EOD marker");
            return Ok(out);
        };

        match length {
            128 => return Ok(out),
            0..=127 => {
                let literal = c
                    .take(length as usize + 1)
                    .ok_or_else(|| FilterError::new("RunLengthDecode", c.pos()))?;
                out.extend_from_slice(literal);
            }
            _ => {
                let byte = c
                    .bump()
                    .ok_or_else(|| FilterError::new("RunLengthDecode", c.pos()))?;
                out.extend(std::iter::repeat(byte).take(257 - length as usize));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::decode;

    #[test]
    fn literal_and_run() {
        let input = [4, 10, 11, 12, 13, 14, 253, 3, 128];
        assert_eq!(decode(&input).unwrap(), vec![10, 11, 12, 13, 14, 3, 3, 3, 3]);
    }

    #[test]
    fn truncated_literal_is_an_error() {
        let input = [4, 10, 11];
        assert!(decode(&input).is_err());
    }
}
