//! A decoder for LZW-encoded streams.

use crate::error::FilterError;
use bitreader::BitReader;

const CLEAR_TABLE: usize = 256;
const EOD: usize = 257;
const MAX_ENTRIES: usize = 4096;
const INITIAL_SIZE: usize = 258;

pub(crate) fn decode(data: &[u8], early_change: bool) -> Result<Vec<u8>, FilterError> {
    let mut table = Table::new(early_change);
    let mut reader = BitReader::new(data);
    let mut out = vec![];
    let mut prev: Option<usize> = None;

    let err = |reader: &BitReader| {
        FilterError::new("LZWDecode", (reader.position() / 8) as usize)
    };

    loop {
        let code = match reader.read_u16(table.code_length()) {
            Ok(c) => c as usize,
            // Data that just stops without an EOD marker is tolerated.
            Err(_) => return Ok(out),
        };

        match code {
            CLEAR_TABLE => {
                table.clear();
                prev = None;
            }
            EOD => return Ok(out),
            code => {
                if let Some(entry) = table.get(code) {
                    out.extend_from_slice(entry);

                    if let Some(prev) = prev {
                        let first = table.get(code).and_then(|e| e.first().copied());
                        if let Some(first) = first {
                            table.register(prev, first);
                        }
                    }
                } else {
                    // The KwKwK case: the code being defined right now.
                    let prev_code = prev.ok_or_else(|| err(&reader))?;
                    let first = table
                        .get(prev_code)
                        .and_then(|e| e.first().copied())
                        .ok_or_else(|| err(&reader))?;

                    match table.register(prev_code, first) {
                        Some(entry) => out.extend_from_slice(entry),
                        None => return Err(err(&reader)),
                    }
                }

                prev = Some(code);
            }
        }
    }
}

struct Table {
    early_change: bool,
    entries: Vec<Vec<u8>>,
}

impl Table {
    fn new(early_change: bool) -> Self {
        let mut entries: Vec<_> = (0..=255u8).map(|b| vec![b]).collect();
        // The clear-table and EOD codes carry no data.
        entries.push(vec![]);
        entries.push(vec![]);

        Self {
            early_change,
            entries,
        }
    }

    fn get(&self, code: usize) -> Option<&[u8]> {
        self.entries.get(code).map(|v| v.as_slice())
    }

    fn register(&mut self, prev: usize, next_byte: u8) -> Option<&[u8]> {
        if self.entries.len() >= MAX_ENTRIES {
            return None;
        }

        let mut entry = self.entries.get(prev)?.clone();
        entry.push(next_byte);
        self.entries.push(entry);
        self.entries.last().map(|v| v.as_slice())
    }

    fn clear(&mut self) {
        self.entries.truncate(INITIAL_SIZE);
    }

    fn code_length(&self) -> u8 {
        let adjusted = self.entries.len() + usize::from(self.early_change);

        match adjusted {
            0..=511 => 9,
            512..=1023 => 10,
            1024..=2047 => 11,
            _ => 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::decode;

    #[test]
    fn sample_from_the_specification() {
        let input = [0x80, 0x0B, 0x60, 0x50, 0x22, 0x0C, 0x0C, 0x85, 0x01];
        assert_eq!(
            decode(&input, true).unwrap(),
            vec![45, 45, 45, 45, 45, 65, 45, 45, 45, 66]
        );
    }
}
