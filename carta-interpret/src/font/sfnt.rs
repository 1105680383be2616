//! Re-packaging an sfnt with a fresh `cmap`.
//!
//! When text is emitted against an embedded font, the output code points
//! (including Private-Use-Area reassignments) must select the right glyphs.
//! The original `cmap` knows nothing about those code points, so the font is
//! rebuilt with a format-12 `cmap` generated from the character map.

use log::warn;

/// Rebuild `data` with a single-subtable `cmap` mapping each `(code point,
/// glyph)` pair. Pairs must not repeat code points.
pub fn rebuild_with_cmap(data: &[u8], mappings: &[(u32, u16)]) -> Option<Vec<u8>> {
    if mappings.is_empty() {
        return None;
    }

    let tables = read_table_directory(data)?;
    let cmap = build_cmap(mappings);

    // Collect every table except the original cmap, then append ours.
    let mut entries: Vec<(u32, &[u8])> = tables
        .iter()
        .filter(|(tag, _)| tag != b"cmap")
        .map(|(tag, data)| (u32::from_be_bytes(*tag), *data))
        .collect();
    entries.push((u32::from_be_bytes(*b"cmap"), &cmap));
    entries.sort_by_key(|(tag, _)| *tag);

    let num_tables = entries.len() as u16;
    let mut out = vec![];

    // The offset subtable. The search fields are the usual log2 dance.
    let sfnt_version = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let entry_selector = 15 - num_tables.leading_zeros() as u16;
    let search_range = (1u16 << entry_selector) * 16;

    out.extend_from_slice(&sfnt_version.to_be_bytes());
    out.extend_from_slice(&num_tables.to_be_bytes());
    out.extend_from_slice(&search_range.to_be_bytes());
    out.extend_from_slice(&entry_selector.to_be_bytes());
    out.extend_from_slice(&(num_tables * 16 - search_range).to_be_bytes());

    let directory_len = 16 * entries.len();
    let mut offset = out.len() + directory_len;
    let mut head_offset = None;

    for (tag, table) in &entries {
        out.extend_from_slice(&tag.to_be_bytes());
        out.extend_from_slice(&checksum(table).to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(table.len() as u32).to_be_bytes());

        if tag.to_be_bytes() == *b"head" {
            head_offset = Some(offset);
        }

        offset += padded_len(table.len());
    }

    for (_, table) in &entries {
        out.extend_from_slice(table);
        out.resize(out.len() + padded_len(table.len()) - table.len(), 0);
    }

    // Fix up head.checkSumAdjustment over the rebuilt font.
    if let Some(head) = head_offset {
        let adjustment_at = head + 8;
        if out.len() >= adjustment_at + 4 {
            out[adjustment_at..adjustment_at + 4].copy_from_slice(&[0; 4]);
            let total = checksum(&out);
            let adjustment = 0xb1b0_afbau32.wrapping_sub(total);
            out[adjustment_at..adjustment_at + 4]
                .copy_from_slice(&adjustment.to_be_bytes());
        }
    }

    Some(out)
}

fn read_table_directory(data: &[u8]) -> Option<Vec<([u8; 4], &[u8])>> {
    if data.len() < 12 {
        return None;
    }

    let num_tables = u16::from_be_bytes([data[4], data[5]]) as usize;
    let mut tables = Vec::with_capacity(num_tables);

    for i in 0..num_tables {
        let entry = data.get(12 + i * 16..12 + (i + 1) * 16)?;
        let tag: [u8; 4] = entry[0..4].try_into().ok()?;
        let offset = u32::from_be_bytes(entry[8..12].try_into().ok()?) as usize;
        let length = u32::from_be_bytes(entry[12..16].try_into().ok()?) as usize;

        match data.get(offset..offset + length) {
            Some(table) => tables.push((tag, table)),
            None => {
                warn!("table {} out of bounds, dropping", String::from_utf8_lossy(&tag));
            }
        }
    }

    Some(tables)
}

/// A `cmap` with one format-12 subtable under the (3, 10) full-Unicode
/// encoding.
fn build_cmap(mappings: &[(u32, u16)]) -> Vec<u8> {
    let mut sorted = mappings.to_vec();
    sorted.sort_by_key(|(c, _)| *c);
    sorted.dedup_by_key(|(c, _)| *c);

    // Coalesce consecutive code points with consecutive glyphs.
    let mut groups: Vec<(u32, u32, u32)> = vec![];
    for (code, gid) in sorted {
        match groups.last_mut() {
            // Extend the run only while the glyph id advances in step.
            Some((start, end, start_gid))
                if code == *end + 1 && gid as u32 == *start_gid + (code - *start) =>
            {
                *end = code;
            }
            _ => groups.push((code, code, gid as u32)),
        }
    }

    let subtable_len = 16 + groups.len() * 12;
    let mut out = vec![];

    // cmap header: version 0, one encoding record.
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&3u16.to_be_bytes()); // platform: Windows
    out.extend_from_slice(&10u16.to_be_bytes()); // encoding: UCS-4
    out.extend_from_slice(&12u32.to_be_bytes()); // subtable offset

    // Format 12 subtable.
    out.extend_from_slice(&12u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&(subtable_len as u32).to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes()); // language
    out.extend_from_slice(&(groups.len() as u32).to_be_bytes());

    for (start, end, gid) in groups {
        out.extend_from_slice(&start.to_be_bytes());
        out.extend_from_slice(&end.to_be_bytes());
        out.extend_from_slice(&gid.to_be_bytes());
    }

    out
}

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

fn checksum(data: &[u8]) -> u32 {
    data.chunks(4)
        .map(|c| {
            u32::from_be_bytes([
                c[0],
                *c.get(1).unwrap_or(&0),
                *c.get(2).unwrap_or(&0),
                *c.get(3).unwrap_or(&0),
            ])
        })
        .fold(0u32, u32::wrapping_add)
}

#[cfg(test)]
mod tests {
    use super::{build_cmap, rebuild_with_cmap};

    #[test]
    fn cmap_groups_coalesce() {
        // a,b,c with consecutive glyphs collapse into one group.
        let cmap = build_cmap(&[(0x61, 5), (0x62, 6), (0x63, 7), (0x70, 1)]);

        let num_groups = u32::from_be_bytes(cmap[24..28].try_into().unwrap());
        assert_eq!(num_groups, 2);

        let first_start = u32::from_be_bytes(cmap[28..32].try_into().unwrap());
        let first_end = u32::from_be_bytes(cmap[32..36].try_into().unwrap());
        assert_eq!((first_start, first_end), (0x61, 0x63));
    }

    #[test]
    fn rebuild_keeps_other_tables() {
        // A font with a single fake "glyf" table.
        let mut font = vec![0x00, 0x01, 0x00, 0x00]; // version
        font.extend_from_slice(&1u16.to_be_bytes()); // numTables
        font.extend_from_slice(&[0; 6]); // search fields, unused on read
        font.extend_from_slice(b"glyf");
        font.extend_from_slice(&0u32.to_be_bytes()); // checksum
        font.extend_from_slice(&28u32.to_be_bytes()); // offset
        font.extend_from_slice(&4u32.to_be_bytes()); // length
        font.extend_from_slice(&[1, 2, 3, 4]);

        let rebuilt = rebuild_with_cmap(&font, &[(0x41, 1)]).unwrap();

        let num_tables = u16::from_be_bytes([rebuilt[4], rebuilt[5]]);
        assert_eq!(num_tables, 2);
        assert!(rebuilt.windows(4).any(|w| w == b"cmap"));
        assert!(rebuilt.windows(4).any(|w| w == b"glyf"));
    }
}
