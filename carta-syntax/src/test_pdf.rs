//! An in-memory PDF assembler for tests.
//!
//! Builds byte-exact little files with a correct classical xref table, so the
//! parsing tests exercise real offsets instead of hand-counted ones. Also
//! supports incremental updates (`/Prev` chains) and freed objects.

#![allow(missing_docs)]

#[derive(Default)]
pub struct PdfBuilder {
    base: Option<Vec<u8>>,
    objects: Vec<(u32, Vec<u8>)>,
    freed: Vec<u32>,
    trailer_extra: Vec<u8>,
    header_garbage: Option<Vec<u8>>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an incremental update appended to `base`.
    pub fn update(base: Vec<u8>) -> Self {
        Self {
            base: Some(base),
            ..Self::default()
        }
    }

    /// Bytes written before the `%PDF-` header.
    pub fn leading_garbage(mut self, bytes: &[u8]) -> Self {
        self.header_garbage = Some(bytes.to_vec());
        self
    }

    pub fn object(mut self, num: u32, body: &[u8]) -> Self {
        self.objects.push((num, body.to_vec()));
        self
    }

    /// A stream object; `/Length` is injected into the given dictionary.
    pub fn stream(mut self, num: u32, dict: &[u8], data: &[u8]) -> Self {
        let dict = dict.strip_prefix(b"<<").expect("stream dict must start with <<");
        let mut body = format!("<< /Length {}", data.len()).into_bytes();
        body.extend_from_slice(dict);
        body.extend_from_slice(b"\nstream\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");

        self.objects.push((num, body));
        self
    }

    /// Mark `num` as free in this revision's xref.
    pub fn free(mut self, num: u32) -> Self {
        self.freed.push(num);
        self
    }

    /// Extra entries spliced into the trailer dictionary.
    pub fn trailer_extra(mut self, extra: &[u8]) -> Self {
        self.trailer_extra = extra.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let prev_startxref = self.base.as_deref().and_then(find_prev_startxref);

        let mut out = match self.base {
            Some(base) => base,
            None => {
                let mut out = self.header_garbage.unwrap_or_default();
                out.extend_from_slice(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n");
                out
            }
        };

        let mut entries: Vec<(u32, usize, bool)> = vec![];

        for (num, body) in &self.objects {
            entries.push((*num, out.len(), true));
            out.extend_from_slice(format!("{num} 0 obj\n").as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        for num in &self.freed {
            entries.push((*num, 0, false));
        }

        if prev_startxref.is_none() {
            // The head of the free list.
            entries.push((0, 0, false));
        }

        entries.sort_by_key(|(num, ..)| *num);

        let xref_pos = out.len();
        out.extend_from_slice(b"xref\n");

        for run in contiguous_runs(&entries) {
            out.extend_from_slice(format!("{} {}\n", run[0].0, run.len()).as_bytes());
            for (num, offset, in_use) in run {
                let gen = if *num == 0 { 65535 } else { 0 };
                let kind = if *in_use { 'n' } else { 'f' };
                out.extend_from_slice(format!("{offset:010} {gen:05} {kind} \n").as_bytes());
            }
        }

        let max_num = entries.iter().map(|(n, ..)| *n).max().unwrap_or(0);
        out.extend_from_slice(
            format!("trailer\n<< /Size {} /Root 1 0 R ", max_num + 1).as_bytes(),
        );
        out.extend_from_slice(&self.trailer_extra);
        if let Some(prev) = prev_startxref {
            out.extend_from_slice(format!("/Prev {prev} ").as_bytes());
        }
        out.extend_from_slice(b">>\nstartxref\n");
        out.extend_from_slice(xref_pos.to_string().as_bytes());
        out.extend_from_slice(b"\n%%EOF\n");

        out
    }
}

fn contiguous_runs(entries: &[(u32, usize, bool)]) -> Vec<&[(u32, usize, bool)]> {
    let mut runs = vec![];
    let mut start = 0;

    for i in 1..=entries.len() {
        let broken = i == entries.len() || entries[i].0 != entries[i - 1].0 + 1;
        if broken {
            runs.push(&entries[start..i]);
            start = i;
        }
    }

    runs
}

fn find_prev_startxref(base: &[u8]) -> Option<usize> {
    let needle = b"startxref";
    let at = base.windows(needle.len()).rposition(|w| w == needle)?;
    let tail = &base[at + needle.len()..];
    let digits: Vec<u8> = tail
        .iter()
        .copied()
        .skip_while(|b| b.is_ascii_whitespace())
        .take_while(|b| b.is_ascii_digit())
        .collect();

    String::from_utf8(digits).ok()?.parse().ok()
}
