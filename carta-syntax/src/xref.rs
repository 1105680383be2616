//! Locating, merging and querying the cross-reference data of a PDF file.
//!
//! The bootstrap scans the last 1024 bytes for `startxref`, reads the xref
//! section it points at (classical table or `/Type /XRef` stream), and walks
//! the `/Prev` and `/XRefStm` chains. Sections merge newest-wins: older
//! revisions are inserted first and newer entries overwrite them, with a
//! hybrid file's `/XRefStm` entries taking precedence over the classical
//! section of the same revision.
//!
//! [`XRef`] doubles as the object cache: resolving a reference memoizes the
//! materialized value, so shared identity is preserved across resolutions.

use crate::error::LoadError;
use crate::lexer::{Lexer, TokenKind};
use crate::object::name::keys::{
    ENCRYPT, FIRST, INDEX, INFO, N, PAGES, PREV, ROOT, SIZE, TYPE, W, XREF_STM,
};
use crate::object::{Dict, Name, ObjRef, Object, Stream};
use crate::parser::Parser;
use log::{error, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// The window at the end of the file searched for `startxref`.
const STARTXREF_WINDOW: usize = 1024;

/// An entry of the merged cross-reference table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Entry {
    /// An in-use object at a byte offset.
    Offset { pos: usize, gen: u16 },
    /// An object stored in an object stream, by index.
    InStream { stream_num: u32, index: u32 },
    /// A freed object. Kept so that a newer free entry shadows an older
    /// definition.
    Free,
}

type EntryMap = FxHashMap<u32, Entry>;

struct ObjStm {
    data: Arc<[u8]>,
    /// Absolute offsets of the member objects within `data`.
    offsets: Vec<(u32, usize)>,
}

struct Repr {
    data: Arc<[u8]>,
    map: RwLock<EntryMap>,
    /// Trailer dictionaries, newest first.
    trailers: Vec<Dict>,
    cache: RwLock<FxHashMap<u32, Object>>,
    obj_stms: Mutex<FxHashMap<u32, Option<Arc<ObjStm>>>>,
    in_flight: Mutex<FxHashSet<u32>>,
    repaired: AtomicBool,
}

/// The merged cross-reference table and object cache of a document.
#[derive(Clone)]
pub struct XRef(Arc<Repr>);

impl std::fmt::Debug for XRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "XRef({} entries)", self.entry_count())
    }
}

impl XRef {
    /// An xref with no entries. Resolving anything through it yields null.
    pub fn empty() -> Self {
        Self(Arc::new(Repr {
            data: Arc::from(&[][..]),
            map: RwLock::new(EntryMap::default()),
            trailers: vec![],
            cache: RwLock::new(FxHashMap::default()),
            obj_stms: Mutex::new(FxHashMap::default()),
            in_flight: Mutex::new(FxHashSet::default()),
            repaired: AtomicBool::new(false),
        }))
    }

    /// Load the cross-reference data of `data`, falling back to a recovery
    /// scan when the xref is missing or damaged.
    pub(crate) fn load(data: Arc<[u8]>) -> Result<Self, LoadError> {
        let mut map = EntryMap::default();
        let mut trailers = vec![];

        let bootstrapped = find_startxref(&data)
            .and_then(|pos| {
                populate(&data, pos, &mut map, &mut FxHashSet::default(), &mut trailers)
            })
            .is_some();

        if !bootstrapped || !trailers.iter().any(|t| t.contains_key(ROOT)) {
            warn!("xref table missing or damaged, scanning the file");
            map.clear();
            trailers.clear();
            scan(&data, &mut map, &mut trailers);
            // The newest trailer candidate is the one found last.
            trailers.reverse();
        }

        if trailers.iter().any(|t| t.contains_key(ENCRYPT)) {
            return Err(LoadError::Encrypted);
        }

        let xref = Self(Arc::new(Repr {
            data,
            map: RwLock::new(map),
            trailers,
            cache: RwLock::new(FxHashMap::default()),
            obj_stms: Mutex::new(FxHashMap::default()),
            in_flight: Mutex::new(FxHashSet::default()),
            repaired: AtomicBool::new(false),
        }));

        if xref.catalog().is_none() {
            return Err(LoadError::MalformedPdf);
        }

        Ok(xref)
    }

    /// The number of known objects.
    pub fn entry_count(&self) -> usize {
        self.0.map.read().unwrap().len()
    }

    /// The raw bytes of the whole file.
    pub fn data(&self) -> &[u8] {
        &self.0.data
    }

    /// The value stored under `key` in the effective trailer: the newest
    /// trailer that carries the key wins.
    pub fn trailer_value(&self, key: &str) -> Option<&Object> {
        self.0.trailers.iter().find_map(|t| t.get_raw(key))
    }

    /// The document catalog: the newest trailer whose `/Root` resolves to a
    /// dictionary with a page tree wins.
    pub fn catalog(&self) -> Option<Dict> {
        let mut fallback = None;

        for trailer in &self.0.trailers {
            let Some(root) = trailer.get_raw(ROOT) else {
                continue;
            };
            if let Some(dict) = self.resolve(root).as_dict() {
                if dict.contains_key(PAGES) {
                    return Some(dict.clone());
                }
                fallback.get_or_insert_with(|| dict.clone());
            }
        }

        fallback
    }

    /// The `/Info` dictionary, if present.
    pub fn info(&self) -> Option<Dict> {
        let info = self.resolve(self.trailer_value(INFO)?);
        info.as_dict().cloned()
    }

    /// Follow `obj` if it is a reference; otherwise return it unchanged.
    /// Unresolvable references yield null.
    pub fn resolve(&self, obj: &Object) -> Object {
        match obj {
            Object::Ref(r) => self.get(*r),
            other => other.clone(),
        }
    }

    /// Materialize the object with the given reference. Free, missing and
    /// unreadable objects come back as null.
    pub fn get(&self, r: ObjRef) -> Object {
        if let Some(cached) = self.0.cache.read().unwrap().get(&r.num) {
            return cached.clone();
        }

        {
            let mut in_flight = self.0.in_flight.lock().unwrap();
            if !in_flight.insert(r.num) {
                warn!("object {r} refers to itself while being materialized");
                return Object::Null;
            }
        }

        let result = self.materialize(r);
        self.0.in_flight.lock().unwrap().remove(&r.num);

        self.0
            .cache
            .write()
            .unwrap()
            .entry(r.num)
            .or_insert_with(|| result.clone());

        result
    }

    fn materialize(&self, r: ObjRef) -> Object {
        let entry = self.0.map.read().unwrap().get(&r.num).copied();

        match entry {
            // An indirect reference to an undefined object is not an error;
            // it reads as null.
            None | Some(Entry::Free) => Object::Null,
            Some(Entry::Offset { pos, gen }) => {
                if gen != r.gen {
                    warn!("generation mismatch for object {}", r.num);
                }

                if let Some((id, obj)) = Parser::at(&self.0.data, pos).parse_indirect(self) {
                    if id.num == r.num {
                        return obj;
                    }
                }

                // The offset is wrong; rebuild the table once and retry.
                if self.0.repaired.swap(true, Ordering::SeqCst) {
                    error!("object {} unreadable even after repair", r.num);
                    Object::Null
                } else {
                    warn!("broken xref entry for object {}, repairing", r.num);
                    self.repair();
                    self.materialize(r)
                }
            }
            Some(Entry::InStream { stream_num, index }) => self
                .object_stream_member(stream_num, index)
                .unwrap_or(Object::Null),
        }
    }

    fn repair(&self) {
        let mut map = EntryMap::default();
        let mut trailers = vec![];
        scan(&self.0.data, &mut map, &mut trailers);

        *self.0.map.write().unwrap() = map;
    }

    fn object_stream_member(&self, stream_num: u32, index: u32) -> Option<Object> {
        let stm = self.load_object_stream(stream_num)?;
        let &(_, offset) = stm.offsets.get(index as usize)?;

        Parser::at(&stm.data, offset).parse_object(self)
    }

    /// Object streams are decoded once on first access; members materialize
    /// lazily by index.
    fn load_object_stream(&self, stream_num: u32) -> Option<Arc<ObjStm>> {
        if let Some(cached) = self.0.obj_stms.lock().unwrap().get(&stream_num) {
            return cached.clone();
        }

        let loaded = self.load_object_stream_uncached(stream_num);
        self.0
            .obj_stms
            .lock()
            .unwrap()
            .entry(stream_num)
            .or_insert(loaded)
            .clone()
    }

    fn load_object_stream_uncached(&self, stream_num: u32) -> Option<Arc<ObjStm>> {
        let stream = self
            .get(ObjRef::new(stream_num, 0))
            .as_stream()
            .cloned()?;

        let data = stream.decoded(self).ok()?;
        let num_objects = stream.dict().get::<usize>(N, self)?;
        let first = stream.dict().get::<usize>(FIRST, self)?;

        let offsets = parse_object_stream_header(&data, num_objects, first)?;

        Some(Arc::new(ObjStm { data, offsets }))
    }
}

fn parse_object_stream_header(
    data: &[u8],
    num_objects: usize,
    first: usize,
) -> Option<Vec<(u32, usize)>> {
    let mut lexer = Lexer::new(data);
    let mut offsets = Vec::with_capacity(num_objects);

    for _ in 0..num_objects {
        let num = match lexer.try_token()?.kind {
            TokenKind::Integer(i) => u32::try_from(i).ok()?,
            _ => return None,
        };
        let rel = match lexer.try_token()?.kind {
            TokenKind::Integer(i) => usize::try_from(i).ok()?,
            _ => return None,
        };
        offsets.push((num, first + rel));
    }

    Some(offsets)
}

/// Find the byte offset the final `startxref` points at.
fn find_startxref(data: &[u8]) -> Option<usize> {
    let window_start = data.len().saturating_sub(STARTXREF_WINDOW);
    let window = &data[window_start..];

    let needle = b"startxref";
    let at = window
        .windows(needle.len())
        .rposition(|w| w == needle)?;

    let mut lexer = Lexer::at(data, window_start + at + needle.len());
    match lexer.try_token()?.kind {
        TokenKind::Integer(i) => usize::try_from(i).ok(),
        _ => None,
    }
}

/// Read the xref section at `pos` into `map`, following `/Prev` and
/// `/XRefStm`. Older sections are inserted before newer entries so that the
/// newest definition of any object number wins.
fn populate(
    data: &Arc<[u8]>,
    pos: usize,
    map: &mut EntryMap,
    visited: &mut FxHashSet<usize>,
    trailers: &mut Vec<Dict>,
) -> Option<()> {
    if pos >= data.len() {
        return None;
    }

    if !visited.insert(pos) {
        // A cycle in the /Prev chain; ignore the repeated section.
        return Some(());
    }

    let mut lexer = Lexer::at(data, pos);
    let saved = lexer.clone();

    if matches!(lexer.try_token().map(|t| t.kind), Some(TokenKind::Keyword(b"xref"))) {
        populate_from_table(data, lexer, map, visited, trailers)
    } else {
        populate_from_stream(data, saved.pos(), map, visited, trailers)
    }
}

fn populate_from_table(
    data: &Arc<[u8]>,
    mut lexer: Lexer,
    map: &mut EntryMap,
    visited: &mut FxHashSet<usize>,
    trailers: &mut Vec<Dict>,
) -> Option<()> {
    let mut sections: Vec<(u32, Entry)> = vec![];

    loop {
        let saved = lexer.clone();
        match lexer.try_token()?.kind {
            TokenKind::Integer(start) => {
                let start = u32::try_from(start).ok()?;
                let count = match lexer.try_token()?.kind {
                    TokenKind::Integer(c) => u32::try_from(c).ok()?,
                    _ => return None,
                };

                for i in 0..count {
                    let offset = match lexer.try_token()?.kind {
                        TokenKind::Integer(o) => usize::try_from(o).ok()?,
                        _ => return None,
                    };
                    let gen = match lexer.try_token()?.kind {
                        TokenKind::Integer(g) => u16::try_from(g).unwrap_or(0),
                        _ => return None,
                    };
                    let entry = match lexer.try_token()?.kind {
                        TokenKind::Keyword(b"n") => Entry::Offset { pos: offset, gen },
                        TokenKind::Keyword(b"f") => Entry::Free,
                        _ => return None,
                    };

                    sections.push((start + i, entry));
                }
            }
            TokenKind::Keyword(b"trailer") => break,
            _ => {
                lexer = saved;
                break;
            }
        }
    }

    let trailer = {
        let mut parser = Parser::at(data, lexer.pos());
        parser
            .parse_object(&XRef::empty())
            .and_then(|o| o.as_dict().cloned())?
    };

    // Trailers collect newest-first: this revision's dict goes in before the
    // chain is followed.
    trailers.push(trailer.clone());

    // Older revisions first, so this revision's entries overwrite theirs.
    if let Some(prev) = trailer_int(&trailer, PREV) {
        let _ = populate(data, prev, map, visited, trailers);
    }

    for (num, entry) in sections {
        map.insert(num, entry);
    }

    // In hybrid files the xref stream's entries take precedence over the
    // classical section of the same revision, so they are inserted last.
    if let Some(stm) = trailer_int(&trailer, XREF_STM) {
        let _ = populate(data, stm, map, visited, trailers);
    }

    Some(())
}

fn trailer_int(trailer: &Dict, key: &str) -> Option<usize> {
    trailer.get_raw(key)?.as_i64().and_then(|i| usize::try_from(i).ok())
}

fn populate_from_stream(
    data: &Arc<[u8]>,
    pos: usize,
    map: &mut EntryMap,
    visited: &mut FxHashSet<usize>,
    trailers: &mut Vec<Dict>,
) -> Option<()> {
    let empty = XRef::empty();
    let (_, obj) = Parser::at(data, pos).parse_indirect(&empty)?;
    let stream = obj.as_stream()?;
    let dict = stream.dict().clone();

    trailers.push(dict.clone());

    if let Some(prev) = trailer_int(&dict, PREV) {
        let _ = populate(data, prev, map, visited, trailers);
    }

    let size = dict.get::<u32>(SIZE, &empty)?;
    let widths = dict
        .get::<Vec<u32>>(W, &empty)
        .filter(|w| w.len() == 3)?;
    let [f1, f2, f3] = [widths[0], widths[1], widths[2]];

    if f1 > 4 || f2 > 8 || f3 > 8 {
        error!("xref stream field widths out of range");
        return None;
    }

    let subsections: Vec<(u32, u32)> = match dict.get_raw(INDEX) {
        Some(Object::Array(arr)) => {
            let nums: Vec<u32> = arr.typed::<u32>(&empty).collect();
            nums.chunks(2)
                .filter(|c| c.len() == 2)
                .map(|c| (c[0], c[1]))
                .collect()
        }
        _ => vec![(0, size)],
    };

    let decoded = stream.decoded(&empty).ok()?;
    let mut cursor = crate::cursor::Cursor::new(decoded.as_ref());

    let read_field = |cursor: &mut crate::cursor::Cursor, len: u32| -> Option<u64> {
        let mut value = 0u64;
        for _ in 0..len {
            value = (value << 8) | cursor.bump()? as u64;
        }
        Some(value)
    };

    for (start, count) in subsections {
        for i in 0..count {
            // A missing first field defaults to type 1.
            let kind = if f1 == 0 { 1 } else { read_field(&mut cursor, f1)? };
            let second = read_field(&mut cursor, f2)?;
            let third = read_field(&mut cursor, f3)?;

            let num = start + i;
            let entry = match kind {
                0 => Entry::Free,
                1 => Entry::Offset {
                    pos: second as usize,
                    gen: third as u16,
                },
                2 => Entry::InStream {
                    stream_num: second as u32,
                    index: third as u32,
                },
                other => {
                    warn!("unknown xref stream entry type {other}");
                    continue;
                }
            };

            map.insert(num, entry);
        }
    }

    Some(())
}

/// Rebuild the table by locating every `N G obj` header in the file.
fn scan(data: &Arc<[u8]>, map: &mut EntryMap, trailers: &mut Vec<Dict>) {
    let empty = XRef::empty();
    let mut pos = 0usize;

    while pos < data.len() {
        let b = data[pos];

        if b == b't' && data[pos..].starts_with(b"trailer") {
            let mut parser = Parser::at(data, pos + b"trailer".len());
            if let Some(dict) = parser
                .parse_object(&empty)
                .and_then(|o| o.as_dict().cloned())
            {
                if dict.contains_key(ROOT) {
                    trailers.push(dict);
                }
                pos = parser.pos();
                continue;
            }
        }

        let at_number = b.is_ascii_digit()
            && (pos == 0 || !crate::trivia::is_regular(data[pos - 1]));

        if at_number {
            let mut parser = Parser::at(data, pos);
            if let Some((id, obj)) = parser.parse_indirect(&empty) {
                map.insert(id.num, Entry::Offset { pos, gen: id.gen });

                match &obj {
                    Object::Dict(d) if d.contains_key(ROOT) => trailers.push(d.clone()),
                    Object::Stream(s) => {
                        let d = s.dict();
                        if d.contains_key(ROOT) {
                            trailers.push(d.clone());
                        }
                        if d.get_raw(TYPE).and_then(Object::as_name).map(Name::as_str)
                            == Some("ObjStm")
                        {
                            register_scanned_members(s, id.num, map, &empty);
                        }
                    }
                    _ => {}
                }

                pos = parser.pos();
                continue;
            }
        }

        pos += 1;
    }

    warn!("recovery scan found {} objects", map.len());
}

/// Members of an object stream found during recovery. Entries already found
/// as top-level definitions are not replaced.
fn register_scanned_members(stream: &Stream, stream_num: u32, map: &mut EntryMap, xref: &XRef) {
    let Ok(data) = stream.decoded(xref) else {
        return;
    };
    let (Some(n), Some(first)) = (
        stream.dict().get::<usize>(N, xref),
        stream.dict().get::<usize>(FIRST, xref),
    ) else {
        return;
    };

    if let Some(offsets) = parse_object_stream_header(&data, n, first) {
        for (index, (num, _)) in offsets.iter().enumerate() {
            map.entry(*num).or_insert(Entry::InStream {
                stream_num,
                index: index as u32,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_simple_pdf() -> Vec<u8> {
        crate::test_pdf::PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
            .object(
                3,
                b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 200] /Contents 4 0 R >>",
            )
            .stream(4, b"<< >>", b"")
            .build()
    }

    #[test]
    fn loads_a_classical_table() {
        let data: Arc<[u8]> = build_simple_pdf().into();
        let xref = XRef::load(data).unwrap();
        assert!(xref.catalog().is_some());
        assert_eq!(xref.entry_count(), 5);
    }

    #[test]
    fn missing_object_is_null() {
        let data: Arc<[u8]> = build_simple_pdf().into();
        let xref = XRef::load(data).unwrap();
        assert_eq!(xref.get(ObjRef::new(99, 0)), Object::Null);
    }

    #[test]
    fn shared_identity_across_resolutions() {
        let data: Arc<[u8]> = build_simple_pdf().into();
        let xref = XRef::load(data).unwrap();

        let a = xref.get(ObjRef::new(2, 0));
        let b = xref.get(ObjRef::new(2, 0));
        let (Object::Dict(a), Object::Dict(b)) = (a, b) else {
            panic!("expected dicts");
        };
        assert!(a.same_identity(&b));
    }

    #[test]
    fn encrypted_trailer_is_rejected() {
        let data = crate::test_pdf::PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [] /Count 0 >>")
            .trailer_extra(b"/Encrypt 9 0 R")
            .build();
        let err = XRef::load(data.into()).unwrap_err();
        assert_eq!(err, LoadError::Encrypted);
    }

    #[test]
    fn recovery_scan_rebuilds_broken_xref() {
        let mut data = build_simple_pdf();

        // Damage the startxref offset so the bootstrap fails.
        let pos = data
            .windows(9)
            .rposition(|w| w == b"startxref")
            .unwrap();
        for b in &mut data[pos + 10..pos + 12] {
            *b = b'9';
        }

        let xref = XRef::load(data.into()).unwrap();
        assert!(xref.catalog().is_some());
    }

    /// Assemble a PDF 1.5 file whose xref is a `/Type /XRef` stream and whose
    /// page tree lives in a compressed object stream.
    fn build_xref_stream_pdf() -> Vec<u8> {
        let mut out = b"%PDF-1.5\n".to_vec();

        let obj1_pos = out.len();
        out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        // Objects 2 and 3 live in object stream 4.
        let member_a = b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>";
        let member_b = b"<< /Type /Page /MediaBox [0 0 100 200] >>";
        let header = format!("2 0 3 {}\n", member_a.len() + 1);

        let mut stm_data = header.clone().into_bytes();
        stm_data.extend_from_slice(member_a);
        stm_data.push(b' ');
        stm_data.extend_from_slice(member_b);

        let obj4_pos = out.len();
        out.extend_from_slice(
            format!(
                "4 0 obj\n<< /Type /ObjStm /N 2 /First {} /Length {} >>\nstream\n",
                header.len(),
                stm_data.len()
            )
            .as_bytes(),
        );
        out.extend_from_slice(&stm_data);
        out.extend_from_slice(b"\nendstream\nendobj\n");

        // The xref stream itself, with W [1 2 1].
        let xref_pos = out.len();
        let mut entries: Vec<u8> = vec![];
        let mut push_entry = |kind: u8, second: u16, third: u8| {
            entries.push(kind);
            entries.extend_from_slice(&second.to_be_bytes());
            entries.push(third);
        };
        push_entry(0, 0, 0);
        push_entry(1, obj1_pos as u16, 0);
        push_entry(2, 4, 0);
        push_entry(2, 4, 1);
        push_entry(1, obj4_pos as u16, 0);
        push_entry(1, xref_pos as u16, 0);

        out.extend_from_slice(
            format!(
                "5 0 obj\n<< /Type /XRef /Size 6 /W [1 2 1] /Root 1 0 R /Length {} >>\nstream\n",
                entries.len()
            )
            .as_bytes(),
        );
        out.extend_from_slice(&entries);
        out.extend_from_slice(b"\nendstream\nendobj\n");

        out.extend_from_slice(format!("startxref\n{xref_pos}\n%%EOF\n").as_bytes());
        out
    }

    #[test]
    fn xref_stream_and_object_streams() {
        let xref = XRef::load(build_xref_stream_pdf().into()).unwrap();

        let catalog = xref.catalog().unwrap();
        assert!(catalog.contains_key(PAGES));

        // Object 3 comes out of the object stream.
        let page = xref.get(ObjRef::new(3, 0));
        let dict = page.as_dict().unwrap();
        assert!(dict.contains_key("MediaBox"));
    }

    #[test]
    fn hybrid_xref_stream_wins() {
        let mut out = b"%PDF-1.5\n".to_vec();

        let obj1_pos = out.len();
        out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        let old_pos = out.len();
        out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 /Marker (old) >>\nendobj\n");

        let new_pos = out.len();
        out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 /Marker (new) >>\nendobj\n");

        // An xref stream that maps object 2 to the newer copy.
        let stm_pos = out.len();
        let mut entries: Vec<u8> = vec![];
        let mut push_entry = |kind: u8, second: u16, third: u8| {
            entries.push(kind);
            entries.extend_from_slice(&second.to_be_bytes());
            entries.push(third);
        };
        push_entry(1, new_pos as u16, 0);
        push_entry(1, stm_pos as u16, 0);

        out.extend_from_slice(
            format!(
                "3 0 obj\n<< /Type /XRef /Size 4 /Index [2 2] /W [1 2 1] /Root 1 0 R /Length {} >>\nstream\n",
                entries.len()
            )
            .as_bytes(),
        );
        out.extend_from_slice(&entries);
        out.extend_from_slice(b"\nendstream\nendobj\n");

        // The classical section maps object 2 to the older copy.
        let table_pos = out.len();
        out.extend_from_slice(b"xref\n0 3\n");
        out.extend_from_slice(b"0000000000 65535 f \n");
        out.extend_from_slice(format!("{obj1_pos:010} 00000 n \n").as_bytes());
        out.extend_from_slice(format!("{old_pos:010} 00000 n \n").as_bytes());
        out.extend_from_slice(
            format!("trailer\n<< /Size 4 /Root 1 0 R /XRefStm {stm_pos} >>\nstartxref\n{table_pos}\n%%EOF\n")
                .as_bytes(),
        );

        let xref = XRef::load(out.into()).unwrap();

        // The hybrid stream entry shadows the classical one.
        let pages = xref.get(ObjRef::new(2, 0));
        let marker: crate::object::PdfString =
            pages.as_dict().unwrap().get("Marker", &xref).unwrap();
        assert_eq!(marker.as_bytes(), b"new");
    }

    #[test]
    fn prev_chain_newest_wins() {
        // An update overrides object 2 and frees object 3.
        let base = crate::test_pdf::PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [] /Count 0 /Marker (old) >>")
            .object(3, b"(doomed)")
            .build();

        let data = crate::test_pdf::PdfBuilder::update(base)
            .object(2, b"<< /Type /Pages /Kids [] /Count 0 /Marker (new) >>")
            .free(3)
            .build();

        let xref = XRef::load(data.into()).unwrap();

        let pages = xref.get(ObjRef::new(2, 0));
        let marker: crate::object::PdfString = pages
            .as_dict()
            .unwrap()
            .get("Marker", &xref)
            .unwrap();
        assert_eq!(marker.as_bytes(), b"new");

        // The newer revision marks object 3 as free: it resolves to null.
        assert_eq!(xref.get(ObjRef::new(3, 0)), Object::Null);
    }
}
