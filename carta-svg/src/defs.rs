//! Deduplicated, referenced resources: clip paths, gradients and fonts.

use carta_interpret::shading::{Shading, ShadingKind};
use carta_interpret::{ClipPath, FillRule, Font};
use rustc_hash::FxHashMap;
use std::fmt;

/// An identifier in the emitted `<defs>` block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Id(pub char, pub usize);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0, self.1)
    }
}

/// Assigns stable identifiers to values, deduplicating by a content key.
pub(crate) struct Deduplicator<T> {
    kind: char,
    values: Vec<T>,
    by_key: FxHashMap<String, Id>,
}

impl<T> Deduplicator<T> {
    pub(crate) fn new(kind: char) -> Self {
        Self {
            kind,
            values: Vec::new(),
            by_key: FxHashMap::default(),
        }
    }

    /// The id for `key`, inserting `value()` when it is new. Ids are handed
    /// out in first-seen order, which keeps the output deterministic.
    pub(crate) fn insert_with(&mut self, key: String, value: impl FnOnce() -> T) -> Id {
        if let Some(id) = self.by_key.get(&key) {
            return *id;
        }

        let id = Id(self.kind, self.values.len());
        self.values.push(value());
        self.by_key.insert(key, id);
        id
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Id, &T)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (Id(self.kind, i), v))
    }
}

pub(crate) struct CachedClip {
    pub(crate) path_data: String,
    pub(crate) rule: FillRule,
}

impl CachedClip {
    pub(crate) fn key(clip: &ClipPath, path_data: &str) -> String {
        format!("{path_data}|{:?}", clip.rule)
    }
}

pub(crate) struct CachedGradient {
    pub(crate) shading: Shading,
}

impl CachedGradient {
    pub(crate) fn key(shading: &Shading) -> String {
        let mut key = String::new();

        match shading.kind {
            ShadingKind::Axial { from, to } => {
                key.push_str(&format!("A{:?}{:?}", from, to));
            }
            ShadingKind::Radial { from, to } => {
                key.push_str(&format!("R{:?}{:?}", from, to));
            }
        }

        for stop in &shading.stops {
            key.push_str(&format!("|{:?}{:?}", stop.offset, stop.rgb));
        }
        key.push_str(&format!("|{:?}", shading.extend));

        key
    }
}

pub(crate) struct CachedFont {
    pub(crate) font: Font,
}

impl CachedFont {
    pub(crate) fn key(font: &Font) -> String {
        format!("font-{}", font.identity_key())
    }
}
