//! Dictionaries.

use crate::object::{FromObject, Name, ObjRef, Object};
use crate::xref::XRef;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A dictionary object.
///
/// Keys are unique; insertion order is insignificant. Typed getters resolve
/// indirect references through the xref before converting.
#[derive(Debug, Clone, Default)]
pub struct Dict(Arc<FxHashMap<Name, Object>>);

impl Dict {
    /// Create a dictionary from its entries. Duplicate keys keep the last
    /// occurrence.
    pub fn new(entries: Vec<(Name, Object)>) -> Self {
        Self(Arc::new(entries.into_iter().collect()))
    }

    /// An empty dictionary.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The raw value for `key`, without resolving references.
    pub fn get_raw(&self, key: &str) -> Option<&Object> {
        self.0.get(key)
    }

    /// The value for `key`, resolved and converted. `None` when the key is
    /// absent, the reference dangles, or the value has the wrong type.
    pub fn get<T: FromObject>(&self, key: &str, xref: &XRef) -> Option<T> {
        let resolved = xref.resolve(self.0.get(key)?);
        T::from_object(&resolved, xref)
    }

    /// The reference stored under `key`, if the raw value is a reference.
    pub fn get_ref(&self, key: &str) -> Option<ObjRef> {
        self.0.get(key)?.as_ref_id()
    }

    /// Iterate over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &Name> + '_ {
        self.0.keys()
    }

    /// Iterate over raw entries.
    pub fn entries(&self) -> impl Iterator<Item = (&Name, &Object)> + '_ {
        self.0.iter()
    }

    /// Whether the two handles point at the same materialized value.
    pub fn same_identity(&self, other: &Dict) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::Dict;
    use crate::object::{Name, Object};
    use crate::xref::XRef;

    #[test]
    fn last_duplicate_wins() {
        let d = Dict::new(vec![
            (Name::new("K"), Object::Integer(1)),
            (Name::new("K"), Object::Integer(2)),
        ]);
        let xref = XRef::empty();
        assert_eq!(d.get::<i64>("K", &xref), Some(2));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn shared_identity_after_clone() {
        let d = Dict::new(vec![(Name::new("K"), Object::Null)]);
        let d2 = d.clone();
        assert!(d.same_identity(&d2));
    }
}
