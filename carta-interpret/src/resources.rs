//! Resource dictionary lookup.

use carta_syntax::object::name::keys::{
    COLOR_SPACE, EXT_G_STATE, FONT, PATTERN, PROPERTIES, SHADING, XOBJECT,
};
use carta_syntax::{Dict, ObjRef, Object, Stream, XRef};
use std::sync::Arc;

/// The resources in scope for a content stream.
///
/// Form XObjects carry their own resource dictionary; names that are missing
/// there fall back to the invoking content's resources, which is what most
/// producers rely on even though the specification deprecates it.
#[derive(Clone)]
pub struct Resources {
    dict: Dict,
    parent: Option<Arc<Resources>>,
    xref: XRef,
}

impl Resources {
    /// Resources for a page.
    pub fn new(dict: Dict, xref: &XRef) -> Self {
        Self {
            dict,
            parent: None,
            xref: xref.clone(),
        }
    }

    /// Resources for a nested content stream, falling back to `parent`.
    pub fn nested(dict: Dict, parent: &Resources) -> Self {
        Self {
            dict,
            parent: Some(Arc::new(parent.clone())),
            xref: parent.xref.clone(),
        }
    }

    /// The xref of the owning document.
    pub fn xref(&self) -> &XRef {
        &self.xref
    }

    /// Look `name` up in the given category, walking the parent chain. The
    /// second value is the entry's object reference when it is indirect,
    /// usable as a cache key.
    fn lookup(&self, category: &str, name: &str) -> Option<(Object, Option<ObjRef>)> {
        let own = self
            .dict
            .get::<Dict>(category, &self.xref)
            .and_then(|sub| {
                let raw = sub.get_raw(name)?;
                let key = raw.as_ref_id();
                Some((self.xref.resolve(raw), key))
            });

        own.or_else(|| self.parent.as_ref()?.lookup(category, name))
    }

    /// A font dictionary from `/Font`.
    pub fn font(&self, name: &str) -> Option<(Dict, Option<ObjRef>)> {
        let (obj, key) = self.lookup(FONT, name)?;
        Some((obj.as_dict()?.clone(), key))
    }

    /// An external graphics state from `/ExtGState`.
    pub fn ext_g_state(&self, name: &str) -> Option<Dict> {
        self.lookup(EXT_G_STATE, name)?.0.as_dict().cloned()
    }

    /// An XObject stream from `/XObject`.
    pub fn x_object(&self, name: &str) -> Option<(Stream, Option<ObjRef>)> {
        let (obj, key) = self.lookup(XOBJECT, name)?;
        Some((obj.as_stream()?.clone(), key))
    }

    /// A color space object from `/ColorSpace`.
    pub fn color_space(&self, name: &str) -> Option<Object> {
        Some(self.lookup(COLOR_SPACE, name)?.0)
    }

    /// A shading object from `/Shading`.
    pub fn shading(&self, name: &str) -> Option<Object> {
        Some(self.lookup(SHADING, name)?.0)
    }

    /// A pattern object from `/Pattern`.
    pub fn pattern(&self, name: &str) -> Option<Object> {
        Some(self.lookup(PATTERN, name)?.0)
    }

    /// A property list from `/Properties`, used by marked content.
    pub fn property_list(&self, name: &str) -> Option<Dict> {
        self.lookup(PROPERTIES, name)?.0.as_dict().cloned()
    }
}
