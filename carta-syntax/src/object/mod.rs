//! The materialized PDF object model.
//!
//! Parsing yields immutable value trees. Composite values (arrays, dicts,
//! streams) are reference-counted, so cloning an [`Object`] is cheap and
//! shared identity is preserved. A value never owns another indirect object;
//! it stores the [`ObjRef`] key instead, and resolution goes through
//! [`crate::XRef`].

use crate::xref::XRef;
use std::fmt;
use std::sync::Arc;

pub mod date;
pub mod dict;
pub mod name;
pub mod rect;
pub mod stream;
pub mod string;

pub use date::DateTime;
pub use dict::Dict;
pub use name::Name;
pub use rect::Rect;
pub use stream::Stream;
pub use string::PdfString;

/// A reference to an indirect object: object number and generation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    /// The object number.
    pub num: u32,
    /// The generation number.
    pub gen: u16,
}

impl ObjRef {
    /// Create a new reference.
    pub fn new(num: u32, gen: u16) -> Self {
        Self { num, gen }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.num, self.gen)
    }
}

/// An ordered sequence of objects.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array(Arc<[Object]>);

impl Array {
    /// Create an array from materialized elements.
    pub fn new(items: Vec<Object>) -> Self {
        Self(items.into())
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw (unresolved) element at `idx`.
    pub fn get_raw(&self, idx: usize) -> Option<&Object> {
        self.0.get(idx)
    }

    /// The element at `idx`, resolved and converted.
    pub fn get<T: FromObject>(&self, idx: usize, xref: &XRef) -> Option<T> {
        T::from_object(&xref.resolve(self.0.get(idx)?), xref)
    }

    /// Iterate over the raw elements.
    pub fn iter(&self) -> impl Iterator<Item = &Object> + '_ {
        self.0.iter()
    }

    /// Iterate over resolved, converted elements. Elements that fail to
    /// convert are skipped.
    pub fn typed<'a, T: FromObject + 'a>(
        &'a self,
        xref: &'a XRef,
    ) -> impl Iterator<Item = T> + 'a {
        self.0
            .iter()
            .filter_map(move |o| T::from_object(&xref.resolve(o), xref))
    }
}

/// A primitive PDF object.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Object {
    /// The null object.
    #[default]
    Null,
    /// A boolean.
    Boolean(bool),
    /// An integer.
    Integer(i64),
    /// A real number.
    Real(f32),
    /// A name.
    Name(Name),
    /// A string (an opaque byte sequence).
    String(PdfString),
    /// An array.
    Array(Array),
    /// A dictionary.
    Dict(Dict),
    /// A stream.
    Stream(Stream),
    /// An indirect reference.
    Ref(ObjRef),
}

impl Object {
    /// The numeric value, if this is an integer or real.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// The numeric value as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_f32().map(|v| v as f64)
    }

    /// The integer value; reals are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            Object::Real(r) => Some(*r as i64),
            _ => None,
        }
    }

    /// Whether this is the null object.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// The name value, if this is a name.
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    /// The dict, if this is a dict or a stream (a stream's dict).
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dict(d) => Some(d),
            Object::Stream(s) => Some(s.dict()),
            _ => None,
        }
    }

    /// The array, if this is an array.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The stream, if this is a stream.
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// The string, if this is a string.
    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// The reference, if this is an indirect reference.
    pub fn as_ref_id(&self) -> Option<ObjRef> {
        match self {
            Object::Ref(r) => Some(*r),
            _ => None,
        }
    }
}

/// Conversion of a resolved object into a concrete Rust value.
pub trait FromObject: Sized {
    /// Convert `obj` (already resolved, never `Object::Ref`) into `Self`.
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self>;
}

impl FromObject for Object {
    fn from_object(obj: &Object, _: &XRef) -> Option<Self> {
        Some(obj.clone())
    }
}

impl FromObject for bool {
    fn from_object(obj: &Object, _: &XRef) -> Option<Self> {
        match obj {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromObject for f32 {
    fn from_object(obj: &Object, _: &XRef) -> Option<Self> {
        obj.as_f32()
    }
}

impl FromObject for f64 {
    fn from_object(obj: &Object, _: &XRef) -> Option<Self> {
        obj.as_f64()
    }
}

macro_rules! int_from_object {
    ($($t:ty),*) => {
        $(impl FromObject for $t {
            fn from_object(obj: &Object, _: &XRef) -> Option<Self> {
                obj.as_i64().and_then(|i| <$t>::try_from(i).ok())
            }
        })*
    };
}

int_from_object!(i64, i32, u32, u16, u8, usize);

impl FromObject for Name {
    fn from_object(obj: &Object, _: &XRef) -> Option<Self> {
        obj.as_name().cloned()
    }
}

impl FromObject for PdfString {
    fn from_object(obj: &Object, _: &XRef) -> Option<Self> {
        obj.as_string().cloned()
    }
}

impl FromObject for Dict {
    fn from_object(obj: &Object, _: &XRef) -> Option<Self> {
        obj.as_dict().cloned()
    }
}

impl FromObject for Stream {
    fn from_object(obj: &Object, _: &XRef) -> Option<Self> {
        obj.as_stream().cloned()
    }
}

impl FromObject for Array {
    fn from_object(obj: &Object, _: &XRef) -> Option<Self> {
        obj.as_array().cloned()
    }
}

impl<T: FromObject> FromObject for Vec<T> {
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
        let arr = obj.as_array()?;
        Some(arr.typed::<T>(xref).collect())
    }
}

impl FromObject for DateTime {
    fn from_object(obj: &Object, _: &XRef) -> Option<Self> {
        DateTime::parse(obj.as_string()?.as_bytes())
    }
}

impl FromObject for Rect {
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
        let arr = obj.as_array()?;
        let mut it = arr.typed::<f32>(xref);
        Rect::from_corners(it.next()?, it.next()?, it.next()?, it.next()?)
    }
}

/// Extract a dict, and the stream it came from if the object is a stream.
pub fn dict_or_stream(obj: &Object) -> Option<(Dict, Option<Stream>)> {
    match obj {
        Object::Dict(d) => Some((d.clone(), None)),
        Object::Stream(s) => Some((s.dict().clone(), Some(s.clone()))),
        _ => None,
    }
}
