//! Streams.

use crate::error::FilterError;
use crate::filter;
use crate::object::Dict;
use crate::xref::XRef;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A stream object: a dictionary plus a byte producer.
///
/// The raw bytes are kept as stored in the file; [`Stream::decoded`] runs the
/// declared filter chain exactly once and memoizes the outcome.
#[derive(Clone)]
pub struct Stream(Arc<Repr>);

struct Repr {
    dict: Dict,
    raw: Arc<[u8]>,
    decoded: OnceLock<Result<Arc<[u8]>, FilterError>>,
}

impl Stream {
    /// Create a stream from its dictionary and raw (still encoded) bytes.
    pub fn new(dict: Dict, raw: Vec<u8>) -> Self {
        Self(Arc::new(Repr {
            dict,
            raw: raw.into(),
            decoded: OnceLock::new(),
        }))
    }

    /// The stream's dictionary.
    pub fn dict(&self) -> &Dict {
        &self.0.dict
    }

    /// The raw bytes, before any filter is applied.
    pub fn raw(&self) -> &[u8] {
        &self.0.raw
    }

    /// The effective bytes of the stream: the raw bytes pushed through the
    /// declared filter chain. Image filters (DCT, CCITT) pass through
    /// untouched; use [`Stream::pending_image_filter`] to find out whether
    /// the result still carries encoded image data.
    pub fn decoded(&self, xref: &XRef) -> Result<Arc<[u8]>, FilterError> {
        self.0
            .decoded
            .get_or_init(|| {
                filter::decode_chain(&self.0.raw, &self.0.dict, xref).map(Arc::from)
            })
            .clone()
    }

    /// The image filter the chain stopped at, if any.
    pub fn pending_image_filter(&self, xref: &XRef) -> Option<filter::Filter> {
        filter::chain(&self.0.dict, xref)
            .into_iter()
            .map(|(f, _)| f)
            .find(|f| f.is_image_filter())
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stream({} bytes, {:?})", self.0.raw.len(), self.0.dict)
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.dict == other.0.dict && self.0.raw == other.0.raw)
    }
}
