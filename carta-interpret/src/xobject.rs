//! XObject attributes.

use carta_syntax::object::name::keys::{BBOX, GROUP, MATRIX, RESOURCES, S, SUBTYPE};
use carta_syntax::{Dict, Name, Rect, Stream, XRef};
use kurbo::Affine;
use log::warn;
use std::sync::Arc;

/// What a `Do` operand turned out to be.
pub(crate) enum XObject {
    Form(FormXObject),
    Image(Stream),
}

/// A form XObject, ready to execute.
pub(crate) struct FormXObject {
    pub(crate) content: Arc<[u8]>,
    pub(crate) matrix: Affine,
    pub(crate) bbox: Option<Rect>,
    pub(crate) resources: Option<Dict>,
    /// A `/Group /S /Transparency` entry. Blending being out of scope,
    /// such groups collapse to plain groups.
    pub(crate) is_transparency_group: bool,
}

pub(crate) fn classify(stream: &Stream, xref: &XRef) -> Option<XObject> {
    let dict = stream.dict();

    match dict.get::<Name>(SUBTYPE, xref).as_deref() {
        Some("Image") => Some(XObject::Image(stream.clone())),
        Some("Form") => {
            let content = match stream.decoded(xref) {
                Ok(data) => data,
                Err(e) => {
                    warn!("form content failed to decode: {e}");
                    return None;
                }
            };

            let matrix = dict
                .get::<Vec<f32>>(MATRIX, xref)
                .filter(|m| m.len() == 6)
                .map(|m| {
                    Affine::new([
                        m[0] as f64,
                        m[1] as f64,
                        m[2] as f64,
                        m[3] as f64,
                        m[4] as f64,
                        m[5] as f64,
                    ])
                })
                .unwrap_or(Affine::IDENTITY);

            let is_transparency_group = dict
                .get::<Dict>(GROUP, xref)
                .and_then(|g| g.get::<Name>(S, xref))
                .is_some_and(|s| s.as_str() == "Transparency");

            Some(XObject::Form(FormXObject {
                content,
                matrix,
                bbox: dict.get::<Rect>(BBOX, xref),
                resources: dict.get::<Dict>(RESOURCES, xref),
                is_transparency_group,
            }))
        }
        other => {
            warn!("unknown XObject subtype {other:?}");
            None
        }
    }
}
