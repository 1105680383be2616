//! Axial and radial shadings.
//!
//! A shading dictionary is reduced to its geometry plus a sampled color
//! ramp, which maps directly onto an SVG gradient. Shading types other than
//! axial (2) and radial (3) are skipped with a warning.

use crate::color::ColorSpace;
use crate::function::Function;
use carta_syntax::object::name::keys::{
    COLOR_SPACE, COORDS, EXTEND, FUNCTION, SHADING_TYPE,
};
use carta_syntax::{Object, XRef};
use log::warn;

/// The number of points the color function is sampled at.
const RAMP_SAMPLES: usize = 32;

/// A color stop of a shading ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stop {
    /// The offset along the axis, `0.0..=1.0`.
    pub offset: f32,
    /// The stop color.
    pub rgb: [f32; 3],
}

/// The geometry of a shading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShadingKind {
    /// A linear gradient between two points.
    Axial {
        /// The start point.
        from: (f32, f32),
        /// The end point.
        to: (f32, f32),
    },
    /// A radial gradient between two circles.
    Radial {
        /// The start circle: center and radius.
        from: (f32, f32, f32),
        /// The end circle: center and radius.
        to: (f32, f32, f32),
    },
}

/// A shading, reduced to geometry plus color stops.
#[derive(Debug, Clone)]
pub struct Shading {
    /// The gradient geometry.
    pub kind: ShadingKind,
    /// The color ramp, with offsets increasing.
    pub stops: Vec<Stop>,
    /// Whether the gradient extends beyond its start and end.
    pub extend: (bool, bool),
}

impl Shading {
    /// Build a shading from its dictionary (or stream) object.
    pub fn parse(obj: &Object, xref: &XRef) -> Option<Shading> {
        let (dict, _) = carta_syntax::object::dict_or_stream(obj)?;

        let ty = dict.get::<i32>(SHADING_TYPE, xref)?;
        let coords = dict.get::<Vec<f32>>(COORDS, xref)?;

        let kind = match ty {
            2 if coords.len() >= 4 => ShadingKind::Axial {
                from: (coords[0], coords[1]),
                to: (coords[2], coords[3]),
            },
            3 if coords.len() >= 6 => ShadingKind::Radial {
                from: (coords[0], coords[1], coords[2]),
                to: (coords[3], coords[4], coords[5]),
            },
            other => {
                warn!("unsupported shading type {other}");
                return None;
            }
        };

        let space = dict
            .get_raw(COLOR_SPACE)
            .and_then(|o| ColorSpace::parse(&xref.resolve(o), xref).ok())
            .unwrap_or(ColorSpace::DeviceRgb);

        let functions: Vec<Function> = match dict.get_raw(FUNCTION).map(|o| xref.resolve(o)) {
            Some(Object::Array(arr)) => arr
                .iter()
                .filter_map(|o| Function::parse(&xref.resolve(o), xref))
                .collect(),
            Some(obj) => Function::parse(&obj, xref).into_iter().collect(),
            None => vec![],
        };

        if functions.is_empty() {
            warn!("shading without a usable color function");
            return None;
        }

        let extend = dict
            .get::<Vec<bool>>(EXTEND, xref)
            .map(|e| {
                (
                    e.first().copied().unwrap_or(false),
                    e.get(1).copied().unwrap_or(false),
                )
            })
            .unwrap_or((false, false));

        let stops = sample_ramp(&space, &functions);

        Some(Shading {
            kind,
            stops,
            extend,
        })
    }
}

/// Sample the color function(s) into a fixed ramp. A function array carries
/// one single-output function per color component.
fn sample_ramp(space: &ColorSpace, functions: &[Function]) -> Vec<Stop> {
    (0..=RAMP_SAMPLES)
        .map(|i| {
            let t = i as f32 / RAMP_SAMPLES as f32;

            let components: Vec<f32> = if functions.len() == 1 {
                functions[0].eval(&[t]).to_vec()
            } else {
                functions
                    .iter()
                    .map(|f| f.eval(&[t]).first().copied().unwrap_or(0.0))
                    .collect()
            };

            Stop {
                offset: t,
                rgb: space.to_rgb(&components),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Shading, ShadingKind};
    use carta_syntax::{Document, ObjRef};

    #[test]
    fn axial_ramp() {
        let data = carta_syntax::test_pdf::PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [] /Count 0 >>")
            .object(
                3,
                b"<< /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 100 0] \
                  /Extend [true false] \
                  /Function << /FunctionType 2 /Domain [0 1] /C0 [1 0 0] /C1 [0 0 1] /N 1 >> >>",
            )
            .build();

        let doc = Document::load(data).unwrap();
        let xref = doc.xref();
        let shading = Shading::parse(&xref.get(ObjRef::new(3, 0)), xref).unwrap();

        assert!(matches!(shading.kind, ShadingKind::Axial { .. }));
        assert_eq!(shading.extend, (true, false));

        let first = shading.stops.first().unwrap();
        let last = shading.stops.last().unwrap();
        assert_eq!(first.rgb, [1.0, 0.0, 0.0]);
        assert_eq!(last.rgb, [0.0, 0.0, 1.0]);
    }
}
