//! PDF functions.
//!
//! Types 0 (sampled), 2 (exponential) and 3 (stitching) are evaluated; they
//! cover tint transforms and gradient color ramps. Type 4 calculator
//! functions are not supported and parse to `None`.

use carta_syntax::object::name::keys::{
    BITS_PER_SAMPLE, BOUNDS, C0, C1, DECODE, DOMAIN, ENCODE, FUNCTIONS, FUNCTION_TYPE, N, RANGE,
    SIZE,
};
use carta_syntax::{Object, Stream, XRef};
use log::warn;
use smallvec::SmallVec;

type Values = SmallVec<[f32; 4]>;

/// An evaluatable PDF function.
#[derive(Debug)]
pub struct Function {
    domain: Vec<(f32, f32)>,
    range: Option<Vec<(f32, f32)>>,
    kind: Kind,
}

#[derive(Debug)]
enum Kind {
    Sampled {
        size: Vec<u32>,
        bits_per_sample: u8,
        encode: Vec<(f32, f32)>,
        decode: Vec<(f32, f32)>,
        n_outputs: usize,
        samples: Vec<u8>,
    },
    Exponential {
        c0: Vec<f32>,
        c1: Vec<f32>,
        exponent: f32,
    },
    Stitching {
        functions: Vec<Function>,
        bounds: Vec<f32>,
        encode: Vec<(f32, f32)>,
    },
}

fn pairs(values: &[f32]) -> Vec<(f32, f32)> {
    values
        .chunks(2)
        .filter(|c| c.len() == 2)
        .map(|c| (c[0], c[1]))
        .collect()
}

impl Function {
    /// Parse a function from a dict or stream object.
    pub fn parse(obj: &Object, xref: &XRef) -> Option<Function> {
        let (dict, stream) = carta_syntax::object::dict_or_stream(obj)?;

        let ty = dict.get::<i32>(FUNCTION_TYPE, xref)?;
        let domain = pairs(&dict.get::<Vec<f32>>(DOMAIN, xref)?);
        let range = dict.get::<Vec<f32>>(RANGE, xref).map(|r| pairs(&r));

        let kind = match ty {
            0 => Self::parse_sampled(&dict, stream?, &domain, range.as_deref()?, xref)?,
            2 => {
                let c0 = dict.get::<Vec<f32>>(C0, xref).unwrap_or_else(|| vec![0.0]);
                let c1 = dict.get::<Vec<f32>>(C1, xref).unwrap_or_else(|| vec![1.0]);
                let exponent = dict.get::<f32>(N, xref)?;
                Kind::Exponential { c0, c1, exponent }
            }
            3 => {
                let functions: Vec<Function> = dict
                    .get::<Object>(FUNCTIONS, xref)?
                    .as_array()?
                    .iter()
                    .filter_map(|o| Function::parse(&xref.resolve(o), xref))
                    .collect();
                let bounds = dict.get::<Vec<f32>>(BOUNDS, xref).unwrap_or_default();
                let encode = pairs(&dict.get::<Vec<f32>>(ENCODE, xref).unwrap_or_default());

                if functions.len() != bounds.len() + 1 {
                    warn!("stitching function with mismatched /Bounds");
                    return None;
                }

                Kind::Stitching {
                    functions,
                    bounds,
                    encode,
                }
            }
            4 => {
                warn!("type 4 (calculator) functions are not supported");
                return None;
            }
            other => {
                warn!("unknown function type {other}");
                return None;
            }
        };

        Some(Function {
            domain,
            range,
            kind,
        })
    }

    fn parse_sampled(
        dict: &carta_syntax::Dict,
        stream: Stream,
        domain: &[(f32, f32)],
        range: &[(f32, f32)],
        xref: &XRef,
    ) -> Option<Kind> {
        let size = dict.get::<Vec<u32>>(SIZE, xref)?;
        let bits_per_sample = dict.get::<u8>(BITS_PER_SAMPLE, xref)?;

        if !matches!(bits_per_sample, 1 | 2 | 4 | 8 | 16 | 24 | 32) {
            return None;
        }

        let encode = dict
            .get::<Vec<f32>>(ENCODE, xref)
            .map(|e| pairs(&e))
            .unwrap_or_else(|| {
                size.iter()
                    .map(|s| (0.0, s.saturating_sub(1) as f32))
                    .collect()
            });
        let decode = dict
            .get::<Vec<f32>>(DECODE, xref)
            .map(|d| pairs(&d))
            .unwrap_or_else(|| range.to_vec());

        let samples = stream.decoded(xref).ok()?.to_vec();

        Some(Kind::Sampled {
            size,
            bits_per_sample,
            encode,
            decode,
            n_outputs: range.len(),
            samples,
        })
    }

    /// The number of output values.
    pub fn n_outputs(&self) -> usize {
        match &self.kind {
            Kind::Sampled { n_outputs, .. } => *n_outputs,
            Kind::Exponential { c0, .. } => c0.len(),
            Kind::Stitching { functions, .. } => {
                functions.first().map(|f| f.n_outputs()).unwrap_or(0)
            }
        }
    }

    /// Evaluate the function. Inputs are clamped to the domain, outputs to
    /// the range.
    pub fn eval(&self, inputs: &[f32]) -> Values {
        let clamped: Values = inputs
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let (lo, hi) = self.domain.get(i).copied().unwrap_or((0.0, 1.0));
                v.clamp(lo.min(hi), hi.max(lo))
            })
            .collect();

        let mut out = match &self.kind {
            Kind::Exponential { c0, c1, exponent } => {
                let x = clamped.first().copied().unwrap_or(0.0);
                let t = x.powf(*exponent);

                c0.iter()
                    .zip(c1.iter())
                    .map(|(a, b)| a + t * (b - a))
                    .collect()
            }
            Kind::Stitching {
                functions,
                bounds,
                encode,
            } => {
                let x = clamped.first().copied().unwrap_or(0.0);
                let (d0, d1) = self.domain.first().copied().unwrap_or((0.0, 1.0));

                let mut k = 0;
                while k < bounds.len() && x >= bounds[k] {
                    k += 1;
                }

                let lo = if k == 0 { d0 } else { bounds[k - 1] };
                let hi = if k == bounds.len() { d1 } else { bounds[k] };
                let (e0, e1) = encode.get(k).copied().unwrap_or((0.0, 1.0));

                let t = interpolate(x, lo, hi, e0, e1);
                functions[k].eval(&[t])
            }
            Kind::Sampled {
                size,
                bits_per_sample,
                encode,
                decode,
                n_outputs,
                samples,
            } => {
                // Multilinear interpolation is only carried on the first
                // input dimension; higher-dimensional sampled functions are
                // evaluated at the nearest grid line.
                let x = clamped.first().copied().unwrap_or(0.0);
                let (d0, d1) = self.domain.first().copied().unwrap_or((0.0, 1.0));
                let (e0, e1) = encode.first().copied().unwrap_or((0.0, 0.0));
                let n0 = size.first().copied().unwrap_or(1).max(1);

                let e = interpolate(x, d0, d1, e0, e1).clamp(0.0, (n0 - 1) as f32);
                let i0 = e.floor() as usize;
                let i1 = (i0 + 1).min(n0 as usize - 1);
                let frac = e - i0 as f32;

                (0..*n_outputs)
                    .map(|j| {
                        let s0 = read_sample(
                            samples,
                            *bits_per_sample,
                            i0 * n_outputs + j,
                        );
                        let s1 = read_sample(
                            samples,
                            *bits_per_sample,
                            i1 * n_outputs + j,
                        );
                        let max = ((1u64 << (*bits_per_sample).min(32)) - 1) as f32;
                        let raw = (s0 + (s1 - s0) * frac) / max;

                        let (dd0, dd1) = decode.get(j).copied().unwrap_or((0.0, 1.0));
                        dd0 + raw * (dd1 - dd0)
                    })
                    .collect()
            }
        };

        if let Some(range) = &self.range {
            for (i, v) in out.iter_mut().enumerate() {
                if let Some((lo, hi)) = range.get(i) {
                    *v = v.clamp(lo.min(*hi), hi.max(*lo));
                }
            }
        }

        out
    }
}

fn interpolate(x: f32, x0: f32, x1: f32, y0: f32, y1: f32) -> f32 {
    if (x1 - x0).abs() < f32::EPSILON {
        y0
    } else {
        y0 + (x - x0) * (y1 - y0) / (x1 - x0)
    }
}

fn read_sample(samples: &[u8], bits: u8, index: usize) -> f32 {
    let bit_pos = index * bits as usize;
    let mut value: u64 = 0;

    for i in 0..bits as usize {
        let pos = bit_pos + i;
        let byte = samples.get(pos / 8).copied().unwrap_or(0);
        let bit = (byte >> (7 - pos % 8)) & 1;
        value = (value << 1) | bit as u64;
    }

    value as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use carta_syntax::{Document, XRef};

    fn parse_from(body: &[u8]) -> (Function, XRef) {
        let data = carta_syntax::test_pdf::PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [] /Count 0 >>")
            .object(3, body)
            .build();
        let doc = Document::load(data).unwrap();
        let xref = doc.xref().clone();
        let obj = xref.get(carta_syntax::ObjRef::new(3, 0));
        (Function::parse(&obj, &xref).unwrap(), xref)
    }

    #[test]
    fn exponential_interpolates() {
        let (f, _) = parse_from(
            b"<< /FunctionType 2 /Domain [0 1] /C0 [0 0 0] /C1 [1 0.5 0] /N 1 >>",
        );

        let mid = f.eval(&[0.5]);
        assert!((mid[0] - 0.5).abs() < 1e-6);
        assert!((mid[1] - 0.25).abs() < 1e-6);
        assert_eq!(mid[2], 0.0);
    }

    #[test]
    fn exponential_clamps_domain() {
        let (f, _) =
            parse_from(b"<< /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 1 >>");
        assert_eq!(f.eval(&[5.0])[0], 1.0);
    }

    #[test]
    fn stitching_picks_subfunction() {
        let (f, _) = parse_from(
            b"<< /FunctionType 3 /Domain [0 1] /Bounds [0.5] /Encode [0 1 0 1] \
              /Functions [ << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [0.5] /N 1 >> \
                           << /FunctionType 2 /Domain [0 1] /C0 [0.5] /C1 [1] /N 1 >> ] >>",
        );

        assert!((f.eval(&[0.25])[0] - 0.25).abs() < 1e-6);
        assert!((f.eval(&[0.75])[0] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn calculator_functions_are_rejected() {
        let data = carta_syntax::test_pdf::PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [] /Count 0 >>")
            .object(3, b"<< /FunctionType 4 /Domain [0 1] /Range [0 1] >>")
            .build();
        let doc = Document::load(data).unwrap();
        let xref = doc.xref().clone();
        let obj = xref.get(carta_syntax::ObjRef::new(3, 0));
        assert!(Function::parse(&obj, &xref).is_none());
    }
}
