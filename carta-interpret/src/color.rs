//! Color spaces and color conversion.
//!
//! The supported set is the device spaces, `Indexed`, and `Separation`
//! through its tint transform. `ICCBased`, `CalGray` and `CalRGB` degrade to
//! the device space with the same channel count; `Lab`, `DeviceN` and
//! `Pattern` are unsupported and reported to the caller.

use crate::function::Function;
use crate::state::Components;
use carta_syntax::object::name::keys::N;
use carta_syntax::{Name, Object, XRef};
use log::warn;
use smallvec::smallvec;
use std::sync::Arc;
use thiserror::Error;

/// Why a color-space object failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorSpaceError {
    /// A family this pipeline deliberately excludes.
    #[error("unsupported color space {0}")]
    Unsupported(String),
    /// A value that isn't a color space at all.
    #[error("malformed color space")]
    Malformed,
}

/// A color space.
#[derive(Debug, Clone)]
pub enum ColorSpace {
    /// A single gray channel.
    DeviceGray,
    /// Red, green, blue.
    DeviceRgb,
    /// Cyan, magenta, yellow, black.
    DeviceCmyk,
    /// A palette over a base space.
    Indexed {
        /// The space palette entries are expressed in.
        base: Box<ColorSpace>,
        /// The largest valid index.
        hival: u8,
        /// Packed palette entries, `base.components()` bytes each.
        lookup: Arc<[u8]>,
    },
    /// A spot color mapped through a tint transform.
    Separation {
        /// The alternate space the tint transform maps into.
        alternate: Box<ColorSpace>,
        /// The tint transform.
        tint: Arc<Function>,
    },
}

impl ColorSpace {
    /// Resolve a color-space object: a device-space name or a
    /// `[/Family …]` array.
    pub fn parse(obj: &Object, xref: &XRef) -> Result<ColorSpace, ColorSpaceError> {
        match obj {
            Object::Name(name) => Self::from_simple_name(name),
            Object::Array(arr) => {
                let family = arr
                    .get::<Name>(0, xref)
                    .ok_or(ColorSpaceError::Malformed)?;

                match family.as_str() {
                    "DeviceGray" | "DeviceRGB" | "DeviceCMYK" => {
                        Self::from_simple_name(&family)
                    }
                    "ICCBased" => {
                        // Approximated by channel count, per the exclusion of
                        // ICC handling.
                        let n = arr
                            .get::<carta_syntax::Stream>(1, xref)
                            .and_then(|s| s.dict().get::<u8>(N, xref))
                            .ok_or(ColorSpaceError::Malformed)?;
                        Self::from_component_count(n)
                    }
                    "CalGray" => Ok(ColorSpace::DeviceGray),
                    "CalRGB" => Ok(ColorSpace::DeviceRgb),
                    "Indexed" | "I" => {
                        let base_obj = arr.get_raw(1).ok_or(ColorSpaceError::Malformed)?;
                        let base = Self::parse(&xref.resolve(base_obj), xref)?;
                        let hival =
                            arr.get::<u8>(2, xref).ok_or(ColorSpaceError::Malformed)?;
                        let lookup_obj =
                            arr.get_raw(3).ok_or(ColorSpaceError::Malformed)?;
                        let lookup = match xref.resolve(lookup_obj) {
                            Object::String(s) => Arc::from(s.as_bytes().to_vec()),
                            Object::Stream(s) => Arc::from(
                                s.decoded(xref)
                                    .map_err(|_| ColorSpaceError::Malformed)?
                                    .to_vec(),
                            ),
                            _ => return Err(ColorSpaceError::Malformed),
                        };

                        Ok(ColorSpace::Indexed {
                            base: Box::new(base),
                            hival,
                            lookup,
                        })
                    }
                    "Separation" => {
                        let alt_obj = arr.get_raw(2).ok_or(ColorSpaceError::Malformed)?;
                        let alternate = Self::parse(&xref.resolve(alt_obj), xref)?;
                        let tint_obj = arr.get_raw(3).ok_or(ColorSpaceError::Malformed)?;
                        let tint = Function::parse(&xref.resolve(tint_obj), xref)
                            .ok_or(ColorSpaceError::Malformed)?;

                        Ok(ColorSpace::Separation {
                            alternate: Box::new(alternate),
                            tint: Arc::new(tint),
                        })
                    }
                    other => Err(ColorSpaceError::Unsupported(other.to_string())),
                }
            }
            _ => Err(ColorSpaceError::Malformed),
        }
    }

    fn from_simple_name(name: &Name) -> Result<ColorSpace, ColorSpaceError> {
        match name.as_str() {
            "DeviceGray" | "G" | "CalGray" => Ok(ColorSpace::DeviceGray),
            "DeviceRGB" | "RGB" | "CalRGB" => Ok(ColorSpace::DeviceRgb),
            "DeviceCMYK" | "CMYK" => Ok(ColorSpace::DeviceCmyk),
            "Pattern" | "Lab" | "DeviceN" => {
                Err(ColorSpaceError::Unsupported(name.as_str().to_string()))
            }
            other => {
                warn!("unknown color space name {other}");
                Err(ColorSpaceError::Malformed)
            }
        }
    }

    fn from_component_count(n: u8) -> Result<ColorSpace, ColorSpaceError> {
        match n {
            1 => Ok(ColorSpace::DeviceGray),
            3 => Ok(ColorSpace::DeviceRgb),
            4 => Ok(ColorSpace::DeviceCmyk),
            _ => Err(ColorSpaceError::Malformed),
        }
    }

    /// The number of components a color in this space has.
    pub fn components(&self) -> usize {
        match self {
            ColorSpace::DeviceGray => 1,
            ColorSpace::DeviceRgb => 3,
            ColorSpace::DeviceCmyk => 4,
            ColorSpace::Indexed { .. } => 1,
            ColorSpace::Separation { .. } => 1,
        }
    }

    /// The initial color of the space: black, or index zero.
    pub fn initial_components(&self) -> Components {
        match self {
            ColorSpace::DeviceGray => smallvec![0.0],
            ColorSpace::DeviceRgb => smallvec![0.0, 0.0, 0.0],
            ColorSpace::DeviceCmyk => smallvec![0.0, 0.0, 0.0, 1.0],
            ColorSpace::Indexed { .. } => smallvec![0.0],
            ColorSpace::Separation { .. } => smallvec![1.0],
        }
    }

    /// Convert components in this space to device RGB. Missing components
    /// read as zero.
    pub fn to_rgb(&self, components: &[f32]) -> [f32; 3] {
        let comp = |i: usize| components.get(i).copied().unwrap_or(0.0).clamp(0.0, 1.0);

        match self {
            ColorSpace::DeviceGray => {
                let g = comp(0);
                [g, g, g]
            }
            ColorSpace::DeviceRgb => [comp(0), comp(1), comp(2)],
            ColorSpace::DeviceCmyk => {
                let (c, m, y, k) = (comp(0), comp(1), comp(2), comp(3));
                [
                    (1.0 - c) * (1.0 - k),
                    (1.0 - m) * (1.0 - k),
                    (1.0 - y) * (1.0 - k),
                ]
            }
            ColorSpace::Indexed {
                base,
                hival,
                lookup,
            } => {
                let index = components
                    .first()
                    .copied()
                    .unwrap_or(0.0)
                    .round()
                    .clamp(0.0, *hival as f32) as usize;
                let n = base.components();
                let start = index * n;

                let entry: Components = (0..n)
                    .map(|i| {
                        lookup.get(start + i).copied().unwrap_or(0) as f32 / 255.0
                    })
                    .collect();

                base.to_rgb(&entry)
            }
            ColorSpace::Separation { alternate, tint } => {
                let mapped = tint.eval(&[comp(0)]);
                alternate.to_rgb(&mapped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ColorSpace;
    use std::sync::Arc;

    #[test]
    fn cmyk_black() {
        let rgb = ColorSpace::DeviceCmyk.to_rgb(&[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(rgb, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn cmyk_cyan() {
        let rgb = ColorSpace::DeviceCmyk.to_rgb(&[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(rgb, [0.0, 1.0, 1.0]);
    }

    #[test]
    fn indexed_lookup() {
        let cs = ColorSpace::Indexed {
            base: Box::new(ColorSpace::DeviceRgb),
            hival: 1,
            lookup: Arc::from(vec![255u8, 0, 0, 0, 0, 255]),
        };

        assert_eq!(cs.to_rgb(&[0.0]), [1.0, 0.0, 0.0]);
        assert_eq!(cs.to_rgb(&[1.0]), [0.0, 0.0, 1.0]);
        // Out-of-range indices clamp to the high value.
        assert_eq!(cs.to_rgb(&[9.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn missing_components_read_as_zero() {
        assert_eq!(ColorSpace::DeviceRgb.to_rgb(&[]), [0.0, 0.0, 0.0]);
    }
}
