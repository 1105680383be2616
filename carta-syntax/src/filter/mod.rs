//! Decoding stream filters.
//!
//! Filters compose left to right: the first name in `/Filter` is applied
//! first. Image filters (DCT, CCITT, JBIG2, JPX) terminate the chain and pass
//! their input through untouched; whether the remaining bytes can be decoded
//! at all is the image decoder's business.

mod ascii_85;
mod ascii_hex;
mod lzw;
mod predictor;
mod run_length;

use crate::error::FilterError;
use crate::object::name::keys::{DECODE_PARMS, FILTER};
use crate::object::{Dict, Name, Object};
use crate::xref::XRef;
use log::warn;

pub(crate) use predictor::PredictorParams;

/// A stream filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `/ASCIIHexDecode`
    AsciiHex,
    /// `/ASCII85Decode`
    Ascii85,
    /// `/FlateDecode`
    Flate,
    /// `/LZWDecode`
    Lzw,
    /// `/RunLengthDecode`
    RunLength,
    /// `/DCTDecode` (passthrough)
    Dct,
    /// `/CCITTFaxDecode` (passthrough, not decodable)
    Ccitt,
    /// `/JBIG2Decode` (passthrough, not decodable)
    Jbig2,
    /// `/JPXDecode` (passthrough, not decodable)
    Jpx,
}

impl Filter {
    /// Map a filter name (or its abbreviation) to a filter.
    pub fn from_name(name: &Name) -> Option<Self> {
        Some(match name.as_str() {
            "ASCIIHexDecode" | "AHx" => Filter::AsciiHex,
            "ASCII85Decode" | "A85" => Filter::Ascii85,
            "FlateDecode" | "Fl" => Filter::Flate,
            "LZWDecode" | "LZW" => Filter::Lzw,
            "RunLengthDecode" | "RL" => Filter::RunLength,
            "DCTDecode" | "DCT" => Filter::Dct,
            "CCITTFaxDecode" | "CCF" => Filter::Ccitt,
            "JBIG2Decode" => Filter::Jbig2,
            "JPXDecode" => Filter::Jpx,
            _ => return None,
        })
    }

    /// The name used in error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::AsciiHex => "ASCIIHexDecode",
            Filter::Ascii85 => "ASCII85Decode",
            Filter::Flate => "FlateDecode",
            Filter::Lzw => "LZWDecode",
            Filter::RunLength => "RunLengthDecode",
            Filter::Dct => "DCTDecode",
            Filter::Ccitt => "CCITTFaxDecode",
            Filter::Jbig2 => "JBIG2Decode",
            Filter::Jpx => "JPXDecode",
        }
    }

    /// Whether the filter produces image data that is decoded downstream.
    pub fn is_image_filter(&self) -> bool {
        matches!(
            self,
            Filter::Dct | Filter::Ccitt | Filter::Jbig2 | Filter::Jpx
        )
    }

    /// Apply the filter to `data`.
    pub fn apply(&self, data: &[u8], params: &Dict, xref: &XRef) -> Result<Vec<u8>, FilterError> {
        match self {
            Filter::AsciiHex => ascii_hex::decode(data),
            Filter::Ascii85 => ascii_85::decode(data),
            Filter::RunLength => run_length::decode(data),
            Filter::Lzw => {
                let pred = PredictorParams::from_dict(params, xref);
                let decoded = lzw::decode(data, pred.early_change)?;
                predictor::apply(decoded, &pred)
            }
            Filter::Flate => {
                let pred = PredictorParams::from_dict(params, xref);
                let decoded = flate(data)?;
                predictor::apply(decoded, &pred)
            }
            // Image filters pass through; the image decoder picks them up.
            _ => Ok(data.to_vec()),
        }
    }
}

fn flate(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    // Some producers write raw deflate data without the zlib wrapper.
    miniz_oxide::inflate::decompress_to_vec_zlib(data)
        .or_else(|_| miniz_oxide::inflate::decompress_to_vec(data))
        .map_err(|e| FilterError::new("FlateDecode", e.output.len()))
}

/// The declared filter chain of a stream dictionary, with per-filter
/// parameters.
pub(crate) fn chain(dict: &Dict, xref: &XRef) -> Vec<(Filter, Dict)> {
    let filters: Vec<Name> = match dict.get_raw(FILTER).map(|o| xref.resolve(o)) {
        Some(Object::Name(n)) => vec![n],
        Some(Object::Array(a)) => a.typed::<Name>(xref).collect(),
        Some(Object::Null) | None => vec![],
        Some(other) => {
            warn!("unexpected /Filter value: {other:?}");
            vec![]
        }
    };

    let params: Vec<Dict> = match dict.get_raw(DECODE_PARMS).map(|o| xref.resolve(o)) {
        Some(Object::Dict(d)) => vec![d],
        Some(Object::Array(a)) => a
            .iter()
            .map(|o| match xref.resolve(o) {
                Object::Dict(d) => d,
                _ => Dict::empty(),
            })
            .collect(),
        _ => vec![],
    };

    filters
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            let filter = Filter::from_name(name);
            if filter.is_none() {
                warn!("unrecognized filter {name}");
            }
            filter.map(|f| (f, params.get(i).cloned().unwrap_or_default()))
        })
        .collect()
}

/// Run the raw bytes of a stream through its declared filter chain, stopping
/// at the first image filter.
pub(crate) fn decode_chain(
    raw: &[u8],
    dict: &Dict,
    xref: &XRef,
) -> Result<Vec<u8>, FilterError> {
    let mut data = raw.to_vec();

    for (filter, params) in chain(dict, xref) {
        if filter.is_image_filter() {
            break;
        }

        data = filter.apply(&data, &params, xref)?;
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Name;

    #[test]
    fn abbreviations() {
        assert_eq!(Filter::from_name(&Name::new("AHx")), Some(Filter::AsciiHex));
        assert_eq!(Filter::from_name(&Name::new("Fl")), Some(Filter::Flate));
        assert_eq!(Filter::from_name(&Name::new("Bogus")), None);
    }

    #[test]
    fn flate_zlib_and_raw() {
        let zlib = [
            0x78, 0x9c, 0xf3, 0x48, 0xcd, 0xc9, 0xc9, 0x07, 0x00, 0x05, 0x8c, 0x01, 0xf5,
        ];
        assert_eq!(flate(&zlib).unwrap(), b"Hello");

        let raw = [0xf3, 0x48, 0xcd, 0xc9, 0xc9, 0x07, 0x00];
        assert_eq!(flate(&raw).unwrap(), b"Hello");
    }

    #[test]
    fn decode_then_encode_is_identity() {
        let payload = b"some payload with runs aaaaaa and structure".to_vec();
        let encoded = miniz_oxide::deflate::compress_to_vec_zlib(&payload, 6);
        assert_eq!(flate(&encoded).unwrap(), payload);
    }
}
