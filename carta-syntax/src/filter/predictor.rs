//! The predictor post-filter shared by Flate and LZW.

use crate::error::FilterError;
use crate::object::name::keys::{
    BITS_PER_COMPONENT, COLORS, COLUMNS, EARLY_CHANGE, PREDICTOR,
};
use crate::object::Dict;
use crate::xref::XRef;
use itertools::izip;
use log::warn;

#[derive(Debug, Clone)]
pub(crate) struct PredictorParams {
    pub(crate) predictor: u8,
    pub(crate) colors: u8,
    pub(crate) bits_per_component: u8,
    pub(crate) columns: usize,
    pub(crate) early_change: bool,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
            early_change: true,
        }
    }
}

impl PredictorParams {
    pub(crate) fn from_dict(dict: &Dict, xref: &XRef) -> Self {
        Self {
            predictor: dict.get(PREDICTOR, xref).unwrap_or(1),
            colors: dict.get(COLORS, xref).unwrap_or(1),
            bits_per_component: dict.get(BITS_PER_COMPONENT, xref).unwrap_or(8),
            columns: dict.get(COLUMNS, xref).unwrap_or(1),
            early_change: dict.get::<u8>(EARLY_CHANGE, xref).map(|e| e != 0).unwrap_or(true),
        }
    }

    /// Bytes per complete pixel, rounded up; the unit PNG predictors operate
    /// on.
    fn bytes_per_pixel(&self) -> usize {
        ((self.bits_per_component as usize * self.colors as usize) + 7) / 8
    }

    /// The length of one row of image data in bytes.
    fn row_len(&self) -> usize {
        (self.columns * self.colors as usize * self.bits_per_component as usize + 7) / 8
    }
}

pub(crate) fn apply(data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    match params.predictor {
        1 => Ok(data),
        2 => apply_tiff(data, params),
        10..=15 => apply_png(data, params),
        other => {
            warn!("unknown predictor {other}, leaving data untouched");
            Ok(data)
        }
    }
}

fn apply_tiff(mut data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    if params.bits_per_component != 8 {
        warn!(
            "TIFF predictor with {} bits per component is not supported",
            params.bits_per_component
        );
        return Ok(data);
    }

    let row_len = params.row_len();
    let colors = params.colors as usize;

    if row_len == 0 {
        return Ok(data);
    }

    for row in data.chunks_mut(row_len) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }

    Ok(data)
}

fn apply_png(data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    let row_len = params.row_len();
    // Each stored row is prefixed by the predictor byte actually used.
    let stored_row_len = row_len + 1;

    if row_len == 0 || data.len() % stored_row_len != 0 {
        return Err(FilterError::new("FlateDecode", data.len()));
    }

    let num_rows = data.len() / stored_row_len;
    let bpp = params.bytes_per_pixel();

    let zero_row = vec![0u8; row_len];
    let mut out = vec![0u8; num_rows * row_len];

    // Indexed iteration so the previous row can be borrowed out of `out`.
    for row_idx in 0..num_rows {
        let in_row = &data[row_idx * stored_row_len..(row_idx + 1) * stored_row_len];
        let row_predictor = in_row[0];
        let in_data = &in_row[1..];

        let (done, rest) = out.split_at_mut(row_idx * row_len);
        let out_row = &mut rest[..row_len];
        let prev = if row_idx == 0 {
            &zero_row
        } else {
            &done[(row_idx - 1) * row_len..]
        };

        match row_predictor {
            0 => out_row.copy_from_slice(in_data),
            1 => sub(in_data, out_row, bpp),
            2 => up(in_data, prev, out_row),
            3 => average(in_data, prev, out_row, bpp),
            4 => paeth(in_data, prev, out_row, bpp),
            _ => return Err(FilterError::new("FlateDecode", row_idx * stored_row_len)),
        }
    }

    Ok(out)
}

fn sub(input: &[u8], out: &mut [u8], bpp: usize) {
    for i in 0..input.len() {
        let left = if i >= bpp { out[i - bpp] } else { 0 };
        out[i] = input[i].wrapping_add(left);
    }
}

fn up(input: &[u8], prev: &[u8], out: &mut [u8]) {
    for (i, p, o) in izip!(input, prev, out.iter_mut()) {
        *o = i.wrapping_add(*p);
    }
}

fn average(input: &[u8], prev: &[u8], out: &mut [u8], bpp: usize) {
    for i in 0..input.len() {
        let left = if i >= bpp { out[i - bpp] as u16 } else { 0 };
        let above = prev[i] as u16;
        out[i] = input[i].wrapping_add(((left + above) / 2) as u8);
    }
}

fn paeth(input: &[u8], prev: &[u8], out: &mut [u8], bpp: usize) {
    fn predict(a: u8, b: u8, c: u8) -> u8 {
        let (a, b, c) = (a as i16, b as i16, c as i16);
        let p = a + b - c;
        let (pa, pb, pc) = ((p - a).abs(), (p - b).abs(), (p - c).abs());

        if pa <= pb && pa <= pc {
            a as u8
        } else if pb <= pc {
            b as u8
        } else {
            c as u8
        }
    }

    for i in 0..input.len() {
        let left = if i >= bpp { out[i - bpp] } else { 0 };
        let above = prev[i];
        let upper_left = if i >= bpp { prev[i - bpp] } else { 0 };
        out[i] = input[i].wrapping_add(predict(left, above, upper_left));
    }
}

#[cfg(test)]
mod tests {
    use super::{apply, PredictorParams};

    fn params(predictor: u8) -> PredictorParams {
        PredictorParams {
            predictor,
            colors: 3,
            bits_per_component: 8,
            columns: 3,
            early_change: false,
        }
    }

    fn expected() -> Vec<u8> {
        vec![
            127, 127, 127, 125, 129, 127, 123, 130, 128, // row 1
            128, 129, 126, 126, 132, 124, 121, 127, 126, // row 2
            131, 130, 122, 133, 129, 128, 127, 100, 126, // row 3
        ]
    }

    #[test]
    fn png_none() {
        let mut input = vec![];
        for row in expected().chunks(9) {
            input.push(0u8);
            input.extend_from_slice(row);
        }
        assert_eq!(apply(input, &params(10)).unwrap(), expected());
    }

    #[test]
    fn png_sub() {
        let input = vec![
            1, 127, 127, 127, 254, 2, 0, 254, 1, 1, //
            1, 128, 129, 126, 254, 3, 254, 251, 251, 2, //
            1, 131, 130, 122, 2, 255, 6, 250, 227, 254,
        ];
        assert_eq!(apply(input, &params(11)).unwrap(), expected());
    }

    #[test]
    fn png_up() {
        let input = vec![
            2, 127, 127, 127, 125, 129, 127, 123, 130, 128, //
            2, 1, 2, 255, 1, 3, 253, 254, 253, 254, //
            2, 3, 1, 252, 7, 253, 4, 6, 229, 0,
        ];
        assert_eq!(apply(input, &params(12)).unwrap(), expected());
    }

    #[test]
    fn png_average() {
        let input = vec![
            3, 127, 127, 127, 62, 66, 64, 61, 66, 65, //
            3, 65, 66, 63, 0, 3, 254, 253, 252, 0, //
            3, 67, 66, 59, 5, 254, 5, 0, 228, 255,
        ];
        assert_eq!(apply(input, &params(13)).unwrap(), expected());
    }

    #[test]
    fn png_paeth() {
        let input = vec![
            4, 127, 127, 127, 254, 2, 0, 254, 1, 1, //
            4, 1, 2, 255, 1, 3, 254, 254, 251, 2, //
            4, 3, 1, 252, 5, 253, 6, 1, 229, 254,
        ];
        assert_eq!(apply(input, &params(14)).unwrap(), expected());
    }

    #[test]
    fn tiff_horizontal() {
        let p = PredictorParams {
            predictor: 2,
            colors: 1,
            bits_per_component: 8,
            columns: 4,
            early_change: false,
        };
        assert_eq!(
            apply(vec![10, 1, 1, 1, 20, 2, 2, 2], &p).unwrap(),
            vec![10, 11, 12, 13, 20, 22, 24, 26]
        );
    }

    #[test]
    fn truncated_rows_error() {
        assert!(apply(vec![0, 1, 2], &params(10)).is_err());
    }
}
