//! Decoding image XObjects.
//!
//! Supported inputs are raw samples in the device spaces (after the stream
//! filters have run), indexed palettes, and baseline/progressive JPEG in
//! grayscale or RGB. Anything else is reported as a warning and the image is
//! omitted; the rest of the page still renders.

use crate::color::ColorSpace;
use crate::device::{ImageData, PixelFormat};
use crate::resources::Resources;
use carta_syntax::filter::Filter;
use carta_syntax::object::name::keys::{
    BITS_PER_COMPONENT, COLOR_SPACE, DECODE, HEIGHT, IMAGE_MASK, INTERPOLATE, SMASK, WIDTH,
};
use carta_syntax::{Object, Stream, XRef};
use log::warn;

/// A decoded image XObject.
#[derive(Debug)]
pub enum Decoded {
    /// A color or grayscale image.
    Image(ImageData),
    /// A 1-bit stencil mask, stored as an 8-bit mask (255 = painted).
    Stencil(ImageData),
}

/// Decode an image XObject or inline image. `resources` is used to resolve
/// named color spaces in inline images.
pub fn decode(
    stream: &Stream,
    resources: Option<&Resources>,
    xref: &XRef,
) -> Option<Decoded> {
    let dict = stream.dict();

    let width = dict.get::<u32>(WIDTH, xref)?;
    let height = dict.get::<u32>(HEIGHT, xref)?;
    if width == 0 || height == 0 || width.checked_mul(height)? > 1 << 28 {
        warn!("image dimensions out of range: {width}x{height}");
        return None;
    }

    let interpolate = dict.get::<bool>(INTERPOLATE, xref).unwrap_or(false);
    let decode_array = dict.get::<Vec<f32>>(DECODE, xref);

    if dict.get::<bool>(IMAGE_MASK, xref).unwrap_or(false) {
        return decode_stencil(stream, width, height, interpolate, decode_array, xref)
            .map(Decoded::Stencil);
    }

    // A still-encoded image filter means the decoded bytes are a JPEG (or an
    // unsupported codec).
    match stream.pending_image_filter(xref) {
        Some(Filter::Dct) => {
            let mut image = decode_jpeg(&stream.decoded(xref).ok()?, width, height)?;
            image.interpolate = interpolate;
            image.alpha = decode_soft_mask(stream, width, height, xref);
            return Some(Decoded::Image(image));
        }
        Some(other) => {
            warn!("unsupported image codec {}", other.name());
            return None;
        }
        None => {}
    }

    let space = match dict.get_raw(COLOR_SPACE).map(|o| xref.resolve(o)) {
        Some(Object::Name(n)) => ColorSpace::parse(&Object::Name(n.clone()), xref)
            .ok()
            .or_else(|| {
                // Inline images may name a color space out of the resource
                // dictionary.
                let obj = resources?.color_space(n.as_str())?;
                ColorSpace::parse(&obj, xref).ok()
            }),
        Some(obj) => ColorSpace::parse(&obj, xref).ok(),
        None => None,
    };

    let Some(space) = space else {
        warn!("image with unsupported color space, omitting");
        return None;
    };

    let bpc = dict.get::<u8>(BITS_PER_COMPONENT, xref).unwrap_or(8);
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        warn!("invalid bits per component {bpc}");
        return None;
    }

    let data = stream.decoded(xref).ok().or_else(|| {
        warn!("image stream failed to decode, omitting");
        None
    })?;

    let n_comp = space.components();
    let samples = unpack_samples(&data, width, height, bpc, n_comp)?;
    let max = ((1u32 << bpc) - 1) as f32;

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);

    match &space {
        ColorSpace::Indexed { .. } => {
            for px in samples.chunks(n_comp) {
                let c = space.to_rgb(&[px[0] as f32]);
                rgb.extend_from_slice(&[to_u8(c[0]), to_u8(c[1]), to_u8(c[2])]);
            }
        }
        _ => {
            let remap = decode_remap(decode_array.as_deref(), n_comp);

            let mut components = vec![0.0f32; n_comp];
            for px in samples.chunks(n_comp) {
                for (i, s) in px.iter().enumerate() {
                    let v = *s as f32 / max;
                    components[i] = match remap.get(i) {
                        Some((lo, hi)) => lo + v * (hi - lo),
                        None => v,
                    };
                }
                let c = space.to_rgb(&components);
                rgb.extend_from_slice(&[to_u8(c[0]), to_u8(c[1]), to_u8(c[2])]);
            }
        }
    }

    Some(Decoded::Image(ImageData {
        width,
        height,
        format: PixelFormat::Rgb8,
        data: rgb,
        alpha: decode_soft_mask(stream, width, height, xref),
        interpolate,
    }))
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

fn decode_remap(decode: Option<&[f32]>, n_comp: usize) -> Vec<(f32, f32)> {
    decode
        .map(|d| {
            d.chunks(2)
                .filter(|c| c.len() == 2)
                .take(n_comp)
                .map(|c| (c[0], c[1]))
                .collect()
        })
        .unwrap_or_default()
}

fn decode_stencil(
    stream: &Stream,
    width: u32,
    height: u32,
    interpolate: bool,
    decode_array: Option<Vec<f32>>,
    xref: &XRef,
) -> Option<ImageData> {
    let data = stream.decoded(xref).ok()?;
    let samples = unpack_samples(&data, width, height, 1, 1)?;

    // With the default decode of [0 1], sample value 0 paints; [1 0] flips
    // that.
    let zero_paints = decode_array
        .map(|d| d.first().copied().unwrap_or(0.0) < 0.5)
        .unwrap_or(true);

    let mask = samples
        .iter()
        .map(|&s| {
            let painted = (s == 0) == zero_paints;
            if painted { 255 } else { 0 }
        })
        .collect();

    Some(ImageData {
        width,
        height,
        format: PixelFormat::Gray8,
        data: mask,
        alpha: None,
        interpolate,
    })
}

/// Decode the `/SMask` of an image into an alpha channel, resampled to the
/// base image's dimensions when they differ.
fn decode_soft_mask(stream: &Stream, width: u32, height: u32, xref: &XRef) -> Option<Vec<u8>> {
    let smask = stream.dict().get::<Stream>(SMASK, xref)?;

    let decoded = match decode(&smask, None, xref) {
        Some(Decoded::Image(img)) => img,
        _ => {
            warn!("undecodable /SMask, ignoring");
            return None;
        }
    };

    let gray: Vec<u8> = match decoded.format {
        PixelFormat::Gray8 => decoded.data,
        // An RGB mask is off-spec but appears; take the first channel.
        PixelFormat::Rgb8 => decoded.data.chunks(3).map(|c| c[0]).collect(),
    };

    if decoded.width == width && decoded.height == height {
        return Some(gray);
    }

    // Nearest-neighbor resample to the base image grid.
    let mut out = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        let sy = (y as u64 * decoded.height as u64 / height as u64) as u32;
        for x in 0..width {
            let sx = (x as u64 * decoded.width as u64 / width as u64) as u32;
            out.push(
                gray.get((sy * decoded.width + sx) as usize)
                    .copied()
                    .unwrap_or(0),
            );
        }
    }

    Some(out)
}

/// Unpack packed samples into one value per component. Rows are padded to
/// byte boundaries.
fn unpack_samples(
    data: &[u8],
    width: u32,
    height: u32,
    bpc: u8,
    n_comp: usize,
) -> Option<Vec<u16>> {
    let samples_per_row = width as usize * n_comp;
    let row_bytes = (samples_per_row * bpc as usize + 7) / 8;

    if data.len() < row_bytes * height as usize {
        warn!(
            "image data too short: {} < {}",
            data.len(),
            row_bytes * height as usize
        );
        return None;
    }

    let mut out = Vec::with_capacity(samples_per_row * height as usize);

    for row in data.chunks(row_bytes).take(height as usize) {
        match bpc {
            8 => out.extend(row.iter().take(samples_per_row).map(|&b| b as u16)),
            16 => out.extend(
                row.chunks(2)
                    .take(samples_per_row)
                    .map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]) >> 8),
            ),
            bits => {
                let mut taken = 0;
                'row: for byte in row {
                    let per_byte = 8 / bits as usize;
                    for i in 0..per_byte {
                        if taken == samples_per_row {
                            break 'row;
                        }
                        let shift = 8 - bits as usize * (i + 1);
                        let mask = (1u16 << bits) - 1;
                        out.push(((*byte as u16) >> shift) & mask);
                        taken += 1;
                    }
                }
            }
        }
    }

    Some(out)
}

/// Decode a JPEG payload through zune-jpeg. Only grayscale and RGB outputs
/// are supported; CMYK JPEGs are excluded.
fn decode_jpeg(data: &[u8], width: u32, height: u32) -> Option<ImageData> {
    use zune_jpeg::zune_core::colorspace::ColorSpace as JpegSpace;
    use zune_jpeg::zune_core::options::DecoderOptions;

    let mut decoder = zune_jpeg::JpegDecoder::new(data);
    decoder.decode_headers().ok()?;

    let out_space = match decoder.get_input_colorspace()? {
        JpegSpace::Luma | JpegSpace::LumaA => JpegSpace::Luma,
        JpegSpace::RGB | JpegSpace::RGBA | JpegSpace::YCbCr => JpegSpace::RGB,
        other => {
            warn!("unsupported JPEG color space {other:?}");
            return None;
        }
    };

    decoder.set_options(DecoderOptions::default().jpeg_set_out_colorspace(out_space));
    let pixels = decoder.decode().ok()?;

    let (jw, jh) = decoder.dimensions()?;
    if (jw as u32, jh as u32) != (width, height) {
        warn!(
            "JPEG dimensions {jw}x{jh} disagree with /Width /Height {width}x{height}"
        );
    }

    let format = match out_space {
        JpegSpace::Luma => PixelFormat::Gray8,
        _ => PixelFormat::Rgb8,
    };

    Some(ImageData {
        width: jw as u32,
        height: jh as u32,
        format,
        data: pixels,
        alpha: None,
        interpolate: false,
    })
}

#[cfg(test)]
mod tests {
    use super::unpack_samples;

    #[test]
    fn one_bit_rows_pad_to_bytes() {
        // 10 pixels per row at 1 bpc: two bytes per row.
        let data = [0b1010_1010, 0b1100_0000, 0b0101_0101, 0b0000_0000];
        let samples = unpack_samples(&data, 10, 2, 1, 1).unwrap();
        assert_eq!(samples.len(), 20);
        assert_eq!(&samples[..10], &[1, 0, 1, 0, 1, 0, 1, 0, 1, 1]);
        assert_eq!(&samples[10..12], &[0, 1]);
    }

    #[test]
    fn four_bit_samples() {
        let data = [0xAB, 0xC0];
        let samples = unpack_samples(&data, 3, 1, 4, 1).unwrap();
        assert_eq!(samples, vec![0xA, 0xB, 0xC]);
    }

    #[test]
    fn sixteen_bit_takes_high_byte() {
        let data = [0x12, 0x34, 0xFF, 0x00];
        let samples = unpack_samples(&data, 2, 1, 16, 1).unwrap();
        assert_eq!(samples, vec![0x12, 0xFF]);
    }

    #[test]
    fn short_data_is_rejected() {
        assert!(unpack_samples(&[0u8; 3], 4, 4, 8, 1).is_none());
    }
}
