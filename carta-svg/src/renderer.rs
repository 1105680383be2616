//! The SVG device: receives draw calls, builds the element tree.

use crate::defs::{CachedClip, CachedFont, CachedGradient, Deduplicator};
use base64::Engine;
use carta_interpret::carta_syntax::page::{Page, Rotation};
use carta_interpret::shading::{Shading, ShadingKind};
use carta_interpret::{
    ClipPath, Device, FillRule, ImageData, Paint, PathDrawMode, PixelFormat, StrokeProps, TextRun,
};
use image::{DynamicImage, ImageBuffer};
use kurbo::{Affine, BezPath, PathEl, Rect, Shape};
use log::warn;
use std::io::Cursor;
use xmlwriter::{Indent, Options, XmlWriter};

pub(crate) struct SvgRenderer {
    pub(crate) xml: XmlWriter,
    pub(crate) include_hidden_text: bool,
    pub(crate) clips: Deduplicator<CachedClip>,
    pub(crate) gradients: Deduplicator<CachedGradient>,
    pub(crate) fonts: Deduplicator<CachedFont>,
    /// The page area in user space, the canvas shadings cover.
    page_box: Rect,
}

impl SvgRenderer {
    pub(crate) fn new(page: &Page, include_hidden_text: bool) -> Self {
        let mut xml = XmlWriter::new(Options {
            // The serializer must not introduce white space that could
            // change rendered text; nothing is ever indented.
            indent: Indent::None,
            attributes_indent: Indent::None,
            ..Options::default()
        });

        let (width, height) = (page.width(), page.height());

        xml.start_element("svg");
        xml.write_attribute("xmlns", "http://www.w3.org/2000/svg");
        xml.write_attribute_fmt(
            "viewBox",
            format_args!("0 0 {} {}", fmt_num(width), fmt_num(height)),
        );
        xml.write_attribute_fmt("width", format_args!("{}pt", fmt_num(width)));
        xml.write_attribute_fmt("height", format_args!("{}pt", fmt_num(height)));

        // The root group maps PDF user space (y up, crop offset) onto the
        // viewport.
        xml.start_element("g");
        xml.write_attribute_fmt(
            "transform",
            format_args!("matrix({})", fmt_matrix(page_transform(page))),
        );

        let b = page.effective_box();
        let page_box = Rect::new(b.x0 as f64, b.y0 as f64, b.x1 as f64, b.y1 as f64);

        Self {
            xml,
            include_hidden_text,
            clips: Deduplicator::new('c'),
            gradients: Deduplicator::new('s'),
            fonts: Deduplicator::new('f'),
            page_box,
        }
    }

    pub(crate) fn finish(mut self) -> String {
        // Close the root group.
        self.xml.end_element();

        self.write_defs();

        // Close the svg element and serialize.
        self.xml.end_element();
        self.xml.end_document()
    }

    fn write_defs(&mut self) {
        if self.clips.is_empty() && self.gradients.is_empty() && self.fonts.is_empty() {
            return;
        }

        self.xml.start_element("defs");

        let clips: Vec<_> = self
            .clips
            .iter()
            .map(|(id, c)| (id, c.path_data.clone(), c.rule))
            .collect();
        for (id, path_data, rule) in clips {
            self.xml.start_element("clipPath");
            self.xml.write_attribute_fmt("id", format_args!("{id}"));
            self.xml.start_element("path");
            self.xml.write_attribute("d", &path_data);
            if rule == FillRule::EvenOdd {
                self.xml.write_attribute("clip-rule", "evenodd");
            }
            self.xml.end_element();
            self.xml.end_element();
        }

        let gradients: Vec<_> = self
            .gradients
            .iter()
            .map(|(id, g)| (id, g.shading.clone()))
            .collect();
        for (id, shading) in gradients {
            self.write_gradient(id, &shading);
        }

        self.write_font_style();

        self.xml.end_element();
    }

    fn write_gradient(&mut self, id: crate::defs::Id, shading: &Shading) {
        match shading.kind {
            ShadingKind::Axial { from, to } => {
                self.xml.start_element("linearGradient");
                self.xml.write_attribute_fmt("id", format_args!("{id}"));
                self.xml.write_attribute("gradientUnits", "userSpaceOnUse");
                self.xml.write_attribute("x1", &fmt_num(from.0));
                self.xml.write_attribute("y1", &fmt_num(from.1));
                self.xml.write_attribute("x2", &fmt_num(to.0));
                self.xml.write_attribute("y2", &fmt_num(to.1));
            }
            ShadingKind::Radial { from, to } => {
                // PDF radial shadings run between two circles; SVG gets the
                // outer circle with the inner one as the focal point.
                self.xml.start_element("radialGradient");
                self.xml.write_attribute_fmt("id", format_args!("{id}"));
                self.xml.write_attribute("gradientUnits", "userSpaceOnUse");
                self.xml.write_attribute("cx", &fmt_num(to.0));
                self.xml.write_attribute("cy", &fmt_num(to.1));
                self.xml.write_attribute("r", &fmt_num(to.2.max(0.001)));
                self.xml.write_attribute("fx", &fmt_num(from.0));
                self.xml.write_attribute("fy", &fmt_num(from.1));
            }
        }

        for stop in &shading.stops {
            self.xml.start_element("stop");
            self.xml
                .write_attribute("offset", &fmt_num(stop.offset));
            self.xml
                .write_attribute("stop-color", &css_color(stop.rgb));
            self.xml.end_element();
        }

        self.xml.end_element();
    }

    /// Embedded fonts become data-URL `@font-face` rules; the family name
    /// is the font's def id.
    fn write_font_style(&mut self) {
        let faces: Vec<(crate::defs::Id, Option<std::sync::Arc<Vec<u8>>>)> = self
            .fonts
            .iter()
            .map(|(id, f)| (id, f.font.embedded_output_program()))
            .collect();

        let mut css = String::new();
        for (id, program) in faces {
            let Some(program) = program else {
                continue;
            };

            let encoded = base64::engine::general_purpose::STANDARD.encode(program.as_slice());
            css.push_str(&format!(
                "@font-face{{font-family:{id};src:url(data:font/otf;base64,{encoded});}}"
            ));
        }

        if !css.is_empty() {
            self.xml.start_element("style");
            self.xml.write_text(&css);
            self.xml.end_element();
        }
    }

    pub(crate) fn write_transform(&mut self, transform: Affine) {
        if transform != Affine::IDENTITY {
            self.xml.write_attribute_fmt(
                "transform",
                format_args!("matrix({})", fmt_matrix(transform)),
            );
        }
    }

    pub(crate) fn write_paint(&mut self, paint: &Paint, stroke: Option<&StrokeProps>) {
        match stroke {
            None => {
                self.xml.write_attribute("fill", &css_color(paint.rgb));
                if paint.alpha < 1.0 {
                    self.xml
                        .write_attribute("fill-opacity", &fmt_num(paint.alpha));
                }
            }
            Some(props) => {
                self.xml.write_attribute("fill", "none");
                self.xml.write_attribute("stroke", &css_color(paint.rgb));
                if paint.alpha < 1.0 {
                    self.xml
                        .write_attribute("stroke-opacity", &fmt_num(paint.alpha));
                }

                self.xml
                    .write_attribute("stroke-width", &fmt_num(props.line_width));

                match props.line_cap {
                    1 => self.xml.write_attribute("stroke-linecap", "round"),
                    2 => self.xml.write_attribute("stroke-linecap", "square"),
                    _ => {}
                }
                match props.line_join {
                    1 => self.xml.write_attribute("stroke-linejoin", "round"),
                    2 => self.xml.write_attribute("stroke-linejoin", "bevel"),
                    _ => {}
                }
                if props.miter_limit != 10.0 && props.line_join == 0 {
                    self.xml
                        .write_attribute("stroke-miterlimit", &fmt_num(props.miter_limit));
                }

                if !props.dash_array.is_empty()
                    && props.dash_array.iter().any(|d| *d > 0.0)
                {
                    let dashes = props
                        .dash_array
                        .iter()
                        .map(|d| fmt_num(*d))
                        .collect::<Vec<_>>()
                        .join(" ");
                    self.xml.write_attribute("stroke-dasharray", &dashes);

                    if props.dash_offset != 0.0 {
                        self.xml
                            .write_attribute("stroke-dashoffset", &fmt_num(props.dash_offset));
                    }
                }
            }
        }
    }

    fn write_image_element(&mut self, image: &DynamicImage, transform: Affine, smooth: bool) {
        let mut png = Vec::new();
        if image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .is_err()
        {
            warn!("PNG encoding failed, omitting image");
            return;
        }

        let href = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        );

        // Scale from pixel space onto the placement square.
        let transform = transform
            * Affine::scale_non_uniform(
                1.0 / image.width().max(1) as f64,
                1.0 / image.height().max(1) as f64,
            );

        self.xml.start_element("image");
        self.xml.write_attribute("href", &href);
        self.xml.write_attribute("width", &image.width());
        self.xml.write_attribute("height", &image.height());
        self.xml.write_attribute("preserveAspectRatio", "none");
        if !smooth {
            self.xml
                .write_attribute("style", "image-rendering:pixelated");
        }
        self.write_transform(transform);
        self.xml.end_element();
    }
}

impl Device for SvgRenderer {
    fn push_clip(&mut self, clip: &ClipPath) {
        let path_data = path_data(&clip.path);
        let key = CachedClip::key(clip, &path_data);
        let rule = clip.rule;
        let id = self.clips.insert_with(key, || CachedClip { path_data, rule });

        self.xml.start_element("g");
        self.xml
            .write_attribute_fmt("clip-path", format_args!("url(#{id})"));
    }

    fn pop_clip(&mut self) {
        self.xml.end_element();
    }

    fn push_group(&mut self, opacity: f32) {
        self.xml.start_element("g");
        if opacity < 1.0 {
            self.xml.write_attribute("opacity", &fmt_num(opacity));
        }
    }

    fn pop_group(&mut self) {
        self.xml.end_element();
    }

    fn draw_path(
        &mut self,
        path: &BezPath,
        transform: Affine,
        paint: &Paint,
        mode: &PathDrawMode,
    ) {
        self.xml.start_element("path");
        self.xml.write_attribute("d", &path_data(path));

        match mode {
            PathDrawMode::Fill(rule) => {
                self.write_paint(paint, None);
                if *rule == FillRule::EvenOdd {
                    self.xml.write_attribute("fill-rule", "evenodd");
                }
            }
            PathDrawMode::Stroke(props) => {
                self.write_paint(paint, Some(props));
            }
        }

        self.write_transform(transform);
        self.xml.end_element();
    }

    fn draw_text(&mut self, run: &TextRun) {
        crate::text::write_text_run(self, run);
    }

    fn draw_image(&mut self, image: &ImageData, transform: Affine) {
        let smooth = image.interpolate;

        let dynamic = match (&image.format, &image.alpha) {
            (PixelFormat::Rgb8, None) => ImageBuffer::from_raw(
                image.width,
                image.height,
                image.data.clone(),
            )
            .map(DynamicImage::ImageRgb8),
            (PixelFormat::Rgb8, Some(alpha)) => {
                let rgba: Vec<u8> = image
                    .data
                    .chunks(3)
                    .zip(alpha.iter())
                    .flat_map(|(rgb, a)| [rgb[0], rgb[1], rgb[2], *a])
                    .collect();
                ImageBuffer::from_raw(image.width, image.height, rgba)
                    .map(DynamicImage::ImageRgba8)
            }
            (PixelFormat::Gray8, None) => ImageBuffer::from_raw(
                image.width,
                image.height,
                image.data.clone(),
            )
            .map(DynamicImage::ImageLuma8),
            (PixelFormat::Gray8, Some(alpha)) => {
                let la: Vec<u8> = image
                    .data
                    .iter()
                    .zip(alpha.iter())
                    .flat_map(|(l, a)| [*l, *a])
                    .collect();
                ImageBuffer::from_raw(image.width, image.height, la)
                    .map(DynamicImage::ImageLumaA8)
            }
        };

        match dynamic {
            Some(img) => self.write_image_element(&img, transform, smooth),
            None => warn!("image buffer size mismatch, omitting"),
        }
    }

    fn draw_stencil(&mut self, image: &ImageData, transform: Affine, paint: &Paint) {
        let color = rgb8(paint.rgb);
        let alpha = (paint.alpha.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;

        let rgba: Vec<u8> = image
            .data
            .iter()
            .flat_map(|m| {
                if *m == 255 {
                    [color[0], color[1], color[2], alpha]
                } else {
                    [0, 0, 0, 0]
                }
            })
            .collect();

        match ImageBuffer::from_raw(image.width, image.height, rgba) {
            Some(buffer) => self.write_image_element(
                &DynamicImage::ImageRgba8(buffer),
                transform,
                image.interpolate,
            ),
            None => warn!("stencil buffer size mismatch, omitting"),
        }
    }

    fn draw_shading(&mut self, shading: &Shading, transform: Affine, alpha: f32) {
        let key = CachedGradient::key(shading);
        let cached = shading.clone();
        let id = self
            .gradients
            .insert_with(key, || CachedGradient { shading: cached });

        // Cover the page area, expressed in the shading's own space.
        let inverse = if transform.determinant().abs() > 1e-12 {
            transform.inverse()
        } else {
            warn!("degenerate shading transform, skipping");
            return;
        };
        let bbox = (inverse * self.page_box.to_path(0.1)).bounding_box();

        self.xml.start_element("rect");
        self.xml.write_attribute("x", &fmt_num(bbox.x0 as f32));
        self.xml.write_attribute("y", &fmt_num(bbox.y0 as f32));
        self.xml
            .write_attribute("width", &fmt_num(bbox.width() as f32));
        self.xml
            .write_attribute("height", &fmt_num(bbox.height() as f32));
        self.xml
            .write_attribute_fmt("fill", format_args!("url(#{id})"));
        if alpha < 1.0 {
            self.xml.write_attribute("fill-opacity", &fmt_num(alpha));
        }
        self.write_transform(transform);
        self.xml.end_element();
    }
}

/// The transform of the root group: y flip, crop-box translation and page
/// rotation.
fn page_transform(page: &Page) -> Affine {
    let b = page.effective_box();
    let (w, h) = (b.width() as f64, b.height() as f64);

    let flip = Affine::new([1.0, 0.0, 0.0, -1.0, -b.x0 as f64, b.y1 as f64]);

    let rotate = match page.rotation() {
        Rotation::None => Affine::IDENTITY,
        Rotation::Quarter => Affine::new([0.0, 1.0, -1.0, 0.0, h, 0.0]),
        Rotation::Half => Affine::new([-1.0, 0.0, 0.0, -1.0, w, h]),
        Rotation::ThreeQuarters => Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, w]),
    };

    rotate * flip
}

/// Serialize a path to SVG path data. Axis-aligned rectangle subpaths (what
/// `re` builds) come out in the compact `M…h…v…H…Z` shorthand.
pub(crate) fn path_data(path: &BezPath) -> String {
    let mut out = String::new();
    let elements = path.elements();

    let mut i = 0;
    while i < elements.len() {
        if let Some(consumed) = write_rect_subpath(&mut out, &elements[i..]) {
            i += consumed;
            continue;
        }

        match &elements[i] {
            PathEl::MoveTo(p) => {
                out.push('M');
                push_point(&mut out, *p);
            }
            PathEl::LineTo(p) => {
                out.push('L');
                push_point(&mut out, *p);
            }
            PathEl::QuadTo(p1, p2) => {
                out.push('Q');
                push_point(&mut out, *p1);
                out.push(' ');
                push_point(&mut out, *p2);
            }
            PathEl::CurveTo(p1, p2, p3) => {
                out.push('C');
                push_point(&mut out, *p1);
                out.push(' ');
                push_point(&mut out, *p2);
                out.push(' ');
                push_point(&mut out, *p3);
            }
            PathEl::ClosePath => out.push('Z'),
        }

        i += 1;
    }

    out
}

/// A closed four-corner subpath with alternating horizontal/vertical edges:
/// emitted as `M x y h dx v dy H x Z` and reported as five consumed
/// elements. Anything else is left to the generic serializer.
fn write_rect_subpath(out: &mut String, elements: &[PathEl]) -> Option<usize> {
    let (p0, p1, p2, p3) = match elements {
        [PathEl::MoveTo(p0), PathEl::LineTo(p1), PathEl::LineTo(p2), PathEl::LineTo(p3), PathEl::ClosePath, ..] => {
            (*p0, *p1, *p2, *p3)
        }
        _ => return None,
    };

    let axis_aligned = p0.y == p1.y && p1.x == p2.x && p2.y == p3.y && p3.x == p0.x;
    if !axis_aligned {
        return None;
    }

    out.push('M');
    push_point(out, p0);
    out.push('h');
    out.push_str(&fmt_num((p1.x - p0.x) as f32));
    out.push('v');
    out.push_str(&fmt_num((p2.y - p1.y) as f32));
    out.push('H');
    out.push_str(&fmt_num(p3.x as f32));
    out.push('Z');

    Some(5)
}

fn push_point(out: &mut String, p: kurbo::Point) {
    out.push_str(&fmt_num(p.x as f32));
    out.push(' ');
    out.push_str(&fmt_num(p.y as f32));
}

/// Fixed six-digit precision with trailing zeros trimmed.
pub(crate) fn fmt_num(v: f32) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }

    let mut s = format!("{v:.6}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }

    // Avoid the negative zero spelling.
    if s == "-0" {
        s = "0".to_string();
    }

    s
}

pub(crate) fn fmt_matrix(m: Affine) -> String {
    m.as_coeffs()
        .iter()
        .map(|c| fmt_num(*c as f32))
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn css_color(rgb: [f32; 3]) -> String {
    let [r, g, b] = rgb8(rgb);
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn rgb8(rgb: [f32; 3]) -> [u8; 3] {
    let to8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
    [to8(rgb[0]), to8(rgb[1]), to8(rgb[2])]
}

#[cfg(test)]
mod tests {
    use super::{fmt_num, path_data};
    use kurbo::{BezPath, Shape};

    #[test]
    fn numbers_trim_trailing_zeros() {
        assert_eq!(fmt_num(10.0), "10");
        assert_eq!(fmt_num(0.5), "0.5");
        assert_eq!(fmt_num(1.25), "1.25");
        assert_eq!(fmt_num(-0.0), "0");
        assert_eq!(fmt_num(0.1234567), "0.123457");
    }

    #[test]
    fn path_serialization() {
        let mut p = BezPath::new();
        p.move_to((10.0, 10.0));
        p.line_to((90.0, 90.0));
        p.close_path();

        assert_eq!(path_data(&p), "M10 10L90 90Z");
    }

    #[test]
    fn rectangles_use_the_shorthand() {
        let p = kurbo::Rect::new(10.0, 20.0, 110.0, 70.0).to_path(0.1);
        assert_eq!(path_data(&p), "M10 20h100v50H10Z");
    }

    #[test]
    fn rectangle_followed_by_other_segments() {
        let mut p = kurbo::Rect::new(0.0, 0.0, 5.0, 5.0).to_path(0.1);
        p.move_to((10.0, 10.0));
        p.line_to((20.0, 20.0));

        assert_eq!(path_data(&p), "M0 0h5v5H0ZM10 10L20 20");
    }

    #[test]
    fn skewed_quads_stay_generic() {
        let mut p = BezPath::new();
        p.move_to((0.0, 0.0));
        p.line_to((10.0, 1.0));
        p.line_to((10.0, 10.0));
        p.line_to((0.0, 9.0));
        p.close_path();

        assert_eq!(path_data(&p), "M0 0L10 1L10 10L0 9Z");
    }
}
