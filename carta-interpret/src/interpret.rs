//! The content-stream operator loop.

use crate::cancel::{CancelToken, Cancelled};
use crate::color::{ColorSpace, ColorSpaceError};
use crate::context::Context;
use crate::device::{Device, FillRule, PathDrawMode, TextRenderMode};
use crate::font::{default_font_resolver, Font, FontResolverFn};
use crate::image::{self, Decoded};
use crate::resources::Resources;
use crate::shading::Shading;
use crate::state::ColorValue;
use crate::text;
use crate::xobject::{self, FormXObject, XObject};
use carta_syntax::content::{ContentIter, DispatchError, Op};
use carta_syntax::object::name::keys::SMASK;
use carta_syntax::page::Page;
use carta_syntax::{Dict, Name, Object, PdfString};
use kurbo::{Affine, Point, Rect, Shape};
use log::warn;
use smallvec::SmallVec;
use thiserror::Error;

/// Nested form XObjects beyond this depth are skipped.
const MAX_FORM_DEPTH: u32 = 16;

/// Why a page conversion stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    /// The cancellation token was raised.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    /// The page requires a feature this pipeline excludes (spot check: a
    /// color space family in a required paint). Other pages may still
    /// convert.
    #[error("unsupported feature: {0}")]
    Unsupported(String),
}

/// Settings for one conversion.
#[derive(Clone)]
pub struct InterpretSettings {
    /// Substitute-font resolution callback.
    pub font_resolver: FontResolverFn,
    /// The smallest stroke width to emit, in user-space units. Zero leaves
    /// widths untouched.
    pub min_stroke_width: f32,
    /// The cancellation signal, checked between operators.
    pub cancel: CancelToken,
}

impl Default for InterpretSettings {
    fn default() -> Self {
        Self {
            font_resolver: default_font_resolver(),
            min_stroke_width: 0.0,
            cancel: CancelToken::new(),
        }
    }
}

/// Execute a page's content against `device`. `initial_transform` maps user
/// space to the device's coordinate system.
pub fn interpret_page(
    page: &Page,
    initial_transform: Affine,
    settings: &InterpretSettings,
    device: &mut dyn Device,
) -> Result<(), InterpretError> {
    let xref = page.xref().clone();
    let resources = Resources::new(page.resources().clone(), &xref);
    let mut ctx = Context::new(initial_transform, &xref, settings.cancel.clone());

    let depth = ctx.depth();
    let result = run(page.content(), &resources, &mut ctx, settings, device, 0);

    // The graphics-state stack must return to its starting depth even when
    // the stream is imbalanced or execution stopped early, and clips pushed
    // outside any save/restore pair must not leak past the page.
    ctx.unwind_to_depth(depth, device);
    for _ in 0..ctx.state().n_clips {
        device.pop_clip();
    }
    ctx.state_mut().n_clips = 0;

    result
}

fn run(
    content: &[u8],
    resources: &Resources,
    ctx: &mut Context,
    settings: &InterpretSettings,
    device: &mut dyn Device,
    form_depth: u32,
) -> Result<(), InterpretError> {
    let depth = ctx.depth();

    for operation in ContentIter::new(content) {
        ctx.cancel.check()?;

        let op = match Op::dispatch(&operation) {
            Ok(op) => op,
            Err(DispatchError::UnknownOperator) => {
                if ctx.compat_depth == 0 {
                    warn!(
                        "skipping unknown operator {}",
                        String::from_utf8_lossy(operation.operator)
                    );
                }
                continue;
            }
            Err(DispatchError::InvalidOperands) => continue,
        };

        execute(op, resources, ctx, settings, device, form_depth)?;
    }

    ctx.unwind_to_depth(depth, device);

    Ok(())
}

fn execute(
    op: Op,
    resources: &Resources,
    ctx: &mut Context,
    settings: &InterpretSettings,
    device: &mut dyn Device,
    form_depth: u32,
) -> Result<(), InterpretError> {
    match op {
        Op::SaveState => ctx.save_state(),
        Op::RestoreState => ctx.restore_state(device),
        Op::Concat(m) => ctx.concat(affine(m)),

        Op::SetLineWidth(w) => ctx.state_mut().graphics.stroke_props.line_width = w,
        Op::SetLineCap(c) => {
            ctx.state_mut().graphics.stroke_props.line_cap = c.clamp(0, 2) as u8;
        }
        Op::SetLineJoin(j) => {
            ctx.state_mut().graphics.stroke_props.line_join = j.clamp(0, 2) as u8;
        }
        Op::SetMiterLimit(l) => ctx.state_mut().graphics.stroke_props.miter_limit = l,
        Op::SetDash(array, phase) => {
            let props = &mut ctx.state_mut().graphics.stroke_props;
            props.dash_array = array;
            props.dash_offset = phase;
        }
        Op::SetRenderingIntent(name) => {
            ctx.state_mut().graphics.rendering_intent = Some(name);
        }
        Op::SetFlatness(f) => ctx.state_mut().graphics.flatness = f,
        Op::SetExtGState(name) => match resources.ext_g_state(&name) {
            Some(gs) => apply_ext_g_state(&gs, resources, ctx),
            None => warn!("missing ExtGState {name}"),
        },

        Op::MoveTo(x, y) => {
            let p = Point::new(x as f64, y as f64);
            ctx.set_last_point(p);
            ctx.set_subpath_start(p);
            ctx.path_mut().move_to(p);
        }
        Op::LineTo(x, y) => {
            if !ctx.path().elements().is_empty() {
                let p = Point::new(x as f64, y as f64);
                ctx.set_last_point(p);
                ctx.path_mut().line_to(p);
            }
        }
        Op::CurveTo([x1, y1, x2, y2, x3, y3]) => {
            if !ctx.path().elements().is_empty() {
                let p3 = Point::new(x3 as f64, y3 as f64);
                ctx.set_last_point(p3);
                ctx.path_mut().curve_to(
                    Point::new(x1 as f64, y1 as f64),
                    Point::new(x2 as f64, y2 as f64),
                    p3,
                );
            }
        }
        Op::CurveToStart([x2, y2, x3, y3]) => {
            if !ctx.path().elements().is_empty() {
                let p1 = ctx.last_point();
                let p3 = Point::new(x3 as f64, y3 as f64);
                ctx.set_last_point(p3);
                ctx.path_mut()
                    .curve_to(p1, Point::new(x2 as f64, y2 as f64), p3);
            }
        }
        Op::CurveToEnd([x2, y2, x3, y3]) => {
            if !ctx.path().elements().is_empty() {
                let p2 = Point::new(x2 as f64, y2 as f64);
                let p3 = Point::new(x3 as f64, y3 as f64);
                ctx.set_last_point(p3);
                ctx.path_mut().curve_to(p2, p3, p3);
            }
        }
        Op::ClosePath => close_path(ctx),
        Op::Rect([x, y, w, h]) => {
            let rect = Rect::new(
                x as f64,
                y as f64,
                (x + w) as f64,
                (y + h) as f64,
            );
            ctx.path_mut().extend(rect.to_path(0.1));
            ctx.set_last_point(Point::new(x as f64, y as f64));
            ctx.set_subpath_start(Point::new(x as f64, y as f64));
        }

        Op::Stroke => paint_path(ctx, device, settings, None, true),
        Op::CloseStroke => {
            close_path(ctx);
            paint_path(ctx, device, settings, None, true);
        }
        Op::Fill => paint_path(ctx, device, settings, Some(FillRule::NonZero), false),
        Op::FillEvenOdd => paint_path(ctx, device, settings, Some(FillRule::EvenOdd), false),
        Op::FillStroke => paint_path(ctx, device, settings, Some(FillRule::NonZero), true),
        Op::FillStrokeEvenOdd => {
            paint_path(ctx, device, settings, Some(FillRule::EvenOdd), true);
        }
        Op::CloseFillStroke => {
            close_path(ctx);
            paint_path(ctx, device, settings, Some(FillRule::NonZero), true);
        }
        Op::CloseFillStrokeEvenOdd => {
            close_path(ctx);
            paint_path(ctx, device, settings, Some(FillRule::EvenOdd), true);
        }
        Op::EndPath => ctx.finish_path(device),

        Op::Clip => ctx.set_pending_clip(FillRule::NonZero),
        Op::ClipEvenOdd => ctx.set_pending_clip(FillRule::EvenOdd),

        Op::SetStrokeColorSpace(name) => {
            let space = resolve_color_space(&name, resources, ctx)?;
            ctx.state_mut().graphics.stroke_color = ColorValue {
                components: space.initial_components(),
                space,
            };
        }
        Op::SetFillColorSpace(name) => {
            let space = resolve_color_space(&name, resources, ctx)?;
            ctx.state_mut().graphics.fill_color = ColorValue {
                components: space.initial_components(),
                space,
            };
        }
        Op::SetStrokeColor(c) | Op::SetStrokeColorExtended(c, None) => {
            ctx.state_mut().graphics.stroke_color.components = SmallVec::from_vec(c);
        }
        Op::SetFillColor(c) | Op::SetFillColorExtended(c, None) => {
            ctx.state_mut().graphics.fill_color.components = SmallVec::from_vec(c);
        }
        Op::SetStrokeColorExtended(_, Some(pattern))
        | Op::SetFillColorExtended(_, Some(pattern)) => {
            // Reaching here means the Pattern color space slipped past `cs`,
            // which already rejects it.
            warn!("ignoring pattern paint {pattern}");
        }
        Op::SetStrokeGray(g) => {
            ctx.state_mut().graphics.stroke_color = gray(g);
        }
        Op::SetFillGray(g) => {
            ctx.state_mut().graphics.fill_color = gray(g);
        }
        Op::SetStrokeRgb(rgb) => {
            ctx.state_mut().graphics.stroke_color = device_color(ColorSpace::DeviceRgb, &rgb);
        }
        Op::SetFillRgb(rgb) => {
            ctx.state_mut().graphics.fill_color = device_color(ColorSpace::DeviceRgb, &rgb);
        }
        Op::SetStrokeCmyk(cmyk) => {
            ctx.state_mut().graphics.stroke_color = device_color(ColorSpace::DeviceCmyk, &cmyk);
        }
        Op::SetFillCmyk(cmyk) => {
            ctx.state_mut().graphics.fill_color = device_color(ColorSpace::DeviceCmyk, &cmyk);
        }

        Op::Shading(name) => {
            match resources
                .shading(&name)
                .and_then(|obj| Shading::parse(&obj, &ctx.xref))
            {
                Some(shading) => {
                    let state = ctx.state();
                    device.draw_shading(&shading, state.ctm, state.graphics.fill_alpha);
                }
                None => warn!("failed to resolve shading {name}"),
            }
        }

        Op::XObject(name) => {
            let Some((stream, _)) = resources.x_object(&name) else {
                warn!("missing XObject {name}");
                return Ok(());
            };

            match xobject::classify(&stream, &ctx.xref) {
                Some(XObject::Image(stream)) => {
                    draw_image(&stream, Some(resources), ctx, device);
                }
                Some(XObject::Form(form)) => {
                    draw_form(&form, resources, ctx, settings, device, form_depth)?;
                }
                None => {}
            }
        }
        Op::InlineImage(stream) => draw_image(&stream, Some(resources), ctx, device),

        Op::BeginText => {
            let ts = &mut ctx.state_mut().text;
            ts.matrix = Affine::IDENTITY;
            ts.line_matrix = Affine::IDENTITY;
        }
        Op::EndText => {}
        Op::SetCharSpacing(v) => ctx.state_mut().text.char_spacing = v,
        Op::SetWordSpacing(v) => ctx.state_mut().text.word_spacing = v,
        Op::SetHorizontalScaling(v) => ctx.state_mut().text.horizontal_scale = v / 100.0,
        Op::SetLeading(v) => ctx.state_mut().text.leading = v,
        Op::SetRise(v) => ctx.state_mut().text.rise = v,
        Op::SetFont(name, size) => {
            let font = lookup_font(&name, resources, ctx, settings);
            let ts = &mut ctx.state_mut().text;
            ts.font_size = size;
            ts.font = font;
        }
        Op::SetTextRenderMode(mode) => {
            ctx.state_mut().text.render_mode = match mode {
                0 => TextRenderMode::Fill,
                1 => TextRenderMode::Stroke,
                2 => TextRenderMode::FillStroke,
                3 => TextRenderMode::Invisible,
                4 => TextRenderMode::FillClip,
                5 => TextRenderMode::StrokeClip,
                6 => TextRenderMode::FillStrokeClip,
                7 => TextRenderMode::Clip,
                other => {
                    warn!("unknown text rendering mode {other}");
                    TextRenderMode::Fill
                }
            };
        }
        Op::NextLine(tx, ty) => ctx.state_mut().text.next_line(tx as f64, ty as f64),
        Op::NextLineSetLeading(tx, ty) => {
            ctx.state_mut().text.leading = -ty;
            ctx.state_mut().text.next_line(tx as f64, ty as f64);
        }
        Op::SetTextMatrix(m) => {
            let ts = &mut ctx.state_mut().text;
            ts.matrix = affine(m);
            ts.line_matrix = affine(m);
        }
        Op::NextLineDefault => {
            let leading = ctx.state().text.leading;
            ctx.state_mut().text.next_line(0.0, -leading as f64);
        }
        Op::ShowText(s) => show(ctx, resources, settings, device, &s, form_depth)?,
        Op::ShowTextNextLine(s) => {
            let leading = ctx.state().text.leading;
            ctx.state_mut().text.next_line(0.0, -leading as f64);
            show(ctx, resources, settings, device, &s, form_depth)?;
        }
        Op::ShowTextSpaced(word, char_sp, s) => {
            ctx.state_mut().text.word_spacing = word;
            ctx.state_mut().text.char_spacing = char_sp;
            let leading = ctx.state().text.leading;
            ctx.state_mut().text.next_line(0.0, -leading as f64);
            show(ctx, resources, settings, device, &s, form_depth)?;
        }
        Op::ShowTextArray(array) => {
            for item in array.iter() {
                match ctx.xref.resolve(item) {
                    Object::String(s) => {
                        show(ctx, resources, settings, device, &s, form_depth)?;
                    }
                    other => {
                        if let Some(adjustment) = other.as_f32() {
                            ctx.state_mut().text.adjust(adjustment);
                        }
                    }
                }
            }
        }

        // Type 3 glyph metrics come from /Widths; the inline declarations
        // are redundant here.
        Op::GlyphWidth(..) | Op::GlyphWidthBBox(..) => {}

        // Marked content is recognized and skipped.
        Op::MarkedContentPoint(_)
        | Op::MarkedContentPointProps(..)
        | Op::BeginMarkedContent(_)
        | Op::BeginMarkedContentProps(..)
        | Op::EndMarkedContent => {}

        Op::BeginCompatibility => ctx.compat_depth += 1,
        Op::EndCompatibility => ctx.compat_depth = ctx.compat_depth.saturating_sub(1),
    }

    Ok(())
}

fn affine(m: [f32; 6]) -> Affine {
    Affine::new([
        m[0] as f64,
        m[1] as f64,
        m[2] as f64,
        m[3] as f64,
        m[4] as f64,
        m[5] as f64,
    ])
}

fn gray(g: f32) -> ColorValue {
    device_color(ColorSpace::DeviceGray, &[g])
}

fn device_color(space: ColorSpace, components: &[f32]) -> ColorValue {
    ColorValue {
        space,
        components: SmallVec::from_slice(components),
    }
}

fn close_path(ctx: &mut Context) {
    if !ctx.path().elements().is_empty() {
        ctx.path_mut().close_path();
        let start = ctx.subpath_start();
        ctx.set_last_point(start);
    }
}

/// Paint the current path (fill first, then stroke), then resolve any
/// pending clip and reset the path.
fn paint_path(
    ctx: &mut Context,
    device: &mut dyn Device,
    settings: &InterpretSettings,
    fill: Option<FillRule>,
    stroke: bool,
) {
    let path = ctx.path().clone();

    if !path.elements().is_empty() {
        if let Some(rule) = fill {
            let state = ctx.state();
            device.draw_path(
                &path,
                state.ctm,
                &state.graphics.fill_paint(),
                &PathDrawMode::Fill(rule),
            );
        }

        if stroke {
            let mut props = ctx.state().graphics.stroke_props.clone();
            props.line_width = props.line_width.max(settings.min_stroke_width);

            let state = ctx.state();
            device.draw_path(
                &path,
                state.ctm,
                &state.graphics.stroke_paint(),
                &PathDrawMode::Stroke(props),
            );
        }
    }

    ctx.finish_path(device);
}

fn resolve_color_space(
    name: &Name,
    resources: &Resources,
    ctx: &Context,
) -> Result<ColorSpace, InterpretError> {
    let direct = ColorSpace::parse(&Object::Name(name.clone()), &ctx.xref);

    let result = match direct {
        Ok(space) => Ok(space),
        Err(ColorSpaceError::Unsupported(f)) => Err(ColorSpaceError::Unsupported(f)),
        Err(ColorSpaceError::Malformed) => match resources.color_space(name) {
            Some(obj) => ColorSpace::parse(&obj, &ctx.xref),
            None => Err(ColorSpaceError::Malformed),
        },
    };

    match result {
        Ok(space) => Ok(space),
        Err(ColorSpaceError::Unsupported(family)) => {
            Err(InterpretError::Unsupported(format!("color space {family}")))
        }
        Err(ColorSpaceError::Malformed) => {
            warn!("unresolvable color space {name}, using DeviceGray");
            Ok(ColorSpace::DeviceGray)
        }
    }
}

fn lookup_font(
    name: &Name,
    resources: &Resources,
    ctx: &mut Context,
    settings: &InterpretSettings,
) -> Option<Font> {
    let Some((dict, cache_key)) = resources.font(name) else {
        warn!("font {name} not found in resources");
        return None;
    };

    let xref = ctx.xref.clone();
    let resolver = settings.font_resolver.clone();

    match cache_key {
        Some(key) => ctx
            .font_cache
            .entry(key)
            .or_insert_with(|| Font::load(&dict, &xref, &resolver))
            .clone(),
        None => Font::load(&dict, &xref, &resolver),
    }
}

fn show(
    ctx: &mut Context,
    resources: &Resources,
    settings: &InterpretSettings,
    device: &mut dyn Device,
    string: &PdfString,
    form_depth: u32,
) -> Result<(), InterpretError> {
    let Some(font) = ctx.state().text.font.clone() else {
        warn!("text shown before a font was selected");
        return Ok(());
    };

    if font.is_type3() {
        show_type3(ctx, resources, settings, device, &font, string, form_depth)
    } else {
        text::show_text(ctx, device, string.as_bytes());
        Ok(())
    }
}

/// Type 3 glyphs are content streams; each is executed like a small form
/// with the glyph's transform applied.
fn show_type3(
    ctx: &mut Context,
    resources: &Resources,
    settings: &InterpretSettings,
    device: &mut dyn Device,
    font: &Font,
    string: &PdfString,
    form_depth: u32,
) -> Result<(), InterpretError> {
    if form_depth >= MAX_FORM_DEPTH {
        warn!("type 3 glyphs nested too deeply, skipping");
        return Ok(());
    }

    for unit in font.decode_string(string.as_bytes()) {
        if ctx.state().text.render_mode != TextRenderMode::Invisible {
            if let Some((proc, font_matrix, proc_resources)) = font.type3_glyph(unit.code) {
                let content = match proc.decoded(&ctx.xref) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!("type 3 glyph failed to decode: {e}");
                        continue;
                    }
                };

                let glyph_resources = match proc_resources {
                    Some(dict) => Resources::nested(dict, resources),
                    None => resources.clone(),
                };

                let depth = ctx.depth();
                ctx.save_state();

                {
                    let state = ctx.state_mut();
                    let ts = &state.text;
                    let size = Affine::new([
                        (ts.font_size * ts.horizontal_scale) as f64,
                        0.0,
                        0.0,
                        ts.font_size as f64,
                        0.0,
                        ts.rise as f64,
                    ]);
                    state.ctm = state.ctm * ts.matrix * size * affine(font_matrix);
                }

                run(
                    &content,
                    &glyph_resources,
                    ctx,
                    settings,
                    device,
                    form_depth + 1,
                )?;

                ctx.unwind_to_depth(depth, device);
            }
        }

        let width = font.width(unit.code);
        ctx.state_mut().text.advance(width, unit.is_word_space());
    }

    Ok(())
}

fn draw_form(
    form: &FormXObject,
    parent_resources: &Resources,
    ctx: &mut Context,
    settings: &InterpretSettings,
    device: &mut dyn Device,
    form_depth: u32,
) -> Result<(), InterpretError> {
    if form_depth >= MAX_FORM_DEPTH {
        warn!("form XObjects nested too deeply, skipping");
        return Ok(());
    }

    let resources = match &form.resources {
        Some(dict) => Resources::nested(dict.clone(), parent_resources),
        None => parent_resources.clone(),
    };

    let depth = ctx.depth();
    ctx.save_state();
    ctx.concat(form.matrix);

    // Transparency groups collapse to plain groups without blending.
    if form.is_transparency_group {
        device.push_group(ctx.state().graphics.fill_alpha);
    }

    let mut pushed_bbox_clip = false;
    if let Some(bbox) = form.bbox {
        let rect = Rect::new(
            bbox.x0 as f64,
            bbox.y0 as f64,
            bbox.x1 as f64,
            bbox.y1 as f64,
        );
        device.push_clip(&crate::device::ClipPath {
            path: ctx.state().ctm * rect.to_path(0.1),
            rule: FillRule::NonZero,
        });
        pushed_bbox_clip = true;
    }

    let result = run(&form.content, &resources, ctx, settings, device, form_depth + 1);

    if pushed_bbox_clip {
        device.pop_clip();
    }
    if form.is_transparency_group {
        device.pop_group();
    }

    ctx.unwind_to_depth(depth, device);

    result
}

fn draw_image(
    stream: &carta_syntax::Stream,
    resources: Option<&Resources>,
    ctx: &mut Context,
    device: &mut dyn Device,
) {
    // Decode failures degrade to a warning; the rest of the page renders.
    let decoded = image::decode(stream, resources, &ctx.xref);

    // The unit square holds the image with its top row at the top edge.
    let placement = ctx.state().ctm * Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, 1.0]);

    match decoded {
        Some(Decoded::Image(img)) => device.draw_image(&img, placement),
        Some(Decoded::Stencil(mask)) => {
            let paint = ctx.state().graphics.fill_paint();
            device.draw_stencil(&mask, placement, &paint);
        }
        None => warn!("image omitted"),
    }
}

/// Overlay an `/ExtGState` dictionary onto the current state.
fn apply_ext_g_state(gs: &Dict, _resources: &Resources, ctx: &mut Context) {
    let xref = ctx.xref.clone();

    for key in gs.keys() {
        let applied = match key.as_str() {
            "LW" => gs
                .get::<f32>("LW", &xref)
                .map(|v| ctx.state_mut().graphics.stroke_props.line_width = v),
            "LC" => gs
                .get::<i32>("LC", &xref)
                .map(|v| ctx.state_mut().graphics.stroke_props.line_cap = v.clamp(0, 2) as u8),
            "LJ" => gs
                .get::<i32>("LJ", &xref)
                .map(|v| ctx.state_mut().graphics.stroke_props.line_join = v.clamp(0, 2) as u8),
            "ML" => gs
                .get::<f32>("ML", &xref)
                .map(|v| ctx.state_mut().graphics.stroke_props.miter_limit = v),
            "CA" => gs
                .get::<f32>("CA", &xref)
                .map(|v| ctx.state_mut().graphics.stroke_alpha = v.clamp(0.0, 1.0)),
            "ca" => gs
                .get::<f32>("ca", &xref)
                .map(|v| ctx.state_mut().graphics.fill_alpha = v.clamp(0.0, 1.0)),
            "SA" => gs
                .get::<bool>("SA", &xref)
                .map(|v| ctx.state_mut().graphics.stroke_adjustment = v),
            "D" => {
                let value = gs.get::<Object>("D", &xref).and_then(|o| {
                    let arr = o.as_array()?;
                    let dashes: Vec<f32> = arr.get::<Vec<f32>>(0, &xref)?;
                    let phase: f32 = arr.get::<f32>(1, &xref)?;
                    Some((dashes, phase))
                });
                value.map(|(dashes, phase)| {
                    let props = &mut ctx.state_mut().graphics.stroke_props;
                    props.dash_array = dashes;
                    props.dash_offset = phase;
                })
            }
            "BM" => {
                let mode = gs.get::<Name>("BM", &xref);
                if let Some(mode) = &mode {
                    if mode.as_str() != "Normal" && mode.as_str() != "Compatible" {
                        warn!("blend mode {mode} is ignored");
                    }
                }
                mode.map(|_| ())
            }
            SMASK => {
                // Soft masks sit on the excluded blending path.
                let is_none = gs
                    .get::<Name>(SMASK, &xref)
                    .is_some_and(|n| n.as_str() == "None");
                if !is_none {
                    warn!("soft masks are ignored");
                }
                Some(())
            }
            "Font" | "Type" => Some(()),
            _ => Some(()),
        };

        if applied.is_none() {
            warn!("invalid ExtGState value for {key}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::tests_support::RecordingDevice;
    use carta_syntax::test_pdf::PdfBuilder;
    use carta_syntax::Document;

    fn convert(content: &[u8]) -> RecordingDevice {
        convert_with(content, InterpretSettings::default()).unwrap()
    }

    fn convert_with(
        content: &[u8],
        settings: InterpretSettings,
    ) -> Result<RecordingDevice, InterpretError> {
        let data = PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
            .object(
                3,
                b"<< /Type /Page /MediaBox [0 0 200 100] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>",
            )
            .stream(4, b"<< >>", content)
            .object(
                5,
                b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
                  /FontDescriptor 6 0 R >>",
            )
            .object(
                6,
                b"<< /Type /FontDescriptor /FontName /Helvetica /Flags 32 \
                  /MissingWidth 500 >>",
            )
            .build();

        let doc = Document::load(data).unwrap();
        let mut device = RecordingDevice::default();
        interpret_page(&doc.pages()[0], Affine::IDENTITY, &settings, &mut device)?;
        Ok(device)
    }

    #[test]
    fn stroke_reaches_the_device() {
        let device = convert(b"10 10 m 90 90 l S");
        assert_eq!(device.paths.len(), 1);
        assert!(matches!(device.paths[0].3, PathDrawMode::Stroke(_)));
    }

    #[test]
    fn fill_and_stroke_split_into_two_calls() {
        let device = convert(b"0 0 100 50 re B");
        assert_eq!(device.paths.len(), 2);
        assert!(matches!(device.paths[0].3, PathDrawMode::Fill(_)));
        assert!(matches!(device.paths[1].3, PathDrawMode::Stroke(_)));
    }

    #[test]
    fn minimum_stroke_width_clamps() {
        let settings = InterpretSettings {
            min_stroke_width: 2.5,
            ..InterpretSettings::default()
        };
        let device = convert_with(b"0.1 w 10 10 m 90 90 l S", settings).unwrap();

        let PathDrawMode::Stroke(props) = &device.paths[0].3 else {
            panic!("expected a stroke");
        };
        assert_eq!(props.line_width, 2.5);
    }

    #[test]
    fn clip_applies_after_the_painting_operator() {
        let device = convert(b"0 0 50 50 re W n 10 10 m 20 20 l S");
        assert_eq!(device.clips_pushed, 1);
        assert_eq!(device.paths.len(), 1);
        // Everything pushed is popped again by the end of the page.
        assert_eq!(device.clip_depth, 0);
    }

    #[test]
    fn imbalanced_saves_are_unwound() {
        let device = convert(b"q 1 0 0 1 5 5 cm q 10 10 m 20 20 l S");
        // All opened groups are closed by the end of the page.
        assert_eq!(device.clip_depth, 0);
        assert_eq!(device.paths.len(), 1);
    }

    #[test]
    fn restore_without_save_is_tolerated() {
        let device = convert(b"Q Q 10 10 m 20 20 l S");
        assert_eq!(device.paths.len(), 1);
    }

    #[test]
    fn text_run_positions() {
        let device = convert(b"BT /F1 12 Tf 50 60 Td (Hi) Tj ET");

        assert_eq!(device.runs.len(), 1);
        let run = &device.runs[0];
        assert_eq!(run.font_size, 12.0);
        assert_eq!(run.glyphs.len(), 2);
        assert_eq!(run.glyphs[0].text, "H");
        assert_eq!(run.glyphs[1].text, "i");

        // The run transform carries the Td offset.
        let origin = run.transform * kurbo::Point::ZERO;
        assert_eq!((origin.x, origin.y), (50.0, 60.0));

        // The second glyph sits one 500/1000-em advance to the right.
        assert!((run.glyphs[1].x - 6.0).abs() < 1e-4);
    }

    #[test]
    fn invisible_text_is_still_reported() {
        let device = convert(b"BT /F1 12 Tf 3 Tr (Hi) Tj ET");
        assert_eq!(device.runs[0].mode, TextRenderMode::Invisible);
    }

    #[test]
    fn unknown_operators_are_skipped() {
        let device = convert(b"frobnicate 10 10 m 20 20 l S BX quux EX");
        assert_eq!(device.paths.len(), 1);
    }

    #[test]
    fn unsupported_color_space_fails_the_page() {
        let err = convert_with(b"/Pattern cs", InterpretSettings::default()).unwrap_err();
        assert!(matches!(err, InterpretError::Unsupported(_)));
    }

    #[test]
    fn cancellation_aborts() {
        let settings = InterpretSettings::default();
        settings.cancel.cancel();

        let err = convert_with(b"10 10 m 20 20 l S", settings).unwrap_err();
        assert_eq!(err, InterpretError::Cancelled(Cancelled));
    }

    #[test]
    fn ext_g_state_alpha() {
        let data = PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
            .object(
                3,
                b"<< /Type /Page /MediaBox [0 0 100 100] /Contents 4 0 R \
                  /Resources << /ExtGState << /G0 << /ca 0.5 /LW 3 >> >> >> >>",
            )
            .stream(4, b"<< >>", b"/G0 gs 0 0 50 50 re f")
            .build();

        let doc = Document::load(data).unwrap();
        let mut device = RecordingDevice::default();
        interpret_page(
            &doc.pages()[0],
            Affine::IDENTITY,
            &InterpretSettings::default(),
            &mut device,
        )
        .unwrap();

        assert_eq!(device.paths.len(), 1);
        assert_eq!(device.paths[0].2.alpha, 0.5);
    }
}
