//! Showing text.

use crate::context::Context;
use crate::device::{Device, Glyph, TextRenderMode, TextRun};
use crate::font::Font;
use log::warn;

/// Show one string operand with the active font, emitting a single run and
/// advancing the text matrix. Type 3 fonts take the interpreter path
/// instead.
pub(crate) fn show_text(ctx: &mut Context, device: &mut dyn Device, bytes: &[u8]) {
    let Some(font) = ctx.state().text.font.clone() else {
        warn!("text shown before a font was selected");
        return;
    };

    debug_assert!(!font.is_type3());

    if font.is_vertical() {
        warn!("vertical writing mode is laid out horizontally");
    }

    let (run, advances) = build_run(ctx, &font, bytes);

    if !run.glyphs.is_empty() {
        device.draw_text(&run);
    }

    for (width, word_space) in advances {
        ctx.state_mut().text.advance(width, word_space);
    }
}

/// Assemble the glyphs of a run without touching the text matrix; the
/// returned advances are applied by the caller afterwards.
fn build_run(ctx: &Context, font: &Font, bytes: &[u8]) -> (TextRun, Vec<(f32, bool)>) {
    let state = ctx.state();
    let ts = &state.text;

    let mode = effective_mode(ts.render_mode);

    let mut glyphs = vec![];
    let mut advances = vec![];
    // Glyph origins accumulate in pre-scaling text space; the run transform
    // carries the horizontal scaling.
    let mut x = 0.0f32;

    for unit in font.decode_string(bytes) {
        let width = font.width(unit.code);

        glyphs.push(Glyph {
            x,
            code: unit.code,
            glyph_id: font.glyph_for_code(unit.code),
            text: font.text_for_code(unit.code),
        });

        let word = if unit.is_word_space() {
            ts.word_spacing
        } else {
            0.0
        };
        x += width / 1000.0 * ts.font_size + ts.char_spacing + word;

        advances.push((width, unit.is_word_space()));
    }

    let run = TextRun {
        font: font.clone(),
        font_size: ts.font_size,
        transform: state.ctm * ts.run_transform(),
        glyphs,
        mode,
        fill: state.graphics.fill_paint(),
        stroke: state.graphics.stroke_paint(),
        stroke_props: state.graphics.stroke_props.clone(),
    };

    (run, advances)
}

/// Glyph-outline clipping needs outline extraction, which this pipeline
/// doesn't do; clipping modes degrade to their painting part.
fn effective_mode(mode: TextRenderMode) -> TextRenderMode {
    match mode {
        TextRenderMode::FillClip => {
            warn!("text clipping is not supported, filling only");
            TextRenderMode::Fill
        }
        TextRenderMode::StrokeClip => {
            warn!("text clipping is not supported, stroking only");
            TextRenderMode::Stroke
        }
        TextRenderMode::FillStrokeClip => {
            warn!("text clipping is not supported, filling and stroking only");
            TextRenderMode::FillStroke
        }
        TextRenderMode::Clip => {
            warn!("text clipping is not supported, dropping clip-only text");
            TextRenderMode::Invisible
        }
        other => other,
    }
}
