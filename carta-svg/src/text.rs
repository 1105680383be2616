//! Emitting text runs.
//!
//! A run becomes one `<text>` element. Glyph x positions are written
//! explicitly so the output reproduces the PDF's advances instead of the
//! viewer font's. White space inside the element is significant; nothing in
//! here may introduce any.

use crate::defs::CachedFont;
use crate::renderer::{fmt_matrix, fmt_num, SvgRenderer};
use carta_interpret::{TextRenderMode, TextRun};
use kurbo::Affine;

pub(crate) fn write_text_run(renderer: &mut SvgRenderer, run: &TextRun) {
    let mode = run.mode;

    if mode == TextRenderMode::Invisible && !renderer.include_hidden_text {
        return;
    }

    if run.glyphs.iter().all(|g| g.text.is_empty()) {
        // A ToUnicode map can legitimately erase all the text.
        return;
    }

    // The run transform carries PDF text space (y up); glyphs themselves
    // are drawn in SVG's y-down convention, so a local flip brings the
    // ascenders back up.
    let transform = run.transform * Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, 0.0]);

    let embedded = run.font.embedded_output_program().is_some();

    renderer.xml.start_element("text");
    renderer
        .xml
        .write_attribute_fmt("transform", format_args!("matrix({})", fmt_matrix(transform)));
    renderer
        .xml
        .write_attribute("font-size", &fmt_num(run.font_size));
    renderer.xml.write_attribute("xml:space", "preserve");

    if embedded {
        let id = renderer
            .fonts
            .insert_with(CachedFont::key(&run.font), || CachedFont {
                font: run.font.clone(),
            });
        renderer
            .xml
            .write_attribute_fmt("font-family", format_args!("{id}"));
    } else {
        let substitute = run.font.substitute();
        renderer
            .xml
            .write_attribute("font-family", &substitute.family);
        if substitute.bold {
            renderer.xml.write_attribute("font-weight", "bold");
        }
        if substitute.italic {
            renderer.xml.write_attribute("font-style", "italic");
        }
    }

    match mode {
        TextRenderMode::Invisible => {
            renderer.xml.write_attribute("fill", "none");
            renderer.xml.write_attribute("stroke", "none");
        }
        TextRenderMode::Stroke => renderer.write_paint(&run.stroke, Some(&run.stroke_props)),
        TextRenderMode::FillStroke => {
            // write_paint would force fill to none for strokes; set both by
            // hand.
            renderer
                .xml
                .write_attribute("fill", &crate::renderer::css_color(run.fill.rgb));
            renderer
                .xml
                .write_attribute("stroke", &crate::renderer::css_color(run.stroke.rgb));
            renderer
                .xml
                .write_attribute("stroke-width", &fmt_num(run.stroke_props.line_width));
        }
        _ => renderer.write_paint(&run.fill, None),
    }

    // Per-character x positions only line up when every glyph contributes
    // exactly one character; otherwise each glyph gets its own tspan.
    let single_chars = run
        .glyphs
        .iter()
        .all(|g| g.text.chars().count() == 1);

    if single_chars {
        let positions = run
            .glyphs
            .iter()
            .map(|g| fmt_num(g.x))
            .collect::<Vec<_>>()
            .join(" ");
        renderer.xml.write_attribute("x", &positions);

        let mut content = String::new();
        for glyph in &run.glyphs {
            content.push_str(&glyph.text);
        }
        renderer.xml.write_text(&content);
    } else {
        for glyph in &run.glyphs {
            if glyph.text.is_empty() {
                continue;
            }

            renderer.xml.start_element("tspan");
            renderer.xml.write_attribute("x", &fmt_num(glyph.x));
            renderer.xml.write_text(&glyph.text);
            renderer.xml.end_element();
        }
    }

    renderer.xml.end_element();
}
