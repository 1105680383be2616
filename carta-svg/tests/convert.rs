//! End-to-end conversions over synthesized documents.

use carta_svg::carta_interpret::carta_syntax::test_pdf::PdfBuilder;
use carta_svg::{convert, ConvertError, Document, LoadError, SvgOptions};

fn minimal_page(content: &[u8]) -> Vec<u8> {
    PdfBuilder::new()
        .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            b"<< /Type /Page /MediaBox [0 0 200 100] /Contents 4 0 R \
              /Resources << /Font << /F1 5 0 R >> >> >>",
        )
        .stream(4, b"<< >>", content)
        .object(
            5,
            b"<< /Type /Font /Subtype /TrueType /BaseFont /Arial \
              /Encoding /WinAnsiEncoding /FontDescriptor 6 0 R >>",
        )
        .object(
            6,
            b"<< /Type /FontDescriptor /FontName /Arial /Flags 32 /MissingWidth 500 >>",
        )
        .build()
}

fn convert_first_page(data: Vec<u8>) -> String {
    let doc = Document::load(data).unwrap();
    convert(&doc.pages()[0], &SvgOptions::default()).unwrap()
}

#[test]
fn single_stroked_line() {
    let svg = convert_first_page(minimal_page(b"10 10 m 90 90 l S"));

    assert!(svg.contains(r#"<path d="M10 10L90 90""#), "{svg}");
    assert!(svg.contains(r#"fill="none""#));
    assert!(svg.contains(r##"stroke="#000000""##));
}

#[test]
fn svg_fragment_shape() {
    let svg = convert_first_page(minimal_page(b"10 10 m 90 90 l S"));

    assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg""#));
    assert!(!svg.contains("<?xml"));
    assert!(svg.contains(r#"viewBox="0 0 200 100""#));
    assert!(svg.contains(r#"width="200pt""#));
    assert!(svg.contains(r#"height="100pt""#));
    // The page transform flips y and offsets by the page height.
    assert!(svg.contains(r#"<g transform="matrix(1 0 0 -1 0 100)">"#));
    assert!(svg.ends_with("</svg>"));
}

#[test]
fn text_run_at_position() {
    let svg = convert_first_page(minimal_page(b"BT /F1 12 Tf 50 50 Td (Hi) Tj ET"));

    assert!(svg.contains("<text"), "{svg}");
    // Text unflips locally at its Td position.
    assert!(svg.contains(r#"transform="matrix(1 0 0 -1 50 50)""#), "{svg}");
    assert!(svg.contains(">Hi</text>"), "{svg}");
    assert!(svg.contains(r#"font-size="12""#));
    assert!(svg.contains("sans-serif"));
    // Explicit per-glyph positions: H at 0, i advanced by 500/1000 * 12.
    assert!(svg.contains(r#"x="0 6""#), "{svg}");
}

#[test]
fn rectangles_serialize_to_the_shorthand() {
    let svg = convert_first_page(minimal_page(b"10 20 100 50 re f"));
    assert!(svg.contains(r#"d="M10 20h100v50H10Z""#), "{svg}");
}

#[test]
fn empty_content_has_no_drawing_children() {
    let svg = convert_first_page(minimal_page(b""));

    assert!(!svg.contains("<path"));
    assert!(!svg.contains("<text"));
    assert!(!svg.contains("<image"));
    // Only the outer transform group remains.
    assert!(svg.contains("<g transform="));
}

#[test]
fn rotated_page_swaps_view_box() {
    let data = PdfBuilder::new()
        .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            b"<< /Type /Page /MediaBox [0 0 200 100] /Rotate 90 /Contents 4 0 R >>",
        )
        .stream(4, b"<< >>", b"10 10 m 90 90 l S")
        .build();

    let svg = convert_first_page(data);

    assert!(svg.contains(r#"viewBox="0 0 100 200""#), "{svg}");
    // The root transform carries the rotation (cos 0, sin 1).
    assert!(svg.contains(r#"<g transform="matrix(0 1 1 0"#), "{svg}");
}

#[test]
fn crop_box_defines_the_view_box() {
    let data = PdfBuilder::new()
        .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            b"<< /Type /Page /MediaBox [0 0 400 400] /CropBox [50 50 250 150] /Contents 4 0 R >>",
        )
        .stream(4, b"<< >>", b"")
        .build();

    let svg = convert_first_page(data);
    assert!(svg.contains(r#"viewBox="0 0 200 100""#), "{svg}");
    // The crop offset moves into the root transform.
    assert!(svg.contains(r#"matrix(1 0 0 -1 -50 150)"#), "{svg}");
}

#[test]
fn encrypted_document_is_rejected_at_open() {
    let data = PdfBuilder::new()
        .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, b"<< /Type /Pages /Kids [] /Count 0 >>")
        .trailer_extra(b"/Encrypt 9 0 R ")
        .build();

    assert!(matches!(Document::load(data), Err(LoadError::Encrypted)));
}

#[test]
fn imbalanced_state_stack_still_produces_balanced_svg() {
    let svg = convert_first_page(minimal_page(
        b"q 1 0 0 1 5 5 cm 0 0 20 20 re W n q 2 0 0 2 0 0 cm 10 10 m 20 20 l S",
    ));

    let opens = svg.matches("<g").count();
    let closes = svg.matches("</g>").count();
    assert_eq!(opens, closes, "{svg}");
    assert!(svg.ends_with("</svg>"));
}

#[test]
fn clipped_drawing_references_a_def() {
    let svg = convert_first_page(minimal_page(b"0 0 50 50 re W n 10 10 m 20 20 l S"));

    assert!(svg.contains(r#"clip-path="url(#c0)""#), "{svg}");
    assert!(svg.contains(r#"<clipPath id="c0">"#), "{svg}");
}

#[test]
fn identical_inputs_convert_identically() {
    let data = minimal_page(b"BT /F1 12 Tf 50 50 Td (Hi) Tj ET 10 10 m 90 90 l S");
    let doc = Document::load(data).unwrap();

    let a = convert(&doc.pages()[0], &SvgOptions::default()).unwrap();
    let b = convert(&doc.pages()[0], &SvgOptions::default()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn flate_compressed_content_streams_decode() {
    let content = b"10 10 m 90 90 l S";
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(content, 6);

    let data = PdfBuilder::new()
        .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            b"<< /Type /Page /MediaBox [0 0 200 100] /Contents 4 0 R >>",
        )
        .stream(4, b"<< /Filter /FlateDecode >>", &compressed)
        .build();

    let svg = convert_first_page(data);
    assert!(svg.contains(r#"<path d="M10 10L90 90""#), "{svg}");
}

#[test]
fn hidden_text_follows_the_option() {
    let data = minimal_page(b"BT /F1 12 Tf 3 Tr (ghost) Tj ET");

    let doc = Document::load(data).unwrap();
    let hidden = convert(&doc.pages()[0], &SvgOptions::default()).unwrap();
    assert!(!hidden.contains("ghost"));

    let options = SvgOptions {
        include_hidden_text: true,
        ..SvgOptions::default()
    };
    let shown = convert(&doc.pages()[0], &options).unwrap();
    assert!(shown.contains("ghost"), "{shown}");
    assert!(shown.contains(r#"fill="none""#));
}

#[test]
fn minimum_stroke_width_is_applied() {
    let data = minimal_page(b"0.01 w 10 10 m 90 90 l S");
    let doc = Document::load(data).unwrap();

    let options = SvgOptions {
        min_stroke_width: 1.5,
        ..SvgOptions::default()
    };
    let svg = convert(&doc.pages()[0], &options).unwrap();
    assert!(svg.contains(r#"stroke-width="1.5""#), "{svg}");
}

#[test]
fn invalid_options_are_rejected_before_work() {
    let data = minimal_page(b"");
    let doc = Document::load(data).unwrap();

    let options = SvgOptions {
        min_stroke_width: f32::NAN,
        ..SvgOptions::default()
    };

    assert!(matches!(
        convert(&doc.pages()[0], &options),
        Err(ConvertError::InvalidArgument(_))
    ));
}

#[test]
fn cancellation_aborts_the_conversion() {
    let data = minimal_page(b"10 10 m 90 90 l S");
    let doc = Document::load(data).unwrap();

    let options = SvgOptions::default();
    options.cancellation.cancel();

    assert!(matches!(
        convert(&doc.pages()[0], &options),
        Err(ConvertError::Cancelled(_))
    ));
}

#[test]
fn axial_shading_emits_a_gradient() {
    let data = PdfBuilder::new()
        .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            b"<< /Type /Page /MediaBox [0 0 200 100] /Contents 4 0 R \
              /Resources << /Shading << /S0 5 0 R >> >> >>",
        )
        .stream(4, b"<< >>", b"/S0 sh")
        .object(
            5,
            b"<< /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 200 0] \
              /Function << /FunctionType 2 /Domain [0 1] /C0 [1 0 0] /C1 [0 0 1] /N 1 >> >>",
        )
        .build();

    let svg = convert_first_page(data);
    assert!(svg.contains("<linearGradient"), "{svg}");
    assert!(svg.contains(r#"fill="url(#s0)""#), "{svg}");
    assert!(svg.contains(r##"stop-color="#ff0000""##));
    assert!(svg.contains(r##"stop-color="#0000ff""##));
}

#[test]
fn inline_image_becomes_a_data_url() {
    let svg = convert_first_page(minimal_page(
        b"q 100 0 0 50 10 20 cm BI /W 2 /H 2 /BPC 8 /CS /G ID \x00\x40\x80\xff EI Q",
    ));

    assert!(svg.contains("<image"), "{svg}");
    assert!(svg.contains("data:image/png;base64,"), "{svg}");
}

#[test]
fn unsupported_color_space_fails_only_that_page() {
    let data = PdfBuilder::new()
        .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, b"<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 2 >>")
        .object(
            3,
            b"<< /Type /Page /MediaBox [0 0 100 100] /Contents 4 0 R >>",
        )
        .stream(4, b"<< >>", b"/Pattern cs")
        .object(
            5,
            b"<< /Type /Page /MediaBox [0 0 100 100] /Contents 6 0 R >>",
        )
        .stream(6, b"<< >>", b"10 10 m 20 20 l S")
        .build();

    let doc = Document::load(data).unwrap();

    assert!(matches!(
        convert(&doc.pages()[0], &SvgOptions::default()),
        Err(ConvertError::Unsupported(_))
    ));

    // The sibling page still converts.
    let svg = convert(&doc.pages()[1], &SvgOptions::default()).unwrap();
    assert!(svg.contains("<path"));
}

#[test]
fn pages_count_matches_tree_leaves() {
    let data = PdfBuilder::new()
        .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, b"<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>")
        .object(3, b"<< /Type /Pages /Kids [5 0 R] /Count 1 >>")
        .object(4, b"<< /Type /Page /MediaBox [0 0 10 10] >>")
        .object(5, b"<< /Type /Page /MediaBox [0 0 10 10] >>")
        .build();

    let doc = Document::load(data).unwrap();
    assert_eq!(doc.pages().len(), 2);
}

#[test]
fn element_tree_round_trips_structurally() {
    let svg = convert_first_page(minimal_page(
        b"q 0 0 50 50 re W n BT /F1 10 Tf (x) Tj ET 1 0 0 rg 0 0 10 10 re f Q",
    ));

    // Every opened element closes; the fragment is one well-formed tree.
    for tag in ["g", "text", "defs", "clipPath"] {
        let opens = svg.matches(&format!("<{tag}")).count();
        let closes = svg.matches(&format!("</{tag}>")).count();
        let self_closing = 0;
        assert_eq!(opens, closes + self_closing, "tag {tag} imbalanced: {svg}");
    }
}
