/*!
Convert PDF pages to SVG fragments.

Each page serializes to one SVG 1.1 fragment without an XML declaration,
suitable for inlining in HTML or writing to a file:

```text
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 W H" width="Wpt" height="Hpt">
  <g transform="…page transform…">…content…</g>
  <defs>…deduplicated clip paths, gradients, fonts…</defs>
</svg>
```

Text is emitted as `<text>` elements whose content is the character map's
output Unicode; embedded TrueType/OpenType fonts ride along as data-URL
`@font-face` rules. White space inside `<text>` is significant, and the
serializer never inserts any.

# Example

```no_run
use carta_svg::{Document, SvgOptions};

let data = std::fs::read("file.pdf").unwrap();
let doc = Document::load(data).unwrap();

for (i, page) in doc.pages().iter().enumerate() {
    let svg = carta_svg::convert(page, &SvgOptions::default()).unwrap();
    std::fs::write(format!("page-{i}.svg"), svg).unwrap();
}
```
*/

#![deny(missing_docs)]

mod defs;
mod renderer;
mod text;

use carta_interpret::carta_syntax::page::Page;
use carta_interpret::{
    interpret_page, CancelToken, Cancelled, FontResolverFn, InterpretError, InterpretSettings,
};
use renderer::SvgRenderer;
use thiserror::Error;

pub use carta_interpret::carta_syntax::{Document, LoadError, Metadata};
pub use carta_interpret::{default_font_resolver, FontQuery, SubstituteFont};

/// Re-export of the interpretation layer.
pub use carta_interpret;

/// Why a page failed to convert.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The cancellation signal was raised.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    /// The page needs a feature this converter excludes. Other pages of the
    /// same document may still convert.
    #[error("unsupported feature: {0}")]
    Unsupported(String),
    /// An option value was invalid. Reported before any work happens.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The output sink failed.
    #[error("failed to write SVG output")]
    Io(#[from] std::io::Error),
}

impl From<InterpretError> for ConvertError {
    fn from(e: InterpretError) -> Self {
        match e {
            InterpretError::Cancelled(c) => ConvertError::Cancelled(c),
            InterpretError::Unsupported(f) => ConvertError::Unsupported(f),
        }
    }
}

/// Options for a page conversion.
#[derive(Clone)]
pub struct SvgOptions {
    /// The smallest stroke width to emit, in user-space units. Hairlines
    /// that rasterizers would bump up can be kept visible this way.
    pub min_stroke_width: f32,
    /// Whether text with the invisible rendering mode is emitted. Such text
    /// usually exists for selection and search in scanned documents.
    pub include_hidden_text: bool,
    /// Substitute-font resolution, consulted for fonts that cannot ride
    /// along in the output.
    pub font_resolver: FontResolverFn,
    /// Cancellation signal, checked between operators.
    pub cancellation: CancelToken,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            min_stroke_width: 0.0,
            include_hidden_text: false,
            font_resolver: default_font_resolver(),
            cancellation: CancelToken::new(),
        }
    }
}

impl SvgOptions {
    fn validate(&self) -> Result<(), ConvertError> {
        if !self.min_stroke_width.is_finite() || self.min_stroke_width < 0.0 {
            return Err(ConvertError::InvalidArgument(format!(
                "min_stroke_width must be finite and non-negative, got {}",
                self.min_stroke_width
            )));
        }

        Ok(())
    }
}

/// Convert a page to an SVG fragment.
///
/// Conversion is deterministic: the same page with the same options yields
/// byte-identical output.
pub fn convert(page: &Page, options: &SvgOptions) -> Result<String, ConvertError> {
    options.validate()?;

    let settings = InterpretSettings {
        font_resolver: options.font_resolver.clone(),
        min_stroke_width: options.min_stroke_width,
        cancel: options.cancellation.clone(),
    };

    let mut renderer = SvgRenderer::new(page, options.include_hidden_text);

    // The device receives coordinates in PDF user space; the root group
    // carries the flip, crop translation and rotation.
    interpret_page(page, kurbo::Affine::IDENTITY, &settings, &mut renderer)?;

    Ok(renderer.finish())
}

/// Convert a page and write the fragment to `sink`.
pub fn convert_to_writer(
    page: &Page,
    sink: &mut dyn std::io::Write,
    options: &SvgOptions,
) -> Result<(), ConvertError> {
    let svg = convert(page, options)?;
    sink.write_all(svg.as_bytes())?;
    Ok(())
}
