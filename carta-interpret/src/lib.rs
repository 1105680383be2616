/*!
Interpretation of PDF page content.

This crate executes a page's content operators against a graphics state
machine and turns them into structured draw calls on a [`Device`]: paths,
text runs, images and shadings, each with their resolved paint and transform.
It carries the font subsystem (encodings, CMaps, ToUnicode, the code→Unicode
character map) and the image decoder, but knows nothing about any particular
output format; the SVG backend lives in `carta-svg`.

Interpretation is cooperative: a caller-supplied [`CancelToken`] is checked
between operators, and a raised token aborts with [`Cancelled`].
*/

#![deny(missing_docs)]

mod interpret;
mod resources;
mod text;
mod xobject;

pub mod cancel;
pub mod color;
pub mod context;
pub mod device;
pub mod font;
pub mod function;
pub mod image;
pub mod shading;
pub mod state;

pub use cancel::{CancelToken, Cancelled};
pub use context::Context;
pub use device::{
    ClipPath, Device, FillRule, Glyph, ImageData, Paint, PathDrawMode, PixelFormat, StrokeProps,
    TextRenderMode, TextRun,
};
pub use font::{default_font_resolver, Font, FontQuery, FontResolverFn, SubstituteFont};
pub use interpret::{interpret_page, InterpretError, InterpretSettings};
pub use resources::Resources;

/// Re-export of the syntax layer this crate interprets.
pub use carta_syntax;
