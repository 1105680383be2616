//! The draw-call contract between the interpreter and a backend.
//!
//! The interpreter resolves resources, tracks the graphics state and hands a
//! [`Device`] fully resolved drawing primitives: paths with their paint,
//! positioned text runs, decoded images and shadings. Paths arrive in user
//! space together with the current transformation matrix; clip paths arrive
//! in device space, because a clip outlives later transform changes.

use crate::font::Font;
use crate::shading::Shading;
use kurbo::{Affine, BezPath};

/// The rule deciding which regions of a path are inside it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum FillRule {
    /// The nonzero winding rule.
    #[default]
    NonZero,
    /// The even-odd rule.
    EvenOdd,
}

/// Stroke parameters, in user-space units.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeProps {
    /// The line width.
    pub line_width: f32,
    /// The cap style: 0 butt, 1 round, 2 square.
    pub line_cap: u8,
    /// The join style: 0 miter, 1 round, 2 bevel.
    pub line_join: u8,
    /// The miter limit.
    pub miter_limit: f32,
    /// The dash lengths; empty means solid.
    pub dash_array: Vec<f32>,
    /// The dash phase.
    pub dash_offset: f32,
}

impl Default for StrokeProps {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            line_cap: 0,
            line_join: 0,
            miter_limit: 10.0,
            dash_array: vec![],
            dash_offset: 0.0,
        }
    }
}

/// A resolved paint: a device-RGB color with an alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    /// Red, green and blue in `0.0..=1.0`.
    pub rgb: [f32; 3],
    /// The constant alpha from the graphics state.
    pub alpha: f32,
}

impl Paint {
    /// Opaque black, the initial paint.
    pub fn black() -> Self {
        Self {
            rgb: [0.0, 0.0, 0.0],
            alpha: 1.0,
        }
    }
}

/// How a path is painted.
#[derive(Debug, Clone, PartialEq)]
pub enum PathDrawMode {
    /// Fill with the given rule.
    Fill(FillRule),
    /// Stroke with the given parameters.
    Stroke(StrokeProps),
}

/// A clip region, in device space.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPath {
    /// The clip outline.
    pub path: BezPath,
    /// The rule for the clip's interior.
    pub rule: FillRule,
}

/// The text rendering mode from `Tr`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TextRenderMode {
    /// Fill the glyphs.
    #[default]
    Fill,
    /// Stroke the glyphs.
    Stroke,
    /// Fill, then stroke.
    FillStroke,
    /// Show nothing.
    Invisible,
    /// Fill and add to the clip path.
    FillClip,
    /// Stroke and add to the clip path.
    StrokeClip,
    /// Fill, stroke and add to the clip path.
    FillStrokeClip,
    /// Only add to the clip path.
    Clip,
}

impl TextRenderMode {
    /// Whether glyphs are filled.
    pub fn fills(&self) -> bool {
        matches!(
            self,
            TextRenderMode::Fill | TextRenderMode::FillStroke | TextRenderMode::FillClip
                | TextRenderMode::FillStrokeClip
        )
    }

    /// Whether glyphs are stroked.
    pub fn strokes(&self) -> bool {
        matches!(
            self,
            TextRenderMode::Stroke | TextRenderMode::FillStroke | TextRenderMode::StrokeClip
                | TextRenderMode::FillStrokeClip
        )
    }
}

/// One positioned glyph of a text run.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// The x position of the glyph origin, in the run's text space.
    pub x: f32,
    /// The character code the glyph was selected by.
    pub code: u32,
    /// The glyph index in the embedded font, when one exists.
    pub glyph_id: u16,
    /// The Unicode text the glyph carries in the output.
    pub text: String,
}

/// A run of glyphs sharing one font, size and starting transform.
#[derive(Debug, Clone)]
pub struct TextRun {
    /// The font the run is shown in.
    pub font: Font,
    /// The font size, in text-space units.
    pub font_size: f32,
    /// Maps the run's text space (y up, glyph origins at `(x, 0)`) to user
    /// space. Horizontal scaling and rise are already folded in.
    pub transform: Affine,
    /// The glyphs, in show order.
    pub glyphs: Vec<Glyph>,
    /// The rendering mode in effect.
    pub mode: TextRenderMode,
    /// The fill paint.
    pub fill: Paint,
    /// The stroke paint.
    pub stroke: Paint,
    /// Stroke parameters for stroked modes.
    pub stroke_props: StrokeProps,
}

/// The pixel layout of decoded image data.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGB, row-major.
    Rgb8,
    /// 8-bit grayscale, row-major.
    Gray8,
}

/// A decoded image, plus an optional soft-mask alpha channel.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Layout of `data`.
    pub format: PixelFormat,
    /// The pixel bytes.
    pub data: Vec<u8>,
    /// An 8-bit alpha mask of the same dimensions, when the image carries an
    /// `/SMask`.
    pub alpha: Option<Vec<u8>>,
    /// The `/Interpolate` hint.
    pub interpolate: bool,
}

/// The receiver of resolved draw calls.
///
/// Within one page, calls arrive in the order the operators produced them,
/// and `push_*`/`pop_*` pairs nest strictly.
pub trait Device {
    /// Intersect the active clip with `clip`; balanced by
    /// [`Device::pop_clip`].
    fn push_clip(&mut self, clip: &ClipPath);

    /// Leave the most recent clip.
    fn pop_clip(&mut self);

    /// Open a group with the given constant opacity; balanced by
    /// [`Device::pop_group`].
    fn push_group(&mut self, opacity: f32);

    /// Close the most recent group.
    fn pop_group(&mut self);

    /// Draw a path. `path` is in user space; `transform` maps it to device
    /// space.
    fn draw_path(&mut self, path: &BezPath, transform: Affine, paint: &Paint, mode: &PathDrawMode);

    /// Draw a text run.
    fn draw_text(&mut self, run: &TextRun);

    /// Draw a decoded image. `transform` maps the unit square to the image's
    /// destination; the image's top row maps to the square's top edge.
    fn draw_image(&mut self, image: &ImageData, transform: Affine);

    /// Draw a 1-bit stencil mask with the given paint. `image` is an 8-bit
    /// mask where 255 means painted.
    fn draw_stencil(&mut self, image: &ImageData, transform: Affine, paint: &Paint);

    /// Paint a shading across the current clip region.
    fn draw_shading(&mut self, shading: &Shading, transform: Affine, alpha: f32);
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;

    /// A device that records what reached it, for interpreter tests.
    #[derive(Default, Debug)]
    pub(crate) struct RecordingDevice {
        pub(crate) clip_depth: i32,
        pub(crate) clips_pushed: usize,
        pub(crate) group_depth: i32,
        pub(crate) paths: Vec<(BezPath, Affine, Paint, PathDrawMode)>,
        pub(crate) runs: Vec<TextRun>,
        pub(crate) images: Vec<(ImageData, Affine)>,
        pub(crate) shadings: usize,
    }

    impl Device for RecordingDevice {
        fn push_clip(&mut self, _: &ClipPath) {
            self.clip_depth += 1;
            self.clips_pushed += 1;
        }

        fn pop_clip(&mut self) {
            self.clip_depth -= 1;
        }

        fn push_group(&mut self, _: f32) {
            self.group_depth += 1;
        }

        fn pop_group(&mut self) {
            self.group_depth -= 1;
        }

        fn draw_path(
            &mut self,
            path: &BezPath,
            transform: Affine,
            paint: &Paint,
            mode: &PathDrawMode,
        ) {
            self.paths
                .push((path.clone(), transform, *paint, mode.clone()));
        }

        fn draw_text(&mut self, run: &TextRun) {
            self.runs.push(run.clone());
        }

        fn draw_image(&mut self, image: &ImageData, transform: Affine) {
            self.images.push((image.clone(), transform));
        }

        fn draw_stencil(&mut self, image: &ImageData, transform: Affine, _: &Paint) {
            self.images.push((image.clone(), transform));
        }

        fn draw_shading(&mut self, _: &Shading, _: Affine, _: f32) {
            self.shadings += 1;
        }
    }
}
