//! The graphics and text state.

use crate::color::ColorSpace;
use crate::device::{Paint, StrokeProps, TextRenderMode};
use crate::font::Font;
use kurbo::Affine;
use smallvec::{smallvec, SmallVec};

/// Color components in the current color space.
pub type Components = SmallVec<[f32; 4]>;

/// One color slot of the graphics state: a color space plus components.
#[derive(Debug, Clone)]
pub struct ColorValue {
    /// The color space.
    pub space: ColorSpace,
    /// The components, one per color-space channel.
    pub components: Components,
}

impl ColorValue {
    fn black() -> Self {
        Self {
            space: ColorSpace::DeviceGray,
            components: smallvec![0.0],
        }
    }

    /// Resolve to a paint with the given alpha.
    pub fn paint(&self, alpha: f32) -> Paint {
        Paint {
            rgb: self.space.to_rgb(&self.components),
            alpha,
        }
    }
}

/// The parameters the `q`/`Q` stack saves and restores.
#[derive(Debug, Clone)]
pub struct State {
    /// The current transformation matrix.
    pub ctm: Affine,
    /// Everything below the transform.
    pub graphics: GraphicsState,
    /// The text state.
    pub text: TextState,
    /// How many clips this state has pushed onto the device; used to unwind
    /// them on restore.
    pub n_clips: u32,
}

impl State {
    /// The initial state for a page with the given starting transform.
    pub fn new(initial_transform: Affine) -> Self {
        Self {
            ctm: initial_transform,
            graphics: GraphicsState::default(),
            text: TextState::default(),
            n_clips: 0,
        }
    }
}

/// The device-independent graphics parameters.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    /// Stroke geometry parameters.
    pub stroke_props: StrokeProps,
    /// The stroking color.
    pub stroke_color: ColorValue,
    /// The non-stroking color.
    pub fill_color: ColorValue,
    /// Constant alpha for stroking (`CA`).
    pub stroke_alpha: f32,
    /// Constant alpha for non-stroking (`ca`).
    pub fill_alpha: f32,
    /// The automatic stroke adjustment flag (`SA`); tracked, not rendered.
    pub stroke_adjustment: bool,
    /// The flatness tolerance (`i`); tracked, not rendered.
    pub flatness: f32,
    /// The rendering intent (`ri`); tracked, not rendered.
    pub rendering_intent: Option<carta_syntax::Name>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            stroke_props: StrokeProps::default(),
            stroke_color: ColorValue::black(),
            fill_color: ColorValue::black(),
            stroke_alpha: 1.0,
            fill_alpha: 1.0,
            stroke_adjustment: false,
            flatness: 1.0,
            rendering_intent: None,
        }
    }
}

impl GraphicsState {
    /// The paint used for stroking.
    pub fn stroke_paint(&self) -> Paint {
        self.stroke_color.paint(self.stroke_alpha)
    }

    /// The paint used for filling.
    pub fn fill_paint(&self) -> Paint {
        self.fill_color.paint(self.fill_alpha)
    }
}

/// The text-specific parameters.
#[derive(Debug, Clone)]
pub struct TextState {
    /// Character spacing (`Tc`), in unscaled text-space units.
    pub char_spacing: f32,
    /// Word spacing (`Tw`), applied to single-byte code 32.
    pub word_spacing: f32,
    /// Horizontal scaling (`Tz`), stored as a fraction (1.0 = 100%).
    pub horizontal_scale: f32,
    /// Leading (`TL`).
    pub leading: f32,
    /// The selected font, once `Tf` has run.
    pub font: Option<Font>,
    /// The font size from `Tf`.
    pub font_size: f32,
    /// Text rise (`Ts`).
    pub rise: f32,
    /// The rendering mode (`Tr`).
    pub render_mode: TextRenderMode,
    /// The text matrix.
    pub matrix: Affine,
    /// The text line matrix.
    pub line_matrix: Affine,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            font: None,
            // Defined so a damaged stream that shows text before Tf doesn't
            // need an option dance for the size.
            font_size: 1.0,
            rise: 0.0,
            render_mode: TextRenderMode::default(),
            matrix: Affine::IDENTITY,
            line_matrix: Affine::IDENTITY,
        }
    }
}

impl TextState {
    /// Move to the start of the next line, offset by `(tx, ty)` from the
    /// current line start.
    pub fn next_line(&mut self, tx: f64, ty: f64) {
        let m = self.line_matrix * Affine::translate((tx, ty));
        self.line_matrix = m;
        self.matrix = m;
    }

    /// The transform from the run's text space to user space: the text
    /// matrix with horizontal scaling and rise folded in. Font size is not
    /// included; runs carry it separately.
    pub fn run_transform(&self) -> Affine {
        self.matrix
            * Affine::new([
                self.horizontal_scale as f64,
                0.0,
                0.0,
                1.0,
                0.0,
                self.rise as f64,
            ])
    }

    /// Advance the text matrix after showing a glyph with the given width
    /// (in glyph-space units, 1000 per em).
    pub fn advance(&mut self, glyph_width: f32, is_single_byte_space: bool) {
        let word = if is_single_byte_space {
            self.word_spacing
        } else {
            0.0
        };

        let tx = (glyph_width / 1000.0 * self.font_size + self.char_spacing + word)
            * self.horizontal_scale;

        self.matrix *= Affine::translate((tx as f64, 0.0));
    }

    /// Apply a `TJ` adjustment, which is expressed in thousandths of text
    /// space.
    pub fn adjust(&mut self, amount: f32) {
        let tx = -amount / 1000.0 * self.font_size * self.horizontal_scale;
        self.matrix *= Affine::translate((tx as f64, 0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::TextState;
    use kurbo::{Affine, Point};

    #[test]
    fn advance_covers_spacing() {
        let mut ts = TextState {
            font_size: 10.0,
            char_spacing: 1.0,
            word_spacing: 2.0,
            ..TextState::default()
        };

        // 500/1000 em at size 10 plus char spacing.
        ts.advance(500.0, false);
        let p = ts.matrix * Point::ZERO;
        assert!((p.x - 6.0).abs() < 1e-6);

        // A single-byte space also gets word spacing.
        ts.advance(500.0, true);
        let p = ts.matrix * Point::ZERO;
        assert!((p.x - 14.0).abs() < 1e-6);
    }

    #[test]
    fn tj_adjustment_moves_backwards() {
        let mut ts = TextState {
            font_size: 12.0,
            ..TextState::default()
        };

        ts.adjust(-1000.0);
        let p = ts.matrix * Point::ZERO;
        assert!((p.x - 12.0).abs() < 1e-6);
    }

    #[test]
    fn next_line_tracks_line_matrix() {
        let mut ts = TextState::default();
        ts.matrix = Affine::translate((42.0, 0.0));

        ts.next_line(0.0, -14.0);
        let p = ts.matrix * Point::ZERO;
        assert_eq!((p.x, p.y), (0.0, -14.0));
    }
}
