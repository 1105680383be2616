//! The interpreter context: the state stack and everything that lives
//! between operators.

use crate::cancel::CancelToken;
use crate::device::{ClipPath, Device, FillRule};
use crate::font::Font;
use crate::state::State;
use carta_syntax::{ObjRef, XRef};
use kurbo::{Affine, BezPath, Point};
use log::warn;
use rustc_hash::FxHashMap;

/// The mutable state of one page conversion.
pub struct Context {
    states: Vec<State>,
    /// The path under construction.
    path: BezPath,
    /// Where the current subpath started, for `h`.
    subpath_start: Point,
    /// The current point.
    last_point: Point,
    /// A pending clip rule from `W`/`W*`; applied after the next painting
    /// operator.
    pending_clip: Option<FillRule>,
    /// Fonts materialized so far, keyed by their dictionary's reference.
    pub(crate) font_cache: FxHashMap<ObjRef, Option<Font>>,
    pub(crate) xref: XRef,
    pub(crate) cancel: CancelToken,
    /// Depth of `BX`…`EX` compatibility sections; unknown operators inside
    /// are silently ignored.
    pub(crate) compat_depth: u32,
}

impl Context {
    /// A context whose initial transform maps user space to the output.
    pub fn new(initial_transform: Affine, xref: &XRef, cancel: CancelToken) -> Self {
        Self {
            states: vec![State::new(initial_transform)],
            path: BezPath::new(),
            subpath_start: Point::ZERO,
            last_point: Point::ZERO,
            pending_clip: None,
            font_cache: FxHashMap::default(),
            xref: xref.clone(),
            cancel,
            compat_depth: 0,
        }
    }

    /// The active state.
    pub fn state(&self) -> &State {
        // The stack is never empty; restore refuses to pop the last state.
        self.states.last().unwrap()
    }

    /// The active state, mutably.
    pub fn state_mut(&mut self) -> &mut State {
        self.states.last_mut().unwrap()
    }

    /// The depth of the state stack.
    pub fn depth(&self) -> usize {
        self.states.len()
    }

    /// `q`.
    pub fn save_state(&mut self) {
        let top = self.state().clone();
        self.states.push(top);
    }

    /// `Q`. Unwinds the clips the dropped state pushed. Underflow is
    /// reported and clamped.
    pub fn restore_state(&mut self, device: &mut dyn Device) {
        if self.states.len() <= 1 {
            warn!("graphics state restore without matching save");
            return;
        }

        let dropped = self.states.pop().unwrap();
        let target = self.state().n_clips;

        for _ in target..dropped.n_clips {
            device.pop_clip();
        }
    }

    /// Pop every state a nested stream left behind, reporting imbalance.
    pub fn unwind_to_depth(&mut self, depth: usize, device: &mut dyn Device) {
        if self.states.len() > depth {
            warn!(
                "content stream left {} unbalanced graphics state(s)",
                self.states.len() - depth
            );
        }

        while self.states.len() > depth {
            self.restore_state(device);
        }
    }

    /// The current path being built.
    pub fn path(&self) -> &BezPath {
        &self.path
    }

    /// The current path, mutably.
    pub fn path_mut(&mut self) -> &mut BezPath {
        &mut self.path
    }

    /// The current point.
    pub fn last_point(&self) -> Point {
        self.last_point
    }

    /// Update the current point.
    pub fn set_last_point(&mut self, p: Point) {
        self.last_point = p;
    }

    /// Remember the subpath start for `h`.
    pub fn set_subpath_start(&mut self, p: Point) {
        self.subpath_start = p;
    }

    /// The subpath start.
    pub fn subpath_start(&self) -> Point {
        self.subpath_start
    }

    /// Record a pending clip rule (`W` / `W*`).
    pub fn set_pending_clip(&mut self, rule: FillRule) {
        self.pending_clip = Some(rule);
    }

    /// Apply the pending clip (after a painting operator) and clear the
    /// path.
    pub fn finish_path(&mut self, device: &mut dyn Device) {
        if let Some(rule) = self.pending_clip.take() {
            if !self.path.elements().is_empty() {
                let clip = ClipPath {
                    path: self.state().ctm * self.path.clone(),
                    rule,
                };
                device.push_clip(&clip);
                self.state_mut().n_clips += 1;
            }
        }

        self.path = BezPath::new();
    }

    /// Concatenate onto the current transformation matrix.
    pub fn concat(&mut self, m: Affine) {
        let state = self.state_mut();
        state.ctm *= m;
    }
}

#[cfg(test)]
mod tests {
    use super::Context;
    use crate::cancel::CancelToken;
    use crate::device::tests_support::RecordingDevice;
    use crate::device::FillRule;
    use carta_syntax::XRef;
    use kurbo::{Affine, Shape};

    #[test]
    fn restore_underflow_is_clamped() {
        let mut ctx = Context::new(Affine::IDENTITY, &XRef::empty(), CancelToken::new());
        let mut device = RecordingDevice::default();

        ctx.restore_state(&mut device);
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn restore_unwinds_clips() {
        let mut ctx = Context::new(Affine::IDENTITY, &XRef::empty(), CancelToken::new());
        let mut device = RecordingDevice::default();

        ctx.save_state();
        ctx.path_mut()
            .extend(kurbo::Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1));
        ctx.set_pending_clip(FillRule::NonZero);
        ctx.finish_path(&mut device);
        assert_eq!(device.clip_depth, 1);

        ctx.restore_state(&mut device);
        assert_eq!(device.clip_depth, 0);
    }
}
