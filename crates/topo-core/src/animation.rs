//! Keyframe timelines.
//!
//! Pure sampling math: given a node's keyframes, the state it had when
//! the timeline started and the elapsed time, produce the state to show.
//! Scheduling (frame clock, cycles, chaining) lives in the editor.

use crate::geometry::Rect;
use crate::pen::{Pen, PenKind};
use serde::{Deserialize, Serialize};

/// The animatable subset of a pen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrameState {
    pub rect: Rect,
    pub rotate: f64,
    pub line_width: f64,
    pub global_alpha: f64,
    pub line_dash_offset: f64,
}

impl Default for FrameState {
    fn default() -> Self {
        Self {
            rect: Rect::default(),
            rotate: 0.0,
            line_width: 1.0,
            global_alpha: 1.0,
            line_dash_offset: 0.0,
        }
    }
}

impl FrameState {
    pub fn capture(pen: &Pen) -> Self {
        Self {
            rect: pen.rect(),
            rotate: pen.base.rotate,
            line_width: pen.base.style.line_width,
            global_alpha: pen.base.style.global_alpha,
            line_dash_offset: pen.base.style.line_dash_offset,
        }
    }

    /// Write the state back. Callers re-run `Pen::init` afterwards.
    pub fn apply(&self, pen: &mut Pen) {
        if let PenKind::Node(node) = &mut pen.kind {
            node.rect = self.rect;
        }
        pen.base.rotate = self.rotate;
        pen.base.style.line_width = self.line_width;
        pen.base.style.global_alpha = self.global_alpha;
        pen.base.style.line_dash_offset = self.line_dash_offset;
    }

    #[must_use]
    pub fn lerp(&self, target: &FrameState, t: f64) -> FrameState {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        FrameState {
            rect: Rect::new(
                mix(self.rect.x, target.rect.x),
                mix(self.rect.y, target.rect.y),
                mix(self.rect.width, target.rect.width),
                mix(self.rect.height, target.rect.height),
            ),
            rotate: mix(self.rotate, target.rotate),
            line_width: mix(self.line_width, target.line_width),
            global_alpha: mix(self.global_alpha, target.global_alpha),
            line_dash_offset: mix(self.line_dash_offset, target.line_dash_offset),
        }
    }
}

/// One step of a node timeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Keyframe {
    /// Milliseconds.
    pub duration: f64,
    /// Tween from the previous state; otherwise snap to `state`.
    pub linear: bool,
    pub state: FrameState,
}

/// Result of sampling a timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    pub state: FrameState,
    /// Index of the frame the position falls in, clamped to the list.
    pub frame: usize,
    /// Fully played cycles.
    pub cycles_done: u32,
    /// The last permitted cycle has completed.
    pub finished: bool,
}

pub fn cycle_duration(frames: &[Keyframe]) -> f64 {
    frames.iter().map(|f| f.duration.max(0.0)).sum()
}

/// Sample `frames` at `elapsed` ms after the timeline started from
/// `origin`. `cycles <= 0` plays forever.
pub fn sample(frames: &[Keyframe], origin: &FrameState, elapsed: f64, cycles: i32) -> FrameSample {
    let Some(last) = frames.last() else {
        return FrameSample {
            state: *origin,
            frame: 0,
            cycles_done: 0,
            finished: true,
        };
    };
    let total = cycle_duration(frames);
    if total <= 0.0 {
        return FrameSample {
            state: last.state,
            frame: frames.len() - 1,
            cycles_done: 1,
            finished: true,
        };
    }

    let elapsed = elapsed.max(0.0);
    let cycles_done = (elapsed / total).floor() as u32;
    if cycles > 0 && cycles_done >= cycles as u32 {
        return FrameSample {
            state: last.state,
            frame: frames.len() - 1,
            cycles_done,
            finished: true,
        };
    }

    let pos = elapsed - f64::from(cycles_done) * total;
    let mut start = 0.0;
    let mut index = frames.len() - 1;
    for (i, f) in frames.iter().enumerate() {
        let d = f.duration.max(0.0);
        if pos < start + d {
            index = i;
            break;
        }
        start += d;
    }
    // Clamped to the last frame when `pos` sits on the cycle boundary.
    if index == frames.len() - 1 {
        start = total - frames[index].duration.max(0.0);
    }

    let frame = &frames[index];
    let from = if index == 0 { *origin } else { frames[index - 1].state };
    let state = if frame.linear && frame.duration > 0.0 {
        let t = ((pos - start) / frame.duration).clamp(0.0, 1.0);
        from.lerp(&frame.state, t)
    } else {
        frame.state
    };
    FrameSample {
        state,
        frame: index,
        cycles_done,
        finished: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state(x: f64) -> FrameState {
        FrameState {
            rect: Rect::new(x, 0.0, 100.0, 100.0),
            ..FrameState::default()
        }
    }

    fn two_linear_frames() -> Vec<Keyframe> {
        vec![
            Keyframe {
                duration: 500.0,
                linear: true,
                state: state(200.0),
            },
            Keyframe {
                duration: 500.0,
                linear: true,
                state: state(200.0),
            },
        ]
    }

    #[test]
    fn linear_frame_is_halfway_at_midpoint() {
        let s = sample(&two_linear_frames(), &state(0.0), 250.0, 1);
        assert_eq!(s.state.rect, Rect::new(100.0, 0.0, 100.0, 100.0));
        assert_eq!(s.frame, 0);
        assert!(!s.finished);
    }

    #[test]
    fn final_cycle_settles_on_last_target() {
        let s = sample(&two_linear_frames(), &state(0.0), 1000.0, 1);
        assert!(s.finished);
        assert_eq!(s.state, state(200.0));
    }

    #[test]
    fn infinite_cycles_wrap() {
        let s = sample(&two_linear_frames(), &state(0.0), 1250.0, 0);
        assert!(!s.finished);
        assert_eq!(s.cycles_done, 1);
        assert_eq!(s.state.rect.x, 100.0);
    }

    #[test]
    fn snap_frames_jump_to_target() {
        let frames = vec![Keyframe {
            duration: 400.0,
            linear: false,
            state: state(50.0),
        }];
        let s = sample(&frames, &state(0.0), 10.0, 1);
        assert_eq!(s.state, state(50.0));
    }

    #[test]
    fn empty_and_zero_length_timelines_finish() {
        assert!(sample(&[], &state(0.0), 0.0, 1).finished);
        let zero = vec![Keyframe::default()];
        let s = sample(&zero, &state(0.0), 0.0, 0);
        assert!(s.finished);
        assert_eq!(s.frame, 0);
    }
}
