//! Pointer gesture state machine for moving and resizing frames
//!
//! ```text
//! Idle -> Dragging -> (Committing) -> Idle
//! Idle -> Resizing -> (Committing) -> Idle
//! Dragging/Resizing -> Idle            (cancel, nothing written)
//! ```
//!
//! While a gesture is active only the preview box changes. The layout is
//! written once, on release, and only if the final box overlaps nothing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::layout::Layout;
use crate::snapping::Board;
use crate::types::{FrameBox, Point};

/// Interactive child elements of a frame that must never start a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Button,
    Input,
    Link,
    Actions,
}

/// What part of a frame the pointer went down on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressTarget {
    #[default]
    Body,
    ResizeHandle,
    Control(ControlKind),
}

/// Pointer-down bookkeeping for one active gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureTrack {
    pub frame_id: String,
    pub pointer_start: Point,
    /// Box at the moment the gesture began
    pub origin: FrameBox,
    /// Box currently shown on screen
    pub preview: FrameBox,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging(GestureTrack),
    Resizing(GestureTrack),
}

impl GestureState {
    fn track(&self) -> Option<&GestureTrack> {
        match self {
            GestureState::Idle => None,
            GestureState::Dragging(t) | GestureState::Resizing(t) => Some(t),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            GestureState::Idle => "idle",
            GestureState::Dragging(_) => "dragging",
            GestureState::Resizing(_) => "resizing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    NotEditing,
    /// Another frame already holds the pointer
    Busy(String),
    Control(ControlKind),
    UnknownFrame,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PressOutcome {
    DragStarted,
    ResizeStarted,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// No gesture was active
    NoGesture,
    /// Final box equals the stored one; nothing written
    Unchanged { frame_id: String },
    Committed {
        frame_id: String,
        previous: Option<FrameBox>,
        frame_box: FrameBox,
    },
    /// Final box overlapped `blocked_by`; the layout keeps `restored`
    Rejected {
        frame_id: String,
        candidate: FrameBox,
        restored: Option<FrameBox>,
        blocked_by: String,
    },
}

/// Single-pointer gesture controller. At most one frame is manipulated at a
/// time; the active frame id is the dashboard's `dragging_id`.
#[derive(Debug, Default)]
pub struct Interaction {
    state: GestureState,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, GestureState::Idle)
    }

    pub fn dragging_id(&self) -> Option<&str> {
        self.state.track().map(|t| t.frame_id.as_str())
    }

    /// Frame id and box to draw in place of the stored box
    pub fn preview(&self) -> Option<(&str, FrameBox)> {
        self.state.track().map(|t| (t.frame_id.as_str(), t.preview))
    }

    /// Pointer down on `frame_id`. `current` is the box the frame is drawn
    /// at right now.
    pub fn press(
        &mut self,
        frame_id: &str,
        target: PressTarget,
        pointer: Point,
        edit_mode: bool,
        current: Option<FrameBox>,
    ) -> PressOutcome {
        if !edit_mode {
            return PressOutcome::Ignored(IgnoreReason::NotEditing);
        }
        if let Some(active) = self.dragging_id() {
            return PressOutcome::Ignored(IgnoreReason::Busy(active.to_string()));
        }
        let Some(origin) = current else {
            return PressOutcome::Ignored(IgnoreReason::UnknownFrame);
        };

        let track = GestureTrack {
            frame_id: frame_id.to_string(),
            pointer_start: pointer,
            origin,
            preview: origin,
        };
        let (next, outcome) = match target {
            PressTarget::Body => (GestureState::Dragging(track), PressOutcome::DragStarted),
            PressTarget::ResizeHandle => (GestureState::Resizing(track), PressOutcome::ResizeStarted),
            PressTarget::Control(kind) => {
                return PressOutcome::Ignored(IgnoreReason::Control(kind));
            }
        };
        self.transition(next);
        outcome
    }

    /// Pointer moved. Returns the new preview box, or `None` when idle.
    pub fn motion(&mut self, pointer: Point, board: &Board) -> Option<FrameBox> {
        let next = match &self.state {
            GestureState::Idle => return None,
            GestureState::Dragging(t) => drag_candidate(t, pointer, board),
            GestureState::Resizing(t) => resize_candidate(t, pointer, board),
        };
        match &mut self.state {
            GestureState::Dragging(t) | GestureState::Resizing(t) => t.preview = next,
            GestureState::Idle => {}
        }
        Some(next)
    }

    /// Pointer released: validate the final box and write it into `layout`,
    /// or roll back when it would overlap another frame. Always ends Idle.
    pub fn release(&mut self, board: &Board, layout: &mut Layout) -> CommitOutcome {
        let finished = std::mem::take(&mut self.state);
        debug!(from = finished.name(), to = "idle", "Gesture committing");

        let (track, final_box) = match finished {
            GestureState::Idle => return CommitOutcome::NoGesture,
            GestureState::Dragging(t) => {
                let b = board.clamp_frame(board.snap_frame(t.preview, &t.frame_id));
                (t, b)
            }
            GestureState::Resizing(t) => {
                let b = fit_resize(&t, board.snap_frame(t.preview, &t.frame_id), board);
                (t, b)
            }
        };

        let previous = layout.get_box(&track.frame_id);
        if let Some((hit, _)) = board.first_overlap(final_box, &track.frame_id) {
            debug!(frame = %track.frame_id, blocked_by = %hit, candidate = %final_box, "Commit rejected, rolling back");
            return CommitOutcome::Rejected {
                frame_id: track.frame_id,
                candidate: final_box,
                restored: previous,
                blocked_by: hit.to_string(),
            };
        }

        if previous == Some(final_box) {
            return CommitOutcome::Unchanged { frame_id: track.frame_id };
        }

        layout.set_box(&track.frame_id, final_box);
        info!(frame = %track.frame_id, x = final_box.x, y = final_box.y, w = final_box.w, h = final_box.h, "Committed frame geometry");
        CommitOutcome::Committed {
            frame_id: track.frame_id,
            previous,
            frame_box: final_box,
        }
    }

    /// Abort the active gesture without touching the layout. Returns the
    /// frame that was being manipulated.
    pub fn cancel(&mut self) -> Option<String> {
        let finished = std::mem::take(&mut self.state);
        let id = finished.track().map(|t| t.frame_id.clone());
        if let Some(id) = &id {
            debug!(frame = %id, from = finished.name(), "Gesture cancelled");
        }
        id
    }

    fn transition(&mut self, next: GestureState) {
        debug!(
            from = self.state.name(),
            to = next.name(),
            frame = next.track().map(|t| t.frame_id.as_str()).unwrap_or(""),
            "Gesture transition"
        );
        self.state = next;
    }
}

fn drag_candidate(t: &GestureTrack, pointer: Point, board: &Board) -> FrameBox {
    let dx = pointer.x - t.pointer_start.x;
    let dy = pointer.y - t.pointer_start.y;
    let moved = t.origin.with_position(t.origin.x + dx, t.origin.y + dy);
    board.clamp_frame(board.snap_frame(moved, &t.frame_id))
}

fn resize_candidate(t: &GestureTrack, pointer: Point, board: &Board) -> FrameBox {
    let min = board.config.min_size;
    let dx = pointer.x - t.pointer_start.x;
    let dy = pointer.y - t.pointer_start.y;
    let grown = FrameBox {
        w: (t.origin.w + dx).max(min),
        h: (t.origin.h + dy).max(min),
        ..t.origin
    };
    fit_resize(t, board.snap_frame(grown, &t.frame_id), board)
}

/// Resizing pins the top-left corner; only the size may change, and the
/// right edge stays on the board
fn fit_resize(t: &GestureTrack, snapped: FrameBox, board: &Board) -> FrameBox {
    let min = board.config.min_size;
    FrameBox {
        x: t.origin.x,
        y: t.origin.y,
        w: snapped.w.min(board.width - t.origin.x).max(min),
        h: snapped.h.max(min),
    }
}
