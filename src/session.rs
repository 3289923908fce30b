//! Edit session: view/edit mode, dirty tracking, save/cancel/reset and the
//! unsaved-changes navigation guard
//!
//! One `Session` is owned by whatever hosts the board. It holds the working
//! layout, the server's default layout, and the baseline snapshot that cancel
//! and discard return to. Pointer events are forwarded to the
//! [`Interaction`] controller it owns.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::catalog::FrameCatalog;
use crate::error::SessionError;
use crate::interaction::{CommitOutcome, IgnoreReason, Interaction, PressOutcome, PressTarget};
use crate::layout::Layout;
use crate::snapping::{Board, GeometryConfig};
use crate::store::{LayoutDocument, LayoutStore};
use crate::types::{FrameBox, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolbarAction {
    Edit,
    Save,
    Cancel,
    Config,
}

/// One frame as it should be drawn right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameView {
    pub id: String,
    pub title: String,
    pub frame_box: FrameBox,
    /// Drawn at a preview position by an active gesture
    pub dragging: bool,
}

/// Everything a host needs to draw the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub frames: Vec<FrameView>,
    pub height: i32,
    pub edit_mode: bool,
    pub dirty: bool,
    pub toolbar: Vec<ToolbarAction>,
}

/// Row of the frame configuration list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub id: String,
    pub title: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNavigation {
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationChoice {
    Save,
    Discard,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Safe to leave for the target
    Allowed(String),
    /// Unsaved changes: waiting on a choice for the target
    Blocked(String),
    /// The user chose to stay
    Stay,
}

pub struct Session {
    layout: Layout,
    default_layout: Layout,
    baseline: Layout,
    catalog: FrameCatalog,
    geometry: GeometryConfig,
    board_width: i32,
    edit_mode: bool,
    dirty: bool,
    interaction: Interaction,
    pending_navigation: Option<PendingNavigation>,
}

impl Session {
    pub fn new(document: LayoutDocument, board_width: i32, geometry: GeometryConfig) -> Self {
        let LayoutDocument {
            layout,
            default_layout,
            frames,
        } = document;
        Self {
            baseline: layout.clone(),
            layout,
            default_layout,
            catalog: FrameCatalog::new(frames),
            geometry,
            board_width,
            edit_mode: false,
            dirty: false,
            interaction: Interaction::new(),
            pending_navigation: None,
        }
    }

    /// Fetch the document from `store` and open a session in view mode
    pub async fn load<S: LayoutStore>(
        store: &S,
        board_width: i32,
        geometry: GeometryConfig,
    ) -> Result<Self, SessionError> {
        let document = store.load().await.map_err(|e| {
            error!(error = %e, "Failed to load dashboard layout");
            SessionError::LoadFailed(e)
        })?;
        info!(
            frames = document.frames.len(),
            visible = document.layout.visible_ids().count(),
            "Loaded dashboard layout"
        );
        Ok(Self::new(document, board_width, geometry))
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn baseline(&self) -> &Layout {
        &self.baseline
    }

    pub fn default_layout(&self) -> &Layout {
        &self.default_layout
    }

    pub fn catalog(&self) -> &FrameCatalog {
        &self.catalog
    }

    pub fn is_editing(&self) -> bool {
        self.edit_mode
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn dragging_id(&self) -> Option<&str> {
        self.interaction.dragging_id()
    }

    pub fn pending_navigation(&self) -> Option<&PendingNavigation> {
        self.pending_navigation.as_ref()
    }

    pub fn board_width(&self) -> i32 {
        self.board_width
    }

    /// Host container was resized
    pub fn set_board_width(&mut self, width: i32) {
        self.board_width = width.max(self.geometry.min_size);
    }

    fn board(&self) -> Board {
        Board::from_layout(&self.layout, self.board_width, self.geometry)
    }

    /// Place every visible frame. Frames without a stored box are
    /// auto-placed, and a stored box that overlaps a frame earlier in the
    /// order is pushed below it. New boxes are stored only while editing.
    pub fn arrange(&mut self) -> Vec<(String, FrameBox)> {
        let mut board = self.board();
        let mut settled = Board::new(self.board_width, self.geometry);
        let visible: Vec<String> = self.layout.visible_ids().map(str::to_string).collect();
        let sizes: Vec<_> = visible
            .iter()
            .map(|id| self.catalog.default_frame_size(id, self.geometry.default_frame_size))
            .collect();

        let mut placed = Vec::with_capacity(visible.len());
        for (index, id) in visible.into_iter().enumerate() {
            let stored = self.layout.get_box(&id);
            let frame_box = match stored {
                Some(b) if settled.overlaps_any(b, &id) => {
                    warn!(frame = %id, geometry = %b, "Stored box overlaps another frame");
                    board.resolve_collisions(b, &id)
                }
                _ => board.ensure_frame_box(&id, stored, index, &sizes),
            };
            if stored != Some(frame_box) {
                board.place(&id, frame_box);
                if self.edit_mode {
                    self.layout.set_box(&id, frame_box);
                }
            }
            settled.place(&id, frame_box);
            placed.push((id, frame_box));
        }
        placed
    }

    /// Render model: arranged frames with any gesture preview applied
    pub fn view(&mut self) -> BoardView {
        let placed = self.arrange();
        let preview = self
            .interaction
            .preview()
            .map(|(id, b)| (id.to_string(), b));

        let mut board = Board::new(self.board_width, self.geometry);
        let frames = placed
            .into_iter()
            .map(|(id, stored)| {
                let (frame_box, dragging) = match &preview {
                    Some((pid, b)) if *pid == id => (*b, true),
                    _ => (stored, false),
                };
                board.place(&id, frame_box);
                FrameView {
                    title: self.catalog.title(&id),
                    id,
                    frame_box,
                    dragging,
                }
            })
            .collect();

        BoardView {
            frames,
            height: board.board_height(),
            edit_mode: self.edit_mode,
            dirty: self.dirty,
            toolbar: self.toolbar(),
        }
    }

    pub fn toolbar(&self) -> Vec<ToolbarAction> {
        if self.edit_mode {
            vec![ToolbarAction::Save, ToolbarAction::Cancel, ToolbarAction::Config]
        } else {
            vec![ToolbarAction::Edit]
        }
    }

    /// Catalog frames (plus any unknown ids from the layout) with visibility
    pub fn config_entries(&self) -> Vec<ConfigEntry> {
        let mut entries: Vec<ConfigEntry> = self
            .catalog
            .frames()
            .iter()
            .map(|f| ConfigEntry {
                id: f.id.clone(),
                title: f.display_title().to_string(),
                visible: self.layout.is_visible(&f.id),
            })
            .collect();
        for id in &self.layout.order {
            if self.catalog.get(id).is_none() {
                entries.push(ConfigEntry {
                    id: id.clone(),
                    title: id.clone(),
                    visible: self.layout.is_visible(id),
                });
            }
        }
        entries
    }

    pub fn enter_edit(&mut self) {
        if self.edit_mode {
            return;
        }
        self.baseline = self.layout.clone();
        self.edit_mode = true;
        self.dirty = false;
        info!("Entered edit mode");
    }

    fn require_idle_edit(&self) -> Result<(), SessionError> {
        if !self.edit_mode {
            return Err(SessionError::NotEditing);
        }
        if let Some(id) = self.interaction.dragging_id() {
            return Err(SessionError::Busy(id.to_string()));
        }
        Ok(())
    }

    // === Pointer input ===

    pub fn pointer_down(&mut self, frame_id: &str, target: PressTarget, pointer: Point) -> PressOutcome {
        if !self.edit_mode {
            return PressOutcome::Ignored(IgnoreReason::NotEditing);
        }
        let current = if self.layout.is_visible(frame_id) {
            self.arrange()
                .into_iter()
                .find(|(id, _)| id == frame_id)
                .map(|(_, b)| b)
        } else {
            None
        };
        self.interaction.press(frame_id, target, pointer, self.edit_mode, current)
    }

    pub fn pointer_move(&mut self, pointer: Point) -> Option<FrameBox> {
        let board = self.board();
        self.interaction.motion(pointer, &board)
    }

    pub fn pointer_up(&mut self) -> CommitOutcome {
        let board = self.board();
        let outcome = self.interaction.release(&board, &mut self.layout);
        if let CommitOutcome::Committed { .. } = outcome {
            self.dirty = true;
        }
        outcome
    }

    /// Abort the active gesture (Escape)
    pub fn cancel_gesture(&mut self) -> Option<String> {
        self.interaction.cancel()
    }

    // === Toolbar and configuration actions ===

    /// Show or hide a frame. Returns the frame's new visibility.
    pub fn toggle_visibility(&mut self, frame_id: &str) -> Result<bool, SessionError> {
        self.require_idle_edit()?;
        let visible = if self.layout.is_visible(frame_id) {
            self.layout.set_hidden(frame_id, true);
            false
        } else {
            self.layout.insert_order(frame_id);
            self.layout.set_hidden(frame_id, false);
            self.settle_reshown_box(frame_id);
            true
        };
        self.dirty = true;
        info!(frame = %frame_id, visible, "Toggled frame visibility");
        Ok(visible)
    }

    /// A re-shown frame keeps its old box, which another frame may have
    /// taken since. Push it below whatever is there now.
    fn settle_reshown_box(&mut self, frame_id: &str) {
        let Some(stored) = self.layout.get_box(frame_id) else {
            return;
        };
        let board = self.board();
        if board.overlaps_any(stored, frame_id) {
            let moved = board.resolve_collisions(stored, frame_id);
            debug!(frame = %frame_id, from = %stored, to = %moved, "Re-shown frame moved clear");
            self.layout.set_box(frame_id, moved);
        }
    }

    pub fn reset_to_default(&mut self) -> Result<(), SessionError> {
        self.require_idle_edit()?;
        self.layout = self.default_layout.clone();
        self.dirty = true;
        info!("Reset layout to default");
        Ok(())
    }

    /// Leave edit mode, restoring the baseline. No network call.
    pub fn cancel(&mut self) {
        if !self.edit_mode {
            return;
        }
        self.interaction.cancel();
        self.layout = self.baseline.clone();
        self.dirty = false;
        self.edit_mode = false;
        self.pending_navigation = None;
        info!("Edit cancelled, layout restored");
    }

    /// Send the layout to `store`. On success the baseline moves to the saved
    /// layout and edit mode ends; on failure nothing changes.
    pub async fn save<S: LayoutStore>(&mut self, store: &S) -> Result<(), SessionError> {
        if !self.edit_mode {
            debug!("Save outside edit mode ignored");
            return Ok(());
        }
        if let Some(id) = self.interaction.dragging_id() {
            return Err(SessionError::Busy(id.to_string()));
        }

        if let Err(e) = store.save(&self.layout).await {
            error!(error = %e, "Failed to save dashboard layout");
            return Err(SessionError::SaveFailed(e));
        }

        self.baseline = self.layout.clone();
        self.dirty = false;
        self.edit_mode = false;
        self.pending_navigation = None;
        info!(frames = self.layout.settings.len(), "Saved dashboard layout");
        Ok(())
    }

    // === Navigation guard ===

    /// Whether the host's native unload prompt should fire
    pub fn should_block_unload(&self) -> bool {
        self.edit_mode && self.dirty
    }

    /// Ask whether the host may leave for `target`
    pub fn request_navigation(&mut self, target: &str) -> NavigationOutcome {
        if !self.should_block_unload() {
            return NavigationOutcome::Allowed(target.to_string());
        }
        if let Some(previous) = &self.pending_navigation {
            debug!(previous = %previous.target, target = %target, "Replacing pending navigation");
        }
        self.pending_navigation = Some(PendingNavigation {
            target: target.to_string(),
        });
        info!(target = %target, "Navigation blocked by unsaved changes");
        NavigationOutcome::Blocked(target.to_string())
    }

    /// Answer the pending navigation prompt. A failed save keeps the prompt
    /// pending and returns the error.
    pub async fn resolve_navigation<S: LayoutStore>(
        &mut self,
        choice: NavigationChoice,
        store: &S,
    ) -> Result<NavigationOutcome, SessionError> {
        let Some(pending) = self.pending_navigation.take() else {
            warn!(?choice, "No navigation pending");
            return Ok(NavigationOutcome::Stay);
        };

        match choice {
            NavigationChoice::Save => {
                if let Err(e) = self.save(store).await {
                    self.pending_navigation = Some(pending);
                    return Err(e);
                }
                Ok(NavigationOutcome::Allowed(pending.target))
            }
            NavigationChoice::Discard => {
                self.cancel();
                Ok(NavigationOutcome::Allowed(pending.target))
            }
            NavigationChoice::Cancel => {
                debug!(target = %pending.target, "Navigation cancelled");
                Ok(NavigationOutcome::Stay)
            }
        }
    }

    /// Plain allow/block confirmation for hosts without a three-way prompt.
    /// Allowing discards the unsaved changes.
    pub fn confirm_navigation(&mut self, allow: bool) -> NavigationOutcome {
        let Some(pending) = self.pending_navigation.take() else {
            return NavigationOutcome::Stay;
        };
        if allow {
            self.cancel();
            NavigationOutcome::Allowed(pending.target)
        } else {
            NavigationOutcome::Stay
        }
    }
}
