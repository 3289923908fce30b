//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the dashboard engine, providing a single source of truth for constant values.

/// Geometry engine defaults (pixels)
pub mod geometry {
    /// Grid pitch every coordinate and dimension snaps to
    pub const GRID_SIZE: i32 = 20;

    /// Maximum distance at which an edge snaps to a neighbor's edge
    pub const SNAP_DISTANCE: i32 = 14;

    /// Gutter offered by neighbor snap targets and collision push-down
    pub const GAP: i32 = 16;

    /// Smallest allowed frame width or height
    pub const MIN_SIZE: i32 = 240;

    /// Iteration cap for collision resolution on degenerate boards
    pub const MAX_COLLISION_PASSES: u32 = 40;
}

/// Board (container) defaults
pub mod board {
    /// Board height never shrinks below this
    pub const MIN_BOARD_HEIGHT: i32 = 460;

    /// Board width used when the host has not reported one
    pub const DEFAULT_WIDTH: i32 = 1280;

    /// Size used for frames whose catalog entry carries no hint
    pub const DEFAULT_FRAME_WIDTH: i32 = 360;
    pub const DEFAULT_FRAME_HEIGHT: i32 = 280;
}

/// Validation ranges applied to the console config
pub mod validation {
    pub const MAX_GRID_SIZE: i32 = 200;
    pub const MAX_SNAP_DISTANCE: i32 = 200;
    pub const MAX_GAP: i32 = 200;
    pub const MIN_FRAME_SIZE: i32 = 40;
    pub const MAX_FRAME_SIZE: i32 = 2000;
    pub const MAX_BOARD_WIDTH: i32 = 16384;
    pub const MAX_COLLISION_PASSES: u32 = 1000;
}

/// Config and data file locations
pub mod paths {
    /// Directory name under the XDG config/data/runtime dirs
    pub const APP_DIR: &str = "frameboard";

    /// Console config file name
    pub const CONFIG_FILENAME: &str = "config.toml";

    /// Layout document file name
    pub const DOCUMENT_FILENAME: &str = "dashboard.json";

    /// Store socket file name
    pub const SOCKET_FILENAME: &str = "store.sock";
}

/// Remote store transport limits
pub mod ipc {
    /// Maximum message size (10 MB) to prevent DoS via memory exhaustion
    pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;
}
