//! Console configuration
//!
//! TOML file under the XDG config dir, with environment overrides layered on
//! top and every value clamped into a safe range afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::constants::{board, geometry, paths};
use crate::snapping::GeometryConfig;
use crate::types::FrameSize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub board: BoardSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

/// Board geometry knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSettings {
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_grid_size")]
    pub grid_size: i32,
    /// Edge snapping distance in pixels (0 = disabled)
    #[serde(default = "default_snap_distance")]
    pub snap_distance: i32,
    #[serde(default = "default_gap")]
    pub gap: i32,
    #[serde(default = "default_min_size")]
    pub min_size: i32,
    #[serde(default = "default_min_board_height")]
    pub min_board_height: i32,
    #[serde(default = "default_max_collision_passes")]
    pub max_collision_passes: u32,
    #[serde(default = "default_frame_width")]
    pub default_frame_width: i32,
    #[serde(default = "default_frame_height")]
    pub default_frame_height: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    #[default]
    File,
    Ipc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackendKind,
    /// Layout document file (file backend, and the server side of ipc)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Store server socket (ipc backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_width() -> i32 {
    board::DEFAULT_WIDTH
}

fn default_grid_size() -> i32 {
    geometry::GRID_SIZE
}

fn default_snap_distance() -> i32 {
    geometry::SNAP_DISTANCE
}

fn default_gap() -> i32 {
    geometry::GAP
}

fn default_min_size() -> i32 {
    geometry::MIN_SIZE
}

fn default_min_board_height() -> i32 {
    board::MIN_BOARD_HEIGHT
}

fn default_max_collision_passes() -> u32 {
    geometry::MAX_COLLISION_PASSES
}

fn default_frame_width() -> i32 {
    board::DEFAULT_FRAME_WIDTH
}

fn default_frame_height() -> i32 {
    board::DEFAULT_FRAME_HEIGHT
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            grid_size: default_grid_size(),
            snap_distance: default_snap_distance(),
            gap: default_gap(),
            min_size: default_min_size(),
            min_board_height: default_min_board_height(),
            max_collision_passes: default_max_collision_passes(),
            default_frame_width: default_frame_width(),
            default_frame_height: default_frame_height(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            board: BoardSettings::default(),
            store: StoreSettings::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path.push(paths::CONFIG_FILENAME);
        path
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load `path`, falling back to defaults when it does not exist. A file
    /// that exists but does not parse is an error and is left untouched.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = match fs::read_to_string(path) {
            Ok(contents) => toml::from_str::<Self>(&contents).inspect_err(|e| {
                error!(path = %path.display(), error = %e, "Failed to parse config file");
            }).context(format!("Please fix the syntax errors in {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(e).context(format!("Failed to read config file {}", path.display()));
            }
        };
        config.apply_env_overrides();
        config.validate_and_clamp();
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config to TOML")?;
        fs::write(path, contents)
            .context(format!("Failed to write config file to {}", path.display()))?;
        Ok(())
    }

    fn parse_num<T: std::str::FromStr>(var: &str) -> Option<T>
    where
        <T as std::str::FromStr>::Err: std::fmt::Debug,
    {
        let s = env::var(var).ok()?;
        s.trim()
            .parse::<T>()
            .inspect_err(|e| error!(var = %var, error = ?e, "failed to parse env var"))
            .ok()
    }

    fn apply_env_overrides(&mut self) {
        if let Some(width) = Self::parse_num("BOARD_WIDTH") {
            self.board.width = width;
        }
        if let Some(snap) = Self::parse_num("SNAP_DISTANCE") {
            self.board.snap_distance = snap;
        }
        if let Some(grid) = Self::parse_num("GRID_SIZE") {
            self.board.grid_size = grid;
        }
        if let Ok(socket) = env::var("STORE_SOCKET") {
            self.store.socket = Some(PathBuf::from(socket));
        }
        if let Ok(path) = env::var("STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }
    }

    /// Clamp config values to safe ranges
    fn validate_and_clamp(&mut self) {
        use crate::constants::validation::*;

        let b = &mut self.board;

        if b.grid_size < 1 || b.grid_size > MAX_GRID_SIZE {
            warn!(grid_size = b.grid_size, using = default_grid_size(), "grid_size out of range, using default");
            b.grid_size = default_grid_size();
        }

        if b.snap_distance < 0 {
            warn!(snap_distance = b.snap_distance, "snap_distance negative, disabling snapping");
            b.snap_distance = 0;
        } else if b.snap_distance > MAX_SNAP_DISTANCE {
            warn!(snap_distance = b.snap_distance, max = MAX_SNAP_DISTANCE, "snap_distance exceeds maximum, clamping");
            b.snap_distance = MAX_SNAP_DISTANCE;
        }

        if !(0..=MAX_GAP).contains(&b.gap) {
            warn!(gap = b.gap, max = MAX_GAP, "gap out of range, clamping");
            b.gap = b.gap.clamp(0, MAX_GAP);
        }

        if !(MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&b.min_size) {
            warn!(min_size = b.min_size, "min_size out of range, clamping");
            b.min_size = b.min_size.clamp(MIN_FRAME_SIZE, MAX_FRAME_SIZE);
        }

        if b.width < b.min_size {
            warn!(width = b.width, min = b.min_size, "board width below min_size, clamping");
            b.width = b.min_size;
        } else if b.width > MAX_BOARD_WIDTH {
            warn!(width = b.width, max = MAX_BOARD_WIDTH, "board width exceeds maximum, clamping");
            b.width = MAX_BOARD_WIDTH;
        }

        if b.min_board_height < 0 {
            warn!(min_board_height = b.min_board_height, "min_board_height negative, using 0");
            b.min_board_height = 0;
        }

        if b.max_collision_passes == 0 || b.max_collision_passes > MAX_COLLISION_PASSES {
            warn!(max_collision_passes = b.max_collision_passes, using = default_max_collision_passes(), "max_collision_passes out of range, using default");
            b.max_collision_passes = default_max_collision_passes();
        }

        if b.default_frame_width < b.min_size {
            warn!(default_frame_width = b.default_frame_width, min = b.min_size, "default_frame_width below min_size, clamping");
            b.default_frame_width = b.min_size;
        }
        if b.default_frame_height < b.min_size {
            warn!(default_frame_height = b.default_frame_height, min = b.min_size, "default_frame_height below min_size, clamping");
            b.default_frame_height = b.min_size;
        }
    }

    pub fn geometry(&self) -> GeometryConfig {
        let b = &self.board;
        GeometryConfig {
            grid_size: b.grid_size,
            snap_distance: b.snap_distance,
            gap: b.gap,
            min_size: b.min_size,
            min_board_height: b.min_board_height,
            max_collision_passes: b.max_collision_passes,
            default_frame_size: FrameSize::new(b.default_frame_width, b.default_frame_height),
        }
    }

    /// Layout document location for the file backend
    pub fn document_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(paths::APP_DIR);
            path.push(paths::DOCUMENT_FILENAME);
            path
        })
    }

    pub fn socket_path(&self) -> Result<PathBuf> {
        match &self.store.socket {
            Some(socket) => Ok(socket.clone()),
            None => crate::ipc::default_socket_path(),
        }
    }
}
