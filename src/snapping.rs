//! Geometry engine: grid/edge snapping, clamping and collision handling
//!
//! Everything here is pure. A [`Board`] is a snapshot of the visible frames'
//! boxes plus the board width; each operation takes a candidate box and returns
//! a new one without touching the layout.

use tracing::{debug, warn};

use crate::constants::{board, geometry};
use crate::layout::Layout;
use crate::types::{FrameBox, FrameSize};

/// Tunables for snapping and placement. Defaults match the dashboard's
/// built-in grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryConfig {
    pub grid_size: i32,
    pub snap_distance: i32,
    pub gap: i32,
    pub min_size: i32,
    pub min_board_height: i32,
    pub max_collision_passes: u32,
    pub default_frame_size: FrameSize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            grid_size: geometry::GRID_SIZE,
            snap_distance: geometry::SNAP_DISTANCE,
            gap: geometry::GAP,
            min_size: geometry::MIN_SIZE,
            min_board_height: board::MIN_BOARD_HEIGHT,
            max_collision_passes: geometry::MAX_COLLISION_PASSES,
            default_frame_size: FrameSize::new(board::DEFAULT_FRAME_WIDTH, board::DEFAULT_FRAME_HEIGHT),
        }
    }
}

/// Whether a value being snapped is a coordinate or a dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapMode {
    /// x/y: floored at 0
    Position,
    /// w/h: floored at the minimum frame size
    Size,
}

impl GeometryConfig {
    /// Round `value` to the nearest grid line, then apply the floor for `mode`
    pub fn snap_to_grid(&self, value: i32, mode: SnapMode) -> i32 {
        let grid = self.grid_size.max(1);
        let snapped = (value + grid / 2).div_euclid(grid) * grid;
        match mode {
            SnapMode::Size => snapped.max(self.min_size),
            SnapMode::Position => snapped.max(0),
        }
    }

    fn grid_snap_box(&self, b: FrameBox) -> FrameBox {
        FrameBox {
            x: self.snap_to_grid(b.x, SnapMode::Position),
            y: self.snap_to_grid(b.y, SnapMode::Position),
            w: self.snap_to_grid(b.w, SnapMode::Size),
            h: self.snap_to_grid(b.h, SnapMode::Size),
        }
    }

    /// Align `frame_box` with `other`'s edges when within snap distance.
    ///
    /// Per axis the candidates are: same leading edge, just past the trailing
    /// edge plus a gap, and same trailing edge. Candidates are tried in that
    /// order and a later match overrides an earlier one.
    pub fn snap_to_neighbor(&self, frame_box: FrameBox, other: FrameBox) -> FrameBox {
        self.snap_toward(frame_box, frame_box, other)
    }

    /// Neighbor snap where distances are measured from `anchor` (the
    /// pointer-derived box) while the result starts from `current` (the
    /// grid-snapped box). Measuring from the anchor keeps a neighbor edge that
    /// the grid rounded just out of reach still snappable.
    fn snap_toward(&self, anchor: FrameBox, current: FrameBox, other: FrameBox) -> FrameBox {
        let mut next = current;
        let x_candidates = [
            other.left(),
            other.right() + self.gap,
            other.right() - current.w,
        ];
        for candidate in x_candidates {
            if (anchor.x - candidate).abs() <= self.snap_distance {
                next.x = candidate;
            }
        }
        let y_candidates = [
            other.top(),
            other.bottom() + self.gap,
            other.bottom() - current.h,
        ];
        for candidate in y_candidates {
            if (anchor.y - candidate).abs() <= self.snap_distance {
                next.y = candidate;
            }
        }
        next.x = next.x.max(0);
        next.y = next.y.max(0);
        next
    }
}

/// Axis-aligned intersection test. Touching edges do not overlap.
pub fn is_overlap(a: FrameBox, b: FrameBox) -> bool {
    a.x < b.x + b.w && a.x + a.w > b.x && a.y < b.y + b.h && a.y + a.h > b.y
}

/// Snapshot of the visible, placed frames on the board
#[derive(Debug, Clone)]
pub struct Board {
    pub width: i32,
    pub config: GeometryConfig,
    frames: Vec<(String, FrameBox)>,
}

impl Board {
    pub fn new(width: i32, config: GeometryConfig) -> Self {
        Self {
            width,
            config,
            frames: Vec::new(),
        }
    }

    /// Board made of every visible frame in `layout` that already has a box
    pub fn from_layout(layout: &Layout, width: i32, config: GeometryConfig) -> Self {
        let frames = layout
            .visible_ids()
            .filter_map(|id| layout.get_box(id).map(|b| (id.to_string(), b)))
            .collect();
        Self { width, config, frames }
    }

    /// Add or replace a frame's box
    pub fn place(&mut self, id: &str, frame_box: FrameBox) {
        match self.frames.iter_mut().find(|(fid, _)| fid == id) {
            Some((_, b)) => *b = frame_box,
            None => self.frames.push((id.to_string(), frame_box)),
        }
    }

    pub fn frames(&self) -> &[(String, FrameBox)] {
        &self.frames
    }

    pub fn get(&self, id: &str) -> Option<FrameBox> {
        self.frames.iter().find(|(fid, _)| fid == id).map(|(_, b)| *b)
    }

    fn others<'a>(&'a self, exclude_id: &str) -> impl Iterator<Item = (&'a str, FrameBox)> {
        self.frames
            .iter()
            .filter(move |(id, _)| id != exclude_id)
            .map(|(id, b)| (id.as_str(), *b))
    }

    /// Grid-snap all four fields, then fold neighbor snapping over every
    /// other frame in board order
    pub fn snap_frame(&self, candidate: FrameBox, exclude_id: &str) -> FrameBox {
        let gridded = self.config.grid_snap_box(candidate);
        self.others(exclude_id)
            .fold(gridded, |acc, (_, other)| self.config.snap_toward(candidate, acc, other))
    }

    /// Keep the box inside the board horizontally; vertically only floor at 0
    /// since the board grows to fit its content
    pub fn clamp_frame(&self, frame_box: FrameBox) -> FrameBox {
        FrameBox {
            x: frame_box.x.min(self.width - frame_box.w).max(0),
            y: frame_box.y.max(0),
            ..frame_box
        }
    }

    /// First other frame that `frame_box` overlaps, in board order
    pub fn first_overlap(&self, frame_box: FrameBox, exclude_id: &str) -> Option<(&str, FrameBox)> {
        self.others(exclude_id).find(|(_, other)| is_overlap(frame_box, *other))
    }

    pub fn overlaps_any(&self, frame_box: FrameBox, exclude_id: &str) -> bool {
        self.first_overlap(frame_box, exclude_id).is_some()
    }

    /// Push the box straight down below whatever it hits until it is clear.
    /// Resolution is always downward, never sideways.
    pub fn resolve_collisions(&self, frame_box: FrameBox, exclude_id: &str) -> FrameBox {
        let mut current = frame_box;
        for _ in 0..self.config.max_collision_passes {
            let Some((hit_id, hit)) = self.first_overlap(current, exclude_id) else {
                return current;
            };
            debug!(frame = %exclude_id, hit = %hit_id, "Pushing frame below collision");
            let pushed = current.with_position(current.x, current.y.max(hit.bottom() + self.config.gap));
            current = self.clamp_frame(self.snap_frame(pushed, exclude_id));
        }
        if self.overlaps_any(current, exclude_id) {
            warn!(frame = %exclude_id, passes = self.config.max_collision_passes, "Collision resolution gave up");
        }
        current
    }

    /// Box for a frame about to be shown.
    ///
    /// A stored box is returned as is. Otherwise the frame is auto-placed
    /// from `sizes`, the default sizes of every visible frame in order:
    /// one row across the board when all of them fit side by side without
    /// going below the minimum size, else rows of
    /// `floor((width + gap) / (size + gap))` frames at the default size.
    /// The result is pushed clear of anything already on the board.
    pub fn ensure_frame_box(
        &self,
        id: &str,
        stored: Option<FrameBox>,
        index: usize,
        sizes: &[FrameSize],
    ) -> FrameBox {
        if let Some(b) = stored {
            return b;
        }

        let gap = self.config.gap;
        let min = self.config.min_size;
        let fit = |s: FrameSize| FrameSize::new(s.w.max(min), s.h.max(min));
        let size = fit(sizes.get(index).copied().unwrap_or(self.config.default_frame_size));
        let count = sizes.len().max(1) as i32;

        let row_width = (self.width - gap * (count - 1)) / count;
        let row_width = row_width - row_width.rem_euclid(self.config.grid_size.max(1));

        let placed = if row_width >= min {
            // Columns are as wide as the frames before this one
            let x: i32 = sizes
                .iter()
                .take(index)
                .map(|s| fit(*s).w.min(row_width) + gap)
                .sum();
            FrameBox::new(x, 0, size.w.min(row_width), size.h)
        } else {
            let max_per_row = ((self.width + gap) / (size.w + gap).max(1)).max(1);
            let index = index as i32;
            let row = index / max_per_row;
            let col = index % max_per_row;
            FrameBox::new(col * (size.w + gap), row * (size.h + gap), size.w, size.h)
        };

        let placed = self.clamp_frame(placed);
        debug!(frame = %id, index, count, geometry = %placed, "Auto-placed frame");
        if self.overlaps_any(placed, id) {
            self.resolve_collisions(placed, id)
        } else {
            placed
        }
    }

    /// Minimum container height: lowest frame edge plus one gap, never below
    /// the configured floor
    pub fn board_height(&self) -> i32 {
        self.frames
            .iter()
            .map(|(_, b)| b.bottom() + self.config.gap)
            .max()
            .unwrap_or(0)
            .max(self.config.min_board_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(frames: &[(&str, FrameBox)]) -> Board {
        let mut board = Board::new(1280, GeometryConfig::default());
        for (id, b) in frames {
            board.place(id, *b);
        }
        board
    }

    #[test]
    fn test_snap_to_grid_rounds_to_nearest() {
        let cfg = GeometryConfig::default();
        assert_eq!(cfg.snap_to_grid(304, SnapMode::Position), 300);
        assert_eq!(cfg.snap_to_grid(310, SnapMode::Position), 320);
        assert_eq!(cfg.snap_to_grid(-30, SnapMode::Position), 0);
        assert_eq!(cfg.snap_to_grid(100, SnapMode::Size), 240);
        assert_eq!(cfg.snap_to_grid(371, SnapMode::Size), 380);
    }

    #[test]
    fn test_snap_to_grid_output_is_grid_multiple() {
        let cfg = GeometryConfig::default();
        for value in -100..2000 {
            let pos = cfg.snap_to_grid(value, SnapMode::Position);
            assert_eq!(pos % 20, 0, "position {value} -> {pos}");
            let size = cfg.snap_to_grid(value, SnapMode::Size);
            assert!(size % 20 == 0 || size == cfg.min_size, "size {value} -> {size}");
            assert!(size >= cfg.min_size);
        }
    }

    #[test]
    fn test_snap_to_neighbor_right_edge_plus_gap() {
        let cfg = GeometryConfig::default();
        let a = FrameBox::new(0, 0, 300, 300);
        let snapped = cfg.snap_to_neighbor(FrameBox::new(306, 5, 300, 300), a);
        assert_eq!(snapped, FrameBox::new(316, 0, 300, 300));
    }

    #[test]
    fn test_snap_to_neighbor_out_of_range_untouched() {
        let cfg = GeometryConfig::default();
        let a = FrameBox::new(0, 0, 300, 300);
        let b = FrameBox::new(600, 600, 300, 300);
        assert_eq!(cfg.snap_to_neighbor(b, a), b);
    }

    #[test]
    fn test_snap_to_neighbor_later_candidate_wins() {
        // Both the shared left edge (0) and the shared right edge (10) are
        // in range; the later candidate wins.
        let cfg = GeometryConfig::default();
        let other = FrameBox::new(0, 500, 250, 240);
        let b = FrameBox::new(5, 0, 240, 240);
        assert_eq!(cfg.snap_to_neighbor(b, other).x, 10);
    }

    #[test]
    fn test_snap_frame_snaps_to_neighbor_edge_after_grid() {
        let board = board_with(&[("a", FrameBox::new(0, 0, 300, 300))]);
        let snapped = board.snap_frame(FrameBox::new(304, 0, 300, 300), "b");
        assert_eq!(snapped.x, 316);
        assert_eq!(snapped.y, 0);
    }

    #[test]
    fn test_snap_frame_excludes_self() {
        let board = board_with(&[("a", FrameBox::new(0, 0, 300, 300))]);
        let snapped = board.snap_frame(FrameBox::new(304, 8, 300, 300), "a");
        assert_eq!(snapped, FrameBox::new(300, 0, 300, 300));
    }

    #[test]
    fn test_snap_frame_is_stable_on_its_output() {
        let board = board_with(&[
            ("a", FrameBox::new(0, 0, 300, 300)),
            ("b", FrameBox::new(316, 0, 300, 300)),
        ]);
        let once = board.snap_frame(FrameBox::new(627, 311, 290, 250), "c");
        assert_eq!(board.snap_frame(once, "c"), once);
    }

    #[test]
    fn test_is_overlap_touching_edges() {
        let a = FrameBox::new(0, 0, 300, 300);
        assert!(!is_overlap(a, FrameBox::new(300, 0, 300, 300)));
        assert!(!is_overlap(a, FrameBox::new(0, 300, 300, 300)));
        assert!(is_overlap(a, FrameBox::new(299, 299, 300, 300)));
        assert!(is_overlap(a, a));
    }

    #[test]
    fn test_clamp_frame_keeps_inside_width() {
        let board = Board::new(1000, GeometryConfig::default());
        assert_eq!(board.clamp_frame(FrameBox::new(900, -5, 300, 300)), FrameBox::new(700, 0, 300, 300));
        assert_eq!(board.clamp_frame(FrameBox::new(-50, 2000, 300, 300)), FrameBox::new(0, 2000, 300, 300));
        // Wider than the board: pinned to the left edge
        assert_eq!(board.clamp_frame(FrameBox::new(40, 0, 1200, 300)).x, 0);
    }

    #[test]
    fn test_resolve_collisions_pushes_down() {
        let board = board_with(&[("a", FrameBox::new(0, 0, 300, 300))]);
        let resolved = board.resolve_collisions(FrameBox::new(0, 100, 300, 300), "b");
        assert_eq!(resolved, FrameBox::new(0, 316, 300, 300));
        assert!(!board.overlaps_any(resolved, "b"));
    }

    #[test]
    fn test_resolve_collisions_stacks_below_multiple() {
        let board = board_with(&[
            ("a", FrameBox::new(0, 0, 300, 300)),
            ("b", FrameBox::new(0, 316, 300, 300)),
        ]);
        let resolved = board.resolve_collisions(FrameBox::new(0, 0, 300, 300), "c");
        assert!(!board.overlaps_any(resolved, "c"));
        assert_eq!(resolved.x, 0);
        assert!(resolved.y >= 632);
    }

    #[test]
    fn test_ensure_frame_box_keeps_stored() {
        let board = Board::new(1280, GeometryConfig::default());
        let stored = FrameBox::new(40, 40, 300, 300);
        let sizes = [FrameSize::new(360, 280); 5];
        assert_eq!(board.ensure_frame_box("a", Some(stored), 3, &sizes), stored);
    }

    #[test]
    fn test_ensure_frame_box_single_row() {
        let board = Board::new(1280, GeometryConfig::default());
        let sizes = [FrameSize::new(360, 280); 3];
        let first = board.ensure_frame_box("a", None, 0, &sizes);
        let third = board.ensure_frame_box("c", None, 2, &sizes);
        assert_eq!(first, FrameBox::new(0, 0, 360, 280));
        assert_eq!(third, FrameBox::new(752, 0, 360, 280));
    }

    #[test]
    fn test_ensure_frame_box_single_row_mixed_sizes() {
        let mut board = Board::new(1280, GeometryConfig::default());
        let sizes = [FrameSize::new(600, 300), FrameSize::new(240, 300)];

        let wide = board.ensure_frame_box("wide", None, 0, &sizes);
        board.place("wide", wide);
        let narrow = board.ensure_frame_box("narrow", None, 1, &sizes);

        assert_eq!(wide, FrameBox::new(0, 0, 600, 300));
        assert_eq!(narrow, FrameBox::new(616, 0, 240, 300));
        assert!(!is_overlap(wide, narrow));
    }

    #[test]
    fn test_ensure_frame_box_shrinks_to_fit_row() {
        let board = Board::new(1000, GeometryConfig::default());
        let b = board.ensure_frame_box("c", None, 2, &[FrameSize::new(360, 280); 3]);
        assert!(b.w >= 240 && b.w < 360);
        assert_eq!(b.y, 0);
        assert!(b.right() <= 1000);
    }

    #[test]
    fn test_ensure_frame_box_wraps_rows() {
        let board = Board::new(1000, GeometryConfig::default());
        let size = FrameSize::new(360, 280);
        // 6 frames cannot share one row; 2 per row at 360px
        let fourth = board.ensure_frame_box("d", None, 3, &[size; 6]);
        assert_eq!(fourth, FrameBox::new(376, 296, 360, 280));
    }

    #[test]
    fn test_ensure_frame_box_avoids_existing() {
        let board = board_with(&[("x", FrameBox::new(0, 0, 600, 300))]);
        let b = board.ensure_frame_box("a", None, 0, &[FrameSize::new(360, 280); 2]);
        assert!(!board.overlaps_any(b, "a"));
        assert!(b.y >= 316);
    }

    #[test]
    fn test_ensure_frame_box_zero_gap_and_size() {
        let config = GeometryConfig {
            min_size: 0,
            gap: 0,
            ..GeometryConfig::default()
        };
        let board = Board::new(-20, config);
        let b = board.ensure_frame_box("b", None, 1, &[FrameSize::new(0, 0); 2]);
        assert_eq!(b, FrameBox::new(0, 0, 0, 0));
    }

    #[test]
    fn test_board_height_floor_and_growth() {
        let empty = Board::new(1280, GeometryConfig::default());
        assert_eq!(empty.board_height(), 460);

        let tall = board_with(&[
            ("a", FrameBox::new(0, 0, 300, 300)),
            ("b", FrameBox::new(0, 316, 300, 400)),
        ]);
        assert_eq!(tall.board_height(), 732);
    }

    #[test]
    fn test_from_layout_ignores_hidden_and_unplaced() {
        let mut layout = Layout::with_order(["a", "b", "c"]);
        layout.set_box("a", FrameBox::new(0, 0, 300, 300));
        layout.set_box("b", FrameBox::new(316, 0, 300, 300));
        layout.set_hidden("b", true);

        let board = Board::from_layout(&layout, 1280, GeometryConfig::default());
        assert_eq!(board.frames().len(), 1);
        assert_eq!(board.get("a"), Some(FrameBox::new(0, 0, 300, 300)));
        assert_eq!(board.get("b"), None);
    }
}
