//! Shared geometry value types

use serde::{Deserialize, Serialize};

/// Pointer position in board coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width/height pair, used for catalog size hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub w: i32,
    pub h: i32,
}

impl FrameSize {
    pub fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }
}

/// Pixel geometry of a frame, relative to the board's top-left corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl FrameBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.w, self.h)
    }

    pub fn with_position(self, x: i32, y: i32) -> Self {
        Self { x, y, ..self }
    }
}

impl std::fmt::Display for FrameBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        let b = FrameBox::new(10, 20, 300, 240);
        assert_eq!(b.left(), 10);
        assert_eq!(b.right(), 310);
        assert_eq!(b.top(), 20);
        assert_eq!(b.bottom(), 260);
    }

    #[test]
    fn test_display_geometry_string() {
        assert_eq!(FrameBox::new(0, 40, 360, 280).to_string(), "360x280+0+40");
    }
}
