use serde::{Deserialize, Serialize};

/// The bounded integer rectangle within which all service node positions
/// must lie. Immutable for the lifetime of a simulation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Region { x, y, width, height }
    }

    pub fn min_x(&self) -> i32 {
        self.x
    }

    pub fn min_y(&self) -> i32 {
        self.y
    }

    pub fn max_x(&self) -> i32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> i32 {
        self.y + self.height
    }

    /// Whether a node position lies within the region. Both edges are
    /// inclusive: positions are clamped into `[min_x, max_x]` after a step.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x() && x <= self.max_x() && y >= self.min_y() && y <= self.max_y()
    }
}
