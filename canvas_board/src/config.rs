use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH: u32 = 500;
pub const DEFAULT_HEIGHT: u32 = 500;
pub const DEFAULT_STROKE_WIDTH: f32 = 10.0;

/// Pen used for every local stroke. Caps are always round.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(default)]
pub struct StrokeStyle {
    pub width: f32,
    /// Straight RGBA ink color.
    pub color: [u8; 4],
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: DEFAULT_STROKE_WIDTH,
            color: [0, 0, 0, 255],
        }
    }
}

/// Board settings fixed for the lifetime of a session.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(default)]
pub struct BoardConfig {
    pub width: u32,
    pub height: u32,
    pub stroke: StrokeStyle,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            stroke: StrokeStyle::default(),
        }
    }
}
