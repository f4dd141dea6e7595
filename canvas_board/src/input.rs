//! Pointer input delivered to a [`DrawingSurface`](crate::DrawingSurface).
//!
//! Events also have a line-oriented text form used by scripted hosts:
//!
//! ```text
//! # a short diagonal stroke
//! down 10 10
//! move 50 50
//! up
//! ```

use std::str::FromStr;

use crate::error::{BoardError, Result};

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
}

impl FromStr for PointerEvent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let kind = parts.next().ok_or("empty event")?;

        let mut point = || -> std::result::Result<Point, String> {
            let mut coord = |axis: &str| -> std::result::Result<f32, String> {
                parts
                    .next()
                    .ok_or_else(|| format!("missing {axis} coordinate"))?
                    .parse::<f32>()
                    .map_err(|e| format!("bad {axis} coordinate: {e}"))
            };
            let x = coord("x")?;
            let y = coord("y")?;
            Ok(Point::new(x, y))
        };

        let event = match kind.to_ascii_lowercase().as_str() {
            "down" => PointerEvent::Down(point()?),
            "move" => PointerEvent::Move(point()?),
            "up" => PointerEvent::Up,
            other => return Err(format!("unknown event `{other}`")),
        };

        match parts.next() {
            Some(extra) => Err(format!("unexpected trailing `{extra}`")),
            None => Ok(event),
        }
    }
}

/// Parses one script line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<PointerEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    line.parse()
        .map(Some)
        .map_err(|reason| BoardError::ParseInput {
            line: line_no,
            reason,
        })
}

/// Parses a whole script, stopping at the first bad line.
pub fn parse_script(script: &str) -> Result<Vec<PointerEvent>> {
    let mut events = Vec::new();
    for (idx, line) in script.lines().enumerate() {
        if let Some(event) = parse_line(idx + 1, line)? {
            events.push(event);
        }
    }
    Ok(events)
}
