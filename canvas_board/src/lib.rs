//! Shared canvas board.
//!
//! A [`DrawingSurface`] owns a fixed-size raster [`Canvas`], renders pointer
//! strokes onto it, and on every completed stroke emits a full snapshot of
//! the canvas through a [`Relay`]. Snapshots received from peers replace the
//! local canvas wholesale.

pub mod config;
pub mod controller;
pub mod error;
pub mod image_data;
pub mod input;
pub mod protocol;
pub mod surface;

pub use config::{BoardConfig, StrokeStyle};
pub use controller::{DrawingSurface, Relay};
pub use error::{BoardError, RelayError, Result};
pub use image_data::ImageData;
pub use input::{Point, PointerEvent};
pub use protocol::BoardEvent;
pub use surface::Canvas;
