//! The drawing surface controller.
//!
//! Strokes are drawn locally as the pointer moves; the network only sees
//! whole-board snapshots, one per completed stroke. A snapshot received from
//! a peer replaces the local board outright, so the last snapshot applied
//! wins.

use tracing::debug;

use crate::config::BoardConfig;
use crate::error::{RelayError, Result};
use crate::image_data::ImageData;
use crate::input::{Point, PointerEvent};
use crate::protocol::BoardEvent;
use crate::surface::Canvas;

/// Outbound side of the relay connection.
///
/// `emit` hands the event off and returns immediately; delivery is not
/// acknowledged.
pub trait Relay {
    fn emit(&mut self, event: BoardEvent) -> std::result::Result<(), RelayError>;
}

impl<R: Relay + ?Sized> Relay for &mut R {
    fn emit(&mut self, event: BoardEvent) -> std::result::Result<(), RelayError> {
        (**self).emit(event)
    }
}

/// Collects events in order. Useful for offline boards.
impl Relay for Vec<BoardEvent> {
    fn emit(&mut self, event: BoardEvent) -> std::result::Result<(), RelayError> {
        self.push(event);
        Ok(())
    }
}

pub struct DrawingSurface<R> {
    canvas: Canvas,
    relay: R,
    painting: bool,
}

impl<R: Relay> DrawingSurface<R> {
    pub fn new(config: &BoardConfig, relay: R) -> Result<Self> {
        Ok(Self {
            canvas: Canvas::new(config)?,
            relay,
            painting: false,
        })
    }

    pub fn is_painting(&self) -> bool {
        self.painting
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn relay_mut(&mut self) -> &mut R {
        &mut self.relay
    }

    pub fn into_relay(self) -> R {
        self.relay
    }

    /// Starts a stroke and marks `position` right away, so a click without
    /// movement still leaves a dot.
    pub fn on_pointer_down(&mut self, position: Point) {
        self.painting = true;
        self.canvas.stroke_to(position);
    }

    pub fn on_pointer_move(&mut self, position: Point) {
        if !self.painting {
            return;
        }
        self.canvas.stroke_to(position);
    }

    /// Ends the stroke and sends the whole board to the relay.
    pub fn on_pointer_up(&mut self) -> Result<()> {
        self.painting = false;
        self.canvas.begin_path();

        let snapshot = self.canvas.snapshot();
        debug!(
            width = snapshot.width(),
            height = snapshot.height(),
            "stroke completed, sending board"
        );
        self.relay.emit(BoardEvent::SendStroke(snapshot))?;
        Ok(())
    }

    /// Replaces the local board with a peer's snapshot, even mid-stroke.
    pub fn on_remote_broadcast(&mut self, buffer: &ImageData) {
        if buffer.width() != self.canvas.width() || buffer.height() != self.canvas.height() {
            debug!(
                board_width = self.canvas.width(),
                board_height = self.canvas.height(),
                width = buffer.width(),
                height = buffer.height(),
                "received board of a different size, clipping"
            );
        }
        self.canvas.put_image_data(buffer);
    }

    pub fn handle(&mut self, event: PointerEvent) -> Result<()> {
        match event {
            PointerEvent::Down(position) => self.on_pointer_down(position),
            PointerEvent::Move(position) => self.on_pointer_move(position),
            PointerEvent::Up => self.on_pointer_up()?,
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ImageData {
        self.canvas.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoardError;

    fn board() -> DrawingSurface<Vec<BoardEvent>> {
        DrawingSurface::new(&BoardConfig::default(), Vec::new()).unwrap()
    }

    fn sent_boards(surface: &DrawingSurface<Vec<BoardEvent>>) -> Vec<&ImageData> {
        surface
            .relay()
            .iter()
            .map(|event| {
                assert_eq!(event.name(), crate::protocol::SEND_STROKE);
                event.image().unwrap()
            })
            .collect()
    }

    fn alpha(img: &ImageData, x: u32, y: u32) -> u8 {
        img.pixel(x, y).unwrap()[3]
    }

    #[test]
    fn one_message_per_stroke_regardless_of_moves() {
        for moves in [0usize, 1, 5, 200] {
            let mut surface = board();
            surface.on_pointer_down(Point::new(5.0, 5.0));
            for i in 0..moves {
                surface.on_pointer_move(Point::new(5.0 + i as f32, 5.0 + (i % 7) as f32));
            }
            surface.on_pointer_up().unwrap();
            assert_eq!(surface.relay().len(), 1, "{moves} moves");
        }
    }

    #[test]
    fn moves_while_idle_do_nothing() {
        let mut surface = board();
        surface.on_pointer_move(Point::new(100.0, 100.0));
        surface.on_pointer_move(Point::new(200.0, 200.0));

        assert!(!surface.is_painting());
        assert!(surface.relay().is_empty());
        assert_eq!(surface.canvas().inked_pixels(), 0);
    }

    #[test]
    fn export_then_apply_is_identity() {
        let mut surface = board();
        surface.on_pointer_down(Point::new(40.0, 60.0));
        surface.on_pointer_move(Point::new(300.0, 120.0));
        surface.on_pointer_up().unwrap();

        let exported = surface.snapshot();
        surface.on_remote_broadcast(&exported);
        assert_eq!(surface.snapshot(), exported);
    }

    #[test]
    fn clicks_without_movement_are_sent() {
        let mut surface = board();
        surface.on_pointer_down(Point::new(100.0, 100.0));
        surface.on_pointer_up().unwrap();
        surface.on_pointer_down(Point::new(300.0, 300.0));
        surface.on_pointer_up().unwrap();

        let boards = sent_boards(&surface);
        assert_eq!(boards.len(), 2);
        assert_eq!(alpha(boards[0], 100, 100), 255);
        assert_eq!(alpha(boards[0], 300, 300), 0);
        assert_eq!(alpha(boards[1], 300, 300), 255);
        // The two clicks are separate strokes.
        assert_eq!(alpha(boards[1], 200, 200), 0);
    }

    #[test]
    fn diagonal_stroke_is_sent_once() {
        let mut surface = board();
        surface.on_pointer_down(Point::new(10.0, 10.0));
        surface.on_pointer_move(Point::new(50.0, 50.0));
        surface.on_pointer_up().unwrap();

        let boards = sent_boards(&surface);
        assert_eq!(boards.len(), 1);
        let board = boards[0];
        assert_eq!((board.width(), board.height()), (500, 500));
        for i in (10..=49).step_by(3) {
            assert_eq!(board.pixel(i, i), Some([0, 0, 0, 255]), "({i}, {i})");
        }
        // Width 10: 3px below the line is inked, 10px below is clear.
        assert_eq!(alpha(board, 30, 33), 255);
        assert_eq!(alpha(board, 30, 40), 0);
        assert_eq!(alpha(board, 80, 80), 0);
    }

    #[test]
    fn broadcast_mid_stroke_overwrites_local_ink() {
        let mut surface = board();
        surface.on_pointer_down(Point::new(10.0, 10.0));
        surface.on_pointer_move(Point::new(100.0, 10.0));

        let mut remote = board();
        remote.on_pointer_down(Point::new(400.0, 400.0));
        remote.on_pointer_up().unwrap();
        let remote_board = remote.snapshot();

        surface.on_remote_broadcast(&remote_board);
        assert!(surface.is_painting());
        assert_eq!(surface.snapshot(), remote_board);
        assert_eq!(alpha(&surface.snapshot(), 50, 10), 0);

        // The stroke carries on from its last position onto the new board.
        surface.on_pointer_move(Point::new(150.0, 10.0));
        surface.on_pointer_up().unwrap();
        let sent = surface.relay()[0].image().unwrap();
        assert_eq!(alpha(sent, 50, 10), 0);
        assert_eq!(alpha(sent, 125, 10), 255);
        assert_eq!(alpha(sent, 400, 400), 255);
    }

    #[test]
    fn pointer_up_resets_the_path() {
        let mut surface = board();
        surface.on_pointer_down(Point::new(10.0, 250.0));
        surface.on_pointer_up().unwrap();
        assert_eq!(surface.canvas().current_point(), None);

        surface.on_pointer_down(Point::new(490.0, 250.0));
        surface.on_pointer_up().unwrap();
        assert_eq!(alpha(&surface.snapshot(), 250, 250), 0);
    }

    #[test]
    fn pointer_up_without_down_still_sends() {
        let mut surface = board();
        surface.on_pointer_up().unwrap();

        let boards = sent_boards(&surface);
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].inked_pixels(), 0);
        assert!(!surface.is_painting());
    }

    #[test]
    fn second_down_joins_from_last_position() {
        let mut surface = board();
        surface.on_pointer_down(Point::new(10.0, 250.0));
        surface.on_pointer_down(Point::new(200.0, 250.0));

        assert!(surface.is_painting());
        assert!(surface.relay().is_empty());
        let board = surface.snapshot();
        assert_eq!(alpha(&board, 100, 250), 255);
        assert_eq!(alpha(&board, 100, 270), 0);
    }

    #[test]
    fn handle_dispatches_events() {
        let mut surface = board();
        let script = "down 10 10\nmove 50 50\nmove 60 50\nup\nmove 200 200\n";
        for event in crate::input::parse_script(script).unwrap() {
            surface.handle(event).unwrap();
        }
        assert_eq!(surface.relay().len(), 1);
        assert_eq!(alpha(&surface.snapshot(), 200, 200), 0);
    }

    struct ClosedRelay;

    impl Relay for ClosedRelay {
        fn emit(&mut self, _event: BoardEvent) -> std::result::Result<(), RelayError> {
            Err(RelayError::Closed)
        }
    }

    #[test]
    fn closed_relay_surfaces_on_pointer_up() {
        let mut surface = DrawingSurface::new(&BoardConfig::default(), ClosedRelay).unwrap();
        surface.on_pointer_down(Point::new(1.0, 1.0));
        let err = surface.on_pointer_up().unwrap_err();
        assert!(matches!(err, BoardError::Relay(RelayError::Closed)));
        assert!(!surface.is_painting());
    }
}
