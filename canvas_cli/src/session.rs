//! A board connected to the relay.
//!
//! Pointer input and relay frames are handled one at a time on the caller's
//! task; only the socket writes happen elsewhere, so emitting a stroke never
//! waits on the network.

use std::ops::ControlFlow;
use std::time::Duration;

use anyhow::{Context, bail};
use canvas_board::{
    BoardConfig, BoardEvent, DrawingSurface, ImageData, PointerEvent, Relay, RelayError,
    input::parse_line,
};
use futures_util::stream::{self, BoxStream, SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt, future};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outbound half of the connection. Events queue for the writer task.
pub struct ChannelRelay {
    tx: Option<mpsc::UnboundedSender<BoardEvent>>,
}

impl ChannelRelay {
    pub fn new(tx: mpsc::UnboundedSender<BoardEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Stops accepting events; the writer drains what is queued and closes.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

impl Relay for ChannelRelay {
    fn emit(&mut self, event: BoardEvent) -> Result<(), RelayError> {
        let tx = self.tx.as_ref().ok_or(RelayError::Closed)?;
        tx.send(event).map_err(|_| RelayError::Closed)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub strokes_sent: usize,
    pub boards_received: usize,
}

pub struct Session {
    surface: DrawingSurface<ChannelRelay>,
    incoming: SplitStream<WsStream>,
    writer: Option<JoinHandle<()>>,
    stats: SessionStats,
}

impl Session {
    pub async fn connect(url: &str, config: &BoardConfig) -> anyhow::Result<Self> {
        let (ws, _) = connect_async(url)
            .await
            .with_context(|| format!("could not connect to relay at {url}"))?;
        info!(url, "connected to relay");

        let (sink, incoming) = ws.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(sink, rx));

        Ok(Self {
            surface: DrawingSurface::new(config, ChannelRelay::new(tx))?,
            incoming,
            writer: Some(writer),
            stats: SessionStats::default(),
        })
    }

    pub fn surface(&self) -> &DrawingSurface<ChannelRelay> {
        &self.surface
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Drives the board until `input` ends, the relay hangs up, `on_board`
    /// breaks, or Ctrl-C. Fails if the relay rejects the room.
    ///
    /// `on_board` sees every board applied from a peer.
    pub async fn run<F>(
        &mut self,
        mut input: BoxStream<'_, anyhow::Result<PointerEvent>>,
        mut on_board: F,
    ) -> anyhow::Result<()>
    where
        F: FnMut(&ImageData, SessionStats) -> ControlFlow<()>,
    {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                event = input.next() => match event {
                    Some(event) => self.handle_pointer(event?),
                    None => {
                        debug!("input finished");
                        return Ok(());
                    }
                },
                frame = self.incoming.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(image) = self.handle_frame(text.as_str())? {
                            if on_board(&image, self.stats).is_break() {
                                return Ok(());
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("relay closed the connection");
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e).context("relay connection failed"),
                },
                _ = &mut ctrl_c => {
                    info!("interrupted");
                    return Ok(());
                }
            }
        }
    }

    fn handle_pointer(&mut self, event: PointerEvent) {
        let completes_stroke = matches!(event, PointerEvent::Up);
        match self.surface.handle(event) {
            Ok(()) if completes_stroke => self.stats.strokes_sent += 1,
            Ok(()) => {}
            Err(e) => error!(error = %e, "failed to send stroke"),
        }
    }

    fn handle_frame(&mut self, text: &str) -> anyhow::Result<Option<ImageData>> {
        match BoardEvent::from_json(text) {
            Ok(BoardEvent::BroadcastBoard(image)) => {
                self.surface.on_remote_broadcast(&image);
                self.stats.boards_received += 1;
                debug!(inked = image.inked_pixels(), "applied board from peer");
                Ok(Some(image))
            }
            Ok(BoardEvent::InvalidRoom(reason)) => bail!("relay rejected the room: {reason}"),
            Ok(other) => {
                warn!(event = other.name(), "ignoring unexpected event from relay");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed frame from relay");
                Ok(None)
            }
        }
    }

    /// Flushes queued strokes and closes the socket.
    pub async fn close(&mut self) {
        self.surface.relay_mut().close();
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                warn!(error = %e, "relay writer task failed");
            }
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut rx: mpsc::UnboundedReceiver<BoardEvent>,
) {
    while let Some(event) = rx.recv().await {
        let json = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to encode board");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(json.into())).await {
            warn!(error = %e, "failed to send board to relay");
            break;
        }
    }
    let _ = sink.close().await;
}

/// Pointer events read line by line from `reader`, optionally paced.
pub fn script_events<R>(
    reader: R,
    pace: Duration,
) -> BoxStream<'static, anyhow::Result<PointerEvent>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let events = stream::unfold((reader.lines(), 0usize), |(mut lines, line_no)| async move {
        let line_no = line_no + 1;
        let item = match lines.next_line().await {
            Ok(Some(line)) => parse_line(line_no, &line).map_err(anyhow::Error::from),
            Ok(None) => return None,
            Err(e) => Err(anyhow::Error::from(e).context("failed to read pointer script")),
        };
        Some((item, (lines, line_no)))
    })
    .filter_map(|item| future::ready(item.transpose()));

    if pace.is_zero() {
        events.boxed()
    } else {
        events
            .then(move |event| async move {
                tokio::time::sleep(pace).await;
                event
            })
            .boxed()
    }
}
