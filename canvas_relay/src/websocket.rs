use axum::{
    extract::{
        Path, State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use canvas_board::BoardEvent;
use futures_util::{Sink, sink::SinkExt, stream::StreamExt};
use nanoid::nanoid;
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};
use tokio::sync::{Mutex, broadcast, broadcast::error::RecvError};
use tracing::{debug, info, warn};

/// Room used by clients connecting to the bare `/canvas` namespace.
/// It always exists.
pub const DEFAULT_ROOM: &str = "default";

/// Reason sent with `invalid-room`.
pub const ROOM_NOT_FOUND: &str = "Room with given ID not found";

/// A frame on its way to every connection in a room except the one it came from.
#[derive(Clone, Debug)]
struct Envelope {
    from: Arc<str>,
    frame: Utf8Bytes,
}

/// The shared state for our WebSocket rooms.
/// Each room has a broadcast channel carrying frames to all of its connections.
/// Rooms are created explicitly and removed when their last connection leaves.
#[derive(Debug)]
pub struct AppWsState {
    rooms: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
    capacity: usize,
}

impl AppWsState {
    /// `capacity` is the number of boards a slow connection may fall behind
    /// before it starts skipping them.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut rooms = HashMap::new();
        rooms.insert(DEFAULT_ROOM.to_string(), broadcast::channel(capacity).0);
        Self {
            rooms: Mutex::new(rooms),
            capacity,
        }
    }

    /// Registers an empty room. Returns `false` if it already exists.
    pub async fn create_room(&self, room: &str) -> bool {
        match self.rooms.lock().await.entry(room.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(broadcast::channel(self.capacity).0);
                info!(room, "room created");
                true
            }
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Connections currently subscribed to `room`.
    pub async fn clients_in(&self, room: &str) -> usize {
        self.rooms
            .lock()
            .await
            .get(room)
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Subscribes to an existing room; `None` if there is no such room.
    async fn join(
        &self,
        room: &str,
    ) -> Option<(broadcast::Sender<Envelope>, broadcast::Receiver<Envelope>)> {
        let rooms = self.rooms.lock().await;
        let tx = rooms.get(room)?.clone();
        let rx = tx.subscribe();
        Some((tx, rx))
    }

    async fn leave(&self, room: &str) {
        if room == DEFAULT_ROOM {
            return;
        }
        let mut rooms = self.rooms.lock().await;
        if rooms.get(room).is_some_and(|tx| tx.receiver_count() == 0) {
            rooms.remove(room);
            info!(room, "last client left, room removed");
        }
    }
}

/// Upgrade for the bare `/canvas` namespace.
pub async fn default_room_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppWsState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, DEFAULT_ROOM.to_string()))
}

/// Upgrade for `/canvas/{room}`.
pub async fn room_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppWsState>>,
    Path(room): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, room))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppWsState>, room: String) {
    let conn_id: Arc<str> = nanoid!(10).into();
    info!(room = %room, conn = %conn_id, "client connected");

    let Some((tx, rx)) = state.join(&room).await else {
        warn!(room = %room, conn = %conn_id, "unknown room");
        reject_unknown_room(socket).await;
        return;
    };
    let (sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(forward_to_client(rx, conn_id.clone(), sender));

    // Turn this client's strokes into broadcasts for the room.
    let from = conn_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    if let Some(frame) = relay_frame(text.as_str()) {
                        // No other subscribers is fine.
                        let _ = tx.send(Envelope {
                            from: from.clone(),
                            frame,
                        });
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish, then tear down the other so the room
    // subscription is released before we check whether the room is empty.
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            send_task.abort();
            let _ = send_task.await;
        }
    };

    state.leave(&room).await;
    info!(room = %room, conn = %conn_id, "client disconnected");
}

async fn reject_unknown_room(mut socket: WebSocket) {
    match BoardEvent::InvalidRoom(ROOM_NOT_FOUND.to_string()).to_json() {
        Ok(json) => {
            let _ = socket.send(Message::Text(json.into())).await;
        }
        Err(e) => warn!(error = %e, "failed to encode invalid-room"),
    }
    let _ = socket.send(Message::Close(None)).await;
}

/// Forwards other clients' frames from the room to one client.
///
/// A client that falls more than the channel capacity behind skips the
/// oldest frames and carries on with the newest.
async fn forward_to_client<S>(
    mut rx: broadcast::Receiver<Envelope>,
    own_id: Arc<str>,
    mut sink: S,
) where
    S: Sink<Message> + Unpin,
{
    loop {
        match rx.recv().await {
            Ok(envelope) if envelope.from == own_id => continue,
            Ok(envelope) => {
                if sink.send(Message::Text(envelope.frame)).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(conn = %own_id, skipped, "client lagging, boards skipped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Re-tags a client's `send-stroke` as a `broadcast-board` frame.
/// Anything else is dropped.
fn relay_frame(text: &str) -> Option<Utf8Bytes> {
    match BoardEvent::from_json(text) {
        Ok(BoardEvent::SendStroke(image)) => {
            debug!(width = image.width(), height = image.height(), "relaying board");
            match BoardEvent::BroadcastBoard(image).to_json() {
                Ok(json) => Some(json.into()),
                Err(e) => {
                    warn!(error = %e, "failed to encode board");
                    None
                }
            }
        }
        Ok(other) => {
            warn!(event = other.name(), "ignoring event not accepted from clients");
            None
        }
        Err(e) => {
            warn!(error = %e, "dropping malformed frame");
            None
        }
    }
}
