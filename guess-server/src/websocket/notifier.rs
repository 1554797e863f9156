use guess_types::{GameResult, PlayerId, RoomId, ServerEvent, ServerMessage};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("session {0} closed")]
    SessionClosed(SessionId),
}

/// Routes outbound messages to sessions and placement signals to whoever
/// is waiting for a player to be put in a room.
///
/// Each session's messages go through one unbounded channel drained by a
/// single writer task, so replies and events never interleave on the wire.
pub struct SessionNotifier {
    sessions: RwLock<HashMap<SessionId, mpsc::UnboundedSender<ServerMessage>>>,
    placements: Mutex<HashMap<PlayerId, Vec<oneshot::Sender<RoomId>>>>,
}

impl SessionNotifier {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            placements: Mutex::new(HashMap::new()),
        }
    }

    pub async fn open_session(&self, id: SessionId) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, sender);
        receiver
    }

    pub async fn close_session(&self, id: SessionId) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id);
    }

    /// Queues a message for the session's writer. Never waits on the network.
    pub async fn send(&self, id: SessionId, message: ServerMessage) -> Result<(), DeliveryError> {
        let sessions = self.sessions.read().await;
        let sender = sessions.get(&id).ok_or(DeliveryError::SessionNotFound(id))?;
        sender
            .send(message)
            .map_err(|_| DeliveryError::SessionClosed(id))
    }

    pub async fn notify_room_assigned(&self, id: SessionId, room: RoomId) {
        if let Err(e) = self.send(id, ServerEvent::JoinedRoom { room }.into()).await {
            warn!("Failed to deliver room {} to session: {}", room, e);
        }
    }

    pub async fn notify_game_over(&self, id: SessionId, result: &GameResult) {
        if let Err(e) = self.send(id, ServerEvent::from(result).into()).await {
            warn!("Failed to deliver result of room {}: {}", result.room_id, e);
        }
    }

    /// Returns a receiver that fires once `player` is placed in a room.
    pub async fn await_placement(&self, player: PlayerId) -> oneshot::Receiver<RoomId> {
        let (tx, rx) = oneshot::channel();
        let mut placements = self.placements.lock().await;
        let waiters = placements.entry(player).or_default();
        waiters.retain(|w| !w.is_closed());
        waiters.push(tx);
        rx
    }

    /// Wakes every waiter registered for `player`. Returns how many were
    /// still listening.
    pub async fn signal_placement(&self, player: PlayerId, room: RoomId) -> usize {
        let waiters = {
            let mut placements = self.placements.lock().await;
            placements.remove(&player).unwrap_or_default()
        };

        let delivered = waiters
            .into_iter()
            .filter_map(|waiter| waiter.send(room).ok())
            .count();

        if delivered == 0 {
            debug!("No session waiting on placement of player {}", player);
        }
        delivered
    }

    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    pub async fn pending_placements(&self) -> usize {
        let mut placements = self.placements.lock().await;
        placements.retain(|_, waiters| {
            waiters.retain(|w| !w.is_closed());
            !waiters.is_empty()
        });
        placements.values().map(Vec::len).sum()
    }
}

impl Default for SessionNotifier {
    fn default() -> Self {
        Self::new()
    }
}
