use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use guess_types::{CommandReply, GameResult, PlayerId, RoomId};

use super::notifier::{SessionId, SessionNotifier};

#[derive(Default)]
struct Waiters {
    placements: HashMap<PlayerId, JoinHandle<()>>,
    completions: HashMap<RoomId, JoinHandle<()>>,
}

impl Waiters {
    fn prune_finished(&mut self) {
        self.placements.retain(|_, handle| !handle.is_finished());
        self.completions.retain(|_, handle| !handle.is_finished());
    }
}

/// Live context of one WebSocket client: its outbound route and the
/// background waiters it started. Closing the session aborts the waiters.
pub struct Session {
    id: SessionId,
    notifier: Arc<SessionNotifier>,
    waiters: Mutex<Waiters>,
}

impl Session {
    pub fn new(id: SessionId, notifier: Arc<SessionNotifier>) -> Self {
        Self {
            id,
            notifier,
            waiters: Mutex::new(Waiters::default()),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub async fn reply(&self, reply: CommandReply) {
        if let Err(e) = self.notifier.send(self.id, reply.into()).await {
            warn!("Failed to queue reply: {}", e);
        }
    }

    /// Forwards the room assignment for `player` to this session once the
    /// scheduler places them. At most one placement waiter per player.
    pub async fn watch_placement(&self, player: PlayerId, placement: oneshot::Receiver<RoomId>) {
        let mut waiters = self.waiters.lock().await;
        waiters.prune_finished();
        if waiters.placements.contains_key(&player) {
            debug!("Session {} already waiting on placement of {}", self.id, player);
            return;
        }

        let notifier = self.notifier.clone();
        let id = self.id;
        let handle = tokio::spawn(async move {
            if let Ok(room) = placement.await {
                notifier.notify_room_assigned(id, room).await;
            }
        });
        waiters.placements.insert(player, handle);
    }

    /// Forwards the room's result to this session once it is scored. A
    /// session runs at most one waiter per room.
    pub async fn watch_completion(
        &self,
        room: RoomId,
        mut completion: watch::Receiver<Option<GameResult>>,
    ) {
        let mut waiters = self.waiters.lock().await;
        waiters.prune_finished();
        if waiters.completions.contains_key(&room) {
            return;
        }

        let notifier = self.notifier.clone();
        let id = self.id;
        let handle = tokio::spawn(async move {
            let result = completion
                .wait_for(|result| result.is_some())
                .await
                .map(|result| result.clone());

            match result {
                Ok(Some(result)) => notifier.notify_game_over(id, &result).await,
                // Sender gone: the room was evicted before it was scored
                _ => debug!("Room {} closed without a result", room),
            }
        });
        waiters.completions.insert(room, handle);
    }

    pub async fn active_waiters(&self) -> usize {
        let waiters = self.waiters.lock().await;
        waiters
            .placements
            .values()
            .chain(waiters.completions.values())
            .filter(|handle| !handle.is_finished())
            .count()
    }

    pub async fn close(&self) {
        let mut waiters = self.waiters.lock().await;
        for (_, handle) in waiters.placements.drain() {
            handle.abort();
        }
        for (_, handle) in waiters.completions.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guess_types::{Ranking, ServerEvent, ServerMessage};
    use std::time::Duration;
    use uuid::Uuid;

    fn result_for(room: RoomId) -> GameResult {
        GameResult {
            room_id: room,
            secret: 3,
            rankings: vec![Ranking {
                player: Uuid::new_v4(),
                rank: 1,
                guess: 3,
                delta_trophy: 30,
            }],
        }
    }

    async fn open() -> (Session, tokio::sync::mpsc::UnboundedReceiver<ServerMessage>) {
        let notifier = Arc::new(SessionNotifier::new());
        let id = SessionId::new();
        let receiver = notifier.open_session(id).await;
        (Session::new(id, notifier), receiver)
    }

    #[tokio::test]
    async fn test_placement_is_forwarded() {
        let (session, mut receiver) = open().await;
        let (tx, rx) = oneshot::channel();
        let room = Uuid::new_v4();

        session.watch_placement(Uuid::new_v4(), rx).await;
        tx.send(room).unwrap();

        assert_eq!(
            receiver.recv().await.unwrap(),
            ServerMessage::Event(ServerEvent::JoinedRoom { room })
        );
    }

    #[tokio::test]
    async fn test_completion_is_forwarded_once() {
        let (session, mut receiver) = open().await;
        let room = Uuid::new_v4();
        let (tx, rx) = watch::channel(None);

        session.watch_completion(room, rx.clone()).await;
        session.watch_completion(room, rx).await;
        tx.send_replace(Some(result_for(room)));

        let message = receiver.recv().await.unwrap();
        assert!(matches!(
            message,
            ServerMessage::Event(ServerEvent::GameOver { secret: 3, .. })
        ));

        let extra = tokio::time::timeout(Duration::from_millis(50), receiver.recv()).await;
        assert!(extra.is_err(), "result should only be delivered once");
    }

    #[tokio::test]
    async fn test_evicted_room_ends_waiter() {
        let (session, _receiver) = open().await;
        let (tx, rx) = watch::channel(None);

        session.watch_completion(Uuid::new_v4(), rx).await;
        drop(tx);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(session.active_waiters().await, 0);
    }

    #[tokio::test]
    async fn test_finished_waiters_are_dropped() {
        let (session, mut receiver) = open().await;
        let first = Uuid::new_v4();
        let (tx, rx) = watch::channel(None);

        session.watch_completion(first, rx).await;
        tx.send_replace(Some(result_for(first)));
        receiver.recv().await.unwrap();
        while session.active_waiters().await > 0 {
            tokio::task::yield_now().await;
        }

        let (_second_tx, second_rx) = watch::channel(None);
        session.watch_completion(Uuid::new_v4(), second_rx).await;

        let waiters = session.waiters.lock().await;
        assert_eq!(waiters.completions.len(), 1);
        assert!(!waiters.completions.contains_key(&first));
    }

    #[tokio::test]
    async fn test_close_aborts_waiters() {
        let (session, _receiver) = open().await;
        let (_placement_tx, placement_rx) = oneshot::channel();
        let (_completion_tx, completion_rx) = watch::channel(None);

        session.watch_placement(Uuid::new_v4(), placement_rx).await;
        session.watch_completion(Uuid::new_v4(), completion_rx).await;
        assert_eq!(session.active_waiters().await, 2);

        session.close().await;
        assert_eq!(session.active_waiters().await, 0);
    }
}
