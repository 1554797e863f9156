use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info};
use uuid::Uuid;

use guess_core::{GameError, Room};
use guess_types::{ActiveRoom, GameResult, PlayerId, ROOM_SIZE, RoomId};

/// How long scored rooms are kept and how often the sweep runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub scored_room_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            scored_room_ttl: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// A stored room. The immutable parts sit outside the lock so listings and
/// membership checks never wait on a guess in progress.
pub struct RoomEntry {
    pub id: RoomId,
    pub members: [PlayerId; ROOM_SIZE],
    pub secret: i64,
    pub created_at: DateTime<Utc>,
    pub room: RwLock<Room>,
    completion: watch::Sender<Option<GameResult>>,
}

impl RoomEntry {
    fn new(room: Room) -> Self {
        let (completion, _) = watch::channel(None);
        Self {
            id: room.id(),
            members: *room.members(),
            secret: room.secret(),
            created_at: room.created_at(),
            room: RwLock::new(room),
            completion,
        }
    }

    /// Receiver that yields the room's result once it is scored. If the
    /// room is already scored the value is available immediately.
    pub fn subscribe(&self) -> watch::Receiver<Option<GameResult>> {
        self.completion.subscribe()
    }

    pub(crate) fn publish(&self, result: GameResult) {
        self.completion.send_replace(Some(result));
    }

    pub fn summary(&self) -> ActiveRoom {
        ActiveRoom {
            id: self.id,
            secret: self.secret,
        }
    }
}

#[derive(Default)]
struct RoomRegistry {
    // Creation order
    by_seq: BTreeMap<u64, Arc<RoomEntry>>,
    seq_of: HashMap<RoomId, u64>,
    // Player -> the unscored room they belong to
    open_by_player: HashMap<PlayerId, RoomId>,
    next_seq: u64,
}

pub struct RoomStore {
    registry: RwLock<RoomRegistry>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(RoomRegistry::default()),
        }
    }

    pub async fn insert(&self, room: Room) -> Arc<RoomEntry> {
        let entry = Arc::new(RoomEntry::new(room));
        let mut registry = self.registry.write().await;

        let seq = registry.next_seq;
        registry.next_seq += 1;
        registry.by_seq.insert(seq, entry.clone());
        registry.seq_of.insert(entry.id, seq);
        for member in entry.members {
            registry.open_by_player.insert(member, entry.id);
        }

        entry
    }

    pub async fn get(&self, id: RoomId) -> Option<Arc<RoomEntry>> {
        let registry = self.registry.read().await;
        registry
            .seq_of
            .get(&id)
            .and_then(|seq| registry.by_seq.get(seq))
            .cloned()
    }

    /// Parses a client-supplied room id and looks it up.
    pub async fn resolve(&self, raw_id: &str) -> Result<Arc<RoomEntry>, GameError> {
        let id =
            Uuid::parse_str(raw_id).map_err(|_| GameError::RoomNotFound(raw_id.to_string()))?;
        self.get(id)
            .await
            .ok_or_else(|| GameError::RoomNotFound(raw_id.to_string()))
    }

    /// Players who currently belong to a room that has not been scored.
    pub async fn open_members(&self) -> HashSet<PlayerId> {
        let registry = self.registry.read().await;
        registry.open_by_player.keys().copied().collect()
    }

    pub async fn open_room_of(&self, player: PlayerId) -> Option<RoomId> {
        let registry = self.registry.read().await;
        registry.open_by_player.get(&player).copied()
    }

    /// Releases the members of a scored room so they can be placed again.
    pub async fn mark_scored(&self, id: RoomId) {
        let mut registry = self.registry.write().await;
        registry.open_by_player.retain(|_, room| *room != id);
    }

    /// Summaries of every retained room in creation order.
    pub async fn list_summaries(&self) -> Vec<ActiveRoom> {
        let registry = self.registry.read().await;
        registry.by_seq.values().map(|entry| entry.summary()).collect()
    }

    pub async fn count(&self) -> usize {
        let registry = self.registry.read().await;
        registry.by_seq.len()
    }

    /// Drops scored rooms older than `ttl`. Returns the evicted ids.
    pub async fn evict_expired(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<RoomId> {
        let candidates: Vec<Arc<RoomEntry>> = {
            let registry = self.registry.read().await;
            registry.by_seq.values().cloned().collect()
        };

        let mut expired = Vec::new();
        for entry in candidates {
            if entry.room.read().await.is_expired(now, ttl) {
                expired.push(entry.id);
            }
        }

        if expired.is_empty() {
            return expired;
        }

        let mut registry = self.registry.write().await;
        for id in &expired {
            if let Some(seq) = registry.seq_of.remove(id) {
                registry.by_seq.remove(&seq);
            }
            registry.open_by_player.retain(|_, room| room != id);
            debug!("Evicted room {}", id);
        }

        info!("Evicted {} scored rooms", expired.len());
        expired
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guess_types::RoomState;

    fn new_room(secret: i64) -> Room {
        let members = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        Room::new(Uuid::new_v4(), members, secret).unwrap()
    }

    async fn score(entry: &RoomEntry) -> GameResult {
        let mut room = entry.room.write().await;
        for member in entry.members {
            room.record_guess(member, 5).unwrap();
        }
        room.finalize().unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = RoomStore::new();
        let entry = store.insert(new_room(4)).await;

        let found = store.get(entry.id).await.unwrap();
        assert_eq!(found.secret, 4);
        assert_eq!(store.count().await, 1);
        assert!(store.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_rejects_unknown_and_malformed_ids() {
        let store = RoomStore::new();
        let entry = store.insert(new_room(4)).await;

        assert_eq!(
            store.resolve(&entry.id.to_string()).await.unwrap().id,
            entry.id
        );
        assert_eq!(
            store.resolve("room-x").await.err(),
            Some(GameError::RoomNotFound("room-x".to_string()))
        );
    }

    #[tokio::test]
    async fn test_summaries_in_creation_order() {
        let store = RoomStore::new();
        let mut ids = Vec::new();
        for secret in 1..=5 {
            ids.push(store.insert(new_room(secret)).await.id);
        }

        let listed: Vec<_> = store.list_summaries().await.into_iter().map(|r| r.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_members_are_open_until_scored() {
        let store = RoomStore::new();
        let entry = store.insert(new_room(2)).await;

        let open = store.open_members().await;
        assert_eq!(open.len(), 3);
        assert_eq!(store.open_room_of(entry.members[0]).await, Some(entry.id));

        store.mark_scored(entry.id).await;
        assert!(store.open_members().await.is_empty());
        // Scored rooms stay listed until evicted
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_subscriber_sees_published_result() {
        let store = RoomStore::new();
        let entry = store.insert(new_room(5)).await;
        let mut rx = entry.subscribe();
        assert!(rx.borrow().is_none());

        let result = score(&entry).await;
        entry.publish(result.clone());

        let seen = rx.wait_for(|r| r.is_some()).await.unwrap().clone();
        assert_eq!(seen, Some(result.clone()));

        // Late subscribers see it too
        assert_eq!(*entry.subscribe().borrow(), Some(result));
    }

    #[tokio::test]
    async fn test_eviction_only_removes_old_scored_rooms() {
        let store = RoomStore::new();
        let scored = store.insert(new_room(5)).await;
        let open = store.insert(new_room(6)).await;
        score(&scored).await;
        store.mark_scored(scored.id).await;

        let ttl = Duration::from_secs(60);
        assert!(store.evict_expired(Utc::now(), ttl).await.is_empty());

        let later = Utc::now() + chrono::Duration::minutes(5);
        assert_eq!(store.evict_expired(later, ttl).await, vec![scored.id]);

        assert!(store.get(scored.id).await.is_none());
        let remaining = store.get(open.id).await.unwrap();
        assert_eq!(remaining.room.read().await.state(), RoomState::AwaitingGuesses);
    }
}
