use guess_core::GameError;
use guess_types::{Player, PlayerId, Ranking};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
    by_nickname: HashMap<String, PlayerId>,
    // Registration order, for stable listings
    order: Vec<PlayerId>,
}

/// Registry of every player that ever registered. Players are never removed.
pub struct PlayerStore {
    registry: RwLock<PlayerRegistry>,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(PlayerRegistry::default()),
        }
    }

    /// Returns the id registered under `nickname`, creating the player on
    /// first use. Lookup and insert share one write lock, so concurrent
    /// registrations of the same nickname produce a single record.
    pub async fn register(&self, nickname: &str) -> PlayerId {
        let mut registry = self.registry.write().await;

        if let Some(&existing) = registry.by_nickname.get(nickname) {
            return existing;
        }

        let id = Uuid::new_v4();
        registry
            .players
            .insert(id, Player::new(id, nickname.to_string()));
        registry.by_nickname.insert(nickname.to_string(), id);
        registry.order.push(id);

        info!("Registered player {} as {}", nickname, id);
        id
    }

    pub async fn get_by_id(&self, id: PlayerId) -> Option<Player> {
        let registry = self.registry.read().await;
        registry.players.get(&id).cloned()
    }

    pub async fn get_by_nickname(&self, nickname: &str) -> Option<Player> {
        let registry = self.registry.read().await;
        registry
            .by_nickname
            .get(nickname)
            .and_then(|id| registry.players.get(id))
            .cloned()
    }

    pub async fn contains(&self, id: PlayerId) -> bool {
        let registry = self.registry.read().await;
        registry.players.contains_key(&id)
    }

    /// Parses a client-supplied id and checks that it names a registered
    /// player. Anything that is not a known UUID is `NotRegistered`.
    pub async fn resolve(&self, raw_id: &str) -> Result<PlayerId, GameError> {
        let id = Uuid::parse_str(raw_id).map_err(|_| GameError::NotRegistered(raw_id.to_string()))?;
        if self.contains(id).await {
            Ok(id)
        } else {
            Err(GameError::NotRegistered(raw_id.to_string()))
        }
    }

    /// Snapshot of all players in registration order.
    pub async fn list_all(&self) -> Vec<Player> {
        let registry = self.registry.read().await;
        registry
            .order
            .iter()
            .filter_map(|id| registry.players.get(id))
            .cloned()
            .collect()
    }

    pub async fn count(&self) -> usize {
        let registry = self.registry.read().await;
        registry.players.len()
    }

    /// Clears guess, diff and rank for players that were just placed in a room.
    pub async fn reset_for_new_room(&self, ids: &[PlayerId]) {
        let mut registry = self.registry.write().await;
        for id in ids {
            if let Some(player) = registry.players.get_mut(id) {
                player.reset_for_new_room();
            }
        }
    }

    pub async fn record_guess(&self, id: PlayerId, guess: i64, diff: u64) {
        let mut registry = self.registry.write().await;
        if let Some(player) = registry.players.get_mut(&id) {
            player.guess = guess;
            player.diff = diff;
        }
    }

    /// Persists rank and trophy delta from a finished room.
    pub async fn apply_rankings(&self, rankings: &[Ranking]) {
        let mut registry = self.registry.write().await;
        for ranking in rankings {
            if let Some(player) = registry.players.get_mut(&ranking.player) {
                player.rank = ranking.rank;
                player.score = ranking.delta_trophy;
            }
        }
    }
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}
