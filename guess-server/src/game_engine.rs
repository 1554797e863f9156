use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use guess_core::{GameError, GuessOutcome};
use guess_types::{GameResult, PlayerId, RoomId, RoomResults};

use crate::players::PlayerStore;
use crate::rooms::{RoomEntry, RoomStore};

/// What a successful guess command produced.
#[derive(Debug)]
pub struct GuessReceipt {
    pub player: PlayerId,
    pub room: RoomId,
    pub outcome: GuessOutcome,
    /// Set only for the guess that completed and scored the room.
    pub finalized: Option<GameResult>,
    /// Yields the room's result once it is scored.
    pub completion: watch::Receiver<Option<GameResult>>,
}

/// Records guesses against stored rooms and scores them once complete.
///
/// Lock order is always room then player registry, and the room lock is
/// released before the result is published.
pub struct GameEngine {
    players: Arc<PlayerStore>,
    rooms: Arc<RoomStore>,
}

impl GameEngine {
    pub fn new(players: Arc<PlayerStore>, rooms: Arc<RoomStore>) -> Self {
        Self { players, rooms }
    }

    pub async fn record_guess(
        &self,
        player: PlayerId,
        room: RoomId,
        value: i64,
    ) -> Result<GuessOutcome, GameError> {
        if !self.players.contains(player).await {
            return Err(GameError::NotRegistered(player.to_string()));
        }
        let entry = self.room_entry(room).await?;
        self.record_in(&entry, player, value).await
    }

    pub async fn is_complete(&self, room: RoomId) -> Result<bool, GameError> {
        let entry = self.room_entry(room).await?;
        let room = entry.room.read().await;
        Ok(room.is_complete())
    }

    /// Scores the room if it just became complete. Only the first call after
    /// completion returns a result; later calls return `None`.
    pub async fn finalize(&self, room: RoomId) -> Result<Option<GameResult>, GameError> {
        let entry = self.room_entry(room).await?;
        Ok(self.finalize_entry(&entry).await)
    }

    pub async fn current_results(&self, room: RoomId) -> Result<RoomResults, GameError> {
        let entry = self.room_entry(room).await?;
        let room = entry.room.read().await;
        Ok(room.results())
    }

    /// Full guess command on raw wire ids: resolve the player, then the
    /// room, record the guess and score the room if it is now complete.
    pub async fn submit_guess(
        &self,
        raw_player: &str,
        raw_room: &str,
        value: i64,
    ) -> Result<GuessReceipt, GameError> {
        let player = self.players.resolve(raw_player).await?;
        let entry = self.rooms.resolve(raw_room).await?;

        let outcome = self.record_in(&entry, player, value).await?;
        let finalized = match outcome {
            GuessOutcome::Recorded { .. } => self.finalize_entry(&entry).await,
            GuessOutcome::AlreadyScored => None,
        };

        Ok(GuessReceipt {
            player,
            room: entry.id,
            outcome,
            finalized,
            completion: entry.subscribe(),
        })
    }

    async fn room_entry(&self, room: RoomId) -> Result<Arc<RoomEntry>, GameError> {
        self.rooms
            .get(room)
            .await
            .ok_or_else(|| GameError::RoomNotFound(room.to_string()))
    }

    async fn record_in(
        &self,
        entry: &RoomEntry,
        player: PlayerId,
        value: i64,
    ) -> Result<GuessOutcome, GameError> {
        let mut room = entry.room.write().await;
        let outcome = room.record_guess(player, value)?;

        if let GuessOutcome::Recorded { diff } = outcome {
            self.players.record_guess(player, value, diff).await;
            debug!(
                "Player {} guessed {} in room {} ({}/3)",
                player,
                value,
                entry.id,
                room.guesses_received()
            );
        }

        Ok(outcome)
    }

    async fn finalize_entry(&self, entry: &RoomEntry) -> Option<GameResult> {
        let result = {
            let mut room = entry.room.write().await;
            let result = room.finalize()?;
            self.players.apply_rankings(&result.rankings).await;
            result
        };

        self.rooms.mark_scored(entry.id).await;
        entry.publish(result.clone());

        info!(
            "Room {} scored, secret {}, winner {}",
            entry.id,
            result.secret,
            result
                .rankings
                .first()
                .map(|r| r.player.to_string())
                .unwrap_or_default()
        );
        Some(result)
    }
}
