use guess_core::{FixedSecret, SecretSource};
use guess_server::AppState;
use guess_server::scheduler::{RoomAssignment, RoomScheduler, SchedulerConfig};
use guess_types::{GameResult, PlayerId, RoomId};
use std::sync::Arc;

/// Test setup that provides all registries and a scheduler over them
pub struct TestServerSetup {
    pub state: AppState,
    pub scheduler: Arc<RoomScheduler>,
}

impl TestServerSetup {
    pub fn new() -> Self {
        Self::with_secrets(Arc::new(FixedSecret(3)))
    }

    pub fn with_secrets(secrets: Arc<dyn SecretSource>) -> Self {
        let state = AppState::new();
        let scheduler = Arc::new(state.scheduler_with_secrets(SchedulerConfig::default(), secrets));
        Self { state, scheduler }
    }

    /// Registers one player per nickname
    pub async fn register_players(&self, names: &[&str]) -> Vec<PlayerId> {
        let mut ids = Vec::new();
        for name in names {
            ids.push(self.state.players.register(name).await);
        }
        ids
    }

    /// Registers `count` players with generated nicknames and joins them
    pub async fn join_players(&self, count: usize) -> Vec<PlayerId> {
        let mut ids = Vec::new();
        for i in 0..count {
            let id = self
                .state
                .players
                .register(&format!("player-{}-{}", i, uuid::Uuid::new_v4()))
                .await;
            self.state.pool.join(id).await.unwrap();
            ids.push(id);
        }
        ids
    }

    /// Creates one room from three fresh players
    pub async fn create_room(&self) -> RoomAssignment {
        self.join_players(3).await;
        self.scheduler
            .tick()
            .await
            .pop()
            .expect("three waiting players should form a room")
    }

    /// Submits guesses in order and returns the result produced by the last one
    pub async fn play_room(&self, room: RoomId, guesses: &[(PlayerId, i64)]) -> Option<GameResult> {
        let mut finalized = None;
        for (player, value) in guesses {
            let receipt = self
                .state
                .engine
                .submit_guess(&player.to_string(), &room.to_string(), *value)
                .await
                .unwrap();
            finalized = receipt.finalized.or(finalized);
        }
        finalized
    }
}
