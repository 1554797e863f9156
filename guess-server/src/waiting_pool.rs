use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use guess_core::GameError;
use guess_types::PlayerId;

use crate::players::PlayerStore;

#[derive(Default)]
struct PoolState {
    // Keyed by join sequence so iteration is first-joined-first-grouped
    by_seq: BTreeMap<u64, PlayerId>,
    seq_of: HashMap<PlayerId, u64>,
    next_seq: u64,
}

impl PoolState {
    fn position_of(&self, seq: u64) -> usize {
        self.by_seq.range(..seq).count() + 1
    }

    fn remove(&mut self, player: &PlayerId) -> bool {
        match self.seq_of.remove(player) {
            Some(seq) => self.by_seq.remove(&seq).is_some(),
            None => false,
        }
    }
}

/// Registered players waiting to be placed in a room.
pub struct WaitingPool {
    players: Arc<PlayerStore>,
    state: RwLock<PoolState>,
}

impl WaitingPool {
    pub fn new(players: Arc<PlayerStore>) -> Self {
        Self {
            players,
            state: RwLock::new(PoolState::default()),
        }
    }

    /// Adds a registered player and returns their 1-based position. Joining
    /// again while already waiting keeps the original position.
    pub async fn join(&self, player: PlayerId) -> Result<usize, GameError> {
        if !self.players.contains(player).await {
            return Err(GameError::NotRegistered(player.to_string()));
        }

        let mut state = self.state.write().await;

        if let Some(&seq) = state.seq_of.get(&player) {
            debug!("Player {} already waiting", player);
            return Ok(state.position_of(seq));
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.by_seq.insert(seq, player);
        state.seq_of.insert(player, seq);

        let position = state.position_of(seq);
        info!("Player {} joined waiting pool at position {}", player, position);
        Ok(position)
    }

    /// Removes the given players. Absent ids are ignored.
    pub async fn remove_many(&self, players: &[PlayerId]) -> usize {
        let mut state = self.state.write().await;
        players.iter().filter(|p| state.remove(p)).count()
    }

    pub async fn snapshot(&self) -> Vec<PlayerId> {
        let state = self.state.read().await;
        state.by_seq.values().copied().collect()
    }

    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.by_seq.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, player: PlayerId) -> bool {
        let state = self.state.read().await;
        state.seq_of.contains_key(&player)
    }

    pub async fn position_of(&self, player: PlayerId) -> Option<usize> {
        let state = self.state.read().await;
        state.seq_of.get(&player).map(|&seq| state.position_of(seq))
    }

    /// Partitions the eligible waiting players, in join order, into full
    /// groups and removes them from the pool, all under one write lock.
    /// Ineligible players and the `n mod N` remainder keep their places.
    pub async fn drain_groups<const N: usize>(
        &self,
        is_eligible: impl Fn(&PlayerId) -> bool,
    ) -> Vec<[PlayerId; N]> {
        let mut state = self.state.write().await;

        let eligible: Vec<PlayerId> = state
            .by_seq
            .values()
            .copied()
            .filter(|player| is_eligible(player))
            .collect();

        let groups: Vec<[PlayerId; N]> = eligible
            .chunks_exact(N)
            .filter_map(|chunk| <[PlayerId; N]>::try_from(chunk).ok())
            .collect();

        for group in &groups {
            for player in group {
                state.remove(player);
            }
        }

        if !groups.is_empty() {
            debug!(
                "Drained {} groups, {} players still waiting",
                groups.len(),
                state.by_seq.len()
            );
        }

        groups
    }
}
