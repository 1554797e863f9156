use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use guess_core::{RandomSecret, Room, SecretSource};
use guess_types::{PlayerId, ROOM_SIZE, RoomId};

use crate::players::PlayerStore;
use crate::rooms::RoomStore;
use crate::waiting_pool::WaitingPool;
use crate::websocket::SessionNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// A room created by one scheduler tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAssignment {
    pub room_id: RoomId,
    pub members: [PlayerId; ROOM_SIZE],
    pub secret: i64,
}

/// Periodically turns waiting players into rooms of three.
pub struct RoomScheduler {
    config: SchedulerConfig,
    pool: Arc<WaitingPool>,
    rooms: Arc<RoomStore>,
    players: Arc<PlayerStore>,
    notifier: Arc<SessionNotifier>,
    secrets: Arc<dyn SecretSource>,
    // Serializes ticks so a manual tick never overlaps the periodic one
    tick_lock: Mutex<()>,
}

impl RoomScheduler {
    pub fn new(
        config: SchedulerConfig,
        pool: Arc<WaitingPool>,
        rooms: Arc<RoomStore>,
        players: Arc<PlayerStore>,
        notifier: Arc<SessionNotifier>,
    ) -> Self {
        Self::with_secret_source(config, pool, rooms, players, notifier, Arc::new(RandomSecret))
    }

    pub fn with_secret_source(
        config: SchedulerConfig,
        pool: Arc<WaitingPool>,
        rooms: Arc<RoomStore>,
        players: Arc<PlayerStore>,
        notifier: Arc<SessionNotifier>,
        secrets: Arc<dyn SecretSource>,
    ) -> Self {
        Self {
            config,
            pool,
            rooms,
            players,
            notifier,
            secrets,
            tick_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// One partition cycle: group eligible waiting players in join order,
    /// create a room per full group and signal the placed players.
    pub async fn tick(&self) -> Vec<RoomAssignment> {
        let _guard = self.tick_lock.lock().await;

        // Players still in an unscored room wait for it to finish
        let busy = self.rooms.open_members().await;
        let groups = self
            .pool
            .drain_groups::<ROOM_SIZE>(|player| !busy.contains(player))
            .await;

        let mut assignments = Vec::with_capacity(groups.len());
        for members in groups {
            let secret = self.secrets.draw();
            let room = match Room::new(Uuid::new_v4(), members, secret) {
                Ok(room) => room,
                Err(e) => {
                    warn!("Could not create room: {}", e);
                    self.requeue(&members).await;
                    continue;
                }
            };

            self.players.reset_for_new_room(&members).await;
            let entry = self.rooms.insert(room).await;

            info!("Created room {} for players {:?}", entry.id, members);
            assignments.push(RoomAssignment {
                room_id: entry.id,
                members,
                secret,
            });
        }

        for assignment in &assignments {
            for player in assignment.members {
                self.notifier
                    .signal_placement(player, assignment.room_id)
                    .await;
            }
        }

        if !assignments.is_empty() {
            debug!(
                "Tick placed {} rooms, {} players waiting",
                assignments.len(),
                self.pool.len().await
            );
        }

        assignments
    }

    async fn requeue(&self, members: &[PlayerId]) {
        for player in members {
            if let Err(e) = self.pool.join(*player).await {
                warn!("Dropping player {} from waiting pool: {}", player, e);
            }
        }
    }

    /// Ticks on the configured interval until `shutdown` flips or its
    /// sender goes away.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.interval);
        // The first tick completes immediately
        interval.tick().await;

        info!("Room scheduler running every {:?}", self.config.interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    info!("Room scheduler stopping");
                    break;
                }
            }
        }
    }
}
