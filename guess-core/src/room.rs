use chrono::{DateTime, Utc};
use guess_types::{
    ActiveRoom, GameResult, PlayerId, ROOM_SIZE, RoomId, RoomResults, RoomState, SECRET_MAX,
    SECRET_MIN, UNGUESSED,
};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use crate::{GameError, RankInput, RankingEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MemberGuess {
    value: i64,
    diff: u64,
    seq: u64,
}

/// What happened to a guess handed to [`Room::record_guess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Stored (or overwrote the member's previous guess).
    Recorded { diff: u64 },
    /// The room is already scored; nothing changed.
    AlreadyScored,
}

/// One three-player game: its members, secret, guesses and outcome.
///
/// ```text
/// AwaitingGuesses --finalize (all three guessed)--> Scored
/// ```
///
/// `Scored` is terminal. [`Room::finalize`] only produces a result on the
/// transition, so calling it again is a no-op.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    members: [PlayerId; ROOM_SIZE],
    secret: i64,
    state: RoomState,
    guesses: [Option<MemberGuess>; ROOM_SIZE],
    next_seq: u64,
    created_at: DateTime<Utc>,
    scored_at: Option<DateTime<Utc>>,
    result: Option<GameResult>,
}

impl Room {
    pub fn new(id: RoomId, members: [PlayerId; ROOM_SIZE], secret: i64) -> Result<Self, GameError> {
        let distinct: HashSet<_> = members.iter().collect();
        if distinct.len() != ROOM_SIZE {
            return Err(GameError::InvalidRoom(format!(
                "room {} needs {} distinct players",
                id, ROOM_SIZE
            )));
        }
        if !(SECRET_MIN..=SECRET_MAX).contains(&secret) {
            return Err(GameError::InvalidRoom(format!(
                "secret {} outside {}..={}",
                secret, SECRET_MIN, SECRET_MAX
            )));
        }

        Ok(Self {
            id,
            members,
            secret,
            state: RoomState::AwaitingGuesses,
            guesses: [None; ROOM_SIZE],
            next_seq: 0,
            created_at: Utc::now(),
            scored_at: None,
            result: None,
        })
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn members(&self) -> &[PlayerId; ROOM_SIZE] {
        &self.members
    }

    pub fn secret(&self) -> i64 {
        self.secret
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn scored_at(&self) -> Option<DateTime<Utc>> {
        self.scored_at
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    pub fn is_member(&self, player: PlayerId) -> bool {
        self.members.contains(&player)
    }

    /// Current guess of a member, or [`UNGUESSED`].
    pub fn guess_of(&self, player: PlayerId) -> Option<i64> {
        let index = self.member_index(player)?;
        Some(self.guesses[index].map_or(UNGUESSED, |g| g.value))
    }

    pub fn diff_of(&self, player: PlayerId) -> Option<u64> {
        let index = self.member_index(player)?;
        self.guesses[index].map(|g| g.diff)
    }

    pub fn guesses_received(&self) -> usize {
        self.guesses.iter().filter(|g| g.is_some()).count()
    }

    pub fn record_guess(&mut self, player: PlayerId, value: i64) -> Result<GuessOutcome, GameError> {
        let index = self.member_index(player).ok_or(GameError::NotInRoom {
            player,
            room: self.id,
        })?;

        if value == UNGUESSED {
            return Err(GameError::ReservedGuess(value));
        }

        if self.state == RoomState::Scored {
            debug!("Ignoring guess from {} for scored room {}", player, self.id);
            return Ok(GuessOutcome::AlreadyScored);
        }

        let diff = RankingEngine::diff(self.secret, value);
        self.guesses[index] = Some(MemberGuess {
            value,
            diff,
            seq: self.next_seq,
        });
        self.next_seq += 1;

        Ok(GuessOutcome::Recorded { diff })
    }

    /// True once every member has guessed.
    pub fn is_complete(&self) -> bool {
        self.guesses.iter().all(|g| g.is_some())
    }

    /// Scores the room if it is complete and not yet scored. Returns the
    /// result only on that transition.
    pub fn finalize(&mut self) -> Option<GameResult> {
        if self.state == RoomState::Scored || !self.is_complete() {
            return None;
        }

        let inputs: Vec<RankInput> = self
            .members
            .iter()
            .zip(self.guesses.iter())
            .filter_map(|(player, guess)| {
                guess.map(|g| RankInput {
                    player: *player,
                    guess: g.value,
                    seq: g.seq,
                })
            })
            .collect();

        let result = GameResult {
            room_id: self.id,
            secret: self.secret,
            rankings: RankingEngine::rank(self.secret, &inputs),
        };

        self.state = RoomState::Scored;
        self.scored_at = Some(Utc::now());
        self.result = Some(result.clone());

        Some(result)
    }

    pub fn results(&self) -> RoomResults {
        RoomResults {
            room_id: self.id,
            state: self.state,
            guesses_received: self.guesses_received(),
            result: self.result.clone(),
        }
    }

    pub fn summary(&self) -> ActiveRoom {
        ActiveRoom {
            id: self.id,
            secret: self.secret,
        }
    }

    /// A scored room is expired once it has been scored for longer than `ttl`.
    /// Rooms still awaiting guesses never expire.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let Some(scored_at) = self.scored_at else {
            return false;
        };
        // A clock that moved backwards yields a negative delta, treated as fresh
        (now - scored_at).to_std().is_ok_and(|elapsed| elapsed > ttl)
    }

    fn member_index(&self, player: PlayerId) -> Option<usize> {
        self.members.iter().position(|member| *member == player)
    }
}
