use guess_types::{LOSER_PRIZE, PlayerId, Ranking, SECOND_PRIZE, WINNER_PRIZE};

/// A member's guess as seen by the ranking engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankInput {
    pub player: PlayerId,
    pub guess: i64,
    /// Order in which this guess was recorded within its room. Lower wins ties.
    pub seq: u64,
}

pub struct RankingEngine;

impl RankingEngine {
    /// Distance between a guess and the secret.
    pub fn diff(secret: i64, guess: i64) -> u64 {
        secret.abs_diff(guess)
    }

    /// Trophies for a 1-based rank.
    pub fn prize_for_rank(rank: u8) -> i32 {
        match rank {
            1 => WINNER_PRIZE,
            2 => SECOND_PRIZE,
            _ => LOSER_PRIZE,
        }
    }

    /// Rank guesses by ascending distance to the secret. Equal distances are
    /// ordered by recording sequence, so the earlier guess ranks higher.
    pub fn rank(secret: i64, inputs: &[RankInput]) -> Vec<Ranking> {
        let mut ordered = inputs.to_vec();
        ordered.sort_by_key(|input| (Self::diff(secret, input.guess), input.seq));

        ordered
            .into_iter()
            .enumerate()
            .map(|(index, input)| {
                let rank = (index + 1) as u8;
                Ranking {
                    player: input.player,
                    rank,
                    guess: input.guess,
                    delta_trophy: Self::prize_for_rank(rank),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn input(guess: i64, seq: u64) -> RankInput {
        RankInput {
            player: Uuid::new_v4(),
            guess,
            seq,
        }
    }

    #[test]
    fn test_closest_guess_wins() {
        let p1 = input(5, 0);
        let p2 = input(4, 1);
        let p3 = input(3, 2);

        let rankings = RankingEngine::rank(3, &[p1, p2, p3]);

        assert_eq!(rankings.len(), 3);
        assert_eq!(rankings[0].player, p3.player);
        assert_eq!(rankings[0].rank, 1);
        assert_eq!(rankings[0].delta_trophy, 30);
        assert_eq!(rankings[1].player, p2.player);
        assert_eq!(rankings[1].rank, 2);
        assert_eq!(rankings[1].delta_trophy, 20);
        assert_eq!(rankings[2].player, p1.player);
        assert_eq!(rankings[2].rank, 3);
        assert_eq!(rankings[2].delta_trophy, 0);
    }

    #[test]
    fn test_equal_diff_ranks_earlier_guess_first() {
        // 4 and 6 are both one away from 5
        let late = input(6, 5);
        let early = input(4, 2);
        let far = input(10, 0);

        let rankings = RankingEngine::rank(5, &[late, far, early]);

        assert_eq!(rankings[0].player, early.player);
        assert_eq!(rankings[1].player, late.player);
        assert_eq!(rankings[2].player, far.player);
    }

    #[test]
    fn test_three_way_tie_follows_recording_order() {
        let a = input(7, 3);
        let b = input(7, 1);
        let c = input(7, 2);

        let rankings = RankingEngine::rank(1, &[a, b, c]);
        let order: Vec<_> = rankings.iter().map(|r| r.player).collect();

        assert_eq!(order, vec![b.player, c.player, a.player]);
    }

    #[test]
    fn test_diff_handles_extreme_guesses() {
        assert_eq!(RankingEngine::diff(3, 5), 2);
        assert_eq!(RankingEngine::diff(3, -4), 7);
        assert_eq!(RankingEngine::diff(1, i64::MIN), (i64::MAX as u64) + 2);
    }

    #[test]
    fn test_prize_for_rank() {
        assert_eq!(RankingEngine::prize_for_rank(1), 30);
        assert_eq!(RankingEngine::prize_for_rank(2), 20);
        assert_eq!(RankingEngine::prize_for_rank(3), 0);
    }
}
