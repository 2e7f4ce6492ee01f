use rand::seq::SliceRandom;
use std::collections::HashMap;
use thiserror::Error;

/// Upper bound on shuffle rounds before giving up
const MAX_SHUFFLE_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PairingError {
    #[error("at least 2 participants are required for a pairing")]
    TooFewParticipants,

    /// All shuffle rounds left a fixed point. With distinct ids the odds of
    /// this are negligible; the caller must not transition the game.
    #[error("no derangement found within the attempt bound")]
    AttemptsExhausted,
}

/// Draws a random giver -> receiver assignment over the given ids such that
/// nobody is assigned to themselves (a derangement).
///
/// Each round uniformly shuffles the ids, then swaps every residual fixed
/// point with its next position (wrapping). A round that validates clean is
/// returned; otherwise the whole procedure repeats, bounded at 100 rounds.
/// For exactly 2 ids the fix-up always yields the swap, so the result is
/// deterministic. The business rule that a game needs at least 3 real
/// participants lives at the call site, not here.
pub fn assign_pairs(ids: &[i64]) -> Result<HashMap<i64, i64>, PairingError> {
    if ids.len() < 2 {
        return Err(PairingError::TooFewParticipants);
    }

    let mut receivers: Vec<i64> = ids.to_vec();
    for _ in 0..MAX_SHUFFLE_ATTEMPTS {
        receivers.shuffle(&mut rand::rng());

        for i in 0..receivers.len() {
            if receivers[i] == ids[i] {
                let next = (i + 1) % receivers.len();
                receivers.swap(i, next);
            }
        }

        // The swap can push a fixed point back onto an earlier position, so
        // the round only counts if it validates clean as a whole.
        if receivers.iter().zip(ids).all(|(receiver, giver)| receiver != giver) {
            return Ok(ids.iter().copied().zip(receivers.iter().copied()).collect());
        }
    }

    Err(PairingError::AttemptsExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_derangement(ids: &[i64], pairs: &HashMap<i64, i64>) {
        assert_eq!(pairs.len(), ids.len());

        let givers: HashSet<i64> = pairs.keys().copied().collect();
        let receivers: HashSet<i64> = pairs.values().copied().collect();
        let expected: HashSet<i64> = ids.iter().copied().collect();

        // Bijection: every id appears exactly once as giver and as receiver
        assert_eq!(givers, expected);
        assert_eq!(receivers, expected);

        for (giver, receiver) in pairs {
            assert_ne!(giver, receiver, "self-assignment for {}", giver);
        }
    }

    #[test]
    fn test_assign_pairs_is_a_derangement() {
        for size in 3..=10 {
            let ids: Vec<i64> = (1..=size).collect();
            for _ in 0..200 {
                let pairs = assign_pairs(&ids).unwrap();
                assert_derangement(&ids, &pairs);
            }
        }
    }

    #[test]
    fn test_three_participants_always_terminate() {
        // There are exactly 2 derangements of 3 elements; both are valid
        let ids = [10, 20, 30];
        for _ in 0..1000 {
            let pairs = assign_pairs(&ids).unwrap();
            assert_derangement(&ids, &pairs);
        }
    }

    #[test]
    fn test_two_participants_yield_the_swap() {
        let pairs = assign_pairs(&[1, 2]).unwrap();
        assert_eq!(pairs[&1], 2);
        assert_eq!(pairs[&2], 1);
    }

    #[test]
    fn test_fewer_than_two_participants_rejected() {
        assert_eq!(assign_pairs(&[]), Err(PairingError::TooFewParticipants));
        assert_eq!(assign_pairs(&[1]), Err(PairingError::TooFewParticipants));
    }
}
