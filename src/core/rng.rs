//! Deterministic, rewindable random number generation.
//!
//! Shuffles are the only random mutation in the timing core. Speculative
//! search undoes a run and then replays it, so the RNG must rewind together
//! with the deck: a `Shuffle` action captures [`GameRngState`] before it
//! draws any randomness and restores it on undo.
//!
//! ```
//! use ccg_timing::core::GameRng;
//!
//! let mut rng = GameRng::new(42);
//! let saved = rng.state();
//!
//! let mut a = vec![1, 2, 3, 4, 5, 6];
//! rng.shuffle(&mut a);
//!
//! rng.restore(&saved);
//! let mut b = vec![1, 2, 3, 4, 5, 6];
//! rng.shuffle(&mut b);
//! assert_eq!(a, b);
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Deterministic RNG backed by ChaCha8.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.inner);
    }

    /// Capture the current position of the stream.
    #[must_use]
    pub fn state(&self) -> GameRngState {
        GameRngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
        }
    }

    /// Rewind (or fast-forward) to a captured position.
    pub fn restore(&mut self, state: &GameRngState) {
        *self = Self::from_state(state);
    }

    #[must_use]
    pub fn from_state(state: &GameRngState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
        }
    }
}

/// Serializable RNG position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRngState {
    pub seed: u64,
    /// ChaCha8 word position (128-bit counter).
    pub word_pos: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_shuffle() {
        let mut rng1 = GameRng::new(7);
        let mut rng2 = GameRng::new(7);

        let mut a: Vec<u32> = (0..20).collect();
        let mut b: Vec<u32> = (0..20).collect();
        rng1.shuffle(&mut a);
        rng2.shuffle(&mut b);

        assert_eq!(a, b);
    }

    #[test]
    fn test_restore_rewinds_stream() {
        let mut rng = GameRng::new(42);
        let mut warmup: Vec<u32> = (0..10).collect();
        rng.shuffle(&mut warmup);

        let saved = rng.state();
        let mut first: Vec<u32> = (0..10).collect();
        rng.shuffle(&mut first);

        rng.restore(&saved);
        let mut second: Vec<u32> = (0..10).collect();
        rng.shuffle(&mut second);

        assert_eq!(first, second);
        assert_eq!(rng.state().seed, 42);
    }

    #[test]
    fn test_state_serde() {
        let state = GameRngState {
            seed: 42,
            word_pos: 12345,
        };

        let json = serde_json::to_string(&state).unwrap();
        let deserialized: GameRngState = serde_json::from_str(&json).unwrap();

        assert_eq!(state, deserialized);
    }
}
