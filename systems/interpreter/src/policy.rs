//! Tie-break policies for a sprite that receives several Move commands in one round.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Decides whether a later non-collision Move replaces one already pending.
///
/// Collision rules always replace and never consult the policy.
pub trait ConflictPolicy {
    /// Returns `true` when the new Move should replace the pending one.
    fn replace_pending(&mut self) -> bool;
}

/// Replaces the pending move with probability one half.
#[derive(Clone, Debug)]
pub struct CoinFlip {
    rng: ChaCha8Rng,
}

impl CoinFlip {
    /// Creates a coin whose flips are fully determined by `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl ConflictPolicy for CoinFlip {
    fn replace_pending(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }
}

/// Keeps the first Move issued to a sprite.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeepFirst;

impl ConflictPolicy for KeepFirst {
    fn replace_pending(&mut self) -> bool {
        false
    }
}

/// Lets the last Move issued to a sprite win.
#[derive(Clone, Copy, Debug, Default)]
pub struct TakeLast;

impl ConflictPolicy for TakeLast {
    fn replace_pending(&mut self) -> bool {
        true
    }
}
