//! Selection policy over ranked candidates
//!
//! Pure functions: the caller supplies the RNG, so tests can seed it.

use rand::seq::SliceRandom;
use rand::Rng;

/// Anything carrying a rank.
pub trait Ranked {
    fn rank(&self) -> i64;
}

impl Ranked for crate::entity::PromptRecord {
    fn rank(&self) -> i64 {
        self.rank
    }
}

/// All candidates sharing the maximum rank.
pub fn top_tier<T: Ranked>(candidates: &[T]) -> Vec<&T> {
    let Some(max) = candidates.iter().map(Ranked::rank).max() else {
        return Vec::new();
    };
    candidates.iter().filter(|c| c.rank() == max).collect()
}

/// Uniform choice within the top tier.
pub fn select_best<'a, T: Ranked, R: Rng + ?Sized>(candidates: &'a [T], rng: &mut R) -> Option<&'a T> {
    top_tier(candidates).choose(rng).copied()
}

/// Uniform choice over every candidate, ignoring rank.
pub fn select_random<'a, T, R: Rng + ?Sized>(candidates: &'a [T], rng: &mut R) -> Option<&'a T> {
    candidates.choose(rng)
}
