//! Rating synthesis: a decaying-from-5.0 ladder across a product batch.
//!
//! The first two positions are pinned to 5.0; later positions take a small
//! random deduction from a running base that drops by a fixed 0.1 per rated
//! position. The base has no lower bound; very long batches can decay below
//! 1.0 and eventually below zero.

use rand::Rng;

pub const INITIAL_BASE: f64 = 5.0;
const PINNED_POSITIONS: usize = 2;
const BASE_DECREMENT: f64 = 0.1;
const MAX_JITTER: f64 = 0.1;

/// Carries the running base across one ingestion loop.
#[derive(Debug, Clone)]
pub struct RatingLadder {
    base: f64,
}

impl Default for RatingLadder {
    fn default() -> Self {
        Self::new()
    }
}

impl RatingLadder {
    pub fn new() -> Self {
        Self { base: INITIAL_BASE }
    }

    /// Rating for the product at `position` within the batch. Positions 0
    /// and 1 return exactly 5.0 and leave the base untouched; later
    /// positions jitter off the base, then decrement it.
    pub fn rate<R: Rng>(&mut self, position: usize, rng: &mut R) -> f64 {
        if position < PINNED_POSITIONS {
            return INITIAL_BASE;
        }
        let rating = round_to_tenth(self.base - rng.gen_range(0.0..MAX_JITTER));
        self.base -= BASE_DECREMENT;
        rating
    }

    pub fn base(&self) -> f64 {
        self.base
    }
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
