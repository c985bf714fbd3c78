//! Seeded random interleaving.
//!
//! Message delivery order is the only nondeterminism the protocol faces, so
//! the scheduler is where randomness enters the harness: a seeded ChaCha
//! stream, never ambient entropy. A failure found under a random schedule is
//! reproducible from its seed alone.

use forklore_core::error::NodeError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::world::World;

/// Drives a [`World`] by delivering in-flight messages in a seeded random
/// order.
#[derive(Debug)]
pub struct Interleaver {
    rng: ChaCha8Rng,
}

impl Interleaver {
    /// Interleaver with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Deliver one message on a uniformly chosen busy link.
    ///
    /// Returns `Ok(false)` when the world is quiescent.
    ///
    /// # Errors
    ///
    /// Propagates the receiving node's [`NodeError`]; in a legal run
    /// delivery never fails.
    pub fn step(&mut self, world: &mut World) -> Result<bool, NodeError> {
        let busy = world.busy_links();
        if busy.is_empty() {
            return Ok(false);
        }
        let (from, to) = busy[self.rng.gen_range(0..busy.len())];
        world.deliver_one(from, to)?;
        Ok(true)
    }

    /// Deliver until the world is quiescent.
    ///
    /// Returns the number of messages delivered.
    ///
    /// # Errors
    ///
    /// Propagates the first delivery failure.
    pub fn run_to_quiescence(&mut self, world: &mut World) -> Result<usize, NodeError> {
        let mut delivered = 0;
        while self.step(world)? {
            delivered += 1;
        }
        Ok(delivered)
    }
}
