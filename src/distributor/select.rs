//! Selection policies

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub enum Policy {
    /// Cycle through the batch. The index survives reloads and is simply
    /// reduced modulo the new length.
    RoundRobin { index: usize },
    /// Uniformly random pick on every selection
    Random(StdRng),
}

impl Policy {
    pub fn round_robin() -> Self {
        Policy::RoundRobin { index: 0 }
    }

    pub fn random() -> Self {
        Policy::Random(StdRng::from_entropy())
    }

    /// Deterministic random policy
    pub fn random_seeded(seed: u64) -> Self {
        Policy::Random(StdRng::seed_from_u64(seed))
    }

    /// Pick one address, or `None` for an empty batch.
    pub fn select<'a>(&mut self, batch: &'a [String]) -> Option<&'a str> {
        if batch.is_empty() {
            return None;
        }
        let pick = match self {
            Policy::RoundRobin { index } => {
                *index = (*index + 1) % batch.len();
                *index
            }
            Policy::Random(rng) => rng.gen_range(0..batch.len()),
        };
        Some(batch[pick].as_str())
    }
}
