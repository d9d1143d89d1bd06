//! Seed derivation for deterministic generation
//!
//! Every random decision in the engine draws from a `ChaCha8Rng` seeded from
//! the caller's seed, a derived label stream, or a structural position. No
//! generator ever touches a global RNG; two peers running the same seed and
//! parameters must produce byte-identical terrain.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Derive a sub-seed from a master seed and a stream label.
pub fn derive_seed(master: u64, label: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    label.hash(&mut hasher);
    hasher.finish()
}

/// Derive a seed for a rectangular region from its structural position.
///
/// Used by recursive algorithms (BSP) so each node gets its own random stream:
/// sibling subtrees stay independent and a node's decisions depend only on the
/// master seed and where the node sits, not on traversal order.
pub fn region_seed(master: u64, x: usize, y: usize, width: usize, height: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    x.hash(&mut hasher);
    y.hash(&mut hasher);
    width.hash(&mut hasher);
    height.hash(&mut hasher);
    hasher.finish()
}

/// Per-stage seeds for the forest pipeline.
///
/// Each stage gets its own stream so tuning one knob (say, water) does not
/// reshuffle the decisions of every later stage.
#[derive(Clone, Debug)]
pub struct ForestSeeds {
    /// Master seed (kept for display/reference)
    pub master: u64,
    /// Clearing placement and sizing
    pub clearings: u64,
    /// Lake/river roll and carving
    pub water: u64,
    /// Poisson-disc tree sampling
    pub trees: u64,
    /// Organic paths between clearings
    pub paths: u64,
}

impl ForestSeeds {
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            clearings: derive_seed(master, "clearings"),
            water: derive_seed(master, "water"),
            trees: derive_seed(master, "trees"),
            paths: derive_seed(master, "paths"),
        }
    }
}
