//! Terrain generation algorithms
//!
//! Four leaf algorithms implement the shared [`Generator`] contract. Each is
//! a pure function of seed + parameters: no global state, no I/O, safe to run
//! concurrently as long as every invocation carries its own inputs.

pub mod bsp;
pub mod cellular;
pub mod forest;
pub mod maze;

use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::params::GenerationParams;
use crate::terrain::Terrain;

pub use bsp::BspGenerator;
pub use cellular::CellularAutomataGenerator;
pub use forest::ForestGenerator;
pub use maze::MazeGenerator;

/// Common contract for all terrain generators.
pub trait Generator {
    /// Produce a complete terrain from a seed and parameters.
    fn generate(&self, seed: u64, params: &GenerationParams) -> Result<Terrain, GenError>;

    /// Check a generated terrain against this algorithm's invariants.
    /// Idempotent: validating twice yields the same outcome.
    fn validate(&self, terrain: &Terrain) -> Result<(), GenError>;

    /// Short algorithm name for logs and errors.
    fn name(&self) -> &'static str;
}

/// Closed set of available algorithms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    #[default]
    Bsp,
    CellularAutomata,
    Maze,
    Forest,
}

impl Algorithm {
    pub fn generator(&self) -> Box<dyn Generator + Send + Sync> {
        match self {
            Algorithm::Bsp => Box::new(BspGenerator),
            Algorithm::CellularAutomata => Box::new(CellularAutomataGenerator),
            Algorithm::Maze => Box::new(MazeGenerator),
            Algorithm::Forest => Box::new(ForestGenerator),
        }
    }

    /// Generate and validate in one step.
    pub fn generate(
        &self,
        seed: u64,
        params: &GenerationParams,
    ) -> Result<Terrain, GenError> {
        let generator = self.generator();
        let terrain = generator.generate(seed, params)?;
        generator.validate(&terrain)?;
        Ok(terrain)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Bsp => "bsp",
            Algorithm::CellularAutomata => "cellular",
            Algorithm::Maze => "maze",
            Algorithm::Forest => "forest",
        }
    }

    pub fn all() -> &'static [Algorithm] {
        &[
            Algorithm::Bsp,
            Algorithm::CellularAutomata,
            Algorithm::Maze,
            Algorithm::Forest,
        ]
    }
}

/// Structural checks shared by every algorithm's `validate`: room/stair
/// bounds, stair tiles and adjacency, and single-component connectivity from
/// the first room center (or any walkable tile for roomless caves).
pub fn validate_terrain(terrain: &Terrain) -> Result<(), GenError> {
    terrain.check_bounds()?;
    terrain.check_stairs()?;

    let start = terrain
        .rooms
        .first()
        .map(|r| r.center())
        .filter(|&c| terrain.is_walkable(c))
        .or_else(|| terrain.first_walkable());

    match start {
        Some(start) => terrain.check_connected_from(start),
        None => Err(GenError::GenerationFailure(
            "terrain has no walkable tiles".to_string(),
        )),
    }
}
