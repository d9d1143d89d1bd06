//! Multi-level dungeon orchestration
//!
//! Composes per-depth generators into a connected dungeon: derives a seed and
//! difficulty per level, generates all levels (in parallel: levels are
//! independent until stair wiring), then wires StairsDown/StairsUp pairs
//! between consecutive levels and validates the whole chain. Stair wiring
//! only adds stair tiles and appends to stair lists; it never moves existing
//! geometry.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::generators::Algorithm;
use crate::geometry::Point;
use crate::params::GenerationParams;
use crate::seeds;
use crate::terrain::{RoomKind, Terrain};
use crate::tiles::TileType;

pub const MIN_LEVELS: usize = 1;
pub const MAX_LEVELS: usize = 20;

/// Search radius when aligning a lower stair under an upper one.
const ALIGN_RADIUS: f64 = 10.0;

/// How stairs are placed when wiring two adjacent levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StairPlacement {
    /// Place the down stair at a room center (or any walkable tile) and align
    /// the matching up stair within a 10-tile radius of its projection.
    #[default]
    Aligned,
    /// Uniformly random walkable tiles on both levels.
    Random,
    /// Prefer rooms of a given kind on both levels.
    RoomTargeted(RoomKind),
    /// Opposite corners: down toward the bottom-right, up toward the
    /// top-left.
    Symmetric,
}

/// Per-depth algorithm selection plus stair placement strategy.
#[derive(Clone, Debug)]
pub struct DungeonGenerator {
    default_algorithm: Algorithm,
    per_depth: HashMap<usize, Algorithm>,
    placement: StairPlacement,
}

impl Default for DungeonGenerator {
    fn default() -> Self {
        Self::new(Algorithm::Bsp)
    }
}

impl DungeonGenerator {
    pub fn new(default_algorithm: Algorithm) -> Self {
        Self {
            default_algorithm,
            per_depth: HashMap::new(),
            placement: StairPlacement::Aligned,
        }
    }

    /// Use a different algorithm for one depth (mixed dungeons).
    pub fn with_level_algorithm(mut self, depth: usize, algorithm: Algorithm) -> Self {
        self.per_depth.insert(depth, algorithm);
        self
    }

    pub fn with_stair_placement(mut self, placement: StairPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn algorithm_for(&self, depth: usize) -> Algorithm {
        self.per_depth
            .get(&depth)
            .copied()
            .unwrap_or(self.default_algorithm)
    }

    /// Generate `num_levels` levels and wire them into one dungeon.
    pub fn generate(
        &self,
        num_levels: usize,
        seed: u64,
        params: &GenerationParams,
    ) -> Result<Vec<Terrain>, GenError> {
        if !(MIN_LEVELS..=MAX_LEVELS).contains(&num_levels) {
            return Err(GenError::LevelCountOutOfRange {
                requested: num_levels,
                min: MIN_LEVELS,
                max: MAX_LEVELS,
            });
        }
        params.check_dimensions()?;
        params.check_difficulty()?;

        // Levels are independent of each other's tiles, so generation runs in
        // parallel; stair wiring below needs both terrains of a pair and runs
        // after the barrier.
        let mut levels: Vec<Terrain> = (0..num_levels)
            .into_par_iter()
            .map(|depth| {
                let mut level_params = params.clone();
                level_params.depth = depth;
                level_params.difficulty = effective_difficulty(params.difficulty, depth);
                let mut terrain = self
                    .algorithm_for(depth)
                    .generate(level_seed(seed, depth), &level_params)?;
                terrain.level = depth;
                Ok(terrain)
            })
            .collect::<Result<Vec<_>, GenError>>()?;

        for depth in 0..num_levels.saturating_sub(1) {
            let (head, tail) = levels.split_at_mut(depth + 1);
            connect_levels(&mut head[depth], &mut tail[0], self.placement, seed)?;
        }

        validate_multi_level(&levels)?;
        Ok(levels)
    }
}

/// Generate a multi-level dungeon with the default (BSP) generator for every
/// depth and aligned stair placement.
pub fn generate_multi_level(
    num_levels: usize,
    seed: u64,
    params: &GenerationParams,
) -> Result<Vec<Terrain>, GenError> {
    DungeonGenerator::default().generate(num_levels, seed, params)
}

/// Seed for level `depth`, derived from the dungeon seed.
pub fn level_seed(seed: u64, depth: usize) -> u64 {
    seed.wrapping_add(depth as u64 * 1000)
}

/// Difficulty ramps 0.1 per depth, clamped to [0.0, 1.0].
pub fn effective_difficulty(base: f64, depth: usize) -> f64 {
    (base + depth as f64 * 0.1).clamp(0.0, 1.0)
}

/// Wire one StairsDown in `upper` to one StairsUp in `lower`.
pub fn connect_levels(
    upper: &mut Terrain,
    lower: &mut Terrain,
    placement: StairPlacement,
    master: u64,
) -> Result<(), GenError> {
    let mut rng = ChaCha8Rng::seed_from_u64(
        seeds::derive_seed(master, "stairs").wrapping_add(upper.level as u64),
    );

    let (down, up) = match placement {
        StairPlacement::Aligned => {
            let down = room_center_or_walkable(upper, &mut rng)
                .ok_or_else(|| no_stair_spot(upper.level))?;
            // Align the up stair under the down stair's (x, y) projection,
            // preferring room centers, then any walkable tile in the radius,
            // then any walkable tile at all.
            let up = aligned_position(lower, down)
                .ok_or_else(|| no_stair_spot(lower.level))?;
            (down, up)
        }
        StairPlacement::Random => {
            let down = random_walkable(upper, &mut rng)
                .ok_or_else(|| no_stair_spot(upper.level))?;
            let up = random_walkable(lower, &mut rng)
                .ok_or_else(|| no_stair_spot(lower.level))?;
            (down, up)
        }
        StairPlacement::RoomTargeted(kind) => {
            let down = targeted_room_center(upper, kind, &mut rng)
                .ok_or_else(|| no_stair_spot(upper.level))?;
            let up = targeted_room_center(lower, kind, &mut rng)
                .ok_or_else(|| no_stair_spot(lower.level))?;
            (down, up)
        }
        StairPlacement::Symmetric => {
            let down_corner = Point::new(upper.width as i32 - 1, upper.height as i32 - 1);
            let up_corner = Point::new(0, 0);
            let down = nearest_walkable(upper, down_corner)
                .ok_or_else(|| no_stair_spot(upper.level))?;
            let up = nearest_walkable(lower, up_corner)
                .ok_or_else(|| no_stair_spot(lower.level))?;
            (down, up)
        }
    };

    upper.place_stair(down, TileType::StairsDown);
    lower.place_stair(up, TileType::StairsUp);
    Ok(())
}

/// Enforce dungeon chain integrity: the top level needs a way down, the
/// bottom level a way up, interior levels both; every stair must carry the
/// right tile and touch a walkable neighbor.
pub fn validate_multi_level(levels: &[Terrain]) -> Result<(), GenError> {
    if levels.is_empty() {
        return Err(GenError::LevelCountOutOfRange {
            requested: 0,
            min: MIN_LEVELS,
            max: MAX_LEVELS,
        });
    }

    for terrain in levels {
        terrain.check_stairs()?;
    }

    let last = levels.len() - 1;
    for (depth, terrain) in levels.iter().enumerate() {
        if levels.len() > 1 && depth == 0 && terrain.stairs_down.is_empty() {
            return Err(GenError::MissingStairs { level: depth, missing: "stairs down" });
        }
        if levels.len() > 1 && depth == last && terrain.stairs_up.is_empty() {
            return Err(GenError::MissingStairs { level: depth, missing: "stairs up" });
        }
        if depth > 0 && depth < last {
            if terrain.stairs_down.is_empty() {
                return Err(GenError::MissingStairs { level: depth, missing: "stairs down" });
            }
            if terrain.stairs_up.is_empty() {
                return Err(GenError::MissingStairs { level: depth, missing: "stairs up" });
            }
        }
    }
    Ok(())
}

fn no_stair_spot(level: usize) -> GenError {
    GenError::ConnectivityViolation(format!("level {level} has no usable stair position"))
}

/// Walkable tiles that can host a stair: not already stairs, with at least
/// one walkable orthogonal neighbor.
fn stair_candidates(terrain: &Terrain) -> impl Iterator<Item = Point> + '_ {
    terrain.points().filter(|&p| {
        terrain.is_walkable(p)
            && !terrain.tile(p).is_stairs()
            && terrain.has_walkable_neighbor(p)
    })
}

fn random_walkable(terrain: &Terrain, rng: &mut ChaCha8Rng) -> Option<Point> {
    let candidates: Vec<Point> = stair_candidates(terrain).collect();
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.gen_range(0..candidates.len())])
    }
}

fn room_center_or_walkable(terrain: &Terrain, rng: &mut ChaCha8Rng) -> Option<Point> {
    let centers: Vec<Point> = terrain
        .rooms
        .iter()
        .map(|r| r.center())
        .filter(|&c| terrain.is_walkable(c) && !terrain.tile(c).is_stairs())
        .collect();
    if !centers.is_empty() {
        return Some(centers[rng.gen_range(0..centers.len())]);
    }
    random_walkable(terrain, rng)
}

fn targeted_room_center(
    terrain: &Terrain,
    kind: RoomKind,
    rng: &mut ChaCha8Rng,
) -> Option<Point> {
    terrain
        .rooms
        .iter()
        .find(|r| r.kind == kind)
        .map(|r| r.center())
        .filter(|&c| terrain.is_walkable(c) && !terrain.tile(c).is_stairs())
        .or_else(|| room_center_or_walkable(terrain, rng))
}

/// Best position for the aligned strategy: room centers within the search
/// radius of the projection first, then the closest walkable tile inside the
/// radius, then any walkable tile.
fn aligned_position(terrain: &Terrain, projection: Point) -> Option<Point> {
    let in_radius_center = terrain
        .rooms
        .iter()
        .map(|r| r.center())
        .filter(|&c| {
            c.distance(projection) <= ALIGN_RADIUS
                && terrain.is_walkable(c)
                && !terrain.tile(c).is_stairs()
        })
        .min_by(|a, b| {
            a.distance(projection)
                .partial_cmp(&b.distance(projection))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    if in_radius_center.is_some() {
        return in_radius_center;
    }

    let in_radius = stair_candidates(terrain)
        .filter(|p| p.distance(projection) <= ALIGN_RADIUS)
        .min_by(|a, b| {
            a.distance(projection)
                .partial_cmp(&b.distance(projection))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    if in_radius.is_some() {
        return in_radius;
    }

    nearest_walkable(terrain, projection)
}

/// Closest stair-capable tile to `target`; ties break in row-major order so
/// the choice is deterministic.
fn nearest_walkable(terrain: &Terrain, target: Point) -> Option<Point> {
    stair_candidates(terrain).min_by(|a, b| {
        a.distance(target)
            .partial_cmp(&b.distance(target))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_level_dungeon_scenario() {
        let params = GenerationParams::new(50, 40);
        let levels = generate_multi_level(5, 42, &params).unwrap();
        assert_eq!(levels.len(), 5);
        for (depth, terrain) in levels.iter().enumerate() {
            assert_eq!(terrain.level, depth);
        }
        validate_multi_level(&levels).unwrap();
    }

    #[test]
    fn test_level_count_bounds() {
        let params = GenerationParams::new(40, 30);
        assert!(matches!(
            generate_multi_level(0, 1, &params),
            Err(GenError::LevelCountOutOfRange { .. })
        ));
        assert!(matches!(
            generate_multi_level(21, 1, &params),
            Err(GenError::LevelCountOutOfRange { .. })
        ));
        assert!(generate_multi_level(1, 1, &params).is_ok());
    }

    #[test]
    fn test_determinism_across_runs() {
        // Parallel generation must not leak scheduling order into the output.
        let params = GenerationParams::new(50, 40);
        let a = generate_multi_level(4, 2024, &params).unwrap();
        let b = generate_multi_level(4, 2024, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_level_seed_formula() {
        assert_eq!(level_seed(42, 0), 42);
        assert_eq!(level_seed(42, 3), 3042);
        // Wrapping, not panicking, near the top of the range
        let _ = level_seed(u64::MAX, 19);
    }

    #[test]
    fn test_difficulty_ramp_saturates() {
        assert_eq!(effective_difficulty(0.3, 0), 0.3);
        assert!((effective_difficulty(0.3, 2) - 0.5).abs() < 1e-9);
        assert_eq!(effective_difficulty(0.8, 5), 1.0);
        assert_eq!(effective_difficulty(-0.5, 0), 0.0);
    }

    #[test]
    fn test_out_of_range_difficulty_is_an_error() {
        let mut params = GenerationParams::new(40, 30);
        params.difficulty = -1.0;
        assert!(matches!(
            generate_multi_level(2, 42, &params),
            Err(GenError::InvalidParameters(_))
        ));
        params.difficulty = 2.0;
        assert!(matches!(
            generate_multi_level(2, 42, &params),
            Err(GenError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_chain_integrity() {
        let params = GenerationParams::new(50, 40);
        let levels = generate_multi_level(3, 7, &params).unwrap();
        assert!(!levels[0].stairs_down.is_empty());
        assert!(!levels[1].stairs_down.is_empty());
        assert!(!levels[1].stairs_up.is_empty());
        assert!(!levels[2].stairs_up.is_empty());
    }

    #[test]
    fn test_mixed_dungeon() {
        let params = GenerationParams::new(51, 41);
        let levels = DungeonGenerator::new(Algorithm::Bsp)
            .with_level_algorithm(1, Algorithm::CellularAutomata)
            .with_level_algorithm(2, Algorithm::Maze)
            .generate(3, 99, &params)
            .unwrap();
        validate_multi_level(&levels).unwrap();
        // The maze level keeps its own max-distance stairs plus the wired one
        assert!(!levels[2].stairs_up.is_empty());
    }

    #[test]
    fn test_placement_strategies_all_validate() {
        let params = GenerationParams::new(50, 40);
        for placement in [
            StairPlacement::Aligned,
            StairPlacement::Random,
            StairPlacement::RoomTargeted(RoomKind::Exit),
            StairPlacement::Symmetric,
        ] {
            let levels = DungeonGenerator::new(Algorithm::Bsp)
                .with_stair_placement(placement)
                .generate(3, 11, &params)
                .unwrap();
            validate_multi_level(&levels).unwrap();
        }
    }

    #[test]
    fn test_aligned_wiring_on_open_maps() {
        // On fully open terrains the up stair must land exactly under the
        // down stair's projection.
        let mut upper = Terrain::filled(30, 20, 0, TileType::Floor);
        let mut lower = Terrain::filled(30, 20, 0, TileType::Floor);
        connect_levels(&mut upper, &mut lower, StairPlacement::Aligned, 5).unwrap();
        assert_eq!(upper.stairs_down.len(), 1);
        assert_eq!(lower.stairs_up.len(), 1);
        let down = upper.stairs_down[0];
        let up = lower.stairs_up[0];
        assert!(down.distance(up) <= ALIGN_RADIUS);
    }

    #[test]
    fn test_symmetric_places_opposite_corners() {
        let mut upper = Terrain::filled(30, 20, 0, TileType::Floor);
        let mut lower = Terrain::filled(30, 20, 0, TileType::Floor);
        connect_levels(&mut upper, &mut lower, StairPlacement::Symmetric, 5).unwrap();
        assert_eq!(upper.stairs_down[0], Point::new(29, 19));
        assert_eq!(lower.stairs_up[0], Point::new(0, 0));
    }

    #[test]
    fn test_single_level_needs_no_stairs() {
        let params = GenerationParams::new(40, 30);
        let levels = generate_multi_level(1, 3, &params).unwrap();
        assert_eq!(levels.len(), 1);
        validate_multi_level(&levels).unwrap();
    }

    #[test]
    fn test_missing_stairs_detected() {
        let levels = vec![
            Terrain::filled(10, 10, 0, TileType::Floor),
            Terrain::filled(10, 10, 0, TileType::Floor),
        ];
        assert!(matches!(
            validate_multi_level(&levels),
            Err(GenError::MissingStairs { level: 0, .. })
        ));
    }
}
