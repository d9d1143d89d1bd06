//! Forest generator
//!
//! Organic outdoor maps: grassland with Poisson-disc-sampled trees,
//! elliptical clearings, an optional lake or river, winding paths between
//! clearings, and automatic bridges wherever a path crosses water. Each
//! pipeline stage draws from its own seed stream (see [`crate::seeds::ForestSeeds`])
//! so tuning one knob does not reshuffle the rest of the map.
//!
//! `tree_density` controls Poisson-disc *spacing* (`min_dist = 3.0 /
//! sqrt(density)`), not final tile percentage; actual tree coverage ends up
//! far below the parameter value once clearings and paths are carved.

use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::GenError;
use crate::geometry::Point;
use crate::params::GenerationParams;
use crate::seeds::{self, ForestSeeds};
use crate::terrain::{Room, RoomKind, Terrain};
use crate::tiles::TileType;

use super::Generator;

/// Candidate attempts per active point in Poisson-disc sampling.
const POISSON_ATTEMPTS: usize = 30;
/// Minimum distance between a lake center and any clearing center.
const LAKE_CLEARING_DIST: f64 = 15.0;
/// Required walkable fraction of the final map.
const MIN_COVERAGE: f64 = 0.40;
/// Per-step chance of lateral deviation on clearing paths.
const PATH_WANDER: f64 = 0.3;

pub struct ForestGenerator;

/// An elliptical clearing kept free of trees.
#[derive(Clone, Debug)]
struct Clearing {
    center: Point,
    rx: f64,
    ry: f64,
}

impl Clearing {
    fn contains(&self, p: Point, margin: f64) -> bool {
        let dx = (p.x - self.center.x) as f64 / (self.rx + margin);
        let dy = (p.y - self.center.y) as f64 / (self.ry + margin);
        dx * dx + dy * dy <= 1.0
    }

    fn area(&self) -> f64 {
        self.rx * self.ry
    }

    fn bounding_room(&self) -> Room {
        let x0 = (self.center.x as f64 - self.rx).floor().max(0.0) as usize;
        let y0 = (self.center.y as f64 - self.ry).floor().max(0.0) as usize;
        let x1 = (self.center.x as f64 + self.rx).ceil() as usize;
        let y1 = (self.center.y as f64 + self.ry).ceil() as usize;
        Room::new(RoomKind::Normal, x0, y0, x1 - x0 + 1, y1 - y0 + 1)
    }
}

impl Generator for ForestGenerator {
    fn generate(&self, seed: u64, params: &GenerationParams) -> Result<Terrain, GenError> {
        params.check_dimensions()?;
        params.check_difficulty()?;
        let tree_density = params.custom_f64("tree_density", 0.3)?;
        if tree_density <= 0.0 || tree_density > 1.0 {
            return Err(GenError::MalformedCustomParam {
                key: "tree_density".to_string(),
                reason: format!("{tree_density} outside (0, 1]"),
            });
        }
        let clearing_count = params.custom_usize("clearing_count", 4)?.max(1);
        let water_chance = params.custom_probability("water_chance", 0.5)?;

        let stage_seeds = ForestSeeds::from_master(seed);
        let mut terrain = Terrain::filled(params.width, params.height, seed, TileType::Floor);

        let clearings = place_clearings(&terrain, clearing_count, stage_seeds.clearings)
            .ok_or(GenError::NoClearings { algorithm: self.name() })?;

        let mut water_rng = ChaCha8Rng::seed_from_u64(stage_seeds.water);
        if water_rng.gen_bool(water_chance) {
            carve_water(&mut terrain, &clearings, stage_seeds.water, &mut water_rng);
        }

        place_trees(&mut terrain, &clearings, tree_density, stage_seeds.trees);

        let path_tiles = carve_paths(&mut terrain, &clearings, stage_seeds.paths);
        bridge_water_crossings(&mut terrain, &path_tiles);

        finish_clearings(&mut terrain, &clearings);
        Ok(terrain)
    }

    fn validate(&self, terrain: &Terrain) -> Result<(), GenError> {
        if terrain.rooms.is_empty() {
            return Err(GenError::NoClearings { algorithm: self.name() });
        }
        let coverage = terrain.walkable_coverage();
        if coverage < MIN_COVERAGE {
            return Err(GenError::LowCoverage {
                walkable: terrain.walkable_count(),
                total: terrain.width * terrain.height,
                actual_pct: coverage * 100.0,
                required_pct: MIN_COVERAGE * 100.0,
            });
        }
        terrain.check_bounds()?;
        terrain.check_stairs()?;

        // Full single-component connectivity is not required for forests (a
        // river may isolate grass no path visits), but every clearing and
        // every stair must share one component: paths plus bridges guarantee
        // it.
        let start = terrain.rooms[0].center();
        let visited = terrain.flood_fill(start);
        let idx = |p: Point| p.y as usize * terrain.width + p.x as usize;
        for room in &terrain.rooms {
            if !visited[idx(room.center())] {
                return Err(GenError::ConnectivityViolation(format!(
                    "clearing center {:?} unreachable from {:?}",
                    room.center(),
                    start
                )));
            }
        }
        for &stair in terrain.stairs_up.iter().chain(terrain.stairs_down.iter()) {
            if !visited[idx(stair)] {
                return Err(GenError::ConnectivityViolation(format!(
                    "stair {stair:?} unreachable from {start:?}"
                )));
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "forest"
    }
}

/// Scatter 1..=count non-overlapping elliptical clearings, retrying up to 5x
/// the requested count. Returns `None` when not even one fits.
fn place_clearings(terrain: &Terrain, count: usize, seed: u64) -> Option<Vec<Clearing>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut clearings: Vec<Clearing> = Vec::new();

    for _ in 0..count * 5 {
        if clearings.len() >= count {
            break;
        }
        let rx: f64 = rng.gen_range(3.0..7.0);
        let ry: f64 = rng.gen_range(3.0..7.0);
        let margin_x = rx.ceil() as i32 + 2;
        let margin_y = ry.ceil() as i32 + 2;
        if terrain.width as i32 <= margin_x * 2 || terrain.height as i32 <= margin_y * 2 {
            continue;
        }
        let center = Point::new(
            rng.gen_range(margin_x..terrain.width as i32 - margin_x),
            rng.gen_range(margin_y..terrain.height as i32 - margin_y),
        );
        let candidate = Clearing { center, rx, ry };
        let overlaps = clearings.iter().any(|c| {
            let reach = c.rx.max(c.ry) + candidate.rx.max(candidate.ry) + 2.0;
            c.center.distance(candidate.center) < reach
        });
        if !overlaps {
            clearings.push(candidate);
        }
    }

    if clearings.is_empty() {
        None
    } else {
        Some(clearings)
    }
}

/// Carve either a lake or a river. A lake needs a spot far enough from every
/// clearing; when none is found a river is carved instead,
/// which has no placement constraint.
fn carve_water(
    terrain: &mut Terrain,
    clearings: &[Clearing],
    seed: u64,
    rng: &mut ChaCha8Rng,
) {
    if rng.gen_bool(0.5) {
        for _ in 0..20 {
            let rx = rng.gen_range(5.0..9.0);
            let ry = rng.gen_range(5.0..9.0);
            let center = Point::new(
                rng.gen_range(2..terrain.width as i32 - 2),
                rng.gen_range(2..terrain.height as i32 - 2),
            );
            let clear = clearings
                .iter()
                .all(|c| c.center.distance(center) >= LAKE_CLEARING_DIST);
            if clear {
                carve_lake(terrain, center, rx, ry, seed);
                return;
            }
        }
    }
    carve_river(terrain, clearings, seed, rng);
}

/// Elliptical lake with a Perlin-perturbed shoreline: deep water inside the
/// ellipse shrunk by 30%, shallow water in the remaining ring.
fn carve_lake(terrain: &mut Terrain, center: Point, rx: f64, ry: f64, seed: u64) {
    let perlin = Perlin::new(seed as u32);
    let reach_x = (rx * 1.4).ceil() as i32;
    let reach_y = (ry * 1.4).ceil() as i32;

    for dy in -reach_y..=reach_y {
        for dx in -reach_x..=reach_x {
            let p = Point::new(center.x + dx, center.y + dy);
            if !terrain.in_bounds(p) {
                continue;
            }
            let nx = dx as f64 / rx;
            let ny = dy as f64 / ry;
            let dist = (nx * nx + ny * ny).sqrt();
            // Sample noise on the unit circle so the wobble is continuous
            // around the shoreline.
            let angle = (dy as f64).atan2(dx as f64);
            let wobble = 1.0 + perlin.get([angle.cos() * 1.3, angle.sin() * 1.3]) * 0.25;
            if dist <= 0.7 * wobble {
                terrain.set_tile(p, TileType::WaterDeep);
            } else if dist <= wobble {
                terrain.set_tile(p, TileType::WaterShallow);
            }
        }
    }
}

/// Noise-steered river of width 2-3 from one map edge to the opposite edge.
/// Width-3 stretches get a deep centerline, except inside clearings where the
/// river stays shallow (a ford), keeping clearing interiors traversable.
fn carve_river(
    terrain: &mut Terrain,
    clearings: &[Clearing],
    seed: u64,
    rng: &mut ChaCha8Rng,
) {
    let perlin = Perlin::new(seeds::derive_seed(seed, "river") as u32);
    let vertical = rng.gen_bool(0.5);

    if vertical {
        let mut x = rng.gen_range(terrain.width as i32 / 4..terrain.width as i32 * 3 / 4);
        for y in 0..terrain.height as i32 {
            let drift = perlin.get([y as f64 * 0.09, 0.5]);
            if drift > 0.15 {
                x += 1;
            } else if drift < -0.15 {
                x -= 1;
            }
            x = x.clamp(1, terrain.width as i32 - 2);
            let wide = perlin.get([y as f64 * 0.2, 7.3]) > 0.0;
            let span = if wide { 3 } else { 2 };
            for i in 0..span {
                let p = Point::new(x + i - span / 2, y);
                let ford = clearings.iter().any(|c| c.contains(p, 0.0));
                let tile = if wide && i == 1 && !ford {
                    TileType::WaterDeep
                } else {
                    TileType::WaterShallow
                };
                terrain.set_tile(p, tile);
            }
        }
    } else {
        let mut y = rng.gen_range(terrain.height as i32 / 4..terrain.height as i32 * 3 / 4);
        for x in 0..terrain.width as i32 {
            let drift = perlin.get([x as f64 * 0.09, 0.5]);
            if drift > 0.15 {
                y += 1;
            } else if drift < -0.15 {
                y -= 1;
            }
            y = y.clamp(1, terrain.height as i32 - 2);
            let wide = perlin.get([x as f64 * 0.2, 7.3]) > 0.0;
            let span = if wide { 3 } else { 2 };
            for i in 0..span {
                let p = Point::new(x, y + i - span / 2);
                let ford = clearings.iter().any(|c| c.contains(p, 0.0));
                let tile = if wide && i == 1 && !ford {
                    TileType::WaterDeep
                } else {
                    TileType::WaterShallow
                };
                terrain.set_tile(p, tile);
            }
        }
    }
}

/// Grid-bucketed Poisson-disc sampling (Bridson's active-list algorithm,
/// O(n)) over the remaining grassland. Clearings and water are skipped.
fn place_trees(terrain: &mut Terrain, clearings: &[Clearing], density: f64, seed: u64) {
    let min_dist = 3.0 / density.sqrt();
    let cell = min_dist / std::f64::consts::SQRT_2;
    let grid_w = (terrain.width as f64 / cell).ceil() as usize;
    let grid_h = (terrain.height as f64 / cell).ceil() as usize;
    let mut buckets: Vec<Option<Point>> = vec![None; grid_w * grid_h];
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let bucket_of = |p: Point| {
        let bx = (p.x as f64 / cell).floor() as usize;
        let by = (p.y as f64 / cell).floor() as usize;
        by.min(grid_h - 1) * grid_w + bx.min(grid_w - 1)
    };
    let valid = |terrain: &Terrain, p: Point| {
        terrain.in_bounds(p)
            && terrain.tile(p) == TileType::Floor
            && !clearings.iter().any(|c| c.contains(p, 1.0))
    };
    let far_enough = |buckets: &[Option<Point>], p: Point| {
        let bx = (p.x as f64 / cell).floor() as i64;
        let by = (p.y as f64 / cell).floor() as i64;
        for ny in (by - 2)..=(by + 2) {
            for nx in (bx - 2)..=(bx + 2) {
                if nx < 0 || ny < 0 || nx >= grid_w as i64 || ny >= grid_h as i64 {
                    continue;
                }
                if let Some(q) = buckets[ny as usize * grid_w + nx as usize] {
                    if q.distance(p) < min_dist {
                        return false;
                    }
                }
            }
        }
        true
    };

    // Find an initial sample on open grassland.
    let mut first = None;
    for _ in 0..100 {
        let p = Point::new(
            rng.gen_range(0..terrain.width as i32),
            rng.gen_range(0..terrain.height as i32),
        );
        if valid(terrain, p) {
            first = Some(p);
            break;
        }
    }
    let Some(first) = first else {
        return;
    };

    let mut samples = vec![first];
    let mut active = vec![first];
    buckets[bucket_of(first)] = Some(first);

    while !active.is_empty() {
        let slot = rng.gen_range(0..active.len());
        let base = active[slot];
        let mut placed = false;
        for _ in 0..POISSON_ATTEMPTS {
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            let radius = (rng.gen_range(0.0..1.0f64)
                * (4.0 * min_dist * min_dist - min_dist * min_dist)
                + min_dist * min_dist)
                .sqrt();
            let candidate = Point::new(
                (base.x as f64 + angle.cos() * radius).round() as i32,
                (base.y as f64 + angle.sin() * radius).round() as i32,
            );
            if valid(terrain, candidate) && far_enough(&buckets, candidate) {
                buckets[bucket_of(candidate)] = Some(candidate);
                samples.push(candidate);
                active.push(candidate);
                placed = true;
                break;
            }
        }
        if !placed {
            active.swap_remove(slot);
        }
    }

    for p in samples {
        terrain.set_tile(p, TileType::Tree);
    }
}

/// Connect every clearing pair with an organic path: a Manhattan-biased walk
/// toward the target with a 30% per-step lateral deviation. Trees on the path
/// are cleared; water is preserved (crossings get bridged afterwards).
/// Returns every tile the paths visited.
fn carve_paths(terrain: &mut Terrain, clearings: &[Clearing], seed: u64) -> Vec<Point> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut path_tiles = Vec::new();

    for i in 0..clearings.len() {
        for j in (i + 1)..clearings.len() {
            walk_path(
                terrain,
                clearings[i].center,
                clearings[j].center,
                &mut rng,
                &mut path_tiles,
            );
        }
    }
    path_tiles
}

fn walk_path(
    terrain: &mut Terrain,
    from: Point,
    to: Point,
    rng: &mut ChaCha8Rng,
    path_tiles: &mut Vec<Point>,
) {
    let carve = |terrain: &mut Terrain, p: Point, tiles: &mut Vec<Point>| {
        if terrain.tile(p) == TileType::Tree {
            terrain.set_tile(p, TileType::Floor);
        }
        tiles.push(p);
    };

    let mut p = from;
    carve(terrain, p, path_tiles);

    let max_steps = terrain.width * terrain.height * 4;
    for _ in 0..max_steps {
        if p == to {
            return;
        }
        let dx = to.x - p.x;
        let dy = to.y - p.y;
        let toward_x = dx.abs() >= dy.abs();

        let (sx, sy) = if rng.gen_bool(PATH_WANDER) {
            // Lateral wobble perpendicular to the dominant direction.
            if toward_x {
                (0, if rng.gen_bool(0.5) { 1 } else { -1 })
            } else {
                (if rng.gen_bool(0.5) { 1 } else { -1 }, 0)
            }
        } else if toward_x {
            (dx.signum(), 0)
        } else {
            (0, dy.signum())
        };

        let next = Point::new(p.x + sx, p.y + sy);
        if terrain.in_bounds(next) {
            p = next;
            carve(terrain, p, path_tiles);
        }
    }

    // Step limit hit (pathological wobble): finish with straight legs.
    while p.x != to.x {
        p.x += (to.x - p.x).signum();
        carve(terrain, p, path_tiles);
    }
    while p.y != to.y {
        p.y += (to.y - p.y).signum();
        carve(terrain, p, path_tiles);
    }
}

/// Convert path tiles that landed on water into bridges. A path crosses a
/// river with orthogonal steps, so every water tile it visits becomes part of
/// a contiguous bridge and the path stays walkable end to end.
fn bridge_water_crossings(terrain: &mut Terrain, path_tiles: &[Point]) {
    for &p in path_tiles {
        if terrain.tile(p).is_water() {
            terrain.set_tile(p, TileType::Bridge);
        }
    }
}

/// Record clearings as rooms and put the stairs in the two largest ones.
fn finish_clearings(terrain: &mut Terrain, clearings: &[Clearing]) {
    let mut order: Vec<usize> = (0..clearings.len()).collect();
    order.sort_by(|&a, &b| {
        clearings[b]
            .area()
            .partial_cmp(&clearings[a].area())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut rooms: Vec<Room> = clearings.iter().map(|c| c.bounding_room()).collect();
    rooms[order[0]].kind = RoomKind::Spawn;
    if order.len() > 1 {
        rooms[order[1]].kind = RoomKind::Exit;
    }
    terrain.rooms = rooms;

    let up = clearings[order[0]].center;
    terrain.place_stair(up, TileType::StairsUp);
    if order.len() > 1 {
        terrain.place_stair(clearings[order[1]].center, TileType::StairsDown);
    } else {
        // Single clearing: the down stair sits beside the up stair.
        let down = up
            .neighbors_within(terrain.width, terrain.height)
            .find(|&n| terrain.is_walkable(n))
            .unwrap_or(Point::new(up.x + 1, up.y));
        terrain.place_stair(down, TileType::StairsDown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let params = GenerationParams::new(60, 40).with_custom("water_chance", 1.0);
        let a = ForestGenerator.generate(99999, &params).unwrap();
        let b = ForestGenerator.generate(99999, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_forest_with_guaranteed_water() {
        // water_chance 1.0 always carves a lake or river, and the result
        // still validates: clearings stay mutually reachable via bridged
        // paths.
        let params = GenerationParams::new(60, 40).with_custom("water_chance", 1.0);
        let terrain = ForestGenerator.generate(99999, &params).unwrap();
        ForestGenerator.validate(&terrain).unwrap();
        let water = terrain.points().filter(|&p| terrain.tile(p).is_water()).count();
        assert!(water > 0, "water_chance 1.0 must produce water");
    }

    #[test]
    fn test_validation_across_seeds() {
        let params = GenerationParams::new(60, 40).with_custom("water_chance", 1.0);
        for seed in [1, 7, 42, 1234, 99999] {
            let terrain = ForestGenerator.generate(seed, &params).unwrap();
            ForestGenerator.validate(&terrain).unwrap();
        }
    }

    #[test]
    fn test_bridge_pass_makes_crossings_walkable() {
        // Vertical river splits the map; a path over it must end up bridged.
        let mut terrain = Terrain::filled(21, 9, 0, TileType::Floor);
        for y in 0..9 {
            terrain.set_tile(Point::new(10, y), TileType::WaterShallow);
            terrain.set_tile(Point::new(11, y), TileType::WaterDeep);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut path = Vec::new();
        walk_path(&mut terrain, Point::new(2, 4), Point::new(18, 4), &mut rng, &mut path);
        bridge_water_crossings(&mut terrain, &path);

        // Both banks connected again
        let reached = terrain.flood_fill(Point::new(2, 4));
        assert!(reached[4 * 21 + 18], "far bank unreachable after bridging");
        assert!(
            terrain.points().any(|p| terrain.tile(p) == TileType::Bridge),
            "no bridge was placed"
        );
    }

    #[test]
    fn test_trees_respect_poisson_spacing() {
        let params = GenerationParams::new(60, 40)
            .with_custom("water_chance", 0.0)
            .with_custom("tree_density", 0.3);
        let terrain = ForestGenerator.generate(5, &params).unwrap();
        let min_dist = 3.0 / 0.3f64.sqrt();
        let trees: Vec<Point> = terrain
            .points()
            .filter(|&p| terrain.tile(p) == TileType::Tree)
            .collect();
        assert!(!trees.is_empty());
        for (i, &a) in trees.iter().enumerate() {
            for &b in &trees[i + 1..] {
                assert!(
                    a.distance(b) >= min_dist - 1.0,
                    "trees {a:?} and {b:?} closer than the Poisson spacing"
                );
            }
        }
    }

    #[test]
    fn test_trees_stay_out_of_clearings() {
        let params = GenerationParams::new(60, 40).with_custom("water_chance", 0.0);
        let terrain = ForestGenerator.generate(11, &params).unwrap();
        for room in &terrain.rooms {
            let c = room.center();
            assert_ne!(terrain.tile(c), TileType::Tree, "tree at clearing center");
        }
    }

    #[test]
    fn test_stairs_in_clearings() {
        let params = GenerationParams::new(60, 40);
        let terrain = ForestGenerator.generate(21, &params).unwrap();
        assert_eq!(terrain.stairs_up.len(), 1);
        assert_eq!(terrain.stairs_down.len(), 1);
        terrain.check_stairs().unwrap();
    }

    #[test]
    fn test_rejects_bad_density() {
        let params = GenerationParams::new(60, 40).with_custom("tree_density", 0.0);
        assert!(matches!(
            ForestGenerator.generate(1, &params),
            Err(GenError::MalformedCustomParam { .. })
        ));
    }

    #[test]
    fn test_coverage_stays_above_threshold() {
        let params = GenerationParams::new(80, 50)
            .with_custom("tree_density", 1.0)
            .with_custom("water_chance", 1.0);
        let terrain = ForestGenerator.generate(17, &params).unwrap();
        assert!(terrain.walkable_coverage() >= MIN_COVERAGE);
    }
}
