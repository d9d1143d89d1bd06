//! Recursive-backtracking maze generator
//!
//! Carves corridors over a lattice of odd-coordinate cells with an explicit
//! backtracking stack. Even requested dimensions are adjusted up by one (the
//! lattice needs an odd span); this is documented behavior, not an error.
//! Some dead ends grow into small room pockets for variety, and stairs land
//! on the two most distant points of the corridor graph (double BFS sweep) to
//! maximize traversal length.

use std::collections::VecDeque;

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::GenError;
use crate::geometry::Point;
use crate::params::GenerationParams;
use crate::terrain::{Room, RoomKind, Terrain};
use crate::tiles::TileType;

use super::{validate_terrain, Generator};

pub struct MazeGenerator;

impl Generator for MazeGenerator {
    fn generate(&self, seed: u64, params: &GenerationParams) -> Result<Terrain, GenError> {
        params.check_dimensions()?;
        params.check_difficulty()?;
        let room_chance = params.custom_probability("room_chance", 0.15)?;

        // The cell lattice lives on odd coordinates, so spans must be odd.
        let width = if params.width % 2 == 0 { params.width + 1 } else { params.width };
        let height = if params.height % 2 == 0 { params.height + 1 } else { params.height };
        if width < 5 || height < 5 {
            return Err(GenError::InvalidParameters(format!(
                "{}x{} is too small for a maze (need at least 5x5 after parity adjustment)",
                params.width, params.height
            )));
        }

        let mut terrain = Terrain::new(width, height, seed);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        carve_maze(&mut terrain, &mut rng);
        grow_room_pockets(&mut terrain, room_chance, &mut rng);
        place_distant_stairs(&mut terrain);

        Ok(terrain)
    }

    fn validate(&self, terrain: &Terrain) -> Result<(), GenError> {
        if terrain.stairs_up.is_empty() || terrain.stairs_down.is_empty() {
            return Err(GenError::MissingStairs {
                level: terrain.level,
                missing: "maze must place both stair endpoints",
            });
        }
        validate_terrain(terrain)
    }

    fn name(&self) -> &'static str {
        "maze"
    }
}

/// Recursive backtracking over the odd-coordinate cell graph: carve to a
/// random unvisited cell two steps away, removing the wall between, and
/// backtrack when stuck.
fn carve_maze(terrain: &mut Terrain, rng: &mut ChaCha8Rng) {
    let cells_x = terrain.width / 2;
    let cells_y = terrain.height / 2;

    let start = Point::new(
        rng.gen_range(0..cells_x) as i32 * 2 + 1,
        rng.gen_range(0..cells_y) as i32 * 2 + 1,
    );
    terrain.set_tile(start, TileType::Corridor);

    let mut stack = vec![start];
    while let Some(&current) = stack.last() {
        let mut candidates: Vec<Point> = [(0, -2), (0, 2), (-2, 0), (2, 0)]
            .iter()
            .map(|&(dx, dy)| Point::new(current.x + dx, current.y + dy))
            .filter(|p| terrain.in_bounds(*p) && terrain.tile(*p) == TileType::Wall)
            .collect();

        if candidates.is_empty() {
            stack.pop();
            continue;
        }

        candidates.shuffle(rng);
        let next = candidates[0];
        let between = Point::new((current.x + next.x) / 2, (current.y + next.y) / 2);
        terrain.set_tile(between, TileType::Corridor);
        terrain.set_tile(next, TileType::Corridor);
        stack.push(next);
    }
}

/// Expand some dead-end cells into small floor pockets. The pocket overlaps
/// the dead end itself, so it stays attached to the corridor graph.
fn grow_room_pockets(terrain: &mut Terrain, room_chance: f64, rng: &mut ChaCha8Rng) {
    let dead_ends: Vec<Point> = terrain
        .points()
        .filter(|&p| {
            terrain.tile(p) == TileType::Corridor
                && p.neighbors_within(terrain.width, terrain.height)
                    .filter(|&n| terrain.is_walkable(n))
                    .count()
                == 1
        })
        .collect();

    for dead_end in dead_ends {
        if !rng.gen_bool(room_chance) {
            continue;
        }
        let size = rng.gen_range(3..=5usize) as i32;
        let half = size / 2;
        let x0 = (dead_end.x - half).max(1);
        let y0 = (dead_end.y - half).max(1);
        let x1 = (dead_end.x + half).min(terrain.width as i32 - 2);
        let y1 = (dead_end.y + half).min(terrain.height as i32 - 2);
        if x1 < x0 || y1 < y0 {
            continue;
        }
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Point::new(x, y);
                if terrain.tile(p) == TileType::Wall {
                    terrain.set_tile(p, TileType::Floor);
                }
            }
        }
        terrain.rooms.push(Room::new(
            RoomKind::Normal,
            x0 as usize,
            y0 as usize,
            (x1 - x0 + 1) as usize,
            (y1 - y0 + 1) as usize,
        ));
    }
}

/// BFS distances over walkable tiles from `start`; returns the farthest point.
fn bfs_farthest(terrain: &Terrain, start: Point) -> Point {
    let mut dist = vec![usize::MAX; terrain.width * terrain.height];
    let idx = |p: Point| p.y as usize * terrain.width + p.x as usize;
    let mut queue = VecDeque::new();
    dist[idx(start)] = 0;
    queue.push_back(start);
    let mut farthest = start;
    let mut best = 0;

    while let Some(p) = queue.pop_front() {
        let d = dist[idx(p)];
        if d > best {
            best = d;
            farthest = p;
        }
        for n in p.neighbors_within(terrain.width, terrain.height) {
            if terrain.is_walkable(n) && dist[idx(n)] == usize::MAX {
                dist[idx(n)] = d + 1;
                queue.push_back(n);
            }
        }
    }
    farthest
}

/// Double BFS sweep: the two endpoints of an approximate longest path get the
/// stairs, maximizing traversal length between entry and exit.
fn place_distant_stairs(terrain: &mut Terrain) {
    let Some(start) = terrain.first_walkable() else {
        return;
    };
    let a = bfs_farthest(terrain, start);
    let b = bfs_farthest(terrain, a);
    terrain.place_stair(a, TileType::StairsUp);
    terrain.place_stair(b, TileType::StairsDown);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_dimensions_adjust_up() {
        // 40x30 must become 41x31 with no index panic.
        let params = GenerationParams::new(40, 30);
        let terrain = MazeGenerator.generate(1, &params).unwrap();
        assert_eq!(terrain.width, 41);
        assert_eq!(terrain.height, 31);
        MazeGenerator.validate(&terrain).unwrap();
    }

    #[test]
    fn test_odd_dimensions_kept() {
        let params = GenerationParams::new(41, 31);
        let terrain = MazeGenerator.generate(1, &params).unwrap();
        assert_eq!(terrain.width, 41);
        assert_eq!(terrain.height, 31);
    }

    #[test]
    fn test_determinism() {
        let params = GenerationParams::new(41, 31).with_custom("room_chance", 0.3);
        let a = MazeGenerator.generate(555, &params).unwrap();
        let b = MazeGenerator.generate(555, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_maze_is_fully_connected() {
        for seed in [1, 42, 777] {
            let params = GenerationParams::new(31, 21);
            let terrain = MazeGenerator.generate(seed, &params).unwrap();
            let start = terrain.first_walkable().unwrap();
            terrain.check_connected_from(start).unwrap();
        }
    }

    #[test]
    fn test_stairs_are_far_apart() {
        let params = GenerationParams::new(41, 31);
        let terrain = MazeGenerator.generate(9, &params).unwrap();
        assert_eq!(terrain.stairs_up.len(), 1);
        assert_eq!(terrain.stairs_down.len(), 1);
        let up = terrain.stairs_up[0];
        let down = terrain.stairs_down[0];
        // Endpoints of a longest-path approximation should span a good chunk
        // of the map.
        assert!(up.manhattan_distance(down) >= 10);
        terrain.check_stairs().unwrap();
    }

    #[test]
    fn test_room_pockets_record_rooms() {
        let params = GenerationParams::new(41, 31).with_custom("room_chance", 1.0);
        let terrain = MazeGenerator.generate(3, &params).unwrap();
        assert!(!terrain.rooms.is_empty());
        terrain.check_bounds().unwrap();
    }

    #[test]
    fn test_too_small_rejected() {
        let params = GenerationParams::new(2, 2);
        assert!(MazeGenerator.generate(1, &params).is_err());
    }
}
