//! Cellular automata cave generator
//!
//! Seeds the grid with random wall/floor at a configurable fill probability,
//! smooths it with iterated 8-neighbor majority passes, then keeps only the
//! largest connected floor component so the connectivity guarantee holds by
//! construction. Caves have no rooms; validation flood-fills from any
//! walkable tile.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::GenError;
use crate::geometry::Point;
use crate::params::GenerationParams;
use crate::terrain::Terrain;
use crate::tiles::TileType;

use super::{validate_terrain, Generator};

pub struct CellularAutomataGenerator;

impl Generator for CellularAutomataGenerator {
    fn generate(&self, seed: u64, params: &GenerationParams) -> Result<Terrain, GenError> {
        params.check_dimensions()?;
        params.check_difficulty()?;
        let fill_prob = params.custom_probability("fill_prob", 0.45)?;
        let smooth_passes = params.custom_usize("smooth_passes", 5)?;
        let floor_threshold = params.custom_usize("floor_threshold", 5)?;
        if floor_threshold > 8 {
            return Err(GenError::MalformedCustomParam {
                key: "floor_threshold".to_string(),
                reason: format!("{floor_threshold} exceeds the 8 possible neighbors"),
            });
        }

        let width = params.width;
        let height = params.height;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        // Initial random fill. Map borders stay wall so the cave is sealed.
        let mut cells = vec![false; width * height];
        for y in 0..height {
            for x in 0..width {
                let border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                cells[y * width + x] = !border && rng.gen_bool(1.0 - fill_prob);
            }
        }

        for _ in 0..smooth_passes {
            cells = smooth(&cells, width, height, floor_threshold);
        }

        keep_largest_component(&mut cells, width, height);

        if !cells.iter().any(|&floor| floor) {
            return Err(GenError::GenerationFailure(format!(
                "cave smoothing eliminated all floor (fill_prob {fill_prob}, threshold {floor_threshold})"
            )));
        }

        let mut terrain = Terrain::new(width, height, seed);
        for y in 0..height {
            for x in 0..width {
                if cells[y * width + x] {
                    terrain.set_tile(Point::new(x as i32, y as i32), TileType::Floor);
                }
            }
        }
        Ok(terrain)
    }

    fn validate(&self, terrain: &Terrain) -> Result<(), GenError> {
        validate_terrain(terrain)
    }

    fn name(&self) -> &'static str {
        "cellular"
    }
}

/// One smoothing pass: a cell becomes floor when at least `threshold` of its
/// 8 neighbors are floor. Out-of-bounds neighbors count as wall.
fn smooth(cells: &[bool], width: usize, height: usize, threshold: usize) -> Vec<bool> {
    let mut next = vec![false; cells.len()];
    for y in 0..height {
        for x in 0..width {
            if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                continue;
            }
            let p = Point::new(x as i32, y as i32);
            let floor_neighbors = p
                .all_neighbors()
                .into_iter()
                .filter(|n| {
                    n.in_bounds(width, height) && cells[n.y as usize * width + n.x as usize]
                })
                .count();
            next[y * width + x] = floor_neighbors >= threshold;
        }
    }
    next
}

/// Label floor components with BFS and wall off everything but the largest.
fn keep_largest_component(cells: &mut [bool], width: usize, height: usize) {
    let mut labels = vec![0usize; cells.len()];
    let mut sizes = vec![0usize]; // label 0 = unlabeled
    let mut next_label = 0usize;

    for start in 0..cells.len() {
        if !cells[start] || labels[start] != 0 {
            continue;
        }
        next_label += 1;
        sizes.push(0);
        let mut queue = VecDeque::new();
        labels[start] = next_label;
        queue.push_back(start);
        while let Some(idx) = queue.pop_front() {
            sizes[next_label] += 1;
            let p = Point::new((idx % width) as i32, (idx / width) as i32);
            for n in p.neighbors_within(width, height) {
                let nidx = n.y as usize * width + n.x as usize;
                if cells[nidx] && labels[nidx] == 0 {
                    labels[nidx] = next_label;
                    queue.push_back(nidx);
                }
            }
        }
    }

    if next_label == 0 {
        return;
    }
    let largest = (1..=next_label).max_by_key(|&l| sizes[l]).unwrap_or(1);
    for idx in 0..cells.len() {
        if cells[idx] && labels[idx] != largest {
            cells[idx] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cave_is_fully_connected() {
        let params = GenerationParams::new(60, 40);
        for seed in [1, 42, 12345] {
            let terrain = CellularAutomataGenerator.generate(seed, &params).unwrap();
            CellularAutomataGenerator.validate(&terrain).unwrap();
        }
    }

    #[test]
    fn test_determinism() {
        let params = GenerationParams::new(50, 30);
        let a = CellularAutomataGenerator.generate(9001, &params).unwrap();
        let b = CellularAutomataGenerator.generate(9001, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_borders_are_sealed() {
        let params = GenerationParams::new(40, 30);
        let terrain = CellularAutomataGenerator.generate(3, &params).unwrap();
        for x in 0..40 {
            assert_eq!(terrain.tile(Point::new(x, 0)), TileType::Wall);
            assert_eq!(terrain.tile(Point::new(x, 29)), TileType::Wall);
        }
        for y in 0..30 {
            assert_eq!(terrain.tile(Point::new(0, y)), TileType::Wall);
            assert_eq!(terrain.tile(Point::new(39, y)), TileType::Wall);
        }
    }

    #[test]
    fn test_openness_is_tunable() {
        // A lower fill probability leaves more floor after smoothing.
        let open = GenerationParams::new(60, 40).with_custom("fill_prob", 0.35);
        let tight = GenerationParams::new(60, 40).with_custom("fill_prob", 0.52);
        let open_terrain = CellularAutomataGenerator.generate(7, &open).unwrap();
        let tight_terrain = CellularAutomataGenerator.generate(7, &tight).unwrap();
        assert!(open_terrain.walkable_count() > tight_terrain.walkable_count());
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let params = GenerationParams::new(40, 30).with_custom("floor_threshold", 9);
        assert!(matches!(
            CellularAutomataGenerator.generate(1, &params),
            Err(GenError::MalformedCustomParam { .. })
        ));
    }

    #[test]
    fn test_all_wall_fill_fails_cleanly() {
        // fill_prob 1.0 starts with no floor at all.
        let params = GenerationParams::new(30, 20).with_custom("fill_prob", 1.0);
        assert!(matches!(
            CellularAutomataGenerator.generate(1, &params),
            Err(GenError::GenerationFailure(_))
        ));
    }
}
