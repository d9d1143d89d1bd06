//! Binary space partitioning generator
//!
//! Recursively splits the map along alternating axes into leaf regions, carves
//! one randomly sized room per leaf, and joins sibling subtrees with straight
//! or L-shaped corridors between room centers. Every node draws from its own
//! RNG stream seeded by structural position, so sibling subtrees generate
//! independently and deterministically.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::GenError;
use crate::geometry::Point;
use crate::params::GenerationParams;
use crate::seeds;
use crate::terrain::{Room, RoomKind, Terrain};
use crate::tiles::TileType;

use super::{validate_terrain, Generator};

/// Ratio bounds for how uneven a split can be.
const SPLIT_RATIO_MIN: f32 = 0.35;
const SPLIT_RATIO_MAX: f32 = 0.65;

/// Chance that a corridor cell entering a room becomes a door.
const DOOR_CHANCE: f64 = 0.35;
/// Of those doors, chance the door is hidden.
const SECRET_DOOR_CHANCE: f64 = 0.12;

pub struct BspGenerator;

struct BspNode {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    left: Option<Box<BspNode>>,
    right: Option<Box<BspNode>>,
    room: Option<Room>,
}

impl BspNode {
    fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height, left: None, right: None, room: None }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

impl Generator for BspGenerator {
    fn generate(&self, seed: u64, params: &GenerationParams) -> Result<Terrain, GenError> {
        params.check_dimensions()?;
        params.check_difficulty()?;
        let min_room_size = params.custom_usize("min_room_size", 4)?;
        let max_depth = params.custom_usize("max_depth", 5)?;
        if min_room_size < 2 {
            return Err(GenError::MalformedCustomParam {
                key: "min_room_size".to_string(),
                reason: format!("{min_room_size} is too small, need >= 2"),
            });
        }

        let mut terrain = Terrain::new(params.width, params.height, seed);

        // Leaves need room for the minimum room plus a 1-tile margin.
        let min_leaf = min_room_size + 2;
        let mut root = BspNode::new(0, 0, params.width, params.height);
        split_node(&mut root, min_leaf, max_depth, 0, seed);
        create_rooms(&mut root, min_room_size, seed);

        let mut rooms = Vec::new();
        collect_rooms(&root, &mut rooms);
        if rooms.is_empty() {
            return Err(GenError::NoRooms { algorithm: self.name() });
        }

        for room in &rooms {
            carve_room(&mut terrain, room);
        }
        connect_siblings(&root, &mut terrain, seed);
        place_doors(&mut terrain, &rooms, seed);
        assign_room_kinds(&mut rooms, params.difficulty, seed);

        terrain.rooms = rooms;
        Ok(terrain)
    }

    fn validate(&self, terrain: &Terrain) -> Result<(), GenError> {
        if terrain.rooms.is_empty() {
            return Err(GenError::NoRooms { algorithm: self.name() });
        }
        validate_terrain(terrain)
    }

    fn name(&self) -> &'static str {
        "bsp"
    }
}

/// Recursively split a node until leaves fall below the size threshold or the
/// depth limit is reached.
fn split_node(node: &mut BspNode, min_leaf: usize, max_depth: usize, depth: usize, master: u64) {
    if depth >= max_depth {
        return;
    }
    if node.width < min_leaf * 2 && node.height < min_leaf * 2 {
        return;
    }

    let mut rng =
        ChaCha8Rng::seed_from_u64(seeds::region_seed(master, node.x, node.y, node.width, node.height));

    // Prefer splitting the longer dimension, random when roughly square.
    let width_f = node.width as f32;
    let height_f = node.height as f32;
    let split_h = if width_f >= height_f * 1.25 {
        false
    } else if height_f >= width_f * 1.25 {
        true
    } else {
        rng.gen_bool(0.5)
    };

    if split_h && node.height < min_leaf * 2 {
        return;
    }
    if !split_h && node.width < min_leaf * 2 {
        return;
    }

    let ratio = rng.gen_range(SPLIT_RATIO_MIN..SPLIT_RATIO_MAX);

    if split_h {
        let split_y = node.y + (node.height as f32 * ratio) as usize;
        let split_y = split_y
            .max(node.y + min_leaf)
            .min(node.y + node.height - min_leaf);

        let mut left = BspNode::new(node.x, node.y, node.width, split_y - node.y);
        let mut right = BspNode::new(node.x, split_y, node.width, node.y + node.height - split_y);
        split_node(&mut left, min_leaf, max_depth, depth + 1, master);
        split_node(&mut right, min_leaf, max_depth, depth + 1, master);
        node.left = Some(Box::new(left));
        node.right = Some(Box::new(right));
    } else {
        let split_x = node.x + (node.width as f32 * ratio) as usize;
        let split_x = split_x
            .max(node.x + min_leaf)
            .min(node.x + node.width - min_leaf);

        let mut left = BspNode::new(node.x, node.y, split_x - node.x, node.height);
        let mut right = BspNode::new(split_x, node.y, node.x + node.width - split_x, node.height);
        split_node(&mut left, min_leaf, max_depth, depth + 1, master);
        split_node(&mut right, min_leaf, max_depth, depth + 1, master);
        node.left = Some(Box::new(left));
        node.right = Some(Box::new(right));
    }
}

/// Carve one room per leaf. A leaf too small for the minimum room plus margin
/// emits no room; corridor wiring among the remaining rooms still runs.
fn create_rooms(node: &mut BspNode, min_room_size: usize, master: u64) {
    if node.is_leaf() {
        if node.width < min_room_size + 2 || node.height < min_room_size + 2 {
            return;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seeds::region_seed(
            master,
            node.x,
            node.y,
            node.width,
            node.height,
        ) ^ 0x526f6f6d);

        let room_width = rng.gen_range(min_room_size..=node.width - 2);
        let room_height = rng.gen_range(min_room_size..=node.height - 2);
        let room_x = node.x + rng.gen_range(1..=node.width - room_width - 1);
        let room_y = node.y + rng.gen_range(1..=node.height - room_height - 1);

        node.room = Some(Room::new(RoomKind::Normal, room_x, room_y, room_width, room_height));
    } else {
        if let Some(ref mut left) = node.left {
            create_rooms(left, min_room_size, master);
        }
        if let Some(ref mut right) = node.right {
            create_rooms(right, min_room_size, master);
        }
    }
}

fn collect_rooms(node: &BspNode, rooms: &mut Vec<Room>) {
    if let Some(ref room) = node.room {
        rooms.push(room.clone());
    }
    if let Some(ref left) = node.left {
        collect_rooms(left, rooms);
    }
    if let Some(ref right) = node.right {
        collect_rooms(right, rooms);
    }
}

fn carve_room(terrain: &mut Terrain, room: &Room) {
    for dy in 0..room.height {
        for dx in 0..room.width {
            terrain.set_tile(
                Point::new((room.x + dx) as i32, (room.y + dy) as i32),
                TileType::Floor,
            );
        }
    }
}

/// Walk the tree connecting a room from the left subtree to a room from the
/// right subtree at every internal node. This links all rooms transitively.
fn connect_siblings(node: &BspNode, terrain: &mut Terrain, master: u64) {
    if let (Some(ref left), Some(ref right)) = (&node.left, &node.right) {
        if let (Some(a), Some(b)) = (first_room(left), first_room(right)) {
            let mut rng = ChaCha8Rng::seed_from_u64(seeds::region_seed(
                master,
                node.x,
                node.y,
                node.width,
                node.height,
            ) ^ 0x436f7272);
            carve_corridor(terrain, a.center(), b.center(), &mut rng);
        }
        connect_siblings(left, terrain, master);
        connect_siblings(right, terrain, master);
    }
}

fn first_room(node: &BspNode) -> Option<&Room> {
    if let Some(ref room) = node.room {
        return Some(room);
    }
    if let Some(ref left) = node.left {
        if let Some(room) = first_room(left) {
            return Some(room);
        }
    }
    if let Some(ref right) = node.right {
        if let Some(room) = first_room(right) {
            return Some(room);
        }
    }
    None
}

/// Carve a straight or L-shaped corridor between two points. Only wall cells
/// become corridor; existing floor is left alone.
fn carve_corridor(terrain: &mut Terrain, from: Point, to: Point, rng: &mut ChaCha8Rng) {
    let horizontal_first = from.x == to.x || from.y == to.y || rng.gen_bool(0.5);
    let corner = if horizontal_first {
        Point::new(to.x, from.y)
    } else {
        Point::new(from.x, to.y)
    };
    carve_segment(terrain, from, corner);
    carve_segment(terrain, corner, to);
}

fn carve_segment(terrain: &mut Terrain, from: Point, to: Point) {
    let step_x = (to.x - from.x).signum();
    let step_y = (to.y - from.y).signum();
    let mut p = from;
    loop {
        if terrain.tile(p) == TileType::Wall {
            terrain.set_tile(p, TileType::Corridor);
        }
        if p == to {
            break;
        }
        if p.x != to.x {
            p.x += step_x;
        } else {
            p.y += step_y;
        }
    }
}

/// Turn corridor cells that touch a room interior into doors, occasionally
/// secret ones.
fn place_doors(terrain: &mut Terrain, rooms: &[Room], master: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seeds::derive_seed(master, "doors"));
    let mut candidates = Vec::new();
    for p in terrain.points() {
        if terrain.tile(p) != TileType::Corridor {
            continue;
        }
        let touches_room = p
            .neighbors_within(terrain.width, terrain.height)
            .any(|n| terrain.tile(n) == TileType::Floor && in_some_room(rooms, n));
        if touches_room {
            candidates.push(p);
        }
    }
    for p in candidates {
        if rng.gen_bool(DOOR_CHANCE) {
            let tile = if rng.gen_bool(SECRET_DOOR_CHANCE) {
                TileType::SecretDoor
            } else {
                TileType::Door
            };
            terrain.set_tile(p, tile);
        }
    }
}

fn in_some_room(rooms: &[Room], p: Point) -> bool {
    rooms.iter().any(|r| {
        p.x >= r.x as i32
            && p.y >= r.y as i32
            && p.x < (r.x + r.width) as i32
            && p.y < (r.y + r.height) as i32
    })
}

/// Tag rooms with gameplay roles: the first room spawns the party, the room
/// farthest from spawn holds the exit, and difficulty scales in treasure and
/// boss rooms.
fn assign_room_kinds(rooms: &mut [Room], difficulty: f64, master: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seeds::derive_seed(master, "room_kinds"));
    rooms[0].kind = RoomKind::Spawn;

    if rooms.len() > 1 {
        let spawn_center = rooms[0].center();
        let exit_idx = rooms
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|(_, a), (_, b)| {
                let da = spawn_center.distance(a.center());
                let db = spawn_center.distance(b.center());
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(rooms.len() - 1);
        rooms[exit_idx].kind = RoomKind::Exit;

        let normals: Vec<usize> = (0..rooms.len())
            .filter(|&i| rooms[i].kind == RoomKind::Normal)
            .collect();
        if !normals.is_empty() && rng.gen_bool(0.3 + difficulty * 0.4) {
            let idx = normals[rng.gen_range(0..normals.len())];
            rooms[idx].kind = RoomKind::Treasure;
        }
        let normals: Vec<usize> = (0..rooms.len())
            .filter(|&i| rooms[i].kind == RoomKind::Normal)
            .collect();
        if !normals.is_empty() && difficulty >= 0.5 {
            let idx = normals[rng.gen_range(0..normals.len())];
            rooms[idx].kind = RoomKind::Boss;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bsp_minimal_scenario() {
        // 40x30 with min_room_size 4 must yield at least one room and a
        // fully connected floor.
        let params = GenerationParams::new(40, 30).with_custom("min_room_size", 4);
        let terrain = BspGenerator.generate(12345, &params).unwrap();
        assert!(!terrain.rooms.is_empty());
        BspGenerator.validate(&terrain).unwrap();
    }

    #[test]
    fn test_determinism() {
        let params = GenerationParams::new(60, 40);
        let a = BspGenerator.generate(777, &params).unwrap();
        let b = BspGenerator.generate(777, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let params = GenerationParams::new(60, 40);
        let a = BspGenerator.generate(1, &params).unwrap();
        let b = BspGenerator.generate(2, &params).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rooms_stay_in_bounds() {
        let params = GenerationParams::new(50, 35);
        for seed in [0, 9, 1234, 99999] {
            let terrain = BspGenerator.generate(seed, &params).unwrap();
            terrain.check_bounds().unwrap();
            for room in &terrain.rooms {
                assert!(terrain.is_walkable(room.center()));
            }
        }
    }

    #[test]
    fn test_spawn_and_exit_assigned() {
        let params = GenerationParams::new(60, 40);
        let terrain = BspGenerator.generate(42, &params).unwrap();
        assert_eq!(terrain.rooms[0].kind, RoomKind::Spawn);
        if terrain.rooms.len() > 1 {
            assert!(terrain.rooms.iter().any(|r| r.kind == RoomKind::Exit));
        }
    }

    #[test]
    fn test_rejects_out_of_range_difficulty() {
        let mut params = GenerationParams::new(40, 30);
        params.difficulty = 2.0;
        assert!(matches!(
            BspGenerator.generate(1, &params),
            Err(GenError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let params = GenerationParams::new(0, 30);
        assert!(matches!(
            BspGenerator.generate(1, &params),
            Err(GenError::InvalidDimensions { .. })
        ));

        let params = GenerationParams::new(40, 30).with_custom("min_room_size", 1);
        assert!(matches!(
            BspGenerator.generate(1, &params),
            Err(GenError::MalformedCustomParam { .. })
        ));
    }

    #[test]
    fn test_tiny_map_with_one_room_still_works() {
        // Too small to split: a single leaf room should still come out.
        let params = GenerationParams::new(10, 8);
        let terrain = BspGenerator.generate(5, &params).unwrap();
        assert!(!terrain.rooms.is_empty());
        BspGenerator.validate(&terrain).unwrap();
    }
}
