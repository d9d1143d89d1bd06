//! Terrain aggregate
//!
//! The central output type of every generator: a row-major tile grid plus
//! room and stair metadata. A `Terrain` is built in full by one `generate`
//! call; after validation, downstream consumers (entity placement, rendering,
//! the network layer) treat it as immutable. The only later mutation is the
//! orchestrator's stair wiring, which adds stair tiles and appends to the
//! stair lists but never moves or removes existing geometry.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::geometry::Point;
use crate::tiles::TileType;

/// Role a room plays in the level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomKind {
    Spawn,
    Normal,
    Treasure,
    Boss,
    Exit,
}

/// A rectangular (or bounding-box of an irregular) sub-region of a terrain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub kind: RoomKind,
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Room {
    pub fn new(kind: RoomKind, x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { kind, x, y, width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.x + self.width / 2) as i32,
            (self.y + self.height / 2) as i32,
        )
    }

    pub fn intersects(&self, other: &Room) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// A fully generated level: tile grid plus room and stair metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Terrain {
    pub width: usize,
    pub height: usize,
    grid: Vec<TileType>,
    pub rooms: Vec<Room>,
    pub seed: u64,
    /// Zero-based depth within a multi-level dungeon.
    pub level: usize,
    pub stairs_up: Vec<Point>,
    pub stairs_down: Vec<Point>,
}

impl Terrain {
    /// Create a terrain filled with the given tile.
    pub fn filled(width: usize, height: usize, seed: u64, fill: TileType) -> Self {
        Self {
            width,
            height,
            grid: vec![fill; width * height],
            rooms: Vec::new(),
            seed,
            level: 0,
            stairs_up: Vec::new(),
            stairs_down: Vec::new(),
        }
    }

    /// Create a terrain of solid wall (the usual starting state for carvers).
    pub fn new(width: usize, height: usize, seed: u64) -> Self {
        Self::filled(width, height, seed, TileType::Wall)
    }

    fn index(&self, p: Point) -> usize {
        p.y as usize * self.width + p.x as usize
    }

    pub fn in_bounds(&self, p: Point) -> bool {
        p.in_bounds(self.width, self.height)
    }

    /// Tile at `p`. Out-of-bounds points read as `Wall`, so edge handling in
    /// neighbor counts stays branch-free at call sites.
    pub fn tile(&self, p: Point) -> TileType {
        if self.in_bounds(p) {
            self.grid[self.index(p)]
        } else {
            TileType::Wall
        }
    }

    /// Set the tile at `p`. Out-of-bounds writes are ignored.
    pub fn set_tile(&mut self, p: Point, tile: TileType) {
        if self.in_bounds(p) {
            let idx = self.index(p);
            self.grid[idx] = tile;
        }
    }

    pub fn is_walkable(&self, p: Point) -> bool {
        self.tile(p).is_walkable()
    }

    /// Whether at least one orthogonal neighbor of `p` is walkable.
    pub fn has_walkable_neighbor(&self, p: Point) -> bool {
        p.neighbors_within(self.width, self.height)
            .any(|n| self.is_walkable(n))
    }

    /// Total number of walkable tiles.
    pub fn walkable_count(&self) -> usize {
        self.grid.iter().filter(|t| t.is_walkable()).count()
    }

    /// Fraction of the grid that is walkable, in [0, 1].
    pub fn walkable_coverage(&self) -> f64 {
        self.walkable_count() as f64 / (self.width * self.height) as f64
    }

    /// Iterate every point of the grid in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        let width = self.width;
        (0..self.width * self.height)
            .map(move |i| Point::new((i % width) as i32, (i / width) as i32))
    }

    /// First walkable point in row-major order, if any.
    pub fn first_walkable(&self) -> Option<Point> {
        self.points().find(|&p| self.is_walkable(p))
    }

    /// BFS flood fill over walkable tiles starting at `start`.
    /// Returns a visited mask in row-major order (all false if `start` is not
    /// walkable).
    pub fn flood_fill(&self, start: Point) -> Vec<bool> {
        let mut visited = vec![false; self.width * self.height];
        if !self.in_bounds(start) || !self.is_walkable(start) {
            return visited;
        }

        let mut queue = VecDeque::new();
        visited[self.index(start)] = true;
        queue.push_back(start);

        while let Some(p) = queue.pop_front() {
            for n in p.neighbors_within(self.width, self.height) {
                let idx = self.index(n);
                if !visited[idx] && self.grid[idx].is_walkable() {
                    visited[idx] = true;
                    queue.push_back(n);
                }
            }
        }
        visited
    }

    /// Number of walkable tiles reachable from `start`.
    pub fn reachable_count(&self, start: Point) -> usize {
        self.flood_fill(start).iter().filter(|&&v| v).count()
    }

    /// Verify that every walkable tile is reachable from `start`.
    pub fn check_connected_from(&self, start: Point) -> Result<(), GenError> {
        let walkable = self.walkable_count();
        let reached = self.reachable_count(start);
        if reached == walkable {
            Ok(())
        } else {
            Err(GenError::Disconnected { start, reached, walkable })
        }
    }

    /// Verify the stair invariants: every listed stair is in bounds, carries
    /// the matching stair tile, and touches at least one walkable neighbor.
    pub fn check_stairs(&self) -> Result<(), GenError> {
        for (&p, expected) in self
            .stairs_up
            .iter()
            .map(|p| (p, TileType::StairsUp))
            .chain(self.stairs_down.iter().map(|p| (p, TileType::StairsDown)))
        {
            if !self.in_bounds(p) || self.tile(p) != expected {
                return Err(GenError::BadStairTile {
                    point: p,
                    found: self.tile(p).display_name(),
                });
            }
            if !self.has_walkable_neighbor(p) {
                return Err(GenError::IsolatedStair { point: p, level: self.level });
            }
        }
        Ok(())
    }

    /// Verify that every room (and every stair) lies fully inside the grid.
    pub fn check_bounds(&self) -> Result<(), GenError> {
        for room in &self.rooms {
            if room.x + room.width > self.width || room.y + room.height > self.height {
                return Err(GenError::GenerationFailure(format!(
                    "room at ({}, {}) size {}x{} exceeds {}x{} grid",
                    room.x, room.y, room.width, room.height, self.width, self.height
                )));
            }
        }
        Ok(())
    }

    /// Place a stair tile at `p` and record it in the matching list.
    /// Used by generators and by the orchestrator's stair wiring.
    pub fn place_stair(&mut self, p: Point, tile: TileType) {
        debug_assert!(tile.is_stairs());
        self.set_tile(p, tile);
        match tile {
            TileType::StairsUp => self.stairs_up.push(p),
            TileType::StairsDown => self.stairs_down.push(p),
            _ => {}
        }
    }
}
