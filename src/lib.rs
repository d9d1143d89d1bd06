//! Deterministic terrain and dungeon generation
//!
//! Produces playable level geometry (rooms, corridors, caves, mazes, forests,
//! multi-level stair networks) from an integer seed and a small parameter
//! record. Generation is bit-for-bit deterministic for a given seed and
//! parameters, which is what lets multiplayer peers exchange only seed +
//! params and regenerate identical maps locally.

pub mod ascii;
pub mod dungeon;
pub mod error;
pub mod generators;
pub mod geometry;
pub mod params;
pub mod seeds;
pub mod terrain;
pub mod tiles;

pub use dungeon::{generate_multi_level, DungeonGenerator, StairPlacement};
pub use error::GenError;
pub use generators::{Algorithm, Generator};
pub use geometry::Point;
pub use params::GenerationParams;
pub use terrain::{Room, RoomKind, Terrain};
pub use tiles::TileType;
