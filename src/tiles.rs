//! Tile semantics
//!
//! Closed enumeration of terrain tile types with derived gameplay properties.
//! Walkability, transparency and movement cost are fixed per variant and never
//! vary with generation parameters; multiplayer determinism depends on that.

use serde::{Deserialize, Serialize};

/// Terrain tile type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    #[default]
    Wall,
    Floor,
    Corridor,
    Door,
    WaterShallow,
    WaterDeep,
    Tree,
    StairsUp,
    StairsDown,
    TrapDoor,
    SecretDoor,
    Bridge,
    Structure,
}

impl TileType {
    /// Whether a creature can stand on this tile.
    pub fn is_walkable(&self) -> bool {
        self.movement_cost().is_some()
    }

    /// Whether vision passes through this tile (fog-of-war / line of sight).
    pub fn is_transparent(&self) -> bool {
        match self {
            TileType::Wall | TileType::Tree | TileType::Structure => false,
            // Closed doors block sight even though they are passable
            TileType::Door | TileType::SecretDoor => false,
            TileType::Floor
            | TileType::Corridor
            | TileType::WaterShallow
            | TileType::WaterDeep
            | TileType::StairsUp
            | TileType::StairsDown
            | TileType::TrapDoor
            | TileType::Bridge => true,
        }
    }

    /// Movement cost multiplier, or `None` for impassable tiles.
    pub fn movement_cost(&self) -> Option<f32> {
        match self {
            TileType::Wall | TileType::WaterDeep | TileType::Tree | TileType::Structure => None,
            TileType::Floor
            | TileType::Corridor
            | TileType::Door
            | TileType::StairsUp
            | TileType::StairsDown
            | TileType::TrapDoor
            | TileType::Bridge => Some(1.0),
            TileType::WaterShallow | TileType::SecretDoor => Some(2.0),
        }
    }

    pub fn is_water(&self) -> bool {
        matches!(self, TileType::WaterShallow | TileType::WaterDeep)
    }

    pub fn is_stairs(&self) -> bool {
        matches!(self, TileType::StairsUp | TileType::StairsDown)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TileType::Wall => "Wall",
            TileType::Floor => "Floor",
            TileType::Corridor => "Corridor",
            TileType::Door => "Door",
            TileType::WaterShallow => "Shallow Water",
            TileType::WaterDeep => "Deep Water",
            TileType::Tree => "Tree",
            TileType::StairsUp => "Stairs Up",
            TileType::StairsDown => "Stairs Down",
            TileType::TrapDoor => "Trap Door",
            TileType::SecretDoor => "Secret Door",
            TileType::Bridge => "Bridge",
            TileType::Structure => "Structure",
        }
    }

    /// Every variant, for exhaustive property checks.
    pub fn all() -> &'static [TileType] {
        &[
            TileType::Wall,
            TileType::Floor,
            TileType::Corridor,
            TileType::Door,
            TileType::WaterShallow,
            TileType::WaterDeep,
            TileType::Tree,
            TileType::StairsUp,
            TileType::StairsDown,
            TileType::TrapDoor,
            TileType::SecretDoor,
            TileType::Bridge,
            TileType::Structure,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walkable_iff_finite_cost() {
        // Exactly one of {walkable with finite positive cost} or {impassable}
        // must hold for every variant.
        for tile in TileType::all() {
            match tile.movement_cost() {
                Some(cost) => {
                    assert!(tile.is_walkable(), "{:?} has a cost but is not walkable", tile);
                    assert!(cost > 0.0, "{:?} has non-positive cost {}", tile, cost);
                }
                None => assert!(!tile.is_walkable(), "{:?} walkable without a cost", tile),
            }
        }
    }

    #[test]
    fn test_expected_walkability() {
        assert!(TileType::Floor.is_walkable());
        assert!(TileType::Corridor.is_walkable());
        assert!(TileType::Bridge.is_walkable());
        assert!(TileType::WaterShallow.is_walkable());
        assert!(!TileType::Wall.is_walkable());
        assert!(!TileType::WaterDeep.is_walkable());
        assert!(!TileType::Tree.is_walkable());
    }

    #[test]
    fn test_transparency() {
        assert!(TileType::WaterDeep.is_transparent());
        assert!(!TileType::Door.is_transparent());
        assert!(!TileType::Wall.is_transparent());
        assert!(TileType::Floor.is_transparent());
    }

    #[test]
    fn test_shallow_water_slows_movement() {
        let floor = TileType::Floor.movement_cost().unwrap();
        let shallow = TileType::WaterShallow.movement_cost().unwrap();
        assert!(shallow > floor);
    }
}
