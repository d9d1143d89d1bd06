//! ASCII rendering and export for generated terrain
//!
//! Thin consumer of the engine: maps tile types to glyphs (optionally ANSI
//! coloured) and writes map files with a stats footer.

use std::fs::File;
use std::io::{self, Write};

use chrono::Local;
use crossterm::style::{Color, Stylize};

use crate::geometry::Point;
use crate::terrain::Terrain;
use crate::tiles::TileType;

/// Glyph for a tile.
pub fn tile_char(tile: TileType) -> char {
    match tile {
        TileType::Wall => '#',
        TileType::Floor => '.',
        TileType::Corridor => ',',
        TileType::Door => '+',
        TileType::WaterShallow => '~',
        TileType::WaterDeep => '≈',
        TileType::Tree => '♣',
        TileType::StairsUp => '<',
        TileType::StairsDown => '>',
        TileType::TrapDoor => '^',
        TileType::SecretDoor => '#',
        TileType::Bridge => '=',
        TileType::Structure => '■',
    }
}

/// Terminal colour for a tile.
pub fn tile_color(tile: TileType) -> Color {
    match tile {
        TileType::Wall | TileType::SecretDoor | TileType::Structure => Color::DarkGrey,
        TileType::Floor => Color::Grey,
        TileType::Corridor => Color::White,
        TileType::Door | TileType::TrapDoor => Color::DarkYellow,
        TileType::WaterShallow => Color::Cyan,
        TileType::WaterDeep => Color::DarkBlue,
        TileType::Tree => Color::DarkGreen,
        TileType::StairsUp | TileType::StairsDown => Color::Yellow,
        TileType::Bridge => Color::DarkMagenta,
    }
}

/// Render a terrain as plain ASCII, one row per line.
pub fn render(terrain: &Terrain) -> String {
    let mut out = String::with_capacity((terrain.width + 1) * terrain.height);
    for y in 0..terrain.height as i32 {
        for x in 0..terrain.width as i32 {
            out.push(tile_char(terrain.tile(Point::new(x, y))));
        }
        out.push('\n');
    }
    out
}

/// Render with ANSI colours for terminal display.
pub fn render_colored(terrain: &Terrain) -> String {
    let mut out = String::new();
    for y in 0..terrain.height as i32 {
        for x in 0..terrain.width as i32 {
            let tile = terrain.tile(Point::new(x, y));
            out.push_str(&tile_char(tile).with(tile_color(tile)).to_string());
        }
        out.push('\n');
    }
    out
}

/// Export a dungeon to a text file: header, one map section per level, stats.
pub fn export_dungeon(levels: &[Terrain], seed: u64, path: &str) -> io::Result<()> {
    let mut file = File::create(path)?;

    writeln!(file, "=== TERRAIN FORGE MAP FILE ===")?;
    writeln!(file, "Seed: {}", seed)?;
    writeln!(file, "Levels: {}", levels.len())?;
    writeln!(file, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(file)?;

    for terrain in levels {
        writeln!(file, "=== LEVEL {} ({}x{}) ===", terrain.level, terrain.width, terrain.height)?;
        file.write_all(render(terrain).as_bytes())?;
        writeln!(file)?;
        writeln!(file, "Rooms: {}", terrain.rooms.len())?;
        writeln!(
            file,
            "Walkable: {} ({:.1}%)",
            terrain.walkable_count(),
            terrain.walkable_coverage() * 100.0
        )?;
        writeln!(
            file,
            "Stairs: {} up, {} down",
            terrain.stairs_up.len(),
            terrain.stairs_down.len()
        )?;
        writeln!(file)?;
    }
    Ok(())
}
