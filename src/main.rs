use clap::{Parser, ValueEnum};

use terrain_forge::ascii;
use terrain_forge::dungeon::{DungeonGenerator, StairPlacement};
use terrain_forge::{Algorithm, GenerationParams, RoomKind};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliAlgorithm {
    Bsp,
    Cellular,
    Maze,
    Forest,
}

impl From<CliAlgorithm> for Algorithm {
    fn from(value: CliAlgorithm) -> Self {
        match value {
            CliAlgorithm::Bsp => Algorithm::Bsp,
            CliAlgorithm::Cellular => Algorithm::CellularAutomata,
            CliAlgorithm::Maze => Algorithm::Maze,
            CliAlgorithm::Forest => Algorithm::Forest,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliPlacement {
    Aligned,
    Random,
    RoomTargeted,
    Symmetric,
}

impl From<CliPlacement> for StairPlacement {
    fn from(value: CliPlacement) -> Self {
        match value {
            CliPlacement::Aligned => StairPlacement::Aligned,
            CliPlacement::Random => StairPlacement::Random,
            CliPlacement::RoomTargeted => StairPlacement::RoomTargeted(RoomKind::Exit),
            CliPlacement::Symmetric => StairPlacement::Symmetric,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "terrain_forge")]
#[command(about = "Generate deterministic dungeon and terrain maps")]
struct Args {
    /// Map width in tiles
    #[arg(short = 'W', long, default_value = "80")]
    width: usize,

    /// Map height in tiles
    #[arg(short = 'H', long, default_value = "50")]
    height: usize,

    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Generation algorithm
    #[arg(short, long, value_enum, default_value = "bsp")]
    algorithm: CliAlgorithm,

    /// Number of dungeon levels (1-20)
    #[arg(short = 'l', long, default_value = "1")]
    levels: usize,

    /// Base difficulty (0.0-1.0), ramps 0.1 per level
    #[arg(short, long, default_value = "0.5")]
    difficulty: f64,

    /// Stair placement strategy for multi-level dungeons
    #[arg(long, value_enum, default_value = "aligned")]
    stairs: CliPlacement,

    /// BSP: minimum room size
    #[arg(long)]
    min_room_size: Option<usize>,

    /// Cellular: initial wall fill probability
    #[arg(long)]
    fill_prob: Option<f64>,

    /// Forest: tree density (Poisson-disc spacing, not tile percentage)
    #[arg(long)]
    tree_density: Option<f64>,

    /// Forest: number of clearings
    #[arg(long)]
    clearings: Option<usize>,

    /// Forest: probability of a lake or river
    #[arg(long)]
    water_chance: Option<f64>,

    /// Which level of a multi-level dungeon to print (default: all)
    #[arg(long)]
    level: Option<usize>,

    /// Render with ANSI colours
    #[arg(short, long)]
    color: bool,

    /// Export the map to a text file
    #[arg(short, long)]
    export: Option<String>,
}

fn build_params(args: &Args) -> GenerationParams {
    let mut params = GenerationParams::new(args.width, args.height);
    params.difficulty = args.difficulty;
    if let Some(v) = args.min_room_size {
        params = params.with_custom("min_room_size", v);
    }
    if let Some(v) = args.fill_prob {
        params = params.with_custom("fill_prob", v);
    }
    if let Some(v) = args.tree_density {
        params = params.with_custom("tree_density", v);
    }
    if let Some(v) = args.clearings {
        params = params.with_custom("clearing_count", v);
    }
    if let Some(v) = args.water_chance {
        params = params.with_custom("water_chance", v);
    }
    params
}

fn main() {
    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let params = build_params(&args);

    println!("Generating {} map with seed: {}", Algorithm::from(args.algorithm).name(), seed);
    println!("Map size: {}x{}, levels: {}", args.width, args.height, args.levels);

    let generator = DungeonGenerator::new(args.algorithm.into())
        .with_stair_placement(args.stairs.into());
    let levels = match generator.generate(args.levels, seed, &params) {
        Ok(levels) => levels,
        Err(err) => {
            eprintln!("Generation failed: {err}");
            std::process::exit(1);
        }
    };

    for terrain in &levels {
        if let Some(only) = args.level {
            if terrain.level != only {
                continue;
            }
        }
        println!();
        println!("=== Level {} ({}x{}) ===", terrain.level, terrain.width, terrain.height);
        if args.color {
            print!("{}", ascii::render_colored(terrain));
        } else {
            print!("{}", ascii::render(terrain));
        }
        println!(
            "Rooms: {}  Walkable: {:.1}%  Stairs: {} up / {} down",
            terrain.rooms.len(),
            terrain.walkable_coverage() * 100.0,
            terrain.stairs_up.len(),
            terrain.stairs_down.len()
        );
    }

    if let Some(path) = args.export {
        match ascii::export_dungeon(&levels, seed, &path) {
            Ok(()) => println!("Exported map to {path}"),
            Err(err) => {
                eprintln!("Export failed: {err}");
                std::process::exit(1);
            }
        }
    }
}
