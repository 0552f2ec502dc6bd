//! # Delve Command Line Entry Point
//!
//! Generates a stage, lays it out in world space, and prints a map of the room graph.

use clap::Parser;
use delve::{
    create_rng, DelveResult, FloatPosition, ObjectKind, Position, RoomCategory, RoomData,
    StageConfig, StageGenerator, StageInstantiator, StaticContentResolver, TemplateLibrary,
    TileHandle,
};
use log::{error, info};
use rand::rngs::StdRng;
use rand::Rng;
use std::path::PathBuf;

const PLAYER_SPAWN_ID: i32 = 1;
const GRUNT_ID: i32 = 100;
const BOSS_ID: i32 = 200;

/// Command line arguments for the stage generator.
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Generate a dungeon stage as a graph of rooms")]
#[command(version)]
struct Args {
    /// Random seed for stage generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of rooms to generate
    #[arg(short, long)]
    rooms: Option<usize>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template directory with start/, normal/ and boss/ subdirectories
    #[arg(short, long)]
    templates: Option<PathBuf>,

    /// Write the generated stage and report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    initialize_logging(&args.log_level);

    info!("Starting Delve v{}", delve::VERSION);

    if let Err(e) = run(&args).await {
        error!("Stage generation failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> DelveResult<()> {
    let mut config = match &args.config {
        Some(path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(rooms) = args.rooms {
        config.room_count = rooms;
    }
    config.validate()?;

    let mut rng = create_rng(&config);

    let library = match &args.templates {
        Some(dir) => TemplateLibrary::load_dir_with_sizes(dir, config.room_sizes()).await?,
        None => {
            info!("No template directory given, using built-in templates");
            builtin_library(&config, &mut rng)
        }
    };

    info!("Generating stage with seed: {}", config.seed);
    let generator = StageGenerator::new(config.clone());
    let (stage, report) = generator
        .generate_stage_with_report(config.room_count, &library, &mut rng)
        .await?;

    let layout = StageInstantiator::new(&config)
        .instantiate(&stage, &builtin_resolver())
        .await?;

    println!("{}", stage.to_ascii());
    println!();
    println!(
        "rooms: {}  edges: {}  boss distance: {}  walkable tiles: {}  corridors: {}",
        stage.len(),
        stage.edge_count(),
        report.boss_distance,
        layout.ground.len(),
        layout.corridors.len()
    );

    if let Some(path) = &args.output {
        let snapshot = serde_json::json!({
            "config": config,
            "report": report,
            "instantiation": layout.report,
            "stage": stage,
        });
        std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
        info!("Stage written to {}", path.display());
    }

    Ok(())
}

/// Initializes the logging system.
#[cfg(feature = "dev-tools")]
fn initialize_logging(log_level: &str) {
    use tracing::Level;

    let level = match log_level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

/// Initializes the logging system.
#[cfg(not(feature = "dev-tools"))]
fn initialize_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Plain rooms used when no template directory is supplied.
fn builtin_library(config: &StageConfig, rng: &mut StdRng) -> TemplateLibrary {
    let mut library = TemplateLibrary::new();

    let mut start = builtin_room(config, "entrance", 8, 8);
    start.add_object(PLAYER_SPAWN_ID, FloatPosition::new(0.0, 0.0), 0.0);
    library.insert(RoomCategory::Start, start);

    for i in 0..4 {
        let size_x = rng.gen_range(config.min_room_size..=config.max_room_size);
        let size_y = rng.gen_range(config.min_room_size..=config.max_room_size);
        let mut room = builtin_room(config, &format!("chamber_{}", i), size_x, size_y);
        room.add_object(GRUNT_ID, FloatPosition::new(1.5, -1.5), 0.0);
        library.insert(RoomCategory::Normal, room);
    }

    let mut boss = builtin_room(config, "lair", config.max_room_size, config.max_room_size);
    boss.add_object(BOSS_ID, FloatPosition::new(0.0, -2.0), 180.0);
    library.insert(RoomCategory::Boss, boss);

    library
}

fn builtin_room(config: &StageConfig, name: &str, size_x: i32, size_y: i32) -> RoomData {
    let mut room = RoomData::with_size_range(name, size_x, size_y, config.room_sizes());
    let (size_x, size_y) = (room.size_x, room.size_y);
    for y in -(size_y / 2)..(size_y - size_y / 2) {
        for x in -(size_x / 2)..(size_x - size_x / 2) {
            let edge = y == -(size_y / 2)
                || y == size_y - size_y / 2 - 1
                || x == -(size_x / 2)
                || x == size_x - size_x / 2 - 1;
            let address = if edge { "wall/stone" } else { "floor/stone" };
            room.add_tile(address, i32::from(edge), Position::new(x, y));
        }
    }
    room
}

fn builtin_resolver() -> StaticContentResolver {
    StaticContentResolver::new(TileHandle::new("ground/dirt"))
        .with_passthrough_tiles()
        .with_object(PLAYER_SPAWN_ID, ObjectKind::PlayerSpawn)
        .with_object(
            GRUNT_ID,
            ObjectKind::Enemy {
                archetype: "grunt".to_string(),
            },
        )
        .with_object(
            BOSS_ID,
            ObjectKind::Enemy {
                archetype: "warden".to_string(),
            },
        )
}
