mod config;
mod render;

use anyhow::{Context, Result, bail};
use clap::Parser;
use glam::IVec2;
use tessera_core::{ChunkPos, Map, StepAction, TilePos};

use crate::config::DriverConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file name without extension
    #[arg(long, default_value = "tessera")]
    config: String,

    /// World seed (overrides the configuration)
    #[arg(long)]
    seed: Option<u64>,

    /// Top-left chunk of the window as "x,y"
    #[arg(long, default_value = "0,0", value_parser = parse_pair)]
    origin: IVec2,

    /// Focus z-level
    #[arg(long, default_value = "0")]
    z: i32,

    /// Path start tile as "x,y" (default: near the window's top-left corner)
    #[arg(long, value_parser = parse_pair)]
    from: Option<IVec2>,

    /// Path goal tile as "x,y" (default: near the window's bottom-right corner)
    #[arg(long, value_parser = parse_pair)]
    to: Option<IVec2>,

    /// Bash strength available to the walker (0 = never bash)
    #[arg(long, default_value = "0")]
    bash: i32,

    /// Search radius around the start (-1 = unbounded)
    #[arg(long, default_value = "-1", allow_negative_numbers = true)]
    radius: i32,

    /// Skip the ASCII view
    #[arg(long)]
    no_render: bool,
}

fn parse_pair(text: &str) -> Result<IVec2, String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got \"{text}\""))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in \"{text}\": {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in \"{text}\": {e}"))?;
    Ok(IVec2::new(x, y))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = DriverConfig::load(&args.config).context("Failed to load configuration")?;
    if let Some(seed) = args.seed {
        config.map.generation.seed = seed;
    }

    let mut map = Map::with_defaults(config.map.clone()).context("Failed to create map")?;
    let origin = ChunkPos::new(args.origin.x, args.origin.y, args.z);
    map.load(origin)
        .with_context(|| format!("Failed to page in window at {origin}"))?;

    let first = map.store().origin_tile();
    let extent = map.store().tile_extent();
    let start = args
        .from
        .map_or(first.offset(1, 1), |p| TilePos::new(p.x, p.y, args.z));
    let goal = args
        .to
        .map_or(first.offset(extent.x - 2, extent.y - 2), |p| TilePos::new(p.x, p.y, args.z));
    if !map.store().contains(start) || !map.store().contains(goal) {
        bail!("start {start} and goal {goal} must lie inside the window");
    }

    log::info!("Routing {} -> {} (bash {}, radius {})", start, goal, args.bash, args.radius);
    let path = map.find_path(start, goal, args.radius, args.bash);

    let doors = path.steps.iter().filter(|s| s.action == StepAction::OpenDoor).count();
    let bashes = path.steps.iter().filter(|s| s.action == StepAction::Bash).count();
    println!(
        "{:?}: {} steps, {} doors opened, {} obstacles bashed",
        path.outcome,
        path.len(),
        doors,
        bashes
    );

    if !args.no_render {
        let view = map.snapshot();
        print!("{}", render::render_window(&view, &config.render, Some(start), Some(&path)));
    }

    let stats = map.cache_stats();
    log::debug!(
        "[CACHE] Rebuilds: outdoor {}, transparency {}, occupancy {}",
        stats.outdoor,
        stats.transparency,
        stats.occupancy
    );

    Ok(())
}
