//! Tile Pilot - Entry Point
//!
//! Connects to an emulator bridge (or the built-in grid simulator), then runs
//! the perceive / decide / act loop until the turn limit or Ctrl-C.

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use tokio::runtime::Runtime;

use tile_pilot::command::DecisionResponse;
use tile_pilot::core::config::PilotConfig;
use tile_pilot::core::error::{PilotError, Result};
use tile_pilot::core::types::MapId;
use tile_pilot::emulator::bridge::BridgeEmulator;
use tile_pilot::emulator::sim::GridSim;
use tile_pilot::emulator::Emulator;
use tile_pilot::llm::{DecisionMaker, LlmClient, ScriptedDecisionMaker};
use tile_pilot::turn::TurnController;
use tile_pilot::world::WarpRegistry;

/// Consecutive failed RAM captures before giving up on the emulator
const MAX_CAPTURE_FAILURES: u32 = 5;

const DEMO_ROOM: &str = "
    ##########
    #........#
    #..##....#
    #..#..N..#
    #..#.....W
    #.@......#
    ##########";

/// Tile Pilot - drive a tile RPG with an LLM, one verified action per turn
#[derive(Parser, Debug)]
#[command(name = "tile-pilot")]
#[command(about = "Run the autopilot turn loop against an emulator")]
struct Args {
    /// Pilot config file (TOML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emulator bridge address
    #[arg(long, default_value = "127.0.0.1:8765")]
    bridge: String,

    /// Use the built-in grid simulator instead of a bridge
    #[arg(long, default_value_t = false)]
    sim: bool,

    /// Stop after this many turns (0 runs until interrupted)
    #[arg(long, default_value_t = 0)]
    turns: u64,

    /// Warp registry file; overrides `warps_path` from the config
    #[arg(long)]
    warps: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tile_pilot=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PilotConfig::load(path)?,
        None => PilotConfig::new(),
    };

    let registry = match args.warps.as_ref().or(config.warps_path.as_ref()) {
        Some(path) => WarpRegistry::load(path)?,
        None => WarpRegistry::empty(),
    };

    let mut emulator: Box<dyn Emulator> = if args.sim {
        tracing::info!("Using built-in grid simulator");
        Box::new(GridSim::from_plan(DEMO_ROOM, MapId::new(0, 1))?)
    } else {
        Box::new(BridgeEmulator::connect(&args.bridge, config.bridge_timeout())?)
    };

    let decider: Box<dyn DecisionMaker> = match LlmClient::from_env(&config.llm) {
        Ok(client) => {
            tracing::info!(format = ?client.api_format(), "LLM client ready");
            Box::new(client)
        }
        Err(e) if args.sim => {
            tracing::warn!(error = %e, "No LLM available - using scripted wander");
            Box::new(wander_script())
        }
        Err(e) => return Err(e),
    };

    let rt = Runtime::new()?;
    let mut controller = TurnController::new(&config, registry);
    tracing::info!(session = %controller.session(), "Tile Pilot starting");

    rt.block_on(async {
        let mut capture_failures = 0;
        loop {
            if args.turns > 0 && controller.turns_taken() >= args.turns {
                break;
            }
            let result = tokio::select! {
                r = controller.run_turn(emulator.as_mut(), decider.as_ref()) => r,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted");
                    break;
                }
            };
            match result {
                Ok(report) => {
                    capture_failures = 0;
                    println!("{}", report.summary());
                }
                Err(e) => {
                    capture_failures += 1;
                    tracing::error!(error = %e, capture_failures, "Turn failed");
                    if capture_failures >= MAX_CAPTURE_FAILURES {
                        return Err(PilotError::Emulator(format!(
                            "giving up after {capture_failures} failed captures: {e}"
                        )));
                    }
                }
            }
        }
        Ok(())
    })?;

    let stats = controller.tracker().stats();
    tracing::info!(
        turns = controller.turns_taken(),
        tiles = stats.tiles_visited,
        maps = stats.maps_visited,
        steps = stats.steps,
        "Session finished"
    );
    Ok(())
}

/// Short loop around the start tile
fn wander_script() -> ScriptedDecisionMaker {
    ScriptedDecisionMaker::cycling(vec![
        DecisionResponse::from_call("press_keys", json!({"keys": ["up", "up"]})),
        DecisionResponse::from_call("compute_path", json!({"x": 2, "y": 4})),
        DecisionResponse::from_text(
            "Back to the start.\n```json\n{\"function\": \"press_keys\", \"arguments\": {\"keys\": [\"down\"]}}\n```",
        ),
        DecisionResponse::from_call("wait", json!({"frames": 30})),
    ])
}
