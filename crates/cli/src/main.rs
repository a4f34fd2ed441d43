//! Play a treasure hunt from the command line.
//!
//! Prints one JSON document per line on stdout; logs go to stderr.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};

use treasure_core::{GraphResult, HidingSpotId};
use treasure_game::GameSetup;
use treasure_graph::{
    CheckSpotInput, ConnectionArgs, EngineConfig, NodeType, PendingMutation, Selection, Session,
};
use treasure_observability::LogFormat;

#[derive(Parser)]
#[command(name = "treasure", about = "Treasure hunt over an optimistic graph client")]
struct Args {
    /// Number of hiding spots (overrides TREASURE_SPOTS)
    #[arg(long)]
    spots: Option<u32>,

    /// Starting turns (overrides TREASURE_TURNS)
    #[arg(long)]
    turns: Option<u32>,

    /// Treasure position; random when unset (overrides TREASURE_INDEX)
    #[arg(long)]
    treasure: Option<u32>,

    /// Simulated server latency in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Give up on a dispatch after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Submit every check before waiting on any of them
    #[arg(long)]
    burst: bool,

    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,

    /// Spots to check, as local ids or HidingSpot references
    spots_to_check: Vec<String>,
}

fn parse_spot(raw: &str) -> GraphResult<HidingSpotId> {
    match raw.parse::<HidingSpotId>() {
        Ok(id) => Ok(id),
        Err(_) => Ok(CheckSpotInput::from_global_ref(raw)?.hiding_spot_local_id),
    }
}

fn load_setup(args: &Args) -> anyhow::Result<GameSetup> {
    let mut setup = GameSetup::from_env().context("reading board setup from env")?;
    if let Some(spots) = args.spots {
        setup = setup.with_spots(spots);
    }
    if let Some(turns) = args.turns {
        setup = setup.with_turns(turns);
    }
    if let Some(index) = args.treasure {
        setup = setup.with_treasure_at(index);
    }
    Ok(setup)
}

fn load_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = EngineConfig::from_env().context("reading engine config from env")?;
    if let Some(ms) = args.delay_ms {
        config = config.with_dispatch_delay(Duration::from_millis(ms));
    }
    if let Some(ms) = args.timeout_ms {
        config = config.with_dispatch_timeout(Duration::from_millis(ms));
    }
    Ok(config)
}

async fn report(pending: PendingMutation) {
    let id = pending.id();
    match pending.settle().await {
        Ok(reconciled) => {
            println!("{}", json!({"mutation": id, "state": "reconciled", "payload": reconciled}));
        }
        Err(err) => {
            warn!(mutation_id = %id, error = %err, "check failed");
            println!("{}", json!({"mutation": id, "state": "failed", "error": err.code()}));
        }
    }
}

fn announce(pending: &PendingMutation) {
    println!(
        "{}",
        json!({"mutation": pending.id(), "state": "pending", "optimistic": pending.optimistic()})
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    treasure_observability::init_with(args.log_format);

    let setup = load_setup(&args)?;
    let config = load_config(&args)?;
    let targets = args
        .spots_to_check
        .iter()
        .map(|raw| parse_spot(raw).with_context(|| format!("bad spot {raw:?}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let session = Session::start(&setup, &config).context("starting session")?;
    let game = session.watch_game(&Selection::all_of(NodeType::Game));
    let board = session.watch_hiding_spots(
        &ConnectionArgs::default(),
        &Selection::all_of(NodeType::HidingSpot),
    )?;
    println!("{}", json!({"game": game, "hidingSpots": board}));

    if args.burst {
        let pending: Vec<_> = targets.into_iter().map(|id| session.check_spot(id)).collect();
        pending.iter().for_each(announce);
        for p in pending {
            report(p).await;
        }
    } else {
        for id in targets {
            if session.status().is_over() {
                info!(spot = %id, "game over; skipping remaining checks");
                break;
            }
            let pending = session.check_spot(id);
            announce(&pending);
            report(pending).await;
        }
    }

    let status = session.shutdown().await;
    println!("{}", json!({"status": status}));
    Ok(())
}
