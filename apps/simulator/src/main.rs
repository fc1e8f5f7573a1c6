//! Simulated guided walk.
//!
//! Loads a store catalog, walks a simulated visitor toward the chosen store
//! and logs every guidance event. After arrival the visitor wanders until
//! the run ends. Prints the visit analytics report as JSON on exit.
//!
//! Usage:
//!   wandur-sim --stores demos/stores.json --destination lumen
//!   wandur-sim --stores demos/stores.json --config demos/config.json --destination brew --seconds 300 --seed 7
//!
//! Enable debug logging to see per-zone detail:
//!   RUST_LOG=wandur=trace wandur-sim ...

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wandur_analytics::VisitTracker;
use wandur_application::{AppConfig, GuidanceContext, RepeatingTask, TickControl};
use wandur_events::LocalEventBus;
use wandur_navigation::NavigationState;
use wandur_planner::FlatFloor;
use wandur_position::SimulatedPositionSource;
use wandur_stores::StoreDirectory;

#[derive(Parser, Debug)]
#[command(name = "wandur-sim", author, version, about, long_about = None)]
struct Args {
    /// Store catalog (JSON array of stores)
    #[arg(long)]
    stores: PathBuf,

    /// Application config (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store id to navigate to
    #[arg(short, long)]
    destination: String,

    /// Simulated duration of the walk in seconds
    #[arg(long, default_value = "120")]
    seconds: u64,

    /// RNG seed for the walker (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Run the loops on wall-clock timers instead of stepping as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Write the analytics report here instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,wandur=debug")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }

    let directory = StoreDirectory::load(&args.stores)
        .with_context(|| format!("loading stores from {}", args.stores.display()))?;
    let Some(store) = directory.get(&args.destination).cloned() else {
        bail!(
            "unknown destination '{}' (known: {})",
            args.destination,
            directory.iter().map(|s| s.id.as_str()).collect::<Vec<_>>().join(", ")
        );
    };

    let bus = Arc::new(LocalEventBus::new());
    let tracker = VisitTracker::attach(&bus);
    let _log = bus.subscribe(|event| {
        tracing::info!(topic = event.topic(), payload = %event.to_json(), "event");
    });

    let walker = Arc::new(SimulatedPositionSource::new(config.simulation.clone()));
    walker.steer_toward(store.location);
    let floor = FlatFloor {
        height: config.simulation.origin[1],
    };
    let zones = directory.zones(config.geofence.default_cooldown());

    let ctx = GuidanceContext::new(
        config,
        walker.clone(),
        Arc::new(directory),
        Arc::new(floor),
        bus.clone(),
    )?;
    let zone_count = ctx.add_zones(zones)?;
    tracing::info!(
        zones = zone_count,
        destination = %store.id,
        seconds = args.seconds,
        realtime = args.realtime,
        "starting simulated walk"
    );

    ctx.start_navigation(&store.id)?;
    if args.realtime {
        run_realtime(&ctx, &walker, args.seconds).await;
    } else {
        run_stepped(&ctx, &walker, args.seconds);
    }
    ctx.shutdown();

    let report = tracker.report();
    match &args.report {
        Some(path) => report.export(path)?,
        None => println!("{}", report.to_json()?),
    }
    Ok(())
}

/// Move the walker one step, then pump both subsystems from that sample.
fn run_stepped(ctx: &GuidanceContext, walker: &SimulatedPositionSource, seconds: u64) {
    let steps = seconds * 1000 / walker.config().step_ms.max(1);
    let mut wandering = false;

    for _ in 0..steps {
        walker.advance();
        ctx.tick_once();
        if !wandering && ctx.navigation_state() == NavigationState::Arrived {
            tracing::info!("arrived, wandering until the end of the run");
            walker.wander();
            wandering = true;
        }
    }
}

/// Run the navigation and geofence loops on real timers.
///
/// The walker steps on its own timer so simulated time tracks wall time; the
/// loops only read its latest state.
async fn run_realtime(ctx: &GuidanceContext, walker: &Arc<SimulatedPositionSource>, seconds: u64) {
    let step = Duration::from_millis(walker.config().step_ms.max(1));
    let motion = {
        let walker = Arc::clone(walker);
        RepeatingTask::spawn("walker", step, move || {
            walker.advance();
            TickControl::Continue
        })
    };
    ctx.start_geofence();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
    let mut check = tokio::time::interval(Duration::from_millis(250));
    let mut wandering = false;

    while tokio::time::Instant::now() < deadline {
        check.tick().await;
        if !wandering && ctx.navigation_state() == NavigationState::Arrived {
            tracing::info!("arrived, wandering until the end of the run");
            walker.wander();
            wandering = true;
        }
    }
    motion.cancel();
}
