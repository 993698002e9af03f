// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fieldsyncd - headless field client.
//!
//! Runs a sync session against the backend, feeding positions from a replay
//! file. Useful for load tests and for exercising the backend's real-time
//! and telemetry endpoints without a device.
//!
//! Usage:
//!   fieldsyncd run --token <t> --user <id> --positions <file.jsonl> [--anchor lat,lon[,r]]
//!   fieldsyncd distance <lat1> <lon1> <lat2> <lon2> [--radius m]

use std::net::ToSocketAddrs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use fieldsync::api::HttpBackend;
use fieldsync::battery::NoBattery;
use fieldsync::config::parse_anchor;
use fieldsync::context::{FixedProject, LogNotifier, LogUi, SessionAuth};
use fieldsync::replay::ReplayProvider;
use fieldsync::sync::WebSocketTransport;
use fieldsync::{Collaborators, Config, NetworkMonitor, Services, SyncCoordinator};
use fieldsync_core::{evaluate, GeofenceAnchor, Position};
use tracing::{info, warn};

/// fieldsyncd: headless field-tracking client
#[derive(Parser, Debug)]
#[command(name = "fieldsyncd", version)]
#[command(about = "Telemetry and real-time sync client for field workers")]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a sync session until interrupted
    Run {
        /// Config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bearer token for the backend
        #[arg(long, env = "FIELDSYNC_TOKEN")]
        token: String,

        /// User id joined on the real-time channel
        #[arg(long)]
        user: String,

        /// JSONL position script
        #[arg(long)]
        positions: PathBuf,

        /// Pause between scripted positions, in milliseconds
        #[arg(long, default_value = "5000")]
        pacing_ms: u64,

        /// Restart the script when it ends
        #[arg(long = "loop")]
        looped: bool,

        /// Project geofence: lat,lon or lat,lon,radius
        #[arg(long)]
        anchor: Option<String>,

        /// Start with an active check-in
        #[arg(long)]
        checkin: bool,

        /// Seconds between connectivity probes (0 = always online)
        #[arg(long, default_value = "15")]
        probe_secs: u64,

        /// Push subscription (JSON file) to register at startup
        #[arg(long)]
        push_subscription: Option<PathBuf>,
    },

    /// Print the distance between two points and the geofence classification
    Distance {
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,

        /// Geofence radius in meters
        #[arg(long, default_value = "200")]
        radius: f64,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logging(args.verbose);

    let result = match args.command {
        Command::Run {
            config,
            token,
            user,
            positions,
            pacing_ms,
            looped,
            anchor,
            checkin,
            probe_secs,
            push_subscription,
        } => {
            let options = RunOptions {
                config,
                token,
                user,
                positions,
                pacing: Duration::from_millis(pacing_ms),
                looped,
                anchor,
                checkin,
                probe: Duration::from_secs(probe_secs),
                push_subscription,
            };
            run(options).await
        }
        Command::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
            radius,
        } => distance(lat1, lon1, lat2, lon2, radius),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct RunOptions {
    config: Option<PathBuf>,
    token: String,
    user: String,
    positions: PathBuf,
    pacing: Duration,
    looped: bool,
    anchor: Option<String>,
    checkin: bool,
    probe: Duration,
    push_subscription: Option<PathBuf>,
}

async fn run(options: RunOptions) -> fieldsync::Result<()> {
    let config = match &options.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let anchor = options
        .anchor
        .as_deref()
        .map(|spec| parse_anchor(spec, config.geofence.default_radius_m))
        .transpose()?;

    let auth = Arc::new(SessionAuth::signed_in(options.token, options.user));
    let backend = Arc::new(HttpBackend::new(config.api_url.clone(), auth.clone()));
    if let Some(path) = &options.push_subscription {
        let subscription: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        backend.register_push_subscription(&subscription).await?;
        info!(path = %path.display(), "push subscription registered");
    }

    let positions = ReplayProvider::load(&options.positions, options.pacing, options.looped)?;
    info!(
        entries = positions.len(),
        queue = %config.queue_path().display(),
        "starting"
    );

    let network = NetworkMonitor::new(true);
    let probe_target = config.api_url.clone();

    let mut coordinator = SyncCoordinator::new(
        config,
        Collaborators {
            auth,
            project: Arc::new(FixedProject::new(anchor)),
            ui: Arc::new(LogUi),
            notifier: Arc::new(LogNotifier),
        },
        Services {
            positions: Arc::new(positions),
            battery: Arc::new(NoBattery),
            sink: backend.clone(),
            resync: backend,
            transport: Box::new(WebSocketTransport::new()),
        },
        network.clone(),
    )?;

    coordinator.start_session().await;
    coordinator.enter_geofenced_screen().await;
    if options.checkin {
        coordinator.checkin_started().await;
    }

    let probe = (!options.probe.is_zero())
        .then(|| tokio::spawn(probe_connectivity(probe_target, options.probe, network)));

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");

    if let Some(probe) = probe {
        probe.abort();
    }
    coordinator.leave_geofenced_screen().await;
    if options.checkin {
        coordinator.checkin_ended().await;
    }
    coordinator.end_session().await;
    Ok(())
}

/// Marks the network online when the API host accepts a TCP connection.
async fn probe_connectivity(api_url: String, every: Duration, network: NetworkMonitor) {
    let Some(address) = probe_address(&api_url) else {
        warn!("cannot probe {}; assuming online", api_url);
        return;
    };
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let reachable = tokio::time::timeout(
            Duration::from_secs(5),
            tokio::net::TcpStream::connect(address.as_str()),
        )
        .await
        .is_ok_and(|r| r.is_ok());
        network.set_online(reachable);
    }
}

fn probe_address(api_url: &str) -> Option<String> {
    let url = reqwest::Url::parse(api_url).ok()?;
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    let address = format!("{}:{}", host, port);
    // An unresolvable host disables probing.
    address.to_socket_addrs().ok()?.next()?;
    Some(address)
}

fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64, radius: f64) -> fieldsync::Result<()> {
    let anchor = GeofenceAnchor::new(lat2, lon2, radius)?;
    let position = Position::new(lat1, lon1, chrono::Utc::now());
    position.validate()?;
    let check = evaluate(&position, &anchor);
    println!(
        "{}m {}",
        check.display_distance_m(),
        if check.within { "inside" } else { "outside" }
    );
    Ok(())
}
