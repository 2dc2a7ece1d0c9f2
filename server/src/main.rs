use clap::Parser;
use log::{info, warn};
use server::config::{SessionConfig, DEFAULT_LEFT_IDENTITY, DEFAULT_RIGHT_IDENTITY};
use server::error::SessionError;
use server::leaderboard::Leaderboard;
use server::reporting::serve_standings;
use server::session;
use shared::Plaintext;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port shared by controllers and observers
    #[arg(short, long, default_value = "6000")]
    port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Identity credited when the left controller wins
    #[arg(long, default_value = DEFAULT_LEFT_IDENTITY)]
    left_name: String,

    /// Identity credited when the right controller wins
    #[arg(long, default_value = DEFAULT_RIGHT_IDENTITY)]
    right_name: String,

    /// Leaderboard persistence file
    #[arg(long, default_value = "leaderboard.json")]
    leaderboard_file: String,

    /// Port for the read-only standings endpoint (0 disables it)
    #[arg(long, default_value = "8000")]
    report_port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let leaderboard = Arc::new(Leaderboard::load(&args.leaderboard_file));

    if args.report_port != 0 {
        let report_addr = format!("{}:{}", args.host, args.report_port);
        match TcpListener::bind(&report_addr).await {
            Ok(listener) => {
                tokio::spawn(serve_standings(listener, leaderboard.clone()));
            }
            Err(e) => warn!("Could not start leaderboard endpoint on {}: {}", report_addr, e),
        }
    }

    let config = SessionConfig::new(format!("{}:{}", args.host, args.port), args.tick_rate)
        .with_identities(&args.left_name, &args.right_name);
    info!(
        "Waiting for controllers ({} vs {}) at {} Hz",
        config.left_identity, config.right_identity, args.tick_rate
    );

    // Ctrl+C goes through the session's own teardown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => warn!("Could not listen for Ctrl+C: {}", e),
        }
    });

    match session::serve(config, leaderboard, Arc::new(Plaintext), shutdown_rx).await {
        Ok(report) => info!("Session ended: {}", report.ended_by),
        Err(SessionError::Shutdown) => info!("Shut down before both controllers joined"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
