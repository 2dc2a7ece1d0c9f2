//! # Pong Session Server Library
//!
//! This library provides the authoritative server for a two-player paddle
//! game with an unlimited audience. It owns the canonical game state, ingests
//! controller commands, and broadcasts one consistent state line per tick to
//! every connected party.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the only copy of the paddle and ball physics. Clients
//! never simulate; they render whatever the latest state line says.
//!
//! ### Session Membership
//! Exactly two controllers (left, then right) are accepted at startup. Every
//! later connection on the same endpoint becomes an observer and may join at
//! any time.
//!
//! ### Round Lifecycle
//! A round ends on the tick a score reaches the win threshold. The ball then
//! freezes until both controllers send `ready`, at which point a fresh round
//! starts. The winner is reported to the result recorder exactly once.
//!
//! ## Architecture Design
//!
//! ### Task Layout
//! - **Command Ingest**: one task per controller, writing that controller's
//!   atomic control cell
//! - **Observer Acceptor**: admits observers into the mutex-guarded registry
//! - **Tick Loop**: reads the cells, steps the simulation, records results,
//!   and performs the broadcast inline at the end of each tick
//!
//! ### Failure Model
//! A failed send to a controller ends the session; a failed send to an
//! observer removes that observer only. Malformed input is dropped silently.
//! There are no retries and no timeouts.
//!
//! ## Module Organization
//!
//! - `registry`: control cells, controller slots, observer registry
//! - `ingest`: per-controller line reader
//! - `acceptor`: observer admission
//! - `simulation`: physics and the win / rematch state machine
//! - `broadcast`: per-tick fan-out and pruning
//! - `session`: bootstrap, tick loop, teardown
//! - `leaderboard`: result recording and standings collaborator
//! - `reporting`: read-only HTTP standings endpoint
//! - `config`, `error`: settings and session-ending failures
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::SessionConfig;
//! use server::leaderboard::Leaderboard;
//! use shared::Plaintext;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new("127.0.0.1:6000", 60).with_identities("hp", "rm");
//!     let leaderboard = Arc::new(Leaderboard::load("leaderboard.json"));
//!
//!     // Keep the sender to request a graceful shutdown later
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//!     // Waits for two controllers, then ticks until one of them is lost
//!     let report =
//!         server::session::serve(config, leaderboard, Arc::new(Plaintext), shutdown_rx).await?;
//!     println!("session ended after {} ticks", report.ticks);
//!
//!     Ok(())
//! }
//! ```

pub mod acceptor;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod ingest;
pub mod leaderboard;
pub mod registry;
pub mod reporting;
pub mod session;
pub mod simulation;
