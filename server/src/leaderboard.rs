//! Win-count leaderboard behind the narrow result-recording interface.
//!
//! The session core only ever calls `ResultRecorder::record_win`. The
//! reporting endpoint only ever calls `Standings::get_standings`. Persistence
//! is a JSON object of `identity -> wins`, rewritten after every recorded win.

use crate::config::normalize_identity;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("leaderboard file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("leaderboard file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fire-and-forget sink for round results.
pub trait ResultRecorder: Send + Sync {
    fn record_win(&self, identity: &str);
}

/// Read-only view used by reporting.
pub trait Standings: Send + Sync {
    /// Ordered by wins descending, ties by identity ascending.
    fn get_standings(&self) -> Vec<Standing>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub identity: String,
    pub wins: u32,
}

#[derive(Debug, Default)]
pub struct Leaderboard {
    path: Option<PathBuf>,
    wins: Mutex<HashMap<String, u32>>,
}

impl Leaderboard {
    /// A leaderboard that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads from `path`. A missing or unreadable file starts an empty board;
    /// the file is created on the first recorded win.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let wins = match read_board(&path) {
            Ok(wins) => {
                info!("Loaded {} leaderboard entries from {}", wins.len(), path.display());
                wins
            }
            Err(LeaderboardError::Io(e)) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Starting with an empty leaderboard: {}", e);
                HashMap::new()
            }
        };

        Self {
            path: Some(path),
            wins: Mutex::new(wins),
        }
    }

    fn wins(&self) -> MutexGuard<'_, HashMap<String, u32>> {
        self.wins.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, wins: &HashMap<String, u32>) -> Result<(), LeaderboardError> {
        if let Some(path) = &self.path {
            fs::write(path, serde_json::to_string_pretty(wins)?)?;
        }
        Ok(())
    }
}

fn read_board(path: &Path) -> Result<HashMap<String, u32>, LeaderboardError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

impl ResultRecorder for Leaderboard {
    fn record_win(&self, identity: &str) {
        let identity = normalize_identity(identity, "");
        if identity.is_empty() {
            return;
        }

        let mut wins = self.wins();
        *wins.entry(identity.clone()).or_insert(0) += 1;
        info!("Recorded win for {} (total {})", identity, wins[&identity]);

        if let Err(e) = self.persist(&wins) {
            warn!("Failed to persist leaderboard: {}", e);
        }
    }
}

impl Standings for Leaderboard {
    fn get_standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .wins()
            .iter()
            .map(|(identity, wins)| Standing {
                identity: identity.clone(),
                wins: *wins,
            })
            .collect();

        standings.sort_by(|a, b| b.wins.cmp(&a.wins).then_with(|| a.identity.cmp(&b.identity)));
        standings
    }
}
