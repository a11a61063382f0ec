// Read contract of the hosted document store, plus an in-memory implementation
// used by tests and by offline JSON dumps.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{MatchRecord, PlayerDocument, PlayerStats, Year};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    #[error("malformed document store data: {message}")]
    Malformed { message: String },
}

impl StoreError {
    /// Whether retrying the same read could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Network { .. } => true,
            StoreError::Status { status, .. } => *status == 429 || *status >= 500,
            StoreError::Decode { .. } | StoreError::Malformed { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Read-only access to the `players` and `matches` collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document of the `players` collection (live current-season data).
    async fn players(&self) -> Result<Vec<PlayerDocument>, StoreError>;

    /// The `players/{id}/history/{year}` snapshot. `Ok(None)` when absent.
    async fn player_history(
        &self,
        player_id: &str,
        year: Year,
    ) -> Result<Option<PlayerStats>, StoreError>;

    /// Every document of the `matches` collection.
    async fn matches(&self) -> Result<Vec<MatchRecord>, StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A `DocumentStore` held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    players: Vec<PlayerDocument>,
    history: HashMap<(String, Year), PlayerStats>,
    matches: Vec<MatchRecord>,
}

/// JSON dump layout: `history` maps player id -> year -> snapshot.
#[derive(Debug, Deserialize)]
struct DumpFile {
    #[serde(default)]
    players: Vec<PlayerDocument>,
    #[serde(default)]
    history: HashMap<String, HashMap<String, PlayerStats>>,
    #[serde(default)]
    matches: Vec<MatchRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_player(mut self, player: PlayerDocument) -> Self {
        self.players.push(player);
        self
    }

    pub fn with_history(mut self, player_id: impl Into<String>, year: Year, stats: PlayerStats) -> Self {
        self.history.insert((player_id.into(), year), stats);
        self
    }

    pub fn with_match(mut self, record: MatchRecord) -> Self {
        self.matches.push(record);
        self
    }

    /// Parse a JSON dump (`{"players": [...], "history": {...}, "matches": [...]}`).
    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        let dump: DumpFile = serde_json::from_str(text).map_err(|e| StoreError::Decode {
            context: "document dump".into(),
            message: e.to_string(),
        })?;

        let mut history = HashMap::new();
        for (player_id, years) in dump.history {
            for (year, stats) in years {
                let year: Year = year.trim().parse().map_err(|_| StoreError::Malformed {
                    message: format!("history year `{year}` for player `{player_id}` is not a year"),
                })?;
                history.insert((player_id.clone(), year), stats);
            }
        }

        Ok(Self {
            players: dump.players,
            history,
            matches: dump.matches,
        })
    }

    /// Read a JSON dump from disk.
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| StoreError::Malformed {
            message: format!("could not read {}: {e}", path.display()),
        })?;
        Self::from_json(&text)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn players(&self) -> Result<Vec<PlayerDocument>, StoreError> {
        Ok(self.players.clone())
    }

    async fn player_history(
        &self,
        player_id: &str,
        year: Year,
    ) -> Result<Option<PlayerStats>, StoreError> {
        Ok(self.history.get(&(player_id.to_string(), year)).cloned())
    }

    async fn matches(&self) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self.matches.clone())
    }
}
