// Season window and the once-per-view snapshot of both raw collections.
//
// Loading never fails as a whole: collection-level failures leave that
// collection empty, and a failed history lookup marks its year unavailable.
// Both are logged and reported through `LoadDiagnostics`.

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Local};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::model::{MatchRecord, PlayerDocument, PlayerStats, Year};
use crate::store::{DocumentStore, StoreError};

// ---------------------------------------------------------------------------
// SeasonWindow
// ---------------------------------------------------------------------------

/// The reporting years: a fixed list of past seasons plus the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonWindow {
    years: Vec<Year>,
    current: Year,
}

impl SeasonWindow {
    /// Build a window ending at `as_of`. Historical years at or after `as_of`
    /// are dropped; duplicates collapse.
    pub fn new(historical: &[Year], as_of: Year) -> Self {
        let past: BTreeSet<Year> = historical.iter().copied().filter(|y| *y < as_of).collect();
        if past.len() < historical.len() {
            debug!(as_of, ?historical, "dropped historical years not before the current season");
        }
        let mut years: Vec<Year> = past.into_iter().collect();
        years.push(as_of);
        Self {
            years,
            current: as_of,
        }
    }

    /// Window whose current season is this calendar year on the local clock.
    pub fn from_clock(historical: &[Year]) -> Self {
        Self::new(historical, Local::now().year())
    }

    /// All years, ascending; the current season is last.
    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn current(&self) -> Year {
        self.current
    }

    /// Years served by history snapshots rather than live documents.
    pub fn past_years(&self) -> &[Year] {
        &self.years[..self.years.len() - 1]
    }

    /// Most recent completed season, if any.
    pub fn last_past_year(&self) -> Option<Year> {
        self.past_years().last().copied()
    }

    pub fn contains(&self, year: Year) -> bool {
        self.years.contains(&year)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Outcome of one `players/{id}/history/{year}` read.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotLookup {
    Found(PlayerStats),
    /// No snapshot exists; the player is counted as all-zero for that year.
    Missing,
    /// The read failed; the year is unavailable.
    Failed(String),
}

impl From<Result<Option<PlayerStats>, StoreError>> for SnapshotLookup {
    fn from(result: Result<Option<PlayerStats>, StoreError>) -> Self {
        match result {
            Ok(Some(stats)) => SnapshotLookup::Found(stats),
            Ok(None) => SnapshotLookup::Missing,
            Err(e) => SnapshotLookup::Failed(e.to_string()),
        }
    }
}

/// What went wrong while loading, for callers that want to surface it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadDiagnostics {
    /// Set when the `players` collection could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players_error: Option<String>,
    /// Set when the `matches` collection could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches_error: Option<String>,
    pub found_snapshots: usize,
    pub missing_snapshots: usize,
    pub failed_lookups: usize,
    /// Years with at least one failed lookup, ascending.
    pub unavailable_years: Vec<Year>,
}

impl LoadDiagnostics {
    /// True when no read failed.
    pub fn is_clean(&self) -> bool {
        self.players_error.is_none() && self.matches_error.is_none() && self.failed_lookups == 0
    }
}

/// Everything one view load reads, frozen after construction.
#[derive(Debug, Clone)]
pub struct LeagueSnapshot {
    window: SeasonWindow,
    players: Vec<PlayerDocument>,
    history: HashMap<(String, Year), SnapshotLookup>,
    matches: Vec<MatchRecord>,
    diagnostics: LoadDiagnostics,
}

impl LeagueSnapshot {
    /// Assemble a snapshot from already-fetched parts. Lookups that were never
    /// made count as `Missing`.
    pub fn from_parts(
        window: SeasonWindow,
        players: Vec<PlayerDocument>,
        history: impl IntoIterator<Item = ((String, Year), SnapshotLookup)>,
        matches: Vec<MatchRecord>,
    ) -> Self {
        let history: HashMap<(String, Year), SnapshotLookup> = history.into_iter().collect();

        let mut diagnostics = LoadDiagnostics::default();
        let mut unavailable = BTreeSet::new();
        for player in &players {
            for &year in window.past_years() {
                match history.get(&(player.id.clone(), year)) {
                    Some(SnapshotLookup::Found(_)) => diagnostics.found_snapshots += 1,
                    Some(SnapshotLookup::Missing) | None => diagnostics.missing_snapshots += 1,
                    Some(SnapshotLookup::Failed(_)) => {
                        diagnostics.failed_lookups += 1;
                        unavailable.insert(year);
                    }
                }
            }
        }
        diagnostics.unavailable_years = unavailable.into_iter().collect();

        Self {
            window,
            players,
            history,
            matches,
            diagnostics,
        }
    }

    pub fn window(&self) -> &SeasonWindow {
        &self.window
    }

    pub fn players(&self) -> &[PlayerDocument] {
        &self.players
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    pub fn diagnostics(&self) -> &LoadDiagnostics {
        &self.diagnostics
    }

    pub fn lookup(&self, player_id: &str, year: Year) -> &SnapshotLookup {
        self.history
            .get(&(player_id.to_string(), year))
            .unwrap_or(&SnapshotLookup::Missing)
    }

    /// Whether every read for `year` succeeded.
    pub fn is_year_available(&self, year: Year) -> bool {
        !self.diagnostics.unavailable_years.contains(&year)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Fetch both collections, then fan out one history lookup per
/// (player, past year) with at most `max_concurrency` reads in flight.
///
/// Every lookup writes its own `(player, year)` slot, so completion order does
/// not matter and no coordination is needed between them.
pub async fn load_snapshot(
    store: &dyn DocumentStore,
    window: SeasonWindow,
    max_concurrency: usize,
) -> LeagueSnapshot {
    let (players, matches) = futures_util::join!(store.players(), store.matches());

    let mut players_error = None;
    let players = match players {
        Ok(players) => players,
        Err(e) => {
            warn!(error = %e, "failed to read players collection");
            players_error = Some(e.to_string());
            Vec::new()
        }
    };
    let mut matches_error = None;
    let matches = match matches {
        Ok(matches) => matches,
        Err(e) => {
            warn!(error = %e, "failed to read matches collection");
            matches_error = Some(e.to_string());
            Vec::new()
        }
    };

    let keys: Vec<(String, Year)> = players
        .iter()
        .flat_map(|p| window.past_years().iter().map(move |&year| (p.id.clone(), year)))
        .collect();
    info!(
        players = players.len(),
        matches = matches.len(),
        lookups = keys.len(),
        max_concurrency,
        "loading history snapshots"
    );

    let history: Vec<((String, Year), SnapshotLookup)> = stream::iter(keys)
        .map(move |(player_id, year)| async move {
            let lookup = SnapshotLookup::from(store.player_history(&player_id, year).await);
            if let SnapshotLookup::Failed(message) = &lookup {
                warn!(player = %player_id, year, %message, "history lookup failed");
            }
            ((player_id, year), lookup)
        })
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await;

    let mut snapshot = LeagueSnapshot::from_parts(window, players, history, matches);
    snapshot.diagnostics.players_error = players_error;
    snapshot.diagnostics.matches_error = matches_error;

    if !snapshot.diagnostics.unavailable_years.is_empty() {
        warn!(
            years = ?snapshot.diagnostics.unavailable_years,
            failed = snapshot.diagnostics.failed_lookups,
            "some seasons are unavailable"
        );
    }
    snapshot
}
