// View assembly for the `clubrecord` binary.
//
// One view load reads the store once into a `LeagueSnapshot`, builds every
// derived table from it, and renders the requested view as JSON.

use serde::Serialize;
use tracing::{info, warn};

use clubrecord_core::config::Config;
use clubrecord_core::history::{player_history, HistoryOptions, PlayerHistory};
use clubrecord_core::model::Year;
use clubrecord_core::positions::PositionIndex;
use clubrecord_core::records::{build_record_board, search_player, PlayerRecords, StatBoard};
use clubrecord_core::snapshot::{load_snapshot, LeagueSnapshot, LoadDiagnostics, SeasonWindow};
use clubrecord_core::store::DocumentStore;
use clubrecord_core::tables::StatTables;

/// Shown whenever any read failed; details stay in the diagnostics.
pub const LOAD_ERROR_MESSAGE: &str = "Some records could not be loaded. Please try again later.";

/// Which view to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Records,
    Search(String),
    History(String),
    Positions,
}

/// Everything derived from one snapshot.
pub struct ViewContext {
    pub snapshot: LeagueSnapshot,
    pub tables: StatTables,
    pub positions: PositionIndex,
    pub leaderboard_size: usize,
    pub history: HistoryOptions,
}

/// Rendered output of any view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewReport<T> {
    pub as_of: Year,
    pub years: Vec<Year>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub diagnostics: LoadDiagnostics,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRow {
    pub player: String,
    pub primary_position: String,
    pub histogram: Vec<(String, u32)>,
}

/// Load the snapshot for `window` and derive every table.
pub async fn load_view(store: &dyn DocumentStore, config: &Config, window: SeasonWindow) -> ViewContext {
    let partner_season = config.partner_season(&window);
    let snapshot = load_snapshot(store, window, config.store.max_concurrency).await;
    let tables = StatTables::build(&snapshot);
    let positions = PositionIndex::build(snapshot.matches());
    info!(
        players = snapshot.players().len(),
        matches = snapshot.matches().len(),
        positioned = positions.len(),
        "view data ready"
    );
    ViewContext {
        snapshot,
        tables,
        positions,
        leaderboard_size: config.rankings.leaderboard_size,
        history: HistoryOptions {
            podium_size: config.rankings.podium_size,
            partner_season: Some(partner_season),
        },
    }
}

impl ViewContext {
    fn report<T>(&self, data: T, missing: Option<String>) -> ViewReport<T> {
        let diagnostics = self.snapshot.diagnostics().clone();
        let error = missing.or_else(|| (!diagnostics.is_clean()).then(|| LOAD_ERROR_MESSAGE.to_string()));
        let window = self.tables.window();
        ViewReport {
            as_of: window.current(),
            years: window.years().to_vec(),
            error,
            diagnostics,
            data,
        }
    }

    pub fn records(&self) -> ViewReport<Vec<StatBoard>> {
        self.report(build_record_board(&self.tables, self.leaderboard_size), None)
    }

    pub fn search(&self, name: &str) -> ViewReport<Option<PlayerRecords>> {
        let found = self
            .tables
            .find_player(name)
            .and_then(|id| search_player(&self.tables, id, self.positions.primary_position(id)));
        let missing = found.is_none().then(|| format!("no player named `{name}`"));
        self.report(found, missing)
    }

    pub fn history(&self, name: &str) -> ViewReport<Option<PlayerHistory>> {
        let found = self.tables.find_player(name).and_then(|id| {
            player_history(
                &self.tables,
                id,
                self.positions.primary_position(id),
                self.history,
                self.snapshot.matches(),
            )
        });
        let missing = found.is_none().then(|| format!("no player named `{name}`"));
        self.report(found, missing)
    }

    pub fn positions(&self) -> ViewReport<Vec<PositionRow>> {
        let rows = self
            .positions
            .primary_positions()
            .into_iter()
            .map(|(player, primary_position)| {
                let histogram = self
                    .positions
                    .histogram(&player)
                    .map(|h| h.entries().to_vec())
                    .unwrap_or_default();
                PositionRow {
                    player,
                    primary_position,
                    histogram,
                }
            })
            .collect();
        self.report(rows, None)
    }

    /// Render `view` as pretty JSON.
    pub fn render(&self, view: &View) -> anyhow::Result<String> {
        let json = match view {
            View::Records => serde_json::to_string_pretty(&self.records())?,
            View::Search(name) => serde_json::to_string_pretty(&self.search(name))?,
            View::History(name) => serde_json::to_string_pretty(&self.history(name))?,
            View::Positions => serde_json::to_string_pretty(&self.positions())?,
        };
        if !self.snapshot.diagnostics().is_clean() {
            warn!("rendered a view from partially loaded data");
        }
        Ok(json)
    }
}
