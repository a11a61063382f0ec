// Records board: leaderboards per stat, plus one player's standings on them.

use serde::Serialize;

use crate::model::{Stat, Year, RECORD_STATS};
use crate::ranking::{rank_of, Cutoff};
use crate::tables::StatTables;

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardRow {
    pub rank: usize,
    pub player_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub value: f64,
    /// Set on pooled rows: the season this value was recorded in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<Year>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearBoard {
    pub year: Year,
    pub available: bool,
    pub rows: Vec<BoardRow>,
}

/// Every leaderboard for one stat.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatBoard {
    pub stat: Stat,
    pub label: &'static str,
    /// Best single seasons across the whole window.
    pub pooled: Vec<BoardRow>,
    pub career: Vec<BoardRow>,
    pub by_year: Vec<YearBoard>,
}

/// Build the records board for every record stat, each table cut at
/// `leaderboard_size` ranks.
pub fn build_record_board(tables: &StatTables, leaderboard_size: usize) -> Vec<StatBoard> {
    let cutoff = Cutoff::Top(leaderboard_size);
    let position = |id: &str| tables.position_of(id).map(str::to_string);

    RECORD_STATS
        .iter()
        .map(|&stat| {
            let pooled = tables
                .pooled_ranking(stat, cutoff)
                .into_iter()
                .map(|e| BoardRow {
                    rank: e.rank,
                    position: position(&e.id.player_id),
                    player_id: e.id.player_id,
                    value: e.value,
                    season: Some(e.id.year),
                })
                .collect();

            let career = tables
                .career_ranking(stat, cutoff)
                .into_iter()
                .map(|e| BoardRow {
                    rank: e.rank,
                    position: position(&e.id),
                    player_id: e.id,
                    value: e.value,
                    season: None,
                })
                .collect();

            let by_year = tables
                .seasons()
                .map(|table| YearBoard {
                    year: table.year,
                    available: table.available,
                    rows: tables
                        .season_ranking(stat, table.year, cutoff)
                        .into_iter()
                        .map(|e| BoardRow {
                            rank: e.rank,
                            position: position(&e.id),
                            player_id: e.id,
                            value: e.value,
                            season: Some(table.year),
                        })
                        .collect(),
                })
                .collect();

            StatBoard {
                stat,
                label: stat.label(),
                pooled,
                career,
                by_year,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Player search
// ---------------------------------------------------------------------------

/// One player's rank on one board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub stat: Stat,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<Year>,
    pub value: f64,
    pub rank: usize,
}

/// Search result: where a player stands on every unbounded board they
/// appear on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecords {
    pub player_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_position: Option<String>,
    pub career: Vec<Standing>,
    /// Ordered by stat, then year.
    pub seasons: Vec<Standing>,
}

/// Look up `name` (case-insensitively) and collect their career and
/// per-season standings for every record stat where they have a positive
/// value. `None` when no such player exists.
pub fn search_player(
    tables: &StatTables,
    name: &str,
    primary_position: Option<String>,
) -> Option<PlayerRecords> {
    let player_id = tables.find_player(name)?.to_string();

    let career = RECORD_STATS
        .iter()
        .filter_map(|&stat| {
            let ranked = tables.career_ranking(stat, Cutoff::Unbounded);
            let entry = ranked.iter().find(|e| e.id == player_id)?;
            Some(Standing {
                stat,
                label: stat.label(),
                year: None,
                value: entry.value,
                rank: entry.rank,
            })
        })
        .collect();

    let seasons = RECORD_STATS
        .iter()
        .flat_map(|&stat| {
            let player_id = &player_id;
            tables.window().years().iter().filter_map(move |&year| {
                let ranked = tables.season_ranking(stat, year, Cutoff::Unbounded);
                let rank = rank_of(&ranked, player_id.as_str())?;
                let value = tables.record(player_id, year)?.value(stat);
                Some(Standing {
                    stat,
                    label: stat.label(),
                    year: Some(year),
                    value,
                    rank,
                })
            })
        })
        .collect();

    Some(PlayerRecords {
        player_id,
        primary_position,
        career,
        seasons,
    })
}
