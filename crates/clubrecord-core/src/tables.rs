// Per-year stat tables, career totals and the rankings derived from them.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::model::{same_name, CareerTotal, SeasonRecord, Stat, Year};
use crate::ranking::{rank_entries, Cutoff, RankedEntry};
use crate::snapshot::{LeagueSnapshot, SeasonWindow, SnapshotLookup};

/// Key of one pooled-season entry: a player in a given year.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonKey {
    pub player_id: String,
    pub year: Year,
}

/// One year of records for every player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonTable {
    pub year: Year,
    /// False when a history read for this year failed; `records` is then empty.
    pub available: bool,
    pub records: BTreeMap<String, SeasonRecord>,
}

/// Frozen aggregation of a `LeagueSnapshot`.
#[derive(Debug, Clone)]
pub struct StatTables {
    window: SeasonWindow,
    seasons: BTreeMap<Year, SeasonTable>,
    careers: BTreeMap<String, CareerTotal>,
}

impl StatTables {
    /// Fold the snapshot into per-year tables and career totals.
    ///
    /// The current season is read from the live player documents; every other
    /// year from that player's snapshot, or all zeros when there is none.
    /// Years with a failed read are kept as empty, unavailable tables and do
    /// not contribute to career totals.
    pub fn build(snapshot: &LeagueSnapshot) -> Self {
        let window = snapshot.window().clone();

        let seasons: BTreeMap<Year, SeasonTable> = window
            .years()
            .iter()
            .map(|&year| {
                let available = snapshot.is_year_available(year);
                let records = if !available {
                    BTreeMap::new()
                } else if year == window.current() {
                    snapshot
                        .players()
                        .iter()
                        .map(|p| (p.id.clone(), SeasonRecord::from_stats(year, &p.stats)))
                        .collect()
                } else {
                    snapshot
                        .players()
                        .iter()
                        .map(|p| {
                            let record = match snapshot.lookup(&p.id, year) {
                                SnapshotLookup::Found(stats) => SeasonRecord::from_stats(year, stats),
                                SnapshotLookup::Missing | SnapshotLookup::Failed(_) => {
                                    SeasonRecord::empty(year)
                                }
                            };
                            (p.id.clone(), record)
                        })
                        .collect()
                };
                (
                    year,
                    SeasonTable {
                        year,
                        available,
                        records,
                    },
                )
            })
            .collect();

        let careers: BTreeMap<String, CareerTotal> = snapshot
            .players()
            .iter()
            .map(|p| {
                let total = seasons
                    .values()
                    .filter_map(|table| table.records.get(&p.id))
                    .fold(CareerTotal::new(p.id.clone(), p.stats.position.clone()), CareerTotal::plus);
                (p.id.clone(), total)
            })
            .collect();

        debug!(
            players = careers.len(),
            years = seasons.len(),
            "built stat tables"
        );

        Self {
            window,
            seasons,
            careers,
        }
    }

    pub fn window(&self) -> &SeasonWindow {
        &self.window
    }

    pub fn season(&self, year: Year) -> Option<&SeasonTable> {
        self.seasons.get(&year)
    }

    pub fn seasons(&self) -> impl Iterator<Item = &SeasonTable> {
        self.seasons.values()
    }

    pub fn record(&self, player_id: &str, year: Year) -> Option<&SeasonRecord> {
        self.seasons.get(&year)?.records.get(player_id)
    }

    pub fn career(&self, player_id: &str) -> Option<&CareerTotal> {
        self.careers.get(player_id)
    }

    pub fn careers(&self) -> impl Iterator<Item = &CareerTotal> {
        self.careers.values()
    }

    /// Position on the live player document.
    pub fn position_of(&self, player_id: &str) -> Option<&str> {
        self.careers.get(player_id)?.position.as_deref()
    }

    /// Resolve a typed name to a player id, exact match first, then
    /// case-insensitively.
    pub fn find_player(&self, name: &str) -> Option<&str> {
        if let Some((id, _)) = self.careers.get_key_value(name) {
            return Some(id.as_str());
        }
        self.careers
            .keys()
            .find(|id| same_name(id, name))
            .map(String::as_str)
    }

    // -----------------------------------------------------------------------
    // Rankings
    // -----------------------------------------------------------------------

    /// Ranking of one stat within one year. Empty for unknown or unavailable years.
    pub fn season_ranking(&self, stat: Stat, year: Year, cutoff: Cutoff) -> Vec<RankedEntry<String>> {
        let Some(table) = self.seasons.get(&year) else {
            return Vec::new();
        };
        rank_entries(
            table
                .records
                .iter()
                .map(|(id, record)| (id.clone(), record.value(stat))),
            cutoff,
        )
    }

    /// Ranking of one stat over career totals.
    pub fn career_ranking(&self, stat: Stat, cutoff: Cutoff) -> Vec<RankedEntry<String>> {
        rank_entries(
            self.careers
                .iter()
                .map(|(id, total)| (id.clone(), total.value(stat))),
            cutoff,
        )
    }

    /// Ranking of one stat over every (player, year) entry pooled together,
    /// so one player can appear once per qualifying season.
    pub fn pooled_ranking(&self, stat: Stat, cutoff: Cutoff) -> Vec<RankedEntry<SeasonKey>> {
        let pooled = self.seasons.values().flat_map(|table| {
            table.records.iter().map(move |(id, record)| {
                (
                    SeasonKey {
                        player_id: id.clone(),
                        year: table.year,
                    },
                    record.value(stat),
                )
            })
        });
        rank_entries(pooled, cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlayerDocument, PlayerStats};

    fn stats(goals: u32, matches: u32) -> PlayerStats {
        PlayerStats {
            goals,
            matches,
            ..PlayerStats::default()
        }
    }

    fn found(id: &str, year: Year, s: PlayerStats) -> ((String, Year), SnapshotLookup) {
        ((id.to_string(), year), SnapshotLookup::Found(s))
    }

    fn sample() -> StatTables {
        let window = SeasonWindow::new(&[2023, 2024], 2025);
        let players = vec![
            PlayerDocument::new("kim", stats(2, 4)),
            PlayerDocument::new("lee", stats(6, 5)),
            PlayerDocument::new("park", stats(0, 0)),
        ];
        let history = vec![
            found("kim", 2023, stats(3, 10)),
            found("kim", 2024, stats(5, 12)),
            found("lee", 2024, stats(1, 3)),
            found("park", 2023, stats(5, 9)),
        ];
        StatTables::build(&LeagueSnapshot::from_parts(window, players, history, vec![]))
    }

    #[test]
    fn career_totals_sum_every_year() {
        let tables = sample();
        for total in tables.careers() {
            let goals: u32 = tables
                .seasons()
                .filter_map(|t| t.records.get(&total.player_id))
                .map(|r| r.goals)
                .sum();
            let matches: u32 = tables
                .seasons()
                .filter_map(|t| t.records.get(&total.player_id))
                .map(|r| r.matches)
                .sum();
            assert_eq!(total.goals, goals);
            assert_eq!(total.matches, matches);
        }
        assert_eq!(tables.career("kim").unwrap().goals, 10);
        assert_eq!(tables.career("kim").unwrap().seasons, 3);
    }

    #[test]
    fn missing_snapshot_is_zero_record() {
        let tables = sample();
        let record = tables.record("lee", 2023).unwrap();
        assert_eq!(record, &SeasonRecord::empty(2023));
    }

    #[test]
    fn current_year_comes_from_live_document() {
        let tables = sample();
        assert_eq!(tables.record("lee", 2025).unwrap().goals, 6);
    }

    #[test]
    fn season_ranking_excludes_zero() {
        let tables = sample();
        let ranked = tables.season_ranking(Stat::Goals, 2023, Cutoff::Unbounded);
        let ids: Vec<(&str, usize)> = ranked.iter().map(|e| (e.id.as_str(), e.rank)).collect();
        assert_eq!(ids, vec![("park", 1), ("kim", 2)]);
        assert!(tables.season_ranking(Stat::Goals, 1999, Cutoff::Unbounded).is_empty());
    }

    #[test]
    fn pooled_ranking_repeats_players() {
        let tables = sample();
        let pooled = tables.pooled_ranking(Stat::Goals, Cutoff::Top(10));
        let kim_entries = pooled.iter().filter(|e| e.id.player_id == "kim").count();
        assert_eq!(kim_entries, 3);
        // lee 2025 (6) first, then kim 2024 and park 2023 tied on 5.
        assert_eq!(pooled[0].id.player_id, "lee");
        assert_eq!(pooled[1].rank, 2);
        assert_eq!(pooled[2].rank, 2);
        assert_eq!(pooled[3].rank, 4);
    }

    #[test]
    fn career_ranking_uses_totals() {
        let tables = sample();
        let ranked = tables.career_ranking(Stat::Goals, Cutoff::Unbounded);
        assert_eq!(ranked[0].id, "kim");
        assert_eq!(ranked[0].value, 10.0);
    }

    #[test]
    fn failed_year_is_unavailable_and_excluded() {
        let window = SeasonWindow::new(&[2023, 2024], 2025);
        let players = vec![PlayerDocument::new("kim", stats(1, 1))];
        let history = vec![
            found("kim", 2023, stats(4, 4)),
            (("kim".to_string(), 2024), SnapshotLookup::Failed("timeout".into())),
        ];
        let tables = StatTables::build(&LeagueSnapshot::from_parts(window, players, history, vec![]));
        let table = tables.season(2024).unwrap();
        assert!(!table.available);
        assert!(table.records.is_empty());
        assert!(tables.season_ranking(Stat::Goals, 2024, Cutoff::Unbounded).is_empty());
        assert_eq!(tables.career("kim").unwrap().goals, 5);
        assert_eq!(tables.career("kim").unwrap().seasons, 2);
    }

    #[test]
    fn huge_counts_saturate_in_career_totals() {
        let huge = PlayerStats {
            goals: 3_000_000_000,
            assists: 2_000_000_000,
            ..PlayerStats::default()
        };
        let window = SeasonWindow::new(&[2024], 2025);
        let players = vec![PlayerDocument::new("kim", huge.clone())];
        let history = vec![found("kim", 2024, huge)];
        let tables = StatTables::build(&LeagueSnapshot::from_parts(window, players, history, vec![]));
        let total = tables.career("kim").unwrap();
        assert_eq!(total.goals, u32::MAX);
        assert_eq!(total.value(Stat::AttackPoints), u32::MAX as f64);
    }

    #[test]
    fn find_player_is_case_insensitive() {
        let tables = sample();
        assert_eq!(tables.find_player("kim"), Some("kim"));
        assert_eq!(tables.find_player("KIM"), Some("kim"));
        assert_eq!(tables.find_player("choi"), None);
    }
}
