// Integration tests for a full view load: store -> snapshot -> derived tables.
//
// These go through the public API only, using the JSON fixture in
// `tests/fixtures/league.json` or small stores built in place.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use clubrecord_core::history::{player_history, HistoryOptions};
use clubrecord_core::model::{MatchRecord, PlayerDocument, PlayerStats, Stat, Year};
use clubrecord_core::partners::{best_partners, BestPartner};
use clubrecord_core::positions::PositionIndex;
use clubrecord_core::ranking::Cutoff;
use clubrecord_core::records::{build_record_board, search_player};
use clubrecord_core::snapshot::{load_snapshot, LeagueSnapshot, SeasonWindow};
use clubrecord_core::store::{DocumentStore, MemoryStore, StoreError};
use clubrecord_core::tables::StatTables;

// ===========================================================================
// Test helpers
// ===========================================================================

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn window() -> SeasonWindow {
    SeasonWindow::new(&[2023, 2024], 2025)
}

async fn fixture_snapshot() -> LeagueSnapshot {
    let store = MemoryStore::from_path(&fixture("league.json")).expect("fixture should parse");
    load_snapshot(&store, window(), 4).await
}

fn stats(goals: u32, matches: u32) -> PlayerStats {
    PlayerStats {
        goals,
        matches,
        ..PlayerStats::default()
    }
}

/// Delegates to a `MemoryStore` but fails every history read for one year.
struct FailingYear {
    inner: MemoryStore,
    year: Year,
}

#[async_trait]
impl DocumentStore for FailingYear {
    async fn players(&self) -> Result<Vec<PlayerDocument>, StoreError> {
        self.inner.players().await
    }

    async fn player_history(&self, player_id: &str, year: Year) -> Result<Option<PlayerStats>, StoreError> {
        if year == self.year {
            return Err(StoreError::Status {
                url: format!("players/{player_id}/history/{year}"),
                status: 503,
            });
        }
        self.inner.player_history(player_id, year).await
    }

    async fn matches(&self) -> Result<Vec<MatchRecord>, StoreError> {
        self.inner.matches().await
    }
}

/// Fails the `matches` collection read outright.
struct NoMatches(MemoryStore);

#[async_trait]
impl DocumentStore for NoMatches {
    async fn players(&self) -> Result<Vec<PlayerDocument>, StoreError> {
        self.0.players().await
    }

    async fn player_history(&self, player_id: &str, year: Year) -> Result<Option<PlayerStats>, StoreError> {
        self.0.player_history(player_id, year).await
    }

    async fn matches(&self) -> Result<Vec<MatchRecord>, StoreError> {
        Err(StoreError::Network {
            url: "matches".into(),
            message: "connection reset".into(),
        })
    }
}

/// Records the highest number of history reads in flight at once.
#[derive(Default)]
struct ConcurrencyProbe {
    inner: MemoryStore,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl DocumentStore for ConcurrencyProbe {
    async fn players(&self) -> Result<Vec<PlayerDocument>, StoreError> {
        self.inner.players().await
    }

    async fn player_history(&self, player_id: &str, year: Year) -> Result<Option<PlayerStats>, StoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.player_history(player_id, year).await
    }

    async fn matches(&self) -> Result<Vec<MatchRecord>, StoreError> {
        self.inner.matches().await
    }
}

// ===========================================================================
// StatsAggregator
// ===========================================================================

#[tokio::test]
async fn two_seasons_pool_separately_and_sum_in_career() {
    let store = MemoryStore::new()
        .with_player(PlayerDocument::new("p1", stats(5, 2)))
        .with_history("p1", 2024, stats(3, 1));
    let snapshot = load_snapshot(&store, SeasonWindow::new(&[2024], 2025), 8).await;
    let tables = StatTables::build(&snapshot);

    let pooled = tables.pooled_ranking(Stat::Goals, Cutoff::Top(10));
    assert_eq!(pooled.len(), 2);
    assert!(pooled.iter().all(|e| e.id.player_id == "p1"));
    assert_eq!(pooled[0].id.year, 2025);
    assert_eq!(pooled[1].id.year, 2024);

    let career = tables.career_ranking(Stat::Goals, Cutoff::Top(10));
    assert_eq!(career.len(), 1);
    assert_eq!(career[0].value, 8.0);
    assert_eq!(career[0].rank, 1);
}

#[tokio::test]
async fn player_without_snapshots_has_live_career() {
    let store = MemoryStore::new().with_player(PlayerDocument::new("rookie", stats(7, 4)));
    let snapshot = load_snapshot(&store, window(), 8).await;
    let tables = StatTables::build(&snapshot);

    let career = tables.career("rookie").unwrap();
    assert_eq!(career.goals, 7);
    assert_eq!(career.matches, 4);
    assert_eq!(snapshot.diagnostics().missing_snapshots, 2);
    assert!(snapshot.diagnostics().is_clean());
}

#[tokio::test]
async fn fixture_career_totals_match_year_sums() {
    let snapshot = fixture_snapshot().await;
    assert!(snapshot.diagnostics().is_clean());
    assert_eq!(snapshot.diagnostics().found_snapshots, 3);

    let tables = StatTables::build(&snapshot);
    for total in tables.careers() {
        let matches: u32 = tables
            .seasons()
            .filter_map(|t| t.records.get(&total.player_id))
            .map(|r| r.matches)
            .sum();
        assert_eq!(total.matches, matches, "player {}", total.player_id);
    }
    assert_eq!(tables.career("kim").unwrap().goals, 10);
    assert_eq!(tables.career("lee").unwrap().goals, 3);
    assert_eq!(tables.record("lee", 2025).unwrap().win_rate, 40);
}

#[tokio::test]
async fn fixture_pooled_goals_ranking() {
    let tables = StatTables::build(&fixture_snapshot().await);
    let pooled: Vec<(String, Year, usize)> = tables
        .pooled_ranking(Stat::Goals, Cutoff::Top(10))
        .into_iter()
        .map(|e| (e.id.player_id, e.id.year, e.rank))
        .collect();
    assert_eq!(
        pooled,
        vec![
            ("kim".to_string(), 2024, 1),
            ("park".to_string(), 2023, 1),
            ("kim".to_string(), 2025, 3),
            ("lee".to_string(), 2025, 4),
            ("lee".to_string(), 2024, 5),
        ]
    );
}

#[tokio::test]
async fn failed_year_is_unavailable_everywhere() {
    let inner = MemoryStore::from_path(&fixture("league.json")).unwrap();
    let store = FailingYear { inner, year: 2023 };
    let snapshot = load_snapshot(&store, window(), 4).await;

    let diag = snapshot.diagnostics();
    assert_eq!(diag.unavailable_years, vec![2023]);
    assert_eq!(diag.failed_lookups, 4);
    assert!(!diag.is_clean());

    let tables = StatTables::build(&snapshot);
    assert!(tables.season_ranking(Stat::Goals, 2023, Cutoff::Unbounded).is_empty());
    // park's only goals were in 2023.
    assert_eq!(tables.career("park").unwrap().goals, 0);
    assert_eq!(tables.career("kim").unwrap().goals, 10);

    let board = build_record_board(&tables, 10);
    let goals = board.iter().find(|b| b.stat == Stat::Goals).unwrap();
    let year_2023 = goals.by_year.iter().find(|y| y.year == 2023).unwrap();
    assert!(!year_2023.available);
    assert!(year_2023.rows.is_empty());
}

#[tokio::test]
async fn failed_collection_degrades_to_empty() {
    let inner = MemoryStore::from_path(&fixture("league.json")).unwrap();
    let snapshot = load_snapshot(&NoMatches(inner), window(), 4).await;
    assert!(snapshot.matches().is_empty());
    assert!(snapshot.diagnostics().matches_error.is_some());
    assert_eq!(snapshot.players().len(), 4);

    let partners = best_partners(snapshot.matches(), "lee", 2024);
    assert_eq!(partners.teammate, BestPartner::default());
}

#[tokio::test]
async fn history_fan_out_is_bounded() {
    let mut inner = MemoryStore::new();
    for i in 0..12 {
        inner = inner.with_player(PlayerDocument::new(format!("p{i}"), stats(1, 1)));
    }
    let probe = ConcurrencyProbe {
        inner,
        ..ConcurrencyProbe::default()
    };
    let snapshot = load_snapshot(&probe, SeasonWindow::new(&[2022, 2023, 2024], 2025), 3).await;

    assert_eq!(probe.calls.load(Ordering::SeqCst), 36);
    assert!(probe.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(snapshot.diagnostics().missing_snapshots, 36);
}

// ===========================================================================
// PartnerMiner and PositionResolver over the fixture
// ===========================================================================

#[tokio::test]
async fn fixture_best_partners_for_defender() {
    let snapshot = fixture_snapshot().await;
    let lee = best_partners(snapshot.matches(), "LEE", 2024);

    assert!(lee.is_defender);
    // park and kim tie on two quarters; park was met first in the newest match.
    assert_eq!(lee.teammate, BestPartner { name: "park".into(), count: 2 });
    assert_eq!(lee.clean_sheet, BestPartner { name: "park".into(), count: 2 });
    assert_eq!(lee.given, BestPartner { name: "park".into(), count: 1 });
    assert_eq!(lee.received, BestPartner::default());
    assert_eq!(lee.diagnostics.undated_matches, 1);
    assert_eq!(lee.diagnostics.incomplete_pairs, 1);
}

#[tokio::test]
async fn fixture_best_partners_for_forward() {
    let snapshot = fixture_snapshot().await;
    let kim = best_partners(snapshot.matches(), "kim", 2024);

    assert!(!kim.is_defender);
    assert_eq!(kim.received, BestPartner { name: "lee".into(), count: 1 });
    assert_eq!(kim.teammate, BestPartner { name: "lee".into(), count: 2 });
    assert_eq!(kim.clean_sheet, BestPartner::default());

    // Nothing was played in 2025.
    let empty = best_partners(snapshot.matches(), "kim", 2025);
    assert_eq!(empty.teammate, BestPartner::default());
}

#[tokio::test]
async fn fixture_primary_positions() {
    let snapshot = fixture_snapshot().await;
    let positions = PositionIndex::build(snapshot.matches());
    assert_eq!(positions.primary_position("kim").as_deref(), Some("ST"));
    assert_eq!(positions.primary_position("lee").as_deref(), Some("CB"));
    assert_eq!(positions.primary_position("park").as_deref(), Some("CM"));
    assert_eq!(positions.histogram("park").unwrap().count("CM"), 3);
    assert_eq!(positions.primary_position("choi").as_deref(), Some("GK"));
}

// ===========================================================================
// Views
// ===========================================================================

#[tokio::test]
async fn fixture_search_and_history() {
    let snapshot = fixture_snapshot().await;
    let tables = StatTables::build(&snapshot);
    let positions = PositionIndex::build(snapshot.matches());

    let found = search_player(&tables, "Kim", positions.primary_position("kim")).unwrap();
    assert_eq!(found.primary_position.as_deref(), Some("ST"));
    let career_goals = found.career.iter().find(|s| s.stat == Stat::Goals).unwrap();
    assert_eq!((career_goals.rank, career_goals.value), (1, 10.0));

    let options = HistoryOptions {
        podium_size: 3,
        partner_season: Some(2024),
    };
    let history = player_history(&tables, "kim", None, options, snapshot.matches()).unwrap();
    assert!(history.has_data);
    assert_eq!(history.career.top3, 3);
    assert_eq!(history.career.attack_points, 13);
    assert_eq!(history.badge_years, vec![2024, 2025]);
    assert_eq!(
        history.partners.unwrap().received,
        BestPartner { name: "lee".into(), count: 1 }
    );

    let choi = player_history(&tables, "choi", None, options, snapshot.matches()).unwrap();
    assert!(!choi.has_data);
}
