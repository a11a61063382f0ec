// Document shapes read from the store and the per-season / career records
// folded from them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Calendar year of a reporting season.
pub type Year = i32;

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// A rankable statistic. Serialized with the document field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stat {
    Goals,
    Assists,
    CleanSheets,
    Matches,
    Win,
    Draw,
    Lose,
    WinRate,
    PersonalPoints,
    MomScore,
    MomTop3Count,
    MomTop8Count,
    /// Goals + assists.
    AttackPoints,
}

/// Stats shown on the records board (leaderboards and player search).
pub const RECORD_STATS: &[Stat] = &[
    Stat::Goals,
    Stat::Assists,
    Stat::CleanSheets,
    Stat::Matches,
    Stat::MomScore,
    Stat::PersonalPoints,
];

/// Stats checked for per-season podium badges on the player history view.
pub const SEASON_BADGE_STATS: &[Stat] = &[
    Stat::Goals,
    Stat::Assists,
    Stat::CleanSheets,
    Stat::Matches,
    Stat::MomTop3Count,
    Stat::MomTop8Count,
];

/// Stats checked for career podium badges on the player history view.
pub const CAREER_BADGE_STATS: &[Stat] = &[
    Stat::Goals,
    Stat::Assists,
    Stat::Matches,
    Stat::CleanSheets,
    Stat::AttackPoints,
    Stat::MomTop3Count,
    Stat::MomTop8Count,
];

impl Stat {
    pub const ALL: &'static [Stat] = &[
        Stat::Goals,
        Stat::Assists,
        Stat::CleanSheets,
        Stat::Matches,
        Stat::Win,
        Stat::Draw,
        Stat::Lose,
        Stat::WinRate,
        Stat::PersonalPoints,
        Stat::MomScore,
        Stat::MomTop3Count,
        Stat::MomTop8Count,
        Stat::AttackPoints,
    ];

    /// Field name used by the document store.
    pub fn key(&self) -> &'static str {
        match self {
            Stat::Goals => "goals",
            Stat::Assists => "assists",
            Stat::CleanSheets => "cleanSheets",
            Stat::Matches => "matches",
            Stat::Win => "win",
            Stat::Draw => "draw",
            Stat::Lose => "lose",
            Stat::WinRate => "winRate",
            Stat::PersonalPoints => "personalPoints",
            Stat::MomScore => "momScore",
            Stat::MomTop3Count => "momTop3Count",
            Stat::MomTop8Count => "momTop8Count",
            Stat::AttackPoints => "attackPoints",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Stat::Goals => "Goals",
            Stat::Assists => "Assists",
            Stat::CleanSheets => "Clean sheets",
            Stat::Matches => "Appearances",
            Stat::Win => "Wins",
            Stat::Draw => "Draws",
            Stat::Lose => "Losses",
            Stat::WinRate => "Win rate (%)",
            Stat::PersonalPoints => "Personal points",
            Stat::MomScore => "MOM score",
            Stat::MomTop3Count => "MOM top 3",
            Stat::MomTop8Count => "MOM top 8",
            Stat::AttackPoints => "Attack points",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Stat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Stat::ALL
            .iter()
            .copied()
            .find(|stat| stat.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown stat `{wanted}`"))
    }
}

// ---------------------------------------------------------------------------
// Raw player documents
// ---------------------------------------------------------------------------

/// The counter fields shared by the live player document and the dated
/// history snapshots. Every field is optional in the store and defaults to
/// zero; numbers stored as integers, doubles or numeric strings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerStats {
    #[serde(deserialize_with = "lenient_count")]
    pub goals: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub assists: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub clean_sheets: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub matches: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub win: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub draw: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub lose: u32,
    #[serde(deserialize_with = "lenient_score")]
    pub win_rate: f64,
    #[serde(deserialize_with = "lenient_score")]
    pub personal_points: f64,
    #[serde(deserialize_with = "lenient_score")]
    pub mom_score: f64,
    #[serde(deserialize_with = "lenient_count")]
    pub mom_top3_count: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub mom_top8_count: u32,
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// A document from the `players` collection: the id plus the live
/// current-season counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDocument {
    pub id: String,
    #[serde(flatten)]
    pub stats: PlayerStats,
}

impl PlayerDocument {
    pub fn new(id: impl Into<String>, stats: PlayerStats) -> Self {
        Self {
            id: id.into(),
            stats,
        }
    }
}

fn number_of(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_of)
        .map(|n| n.max(0.0).round().min(u32::MAX as f64) as u32)
        .unwrap_or(0))
}

fn lenient_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_of).unwrap_or(0.0).max(0.0))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

/// Treat an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Season records and career totals
// ---------------------------------------------------------------------------

/// One player, one year. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRecord {
    pub year: Year,
    pub goals: u32,
    pub assists: u32,
    pub clean_sheets: u32,
    pub matches: u32,
    pub win: u32,
    pub draw: u32,
    pub lose: u32,
    /// Percentage, rounded to the nearest integer.
    pub win_rate: u32,
    pub personal_points: f64,
    pub mom_score: f64,
    pub mom_top3_count: u32,
    pub mom_top8_count: u32,
}

impl SeasonRecord {
    /// All-zero record, used when a player has no snapshot for `year`.
    pub fn empty(year: Year) -> Self {
        Self::from_stats(year, &PlayerStats::default())
    }

    pub fn from_stats(year: Year, stats: &PlayerStats) -> Self {
        Self {
            year,
            goals: stats.goals,
            assists: stats.assists,
            clean_sheets: stats.clean_sheets,
            matches: stats.matches,
            win: stats.win,
            draw: stats.draw,
            lose: stats.lose,
            win_rate: stats.win_rate.round().max(0.0) as u32,
            personal_points: stats.personal_points,
            mom_score: stats.mom_score,
            mom_top3_count: stats.mom_top3_count,
            mom_top8_count: stats.mom_top8_count,
        }
    }

    pub fn attack_points(&self) -> u32 {
        self.goals.saturating_add(self.assists)
    }

    pub fn value(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Goals => self.goals as f64,
            Stat::Assists => self.assists as f64,
            Stat::CleanSheets => self.clean_sheets as f64,
            Stat::Matches => self.matches as f64,
            Stat::Win => self.win as f64,
            Stat::Draw => self.draw as f64,
            Stat::Lose => self.lose as f64,
            Stat::WinRate => self.win_rate as f64,
            Stat::PersonalPoints => self.personal_points,
            Stat::MomScore => self.mom_score,
            Stat::MomTop3Count => self.mom_top3_count as f64,
            Stat::MomTop8Count => self.mom_top8_count as f64,
            Stat::AttackPoints => self.attack_points() as f64,
        }
    }
}

/// One player summed across every available season of the window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerTotal {
    pub player_id: String,
    /// Position recorded on the live player document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Number of season records folded in.
    pub seasons: usize,
    pub goals: u32,
    pub assists: u32,
    pub clean_sheets: u32,
    pub matches: u32,
    pub win: u32,
    pub draw: u32,
    pub lose: u32,
    pub personal_points: f64,
    pub mom_score: f64,
    pub mom_top3_count: u32,
    pub mom_top8_count: u32,
    pub attack_points: u32,
}

impl CareerTotal {
    pub fn new(player_id: impl Into<String>, position: Option<String>) -> Self {
        Self {
            player_id: player_id.into(),
            position,
            ..Self::default()
        }
    }

    /// Fold one more season into the total.
    pub fn plus(mut self, record: &SeasonRecord) -> Self {
        self.seasons += 1;
        self.goals = self.goals.saturating_add(record.goals);
        self.assists = self.assists.saturating_add(record.assists);
        self.clean_sheets = self.clean_sheets.saturating_add(record.clean_sheets);
        self.matches = self.matches.saturating_add(record.matches);
        self.win = self.win.saturating_add(record.win);
        self.draw = self.draw.saturating_add(record.draw);
        self.lose = self.lose.saturating_add(record.lose);
        self.personal_points += record.personal_points;
        self.mom_score += record.mom_score;
        self.mom_top3_count = self.mom_top3_count.saturating_add(record.mom_top3_count);
        self.mom_top8_count = self.mom_top8_count.saturating_add(record.mom_top8_count);
        self.attack_points = self.attack_points.saturating_add(record.attack_points());
        self
    }

    /// Career win rate: wins over appearances, as a rounded percentage.
    pub fn win_rate(&self) -> u32 {
        if self.matches == 0 {
            return 0;
        }
        (self.win as f64 * 100.0 / self.matches as f64).round() as u32
    }

    pub fn value(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Goals => self.goals as f64,
            Stat::Assists => self.assists as f64,
            Stat::CleanSheets => self.clean_sheets as f64,
            Stat::Matches => self.matches as f64,
            Stat::Win => self.win as f64,
            Stat::Draw => self.draw as f64,
            Stat::Lose => self.lose as f64,
            Stat::WinRate => self.win_rate() as f64,
            Stat::PersonalPoints => self.personal_points,
            Stat::MomScore => self.mom_score,
            Stat::MomTop3Count => self.mom_top3_count as f64,
            Stat::MomTop8Count => self.mom_top8_count as f64,
            Stat::AttackPoints => self.attack_points as f64,
        }
    }
}

// ---------------------------------------------------------------------------
// Match event log
// ---------------------------------------------------------------------------

/// A document from the `matches` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quarters: Vec<Quarter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quarter {
    #[serde(default, deserialize_with = "null_as_default")]
    pub teams: Vec<TeamSheet>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub goal_assist_pairs: Vec<GoalAssistPair>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSheet {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub players: Vec<Appearance>,
}

/// A player fielded in one quarter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalAssistPair {
    #[serde(default)]
    pub goal: Option<GoalCredit>,
    #[serde(default)]
    pub assist: Option<AssistCredit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalCredit {
    #[serde(default, deserialize_with = "lenient_text")]
    pub player: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub team: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistCredit {
    #[serde(default, deserialize_with = "lenient_text")]
    pub player: Option<String>,
}

impl GoalAssistPair {
    pub fn scorer(&self) -> Option<&str> {
        self.goal.as_ref()?.player.as_deref()
    }

    pub fn provider(&self) -> Option<&str> {
        self.assist.as_ref()?.player.as_deref()
    }

    pub fn scoring_team(&self) -> Option<&str> {
        self.goal.as_ref()?.team.as_deref()
    }
}

impl TeamSheet {
    pub fn has_player(&self, name: &str) -> bool {
        self.players.iter().any(|p| same_name(&p.name, name))
    }
}

impl MatchRecord {
    /// When the match was played, if the date parses.
    pub fn played_at(&self) -> Option<NaiveDateTime> {
        parse_match_date(self.date.as_deref()?)
    }

    pub fn year(&self) -> Option<Year> {
        self.played_at().map(|at| at.year())
    }
}

/// Parse the assorted date encodings seen in match documents: RFC 3339
/// timestamps, ISO date-times without offset, and plain dates. Offset
/// timestamps keep their recorded wall-clock time.
pub fn parse_match_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    const DATE_TIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Player names are compared case-insensitively everywhere.
pub fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Team names are compared case-insensitively after trimming whitespace.
pub fn same_team(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_zero() {
        let stats: PlayerStats = serde_json::from_str(r#"{"goals": 4}"#).unwrap();
        assert_eq!(stats.goals, 4);
        assert_eq!(stats.assists, 0);
        assert_eq!(stats.mom_score, 0.0);
        assert!(stats.position.is_none());
    }

    #[test]
    fn numbers_accept_doubles_strings_and_null() {
        let stats: PlayerStats = serde_json::from_str(
            r#"{"goals": 3.0, "assists": "2", "matches": null, "momScore": "7.5", "winRate": 66.6}"#,
        )
        .unwrap();
        assert_eq!(stats.goals, 3);
        assert_eq!(stats.assists, 2);
        assert_eq!(stats.matches, 0);
        assert!((stats.mom_score - 7.5).abs() < f64::EPSILON);
        assert_eq!(SeasonRecord::from_stats(2024, &stats).win_rate, 67);
    }

    #[test]
    fn player_document_flattens_stats() {
        let doc: PlayerDocument =
            serde_json::from_str(r#"{"id": "kim", "goals": 2, "position": "CB"}"#).unwrap();
        assert_eq!(doc.id, "kim");
        assert_eq!(doc.stats.goals, 2);
        assert_eq!(doc.stats.position.as_deref(), Some("CB"));
    }

    #[test]
    fn stat_keys_round_trip_through_from_str() {
        for stat in Stat::ALL {
            assert_eq!(stat.key().parse::<Stat>().unwrap(), *stat);
        }
        assert_eq!("CLEANSHEETS".parse::<Stat>().unwrap(), Stat::CleanSheets);
        assert!("offsides".parse::<Stat>().is_err());
    }

    #[test]
    fn career_total_sums_and_derives_attack_points() {
        let a = SeasonRecord::from_stats(
            2023,
            &PlayerStats {
                goals: 3,
                assists: 1,
                matches: 10,
                win: 5,
                ..PlayerStats::default()
            },
        );
        let b = SeasonRecord::from_stats(
            2024,
            &PlayerStats {
                goals: 5,
                assists: 2,
                matches: 10,
                win: 8,
                ..PlayerStats::default()
            },
        );
        let total = CareerTotal::new("kim", None).plus(&a).plus(&b);
        assert_eq!(total.seasons, 2);
        assert_eq!(total.goals, 8);
        assert_eq!(total.attack_points, 11);
        assert_eq!(total.value(Stat::AttackPoints), 11.0);
        assert_eq!(total.win_rate(), 65);
    }

    #[test]
    fn career_total_saturates_instead_of_overflowing() {
        let season = |year| {
            SeasonRecord::from_stats(
                year,
                &PlayerStats {
                    goals: 3_000_000_000,
                    assists: 2_000_000_000,
                    ..PlayerStats::default()
                },
            )
        };
        let record = season(2024);
        assert_eq!(record.attack_points(), u32::MAX);

        let total = CareerTotal::new("kim", None).plus(&record).plus(&season(2025));
        assert_eq!(total.goals, u32::MAX);
        assert_eq!(total.assists, 4_000_000_000);
        assert_eq!(total.attack_points, u32::MAX);
    }

    #[test]
    fn offset_dates_keep_their_local_year() {
        let m = MatchRecord {
            date: Some("2025-01-01T00:30:00+09:00".into()),
            ..MatchRecord::default()
        };
        assert_eq!(m.year(), Some(2025));
        let at = parse_match_date("2025-01-01T00:30:00+09:00").unwrap();
        assert_eq!(at.format("%H:%M").to_string(), "00:30");
    }

    #[test]
    fn match_dates_parse_in_several_shapes() {
        for raw in ["2025-03-01", "2025-03-01T10:00:00Z", "2025-03-01T19:30", "2025.03.01"] {
            let m = MatchRecord {
                date: Some(raw.into()),
                ..MatchRecord::default()
            };
            assert_eq!(m.year(), Some(2025), "failed for {raw}");
        }
        let undated = MatchRecord::default();
        assert_eq!(undated.year(), None);
        assert_eq!(parse_match_date("next tuesday"), None);
    }

    #[test]
    fn match_record_tolerates_nulls() {
        let m: MatchRecord = serde_json::from_str(
            r#"{"date": "2025-05-05", "quarters": [{"teams": null, "goalAssistPairs": [{"goal": {"player": "a", "team": null}}]}]}"#,
        )
        .unwrap();
        assert!(m.quarters[0].teams.is_empty());
        let pair = &m.quarters[0].goal_assist_pairs[0];
        assert_eq!(pair.scorer(), Some("a"));
        assert_eq!(pair.provider(), None);
        assert_eq!(pair.scoring_team(), None);
    }

    #[test]
    fn name_comparisons() {
        assert!(same_name("Kim", "kIM"));
        assert!(!same_name("Kim ", "Kim"));
        assert!(same_team("  Red ", "red"));
    }
}
