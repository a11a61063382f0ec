// Player history view: season-by-season records, career summary, podium
// badges and best partners for a single player.

use serde::Serialize;

use crate::model::{
    CareerTotal, MatchRecord, SeasonRecord, Stat, Year, CAREER_BADGE_STATS, SEASON_BADGE_STATS,
};
use crate::partners::{best_partners, BestPartners};
use crate::ranking::{rank_entries, rank_of, Cutoff, RankedEntry};
use crate::tables::StatTables;

/// Podium for one stat: everyone ranked within the podium, plus where the
/// player stands in the full ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Podium {
    pub stat: Stat,
    pub label: &'static str,
    pub podium: Vec<RankedEntry<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_rank: Option<usize>,
}

impl Podium {
    /// Whether the player holds a podium spot on this stat.
    pub fn is_badge(&self, podium_size: usize) -> bool {
        self.player_rank.is_some_and(|r| r <= podium_size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonPodiums {
    pub year: Year,
    pub podiums: Vec<Podium>,
}

/// Career summary shown in the history header.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerSummary {
    pub goals: u32,
    pub assists: u32,
    pub matches: u32,
    pub clean_sheets: u32,
    pub attack_points: u32,
    pub top3: u32,
    pub top8: u32,
    pub win_rate: u32,
}

impl From<&CareerTotal> for CareerSummary {
    fn from(total: &CareerTotal) -> Self {
        Self {
            goals: total.goals,
            assists: total.assists,
            matches: total.matches,
            clean_sheets: total.clean_sheets,
            attack_points: total.attack_points,
            top3: total.mom_top3_count,
            top8: total.mom_top8_count,
            win_rate: total.win_rate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHistory {
    pub player_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_position: Option<String>,
    /// Ascending by year; zero records where the player has no snapshot.
    pub seasons: Vec<SeasonRecord>,
    pub career: CareerSummary,
    /// True when any season shows at least one match.
    pub has_data: bool,
    pub season_podiums: Vec<SeasonPodiums>,
    pub career_podiums: Vec<Podium>,
    /// Years in which the player holds at least one podium spot.
    pub badge_years: Vec<Year>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partners: Option<BestPartners>,
}

/// Settings that shape a history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryOptions {
    pub podium_size: usize,
    /// Season mined for best partners; `None` skips partner mining.
    pub partner_season: Option<Year>,
}

fn podium(
    stat: Stat,
    ranked: Vec<RankedEntry<String>>,
    player_id: &str,
    podium_size: usize,
) -> Podium {
    let player_rank = rank_of(&ranked, player_id);
    let podium = ranked.into_iter().take_while(|e| e.rank <= podium_size).collect();
    Podium {
        stat,
        label: stat.label(),
        podium,
        player_rank,
    }
}

/// Season ranking for badges. Past years only rank players who actually
/// played that season; the current year ranks every live document.
fn badge_ranking(tables: &StatTables, stat: Stat, year: Year) -> Vec<RankedEntry<String>> {
    let Some(table) = tables.season(year) else {
        return Vec::new();
    };
    let is_current = year == tables.window().current();
    rank_entries(
        table
            .records
            .iter()
            .filter(|(_, r)| is_current || r.matches > 0)
            .map(|(id, r)| (id.clone(), r.value(stat))),
        Cutoff::Unbounded,
    )
}

/// Assemble the history view for `player_id`. `None` when the player is not
/// in the `players` collection.
pub fn player_history(
    tables: &StatTables,
    player_id: &str,
    primary_position: Option<String>,
    options: HistoryOptions,
    matches: &[MatchRecord],
) -> Option<PlayerHistory> {
    let career_total = tables.career(player_id)?;
    let window = tables.window();

    let seasons: Vec<SeasonRecord> = window
        .years()
        .iter()
        .map(|&year| {
            tables
                .record(player_id, year)
                .cloned()
                .unwrap_or_else(|| SeasonRecord::empty(year))
        })
        .collect();
    let has_data = seasons.iter().any(|s| s.matches > 0);

    let season_podiums: Vec<SeasonPodiums> = window
        .years()
        .iter()
        .map(|&year| SeasonPodiums {
            year,
            podiums: SEASON_BADGE_STATS
                .iter()
                .map(|&stat| {
                    podium(stat, badge_ranking(tables, stat, year), player_id, options.podium_size)
                })
                .collect(),
        })
        .collect();

    let career_podiums: Vec<Podium> = CAREER_BADGE_STATS
        .iter()
        .map(|&stat| {
            podium(
                stat,
                tables.career_ranking(stat, Cutoff::Unbounded),
                player_id,
                options.podium_size,
            )
        })
        .collect();

    let badge_years = season_podiums
        .iter()
        .filter(|s| s.podiums.iter().any(|p| p.is_badge(options.podium_size)))
        .map(|s| s.year)
        .collect();

    let partners = options
        .partner_season
        .map(|season| best_partners(matches, player_id, season));

    Some(PlayerHistory {
        player_id: player_id.to_string(),
        primary_position,
        seasons,
        career: CareerSummary::from(career_total),
        has_data,
        season_podiums,
        career_podiums,
        badge_years,
        partners,
    })
}
