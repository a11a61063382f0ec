// Best-partner mining over one season of the match event log.
//
// For a target player this counts, per partner: assists given to them, assists
// received from them, quarters played on the same team, and (for defenders
// only) quarters in which the team kept a clean sheet together.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::model::{same_name, same_team, MatchRecord, Quarter, TeamSheet, Year};
use crate::positions::unify_position;

/// Positions that make a player a defender for clean-sheet credit,
/// compared after `unify_position`.
pub const DEFENSIVE_POSITIONS: &[&str] = &["CB", "LB", "RB", "LWB", "RWB"];

/// The partner with the highest count, or an empty name and zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BestPartner {
    pub name: String,
    pub count: u32,
}

/// Partner name -> occurrences, in first-encountered order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnerTally {
    order: Vec<(String, u32)>,
    index: HashMap<String, usize>,
}

impl PartnerTally {
    fn bump(&mut self, name: &str) {
        match self.index.get(name) {
            Some(&i) => self.order[i].1 += 1,
            None => {
                self.index.insert(name.to_string(), self.order.len());
                self.order.push((name.to_string(), 1));
            }
        }
    }

    pub fn count(&self, name: &str) -> u32 {
        self.index.get(name).map(|&i| self.order[i].1).unwrap_or(0)
    }

    pub fn entries(&self) -> &[(String, u32)] {
        &self.order
    }

    /// Highest count; ties go to whichever partner was encountered first.
    pub fn best(&self) -> BestPartner {
        self.order
            .iter()
            .fold(BestPartner::default(), |best, (name, count)| {
                if *count > best.count {
                    BestPartner {
                        name: name.clone(),
                        count: *count,
                    }
                } else {
                    best
                }
            })
    }
}

impl<'a> FromIterator<&'a str> for PartnerTally {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut tally = PartnerTally::default();
        for name in iter {
            tally.bump(name);
        }
        tally
    }
}

/// Event-log problems skipped during mining.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDiagnostics {
    /// Matches whose date is missing or unparseable, so they belong to no season.
    pub undated_matches: usize,
    /// Goal/assist pairs missing the scorer or the provider.
    pub incomplete_pairs: usize,
    /// Goals whose scoring team matches no team of their quarter.
    pub unmatched_goal_teams: usize,
}

/// All four tallies for one player and season.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnerCounts {
    pub given: PartnerTally,
    pub received: PartnerTally,
    pub teammate: PartnerTally,
    pub clean_sheet: PartnerTally,
}

/// Mining result for one player and season.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestPartners {
    pub season: Year,
    pub is_defender: bool,
    /// Most frequent scorer of this player's assists.
    pub given: BestPartner,
    /// Most frequent provider of this player's goals.
    pub received: BestPartner,
    pub teammate: BestPartner,
    pub clean_sheet: BestPartner,
    pub diagnostics: EventDiagnostics,
}

/// Matches dated in `season`, newest first. Undated matches are left out.
fn season_matches(matches: &[MatchRecord], season: Year) -> (Vec<&MatchRecord>, usize) {
    let mut undated = 0;
    let mut dated: Vec<_> = matches
        .iter()
        .filter_map(|m| match m.played_at() {
            Some(at) => Some((at, m)),
            None => {
                undated += 1;
                None
            }
        })
        .filter(|(at, _)| chrono::Datelike::year(at) == season)
        .collect();
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    (dated.into_iter().map(|(_, m)| m).collect(), undated)
}

/// Whether `player` lined up at a defensive position in any quarter.
fn plays_defence(quarters: &[&Quarter], player: &str) -> bool {
    quarters
        .iter()
        .flat_map(|q| &q.teams)
        .flat_map(|t| &t.players)
        .any(|a| same_name(&a.name, player) && DEFENSIVE_POSITIONS.contains(&unify_position(a.position.trim())))
}

fn teammates<'q>(team: &'q TeamSheet, player: &'q str) -> impl Iterator<Item = &'q str> + 'q {
    team.players
        .iter()
        .filter(move |a| !same_name(&a.name, player))
        .map(|a| a.name.as_str())
}

/// Count every relationship for `player` in `season`.
pub fn count_partners(matches: &[MatchRecord], player: &str, season: Year) -> (PartnerCounts, bool, EventDiagnostics) {
    let (season_matches, undated_matches) = season_matches(matches, season);
    let quarters: Vec<&Quarter> = season_matches.iter().flat_map(|m| &m.quarters).collect();
    let is_defender = plays_defence(&quarters, player);

    let mut diagnostics = EventDiagnostics {
        undated_matches,
        ..EventDiagnostics::default()
    };
    let mut teammate_names: Vec<&str> = Vec::new();
    let mut clean_sheet_names: Vec<&str> = Vec::new();
    let mut given_names: Vec<&str> = Vec::new();
    let mut received_names: Vec<&str> = Vec::new();

    for quarter in &quarters {
        let own_team = quarter.teams.iter().find(|t| t.has_player(player));

        if let Some(team) = own_team {
            teammate_names.extend(teammates(team, player));

            if is_defender {
                let conceded = quarter
                    .goal_assist_pairs
                    .iter()
                    .filter_map(|p| p.scoring_team())
                    .filter(|scorer_team| {
                        quarter
                            .teams
                            .iter()
                            .filter(|t| t.name != team.name)
                            .any(|opponent| same_team(scorer_team, &opponent.name))
                    })
                    .count();
                if conceded == 0 {
                    clean_sheet_names.extend(teammates(team, player));
                }
            }
        }

        for pair in &quarter.goal_assist_pairs {
            let matched_team = pair
                .scoring_team()
                .is_some_and(|st| quarter.teams.iter().any(|t| same_team(st, &t.name)));
            if !matched_team {
                diagnostics.unmatched_goal_teams += 1;
            }

            let (Some(scorer), Some(provider)) = (pair.scorer(), pair.provider()) else {
                diagnostics.incomplete_pairs += 1;
                continue;
            };
            if same_name(provider, player) {
                given_names.push(scorer);
            }
            if same_name(scorer, player) {
                received_names.push(provider);
            }
        }
    }

    let counts = PartnerCounts {
        given: given_names.into_iter().collect(),
        received: received_names.into_iter().collect(),
        teammate: teammate_names.into_iter().collect(),
        clean_sheet: clean_sheet_names.into_iter().collect(),
    };
    (counts, is_defender, diagnostics)
}

/// Best assist-given, assist-received, teammate and clean-sheet partners of
/// `player` (case-insensitive) over the matches dated in `season`.
///
/// Matches are visited newest first; ties go to the first partner met.
pub fn best_partners(matches: &[MatchRecord], player: &str, season: Year) -> BestPartners {
    let (counts, is_defender, diagnostics) = count_partners(matches, player, season);
    if diagnostics.incomplete_pairs > 0 || diagnostics.unmatched_goal_teams > 0 {
        debug!(
            player,
            season,
            incomplete_pairs = diagnostics.incomplete_pairs,
            unmatched_goal_teams = diagnostics.unmatched_goal_teams,
            "skipped malformed goal records"
        );
    }
    BestPartners {
        season,
        is_defender,
        given: counts.given.best(),
        received: counts.received.best(),
        teammate: counts.teammate.best(),
        clean_sheet: counts.clean_sheet.best(),
        diagnostics,
    }
}
