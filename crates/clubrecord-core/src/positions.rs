// Per-player histogram of positions played, across every recorded match.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{same_name, MatchRecord};

/// Collapse numbered slot labels (`CB1`, `CB2`, ...) into their position.
pub fn unify_position(raw: &str) -> &str {
    match raw {
        "CB1" | "CB2" => "CB",
        "CDM1" | "CDM2" => "CDM",
        "CM1" | "CM2" => "CM",
        other => other,
    }
}

/// Position label -> quarters played there, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionHistogram {
    counts: Vec<(String, u32)>,
}

impl PositionHistogram {
    fn record(&mut self, label: &str) {
        match self.counts.iter_mut().find(|(l, _)| l == label) {
            Some((_, n)) => *n += 1,
            None => self.counts.push((label.to_string(), 1)),
        }
    }

    pub fn count(&self, label: &str) -> u32 {
        self.counts
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn entries(&self) -> &[(String, u32)] {
        &self.counts
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// Every label tied for the highest count, in first-seen order.
    pub fn modes(&self) -> Vec<&str> {
        let Some(max) = self.counts.iter().map(|(_, n)| *n).max() else {
            return Vec::new();
        };
        self.counts
            .iter()
            .filter(|(_, n)| *n == max)
            .map(|(l, _)| l.as_str())
            .collect()
    }

    /// The modes joined for display (`"CB, LB"`), or `None` when empty.
    pub fn primary(&self) -> Option<String> {
        let modes = self.modes();
        if modes.is_empty() {
            None
        } else {
            Some(modes.join(", "))
        }
    }
}

/// Position histograms for every player that appears in the match log.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    players: HashMap<String, PositionHistogram>,
}

impl PositionIndex {
    /// Scan every quarter of every match, regardless of year. Appearances
    /// without a player name or position are ignored.
    pub fn build(matches: &[MatchRecord]) -> Self {
        let mut players: HashMap<String, PositionHistogram> = HashMap::new();
        let appearances = matches
            .iter()
            .flat_map(|m| &m.quarters)
            .flat_map(|q| &q.teams)
            .flat_map(|t| &t.players)
            .filter(|a| !a.name.trim().is_empty() && !a.position.trim().is_empty());
        for appearance in appearances {
            players
                .entry(appearance.name.clone())
                .or_default()
                .record(unify_position(appearance.position.trim()));
        }
        Self { players }
    }

    /// Histogram for `name`, exact match first, then case-insensitively.
    pub fn histogram(&self, name: &str) -> Option<&PositionHistogram> {
        self.players.get(name).or_else(|| {
            self.players
                .iter()
                .find(|(recorded, _)| same_name(recorded, name))
                .map(|(_, h)| h)
        })
    }

    pub fn primary_position(&self, name: &str) -> Option<String> {
        self.histogram(name)?.primary()
    }

    /// Every player with a primary position, sorted by name.
    pub fn primary_positions(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .players
            .iter()
            .filter_map(|(name, h)| Some((name.clone(), h.primary()?)))
            .collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
