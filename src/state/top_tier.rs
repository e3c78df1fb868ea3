//! Top-tier team sets computed from live standings.

use crate::state::categories::{Nation, NationMap};
use espn_api::{Competition, Standings, StandingsEntry, TeamId};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKey {
    Wins,
    Points,
}

impl StatKey {
    /// Names and abbreviations ESPN uses for this column.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            StatKey::Wins => &["wins", "w"],
            StatKey::Points => &["points", "pts"],
        }
    }

    fn value_of(self, entry: &StandingsEntry) -> Option<f64> {
        let aliases = self.aliases();
        entry
            .stats
            .iter()
            .find(|s| {
                aliases
                    .iter()
                    .any(|a| s.name.eq_ignore_ascii_case(a) || s.abbreviation.eq_ignore_ascii_case(a))
            })
            .map(|s| s.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopTierRule {
    /// The best `per_group` teams of every conference or league.
    TopPerGroup { per_group: usize, stat: StatKey },
    /// Every team within `margin` of the team ranked `cutoff_rank` overall.
    WithinOfCutoff { cutoff_rank: usize, margin: f64, stat: StatKey },
}

pub fn rule_for(competition: Competition) -> Option<TopTierRule> {
    use StatKey::*;
    use TopTierRule::*;
    let rule = match competition {
        Competition::Nfl => TopPerGroup { per_group: 7, stat: Wins },
        Competition::Nba => TopPerGroup { per_group: 6, stat: Wins },
        Competition::Wnba => TopPerGroup { per_group: 4, stat: Wins },
        Competition::Mlb => TopPerGroup { per_group: 6, stat: Wins },
        Competition::Nhl => TopPerGroup { per_group: 8, stat: Points },
        Competition::Mls => TopPerGroup { per_group: 7, stat: Points },
        Competition::PremierLeague => WithinOfCutoff { cutoff_rank: 4, margin: 6.0, stat: Points },
        // Prestige there comes from a club's domestic league, see `resolve_nations`.
        Competition::ChampionsLeague => return None,
    };
    Some(rule)
}

/// Teams tied with the last qualifying value are all included.
pub fn resolve(standings: &Standings, rule: TopTierRule) -> HashSet<TeamId> {
    match rule {
        TopTierRule::TopPerGroup { per_group, stat } => standings
            .groups
            .iter()
            .flat_map(|group| {
                let ranked = ranked(group.entries.iter(), stat);
                let threshold = cutoff(&ranked, per_group);
                ranked
                    .into_iter()
                    .filter(move |(_, value)| threshold.is_some_and(|t| *value >= t))
                    .map(|(id, _)| id)
            })
            .collect(),
        TopTierRule::WithinOfCutoff { cutoff_rank, margin, stat } => {
            let ranked = ranked(standings.entries(), stat);
            let Some(threshold) = cutoff(&ranked, cutoff_rank) else {
                return HashSet::new();
            };
            ranked
                .into_iter()
                .filter(|(_, value)| *value >= threshold - margin)
                .map(|(id, _)| id)
                .collect()
        }
    }
}

/// Entries carrying `stat`, best first.
fn ranked<'a>(entries: impl Iterator<Item = &'a StandingsEntry>, stat: StatKey) -> Vec<(TeamId, f64)> {
    let mut ranked: Vec<(TeamId, f64)> = entries
        .filter_map(|e| Some((e.team.id.clone(), stat.value_of(e)?)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Value of the `rank`-th entry (1-based), or of the last one when the table
/// is shorter.
fn cutoff(ranked: &[(TeamId, f64)], rank: usize) -> Option<f64> {
    if rank == 0 {
        return None;
    }
    ranked.get(rank - 1).or(ranked.last()).map(|(_, v)| *v)
}

/// Every club appearing in a nation's domestic table belongs to that nation.
pub fn resolve_nations(leagues: &[(Nation, Standings)]) -> NationMap {
    let mut nations = NationMap::new();
    for (nation, standings) in leagues {
        for entry in standings.entries() {
            nations.entry(entry.team.id.clone()).or_insert(*nation);
        }
    }
    nations
}
