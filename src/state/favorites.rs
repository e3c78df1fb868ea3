use crate::state::error::StateError;
use crate::state::storage::{KeyValueStore, StorageError};
use crate::state::watch_party::WatchPartySnapshot;
use espn_api::{Competition, IdNamespace, Standings, Team, TeamId};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const FAVORITES_KEY: &str = "gametime:favorite-teams";
pub const MAX_FAVORITES: usize = 10;

/// A followed team. Identity is `(id, league)`: ids repeat across sports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteTeam {
    pub id: TeamId,
    pub league: Competition,
    pub name: String,
    #[serde(default)]
    pub abbrev: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl FavoriteTeam {
    pub fn from_team(team: &Team, league: Competition) -> Self {
        Self {
            id: team.id.clone(),
            league,
            name: team.name.clone(),
            abbrev: team.abbrev.clone(),
            logo: team.logo.clone(),
        }
    }

    pub fn id_namespace(&self) -> IdNamespace {
        self.league.id_namespace()
    }

    fn is(&self, id: &TeamId, league: Competition) -> bool {
        &self.id == id && self.league == league
    }
}

/// Favorite ids grouped by the namespace their ids live in. Tiering only
/// compares ids within one namespace, so nothing flattens these into one set.
pub fn ids_by_namespace(teams: &[FavoriteTeam]) -> HashMap<IdNamespace, HashSet<TeamId>> {
    let mut grouped: HashMap<IdNamespace, HashSet<TeamId>> = HashMap::new();
    for team in teams {
        grouped.entry(team.id_namespace()).or_default().insert(team.id.clone());
    }
    grouped
}

/// Look a team up in a league table by id, abbreviation, name, or failing
/// those a name fragment.
pub fn find_team<'a>(standings: &'a Standings, query: &str) -> Option<&'a Team> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    let needle = query.to_lowercase();
    let teams: Vec<&Team> = standings.entries().map(|e| &e.team).collect();
    let exact = |t: &&Team| {
        t.id.as_str() == query
            || t.abbrev.eq_ignore_ascii_case(query)
            || t.name.to_lowercase() == needle
            || t.short_name.to_lowercase() == needle
    };
    let partial = |t: &&Team| t.name.to_lowercase().contains(&needle);
    teams
        .iter()
        .copied()
        .find(exact)
        .or_else(|| teams.iter().copied().find(partial))
}

/// Ordered favorite list, read through a cache that is dropped on write.
pub struct FavoritesStore {
    store: Arc<dyn KeyValueStore>,
    cached: Option<Vec<FavoriteTeam>>,
}

impl FavoritesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, cached: None }
    }

    pub fn load(&mut self, watch_party: Option<&WatchPartySnapshot>) -> Vec<FavoriteTeam> {
        if let Some(party) = watch_party {
            return party.teams.clone();
        }
        if let Some(teams) = &self.cached {
            return teams.clone();
        }

        let teams = match self.store.get(FAVORITES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("ignoring malformed favorites: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("could not read favorites: {e}");
                Vec::new()
            }
        };
        self.cached = Some(teams.clone());
        teams
    }

    pub fn add(&mut self, team: FavoriteTeam, watch_party: Option<&WatchPartySnapshot>) -> Result<(), StateError> {
        if watch_party.is_some() {
            return Err(StateError::ReadOnly);
        }
        let mut teams = self.load(None);
        if teams.iter().any(|t| t.is(&team.id, team.league)) {
            return Err(StateError::AlreadyFavorite { name: team.name });
        }
        if teams.len() >= MAX_FAVORITES {
            return Err(StateError::CapacityReached { max: MAX_FAVORITES });
        }
        teams.push(team);
        self.save(&teams)
    }

    pub fn remove(
        &mut self,
        id: &TeamId,
        league: Competition,
        watch_party: Option<&WatchPartySnapshot>,
    ) -> Result<FavoriteTeam, StateError> {
        if watch_party.is_some() {
            return Err(StateError::ReadOnly);
        }
        let mut teams = self.load(None);
        let index = find(&teams, id, league)?;
        let removed = teams.remove(index);
        self.save(&teams)?;
        Ok(removed)
    }

    /// Move a favorite to `position` (clamped to the end of the list).
    pub fn move_to(
        &mut self,
        id: &TeamId,
        league: Competition,
        position: usize,
        watch_party: Option<&WatchPartySnapshot>,
    ) -> Result<(), StateError> {
        if watch_party.is_some() {
            return Err(StateError::ReadOnly);
        }
        let mut teams = self.load(None);
        let index = find(&teams, id, league)?;
        let team = teams.remove(index);
        teams.insert(position.min(teams.len()), team);
        self.save(&teams)
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    fn save(&mut self, teams: &[FavoriteTeam]) -> Result<(), StateError> {
        self.cached = None;
        let payload = serde_json::to_string(teams).map_err(StorageError::from)?;
        self.store.set(FAVORITES_KEY, &payload)?;
        Ok(())
    }
}

fn find(teams: &[FavoriteTeam], id: &TeamId, league: Competition) -> Result<usize, StateError> {
    teams
        .iter()
        .position(|t| t.is(id, league))
        .ok_or_else(|| StateError::NotFavorite { id: id.clone(), league })
}

#[cfg(test)]
pub(crate) fn favorite(id: &str, league: Competition) -> FavoriteTeam {
    FavoriteTeam {
        id: TeamId::from(id),
        league,
        name: format!("Team {id}"),
        abbrev: id.to_owned(),
        logo: None,
    }
}
