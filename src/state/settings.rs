//! Big-game settings: which categories are shown for each competition.
//!
//! The stored document is versioned. Loading always yields a document at
//! [`CURRENT_SCHEMA_VERSION`] with every known competition present:
//!
//! 1. Legacy documents (a bare list of categories, or an object with a flat
//!    `categories` list) are expanded into a per-competition map at version 1.
//! 2. Competitions missing from the map are backfilled with their scheme's
//!    full default set.
//! 3. Each step in [`MIGRATIONS`] whose `from` version is at or above the stored
//!    version is applied once, in order.
//!
//! Steps only ever append a newly introduced category, or replace one
//! competition's list when its category scheme changes. Categories that no
//! longer exist are dropped when parsed.

use crate::state::categories::{CategoryKey, CategoryScheme, GameCategory};
use crate::state::error::StateError;
use crate::state::storage::{KeyValueStore, StorageError};
use crate::state::watch_party::WatchPartySnapshot;
use espn_api::Competition;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const SETTINGS_KEY: &str = "gametime:big-game-settings";
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

pub type PerCompetition = BTreeMap<Competition, Vec<CategoryKey>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    pub schema_version: u32,
    pub per_competition: PerCompetition,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            per_competition: Competition::ALL
                .into_iter()
                .map(|c| (c, CategoryScheme::of(c).categories()))
                .collect(),
        }
    }
}

impl SettingsDocument {
    pub fn enabled(&self, competition: Competition) -> &[CategoryKey] {
        self.per_competition
            .get(&competition)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// A competition missing from the map has nothing enabled.
    pub fn is_enabled(&self, category: CategoryKey, competition: Competition) -> bool {
        self.enabled(competition).contains(&category)
    }
}

// ---------------------------------------------------------------------------
// Migrations
// ---------------------------------------------------------------------------

pub struct Migration {
    /// Version this step upgrades from.
    pub from: u32,
    pub description: &'static str,
    pub apply: fn(SettingsDocument) -> SettingsDocument,
}

pub const MIGRATIONS: [Migration; 2] = [
    Migration {
        from: 1,
        description: "introduce playoff-preview",
        apply: introduce_playoff_preview,
    },
    Migration {
        from: 2,
        description: "champions-league switches to its own categories",
        apply: adopt_champions_league_scheme,
    },
];

/// Append `playoff-preview` to every competition on the generic scheme.
fn introduce_playoff_preview(mut doc: SettingsDocument) -> SettingsDocument {
    let added = CategoryKey::from(GameCategory::PlayoffPreview);
    for (competition, categories) in doc.per_competition.iter_mut() {
        if CategoryScheme::of(*competition) == CategoryScheme::Generic && !categories.contains(&added) {
            categories.push(added);
        }
    }
    doc
}

/// The Champions League list is replaced wholesale: none of the generic
/// categories carry over to the bespoke scheme.
fn adopt_champions_league_scheme(mut doc: SettingsDocument) -> SettingsDocument {
    doc.per_competition.insert(
        Competition::ChampionsLeague,
        CategoryScheme::ChampionsLeague.categories(),
    );
    doc
}

// ---------------------------------------------------------------------------
// Resolution of stored documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub document: SettingsDocument,
    pub needs_persist: bool,
}

/// Turn whatever is in storage into a current document. Pure: persisting is
/// left to the caller when `needs_persist` is set.
pub fn resolve(stored: Option<&str>) -> Resolved {
    let Some(raw) = stored else {
        return Resolved { document: SettingsDocument::default(), needs_persist: true };
    };

    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(value) => parse_stored(value),
        Err(e) => {
            warn!("big-game settings are not valid JSON, using defaults: {e}");
            None
        }
    };
    let Some(Parsed { document, lossy }) = parsed else {
        return Resolved { document: SettingsDocument::default(), needs_persist: true };
    };

    let stored_version = document.schema_version;
    let before = document.per_competition.clone();
    let mut document = backfill(document);
    for step in MIGRATIONS.iter().filter(|m| m.from >= stored_version) {
        debug!("settings migration from v{}: {}", step.from, step.description);
        document = (step.apply)(document);
    }
    document = retain_scheme_categories(document);

    let outdated = stored_version < CURRENT_SCHEMA_VERSION;
    if outdated {
        document.schema_version = CURRENT_SCHEMA_VERSION;
    }
    let changed = lossy || document.per_competition != before;
    Resolved { document, needs_persist: changed || outdated }
}

struct Parsed {
    document: SettingsDocument,
    /// Something in storage could not be represented (unknown keys, bad
    /// shapes), so the cleaned document differs from what was read.
    lossy: bool,
}

fn parse_stored(value: Value) -> Option<Parsed> {
    match value {
        Value::Array(items) => Some(from_legacy_list(&items)),
        Value::Object(mut fields) => {
            if !fields.contains_key("perCompetition")
                && let Some(Value::Array(items)) = fields.get("categories")
            {
                return Some(from_legacy_list(items));
            }

            let mut lossy = false;
            let schema_version = match fields.get("schemaVersion") {
                Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
                    Some(n) if n >= 1 => n,
                    _ => {
                        lossy = true;
                        1
                    }
                },
                None => 1,
            };

            let mut per_competition = PerCompetition::new();
            match fields.remove("perCompetition") {
                Some(Value::Object(entries)) => {
                    for (key, list) in entries {
                        let Some(competition) = Competition::from_key(&key) else {
                            debug!("dropping settings for unknown competition {key}");
                            lossy = true;
                            continue;
                        };
                        let Value::Array(items) = list else {
                            lossy = true;
                            continue;
                        };
                        let (categories, dropped) = parse_categories(&items);
                        lossy |= dropped;
                        per_competition.insert(competition, categories);
                    }
                }
                None => {}
                Some(_) => lossy = true,
            }

            Some(Parsed { document: SettingsDocument { schema_version, per_competition }, lossy })
        }
        _ => {
            warn!("big-game settings have an unexpected shape, using defaults");
            None
        }
    }
}

/// Pre-versioning documents held one flat list for every competition. It is
/// applied to each generic competition; bespoke ones get their defaults.
fn from_legacy_list(items: &[Value]) -> Parsed {
    let (flat, _) = parse_categories(items);
    let per_competition = Competition::ALL
        .into_iter()
        .map(|competition| {
            let categories = match CategoryScheme::of(competition) {
                CategoryScheme::Generic => flat.clone(),
                scheme => scheme.categories(),
            };
            (competition, categories)
        })
        .collect();
    Parsed {
        document: SettingsDocument { schema_version: 1, per_competition },
        lossy: true,
    }
}

/// Parse known category keys, keeping first-seen order. Returns whether any
/// entry was dropped (retired, unknown, duplicated or not a string).
fn parse_categories(items: &[Value]) -> (Vec<CategoryKey>, bool) {
    let mut categories = Vec::with_capacity(items.len());
    let mut dropped = false;
    for item in items {
        match item.as_str().map(str::parse::<CategoryKey>) {
            Some(Ok(category)) if !categories.contains(&category) => categories.push(category),
            Some(Err(e)) => {
                debug!("dropping retired category: {e}");
                dropped = true;
            }
            _ => dropped = true,
        }
    }
    (categories, dropped)
}

fn backfill(mut doc: SettingsDocument) -> SettingsDocument {
    for competition in Competition::ALL {
        doc.per_competition
            .entry(competition)
            .or_insert_with(|| CategoryScheme::of(competition).categories());
    }
    doc
}

/// A category from another scheme can never match a game of this competition.
fn retain_scheme_categories(mut doc: SettingsDocument) -> SettingsDocument {
    for (competition, categories) in doc.per_competition.iter_mut() {
        let scheme = CategoryScheme::of(*competition);
        categories.retain(|c| c.scheme() == scheme);
    }
    doc
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Loads and saves the settings document, holding the resolved copy until
/// [`SettingsStore::invalidate`] or a save.
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    cached: Option<SettingsDocument>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, cached: None }
    }

    /// Effective settings. An active watch party's map is returned as-is and
    /// never touches the local document.
    pub fn load(&mut self, watch_party: Option<&WatchPartySnapshot>) -> SettingsDocument {
        if let Some(party) = watch_party {
            return SettingsDocument {
                schema_version: CURRENT_SCHEMA_VERSION,
                per_competition: party.big_games.clone(),
            };
        }
        if let Some(doc) = &self.cached {
            return doc.clone();
        }

        let stored = self.store.get(SETTINGS_KEY).unwrap_or_else(|e| {
            warn!("could not read big-game settings: {e}");
            None
        });
        let Resolved { document, needs_persist } = resolve(stored.as_deref());
        if needs_persist && let Err(e) = self.write(&document) {
            warn!("could not persist migrated big-game settings: {e}");
        }
        self.cached = Some(document.clone());
        document
    }

    pub fn save(&mut self, doc: &SettingsDocument, watch_party: Option<&WatchPartySnapshot>) -> Result<(), StateError> {
        if watch_party.is_some() {
            return Err(StateError::ReadOnly);
        }
        self.cached = None;
        self.write(doc)?;
        Ok(())
    }

    pub fn is_enabled(
        &mut self,
        category: CategoryKey,
        competition: Competition,
        watch_party: Option<&WatchPartySnapshot>,
    ) -> bool {
        self.load(watch_party).is_enabled(category, competition)
    }

    /// Enable or disable one category. Newly enabled categories go to the end
    /// of the competition's list.
    pub fn set_enabled(
        &mut self,
        competition: Competition,
        category: CategoryKey,
        enabled: bool,
        watch_party: Option<&WatchPartySnapshot>,
    ) -> Result<SettingsDocument, StateError> {
        if watch_party.is_some() {
            return Err(StateError::ReadOnly);
        }
        if category.scheme() != CategoryScheme::of(competition) {
            return Err(StateError::CategoryNotInScheme { category, competition });
        }

        let mut doc = self.load(None);
        let list = doc.per_competition.entry(competition).or_default();
        match (enabled, list.contains(&category)) {
            (true, false) => list.push(category),
            (false, true) => list.retain(|c| *c != category),
            _ => return Ok(doc),
        }
        self.save(&doc, None)?;
        Ok(doc)
    }

    /// Drop the cached copy; the next load re-reads storage.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    fn write(&self, doc: &SettingsDocument) -> Result<(), StorageError> {
        let payload = serde_json::to_string(doc)?;
        self.store.set(SETTINGS_KEY, &payload)
    }
}
