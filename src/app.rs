use crate::state::app_settings::AppSettings;
use crate::state::app_state::AppState;
use crate::state::cache::ResponseCache;
use crate::state::categories::CategoryKey;
use crate::state::digest::{DigestInputs, Slate, build_digest};
use crate::state::error::StateError;
use crate::state::favorites::{FavoriteTeam, FavoritesStore};
use crate::state::messages::FetchPlan;
use crate::state::preferences::PreferencesStore;
use crate::state::settings::{SettingsDocument, SettingsStore};
use crate::state::storage::KeyValueStore;
use crate::state::watch_party::{WatchParty, WatchPartySnapshot};
use chrono::{Days, NaiveDate};
use espn_api::{Competition, TeamId};
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Owns every store and the displayed state. All reads go through the
/// active watch party first; all writes are refused while one is active.
pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
    big_games: SettingsStore,
    favorites: FavoritesStore,
    preferences: PreferencesStore,
    watch_party: WatchParty,
    cache: ResponseCache,
}

impl App {
    /// `store` holds the user's documents, `cache_store` the response cache
    /// and `session` the active watch party.
    pub fn new(
        settings: AppSettings,
        store: Arc<dyn KeyValueStore>,
        cache_store: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        launch_token: Option<String>,
    ) -> Self {
        Self {
            settings,
            state: AppState::new(),
            big_games: SettingsStore::new(store.clone()),
            favorites: FavoritesStore::new(store.clone()),
            preferences: PreferencesStore::new(store),
            watch_party: WatchParty::new(session, launch_token),
            cache: ResponseCache::new(cache_store),
        }
    }

    pub fn cache(&self) -> ResponseCache {
        self.cache.clone()
    }

    pub fn active_party(&self) -> Option<WatchPartySnapshot> {
        self.watch_party.get_active()
    }

    // -----------------------------------------------------------------------
    // Refresh cycle, driven by main_ui_loop
    // -----------------------------------------------------------------------

    /// Drop the read caches and work out what this cycle must fetch: every
    /// competition with a favorite or at least one enabled category.
    pub fn begin_refresh_cycle(&mut self, today: NaiveDate) -> FetchPlan {
        self.big_games.invalidate();
        self.favorites.invalidate();
        self.preferences.invalidate();
        let pruned = self.cache.prune_expired();
        if pruned > 0 {
            debug!("pruned {pruned} stale cache entries");
        }
        self.state.refreshing = true;

        let party = self.active_party();
        let favorites = self.favorites.load(party.as_ref());
        let settings = self.big_games.load(party.as_ref());
        let competitions = Competition::ALL
            .into_iter()
            .filter(|c| favorites.iter().any(|f| f.league == *c) || !settings.enabled(*c).is_empty())
            .collect();
        let dates = (0..u64::from(self.settings.days))
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .collect();
        FetchPlan { competitions, dates }
    }

    pub fn on_slate_loaded(&mut self, slate: Slate) {
        let party = self.active_party();
        let favorites = self.favorites.load(party.as_ref());
        let settings = self.big_games.load(party.as_ref());
        let show_preseason = self.preferences.show_preseason(party.as_ref());
        let must_watch = self.preferences.must_watch(party.as_ref());

        let digest = build_digest(
            &slate,
            &DigestInputs {
                favorites: &favorites,
                settings: &settings,
                show_preseason,
                must_watch: &must_watch,
            },
        );
        debug!("digest built with {} games", digest.cards.len());

        self.state.digest = Some(digest);
        self.state.last_error = None;
        self.state.last_refresh = slate.fetched_at;
        self.state.watch_party = party.is_some();
        self.state.refreshing = false;
    }

    pub fn on_error(&mut self, message: String) {
        self.state.last_error = Some(message);
        self.state.refreshing = false;
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    pub fn favorites(&mut self) -> Vec<FavoriteTeam> {
        let party = self.active_party();
        self.favorites.load(party.as_ref())
    }

    pub fn add_favorite(&mut self, team: FavoriteTeam) -> Result<(), StateError> {
        let party = self.active_party();
        self.favorites.add(team, party.as_ref())
    }

    pub fn remove_favorite(&mut self, id: &TeamId, league: Competition) -> Result<FavoriteTeam, StateError> {
        let party = self.active_party();
        self.favorites.remove(id, league, party.as_ref())
    }

    /// `position` is zero-based.
    pub fn move_favorite(&mut self, id: &TeamId, league: Competition, position: usize) -> Result<(), StateError> {
        let party = self.active_party();
        self.favorites.move_to(id, league, position, party.as_ref())
    }

    pub fn big_game_settings(&mut self) -> SettingsDocument {
        let party = self.active_party();
        self.big_games.load(party.as_ref())
    }

    pub fn set_category(
        &mut self,
        competition: Competition,
        category: CategoryKey,
        enabled: bool,
    ) -> Result<SettingsDocument, StateError> {
        let party = self.active_party();
        self.big_games.set_enabled(competition, category, enabled, party.as_ref())
    }

    pub fn show_preseason(&mut self) -> bool {
        let party = self.active_party();
        self.preferences.show_preseason(party.as_ref())
    }

    pub fn set_show_preseason(&mut self, show: bool) -> Result<(), StateError> {
        let party = self.active_party();
        self.preferences.set_show_preseason(show, party.as_ref())
    }

    pub fn must_watch(&mut self) -> BTreeSet<String> {
        let party = self.active_party();
        self.preferences.must_watch(party.as_ref())
    }

    pub fn set_must_watch(&mut self, event_id: &str, pinned: bool) -> Result<bool, StateError> {
        let party = self.active_party();
        self.preferences.set_must_watch(event_id, pinned, party.as_ref())
    }

    /// The effective setup, ready to hand to someone else.
    pub fn snapshot(&mut self) -> WatchPartySnapshot {
        let party = self.active_party();
        WatchPartySnapshot {
            teams: self.favorites.load(party.as_ref()),
            big_games: self.big_games.load(party.as_ref()).per_competition,
            show_preseason: self.preferences.show_preseason(party.as_ref()),
            must_watch: self.preferences.must_watch(party.as_ref()).into_iter().collect(),
        }
    }

    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    pub fn end_party(&mut self) -> anyhow::Result<()> {
        self.watch_party.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::categories::GameCategory;
    use crate::state::favorites::favorite;
    use crate::state::storage::{FileStore, MemoryStore};
    use crate::state::watch_party::encode;

    fn app(launch_token: Option<String>) -> App {
        App::new(
            AppSettings { days: 3, ..AppSettings::default() },
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            launch_token,
        )
    }

    fn app_on_disk(dir: &std::path::Path) -> App {
        let settings = AppSettings { data_dir: dir.to_path_buf(), ..AppSettings::default() };
        let store = Arc::new(FileStore::open(settings.storage_path()).unwrap());
        let cache_store = Arc::new(FileStore::open(settings.cache_path()).unwrap());
        App::new(settings, store, cache_store, Arc::new(MemoryStore::new()), None)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn plan_covers_enabled_competitions_and_requested_days() {
        let mut app = app(None);
        for competition in Competition::ALL {
            let categories = app.big_game_settings().enabled(competition).to_vec();
            for category in categories {
                app.set_category(competition, category, false).unwrap();
            }
        }
        app.add_favorite(favorite("12", Competition::Nfl)).unwrap();
        app.set_category(Competition::Nhl, CategoryKey::from(GameCategory::RobLowe), true).unwrap();

        let plan = app.begin_refresh_cycle(today());
        assert_eq!(plan.competitions, [Competition::Nfl, Competition::Nhl]);
        assert_eq!(plan.dates.len(), 3);
        assert_eq!(plan.dates[2], NaiveDate::from_ymd_opt(2026, 10, 21).unwrap());
    }

    #[test]
    fn edits_from_another_process_reach_a_running_watcher() {
        let dir = tempfile::tempdir().unwrap();
        let rob_lowe = CategoryKey::from(GameCategory::RobLowe);
        let mut watcher = app_on_disk(dir.path());
        assert!(watcher.big_game_settings().is_enabled(rob_lowe, Competition::Nfl));

        let mut cli = app_on_disk(dir.path());
        cli.set_category(Competition::Nfl, rob_lowe, false).unwrap();
        cli.add_favorite(favorite("12", Competition::Nfl)).unwrap();

        watcher.begin_refresh_cycle(today());
        watcher.cache().set_default("standings:football/nfl", &1);
        assert!(!watcher.big_game_settings().is_enabled(rob_lowe, Competition::Nfl));
        assert_eq!(watcher.favorites().len(), 1);

        let mut reopened = app_on_disk(dir.path());
        assert!(!reopened.big_game_settings().is_enabled(rob_lowe, Competition::Nfl));
        assert_eq!(reopened.favorites().len(), 1);
        assert_eq!(reopened.cache().get::<u32>("standings:football/nfl"), Some(1));
    }

    #[test]
    fn slate_becomes_digest() {
        let mut app = app(None);
        app.begin_refresh_cycle(today());
        assert!(app.state.refreshing);

        app.on_slate_loaded(Slate { incomplete: true, ..Slate::default() });
        let digest = app.state.digest.as_ref().unwrap();
        assert!(digest.incomplete);
        assert!(!app.state.refreshing);
        assert!(!app.state.watch_party);
    }

    #[test]
    fn watch_party_is_read_only_until_ended() {
        let party = WatchPartySnapshot {
            teams: vec![favorite("9", Competition::Mls)],
            ..WatchPartySnapshot::default()
        };
        let mut app = app(Some(encode(&party).unwrap()));

        assert_eq!(app.favorites(), party.teams);
        assert_eq!(app.snapshot(), party);
        assert!(matches!(app.add_favorite(favorite("1", Competition::Nfl)), Err(StateError::ReadOnly)));
        assert!(matches!(app.set_show_preseason(false), Err(StateError::ReadOnly)));

        app.end_party().unwrap();
        assert!(app.favorites().is_empty());
        app.add_favorite(favorite("1", Competition::Nfl)).unwrap();
    }
}
