use crate::state::error::StateError;
use crate::state::storage::{KeyValueStore, StorageError};
use crate::state::watch_party::WatchPartySnapshot;
use log::warn;
use std::collections::BTreeSet;
use std::sync::Arc;

pub const SHOW_PRESEASON_KEY: &str = "gametime:show-preseason";
pub const MUST_WATCH_KEY: &str = "gametime:must-watch";

/// Preseason visibility and the set of games pinned as must-watch.
pub struct PreferencesStore {
    store: Arc<dyn KeyValueStore>,
    show_preseason: Option<bool>,
    must_watch: Option<BTreeSet<String>>,
}

impl PreferencesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, show_preseason: None, must_watch: None }
    }

    /// Defaults to showing preseason games.
    pub fn show_preseason(&mut self, watch_party: Option<&WatchPartySnapshot>) -> bool {
        if let Some(party) = watch_party {
            return party.show_preseason;
        }
        if let Some(show) = self.show_preseason {
            return show;
        }
        let show = self.read(SHOW_PRESEASON_KEY).unwrap_or(true);
        self.show_preseason = Some(show);
        show
    }

    pub fn set_show_preseason(&mut self, show: bool, watch_party: Option<&WatchPartySnapshot>) -> Result<(), StateError> {
        if watch_party.is_some() {
            return Err(StateError::ReadOnly);
        }
        self.show_preseason = None;
        self.write(SHOW_PRESEASON_KEY, &show)
    }

    pub fn must_watch(&mut self, watch_party: Option<&WatchPartySnapshot>) -> BTreeSet<String> {
        if let Some(party) = watch_party {
            return party.must_watch.iter().cloned().collect();
        }
        if let Some(ids) = &self.must_watch {
            return ids.clone();
        }
        let ids: BTreeSet<String> = self.read(MUST_WATCH_KEY).unwrap_or_default();
        self.must_watch = Some(ids.clone());
        ids
    }

    /// Pin or unpin one event. Returns whether anything changed.
    pub fn set_must_watch(
        &mut self,
        event_id: &str,
        pinned: bool,
        watch_party: Option<&WatchPartySnapshot>,
    ) -> Result<bool, StateError> {
        if watch_party.is_some() {
            return Err(StateError::ReadOnly);
        }
        let mut ids = self.must_watch(None);
        let changed = if pinned { ids.insert(event_id.to_owned()) } else { ids.remove(event_id) };
        if changed {
            self.must_watch = None;
            self.write(MUST_WATCH_KEY, &ids)?;
        }
        Ok(changed)
    }

    pub fn invalidate(&mut self) {
        self.show_preseason = None;
        self.must_watch = None;
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self
            .store
            .get(key)
            .inspect_err(|e| warn!("could not read {key}: {e}"))
            .ok()??;
        serde_json::from_str(&raw)
            .inspect_err(|e| warn!("ignoring malformed {key}: {e}"))
            .ok()
    }

    fn write<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), StateError> {
        let payload = serde_json::to_string(value).map_err(StorageError::from)?;
        self.store.set(key, &payload)?;
        Ok(())
    }
}
