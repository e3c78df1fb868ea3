//! Shared read-only view of someone else's setup.
//!
//! A watch party is a snapshot of favorites, big-game settings, the preseason
//! flag and must-watch pins, passed around as a token (JSON, then URL-safe
//! base64). While one is active the local stores serve the snapshot and
//! reject every write.

use crate::state::favorites::FavoriteTeam;
use crate::state::settings::PerCompetition;
use crate::state::storage::KeyValueStore;
use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use url::Url;

pub const SESSION_KEY: &str = "gametime:watch-party";
pub const TOKEN_PARAM: &str = "party";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchPartySnapshot {
    #[serde(default)]
    pub teams: Vec<FavoriteTeam>,
    #[serde(default)]
    pub big_games: PerCompetition,
    #[serde(default = "shown")]
    pub show_preseason: bool,
    #[serde(default)]
    pub must_watch: Vec<String>,
}

fn shown() -> bool {
    true
}

impl Default for WatchPartySnapshot {
    fn default() -> Self {
        Self {
            teams: Vec::new(),
            big_games: PerCompetition::new(),
            show_preseason: true,
            must_watch: Vec::new(),
        }
    }
}

pub fn encode(snapshot: &WatchPartySnapshot) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(snapshot)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// `None` for anything that is not a valid token; padding is optional.
pub fn decode(token: &str) -> Option<WatchPartySnapshot> {
    let token = token.trim();
    let bytes = if token.ends_with('=') { URL_SAFE.decode(token) } else { URL_SAFE_NO_PAD.decode(token) };
    let bytes = bytes.inspect_err(|e| debug!("watch party token is not base64: {e}")).ok()?;
    serde_json::from_slice(&bytes)
        .inspect_err(|e| debug!("watch party token is not a snapshot: {e}"))
        .ok()
}

/// Accept either a bare token or a share link carrying `?party=<token>`.
pub fn extract_token(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(name, _)| name == TOKEN_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|token| !token.is_empty()),
        Err(_) => Some(input.to_owned()),
    }
}

/// Share link for `snapshot` rooted at `base_url`.
pub fn share_url(base_url: &str, snapshot: &WatchPartySnapshot) -> anyhow::Result<String> {
    let mut url = Url::parse(base_url)?;
    url.query_pairs_mut().append_pair(TOKEN_PARAM, &encode(snapshot)?);
    Ok(url.into())
}

/// Session-scoped holder of the active party.
pub struct WatchParty {
    session: Arc<dyn KeyValueStore>,
    /// Pending until it has been written to the session; after that the
    /// session alone decides, so ending the party elsewhere sticks.
    launch_token: Mutex<Option<String>>,
}

impl WatchParty {
    pub fn new(session: Arc<dyn KeyValueStore>, launch_token: Option<String>) -> Self {
        Self { session, launch_token: Mutex::new(launch_token) }
    }

    /// The session copy wins over the launch token. A launch token that
    /// decodes is moved into the session so later reads find it there.
    pub fn get_active(&self) -> Option<WatchPartySnapshot> {
        match self.session.get(SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(snapshot) => return Some(snapshot),
                Err(e) => warn!("ignoring malformed watch party session: {e}"),
            },
            Ok(None) => {}
            Err(e) => warn!("could not read watch party session: {e}"),
        }

        let mut pending = self.launch_token.lock().ok()?;
        let token = pending.as_deref()?;
        let Some(snapshot) = decode(token) else {
            warn!("watch party link could not be read; showing your own setup");
            *pending = None;
            return None;
        };
        match serde_json::to_string(&snapshot) {
            Ok(raw) => match self.session.set(SESSION_KEY, &raw) {
                Ok(()) => *pending = None,
                Err(e) => warn!("could not keep watch party for this session: {e}"),
            },
            Err(e) => warn!("could not serialize watch party: {e}"),
        }
        Some(snapshot)
    }

    /// Leave the party: local settings take over again.
    pub fn end(&mut self) -> anyhow::Result<()> {
        if let Ok(pending) = self.launch_token.get_mut() {
            *pending = None;
        }
        self.session.remove(SESSION_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::categories::{CategoryKey, GameCategory, UclCategory};
    use crate::state::favorites::favorite;
    use crate::state::storage::MemoryStore;
    use crate::state::storage::test_support::CountingStore;
    use espn_api::Competition;

    fn snapshot() -> WatchPartySnapshot {
        WatchPartySnapshot {
            teams: vec![favorite("12", Competition::Nfl), favorite("359", Competition::PremierLeague)],
            big_games: [
                (Competition::Nfl, vec![CategoryKey::from(GameCategory::HouseDivided)]),
                (Competition::ChampionsLeague, vec![CategoryKey::from(UclCategory::Giants)]),
            ]
            .into_iter()
            .collect(),
            show_preseason: false,
            must_watch: vec!["401547417".into()],
        }
    }

    #[test]
    fn token_round_trip() {
        let token = encode(&snapshot()).unwrap();
        assert!(!token.contains(['+', '/', '=']));
        assert_eq!(decode(&token), Some(snapshot()));
    }

    #[test]
    fn padded_tokens_decode() {
        let token = encode(&WatchPartySnapshot::default()).unwrap();
        let padded = format!("{token}{}", "=".repeat((4 - token.len() % 4) % 4));
        assert_eq!(decode(&padded), Some(WatchPartySnapshot::default()));
    }

    #[test]
    fn garbage_decodes_to_none() {
        assert_eq!(decode("%%%"), None);
        assert_eq!(decode(&URL_SAFE_NO_PAD.encode("[1,2]")), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let token = URL_SAFE_NO_PAD.encode(r#"{"teams":[]}"#);
        let party = decode(&token).unwrap();
        assert!(party.show_preseason);
        assert!(party.big_games.is_empty());
    }

    #[test]
    fn token_is_found_in_links_and_bare() {
        assert_eq!(extract_token("https://gametime.example/?party=abc_-1").as_deref(), Some("abc_-1"));
        assert_eq!(extract_token("  abc  ").as_deref(), Some("abc"));
        assert_eq!(extract_token("https://gametime.example/?other=1"), None);
        assert_eq!(extract_token(""), None);
    }

    #[test]
    fn share_url_round_trips_through_extract() {
        let link = share_url("https://gametime.example/app", &snapshot()).unwrap();
        let token = extract_token(&link).unwrap();
        assert_eq!(decode(&token), Some(snapshot()));
    }

    #[test]
    fn launch_token_is_persisted_to_session() {
        let session = Arc::new(MemoryStore::new());
        let token = encode(&snapshot()).unwrap();

        let party = WatchParty::new(session.clone(), Some(token));
        assert_eq!(party.get_active(), Some(snapshot()));
        assert!(session.get(SESSION_KEY).unwrap().is_some());

        let later = WatchParty::new(session, None);
        assert_eq!(later.get_active(), Some(snapshot()));
    }

    #[test]
    fn session_wins_over_launch_token() {
        let session = Arc::new(MemoryStore::new());
        session.set(SESSION_KEY, &serde_json::to_string(&snapshot()).unwrap()).unwrap();

        let other = encode(&WatchPartySnapshot::default()).unwrap();
        let party = WatchParty::new(session, Some(other));
        assert_eq!(party.get_active(), Some(snapshot()));
    }

    #[test]
    fn bad_launch_token_means_no_party() {
        let session = Arc::new(MemoryStore::new());
        let party = WatchParty::new(session.clone(), Some("not-a-token".into()));
        assert_eq!(party.get_active(), None);
        assert!(session.keys().unwrap().is_empty());
    }

    #[test]
    fn ending_clears_the_session() {
        let session = Arc::new(MemoryStore::new());
        let mut party = WatchParty::new(session, Some(encode(&snapshot()).unwrap()));
        assert!(party.get_active().is_some());

        party.end().unwrap();
        assert_eq!(party.get_active(), None);
    }

    #[test]
    fn ending_from_another_process_is_not_undone_by_the_launch_link() {
        let session = Arc::new(MemoryStore::new());
        let launched = WatchParty::new(session.clone(), Some(encode(&snapshot()).unwrap()));
        assert!(launched.get_active().is_some());

        WatchParty::new(session, None).end().unwrap();
        assert_eq!(launched.get_active(), None);
    }

    #[test]
    fn launch_link_is_kept_while_the_session_cannot_store_it() {
        let party = WatchParty::new(Arc::new(CountingStore::failing()), Some(encode(&snapshot()).unwrap()));
        assert_eq!(party.get_active(), Some(snapshot()));
        assert_eq!(party.get_active(), Some(snapshot()));
    }
}
