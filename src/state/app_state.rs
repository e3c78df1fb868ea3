use crate::state::digest::Digest;
use chrono::{DateTime, Utc};

#[derive(Debug, Default)]
pub struct AppState {
    pub digest: Option<Digest>,
    pub last_error: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
    /// Whether the digest was built from a watch party's setup.
    pub watch_party: bool,
    pub refreshing: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}
