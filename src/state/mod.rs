pub mod app_settings;
pub mod app_state;
pub mod cache;
pub mod categories;
pub mod digest;
pub mod error;
pub mod favorites;
pub mod messages;
pub mod network;
pub mod preferences;
pub mod refresher;
pub mod settings;
pub mod storage;
pub mod tiers;
pub mod top_tier;
pub mod watch_party;
