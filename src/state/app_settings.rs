use log::warn;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const STORAGE_FILE: &str = "storage.json";
pub const CACHE_FILE: &str = "cache.json";
pub const SESSION_FILE: &str = "session.json";
const APP_DIR: &str = "gametime";

#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    /// Where `storage.json` and `cache.json` live.
    pub data_dir: PathBuf,
    /// Per-login scratch space for the watch-party session, when the
    /// platform provides one.
    pub session_dir: Option<PathBuf>,
    pub refresh_every: Duration,
    /// How many days ahead to look, today included.
    pub days: u32,
    pub request_timeout: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".gametime"),
            session_dir: None,
            refresh_every: Duration::from_secs(300),
            days: 7,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok(), PlatformDirs::detect())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, platform: PlatformDirs) -> Self {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let data_dir = var("GAMETIME_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| platform.config.map(|dir| dir.join(APP_DIR)))
            .unwrap_or(defaults.data_dir);
        let session_dir = platform.runtime.map(|dir| dir.join(APP_DIR));

        Self {
            data_dir,
            session_dir,
            refresh_every: parse_or(var("GAMETIME_REFRESH_SECS"), "GAMETIME_REFRESH_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_every),
            days: parse_or(var("GAMETIME_DAYS"), "GAMETIME_DAYS")
                .filter(|days| *days > 0)
                .unwrap_or(defaults.days),
            request_timeout: parse_or(var("GAMETIME_TIMEOUT_SECS"), "GAMETIME_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(STORAGE_FILE)
    }

    /// Response cache, kept apart from user documents so it can be thrown
    /// away without touching them.
    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join(CACHE_FILE)
    }

    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_dir.as_ref().map(|dir| dir.join(SESSION_FILE))
    }
}

/// Per-user base directories as the platform reports them.
#[derive(Debug, Clone, Default)]
struct PlatformDirs {
    config: Option<PathBuf>,
    /// Only some platforms (Linux with `XDG_RUNTIME_DIR`) have one.
    runtime: Option<PathBuf>,
}

impl PlatformDirs {
    fn detect() -> Self {
        Self { config: dirs::config_dir(), runtime: dirs::runtime_dir() }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &str) -> Option<T> {
    let raw = raw?;
    raw.trim()
        .parse()
        .inspect_err(|_| warn!("ignoring {name}={raw}: not a number"))
        .ok()
}
