/// ESPN API raw wire types: serde shapes for deserializing ESPN responses.
/// These map to our clean domain types in client.rs.
use crate::TeamId;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Scoreboard  (site v2 API)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScoreboardResponse {
    pub events: Option<Vec<EspnEvent>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnEvent {
    pub id: Option<TeamId>, // event ids share the string-or-number quirk
    pub name: Option<String>,
    #[serde(rename = "shortName")]
    pub short_name: Option<String>,
    pub date: Option<String>, // ISO 8601, often without seconds: "2026-10-25T17:00Z"
    pub status: Option<EspnStatus>,
    pub season: Option<EspnSeason>,
    pub competitions: Option<Vec<EspnCompetition>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnStatus {
    #[serde(rename = "type")]
    pub status_type: Option<EspnStatusType>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnStatusType {
    pub name: Option<String>, // "STATUS_SCHEDULED", "STATUS_IN_PROGRESS", "STATUS_FINAL"
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnSeason {
    #[serde(rename = "type")]
    pub season_type: Option<u8>,
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EspnCompetition {
    pub competitors: Option<Vec<EspnCompetitor>>,
    pub broadcasts: Option<Vec<EspnBroadcast>>,
    pub venue: Option<EspnVenue>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EspnCompetitor {
    pub id: Option<TeamId>,
    #[serde(rename = "homeAway")]
    pub home_away: Option<String>, // "home" | "away"
    pub team: Option<EspnTeam>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EspnTeam {
    pub id: Option<TeamId>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "shortDisplayName")]
    pub short_display_name: Option<String>,
    pub abbreviation: Option<String>,
    /// Scoreboard teams carry a single `logo`; standings teams carry `logos[]`.
    pub logo: Option<String>,
    pub logos: Option<Vec<EspnLogo>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnLogo {
    pub href: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnBroadcast {
    pub market: Option<String>,
    pub names: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnVenue {
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Standings  (v2 API)
// ---------------------------------------------------------------------------

/// Top level of `/apis/v2/sports/{path}/standings`. US leagues nest
/// conference tables under `children`; soccer tables sometimes sit at the root.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct StandingsResponse {
    pub name: Option<String>,
    pub children: Option<Vec<EspnStandingsGroup>>,
    pub standings: Option<EspnStandingsTable>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStandingsGroup {
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub standings: Option<EspnStandingsTable>,
    pub children: Option<Vec<EspnStandingsGroup>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStandingsTable {
    pub entries: Option<Vec<EspnStandingsEntry>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnStandingsEntry {
    pub team: Option<EspnTeam>,
    pub stats: Option<Vec<EspnStat>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnStat {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub stat_type: Option<String>,
    pub abbreviation: Option<String>,
    pub value: Option<f64>,
}
