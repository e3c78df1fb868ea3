pub mod client;
pub mod espn;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Domain types: clean model, independent of ESPN wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sport {
    Football,
    Basketball,
    Baseball,
    Hockey,
    Soccer,
}

impl Sport {
    pub fn label(&self) -> &'static str {
        match self {
            Sport::Football => "football",
            Sport::Basketball => "basketball",
            Sport::Baseball => "baseball",
            Sport::Hockey => "hockey",
            Sport::Soccer => "soccer",
        }
    }
}

/// Scope within which ESPN team ids are unique. Soccer clubs keep one id
/// across every competition they enter; other leagues number their own teams,
/// so an NBA id can name a different WNBA club.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdNamespace {
    League(Competition),
    Soccer,
}

/// Every competition the tracker knows about. Settings documents carry one
/// entry per variant, so adding a variant is a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Competition {
    #[serde(rename = "nfl")]
    Nfl,
    #[serde(rename = "nba")]
    Nba,
    #[serde(rename = "wnba")]
    Wnba,
    #[serde(rename = "mlb")]
    Mlb,
    #[serde(rename = "nhl")]
    Nhl,
    #[serde(rename = "mls")]
    Mls,
    #[serde(rename = "premier-league")]
    PremierLeague,
    #[serde(rename = "champions-league")]
    ChampionsLeague,
}

impl Competition {
    pub const ALL: [Competition; 8] = [
        Competition::Nfl,
        Competition::Nba,
        Competition::Wnba,
        Competition::Mlb,
        Competition::Nhl,
        Competition::Mls,
        Competition::PremierLeague,
        Competition::ChampionsLeague,
    ];

    /// Stable key used in persisted documents and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            Competition::Nfl => "nfl",
            Competition::Nba => "nba",
            Competition::Wnba => "wnba",
            Competition::Mlb => "mlb",
            Competition::Nhl => "nhl",
            Competition::Mls => "mls",
            Competition::PremierLeague => "premier-league",
            Competition::ChampionsLeague => "champions-league",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Competition::Nfl => "NFL",
            Competition::Nba => "NBA",
            Competition::Wnba => "WNBA",
            Competition::Mlb => "MLB",
            Competition::Nhl => "NHL",
            Competition::Mls => "MLS",
            Competition::PremierLeague => "Premier League",
            Competition::ChampionsLeague => "Champions League",
        }
    }

    pub fn sport(&self) -> Sport {
        match self {
            Competition::Nfl => Sport::Football,
            Competition::Nba | Competition::Wnba => Sport::Basketball,
            Competition::Mlb => Sport::Baseball,
            Competition::Nhl => Sport::Hockey,
            Competition::Mls | Competition::PremierLeague | Competition::ChampionsLeague => {
                Sport::Soccer
            }
        }
    }

    pub fn id_namespace(&self) -> IdNamespace {
        match self.sport() {
            Sport::Soccer => IdNamespace::Soccer,
            _ => IdNamespace::League(*self),
        }
    }

    /// `{sport}/{league}` segment of ESPN's API paths.
    pub fn espn_path(&self) -> &'static str {
        match self {
            Competition::Nfl => "football/nfl",
            Competition::Nba => "basketball/nba",
            Competition::Wnba => "basketball/wnba",
            Competition::Mlb => "baseball/mlb",
            Competition::Nhl => "hockey/nhl",
            Competition::Mls => "soccer/usa.1",
            Competition::PremierLeague => "soccer/eng.1",
            Competition::ChampionsLeague => "soccer/uefa.champions",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for Competition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Team identifier, canonicalized to a string.
///
/// ESPN sends ids as strings on most endpoints and as bare numbers on a few;
/// both normalize to the same value here. Ids are only unique within a sport,
/// so a `TeamId` must never be compared against one from another sport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct TeamId(String);

impl TeamId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for TeamId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<u64> for TeamId {
    fn from(raw: u64) -> Self {
        Self(raw.to_string())
    }
}

impl From<TeamId> for String {
    fn from(id: TeamId) -> Self {
        id.0
    }
}

/// Any id shape seen on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl From<RawId> for TeamId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => TeamId::new(s),
            RawId::Integer(n) => TeamId(n.to_string()),
            // 55.0 and 55 must be the same team.
            RawId::Float(f) if f.fract() == 0.0 => TeamId(format!("{f:.0}")),
            RawId::Float(f) => TeamId(f.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,       // "Kansas City Chiefs"
    pub short_name: String, // "Chiefs"
    pub abbrev: String,     // "KC"
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    #[default]
    Scheduled,
    InProgress,
    Final,
    Postponed,
}

/// ESPN season type: 1 = preseason, 2 = regular season, 3 = postseason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonType {
    Preseason,
    #[default]
    Regular,
    Postseason,
    Other,
}

impl SeasonType {
    pub fn from_espn(kind: Option<u8>, slug: Option<&str>) -> Self {
        match (kind, slug) {
            (Some(1), _) | (_, Some("preseason")) => SeasonType::Preseason,
            (Some(2), _) | (_, Some("regular-season")) => SeasonType::Regular,
            (Some(3), _) | (_, Some("post-season")) => SeasonType::Postseason,
            (None, None) => SeasonType::Regular,
            _ => SeasonType::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub competition: Competition,
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub home: Team,
    pub away: Team,
    pub status: GameStatus,
    pub season_type: SeasonType,
    pub broadcasts: Vec<String>,
    pub venue: Option<String>,
}

impl Game {
    pub fn is_completed(&self) -> bool {
        self.status == GameStatus::Final
    }

    pub fn involves(&self, team_id: &TeamId) -> bool {
        &self.home.id == team_id || &self.away.id == team_id
    }
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    /// Conference / league / table groups. Single-table competitions have one.
    pub groups: Vec<StandingsGroup>,
}

impl Standings {
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.entries.is_empty())
    }

    pub fn entries(&self) -> impl Iterator<Item = &StandingsEntry> {
        self.groups.iter().flat_map(|g| g.entries.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandingsGroup {
    pub name: String,
    pub entries: Vec<StandingsEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandingsEntry {
    pub team: Team,
    pub stats: Vec<Stat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    pub abbreviation: String,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_id_normalizes_numbers_and_strings() {
        let from_text: TeamId = serde_json::from_str("\" 55 \"").unwrap();
        let from_int: TeamId = serde_json::from_str("55").unwrap();
        let from_float: TeamId = serde_json::from_str("55.0").unwrap();
        assert_eq!(from_text, TeamId::from("55"));
        assert_eq!(from_int, TeamId::from(55u64));
        assert_eq!(from_float, TeamId::from("55"));
    }

    #[test]
    fn team_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&TeamId::from(12u64)).unwrap();
        assert_eq!(json, "\"12\"");
    }

    #[test]
    fn competition_keys_round_trip() {
        for competition in Competition::ALL {
            assert_eq!(Competition::from_key(competition.key()), Some(competition));
            let json = serde_json::to_string(&competition).unwrap();
            assert_eq!(json, format!("\"{}\"", competition.key()));
        }
        assert_eq!(Competition::from_key("Premier-League"), Some(Competition::PremierLeague));
        assert_eq!(Competition::from_key("serie-a"), None);
    }

    #[test]
    fn soccer_competitions_share_a_sport() {
        assert_eq!(Competition::PremierLeague.sport(), Sport::Soccer);
        assert_eq!(Competition::ChampionsLeague.sport(), Sport::Soccer);
        assert_ne!(Competition::Nba.sport(), Competition::Nfl.sport());
    }

    #[test]
    fn only_soccer_shares_team_ids_across_competitions() {
        assert_eq!(Competition::Mls.id_namespace(), IdNamespace::Soccer);
        assert_eq!(Competition::ChampionsLeague.id_namespace(), Competition::PremierLeague.id_namespace());
        assert_ne!(Competition::Nba.id_namespace(), Competition::Wnba.id_namespace());
        assert_eq!(Competition::Nhl.id_namespace(), IdNamespace::League(Competition::Nhl));
    }

    #[test]
    fn season_type_maps_espn_codes() {
        assert_eq!(SeasonType::from_espn(Some(1), None), SeasonType::Preseason);
        assert_eq!(SeasonType::from_espn(None, Some("preseason")), SeasonType::Preseason);
        assert_eq!(SeasonType::from_espn(Some(3), None), SeasonType::Postseason);
        assert_eq!(SeasonType::from_espn(None, None), SeasonType::Regular);
        assert_eq!(SeasonType::from_espn(Some(4), None), SeasonType::Other);
    }
}
