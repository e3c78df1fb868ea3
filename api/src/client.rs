use crate::espn::{
    EspnCompetitor, EspnEvent, EspnStandingsGroup, EspnStandingsTable, EspnTeam,
    ScoreboardResponse, StandingsResponse,
};
use crate::{
    Competition, Game, GameStatus, SeasonType, Standings, StandingsEntry, StandingsGroup, Stat,
    Team,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::warn;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

const ESPN_SITE_V2: &str = "https://site.api.espn.com/apis/site/v2/sports";
const ESPN_V2: &str = "https://site.api.espn.com/apis/v2/sports";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// ESPN API client for scoreboards and standings.
#[derive(Debug, Clone)]
pub struct EspnApi {
    client: Client,
    site_base: String,
    standings_base: String,
    timeout: Duration,
}

impl Default for EspnApi {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .user_agent("gametime/0.1 (upcoming games tracker)")
                .build()
                .unwrap_or_default(),
            site_base: ESPN_SITE_V2.to_owned(),
            standings_base: ESPN_V2.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) if e.is_timeout() => write!(f, "Timed out fetching {url}"),
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Uniform result of a best-effort fetch: failures degrade to empty data with
/// the error flag raised, so a batch can report partial data instead of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub error: bool,
}

impl<T: Default> Fetched<T> {
    pub fn ok(data: T) -> Self {
        Self { data, error: false }
    }

    pub fn failed() -> Self {
        Self { data: T::default(), error: true }
    }

    pub fn from_result(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                warn!("{e}");
                Self::failed()
            }
        }
    }
}

impl EspnApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every request by `timeout`; an expired request counts as failed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point the client somewhere other than ESPN (used by tests).
    pub fn with_base_urls(mut self, site_base: impl Into<String>, standings_base: impl Into<String>) -> Self {
        self.site_base = site_base.into();
        self.standings_base = standings_base.into();
        self
    }

    /// Fetch one day of a competition's schedule.
    pub async fn fetch_scoreboard(&self, competition: Competition, date: NaiveDate) -> ApiResult<Vec<Game>> {
        let url = format!(
            "{}/{}/scoreboard?dates={}",
            self.site_base,
            competition.espn_path(),
            date.format("%Y%m%d")
        );
        let raw: ScoreboardResponse = self.get(&url).await?;
        let games = raw
            .events
            .unwrap_or_default()
            .iter()
            .filter_map(|e| map_event_to_game(e, competition))
            .collect();
        Ok(games)
    }

    /// Fetch standings for an ESPN `{sport}/{league}` path. Takes a path rather
    /// than a `Competition` so domestic leagues outside the tracked set can be read.
    pub async fn fetch_standings(&self, espn_path: &str) -> ApiResult<Standings> {
        let url = format!("{}/{espn_path}/standings", self.standings_base);
        let raw: StandingsResponse = self.get(&url).await?;
        Ok(map_standings(raw))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => Err(ApiError::Api(e, url.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping: ESPN wire types → clean domain types
// ---------------------------------------------------------------------------

/// Events without an id or without both sides are skipped; they cannot be
/// categorized or deduplicated.
fn map_event_to_game(event: &EspnEvent, competition: Competition) -> Option<Game> {
    let id = event.id.as_ref().filter(|id| !id.is_empty())?.to_string();

    let competition_entry = event.competitions.as_deref().and_then(|c| c.first());
    let competitors = competition_entry
        .and_then(|c| c.competitors.as_deref())
        .unwrap_or_default();
    let (home, away) = split_competitors(competitors)?;

    let status_type = event.status.as_ref().and_then(|s| s.status_type.as_ref());
    let mut status = status_type
        .and_then(|t| t.name.as_deref())
        .map(parse_status)
        .unwrap_or_default();
    if status_type.and_then(|t| t.completed) == Some(true) {
        status = GameStatus::Final;
    }

    let season_type = event
        .season
        .as_ref()
        .map(|s| SeasonType::from_espn(s.season_type, s.slug.as_deref()))
        .unwrap_or_default();

    let broadcasts = competition_entry
        .and_then(|c| c.broadcasts.as_ref())
        .into_iter()
        .flatten()
        .flat_map(|b| b.names.iter().flatten().cloned())
        .fold(Vec::new(), |mut acc: Vec<String>, name| {
            if !acc.contains(&name) {
                acc.push(name);
            }
            acc
        });

    let venue = competition_entry
        .and_then(|c| c.venue.as_ref())
        .and_then(|v| v.full_name.clone());

    Some(Game {
        id,
        competition,
        name: event
            .short_name
            .clone()
            .or_else(|| event.name.clone())
            .unwrap_or_default(),
        start_time: event.date.as_deref().and_then(parse_event_date),
        home: map_competitor(home),
        away: map_competitor(away),
        status,
        season_type,
        broadcasts,
        venue,
    })
}

/// Use "home"/"away" markers; fall back to index order (ESPN lists home first).
fn split_competitors(competitors: &[EspnCompetitor]) -> Option<(&EspnCompetitor, &EspnCompetitor)> {
    let home = competitors
        .iter()
        .find(|c| c.home_away.as_deref() == Some("home"))
        .or_else(|| competitors.first())?;
    let away = competitors
        .iter()
        .find(|c| c.home_away.as_deref() == Some("away"))
        .or_else(|| competitors.get(1))?;
    if std::ptr::eq(home, away) {
        return None;
    }
    Some((home, away))
}

fn map_competitor(c: &EspnCompetitor) -> Team {
    let mut team = c.team.as_ref().map(map_team).unwrap_or_default();
    if team.id.is_empty() {
        team.id = c.id.clone().unwrap_or_default();
    }
    team
}

fn map_team(t: &EspnTeam) -> Team {
    let name = t.display_name.clone().unwrap_or_default();
    Team {
        id: t.id.clone().unwrap_or_default(),
        short_name: t.short_display_name.clone().unwrap_or_else(|| name.clone()),
        name,
        abbrev: t.abbreviation.clone().unwrap_or_default(),
        logo: t.logo.clone().or_else(|| {
            t.logos
                .as_ref()
                .and_then(|logos| logos.iter().find_map(|l| l.href.clone()))
        }),
    }
}

fn parse_status(s: &str) -> GameStatus {
    match s {
        "STATUS_IN_PROGRESS" | "STATUS_HALFTIME" | "STATUS_END_PERIOD" => GameStatus::InProgress,
        "STATUS_FINAL" | "STATUS_FINAL_OT" | "STATUS_FULL_TIME" => GameStatus::Final,
        "STATUS_POSTPONED" | "STATUS_CANCELED" | "STATUS_CANCELLED" | "STATUS_SUSPENDED" => {
            GameStatus::Postponed
        }
        _ => GameStatus::Scheduled,
    }
}

/// ESPN dates are RFC 3339 on some endpoints and minute precision ("2026-10-25T17:00Z") on others.
fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|naive| naive.and_utc())
}

fn map_standings(raw: StandingsResponse) -> Standings {
    let mut groups = Vec::new();
    if let Some(table) = &raw.standings {
        push_group(&mut groups, raw.name.clone().unwrap_or_default(), table);
    }
    for child in raw.children.iter().flatten() {
        collect_groups(child, &mut groups);
    }
    Standings { groups }
}

/// A group with its own table is taken whole (a conference); otherwise its
/// children (divisions) are walked.
fn collect_groups(group: &EspnStandingsGroup, out: &mut Vec<StandingsGroup>) {
    let has_entries = group
        .standings
        .as_ref()
        .and_then(|s| s.entries.as_ref())
        .is_some_and(|e| !e.is_empty());
    if has_entries && let Some(table) = &group.standings {
        let name = group
            .name
            .clone()
            .or_else(|| group.abbreviation.clone())
            .unwrap_or_default();
        push_group(out, name, table);
        return;
    }
    for child in group.children.iter().flatten() {
        collect_groups(child, out);
    }
}

fn push_group(out: &mut Vec<StandingsGroup>, name: String, table: &EspnStandingsTable) {
    let entries: Vec<StandingsEntry> = table
        .entries
        .iter()
        .flatten()
        .filter_map(|entry| {
            let team = map_team(entry.team.as_ref()?);
            if team.id.is_empty() {
                return None;
            }
            let stats = entry
                .stats
                .iter()
                .flatten()
                .filter_map(|s| {
                    Some(Stat {
                        name: s.name.clone().or_else(|| s.stat_type.clone())?,
                        abbreviation: s.abbreviation.clone().unwrap_or_default(),
                        value: s.value?,
                    })
                })
                .collect();
            Some(StandingsEntry { team, stats })
        })
        .collect();
    if !entries.is_empty() {
        out.push(StandingsGroup { name, entries });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TeamId;
    use chrono::TimeZone;

    const SCOREBOARD_JSON: &str = r#"{
        "events": [
            {
                "id": "401671801",
                "name": "Buffalo Bills at Kansas City Chiefs",
                "shortName": "BUF @ KC",
                "date": "2026-10-25T20:25Z",
                "season": { "type": 2, "slug": "regular-season" },
                "status": { "type": { "name": "STATUS_SCHEDULED", "completed": false } },
                "competitions": [{
                    "venue": { "fullName": "GEHA Field at Arrowhead Stadium" },
                    "broadcasts": [{ "market": "national", "names": ["CBS"] }, { "names": ["CBS", "Paramount+"] }],
                    "competitors": [
                        { "id": "2", "homeAway": "away", "team": { "id": "2", "displayName": "Buffalo Bills", "shortDisplayName": "Bills", "abbreviation": "BUF" } },
                        { "id": 12, "homeAway": "home", "team": { "id": 12, "displayName": "Kansas City Chiefs", "shortDisplayName": "Chiefs", "abbreviation": "KC", "logo": "https://a.espncdn.com/kc.png" } }
                    ]
                }]
            },
            { "id": "401671802", "competitions": [{ "competitors": [] }] }
        ]
    }"#;

    const STANDINGS_JSON: &str = r#"{
        "name": "National Football League",
        "children": [
            {
                "name": "American Football Conference",
                "abbreviation": "AFC",
                "standings": { "entries": [
                    { "team": { "id": "12", "displayName": "Kansas City Chiefs" }, "stats": [ { "name": "wins", "abbreviation": "W", "value": 6.0 } ] },
                    { "team": { "id": "2", "displayName": "Buffalo Bills" }, "stats": [ { "name": "wins", "abbreviation": "W", "value": 5.0 } ] }
                ] }
            },
            {
                "name": "National Football Conference",
                "children": [
                    { "name": "NFC East", "standings": { "entries": [
                        { "team": { "id": "21", "displayName": "Philadelphia Eagles" }, "stats": [ { "type": "wins", "value": 5.0 }, { "name": "losses" } ] }
                    ] } }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("STATUS_IN_PROGRESS"), GameStatus::InProgress);
        assert_eq!(parse_status("STATUS_FULL_TIME"), GameStatus::Final);
        assert_eq!(parse_status("STATUS_SCHEDULED"), GameStatus::Scheduled);
        assert_eq!(parse_status("STATUS_POSTPONED"), GameStatus::Postponed);
    }

    #[test]
    fn event_dates_parse_with_and_without_seconds() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 25, 20, 25, 0).unwrap();
        assert_eq!(parse_event_date("2026-10-25T20:25Z"), Some(expected));
        assert_eq!(parse_event_date("2026-10-25T20:25:00Z"), Some(expected));
        assert_eq!(parse_event_date("next sunday"), None);
    }

    #[test]
    fn scoreboard_event_maps_to_game() {
        let raw: ScoreboardResponse = serde_json::from_str(SCOREBOARD_JSON).unwrap();
        let events = raw.events.unwrap();
        let game = map_event_to_game(&events[0], Competition::Nfl).expect("complete event maps");

        assert_eq!(game.id, "401671801");
        assert_eq!(game.name, "BUF @ KC");
        assert_eq!(game.home.id, TeamId::from("12"), "numeric ids normalize to strings");
        assert_eq!(game.away.short_name, "Bills");
        assert_eq!(game.home.logo.as_deref(), Some("https://a.espncdn.com/kc.png"));
        assert_eq!(game.broadcasts, vec!["CBS".to_string(), "Paramount+".to_string()]);
        assert_eq!(game.season_type, SeasonType::Regular);
        assert_eq!(game.venue.as_deref(), Some("GEHA Field at Arrowhead Stadium"));
        assert!(game.start_time.is_some());
    }

    #[test]
    fn events_without_two_competitors_are_skipped() {
        let raw: ScoreboardResponse = serde_json::from_str(SCOREBOARD_JSON).unwrap();
        let events = raw.events.unwrap();
        assert!(map_event_to_game(&events[1], Competition::Nfl).is_none());
    }

    #[test]
    fn completed_flag_overrides_status_name() {
        let raw: EspnEvent = serde_json::from_str(
            r#"{ "id": "9", "status": { "type": { "name": "STATUS_SCHEDULED", "completed": true } },
                 "competitions": [{ "competitors": [ { "id": "1" }, { "id": "2" } ] }] }"#,
        )
        .unwrap();
        let game = map_event_to_game(&raw, Competition::Nhl).unwrap();
        assert!(game.is_completed());
        assert_eq!(game.home.id, TeamId::from("1"), "index order is the fallback");
    }

    #[test]
    fn standings_flatten_conferences_and_divisions() {
        let raw: StandingsResponse = serde_json::from_str(STANDINGS_JSON).unwrap();
        let standings = map_standings(raw);

        assert_eq!(standings.groups.len(), 2);
        assert_eq!(standings.groups[0].name, "American Football Conference");
        assert_eq!(standings.groups[0].entries.len(), 2);
        assert_eq!(standings.groups[1].name, "NFC East");
        let eagles = &standings.groups[1].entries[0];
        assert_eq!(eagles.stats.len(), 1, "stats without a value are dropped");
        assert_eq!(eagles.stats[0].name, "wins");
    }

    #[test]
    fn root_level_table_becomes_single_group() {
        let raw: StandingsResponse = serde_json::from_str(
            r#"{ "name": "English Premier League", "standings": { "entries": [
                { "team": { "id": 359, "displayName": "Arsenal", "logos": [ { "href": "https://a.espncdn.com/359.png" } ] },
                  "stats": [ { "name": "points", "abbreviation": "P", "value": 19 } ] } ] } }"#,
        )
        .unwrap();
        let standings = map_standings(raw);
        assert_eq!(standings.groups.len(), 1);
        let arsenal = &standings.groups[0].entries[0].team;
        assert_eq!(arsenal.id, TeamId::from(359u64));
        assert_eq!(arsenal.logo.as_deref(), Some("https://a.espncdn.com/359.png"));
    }

    #[test]
    fn fetched_from_error_raises_flag_with_default_data() {
        let ok: Fetched<Vec<u8>> = Fetched::ok(vec![1]);
        assert!(!ok.error);
        let failed: Fetched<Vec<u8>> = Fetched::failed();
        assert!(failed.error);
        assert!(failed.data.is_empty());
    }

    #[tokio::test]
    async fn fetch_scoreboard_hits_dated_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/site/football/nfl/scoreboard")
            .match_query(mockito::Matcher::UrlEncoded("dates".into(), "20261025".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SCOREBOARD_JSON)
            .create_async()
            .await;

        let api = EspnApi::new().with_base_urls(format!("{}/site", server.url()), format!("{}/v2", server.url()));
        let date = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        let games = api.fetch_scoreboard(Competition::Nfl, date).await.expect("scoreboard loads");

        mock.assert_async().await;
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].competition, Competition::Nfl);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/hockey/nhl/standings")
            .with_status(404)
            .create_async()
            .await;

        let api = EspnApi::new().with_base_urls(format!("{}/site", server.url()), format!("{}/v2", server.url()));
        let result = api.fetch_standings("hockey/nhl").await;
        assert!(matches!(result, Err(ApiError::Api(_, _))));

        let fetched = Fetched::from_result(result);
        assert!(fetched.error);
        assert!(fetched.data.is_empty());
    }

    #[tokio::test]
    async fn fetch_standings_parses_groups() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/football/nfl/standings")
            .with_status(200)
            .with_body(STANDINGS_JSON)
            .create_async()
            .await;

        let api = EspnApi::new().with_base_urls(format!("{}/site", server.url()), format!("{}/v2", server.url()));
        let standings = api.fetch_standings("football/nfl").await.expect("standings load");
        assert_eq!(standings.entries().count(), 3);
    }
}
