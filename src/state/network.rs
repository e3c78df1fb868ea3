use crate::state::cache::ResponseCache;
use crate::state::categories::{CategoryScheme, Nation};
use crate::state::digest::Slate;
use crate::state::messages::{FetchPlan, NetworkRequest, NetworkResponse};
use crate::state::top_tier::{resolve_nations, rule_for};
use chrono::{NaiveDate, Utc};
use espn_api::client::{EspnApi, Fetched};
use espn_api::{Competition, Game, Standings};
use futures_util::future::join_all;
use log::{debug, error};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;

/// Schedules change (kickoff times, postponements) more often than tables.
const SCOREBOARD_TTL: Duration = Duration::from_secs(10 * 60);

pub struct NetworkWorker {
    client: EspnApi,
    cache: ResponseCache,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
}

impl NetworkWorker {
    pub fn new(
        client: EspnApi,
        cache: ResponseCache,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self { client, cache, requests, responses }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            let response = match request {
                NetworkRequest::LoadSlate { plan } => self.handle_load_slate(&plan).await,
            };

            debug!("network request complete");
            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send network response: {e}");
                break;
            }
        }
    }

    async fn handle_load_slate(&self, plan: &FetchPlan) -> NetworkResponse {
        if plan.competitions.is_empty() {
            return NetworkResponse::Error {
                message: "Nothing to follow yet: add a favorite or enable a Big Game category.".into(),
            };
        }
        let slate = load_slate(&self.client, &self.cache, plan).await;
        NetworkResponse::SlateLoaded { slate }
    }
}

/// Fetch standings and schedules for every competition in the plan at once.
/// Failed sub-fetches leave holes and mark the slate incomplete.
pub async fn load_slate(client: &EspnApi, cache: &ResponseCache, plan: &FetchPlan) -> Slate {
    debug!(
        "loading {} competitions over {} days",
        plan.competitions.len(),
        plan.dates.len()
    );
    let wants_nations = plan
        .competitions
        .iter()
        .any(|c| CategoryScheme::of(*c) == CategoryScheme::ChampionsLeague);

    // A table only matters where it decides the top tier.
    let tiered: Vec<Competition> = plan
        .competitions
        .iter()
        .copied()
        .filter(|c| rule_for(*c).is_some())
        .collect();
    let standings_fetches = tiered.iter().map(|c| standings(client, cache, c.espn_path()));
    let nation_fetches = Nation::ALL
        .into_iter()
        .filter(|_| wants_nations)
        .map(|n| standings(client, cache, n.league_path()));
    let scoreboard_fetches = plan
        .competitions
        .iter()
        .flat_map(|c| plan.dates.iter().map(move |d| scoreboard(client, cache, *c, *d)));

    let (standings, nations, scoreboards) = tokio::join!(
        join_all(standings_fetches),
        join_all(nation_fetches),
        join_all(scoreboard_fetches),
    );

    let mut incomplete = false;
    let mut slate = Slate::default();
    for (competition, fetched) in tiered.iter().zip(standings) {
        incomplete |= fetched.error;
        if !fetched.data.is_empty() {
            slate.standings.insert(*competition, fetched.data);
        }
    }

    let leagues: Vec<(Nation, Standings)> = Nation::ALL
        .into_iter()
        .zip(nations)
        .map(|(nation, fetched)| {
            incomplete |= fetched.error;
            (nation, fetched.data)
        })
        .collect();
    slate.nations = resolve_nations(&leagues);

    let mut seen = HashSet::new();
    for fetched in scoreboards {
        incomplete |= fetched.error;
        slate
            .games
            .extend(fetched.data.into_iter().filter(|g| seen.insert(g.id.clone())));
    }

    slate.incomplete = incomplete;
    slate.fetched_at = Some(Utc::now());
    slate
}

async fn standings(client: &EspnApi, cache: &ResponseCache, espn_path: &str) -> Fetched<Standings> {
    let key = format!("standings:{espn_path}");
    if let Some(hit) = cache.get::<Standings>(&key) {
        return Fetched::ok(hit);
    }
    let fetched = Fetched::from_result(client.fetch_standings(espn_path).await);
    if !fetched.error {
        cache.set_default(&key, &fetched.data);
    }
    fetched
}

async fn scoreboard(client: &EspnApi, cache: &ResponseCache, competition: Competition, date: NaiveDate) -> Fetched<Vec<Game>> {
    let key = format!("scoreboard:{competition}:{}", date.format("%Y%m%d"));
    if let Some(hit) = cache.get::<Vec<Game>>(&key) {
        return Fetched::ok(hit);
    }
    let fetched = Fetched::from_result(client.fetch_scoreboard(competition, date).await);
    if !fetched.error {
        cache.set(&key, &fetched.data, SCOREBOARD_TTL);
    }
    fetched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::storage::MemoryStore;
    use espn_api::TeamId;
    use mockito::{Matcher, Server};
    use std::sync::Arc;

    const SCOREBOARD: &str = r#"{"events":[{
        "id":"401","name":"Bills at Chiefs","date":"2026-10-25T20:25Z",
        "season":{"type":2},
        "status":{"type":{"name":"STATUS_SCHEDULED","completed":false}},
        "competitions":[{"competitors":[
            {"homeAway":"home","team":{"id":"12","displayName":"Kansas City Chiefs","abbreviation":"KC"}},
            {"homeAway":"away","team":{"id":2,"displayName":"Buffalo Bills","abbreviation":"BUF"}}
        ]}]
    }]}"#;

    const STANDINGS: &str = r#"{"children":[{"name":"AFC","standings":{"entries":[
        {"team":{"id":"12","displayName":"Kansas City Chiefs"},"stats":[{"name":"wins","value":6}]},
        {"team":{"id":"2","displayName":"Buffalo Bills"},"stats":[{"name":"wins","value":5}]}
    ]}}]}"#;

    fn api(server: &Server) -> EspnApi {
        EspnApi::new().with_base_urls(format!("{}/site", server.url()), format!("{}/v2", server.url()))
    }

    fn plan(competitions: Vec<Competition>) -> FetchPlan {
        FetchPlan {
            competitions,
            dates: vec![NaiveDate::from_ymd_opt(2026, 10, 25).unwrap()],
        }
    }

    #[tokio::test]
    async fn loads_standings_and_games_then_serves_them_from_cache() {
        let mut server = Server::new_async().await;
        let scoreboard = server
            .mock("GET", "/site/football/nfl/scoreboard")
            .match_query(Matcher::UrlEncoded("dates".into(), "20261025".into()))
            .with_body(SCOREBOARD)
            .expect(1)
            .create_async()
            .await;
        let standings = server
            .mock("GET", "/v2/football/nfl/standings")
            .with_body(STANDINGS)
            .expect(1)
            .create_async()
            .await;

        let client = api(&server);
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()));
        let first = load_slate(&client, &cache, &plan(vec![Competition::Nfl])).await;
        let second = load_slate(&client, &cache, &plan(vec![Competition::Nfl])).await;

        scoreboard.assert_async().await;
        standings.assert_async().await;
        assert!(!first.incomplete);
        assert_eq!(first.games.len(), 1);
        assert_eq!(first.standings[&Competition::Nfl].entries().count(), 2);
        assert_eq!(second.games, first.games);
        assert!(first.nations.is_empty());
    }

    #[tokio::test]
    async fn failed_sub_fetch_marks_slate_incomplete() {
        let mut server = Server::new_async().await;
        let _scoreboard = server
            .mock("GET", "/site/hockey/nhl/scoreboard")
            .match_query(Matcher::Any)
            .with_body(SCOREBOARD)
            .create_async()
            .await;
        let _standings = server
            .mock("GET", "/v2/hockey/nhl/standings")
            .with_status(503)
            .create_async()
            .await;

        let cache = ResponseCache::new(Arc::new(MemoryStore::new()));
        let slate = load_slate(&api(&server), &cache, &plan(vec![Competition::Nhl])).await;

        assert!(slate.incomplete);
        assert_eq!(slate.games.len(), 1, "schedule still usable");
        assert!(slate.standings.is_empty());
        assert_eq!(cache.get::<Standings>("standings:hockey/nhl"), None, "failures are not cached");
    }

    #[tokio::test]
    async fn champions_league_also_reads_domestic_tables() {
        let mut server = Server::new_async().await;
        let _scoreboard = server
            .mock("GET", "/site/soccer/uefa.champions/scoreboard")
            .match_query(Matcher::Any)
            .with_body(r#"{"events":[]}"#)
            .create_async()
            .await;
        let england = server
            .mock("GET", "/v2/soccer/eng.1/standings")
            .with_body(STANDINGS)
            .create_async()
            .await;
        let mut empty_tables = Vec::new();
        let own_table = server
            .mock("GET", "/v2/soccer/uefa.champions/standings")
            .with_status(503)
            .expect(0)
            .create_async()
            .await;
        for path in ["soccer/esp.1", "soccer/ger.1", "soccer/ita.1", "soccer/fra.1"] {
            let mock = server
                .mock("GET", format!("/v2/{path}/standings").as_str())
                .with_body("{}")
                .create_async()
                .await;
            empty_tables.push(mock);
        }

        let cache = ResponseCache::new(Arc::new(MemoryStore::new()));
        let slate = load_slate(&api(&server), &cache, &plan(vec![Competition::ChampionsLeague])).await;

        england.assert_async().await;
        own_table.assert_async().await;
        assert_eq!(slate.nations.get(&TeamId::from("12")), Some(&Nation::England));
        assert!(!slate.standings.contains_key(&Competition::ChampionsLeague));
        assert!(!slate.incomplete, "a table with no tier rule is never requested");
    }

    #[tokio::test]
    async fn worker_reports_empty_plans() {
        let (req_tx, req_rx) = mpsc::channel(1);
        let (resp_tx, mut resp_rx) = mpsc::channel(1);
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()));
        let worker = NetworkWorker::new(EspnApi::new(), cache, req_rx, resp_tx);
        let task = tokio::spawn(worker.run());

        req_tx.send(NetworkRequest::LoadSlate { plan: plan(vec![]) }).await.unwrap();
        assert!(matches!(resp_rx.recv().await, Some(NetworkResponse::Error { .. })));
        task.abort();
    }
}
