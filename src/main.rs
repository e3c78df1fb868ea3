mod app;
mod cli;
mod draw;
mod state;

use crate::app::App;
use crate::cli::{CacheCommand, CategoriesCommand, Cli, Command, FavoritesCommand, MustWatchCommand, PartyCommand};
use crate::state::app_settings::AppSettings;
use crate::state::favorites::{FavoriteTeam, find_team};
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::NetworkWorker;
use crate::state::refresher::PeriodicRefresher;
use crate::state::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::state::watch_party::{extract_token, share_url};
use anyhow::{Context, bail};
use chrono::Local;
use clap::Parser;
use crossterm::{cursor, execute, terminal};
use espn_api::TeamId;
use espn_api::client::EspnApi;
use log::{error, warn};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::panic;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut settings = AppSettings::load();
    if let Some(days) = cli.days.filter(|d| *d > 0) {
        settings.days = days;
    }
    if let Some(secs) = cli.refresh_secs.filter(|s| *s > 0) {
        settings.refresh_every = Duration::from_secs(secs);
    }

    let store = open_store(settings.storage_path())?;
    let cache_store = open_store(settings.cache_path())?;
    let session = open_session(&settings);
    let launch_token = cli.watch_party.as_deref().and_then(extract_token);
    let client = EspnApi::new().with_timeout(settings.request_timeout);
    let app = App::new(settings, store, cache_store, session, launch_token);

    run_command(app, client, cli.command.unwrap_or(Command::Watch), cli.once).await
}

/// `GAMETIME_LOG` wins over `RUST_LOG`; logs go to stderr so they never mix
/// with the digest.
fn init_logging() {
    let filter = std::env::var("GAMETIME_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_store(path: PathBuf) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store = FileStore::open(&path).with_context(|| format!("opening {}", path.display()))?;
    Ok(Arc::new(store))
}

/// The watch-party session lasts as long as the login session when the
/// platform has a runtime dir, otherwise as long as this process.
fn open_session(settings: &AppSettings) -> Arc<dyn KeyValueStore> {
    if let Some(path) = settings.session_path() {
        match FileStore::open(&path) {
            Ok(store) => return Arc::new(store),
            Err(e) => warn!("watch party session unavailable, keeping it in memory: {e}"),
        }
    }
    Arc::new(MemoryStore::new())
}

async fn watch(app: App, client: EspnApi, once: bool) -> anyhow::Result<()> {
    // Polling on a terminal repaints one screen; `--once` and pipes get plain lines.
    let live = !once && io::stdout().is_terminal();
    if live {
        setup_terminal()?;
        setup_panic_hook();
    }
    let refresh_every = app.settings.refresh_every;
    let worker_cache = app.cache();
    let app = Arc::new(Mutex::new(app));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    // Network thread
    let network_worker = NetworkWorker::new(client, worker_cache, network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Periodic refresh thread
    let periodic_task = (!once).then(|| tokio::spawn(PeriodicRefresher::new(ui_event_tx.clone(), refresh_every).run()));

    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    let result = main_ui_loop(app, ui_event_rx, network_req_tx, network_resp_rx, once, live).await;

    network_task.abort();
    if let Some(task) = periodic_task {
        task.abort();
    }
    if live {
        cleanup_terminal()?;
    }
    result
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide, terminal::EnterAlternateScreen, terminal::Clear(terminal::ClearType::All))
}

fn cleanup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, terminal::LeaveAlternateScreen, cursor::Show)
}

fn setup_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = cleanup_terminal();
        default_hook(panic_info);
    }));
}

async fn main_ui_loop(
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
    once: bool,
    live: bool,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                handle_ui_event(ui_event, &app, &network_requests).await;
            }

            Some(response) = network_responses.recv() => {
                handle_network_response(response, &app).await;
                let guard = app.lock().await;
                let mut stdout = io::stdout().lock();
                if live {
                    draw::redraw(&mut stdout, &guard)?;
                } else {
                    draw::draw(&mut stdout, &guard)?;
                }
                if once {
                    return Ok(());
                }
            }

            _ = tokio::signal::ctrl_c() => {
                return Ok(());
            }

            else => return Ok(()),
        }
    }
}

async fn handle_ui_event(ui_event: UiEvent, app: &Arc<Mutex<App>>, network_requests: &mpsc::Sender<NetworkRequest>) {
    match ui_event {
        UiEvent::AppStarted | UiEvent::RefreshDue => {
            let mut guard = app.lock().await;
            if guard.state.refreshing && ui_event == UiEvent::RefreshDue {
                // Cycles are never cancelled; skip this tick instead of piling up.
                return;
            }
            let plan = guard.begin_refresh_cycle(Local::now().date_naive());
            drop(guard);
            let _ = network_requests.send(NetworkRequest::LoadSlate { plan }).await;
        }
    }
}

async fn handle_network_response(response: NetworkResponse, app: &Arc<Mutex<App>>) {
    let mut guard = app.lock().await;
    match response {
        NetworkResponse::SlateLoaded { slate } => guard.on_slate_loaded(slate),
        NetworkResponse::Error { message } => {
            error!("Network error: {message}");
            guard.on_error(message);
        }
    }
}

fn print(out: &mut impl Write, lines: Vec<String>) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

async fn run_command(mut app: App, client: EspnApi, command: Command, once: bool) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match command {
        Command::Watch => return watch(app, client, once).await,
        Command::Favorites(FavoritesCommand::List) => print(&mut out, draw::render_favorites(&app.favorites()))?,
        Command::Favorites(FavoritesCommand::Add { league, team }) => {
            let standings = client
                .fetch_standings(league.espn_path())
                .await
                .with_context(|| format!("looking up {league} teams"))?;
            let Some(found) = find_team(&standings, &team) else {
                bail!("no {} team matches '{team}'", league.label());
            };
            let favorite = FavoriteTeam::from_team(found, league);
            let name = favorite.name.clone();
            app.add_favorite(favorite)?;
            print(&mut out, vec![format!("Following {name}.")])?;
        }
        Command::Favorites(FavoritesCommand::Remove { league, team_id }) => {
            let removed = app.remove_favorite(&TeamId::new(&team_id), league)?;
            print(&mut out, vec![format!("Unfollowed {}.", removed.name)])?;
        }
        Command::Favorites(FavoritesCommand::Move { league, team_id, position }) => {
            let index = usize::try_from(position.saturating_sub(1))?;
            app.move_favorite(&TeamId::new(&team_id), league, index)?;
            print(&mut out, draw::render_favorites(&app.favorites()))?;
        }
        Command::Categories(CategoriesCommand::List) => print(&mut out, draw::render_settings(&app.big_game_settings()))?,
        Command::Categories(CategoriesCommand::Enable { competition, category }) => {
            app.set_category(competition, category, true)?;
            print(&mut out, vec![format!("{} on for {}.", category.label(), competition.label())])?;
        }
        Command::Categories(CategoriesCommand::Disable { competition, category }) => {
            app.set_category(competition, category, false)?;
            print(&mut out, vec![format!("{} off for {}.", category.label(), competition.label())])?;
        }
        Command::Preseason { visibility } => {
            app.set_show_preseason(visibility == "show")?;
            let state = if app.show_preseason() { "shown" } else { "hidden" };
            print(&mut out, vec![format!("Preseason games are {state}.")])?;
        }
        Command::MustWatch(MustWatchCommand::List) => print(&mut out, app.must_watch().into_iter().collect())?,
        Command::MustWatch(MustWatchCommand::Add { event_id }) => {
            let message = if app.set_must_watch(&event_id, true)? { "Pinned" } else { "Already pinned" };
            print(&mut out, vec![format!("{message}: {event_id}")])?;
        }
        Command::MustWatch(MustWatchCommand::Remove { event_id }) => {
            let message = if app.set_must_watch(&event_id, false)? { "Unpinned" } else { "Was not pinned" };
            print(&mut out, vec![format!("{message}: {event_id}")])?;
        }
        Command::Share { base_url } => {
            let snapshot = app.snapshot();
            print(&mut out, vec![share_url(&base_url, &snapshot)?])?;
        }
        Command::Cache(CacheCommand::Clear) => {
            let removed = app.clear_cache();
            print(&mut out, vec![format!("Removed {removed} cached responses.")])?;
        }
        Command::Party(PartyCommand::End) => {
            app.end_party()?;
            print(&mut out, vec!["Back to your own setup.".to_string()])?;
        }
    }
    Ok(())
}
