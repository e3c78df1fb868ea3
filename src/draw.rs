use crate::app::App;
use crate::state::categories::CategoryScheme;
use crate::state::digest::{Digest, GameCard};
use crate::state::favorites::FavoriteTeam;
use crate::state::settings::SettingsDocument;
use crate::state::tiers::TeamTier;
use chrono::{DateTime, Local, TimeZone, Utc};
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use espn_api::{Competition, GameStatus};
use std::fmt::Display;
use std::io::{self, Write};

const INCOMPLETE_NOTICE: &str = "(some data may be incomplete)";

/// Print the current digest, or whatever explains its absence.
pub fn draw(out: &mut impl Write, app: &App) -> io::Result<()> {
    let mut lines = Vec::new();
    if app.state.watch_party {
        lines.push("Watching with a party. Your own settings are paused (`gametime party end`).".to_string());
    }
    match (&app.state.digest, &app.state.last_error) {
        (_, Some(err)) => lines.push(format!("Load failed: {err}")),
        (Some(digest), None) => lines.extend(render_digest(digest, app.state.last_refresh, &Local)),
        (None, None) => lines.push("Loading...".to_string()),
    }
    writeln!(out, "{}", lines.join("\n"))?;
    out.flush()
}

/// Repaint the screen in place instead of appending to scrollback.
pub fn redraw(out: &mut impl Write, app: &App) -> io::Result<()> {
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    draw(out, app)
}

pub fn render_digest<Tz>(digest: &Digest, updated: Option<DateTime<Utc>>, tz: &Tz) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut lines = Vec::with_capacity(digest.cards.len() + 4);
    let stamp = updated
        .map(|t| format!(" (updated {})", t.with_timezone(tz).format("%H:%M")))
        .unwrap_or_default();
    lines.push(format!("Upcoming games{stamp}"));
    if digest.incomplete {
        lines.push(INCOMPLETE_NOTICE.to_string());
    }
    if digest.cards.is_empty() {
        lines.push("Nothing on the schedule for your teams or Big Games.".to_string());
        return lines;
    }

    let mut current_day = None;
    for card in &digest.cards {
        let day = card
            .game
            .start_time
            .map(|t| t.with_timezone(tz).format("%a %b %-d").to_string())
            .unwrap_or_else(|| "Date TBD".to_string());
        if current_day.as_ref() != Some(&day) {
            lines.push(String::new());
            lines.push(day.clone());
            current_day = Some(day);
        }
        lines.push(format_card(card, tz));
    }
    lines
}

fn format_card<Tz>(card: &GameCard, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let game = &card.game;
    let when = match game.status {
        GameStatus::InProgress => "LIVE".to_string(),
        GameStatus::Postponed => "PPD".to_string(),
        GameStatus::Final => "FINAL".to_string(),
        GameStatus::Scheduled => game
            .start_time
            .map(|t| t.with_timezone(tz).format("%H:%M").to_string())
            .unwrap_or_else(|| "TBD".to_string()),
    };

    let away = team_label(&game.away.abbrev, &game.away.name, card.away_tier);
    let home = team_label(&game.home.abbrev, &game.home.name, card.home_tier);
    let mut line = format!("  {when:<5}  {:<16} {away} @ {home}", game.competition.label());

    let mut tags = Vec::new();
    if let Some(category) = card.category.filter(|_| card.big_game) {
        tags.push(category.label().to_string());
    }
    if card.involves_favorite {
        tags.push("favorite".to_string());
    }
    if card.must_watch {
        tags.push("must-watch".to_string());
    }
    if !tags.is_empty() {
        line.push_str(&format!("  [{}]", tags.join(", ")));
    }
    if !game.broadcasts.is_empty() {
        line.push_str(&format!("  {}", game.broadcasts.join("/")));
    }
    line
}

fn team_label(abbrev: &str, name: &str, tier: TeamTier) -> String {
    let label = if abbrev.is_empty() { name } else { abbrev };
    match tier {
        TeamTier::FavoriteTopTier | TeamTier::FavoriteNonTopTier => format!("{label}*"),
        TeamTier::TopTier | TeamTier::Plain => label.to_string(),
    }
}

pub fn render_favorites(teams: &[FavoriteTeam]) -> Vec<String> {
    if teams.is_empty() {
        return vec!["No favorites yet. Try `gametime favorites add nfl KC`.".to_string()];
    }
    teams
        .iter()
        .enumerate()
        .map(|(idx, t)| format!("{:>2}. {:<28} {:<16} id {}", idx + 1, t.name, t.league.label(), t.id))
        .collect()
}

pub fn render_settings(doc: &SettingsDocument) -> Vec<String> {
    let mut lines = Vec::new();
    for competition in Competition::ALL {
        let enabled = doc.enabled(competition);
        lines.push(format!("{} ({competition})", competition.label()));
        for category in CategoryScheme::of(competition).categories() {
            let mark = if enabled.contains(&category) { 'x' } else { ' ' };
            lines.push(format!("  [{mark}] {:<22} {}", category.key(), category.label()));
        }
    }
    lines
}
