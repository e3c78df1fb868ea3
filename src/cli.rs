use crate::state::categories::CategoryKey;
use clap::{Parser, Subcommand};
use espn_api::Competition;

#[derive(Parser, Debug)]
#[command(name = "gametime")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Print the digest once and exit instead of polling
    #[arg(long)]
    pub once: bool,

    /// Days ahead to look, today included
    #[arg(long)]
    pub days: Option<u32>,

    /// Seconds between refreshes
    #[arg(long)]
    pub refresh_secs: Option<u64>,

    /// Join a watch party from a share link or bare token
    #[arg(long, value_name = "TOKEN|URL")]
    pub watch_party: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show upcoming games (default)
    Watch,
    /// Manage followed teams
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Choose which Big Game categories are shown
    #[command(subcommand)]
    Categories(CategoriesCommand),
    /// Show or hide preseason games
    Preseason {
        #[arg(value_parser = ["show", "hide"])]
        visibility: String,
    },
    /// Pin games you do not want to miss
    #[command(subcommand)]
    MustWatch(MustWatchCommand),
    /// Print a watch-party link for your current setup
    Share {
        #[arg(long, default_value = "https://gametime.app/")]
        base_url: String,
    },
    /// Cached responses
    #[command(subcommand)]
    Cache(CacheCommand),
    /// The active watch party
    #[command(subcommand)]
    Party(PartyCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum FavoritesCommand {
    #[command(alias = "ls")]
    List,
    /// Follow a team, found by id, abbreviation or name in the league's standings
    Add {
        #[arg(value_parser = parse_competition)]
        league: Competition,
        team: String,
    },
    Remove {
        #[arg(value_parser = parse_competition)]
        league: Competition,
        team_id: String,
    },
    /// Move a team to a position in the list (1 is first)
    Move {
        #[arg(value_parser = parse_competition)]
        league: Competition,
        team_id: String,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        position: u32,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CategoriesCommand {
    #[command(alias = "ls")]
    List,
    Enable {
        #[arg(value_parser = parse_competition)]
        competition: Competition,
        #[arg(value_parser = parse_category)]
        category: CategoryKey,
    },
    Disable {
        #[arg(value_parser = parse_competition)]
        competition: Competition,
        #[arg(value_parser = parse_category)]
        category: CategoryKey,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum MustWatchCommand {
    #[command(alias = "ls")]
    List,
    Add { event_id: String },
    Remove { event_id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    Clear,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum PartyCommand {
    /// Leave the watch party and go back to your own setup
    End,
}

fn parse_competition(raw: &str) -> Result<Competition, String> {
    Competition::from_key(raw).ok_or_else(|| {
        let known: Vec<&str> = Competition::ALL.iter().map(|c| c.key()).collect();
        format!("unknown competition '{raw}' (expected one of: {})", known.join(", "))
    })
}

fn parse_category(raw: &str) -> Result<CategoryKey, String> {
    raw.parse().map_err(|e| format!("{e}"))
}
