use crate::state::categories::{CategoryKey, CategoryScheme, CompetitionContext, NationMap, categorize_game};
use crate::state::favorites::{FavoriteTeam, ids_by_namespace};
use crate::state::settings::SettingsDocument;
use crate::state::tiers::{TeamTier, classify};
use crate::state::top_tier::{resolve, rule_for};
use chrono::{DateTime, Utc};
use espn_api::{Competition, Game, SeasonType, Standings, TeamId};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Everything fetched in one refresh cycle.
#[derive(Debug, Clone, Default)]
pub struct Slate {
    pub games: Vec<Game>,
    pub standings: HashMap<Competition, Standings>,
    pub nations: NationMap,
    /// At least one sub-fetch failed; what is here is still usable.
    pub incomplete: bool,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// The user's effective setup, already resolved against any watch party.
pub struct DigestInputs<'a> {
    pub favorites: &'a [FavoriteTeam],
    pub settings: &'a SettingsDocument,
    pub show_preseason: bool,
    pub must_watch: &'a BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameCard {
    pub game: Game,
    pub category: Option<CategoryKey>,
    /// The category is enabled for this competition.
    pub big_game: bool,
    pub involves_favorite: bool,
    pub must_watch: bool,
    pub home_tier: TeamTier,
    pub away_tier: TeamTier,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Digest {
    pub cards: Vec<GameCard>,
    pub incomplete: bool,
}

pub fn top_tier_sets(standings: &HashMap<Competition, Standings>) -> HashMap<Competition, HashSet<TeamId>> {
    standings
        .iter()
        .filter_map(|(competition, table)| Some((*competition, resolve(table, rule_for(*competition)?))))
        .collect()
}

pub fn build_digest(slate: &Slate, inputs: &DigestInputs<'_>) -> Digest {
    let top_tiers = top_tier_sets(&slate.standings);
    let favorites = ids_by_namespace(inputs.favorites);
    let empty = HashSet::new();

    let mut seen = HashSet::new();
    let mut cards: Vec<GameCard> = slate
        .games
        .iter()
        .filter(|game| !game.is_completed())
        .filter(|game| inputs.show_preseason || game.season_type != SeasonType::Preseason)
        .filter(|game| seen.insert(game.id.as_str()))
        .filter_map(|game| {
            let ctx = CompetitionContext {
                top_tier: top_tiers.get(&game.competition).unwrap_or(&empty),
                favorites: favorites.get(&game.competition.id_namespace()).unwrap_or(&empty),
                nations: &slate.nations,
            };
            let category = categorize_game(game, ctx);
            let big_game = category.is_some_and(|c| inputs.settings.is_enabled(c, game.competition));
            let involves_favorite = ctx.favorites.iter().any(|id| game.involves(id));
            let must_watch = inputs.must_watch.contains(&game.id);
            if !(big_game || involves_favorite || must_watch) {
                return None;
            }

            let (home_tier, away_tier) = match CategoryScheme::of(game.competition) {
                CategoryScheme::Generic => (
                    classify(&game.home.id, ctx.top_tier, ctx.favorites),
                    classify(&game.away.id, ctx.top_tier, ctx.favorites),
                ),
                CategoryScheme::ChampionsLeague => (TeamTier::Plain, TeamTier::Plain),
            };
            Some(GameCard {
                game: game.clone(),
                category,
                big_game,
                involves_favorite,
                must_watch,
                home_tier,
                away_tier,
            })
        })
        .collect();

    cards.sort_by_key(|card| (card.game.start_time.is_none(), card.game.start_time));
    Digest { cards, incomplete: slate.incomplete }
}
