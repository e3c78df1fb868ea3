//! Game categorization.
//!
//! Most competitions use five generic categories derived from the two teams'
//! tiers. The Champions League swaps the whole category space for four
//! bespoke ones built from favorite status and the prestige of each club's
//! domestic league. Settings store [`CategoryKey`]s, which span both schemes.

use crate::state::tiers::{TeamTier, classify};
use espn_api::{Competition, Game, TeamId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GameCategory {
    RobLowe,
    PlayoffPreview,
    MeasuringStick,
    BeatEmOff,
    HouseDivided,
}

impl GameCategory {
    pub const ALL: [GameCategory; 5] = [
        GameCategory::RobLowe,
        GameCategory::PlayoffPreview,
        GameCategory::MeasuringStick,
        GameCategory::BeatEmOff,
        GameCategory::HouseDivided,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            GameCategory::RobLowe => "rob-lowe",
            GameCategory::PlayoffPreview => "playoff-preview",
            GameCategory::MeasuringStick => "measuring-stick",
            GameCategory::BeatEmOff => "beat-em-off",
            GameCategory::HouseDivided => "house-divided",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GameCategory::RobLowe => "Rob Lowe",
            GameCategory::PlayoffPreview => "Playoff Preview",
            GameCategory::MeasuringStick => "Measuring Stick",
            GameCategory::BeatEmOff => "Beat Em Off",
            GameCategory::HouseDivided => "House Divided",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UclCategory {
    FavoriteVsGiant,
    Favorite,
    DomesticClash,
    Giants,
}

impl UclCategory {
    pub const ALL: [UclCategory; 4] = [
        UclCategory::FavoriteVsGiant,
        UclCategory::Favorite,
        UclCategory::DomesticClash,
        UclCategory::Giants,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            UclCategory::FavoriteVsGiant => "ucl-favorite-vs-giant",
            UclCategory::Favorite => "ucl-favorite",
            UclCategory::DomesticClash => "ucl-domestic-clash",
            UclCategory::Giants => "ucl-giants",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UclCategory::FavoriteVsGiant => "Favorite vs. Giant",
            UclCategory::Favorite => "Favorite in Europe",
            UclCategory::DomesticClash => "Domestic Clash",
            UclCategory::Giants => "Clash of Giants",
        }
    }
}

/// A category as stored in settings. Serialized as its kebab-case key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CategoryKey {
    Generic(GameCategory),
    ChampionsLeague(UclCategory),
}

impl CategoryKey {
    pub fn key(&self) -> &'static str {
        match self {
            CategoryKey::Generic(c) => c.key(),
            CategoryKey::ChampionsLeague(c) => c.key(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CategoryKey::Generic(c) => c.label(),
            CategoryKey::ChampionsLeague(c) => c.label(),
        }
    }

    pub fn scheme(&self) -> CategoryScheme {
        match self {
            CategoryKey::Generic(_) => CategoryScheme::Generic,
            CategoryKey::ChampionsLeague(_) => CategoryScheme::ChampionsLeague,
        }
    }
}

impl From<GameCategory> for CategoryKey {
    fn from(category: GameCategory) -> Self {
        CategoryKey::Generic(category)
    }
}

impl From<UclCategory> for CategoryKey {
    fn from(category: UclCategory) -> Self {
        CategoryKey::ChampionsLeague(category)
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl FromStr for CategoryKey {
    type Err = UnknownCategory;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = raw.trim().to_ascii_lowercase();
        GameCategory::ALL
            .into_iter()
            .map(CategoryKey::from)
            .chain(UclCategory::ALL.into_iter().map(CategoryKey::from))
            .find(|c| c.key() == key)
            .ok_or_else(|| UnknownCategory(raw.to_owned()))
    }
}

impl TryFrom<String> for CategoryKey {
    type Error = UnknownCategory;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<CategoryKey> for String {
    fn from(category: CategoryKey) -> Self {
        category.key().to_owned()
    }
}

/// Which category space a competition uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryScheme {
    Generic,
    ChampionsLeague,
}

impl CategoryScheme {
    pub fn of(competition: Competition) -> Self {
        match competition {
            Competition::ChampionsLeague => CategoryScheme::ChampionsLeague,
            Competition::Nfl
            | Competition::Nba
            | Competition::Wnba
            | Competition::Mlb
            | Competition::Nhl
            | Competition::Mls
            | Competition::PremierLeague => CategoryScheme::Generic,
        }
    }

    /// Full category set, in display order. Also the default enabled list.
    pub fn categories(&self) -> Vec<CategoryKey> {
        match self {
            CategoryScheme::Generic => GameCategory::ALL.into_iter().map(CategoryKey::from).collect(),
            CategoryScheme::ChampionsLeague => UclCategory::ALL.into_iter().map(CategoryKey::from).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Generic tier-pair rules
// ---------------------------------------------------------------------------

type TierRule = fn(TeamTier, TeamTier) -> bool;

/// Precedence matters: Playoff Preview must be checked before Rob Lowe, and
/// Beat Em Off only catches what nothing more specific claimed.
const GENERIC_RULES: [(GameCategory, TierRule); 5] = [
    (GameCategory::HouseDivided, |a, b| a.is_favorite() && b.is_favorite()),
    (GameCategory::PlayoffPreview, |a, b| {
        a == TeamTier::TopTier && b == TeamTier::FavoriteTopTier
    }),
    (GameCategory::RobLowe, |a, b| a == TeamTier::TopTier && b == TeamTier::TopTier),
    (GameCategory::MeasuringStick, |a, b| {
        a == TeamTier::FavoriteNonTopTier && b == TeamTier::TopTier
    }),
    (GameCategory::BeatEmOff, |a, b| a.is_favorite() && b == TeamTier::Plain),
];

/// First matching rule wins; each rule is tried on both orderings, so home
/// and away are interchangeable.
pub fn categorize(home: TeamTier, away: TeamTier) -> Option<GameCategory> {
    GENERIC_RULES
        .iter()
        .find(|(_, matches)| matches(home, away) || matches(away, home))
        .map(|(category, _)| *category)
}

// ---------------------------------------------------------------------------
// Champions League rules
// ---------------------------------------------------------------------------

/// Domestic leagues whose clubs count as giants in Europe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nation {
    England,
    Spain,
    Germany,
    Italy,
    France,
}

impl Nation {
    pub const ALL: [Nation; 5] = [Nation::England, Nation::Spain, Nation::Germany, Nation::Italy, Nation::France];

    /// ESPN path of the nation's top flight.
    pub fn league_path(&self) -> &'static str {
        match self {
            Nation::England => "soccer/eng.1",
            Nation::Spain => "soccer/esp.1",
            Nation::Germany => "soccer/ger.1",
            Nation::Italy => "soccer/ita.1",
            Nation::France => "soccer/fra.1",
        }
    }
}

pub type NationMap = HashMap<TeamId, Nation>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UclSide {
    pub favorite: bool,
    /// Known only for clubs from a prestige league.
    pub nation: Option<Nation>,
}

type UclRule = fn(UclSide, UclSide) -> bool;

const UCL_RULES: [(UclCategory, UclRule); 4] = [
    (UclCategory::FavoriteVsGiant, |a, b| a.favorite && !b.favorite && b.nation.is_some()),
    (UclCategory::Favorite, |a, _| a.favorite),
    (UclCategory::DomesticClash, |a, b| a.nation.is_some() && a.nation == b.nation),
    (UclCategory::Giants, |a, b| a.nation.is_some() && b.nation.is_some()),
];

pub fn categorize_ucl(home: UclSide, away: UclSide) -> Option<UclCategory> {
    UCL_RULES
        .iter()
        .find(|(_, matches)| matches(home, away) || matches(away, home))
        .map(|(category, _)| *category)
}

// ---------------------------------------------------------------------------
// Per-game dispatch
// ---------------------------------------------------------------------------

/// Everything needed to categorize games of one competition. Favorites are
/// those sharing the competition's id namespace only.
#[derive(Debug, Clone, Copy)]
pub struct CompetitionContext<'a> {
    pub top_tier: &'a HashSet<TeamId>,
    pub favorites: &'a HashSet<TeamId>,
    pub nations: &'a NationMap,
}

pub fn categorize_game(game: &Game, ctx: CompetitionContext<'_>) -> Option<CategoryKey> {
    match CategoryScheme::of(game.competition) {
        CategoryScheme::Generic => {
            let home = classify(&game.home.id, ctx.top_tier, ctx.favorites);
            let away = classify(&game.away.id, ctx.top_tier, ctx.favorites);
            categorize(home, away).map(CategoryKey::from)
        }
        CategoryScheme::ChampionsLeague => {
            let side = |id: &TeamId| UclSide {
                favorite: ctx.favorites.contains(id),
                nation: ctx.nations.get(id).copied(),
            };
            categorize_ucl(side(&game.home.id), side(&game.away.id)).map(CategoryKey::from)
        }
    }
}
