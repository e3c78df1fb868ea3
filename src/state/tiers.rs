use espn_api::TeamId;
use std::collections::HashSet;

/// Where a team stands for one evaluation: derived from the competition's
/// top-tier set and the user's favorites in its id namespace, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TeamTier {
    /// No tier ("none"): neither top tier nor a favorite.
    #[default]
    Plain,
    TopTier,
    /// Favorite and top tier ("Thinkin' Supey").
    FavoriteTopTier,
    /// Favorite but not top tier ("Ya Never Know").
    FavoriteNonTopTier,
}

impl TeamTier {
    pub fn is_favorite(self) -> bool {
        matches!(self, TeamTier::FavoriteTopTier | TeamTier::FavoriteNonTopTier)
    }

    pub fn label(self) -> &'static str {
        match self {
            TeamTier::Plain => "none",
            TeamTier::TopTier => "Top Tier",
            TeamTier::FavoriteTopTier => "Thinkin' Supey",
            TeamTier::FavoriteNonTopTier => "Ya Never Know",
        }
    }
}

pub fn classify(team: &TeamId, top_tier: &HashSet<TeamId>, favorites: &HashSet<TeamId>) -> TeamTier {
    match (top_tier.contains(team), favorites.contains(team)) {
        (true, true) => TeamTier::FavoriteTopTier,
        (false, true) => TeamTier::FavoriteNonTopTier,
        (true, false) => TeamTier::TopTier,
        (false, false) => TeamTier::Plain,
    }
}
