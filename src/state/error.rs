use crate::state::categories::CategoryKey;
use crate::state::storage::StorageError;
use espn_api::{Competition, TeamId};

/// User-facing rejections from the local stores.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("a watch party is active; local settings are read-only until it ends")]
    ReadOnly,
    #[error("you can follow at most {max} teams; remove one first")]
    CapacityReached { max: usize },
    #[error("{name} is already a favorite")]
    AlreadyFavorite { name: String },
    #[error("team {id} is not a {league} favorite")]
    NotFavorite { id: TeamId, league: Competition },
    #[error("{category} is not a {competition} category")]
    CategoryNotInScheme { category: CategoryKey, competition: Competition },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
