use crate::state::digest::Slate;
use chrono::NaiveDate;
use espn_api::Competition;

/// What one refresh cycle should fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub competitions: Vec<Competition>,
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    LoadSlate { plan: FetchPlan },
}

#[derive(Debug)]
pub enum NetworkResponse {
    SlateLoaded { slate: Slate },
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    AppStarted,
    RefreshDue,
}
