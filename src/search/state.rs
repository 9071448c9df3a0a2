//! Search state read by the render layer

use super::types::SearchResponse;

/// Message shown to the user for any transport failure. The cause is only
/// ever logged.
pub const GENERIC_FAILURE_MESSAGE: &str = "failed to retrieve results";

/// User-facing failure indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
}

impl ErrorInfo {
    pub fn generic() -> Self {
        Self {
            message: GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Which of `loading` / `error` / `data` is active at render time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Loading,
    Failed,
    Loaded,
}

impl SearchPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SearchPhase::Idle => "IDLE",
            SearchPhase::Loading => "LOADING",
            SearchPhase::Failed => "FAILED",
            SearchPhase::Loaded => "LOADED",
        }
    }
}

/// Query text and result state owned by the query controller.
///
/// All fields persist across transitions: the last successful `data` is
/// kept while a newer request is loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub loading: bool,
    pub error: Option<ErrorInfo>,
    pub data: Option<SearchResponse>,
}

impl SearchState {
    /// Resolve the active field in the order the results panel checks them:
    /// loading first, then error, then data.
    pub fn phase(&self) -> SearchPhase {
        if self.loading {
            SearchPhase::Loading
        } else if self.error.is_some() {
            SearchPhase::Failed
        } else if self.data.is_some() {
            SearchPhase::Loaded
        } else {
            SearchPhase::Idle
        }
    }

    pub(crate) fn begin(&mut self, query: String) {
        self.query = query;
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn complete(&mut self, response: SearchResponse) {
        self.data = Some(response);
        self.loading = false;
    }

    pub(crate) fn fail(&mut self) {
        self.error = Some(ErrorInfo::generic());
        self.loading = false;
    }
}
