//! State events published by the query controller

/// Events emitted after the search state changed.
///
/// `generation` identifies the request that caused the change; it is
/// strictly increasing across `submit_query` calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// A query was submitted: `query` set, `loading` on, `error` cleared
    QueryStarted { generation: u64, query: String },

    /// Results committed to `data`, `loading` off
    ResultsLoaded {
        generation: u64,
        displayed: usize,
        total: usize,
    },

    /// Transport failure committed to `error`, `loading` off
    QueryFailed { generation: u64 },
}

impl StateEvent {
    pub fn generation(&self) -> u64 {
        match self {
            StateEvent::QueryStarted { generation, .. }
            | StateEvent::ResultsLoaded { generation, .. }
            | StateEvent::QueryFailed { generation } => *generation,
        }
    }
}
