//! Query lifecycle: wire types, state, errors and the controller

pub mod controller;
pub mod error;
pub mod state;
pub mod types;

pub use controller::{ControllerOptions, QueryController, QueryOutcome};
pub use error::SearchError;
pub use state::{ErrorInfo, SearchPhase, SearchState};
pub use types::{SearchResponse, SearchResultItem};
