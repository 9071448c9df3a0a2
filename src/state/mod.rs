//! Publish-on-change notification for the search state
//!
//! The query controller owns the state; render layers subscribe here
//! instead of depending on a reactivity runtime.

pub mod dispatcher;
pub mod events;

pub use dispatcher::{RedrawSubscriber, StateDispatcher, StateSubscriber};
pub use events::StateEvent;
