//! State dispatcher for pub-sub pattern

use crate::search::state::SearchState;
use crate::state::events::StateEvent;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, info};

/// Trait for components that subscribe to search state changes.
///
/// `state` is a snapshot taken when the event was raised. Subscribers may
/// submit queries; events raised while notifying are delivered after the
/// current round ends.
pub trait StateSubscriber {
    /// Handle a state event
    fn on_state_event(&mut self, event: &StateEvent, state: &SearchState);

    /// Get subscriber name for debugging
    fn name(&self) -> &str;
}

/// Dispatches state events to subscribers and keeps a short history
pub struct StateDispatcher {
    /// List of subscribers
    subscribers: Vec<Box<dyn StateSubscriber>>,

    /// Event history for debugging
    event_history: Vec<StateEvent>,

    /// Maximum event history size
    max_history: usize,
}

impl Default for StateDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl StateDispatcher {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            event_history: Vec::new(),
            max_history: 100,
        }
    }

    /// Add a subscriber
    pub fn subscribe(&mut self, subscriber: Box<dyn StateSubscriber>) {
        info!(target: "state", "Adding subscriber: {}", subscriber.name());
        self.subscribers.push(subscriber);
    }

    /// Record the event and notify every subscriber
    pub fn dispatch(&mut self, event: StateEvent, state: &SearchState) {
        self.record(&event);
        Self::notify(&mut self.subscribers, &event, state);
    }

    /// Append to the bounded history
    pub fn record(&mut self, event: &StateEvent) {
        debug!(target: "state", "Dispatching event: {:?}", event);

        self.event_history.push(event.clone());
        if self.event_history.len() > self.max_history {
            self.event_history.remove(0);
        }
    }

    /// Move the subscribers out so they can be notified without holding
    /// a borrow of the dispatcher
    pub fn take_subscribers(&mut self) -> Vec<Box<dyn StateSubscriber>> {
        std::mem::take(&mut self.subscribers)
    }

    /// Put subscribers back after `take_subscribers`, keeping any that
    /// subscribed in between
    pub fn restore_subscribers(&mut self, subscribers: Vec<Box<dyn StateSubscriber>>) {
        let added = std::mem::replace(&mut self.subscribers, subscribers);
        self.subscribers.extend(added);
    }

    pub fn notify(
        subscribers: &mut [Box<dyn StateSubscriber>],
        event: &StateEvent,
        state: &SearchState,
    ) {
        for subscriber in subscribers.iter_mut() {
            debug!(target: "state", "Notifying subscriber: {}", subscriber.name());
            subscriber.on_state_event(event, state);
        }
    }

    /// Get event history for debugging
    pub fn get_event_history(&self) -> &[StateEvent] {
        &self.event_history
    }
}

/// Subscriber that raises a shared flag whenever the state changes.
///
/// The render loop owns the other end of the flag and redraws when it
/// finds it set.
pub struct RedrawSubscriber {
    dirty: Rc<Cell<bool>>,
}

impl RedrawSubscriber {
    pub fn new() -> (Self, Rc<Cell<bool>>) {
        let dirty = Rc::new(Cell::new(false));
        (
            Self {
                dirty: Rc::clone(&dirty),
            },
            dirty,
        )
    }
}

impl StateSubscriber for RedrawSubscriber {
    fn on_state_event(&mut self, _event: &StateEvent, _state: &SearchState) {
        self.dirty.set(true);
    }

    fn name(&self) -> &str {
        "RedrawSubscriber"
    }
}
