//! Query controller: owns the search state and enforces last-request-wins.
//!
//! Each `submit_query` call bumps a generation counter and aborts the
//! previous request's [`AbortHandle`] before anything else happens. The
//! completion path commits only if its generation is still current, so a
//! superseded response can never overwrite newer state, whatever order the
//! network delivers them in.

use crate::api_client::SearchTransport;
use crate::search::error::SearchError;
use crate::search::state::SearchState;
use crate::state::{StateDispatcher, StateEvent, StateSubscriber};
use futures_util::future::{AbortHandle, Abortable, Aborted};
use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables for the controller
#[derive(Debug, Clone, Default)]
pub struct ControllerOptions {
    /// Give up on a request after this long. `None` waits forever.
    pub request_timeout: Option<Duration>,
}

/// How a submitted query ended, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Results committed to the state
    Loaded { displayed: usize, total: usize },
    /// A newer query replaced this one; the state was left untouched
    Superseded,
}

/// Cancellation handle for the one request allowed in flight
struct PendingRequest {
    generation: u64,
    abort: AbortHandle,
}

struct ControllerInner {
    state: RefCell<SearchState>,
    dispatcher: RefCell<StateDispatcher>,
    transport: Rc<dyn SearchTransport>,
    generation: Cell<u64>,
    pending: RefCell<Option<PendingRequest>>,
    /// Events raised but not yet delivered, with the state they produced
    queued: RefCell<VecDeque<(StateEvent, SearchState)>>,
    notifying: Cell<bool>,
    options: ControllerOptions,
}

impl ControllerInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.get() == generation
    }

    /// Apply a mutation and publish the matching event.
    ///
    /// No borrow is held while subscribers run, so a subscriber may call
    /// back into the controller. Events raised during notification are
    /// queued and delivered in order once the current one finishes.
    fn update(&self, event: StateEvent, mutate: impl FnOnce(&mut SearchState)) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            mutate(&mut state);
            state.clone()
        };
        self.queued.borrow_mut().push_back((event, snapshot));
        if self.notifying.replace(true) {
            return;
        }

        loop {
            let next = self.queued.borrow_mut().pop_front();
            let Some((event, state)) = next else {
                break;
            };
            let mut subscribers = {
                let mut dispatcher = self.dispatcher.borrow_mut();
                dispatcher.record(&event);
                dispatcher.take_subscribers()
            };
            StateDispatcher::notify(&mut subscribers, &event, &state);
            self.dispatcher.borrow_mut().restore_subscribers(subscribers);
        }
        self.notifying.set(false);
    }

    fn clear_pending(&self, generation: u64) {
        let mut pending = self.pending.borrow_mut();
        if pending.as_ref().map(|p| p.generation) == Some(generation) {
            *pending = None;
        }
    }

    fn abort_pending(&self) -> Option<u64> {
        let pending = self.pending.borrow_mut().take()?;
        pending.abort.abort();
        Some(pending.generation)
    }
}

/// Owns query text and search results; issues and cancels requests.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct QueryController {
    inner: Rc<ControllerInner>,
}

impl QueryController {
    pub fn new(transport: Rc<dyn SearchTransport>, options: ControllerOptions) -> Self {
        Self {
            inner: Rc::new(ControllerInner {
                state: RefCell::new(SearchState::default()),
                dispatcher: RefCell::new(StateDispatcher::new()),
                transport,
                generation: Cell::new(0),
                pending: RefCell::new(None),
                queued: RefCell::new(VecDeque::new()),
                notifying: Cell::new(false),
                options,
            }),
        }
    }

    /// Current state, for render reads
    pub fn state(&self) -> Ref<'_, SearchState> {
        self.inner.state.borrow()
    }

    pub fn subscribe(&self, subscriber: Box<dyn StateSubscriber>) {
        self.inner.dispatcher.borrow_mut().subscribe(subscriber);
    }

    /// Events published so far (bounded)
    pub fn event_history(&self) -> Vec<StateEvent> {
        self.inner.dispatcher.borrow().get_event_history().to_vec()
    }

    /// Generation of the most recently submitted query
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    pub fn has_pending_request(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }

    /// Submit a query.
    ///
    /// The previous request is cancelled and `query`/`loading`/`error` are
    /// updated before this returns; the returned future performs the
    /// request and commits its result. Superseded requests resolve to
    /// `Ok(QueryOutcome::Superseded)` without touching the state. Transport
    /// failures set the generic error and are returned for logging.
    pub fn submit_query(
        &self,
        query: impl Into<String>,
    ) -> impl Future<Output = Result<QueryOutcome, SearchError>> + 'static {
        let query = query.into();
        let inner = Rc::clone(&self.inner);

        if let Some(previous) = inner.abort_pending() {
            debug!(target: "search", "Cancelled request #{}", previous);
        }

        let generation = inner.generation.get() + 1;
        inner.generation.set(generation);

        let (abort, registration) = AbortHandle::new_pair();
        *inner.pending.borrow_mut() = Some(PendingRequest { generation, abort });

        info!(target: "search", "Request #{} for {:?}", generation, query);
        inner.update(
            StateEvent::QueryStarted {
                generation,
                query: query.clone(),
            },
            |state| state.begin(query.clone()),
        );

        async move {
            let transport = Rc::clone(&inner.transport);
            let request = Abortable::new(
                async move { transport.search(&query).await },
                registration,
            );

            let result = match inner.options.request_timeout {
                Some(limit) => match tokio::time::timeout(limit, request).await {
                    Ok(result) => result,
                    // Dropping `request` here aborts the transport future
                    Err(_) => Ok(Err(SearchError::Timeout(limit))),
                },
                None => request.await,
            };

            let result = match result {
                Ok(result) => result,
                Err(Aborted) => {
                    debug!(target: "search", "Request #{} superseded", generation);
                    return Ok(QueryOutcome::Superseded);
                }
            };

            if !inner.is_current(generation) {
                debug!(
                    target: "search",
                    "Discarding late response for request #{} (current #{})",
                    generation,
                    inner.generation.get()
                );
                return Ok(QueryOutcome::Superseded);
            }
            inner.clear_pending(generation);

            match result {
                Ok(response) => {
                    let displayed = response.displayed();
                    let total = response.total;
                    info!(
                        target: "search",
                        "Request #{} loaded {} of {} results",
                        generation,
                        displayed,
                        total
                    );
                    inner.update(
                        StateEvent::ResultsLoaded {
                            generation,
                            displayed,
                            total,
                        },
                        |state| state.complete(response),
                    );
                    Ok(QueryOutcome::Loaded { displayed, total })
                }
                Err(err) if err.is_cancelled() => Ok(QueryOutcome::Superseded),
                Err(err) => {
                    warn!(
                        target: "search",
                        "Request #{} failed ({}): {}",
                        generation,
                        err.kind(),
                        err
                    );
                    inner.update(StateEvent::QueryFailed { generation }, |state| state.fail());
                    Err(err)
                }
            }
        }
    }

    /// Abort the in-flight request, if any, without changing the state
    pub fn cancel_pending(&self) {
        if let Some(generation) = self.inner.abort_pending() {
            debug!(target: "search", "Cancelled request #{} on teardown", generation);
        }
    }
}
