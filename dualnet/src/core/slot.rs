//! One managed link: its handle, its platform subscription and the state of
//! the request feeding it.
//!
//! Two locks are involved. `state` guards the slot contents and is only held
//! for short, non-reentrant critical sections, since events arrive on the
//! platform's callback context. `requests` serializes request replacement so
//! the old listener is gone before the new one is registered; it is held
//! across provider calls but never taken by event handling.
//!
//! Watchers are told about every handle write before `state` is released,
//! so they see writes to one slot in the order they were applied.

use futures::channel::mpsc::UnboundedSender;
use log::debug;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::api::models::{LinkChange, LinkKind, NetworkHandle, RequestState};
use crate::platform::SubscriptionToken;

/// Identity of one issued request. Events carry it back so a replaced
/// request's late callbacks can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RequestId(Uuid);

impl RequestId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-request progress as seen by a request's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestEvent {
    Available(NetworkHandle),
    Unavailable,
    Lost(NetworkHandle),
}

/// Callback bound to a single request; dropped with it on replacement.
///
/// A request with an observer is a one-shot flow: a loss or an unavailable
/// report ends it and its listener is withdrawn.
pub(crate) type RequestObserver = Arc<dyn Fn(RequestEvent) + Send + Sync>;

#[derive(Default)]
struct SlotState {
    handle: Option<NetworkHandle>,
    subscription: Option<SubscriptionToken>,
    request: Option<RequestId>,
    state: RequestState,
    observer: Option<RequestObserver>,
}

/// Result of applying an available event.
pub(crate) enum Arrival {
    /// The event belongs to a replaced request, or the request already ended.
    Stale,
    /// Same handle reported again while already available.
    Repeated,
    /// The slot transitioned into `Available`.
    Fresh(Option<RequestObserver>),
}

/// Result of applying a lost or unavailable event.
pub(crate) enum Departure {
    Stale,
    /// The slot was cleared.
    Cleared(Option<RequestObserver>),
}

pub(crate) struct ConnectionSlot {
    kind: LinkKind,
    state: Mutex<SlotState>,
    requests: Mutex<()>,
    watchers: Mutex<Vec<UnboundedSender<LinkChange>>>,
}

impl ConnectionSlot {
    pub(crate) fn new(kind: LinkKind) -> Self {
        Self {
            kind,
            state: Mutex::new(SlotState::default()),
            requests: Mutex::new(()),
            watchers: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a watcher for handle writes to this slot.
    pub(crate) fn subscribe(&self, tx: UnboundedSender<LinkChange>) {
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
    }

    /// Tells watchers that the slot now holds `handle`.
    ///
    /// Callers hold the `state` guard so writes reach watchers in order.
    fn announce(&self, handle: Option<NetworkHandle>) {
        let change = LinkChange {
            kind: self.kind,
            handle,
        };
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.unbounded_send(change).is_ok());
    }

    /// Serializes request replacement for this slot.
    pub(crate) fn lock_requests(&self) -> MutexGuard<'_, ()> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `handle` as current. Does not touch the subscription.
    pub(crate) fn set(&self, handle: Option<NetworkHandle>) {
        let mut s = self.lock();
        s.handle = handle;
        self.announce(handle);
        drop(s);
        debug!(
            "{} slot set to {}",
            self.kind,
            handle.map_or_else(|| "none".to_string(), |h| h.to_string())
        );
    }

    /// Clears the slot only if it still holds `handle`.
    ///
    /// Returns `true` when the slot was cleared. A `None` handle is a no-op.
    pub(crate) fn clear_if_matches(&self, handle: Option<NetworkHandle>) -> bool {
        let Some(handle) = handle else {
            return false;
        };
        let mut s = self.lock();
        if s.handle == Some(handle) {
            s.handle = None;
            self.announce(None);
            drop(s);
            debug!("{} slot cleared, matched {handle}", self.kind);
            true
        } else {
            debug!(
                "{} slot kept, {handle} does not match stored handle",
                self.kind
            );
            false
        }
    }

    /// Returns the stored handle unfiltered.
    pub(crate) fn get(&self) -> Option<NetworkHandle> {
        self.lock().handle
    }

    pub(crate) fn request_state(&self) -> RequestState {
        self.lock().state
    }

    /// Installs a new request and returns the subscription it supersedes.
    ///
    /// From here on, events for the previous request are stale.
    pub(crate) fn begin_request(
        &self,
        id: RequestId,
        observer: Option<RequestObserver>,
    ) -> Option<SubscriptionToken> {
        let mut s = self.lock();
        s.request = Some(id);
        s.state = RequestState::Requesting;
        s.observer = observer;
        s.subscription.take()
    }

    /// Records the platform token of request `id`.
    ///
    /// Returns `false` when `id` is no longer the current request, in which
    /// case the caller owns the token and must unregister it.
    pub(crate) fn attach_subscription(&self, id: RequestId, token: SubscriptionToken) -> bool {
        let mut s = self.lock();
        if s.request != Some(id) {
            return false;
        }
        s.subscription = Some(token);
        true
    }

    /// Rolls back a request whose registration failed.
    pub(crate) fn abort_request(&self, id: RequestId) {
        let mut s = self.lock();
        if s.request == Some(id) {
            s.request = None;
            s.state = RequestState::Idle;
            s.observer = None;
        }
    }

    /// Ends the current request without notification.
    ///
    /// Returns the subscription to unregister. Idempotent.
    pub(crate) fn cancel_request(&self, clear_handle: bool) -> Option<SubscriptionToken> {
        let mut s = self.lock();
        s.request = None;
        s.state = RequestState::Idle;
        s.observer = None;
        if clear_handle && s.handle.take().is_some() {
            self.announce(None);
        }
        s.subscription.take()
    }

    /// Ends request `id` after its flow failed, keeping the stored handle.
    ///
    /// Returns the subscription to unregister, or `None` if `id` was already
    /// replaced or canceled. Needs no `requests` guard: a concurrent
    /// replacement either sees the subscription gone or makes `id` stale.
    pub(crate) fn release_failed(&self, id: RequestId) -> Option<SubscriptionToken> {
        let mut s = self.lock();
        if s.request != Some(id) {
            return None;
        }
        s.request = None;
        s.observer = None;
        if s.state == RequestState::Available {
            s.state = RequestState::Idle;
        }
        s.subscription.take()
    }

    pub(crate) fn subscription(&self) -> Option<SubscriptionToken> {
        self.lock().subscription
    }

    /// Applies an available event for request `id`.
    pub(crate) fn on_available(&self, id: RequestId, handle: NetworkHandle) -> Arrival {
        let mut s = self.lock();
        if s.request != Some(id) || s.state == RequestState::Unavailable {
            return Arrival::Stale;
        }
        let repeated = s.state == RequestState::Available && s.handle == Some(handle);
        s.handle = Some(handle);
        s.state = RequestState::Available;
        if repeated {
            Arrival::Repeated
        } else {
            self.announce(Some(handle));
            Arrival::Fresh(s.observer.clone())
        }
    }

    /// Applies a lost event for request `id`. Only clears a matching handle.
    pub(crate) fn on_lost(&self, id: RequestId, handle: NetworkHandle) -> Departure {
        let mut s = self.lock();
        if s.request != Some(id) || s.handle != Some(handle) {
            return Departure::Stale;
        }
        s.handle = None;
        s.state = RequestState::Idle;
        self.announce(None);
        Departure::Cleared(s.observer.clone())
    }

    /// Applies an unavailable event for request `id`. Terminal for the request.
    pub(crate) fn on_unavailable(&self, id: RequestId) -> Departure {
        let mut s = self.lock();
        if s.request != Some(id) || s.state == RequestState::Unavailable {
            return Departure::Stale;
        }
        s.handle = None;
        s.state = RequestState::Unavailable;
        self.announce(None);
        Departure::Cleared(s.observer.clone())
    }

    /// Moves an available request to `handle` without a state change.
    ///
    /// Returns `true` only if the stored handle changed; `false` for stale
    /// requests, requests that are not available, or the same handle.
    pub(crate) fn refresh(&self, id: RequestId, handle: NetworkHandle) -> bool {
        let mut s = self.lock();
        if s.request != Some(id)
            || s.state != RequestState::Available
            || s.handle == Some(handle)
        {
            return false;
        }
        s.handle = Some(handle);
        self.announce(Some(handle));
        true
    }

    /// Returns whether `id` is current and the slot holds `handle`.
    pub(crate) fn holds(&self, id: RequestId, handle: NetworkHandle) -> bool {
        let s = self.lock();
        s.request == Some(id) && s.handle == Some(handle)
    }
}
