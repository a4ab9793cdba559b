//! Shared state behind [`ConnectionManager`](crate::ConnectionManager).
//!
//! Owns both slots and the registered platform collaborators. Listener sinks
//! reach back into this state through a weak reference so the provider never
//! keeps a dropped manager alive.

use futures::channel::mpsc::{self, UnboundedReceiver};
use log::{debug, info, warn};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::api::builders::NetworkRequest;
use crate::api::models::{
    CapabilityError, ConflictVerdict, ConnectivityError, LinkChange, LinkKind, NetworkHandle,
    PlatformCapabilities,
};
use crate::core::classifier::{compare_links, is_network_valid};
use crate::core::dispatcher::Notifier;
use crate::core::slot::{ConnectionSlot, RequestId, RequestObserver};
use crate::platform::{ConnectivityProvider, EventSink, NetworkEvent, WifiHardware};

pub(crate) struct ManagerState {
    pub(crate) capabilities: PlatformCapabilities,
    provider: RwLock<Option<Arc<dyn ConnectivityProvider>>>,
    hardware: RwLock<Option<Arc<dyn WifiHardware>>>,
    default: ConnectionSlot,
    selected: ConnectionSlot,
    pub(crate) notifier: Notifier,
}

impl ManagerState {
    pub(crate) fn new(capabilities: PlatformCapabilities, notifier: Notifier) -> Self {
        Self {
            capabilities,
            provider: RwLock::new(None),
            hardware: RwLock::new(None),
            default: ConnectionSlot::new(LinkKind::Default),
            selected: ConnectionSlot::new(LinkKind::Selected),
            notifier,
        }
    }

    pub(crate) fn slot(&self, kind: LinkKind) -> &ConnectionSlot {
        match kind {
            LinkKind::Default => &self.default,
            LinkKind::Selected => &self.selected,
        }
    }

    pub(crate) fn provider(&self) -> Option<Arc<dyn ConnectivityProvider>> {
        self.provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_provider(&self, provider: Arc<dyn ConnectivityProvider>) {
        *self.provider.write().unwrap_or_else(PoisonError::into_inner) = Some(provider);
        debug!("Connectivity provider registered");
    }

    pub(crate) fn hardware(&self) -> Option<Arc<dyn WifiHardware>> {
        self.hardware
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_hardware(&self, hardware: Arc<dyn WifiHardware>) {
        *self.hardware.write().unwrap_or_else(PoisonError::into_inner) = Some(hardware);
        debug!("Wi-Fi hardware probe registered");
    }

    /// Returns whether `handle` passes the validity gate right now.
    pub(crate) fn is_valid(&self, handle: Option<NetworkHandle>) -> bool {
        let provider = self.provider();
        is_network_valid(provider.as_deref(), handle)
    }

    /// Subscribes to handle writes on both slots.
    pub(crate) fn watch(&self) -> UnboundedReceiver<LinkChange> {
        let (tx, rx) = mpsc::unbounded();
        self.default.subscribe(tx.clone());
        self.selected.subscribe(tx);
        rx
    }

    /// Builds the sink handed to the provider for request `id`.
    fn sink_for(self: &Arc<Self>, kind: LinkKind, id: RequestId) -> EventSink {
        let weak: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |event: NetworkEvent| {
            if let Some(state) = weak.upgrade() {
                state.route(kind, id, event);
            } else {
                debug!("Manager dropped, ignoring {kind} event {event:?}");
            }
        })
    }

    /// Replaces the request feeding `kind`.
    ///
    /// The previous listener is unregistered before the new one is
    /// registered. A provider failure is reported as
    /// [`CapabilityError::RegistrationFailed`] and leaves the slot idle.
    pub(crate) fn issue(
        self: &Arc<Self>,
        kind: LinkKind,
        request: NetworkRequest,
        observer: Option<RequestObserver>,
    ) -> Result<(), CapabilityError> {
        let provider = self.provider().ok_or(CapabilityError::NoProvider)?;
        let slot = self.slot(kind);
        let _guard = slot.lock_requests();

        let id = RequestId::new();
        if let Some(previous) = slot.begin_request(id, observer) {
            debug!("Unregistering previous {kind} listener {previous:?}");
            provider.unregister_listener(previous);
        }

        debug!("Registering {kind} request {id}: {request:?}");
        match provider.register_listener(&request, self.sink_for(kind, id)) {
            Ok(token) => {
                if slot.attach_subscription(id, token) {
                    info!("{kind} request {id} registered");
                } else {
                    debug!("{kind} request {id} ended during registration, releasing {token:?}");
                    provider.unregister_listener(token);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Failed to register {kind} request: {e}");
                slot.abort_request(id);
                Err(CapabilityError::RegistrationFailed(e))
            }
        }
    }

    /// Ends the request feeding `kind`. No notification fires.
    pub(crate) fn cancel(&self, kind: LinkKind, clear_handle: bool) {
        let slot = self.slot(kind);
        let _guard = slot.lock_requests();
        if let Some(token) = slot.cancel_request(clear_handle) {
            debug!("Canceled {kind} listener {token:?}");
            if let Some(provider) = self.provider() {
                provider.unregister_listener(token);
            }
        }
    }

    /// Withdraws the listener of request `id` after its flow failed.
    ///
    /// Safe to call from event handling, including from inside a provider's
    /// `register_listener`: it never takes the `requests` guard.
    pub(crate) fn release_failed(&self, kind: LinkKind, id: RequestId) {
        let Some(token) = self.slot(kind).release_failed(id) else {
            return;
        };
        debug!("{kind} request {id} failed, withdrawing listener {token:?}");
        if let Some(provider) = self.provider() {
            provider.unregister_listener(token);
        }
    }

    /// Compares both slots if both pass the validity gate.
    pub(crate) fn check_conflict(&self) -> ConflictVerdict {
        let Some(provider) = self.provider() else {
            return ConflictVerdict::NoConflict;
        };
        let default = self.default.get();
        let selected = self.selected.get();

        match (default, selected) {
            (Some(d), Some(s))
                if is_network_valid(Some(provider.as_ref()), Some(d))
                    && is_network_valid(Some(provider.as_ref()), Some(s)) =>
            {
                compare_links(provider.as_ref(), d, s)
            }
            _ => ConflictVerdict::NoConflict,
        }
    }

    /// Selected first, then default.
    pub(crate) fn best_handle(&self) -> Result<NetworkHandle, ConnectivityError> {
        let provider = self.provider();
        for kind in [LinkKind::Selected, LinkKind::Default] {
            if let Some(handle) = self.slot(kind).get()
                && is_network_valid(provider.as_deref(), Some(handle))
            {
                debug!("Returning {kind} network {handle}");
                return Ok(handle);
            }
        }
        debug!("Wi-Fi network not available");
        Err(ConnectivityError::NotAvailable)
    }
}

impl Drop for ManagerState {
    fn drop(&mut self) {
        let Some(provider) = self.provider() else {
            return;
        };
        for kind in [LinkKind::Default, LinkKind::Selected] {
            if let Some(token) = self.slot(kind).cancel_request(false) {
                debug!("Releasing {kind} listener {token:?}");
                provider.unregister_listener(token);
            }
        }
    }
}
