//! Translation of platform callbacks into slot transitions and notifications.
//!
//! Every event passes through [`ManagerState::route`]. The slot is updated
//! first, under its own lock, which also reaches watchers; notifications and
//! observers are invoked afterwards with no lock held.

use log::{debug, info, warn};

use crate::api::models::{
    ConflictVerdict, LinkKind, LinkProperties, NetworkCapabilities, NetworkHandle, Notification,
    Transports,
};
use crate::core::manager::ManagerState;
use crate::core::slot::{Arrival, Departure, RequestEvent, RequestId};
use crate::platform::NetworkEvent;
use crate::util::utils::address_candidates;

impl ManagerState {
    /// Applies one platform event delivered for request `id` of `kind`.
    pub(crate) fn route(&self, kind: LinkKind, id: RequestId, event: NetworkEvent) {
        match event {
            NetworkEvent::Available(handle) => self.on_available(kind, id, handle),
            NetworkEvent::Lost(handle) => self.on_lost(kind, id, handle),
            NetworkEvent::Unavailable => self.on_unavailable(kind, id),
            NetworkEvent::CapabilitiesChanged(handle, caps) => {
                self.on_capabilities_changed(kind, id, handle, &caps)
            }
            NetworkEvent::LinkPropertiesChanged(handle, link) => {
                self.on_link_properties_changed(kind, id, handle, &link)
            }
        }
    }

    fn on_available(&self, kind: LinkKind, id: RequestId, handle: NetworkHandle) {
        let observer = match self.slot(kind).on_available(id, handle) {
            Arrival::Stale => {
                debug!("Ignoring stale {kind} available event for {handle}");
                return;
            }
            Arrival::Repeated => {
                debug!("{kind} network {handle} reported available again");
                return;
            }
            Arrival::Fresh(observer) => observer,
        };

        info!("{kind} network available: {handle}");

        match kind {
            LinkKind::Default => self.notifier.notify(Notification::Available),
            LinkKind::Selected => self.notifier.notify(Notification::SelectionAvailable),
        }
        if let Some(observer) = observer {
            observer(RequestEvent::Available(handle));
        }

        if kind == LinkKind::Selected {
            self.recheck_conflict();
            if let Some(link) = self.provider().and_then(|p| p.query_link_properties(handle)) {
                self.announce_candidates(&link);
            }
        }
    }

    fn on_lost(&self, kind: LinkKind, id: RequestId, handle: NetworkHandle) {
        match self.slot(kind).on_lost(id, handle) {
            Departure::Stale => {
                debug!("Ignoring stale {kind} lost event for {handle}");
            }
            Departure::Cleared(observer) => {
                warn!("Lost {kind} network {handle}");
                if let Some(observer) = observer {
                    observer(RequestEvent::Lost(handle));
                    self.release_failed(kind, id);
                }
            }
        }
    }

    fn on_unavailable(&self, kind: LinkKind, id: RequestId) {
        let observer = match self.slot(kind).on_unavailable(id) {
            Departure::Stale => {
                debug!("Ignoring stale {kind} unavailable event");
                return;
            }
            Departure::Cleared(observer) => observer,
        };

        match kind {
            LinkKind::Default => warn!("Default network unavailable"),
            LinkKind::Selected => {
                info!("Network unavailable, not selected by user");
                self.notifier.notify(Notification::SelectionCanceled);
            }
        }
        if let Some(observer) = observer {
            observer(RequestEvent::Unavailable);
            self.release_failed(kind, id);
        }
    }

    fn on_capabilities_changed(
        &self,
        kind: LinkKind,
        id: RequestId,
        handle: NetworkHandle,
        caps: &NetworkCapabilities,
    ) {
        debug!("{kind} capabilities changed for {handle}");
        if kind != LinkKind::Default || !caps.has_transport(Transports::WIFI) {
            return;
        }
        if self.slot(kind).refresh(id, handle) {
            debug!("Default network moved to {handle}");
        }
    }

    fn on_link_properties_changed(
        &self,
        kind: LinkKind,
        id: RequestId,
        handle: NetworkHandle,
        link: &LinkProperties,
    ) {
        if kind == LinkKind::Selected && self.slot(kind).holds(id, handle) {
            self.announce_candidates(link);
        } else {
            debug!("Ignoring {kind} link properties for {handle}");
        }
    }

    fn recheck_conflict(&self) {
        match self.check_conflict() {
            ConflictVerdict::Conflicting => {
                warn!("Default and selected networks share a band");
                self.notifier.notify(Notification::ConflictDetected);
            }
            ConflictVerdict::Indeterminate(reason) => {
                warn!("Could not check for band conflicts: {reason}");
            }
            ConflictVerdict::NoConflict => debug!("No band conflict"),
        }
    }

    fn announce_candidates(&self, link: &LinkProperties) {
        let candidates = address_candidates(link);
        self.notifier
            .notify(Notification::AddressCandidates(candidates));
    }
}
