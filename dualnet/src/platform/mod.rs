//! Boundary to the platform's connectivity service.
//!
//! The manager never talks to the operating system directly. Whoever embeds
//! it implements [`ConnectivityProvider`] (listener registration and live
//! queries) and optionally [`WifiHardware`] (radio capability probes), and
//! forwards platform callbacks as [`NetworkEvent`]s into the sink handed out
//! at registration time.

use std::sync::Arc;

use crate::api::builders::NetworkRequest;
use crate::api::models::{LinkProperties, NetworkCapabilities, NetworkHandle, ProviderError};

/// Identifies one registered platform listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Platform callback for one request, as a single tagged value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// A network satisfying the request is attached.
    Available(NetworkHandle),
    /// A previously available network went away.
    Lost(NetworkHandle),
    /// The platform will not satisfy the request (declined, picker dismissed).
    Unavailable,
    /// The capability record of a network changed.
    CapabilitiesChanged(NetworkHandle, NetworkCapabilities),
    /// The addressing of a network changed.
    LinkPropertiesChanged(NetworkHandle, LinkProperties),
}

/// Receives the events of one registered request.
///
/// May be invoked from any thread. Sinks stay callable after the request was
/// replaced; such late events are recognised and dropped by the manager.
pub type EventSink = Arc<dyn Fn(NetworkEvent) + Send + Sync>;

/// The platform's connectivity service.
///
/// Implementations must not hold internal locks while invoking an
/// [`EventSink`]: the manager queries the provider from inside event
/// handling.
pub trait ConnectivityProvider: Send + Sync {
    /// Files `request` with the platform. Events for it go to `sink` until
    /// [`unregister_listener`](Self::unregister_listener) is called.
    fn register_listener(
        &self,
        request: &NetworkRequest,
        sink: EventSink,
    ) -> Result<SubscriptionToken, ProviderError>;

    /// Withdraws a listener. Unknown tokens are ignored.
    fn unregister_listener(&self, token: SubscriptionToken);

    /// Live capability record, `None` when the platform no longer knows
    /// the handle.
    fn query_capabilities(&self, handle: NetworkHandle) -> Option<NetworkCapabilities>;

    /// Live availability flag, `None` when the platform has no record.
    fn query_availability(&self, handle: NetworkHandle) -> Option<bool>;

    /// Live addressing information, if the platform exposes it.
    fn query_link_properties(&self, _handle: NetworkHandle) -> Option<LinkProperties> {
        None
    }
}

/// Radio-level probes. No events exist for these, so they are always
/// queried live.
pub trait WifiHardware: Send + Sync {
    /// Whether the radio can run two station links for local-only traffic.
    fn sta_concurrency_supported(&self) -> bool;

    /// Whether the device is currently acting as an access point.
    fn is_ap_enabled(&self) -> Result<bool, ProviderError>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory provider for unit tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::api::models::WifiInfo;

    #[derive(Default)]
    struct State {
        next_token: u64,
        listeners: HashMap<SubscriptionToken, EventSink>,
        networks: HashMap<NetworkHandle, (bool, Option<NetworkCapabilities>)>,
        fail_register: Option<ProviderError>,
    }

    #[derive(Default)]
    pub(crate) struct FakeProvider {
        state: Mutex<State>,
    }

    impl FakeProvider {
        pub(crate) fn add_wifi(&self, handle: NetworkHandle, frequency_mhz: u32) {
            let caps = NetworkCapabilities::wifi(WifiInfo {
                bssid: Some(format!("02:00:00:00:00:{:02x}", handle.raw() & 0xff)),
                frequency_mhz,
                ..Default::default()
            });
            self.add(handle, true, Some(caps));
        }

        pub(crate) fn add(
            &self,
            handle: NetworkHandle,
            available: bool,
            caps: Option<NetworkCapabilities>,
        ) {
            let mut s = self.state.lock().unwrap();
            s.networks.insert(handle, (available, caps));
        }

        pub(crate) fn remove(&self, handle: NetworkHandle) {
            self.state.lock().unwrap().networks.remove(&handle);
        }

        pub(crate) fn fail_next_register(&self, err: ProviderError) {
            self.state.lock().unwrap().fail_register = Some(err);
        }

        pub(crate) fn listener_count(&self) -> usize {
            self.state.lock().unwrap().listeners.len()
        }

        /// Sends `event` to every live listener.
        pub(crate) fn emit(&self, event: NetworkEvent) {
            let sinks: Vec<EventSink> = self
                .state
                .lock()
                .unwrap()
                .listeners
                .values()
                .cloned()
                .collect();
            for sink in sinks {
                sink(event.clone());
            }
        }
    }

    impl ConnectivityProvider for FakeProvider {
        fn register_listener(
            &self,
            _request: &NetworkRequest,
            sink: EventSink,
        ) -> Result<SubscriptionToken, ProviderError> {
            let mut s = self.state.lock().unwrap();
            if let Some(err) = s.fail_register.take() {
                return Err(err);
            }
            s.next_token += 1;
            let token = SubscriptionToken::new(s.next_token);
            s.listeners.insert(token, sink);
            Ok(token)
        }

        fn unregister_listener(&self, token: SubscriptionToken) {
            self.state.lock().unwrap().listeners.remove(&token);
        }

        fn query_capabilities(&self, handle: NetworkHandle) -> Option<NetworkCapabilities> {
            let s = self.state.lock().unwrap();
            s.networks.get(&handle).and_then(|(_, caps)| caps.clone())
        }

        fn query_availability(&self, handle: NetworkHandle) -> Option<bool> {
            let s = self.state.lock().unwrap();
            s.networks.get(&handle).map(|(available, _)| *available)
        }
    }
}
