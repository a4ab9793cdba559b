use futures::channel::mpsc::UnboundedReceiver;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::Result;
use crate::api::builders::{Credential, IdentityPattern, NetworkRequest, WifiSpecifier};
use crate::api::models::{
    BandBucket, CapabilityError, ConflictVerdict, ConnectivityError, LinkChange, LinkKind,
    LookupError, NetCapabilities, NetworkHandle, Notification, PlatformCapabilities, RequestState,
    Transports,
};
use crate::core::classifier::band_bucket;
use crate::core::dispatcher::{Dispatch, Inline, NotificationSink, Notifier};
use crate::core::manager::ManagerState;
use crate::core::slot::RequestObserver;
use crate::core::state_wait::wait_for_best_handle;
use crate::platform::{ConnectivityProvider, WifiHardware};
use crate::try_log;
use crate::types::constants::{codes, timeouts};

/// Arbitrates between a default and a user-selected Wi-Fi link.
///
/// Cheap to clone; clones share the same slots. Platform events can arrive
/// on any thread while callers query from others.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use dualnet::{ConnectionManager, ConnectivityProvider, Notification, PlatformCapabilities};
/// # use dualnet::builders::IdentityPattern;
/// # fn example(provider: Arc<dyn ConnectivityProvider>) -> dualnet::Result<()> {
/// let manager = ConnectionManager::builder()
///     .capabilities(PlatformCapabilities {
///         supports_interactive_selection: true,
///         supports_dual_band_concurrency: false,
///     })
///     .provider(provider)
///     .notifications(|n: Notification| println!("{n:?}"))
///     .build();
///
/// manager.request_default()?;
/// manager.request_selection(IdentityPattern::prefix("FUJIFILM-"), None)?;
///
/// if let Ok(handle) = manager.best_handle() {
///     println!("routing over {handle}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    state: Arc<ManagerState>,
}

impl ConnectionManager {
    /// Creates a manager with inline delivery and no notification sink.
    pub fn new(capabilities: PlatformCapabilities) -> Self {
        Self::builder().capabilities(capabilities).build()
    }

    pub fn builder() -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::default()
    }

    /// Registers the platform connectivity service.
    ///
    /// Until this is called every handle is invalid and requests fail with
    /// [`CapabilityError::NoProvider`].
    pub fn register_provider(&self, provider: Arc<dyn ConnectivityProvider>) {
        self.state.set_provider(provider);
    }

    /// Registers the radio capability probes.
    pub fn register_hardware(&self, hardware: Arc<dyn WifiHardware>) {
        self.state.set_hardware(hardware);
    }

    /// Platform features this manager was built with.
    pub fn capabilities(&self) -> PlatformCapabilities {
        self.state.capabilities
    }

    /// Silences notifications. Slot tracking continues while muted.
    pub fn set_muted(&self, muted: bool) {
        self.state.notifier.set_muted(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.state.notifier.is_muted()
    }

    /// Requests the automatically established Wi-Fi link.
    ///
    /// Attempted on every platform. If the platform refuses to register the
    /// listener, [`Notification::ManualInterventionRequired`] fires once and
    /// the error is returned; nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError::NoProvider` without a registered provider,
    /// or `CapabilityError::ManualInterventionRequired` if registration fails.
    pub fn request_default(&self) -> Result<()> {
        let request = NetworkRequest::builder().transport(Transports::WIFI).build();

        match self.state.issue(LinkKind::Default, request, None) {
            Err(CapabilityError::RegistrationFailed(e)) => {
                warn!("Default network listener refused, user action required: {e}");
                self.state
                    .notifier
                    .notify(Notification::ManualInterventionRequired);
                Err(CapabilityError::ManualInterventionRequired(e))
            }
            other => other,
        }
    }

    /// Starts an interactive selection restricted to `pattern`.
    ///
    /// Any previous selection listener is unregistered first. The request is
    /// scoped to Wi-Fi and drops the internet capability: the link is meant
    /// for talking to a local device.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError::UnsupportedPlatform` when the platform has no
    /// picker (no listener is registered and nothing fires),
    /// `CapabilityError::InvalidCredential` for a malformed passphrase, or
    /// `CapabilityError::RegistrationFailed` if the platform refuses.
    pub fn request_selection(
        &self,
        pattern: IdentityPattern,
        credential: Option<Credential>,
    ) -> Result<()> {
        self.request_selection_observed(pattern, credential, None)
    }

    pub(crate) fn request_selection_observed(
        &self,
        pattern: IdentityPattern,
        credential: Option<Credential>,
        observer: Option<RequestObserver>,
    ) -> Result<()> {
        if !self.state.capabilities.supports_interactive_selection {
            debug!("Interactive selection unsupported, not requesting {pattern:?}");
            return Err(CapabilityError::UnsupportedPlatform);
        }
        if let Some(credential) = &credential {
            credential.validate()?;
        }

        let request = NetworkRequest::builder()
            .transport(Transports::WIFI)
            .remove_capability(NetCapabilities::INTERNET)
            .specifier(WifiSpecifier::new(pattern).with_credential(credential))
            .build();

        self.state.issue(LinkKind::Selected, request, observer)
    }

    /// Withdraws the request feeding `kind`. The stored handle is kept and
    /// still passes through the validity gate on every read.
    pub fn cancel_request(&self, kind: LinkKind) {
        self.state.cancel(kind, false);
    }

    /// Cancels both requests and clears both slots without notifications.
    pub fn reset(&self) {
        self.state.cancel(LinkKind::Default, true);
        self.state.cancel(LinkKind::Selected, true);
    }

    /// Compares the band buckets of the two links.
    ///
    /// Runs automatically when the selected link comes up; may also be
    /// polled. Returns [`ConflictVerdict::NoConflict`] unless both links are
    /// valid.
    pub fn check_conflict(&self) -> ConflictVerdict {
        self.state.check_conflict()
    }

    /// Returns the handle to route over: the selected link if valid, else
    /// the default link if valid.
    ///
    /// # Errors
    ///
    /// Returns `ConnectivityError::NotAvailable` when neither link is valid.
    pub fn best_handle(&self) -> std::result::Result<NetworkHandle, ConnectivityError> {
        self.state.best_handle()
    }

    /// [`best_handle`](Self::best_handle) as a raw value for native bridges:
    /// the handle, or a negative code from [`codes`](crate::codes).
    ///
    /// Without a provider no handle is valid, so this is
    /// [`codes::NOT_AVAILABLE`](crate::codes::NOT_AVAILABLE).
    pub fn raw_best_handle(&self) -> i64 {
        match self.best_handle() {
            Ok(handle) => i64::try_from(handle.raw()).unwrap_or(codes::NOT_AVAILABLE),
            Err(e) => e.code(),
        }
    }

    /// Checks whether `handle` is usable right now. Never cached.
    pub fn is_network_valid(&self, handle: Option<NetworkHandle>) -> bool {
        self.state.is_valid(handle)
    }

    /// Classifies `handle` into its band bucket.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::NoCapabilities` if the platform (or provider)
    /// has no record, `LookupError::NoTransportInfo` for links without radio
    /// info.
    pub fn band_bucket(
        &self,
        handle: NetworkHandle,
    ) -> std::result::Result<BandBucket, LookupError> {
        let provider = self.state.provider().ok_or(LookupError::NoCapabilities)?;
        band_bucket(provider.as_ref(), handle)
    }

    /// Returns the handle stored for `kind`, unfiltered.
    pub fn handle(&self, kind: LinkKind) -> Option<NetworkHandle> {
        self.state.slot(kind).get()
    }

    /// Stores `handle` for `kind` without touching its request.
    pub fn set_handle(&self, kind: LinkKind, handle: Option<NetworkHandle>) {
        self.state.slot(kind).set(handle);
    }

    /// Clears `kind` only if it still holds `handle`.
    pub fn clear_handle_if_matches(&self, kind: LinkKind, handle: Option<NetworkHandle>) {
        self.state.slot(kind).clear_if_matches(handle);
    }

    pub fn request_state(&self, kind: LinkKind) -> RequestState {
        self.state.slot(kind).request_state()
    }

    /// Returns whether a platform listener is registered for `kind`.
    pub fn has_listener(&self, kind: LinkKind) -> bool {
        self.state.slot(kind).subscription().is_some()
    }

    /// Whether the radio can hold both links at once. Queried live.
    pub fn is_dual_band_capable(&self) -> bool {
        if !self.state.capabilities.supports_dual_band_concurrency {
            return false;
        }
        self.state
            .hardware()
            .is_some_and(|hw| hw.sta_concurrency_supported())
    }

    /// Whether the device is acting as a hotspot. Advisory: any probe
    /// failure reads as `false`.
    pub fn is_tethering_active(&self) -> bool {
        self.state
            .hardware()
            .and_then(|hw| probe_ap_enabled(hw.as_ref()))
            .unwrap_or(false)
    }

    /// Streams every slot write, muted or not.
    ///
    /// The stream ends when the manager is dropped.
    pub fn watch(&self) -> UnboundedReceiver<LinkChange> {
        self.state.watch()
    }

    /// Waits up to `timeout` for a valid handle.
    ///
    /// # Errors
    ///
    /// Returns `ConnectivityError::Timeout` if no link became valid in time.
    pub async fn wait_for_best_handle(
        &self,
        timeout: Duration,
    ) -> std::result::Result<NetworkHandle, ConnectivityError> {
        wait_for_best_handle(&self.state, timeout).await
    }

    /// [`wait_for_best_handle`](Self::wait_for_best_handle) with the default
    /// link wait.
    pub async fn wait_for_link(&self) -> std::result::Result<NetworkHandle, ConnectivityError> {
        self.wait_for_best_handle(timeouts::link_wait()).await
    }
}

fn probe_ap_enabled(hardware: &dyn WifiHardware) -> Option<bool> {
    Some(try_log!(
        hardware.is_ap_enabled(),
        "Failed to query access point state"
    ))
}

/// Builder for [`ConnectionManager`].
pub struct ConnectionManagerBuilder {
    capabilities: PlatformCapabilities,
    dispatch: Arc<dyn Dispatch>,
    sink: Option<Arc<dyn NotificationSink>>,
    muted: bool,
    provider: Option<Arc<dyn ConnectivityProvider>>,
    hardware: Option<Arc<dyn WifiHardware>>,
}

impl Default for ConnectionManagerBuilder {
    fn default() -> Self {
        Self {
            capabilities: PlatformCapabilities::default(),
            dispatch: Arc::new(Inline),
            sink: None,
            muted: false,
            provider: None,
            hardware: None,
        }
    }
}

impl ConnectionManagerBuilder {
    #[must_use]
    pub fn capabilities(mut self, capabilities: PlatformCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Where notifications run. Defaults to [`Inline`].
    #[must_use]
    pub fn dispatch(mut self, dispatch: impl Dispatch + 'static) -> Self {
        self.dispatch = Arc::new(dispatch);
        self
    }

    #[must_use]
    pub fn notifications(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    #[must_use]
    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn ConnectivityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn hardware(mut self, hardware: Arc<dyn WifiHardware>) -> Self {
        self.hardware = Some(hardware);
        self
    }

    pub fn build(self) -> ConnectionManager {
        let notifier = Notifier::new(self.dispatch, self.sink, self.muted);
        let state = Arc::new(ManagerState::new(self.capabilities, notifier));
        if let Some(provider) = self.provider {
            state.set_provider(provider);
        }
        if let Some(hardware) = self.hardware {
            state.set_hardware(hardware);
        }
        ConnectionManager { state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ProviderError;
    use crate::platform::NetworkEvent;
    use crate::platform::fake::FakeProvider;
    use std::sync::Mutex;

    fn h(raw: u64) -> NetworkHandle {
        NetworkHandle::new(raw)
    }

    fn caps() -> PlatformCapabilities {
        PlatformCapabilities {
            supports_interactive_selection: true,
            supports_dual_band_concurrency: true,
        }
    }

    struct Hw {
        concurrency: bool,
        ap: std::result::Result<bool, ProviderError>,
    }

    impl WifiHardware for Hw {
        fn sta_concurrency_supported(&self) -> bool {
            self.concurrency
        }

        fn is_ap_enabled(&self) -> std::result::Result<bool, ProviderError> {
            self.ap.clone()
        }
    }

    #[test]
    fn requests_need_a_provider() {
        let m = ConnectionManager::new(caps());
        assert!(matches!(
            m.request_default(),
            Err(CapabilityError::NoProvider)
        ));
        assert_eq!(m.raw_best_handle(), codes::NOT_AVAILABLE);
        assert_eq!(
            m.best_handle().map_err(|e| e.code()).unwrap_err(),
            m.raw_best_handle()
        );
        assert!(!m.is_network_valid(Some(h(1))));
    }

    #[test]
    fn default_registration_failure_requires_user() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let fake = Arc::new(FakeProvider::default());
        fake.fail_next_register(ProviderError::Denied("WRITE_SETTINGS".into()));

        let m = ConnectionManager::builder()
            .provider(fake.clone())
            .notifications(move |n: Notification| sink_seen.lock().unwrap().push(n))
            .build();

        assert!(matches!(
            m.request_default(),
            Err(CapabilityError::ManualInterventionRequired(ProviderError::Denied(_)))
        ));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Notification::ManualInterventionRequired]
        );
        assert_eq!(m.request_state(LinkKind::Default), RequestState::Idle);
        assert_eq!(fake.listener_count(), 0);
    }

    #[test]
    fn available_then_best_handle() {
        let fake = Arc::new(FakeProvider::default());
        let m = ConnectionManager::builder()
            .capabilities(caps())
            .provider(fake.clone())
            .build();
        m.request_default().unwrap();
        fake.add_wifi(h(10), 2412);
        fake.emit(NetworkEvent::Available(h(10)));
        assert_eq!(m.best_handle().unwrap(), h(10));
        assert_eq!(m.raw_best_handle(), 10);
        assert_eq!(m.band_bucket(h(10)).unwrap().value(), 24);
    }

    #[test]
    fn dual_band_requires_flag_and_hardware() {
        let m = ConnectionManager::builder()
            .capabilities(caps())
            .hardware(Arc::new(Hw {
                concurrency: true,
                ap: Ok(false),
            }))
            .build();
        assert!(m.is_dual_band_capable());

        let gated = ConnectionManager::builder()
            .hardware(Arc::new(Hw {
                concurrency: true,
                ap: Ok(false),
            }))
            .build();
        assert!(!gated.is_dual_band_capable());

        assert!(!ConnectionManager::new(caps()).is_dual_band_capable());
    }

    #[test]
    fn tethering_probe_failure_is_false() {
        let failing = ConnectionManager::builder()
            .hardware(Arc::new(Hw {
                concurrency: false,
                ap: Err(ProviderError::Unsupported),
            }))
            .build();
        assert!(!failing.is_tethering_active());

        let active = ConnectionManager::builder()
            .hardware(Arc::new(Hw {
                concurrency: false,
                ap: Ok(true),
            }))
            .build();
        assert!(active.is_tethering_active());

        assert!(!ConnectionManager::new(caps()).is_tethering_active());
    }

    #[test]
    fn dropping_manager_releases_listeners() {
        let fake = Arc::new(FakeProvider::default());
        let m = ConnectionManager::builder()
            .capabilities(caps())
            .provider(fake.clone())
            .build();
        m.request_default().unwrap();
        m.request_selection(IdentityPattern::literal("CAM"), None)
            .unwrap();
        assert_eq!(fake.listener_count(), 2);

        drop(m);
        assert_eq!(fake.listener_count(), 0);
        // Late events reach a dead manager and are ignored.
        fake.emit(NetworkEvent::Available(h(1)));
    }
}
