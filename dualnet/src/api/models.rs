use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

use crate::types::constants::{band, codes};

/// Opaque identifier of one negotiated network attachment.
///
/// Handles are assigned by the platform and only compare by identity.
/// Whether a handle is still usable is never stored here; ask
/// [`ConnectionManager::is_network_valid`](crate::ConnectionManager::is_network_valid)
/// every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkHandle(u64);

impl NetworkHandle {
    /// Wraps a raw platform handle.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw platform value, suitable for handing to a native
    /// transport stack as a routing token.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl Display for NetworkHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "net#{}", self.0)
    }
}

/// Coarse radio band classification (100 MHz buckets).
///
/// 2412 MHz and 2462 MHz both land in bucket 24; 5180 MHz lands in 51.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BandBucket(u32);

impl BandBucket {
    /// Buckets a radio frequency given in MHz.
    pub const fn from_frequency(mhz: u32) -> Self {
        Self(mhz / band::BUCKET_WIDTH_MHZ)
    }

    /// Returns the bucket number.
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Display for BandBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}xx MHz", self.0)
    }
}

/// Which of the two managed links an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    /// The link established automatically (boot, reconnect).
    Default,
    /// The link the user picked interactively.
    Selected,
}

impl Display for LinkKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Selected => write!(f, "selected"),
        }
    }
}

/// Lifecycle of the request that feeds one slot.
///
/// `Lost` is not stored: a matching lost event moves an `Available`
/// request straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    /// No active request.
    #[default]
    Idle,
    /// Listener registered, waiting for the platform.
    Requesting,
    /// The slot holds the handle the platform reported.
    Available,
    /// The platform declined the request or the user dismissed the picker.
    Unavailable,
}

impl Display for RequestState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Requesting => write!(f, "requesting"),
            Self::Available => write!(f, "available"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Outcome of comparing the default and selected links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictVerdict {
    /// Both links can coexist (or fewer than two links are up).
    NoConflict,
    /// Two distinct links share the same band bucket.
    Conflicting,
    /// The platform could not classify one of the links.
    ///
    /// Callers must not read this as [`ConflictVerdict::NoConflict`].
    Indeterminate(LookupError),
}

impl ConflictVerdict {
    /// Returns `true` only for [`ConflictVerdict::Conflicting`].
    pub fn is_conflicting(&self) -> bool {
        matches!(self, Self::Conflicting)
    }

    /// Returns `true` only when the links are known not to conflict.
    pub fn is_clear(&self) -> bool {
        matches!(self, Self::NoConflict)
    }
}

impl Display for ConflictVerdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoConflict => write!(f, "no conflict"),
            Self::Conflicting => write!(f, "conflicting"),
            Self::Indeterminate(reason) => write!(f, "indeterminate ({reason})"),
        }
    }
}

/// User-level notifications emitted by the manager.
///
/// Delivered at most once per transition through the configured
/// [`Dispatch`](crate::Dispatch) target, and dropped entirely while the
/// manager is muted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The default link came up.
    Available,
    /// The link the user picked came up.
    SelectionAvailable,
    /// The platform declined the selection or the user canceled the picker.
    SelectionCanceled,
    /// Listener registration for the default link failed in a way only the
    /// user can fix (permissions, policy). Never retried automatically.
    ManualInterventionRequired,
    /// Both links are up on the same band bucket.
    ConflictDetected,
    /// Candidate device addresses derived from the selected link.
    AddressCandidates(Vec<Ipv4Addr>),
}

/// Change published on [`ConnectionManager::watch`](crate::ConnectionManager::watch)
/// whenever a slot's handle is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkChange {
    /// Slot that changed.
    pub kind: LinkKind,
    /// Handle now stored in the slot.
    pub handle: Option<NetworkHandle>,
}

/// Progress of a [`WifiConnector`](crate::WifiConnector) flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectState {
    /// The request is registered and waiting for the platform.
    Connecting,
    /// The requested network is attached.
    Connected(String),
    /// The flow ended. The message is suitable for display.
    Failed(String),
}

/// Platform features resolved once at startup.
///
/// The core never inspects platform version numbers; whoever builds the
/// manager maps the running platform onto these flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformCapabilities {
    /// The platform can show an access-point picker for a scoped request.
    pub supports_interactive_selection: bool,
    /// The platform may run two station links at once.
    pub supports_dual_band_concurrency: bool,
}

bitflags! {
    /// Transport types a network can run over.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Transports: u32 {
        const CELLULAR = 1 << 0;
        const WIFI = 1 << 1;
        const BLUETOOTH = 1 << 2;
        const ETHERNET = 1 << 3;
        const VPN = 1 << 4;
    }
}

bitflags! {
    /// Capabilities a network request asks for or a network reports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NetCapabilities: u32 {
        /// The network reaches the general internet.
        const INTERNET = 1 << 0;
        const NOT_METERED = 1 << 1;
        const NOT_RESTRICTED = 1 << 2;
        const TRUSTED = 1 << 3;
        const NOT_VPN = 1 << 4;
        const VALIDATED = 1 << 5;
    }
}

/// Radio-specific metadata of a wireless attachment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WifiInfo {
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    /// Operating frequency in MHz.
    pub frequency_mhz: u32,
    pub rssi: Option<i32>,
}

/// Capability record the platform keeps for a live network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkCapabilities {
    pub transports: Transports,
    pub capabilities: NetCapabilities,
    /// Present only for wireless transports that expose radio info.
    pub transport_info: Option<WifiInfo>,
}

impl NetworkCapabilities {
    /// Capabilities of a wireless network with the given radio info.
    pub fn wifi(info: WifiInfo) -> Self {
        Self {
            transports: Transports::WIFI,
            capabilities: NetCapabilities::NOT_RESTRICTED | NetCapabilities::TRUSTED,
            transport_info: Some(info),
        }
    }

    /// Returns whether the network runs over any of `transport`.
    pub fn has_transport(&self, transport: Transports) -> bool {
        self.transports.intersects(transport)
    }
}

/// Addressing information of a live network.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkProperties {
    /// Gateways of the network's routes.
    pub gateways: Vec<IpAddr>,
    pub dns_servers: Vec<IpAddr>,
    /// Addresses assigned to the local interface.
    pub link_addresses: Vec<IpAddr>,
}

/// Why a link could not be classified into a band bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The platform has no capability record for the handle (torn down).
    #[error("no capabilities reported for network")]
    NoCapabilities,

    /// Capabilities exist but carry no radio info (non-wireless transport).
    #[error("no transport info reported for network")]
    NoTransportInfo,
}

/// No usable link right now. Transient: re-query or wait for a notification.
#[derive(Debug, Error)]
pub enum ConnectivityError {
    /// Neither slot holds a valid handle.
    #[error("no network available")]
    NotAvailable,

    /// Waiting for a link gave up.
    #[error("timed out waiting for a network")]
    Timeout,

    /// A change stream ended while waiting.
    #[error("network wait stuck: {0}")]
    Stuck(String),
}

impl ConnectivityError {
    /// Legacy numeric code for native bridges.
    pub fn code(&self) -> i64 {
        codes::NOT_AVAILABLE
    }
}

/// Failure reported by a platform provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The platform refused the operation (missing permission, policy).
    #[error("platform denied the operation: {0}")]
    Denied(String),

    /// The platform does not implement the operation.
    #[error("operation not supported by the platform")]
    Unsupported,

    /// Any other platform failure.
    #[error("platform error: {0}")]
    Other(String),
}

/// Why a connection request could not be issued.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The platform lacks interactive network selection. Permanent.
    #[error("interactive network selection is not supported on this platform")]
    UnsupportedPlatform,

    /// No connectivity provider has been registered yet.
    #[error("no connectivity provider registered")]
    NoProvider,

    /// The supplied credential was rejected before any listener was registered.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// Registering the default listener failed; the user has to act.
    #[error("manual intervention required: {0}")]
    ManualInterventionRequired(ProviderError),

    /// Registering the selection listener failed.
    #[error("failed to register network request: {0}")]
    RegistrationFailed(ProviderError),
}

impl CapabilityError {
    /// Legacy numeric code for native bridges.
    pub fn code(&self) -> i64 {
        match self {
            Self::UnsupportedPlatform => codes::UNSUPPORTED_PLATFORM,
            _ => codes::NOT_CONNECTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_bucket_groups_channels() {
        assert_eq!(BandBucket::from_frequency(2412), BandBucket::from_frequency(2462));
        assert_eq!(BandBucket::from_frequency(2437).value(), 24);
        assert_eq!(BandBucket::from_frequency(5180).value(), 51);
        assert_ne!(BandBucket::from_frequency(2412), BandBucket::from_frequency(5180));
    }

    #[test]
    fn band_bucket_display() {
        assert_eq!(BandBucket::from_frequency(5745).to_string(), "57xx MHz");
    }

    #[test]
    fn verdict_predicates() {
        assert!(ConflictVerdict::Conflicting.is_conflicting());
        assert!(ConflictVerdict::NoConflict.is_clear());
        let unknown = ConflictVerdict::Indeterminate(LookupError::NoTransportInfo);
        assert!(!unknown.is_clear());
        assert!(!unknown.is_conflicting());
    }

    #[test]
    fn verdict_display() {
        let v = ConflictVerdict::Indeterminate(LookupError::NoCapabilities);
        assert_eq!(
            v.to_string(),
            "indeterminate (no capabilities reported for network)"
        );
    }

    #[test]
    fn handle_display_and_raw() {
        let h = NetworkHandle::new(4711);
        assert_eq!(h.raw(), 4711);
        assert_eq!(format!("{h}"), "net#4711");
    }

    #[test]
    fn error_codes() {
        assert_eq!(ConnectivityError::NotAvailable.code(), -101);
        assert_eq!(CapabilityError::NoProvider.code(), -102);
        assert_eq!(CapabilityError::UnsupportedPlatform.code(), -103);
    }

    #[test]
    fn wifi_capabilities_have_wifi_transport() {
        let caps = NetworkCapabilities::wifi(WifiInfo {
            frequency_mhz: 2412,
            ..Default::default()
        });
        assert!(caps.has_transport(Transports::WIFI));
        assert!(!caps.has_transport(Transports::CELLULAR | Transports::ETHERNET));
        assert!(!caps.capabilities.contains(NetCapabilities::INTERNET));
    }

    #[test]
    fn link_kind_display() {
        assert_eq!(LinkKind::Default.to_string(), "default");
        assert_eq!(LinkKind::Selected.to_string(), "selected");
    }

    #[test]
    fn request_state_defaults_to_idle() {
        assert_eq!(RequestState::default(), RequestState::Idle);
    }
}
