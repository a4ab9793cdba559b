//! Constants shared across the manager.
//!
//! Numeric codes, band bucketing, user-facing connector messages and
//! timeouts live here so the values are defined once.

/// Legacy numeric result codes understood by native bridges.
///
/// Positive values returned through
/// [`ConnectionManager::raw_best_handle`](crate::ConnectionManager::raw_best_handle)
/// are network handles; these negative values are failures.
pub mod codes {
    /// No valid handle in either slot.
    pub const NOT_AVAILABLE: i64 = -101;
    /// A request could not be issued (no provider, refused registration).
    pub const NOT_CONNECTED: i64 = -102;
    /// The platform lacks the requested feature.
    pub const UNSUPPORTED_PLATFORM: i64 = -103;
}

/// Band bucketing parameters.
pub mod band {
    /// Width of one bucket. Channels within the same 100 MHz share a bucket.
    pub const BUCKET_WIDTH_MHZ: u32 = 100;
}

/// Messages emitted by [`WifiConnector`](crate::WifiConnector) on failure.
pub mod messages {
    pub const ERROR_UNAVAILABLE: &str = "Connection failed. Verify hotspot availability and retry.";
    pub const ERROR_LOST: &str = "Connection lost. Please retry.";
    pub const ERROR_REQUEST_FAILED: &str = "Unable to start Wi-Fi connection request.";
    pub const ERROR_UNSUPPORTED_VERSION: &str =
        "In-app Wi-Fi connection is not supported on this platform version.";
}

/// SSID placeholders the platform reports when it will not reveal a name.
pub mod ssid {
    pub const UNKNOWN: &str = "<unknown ssid>";
}

/// Address candidates used when a link reports nothing usable.
pub mod addresses {
    use std::net::Ipv4Addr;

    /// Tried last, in this order.
    pub const FALLBACKS: [Ipv4Addr; 2] = [
        Ipv4Addr::new(192, 168, 0, 1),
        Ipv4Addr::new(192, 168, 1, 1),
    ];
}

/// Credential limits for WPA2 passphrases.
pub mod credential {
    pub const MIN_PASSPHRASE_LEN: usize = 8;
    pub const MAX_PASSPHRASE_LEN: usize = 63;
}

/// Timeout constants for waiting on link changes.
pub mod timeouts {
    use std::time::Duration;

    /// How long [`wait_for_best_handle`](crate::ConnectionManager::wait_for_best_handle)
    /// waits by default (30 seconds). Picker flows involve the user, so this is
    /// generous.
    const LINK_WAIT_SECS: u64 = 30;

    /// Returns the default link wait duration.
    pub fn link_wait() -> Duration {
        Duration::from_secs(LINK_WAIT_SECS)
    }
}
