//! Link validity and band conflict classification.
//!
//! Everything here re-queries the provider. Radio state can change without
//! an event, so nothing is cached between calls.

use log::{debug, warn};

use crate::api::models::{BandBucket, ConflictVerdict, LookupError, NetworkHandle, WifiInfo};
use crate::platform::ConnectivityProvider;

/// Returns whether `handle` is currently usable.
///
/// False without a provider, for an empty handle, and for handles the
/// platform has no record of; otherwise the platform's availability flag.
pub(crate) fn is_network_valid(
    provider: Option<&dyn ConnectivityProvider>,
    handle: Option<NetworkHandle>,
) -> bool {
    let (Some(provider), Some(handle)) = (provider, handle) else {
        return false;
    };
    provider.query_availability(handle).unwrap_or(false)
}

/// Fetches the radio info of a wireless link.
pub(crate) fn radio_info(
    provider: &dyn ConnectivityProvider,
    handle: NetworkHandle,
) -> Result<WifiInfo, LookupError> {
    let caps = provider
        .query_capabilities(handle)
        .ok_or(LookupError::NoCapabilities)?;
    caps.transport_info.ok_or(LookupError::NoTransportInfo)
}

/// Classifies a link into its 100 MHz band bucket.
pub(crate) fn band_bucket(
    provider: &dyn ConnectivityProvider,
    handle: NetworkHandle,
) -> Result<BandBucket, LookupError> {
    radio_info(provider, handle).map(|info| BandBucket::from_frequency(info.frequency_mhz))
}

/// Compares two valid links.
///
/// Equal handles are the same attachment and never conflict. Links whose
/// radio info compares equal are also reported as not conflicting, even when
/// the handles differ.
// TODO: equal radio info on distinct handles may be a double attachment to
// one access point; confirm against a device running both links before
// reporting it as a conflict.
pub(crate) fn compare_links(
    provider: &dyn ConnectivityProvider,
    default: NetworkHandle,
    selected: NetworkHandle,
) -> ConflictVerdict {
    if default == selected {
        debug!("Default and selected links share {default}");
        return ConflictVerdict::NoConflict;
    }

    let (default_info, selected_info) =
        match (radio_info(provider, default), radio_info(provider, selected)) {
            (Ok(d), Ok(s)) => (d, s),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Cannot classify links {default}/{selected}: {e}");
                return ConflictVerdict::Indeterminate(e);
            }
        };

    if default_info == selected_info {
        debug!("Default and selected links report identical radio info");
        return ConflictVerdict::NoConflict;
    }

    let default_band = BandBucket::from_frequency(default_info.frequency_mhz);
    let selected_band = BandBucket::from_frequency(selected_info.frequency_mhz);
    debug!("Band buckets: default={default_band} selected={selected_band}");

    if default_band == selected_band {
        ConflictVerdict::Conflicting
    } else {
        ConflictVerdict::NoConflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{NetCapabilities, NetworkCapabilities, Transports};
    use crate::platform::fake::FakeProvider;

    fn h(raw: u64) -> NetworkHandle {
        NetworkHandle::new(raw)
    }

    #[test]
    fn invalid_without_provider() {
        assert!(!is_network_valid(None, Some(h(1))));
        assert!(!is_network_valid(None, None));
    }

    #[test]
    fn validity_follows_platform_record() {
        let fake = FakeProvider::default();
        fake.add_wifi(h(1), 2412);
        fake.add(h(2), false, None);
        let p: &dyn ConnectivityProvider = &fake;
        assert!(is_network_valid(Some(p), Some(h(1))));
        assert!(!is_network_valid(Some(p), Some(h(2))));
        assert!(!is_network_valid(Some(p), Some(h(3))));
        assert!(!is_network_valid(Some(p), None));

        fake.remove(h(1));
        assert!(!is_network_valid(Some(p), Some(h(1))));
    }

    #[test]
    fn band_bucket_lookup_errors() {
        let p = FakeProvider::default();
        p.add(
            h(5),
            true,
            Some(NetworkCapabilities {
                transports: Transports::ETHERNET,
                capabilities: NetCapabilities::empty(),
                transport_info: None,
            }),
        );
        assert_eq!(band_bucket(&p, h(4)), Err(LookupError::NoCapabilities));
        assert_eq!(band_bucket(&p, h(5)), Err(LookupError::NoTransportInfo));
    }

    #[test]
    fn band_bucket_is_recomputed() {
        let p = FakeProvider::default();
        p.add_wifi(h(1), 2412);
        assert_eq!(band_bucket(&p, h(1)).map(|b| b.value()), Ok(24));
        p.add_wifi(h(1), 5180);
        assert_eq!(band_bucket(&p, h(1)).map(|b| b.value()), Ok(51));
    }

    #[test]
    fn same_band_conflicts() {
        let p = FakeProvider::default();
        p.add_wifi(h(1), 2412);
        p.add_wifi(h(2), 2462);
        assert_eq!(compare_links(&p, h(1), h(2)), ConflictVerdict::Conflicting);
    }

    #[test]
    fn different_bands_do_not_conflict() {
        let p = FakeProvider::default();
        p.add_wifi(h(1), 2412);
        p.add_wifi(h(2), 5180);
        assert_eq!(compare_links(&p, h(1), h(2)), ConflictVerdict::NoConflict);
    }

    #[test]
    fn same_handle_does_not_conflict() {
        let p = FakeProvider::default();
        p.add_wifi(h(1), 2412);
        assert_eq!(compare_links(&p, h(1), h(1)), ConflictVerdict::NoConflict);
    }

    #[test]
    fn identical_radio_info_does_not_conflict() {
        let p = FakeProvider::default();
        let caps = NetworkCapabilities::wifi(WifiInfo {
            ssid: Some("CAM".into()),
            frequency_mhz: 2437,
            ..Default::default()
        });
        p.add(h(1), true, Some(caps.clone()));
        p.add(h(2), true, Some(caps));
        assert_eq!(compare_links(&p, h(1), h(2)), ConflictVerdict::NoConflict);
    }

    #[test]
    fn missing_info_is_indeterminate() {
        let p = FakeProvider::default();
        p.add_wifi(h(1), 2412);
        p.add(h(2), true, None);
        assert_eq!(
            compare_links(&p, h(1), h(2)),
            ConflictVerdict::Indeterminate(LookupError::NoCapabilities)
        );
    }
}
