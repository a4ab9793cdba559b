//! Request builders.
//!
//! This module provides the types used to describe which network a listener
//! should be satisfied by. Most users only need [`IdentityPattern`] and
//! [`Credential`] together with
//! [`ConnectionManager::request_selection`](crate::ConnectionManager::request_selection);
//! the full [`NetworkRequest`] is what a
//! [`ConnectivityProvider`](crate::ConnectivityProvider) receives.
//!
//! # Examples
//!
//! ```rust
//! use dualnet::builders::{IdentityPattern, NetworkRequest, WifiSpecifier};
//! use dualnet::{NetCapabilities, Transports};
//!
//! let request = NetworkRequest::builder()
//!     .transport(Transports::WIFI)
//!     .remove_capability(NetCapabilities::INTERNET)
//!     .specifier(WifiSpecifier::new(IdentityPattern::prefix("CAM-")))
//!     .build();
//!
//! assert!(request.accepts_ssid("CAM-1234"));
//! assert!(!request.capabilities().contains(NetCapabilities::INTERNET));
//! ```

pub mod request_builder;

pub use request_builder::{
    Credential, IdentityPattern, NetworkRequest, NetworkRequestBuilder, WifiSpecifier,
};
