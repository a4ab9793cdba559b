//! A Rust library for keeping two Wi-Fi links apart.
//!
//! Devices such as cameras and drones publish their own access point with no
//! internet behind it. Talking to one while staying online means holding two
//! links at once: the *default* link the platform picks automatically, and a
//! *selected* link the user picks in a system dialog. This crate tracks both:
//!
//! - Requesting the default link and an interactive selection
//! - Answering "which link should my sockets use?" with the validity gate
//! - Detecting when both links share a radio band
//! - Streaming connection progress for a single SSID
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dualnet::{ConnectionManager, ConnectivityProvider, Notification, PlatformCapabilities};
//! use dualnet::builders::IdentityPattern;
//!
//! # fn example(provider: Arc<dyn ConnectivityProvider>) -> dualnet::Result<()> {
//! let manager = ConnectionManager::builder()
//!     .capabilities(PlatformCapabilities {
//!         supports_interactive_selection: true,
//!         supports_dual_band_concurrency: true,
//!     })
//!     .provider(provider)
//!     .notifications(|n: Notification| {
//!         if n == Notification::ConflictDetected {
//!             eprintln!("both links share a band, expect slow transfers");
//!         }
//!     })
//!     .build();
//!
//! manager.request_default()?;
//! manager.request_selection(IdentityPattern::glob("DJI-*"), None)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Platform Integration
//!
//! The crate does not talk to an operating system itself. Embedders implement
//! [`ConnectivityProvider`] and, optionally, [`WifiHardware`]; platform
//! callbacks are forwarded as [`NetworkEvent`]s into the [`EventSink`] handed
//! out at registration. Callbacks may arrive on any thread.
//!
//! # Notifications and Change Streams
//!
//! User-facing [`Notification`]s go through a [`Dispatch`] target and can be
//! muted. Slot writes are also published unmuted through
//! [`ConnectionManager::watch`], which is how
//! [`ConnectionManager::wait_for_best_handle`] waits without polling.
//!
//! # Error Handling
//!
//! Request operations return `Result<T, CapabilityError>`. Handle lookups
//! return [`ConnectivityError`], and classification failures are
//! [`LookupError`]s. Native bridges can use the negative [`codes`].
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod types;
mod util;

// Public API modules
pub mod api;
pub mod platform;

// Re-exported public API
pub use api::builders;
pub use api::connection_manager::{ConnectionManager, ConnectionManagerBuilder};
pub use api::connector::WifiConnector;
pub use api::models::{
    BandBucket, CapabilityError, ConflictVerdict, ConnectState, ConnectivityError, LinkChange,
    LinkKind, LinkProperties, LookupError, NetCapabilities, NetworkCapabilities, NetworkHandle,
    Notification, PlatformCapabilities, ProviderError, RequestState, Transports, WifiInfo,
};
pub use crate::core::dispatcher::{
    Dispatch, DispatchQueue, Inline, Job, NotificationSink, QueuedDispatch, TokioDispatch, queued,
};
pub use platform::{ConnectivityProvider, EventSink, NetworkEvent, SubscriptionToken, WifiHardware};
pub use types::constants::{codes, messages};
pub use util::utils::{address_candidates, sanitize_ssid};

/// A specialized `Result` type for request operations.
pub type Result<T> = std::result::Result<T, CapabilityError>;
