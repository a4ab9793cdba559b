//! Connection progress as a stream.
//!
//! [`WifiConnector`] drives an interactive selection for a single SSID and
//! reports progress as [`ConnectState`] values instead of notifications.

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use log::{debug, info, warn};
use std::sync::Arc;

use crate::api::builders::{Credential, IdentityPattern};
use crate::api::connection_manager::ConnectionManager;
use crate::api::models::{CapabilityError, ConnectState, LinkKind};
use crate::core::slot::{RequestEvent, RequestObserver};
use crate::types::constants::messages;
use crate::util::utils::sanitize_ssid;

/// Connects to a named network through a [`ConnectionManager`].
///
/// # Example
///
/// ```no_run
/// # use dualnet::{ConnectState, ConnectionManager, WifiConnector};
/// # use futures::StreamExt;
/// # async fn example(manager: ConnectionManager) {
/// let connector = WifiConnector::new(manager);
/// let mut progress = connector.connect("FUJIFILM-X-T4", None);
///
/// while let Some(state) = progress.next().await {
///     match state {
///         ConnectState::Connecting => println!("connecting"),
///         ConnectState::Connected(ssid) => println!("on {ssid}"),
///         ConnectState::Failed(reason) => eprintln!("{reason}"),
///     }
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct WifiConnector {
    manager: ConnectionManager,
}

impl WifiConnector {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Starts a selection for exactly `ssid` and streams its progress.
    ///
    /// The first item is always [`ConnectState::Connecting`]. The stream
    /// ends after a failure, when the request is replaced, or when the
    /// manager is dropped. A successful connection keeps the stream open so
    /// a later loss is reported too.
    ///
    /// Surrounding quotes are stripped from `ssid`. An empty or unknown
    /// SSID fails without registering anything.
    pub fn connect(
        &self,
        ssid: &str,
        credential: Option<Credential>,
    ) -> UnboundedReceiver<ConnectState> {
        let (tx, rx) = mpsc::unbounded();
        send(&tx, ConnectState::Connecting);

        let Some(ssid) = sanitize_ssid(ssid) else {
            warn!("Refusing to connect to unnamed network {ssid:?}");
            send(&tx, ConnectState::Failed(messages::ERROR_REQUEST_FAILED.to_string()));
            tx.close_channel();
            return rx;
        };

        info!("Connecting to {ssid}");
        let result = self.manager.request_selection_observed(
            IdentityPattern::literal(&ssid),
            credential,
            Some(progress_observer(ssid.clone(), tx.clone())),
        );

        if let Err(e) = result {
            warn!("Failed to request {ssid}: {e}");
            let reason = match e {
                CapabilityError::UnsupportedPlatform => messages::ERROR_UNSUPPORTED_VERSION,
                _ => messages::ERROR_REQUEST_FAILED,
            };
            send(&tx, ConnectState::Failed(reason.to_string()));
            tx.close_channel();
        }
        rx
    }

    /// Withdraws the selection started by [`connect`](Self::connect).
    ///
    /// The selected handle is kept, matching
    /// [`ConnectionManager::cancel_request`].
    pub fn disconnect_active_request(&self) {
        debug!("Disconnecting active selection request");
        self.manager.cancel_request(LinkKind::Selected);
    }
}

fn progress_observer(ssid: String, tx: UnboundedSender<ConnectState>) -> RequestObserver {
    Arc::new(move |event: RequestEvent| match event {
        RequestEvent::Available(handle) => {
            debug!("{ssid} connected on {handle}");
            send(&tx, ConnectState::Connected(ssid.clone()));
        }
        RequestEvent::Unavailable => {
            send(&tx, ConnectState::Failed(messages::ERROR_UNAVAILABLE.to_string()));
            tx.close_channel();
        }
        RequestEvent::Lost(handle) => {
            debug!("{ssid} lost on {handle}");
            send(&tx, ConnectState::Failed(messages::ERROR_LOST.to_string()));
            tx.close_channel();
        }
    })
}

fn send(tx: &UnboundedSender<ConnectState>, state: ConnectState) {
    if tx.unbounded_send(state).is_err() {
        debug!("Connection progress receiver dropped");
    }
}
