//! Waiting for a usable link using change notifications.
//!
//! Rather than polling [`best_handle`](crate::ConnectionManager::best_handle)
//! in a loop, the wait subscribes to slot changes and re-checks only when a
//! slot was written. The subscription is taken before the first check so a
//! link arriving in between is not missed.

use futures::{FutureExt, StreamExt, select};
use futures_timer::Delay;
use log::{debug, warn};
use std::pin::pin;
use std::time::Duration;

use crate::api::models::{ConnectivityError, NetworkHandle};
use crate::core::manager::ManagerState;

/// Waits until either slot holds a valid handle, preferring the selected one.
pub(crate) async fn wait_for_best_handle(
    state: &ManagerState,
    timeout: Duration,
) -> Result<NetworkHandle, ConnectivityError> {
    // Subscribe FIRST to avoid race condition
    let mut changes = state.watch();
    debug!("Subscribed to link changes");

    if let Ok(handle) = state.best_handle() {
        debug!("Network already available: {handle}");
        return Ok(handle);
    }

    // Runtime-agnostic timeout
    let mut timeout_delay = pin!(Delay::new(timeout).fuse());

    loop {
        select! {
            _ = timeout_delay => {
                // The last change may have landed just before the deadline
                return state.best_handle().map_err(|_| {
                    warn!("No network became available within {timeout:?}");
                    ConnectivityError::Timeout
                });
            }
            change = changes.next() => {
                match change {
                    Some(change) => {
                        debug!("Link change while waiting: {change:?}");
                        if let Ok(handle) = state.best_handle() {
                            return Ok(handle);
                        }
                    }
                    None => {
                        return Err(ConnectivityError::Stuck("change stream ended".into()));
                    }
                }
            }
        }
    }
}
