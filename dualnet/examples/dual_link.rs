/// Example walking a manager through a default link and a camera hotspot.
///
/// A scripted provider stands in for the operating system: it accepts
/// listeners and lets the example play the platform's part by firing events.
use dualnet::builders::NetworkRequest;
use dualnet::{
    ConnectState, ConnectionManager, ConnectivityProvider, EventSink, NetCapabilities,
    NetworkCapabilities, NetworkEvent, NetworkHandle, Notification, PlatformCapabilities,
    ProviderError, SubscriptionToken, WifiConnector, WifiInfo,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct ScriptedPlatform {
    next: Mutex<u64>,
    listeners: Mutex<HashMap<SubscriptionToken, (bool, EventSink)>>,
    networks: Mutex<HashMap<NetworkHandle, NetworkCapabilities>>,
}

impl ScriptedPlatform {
    fn bring_up(&self, handle: NetworkHandle, ssid: &str, frequency_mhz: u32) {
        let caps = NetworkCapabilities::wifi(WifiInfo {
            ssid: Some(ssid.to_string()),
            frequency_mhz,
            ..Default::default()
        });
        self.networks.lock().unwrap().insert(handle, caps);
    }

    fn fire(&self, selection: bool, event: NetworkEvent) {
        let sinks: Vec<EventSink> = self
            .listeners
            .lock()
            .unwrap()
            .values()
            .filter(|(s, _)| *s == selection)
            .map(|(_, sink)| Arc::clone(sink))
            .collect();
        for sink in sinks {
            sink(event.clone());
        }
    }
}

impl ConnectivityProvider for ScriptedPlatform {
    fn register_listener(
        &self,
        request: &NetworkRequest,
        sink: EventSink,
    ) -> Result<SubscriptionToken, ProviderError> {
        let mut next = self.next.lock().unwrap();
        *next += 1;
        let token = SubscriptionToken::new(*next);
        let selection = !request.capabilities().contains(NetCapabilities::INTERNET);
        self.listeners
            .lock()
            .unwrap()
            .insert(token, (selection, sink));
        Ok(token)
    }

    fn unregister_listener(&self, token: SubscriptionToken) {
        self.listeners.lock().unwrap().remove(&token);
    }

    fn query_capabilities(&self, handle: NetworkHandle) -> Option<NetworkCapabilities> {
        self.networks.lock().unwrap().get(&handle).cloned()
    }

    fn query_availability(&self, handle: NetworkHandle) -> Option<bool> {
        self.networks.lock().unwrap().get(&handle).map(|_| true)
    }
}

#[tokio::main]
async fn main() -> dualnet::Result<()> {
    let platform = Arc::new(ScriptedPlatform::default());

    let manager = ConnectionManager::builder()
        .capabilities(PlatformCapabilities {
            supports_interactive_selection: true,
            supports_dual_band_concurrency: true,
        })
        .provider(platform.clone())
        .notifications(|n: Notification| println!("  notification: {n:?}"))
        .build();

    println!("Requesting default link...");
    manager.request_default()?;
    let home = NetworkHandle::new(100);
    platform.bring_up(home, "HomeWifi", 2437);
    platform.fire(false, NetworkEvent::Available(home));

    println!("Connecting to camera...");
    let connector = WifiConnector::new(manager.clone());
    let mut progress = connector.connect("FUJIFILM-X-T4", None);

    let camera = NetworkHandle::new(200);
    platform.bring_up(camera, "FUJIFILM-X-T4", 2412);
    platform.fire(true, NetworkEvent::Available(camera));

    for _ in 0..2 {
        match progress.next().await {
            Some(ConnectState::Connecting) => println!("  connecting"),
            Some(ConnectState::Connected(ssid)) => println!("  connected to {ssid}"),
            Some(ConnectState::Failed(reason)) => println!("  failed: {reason}"),
            None => break,
        }
    }

    println!("Conflict check: {}", manager.check_conflict());
    if let Ok(bucket) = manager.band_bucket(camera) {
        println!("Camera band: {bucket}");
    }

    let best = manager.wait_for_best_handle(Duration::from_secs(1)).await;
    println!("Routing over: {best:?}");

    println!("Camera switched off...");
    platform.fire(true, NetworkEvent::Lost(camera));
    println!("Routing over: {:?}", manager.best_handle());

    manager.reset();
    Ok(())
}
