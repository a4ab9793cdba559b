//! Delivery of user-level notifications.
//!
//! Notifications leave the manager through a [`Dispatch`] target chosen per
//! manager: [`Inline`] runs the sink on whatever context produced the event,
//! [`QueuedDispatch`] hands it to a [`DispatchQueue`] drained on a context the
//! owner picks (a UI loop, a dedicated task), and [`TokioDispatch`] spawns it
//! onto a Tokio runtime.
//!
//! Muting only affects notifications. Slot state is updated regardless.

use futures::StreamExt;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use log::{debug, warn};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::api::models::Notification;

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where notification callbacks run.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, job: Job);
}

/// Runs jobs synchronously on the calling context.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl Dispatch for Inline {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Enqueues jobs for a [`DispatchQueue`].
#[derive(Clone)]
pub struct QueuedDispatch {
    tx: UnboundedSender<Job>,
}

/// Receiving end of a [`QueuedDispatch`].
pub struct DispatchQueue {
    rx: UnboundedReceiver<Job>,
}

/// Creates a connected queued target and its queue.
pub fn queued() -> (QueuedDispatch, DispatchQueue) {
    let (tx, rx) = mpsc::unbounded();
    (QueuedDispatch { tx }, DispatchQueue { rx })
}

impl Dispatch for QueuedDispatch {
    fn dispatch(&self, job: Job) {
        if self.tx.unbounded_send(job).is_err() {
            debug!("Dispatch queue closed, dropping notification");
        }
    }
}

impl DispatchQueue {
    /// Runs every job queued so far and returns how many ran.
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Runs jobs as they arrive until every [`QueuedDispatch`] is dropped.
    ///
    /// This function runs indefinitely while the manager lives. Run it on the
    /// context notifications should be delivered on.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.next().await {
            job();
        }
        debug!("Dispatch queue closed");
    }
}

/// Spawns jobs onto a Tokio runtime.
#[derive(Clone)]
pub struct TokioDispatch {
    handle: tokio::runtime::Handle,
}

impl TokioDispatch {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Targets the runtime of the calling context.
    ///
    /// Panics outside a Tokio runtime, like [`tokio::runtime::Handle::current`].
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Dispatch for TokioDispatch {
    fn dispatch(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }
}

/// Receives notifications. Fire-and-forget: nothing is retried.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<F> NotificationSink for F
where
    F: Fn(Notification) + Send + Sync,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Routes notifications to the sink through the dispatch target, honoring
/// the mute flag.
pub(crate) struct Notifier {
    target: Arc<dyn Dispatch>,
    sink: Option<Arc<dyn NotificationSink>>,
    muted: AtomicBool,
}

impl Notifier {
    pub(crate) fn new(
        target: Arc<dyn Dispatch>,
        sink: Option<Arc<dyn NotificationSink>>,
        muted: bool,
    ) -> Self {
        Self {
            target,
            sink,
            muted: AtomicBool::new(muted),
        }
    }

    pub(crate) fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    pub(crate) fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub(crate) fn notify(&self, notification: Notification) {
        if self.is_muted() {
            debug!("Muted, dropping notification {notification:?}");
            return;
        }
        let Some(sink) = self.sink.clone() else {
            return;
        };
        self.target.dispatch(Box::new(move || deliver(sink.as_ref(), notification)));
    }
}

/// Invokes the sink, containing any panic so it cannot reach manager state.
fn deliver(sink: &dyn NotificationSink, notification: Notification) {
    let label = format!("{notification:?}");
    if catch_unwind(AssertUnwindSafe(|| sink.notify(notification))).is_err() {
        warn!("Notification sink panicked while handling {label}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording() -> (Arc<Mutex<Vec<Notification>>>, Arc<dyn NotificationSink>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: Arc<dyn NotificationSink> =
            Arc::new(move |n: Notification| sink_seen.lock().unwrap().push(n));
        (seen, sink)
    }

    #[test]
    fn inline_delivers_immediately() {
        let (seen, sink) = recording();
        let notifier = Notifier::new(Arc::new(Inline), Some(sink), false);
        notifier.notify(Notification::Available);
        assert_eq!(*seen.lock().unwrap(), vec![Notification::Available]);
    }

    #[test]
    fn muted_drops_notifications() {
        let (seen, sink) = recording();
        let notifier = Notifier::new(Arc::new(Inline), Some(sink), true);
        notifier.notify(Notification::SelectionAvailable);
        assert!(seen.lock().unwrap().is_empty());

        notifier.set_muted(false);
        notifier.notify(Notification::SelectionCanceled);
        assert_eq!(*seen.lock().unwrap(), vec![Notification::SelectionCanceled]);
    }

    #[test]
    fn queued_delivers_on_drain() {
        let (seen, sink) = recording();
        let (target, mut queue) = queued();
        let notifier = Notifier::new(Arc::new(target), Some(sink), false);
        notifier.notify(Notification::Available);
        notifier.notify(Notification::ConflictDetected);
        assert!(seen.lock().unwrap().is_empty());

        assert_eq!(queue.drain(), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Notification::Available, Notification::ConflictDetected]
        );
    }

    #[test]
    fn panicking_sink_is_contained() {
        fn failing_sink(_n: Notification) {
            panic!("sink failure");
        }
        let sink: Arc<dyn NotificationSink> = Arc::new(failing_sink);
        let notifier = Notifier::new(Arc::new(Inline), Some(sink), false);
        notifier.notify(Notification::Available);
        notifier.notify(Notification::Available);
    }

    #[tokio::test]
    async fn queue_run_ends_when_target_dropped() {
        let (seen, sink) = recording();
        let (target, queue) = queued();
        let notifier = Notifier::new(Arc::new(target), Some(sink), false);
        notifier.notify(Notification::SelectionAvailable);
        drop(notifier);

        queue.run().await;
        assert_eq!(*seen.lock().unwrap(), vec![Notification::SelectionAvailable]);
    }

    #[tokio::test]
    async fn tokio_dispatch_spawns() {
        let (tx, rx) = futures::channel::oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let sink: Arc<dyn NotificationSink> = Arc::new(move |n: Notification| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(n);
            }
        });
        let notifier = Notifier::new(Arc::new(TokioDispatch::current()), Some(sink), false);
        notifier.notify(Notification::ManualInterventionRequired);
        assert_eq!(rx.await.unwrap(), Notification::ManualInterventionRequired);
    }
}
