use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// §6 event bus payload: `{type, timestamp, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

/// A subscriber is a plain async closure. Boxed as a trait object so the
/// bus can hold a heterogeneous list of them, the way the teacher's
/// `TaskManager` holds a boxed `now_provider` closure in `ServerOptions`.
pub trait Subscriber: Send + Sync {
    fn handle(&self, event: &Event);
}

impl<F: Fn(&Event) + Send + Sync> Subscriber for F {
    fn handle(&self, event: &Event) {
        self(event)
    }
}

const DEFAULT_CAPACITY: usize = 256;

/// §5/§9 in-process event bus: a single consumer task drains a bounded
/// channel and dispatches to every subscriber serially (one subscriber's
/// slowness never reorders what another subscriber observes). Publish is
/// non-blocking `try_send`; a full channel drops the event and logs a
/// warning rather than applying backpressure to the publisher.
pub struct EventBus {
    sender: mpsc::Sender<Event>,
    cancel: CancellationToken,
    consumer: tokio::task::JoinHandle<()>,
}

impl EventBus {
    pub fn new(subscribers: Vec<Arc<dyn Subscriber>>) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, subscribers)
    }

    pub fn with_capacity(capacity: usize, subscribers: Vec<Arc<dyn Subscriber>>) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Event>(capacity);
        let cancel = CancellationToken::new();
        let consumer_cancel = cancel.clone();

        let consumer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    event = receiver.recv() => {
                        match event {
                            Some(event) => dispatch(&subscribers, &event),
                            None => break,
                        }
                    }
                    _ = consumer_cancel.cancelled() => {
                        // Drain whatever is already buffered before exiting.
                        while let Ok(event) = receiver.try_recv() {
                            dispatch(&subscribers, &event);
                        }
                        break;
                    }
                }
            }
        });

        Self { sender, cancel, consumer }
    }

    /// Non-blocking publish. Logs and drops on a full or closed channel;
    /// never awaits.
    pub fn publish(&self, event_type: &str, data: Value) {
        let event = Event { event_type: event_type.to_string(), timestamp: Utc::now(), data };
        if let Err(e) = self.sender.try_send(event) {
            warn!(event_type, error = %e, "event bus dropped event");
        }
    }

    /// Signals the consumer to stop after draining buffered events, then
    /// waits for it to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.consumer.await;
    }
}

/// Dispatches one event to every subscriber in order, isolating each call
/// behind a panic boundary (§7) so one bad handler can't take down the
/// consumer loop or skip the remaining subscribers.
fn dispatch(subscribers: &[Arc<dyn Subscriber>], event: &Event) {
    for subscriber in subscribers {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| subscriber.handle(event)));
        if let Err(panic) = result {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "subscriber panicked".to_string());
            warn!(event_type = %event.event_type, detail, "event subscriber panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn publish_is_delivered_to_every_subscriber_in_order() {
        let received = Arc::new(std::sync::Mutex::new(Vec::new()));
        let r = received.clone();
        let subscriber: Arc<dyn Subscriber> = Arc::new(move |event: &Event| {
            r.lock().unwrap().push(event.event_type.clone());
        });

        let bus = EventBus::new(vec![subscriber]);
        bus.publish("artist.new", json!({"id": "1"}));
        bus.publish("metadata.fixed", json!({"id": "1"}));
        tokio::time::sleep(Duration::from_millis(50)).await;
        bus.stop().await;

        assert_eq!(*received.lock().unwrap(), vec!["artist.new", "metadata.fixed"]);
    }

    #[tokio::test]
    async fn a_panicking_subscriber_does_not_block_others() {
        let panicking: Arc<dyn Subscriber> = Arc::new(|_event: &Event| panic!("boom"));
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let counting: Arc<dyn Subscriber> = Arc::new(move |_event: &Event| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let bus = EventBus::new(vec![panicking, counting]);
        bus.publish("rule.violation", json!({}));
        tokio::time::sleep(Duration::from_millis(50)).await;
        bus.stop().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_drains_buffered_events_before_exiting() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let subscriber: Arc<dyn Subscriber> = Arc::new(move |_event: &Event| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let bus = EventBus::new(vec![subscriber]);
        for _ in 0..5 {
            bus.publish("scan.completed", json!({}));
        }
        bus.stop().await;

        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn publish_beyond_capacity_drops_without_blocking() {
        let subscriber: Arc<dyn Subscriber> = Arc::new(|_event: &Event| {
            std::thread::sleep(Duration::from_millis(200));
        });
        let bus = EventBus::with_capacity(1, vec![subscriber]);
        for _ in 0..10 {
            bus.publish("fs.dir.created", json!({}));
        }
        bus.stop().await;
    }
}
