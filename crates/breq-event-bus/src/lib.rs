//! Broadcast pub/sub of script run notifications
//!
//! Any number of UI surfaces (editor gutter, status bar, terminal panel)
//! can follow a run without the executor knowing about them. Runs publish
//! typed events and each surface picks the topics it renders.

use breq_core::{Context, Event, EventData, EventType};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, trace};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

pub struct EventBus {
    /// One channel per topic, created by the first subscriber
    topics: DashMap<EventType, broadcast::Sender<Event>>,
    /// Receives every event regardless of topic
    firehose: broadcast::Sender<Event>,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus whose channels each buffer `capacity` events
    ///
    /// A subscriber that falls further behind sees `RecvError::Lagged`
    /// and resumes from the oldest event still buffered.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            firehose: broadcast::channel(capacity).0,
            capacity,
        }
    }

    pub fn subscribe(&self, topic: impl Into<EventType>) -> broadcast::Receiver<Event> {
        let topic = topic.into();
        trace!(%topic, "New subscriber");

        let sender = self
            .topics
            .entry(topic)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        sender.subscribe()
    }

    /// Subscribe to `T`'s topic with payloads decoded back into `T`
    pub fn subscribe_typed<T>(&self) -> TypedSubscription<T>
    where
        T: EventData + DeserializeOwned,
    {
        TypedSubscription {
            rx: self.subscribe(T::event_type()),
            _payload: PhantomData,
        }
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.firehose.subscribe()
    }

    /// Deliver `event` to its topic and to the firehose
    pub fn fire(&self, event: Event) {
        debug!(topic = %event.event_type, run = %event.context.id, "Publishing");

        // Sending with no receivers only reports an error
        if let Some(topic) = self.topics.get(&event.event_type) {
            let _ = topic.send(event.clone());
        }
        let _ = self.firehose.send(event);
    }

    pub fn fire_typed<T: EventData + Serialize>(&self, data: T, context: Context) {
        self.fire(Event::typed(data, context).into_json());
    }

    /// Topics that have ever had a subscriber
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscription returned by [`EventBus::subscribe_typed`]
pub struct TypedSubscription<T> {
    rx: broadcast::Receiver<Event>,
    _payload: PhantomData<fn() -> T>,
}

impl<T: EventData + DeserializeOwned> TypedSubscription<T> {
    /// Next event whose payload decodes as `T`; others are skipped
    pub async fn recv(&mut self) -> Result<Event<T>, RecvError> {
        loop {
            let Event {
                event_type,
                data,
                time_fired,
                context,
            } = self.rx.recv().await?;

            match serde_json::from_value::<T>(data) {
                Ok(data) => {
                    return Ok(Event {
                        event_type,
                        data,
                        time_fired,
                        context,
                    })
                }
                Err(e) => trace!(topic = %event_type, "Skipping undecodable payload: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breq_core::events::{CursorChangedData, RunStateChangedData, CURSOR_CHANGED};
    use breq_core::{LogEvent, RunState};
    use serde_json::json;

    #[tokio::test]
    async fn test_subscribe_and_fire() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(CURSOR_CHANGED);

        bus.fire(Event::new(CURSOR_CHANGED, json!({"line": 4}), Context::new()));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type.as_str(), CURSOR_CHANGED);
        assert_eq!(received.data["line"], 4);
    }

    #[tokio::test]
    async fn test_subscribe_all_preserves_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_all();

        let ctx = Context::new();
        bus.fire_typed(
            RunStateChangedData {
                state: RunState::Running,
            },
            ctx.clone(),
        );
        bus.fire_typed(CursorChangedData { line: Some(0) }, ctx.clone());
        bus.fire_typed(LogEvent::info("started"), ctx);

        assert_eq!(rx.recv().await.unwrap().event_type.as_str(), "run_state_changed");
        assert_eq!(rx.recv().await.unwrap().event_type.as_str(), "cursor_changed");
        assert_eq!(rx.recv().await.unwrap().event_type.as_str(), "script_log");
    }

    #[test]
    fn test_typed_subscription() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_typed::<RunStateChangedData>();

        let ctx = Context::for_script("homing");
        bus.fire_typed(
            RunStateChangedData {
                state: RunState::Paused,
            },
            ctx,
        );

        let received = tokio_test::block_on(rx.recv()).unwrap();
        assert_eq!(received.data.state, RunState::Paused);
        assert_eq!(received.context.script.as_deref(), Some("homing"));
    }

    #[tokio::test]
    async fn test_no_cross_event_pollution() {
        let bus = EventBus::new();
        let mut cursor_rx = bus.subscribe(CURSOR_CHANGED);
        let mut state_rx = bus.subscribe("run_state_changed");

        bus.fire_typed(CursorChangedData { line: None }, Context::new());

        let received = cursor_rx.recv().await.unwrap();
        assert!(received.data["line"].is_null());
        assert!(state_rx.try_recv().is_err());
        assert_eq!(bus.topic_count(), 2);
    }

    #[test]
    fn test_fire_without_subscribers() {
        let bus = EventBus::with_capacity(4);
        for _ in 0..10 {
            bus.fire_typed(LogEvent::info("nobody listening"), Context::new());
        }
    }
}
