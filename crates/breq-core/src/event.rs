//! Event types for the run notification bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Context;

/// Trait for typed event data
///
/// Implement this trait for any payload that should travel on the bus.
pub trait EventData: Clone + Send + Sync + 'static {
    /// The event type string for this data type
    fn event_type() -> &'static str;
}

/// Event type identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventType(String);

impl EventType {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self(event_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A notification fired by a script run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T = serde_json::Value> {
    /// The type of event
    pub event_type: EventType,

    /// The event payload
    pub data: T,

    /// When the event was fired
    pub time_fired: DateTime<Utc>,

    /// Run that produced the event
    pub context: Context,
}

impl<T> Event<T> {
    /// Create a new event with current timestamp
    pub fn new(event_type: impl Into<EventType>, data: T, context: Context) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            time_fired: Utc::now(),
            context,
        }
    }
}

impl<T: EventData> Event<T> {
    /// Create a typed event from EventData
    pub fn typed(data: T, context: Context) -> Self {
        Self::new(T::event_type(), data, context)
    }
}

impl<T: Serialize> Event<T> {
    /// Erase the payload type so the event can travel on an untyped channel
    pub fn into_json(self) -> Event<serde_json::Value> {
        Event {
            event_type: self.event_type,
            data: serde_json::to_value(&self.data).unwrap_or_default(),
            time_fired: self.time_fired,
            context: self.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CursorChangedData, CURSOR_CHANGED};

    #[test]
    fn test_typed_event_carries_type() {
        let event = Event::typed(CursorChangedData { line: Some(3) }, Context::new());
        assert_eq!(event.event_type.as_str(), CURSOR_CHANGED);

        let json = event.into_json();
        assert_eq!(json.data["line"], 3);
    }
}
