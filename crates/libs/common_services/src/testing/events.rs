use crate::events::{EventError, EventPublisher, EventSource, IncomingEvent};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// In-memory bus: every published notification is both recorded for
/// assertions and fanned out to subscribed sources.
pub struct MemoryEventBus {
    tx: broadcast::Sender<IncomingEvent>,
    log: Mutex<Vec<IncomingEvent>>,
}

impl MemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            tx,
            log: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> MemoryEventSource {
        MemoryEventSource {
            rx: self.tx.subscribe(),
        }
    }

    /// Everything published so far, in order.
    #[must_use]
    pub fn published(&self) -> Vec<IncomingEvent> {
        self.log.lock().expect("bus log poisoned").clone()
    }

    /// Published payloads on one channel, deserialized.
    #[must_use]
    pub fn published_on<T: DeserializeOwned>(&self, channel: &str) -> Vec<T> {
        self.published()
            .into_iter()
            .filter(|event| event.channel == channel)
            .filter_map(|event| serde_json::from_str(&event.payload).ok())
            .collect()
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for MemoryEventBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), EventError> {
        let event = IncomingEvent {
            channel: channel.to_owned(),
            payload: payload.to_owned(),
        };
        self.log.lock().expect("bus log poisoned").push(event.clone());
        // No receivers is fine; publishing is fire-and-forget.
        let _ = self.tx.send(event);
        Ok(())
    }
}

pub struct MemoryEventSource {
    rx: broadcast::Receiver<IncomingEvent>,
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn recv(&mut self) -> Result<IncomingEvent, EventError> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return Err(EventError::Closed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::publish_event;
    use common_types::{CHANNEL_PHOTO_REINDEX, PhotoReindex};
    use uuid::Uuid;

    #[tokio::test]
    async fn round_trips_typed_events() {
        let bus = MemoryEventBus::new();
        let mut source = bus.subscribe();

        let event = PhotoReindex {
            photo_id: Uuid::new_v4(),
        };
        publish_event(&bus, CHANNEL_PHOTO_REINDEX, &event)
            .await
            .expect("publish");

        let received = source.recv().await.expect("recv");
        assert_eq!(received.channel, CHANNEL_PHOTO_REINDEX);

        let decoded: Vec<PhotoReindex> = bus.published_on(CHANNEL_PHOTO_REINDEX);
        assert_eq!(decoded, vec![event]);
    }

    #[tokio::test]
    async fn source_closes_when_bus_drops() {
        let bus = MemoryEventBus::new();
        let mut source = bus.subscribe();
        drop(bus);
        assert!(matches!(source.recv().await, Err(EventError::Closed)));
    }
}
