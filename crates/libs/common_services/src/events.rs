//! Cross-service eventing.
//!
//! Pub/sub is modeled as two narrow interfaces — an outbound
//! [`EventPublisher`] and an inbound [`EventSource`] — so the pipeline's
//! logic never touches a concrete broker. Production uses Postgres
//! `NOTIFY`/`LISTEN`; tests use an in-memory bus.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("event payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("event channel closed")]
    Closed,
}

/// A raw notification as delivered to a consumer.
#[derive(Debug, Clone)]
pub struct IncomingEvent {
    pub channel: String,
    pub payload: String,
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), EventError>;
}

#[async_trait]
pub trait EventSource: Send {
    /// Next notification, or [`EventError::Closed`] once the source is
    /// permanently done.
    async fn recv(&mut self) -> Result<IncomingEvent, EventError>;
}

/// Serialize and publish a typed event.
pub async fn publish_event<P, T>(publisher: &P, channel: &str, event: &T) -> Result<(), EventError>
where
    P: EventPublisher + ?Sized,
    T: Serialize + Sync,
{
    let payload = serde_json::to_string(event)?;
    publisher.publish(channel, &payload).await
}

/// Publisher backed by Postgres `NOTIFY`.
#[derive(Clone)]
pub struct PgEventBus {
    pool: PgPool,
}

impl PgEventBus {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventPublisher for PgEventBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), EventError> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(channel)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Consumer backed by a dedicated Postgres `LISTEN` connection.
pub struct PgEventSource {
    listener: PgListener,
}

impl PgEventSource {
    pub async fn connect(pool: &PgPool, channels: &[&str]) -> Result<Self, EventError> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen_all(channels.iter().copied()).await?;
        Ok(Self { listener })
    }
}

#[async_trait]
impl EventSource for PgEventSource {
    async fn recv(&mut self) -> Result<IncomingEvent, EventError> {
        let notification = self.listener.recv().await?;
        Ok(IncomingEvent {
            channel: notification.channel().to_owned(),
            payload: notification.payload().to_owned(),
        })
    }
}
