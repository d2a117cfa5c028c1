use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::db::queries;
use crate::models::{NotificationEvent, StoredNotification};

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn enqueue(&self, event: &NotificationEvent) -> anyhow::Result<()>;
}

/// Hands events to the sink one by one. Failures are logged and dropped:
/// the booking change they describe has already been committed.
pub async fn dispatch(sink: &dyn NotificationSink, events: &[NotificationEvent]) {
    for event in events {
        if let Err(e) = sink.enqueue(event).await {
            tracing::error!(
                error = %e,
                recipient_id = %event.recipient_id,
                booking_id = %event.booking_id,
                kind = event.kind.as_str(),
                "failed to enqueue notification"
            );
        }
    }
}

/// Stores notifications and fans them out to live subscribers.
pub struct SqliteNotificationSink {
    db: Arc<Mutex<Connection>>,
    tx: broadcast::Sender<StoredNotification>,
}

impl SqliteNotificationSink {
    pub fn new(db: Arc<Mutex<Connection>>, tx: broadcast::Sender<StoredNotification>) -> Self {
        Self { db, tx }
    }
}

#[async_trait]
impl NotificationSink for SqliteNotificationSink {
    async fn enqueue(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        let id = {
            let db = self
                .db
                .lock()
                .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
            queries::insert_notification(&db, event)?
        };

        let stored = StoredNotification {
            id,
            event: event.clone(),
            created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        // No subscribers is fine; the row is already persisted.
        let _ = self.tx.send(stored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::NotificationType;

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn enqueue(&self, _event: &NotificationEvent) -> anyhow::Result<()> {
            anyhow::bail!("smtp down")
        }
    }

    fn event(recipient: &str) -> NotificationEvent {
        NotificationEvent {
            recipient_id: recipient.to_string(),
            kind: NotificationType::NewBooking,
            message: "New booking request for oil change".to_string(),
            booking_id: "b1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_sink_persists_and_broadcasts() {
        let conn = Arc::new(Mutex::new(db::init_db(":memory:").unwrap()));
        let (tx, mut rx) = broadcast::channel(8);
        let sink = SqliteNotificationSink::new(Arc::clone(&conn), tx);

        dispatch(&sink, &[event("m1"), event("m2")]).await;

        let live = rx.recv().await.unwrap();
        assert_eq!(live.event.recipient_id, "m1");

        let stored = queries::get_notifications_since(&conn.lock().unwrap(), "m2", 0).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].event.kind, NotificationType::NewBooking);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_sink_errors() {
        // must not panic or propagate
        dispatch(&FailingSink, &[event("m1")]).await;
    }
}
