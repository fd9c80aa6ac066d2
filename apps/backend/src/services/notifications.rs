//! Notification dispatch for track request events.
//!
//! Dispatch happens after the triggering state change has committed. A failed
//! dispatch is logged and never undoes that change.

use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::models::NotificationVerb;
use crate::db::queries;
use crate::error::Result;

/// One event to deliver to a user's inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationEvent {
    pub actor_id: i64,
    pub recipient_id: i64,
    pub verb: NotificationVerb,
    /// Track request the event is about.
    pub action_object_id: i64,
    /// Song the track request targets.
    pub target_id: i64,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> Result<()>;
}

/// Persists notifications into the `notifications` table.
pub struct DbNotifier {
    db: Arc<Mutex<Connection>>,
}

impl DbNotifier {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Notifier for DbNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<()> {
        let conn = self.db.lock().await;
        let id = queries::insert_notification(
            &conn,
            event.actor_id,
            event.recipient_id,
            event.verb,
            Some(event.action_object_id),
            Some(event.target_id),
        )?;
        tracing::debug!(
            notification_id = id,
            recipient_id = event.recipient_id,
            verb = %event.verb,
            "Notification stored"
        );
        Ok(())
    }
}

/// Sends `event`, logging instead of propagating failures.
pub async fn dispatch(notifier: &dyn Notifier, event: NotificationEvent) {
    if let Err(e) = notifier.notify(event).await {
        tracing::warn!(
            recipient_id = event.recipient_id,
            verb = %event.verb,
            error = %e,
            "Failed to deliver notification"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db_memory;
    use crate::error::AppError;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _event: NotificationEvent) -> Result<()> {
            Err(AppError::Internal("inbox offline".to_string()))
        }
    }

    fn event(recipient_id: i64) -> NotificationEvent {
        NotificationEvent {
            actor_id: 1,
            recipient_id,
            verb: NotificationVerb::TrackRequestPending,
            action_object_id: 10,
            target_id: 20,
        }
    }

    #[tokio::test]
    async fn test_db_notifier_persists_event() {
        let conn = init_db_memory().unwrap();
        conn.execute_batch(
            "INSERT INTO users (username, password_hash) VALUES ('alice', 'x'), ('bob', 'x');",
        )
        .unwrap();
        let db = Arc::new(Mutex::new(conn));
        let notifier = DbNotifier::new(Arc::clone(&db));

        notifier.notify(event(2)).await.unwrap();

        let conn = db.lock().await;
        let inbox = queries::list_notifications(&conn, 2, true).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].verb, NotificationVerb::TrackRequestPending);
        assert_eq!(inbox[0].action_object_id, Some(10));
        assert_eq!(inbox[0].target_id, Some(20));
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        dispatch(&FailingNotifier, event(2)).await;
    }
}
