use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::database::Database;
use crate::error::Error;
use crate::notification::NotificationStatus;

// Runs the scheduled-to-sent sweep forever. One task, one tick at a time,
// so sweeps never overlap; a failed tick is logged and the next tick tries
// again. Safe to re-run because the due query only sees SCHEDULED rows.
pub async fn run_sweep(db: Box<dyn Database>, interval: Duration) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match sweep_once(db.as_ref(), Utc::now()).await {
            Ok(0) => {}
            Ok(sent) => info!(sent, "dispatched due notifications"),
            Err(err) => warn!(error = %err, "sweep failed, retrying next tick"),
        }
    }
}

// One pass: everything SCHEDULED with schedule <= now flips to SENT.
// Dispatch itself is an external concern; the log line is the hand-off.
#[tracing::instrument(skip(db))]
pub async fn sweep_once(db: &dyn Database, now: DateTime<Utc>) -> Result<usize, Error> {
    let due = db.notifications().fetch_due_notifications(now).await?;

    let mut sent = 0;
    for notification in due {
        info!(
            notification_id = %notification.id,
            title = %notification.title,
            cifs = notification.cif_ids.len(),
            "notification due, dispatching"
        );

        db.notifications()
            .update_notification_status(notification, NotificationStatus::Sent)
            .await?;
        sent += 1;
    }

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cif::CifId;
    use crate::database::test::MockDatabase;
    use crate::notification::{Notification, NotificationId};
    use crate::user::UserId;
    use std::sync::{Arc, Mutex};

    fn scheduled(at: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::new(),
            title: "Summer promo".to_string(),
            content: "A new offer is waiting for you".to_string(),
            tags: Vec::new(),
            schedule: at,
            status: NotificationStatus::Scheduled,
            created_by: UserId::new(),
            cif_ids: vec![CifId::new()],
            created_at: at,
            modified_at: at,
        }
    }

    #[tokio::test]
    async fn sweep_once_flips_every_due_notification_to_sent() {
        let mut db = MockDatabase::new();
        let now = Utc::now();
        let first = scheduled(now - chrono::Duration::minutes(5));
        let second = scheduled(now - chrono::Duration::minutes(1));
        let due = vec![first.clone(), second.clone()];
        db.notifications.on_fetch_due_notifications = Box::new(move |cutoff| {
            assert_eq!(cutoff, now);
            Ok(due.clone())
        });
        let flipped = Arc::new(Mutex::new(Vec::new()));
        let flipped_clone = Arc::clone(&flipped);
        db.notifications.on_update_notification_status =
            Box::new(move |mut notification, status| {
                assert_eq!(status, NotificationStatus::Sent);
                flipped_clone.lock().unwrap().push(notification.id);
                notification.status = status;
                Ok(notification)
            });

        let sent = sweep_once(&db, now).await.unwrap();

        assert_eq!(sent, 2);
        assert_eq!(*flipped.lock().unwrap(), vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn sweep_once_does_nothing_when_nothing_is_due() {
        let mut db = MockDatabase::new();
        db.notifications.on_fetch_due_notifications = Box::new(|_| Ok(Vec::new()));
        db.notifications.on_update_notification_status =
            Box::new(|_, _| panic!("nothing should be updated"));

        let sent = sweep_once(&db, Utc::now()).await.unwrap();

        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn sweep_once_surfaces_update_failures() {
        let mut db = MockDatabase::new();
        let now = Utc::now();
        db.notifications.on_fetch_due_notifications =
            Box::new(move |_| Ok(vec![scheduled(now)]));
        db.notifications.on_update_notification_status =
            Box::new(|_, _| Err(Error::ConcurrentModificationDetected));

        let result = sweep_once(&db, now).await;

        assert_eq!(result.unwrap_err(), Error::ConcurrentModificationDetected);
    }
}
