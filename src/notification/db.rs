use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson;
use mongodb::options::FindOptions;

use crate::database::MongoNotificationStore;
use crate::error::Error;
use crate::user::UserId;

use super::{Notification, NotificationChanges, NotificationId, NotificationStatus};

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> Result<(), Error>;

    async fn fetch_notifications_by_owner(
        &self,
        owner: UserId,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Notification>, Error>;

    async fn count_notifications_by_owner(&self, owner: UserId) -> Result<u64, Error>;

    async fn fetch_notification_by_id_and_owner(
        &self,
        notification_id: NotificationId,
        owner: UserId,
    ) -> Result<Option<Notification>, Error>;

    async fn update_notification_content(
        &self,
        notification: Notification,
        changes: NotificationChanges,
    ) -> Result<Notification, Error>;

    async fn delete_notification_by_id_and_owner(
        &self,
        notification_id: NotificationId,
        owner: UserId,
    ) -> Result<bool, Error>;

    async fn fetch_due_notifications(
        &self,
        due_at: DateTime<Utc>,
    ) -> Result<Vec<Notification>, Error>;

    async fn update_notification_status(
        &self,
        notification: Notification,
        status: NotificationStatus,
    ) -> Result<Notification, Error>;
}

#[async_trait]
impl NotificationStore for MongoNotificationStore {
    #[tracing::instrument(skip(self))]
    async fn insert_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.insert_one(notification, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_notifications_by_owner(
        &self,
        owner: UserId,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Notification>, Error> {
        let options = FindOptions::builder()
            .sort(bson::doc! { "created_at": -1 })
            .skip(skip)
            .limit(limit)
            .build();

        let notifications: Vec<Notification> = self
            .find(bson::doc! { "created_by": owner }, options)
            .await?
            .try_collect()
            .await?;

        Ok(notifications)
    }

    #[tracing::instrument(skip(self))]
    async fn count_notifications_by_owner(&self, owner: UserId) -> Result<u64, Error> {
        let total = self
            .count_documents(bson::doc! { "created_by": owner }, None)
            .await?;

        Ok(total)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_notification_by_id_and_owner(
        &self,
        notification_id: NotificationId,
        owner: UserId,
    ) -> Result<Option<Notification>, Error> {
        let notification: Option<Notification> = self
            .find_one(
                bson::doc! { "_id": notification_id, "created_by": owner },
                None,
            )
            .await?;

        Ok(notification)
    }

    #[tracing::instrument(skip(self))]
    async fn update_notification_content(
        &self,
        mut notification: Notification,
        changes: NotificationChanges,
    ) -> Result<Notification, Error> {
        let now = Utc::now();
        let old_modified_at = bson::DateTime::from_chrono(notification.modified_at);
        let new_modified_at = bson::DateTime::from_chrono(now);

        let mut fields = bson::doc! { "modified_at": new_modified_at };
        if let Some(title) = &changes.title {
            fields.insert("title", title.clone());
        }
        if let Some(content) = &changes.content {
            fields.insert("content", content.clone());
        }
        if let Some(tags) = &changes.tags {
            fields.insert("tags", tags.clone());
        }
        if let Some(schedule) = &changes.schedule {
            fields.insert("schedule", bson::DateTime::from_chrono(*schedule));
        }

        let result = self
            .update_one(
                bson::doc! { "_id": notification.id, "modified_at": old_modified_at },
                bson::doc! { "$set": fields },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Error::ConcurrentModificationDetected);
        }

        notification.modified_at = now;
        if let Some(title) = changes.title {
            notification.title = title;
        }
        if let Some(content) = changes.content {
            notification.content = content;
        }
        if let Some(tags) = changes.tags {
            notification.tags = tags;
        }
        if let Some(schedule) = changes.schedule {
            notification.schedule = schedule;
        }

        Ok(notification)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_notification_by_id_and_owner(
        &self,
        notification_id: NotificationId,
        owner: UserId,
    ) -> Result<bool, Error> {
        let result = self
            .delete_one(
                bson::doc! { "_id": notification_id, "created_by": owner },
                None,
            )
            .await?;

        Ok(result.deleted_count > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_due_notifications(
        &self,
        due_at: DateTime<Utc>,
    ) -> Result<Vec<Notification>, Error> {
        let filter = bson::doc! {
            "status": "SCHEDULED",
            "schedule": { "$lte": bson::DateTime::from_chrono(due_at) },
        };

        let notifications: Vec<Notification> =
            self.find(filter, None).await?.try_collect().await?;

        Ok(notifications)
    }

    #[tracing::instrument(skip(self))]
    async fn update_notification_status(
        &self,
        mut notification: Notification,
        status: NotificationStatus,
    ) -> Result<Notification, Error> {
        let now = Utc::now();
        let old_modified_at = bson::DateTime::from_chrono(notification.modified_at);
        let new_modified_at = bson::DateTime::from_chrono(now);
        let new_status = bson::to_bson(&status)?;

        let result = self
            .update_one(
                bson::doc! { "_id": notification.id, "modified_at": old_modified_at },
                bson::doc! { "$set": { "status": new_status, "modified_at": new_modified_at } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Error::ConcurrentModificationDetected);
        }

        notification.modified_at = now;
        notification.status = status;

        Ok(notification)
    }
}
