use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::cif::manager::resolve_cif;
use crate::cif::CifId;
use crate::database::Database;
use crate::error::Error;
use crate::spreadsheet;
use crate::user::UserId;

use super::{
    normalize_tags, Notification, NotificationChanges, NotificationDraft, NotificationId,
    NotificationStatus,
};

// Builds one notification out of an uploaded spreadsheet: extract the cif
// values, resolve each to its shared record, then write the notification in
// a single insert so readers never see it without its full cif set. The
// second value counts how many cif records this import created.
#[tracing::instrument(skip(db, sheet))]
pub async fn import_notification(
    db: &dyn Database,
    owner: UserId,
    draft: NotificationDraft,
    sheet: NamedTempFile,
) -> Result<(Notification, u64), Error> {
    let values = spreadsheet::extract_cifs(sheet.reopen()?)?;

    // The upload is spent once extraction succeeds. Failing the import over
    // a leftover temp file is not worth it.
    if let Err(err) = sheet.close() {
        warn!(error = %err, "failed to remove uploaded spreadsheet");
    }

    let mut cif_ids: Vec<CifId> = Vec::with_capacity(values.len());
    let mut added_count = 0;
    for value in values {
        let (cif, created) = resolve_cif(db, value).await?;
        if created {
            added_count += 1;
        }
        // Extraction already deduplicated the values, so the ids are
        // distinct too.
        cif_ids.push(cif.id);
    }

    let now = Utc::now();
    let notification = Notification {
        id: NotificationId::new(),
        title: draft.title,
        content: draft.content,
        tags: normalize_tags(draft.tags),
        schedule: draft.schedule,
        status: NotificationStatus::Scheduled,
        created_by: owner,
        cif_ids,
        created_at: now,
        modified_at: now,
    };

    db.notifications().insert_notification(&notification).await?;

    Ok((notification, added_count))
}

pub struct NotificationPage {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub notifications: Vec<Notification>,
}

#[tracing::instrument(skip(db))]
pub async fn list_notifications(
    db: &dyn Database,
    owner: UserId,
    page: u32,
    limit: u32,
) -> Result<NotificationPage, Error> {
    let page = page.max(1);
    let limit = limit.max(1);
    let skip = u64::from(page - 1) * u64::from(limit);

    let notifications = db
        .notifications()
        .fetch_notifications_by_owner(owner, skip, i64::from(limit))
        .await?;
    let total = db.notifications().count_notifications_by_owner(owner).await?;
    let total_pages = ((total + u64::from(limit) - 1) / u64::from(limit)) as u32;

    Ok(NotificationPage {
        total,
        page,
        limit,
        total_pages,
        notifications,
    })
}

#[tracing::instrument(skip(db))]
pub async fn get_notification(
    db: &dyn Database,
    owner: UserId,
    notification_id: NotificationId,
) -> Result<Notification, Error> {
    let notification = db
        .notifications()
        .fetch_notification_by_id_and_owner(notification_id, owner)
        .await?
        .ok_or(Error::NotificationNotFound { notification_id })?;

    Ok(notification)
}

// Content-only updates: status and the cif set are off limits here. A
// notification owned by someone else reads as absent, not forbidden.
#[tracing::instrument(skip(db))]
pub async fn update_notification(
    db: &dyn Database,
    owner: UserId,
    notification_id: NotificationId,
    mut changes: NotificationChanges,
) -> Result<Notification, Error> {
    let notification = db
        .notifications()
        .fetch_notification_by_id_and_owner(notification_id, owner)
        .await?
        .ok_or(Error::NotificationNotFound { notification_id })?;

    if let Some(tags) = changes.tags {
        changes.tags = Some(normalize_tags(tags));
    }

    let notification = db
        .notifications()
        .update_notification_content(notification, changes)
        .await?;

    Ok(notification)
}

#[tracing::instrument(skip(db))]
pub async fn delete_notification(
    db: &dyn Database,
    owner: UserId,
    notification_id: NotificationId,
) -> Result<(), Error> {
    let deleted = db
        .notifications()
        .delete_notification_by_id_and_owner(notification_id, owner)
        .await?;

    if !deleted {
        return Err(Error::NotificationNotFound { notification_id });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test::MockDatabase;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn sheet_with(contents: &str) -> NamedTempFile {
        let mut sheet = NamedTempFile::new().unwrap();
        sheet.write_all(contents.as_bytes()).unwrap();
        sheet
    }

    fn draft() -> NotificationDraft {
        NotificationDraft {
            title: "Summer promo".to_string(),
            content: "A new offer is waiting for you".to_string(),
            tags: vec!["promo".to_string(), "summer".to_string()],
            schedule: Utc::now(),
        }
    }

    #[tokio::test]
    async fn import_notification_resolves_and_counts_new_cifs() {
        let mut db = MockDatabase::new();
        db.cifs.on_fetch_cif_by_digest = Box::new(|_| Ok(None));
        db.cifs.on_insert_cif = Box::new(|_| Ok(()));
        let inserted = Arc::new(Mutex::new(None));
        let inserted_clone = Arc::clone(&inserted);
        db.notifications.on_insert_notification = Box::new(move |notification| {
            *inserted_clone.lock().unwrap() = Some(notification.clone());
            Ok(())
        });

        let owner = UserId::new();
        let sheet = sheet_with("12345678,12345678\n87654321\n");

        let (notification, added_count) = import_notification(&db, owner, draft(), sheet)
            .await
            .unwrap();

        assert_eq!(added_count, 2);
        assert_eq!(notification.cif_ids.len(), 2);
        assert_eq!(notification.status, NotificationStatus::Scheduled);
        assert_eq!(notification.created_by, owner);
        assert_eq!(notification.created_at, notification.modified_at);

        let inserted = inserted.lock().unwrap().clone().expect("nothing inserted");
        assert_eq!(inserted.cif_ids, notification.cif_ids);
    }

    #[tokio::test]
    async fn import_notification_does_not_count_known_cifs() {
        let mut db = MockDatabase::new();
        db.cifs.on_fetch_cif_by_digest = Box::new(|digest| {
            Ok(Some(crate::cif::Cif {
                id: CifId::new(),
                value: "known".to_string(),
                digest: digest.to_string(),
                created_at: Utc::now(),
            }))
        });
        db.cifs.on_insert_cif = Box::new(|_| panic!("known cifs should not be inserted"));
        db.notifications.on_insert_notification = Box::new(|_| Ok(()));

        let sheet = sheet_with("12345678\n87654321\n");

        let (notification, added_count) = import_notification(&db, UserId::new(), draft(), sheet)
            .await
            .unwrap();

        assert_eq!(added_count, 0);
        assert_eq!(notification.cif_ids.len(), 2);
    }

    #[tokio::test]
    async fn import_notification_rejects_a_sheet_with_no_cifs() {
        let mut db = MockDatabase::new();
        db.notifications.on_insert_notification =
            Box::new(|_| panic!("nothing should be inserted"));

        let sheet = sheet_with("name,age\nAda,36\n");

        let result = import_notification(&db, UserId::new(), draft(), sheet).await;

        assert_eq!(result.unwrap_err(), Error::NoCifsFound);
    }

    #[tokio::test]
    async fn import_notification_stops_when_a_resolve_fails() {
        let mut db = MockDatabase::new();
        let resolves = Arc::new(Mutex::new(0));
        let resolves_clone = Arc::clone(&resolves);
        db.cifs.on_fetch_cif_by_digest = Box::new(move |_| {
            let mut resolves = resolves_clone.lock().unwrap();
            *resolves += 1;
            if *resolves == 2 {
                Err(Error::ExistentialState("cif lookup exploded".to_string()))
            } else {
                Ok(None)
            }
        });
        db.cifs.on_insert_cif = Box::new(|_| Ok(()));
        db.notifications.on_insert_notification =
            Box::new(|_| panic!("a failed import must not insert"));

        let sheet = sheet_with("11111111\n22222222\n33333333\n");

        let result = import_notification(&db, UserId::new(), draft(), sheet).await;

        assert!(matches!(result, Err(Error::ExistentialState(_))));
        assert_eq!(*resolves.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn import_notification_removes_the_uploaded_sheet() {
        let mut db = MockDatabase::new();
        db.cifs.on_fetch_cif_by_digest = Box::new(|_| Ok(None));
        db.cifs.on_insert_cif = Box::new(|_| Ok(()));
        db.notifications.on_insert_notification = Box::new(|_| Ok(()));

        let sheet = sheet_with("12345678\n");
        let path = sheet.path().to_path_buf();
        assert!(path.exists());

        import_notification(&db, UserId::new(), draft(), sheet)
            .await
            .unwrap();

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn list_notifications_pages_by_skip_and_limit() {
        let mut db = MockDatabase::new();
        let requested = Arc::new(Mutex::new(None));
        let requested_clone = Arc::clone(&requested);
        db.notifications.on_fetch_notifications_by_owner =
            Box::new(move |_, skip, limit| {
                *requested_clone.lock().unwrap() = Some((skip, limit));
                Ok(Vec::new())
            });
        db.notifications.on_count_notifications_by_owner = Box::new(|_| Ok(21));

        let page = list_notifications(&db, UserId::new(), 3, 10).await.unwrap();

        assert_eq!(*requested.lock().unwrap(), Some((20, 10)));
        assert_eq!(page.total, 21);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 3);
        assert_eq!(page.limit, 10);
    }

    #[tokio::test]
    async fn get_notification_reports_missing_or_foreign_ids_as_not_found() {
        let mut db = MockDatabase::new();
        db.notifications.on_fetch_notification_by_id_and_owner = Box::new(|_, _| Ok(None));

        let notification_id = NotificationId::new();
        let result = get_notification(&db, UserId::new(), notification_id).await;

        assert_eq!(
            result.unwrap_err(),
            Error::NotificationNotFound { notification_id }
        );
    }

    #[tokio::test]
    async fn update_notification_normalizes_tags_before_writing() {
        let mut db = MockDatabase::new();
        let owner = UserId::new();
        let notification_id = NotificationId::new();
        db.notifications.on_fetch_notification_by_id_and_owner =
            Box::new(move |id, by| {
                let now = Utc::now();
                Ok(Some(Notification {
                    id,
                    title: "old".to_string(),
                    content: "old".to_string(),
                    tags: Vec::new(),
                    schedule: now,
                    status: NotificationStatus::Scheduled,
                    created_by: by,
                    cif_ids: Vec::new(),
                    created_at: now,
                    modified_at: now,
                }))
            });
        let written = Arc::new(Mutex::new(None));
        let written_clone = Arc::clone(&written);
        db.notifications.on_update_notification_content =
            Box::new(move |notification, changes| {
                *written_clone.lock().unwrap() = changes.tags.clone();
                Ok(notification)
            });

        let changes = NotificationChanges {
            tags: Some(vec![" promo ".to_string(), "promo".to_string()]),
            ..NotificationChanges::default()
        };
        update_notification(&db, owner, notification_id, changes)
            .await
            .unwrap();

        assert_eq!(*written.lock().unwrap(), Some(vec!["promo".to_string()]));
    }

    #[tokio::test]
    async fn delete_notification_reports_missing_ids_as_not_found() {
        let mut db = MockDatabase::new();
        db.notifications.on_delete_notification_by_id_and_owner = Box::new(|_, _| Ok(false));

        let notification_id = NotificationId::new();
        let result = delete_notification(&db, UserId::new(), notification_id).await;

        assert_eq!(
            result.unwrap_err(),
            Error::NotificationNotFound { notification_id }
        );
    }
}
