use std::io::Write;

use actix_multipart::{Field, Multipart};
use actix_web::web::{Data, Json, Path, Query};
use actix_web::{delete, get, post, put, HttpResponse};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::auth::Identity;
use crate::database::Database;
use crate::error::Error;
use crate::user::UserId;

use super::{
    manager, Notification, NotificationChanges, NotificationDraft, NotificationId,
    NotificationStatus,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NotificationBody {
    pub id: NotificationId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub schedule: DateTime<Utc>,
    pub status: NotificationStatus,
    pub created_by: UserId,
    pub cif_count: usize,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl NotificationBody {
    pub fn render(notification: Notification) -> NotificationBody {
        NotificationBody {
            id: notification.id,
            title: notification.title,
            content: notification.content,
            tags: notification.tags,
            schedule: notification.schedule,
            status: notification.status,
            created_by: notification.created_by,
            cif_count: notification.cif_ids.len(),
            created_at: notification.created_at,
            modified_at: notification.modified_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ImportNotificationBody {
    pub notification: NotificationBody,
    pub added_count: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NotificationListBody {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub data: Vec<NotificationBody>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UpdateNotificationBody {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub schedule: Option<DateTime<Utc>>,
}

#[post("/notifications/upload")]
#[tracing::instrument(skip(db, payload))]
async fn upload_notification(
    db: Data<Box<dyn Database>>,
    identity: Identity,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let form = UploadForm::receive(payload).await?;

    let sheet = form.file.ok_or(Error::MissingUploadField { field: "file" })?;
    let draft = NotificationDraft {
        title: require_text(form.title, "title")?,
        content: require_text(form.content, "content")?,
        tags: form
            .tags
            .map(|raw| raw.split(',').map(str::to_string).collect())
            .unwrap_or_default(),
        schedule: parse_schedule(form.schedule)?,
    };

    let (notification, added_count) =
        manager::import_notification(db.get_ref().as_ref(), identity.user_id, draft, sheet)
            .await?;

    Ok(HttpResponse::Created().json(ImportNotificationBody {
        notification: NotificationBody::render(notification),
        added_count,
    }))
}

#[get("/notifications")]
#[tracing::instrument(skip(db))]
async fn get_notifications(
    db: Data<Box<dyn Database>>,
    identity: Identity,
    query: Query<ListNotificationsQuery>,
) -> Result<Json<NotificationListBody>, Error> {
    let query = query.into_inner();

    let page = manager::list_notifications(
        db.get_ref().as_ref(),
        identity.user_id,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(10),
    )
    .await?;

    Ok(Json(NotificationListBody {
        total: page.total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages,
        data: page
            .notifications
            .into_iter()
            .map(NotificationBody::render)
            .collect(),
    }))
}

#[get("/notifications/{notification_id}")]
#[tracing::instrument(skip(db))]
async fn get_notification_by_id(
    db: Data<Box<dyn Database>>,
    identity: Identity,
    params: Path<NotificationId>,
) -> Result<Json<NotificationBody>, Error> {
    let notification_id = params.into_inner();

    let notification =
        manager::get_notification(db.get_ref().as_ref(), identity.user_id, notification_id)
            .await?;

    Ok(Json(NotificationBody::render(notification)))
}

#[put("/notifications/{notification_id}")]
#[tracing::instrument(skip(db))]
async fn update_notification(
    db: Data<Box<dyn Database>>,
    identity: Identity,
    params: Path<NotificationId>,
    body: Json<UpdateNotificationBody>,
) -> Result<Json<NotificationBody>, Error> {
    let notification_id = params.into_inner();
    let body = body.into_inner();

    let changes = NotificationChanges {
        title: body.title,
        content: body.content,
        tags: body.tags,
        schedule: body.schedule,
    };

    let notification = manager::update_notification(
        db.get_ref().as_ref(),
        identity.user_id,
        notification_id,
        changes,
    )
    .await?;

    Ok(Json(NotificationBody::render(notification)))
}

#[delete("/notifications/{notification_id}")]
#[tracing::instrument(skip(db))]
async fn delete_notification(
    db: Data<Box<dyn Database>>,
    identity: Identity,
    params: Path<NotificationId>,
) -> Result<HttpResponse, Error> {
    let notification_id = params.into_inner();

    manager::delete_notification(db.get_ref().as_ref(), identity.user_id, notification_id)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

struct UploadForm {
    file: Option<NamedTempFile>,
    title: Option<String>,
    content: Option<String>,
    tags: Option<String>,
    schedule: Option<String>,
}

impl UploadForm {
    // Spools the file part to a temp file and buffers the text parts.
    // Unknown parts are drained and dropped.
    async fn receive(mut payload: Multipart) -> Result<UploadForm, Error> {
        let mut form = UploadForm {
            file: None,
            title: None,
            content: None,
            tags: None,
            schedule: None,
        };

        while let Some(mut field) = payload.try_next().await.map_err(Error::InvalidMultipart)? {
            let name = field.name().to_string();
            match name.as_str() {
                "file" => {
                    let mut sheet = NamedTempFile::new()?;
                    while let Some(chunk) =
                        field.try_next().await.map_err(Error::InvalidMultipart)?
                    {
                        sheet.write_all(&chunk)?;
                    }
                    form.file = Some(sheet);
                }
                "title" => form.title = Some(read_text(&mut field, "title").await?),
                "content" => form.content = Some(read_text(&mut field, "content").await?),
                "tags" => form.tags = Some(read_text(&mut field, "tags").await?),
                "schedule" => form.schedule = Some(read_text(&mut field, "schedule").await?),
                _ => {
                    while field
                        .try_next()
                        .await
                        .map_err(Error::InvalidMultipart)?
                        .is_some()
                    {}
                }
            }
        }

        Ok(form)
    }
}

async fn read_text(field: &mut Field, name: &'static str) -> Result<String, Error> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(Error::InvalidMultipart)? {
        data.extend_from_slice(&chunk);
    }

    String::from_utf8(data).map_err(|_| Error::InvalidUploadField {
        field: name,
        reason: "field is not valid utf-8".to_string(),
    })
}

fn require_text(value: Option<String>, name: &'static str) -> Result<String, Error> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::MissingUploadField { field: name }),
    }
}

fn parse_schedule(value: Option<String>) -> Result<DateTime<Utc>, Error> {
    let raw = value.ok_or(Error::MissingUploadField { field: "schedule" })?;

    let schedule = DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|err| Error::InvalidUploadField {
            field: "schedule",
            reason: err.to_string(),
        })?
        .with_timezone(&Utc);

    Ok(schedule)
}

#[cfg(test)]
mod test {
    use super::{parse_schedule, require_text};
    use crate::error::Error;

    #[test]
    fn parse_schedule_accepts_rfc3339_and_normalizes_to_utc() {
        let schedule = parse_schedule(Some("2026-09-01T08:30:00+02:00".to_string())).unwrap();

        assert_eq!(schedule.to_rfc3339(), "2026-09-01T06:30:00+00:00");
    }

    #[test]
    fn parse_schedule_rejects_other_formats() {
        let result = parse_schedule(Some("tomorrow at noon".to_string()));

        assert!(matches!(
            result,
            Err(Error::InvalidUploadField { field: "schedule", .. })
        ));
    }

    #[test]
    fn require_text_rejects_missing_and_blank_fields() {
        assert_eq!(
            require_text(None, "title").unwrap_err(),
            Error::MissingUploadField { field: "title" }
        );
        assert_eq!(
            require_text(Some("   ".to_string()), "title").unwrap_err(),
            Error::MissingUploadField { field: "title" }
        );
        assert_eq!(require_text(Some("ok".to_string()), "title").unwrap(), "ok");
    }
}
