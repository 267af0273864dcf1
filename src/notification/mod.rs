use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cif::CifId;
use crate::typedid::{TypedId, TypedIdMarker};
use crate::user::UserId;

pub mod db;
pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type NotificationId = TypedId<Notification>;

// A campaign targeting a set of cifs. `cif_ids` holds references into the
// shared cif collection, never the raw values, and contains no duplicates.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: NotificationId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub schedule: DateTime<Utc>,
    pub status: NotificationStatus,
    pub created_by: UserId,
    pub cif_ids: Vec<CifId>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub modified_at: DateTime<Utc>,
}

impl TypedIdMarker for Notification {
    fn tag() -> &'static str {
        "NTF"
    }
}

// SCHEDULED becomes SENT once the sweep dispatches it. DRAFT never advances
// on its own and SENT is terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum NotificationStatus {
    Draft,
    Scheduled,
    Sent,
}

// The user-supplied half of an import, paired with a spreadsheet by the
// orchestrator.
#[derive(Clone, Debug)]
pub struct NotificationDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub schedule: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct NotificationChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub schedule: Option<DateTime<Utc>>,
}

// Tags behave as an ordered set. Whitespace is trimmed, blanks are dropped
// and the first occurrence of a repeat wins.
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}
