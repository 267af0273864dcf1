use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod manager;

pub type CifId = TypedId<Cif>;

// A customer identifier. Exactly one record exists per distinct value
// system-wide; records are immutable once written and are shared by every
// notification that targets the value.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Cif {
    #[serde(rename = "_id")]
    pub id: CifId,
    pub value: String,
    pub digest: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl TypedIdMarker for Cif {
    fn tag() -> &'static str {
        "CIF"
    }
}
