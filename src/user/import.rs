use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::database::Database;
use crate::error::Error;

use super::{User, UserId};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

// One row of a bulk-import sheet. Passwords arrive pre-hashed; this path
// never sees plaintext.
#[derive(Clone, Debug, Deserialize)]
pub struct UserRow {
    pub username: String,
    pub password_hash: String,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ImportSummary {
    pub batches: usize,
    pub inserted: usize,
}

pub fn read_user_rows(
    path: &Path,
) -> Result<impl Iterator<Item = Result<UserRow, Error>>, Error> {
    let file = File::open(path)?;
    let reader = csv::Reader::from_reader(file);

    Ok(reader
        .into_deserialize::<UserRow>()
        .map(|row| row.map_err(Error::MalformedSpreadsheet)))
}

// Drains the row source into batches and hands each batch to its own
// worker task. Exactly one worker runs at a time; its report is awaited
// before the next batch is cut. The first failure, whether a bad row or a
// failed insert, stops the run with nothing further submitted.
#[tracing::instrument(skip(db, rows))]
pub async fn import_users(
    db: Arc<dyn Database>,
    rows: impl Iterator<Item = Result<UserRow, Error>>,
    batch_size: usize,
) -> Result<ImportSummary, Error> {
    let mut summary = ImportSummary::default();
    let mut batch = Vec::with_capacity(batch_size);

    for row in rows {
        batch.push(row?);
        if batch.len() == batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            summary.inserted += run_batch(&db, summary.batches + 1, full).await?;
            summary.batches += 1;
        }
    }

    if !batch.is_empty() {
        summary.inserted += run_batch(&db, summary.batches + 1, batch).await?;
        summary.batches += 1;
    }

    Ok(summary)
}

async fn run_batch(
    db: &Arc<dyn Database>,
    batch: usize,
    rows: Vec<UserRow>,
) -> Result<usize, Error> {
    let db = Arc::clone(db);
    let worker = tokio::spawn(async move {
        let now = Utc::now();
        let users: Vec<User> = rows
            .into_iter()
            .map(|row| User {
                id: UserId::new(),
                username: row.username,
                password_hash: row.password_hash,
                created_at: now,
            })
            .collect();

        db.users().insert_users(&users).await
    });

    match worker.await {
        Ok(Ok(inserted)) => {
            info!(batch, inserted, "batch inserted");
            Ok(inserted)
        }
        Ok(Err(err)) => Err(Error::BatchInsertFailed {
            batch,
            reason: err.to_string(),
        }),
        Err(err) => Err(Error::BatchInsertFailed {
            batch,
            reason: err.to_string(),
        }),
    }
}
