use async_trait::async_trait;
use mongodb::bson;
use mongodb::error::{ErrorKind, WriteFailure};

use crate::database::MongoCifStore;
use crate::error::Error;

use super::Cif;

#[async_trait]
pub trait CifStore: Send + Sync {
    async fn fetch_cif_by_digest(&self, digest: &str) -> Result<Option<Cif>, Error>;

    async fn insert_cif(&self, cif: &Cif) -> Result<(), Error>;
}

#[async_trait]
impl CifStore for MongoCifStore {
    #[tracing::instrument(skip(self))]
    async fn fetch_cif_by_digest(&self, digest: &str) -> Result<Option<Cif>, Error> {
        let cif: Option<Cif> = self.find_one(bson::doc! { "digest": digest }, None).await?;

        Ok(cif)
    }

    #[tracing::instrument(skip(self))]
    async fn insert_cif(&self, cif: &Cif) -> Result<(), Error> {
        self.insert_one(cif, None).await.map_err(|err| {
            // The cifs collection has a unique index on `digest`; losing an
            // insert race surfaces here instead of as a generic failure.
            if is_duplicate_key(&err) {
                Error::DuplicateCifDigest {
                    digest: cif.digest.clone(),
                }
            } else {
                Error::FailedDatabaseCall(err)
            }
        })?;

        Ok(())
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    match &*error.kind {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .iter()
            .flatten()
            .any(|write_error| write_error.code == 11000),
        _ => false,
    }
}
