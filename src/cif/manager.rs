use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::database::Database;
use crate::error::Error;

use super::{Cif, CifId};

// Lowercase hex sha-256 of the raw value. Fixed-width, so the store can key
// records by digest no matter how identifier formats evolve.
pub fn cif_digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

// Returns the one record for `value` and whether this call created it.
// Two concurrent resolves of the same value may both pass the lookup; the
// unique digest index picks a winner and the loser re-reads the winner's
// record.
#[tracing::instrument(skip(db))]
pub async fn resolve_cif(db: &dyn Database, value: String) -> Result<(Cif, bool), Error> {
    let digest = cif_digest(&value);

    if let Some(existing) = db.cifs().fetch_cif_by_digest(&digest).await? {
        return Ok((existing, false));
    }

    let cif = Cif {
        id: CifId::new(),
        value,
        digest,
        created_at: Utc::now(),
    };

    match db.cifs().insert_cif(&cif).await {
        Ok(()) => Ok((cif, true)),
        Err(Error::DuplicateCifDigest { digest }) => {
            let existing = db.cifs().fetch_cif_by_digest(&digest).await?.ok_or_else(|| {
                Error::ExistentialState(format!(
                    "cif with digest {} vanished after a duplicate-key insert",
                    digest
                ))
            })?;

            Ok((existing, false))
        }
        Err(err) => Err(err),
    }
}
