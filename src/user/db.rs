use async_trait::async_trait;
use mongodb::bson;
use mongodb::error::{ErrorKind, WriteFailure};

use crate::database::MongoUserStore;
use crate::error::Error;

use super::User;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), Error>;

    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>, Error>;

    async fn insert_users(&self, users: &[User]) -> Result<usize, Error>;
}

#[async_trait]
impl UserStore for MongoUserStore {
    #[tracing::instrument(skip(self, user))]
    async fn insert_user(&self, user: &User) -> Result<(), Error> {
        self.insert_one(user, None).await.map_err(|err| {
            // Unique index on `username`; a racing registration loses here.
            if is_duplicate_key(&err) {
                Error::UserAlreadyExists {
                    username: user.username.clone(),
                }
            } else {
                Error::FailedDatabaseCall(err)
            }
        })?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let user: Option<User> = self
            .find_one(bson::doc! { "username": username }, None)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self, users))]
    async fn insert_users(&self, users: &[User]) -> Result<usize, Error> {
        let result = self.insert_many(users, None).await?;

        Ok(result.inserted_ids.len())
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    match &*error.kind {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}
