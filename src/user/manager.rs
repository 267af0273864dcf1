use chrono::Utc;

use crate::auth::JwtKeys;
use crate::database::Database;
use crate::error::Error;

use super::{User, UserId};

const MIN_PASSWORD_LENGTH: usize = 8;

#[tracing::instrument(skip(db, password))]
pub async fn register_user(
    db: &dyn Database,
    username: String,
    password: String,
) -> Result<User, Error> {
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(Error::InvalidRegistration {
            reason: "username must not be empty",
        });
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(Error::InvalidRegistration {
            reason: "password must be at least 8 characters",
        });
    }

    if db.users().fetch_user_by_username(&username).await?.is_some() {
        return Err(Error::UserAlreadyExists { username });
    }

    let password_hash = hash_password(password).await?;

    let user = User {
        id: UserId::new(),
        username,
        password_hash,
        created_at: Utc::now(),
    };

    db.users().insert_user(&user).await?;

    Ok(user)
}

#[tracing::instrument(skip(db, keys, password))]
pub async fn login_user(
    db: &dyn Database,
    keys: &JwtKeys,
    username: &str,
    password: String,
) -> Result<String, Error> {
    // A missing user and a wrong password read the same from outside.
    let user = db
        .users()
        .fetch_user_by_username(username)
        .await?
        .ok_or(Error::InvalidCredentials)?;

    if !verify_password(password, user.password_hash.clone()).await? {
        return Err(Error::InvalidCredentials);
    }

    keys.issue(&user)
}

// bcrypt is deliberately slow; keep it off the async workers.
async fn hash_password(password: String) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|err| Error::ExistentialState(format!("password hashing task failed: {}", err)))?
        .map_err(Error::from)
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .map_err(|err| Error::ExistentialState(format!("password check task failed: {}", err)))?
        .map_err(Error::from)
}
