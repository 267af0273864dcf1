use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{Identity, JwtKeys};
use crate::database::Database;
use crate::error::Error;

use super::{manager, User, UserId};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RegisterUserBody {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserBody {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl UserBody {
    pub fn render(user: User) -> UserBody {
        UserBody {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoginUserBody {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TokenBody {
    pub token: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProfileBody {
    pub user_id: UserId,
    pub username: String,
}

#[post("/auth/register")]
#[tracing::instrument(skip(db, body))]
async fn register_user(
    db: Data<Box<dyn Database>>,
    body: Json<RegisterUserBody>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();

    let user = manager::register_user(db.get_ref().as_ref(), body.username, body.password).await?;

    Ok(HttpResponse::Created().json(UserBody::render(user)))
}

#[post("/auth/login")]
#[tracing::instrument(skip(db, keys, body))]
async fn login_user(
    db: Data<Box<dyn Database>>,
    keys: Data<JwtKeys>,
    body: Json<LoginUserBody>,
) -> Result<Json<TokenBody>, Error> {
    let body = body.into_inner();

    let token = manager::login_user(
        db.get_ref().as_ref(),
        keys.get_ref(),
        &body.username,
        body.password,
    )
    .await?;

    Ok(Json(TokenBody { token }))
}

#[get("/auth/profile")]
#[tracing::instrument]
async fn get_profile(identity: Identity) -> Result<Json<ProfileBody>, Error> {
    Ok(Json(ProfileBody {
        user_id: identity.user_id,
        username: identity.username,
    }))
}
