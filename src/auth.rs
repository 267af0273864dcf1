use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::user::{User, UserId};

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, token_ttl_secs: u64) -> JwtKeys {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: Duration::seconds(token_ttl_secs as i64),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(Error::FailedTokenEncoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| Error::InvalidAuthToken)?;

        Ok(data.claims)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

// The caller behind a protected request. Extraction proves the bearer token
// once; handlers downstream only ever see the decoded identity.
#[derive(Clone, Debug)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
}

impl FromRequest for Identity {
    type Error = Error;
    type Future = Ready<Result<Identity, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identity_from_request(req))
    }
}

// No token at all is 401; a token that fails validation is 403.
fn identity_from_request(req: &HttpRequest) -> Result<Identity, Error> {
    let keys = req
        .app_data::<Data<JwtKeys>>()
        .ok_or_else(|| Error::ExistentialState("jwt keys are not configured".to_string()))?;

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(Error::MissingAuthToken)?;

    let token = header.strip_prefix("Bearer ").ok_or(Error::MissingAuthToken)?;

    let claims = keys.verify(token)?;
    let user_id = claims.sub.parse().map_err(|_| Error::InvalidAuthToken)?;

    Ok(Identity {
        user_id,
        username: claims.username,
    })
}
