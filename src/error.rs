use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_multipart::MultipartError;
use actix_web::body::BoxBody;
use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError, UrlencodedError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use bcrypt::BcryptError;
use csv::Error as CsvError;
use derivative::Derivative;
use jsonwebtoken::errors::Error as JwtError;
use mongodb::bson::ser::Error as BsonError;
use mongodb::error::Error as DatabaseError;
use serde::{Serialize, Serializer};

use crate::notification::NotificationId;

#[derive(Debug, Serialize, Derivative)]
#[derivative(PartialEq, Eq)]
#[serde(untagged)]
pub enum Error {
    // 400
    #[serde(serialize_with = "display")]
    InvalidJson(#[derivative(PartialEq = "ignore")] JsonPayloadError),
    #[serde(serialize_with = "display")]
    InvalidPath(#[derivative(PartialEq = "ignore")] PathError),
    #[serde(serialize_with = "display")]
    InvalidForm(#[derivative(PartialEq = "ignore")] UrlencodedError),
    #[serde(serialize_with = "display")]
    InvalidQuery(#[derivative(PartialEq = "ignore")] QueryPayloadError),
    #[serde(serialize_with = "display")]
    InvalidMultipart(#[derivative(PartialEq = "ignore")] MultipartError),
    MissingUploadField {
        field: &'static str,
    },
    InvalidUploadField {
        field: &'static str,
        reason: String,
    },
    #[serde(serialize_with = "display")]
    MalformedSpreadsheet(#[derivative(PartialEq = "ignore")] CsvError),
    NoCifsFound,
    InvalidRegistration {
        reason: &'static str,
    },

    // 401
    MissingAuthToken,
    InvalidCredentials,

    // 403
    InvalidAuthToken,

    // 404
    PathNotFound,
    NotificationNotFound {
        notification_id: NotificationId,
    },

    // 409
    ConcurrentModificationDetected,
    UserAlreadyExists {
        username: String,
    },
    DuplicateCifDigest {
        digest: String,
    },

    // 500
    ExistentialState(String),
    #[serde(serialize_with = "display")]
    FailedDatabaseCall(#[derivative(PartialEq = "ignore")] DatabaseError),
    #[serde(serialize_with = "display")]
    FailedToSerializeToBson(#[derivative(PartialEq = "ignore")] BsonError),
    #[serde(serialize_with = "display")]
    IoError(#[derivative(PartialEq = "ignore")] IoError),
    #[serde(serialize_with = "display")]
    FailedPasswordHash(#[derivative(PartialEq = "ignore")] BcryptError),
    #[serde(serialize_with = "display")]
    FailedTokenEncoding(#[derivative(PartialEq = "ignore")] JwtError),
    BatchInsertFailed {
        batch: usize,
        reason: String,
    },
    MissingConfig {
        key: &'static str,
    },
    InvalidConfig {
        key: &'static str,
        reason: String,
    },
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "E4001000",
            Error::InvalidPath(_) => "E4001001",
            Error::InvalidForm(_) => "E4001002",
            Error::InvalidQuery(_) => "E4001003",
            Error::InvalidMultipart(_) => "E4001004",
            Error::MissingUploadField { .. } => "E4001005",
            Error::InvalidUploadField { .. } => "E4001006",
            Error::MalformedSpreadsheet(_) => "E4001007",
            Error::NoCifsFound => "E4001008",
            Error::InvalidRegistration { .. } => "E4001009",
            Error::MissingAuthToken => "E4011000",
            Error::InvalidCredentials => "E4011001",
            Error::InvalidAuthToken => "E4031000",
            Error::PathNotFound => "E4041000",
            Error::NotificationNotFound { .. } => "E4041001",
            Error::ConcurrentModificationDetected => "E4091000",
            Error::UserAlreadyExists { .. } => "E4091001",
            Error::DuplicateCifDigest { .. } => "E4091002",
            Error::ExistentialState(_) => "E5001000",
            Error::FailedDatabaseCall(_) => "E5001001",
            Error::FailedToSerializeToBson(_) => "E5001002",
            Error::IoError(_) => "E5001003",
            Error::FailedPasswordHash(_) => "E5001004",
            Error::FailedTokenEncoding(_) => "E5001005",
            Error::BatchInsertFailed { .. } => "E5001006",
            Error::MissingConfig { .. } => "E5001007",
            Error::InvalidConfig { .. } => "E5001008",
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "The given json could not be parsed",
            Error::InvalidPath(_) => "The given path could not be parsed",
            Error::InvalidForm(_) => "The given form could not be parsed",
            Error::InvalidQuery(_) => "The given query could not be parsed",
            Error::InvalidMultipart(_) => "The given multipart payload could not be parsed",
            Error::MissingUploadField { .. } => "The upload is missing a required field",
            Error::InvalidUploadField { .. } => "The upload has a field that could not be parsed",
            Error::MalformedSpreadsheet(_) => "The given spreadsheet could not be read",
            Error::NoCifsFound => "The given spreadsheet contains no usable cifs",
            Error::InvalidRegistration { .. } => "The given registration is not valid",
            Error::MissingAuthToken => "The request does not carry an auth token",
            Error::InvalidCredentials => "The given credentials were not accepted",
            Error::InvalidAuthToken => "The given auth token was not accepted",
            Error::PathNotFound => "The requested path was not found",
            Error::NotificationNotFound { .. } => "The requested notification was not found",
            Error::ConcurrentModificationDetected => {
                "The server detected a concurrent modification"
            }
            Error::UserAlreadyExists { .. } => "The requested username is already taken",
            Error::DuplicateCifDigest { .. } => "The given cif already exists",
            Error::ExistentialState(_) => "The server detected an invalid state",
            Error::FailedDatabaseCall(_) => {
                "An error occurred when communicating with the database"
            }
            Error::FailedToSerializeToBson(_) => {
                "An error occurred when serializing an object to bson"
            }
            Error::IoError(_) => "An error occurred during an I/O operation",
            Error::FailedPasswordHash(_) => "An error occurred when hashing a password",
            Error::FailedTokenEncoding(_) => "An error occurred when encoding an auth token",
            Error::BatchInsertFailed { .. } => "An error occurred while inserting a batch",
            Error::MissingConfig { .. } => "A required configuration value is not set",
            Error::InvalidConfig { .. } => "A configuration value could not be parsed",
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Error::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Error::InvalidForm(_) => StatusCode::BAD_REQUEST,
            Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Error::InvalidMultipart(_) => StatusCode::BAD_REQUEST,
            Error::MissingUploadField { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidUploadField { .. } => StatusCode::BAD_REQUEST,
            Error::MalformedSpreadsheet(_) => StatusCode::BAD_REQUEST,
            Error::NoCifsFound => StatusCode::BAD_REQUEST,
            Error::InvalidRegistration { .. } => StatusCode::BAD_REQUEST,
            Error::MissingAuthToken => StatusCode::UNAUTHORIZED,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::InvalidAuthToken => StatusCode::FORBIDDEN,
            Error::PathNotFound => StatusCode::NOT_FOUND,
            Error::NotificationNotFound { .. } => StatusCode::NOT_FOUND,
            Error::ConcurrentModificationDetected => StatusCode::CONFLICT,
            Error::UserAlreadyExists { .. } => StatusCode::CONFLICT,
            Error::DuplicateCifDigest { .. } => StatusCode::CONFLICT,
            Error::ExistentialState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedDatabaseCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerializeToBson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedPasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedTokenEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::BatchInsertFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::MissingConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        #[derive(Serialize)]
        struct Dummy<'a> {
            error_code: &'static str,
            error_message: &'static str,
            error_meta: &'a Error,
        }

        HttpResponse::build(self.status_code()).json(&Dummy {
            error_code: self.error_code(),
            error_message: self.error_message(),
            error_meta: self,
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Error {
        Error::FailedDatabaseCall(error)
    }
}

impl From<BsonError> for Error {
    fn from(error: BsonError) -> Error {
        Error::FailedToSerializeToBson(error)
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl From<BcryptError> for Error {
    fn from(error: BcryptError) -> Error {
        Error::FailedPasswordHash(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(err) => Some(err),
            Error::InvalidPath(err) => Some(err),
            Error::InvalidForm(err) => Some(err),
            Error::InvalidQuery(err) => Some(err),
            Error::MalformedSpreadsheet(err) => Some(err),
            Error::FailedDatabaseCall(err) => Some(err),
            Error::FailedToSerializeToBson(err) => Some(err),
            Error::IoError(err) => Some(err),
            Error::FailedPasswordHash(err) => Some(err),
            Error::FailedTokenEncoding(err) => Some(err),
            _ => None,
        }
    }
}

fn display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
