use std::time::Duration;

use actix_web::web::{self, Data, FormConfig, JsonConfig, PathConfig, QueryConfig};
use actix_web::{App, HttpServer, ResponseError};
use mongodb::Client;
use tracing::info;
use tracing_actix_web::TracingLogger;

pub mod auth;
pub mod cif;
pub mod config;
pub mod database;
pub mod error;
pub mod notification;
pub mod spreadsheet;
pub mod sweep;
pub mod typedid;
pub mod user;

pub use crate::auth::{Claims, Identity, JwtKeys};
pub use crate::config::Config;
pub use crate::error::Error;

use crate::database::{Database, MongoDatabase};

pub async fn run(config: Config) -> Result<(), Error> {
    info!("connecting to db: {}", config.mongodb_uri);
    let db = Client::with_uri_str(&config.mongodb_uri)
        .await?
        .database(&config.mongodb_database);
    let db = MongoDatabase::initialize(db).await?;

    let keys = JwtKeys::new(&config.jwt_secret, config.token_ttl_secs);

    tokio::spawn(sweep::run_sweep(
        Box::new(db.clone()) as Box<dyn Database>,
        Duration::from_secs(config.sweep_interval_secs),
    ));

    HttpServer::new(move || {
        App::new()
            .app_data(JsonConfig::default().error_handler(|err, _req| {
                // format json errors with custom format
                Error::InvalidJson(err).into()
            }))
            .app_data(PathConfig::default().error_handler(|err, _req| {
                // format path errors with custom format
                Error::InvalidPath(err).into()
            }))
            .app_data(FormConfig::default().error_handler(|err, _req| {
                // format form errors with custom format
                Error::InvalidForm(err).into()
            }))
            .app_data(QueryConfig::default().error_handler(|err, _req| {
                // format query errors with custom format
                Error::InvalidQuery(err).into()
            }))
            .app_data(Data::new(Box::new(db.clone()) as Box<dyn Database>))
            .app_data(Data::new(keys.clone()))
            .wrap(TracingLogger::default())
            .service(user::endpoints::register_user)
            .service(user::endpoints::login_user)
            .service(user::endpoints::get_profile)
            .service(notification::endpoints::upload_notification)
            .service(notification::endpoints::get_notifications)
            .service(notification::endpoints::get_notification_by_id)
            .service(notification::endpoints::update_notification)
            .service(notification::endpoints::delete_notification)
            .default_service(web::to(|| async { Error::PathNotFound.error_response() }))
    })
    .bind(&config.bind_address)?
    .run()
    .await?;

    Ok(())
}
