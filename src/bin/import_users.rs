use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use mongodb::Client;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cifcast_server::config::Config;
use cifcast_server::database::MongoDatabase;
use cifcast_server::error::Error;
use cifcast_server::user::import;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    let path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            error!("usage: import_users <users.csv>");
            process::exit(2);
        }
    };

    if let Err(err) = run(&path).await {
        error!(error = %err, "import failed");
        process::exit(1);
    }
}

async fn run(path: &Path) -> Result<(), Error> {
    let config = Config::from_env()?;

    let db = Client::with_uri_str(&config.mongodb_uri)
        .await?
        .database(&config.mongodb_database);
    let db = MongoDatabase::initialize(db).await?;

    let rows = import::read_user_rows(path)?;
    let summary = import::import_users(Arc::new(db), rows, config.import_batch_size).await?;

    info!(
        batches = summary.batches,
        inserted = summary.inserted,
        "import finished"
    );

    Ok(())
}
