use mongodb::options::IndexOptions;
use mongodb::{bson, Collection, IndexModel};

use crate::cif::db::CifStore;
use crate::cif::Cif;
use crate::error::Error;
use crate::notification::db::NotificationStore;
use crate::notification::Notification;
use crate::user::db::UserStore;
use crate::user::User;

pub type MongoUserStore = Collection<User>;
pub type MongoCifStore = Collection<Cif>;
pub type MongoNotificationStore = Collection<Notification>;

pub trait Database: Send + Sync {
    fn users(&self) -> &dyn UserStore;
    fn cifs(&self) -> &dyn CifStore;
    fn notifications(&self) -> &dyn NotificationStore;
}

#[derive(Debug, Clone)]
pub struct MongoDatabase {
    users: Collection<User>,
    cifs: Collection<Cif>,
    notifications: Collection<Notification>,
}

impl MongoDatabase {
    pub async fn initialize(db: mongodb::Database) -> Result<MongoDatabase, Error> {
        let database = MongoDatabase {
            users: db.collection("users"),
            cifs: db.collection("cifs"),
            notifications: db.collection("notifications"),
        };

        // These indexes back the duplicate-key handling in cif::db and
        // user::db; without them a lost race writes a second record.
        database
            .cifs
            .create_index(unique_index(bson::doc! { "digest": 1 }), None)
            .await?;
        database
            .users
            .create_index(unique_index(bson::doc! { "username": 1 }), None)
            .await?;

        Ok(database)
    }
}

impl Database for MongoDatabase {
    fn users(&self) -> &dyn UserStore {
        &self.users
    }

    fn cifs(&self) -> &dyn CifStore {
        &self.cifs
    }

    fn notifications(&self) -> &dyn NotificationStore {
        &self.notifications
    }
}

fn unique_index(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}
