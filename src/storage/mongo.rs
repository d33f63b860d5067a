//! MongoDB session store.

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::{debug, info};

use super::models::{ChannelInfo, UploadRecord, UserSession};
use super::store::{SessionStore, StoreError, StoreStats};
use async_trait::async_trait;

/// Primary store: one collection per table of the persisted schema.
pub struct MongoStore {
    users: Collection<UserSession>,
    uploads: Collection<UploadRecord>,
    channels: Collection<ChannelInfo>,
}

impl MongoStore {
    /// Connect and verify the server is reachable.
    ///
    /// # Errors
    /// Returns error if the connection or the ping fails; the caller
    /// falls back to the file store in that case.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        let db = client.database(db_name);

        Ok(Self {
            users: db.collection("users"),
            uploads: db.collection("uploads"),
            channels: db.collection("channels"),
        })
    }
}

#[async_trait]
impl SessionStore for MongoStore {
    async fn get_session(&self, user_id: i64) -> Result<UserSession, StoreError> {
        let filter = doc! { "user_id": user_id };
        if let Some(mut session) = self.users.find_one(filter).await? {
            session.restore_invariants();
            return Ok(session);
        }

        let session = UserSession::new(user_id);
        self.save_session(&session).await?;
        debug!(user_id, "created default session");
        Ok(session)
    }

    async fn save_session(&self, session: &UserSession) -> Result<(), StoreError> {
        let filter = doc! { "user_id": session.user_id };
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.users
            .replace_one(filter, session)
            .with_options(options)
            .await?;

        Ok(())
    }

    async fn append_upload(&self, record: &UploadRecord) -> Result<(), StoreError> {
        self.uploads.insert_one(record).await?;
        Ok(())
    }

    async fn lookup_channel(&self, channel_id: i64) -> Result<Option<ChannelInfo>, StoreError> {
        let filter = doc! { "channel_id": channel_id };
        Ok(self.channels.find_one(filter).await?)
    }

    async fn upsert_channel(&self, info: &ChannelInfo) -> Result<(), StoreError> {
        let filter = doc! { "channel_id": info.channel_id };
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.channels
            .replace_one(filter, info)
            .with_options(options)
            .await?;

        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let users = self.users.count_documents(doc! {}).await?;
        let uploads = self.uploads.count_documents(doc! {}).await?;
        Ok(StoreStats { users, uploads })
    }
}
