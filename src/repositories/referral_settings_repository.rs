use async_trait::async_trait;
use mongodb::{bson::doc, options::ReplaceOptions, Collection};

use crate::{db::Database, errors::AppResult, models::domain::ReferralSettings};

#[async_trait]
pub trait ReferralSettingsRepository: Send + Sync {
    async fn get(&self) -> AppResult<Option<ReferralSettings>>;
    async fn save(&self, settings: ReferralSettings) -> AppResult<ReferralSettings>;
}

// Single-document collection.
pub struct MongoReferralSettingsRepository {
    collection: Collection<ReferralSettings>,
}

impl MongoReferralSettingsRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("referral_settings");
        Self { collection }
    }
}

#[async_trait]
impl ReferralSettingsRepository for MongoReferralSettingsRepository {
    async fn get(&self) -> AppResult<Option<ReferralSettings>> {
        let settings = self.collection.find_one(doc! {}).await?;
        Ok(settings)
    }

    async fn save(&self, settings: ReferralSettings) -> AppResult<ReferralSettings> {
        let options = ReplaceOptions::builder().upsert(true).build();
        self.collection
            .replace_one(doc! {}, &settings)
            .with_options(options)
            .await?;
        Ok(settings)
    }
}
