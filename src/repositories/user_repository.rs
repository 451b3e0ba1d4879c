use async_trait::async_trait;
use mongodb::{
    bson::{doc, to_bson},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::{is_duplicate_key, Database},
    errors::{AppError, AppResult},
    models::domain::{Money, ReferralEarning, User},
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> AppResult<User>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;
    /// Decrements the wallet only if it holds at least `amount`. Returns the
    /// updated user, or `None` when the user is missing or funds are short.
    async fn debit_wallet(&self, id: &str, amount: Money) -> AppResult<Option<User>>;
    async fn credit_wallet(&self, id: &str, amount: Money) -> AppResult<Option<User>>;
    /// Flips `has_joined_quiz` to true. Returns whether this call flipped it.
    async fn mark_joined_quiz(&self, id: &str) -> AppResult<bool>;
    /// Flips `referral_bonus_given` to true. Returns whether this call flipped it.
    async fn claim_referral_bonus(&self, id: &str) -> AppResult<bool>;
    async fn add_referral_earning(&self, id: &str, earning: ReferralEarning) -> AppResult<()>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("users");
        Self { collection }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyExists(format!(
                "User with mobile '{}' already exists",
                user.mobile
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "id": id }).await?;
        Ok(user)
    }

    async fn debit_wallet(&self, id: &str, amount: Money) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one_and_update(
                doc! { "id": id, "wallet": { "$gte": amount.minor() } },
                doc! { "$inc": { "wallet": -amount.minor() } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(user)
    }

    async fn credit_wallet(&self, id: &str, amount: Money) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one_and_update(
                doc! { "id": id },
                doc! { "$inc": { "wallet": amount.minor() } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(user)
    }

    async fn mark_joined_quiz(&self, id: &str) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "id": id, "has_joined_quiz": { "$ne": true } },
                doc! { "$set": { "has_joined_quiz": true } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn claim_referral_bonus(&self, id: &str) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "id": id, "referral_bonus_given": { "$ne": true } },
                doc! { "$set": { "referral_bonus_given": true } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn add_referral_earning(&self, id: &str, earning: ReferralEarning) -> AppResult<()> {
        let result = self
            .collection
            .update_one(
                doc! { "id": id },
                doc! { "$push": { "referral_earnings": to_bson(&earning)? } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("User with id '{}' not found", id)));
        }
        Ok(())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let mobile_index = IndexModel::builder()
            .keys(doc! { "mobile": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("mobile_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(mobile_index).await?;
        log::info!("Created indexes for users collection");

        Ok(())
    }
}
