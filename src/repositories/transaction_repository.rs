use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{is_duplicate_key, Database},
    errors::{AppError, AppResult},
    models::domain::Transaction,
};

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, transaction: Transaction) -> AppResult<Transaction>;
    /// Newest first.
    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<Transaction>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoTransactionRepository {
    collection: Collection<Transaction>,
}

impl MongoTransactionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("transactions");
        Self { collection }
    }
}

#[async_trait]
impl TransactionRepository for MongoTransactionRepository {
    async fn create(&self, transaction: Transaction) -> AppResult<Transaction> {
        match self.collection.insert_one(&transaction).await {
            Ok(_) => Ok(transaction),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyExists(format!(
                "Transaction '{}' already exists",
                transaction.transaction_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<Transaction>> {
        let transactions = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(transactions)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let id_index = IndexModel::builder()
            .keys(doc! { "transaction_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("transaction_id_unique".to_string())
                    .build(),
            )
            .build();

        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_created".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_index).await?;
        log::info!("Created indexes for transactions collection");
        Ok(())
    }
}
