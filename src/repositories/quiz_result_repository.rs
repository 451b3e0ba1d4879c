use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{is_duplicate_key, Database},
    errors::{AppError, AppResult},
    models::domain::QuizResult,
};

#[async_trait]
pub trait QuizResultRepository: Send + Sync {
    /// Fails with `AlreadyExists` when another result holds the same
    /// submission key.
    async fn create(&self, result: QuizResult) -> AppResult<QuizResult>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizResult>>;
    /// Newest first.
    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<QuizResult>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoQuizResultRepository {
    collection: Collection<QuizResult>,
}

impl MongoQuizResultRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("quiz_results");
        Self { collection }
    }
}

#[async_trait]
impl QuizResultRepository for MongoQuizResultRepository {
    async fn create(&self, result: QuizResult) -> AppResult<QuizResult> {
        match self.collection.insert_one(&result).await {
            Ok(_) => Ok(result),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyExists(format!(
                "Result for quiz '{}' already submitted",
                result.quiz_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizResult>> {
        let result = self.collection.find_one(doc! { "id": id }).await?;
        Ok(result)
    }

    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<QuizResult>> {
        let results = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "submitted_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(results)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_results collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let user_quiz_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "quiz_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_quiz".to_string())
                    .build(),
            )
            .build();

        let submission_index = IndexModel::builder()
            .keys(doc! { "submission_key": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .sparse(true)
                    .name("submission_key_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_quiz_index).await?;
        self.collection.create_index(submission_index).await?;

        log::info!("Successfully created indexes for quiz_results collection");
        Ok(())
    }
}
