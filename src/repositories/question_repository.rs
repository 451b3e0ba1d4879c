use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{is_duplicate_key, Database},
    errors::{AppError, AppResult},
    models::domain::Question,
};

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn create(&self, question: Question) -> AppResult<Question>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Question>>;
    /// Questions of a quiz in insertion order.
    async fn find_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<Question>>;
    async fn count_by_quiz(&self, quiz_id: &str) -> AppResult<u64>;
    async fn exists_with_text(&self, quiz_id: &str, text: &str) -> AppResult<bool>;
    /// Rewrites text, options and answer. Returns whether the question exists.
    async fn update(&self, question: &Question) -> AppResult<bool>;
    async fn delete(&self, id: &str) -> AppResult<bool>;
    async fn delete_by_quiz(&self, quiz_id: &str) -> AppResult<u64>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoQuestionRepository {
    collection: Collection<Question>,
}

impl MongoQuestionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("questions");
        Self { collection }
    }
}

#[async_trait]
impl QuestionRepository for MongoQuestionRepository {
    async fn create(&self, question: Question) -> AppResult<Question> {
        match self.collection.insert_one(&question).await {
            Ok(_) => Ok(question),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyExists(
                "This question already exists for the quiz".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Question>> {
        let question = self.collection.find_one(doc! { "id": id }).await?;
        Ok(question)
    }

    async fn find_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<Question>> {
        let questions = self
            .collection
            .find(doc! { "quiz_id": quiz_id })
            .sort(doc! { "order": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }

    async fn count_by_quiz(&self, quiz_id: &str) -> AppResult<u64> {
        let count = self
            .collection
            .count_documents(doc! { "quiz_id": quiz_id })
            .await?;
        Ok(count)
    }

    async fn exists_with_text(&self, quiz_id: &str, text: &str) -> AppResult<bool> {
        let question = self
            .collection
            .find_one(doc! { "quiz_id": quiz_id, "text": text })
            .await?;
        Ok(question.is_some())
    }

    async fn update(&self, question: &Question) -> AppResult<bool> {
        let update = doc! {
            "$set": {
                "text": &question.text,
                "options": question.options.clone(),
                "correct_option_index": question.correct_option_index as i64,
            }
        };

        match self.collection.update_one(doc! { "id": &question.id }, update).await {
            Ok(result) => Ok(result.matched_count == 1),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyExists(
                "This question already exists for the quiz".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;
        Ok(result.deleted_count == 1)
    }

    async fn delete_by_quiz(&self, quiz_id: &str) -> AppResult<u64> {
        let result = self.collection.delete_many(doc! { "quiz_id": quiz_id }).await?;
        Ok(result.deleted_count)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let quiz_text_index = IndexModel::builder()
            .keys(doc! { "quiz_id": 1, "text": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("quiz_text_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(quiz_text_index).await?;
        log::info!("Created indexes for questions collection");
        Ok(())
    }
}
