use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::{is_duplicate_key, Database},
    errors::{AppError, AppResult},
    models::domain::Quiz,
};

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>>;
    async fn find_by_title(&self, title: &str) -> AppResult<Option<Quiz>>;
    async fn find_all(&self) -> AppResult<Vec<Quiz>>;
    /// Appends `user_id` to the roster unless already present. Returns
    /// whether it was appended.
    async fn add_entry(&self, quiz_id: &str, user_id: &str) -> AppResult<bool>;
    async fn set_end_time(&self, quiz_id: &str, end_time: &str) -> AppResult<()>;
    /// Overwrites the admin-editable fields and leaves the roster alone.
    /// Returns whether the quiz exists.
    async fn update_details(&self, quiz: &Quiz) -> AppResult<bool>;
    /// Deletes the quiz only while nobody has joined it. Returns whether a
    /// quiz was deleted.
    async fn delete_if_unjoined(&self, quiz_id: &str) -> AppResult<bool>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("quizzes");
        Self { collection }
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        match self.collection.insert_one(&quiz).await {
            Ok(_) => Ok(quiz),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyExists(format!(
                "Quiz with title '{}' already exists",
                quiz.title
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "id": id }).await?;
        Ok(quiz)
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "title": title }).await?;
        Ok(quiz)
    }

    async fn find_all(&self) -> AppResult<Vec<Quiz>> {
        let quizzes = self
            .collection
            .find(doc! {})
            .sort(doc! { "date": 1, "start_time": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
    }

    async fn add_entry(&self, quiz_id: &str, user_id: &str) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "id": quiz_id, "entries": { "$ne": user_id } },
                doc! {
                    "$push": { "entries": user_id },
                    "$set": { "modified_at": to_bson(&chrono::Utc::now())? },
                },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn set_end_time(&self, quiz_id: &str, end_time: &str) -> AppResult<()> {
        let result = self
            .collection
            .update_one(
                doc! { "id": quiz_id },
                doc! {
                    "$set": {
                        "end_time": end_time,
                        "modified_at": to_bson(&chrono::Utc::now())?,
                    }
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Quiz with id '{}' not found",
                quiz_id
            )));
        }
        Ok(())
    }

    async fn update_details(&self, quiz: &Quiz) -> AppResult<bool> {
        let update = doc! {
            "$set": {
                "title": &quiz.title,
                "description": to_bson(&quiz.description)?,
                "quiz_type": to_bson(&quiz.quiz_type)?,
                "date": to_bson(&quiz.date)?,
                "start_time": to_bson(&quiz.start_time)?,
                "end_time": to_bson(&quiz.end_time)?,
                "joining_amount": to_bson(&quiz.joining_amount)?,
                "prize_tiers": to_bson(&quiz.prize_tiers)?,
                "modified_at": to_bson(&chrono::Utc::now())?,
            }
        };

        match self.collection.update_one(doc! { "id": &quiz.id }, update).await {
            Ok(result) => Ok(result.matched_count == 1),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyExists(format!(
                "Quiz with title '{}' already exists",
                quiz.title
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_if_unjoined(&self, quiz_id: &str) -> AppResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "id": quiz_id, "entries": { "$size": 0 } })
            .await?;
        Ok(result.deleted_count == 1)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let title_index = IndexModel::builder()
            .keys(doc! { "title": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("title_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(title_index).await?;

        log::info!("Successfully created indexes for quizzes collection");
        Ok(())
    }
}
