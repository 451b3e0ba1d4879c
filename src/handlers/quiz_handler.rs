use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    handlers::{resolve_now, with_deadline, with_detached_deadline},
    models::dto::{
        request::{BucketQuery, JoinRequest, SubmitAnswersRequest},
        response::{ApiResponse, JoinResponse, QuizBucketsResponse, QuizDto, QuizResultDto},
    },
    services::quiz_classifier::{PageRequest, QuizBucket},
};

#[get("/quizzes")]
async fn list_quizzes(
    state: web::Data<AppState>,
    query: web::Query<BucketQuery>,
    _auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    query.validate()?;

    let now = resolve_now(&state.config, query.now.as_deref())?;
    let only = query
        .bucket
        .as_deref()
        .map(str::parse::<QuizBucket>)
        .transpose()?;
    let page = PageRequest::new(query.page, query.limit);

    let buckets = with_deadline(&state.config, state.quiz_service.list_buckets(now, only, page)).await?;
    Ok(HttpResponse::Ok().json(QuizBucketsResponse::from(buckets)))
}

#[get("/quizzes/{id}")]
async fn get_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    _auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = with_deadline(&state.config, state.quiz_service.get_quiz(&id)).await?;
    Ok(HttpResponse::Ok().json(QuizDto::from(quiz)))
}

#[post("/quizzes/{id}/join")]
async fn join_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: Option<web::Json<JoinRequest>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.map(web::Json::into_inner).unwrap_or_default();
    request.validate()?;

    let now = resolve_now(&state.config, request.now.as_deref())?;
    let join_service = state.join_service.clone();
    let user_id = auth.0.sub;
    let quiz_id = id.into_inner();
    let result = with_detached_deadline(&state.config, async move {
        join_service.join(&user_id, &quiz_id, now).await
    })
    .await?;

    let message = if result.already_joined {
        "Already joined"
    } else {
        "Joined quiz"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::new(JoinResponse::from(result), message)))
}

#[post("/quizzes/{id}/submit")]
async fn submit_answers(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SubmitAnswersRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let scoring_service = state.scoring_service.clone();
    let user_id = auth.0.sub;
    let quiz_id = id.into_inner();
    let result = with_detached_deadline(&state.config, async move {
        scoring_service
            .score(&quiz_id, &user_id, &request.answers, Utc::now())
            .await
    })
    .await?;

    Ok(HttpResponse::Created().json(ApiResponse::new(QuizResultDto::from(result), "Answers scored")))
}
