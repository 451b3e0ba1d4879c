use actix_web::{delete, get, post, put, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::{require_admin, AuthenticatedUser},
    errors::AppError,
    handlers::{with_deadline, with_detached_deadline},
    models::{
        domain::{Money, TransactionKind},
        dto::{
            request::{
                CreateQuestionRequest, CreateQuizRequest, CreditKind, ReferralSettingsRequest,
                UpdateQuizRequest, UpsertStreakRewardRequest, WalletCreditRequest,
            },
            response::{
                ApiResponse, LedgerEntryDto, QuizDto, ReferralSettingsDto, StreakRewardDto,
            },
        },
    },
};

#[post("/admin/quizzes")]
async fn create_quiz(
    state: web::Data<AppState>,
    request: web::Json<CreateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let quiz_service = state.quiz_service.clone();
    let request = request.into_inner();
    let quiz = with_detached_deadline(&state.config, async move {
        quiz_service.create_quiz(request).await
    })
    .await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(QuizDto::from(quiz), "Quiz created")))
}

#[put("/admin/quizzes/{id}")]
async fn update_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<UpdateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let quiz_service = state.quiz_service.clone();
    let (id, request) = (id.into_inner(), request.into_inner());
    let quiz = with_detached_deadline(&state.config, async move {
        quiz_service.update_quiz(&id, request).await
    })
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(QuizDto::from(quiz), "Quiz updated")))
}

#[delete("/admin/quizzes/{id}")]
async fn delete_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let quiz_service = state.quiz_service.clone();
    let id = id.into_inner();
    let deleted_id = id.clone();
    with_detached_deadline(&state.config, async move { quiz_service.delete_quiz(&id).await }).await?;
    log::info!("Admin {} deleted quiz {}", auth.0.sub, deleted_id);
    Ok(HttpResponse::Ok().json(ApiResponse::new(deleted_id, "Quiz deleted")))
}

#[post("/admin/quizzes/{id}/questions")]
async fn add_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<CreateQuestionRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let question_service = state.question_service.clone();
    let (id, request) = (id.into_inner(), request.into_inner());
    let question = with_detached_deadline(&state.config, async move {
        question_service.add_question(&id, request).await
    })
    .await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(question, "Question added")))
}

#[get("/admin/quizzes/{id}/questions")]
async fn list_questions(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let questions = with_deadline(&state.config, state.question_service.questions_for_quiz(&id)).await?;
    Ok(HttpResponse::Ok().json(questions))
}

#[put("/admin/questions/{id}")]
async fn update_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<CreateQuestionRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let question_service = state.question_service.clone();
    let (id, request) = (id.into_inner(), request.into_inner());
    let question = with_detached_deadline(&state.config, async move {
        question_service.update_question(&id, request).await
    })
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(question, "Question updated")))
}

#[delete("/admin/questions/{id}")]
async fn delete_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let question_service = state.question_service.clone();
    let id = id.into_inner();
    let deleted_id = id.clone();
    with_detached_deadline(&state.config, async move {
        question_service.delete_question(&id).await
    })
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(deleted_id, "Question deleted")))
}

#[put("/admin/streak-rewards")]
async fn upsert_streak_reward(
    state: web::Data<AppState>,
    request: web::Json<UpsertStreakRewardRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;
    let request = request.into_inner();
    request.validate()?;

    let amount: Money = request.reward_amount.parse()?;
    let streak_service = state.streak_service.clone();
    let reward = with_detached_deadline(&state.config, async move {
        streak_service.upsert_reward(request.streak_day, amount).await
    })
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(StreakRewardDto::from(reward), "Streak reward saved")))
}

#[delete("/admin/streak-rewards/{day}")]
async fn delete_streak_reward(
    state: web::Data<AppState>,
    day: web::Path<u32>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let streak_service = state.streak_service.clone();
    let day = day.into_inner();
    with_detached_deadline(&state.config, async move { streak_service.delete_reward(day).await }).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(day, "Streak reward deleted")))
}

#[put("/admin/referral-settings")]
async fn update_referral_settings(
    state: web::Data<AppState>,
    request: web::Json<ReferralSettingsRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;
    let request = request.into_inner();
    request.validate()?;

    let bonus: Money = request.referral_bonus.parse()?;
    let referral_service = state.referral_service.clone();
    let settings = with_detached_deadline(&state.config, async move {
        referral_service.set_referral_bonus(bonus).await
    })
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(
        ReferralSettingsDto::from(settings),
        "Referral settings saved",
    )))
}

#[post("/admin/users/{id}/wallet/credit")]
async fn credit_wallet(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<WalletCreditRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;
    let request = request.into_inner();
    request.validate()?;

    let amount: Money = request.amount.parse()?;
    let (kind, default_description) = match request.kind {
        CreditKind::AddMoney => (TransactionKind::AddMoney, "Money added to wallet"),
        CreditKind::AdminReferralBonus => (TransactionKind::AdminReferralBonus, "Referral bonus from admin"),
    };
    let description = request
        .description
        .unwrap_or_else(|| default_description.to_string());

    let wallet_service = state.wallet_service.clone();
    let id = id.into_inner();
    let user_id = id.clone();
    let entry = with_detached_deadline(&state.config, async move {
        wallet_service.credit(&user_id, amount, kind, &description).await
    })
    .await?;
    log::info!("Admin {} credited {} to {}", auth.0.sub, amount, id);
    Ok(HttpResponse::Ok().json(ApiResponse::new(LedgerEntryDto::from(entry), "Wallet credited")))
}
