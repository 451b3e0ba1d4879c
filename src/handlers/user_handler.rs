use actix_web::{get, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    handlers::with_deadline,
    models::dto::response::{QuizResultDto, StreakDto, StreakRewardDto, TransactionDto, WalletDto},
};

#[get("/results/me")]
async fn my_results(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let results = with_deadline(&state.config, state.scoring_service.results_for_user(&auth.0.sub)).await?;
    let results: Vec<QuizResultDto> = results.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(results))
}

/// Another user's result reads as missing unless the caller is an admin.
#[get("/results/{id}")]
async fn get_result(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let result = with_deadline(&state.config, state.scoring_service.get_result(&id)).await?;
    if result.user_id != auth.0.sub && !auth.0.is_admin() {
        return Err(AppError::NotFound(format!("Result with id '{}' not found", id)));
    }
    Ok(HttpResponse::Ok().json(QuizResultDto::from(result)))
}

#[get("/streak/me")]
async fn my_streak(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let streak = with_deadline(&state.config, state.streak_service.get_streak(&auth.0.sub)).await?;
    Ok(HttpResponse::Ok().json(StreakDto::from(streak)))
}

#[get("/streak-rewards")]
async fn list_streak_rewards(
    state: web::Data<AppState>,
    _auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let rewards = with_deadline(&state.config, state.streak_service.list_rewards()).await?;
    let rewards: Vec<StreakRewardDto> = rewards.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(rewards))
}

#[get("/wallet/me")]
async fn my_wallet(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let balance = with_deadline(&state.config, state.wallet_service.balance(&auth.0.sub)).await?;
    Ok(HttpResponse::Ok().json(WalletDto::from(balance)))
}

#[get("/transactions/me")]
async fn my_transactions(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let transactions = with_deadline(
        &state.config,
        state.wallet_service.transactions_for_user(&auth.0.sub),
    )
    .await?;
    let transactions: Vec<TransactionDto> = transactions.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(transactions))
}

#[cfg(test)]
mod tests {
    use crate::{
        handlers::{configure, test_support::TestApp},
        models::domain::{AnswerSnapshot, Money, TransactionKind, User, UserRole},
        test_utils::fixtures::{mega_quiz, questions_for},
    };
    use actix_web::{http::StatusCode, test, App};
    use chrono::Utc;
    use serde_json::Value;

    #[actix_rt::test]
    async fn transactions_are_listed_for_caller() {
        let app = TestApp::new();
        let user = User::test_user("9000000050", Money::ZERO);
        app.repos.users.create(user.clone()).await.unwrap();
        app.state
            .wallet_service
            .credit(&user.id, Money::from_major(40), TransactionKind::AddMoney, "Top-up")
            .await
            .unwrap();

        let service = test::init_service(
            App::new()
                .app_data(app.state.clone())
                .app_data(app.jwt.clone())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/transactions/me")
            .insert_header(app.bearer(&user.id, UserRole::User))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["amount"], "40.00");
        assert_eq!(body[0]["kind"], "addMoney");
    }

    #[actix_rt::test]
    async fn wallet_shows_balance() {
        let app = TestApp::new();
        let user = User::test_user("9000000051", Money::from_minor(1250));
        app.repos.users.create(user.clone()).await.unwrap();
        let service = test::init_service(
            App::new()
                .app_data(app.state.clone())
                .app_data(app.jwt.clone())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/wallet/me")
            .insert_header(app.bearer(&user.id, UserRole::User))
            .to_request();
        let body: Value = test::call_and_read_body_json(&service, req).await;
        assert_eq!(body["balance"], "12.50");
    }

    #[actix_rt::test]
    async fn results_of_others_are_hidden() {
        let app = TestApp::new();
        let (quiz, questions) = {
            let quiz = mega_quiz("Hidden Results", "10:00:00 AM", 0);
            let quiz = app.repos.quizzes.create(quiz).await.unwrap();
            let mut questions = Vec::new();
            for q in questions_for(&quiz.id, 2) {
                questions.push(app.repos.questions.create(q).await.unwrap());
            }
            (quiz, questions)
        };
        let answers: Vec<AnswerSnapshot> = questions
            .iter()
            .map(|q| AnswerSnapshot {
                question_id: q.id.clone(),
                selected_option_index: Some(1),
            })
            .collect();
        let result = app
            .state
            .scoring_service
            .score(&quiz.id, "owner", &answers, Utc::now())
            .await
            .unwrap();

        let service = test::init_service(
            App::new()
                .app_data(app.state.clone())
                .app_data(app.jwt.clone())
                .configure(configure),
        )
        .await;

        let uri = format!("/api/results/{}", result.id);
        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(app.bearer("owner", UserRole::User))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(app.bearer("someone-else", UserRole::User))
            .to_request();
        assert_eq!(
            test::call_service(&service, req).await.status(),
            StatusCode::NOT_FOUND
        );

        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(app.bearer("admin-1", UserRole::Admin))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn streak_rewards_are_listed_by_day() {
        let app = TestApp::new();
        for (day, amount) in [(7, 50), (3, 10)] {
            app.state
                .streak_service
                .upsert_reward(day, Money::from_major(amount))
                .await
                .unwrap();
        }
        let service = test::init_service(
            App::new()
                .app_data(app.state.clone())
                .app_data(app.jwt.clone())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/streak-rewards")
            .insert_header(app.bearer("user-1", UserRole::User))
            .to_request();
        let body: Value = test::call_and_read_body_json(&service, req).await;
        assert_eq!(body[0]["streak_day"], 3);
        assert_eq!(body[1]["reward_amount"], "50.00");
    }

    #[actix_rt::test]
    async fn streak_is_404_before_first_join() {
        let app = TestApp::new();
        let service = test::init_service(
            App::new()
                .app_data(app.state.clone())
                .app_data(app.jwt.clone())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/streak/me")
            .insert_header(app.bearer("nobody", UserRole::User))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn results_require_a_token() {
        let app = TestApp::new();
        let service = test::init_service(
            App::new()
                .app_data(app.state.clone())
                .app_data(app.jwt.clone())
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/results/me").to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
