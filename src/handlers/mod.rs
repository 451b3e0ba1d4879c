pub mod admin_handler;
pub mod quiz_handler;
pub mod user_handler;

use std::future::Future;

use actix_web::{get, web, HttpResponse};
use chrono::{Duration, NaiveDateTime, Utc};
use serde_json::json;

use crate::{
    auth::AuthMiddleware,
    config::Config,
    errors::{AppError, AppResult},
    services::time_parser::parse_custom_date,
};

/// Registers `/health` and the authenticated `/api` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check).service(
        web::scope("/api")
            .wrap(AuthMiddleware)
            .service(quiz_handler::list_quizzes)
            .service(quiz_handler::get_quiz)
            .service(quiz_handler::join_quiz)
            .service(quiz_handler::submit_answers)
            .service(user_handler::my_results)
            .service(user_handler::get_result)
            .service(user_handler::my_streak)
            .service(user_handler::list_streak_rewards)
            .service(user_handler::my_wallet)
            .service(user_handler::my_transactions)
            .service(admin_handler::create_quiz)
            .service(admin_handler::update_quiz)
            .service(admin_handler::delete_quiz)
            .service(admin_handler::add_question)
            .service(admin_handler::list_questions)
            .service(admin_handler::update_question)
            .service(admin_handler::delete_question)
            .service(admin_handler::upsert_streak_reward)
            .service(admin_handler::delete_streak_reward)
            .service(admin_handler::update_referral_settings)
            .service(admin_handler::credit_wallet),
    );
}

#[get("/health")]
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// The caller's "now": an explicit "DD/MM/YYYY, hh:mm:ss AM/PM" value if
/// given, otherwise the server clock shifted to the platform offset.
pub(crate) fn resolve_now(config: &Config, explicit: Option<&str>) -> AppResult<NaiveDateTime> {
    match explicit {
        Some(raw) => parse_custom_date(raw).ok_or_else(|| {
            AppError::ValidationError(format!(
                "now must look like 'DD/MM/YYYY, hh:mm:ss AM/PM', got '{}'",
                raw
            ))
        }),
        None => Ok(Utc::now().naive_utc() + Duration::minutes(i64::from(config.utc_offset_minutes))),
    }
}

/// Fails the request with `Timeout` once the configured deadline passes.
/// The operation is dropped at the deadline, so only reads go through here.
pub(crate) async fn with_deadline<T>(
    config: &Config,
    operation: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    let limit = config.operation_timeout();
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| timed_out(limit))?
}

/// Deadline for writes. The operation runs on its own task and finishes
/// even when the caller gets `Timeout` or disconnects, so a multi-step write
/// is never cut between steps.
pub(crate) async fn with_detached_deadline<T, F>(config: &Config, operation: F) -> AppResult<T>
where
    T: Send + 'static,
    F: Future<Output = AppResult<T>> + Send + 'static,
{
    let limit = config.operation_timeout();
    let task = tokio::spawn(operation);
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(AppError::InternalError(format!("Operation task failed: {}", e))),
        Err(_) => {
            log::warn!("Write still running after {:?}; it will complete in the background", limit);
            Err(timed_out(limit))
        }
    }
}

fn timed_out(limit: std::time::Duration) -> AppError {
    AppError::Timeout(format!("Operation did not finish within {:?}", limit))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use actix_web::{http::header::AUTHORIZATION, web};

    use crate::{
        app_state::AppState,
        auth::JwtService,
        config::Config,
        models::domain::UserRole,
        repositories::Repositories,
        services::notification_service::LogNotifier,
    };

    pub struct TestApp {
        pub state: web::Data<AppState>,
        pub jwt: web::Data<JwtService>,
        pub repos: Repositories,
    }

    impl TestApp {
        pub fn new() -> Self {
            Self::with(Config::test_config(), Repositories::in_memory())
        }

        pub fn with(config: Config, repos: Repositories) -> Self {
            let jwt = JwtService::new(&config.jwt_secret, config.jwt_expiration_hours);
            let state = AppState::from_repositories(config, repos.clone(), Arc::new(LogNotifier));
            Self {
                state: web::Data::new(state),
                jwt: web::Data::new(jwt),
                repos,
            }
        }

        pub fn bearer(&self, user_id: &str, role: UserRole) -> (actix_web::http::header::HeaderName, String) {
            let token = self.jwt.create_token(user_id, role).unwrap();
            (AUTHORIZATION, format!("Bearer {}", token))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test as actix_test, App};
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    #[actix_rt::test]
    async fn health_needs_no_token() {
        let app = actix_test::init_service(App::new().service(health_check)).await;

        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn explicit_now_is_parsed() {
        let config = Config::test_config();
        let now = resolve_now(&config, Some("01/06/2024, 10:00:23 AM")).unwrap();
        assert_eq!(now.to_string(), "2024-06-01 10:00:23");
    }

    #[test]
    fn malformed_now_is_rejected() {
        let config = Config::test_config();
        assert!(matches!(
            resolve_now(&config, Some("tomorrow")),
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn slow_operations_time_out() {
        let mut config = Config::test_config();
        config.operation_timeout_secs = 0;

        let result = with_deadline(&config, async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AppError::Timeout(_))));
    }

    #[tokio::test]
    async fn detached_write_outlives_its_deadline() {
        let mut config = Config::test_config();
        config.operation_timeout_secs = 0;
        let done = Arc::new(AtomicBool::new(false));

        let flag = done.clone();
        let result = with_detached_deadline(&config, async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AppError::Timeout(_))));
        assert!(!done.load(Ordering::SeqCst));
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn detached_write_returns_its_own_error() {
        let config = Config::test_config();

        let result: AppResult<()> = with_detached_deadline(&config, async {
            Err(AppError::Conflict("taken".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
