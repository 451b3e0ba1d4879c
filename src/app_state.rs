use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::Repositories,
    services::{
        join_service::JoinService,
        notification_service::{LogNotifier, NotificationDispatcher, Notifier, WebhookNotifier},
        question_service::QuestionService,
        quiz_service::QuizService,
        referral_service::ReferralService,
        scoring_service::ScoringService,
        streak_service::StreakService,
        wallet_service::WalletService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: Arc<QuizService>,
    pub question_service: Arc<QuestionService>,
    pub wallet_service: Arc<WalletService>,
    pub streak_service: Arc<StreakService>,
    pub referral_service: Arc<ReferralService>,
    pub join_service: Arc<JoinService>,
    pub scoring_service: Arc<ScoringService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let repositories = Repositories::mongo(&db);
        repositories.ensure_indexes().await?;

        let notifier: Arc<dyn Notifier> = match config.notification_webhook_url.as_deref() {
            Some(url) => {
                log::info!("Sending notifications to webhook {}", url);
                Arc::new(WebhookNotifier::new(url, config.notification_timeout())?)
            }
            None => {
                log::info!("No notification webhook configured, logging notifications");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self::from_repositories(config, repositories, notifier))
    }

    /// Wires every service over the given storage.
    pub fn from_repositories(
        config: Config,
        repositories: Repositories,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let notifications = NotificationDispatcher::new(notifier, config.notification_timeout());

        let wallet_service = Arc::new(WalletService::new(
            repositories.users.clone(),
            repositories.transactions.clone(),
            notifications.clone(),
        ));
        let streak_service = Arc::new(StreakService::new(
            repositories.streaks.clone(),
            repositories.streak_rewards.clone(),
            wallet_service.clone(),
        ));
        let referral_service = Arc::new(ReferralService::new(
            repositories.users.clone(),
            repositories.referral_settings.clone(),
            wallet_service.clone(),
            notifications,
            config.referral_bonus,
        ));
        let join_service = Arc::new(JoinService::new(
            repositories.quizzes.clone(),
            repositories.questions.clone(),
            repositories.users.clone(),
            wallet_service.clone(),
            streak_service.clone(),
            referral_service.clone(),
            config.seconds_per_question,
        ));
        let scoring_service = Arc::new(ScoringService::new(
            repositories.quizzes.clone(),
            repositories.questions.clone(),
            repositories.results.clone(),
        ));
        let quiz_service = Arc::new(QuizService::new(
            repositories.quizzes.clone(),
            repositories.questions.clone(),
            config.seconds_per_question,
        ));
        let question_service = Arc::new(QuestionService::new(
            repositories.quizzes,
            repositories.questions,
            config.seconds_per_question,
        ));

        Self {
            quiz_service,
            question_service,
            wallet_service,
            streak_service,
            referral_service,
            join_service,
            scoring_service,
            config: Arc::new(config),
        }
    }
}
