use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::{AppError, AppResult};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str, title: &str, body: &str) -> AppResult<()>;
}

/// Writes notifications to the log. Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: &str, title: &str, body: &str) -> AppResult<()> {
        log::info!("Notification for {}: {} - {}", user_id, title, body);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    user_id: &'a str,
    title: &'a str,
    body: &'a str,
}

/// POSTs notifications as JSON to an external push gateway.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, user_id: &str, title: &str, body: &str) -> AppResult<()> {
        self.client
            .post(&self.url)
            .json(&WebhookPayload { user_id, title, body })
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::InternalError(format!("Notification webhook failed: {}", e)))?;
        Ok(())
    }
}

/// Best-effort delivery: failures and timeouts are logged, never returned.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self { notifier, timeout }
    }

    pub async fn dispatch(&self, user_id: &str, title: &str, body: &str) {
        match tokio::time::timeout(self.timeout, self.notifier.notify(user_id, title, body)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Notification to {} failed: {}", user_id, e),
            Err(_) => log::warn!(
                "Notification to {} timed out after {:?}",
                user_id,
                self.timeout
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn dispatch_forwards_to_notifier() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .with(eq("user-1"), eq("Wallet debited"), eq("20.00 debited"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let dispatcher = NotificationDispatcher::new(Arc::new(notifier), Duration::from_secs(1));
        dispatcher
            .dispatch("user-1", "Wallet debited", "20.00 debited")
            .await;
    }

    #[tokio::test]
    async fn dispatch_swallows_notifier_errors() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .times(1)
            .returning(|_, _, _| Err(AppError::InternalError("gateway down".to_string())));

        let dispatcher = NotificationDispatcher::new(Arc::new(notifier), Duration::from_secs(1));
        // Completes without panicking or propagating.
        dispatcher.dispatch("user-1", "title", "body").await;
    }

    struct SlowNotifier;

    #[async_trait]
    impl Notifier for SlowNotifier {
        async fn notify(&self, _user_id: &str, _title: &str, _body: &str) -> AppResult<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_gives_up_after_timeout() {
        let dispatcher =
            NotificationDispatcher::new(Arc::new(SlowNotifier), Duration::from_millis(20));

        let started = std::time::Instant::now();
        dispatcher.dispatch("user-1", "title", "body").await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.notify("user-1", "title", "body").await.is_ok());
    }
}
