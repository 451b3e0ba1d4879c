use std::sync::Arc;

use chrono::Utc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Money, ReferralEarning, ReferralSettings, TransactionKind, User},
    repositories::{ReferralSettingsRepository, UserRepository},
    services::{notification_service::NotificationDispatcher, wallet_service::WalletService},
};

pub struct ReferralService {
    users: Arc<dyn UserRepository>,
    settings: Arc<dyn ReferralSettingsRepository>,
    wallet: Arc<WalletService>,
    notifications: NotificationDispatcher,
    default_bonus: Money,
}

impl ReferralService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        settings: Arc<dyn ReferralSettingsRepository>,
        wallet: Arc<WalletService>,
        notifications: NotificationDispatcher,
        default_bonus: Money,
    ) -> Self {
        Self {
            users,
            settings,
            wallet,
            notifications,
            default_bonus,
        }
    }

    pub async fn referral_bonus(&self) -> AppResult<Money> {
        Ok(self
            .settings
            .get()
            .await?
            .map(|s| s.referral_bonus)
            .unwrap_or(self.default_bonus))
    }

    pub async fn set_referral_bonus(&self, referral_bonus: Money) -> AppResult<ReferralSettings> {
        if referral_bonus.minor() < 0 {
            return Err(AppError::ValidationError(
                "Referral bonus cannot be negative".to_string(),
            ));
        }
        let saved = self.settings.save(ReferralSettings { referral_bonus }).await?;
        log::info!("Referral bonus set to {}", referral_bonus);
        Ok(saved)
    }

    /// Pays the referrer once, on the referred user's first successful
    /// join. Returns the amount paid, if any.
    ///
    /// `claim_referral_bonus` is the only gate for the payout. The first-join
    /// flag is flipped after the payout is settled, so a failed lookup
    /// leaves both flags unset and the next join retries.
    pub async fn unlock_on_first_join(&self, user: &User) -> AppResult<Option<Money>> {
        if user.has_joined_quiz {
            return Ok(None);
        }

        let paid = self.pay_referrer(user).await?;
        self.users.mark_joined_quiz(&user.id).await?;
        Ok(paid)
    }

    async fn pay_referrer(&self, user: &User) -> AppResult<Option<Money>> {
        let Some(referrer_id) = user.referred_by.as_deref() else {
            return Ok(None);
        };
        if user.referral_bonus_given {
            return Ok(None);
        }

        let Some(referrer) = self.users.find_by_id(referrer_id).await? else {
            log::warn!(
                "User {} was referred by unknown user {}, no bonus paid",
                user.id,
                referrer_id
            );
            return Ok(None);
        };

        let bonus = self.referral_bonus().await?;
        if !bonus.is_positive() {
            return Ok(None);
        }

        if !self.users.claim_referral_bonus(&user.id).await? {
            return Ok(None);
        }

        let description = format!("Referral bonus for inviting {}", user.full_name());
        if let Err(e) = self
            .wallet
            .credit(&referrer.id, bonus, TransactionKind::ReferralBonus, &description)
            .await
        {
            log::error!(
                "RECONCILE: referral bonus {} for {} (referred {}) claimed but not paid: {}",
                bonus,
                referrer.id,
                user.id,
                e
            );
            return Err(e);
        }

        self.users
            .add_referral_earning(
                &referrer.id,
                ReferralEarning {
                    referred_user_id: user.id.clone(),
                    amount: bonus,
                    earned_at: Utc::now(),
                },
            )
            .await?;

        self.notifications
            .dispatch(
                &referrer.id,
                "Referral bonus",
                &format!("{} joined their first quiz. You earned {}", user.full_name(), bonus),
            )
            .await;

        log::info!("Referral bonus {} paid to {} for {}", bonus, referrer.id, user.id);
        Ok(Some(bonus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repositories::{
            memory::{
                InMemoryReferralSettingsRepository, InMemoryTransactionRepository,
                InMemoryUserRepository,
            },
            TransactionRepository,
        },
        services::notification_service::LogNotifier,
    };
    use async_trait::async_trait;
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    /// Settings store whose reads fail while `down` is set.
    #[derive(Default)]
    struct FlakySettings {
        down: AtomicBool,
        inner: InMemoryReferralSettingsRepository,
    }

    #[async_trait]
    impl ReferralSettingsRepository for FlakySettings {
        async fn get(&self) -> AppResult<Option<ReferralSettings>> {
            if self.down.load(Ordering::SeqCst) {
                return Err(AppError::DatabaseError("settings unavailable".to_string()));
            }
            self.inner.get().await
        }
        async fn save(&self, settings: ReferralSettings) -> AppResult<ReferralSettings> {
            self.inner.save(settings).await
        }
    }

    struct Fixture {
        service: ReferralService,
        users: Arc<InMemoryUserRepository>,
        transactions: Arc<InMemoryTransactionRepository>,
        referrer: User,
        referred: User,
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(InMemoryReferralSettingsRepository::new())).await
    }

    async fn fixture_with(settings: Arc<dyn ReferralSettingsRepository>) -> Fixture {
        let users = Arc::new(InMemoryUserRepository::new());
        let transactions = Arc::new(InMemoryTransactionRepository::new());
        let referrer = User::test_user("9000000020", Money::ZERO);
        let mut referred = User::test_user("9000000021", Money::from_major(100));
        referred.referred_by = Some(referrer.id.clone());
        users.create(referrer.clone()).await.unwrap();
        users.create(referred.clone()).await.unwrap();

        let dispatcher = NotificationDispatcher::new(Arc::new(LogNotifier), Duration::from_secs(1));
        let wallet = Arc::new(WalletService::new(
            users.clone(),
            transactions.clone(),
            dispatcher.clone(),
        ));
        let service = ReferralService::new(
            users.clone(),
            settings,
            wallet,
            dispatcher,
            Money::from_major(10),
        );

        Fixture {
            service,
            users,
            transactions,
            referrer,
            referred,
        }
    }

    #[tokio::test]
    async fn first_join_pays_referrer_once() {
        let f = fixture().await;

        let paid = f.service.unlock_on_first_join(&f.referred).await.unwrap();
        assert_eq!(paid, Some(Money::from_major(10)));

        let again = f.service.unlock_on_first_join(&f.referred).await.unwrap();
        assert_eq!(again, None);

        let referrer = f.users.find_by_id(&f.referrer.id).await.unwrap().unwrap();
        assert_eq!(referrer.wallet, Money::from_major(10));
        assert_eq!(referrer.referral_earnings.len(), 1);
        assert_eq!(referrer.referral_earnings[0].referred_user_id, f.referred.id);

        let rows = f.transactions.find_by_user(&f.referrer.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, TransactionKind::ReferralBonus);

        let referred = f.users.find_by_id(&f.referred.id).await.unwrap().unwrap();
        assert!(referred.has_joined_quiz);
        assert!(referred.referral_bonus_given);
    }

    #[tokio::test]
    async fn configured_bonus_overrides_default() {
        let f = fixture().await;
        f.service
            .set_referral_bonus(Money::from_major(25))
            .await
            .unwrap();

        let paid = f.service.unlock_on_first_join(&f.referred).await.unwrap();
        assert_eq!(paid, Some(Money::from_major(25)));
    }

    #[tokio::test]
    async fn unreferred_user_only_flips_first_join_flag() {
        let f = fixture().await;

        let paid = f.service.unlock_on_first_join(&f.referrer).await.unwrap();
        assert_eq!(paid, None);

        let user = f.users.find_by_id(&f.referrer.id).await.unwrap().unwrap();
        assert!(user.has_joined_quiz);
        assert!(!user.referral_bonus_given);
    }

    #[tokio::test]
    async fn failed_settings_read_leaves_bonus_for_the_retry() {
        let settings = Arc::new(FlakySettings::default());
        settings.down.store(true, Ordering::SeqCst);
        let f = fixture_with(settings.clone()).await;

        let failed = f.service.unlock_on_first_join(&f.referred).await;
        assert!(matches!(failed, Err(AppError::DatabaseError(_))));

        let referred = f.users.find_by_id(&f.referred.id).await.unwrap().unwrap();
        assert!(!referred.has_joined_quiz);
        assert!(!referred.referral_bonus_given);

        settings.down.store(false, Ordering::SeqCst);
        let paid = f.service.unlock_on_first_join(&referred).await.unwrap();
        assert_eq!(paid, Some(Money::from_major(10)));

        let referred = f.users.find_by_id(&f.referred.id).await.unwrap().unwrap();
        assert!(referred.has_joined_quiz);
        assert_eq!(
            f.users.find_by_id(&f.referrer.id).await.unwrap().unwrap().wallet,
            Money::from_major(10)
        );
    }
}
