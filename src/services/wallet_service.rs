use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Money, Transaction, TransactionKind, User},
    repositories::{TransactionRepository, UserRepository},
    services::notification_service::NotificationDispatcher,
};

/// Outcome of one ledger operation.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub new_balance: Money,
    pub transaction: Transaction,
}

/// The only writer of wallet balances. Each change is an atomic
/// conditional update paired with exactly one ledger row.
pub struct WalletService {
    users: Arc<dyn UserRepository>,
    transactions: Arc<dyn TransactionRepository>,
    notifications: NotificationDispatcher,
}

impl WalletService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        transactions: Arc<dyn TransactionRepository>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            users,
            transactions,
            notifications,
        }
    }

    pub async fn balance(&self, user_id: &str) -> AppResult<Money> {
        Ok(self.find_user(user_id).await?.wallet)
    }

    pub async fn debit(
        &self,
        user_id: &str,
        amount: Money,
        kind: TransactionKind,
        description: &str,
    ) -> AppResult<LedgerEntry> {
        Self::require_positive(amount)?;

        let user = match self.users.debit_wallet(user_id, amount).await? {
            Some(user) => user,
            None => {
                let user = self.find_user(user_id).await?;
                return Err(AppError::InsufficientFunds {
                    balance: user.wallet,
                    required: amount,
                });
            }
        };

        let transaction = Transaction::success(user_id, kind, amount, description);
        let transaction = match self.transactions.create(transaction).await {
            Ok(transaction) => transaction,
            Err(e) => {
                self.undo_balance_change(user_id, amount, true).await;
                return Err(e);
            }
        };

        log::info!(
            "Debited {} from {} ({:?}), balance now {}",
            amount,
            user_id,
            kind,
            user.wallet
        );
        self.notifications
            .dispatch(
                user_id,
                "Wallet debited",
                &format!("{} debited from your wallet. Available balance: {}", amount, user.wallet),
            )
            .await;

        Ok(LedgerEntry {
            new_balance: user.wallet,
            transaction,
        })
    }

    pub async fn credit(
        &self,
        user_id: &str,
        amount: Money,
        kind: TransactionKind,
        description: &str,
    ) -> AppResult<LedgerEntry> {
        Self::require_positive(amount)?;

        let user = self
            .users
            .credit_wallet(user_id, amount)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", user_id)))?;

        let transaction = Transaction::success(user_id, kind, amount, description);
        let transaction = match self.transactions.create(transaction).await {
            Ok(transaction) => transaction,
            Err(e) => {
                self.undo_balance_change(user_id, amount, false).await;
                return Err(e);
            }
        };

        log::info!(
            "Credited {} to {} ({:?}), balance now {}",
            amount,
            user_id,
            kind,
            user.wallet
        );
        self.notifications
            .dispatch(
                user_id,
                "Wallet credited",
                &format!("{} credited to your wallet. Available balance: {}", amount, user.wallet),
            )
            .await;

        Ok(LedgerEntry {
            new_balance: user.wallet,
            transaction,
        })
    }

    pub async fn transactions_for_user(&self, user_id: &str) -> AppResult<Vec<Transaction>> {
        self.transactions.find_by_user(user_id).await
    }

    async fn find_user(&self, user_id: &str) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", user_id)))
    }

    fn require_positive(amount: Money) -> AppResult<()> {
        if !amount.is_positive() {
            return Err(AppError::ValidationError(format!(
                "Amount must be greater than zero, got {}",
                amount
            )));
        }
        Ok(())
    }

    // Reverts a balance change whose ledger row could not be written.
    async fn undo_balance_change(&self, user_id: &str, amount: Money, was_debit: bool) {
        let reverted = if was_debit {
            self.users.credit_wallet(user_id, amount).await.map(|u| u.is_some())
        } else {
            self.users.debit_wallet(user_id, amount).await.map(|u| u.is_some())
        };

        match reverted {
            Ok(true) => log::warn!(
                "Reverted {} balance change for {} after ledger write failure",
                amount,
                user_id
            ),
            Ok(false) | Err(_) => log::error!(
                "RECONCILE: balance of {} changed by {} ({}) without a ledger row",
                user_id,
                amount,
                if was_debit { "debit" } else { "credit" }
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repositories::memory::{InMemoryTransactionRepository, InMemoryUserRepository},
        services::notification_service::{LogNotifier, MockNotifier},
    };
    use async_trait::async_trait;
    use std::time::Duration;

    async fn setup(balance: Money) -> (WalletService, Arc<InMemoryTransactionRepository>, String) {
        let users = Arc::new(InMemoryUserRepository::new());
        let transactions = Arc::new(InMemoryTransactionRepository::new());
        let user = User::test_user("9000000001", balance);
        users.create(user.clone()).await.unwrap();

        let dispatcher = NotificationDispatcher::new(Arc::new(LogNotifier), Duration::from_secs(1));
        let service = WalletService::new(users, transactions.clone(), dispatcher);
        (service, transactions, user.id)
    }

    #[tokio::test]
    async fn debit_reduces_balance_and_writes_one_row() {
        let (service, transactions, user_id) = setup(Money::from_major(100)).await;

        let entry = service
            .debit(&user_id, Money::from_major(20), TransactionKind::QuizParticipation, "Joined quiz")
            .await
            .expect("debit should succeed");

        assert_eq!(entry.new_balance.to_string(), "80.00");
        assert_eq!(entry.transaction.amount, Money::from_major(20));
        assert!(entry.transaction.transaction_id.starts_with("QV"));

        let rows = transactions.find_by_user(&user_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, TransactionKind::QuizParticipation);
    }

    #[tokio::test]
    async fn debit_of_entire_balance_is_allowed() {
        let (service, _, user_id) = setup(Money::from_major(20)).await;

        let entry = service
            .debit(&user_id, Money::from_major(20), TransactionKind::QuizParticipation, "Joined quiz")
            .await
            .unwrap();
        assert_eq!(entry.new_balance, Money::ZERO);
    }

    #[tokio::test]
    async fn debit_beyond_balance_is_rejected_without_side_effects() {
        let (service, transactions, user_id) = setup(Money::from_minor(1999)).await;

        let result = service
            .debit(&user_id, Money::from_major(20), TransactionKind::QuizParticipation, "Joined quiz")
            .await;

        match result {
            Err(AppError::InsufficientFunds { balance, required }) => {
                assert_eq!(balance, Money::from_minor(1999));
                assert_eq!(required, Money::from_major(20));
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
        assert_eq!(service.balance(&user_id).await.unwrap(), Money::from_minor(1999));
        assert!(transactions.find_by_user(&user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_positive_amounts_are_invalid() {
        let (service, _, user_id) = setup(Money::from_major(100)).await;

        let result = service
            .credit(&user_id, Money::ZERO, TransactionKind::AddMoney, "Top-up")
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (service, _, _) = setup(Money::from_major(100)).await;

        let debit = service
            .debit("missing", Money::from_major(1), TransactionKind::QuizParticipation, "x")
            .await;
        assert!(matches!(debit, Err(AppError::NotFound(_))));

        let credit = service
            .credit("missing", Money::from_major(1), TransactionKind::AddMoney, "x")
            .await;
        assert!(matches!(credit, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_credit() {
        let users = Arc::new(InMemoryUserRepository::new());
        let user = User::test_user("9000000002", Money::ZERO);
        users.create(user.clone()).await.unwrap();

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .times(1)
            .returning(|_, _, _| Err(AppError::InternalError("push failed".to_string())));
        let dispatcher = NotificationDispatcher::new(Arc::new(notifier), Duration::from_secs(1));
        let service = WalletService::new(
            users,
            Arc::new(InMemoryTransactionRepository::new()),
            dispatcher,
        );

        let entry = service
            .credit(&user.id, Money::from_major(50), TransactionKind::AddMoney, "Top-up")
            .await
            .expect("credit should succeed despite notification failure");
        assert_eq!(entry.new_balance.to_string(), "50.00");
    }

    struct FailingTransactionRepository;

    #[async_trait]
    impl TransactionRepository for FailingTransactionRepository {
        async fn create(&self, _transaction: Transaction) -> AppResult<Transaction> {
            Err(AppError::DatabaseError("ledger unavailable".to_string()))
        }

        async fn find_by_user(&self, _user_id: &str) -> AppResult<Vec<Transaction>> {
            Ok(Vec::new())
        }

        async fn ensure_indexes(&self) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn ledger_failure_reverts_the_debit() {
        let users = Arc::new(InMemoryUserRepository::new());
        let user = User::test_user("9000000003", Money::from_major(100));
        users.create(user.clone()).await.unwrap();

        let dispatcher = NotificationDispatcher::new(Arc::new(LogNotifier), Duration::from_secs(1));
        let service = WalletService::new(
            users.clone(),
            Arc::new(FailingTransactionRepository),
            dispatcher,
        );

        let result = service
            .debit(&user.id, Money::from_major(20), TransactionKind::QuizParticipation, "Joined quiz")
            .await;

        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert_eq!(service.balance(&user.id).await.unwrap(), Money::from_major(100));
    }
}
