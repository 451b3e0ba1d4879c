pub mod money;
pub mod question;
pub mod quiz;
pub mod quiz_result;
pub mod quiz_streak;
pub mod streak_reward;
pub mod transaction;
pub mod user;

pub use money::Money;
pub use question::Question;
pub use quiz::{PrizeTier, Quiz, QuizType};
pub use quiz_result::{AnswerSnapshot, QuizResult};
pub use quiz_streak::{QuizStreak, StreakRewardEntry, StreakTransition};
pub use streak_reward::{ReferralSettings, StreakReward};
pub use transaction::{Transaction, TransactionKind, TransactionStatus};
pub use user::{ReferralEarning, User, UserRole};
