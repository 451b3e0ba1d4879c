pub mod join_service;
pub mod notification_service;
pub mod question_service;
pub mod quiz_classifier;
pub mod quiz_service;
pub mod referral_service;
pub mod scoring_service;
pub mod streak_service;
pub mod time_parser;
pub mod wallet_service;
