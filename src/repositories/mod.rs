pub mod account_repository;
pub mod balance_repository;
pub mod contribution_repository;
pub mod goal_repository;
pub mod ledger_repository;
pub mod payment_repository;
pub mod refund_repository;
pub mod webhook_event_repository;
pub mod withdrawal_repository;

pub use account_repository::AccountRepository;
pub use balance_repository::BalanceSnapshotRepository;
pub use contribution_repository::ContributionRepository;
pub use goal_repository::GoalRepository;
pub use ledger_repository::LedgerRepository;
pub use payment_repository::PaymentRepository;
pub use refund_repository::{RefundDisbursementRepository, RefundRepository};
pub use webhook_event_repository::WebhookEventRepository;
pub use withdrawal_repository::WithdrawalRepository;

use sqlx::PgPool;

/// Database connection pool type alias.
pub type DbPool = PgPool;
