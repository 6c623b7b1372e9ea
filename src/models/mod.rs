pub mod account;
pub mod account_balance;
pub mod contribution;
pub mod currency;
pub mod goal;
pub mod ledger_entry;
pub mod ledger_transaction;
pub mod payment;
pub mod refund;
pub mod webhook_event;
pub mod withdrawal;

pub use account::{Account, AccountType};
pub use account_balance::BalanceSnapshot;
pub use contribution::{Contribution, ContributionStatus};
pub use currency::Currency;
pub use goal::{BankSnapshot, Goal, GoalStatus};
pub use ledger_entry::{EntryType, LedgerEntry, LedgerEntryError, LedgerEntryRequest};
pub use ledger_transaction::{LedgerTransaction, LedgerTransactionType};
pub use payment::{Payment, PaymentStatus};
pub use refund::{Refund, RefundDisbursement, RefundStatus};
pub use webhook_event::WebhookEvent;
pub use withdrawal::{Withdrawal, WithdrawalStatus};
