use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Debit or credit side of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entry_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    pub fn opposite(&self) -> Self {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }

    /// Sign applied when summing entries into a running balance (credit-normal).
    pub fn sign(&self) -> i64 {
        match self {
            EntryType::Credit => 1,
            EntryType::Debit => -1,
        }
    }
}

/// One immutable half-posting. Append-only: never updated, never deleted (L2).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub entry_type: EntryType,
    pub amount: i64,
    pub currency: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn debit(transaction_id: Uuid, account_id: Uuid, amount: i64, currency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id,
            account_id,
            entry_type: EntryType::Debit,
            amount,
            currency,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn credit(transaction_id: Uuid, account_id: Uuid, amount: i64, currency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id,
            account_id,
            entry_type: EntryType::Credit,
            amount,
            currency,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Signed contribution of this entry to a credit-normal running balance.
    pub fn signed_amount(&self) -> i64 {
        self.amount * self.entry_type.sign()
    }
}

/// A request for one leg of a `PostTransaction` call, before the entry has an id.
#[derive(Debug, Clone)]
pub struct LedgerEntryRequest {
    pub account_id: Uuid,
    pub entry_type: EntryType,
    pub amount: i64,
    pub description: Option<String>,
}

impl LedgerEntryRequest {
    pub fn debit(account_id: Uuid, amount: i64) -> Self {
        Self {
            account_id,
            entry_type: EntryType::Debit,
            amount,
            description: None,
        }
    }

    pub fn credit(account_id: Uuid, amount: i64) -> Self {
        Self {
            account_id,
            entry_type: EntryType::Credit,
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Validates a set of entry requests is a well-formed double-entry posting (T1, L1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEntryError {
    Unbalanced { debits: i64, credits: i64 },
    NonPositiveAmount,
    EmptyEntries,
    MissingSide(EntryType),
}

impl std::fmt::Display for LedgerEntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntryError::Unbalanced { debits, credits } => {
                write!(f, "unbalanced transaction: debits={debits} credits={credits}")
            }
            LedgerEntryError::NonPositiveAmount => write!(f, "entry amount must be positive"),
            LedgerEntryError::EmptyEntries => write!(f, "transaction must have at least one entry"),
            LedgerEntryError::MissingSide(side) => write!(f, "transaction missing a {side:?} entry"),
        }
    }
}

impl std::error::Error for LedgerEntryError {}

/// Validates debit/credit equality (T1) and positivity (L1) for a proposed posting.
pub fn validate_entries(entries: &[LedgerEntryRequest]) -> Result<(), LedgerEntryError> {
    if entries.is_empty() {
        return Err(LedgerEntryError::EmptyEntries);
    }

    if entries.iter().any(|e| e.amount <= 0) {
        return Err(LedgerEntryError::NonPositiveAmount);
    }

    let debits: i64 = entries
        .iter()
        .filter(|e| e.entry_type == EntryType::Debit)
        .map(|e| e.amount)
        .sum();
    let credits: i64 = entries
        .iter()
        .filter(|e| e.entry_type == EntryType::Credit)
        .map(|e| e.amount)
        .sum();

    if debits == 0 {
        return Err(LedgerEntryError::MissingSide(EntryType::Debit));
    }
    if credits == 0 {
        return Err(LedgerEntryError::MissingSide(EntryType::Credit));
    }

    if debits != credits {
        return Err(LedgerEntryError::Unbalanced { debits, credits });
    }

    Ok(())
}
