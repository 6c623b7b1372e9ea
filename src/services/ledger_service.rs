use crate::cache::BalanceCache;
use crate::error::{AppError, Result};
use crate::events::{topics, EventType, LedgerEntryCreatedEvent, LedgerEntrySummary, OutboxEvent};
use crate::models::{
    validate_entries, Account, AccountType, BalanceSnapshot, LedgerEntry, LedgerEntryRequest,
    LedgerTransaction, LedgerTransactionType,
};
use crate::observability::metrics::get_metrics;
use crate::repositories::{AccountRepository, BalanceSnapshotRepository, LedgerRepository};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of `Reconcile`: compares the ledger-derived balance (source of
/// truth) against the cached snapshot row.
#[derive(Debug, Clone)]
pub struct ReconciliationResult {
    pub account_id: Uuid,
    pub currency: String,
    pub computed: i64,
    pub snapshot: i64,
    pub matches: bool,
}

/// Ledger Core (LC): owns `accounts`, `ledger_transactions`, `ledger_entries`
/// and the advisory `balance_snapshots` cache. No other service writes these
/// tables directly (§5) — all cross-service effects reach the ledger through
/// this service's `post_transaction`.
pub struct LedgerService {
    accounts: AccountRepository,
    ledger: LedgerRepository,
    snapshots: BalanceSnapshotRepository,
    cache: Option<Arc<BalanceCache>>,
}

impl LedgerService {
    pub fn new(
        accounts: AccountRepository,
        ledger: LedgerRepository,
        snapshots: BalanceSnapshotRepository,
    ) -> Self {
        Self {
            accounts,
            ledger,
            snapshots,
            cache: None,
        }
    }

    /// Adds the Redis balance cache in front of `get_balance` (ambient
    /// read-path acceleration; the cache is consulted, never trusted —
    /// `Reconcile` still always recomputes from `ledger_entries`).
    pub fn with_cache(mut self, cache: Arc<BalanceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// GetOrCreateAccount: idempotent via the (account_type, entity_id,
    /// currency) unique index (A1).
    pub async fn get_or_create_account(
        &self,
        account_type: AccountType,
        entity_id: Uuid,
        currency: &str,
    ) -> Result<Account> {
        self.accounts.get_or_create(account_type, entity_id, currency).await
    }

    /// PostTransaction: validates the entries form a balanced, positive-only
    /// posting (T1, L1), then writes the transaction and all entries in one
    /// DB transaction (T3). When `idempotency_key` is `Some` and a prior
    /// transaction already carries it, returns that transaction's id instead
    /// of posting again — callers (contribution confirmation, withdrawal and
    /// refund settlement) always pass one so their event handlers are safe
    /// to redeliver.
    pub async fn post_transaction(
        &self,
        transaction_type: LedgerTransactionType,
        description: Option<String>,
        entries: Vec<LedgerEntryRequest>,
        currency: &str,
        metadata: Option<Value>,
        idempotency_key: Option<String>,
    ) -> Result<Uuid> {
        if let Some(key) = idempotency_key.as_deref() {
            if let Some(existing) = self.ledger.find_transaction_by_idempotency_key(key).await? {
                return Ok(existing.id);
            }
        }

        validate_entries(&entries)
            .map_err(|e| crate::error::invariant_violation(format!("unbalanced ledger posting: {e}")))?;

        let amount = entries
            .iter()
            .filter(|e| e.entry_type == crate::models::EntryType::Credit)
            .map(|e| e.amount)
            .sum();

        let mut transaction = LedgerTransaction::new(
            transaction_type,
            amount,
            currency.to_string(),
            idempotency_key,
        );
        if let Some(description) = description {
            transaction = transaction.with_description(description);
        }
        if let Some(metadata) = metadata {
            transaction = transaction.with_metadata(metadata);
        }

        let ledger_entries: Vec<LedgerEntry> = entries
            .into_iter()
            .map(|e| {
                let mut entry = match e.entry_type {
                    crate::models::EntryType::Debit => {
                        LedgerEntry::debit(transaction.id, e.account_id, e.amount, currency.to_string())
                    }
                    crate::models::EntryType::Credit => {
                        LedgerEntry::credit(transaction.id, e.account_id, e.amount, currency.to_string())
                    }
                };
                if let Some(description) = e.description {
                    entry = entry.with_description(description);
                }
                entry
            })
            .collect();

        let outbox_payload = LedgerEntryCreatedEvent {
            transaction_id: transaction.id,
            entries: ledger_entries
                .iter()
                .map(|e| LedgerEntrySummary {
                    account_id: e.account_id,
                    entry_type: e.entry_type,
                    amount: e.amount,
                })
                .collect(),
        };
        let outbox_event = OutboxEvent::new(
            EventType::LedgerEntryCreated,
            topics::LEDGER,
            serde_json::to_value(&outbox_payload)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serialize ledger outbox payload: {e}")))?,
        );

        let (transaction, _) = self
            .ledger
            .create_transaction_with_entries_and_outbox(&transaction, &ledger_entries, &outbox_event)
            .await?;

        get_metrics().record_ledger_transaction_posted(transaction_type_label(transaction.transaction_type), currency);

        for entry in &ledger_entries {
            if let Err(e) = self.apply_snapshot_delta(entry.account_id, currency, entry.signed_amount()).await {
                tracing::warn!(account_id = %entry.account_id, error = %e, "failed to update balance snapshot after posting");
            }
            if let Some(cache) = &self.cache {
                if let Err(e) = cache.invalidate(entry.account_id, currency).await {
                    tracing::warn!(account_id = %entry.account_id, error = %e, "failed to invalidate balance cache after posting");
                }
            }
        }

        Ok(transaction.id)
    }

    /// GetBalance: consults the Redis cache first when configured, otherwise
    /// recomputes from `ledger_entries` (the source of truth) and warms the
    /// cache with the result. `as_of` is currently unused — history-scoped
    /// balances are left to `LedgerRepository::find_transactions_by_time_range`
    /// callers.
    pub async fn get_balance(&self, account_id: Uuid, currency: &str) -> Result<i64> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(account_id, currency).await? {
                return Ok(cached.balance);
            }
        }

        let computed = self.ledger.compute_balance(account_id, currency).await?;

        if let Some(cache) = &self.cache {
            let snapshot = BalanceSnapshot::new(account_id, currency.to_string(), computed);
            if let Err(e) = cache.set(&snapshot).await {
                tracing::warn!(account_id = %account_id, error = %e, "failed to warm balance cache");
            }
        }

        Ok(computed)
    }

    /// Reconcile: compares the ledger-derived balance against the cached
    /// snapshot and corrects drift. A mismatch is never silently absorbed —
    /// it's logged as an invariant-adjacent event (via metrics) even though
    /// the snapshot itself is advisory and gets overwritten here.
    pub async fn reconcile(&self, account_id: Uuid, currency: &str) -> Result<ReconciliationResult> {
        let computed = self.ledger.compute_balance(account_id, currency).await?;
        let snapshot = self.snapshots.get_or_create(account_id, currency).await?;
        let matches = computed == snapshot.balance;

        if !matches {
            get_metrics().record_reconciliation_mismatch(currency);
            tracing::warn!(
                account_id = %account_id,
                currency = %currency,
                computed,
                snapshot = snapshot.balance,
                "balance snapshot drifted from ledger, correcting"
            );
            self.snapshots.reconcile_to(account_id, currency, computed).await?;
        }

        Ok(ReconciliationResult {
            account_id,
            currency: currency.to_string(),
            computed,
            snapshot: snapshot.balance,
            matches,
        })
    }

    /// Applies a signed delta to the advisory snapshot row, retrying on the
    /// rare optimistic-locking race with a concurrent poster on the same
    /// account. The snapshot is never authoritative — `Reconcile` recomputes
    /// it from `ledger_entries` regardless — so a failure here is logged and
    /// swallowed rather than failing the (already-committed) posting.
    async fn apply_snapshot_delta(&self, account_id: Uuid, currency: &str, delta: i64) -> Result<()> {
        for _ in 0..5 {
            let snapshot = self.snapshots.get_or_create(account_id, currency).await?;
            if self
                .snapshots
                .apply_delta(account_id, currency, delta, snapshot.version)
                .await?
                .is_some()
            {
                return Ok(());
            }
        }
        Err(AppError::Internal(anyhow::anyhow!(
            "balance snapshot update for {account_id} lost the optimistic-lock race too many times"
        )))
    }
}

fn transaction_type_label(t: LedgerTransactionType) -> &'static str {
    match t {
        LedgerTransactionType::Contribution => "contribution",
        LedgerTransactionType::Withdrawal => "withdrawal",
        LedgerTransactionType::Refund => "refund",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryType;

    #[test]
    fn test_post_transaction_requires_balanced_entries_upfront() {
        let acc1 = Uuid::new_v4();
        let acc2 = Uuid::new_v4();
        let entries = vec![
            LedgerEntryRequest::debit(acc1, 50_000),
            LedgerEntryRequest::credit(acc2, 40_000),
        ];
        assert!(validate_entries(&entries).is_err());
    }

    #[test]
    fn test_transaction_type_label() {
        assert_eq!(transaction_type_label(LedgerTransactionType::Contribution), "contribution");
        assert_eq!(transaction_type_label(LedgerTransactionType::Withdrawal), "withdrawal");
        assert_eq!(transaction_type_label(LedgerTransactionType::Refund), "refund");
    }

    #[test]
    fn test_entry_type_used_for_amount_sum() {
        let acc1 = Uuid::new_v4();
        let acc2 = Uuid::new_v4();
        let entries = vec![
            LedgerEntryRequest::debit(acc1, 50_000),
            LedgerEntryRequest::credit(acc2, 50_000),
        ];
        let credit_total: i64 = entries
            .iter()
            .filter(|e| e.entry_type == EntryType::Credit)
            .map(|e| e.amount)
            .sum();
        assert_eq!(credit_total, 50_000);
    }
}
