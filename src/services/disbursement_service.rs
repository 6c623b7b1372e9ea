use crate::error::{AppError, Result};
use crate::events::{topics, EventType, OutboxEvent, RefundDisbursementSettledEvent, WithdrawalSettledEvent};
use crate::models::{RefundStatus, WithdrawalStatus};
use crate::repositories::{RefundDisbursementRepository, WithdrawalRepository};
use crate::services::provider_client::{ProviderClient, ProviderTransferStatus, TransferDestination};
use std::sync::Arc;
use uuid::Uuid;

const WITHDRAWAL_REFERENCE_PREFIX: &str = "WD-";
const REFUND_REFERENCE_PREFIX: &str = "REFUND-";

/// Disbursement Adapter (DA): executes outward transfers for withdrawals and
/// refund disbursements and maps provider status into domain events (§4.5).
/// Owns neither the `withdrawals` nor `refund_disbursements` tables — it only
/// transitions their status, the same tables GC owns and reads back.
pub struct DisbursementService {
    withdrawals: WithdrawalRepository,
    refund_disbursements: RefundDisbursementRepository,
    provider: Arc<dyn ProviderClient>,
}

impl DisbursementService {
    pub fn new(
        withdrawals: WithdrawalRepository,
        refund_disbursements: RefundDisbursementRepository,
        provider: Arc<dyn ProviderClient>,
    ) -> Self {
        Self {
            withdrawals,
            refund_disbursements,
            provider,
        }
    }

    /// Picks up a `WithdrawalRequested` event: flips PENDING -> PROCESSING
    /// (so a concurrent settlement webhook has a terminal state to land on
    /// only after this), then calls the provider's two-step transfer.
    pub async fn initiate_withdrawal_transfer(
        &self,
        withdrawal_id: Uuid,
        amount: i64,
        currency: &str,
        bank_code: &str,
        account_number: &str,
        account_name: &str,
    ) -> Result<()> {
        let Some(_) = self
            .withdrawals
            .try_transition(withdrawal_id, WithdrawalStatus::Pending, WithdrawalStatus::Processing)
            .await?
        else {
            // Already picked up by a prior, redelivered copy of this event.
            return Ok(());
        };

        let reference = format!("{WITHDRAWAL_REFERENCE_PREFIX}{withdrawal_id}");
        let destination = TransferDestination {
            bank_code: bank_code.to_string(),
            account_number: account_number.to_string(),
            account_name: account_name.to_string(),
        };

        match self.provider.initiate_transfer(&reference, amount, currency, &destination).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(withdrawal_id = %withdrawal_id, error = %e, "withdrawal transfer initiation failed");
                Err(e)
            }
        }
    }

    /// Picks up a refund disbursement: same PENDING -> PROCESSING guard as
    /// withdrawals, keyed by `REFUND-<disbursement_id>`.
    pub async fn initiate_refund_transfer(
        &self,
        disbursement_id: Uuid,
        amount: i64,
        currency: &str,
        bank_code: &str,
        account_number: &str,
        account_name: &str,
    ) -> Result<()> {
        let Some(_) = self
            .refund_disbursements
            .try_transition(disbursement_id, RefundStatus::Pending, RefundStatus::Processing, None)
            .await?
        else {
            return Ok(());
        };

        let reference = format!("{REFUND_REFERENCE_PREFIX}{disbursement_id}");
        let destination = TransferDestination {
            bank_code: bank_code.to_string(),
            account_number: account_number.to_string(),
            account_name: account_name.to_string(),
        };

        match self.provider.initiate_transfer(&reference, amount, currency, &destination).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(disbursement_id = %disbursement_id, error = %e, "refund transfer initiation failed");
                Err(e)
            }
        }
    }

    /// OnTransferWebhook: routes a signature-verified `transfer.success` /
    /// `transfer.failed` event by the reference prefix it carries, emitting
    /// the matching settlement event for GC to consume. PGC hands this the
    /// already-verified event; DA never re-checks the signature.
    pub fn route_transfer_webhook(&self, reference: &str, succeeded: bool) -> Result<OutboxEvent> {
        if let Some(rest) = reference.strip_prefix(WITHDRAWAL_REFERENCE_PREFIX) {
            let withdrawal_id = Uuid::parse_str(rest)
                .map_err(|_| AppError::Validation(format!("malformed withdrawal reference: {reference}")))?;
            let payload = WithdrawalSettledEvent {
                withdrawal_id,
                ledger_transaction_id: None,
            };
            let event_type = if succeeded {
                EventType::WithdrawalCompleted
            } else {
                EventType::WithdrawalFailed
            };
            return Ok(OutboxEvent::new(
                event_type,
                topics::WITHDRAWALS,
                serde_json::to_value(&payload)
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serialize WithdrawalSettled: {e}")))?,
            ));
        }

        if let Some(rest) = reference.strip_prefix(REFUND_REFERENCE_PREFIX) {
            let disbursement_id = Uuid::parse_str(rest)
                .map_err(|_| AppError::Validation(format!("malformed refund reference: {reference}")))?;
            let payload = RefundDisbursementSettledEvent {
                disbursement_id,
                refund_id: Uuid::nil(),
                contribution_id: Uuid::nil(),
                ledger_transaction_id: None,
            };
            let event_type = if succeeded {
                EventType::RefundDisbursementCompleted
            } else {
                EventType::RefundDisbursementFailed
            };
            return Ok(OutboxEvent::new(
                event_type,
                topics::REFUNDS,
                serde_json::to_value(&payload)
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serialize RefundDisbursementSettled: {e}")))?,
            ));
        }

        Err(AppError::Validation(format!("unrecognized transfer reference prefix: {reference}")))
    }
}
