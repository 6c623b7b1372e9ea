use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::events::consumer::{ConsumedMessage, MessageHandler};
use crate::events::types::{
    EventType, PaymentVerifiedEvent, RefundDisbursementRequestedEvent, WithdrawalRequestedEvent,
};
use crate::idempotency::handler::{IdempotencyCheckResult, IdempotencyHandler};
use crate::services::{DisbursementService, GoalsService};
use std::sync::Arc;

/// Routes consumed domain events to the Goals Coordinator and Disbursement
/// Adapter — the consumer side of the transactional outbox (§4.4). Every
/// message is deduped on its envelope `event_id` before dispatch, so a
/// redelivery from the at-least-once bus is a safe no-op regardless of
/// whether the handler it would have called is itself idempotent.
pub struct EventDispatcher {
    goals_service: Arc<GoalsService>,
    disbursement_service: Arc<DisbursementService>,
    idempotency: Arc<IdempotencyHandler>,
}

impl EventDispatcher {
    pub fn new(
        goals_service: Arc<GoalsService>,
        disbursement_service: Arc<DisbursementService>,
        idempotency: Arc<IdempotencyHandler>,
    ) -> Self {
        Self {
            goals_service,
            disbursement_service,
            idempotency,
        }
    }

    /// Dispatches one already-dedup-checked event by type. Event types this
    /// dispatcher's services don't consume (`PaymentFailed`,
    /// `ContributionConfirmed`, the settlement-terminal events, and
    /// `LedgerEntryCreated`, which exists for external audit consumers
    /// outside this crate's scope) are acked as a no-op.
    async fn route(&self, event_type: EventType, payload: serde_json::Value) -> Result<()> {
        match event_type {
            EventType::PaymentVerified => {
                let event: PaymentVerifiedEvent = serde_json::from_value(payload)
                    .map_err(|e| AppError::Validation(format!("malformed PaymentVerified payload: {e}")))?;
                self.goals_service
                    .on_payment_verified(
                        event.payment_id,
                        event.contribution_id,
                        event.goal_id,
                        event.amount,
                        &event.currency,
                    )
                    .await
            }
            EventType::WithdrawalRequested => {
                let event: WithdrawalRequestedEvent = serde_json::from_value(payload)
                    .map_err(|e| AppError::Validation(format!("malformed WithdrawalRequested payload: {e}")))?;
                self.disbursement_service
                    .initiate_withdrawal_transfer(
                        event.withdrawal_id,
                        event.amount,
                        &event.currency,
                        &event.bank.bank_code,
                        &event.bank.account_number,
                        &event.bank.account_name,
                    )
                    .await
            }
            EventType::RefundDisbursementRequested => {
                let event: RefundDisbursementRequestedEvent = serde_json::from_value(payload).map_err(|e| {
                    AppError::Validation(format!("malformed RefundDisbursementRequested payload: {e}"))
                })?;
                self.disbursement_service
                    .initiate_refund_transfer(
                        event.disbursement_id,
                        event.amount,
                        &event.currency,
                        &event.bank.bank_code,
                        &event.bank.account_number,
                        &event.bank.account_name,
                    )
                    .await
            }
            EventType::PaymentFailed
            | EventType::ContributionConfirmed
            | EventType::RefundInitiated
            | EventType::WithdrawalCompleted
            | EventType::WithdrawalFailed
            | EventType::RefundDisbursementCompleted
            | EventType::RefundDisbursementFailed
            | EventType::LedgerEntryCreated => {
                tracing::debug!(?event_type, "event has no in-process consumer, acking");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl MessageHandler for EventDispatcher {
    async fn handle(&self, message: &ConsumedMessage) -> Result<()> {
        let envelope: serde_json::Value = message.deserialize()?;

        let event_id = envelope
            .get("event_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::Validation("bus message missing event_id".to_string()))?
            .to_string();
        let event_type: EventType = envelope
            .get("event_type")
            .cloned()
            .ok_or_else(|| AppError::Validation("bus message missing event_type".to_string()))
            .and_then(|v| {
                serde_json::from_value(v)
                    .map_err(|e| AppError::Validation(format!("unrecognized event_type on bus message: {e}")))
            })?;
        let payload = envelope
            .get("payload")
            .cloned()
            .ok_or_else(|| AppError::Validation("bus message missing payload".to_string()))?;

        let request_hash = {
            let mut hasher = Sha256::new();
            hasher.update(payload.to_string().as_bytes());
            hex::encode(hasher.finalize())
        };

        match self
            .idempotency
            .check::<()>(&event_id, "event-consumer", &format!("{event_type:?}"), &request_hash)
            .await?
        {
            IdempotencyCheckResult::Duplicate(()) => return Ok(()),
            IdempotencyCheckResult::Processing => {
                // Another delivery of the same event is in flight (likely a
                // near-simultaneous redelivery) — nack so the broker retries
                // rather than racing it.
                return Err(AppError::Validation(format!(
                    "event {event_id} is already being processed by another delivery"
                )));
            }
            IdempotencyCheckResult::New => {}
        }

        match self.route(event_type, payload).await {
            Ok(()) => {
                self.idempotency.complete(&event_id, &()).await?;
                Ok(())
            }
            Err(e) => {
                self.idempotency.fail(&event_id, &e.to_string()).await?;
                Err(e)
            }
        }
    }
}
