use crate::config::ProviderSettings;
use crate::error::{AppError, Result};
use crate::events::{
    topics, EventType, PaymentFailedEvent, PaymentVerifiedEvent,
};
use crate::events::OutboxEvent;
use crate::models::{Payment, PaymentStatus, WebhookEvent};
use crate::observability::metrics::get_metrics;
use crate::repositories::{ContributionRepository, PaymentRepository, WebhookEventRepository};
use crate::services::disbursement_service::DisbursementService;
use crate::services::goals_service::GoalsService;
use crate::services::provider_client::{ProviderClient, ProviderPaymentStatus};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::sync::Arc;
use uuid::Uuid;

type HmacSha512 = Hmac<Sha512>;

/// Minimum payment size PGC accepts (§4.1).
pub const MIN_PAYMENT_MINOR_UNITS: i64 = 100;

/// Result of `Initialize`.
#[derive(Debug, Clone)]
pub struct InitializeResult {
    pub payment_id: Uuid,
    pub authorization_url: String,
    pub reference: String,
}

/// Payment Gateway Core (PGC): owns `payments` and `webhook_events`. The sole
/// emitter of `PaymentVerified`/`PaymentFailed` (§4.1).
pub struct PaymentService {
    payments: PaymentRepository,
    contributions: ContributionRepository,
    webhook_events: WebhookEventRepository,
    provider: Arc<dyn ProviderClient>,
    settings: ProviderSettings,
    goals: Arc<GoalsService>,
    disbursement: Arc<DisbursementService>,
}

impl PaymentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        payments: PaymentRepository,
        contributions: ContributionRepository,
        webhook_events: WebhookEventRepository,
        provider: Arc<dyn ProviderClient>,
        settings: ProviderSettings,
        goals: Arc<GoalsService>,
        disbursement: Arc<DisbursementService>,
    ) -> Self {
        Self {
            payments,
            contributions,
            webhook_events,
            provider,
            settings,
            goals,
            disbursement,
        }
    }

    /// Initialize: opens a payment with the provider against a contribution
    /// intent that's already been created. `contribution_id` carries the
    /// correlation `OnPaymentVerified` later needs (§9).
    #[allow(clippy::too_many_arguments)]
    pub async fn initialize(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        contribution_id: Uuid,
        amount: i64,
        currency: &str,
        email: &str,
        callback_url: Option<&str>,
    ) -> Result<InitializeResult> {
        if amount < MIN_PAYMENT_MINOR_UNITS {
            return Err(AppError::Validation(format!(
                "amount must be at least {MIN_PAYMENT_MINOR_UNITS} minor units"
            )));
        }

        let reference = format!("PAY-{}", Uuid::new_v4().simple());
        let payment = Payment::new(
            user_id,
            goal_id,
            contribution_id,
            reference.clone(),
            amount,
            currency.to_string(),
        );
        let payment = self.payments.create(&payment).await?;

        let provider_response = self
            .provider
            .initialize_payment(&reference, amount, currency, email, callback_url)
            .await?;

        get_metrics().record_payment_initialized(currency);

        Ok(InitializeResult {
            payment_id: payment.id,
            authorization_url: provider_response.authorization_url,
            reference: provider_response.provider_reference,
        })
    }

    /// Verify: the synchronous path. Idempotent — if already VERIFIED, returns
    /// without calling the provider again or re-emitting anything (P2, P3).
    pub async fn verify(&self, reference: &str) -> Result<Payment> {
        let payment = self
            .payments
            .find_by_provider_reference(reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("payment {reference} not found")))?;

        if payment.status.is_terminal() {
            return Ok(payment);
        }

        let verification = self.provider.verify_payment(reference).await?;

        match verification.status {
            ProviderPaymentStatus::Success => {
                if verification.amount != payment.amount || verification.currency != payment.currency {
                    return Err(AppError::Validation(format!(
                        "amount/currency mismatch verifying {reference}: provider reported {} {}, expected {} {}",
                        verification.amount, verification.currency, payment.amount, payment.currency
                    )));
                }
                self.settle_verified(&payment).await
            }
            ProviderPaymentStatus::Failed => self.settle_failed(&payment, "provider reported failure").await,
            ProviderPaymentStatus::Pending => {
                self.payments
                    .try_transition(payment.id, payment.status, PaymentStatus::Pending)
                    .await?;
                Ok(payment)
            }
        }
    }

    /// Atomically transitions a payment to VERIFIED and appends
    /// `PaymentVerified` to the outbox in the same DB write (§4.1
    /// concurrency contract). A lost CAS race means another caller (Verify
    /// or the webhook path) already won — that winner's event is
    /// authoritative, so this call returns the now-current row instead of
    /// emitting a second event.
    async fn settle_verified(&self, payment: &Payment) -> Result<Payment> {
        let payload = PaymentVerifiedEvent {
            payment_id: payment.id,
            contribution_id: payment.contribution_id,
            user_id: payment.user_id,
            goal_id: payment.goal_id,
            amount: payment.amount,
            currency: payment.currency.clone(),
        };
        let outbox_event = OutboxEvent::new(
            EventType::PaymentVerified,
            topics::PAYMENTS,
            serde_json::to_value(&payload)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serialize PaymentVerified: {e}")))?,
        );

        for from in [PaymentStatus::Initialized, PaymentStatus::Pending] {
            if let Some(updated) = self
                .payments
                .try_transition_with_outbox(payment.id, from, PaymentStatus::Verified, &outbox_event)
                .await?
            {
                get_metrics().record_payment_verified(&payment.currency);
                return Ok(updated);
            }
        }

        self.payments
            .find_by_id(payment.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("payment {} vanished mid-settlement", payment.id)))
    }

    async fn settle_failed(&self, payment: &Payment, reason: &str) -> Result<Payment> {
        let payload = PaymentFailedEvent {
            payment_id: payment.id,
            reason: reason.to_string(),
        };
        let outbox_event = OutboxEvent::new(
            EventType::PaymentFailed,
            topics::PAYMENTS,
            serde_json::to_value(&payload)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serialize PaymentFailed: {e}")))?,
        );

        for from in [PaymentStatus::Initialized, PaymentStatus::Pending] {
            if let Some(updated) = self
                .payments
                .try_transition_with_outbox(payment.id, from, PaymentStatus::Failed, &outbox_event)
                .await?
            {
                get_metrics().record_payment_failed(reason);
                return Ok(updated);
            }
        }

        self.payments
            .find_by_id(payment.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("payment {} vanished mid-settlement", payment.id)))
    }

    /// Verifies the provider's HMAC-SHA512 signature over the raw request
    /// body, constant-time, per §6.
    pub fn verify_signature(&self, raw_body: &[u8], signature_hex: &str) -> bool {
        let Ok(mut mac) = HmacSha512::new_from_slice(self.settings.webhook_secret.as_bytes()) else {
            return false;
        };
        mac.update(raw_body);
        let expected = mac.finalize().into_bytes();
        let expected_hex = hex::encode(expected);

        // Constant-time comparison against the hex strings, not the raw
        // signature header length, to avoid a timing oracle on length.
        constant_time_eq(expected_hex.as_bytes(), signature_hex.as_bytes())
    }

    /// IngestWebhook: verifies the signature, derives `event_id`, dedups (W1,
    /// W2), and dispatches by event type. The webhook endpoint always 200s
    /// once the event is durably stored — dispatch failures here propagate to
    /// the caller only to drive that decision in the HTTP handler, never to
    /// reject the delivery itself once persisted.
    pub async fn ingest_webhook(
        &self,
        event_type: &str,
        payload: serde_json::Value,
        raw_body: &[u8],
        signature_hex: &str,
    ) -> Result<()> {
        let signature_valid = self.verify_signature(raw_body, signature_hex);
        get_metrics().record_webhook_received(event_type, signature_valid);

        if !signature_valid {
            get_metrics().record_webhook_signature_invalid();
            return Err(AppError::Unauthorized("webhook signature mismatch".to_string()));
        }

        let provider_event_id = derive_event_id(event_type, &payload);
        let event = WebhookEvent::new(
            provider_event_id.clone(),
            event_type.to_string(),
            payload.clone(),
            signature_hex.to_string(),
            signature_valid,
        );

        let Some(event) = self.webhook_events.record_if_new(&event).await? else {
            get_metrics().record_webhook_duplicate();
            return Ok(());
        };

        self.dispatch(&event).await?;
        self.webhook_events.mark_processed(event.id).await?;
        Ok(())
    }

    async fn dispatch(&self, event: &WebhookEvent) -> Result<()> {
        let reference = event
            .payload
            .get("reference")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::Validation("webhook payload missing reference".to_string()))?;

        match event.event_type.as_str() {
            "charge.success" => {
                let payment = self
                    .payments
                    .find_by_provider_reference(reference)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("payment {reference} not found")))?;
                if !payment.status.is_terminal() {
                    self.settle_verified(&payment).await?;
                }
                Ok(())
            }
            "charge.failed" => {
                let payment = self
                    .payments
                    .find_by_provider_reference(reference)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("payment {reference} not found")))?;
                if !payment.status.is_terminal() {
                    self.settle_failed(&payment, "provider reported charge.failed").await?;
                }
                Ok(())
            }
            "transfer.success" | "transfer.failed" => {
                let succeeded = event.event_type == "transfer.success";
                let outbox_event = self.disbursement.route_transfer_webhook(reference, succeeded)?;

                match outbox_event.event_type {
                    EventType::WithdrawalCompleted | EventType::WithdrawalFailed => {
                        let payload: crate::events::WithdrawalSettledEvent =
                            serde_json::from_value(outbox_event.payload).map_err(|e| {
                                AppError::Internal(anyhow::anyhow!("failed to decode WithdrawalSettled: {e}"))
                            })?;
                        self.goals.on_withdrawal_settled(payload.withdrawal_id, succeeded).await
                    }
                    EventType::RefundDisbursementCompleted | EventType::RefundDisbursementFailed => {
                        let payload: crate::events::RefundDisbursementSettledEvent =
                            serde_json::from_value(outbox_event.payload).map_err(|e| {
                                AppError::Internal(anyhow::anyhow!(
                                    "failed to decode RefundDisbursementSettled: {e}"
                                ))
                            })?;
                        self.goals.on_refund_disbursement_settled(payload.disbursement_id, succeeded).await
                    }
                    other => Err(AppError::Internal(anyhow::anyhow!("unexpected transfer event type: {other:?}"))),
                }
            }
            other => Err(AppError::Validation(format!("unrecognized webhook event_type: {other}"))),
        }
    }

    /// Looks up a contribution by the correlation stored at Initialize time,
    /// used by handlers needing to surface a goal's pending payment.
    pub async fn find_payment_by_contribution(&self, contribution_id: Uuid) -> Result<Option<Payment>> {
        self.payments.find_by_contribution_id(contribution_id).await
    }
}

/// `event_id` per §3: provider-assigned id when present, else derived from
/// `<event_type>-<reference>` so redelivered events without a provider id
/// still dedup deterministically.
fn derive_event_id(event_type: &str, payload: &serde_json::Value) -> String {
    if let Some(id) = payload.get("id").and_then(|v| v.as_str()) {
        return id.to_string();
    }
    let reference = payload.get("reference").and_then(|v| v.as_str()).unwrap_or("unknown");
    format!("{event_type}-{reference}")
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{
        AccountRepository, BalanceSnapshotRepository, GoalRepository, LedgerRepository,
        RefundDisbursementRepository, RefundRepository, WithdrawalRepository,
    };
    use crate::services::provider_client::{MockProviderClient, ProviderInitializeResponse};
    use crate::services::LedgerService;

    fn test_settings() -> ProviderSettings {
        ProviderSettings {
            base_url: "https://provider.test".to_string(),
            secret_key: "sk_test".to_string(),
            webhook_secret: "whsec_test".to_string(),
            timeout_secs: 30,
        }
    }

    fn test_goals_and_disbursement() -> (Arc<GoalsService>, Arc<DisbursementService>) {
        let pool = dummy_pool();
        let ledger = Arc::new(LedgerService::new(
            AccountRepository::new(pool.clone()),
            LedgerRepository::new(pool.clone()),
            BalanceSnapshotRepository::new(pool.clone()),
        ));
        let goals = Arc::new(GoalsService::new(
            pool.clone(),
            GoalRepository::new(pool.clone()),
            ContributionRepository::new(pool.clone()),
            WithdrawalRepository::new(pool.clone()),
            RefundRepository::new(pool.clone()),
            RefundDisbursementRepository::new(pool.clone()),
            ledger,
        ));
        let disbursement = Arc::new(DisbursementService::new(
            WithdrawalRepository::new(pool.clone()),
            RefundDisbursementRepository::new(pool.clone()),
            Arc::new(MockProviderClient::new()),
        ));
        (goals, disbursement)
    }

    #[test]
    fn test_derive_event_id_prefers_provider_id() {
        let payload = serde_json::json!({"id": "evt_123", "reference": "PAY-abc"});
        assert_eq!(derive_event_id("charge.success", &payload), "evt_123");
    }

    #[test]
    fn test_derive_event_id_falls_back_to_type_and_reference() {
        let payload = serde_json::json!({"reference": "PAY-abc"});
        assert_eq!(derive_event_id("charge.success", &payload), "charge.success-PAY-abc");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }

    #[test]
    fn test_verify_signature_roundtrip() {
        let settings = test_settings();
        let (goals, disbursement) = test_goals_and_disbursement();
        let service = PaymentService::new(
            PaymentRepository::new(dummy_pool()),
            ContributionRepository::new(dummy_pool()),
            WebhookEventRepository::new(dummy_pool()),
            Arc::new(MockProviderClient::new()),
            settings.clone(),
            goals,
            disbursement,
        );

        let body = b"{\"reference\":\"PAY-abc\"}";
        let mut mac = HmacSha512::new_from_slice(settings.webhook_secret.as_bytes()).unwrap();
        mac.update(body);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(service.verify_signature(body, &signature));
        assert!(!service.verify_signature(body, "deadbeef"));
    }

    #[tokio::test]
    async fn test_initialize_rejects_amount_below_minimum() {
        let (goals, disbursement) = test_goals_and_disbursement();
        let service = PaymentService::new(
            PaymentRepository::new(dummy_pool()),
            ContributionRepository::new(dummy_pool()),
            WebhookEventRepository::new(dummy_pool()),
            Arc::new(MockProviderClient::new()),
            test_settings(),
            goals,
            disbursement,
        );

        let result = service
            .initialize(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 50, "NGN", "ada@example.com", None)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    // A pool that's never actually connected to — fine for unit tests that
    // never reach the database (the ones above short-circuit first).
    fn dummy_pool() -> sqlx::PgPool {
        sqlx::PgPool::connect_lazy("postgres://localhost/goalfund_test_unused")
            .expect("lazy pool construction never touches the network")
    }

    #[allow(dead_code)]
    fn silence_unused_import(_r: ProviderInitializeResponse) {}
}
