use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for GoalFund.
#[derive(Debug, Clone)]
pub struct Metrics {
    initialized: bool,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self { initialized: true }
    }

    pub fn record_ledger_transaction_posted(&self, transaction_type: &str, currency: &str) {
        counter!("goalfund_ledger_transactions_total", "type" => transaction_type.to_string(), "currency" => currency.to_string()).increment(1);
    }

    pub fn record_ledger_write_latency(&self, duration_ms: f64) {
        histogram!("goalfund_ledger_write_duration_ms").record(duration_ms);
    }

    pub fn record_balance_query_latency(&self, duration_ms: f64, cache_hit: bool) {
        histogram!("goalfund_balance_query_duration_ms", "cache_hit" => cache_hit.to_string()).record(duration_ms);
    }

    pub fn record_reconciliation_mismatch(&self, currency: &str) {
        counter!("goalfund_reconciliation_mismatches_total", "currency" => currency.to_string()).increment(1);
    }

    pub fn record_payment_initialized(&self, currency: &str) {
        counter!("goalfund_payments_initialized_total", "currency" => currency.to_string()).increment(1);
    }

    pub fn record_payment_verified(&self, currency: &str) {
        counter!("goalfund_payments_verified_total", "currency" => currency.to_string()).increment(1);
    }

    pub fn record_payment_failed(&self, reason: &str) {
        counter!("goalfund_payments_failed_total", "reason" => reason.to_string()).increment(1);
    }

    pub fn record_webhook_received(&self, event_type: &str, signature_valid: bool) {
        counter!("goalfund_webhooks_received_total", "event_type" => event_type.to_string(), "signature_valid" => signature_valid.to_string()).increment(1);
    }

    pub fn record_webhook_duplicate(&self) {
        counter!("goalfund_webhooks_duplicate_total").increment(1);
    }

    pub fn record_contribution_confirmed(&self, currency: &str) {
        counter!("goalfund_contributions_confirmed_total", "currency" => currency.to_string()).increment(1);
    }

    pub fn record_withdrawal_requested(&self, currency: &str) {
        counter!("goalfund_withdrawals_requested_total", "currency" => currency.to_string()).increment(1);
    }

    pub fn record_withdrawal_settled(&self, currency: &str, success: bool) {
        counter!("goalfund_withdrawals_settled_total", "currency" => currency.to_string(), "success" => success.to_string()).increment(1);
    }

    pub fn record_refund_initiated(&self, currency: &str) {
        counter!("goalfund_refunds_initiated_total", "currency" => currency.to_string()).increment(1);
    }

    pub fn record_refund_disbursement_settled(&self, currency: &str, success: bool) {
        counter!("goalfund_refund_disbursements_settled_total", "currency" => currency.to_string(), "success" => success.to_string()).increment(1);
    }

    /// `webhook.signature.invalid` (§8 scenario 6) — distinct from the
    /// combined `signature_valid` label on `record_webhook_received` so
    /// operators can alert on this counter alone.
    pub fn record_webhook_signature_invalid(&self) {
        counter!("goalfund_webhooks_signature_invalid_total").increment(1);
    }

    /// Bumped whenever an `AppError::InvariantViolation` is returned — these
    /// are fatal data-corruption signals (§7), never silently recovered.
    pub fn record_invariant_violation(&self, context: &str) {
        counter!("goalfund_invariant_violations_total", "context" => context.to_string()).increment(1);
    }

    pub fn record_outbox_drained(&self, count: u64) {
        counter!("goalfund_outbox_events_published_total").increment(count);
    }

    pub fn record_idempotency_duplicate(&self, operation_type: &str) {
        counter!("goalfund_idempotency_duplicates_total", "operation_type" => operation_type.to_string()).increment(1);
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_ms: f64) {
        counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string()).increment(1);
        histogram!("http_request_duration_ms", "method" => method.to_string(), "path" => path.to_string()).record(duration_ms);
    }

    pub fn record_db_query(&self, query_type: &str, duration_ms: f64, success: bool) {
        counter!("db_queries_total", "type" => query_type.to_string(), "success" => success.to_string()).increment(1);
        histogram!("db_query_duration_ms", "type" => query_type.to_string()).record(duration_ms);
    }

    pub fn record_redis_operation(&self, operation: &str, duration_ms: f64, success: bool) {
        counter!("redis_operations_total", "operation" => operation.to_string(), "success" => success.to_string()).increment(1);
        histogram!("redis_operation_duration_ms", "operation" => operation.to_string()).record(duration_ms);
    }

    pub fn record_kafka_message(&self, topic: &str, success: bool) {
        counter!("kafka_messages_total", "topic" => topic.to_string(), "success" => success.to_string()).increment(1);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Initializes the metrics system and returns the Prometheus handle.
pub fn init_metrics() -> PrometheusHandle {
    let handle = METRICS_HANDLE.get_or_init(|| {
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        describe_metrics();
        handle
    });

    METRICS.get_or_init(Metrics::new);

    handle.clone()
}

/// Describes all metrics for Prometheus.
fn describe_metrics() {
    describe_counter!("goalfund_ledger_transactions_total", Unit::Count, "Total number of ledger transactions posted");
    describe_histogram!("goalfund_ledger_write_duration_ms", Unit::Milliseconds, "Ledger write latency in milliseconds");
    describe_histogram!("goalfund_balance_query_duration_ms", Unit::Milliseconds, "Balance query latency in milliseconds");
    describe_counter!("goalfund_reconciliation_mismatches_total", Unit::Count, "Total reconciliation mismatches between ledger and snapshot");

    describe_counter!("goalfund_payments_initialized_total", Unit::Count, "Total payments initialized");
    describe_counter!("goalfund_payments_verified_total", Unit::Count, "Total payments verified");
    describe_counter!("goalfund_payments_failed_total", Unit::Count, "Total payments failed");
    describe_counter!("goalfund_webhooks_received_total", Unit::Count, "Total provider webhooks received");
    describe_counter!("goalfund_webhooks_duplicate_total", Unit::Count, "Total duplicate provider webhooks ignored");

    describe_counter!("goalfund_contributions_confirmed_total", Unit::Count, "Total contributions confirmed");
    describe_counter!("goalfund_withdrawals_requested_total", Unit::Count, "Total withdrawals requested");
    describe_counter!("goalfund_withdrawals_settled_total", Unit::Count, "Total withdrawals settled");
    describe_counter!("goalfund_refunds_initiated_total", Unit::Count, "Total refunds initiated");
    describe_counter!("goalfund_refund_disbursements_settled_total", Unit::Count, "Total refund disbursements settled");
    describe_counter!("goalfund_outbox_events_published_total", Unit::Count, "Total outbox events published to the bus");
    describe_counter!("goalfund_idempotency_duplicates_total", Unit::Count, "Total idempotent operations short-circuited as duplicates");
    describe_counter!("goalfund_webhooks_signature_invalid_total", Unit::Count, "Total webhooks rejected for signature mismatch");
    describe_counter!("goalfund_invariant_violations_total", Unit::Count, "Total invariant violations detected at runtime");

    describe_counter!("http_requests_total", Unit::Count, "Total HTTP requests");
    describe_histogram!("http_request_duration_ms", Unit::Milliseconds, "HTTP request latency in milliseconds");

    describe_counter!("db_queries_total", Unit::Count, "Total database queries");
    describe_histogram!("db_query_duration_ms", Unit::Milliseconds, "Database query latency in milliseconds");

    describe_counter!("redis_operations_total", Unit::Count, "Total Redis operations");
    describe_histogram!("redis_operation_duration_ms", Unit::Milliseconds, "Redis operation latency in milliseconds");

    describe_counter!("kafka_messages_total", Unit::Count, "Total Kafka messages");
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
