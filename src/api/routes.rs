use axum::{
    routing::{get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rskafka::client::Client as KafkaClient;
use sqlx::PgPool;
use std::sync::Arc;

use super::handlers;
use crate::config::ProviderSettings;
use crate::observability::HealthChecker;
use crate::repositories::{
    AccountRepository, BalanceSnapshotRepository, ContributionRepository, GoalRepository,
    LedgerRepository, PaymentRepository, RefundDisbursementRepository, RefundRepository,
    WebhookEventRepository, WithdrawalRepository,
};
use crate::services::{
    DisbursementService, GoalsService, HttpProviderClient, LedgerService, PaymentService,
    ProviderClient,
};

/// Application state shared across handlers. Each of the four services owns
/// its slice of the schema (§4); handlers never touch repositories directly
/// except `accounts`, which backs the read-only balance endpoint.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis_client: redis::Client,
    pub kafka_client: Option<Arc<KafkaClient>>,
    pub metrics_handle: Option<PrometheusHandle>,
    pub health_checker: Option<Arc<HealthChecker>>,
    pub accounts: AccountRepository,
    pub ledger_service: Arc<LedgerService>,
    pub payment_service: Arc<PaymentService>,
    pub goals_service: Arc<GoalsService>,
    pub disbursement_service: Arc<DisbursementService>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        redis_client: redis::Client,
        kafka_client: Option<Arc<KafkaClient>>,
        provider_settings: ProviderSettings,
    ) -> crate::error::Result<Self> {
        let accounts = AccountRepository::new(pool.clone());
        let ledger_service = Arc::new(LedgerService::new(
            accounts.clone(),
            LedgerRepository::new(pool.clone()),
            BalanceSnapshotRepository::new(pool.clone()),
        ));

        let provider: Arc<dyn ProviderClient> = Arc::new(HttpProviderClient::new(provider_settings.clone())?);

        let goals_service = Arc::new(GoalsService::new(
            pool.clone(),
            GoalRepository::new(pool.clone()),
            ContributionRepository::new(pool.clone()),
            WithdrawalRepository::new(pool.clone()),
            RefundRepository::new(pool.clone()),
            RefundDisbursementRepository::new(pool.clone()),
            ledger_service.clone(),
        ));

        let disbursement_service = Arc::new(DisbursementService::new(
            WithdrawalRepository::new(pool.clone()),
            RefundDisbursementRepository::new(pool.clone()),
            provider.clone(),
        ));

        let payment_service = Arc::new(PaymentService::new(
            PaymentRepository::new(pool.clone()),
            ContributionRepository::new(pool.clone()),
            WebhookEventRepository::new(pool.clone()),
            provider,
            provider_settings,
            goals_service.clone(),
            disbursement_service.clone(),
        ));

        Ok(Self {
            pool,
            redis_client,
            kafka_client,
            metrics_handle: None,
            health_checker: None,
            accounts,
            ledger_service,
            payment_service,
            goals_service,
            disbursement_service,
        })
    }

    /// Adds metrics handle to the state.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Adds health checker to the state.
    pub fn with_health_checker(mut self, checker: Arc<HealthChecker>) -> Self {
        self.health_checker = Some(checker);
        self
    }

    /// Returns true if Kafka is connected.
    pub fn kafka_connected(&self) -> bool {
        self.kafka_client.is_some()
    }
}

/// Creates the main API router with all routes (§6).
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/detailed", get(handlers::detailed_health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        // Payment Gateway Core
        .route("/payments/initialize", post(handlers::initialize_payment))
        .route("/payments/verify/:reference", get(handlers::verify_payment))
        .route("/payments/webhook", post(handlers::payment_webhook))
        // Goals Coordinator
        .route("/goals", post(handlers::create_goal))
        .route("/goals/:id", get(handlers::get_goal))
        .route("/goals/:id", patch(handlers::update_goal))
        .route("/goals/:id/close", post(handlers::close_goal))
        .route("/goals/:id/cancel", post(handlers::cancel_goal))
        .route("/goals/:id/contributions", post(handlers::create_contribution))
        .route("/goals/:id/withdrawals", post(handlers::create_withdrawal))
        .route("/goals/:id/refunds", post(handlers::create_refund))
        // Ledger Core read path
        .route("/accounts/:id/balance", get(handlers::get_account_balance))
        .with_state(state)
}
