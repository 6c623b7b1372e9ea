use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::requests::{
    CreateContributionRequest, CreateGoalRequest, CreateRefundRequest, CreateWithdrawalRequest,
    GoalActionRequest, InitializePaymentRequest, UpdateGoalRequest,
};
use crate::api::responses::{
    ApiResponse, BalanceResponse, ContributionResponse, ErrorResponse, GoalResponse,
    HealthResponse, InitializePaymentResponse, PaymentResponse, RefundResponse, ServiceHealth,
    ValidationErrorDetail, WithdrawalResponse,
};
use crate::error::AppError;

use super::routes::AppState;

type ApiError = (StatusCode, Json<ApiResponse<()>>);

fn validation_error(errors: Vec<crate::api::requests::ValidationError>) -> ApiError {
    let details: Vec<ValidationErrorDetail> = errors.into_iter().map(Into::into).collect();
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(
            ErrorResponse::new("VALIDATION_ERROR", "request validation failed").with_details(details),
        )),
    )
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        (
            err.status_code(),
            Json(ApiResponse::<()>::error(ErrorResponse::new(err.code(), err.to_string()))),
        )
    }
}

// ============================================================================
// Health / observability
// ============================================================================

pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok();
    let redis_healthy = state.redis_client.get_multiplexed_async_connection().await.is_ok();
    let kafka_healthy = state.kafka_connected();

    let response = HealthResponse {
        status: if db_healthy && redis_healthy { "healthy".to_string() } else { "degraded".to_string() },
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        services: ServiceHealth {
            database: db_healthy,
            redis: redis_healthy,
            kafka: kafka_healthy,
        },
    };

    Json(ApiResponse::success(response))
}

/// `GET /health/detailed`: the full `HealthChecker` sweep over Postgres,
/// Redis and Kafka, rather than `health_check`'s shallow inline probe.
pub async fn detailed_health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<crate::observability::AggregatedHealth>>, ApiError> {
    let checker = state
        .health_checker
        .as_ref()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("health checker not configured")))?;

    let health = checker.check_all().await;
    Ok(Json(ApiResponse::success(health)))
}

pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok();
    if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> (StatusCode, String) {
    match &state.metrics_handle {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::SERVICE_UNAVAILABLE, String::new()),
    }
}

// ============================================================================
// Payment Gateway Core
// ============================================================================

/// `POST /payments/initialize`.
pub async fn initialize_payment(
    State(state): State<AppState>,
    Json(request): Json<InitializePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InitializePaymentResponse>>), ApiError> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(errors));
    }

    let result = state
        .payment_service
        .initialize(
            request.user_id,
            request.goal_id,
            request.contribution_id,
            request.amount,
            &request.currency,
            &request.email,
            request.callback_url.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(result.into()))))
}

/// `GET /payments/verify/{reference}`.
pub async fn verify_payment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ApiError> {
    let payment = state.payment_service.verify(&reference).await?;
    Ok(Json(ApiResponse::success(payment.into())))
}

/// `POST /payments/webhook`. The provider's HMAC signature covers the raw
/// body, so the handler takes bytes and parses JSON itself rather than
/// letting axum's `Json` extractor consume and reserialize it first.
pub async fn payment_webhook(
    State(state): State<AppState>,
    axum::extract::Query(params): axum::extract::Query<std::collections::HashMap<String, String>>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get("x-provider-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed webhook body: {e}")))?;

    let event_type = params
        .get("event_type")
        .cloned()
        .or_else(|| payload.get("event").and_then(|v| v.as_str()).map(str::to_string))
        .ok_or_else(|| AppError::Validation("webhook missing event_type".to_string()))?;

    state
        .payment_service
        .ingest_webhook(&event_type, payload, &body, signature)
        .await?;

    Ok(StatusCode::OK)
}

// ============================================================================
// Goals Coordinator
// ============================================================================

/// `POST /goals`.
pub async fn create_goal(
    State(state): State<AppState>,
    Json(request): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GoalResponse>>), ApiError> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(errors));
    }

    let goal = state
        .goals_service
        .create_goal(
            request.owner_id,
            request.target_amount,
            &request.currency,
            request.deadline,
            request.bank.map(Into::into),
            request.fixed_contribution_amount,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(goal.into()))))
}

/// `GET /goals/{id}`.
pub async fn get_goal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<GoalResponse>>, ApiError> {
    let goal = state.goals_service.get_goal(id).await?;
    Ok(Json(ApiResponse::success(goal.into())))
}

/// `PATCH /goals/{id}`.
pub async fn update_goal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateGoalRequest>,
) -> Result<Json<ApiResponse<GoalResponse>>, ApiError> {
    let goal = state
        .goals_service
        .update_goal_details(id, request.owner_id, request.deadline, request.bank.map(Into::into))
        .await?;
    Ok(Json(ApiResponse::success(goal.into())))
}

/// `POST /goals/{id}/close`.
pub async fn close_goal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<GoalActionRequest>,
) -> Result<Json<ApiResponse<GoalResponse>>, ApiError> {
    let goal = state.goals_service.close_goal(id, request.owner_id).await?;
    Ok(Json(ApiResponse::success(goal.into())))
}

/// `POST /goals/{id}/cancel`.
pub async fn cancel_goal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<GoalActionRequest>,
) -> Result<Json<ApiResponse<GoalResponse>>, ApiError> {
    let goal = state.goals_service.cancel_goal(id, request.owner_id).await?;
    Ok(Json(ApiResponse::success(goal.into())))
}

/// `POST /goals/{id}/contributions`: creates the intent a client then pays
/// against via `POST /payments/initialize`.
pub async fn create_contribution(
    State(state): State<AppState>,
    Path(goal_id): Path<Uuid>,
    Json(request): Json<CreateContributionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ContributionResponse>>), ApiError> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(errors));
    }

    let contribution = state
        .goals_service
        .create_contribution_intent(goal_id, request.user_id, request.amount)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(contribution.into()))))
}

/// `POST /goals/{id}/withdrawals`.
pub async fn create_withdrawal(
    State(state): State<AppState>,
    Path(goal_id): Path<Uuid>,
    Json(request): Json<CreateWithdrawalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WithdrawalResponse>>), ApiError> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(errors));
    }

    let withdrawal = state
        .goals_service
        .request_withdrawal(goal_id, request.owner_id, request.amount, request.bank.map(Into::into))
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(withdrawal.into()))))
}

/// `POST /goals/{id}/refunds`.
pub async fn create_refund(
    State(state): State<AppState>,
    Path(goal_id): Path<Uuid>,
    Json(request): Json<CreateRefundRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RefundResponse>>), ApiError> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(errors));
    }

    let refund = state
        .goals_service
        .initiate_refund(goal_id, request.initiated_by, request.percentage, request.reason)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(refund.into()))))
}

// ============================================================================
// Ledger Core (read path)
// ============================================================================

/// `GET /accounts/{id}/balance`.
pub async fn get_account_balance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BalanceResponse>>, ApiError> {
    let account = state
        .accounts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {id} not found")))?;

    let balance = state.ledger_service.get_balance(account.id, &account.currency).await?;

    Ok(Json(ApiResponse::success(BalanceResponse {
        account_id: account.id,
        currency: account.currency,
        balance,
    })))
}
