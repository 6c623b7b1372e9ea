mod common;

use goalfund::api::requests::{
    CreateContributionRequest, CreateGoalRequest, CreateRefundRequest, CreateWithdrawalRequest,
    InitializePaymentRequest, PageQuery,
};
use goalfund::api::responses::{
    ApiResponse, ContributionResponse, ErrorResponse, GoalResponse, PaginatedResponse,
    ValidationErrorDetail, WithdrawalResponse,
};
use goalfund::models::{AccountType, GoalStatus};
use goalfund::repositories::{
    AccountRepository, BalanceSnapshotRepository, ContributionRepository, GoalRepository,
    LedgerRepository, RefundDisbursementRepository, RefundRepository, WithdrawalRepository,
};
use goalfund::services::{GoalsService, LedgerService};
use uuid::Uuid;

fn ledger_service(pool: sqlx::PgPool) -> std::sync::Arc<LedgerService> {
    std::sync::Arc::new(LedgerService::new(
        AccountRepository::new(pool.clone()),
        LedgerRepository::new(pool.clone()),
        BalanceSnapshotRepository::new(pool),
    ))
}

fn goals_service(pool: sqlx::PgPool, ledger: std::sync::Arc<LedgerService>) -> GoalsService {
    GoalsService::new(
        pool.clone(),
        GoalRepository::new(pool.clone()),
        ContributionRepository::new(pool.clone()),
        WithdrawalRepository::new(pool.clone()),
        RefundRepository::new(pool.clone()),
        RefundDisbursementRepository::new(pool.clone()),
        ledger,
    )
}

#[test]
fn test_api_response_success_serialization() {
    let response: ApiResponse<String> = ApiResponse::success("test data".to_string());
    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"success\":true"));
    assert!(json.contains("\"data\":\"test data\""));
}

#[test]
fn test_api_response_error_serialization() {
    let error = ErrorResponse::new("VALIDATION_ERROR", "invalid request");
    let response: ApiResponse<()> = ApiResponse::<()>::error(error);
    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"success\":false"));
    assert!(json.contains("\"code\":\"VALIDATION_ERROR\""));
}

#[test]
fn test_error_response_carries_validation_details() {
    let details = vec![ValidationErrorDetail { field: "amount".to_string(), message: "must be positive".to_string() }];
    let err = ErrorResponse::new("VALIDATION_ERROR", "invalid request").with_details(details);
    assert_eq!(err.details.unwrap().len(), 1);
}

#[test]
fn test_initialize_payment_request_rejects_malformed_currency_and_email() {
    let request = InitializePaymentRequest {
        user_id: Uuid::new_v4(),
        goal_id: Uuid::new_v4(),
        contribution_id: Uuid::new_v4(),
        amount: 0,
        currency: "NG".to_string(),
        email: "not-an-email".to_string(),
        callback_url: None,
        metadata: None,
    };
    let errors = request.validate().unwrap_err();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().any(|e| e.field == "amount"));
    assert!(errors.iter().any(|e| e.field == "currency"));
    assert!(errors.iter().any(|e| e.field == "email"));
}

#[test]
fn test_create_goal_request_rejects_non_positive_target_amount() {
    let request = CreateGoalRequest {
        owner_id: Uuid::new_v4(),
        target_amount: 0,
        currency: "NGN".to_string(),
        deadline: None,
        bank: None,
        fixed_contribution_amount: None,
    };
    let errors = request.validate().unwrap_err();
    assert!(errors.iter().any(|e| e.field == "target_amount"));
}

#[test]
fn test_create_contribution_request_validation() {
    let valid = CreateContributionRequest { user_id: Uuid::new_v4(), amount: 5_000 };
    assert!(valid.validate().is_ok());

    let invalid = CreateContributionRequest { user_id: Uuid::new_v4(), amount: -5 };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_create_withdrawal_request_validation() {
    let valid = CreateWithdrawalRequest { owner_id: Uuid::new_v4(), amount: 5_000, bank: None };
    assert!(valid.validate().is_ok());

    let invalid = CreateWithdrawalRequest { owner_id: Uuid::new_v4(), amount: 0, bank: None };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_create_refund_request_rejects_percentage_out_of_bounds() {
    let valid = CreateRefundRequest { initiated_by: Uuid::new_v4(), percentage: 100, reason: None };
    assert!(valid.validate().is_ok());

    let invalid = CreateRefundRequest { initiated_by: Uuid::new_v4(), percentage: 0, reason: None };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_page_query_defaults_and_clamps() {
    let q = PageQuery::default();
    assert_eq!(q.limit(), 50);
    assert_eq!(q.offset(), 0);

    let clamped = PageQuery { limit: Some(10_000), offset: Some(-5) };
    assert_eq!(clamped.limit(), 200);
    assert_eq!(clamped.offset(), 0);
}

#[test]
fn test_paginated_response_new() {
    let page = PaginatedResponse::new(vec![1, 2, 3], 50, 0);
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.limit, 50);
    assert_eq!(page.offset, 0);
}

/// `GoalResponse::from` flattens the goal's optional bank snapshot into
/// individual nullable fields, matching what `GET /goals/{id}` returns.
#[tokio::test]
async fn test_goal_response_from_goal() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let ledger = ledger_service(pool.clone());
    let goals = goals_service(pool.clone(), ledger);
    let owner_id = Uuid::new_v4();
    let goal = goals
        .create_goal(owner_id, 250_000, "NGN", None, None, None)
        .await
        .expect("create goal");

    let response: GoalResponse = goal.clone().into();
    assert_eq!(response.id, goal.id);
    assert_eq!(response.target_amount, 250_000);
    assert_eq!(response.status, GoalStatus::Open);
    assert!(response.bank_code.is_none());

    common::cleanup_test_data(&pool).await;
}

/// `ContributionResponse::from` surfaces `payment_id` as `None` until a
/// payment is attached, matching `POST /goals/{id}/contributions`'s response.
#[tokio::test]
async fn test_contribution_response_from_contribution() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let ledger = ledger_service(pool.clone());
    let goals = goals_service(pool.clone(), ledger);
    let owner_id = Uuid::new_v4();
    let goal = goals.create_goal(owner_id, 250_000, "NGN", None, None, None).await.expect("create goal");
    let contribution = goals
        .create_contribution_intent(goal.id, owner_id, 25_000)
        .await
        .expect("create contribution intent");

    let response: ContributionResponse = contribution.clone().into();
    assert_eq!(response.id, contribution.id);
    assert_eq!(response.amount, 25_000);
    assert!(response.payment_id.is_none());

    common::cleanup_test_data(&pool).await;
}

/// `WithdrawalResponse::from` carries the resolved bank destination flat,
/// the same fields `POST /goals/{id}/withdrawals` returns to the caller.
#[tokio::test]
async fn test_withdrawal_response_from_withdrawal() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let ledger = ledger_service(pool.clone());
    let goals = goals_service(pool.clone(), ledger.clone());
    let owner_id = Uuid::new_v4();
    let bank = goalfund::models::BankSnapshot {
        bank_code: "044".to_string(),
        account_number: "0123456789".to_string(),
        account_name: "Ada Lovelace".to_string(),
    };
    let goal = goals
        .create_goal(owner_id, 250_000, "NGN", None, Some(bank.clone()), None)
        .await
        .expect("create goal");
    let contribution = goals.create_contribution_intent(goal.id, owner_id, 50_000).await.expect("contribution intent");
    goals.on_payment_verified(Uuid::new_v4(), contribution.id, goal.id, 50_000, "NGN").await.expect("fund goal");

    let withdrawal = goals.request_withdrawal(goal.id, owner_id, 50_000, None).await.expect("request withdrawal");
    let response: WithdrawalResponse = withdrawal.clone().into();
    assert_eq!(response.amount, 50_000);
    assert_eq!(response.bank_code, "044");

    common::cleanup_test_data(&pool).await;
}

/// `GET /accounts/{id}/balance` reads through `LedgerService::get_balance`,
/// which recomputes from `ledger_entries` rather than trusting the snapshot.
#[tokio::test]
async fn test_balance_response_reflects_posted_ledger_entries() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let ledger = ledger_service(pool.clone());
    let goals = goals_service(pool.clone(), ledger.clone());
    let owner_id = Uuid::new_v4();
    let goal = goals.create_goal(owner_id, 250_000, "NGN", None, None, None).await.expect("create goal");
    let contribution = goals.create_contribution_intent(goal.id, owner_id, 75_000).await.expect("contribution intent");
    goals.on_payment_verified(Uuid::new_v4(), contribution.id, goal.id, 75_000, "NGN").await.expect("fund goal");

    let goal_account = ledger.get_or_create_account(AccountType::Goal, goal.id, "NGN").await.expect("account");
    let balance = ledger.get_balance(goal_account.id, "NGN").await.expect("balance");
    assert_eq!(balance, 75_000);

    common::cleanup_test_data(&pool).await;
}

/// A request to close a goal that isn't the caller's own surfaces as a
/// handler-level `AppError::Unauthorized`, which `impl IntoResponse for
/// AppError` maps to HTTP 401 with an `ErrorResponse` body.
#[tokio::test]
async fn test_goal_close_by_non_owner_maps_to_unauthorized_error() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let ledger = ledger_service(pool.clone());
    let goals = goals_service(pool.clone(), ledger);
    let owner_id = Uuid::new_v4();
    let stranger_id = Uuid::new_v4();
    let goal = goals.create_goal(owner_id, 250_000, "NGN", None, None, None).await.expect("create goal");

    let result = goals.close_goal(goal.id, stranger_id).await;
    let err = result.expect_err("non-owner close must fail");
    assert_eq!(err.status_code(), http::StatusCode::UNAUTHORIZED);
    assert_eq!(err.code(), "UNAUTHORIZED");

    common::cleanup_test_data(&pool).await;
}

/// A goal not found by id maps to HTTP 404 with the `NOT_FOUND` error code.
#[tokio::test]
async fn test_get_missing_goal_maps_to_not_found_error() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let ledger = ledger_service(pool.clone());
    let goals = goals_service(pool.clone(), ledger);
    let result = goals.get_goal(Uuid::new_v4()).await;
    let err = result.expect_err("missing goal must 404");
    assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
    assert_eq!(err.code(), "NOT_FOUND");

    common::cleanup_test_data(&pool).await;
}
