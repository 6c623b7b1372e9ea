mod common;

use goalfund::models::{AccountType, LedgerEntryRequest, LedgerTransactionType};
use goalfund::repositories::{AccountRepository, BalanceSnapshotRepository, LedgerRepository};
use goalfund::services::LedgerService;
use uuid::Uuid;

fn ledger_service(pool: sqlx::PgPool) -> LedgerService {
    LedgerService::new(
        AccountRepository::new(pool.clone()),
        LedgerRepository::new(pool.clone()),
        BalanceSnapshotRepository::new(pool),
    )
}

#[tokio::test]
async fn test_post_transaction_moves_balance_between_accounts() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let ledger = ledger_service(pool.clone());

    let escrow = ledger
        .get_or_create_account(AccountType::Escrow, Uuid::nil(), "NGN")
        .await
        .expect("get_or_create escrow");
    let goal_account = ledger
        .get_or_create_account(AccountType::Goal, Uuid::new_v4(), "NGN")
        .await
        .expect("get_or_create goal account");

    let entries = vec![
        LedgerEntryRequest::debit(escrow.id, 50_000),
        LedgerEntryRequest::credit(goal_account.id, 50_000),
    ];

    let tx_id = ledger
        .post_transaction(
            LedgerTransactionType::Contribution,
            Some("contribution settlement".to_string()),
            entries,
            "NGN",
            None,
            Some(format!("payment-{}", Uuid::new_v4())),
        )
        .await
        .expect("post_transaction");

    assert_ne!(tx_id, Uuid::nil());

    let escrow_balance = ledger.get_balance(escrow.id, "NGN").await.expect("escrow balance");
    let goal_balance = ledger.get_balance(goal_account.id, "NGN").await.expect("goal balance");

    assert_eq!(escrow_balance, -50_000);
    assert_eq!(goal_balance, 50_000);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_post_transaction_is_idempotent_on_key() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let ledger = ledger_service(pool.clone());

    let escrow = ledger
        .get_or_create_account(AccountType::Escrow, Uuid::nil(), "NGN")
        .await
        .expect("get_or_create escrow");
    let goal_account = ledger
        .get_or_create_account(AccountType::Goal, Uuid::new_v4(), "NGN")
        .await
        .expect("get_or_create goal account");

    let idempotency_key = format!("payment-{}", Uuid::new_v4());

    let entries_first = vec![
        LedgerEntryRequest::debit(escrow.id, 10_000),
        LedgerEntryRequest::credit(goal_account.id, 10_000),
    ];
    let tx1 = ledger
        .post_transaction(
            LedgerTransactionType::Contribution,
            None,
            entries_first,
            "NGN",
            None,
            Some(idempotency_key.clone()),
        )
        .await
        .expect("first post");

    // A redelivered event handler retries with the same idempotency key —
    // post_transaction must return the original transaction, not post twice.
    let entries_second = vec![
        LedgerEntryRequest::debit(escrow.id, 10_000),
        LedgerEntryRequest::credit(goal_account.id, 10_000),
    ];
    let tx2 = ledger
        .post_transaction(
            LedgerTransactionType::Contribution,
            None,
            entries_second,
            "NGN",
            None,
            Some(idempotency_key),
        )
        .await
        .expect("second post");

    assert_eq!(tx1, tx2);

    let goal_balance = ledger.get_balance(goal_account.id, "NGN").await.expect("goal balance");
    assert_eq!(goal_balance, 10_000, "balance must reflect one posting, not two");

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_reconcile_corrects_snapshot_drift() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let ledger = ledger_service(pool.clone());

    let escrow = ledger
        .get_or_create_account(AccountType::Escrow, Uuid::nil(), "NGN")
        .await
        .expect("get_or_create escrow");
    let goal_account = ledger
        .get_or_create_account(AccountType::Goal, Uuid::new_v4(), "NGN")
        .await
        .expect("get_or_create goal account");

    let entries = vec![
        LedgerEntryRequest::debit(escrow.id, 25_000),
        LedgerEntryRequest::credit(goal_account.id, 25_000),
    ];
    ledger
        .post_transaction(
            LedgerTransactionType::Contribution,
            None,
            entries,
            "NGN",
            None,
            Some(format!("payment-{}", Uuid::new_v4())),
        )
        .await
        .expect("post_transaction");

    // Corrupt the advisory snapshot directly to simulate drift.
    sqlx::query("UPDATE balance_snapshots SET balance = balance + 999 WHERE account_id = $1")
        .bind(goal_account.id)
        .execute(&pool)
        .await
        .expect("corrupt snapshot");

    let result = ledger.reconcile(goal_account.id, "NGN").await.expect("reconcile");
    assert!(!result.matches);
    assert_eq!(result.computed, 25_000);
    assert_eq!(result.snapshot, 25_000 + 999);

    // A second reconcile should now find the snapshot corrected.
    let result2 = ledger.reconcile(goal_account.id, "NGN").await.expect("reconcile again");
    assert!(result2.matches);
    assert_eq!(result2.snapshot, 25_000);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_get_or_create_account_is_idempotent() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let ledger = ledger_service(pool.clone());
    let entity_id = Uuid::new_v4();

    let a1 = ledger
        .get_or_create_account(AccountType::Goal, entity_id, "NGN")
        .await
        .expect("first get_or_create");
    let a2 = ledger
        .get_or_create_account(AccountType::Goal, entity_id, "NGN")
        .await
        .expect("second get_or_create");

    assert_eq!(a1.id, a2.id);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_ledger_entries_are_append_only_and_counted_per_account() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let accounts = AccountRepository::new(pool.clone());
    let ledger_repo = LedgerRepository::new(pool.clone());
    let ledger = ledger_service(pool.clone());

    let escrow = accounts
        .get_or_create(AccountType::Escrow, Uuid::nil(), "NGN")
        .await
        .expect("get_or_create escrow");
    let goal_account = accounts
        .get_or_create(AccountType::Goal, Uuid::new_v4(), "NGN")
        .await
        .expect("get_or_create goal account");

    assert_eq!(
        ledger_repo
            .count_entries_by_account(goal_account.id)
            .await
            .expect("count before"),
        0
    );

    for _ in 0..3 {
        let entries = vec![
            LedgerEntryRequest::debit(escrow.id, 1_000),
            LedgerEntryRequest::credit(goal_account.id, 1_000),
        ];
        ledger
            .post_transaction(
                LedgerTransactionType::Contribution,
                None,
                entries,
                "NGN",
                None,
                Some(format!("payment-{}", Uuid::new_v4())),
            )
            .await
            .expect("post_transaction");
    }

    assert_eq!(
        ledger_repo
            .count_entries_by_account(goal_account.id)
            .await
            .expect("count after"),
        3
    );
    assert_eq!(ledger.get_balance(goal_account.id, "NGN").await.expect("balance"), 3_000);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_post_transaction_rejects_unbalanced_entries() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let ledger = ledger_service(pool.clone());

    let escrow = ledger
        .get_or_create_account(AccountType::Escrow, Uuid::nil(), "NGN")
        .await
        .expect("get_or_create escrow");
    let goal_account = ledger
        .get_or_create_account(AccountType::Goal, Uuid::new_v4(), "NGN")
        .await
        .expect("get_or_create goal account");

    let unbalanced = vec![
        LedgerEntryRequest::debit(escrow.id, 5_000),
        LedgerEntryRequest::credit(goal_account.id, 4_000),
    ];

    let result = ledger
        .post_transaction(
            LedgerTransactionType::Contribution,
            None,
            unbalanced,
            "NGN",
            None,
            Some(format!("payment-{}", Uuid::new_v4())),
        )
        .await;

    assert!(result.is_err(), "unbalanced entries must be rejected before any write");
    assert_eq!(ledger.get_balance(goal_account.id, "NGN").await.expect("balance"), 0);

    common::cleanup_test_data(&pool).await;
}
