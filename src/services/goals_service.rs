use crate::error::{AppError, Result};
use crate::events::{
    topics, BankSnapshotPayload, ContributionConfirmedEvent, EventType, OutboxEvent,
    RefundDisbursementRequestedEvent, RefundInitiatedEvent, WithdrawalRequestedEvent,
};
use crate::models::account::PLATFORM_ESCROW_ENTITY_ID;
use crate::models::{
    AccountType, BankSnapshot, Contribution, ContributionStatus, Goal, GoalStatus,
    LedgerEntryRequest, LedgerTransactionType, Refund, RefundDisbursement, RefundStatus,
    Withdrawal, WithdrawalStatus,
};
use crate::observability::metrics::get_metrics;
use crate::repositories::{
    ContributionRepository, GoalRepository, RefundDisbursementRepository, RefundRepository,
    WithdrawalRepository,
};
use crate::services::ledger_service::LedgerService;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Goals Coordinator (GC): owns `goals`, `contributions`, `withdrawals`,
/// `refunds`, `refund_disbursements`. Consumes `PaymentVerified` and
/// transfer-settlement events; produces `ContributionConfirmed`,
/// `WithdrawalRequested`, `RefundInitiated` (§4.3).
pub struct GoalsService {
    pool: PgPool,
    goals: GoalRepository,
    contributions: ContributionRepository,
    withdrawals: WithdrawalRepository,
    refunds: RefundRepository,
    refund_disbursements: RefundDisbursementRepository,
    ledger: Arc<LedgerService>,
}

impl GoalsService {
    pub fn new(
        pool: PgPool,
        goals: GoalRepository,
        contributions: ContributionRepository,
        withdrawals: WithdrawalRepository,
        refunds: RefundRepository,
        refund_disbursements: RefundDisbursementRepository,
        ledger: Arc<LedgerService>,
    ) -> Self {
        Self {
            pool,
            goals,
            contributions,
            withdrawals,
            refunds,
            refund_disbursements,
            ledger,
        }
    }

    /// CreateGoal: the ledger account must exist before any contribution can
    /// land, so it's created here rather than lazily at first posting — a
    /// `PaymentVerified` for a goal with no ledger account is a fatal
    /// invariant violation, not a thing to paper over with get-or-create at
    /// settlement time.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_goal(
        &self,
        owner_id: Uuid,
        target_amount: i64,
        currency: &str,
        deadline: Option<chrono::DateTime<chrono::Utc>>,
        bank: Option<BankSnapshot>,
        fixed_contribution_amount: Option<i64>,
    ) -> Result<Goal> {
        if target_amount <= 0 {
            return Err(AppError::Validation("target_amount must be positive".to_string()));
        }
        if let Some(bank) = &bank {
            bank.validate().map_err(AppError::Validation)?;
        }

        let goal = Goal::new(
            owner_id,
            target_amount,
            currency.to_string(),
            deadline,
            bank,
            fixed_contribution_amount,
        );
        let goal = self.goals.create(&goal).await?;

        self.ledger
            .get_or_create_account(AccountType::Goal, goal.id, currency)
            .await?;

        Ok(goal)
    }

    pub async fn get_goal(&self, id: Uuid) -> Result<Goal> {
        self.goals
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("goal {id} not found")))
    }

    /// PATCH /goals/{id}: updates deadline and/or bank destination. Target
    /// amount and currency are immutable — see the grounding note on
    /// `GoalRepository::update_details`.
    pub async fn update_goal_details(
        &self,
        id: Uuid,
        owner_id: Uuid,
        deadline: Option<chrono::DateTime<chrono::Utc>>,
        bank: Option<BankSnapshot>,
    ) -> Result<Goal> {
        let goal = self.get_goal(id).await?;
        if goal.owner_id != owner_id {
            return Err(AppError::Unauthorized("only the goal owner can update this goal".to_string()));
        }
        if let Some(bank) = &bank {
            bank.validate().map_err(AppError::Validation)?;
        }

        self.goals
            .update_details(id, deadline, bank.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("goal {id} not found")))
    }

    pub async fn close_goal(&self, id: Uuid, owner_id: Uuid) -> Result<Goal> {
        self.transition_goal(id, owner_id, GoalStatus::Closed).await
    }

    pub async fn cancel_goal(&self, id: Uuid, owner_id: Uuid) -> Result<Goal> {
        self.transition_goal(id, owner_id, GoalStatus::Cancelled).await
    }

    async fn transition_goal(&self, id: Uuid, owner_id: Uuid, to: GoalStatus) -> Result<Goal> {
        let goal = self.get_goal(id).await?;
        if goal.owner_id != owner_id {
            return Err(AppError::Unauthorized("only the goal owner can change its status".to_string()));
        }
        if !goal.status.can_transition(to) {
            return Err(AppError::StateMachine(format!(
                "goal cannot move from {:?} to {:?}",
                goal.status, to
            )));
        }
        self.goals
            .update_status(id, to)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("goal {id} not found")))
    }

    /// CreateContributionIntent: requires Goal.status=OPEN (G3); if the goal
    /// fixes its contribution amount, every intent must match it exactly.
    pub async fn create_contribution_intent(
        &self,
        goal_id: Uuid,
        user_id: Uuid,
        amount: i64,
    ) -> Result<Contribution> {
        if amount <= 0 {
            return Err(AppError::Validation("amount must be positive".to_string()));
        }

        let goal = self.get_goal(goal_id).await?;
        if goal.status != GoalStatus::Open {
            return Err(AppError::StateMachine(format!(
                "goal {goal_id} is not OPEN, cannot accept contributions"
            )));
        }
        if let Some(fixed) = goal.fixed_contribution_amount {
            if amount != fixed {
                return Err(AppError::Validation(format!(
                    "goal requires a fixed contribution of {fixed}, got {amount}"
                )));
            }
        }

        let contribution = Contribution::new(goal_id, user_id, amount);
        self.contributions.create(&contribution).await
    }

    /// OnPaymentVerified: idempotent on `event.event_id` at the call site
    /// (the consumer dedup layer, not this method) and again here via the
    /// ledger's idempotency_key=payment_id, so a redelivered event is a safe
    /// no-op even if the outer dedup check somehow missed it.
    pub async fn on_payment_verified(
        &self,
        payment_id: Uuid,
        contribution_id: Uuid,
        goal_id: Uuid,
        amount: i64,
        currency: &str,
    ) -> Result<()> {
        let contribution = self
            .contributions
            .find_by_id(contribution_id)
            .await?
            .ok_or_else(|| {
                crate::error::invariant_violation(format!(
                    "PaymentVerified for contribution {contribution_id} that does not exist"
                ))
            })?;

        if contribution.status == ContributionStatus::Confirmed {
            return Ok(());
        }

        let goal_account = self
            .ledger
            .get_or_create_account(AccountType::Goal, goal_id, currency)
            .await?;
        let escrow_account = self
            .ledger
            .get_or_create_account(AccountType::Escrow, PLATFORM_ESCROW_ENTITY_ID, currency)
            .await?;

        let entries = vec![
            LedgerEntryRequest::debit(escrow_account.id, amount),
            LedgerEntryRequest::credit(goal_account.id, amount),
        ];

        let transaction_id = self
            .ledger
            .post_transaction(
                LedgerTransactionType::Contribution,
                Some(format!("contribution {contribution_id} confirmed")),
                entries,
                currency,
                None,
                Some(payment_id.to_string()),
            )
            .await?;

        let payload = ContributionConfirmedEvent {
            contribution_id,
            goal_id,
            user_id: contribution.user_id,
            amount,
        };
        let outbox_event = OutboxEvent::new(
            EventType::ContributionConfirmed,
            topics::CONTRIBUTIONS,
            serde_json::to_value(&payload)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serialize ContributionConfirmed: {e}")))?,
        );

        let confirmed = self
            .contributions
            .try_confirm_with_outbox(contribution_id, payment_id, transaction_id, &outbox_event)
            .await?;
        if confirmed.is_none() {
            // Lost the CAS race against another delivery of the same event —
            // the ledger posting above was a no-op via idempotency_key, so
            // nothing was double-applied.
            return Ok(());
        }

        get_metrics().record_contribution_confirmed(currency);
        Ok(())
    }

    /// RequestWithdrawal: available balance is the ledger balance minus the
    /// sum of PENDING/PROCESSING withdrawals already reserved against it —
    /// ledger entries for a withdrawal don't exist until it settles, so an
    /// unreserved balance check would let two concurrent requests both pass.
    /// Locking the goal row serializes the check against concurrent
    /// requesters so the reservation is never double-counted.
    pub async fn request_withdrawal(
        &self,
        goal_id: Uuid,
        owner_id: Uuid,
        amount: i64,
        bank: Option<BankSnapshot>,
    ) -> Result<Withdrawal> {
        if amount <= 0 {
            return Err(AppError::Validation("amount must be positive".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let goal = self
            .goals
            .find_by_id_for_update(&mut tx, goal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("goal {goal_id} not found")))?;

        if goal.owner_id != owner_id {
            tx.rollback().await.map_err(AppError::Database)?;
            return Err(AppError::Unauthorized("only the goal owner can request a withdrawal".to_string()));
        }

        let bank = bank.or_else(|| goal.bank_snapshot()).ok_or_else(|| AppError::Validation(
            "bank details are required to request a withdrawal".to_string(),
        ))?;
        if let Err(e) = bank.validate() {
            tx.rollback().await.map_err(AppError::Database)?;
            return Err(AppError::Validation(e));
        }

        let goal_account = self
            .ledger
            .get_or_create_account(AccountType::Goal, goal_id, &goal.currency)
            .await?;
        let ledger_balance = self.ledger.get_balance(goal_account.id, &goal.currency).await?;
        let reserved = self.withdrawals.sum_pending_by_goal(goal_id).await?;
        let available = ledger_balance - reserved;

        if amount > available {
            tx.rollback().await.map_err(AppError::Database)?;
            return Err(AppError::InsufficientBalance("INSUFFICIENT_BALANCE".to_string()));
        }

        let withdrawal = Withdrawal::new(goal_id, owner_id, amount, bank.clone());
        let payload = WithdrawalRequestedEvent {
            withdrawal_id: withdrawal.id,
            goal_id,
            owner_id,
            amount,
            currency: goal.currency.clone(),
            bank: BankSnapshotPayload {
                bank_code: bank.bank_code,
                account_number: bank.account_number,
                account_name: bank.account_name,
            },
        };
        let outbox_event = OutboxEvent::new(
            EventType::WithdrawalRequested,
            topics::WITHDRAWALS,
            serde_json::to_value(&payload)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serialize WithdrawalRequested: {e}")))?,
        );

        // The withdrawal row (the reservation) is inserted inside the same
        // transaction that holds the goal's row lock, so a second concurrent
        // request blocked on that lock only sees `available_balance` account
        // for this reservation once it's actually committed — never before.
        let withdrawal = self
            .withdrawals
            .create_with_outbox_in_tx(&mut tx, &withdrawal, &outbox_event)
            .await?;
        tx.commit().await.map_err(AppError::Database)?;

        get_metrics().record_withdrawal_requested(&goal.currency);
        Ok(withdrawal)
    }

    /// OnWithdrawalSettled: success posts the ledger entry with
    /// idempotency_key=withdrawal_id and marks COMPLETED; failure marks
    /// FAILED with no posting.
    pub async fn on_withdrawal_settled(
        &self,
        withdrawal_id: Uuid,
        succeeded: bool,
    ) -> Result<()> {
        let withdrawal = self
            .withdrawals
            .find_by_id(withdrawal_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("withdrawal {withdrawal_id} not found")))?;

        if withdrawal.status.is_terminal() {
            return Ok(());
        }

        let goal = self.get_goal(withdrawal.goal_id).await?;

        if !succeeded {
            self.withdrawals
                .try_transition(withdrawal_id, WithdrawalStatus::Processing, WithdrawalStatus::Failed)
                .await?;
            get_metrics().record_withdrawal_settled(&goal.currency, false);
            return Ok(());
        }

        let goal_account = self
            .ledger
            .get_or_create_account(AccountType::Goal, withdrawal.goal_id, &goal.currency)
            .await?;
        let escrow_account = self
            .ledger
            .get_or_create_account(AccountType::Escrow, PLATFORM_ESCROW_ENTITY_ID, &goal.currency)
            .await?;

        let entries = vec![
            LedgerEntryRequest::debit(goal_account.id, withdrawal.amount),
            LedgerEntryRequest::credit(escrow_account.id, withdrawal.amount),
        ];

        let transaction_id = self
            .ledger
            .post_transaction(
                LedgerTransactionType::Withdrawal,
                Some(format!("withdrawal {withdrawal_id} settled")),
                entries,
                &goal.currency,
                None,
                Some(withdrawal_id.to_string()),
            )
            .await?;

        self.withdrawals.attach_ledger_transaction(withdrawal_id, transaction_id).await?;
        self.withdrawals
            .try_transition(withdrawal_id, WithdrawalStatus::Processing, WithdrawalStatus::Completed)
            .await?;
        get_metrics().record_withdrawal_settled(&goal.currency, true);
        Ok(())
    }

    /// InitiateRefund: requires Goal.status ∈ {CLOSED, CANCELLED} (R1) and no
    /// non-terminal refund already in flight (R2). Fans out one
    /// RefundDisbursement per CONFIRMED contribution, all inserted atomically
    /// with the Refund row and the outbox append.
    pub async fn initiate_refund(
        &self,
        goal_id: Uuid,
        initiated_by: Uuid,
        percentage: i32,
        reason: Option<String>,
    ) -> Result<Refund> {
        if !(1..=100).contains(&percentage) {
            return Err(AppError::Validation("percentage must be in (0, 100]".to_string()));
        }

        let goal = self.get_goal(goal_id).await?;
        if !matches!(goal.status, GoalStatus::Closed | GoalStatus::Cancelled) {
            return Err(AppError::StateMachine(
                "goal must be CLOSED or CANCELLED before a refund can be initiated".to_string(),
            ));
        }
        if self.refunds.find_active_by_goal(goal_id).await?.is_some() {
            return Err(AppError::StateMachine(
                "a refund is already in flight for this goal".to_string(),
            ));
        }

        let contributions = self.contributions.find_confirmed_by_goal(goal_id).await?;
        if contributions.is_empty() {
            return Err(AppError::Validation("no confirmed contributions to refund".to_string()));
        }

        let total_amount: i64 = contributions
            .iter()
            .map(|c| RefundDisbursement::calculate_amount(c.amount, percentage))
            .sum();

        let refund = Refund::new(goal_id, initiated_by, percentage, total_amount, reason);
        let disbursements: Vec<RefundDisbursement> = contributions
            .iter()
            .map(|c| {
                let amount = RefundDisbursement::calculate_amount(c.amount, percentage);
                RefundDisbursement::new(refund.id, c.id, c.user_id, amount, goal.bank_snapshot().unwrap_or(BankSnapshot {
                    bank_code: String::new(),
                    account_number: String::new(),
                    account_name: String::new(),
                }))
            })
            .collect();

        let payload = RefundInitiatedEvent {
            refund_id: refund.id,
            goal_id,
            percentage,
            total_amount,
        };
        let mut outbox_events = vec![OutboxEvent::new(
            EventType::RefundInitiated,
            topics::REFUNDS,
            serde_json::to_value(&payload)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serialize RefundInitiated: {e}")))?,
        )];

        for disbursement in &disbursements {
            let payload = RefundDisbursementRequestedEvent {
                disbursement_id: disbursement.id,
                refund_id: refund.id,
                contribution_id: disbursement.contribution_id,
                user_id: disbursement.user_id,
                amount: disbursement.amount,
                currency: goal.currency.clone(),
                bank: BankSnapshotPayload {
                    bank_code: disbursement.bank_code.clone(),
                    account_number: disbursement.account_number.clone(),
                    account_name: disbursement.account_name.clone(),
                },
            };
            outbox_events.push(OutboxEvent::new(
                EventType::RefundDisbursementRequested,
                topics::REFUNDS,
                serde_json::to_value(&payload).map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("failed to serialize RefundDisbursementRequested: {e}"))
                })?,
            ));
        }

        let (refund, _) = self
            .refunds
            .create_with_disbursements(&refund, &disbursements, &outbox_events)
            .await?;

        get_metrics().record_refund_initiated(&goal.currency);
        Ok(refund)
    }

    /// OnRefundDisbursementSettled: per-disbursement success posts the ledger
    /// entry with idempotency_key=disbursement_id, marks the disbursement and
    /// its contribution REFUNDED, and closes out the parent Refund once every
    /// disbursement is terminal.
    pub async fn on_refund_disbursement_settled(
        &self,
        disbursement_id: Uuid,
        succeeded: bool,
    ) -> Result<()> {
        let disbursement = self
            .refund_disbursements
            .find_by_id(disbursement_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("refund disbursement {disbursement_id} not found")))?;

        if disbursement.status.is_terminal() {
            return Ok(());
        }

        let refund = self
            .refunds
            .find_by_id(disbursement.refund_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("refund {} not found", disbursement.refund_id)))?;

        if !succeeded {
            self.refund_disbursements
                .try_transition(disbursement_id, RefundStatus::Processing, RefundStatus::Failed, None)
                .await?;
            self.finalize_refund_if_terminal(refund.id).await?;
            return Ok(());
        }

        let goal = self.get_goal(refund.goal_id).await?;
        let goal_account = self
            .ledger
            .get_or_create_account(AccountType::Goal, refund.goal_id, &goal.currency)
            .await?;
        let user_account = self
            .ledger
            .get_or_create_account(AccountType::User, disbursement.user_id, &goal.currency)
            .await?;

        let entries = vec![
            LedgerEntryRequest::debit(goal_account.id, disbursement.amount),
            LedgerEntryRequest::credit(user_account.id, disbursement.amount),
        ];

        let transaction_id = self
            .ledger
            .post_transaction(
                LedgerTransactionType::Refund,
                Some(format!("refund disbursement {disbursement_id} settled")),
                entries,
                &goal.currency,
                None,
                Some(disbursement_id.to_string()),
            )
            .await?;

        self.refund_disbursements
            .try_transition(
                disbursement_id,
                RefundStatus::Processing,
                RefundStatus::Completed,
                Some(transaction_id),
            )
            .await?;
        self.contributions
            .update_status(disbursement.contribution_id, ContributionStatus::Refunded)
            .await?;

        get_metrics().record_refund_disbursement_settled(&goal.currency, true);
        self.finalize_refund_if_terminal(refund.id).await?;
        Ok(())
    }

    /// Marks a Refund COMPLETED once all of its disbursements are terminal,
    /// or FAILED if any disbursement failed — a refund that partially settles
    /// is never silently reported as a clean success.
    async fn finalize_refund_if_terminal(&self, refund_id: Uuid) -> Result<()> {
        let disbursements = self.refund_disbursements.find_by_refund(refund_id).await?;
        if !disbursements.iter().all(|d| d.status.is_terminal()) {
            return Ok(());
        }

        let final_status = if disbursements.iter().any(|d| d.status == RefundStatus::Failed) {
            RefundStatus::Failed
        } else {
            RefundStatus::Completed
        };
        self.refunds.update_status(refund_id, final_status).await?;
        Ok(())
    }
}
