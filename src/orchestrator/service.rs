//! Transaction Orchestrator
//!
//! Drives one action at a time through validation, proof generation,
//! signing and confirmation, then refreshes balances. Nothing is retried
//! automatically; a failed action stays failed.
//!
//! Every step is a cancellation point. Dropping an `execute` future marks
//! its record failed and frees the slot.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::builder::CallBuilder;
use super::ActionError;
use crate::common::logging::log_action_event;
use crate::reconciler::{BalanceReconciler, FetchContext};
use crate::signer::{SignerError, TxOutcome, WalletSigner};
use crate::types::action::{ActionKind, ActionRecord, PendingAction};

/// Transaction orchestrator
pub struct TransactionOrchestrator {
    signer: Arc<dyn WalletSigner>,
    reconciler: Arc<BalanceReconciler>,
    confirmation_timeout: Duration,
    /// Most recent action, in flight or terminal
    current: RwLock<Option<ActionRecord>>,
}

impl TransactionOrchestrator {
    pub fn new(
        signer: Arc<dyn WalletSigner>,
        reconciler: Arc<BalanceReconciler>,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            signer,
            reconciler,
            confirmation_timeout,
            current: RwLock::new(None),
        }
    }

    /// Latest action record
    pub fn current(&self) -> Option<ActionRecord> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether an action of `kind` is in flight
    pub fn is_running(&self, kind: ActionKind) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|r| r.kind == kind && r.status.blocks_new_action())
            .unwrap_or(false)
    }

    /// Run `action` against the asset and shielded account in `ctx`.
    ///
    /// Returns the settled record, or the cause of failure. The failed record
    /// stays readable through [`current`](Self::current).
    pub async fn execute(
        &self,
        action: PendingAction,
        ctx: &FetchContext,
    ) -> Result<ActionRecord, ActionError> {
        let started = Instant::now();
        let mut record = self.begin(action.kind, &ctx.asset.symbol)?;
        let _slot = SlotGuard {
            current: &self.current,
            id: record.id.clone(),
        };

        let result = self.drive(&mut record, &action, ctx).await;

        match &result {
            Ok(()) => record.mark_settled(),
            Err(e) => record.mark_failed(e.to_string()),
        }
        self.publish(&record);

        let duration_ms = started.elapsed().as_millis() as u64;
        log_action_event(
            &record.id,
            &record.kind.to_string(),
            &record.asset,
            &record.status.to_string(),
            record.tx_hash.as_deref(),
            result.as_ref().err().map(|e| (e.code(), record.error.as_deref().unwrap_or_default())),
            duration_ms,
        );

        result.map(|_| record)
    }

    /// Claim the single action slot
    fn begin(&self, kind: ActionKind, asset: &str) -> Result<ActionRecord, ActionError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = current.as_ref().filter(|r| r.status.blocks_new_action()) {
            return Err(ActionError::ActionInProgress(running.status.to_string()));
        }

        let mut record = ActionRecord::new(kind, asset);
        record.mark_validating();
        *current = Some(record.clone());

        tracing::info!(
            target: "arcana::action",
            action_id = %record.id,
            kind = %kind,
            asset,
            "action started"
        );

        Ok(record)
    }

    async fn drive(
        &self,
        record: &mut ActionRecord,
        action: &PendingAction,
        ctx: &FetchContext,
    ) -> Result<(), ActionError> {
        let sender = ctx.address.as_str();
        let builder = CallBuilder::new(ctx.asset.clone());

        // Validating
        let handle = ctx.handle.as_ref().ok_or(ActionError::NoShieldedAccount)?;
        let snapshot = self.reconciler.snapshot().await;
        let validated = builder.validate(action, sender, Some(&snapshot))?;
        if action.kind != ActionKind::Sync {
            record.public_amount = Some(validated.public_amount.to_string());
            record.shielded_amount = Some(validated.shielded_amount.to_string());
        }
        record.destination = validated.destination.clone();

        // ProofGenerating
        record.mark_proof_generating();
        self.publish(record);
        let calls = builder.build(&validated, handle, sender).await?;

        // AwaitingSignature
        record.mark_awaiting_signature();
        self.publish(record);
        let tx = self.signer.execute(&calls).await.map_err(|e| match e {
            SignerError::Rejected(msg) => ActionError::SignerRejected(msg),
            other => ActionError::BroadcastFailed(other.to_string()),
        })?;

        // AwaitingConfirmation
        record.mark_awaiting_confirmation(tx.transaction_hash.clone());
        self.publish(record);
        tracing::info!(
            target: "arcana::action",
            action_id = %record.id,
            tx_hash = %tx.transaction_hash,
            calls = calls.len(),
            "transaction broadcast"
        );

        let outcome = tokio::time::timeout(
            self.confirmation_timeout,
            self.signer.wait_for_confirmation(&tx),
        )
        .await
        .map_err(|_| ActionError::ConfirmationTimeout(self.confirmation_timeout.as_secs()))?
        .map_err(|e| ActionError::ConfirmationFailed(e.to_string()))?;

        if let TxOutcome::Reverted { reason } = outcome {
            return Err(ActionError::Reverted(reason));
        }

        self.reconciler.fetch(ctx).await;
        Ok(())
    }

    fn publish(&self, record: &ActionRecord) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
    }
}

/// Held for the lifetime of one `execute` call
struct SlotGuard<'a> {
    current: &'a RwLock<Option<ActionRecord>>,
    id: String,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let Some(record) = current
            .as_mut()
            .filter(|r| r.id == self.id && !r.status.is_terminal())
        else {
            return;
        };

        let interrupted = record.status;
        record.mark_failed("cancelled".to_string());
        tracing::warn!(
            target: "arcana::action",
            action_id = %record.id,
            status = %interrupted,
            tx_hash = record.tx_hash.as_deref().unwrap_or("-"),
            "action cancelled"
        );
    }
}
