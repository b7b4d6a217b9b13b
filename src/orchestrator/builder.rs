//! Call Builder
//!
//! Validates user input for one asset and assembles the ordered call list.

use crate::shielded::{OperationKind, ShieldedAccountHandle};
use crate::signer::Call;
use crate::types::action::{ActionKind, PendingAction};
use crate::types::asset::{is_valid_address, Asset};
use crate::types::balance::BalanceSnapshot;
use crate::types::units::{format_amount, parse_decimal, to_shielded_units, Amount};

use super::ActionError;

/// An action that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAction {
    pub kind: ActionKind,
    /// Parsed amount in public-token base units (zero for Sync)
    pub public_amount: Amount,
    /// `public_amount / rate` (zero for Sync)
    pub shielded_amount: Amount,
    /// Resolved Unshield recipient
    pub destination: Option<String>,
}

/// Builds shield / unshield / sync call lists for one asset
#[derive(Debug, Clone)]
pub struct CallBuilder {
    asset: Asset,
}

impl CallBuilder {
    pub fn new(asset: Asset) -> Self {
        Self { asset }
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    /// Check amount and destination.
    ///
    /// `snapshot` enables the balance check. It is skipped while the snapshot
    /// is loading or belongs to another asset, and when the last read of the
    /// side being spent failed.
    pub fn validate(
        &self,
        action: &PendingAction,
        sender: &str,
        snapshot: Option<&BalanceSnapshot>,
    ) -> Result<ValidatedAction, ActionError> {
        if action.kind == ActionKind::Sync {
            return Ok(ValidatedAction {
                kind: ActionKind::Sync,
                public_amount: Amount::zero(),
                shielded_amount: Amount::zero(),
                destination: None,
            });
        }

        let public_amount = parse_decimal(&action.amount, self.asset.decimals);
        if public_amount.is_zero() {
            return Err(ActionError::InvalidAmount(format!(
                "'{}' is not a positive {} amount",
                action.amount.trim(),
                self.asset.symbol
            )));
        }

        let shielded_amount = to_shielded_units(public_amount, self.asset.rate);
        if shielded_amount.is_zero() {
            return Err(ActionError::InvalidAmount(format!(
                "below the smallest shielded unit ({} {})",
                format_amount(self.asset.rate, self.asset.decimals),
                self.asset.symbol
            )));
        }

        if let Some(snap) = snapshot.filter(|s| !s.loading && s.asset == self.asset.symbol) {
            let (available, read_error) = match action.kind {
                ActionKind::Shield => (snap.public, snap.last_fetch.public_error()),
                _ => (snap.private, snap.last_fetch.private_error()),
            };
            if read_error.is_none() && public_amount > available {
                return Err(ActionError::InvalidAmount(format!(
                    "exceeds available balance of {} {}",
                    format_amount(available, self.asset.decimals),
                    self.asset.symbol
                )));
            }
        }

        let destination = match action.kind {
            ActionKind::Unshield => Some(resolve_destination(
                action.destination.as_deref(),
                sender,
            )?),
            _ => None,
        };

        Ok(ValidatedAction {
            kind: action.kind,
            public_amount,
            shielded_amount,
            destination,
        })
    }

    /// Ask the shielded account for the operation and assemble the calls.
    ///
    /// For Shield the approval comes first: `fund` pulls the tokens it
    /// authorizes within the same transaction.
    pub async fn build(
        &self,
        action: &ValidatedAction,
        handle: &ShieldedAccountHandle,
        sender: &str,
    ) -> Result<Vec<Call>, ActionError> {
        let account = handle.account();
        let proof_err = |e: crate::shielded::ShieldedError| ActionError::ProofGeneration(e.to_string());

        let calls = match action.kind {
            ActionKind::Shield => {
                let op = account
                    .fund(sender, action.shielded_amount)
                    .await
                    .map_err(proof_err)?;
                expect_kind(op.kind, OperationKind::Fund)?;
                vec![
                    Call::approve(
                        &self.asset.erc20_address,
                        &self.asset.tongo_address,
                        action.public_amount,
                    ),
                    op.to_call(),
                ]
            }
            ActionKind::Unshield => {
                let destination = action
                    .destination
                    .as_deref()
                    .ok_or_else(|| ActionError::InvalidDestination("missing".to_string()))?;
                let op = account
                    .withdraw(sender, action.shielded_amount, destination)
                    .await
                    .map_err(proof_err)?;
                expect_kind(op.kind, OperationKind::Withdraw)?;
                vec![op.to_call()]
            }
            ActionKind::Sync => {
                let op = account.rollover(sender).await.map_err(proof_err)?;
                expect_kind(op.kind, OperationKind::Rollover)?;
                vec![op.to_call()]
            }
        };

        Ok(calls)
    }
}

/// Blank means the caller's own address
fn resolve_destination(destination: Option<&str>, sender: &str) -> Result<String, ActionError> {
    match destination.map(str::trim).filter(|d| !d.is_empty()) {
        None => Ok(sender.to_string()),
        Some(addr) if is_valid_address(addr) => Ok(addr.to_string()),
        Some(addr) => Err(ActionError::InvalidDestination(format!(
            "'{}' is not a Starknet address (0x...)",
            addr
        ))),
    }
}

fn expect_kind(got: OperationKind, want: OperationKind) -> Result<(), ActionError> {
    if got != want {
        return Err(ActionError::ProofGeneration(format!(
            "shielded account returned a {:?} operation, expected {:?}",
            got, want
        )));
    }
    Ok(())
}
