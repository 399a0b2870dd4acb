//! Mint submission and confirmation

use std::sync::Arc;
use std::time::Duration;

use dropkit_common::{
    Address, Commitment, ConfirmationStatus, Error, LedgerProgramClient, ProgramHandle,
    TransactionId, WalletSession,
};
use futures::future::BoxFuture;
use tokio::time::timeout;
use tracing::instrument;

use crate::status::MintFailure;

/// How a single mint attempt settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintOutcome {
    /// Landed without an on-ledger error
    Confirmed {
        /// Transaction id
        transaction_id: TransactionId,
    },
    /// Landed with an on-ledger error
    Rejected {
        /// Transaction id
        transaction_id: TransactionId,
        /// Error reported by the ledger
        err: String,
    },
    /// Not observed within the confirmation budget
    ///
    /// The transaction was abandoned, not cancelled: it may still land later.
    TimedOut {
        /// Transaction id
        transaction_id: TransactionId,
    },
    /// Submission failed, nothing was polled
    Failed(MintFailure),
}

impl MintOutcome {
    /// Mint landed
    pub fn is_confirmed(&self) -> bool {
        matches!(self, MintOutcome::Confirmed { .. })
    }

    /// Transaction id, when one was obtained
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            MintOutcome::Confirmed { transaction_id }
            | MintOutcome::Rejected { transaction_id, .. }
            | MintOutcome::TimedOut { transaction_id } => Some(transaction_id),
            MintOutcome::Failed(_) => None,
        }
    }
}

/// Submits exactly one mint per call and waits for it to settle
///
/// Never retries. A failed or timed out attempt needs a fresh user action.
#[derive(Debug, Clone)]
pub struct MintOperation {
    client: Arc<dyn LedgerProgramClient>,
    commitment: Commitment,
    skip_preflight: bool,
}

impl MintOperation {
    /// Create new [`MintOperation`]
    pub fn new(
        client: Arc<dyn LedgerProgramClient>,
        commitment: Commitment,
        skip_preflight: bool,
    ) -> Self {
        Self {
            client,
            commitment,
            skip_preflight,
        }
    }

    /// Submit a mint signed by `wallet` against `handle`, crediting `treasury`
    #[instrument(skip_all, fields(wallet = %wallet.address, machine = %handle.machine))]
    pub async fn submit_mint(
        &self,
        wallet: &WalletSession,
        handle: &ProgramHandle,
        config: &Address,
        treasury: &Address,
        timeout_duration: Duration,
    ) -> MintOutcome {
        let transaction_id = match self
            .client
            .submit_mint(handle, config, wallet, treasury)
            .await
        {
            Ok(transaction_id) => transaction_id,
            Err(err) => {
                let failure = MintFailure::classify(&err);
                tracing::warn!("Mint submission failed ({}): {}", failure, err);
                return MintOutcome::Failed(failure);
            }
        };

        tracing::debug!("Submitted mint {}, waiting for confirmation", transaction_id);

        match self
            .wait_for_confirmation(&transaction_id, timeout_duration)
            .await
        {
            Ok(status) => match status.err {
                None => {
                    tracing::info!("Mint {} confirmed in slot {}", transaction_id, status.slot);
                    MintOutcome::Confirmed { transaction_id }
                }
                Some(err) => {
                    tracing::warn!("Mint {} landed with error: {}", transaction_id, err);
                    MintOutcome::Rejected {
                        transaction_id,
                        err,
                    }
                }
            },
            Err(Error::Timeout) => {
                tracing::warn!(
                    "Mint {} not confirmed within {} ms, it may still land",
                    transaction_id,
                    timeout_duration.as_millis()
                );
                MintOutcome::TimedOut { transaction_id }
            }
            Err(err) => {
                let failure = MintFailure::classify(&err);
                tracing::warn!("Confirmation of {} failed ({}): {}", transaction_id, failure, err);
                MintOutcome::Failed(failure)
            }
        }
    }

    /// Returns a BoxFuture that polls for confirmation, bounded by `timeout_duration` even if the
    /// client ignores its own budget
    pub fn wait_for_confirmation<'a>(
        &'a self,
        transaction_id: &'a TransactionId,
        timeout_duration: Duration,
    ) -> BoxFuture<'a, Result<ConfirmationStatus, Error>> {
        Box::pin(async move {
            timeout(
                timeout_duration,
                self.client.await_confirmation(
                    transaction_id,
                    timeout_duration,
                    self.commitment,
                    self.skip_preflight,
                ),
            )
            .await
            .map_err(|_| Error::Timeout)?
        })
    }
}
