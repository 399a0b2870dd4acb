//! Ledger state reads

use std::sync::Arc;

use dropkit_common::{
    Address, Error, Lamports, LedgerProgramClient, ProgramHandle, SaleState, WalletAdapter,
    WalletSession,
};
use tracing::instrument;

/// Sale state together with the handle needed to mint against it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleSnapshot {
    /// Sale counters and start date
    pub sale: SaleState,
    /// Program handle
    pub handle: ProgramHandle,
}

/// Side-effect free reads of program state and wallet balance
///
/// Both reads are idempotent. Counters are only as fresh as the ledger's last committed
/// block.
#[derive(Debug, Clone)]
pub struct LedgerStateReader {
    wallet_adapter: Arc<dyn WalletAdapter>,
    client: Arc<dyn LedgerProgramClient>,
    program_id: Address,
}

impl LedgerStateReader {
    /// Create new [`LedgerStateReader`]
    pub fn new(
        wallet_adapter: Arc<dyn WalletAdapter>,
        client: Arc<dyn LedgerProgramClient>,
        program_id: Address,
    ) -> Self {
        Self {
            wallet_adapter,
            client,
            program_id,
        }
    }

    /// Connected wallet session, if any
    pub fn current_session(&self) -> Option<WalletSession> {
        self.wallet_adapter.current_session()
    }

    /// Read the current sale state
    ///
    /// Fails with [`Error::NoWallet`] when no wallet is connected, callers treat that as a
    /// no-op.
    #[instrument(skip_all, fields(program_id = %self.program_id))]
    pub async fn refresh_sale_state(
        &self,
        wallet: Option<&WalletSession>,
    ) -> Result<SaleSnapshot, Error> {
        let wallet = wallet.ok_or(Error::NoWallet)?;

        let state = self
            .client
            .get_program_state(wallet, &self.program_id)
            .await?;

        let sale = SaleState::from_counts(
            state.items_available,
            state.items_redeemed,
            state.go_live_ms,
        );

        if sale.items_remaining != state.items_remaining {
            tracing::debug!(
                "Program reported {} remaining, counters give {}",
                state.items_remaining,
                sale.items_remaining
            );
        }

        tracing::debug!(
            available = sale.items_available,
            redeemed = sale.items_redeemed,
            remaining = sale.items_remaining,
            "Refreshed sale state"
        );

        Ok(SaleSnapshot {
            sale,
            handle: state.handle,
        })
    }

    /// Read the wallet balance in lamports
    #[instrument(skip_all)]
    pub async fn refresh_balance(&self, wallet: Option<&WalletSession>) -> Result<Lamports, Error> {
        let wallet = wallet.ok_or(Error::NoWallet)?;

        let balance = self.wallet_adapter.get_balance(&wallet.address).await?;

        tracing::debug!("Balance of {} is {} lamports", wallet.address, balance);

        Ok(balance)
    }
}
