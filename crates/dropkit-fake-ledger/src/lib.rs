//! dropkit Fake Ledger
//!
//! Used for testing where the mint program runs in memory. Counters, balances and
//! transactions live in a single [`FakeLedger`] shared by the program client and the wallet
//! adapter.

#![doc = include_str!("../README.md")]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dropkit_common::{
    Address, Commitment, ConfirmationStatus, Error, Lamports, LedgerProgramClient,
    ProgramErrorCode, ProgramHandle, ProgramState, TimeSource, TransactionId, WalletAdapter,
    WalletSession,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

/// Default confirmation delay
pub const DEFAULT_CONFIRMATION_DELAY: Duration = Duration::from_millis(400);

/// Behaviour applied to the next submitted mint
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FakeMintBehavior {
    /// Enforce go live, supply and price, then land
    #[default]
    Land,
    /// Fail submission with a program error code
    FailWithCode {
        /// Program error code
        code: u32,
    },
    /// Fail submission with a raw transaction message
    FailWithMessage {
        /// Raw message
        message: String,
    },
    /// Land with an on-ledger error, counters are untouched
    LandWithError {
        /// Error reported by the ledger
        err: String,
    },
    /// Accept the transaction but never confirm it
    Drop,
}

#[derive(Debug)]
struct FakeTransaction {
    err: Option<String>,
    slot: u64,
    dropped: bool,
}

#[derive(Debug)]
struct LedgerState {
    items_available: u64,
    items_redeemed: u64,
    go_live_ms: u64,
    price: Lamports,
    balances: HashMap<Address, Lamports>,
    transactions: HashMap<TransactionId, FakeTransaction>,
    next_behavior: Option<FakeMintBehavior>,
    confirmation_delay: Duration,
    read_delay: Duration,
    unavailable: bool,
    slot: u64,
    submissions: u64,
    state_reads: u64,
}

/// In-memory ledger hosting a single mint program
#[derive(Debug)]
pub struct FakeLedger {
    handle: ProgramHandle,
    time: Arc<dyn TimeSource>,
    state: Mutex<LedgerState>,
}

impl FakeLedger {
    /// Create new [`FakeLedger`]
    pub fn new(
        handle: ProgramHandle,
        items_available: u64,
        go_live_ms: u64,
        price: Lamports,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            handle,
            time,
            state: Mutex::new(LedgerState {
                items_available,
                items_redeemed: 0,
                go_live_ms,
                price,
                balances: HashMap::new(),
                transactions: HashMap::new(),
                next_behavior: None,
                confirmation_delay: DEFAULT_CONFIRMATION_DELAY,
                read_delay: Duration::ZERO,
                unavailable: false,
                slot: 1,
                submissions: 0,
                state_reads: 0,
            }),
        }
    }

    /// Program handle
    pub fn handle(&self) -> &ProgramHandle {
        &self.handle
    }

    /// Credit an address
    pub fn fund(&self, address: &Address, amount: Lamports) {
        let mut state = self.state.lock();
        let balance = state.balances.entry(address.clone()).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Balance of an address, zero when never funded
    pub fn balance_of(&self, address: &Address) -> Lamports {
        self.state
            .lock()
            .balances
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    /// Set the redeemed counter, as if other minters had minted
    pub fn set_items_redeemed(&self, items_redeemed: u64) {
        self.state.lock().items_redeemed = items_redeemed;
    }

    /// Items redeemed
    pub fn items_redeemed(&self) -> u64 {
        self.state.lock().items_redeemed
    }

    /// Move the go live date
    pub fn set_go_live(&self, go_live_ms: u64) {
        self.state.lock().go_live_ms = go_live_ms;
    }

    /// Set the delay between submission and confirmation
    pub fn set_confirmation_delay(&self, delay: Duration) {
        self.state.lock().confirmation_delay = delay;
    }

    /// Set the latency of program state and balance reads
    pub fn set_read_delay(&self, delay: Duration) {
        self.state.lock().read_delay = delay;
    }

    /// Make every call fail as if the ledger could not be reached
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Behaviour of the next submitted mint, later mints land normally
    pub fn set_next_mint(&self, behavior: FakeMintBehavior) {
        self.state.lock().next_behavior = Some(behavior);
    }

    /// Number of mint submissions received, failed ones included
    pub fn submissions(&self) -> u64 {
        self.state.lock().submissions
    }

    /// Number of program state reads served
    pub fn state_reads(&self) -> u64 {
        self.state.lock().state_reads
    }

    async fn read_latency(&self) {
        let delay = self.state.lock().read_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn ensure_available(state: &LedgerState) -> Result<(), Error> {
        if state.unavailable {
            return Err(Error::LedgerUnavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Error the program reports for `code`, as returned by a failed simulation
pub fn program_error(code: ProgramErrorCode) -> Error {
    Error::Program {
        code: code.to_code(),
        message: Some(format!("custom program error: 0x{:x}", code.to_code())),
    }
}

#[async_trait]
impl LedgerProgramClient for FakeLedger {
    #[instrument(skip_all)]
    async fn get_program_state(
        &self,
        _wallet: &WalletSession,
        program_id: &Address,
    ) -> Result<ProgramState, Error> {
        self.read_latency().await;

        let mut state = self.state.lock();
        Self::ensure_available(&state)?;

        if program_id != &self.handle.program_id {
            return Err(Error::Custom(format!(
                "Program account {program_id} not found"
            )));
        }

        state.state_reads += 1;

        Ok(ProgramState {
            items_available: state.items_available,
            items_redeemed: state.items_redeemed,
            items_remaining: state.items_available.saturating_sub(state.items_redeemed),
            go_live_ms: state.go_live_ms,
            handle: self.handle.clone(),
        })
    }

    #[instrument(skip_all, fields(payer = %payer.address))]
    async fn submit_mint(
        &self,
        handle: &ProgramHandle,
        _config: &Address,
        payer: &WalletSession,
        treasury: &Address,
    ) -> Result<TransactionId, Error> {
        let now_ms = self.time.now_ms();
        let mut state = self.state.lock();
        state.submissions += 1;
        Self::ensure_available(&state)?;

        if handle != &self.handle {
            return Err(Error::Transaction(
                "Error processing Instruction 0: incorrect program id for instruction"
                    .to_string(),
            ));
        }

        let behavior = state.next_behavior.take().unwrap_or_default();
        let transaction_id = TransactionId::new(Uuid::new_v4().simple().to_string());
        state.slot += 1;
        let slot = state.slot;

        let err = match behavior {
            FakeMintBehavior::FailWithCode { code } => {
                return Err(program_error(ProgramErrorCode::from_code(code)));
            }
            FakeMintBehavior::FailWithMessage { message } => {
                return Err(Error::Transaction(message));
            }
            FakeMintBehavior::LandWithError { err } => Some(err),
            FakeMintBehavior::Drop => {
                tracing::debug!("Dropping mint {}", transaction_id);
                state.transactions.insert(
                    transaction_id.clone(),
                    FakeTransaction {
                        err: None,
                        slot,
                        dropped: true,
                    },
                );
                return Ok(transaction_id);
            }
            FakeMintBehavior::Land => {
                if now_ms < state.go_live_ms {
                    return Err(program_error(ProgramErrorCode::CandyMachineNotLive));
                }

                if state.items_redeemed >= state.items_available {
                    return Err(program_error(ProgramErrorCode::CandyMachineEmpty));
                }

                let price = state.price;
                let balance = state
                    .balances
                    .get(&payer.address)
                    .copied()
                    .unwrap_or_default();
                let remaining = balance
                    .checked_sub(price)
                    .ok_or_else(|| program_error(ProgramErrorCode::NotEnoughSol))?;

                state.balances.insert(payer.address.clone(), remaining);
                let treasury_balance = state.balances.entry(treasury.clone()).or_default();
                *treasury_balance = treasury_balance.saturating_add(price);
                state.items_redeemed += 1;

                None
            }
        };

        tracing::debug!("Accepted mint {} in slot {}", transaction_id, slot);

        state.transactions.insert(
            transaction_id.clone(),
            FakeTransaction {
                err,
                slot,
                dropped: false,
            },
        );

        Ok(transaction_id)
    }

    #[instrument(skip_all, fields(transaction_id = %transaction_id))]
    async fn await_confirmation(
        &self,
        transaction_id: &TransactionId,
        timeout: Duration,
        commitment: Commitment,
        _skip_preflight: bool,
    ) -> Result<ConfirmationStatus, Error> {
        let (delay, status) = {
            let state = self.state.lock();
            Self::ensure_available(&state)?;

            let transaction = state.transactions.get(transaction_id).ok_or_else(|| {
                Error::Transaction(format!("Transaction {transaction_id} not found"))
            })?;

            let status = (!transaction.dropped).then(|| ConfirmationStatus {
                slot: transaction.slot,
                err: transaction.err.clone(),
            });

            (state.confirmation_delay, status)
        };

        match status {
            Some(status) if delay < timeout => {
                tokio::time::sleep(delay).await;
                tracing::debug!("Transaction reached {} commitment", commitment);
                Ok(status)
            }
            _ => {
                tokio::time::sleep(timeout).await;
                Err(Error::Timeout)
            }
        }
    }
}

/// Wallet adapter backed by a [`FakeLedger`]
#[derive(Debug)]
pub struct FakeWalletAdapter {
    ledger: Arc<FakeLedger>,
    session: Mutex<Option<WalletSession>>,
}

impl FakeWalletAdapter {
    /// Create new [`FakeWalletAdapter`], initially disconnected
    pub fn new(ledger: Arc<FakeLedger>) -> Self {
        Self {
            ledger,
            session: Mutex::new(None),
        }
    }

    /// Connect a wallet, replacing the current one
    pub fn connect(&self, address: Address) {
        *self.session.lock() = Some(WalletSession::new(address));
    }

    /// Disconnect the wallet
    pub fn disconnect(&self) {
        *self.session.lock() = None;
    }
}

#[async_trait]
impl WalletAdapter for FakeWalletAdapter {
    fn current_session(&self) -> Option<WalletSession> {
        self.session.lock().clone()
    }

    async fn get_balance(&self, address: &Address) -> Result<Lamports, Error> {
        self.ledger.read_latency().await;
        FakeLedger::ensure_available(&self.ledger.state.lock())?;
        Ok(self.ledger.balance_of(address))
    }
}
