//! Ledger collaborators
//!
//! The ledger (the chain hosting the mint program) and the wallet adapter are external
//! collaborators. dropkit only consumes them through the traits defined here.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::{Address, WalletSession};
use crate::amount::Lamports;
use crate::error::Error;

/// Sale counters and start time of a drop
///
/// Reflects the ledger's last committed block, other minters may already have changed it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaleState {
    /// Total number of items the program can mint
    pub items_available: u64,
    /// Items already minted
    pub items_redeemed: u64,
    /// Items left, `items_available - items_redeemed`
    pub items_remaining: u64,
    /// Sale start as unix time in milliseconds
    pub sale_start_ms: u64,
}

impl SaleState {
    /// Build a [`SaleState`] from the available and redeemed counters
    pub fn from_counts(items_available: u64, items_redeemed: u64, sale_start_ms: u64) -> Self {
        Self {
            items_available,
            items_redeemed,
            items_remaining: items_available.saturating_sub(items_redeemed),
            sale_start_ms,
        }
    }

    /// No item left to mint
    pub fn is_sold_out(&self) -> bool {
        self.items_remaining == 0
    }
}

/// Handle to a loaded mint program account
///
/// Required to submit a mint, only obtained by reading the program state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramHandle {
    /// Id of the on-ledger program
    pub program_id: Address,
    /// Address of the mint account (candy machine) the program dispenses from
    pub machine: Address,
}

/// Program state as reported by the ledger client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramState {
    /// Items available
    pub items_available: u64,
    /// Items redeemed
    pub items_redeemed: u64,
    /// Items remaining, as reported by the program
    pub items_remaining: u64,
    /// Go live date as unix time in milliseconds
    pub go_live_ms: u64,
    /// Handle used to submit mints
    pub handle: ProgramHandle,
}

/// Transaction id (signature) returned on submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Create new [`TransactionId`]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Id as str
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a landed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationStatus {
    /// Slot the transaction landed in
    pub slot: u64,
    /// On-ledger error, `None` when the transaction executed successfully
    pub err: Option<String>,
}

impl ConfirmationStatus {
    /// Transaction landed without error
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

/// Commitment level used when waiting for confirmation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Processed by the connected node
    #[serde(alias = "recent")]
    Processed,
    /// Voted on by a supermajority
    #[default]
    #[serde(alias = "singleGossip", alias = "single_gossip")]
    Confirmed,
    /// Finalized
    #[serde(alias = "max")]
    Finalized,
}

impl FromStr for Commitment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processed" | "recent" => Ok(Self::Processed),
            "confirmed" | "singlegossip" | "single_gossip" => Ok(Self::Confirmed),
            "finalized" | "max" => Ok(Self::Finalized),
            _ => Err(Error::Custom(format!("Unknown commitment level: {s}"))),
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processed => write!(f, "processed"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Finalized => write!(f, "finalized"),
        }
    }
}

/// Wallet adapter
#[async_trait]
pub trait WalletAdapter: fmt::Debug + Send + Sync {
    /// Currently connected wallet, if any
    fn current_session(&self) -> Option<WalletSession>;

    /// Balance of an address
    async fn get_balance(&self, address: &Address) -> Result<Lamports, Error>;
}

/// Client of the mint program hosted on the ledger
#[async_trait]
pub trait LedgerProgramClient: fmt::Debug + Send + Sync {
    /// Read the current program state
    async fn get_program_state(
        &self,
        wallet: &WalletSession,
        program_id: &Address,
    ) -> Result<ProgramState, Error>;

    /// Build, sign and send a single mint transaction
    ///
    /// Fails with [`Error::Program`] or [`Error::Transaction`] when the program rejects the
    /// transaction before it is sent (simulation/preflight).
    async fn submit_mint(
        &self,
        handle: &ProgramHandle,
        config: &Address,
        payer: &WalletSession,
        treasury: &Address,
    ) -> Result<TransactionId, Error>;

    /// Wait until the transaction lands at `commitment`
    ///
    /// Returns [`Error::Timeout`] when nothing was observed within `timeout`.
    async fn await_confirmation(
        &self,
        transaction_id: &TransactionId,
        timeout: Duration,
        commitment: Commitment,
        skip_preflight: bool,
    ) -> Result<ConfirmationStatus, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_from_counts() {
        let state = SaleState::from_counts(10, 4, 0);
        assert_eq!(state.items_remaining, 6);
        assert!(!state.is_sold_out());

        let state = SaleState::from_counts(10, 10, 0);
        assert_eq!(state.items_remaining, 0);
        assert!(state.is_sold_out());

        // Stale counters must not underflow
        let state = SaleState::from_counts(10, 11, 0);
        assert_eq!(state.items_remaining, 0);
    }

    #[test]
    fn test_commitment_aliases() {
        let commitment: Commitment =
            serde_json::from_str("\"singleGossip\"").expect("alias is accepted");
        assert_eq!(commitment, Commitment::Confirmed);
        assert_eq!(
            Commitment::from_str("Finalized").ok(),
            Some(Commitment::Finalized)
        );
        assert!(Commitment::from_str("gossip").is_err());
        assert_eq!(Commitment::default().to_string(), "confirmed");
    }
}
