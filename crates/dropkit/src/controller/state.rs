//! Controller state

use std::fmt;

use dropkit_common::{Lamports, SaleState};
use serde::{Deserialize, Serialize};

use crate::mint::MintOutcome;
use crate::status::{Notification, StatusMessage};

/// Lifecycle phase of the controller
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Nothing in flight
    #[default]
    Idle,
    /// Reading sale state and balance
    Refreshing,
    /// A mint has been submitted or is being confirmed
    Minting,
    /// The mint settled, balance and sale state are being refreshed
    SettlingPostMint {
        /// How the mint settled
        outcome: MintOutcome,
    },
}

impl Phase {
    /// A mint is in flight or settling
    pub fn is_minting(&self) -> bool {
        matches!(self, Phase::Minting | Phase::SettlingPostMint { .. })
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Refreshing => write!(f, "refreshing"),
            Phase::Minting => write!(f, "minting"),
            Phase::SettlingPostMint { .. } => write!(f, "settling"),
        }
    }
}

/// Flags the view renders from
///
/// Rebuilt on every transition, never persisted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintUiState {
    /// Sale has started
    pub is_active: bool,
    /// Nothing left to mint
    pub is_sold_out: bool,
    /// A mint is in flight
    pub is_minting: bool,
    /// Wallet balance
    pub balance_lamports: Option<Lamports>,
    /// Last outcome message
    pub status_message: Option<StatusMessage>,
}

/// Everything a rendering layer needs after a transition
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MintUiSnapshot {
    /// Current phase
    pub phase: Phase,
    /// Flags
    pub ui: MintUiState,
    /// Last sale state read, `None` before the first successful refresh
    pub sale: Option<SaleState>,
    /// Sale start currently counted down to, unix time in milliseconds
    pub sale_start_ms: u64,
    /// Last notification
    pub notification: Option<Notification>,
}

/// Why a mint request was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardRejection {
    /// No wallet connected
    NoWallet,
    /// Sale is sold out
    SoldOut,
    /// Another mint is in flight
    AlreadyMinting,
    /// Sale has not started
    SaleInactive,
    /// Program state has not been loaded yet
    ProgramNotLoaded,
}

impl fmt::Display for GuardRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardRejection::NoWallet => write!(f, "no wallet connected"),
            GuardRejection::SoldOut => write!(f, "sold out"),
            GuardRejection::AlreadyMinting => write!(f, "already minting"),
            GuardRejection::SaleInactive => write!(f, "sale not active"),
            GuardRejection::ProgramNotLoaded => write!(f, "program not loaded"),
        }
    }
}

/// Result of a user mint action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintAttempt {
    /// Ignored by the guard, nothing was submitted and nothing is shown
    Rejected(GuardRejection),
    /// A mint was submitted and settled
    Completed(MintOutcome),
}

/// Wallet header shown once a wallet is connected
#[derive(Debug, Clone, PartialEq)]
pub struct WalletSummary {
    /// Shortened wallet address
    pub short_address: String,
    /// Balance in SOL
    pub balance_sol: f64,
    /// Items available
    pub items_available: u64,
    /// Items redeemed
    pub items_redeemed: u64,
    /// Items remaining
    pub items_remaining: u64,
}
