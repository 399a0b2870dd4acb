//! dropkit
//!
//! Client side lifecycle of an on-ledger NFT drop: when the sale opens, what is left, and the
//! single mint a user triggers from a connected wallet.

#![doc = include_str!("../README.md")]

pub mod button;
pub mod clock;
pub mod controller;
pub mod ledger;
pub mod logging;
pub mod mint;
pub mod settings;
pub mod status;

#[doc(hidden)]
pub use dropkit_common as common;
pub use dropkit_common::{
    Address, Commitment, Error, Lamports, LedgerProgramClient, ProgramErrorCode, SaleState,
    TimeSource, WalletAdapter, WalletSession,
};

pub use self::button::{ButtonLabel, MintButtonView};
pub use self::clock::{Countdown, SaleActivationClock};
pub use self::controller::{
    ControllerConfig, GuardRejection, MintAttempt, MintLifecycleController, MintUiSnapshot,
    MintUiState, Phase,
};
pub use self::ledger::{LedgerStateReader, SaleSnapshot};
pub use self::mint::{MintOperation, MintOutcome};
pub use self::settings::Settings;
pub use self::status::{MintFailure, Notification, StatusMessage};
