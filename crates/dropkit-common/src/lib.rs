//! dropkit shared types and traits.
//!
//! This crate is the base foundation to build things that can interact with a drop (an NFT
//! collection sold through an on-ledger mint program) and the internal dropkit crates.
//!
//! It contains the shared types, the collaborator traits implemented by ledger clients and
//! wallet adapters, and the error types that are used across the internal crates.

pub mod address;
pub mod amount;
pub mod error;
pub mod ledger;
pub mod time;

pub use address::{Address, WalletSession};
pub use amount::Lamports;
pub use error::{Error, ProgramErrorCode};
pub use ledger::{
    Commitment, ConfirmationStatus, LedgerProgramClient, ProgramHandle, ProgramState,
    SaleState, TransactionId, WalletAdapter,
};
pub use time::{duration_ms, InstantClock, ManualClock, SystemClock, TimeSource};
