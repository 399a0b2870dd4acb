//! User facing status messages
//!
//! Every mint attempt ends in exactly one [`StatusMessage`]. The mapping from outcome to text
//! lives here and nowhere else.

use std::fmt;

use dropkit_common::{Error, ProgramErrorCode};
use serde::{Deserialize, Serialize};

use crate::mint::MintOutcome;

/// Shown when a mint landed successfully
pub const MINT_SUCCEEDED: &str = "Congratulations! Mint succeeded!";
/// Shown when the transaction landed with an on-ledger error
pub const MINT_REJECTED: &str = "Mint failed! Please try again!";
/// Shown for failures without a more specific message
pub const MINT_FAILED: &str = "Minting failed! Please try again!";
/// Shown when the program reports it is empty
pub const SOLD_OUT: &str = "SOLD OUT!";
/// Shown when the program is not live yet
pub const SALE_NOT_STARTED: &str = "Minting period hasn't started yet.";
/// Shown when the wallet cannot pay for the mint
pub const INSUFFICIENT_FUNDS: &str = "Insufficient funds to mint. Please fund your wallet.";
/// Shown when the sale state could not be loaded
pub const REFRESH_FAILED: &str = "Failed to load sale state. Please refresh the page.";

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Success
    Success,
    /// Info
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Message and severity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Text shown to the user
    pub text: String,
    /// Severity
    pub severity: Severity,
}

impl StatusMessage {
    /// Success message
    pub fn success<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Success,
        }
    }

    /// Error message
    pub fn error<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Error,
        }
    }
}

/// Why a mint submission failed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MintFailure {
    /// Wallet cannot pay for the mint
    InsufficientFunds,
    /// Program has no items left
    SoldOut,
    /// Program is not live yet
    SaleNotStarted,
    /// Ledger client could not be reached
    LedgerUnavailable,
    /// Anything else, with the raw message when there is one
    Unknown(Option<String>),
}

impl MintFailure {
    /// Classify an error returned by the ledger client
    pub fn classify(err: &Error) -> Self {
        if let Some(code) = err.program_error_code() {
            match code {
                ProgramErrorCode::NotEnoughSol => return Self::InsufficientFunds,
                ProgramErrorCode::CandyMachineEmpty => return Self::SoldOut,
                ProgramErrorCode::CandyMachineNotLive => return Self::SaleNotStarted,
                ProgramErrorCode::Unknown(_) => (),
            }
        }

        match err {
            Error::LedgerUnavailable(_) | Error::Timeout => Self::LedgerUnavailable,
            Error::Program { message, .. } => Self::Unknown(message.clone()),
            Error::Transaction(message) => Self::Unknown(Some(message.clone())),
            Error::Custom(message) => Self::Unknown(Some(message.clone())),
            _ => Self::Unknown(None),
        }
    }

    /// Message shown for this failure
    pub fn status_message(&self) -> StatusMessage {
        match self {
            Self::InsufficientFunds => StatusMessage::error(INSUFFICIENT_FUNDS),
            Self::SoldOut => StatusMessage::error(SOLD_OUT),
            Self::SaleNotStarted => StatusMessage::error(SALE_NOT_STARTED),
            Self::LedgerUnavailable => StatusMessage::error(MINT_FAILED),
            Self::Unknown(Some(message)) if !message.trim().is_empty() => {
                StatusMessage::error(message.clone())
            }
            Self::Unknown(_) => StatusMessage::error(MINT_FAILED),
        }
    }
}

impl fmt::Display for MintFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientFunds => write!(f, "insufficient funds"),
            Self::SoldOut => write!(f, "sold out"),
            Self::SaleNotStarted => write!(f, "sale not started"),
            Self::LedgerUnavailable => write!(f, "ledger unavailable"),
            Self::Unknown(Some(message)) => write!(f, "unknown failure: {message}"),
            Self::Unknown(None) => write!(f, "unknown failure"),
        }
    }
}

impl MintOutcome {
    /// Message shown for this outcome
    pub fn status_message(&self) -> StatusMessage {
        match self {
            MintOutcome::Confirmed { .. } => StatusMessage::success(MINT_SUCCEEDED),
            MintOutcome::Rejected { .. } => StatusMessage::error(MINT_REJECTED),
            MintOutcome::TimedOut { .. } => StatusMessage::error(MINT_FAILED),
            MintOutcome::Failed(failure) => failure.status_message(),
        }
    }
}

/// Dismissible notification showing the last outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Message
    pub message: StatusMessage,
    /// Still shown
    pub open: bool,
    /// When it was shown, unix time in milliseconds
    pub shown_at_ms: u64,
}

impl Notification {
    /// Open a new notification
    pub fn new(message: StatusMessage, shown_at_ms: u64) -> Self {
        Self {
            message,
            open: true,
            shown_at_ms,
        }
    }

    /// Visible at `now_ms` given the auto hide duration
    pub fn is_visible(&self, now_ms: u64, auto_hide_ms: u64) -> bool {
        self.open && now_ms.saturating_sub(self.shown_at_ms) < auto_hide_ms
    }

    /// Close the notification, keeping its message
    pub fn dismiss(&mut self) {
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use dropkit_common::TransactionId;

    use super::*;

    #[test]
    fn test_classify_program_codes() {
        let err = |code| Error::Program {
            code,
            message: Some("raw".to_string()),
        };

        assert_eq!(MintFailure::classify(&err(311)), MintFailure::SoldOut);
        assert_eq!(MintFailure::classify(&err(312)), MintFailure::SaleNotStarted);
        assert_eq!(
            MintFailure::classify(&err(309)),
            MintFailure::InsufficientFunds
        );
        assert_eq!(
            MintFailure::classify(&err(400)),
            MintFailure::Unknown(Some("raw".to_string()))
        );
    }

    #[test]
    fn test_classify_raw_transaction_messages() {
        let err = Error::Transaction("custom program error: 0x137".to_string());
        assert_eq!(MintFailure::classify(&err), MintFailure::SoldOut);

        let err = Error::Transaction("custom program error: 0x138".to_string());
        assert_eq!(MintFailure::classify(&err), MintFailure::SaleNotStarted);

        let err = Error::Transaction("custom program error: 0x135".to_string());
        assert_eq!(MintFailure::classify(&err), MintFailure::InsufficientFunds);

        let err = Error::Transaction("blockhash not found".to_string());
        assert_eq!(
            MintFailure::classify(&err),
            MintFailure::Unknown(Some("blockhash not found".to_string()))
        );
    }

    #[test]
    fn test_classify_transport_errors() {
        assert_eq!(
            MintFailure::classify(&Error::LedgerUnavailable("down".to_string())),
            MintFailure::LedgerUnavailable
        );
        assert_eq!(MintFailure::classify(&Error::NoWallet), MintFailure::Unknown(None));
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(MintFailure::SoldOut.status_message().text, SOLD_OUT);
        assert_eq!(
            MintFailure::SaleNotStarted.status_message().text,
            SALE_NOT_STARTED
        );
        assert_eq!(
            MintFailure::InsufficientFunds.status_message().text,
            INSUFFICIENT_FUNDS
        );
        assert_eq!(
            MintFailure::Unknown(Some("boom".to_string()))
                .status_message()
                .text,
            "boom"
        );
        assert_eq!(
            MintFailure::Unknown(Some("  ".to_string()))
                .status_message()
                .text,
            MINT_FAILED
        );
        assert_eq!(MintFailure::Unknown(None).status_message().text, MINT_FAILED);
    }

    #[test]
    fn test_outcome_messages() {
        let transaction_id = TransactionId::new("sig");

        let confirmed = MintOutcome::Confirmed {
            transaction_id: transaction_id.clone(),
        };
        assert_eq!(
            confirmed.status_message(),
            StatusMessage::success(MINT_SUCCEEDED)
        );

        let rejected = MintOutcome::Rejected {
            transaction_id: transaction_id.clone(),
            err: "InstructionError".to_string(),
        };
        assert_eq!(rejected.status_message(), StatusMessage::error(MINT_REJECTED));

        let timed_out = MintOutcome::TimedOut { transaction_id };
        assert_eq!(timed_out.status_message().severity, Severity::Error);
    }

    #[test]
    fn test_notification_visibility() {
        let mut notification = Notification::new(StatusMessage::success("ok"), 1_000);
        assert!(notification.is_visible(1_000, 6_000));
        assert!(notification.is_visible(6_999, 6_000));
        assert!(!notification.is_visible(7_000, 6_000));

        notification.dismiss();
        assert!(!notification.is_visible(1_000, 6_000));
        assert_eq!(notification.message.text, "ok");
    }
}
