//! Errors

use std::fmt;

use thiserror::Error;

/// dropkit Error
#[derive(Debug, Error)]
pub enum Error {
    /// No wallet connected
    #[error("No wallet connected")]
    NoWallet,
    /// Ledger client could not be reached
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),
    /// The mint program failed with a numeric error code
    #[error("Program error {code}: {}", message.as_deref().unwrap_or("unknown"))]
    Program {
        /// Numeric program error code
        code: u32,
        /// Message attached by the program, if any
        message: Option<String>,
    },
    /// Transaction failed, raw message from the ledger
    #[error("Transaction failed: {0}")]
    Transaction(String),
    /// Timeout
    #[error("Timeout waiting for ledger")]
    Timeout,
    /// Invalid address
    #[error("Invalid address: `{0}`")]
    InvalidAddress(String),
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    /// Custom Error
    #[error("`{0}`")]
    Custom(String),
}

impl Error {
    /// Program error code carried by this error, either directly or embedded in a raw
    /// transaction message
    pub fn program_error_code(&self) -> Option<ProgramErrorCode> {
        match self {
            Error::Program { code, .. } => Some(ProgramErrorCode::from_code(*code)),
            Error::Transaction(message) => ProgramErrorCode::from_message(message),
            _ => None,
        }
    }
}

/// Known error codes of the mint program
///
/// The set is fixed by the deployed program, anything else is kept as [`ProgramErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum ProgramErrorCode {
    /// Not enough SOL to pay for this minting (309, 0x135)
    NotEnoughSol,
    /// Candy machine is empty (311, 0x137)
    CandyMachineEmpty,
    /// Candy machine is not live yet (312, 0x138)
    CandyMachineNotLive,
    /// Unknown error code
    Unknown(u32),
}

impl ProgramErrorCode {
    /// Error code from u32
    pub fn from_code(code: u32) -> Self {
        match code {
            309 => Self::NotEnoughSol,
            311 => Self::CandyMachineEmpty,
            312 => Self::CandyMachineNotLive,
            _ => Self::Unknown(code),
        }
    }

    /// Error code to u32
    pub fn to_code(&self) -> u32 {
        match self {
            Self::NotEnoughSol => 309,
            Self::CandyMachineEmpty => 311,
            Self::CandyMachineNotLive => 312,
            Self::Unknown(code) => *code,
        }
    }

    /// Whether the code is part of the known table
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Extract an error code from a raw transaction message
    ///
    /// Ledger logs report program failures as hexadecimal, e.g.
    /// `custom program error: 0x137`. The first known code wins, otherwise the first
    /// hexadecimal code found is returned as [`ProgramErrorCode::Unknown`].
    pub fn from_message(message: &str) -> Option<Self> {
        let mut first_unknown = None;

        for (idx, _) in message.match_indices("0x") {
            let digits: String = message[idx + 2..]
                .chars()
                .take_while(|c| c.is_ascii_hexdigit())
                .collect();

            let Ok(code) = u32::from_str_radix(&digits, 16) else {
                continue;
            };

            let code = Self::from_code(code);
            if code.is_known() {
                return Some(code);
            }

            first_unknown.get_or_insert(code);
        }

        first_unknown
    }
}

impl fmt::Display for ProgramErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.to_code(), self.to_code())
    }
}
