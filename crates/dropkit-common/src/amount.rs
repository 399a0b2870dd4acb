//! Ledger amounts
//!
//! Balances are always held in lamports, the smallest denomination of the ledger's native
//! currency, and only converted to SOL for display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Number of lamports in one SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Amount in lamports
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lamports(u64);

impl Lamports {
    /// Zero lamports
    pub const ZERO: Lamports = Lamports(0);

    /// Create from a whole number of SOL
    pub const fn from_sol(sol: u64) -> Self {
        Self(sol.saturating_mul(LAMPORTS_PER_SOL))
    }

    /// Raw lamport value
    #[inline(always)]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Balance expressed in SOL, for display only
    pub fn to_sol(&self) -> f64 {
        self.0 as f64 / LAMPORTS_PER_SOL as f64
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Lamports) -> Option<Lamports> {
        self.0.checked_sub(other.0).map(Lamports)
    }

    /// Saturating addition
    pub fn saturating_add(self, other: Lamports) -> Lamports {
        Lamports(self.0.saturating_add(other.0))
    }
}

impl From<u64> for Lamports {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Lamports> for u64 {
    fn from(value: Lamports) -> Self {
        value.0
    }
}

impl FromStr for Lamports {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .parse::<u64>()
            .map_err(|_| Error::Custom(format!("Invalid lamport amount: {s}")))?;
        Ok(Lamports(value))
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
