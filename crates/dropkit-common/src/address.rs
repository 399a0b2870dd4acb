//! Ledger addresses and wallet sessions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Length of a decoded public key
pub const ADDRESS_BYTES: usize = 32;

/// Base58 encoded ledger address (public key)
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Address as str
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for display, `chars` characters kept at each end
    ///
    /// ```
    /// use dropkit_common::Address;
    ///
    /// let address: Address = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin".parse().unwrap();
    /// assert_eq!(address.shorten(4), "9xQe...VFin");
    /// ```
    pub fn shorten(&self, chars: usize) -> String {
        let len = self.0.chars().count();
        if len <= chars * 2 {
            return self.0.clone();
        }

        let head: String = self.0.chars().take(chars).collect();
        let tail: String = self.0.chars().skip(len - chars).collect();
        format!("{head}...{tail}")
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| Error::InvalidAddress(s.to_string()))?;

        if bytes.len() != ADDRESS_BYTES {
            return Err(Error::InvalidAddress(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated wallet session
///
/// Owned by the wallet adapter. Signing happens inside the adapter and the ledger client, the
/// session only identifies who pays for and receives a mint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletSession {
    /// Public key of the connected wallet
    pub address: Address,
}

impl WalletSession {
    /// Create new [`WalletSession`]
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}
