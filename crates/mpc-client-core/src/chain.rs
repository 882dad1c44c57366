//! # Chain Types
//!
//! Network descriptions and value helpers for the Ethereum side of the wallet.
//! The provider itself belongs to the SDK's wallet adapter; this module only
//! carries what the orchestrator needs to describe the network and reason
//! about amounts.

use crate::{Error, Result};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blockchain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const ETHEREUM_MAINNET: ChainId = ChainId(1);
    pub const ETHEREUM_SEPOLIA: ChainId = ChainId(11155111);

    /// Get the name for this chain
    pub fn name(&self) -> &'static str {
        match self.0 {
            1 => "Ethereum Mainnet",
            11155111 => "Ethereum Sepolia",
            _ => "Unknown Chain",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId(id)
    }
}

/// Network the wallet handle is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain identifier
    pub chain_id: ChainId,
    /// JSON-RPC endpoint used by the wallet adapter
    pub rpc_url: String,
    /// Block explorer URL (optional)
    pub explorer_url: Option<String>,
    /// Native currency symbol
    pub symbol: String,
    /// Native currency decimals
    pub decimals: u8,
}

impl NetworkConfig {
    /// Ethereum Sepolia testnet through the public node
    pub fn ethereum_sepolia() -> Self {
        Self {
            chain_id: ChainId::ETHEREUM_SEPOLIA,
            rpc_url: "https://ethereum-sepolia.publicnode.com".to_string(),
            explorer_url: Some("https://sepolia.etherscan.io".to_string()),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }

    /// Ethereum mainnet
    pub fn ethereum_mainnet() -> Self {
        Self {
            chain_id: ChainId::ETHEREUM_MAINNET,
            rpc_url: "https://ethereum.publicnode.com".to_string(),
            explorer_url: Some("https://etherscan.io".to_string()),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }

    /// Custom EVM network
    pub fn custom(chain_id: u64, rpc_url: impl Into<String>, symbol: &str) -> Self {
        Self {
            chain_id: ChainId(chain_id),
            rpc_url: rpc_url.into(),
            explorer_url: None,
            symbol: symbol.to_string(),
            decimals: 18,
        }
    }

    /// Set explorer URL
    pub fn with_explorer(mut self, url: impl Into<String>) -> Self {
        self.explorer_url = Some(url.into());
        self
    }

    /// Get the explorer URL for a transaction
    pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{}", base, tx_hash))
    }

    /// Get the explorer URL for an address
    pub fn explorer_address_url(&self, address: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/address/{}", base, address))
    }

    /// Format a wei amount in whole units of the native currency
    pub fn format_amount(&self, wei: U256) -> String {
        format!("{} {}", format_units(wei, self.decimals), self.symbol)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::ethereum_sepolia()
    }
}

/// Transaction hash returned after broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHash {
    /// The transaction hash
    pub hash: String,
    /// Explorer URL (if available)
    pub explorer_url: Option<String>,
}

impl TxHash {
    /// Create a new transaction hash
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            explorer_url: None,
        }
    }

    /// Add explorer URL
    pub fn with_explorer_url(mut self, url: impl Into<String>) -> Self {
        self.explorer_url = Some(url.into());
        self
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

/// Half of a balance, rounded toward zero
///
/// A balance of one wei yields zero, which the send flow treats as "no funds".
pub fn half_of(balance: U256) -> U256 {
    balance / U256::from(2u8)
}

/// Format a raw value with decimals, trimming trailing zeros
pub fn format_units(raw: U256, decimals: u8) -> String {
    if raw.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u8).pow(U256::from(decimals));
    let whole = raw / divisor;
    let fraction = raw % divisor;

    if fraction.is_zero() {
        whole.to_string()
    } else {
        let fraction_str = format!(
            "{:0>width$}",
            fraction.to_string(),
            width = decimals as usize
        );
        let trimmed = fraction_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}

/// Check if an address is a 0x-prefixed 20-byte hex string
pub fn is_valid_address(address: &str) -> bool {
    if !address.starts_with("0x") || address.len() != 42 {
        return false;
    }
    address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Validate an address, returning it unchanged
pub fn validate_address(address: &str) -> Result<&str> {
    if is_valid_address(address) {
        Ok(address)
    } else {
        Err(Error::InvalidAddress(address.to_string()))
    }
}
