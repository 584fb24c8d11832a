//! Transfer Event Decoder
//!
//! Decodes ERC-20 `Transfer` logs into typed events and normalizes raw token
//! amounts into whole units.

use alloy::primitives::{address, Address, Log, U256};
use alloy::sol;
use alloy::sol_types::SolEvent;
use thiserror::Error;

/// Human-readable signature of the ERC-20 Transfer event
pub const ERC20_TRANSFER_EVENT: &str =
    "event Transfer(address indexed from, address indexed to, uint256 value)";

/// USDT (Tether) contract on Ethereum mainnet
pub const TETHER_ADDRESS: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");

/// USDT decimals
pub const TETHER_DECIMALS: u8 = 6;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);
    }
}

/// Errors that can occur while decoding a transfer log
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to decode Transfer log: {0}")]
    Abi(String),
}

/// Decoded ERC-20 Transfer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferEvent {
    /// Sender
    pub from: Address,
    /// Recipient
    pub to: Address,
    /// Amount in token base units
    pub value: U256,
}

impl TransferEvent {
    /// Decode a Transfer event from a raw log
    ///
    /// Topic 0, the indexed addresses and the data word are validated by the
    /// ABI decoder. The emitting contract is not checked here.
    pub fn decode(log: &Log) -> Result<Self, DecodeError> {
        let decoded = IERC20::Transfer::decode_log_data(&log.data, true)
            .map_err(|e| DecodeError::Abi(e.to_string()))?;

        Ok(Self::from(decoded))
    }

    /// Amount shifted by `decimals`, truncated
    pub fn normalized_value(&self, decimals: u8) -> U256 {
        normalize_amount(self.value, decimals)
    }
}

impl From<IERC20::Transfer> for TransferEvent {
    fn from(event: IERC20::Transfer) -> Self {
        Self {
            from: event.from,
            to: event.to,
            value: event.value,
        }
    }
}

/// Divide a raw token amount by `10^decimals` using integer division
pub fn normalize_amount(value: U256, decimals: u8) -> U256 {
    value / U256::from(10u64).pow(U256::from(decimals))
}
