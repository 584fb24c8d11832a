//! Findings
//!
//! Alert records handed to the scan node. The JSON layout (camelCase field
//! names, `"Low"`/`"Info"` enum strings, `alertId`) is consumed downstream by
//! alert aggregation and must not drift.

use std::collections::BTreeMap;

use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingSeverity {
    Unknown,
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// Classification of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingType {
    Unknown,
    Exploit,
    Suspicious,
    Degraded,
    Info,
    Scam,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSource {
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSource {
    /// Transaction hash with 0x prefix
    pub hash: String,
    pub chain_id: u64,
}

/// Where a finding came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingSource {
    pub chains: Vec<ChainSource>,
    pub transactions: Vec<TransactionSource>,
}

impl FindingSource {
    /// Source pointing at a single transaction on `chain_id`
    pub fn transaction(hash: TxHash, chain_id: u64) -> Self {
        Self {
            chains: vec![ChainSource { chain_id }],
            transactions: vec![TransactionSource {
                hash: format_hash(hash),
                chain_id,
            }],
        }
    }
}

/// Alert record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub name: String,
    pub description: String,
    pub alert_id: String,
    pub severity: FindingSeverity,
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    pub metadata: BTreeMap<String, String>,
    pub source: FindingSource,
}

impl Finding {
    /// Serialize the finding to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a finding from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Format an address as a checksummed hex string
pub fn format_address(address: Address) -> String {
    address.to_checksum(None)
}

/// Format a transaction hash as hex string with 0x prefix
pub fn format_hash(hash: TxHash) -> String {
    format!("{:#x}", hash)
}
