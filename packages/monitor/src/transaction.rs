//! Transaction Log Filtering
//!
//! Exposes a transaction's hash, chain and decoded event logs to the monitor.
//! Logs are matched by emitting contract and topic 0, then decoded into
//! typed transfer events.

use alloy::json_abi::Event;
use alloy::primitives::{Address, Log, TxHash, B256};
use alloy::rpc::types::TransactionReceipt;
use alloy::sol_types::SolEvent;
use thiserror::Error;

use crate::event::{DecodeError, TransferEvent, IERC20};

/// Errors that can occur while filtering transaction logs
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid event signature '{0}': {1}")]
    InvalidSignature(String, String),

    #[error("Unsupported event: {0}")]
    UnsupportedEvent(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A transaction as seen by the monitor
pub trait TransactionEvent {
    /// Transaction hash
    fn hash(&self) -> TxHash;

    /// Chain the transaction was observed on
    fn chain_id(&self) -> u64;

    /// Decoded transfer events emitted by `contract` matching `event_signature`,
    /// in log order
    fn filter_log(
        &self,
        event_signature: &str,
        contract: Address,
    ) -> Result<Vec<TransferEvent>, FilterError>;
}

/// Compute the topic 0 selector for a human-readable event signature
///
/// Accepts both `event Transfer(address indexed from, ...)` and the bare
/// `Transfer(address indexed from, ...)` form.
pub fn event_selector(event_signature: &str) -> Result<B256, FilterError> {
    Event::parse(event_signature)
        .map(|event| event.selector())
        .map_err(|e| FilterError::InvalidSignature(event_signature.to_string(), e.to_string()))
}

/// Transaction assembled from a mined receipt
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedTransaction {
    hash: TxHash,
    chain_id: u64,
    logs: Vec<Log>,
}

impl ObservedTransaction {
    pub fn new(hash: TxHash, chain_id: u64, logs: Vec<Log>) -> Self {
        Self {
            hash,
            chain_id,
            logs,
        }
    }

    /// Build from an RPC receipt (e.g. one entry of `eth_getBlockReceipts`)
    pub fn from_receipt(receipt: &TransactionReceipt, chain_id: u64) -> Self {
        let logs = receipt
            .inner
            .logs()
            .iter()
            .map(|log| log.inner.clone())
            .collect();

        Self::new(receipt.transaction_hash, chain_id, logs)
    }

    /// All raw logs in emission order
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }
}

impl TransactionEvent for ObservedTransaction {
    fn hash(&self) -> TxHash {
        self.hash
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn filter_log(
        &self,
        event_signature: &str,
        contract: Address,
    ) -> Result<Vec<TransferEvent>, FilterError> {
        let selector = event_selector(event_signature)?;
        if selector != IERC20::Transfer::SIGNATURE_HASH {
            return Err(FilterError::UnsupportedEvent(event_signature.to_string()));
        }

        self.logs
            .iter()
            .filter(|log| log.address == contract && log.topics().first() == Some(&selector))
            .map(|log| TransferEvent::decode(log).map_err(FilterError::from))
            .collect()
    }
}
