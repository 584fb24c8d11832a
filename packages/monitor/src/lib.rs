//! TxnScope Monitor Library
//!
//! This crate watches mined transactions for large USDT transfers and emits
//! findings for the alert feed, capped at five per process.

pub mod event;
pub mod finding;
pub mod monitor;
pub mod scanner;
pub mod transaction;

// Re-export commonly used types
pub use event::{TransferEvent, ERC20_TRANSFER_EVENT, TETHER_ADDRESS, TETHER_DECIMALS};
pub use finding::{Finding, FindingSeverity, FindingSource, FindingType};
pub use monitor::{MonitorError, TransferMonitor, HIGH_TRANSFER_THRESHOLD, MAX_FINDINGS};
pub use scanner::{Scanner, ScannerConfig};
pub use transaction::{FilterError, ObservedTransaction, TransactionEvent};
