//! High Tether Transfer Monitor
//!
//! Reports USDT transfers above 10,000 tokens. The monitor stops reporting
//! after emitting [`MAX_FINDINGS`] findings so the alert feed is not spammed.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::primitives::U256;
use thiserror::Error;
use tracing::{debug, info};

use crate::event::{TransferEvent, ERC20_TRANSFER_EVENT, TETHER_ADDRESS, TETHER_DECIMALS};
use crate::finding::{format_address, Finding, FindingSeverity, FindingSource, FindingType};
use crate::transaction::{FilterError, TransactionEvent};

/// Transfers strictly above this many whole USDT are reported
pub const HIGH_TRANSFER_THRESHOLD: u64 = 10_000;

/// Lifetime cap on emitted findings
pub const MAX_FINDINGS: usize = 5;

pub const FINDING_NAME: &str = "High Tether Transfer";
pub const ALERT_ID: &str = "FORTA-1";

/// Errors that can occur while evaluating a transaction
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Log retrieval failed: {0}")]
    Filter(#[from] FilterError),
}

/// Evaluates transactions for high-value USDT transfers
#[derive(Debug, Default)]
pub struct TransferMonitor {
    emitted: AtomicUsize,
}

impl TransferMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of findings emitted so far
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::SeqCst)
    }

    /// Whether the lifetime cap has been reached
    pub fn is_exhausted(&self) -> bool {
        self.emitted() >= MAX_FINDINGS
    }

    /// Evaluate one transaction
    ///
    /// The cap is checked once on entry. A transaction carrying several
    /// qualifying transfers reports all of them, even if that takes the
    /// lifetime total past [`MAX_FINDINGS`].
    ///
    /// # Returns
    /// Findings in log order. Errors from log retrieval are returned as-is
    /// and no findings are produced for that transaction.
    pub fn handle_transaction<T>(&self, tx: &T) -> Result<Vec<Finding>, MonitorError>
    where
        T: TransactionEvent + Debug + ?Sized,
    {
        let mut findings = Vec::new();

        if self.is_exhausted() {
            return Ok(findings);
        }

        let transfers = tx.filter_log(ERC20_TRANSFER_EVENT, TETHER_ADDRESS)?;
        let threshold = U256::from(HIGH_TRANSFER_THRESHOLD);

        for transfer in &transfers {
            let normalized = transfer.normalized_value(TETHER_DECIMALS);
            if normalized <= threshold {
                continue;
            }

            info!(amount = %normalized, "High USDT transfer");
            debug!(?tx, ?transfer, "Transaction");

            findings.push(high_transfer_finding(tx, transfer, normalized));
            self.emitted.fetch_add(1, Ordering::SeqCst);
        }

        Ok(findings)
    }
}

/// Build the finding for a qualifying transfer
fn high_transfer_finding<T>(tx: &T, transfer: &TransferEvent, normalized: U256) -> Finding
where
    T: TransactionEvent + ?Sized,
{
    let mut metadata = BTreeMap::new();
    metadata.insert("to".to_string(), format_address(transfer.to));
    metadata.insert("from".to_string(), format_address(transfer.from));

    Finding {
        name: FINDING_NAME.to_string(),
        description: format!("High amount of USDT transferred: {normalized}"),
        alert_id: ALERT_ID.to_string(),
        severity: FindingSeverity::Low,
        finding_type: FindingType::Info,
        metadata,
        source: FindingSource::transaction(tx.hash(), tx.chain_id()),
    }
}
