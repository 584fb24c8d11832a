//! Block Scanner
//!
//! Polls an HTTP JSON-RPC endpoint for new blocks, fetches their receipts and
//! runs the transfer monitor once per transaction. Transport failures are
//! retried with exponential backoff.

use std::ops::RangeInclusive;
use std::time::Duration;

use alloy::eips::BlockId;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::transports::http::reqwest::Url;
use alloy::transports::{Transport, TransportError};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::finding::Finding;
use crate::monitor::TransferMonitor;
use crate::transaction::{ObservedTransaction, TransactionEvent};

/// Default Ethereum mainnet RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://cloudflare-eth.com/";

/// Delay between polls for new blocks
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Maximum number of consecutive failed polls before giving up
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Initial backoff delay after a failed poll
pub const INITIAL_BACKOFF_MS: u64 = 100;

/// Maximum backoff delay after a failed poll
pub const MAX_BACKOFF_MS: u64 = 30000;

/// Errors that can occur while scanning
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid RPC URL '{0}': {1}")]
    InvalidUrl(String, String),

    #[error("RPC error: {0}")]
    Rpc(#[from] TransportError),

    #[error("Receipts for block {0} not available")]
    BlockNotFound(u64),

    #[error("Max retry attempts ({0}) exceeded")]
    MaxRetryAttemptsExceeded(u32),
}

/// Configuration for the block scanner
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// HTTP JSON-RPC endpoint
    pub rpc_url: String,
    /// Delay between polls in milliseconds
    pub poll_interval_ms: u64,
    /// Maximum consecutive failed polls
    pub max_retry_attempts: u32,
    /// Initial backoff delay in milliseconds
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            poll_interval_ms: POLL_INTERVAL_MS,
            max_retry_attempts: MAX_RETRY_ATTEMPTS,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
            max_backoff_ms: MAX_BACKOFF_MS,
        }
    }
}

impl ScannerConfig {
    /// Create a new config with the specified RPC endpoint
    pub fn with_rpc_url(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ..Default::default()
        }
    }

    /// Calculate backoff delay for a given attempt number
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_backoff_ms * 2u64.pow(attempt.min(10));
        Duration::from_millis(delay_ms.min(self.max_backoff_ms))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parse the configured RPC endpoint
    pub fn url(&self) -> Result<Url, ScanError> {
        Url::parse(&self.rpc_url)
            .map_err(|e| ScanError::InvalidUrl(self.rpc_url.clone(), e.to_string()))
    }
}

/// Run the monitor over every transaction in block `number`
///
/// A transaction that fails evaluation is logged and skipped; the remaining
/// transactions of the block are still evaluated.
pub async fn scan_block<P, T>(
    provider: &P,
    monitor: &TransferMonitor,
    chain_id: u64,
    number: u64,
) -> Result<Vec<Finding>, ScanError>
where
    P: Provider<T>,
    T: Transport + Clone,
{
    let receipts = provider
        .get_block_receipts(BlockId::number(number))
        .await?
        .ok_or(ScanError::BlockNotFound(number))?;

    let transactions: Vec<ObservedTransaction> = receipts
        .iter()
        .map(|receipt| ObservedTransaction::from_receipt(receipt, chain_id))
        .collect();

    Ok(evaluate_transactions(&transactions, monitor))
}

/// Run the monitor over `transactions` in order
///
/// A transaction that fails evaluation is logged and skipped.
pub fn evaluate_transactions(
    transactions: &[ObservedTransaction],
    monitor: &TransferMonitor,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for tx in transactions {
        match monitor.handle_transaction(tx) {
            Ok(found) => findings.extend(found),
            Err(e) => warn!(
                hash = %tx.hash(),
                logs = tx.logs().len(),
                "Skipping transaction: {}",
                e
            ),
        }
    }

    findings
}

/// Blocks to scan given the next unscanned block and the chain head
///
/// Starts at the head on the first poll. Empty once the head has been scanned.
pub fn blocks_to_scan(next_block: Option<u64>, head: u64) -> RangeInclusive<u64> {
    next_block.unwrap_or(head)..=head
}

/// Publish a finding to the scan node
fn publish(finding: &Finding) {
    match finding.to_json() {
        Ok(json) => {
            info!(alert_id = %finding.alert_id, "{}", finding.description);
            println!("{json}");
        }
        Err(e) => error!("Failed to serialize finding: {}", e),
    }
}

/// Polling scanner that feeds new blocks to the monitor
pub struct Scanner {
    config: ScannerConfig,
    monitor: TransferMonitor,
    retry_attempts: u32,
}

impl Scanner {
    pub fn new(config: ScannerConfig, monitor: TransferMonitor) -> Self {
        Self {
            config,
            monitor,
            retry_attempts: 0,
        }
    }

    /// Create with default configuration
    pub fn with_default_config() -> Self {
        Self::new(ScannerConfig::default(), TransferMonitor::new())
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn monitor(&self) -> &TransferMonitor {
        &self.monitor
    }

    /// Get current retry attempt count
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Calculate delay before the next retry
    pub fn next_backoff_delay(&self) -> Duration {
        self.config.backoff_delay(self.retry_attempts)
    }

    /// Record a failed poll, returning an error once retries are exhausted
    fn record_failure(&mut self, e: &ScanError) -> Result<Duration, ScanError> {
        if self.retry_attempts >= self.config.max_retry_attempts {
            return Err(ScanError::MaxRetryAttemptsExceeded(self.config.max_retry_attempts));
        }

        let delay = self.next_backoff_delay();
        self.retry_attempts += 1;
        warn!(
            "Poll failed ({}), retrying (attempt {}/{}) in {:?}",
            e, self.retry_attempts, self.config.max_retry_attempts, delay
        );
        Ok(delay)
    }

    /// Scan new blocks until retries are exhausted
    pub async fn run(&mut self) -> Result<(), ScanError> {
        let url = self.config.url()?;
        info!("Connecting to RPC endpoint at {}", url);
        let provider = ProviderBuilder::new().on_http(url);

        let chain_id = loop {
            match provider.get_chain_id().await {
                Ok(id) => break id,
                Err(e) => {
                    let delay = self.record_failure(&ScanError::Rpc(e))?;
                    sleep(delay).await;
                }
            }
        };
        self.retry_attempts = 0;

        let mut next_block = None;
        info!(chain_id, "Scanning for high USDT transfers");

        loop {
            match self.poll(&provider, chain_id, &mut next_block).await {
                Ok(()) => {
                    self.retry_attempts = 0;
                    sleep(self.config.poll_interval()).await;
                }
                Err(e) => {
                    let delay = self.record_failure(&e)?;
                    sleep(delay).await;
                }
            }
        }
    }

    /// Scan every block between `next_block` and the chain head
    async fn poll<P, T>(
        &self,
        provider: &P,
        chain_id: u64,
        next_block: &mut Option<u64>,
    ) -> Result<(), ScanError>
    where
        P: Provider<T>,
        T: Transport + Clone,
    {
        let head = provider.get_block_number().await?;

        for number in blocks_to_scan(*next_block, head) {
            for finding in scan_block(provider, &self.monitor, chain_id, number).await? {
                publish(&finding);
            }
            *next_block = Some(number + 1);
        }

        Ok(())
    }
}
