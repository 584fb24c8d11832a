use tracing::error;
use txnscope_monitor::{Scanner, ScannerConfig, TransferMonitor};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match std::env::var("RPC_URL") {
        Ok(url) => ScannerConfig::with_rpc_url(url),
        Err(_) => ScannerConfig::default(),
    };

    let mut scanner = Scanner::new(config, TransferMonitor::new());
    if let Err(e) = scanner.run().await {
        error!("Scanner stopped: {}", e);
        std::process::exit(1);
    }
}
