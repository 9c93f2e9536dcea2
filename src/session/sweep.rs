use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, instrument};

use super::service::SessionService;

/// Configuration for the refresh token sweep
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often to remove expired and revoked refresh tokens
    pub sweep_interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60 * 60), // 1 hour
        }
    }
}

/// Runs the expiry sweep forever on a fixed interval.
/// The host process decides whether to spawn this; the service never does.
#[instrument(skip(service))]
pub async fn start_expiry_sweep(service: Arc<SessionService>, config: SweepConfig) {
    info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "Starting refresh token sweep task"
    );

    let mut sweep_interval = interval(config.sweep_interval);

    loop {
        sweep_interval.tick().await;
        run_sweep(&service).await;
    }
}

async fn run_sweep(service: &SessionService) -> u64 {
    match service.sweep_expired().await {
        Ok(removed) => {
            debug!(removed_tokens = removed, "Sweep tick finished");
            removed
        }
        Err(e) => {
            error!(error = %e, "Refresh token sweep failed");
            0
        }
    }
}
