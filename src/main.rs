//! ==============================================================================
//! main.rs - sensor dashboard entry point
//! ==============================================================================
//!
//! purpose:
//!     runs one dashboard session against the sensor backend and serves the
//!     derived state as JSON for the renderer.
//!
//! responsibilities:
//!     - load configuration (dashboard.toml + API_BASE_URL)
//!     - initialize structured logging
//!     - start the session (history loads, live channel, clock)
//!     - serve the snapshot api in background
//!     - periodically log the latest reading of every sensor
//!     - tear the session down on ctrl-c
//!
//! relationships:
//!     - uses: config.rs, session.rs, server.rs
//!     - reads: state.rs (snapshots for the periodic report)
//!
//! ==============================================================================

use anyhow::{Context, Result};
use sensor_dash::config::{ConfigOrigin, DashConfig};
use sensor_dash::domain::SensorKey;
use sensor_dash::{server, DashboardSession, SharedState};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let (config, origin) = DashConfig::load_or_default();

    // step 2: logging (RUST_LOG wins over the configured level)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();

    info!("sensor dashboard starting");
    match origin {
        ConfigOrigin::File(path) => info!(path = %path.display(), "config loaded"),
        ConfigOrigin::Defaults => warn!("no config file found - using defaults"),
        ConfigOrigin::Fallback { path, error } => {
            warn!(path = %path.display(), %error, "config unusable - using defaults")
        }
    }
    info!(summary = %config.summary(), "configuration");

    // step 3: start the session
    let session = DashboardSession::start(&config).context("failed to start dashboard session")?;
    let state = session.state();

    // step 4: snapshot api in background
    if config.server.enabled {
        let web_state = state.clone();
        let bind = config.server.bind.clone();
        let shutdown = session.cancel_token();
        tokio::spawn(async move {
            if let Err(e) = server::serve(web_state, &bind, shutdown).await {
                error!(error = %e, "snapshot api stopped");
            }
        });
    }

    // step 5: report loop until ctrl-c
    let mut report = tokio::time::interval(Duration::from_secs(
        config.logging.report_interval_seconds.max(1),
    ));
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!(error = %e, "failed to listen for ctrl-c");
                }
                break;
            }
            _ = report.tick() => {
                if config.logging.show_sensor_data {
                    log_report(&state).await;
                }
            }
        }
    }

    info!("shutting down");
    session.shutdown().await;
    Ok(())
}

async fn log_report(state: &SharedState) {
    let state = state.read().await;
    info!(
        connectivity = state.connectivity_text(),
        clock = state.clock(),
        alerts = state.alerts().len(),
        "dashboard"
    );
    for key in SensorKey::ALL {
        let status = state.status(key);
        info!(
            sensor = %key,
            value = %status.display_value,
            at = status.time.as_deref().unwrap_or("--:--"),
            badge = status.badge,
            "{}",
            status.message
        );
    }
}
