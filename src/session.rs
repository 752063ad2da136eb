//! ==============================================================================
//! session.rs - one dashboard view: construction and teardown
//! ==============================================================================
//!
//! purpose:
//!     wires the pieces together for the lifetime of one view:
//!
//!     ┌──────────────────┐   History    ┌──────────────┐
//!     │ history loader x5│ ───────────▶ │              │
//!     └──────────────────┘              │  dispatcher  │ ──▶ DashboardState
//!     ┌──────────────────┐   Channel    │  (one task)  │     (Arc<RwLock>)
//!     │ live subscriber  │ ───────────▶ │              │
//!     └──────────────────┘              │              │
//!     ┌──────────────────┐   Tick       │              │
//!     │ clock            │ ───────────▶ │              │
//!     └──────────────────┘              └──────────────┘
//!
//!     every producer watches the same cancellation token. `shutdown` (or
//!     dropping the session) fires it, which closes the live channel and stops
//!     the clock. the dispatcher exits once all producers are gone.
//!
//! ==============================================================================

use crate::config::DashConfig;
use crate::domain::SensorKey;
use crate::error::Result;
use crate::history::HistoryLoader;
use crate::live::LiveSubscriber;
use crate::state::{DashboardEvent, DashboardState, SharedState};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct DashboardSession {
    state: SharedState,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl DashboardSession {
    /// validates the config, then starts history loads, the live channel and
    /// the clock. nothing is spawned if validation fails.
    pub fn start(config: &DashConfig) -> Result<Self> {
        config.validate()?;
        let base = config.base_url()?;
        let subscriber = LiveSubscriber::new(&base)?;
        let loader = HistoryLoader::new(base, config.api.history_limit);

        let state = DashboardState::new(config.dashboard_options()).shared();
        let cancel = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<DashboardEvent>();
        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(dispatch_loop(state.clone(), events_rx)));

        // sensors load independently and may finish in any order
        for key in SensorKey::ALL {
            let loader = loader.clone();
            let tx = events_tx.clone();
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => debug!(sensor = %key, "history load cancelled"),
                    result = loader.fetch(key) => match result {
                        Ok(points) => {
                            let _ = tx.send(DashboardEvent::History { key, points });
                        }
                        Err(e) => warn!(sensor = %key, error = %e, "history load failed"),
                    },
                }
            }));
        }

        info!(url = %subscriber.url(), "opening live channel");
        let (channel_tx, mut channel_rx) = mpsc::unbounded_channel();
        tasks.push(tokio::spawn(subscriber.run(channel_tx, cancel.clone())));
        let tx = events_tx.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = channel_rx.recv().await {
                if tx.send(DashboardEvent::Channel(event)).is_err() {
                    break;
                }
            }
        }));

        let tick = Duration::from_millis(config.clock.tick_millis.max(1));
        tasks.push(tokio::spawn(run_clock(tick, events_tx, cancel.clone())));

        Ok(Self { state, cancel, tasks })
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// a child token for things that should stop with the session (web server)
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// cancels every producer and waits for all tasks to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "session task ended abnormally");
            }
        }
        info!("dashboard session closed");
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        // covers early returns and panics; tasks wind down on their own
        self.cancel.cancel();
    }
}

async fn dispatch_loop(state: SharedState, mut events: mpsc::UnboundedReceiver<DashboardEvent>) {
    while let Some(event) = events.recv().await {
        state.write().await.dispatch(event);
    }
    debug!("dispatcher stopped");
}

async fn run_clock(tick: Duration, events: mpsc::UnboundedSender<DashboardEvent>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(tick);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let label = chrono::Local::now().format("%H:%M:%S").to_string();
                if events.send(DashboardEvent::Tick(label)).is_err() {
                    break;
                }
            }
        }
    }
}
