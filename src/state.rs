//! ==============================================================================
//! state.rs - dashboard state and the single event dispatcher
//! ==============================================================================
//!
//! purpose:
//!     owns one buffer per sensor, the connectivity flag and the header clock.
//!     every mutation goes through `dispatch`, fed by the session's event
//!     channel, so history batches, live frames and clock ticks never
//!     interleave within one merge.
//!
//!     readers (web server, periodic report) take snapshots through the shared
//!     `Arc<RwLock<_>>` handle, the same way the poll loop and the web server
//!     share readings in the host.
//!
//! ==============================================================================

use crate::alerts::{build_alert_feed, AlertEntry, AlertOrder, SensorStatus, Thresholds};
use crate::buffer::{Merge, MergePolicy, SensorBuffer};
use crate::domain::{DeltaMessage, DisplayPoint, SensorKey};
use crate::error::Result;
use crate::live::ChannelEvent;
use crate::normalize::normalize;
use crate::stats::Stats;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub type SharedState = Arc<RwLock<DashboardState>>;

pub const ONLINE_TEXT: &str = "En línea";
pub const OFFLINE_TEXT: &str = "Desconectado";

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    History {
        key: SensorKey,
        points: Vec<DisplayPoint>,
    },
    Channel(ChannelEvent),
    Tick(String),
}

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub cap: usize,
    pub merge_policy: MergePolicy,
    pub alert_window: usize,
    pub alert_order: AlertOrder,
    pub thresholds: Thresholds,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            cap: crate::buffer::DEFAULT_CAP,
            merge_policy: MergePolicy::default(),
            alert_window: crate::alerts::DEFAULT_ALERT_WINDOW,
            alert_order: AlertOrder::default(),
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug)]
pub struct DashboardState {
    buffers: BTreeMap<SensorKey, SensorBuffer>,
    online: bool,
    clock: String,
    options: DashboardOptions,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(DashboardOptions::default())
    }
}

impl DashboardState {
    pub fn new(options: DashboardOptions) -> Self {
        let buffers = SensorKey::ALL
            .into_iter()
            .map(|k| (k, SensorBuffer::with_policy(options.cap, options.merge_policy)))
            .collect();
        Self {
            buffers,
            online: false,
            clock: String::new(),
            options,
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    pub fn dispatch(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::History { key, points } => {
                info!(sensor = %key, points = points.len(), "history loaded");
                self.buffer_mut(key).load_history(points);
            }
            DashboardEvent::Channel(ChannelEvent::Opened) => self.set_online(true),
            DashboardEvent::Channel(ChannelEvent::Closed) => self.set_online(false),
            DashboardEvent::Channel(ChannelEvent::Error(reason)) => {
                warn!(%reason, "live channel error");
                self.set_online(false);
            }
            DashboardEvent::Channel(ChannelEvent::Message(text)) => {
                if let Err(e) = self.apply_delta(&text) {
                    warn!(error = %e, "ignoring malformed live frame");
                }
            }
            DashboardEvent::Tick(label) => self.clock = label,
        }
    }

    /// decode one live frame and merge each present sensor; returns how many
    /// points changed a buffer
    pub fn apply_delta(&mut self, text: &str) -> Result<usize> {
        let delta: DeltaMessage = serde_json::from_str(text)?;
        let mut changed = 0;
        for (key, raw) in delta.into_entries() {
            match self.buffer_mut(key).insert(normalize(&raw)) {
                Merge::Dropped => debug!(sensor = %key, "delta without id dropped"),
                Merge::Replaced | Merge::Appended => changed += 1,
            }
        }
        Ok(changed)
    }

    fn set_online(&mut self, online: bool) {
        if self.online != online {
            info!(online, "connectivity changed");
        }
        self.online = online;
    }

    fn buffer_mut(&mut self, key: SensorKey) -> &mut SensorBuffer {
        let (cap, policy) = (self.options.cap, self.options.merge_policy);
        self.buffers
            .entry(key)
            .or_insert_with(|| SensorBuffer::with_policy(cap, policy))
    }

    pub fn buffer(&self, key: SensorKey) -> Option<&SensorBuffer> {
        self.buffers.get(&key)
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn connectivity_text(&self) -> &'static str {
        if self.online {
            ONLINE_TEXT
        } else {
            OFFLINE_TEXT
        }
    }

    pub fn clock(&self) -> &str {
        &self.clock
    }

    pub fn stats(&self, key: SensorKey) -> Option<Stats> {
        self.buffer(key).and_then(|b| Stats::compute(b.iter()))
    }

    pub fn status(&self, key: SensorKey) -> SensorStatus {
        let config = self.options.thresholds.get(key);
        match self.buffer(key) {
            Some(buffer) => SensorStatus::from_buffer(key, config, buffer),
            None => SensorStatus::from_buffer(key, config, &SensorBuffer::default()),
        }
    }

    pub fn alerts(&self) -> Vec<AlertEntry> {
        let thresholds = &self.options.thresholds;
        build_alert_feed(
            self.buffers
                .iter()
                .map(|(key, buffer)| (*key, thresholds.get(*key), buffer)),
            self.options.alert_window,
            self.options.alert_order,
        )
    }

    pub fn sensor_view(&self, key: SensorKey) -> SensorView {
        SensorView {
            status: self.status(key),
            stats: self.stats(key),
            points: self.buffer(key).map(SensorBuffer::to_vec).unwrap_or_default(),
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            online: self.online,
            connectivity: self.connectivity_text(),
            clock: self.clock.clone(),
            sensors: SensorKey::ALL
                .into_iter()
                .map(|k| (k, self.sensor_view(k)))
                .collect(),
            alerts: self.alerts(),
        }
    }
}

/// one sensor as the renderer sees it: card, stats row and chart series
#[derive(Debug, Clone, Serialize)]
pub struct SensorView {
    pub status: SensorStatus,
    pub stats: Option<Stats>,
    pub points: Vec<DisplayPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub online: bool,
    pub connectivity: &'static str,
    pub clock: String,
    pub sensors: BTreeMap<SensorKey, SensorView>,
    pub alerts: Vec<AlertEntry>,
}
