//! ==============================================================================
//! buffer.rs - bounded per-sensor point buffer
//! ==============================================================================
//!
//! purpose:
//!     holds the ordered, capped sequence of display points for one sensor and
//!     merges history batches and live deltas into it.
//!
//! merge rule (tail policy, the default):
//!     - point without id      -> dropped, buffer untouched
//!     - id == last entry's id -> last entry replaced (resend / correction)
//!     - otherwise             -> appended, oldest entries evicted past the cap
//!
//!     only the tail is checked. an id that reappears deeper in the buffer is
//!     appended as a duplicate. `MergePolicy::DedupById` replaces in place
//!     instead.
//!
//! ==============================================================================

use crate::domain::DisplayPoint;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// default number of retained points per sensor
pub const DEFAULT_CAP: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// replace only when the id matches the last entry
    #[default]
    Tail,
    /// replace any entry with the same id, wherever it sits
    DedupById,
}

/// what an insert did to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Dropped,
    Replaced,
    Appended,
}

#[derive(Debug, Clone)]
pub struct SensorBuffer {
    points: VecDeque<DisplayPoint>,
    cap: usize,
    policy: MergePolicy,
}

impl Default for SensorBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAP)
    }
}

impl SensorBuffer {
    pub fn new(cap: usize) -> Self {
        Self::with_policy(cap, MergePolicy::default())
    }

    pub fn with_policy(cap: usize, policy: MergePolicy) -> Self {
        let cap = cap.max(1);
        Self {
            points: VecDeque::with_capacity(cap),
            cap,
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&DisplayPoint> {
        self.points.back()
    }

    /// oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &DisplayPoint> + ExactSizeIterator {
        self.points.iter()
    }

    /// the last `n` entries, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &DisplayPoint> {
        self.points.iter().skip(self.points.len().saturating_sub(n))
    }

    pub fn to_vec(&self) -> Vec<DisplayPoint> {
        self.points.iter().cloned().collect()
    }

    /// replace the whole buffer with a history batch, keeping its newest `cap` points
    pub fn load_history(&mut self, points: Vec<DisplayPoint>) {
        let skip = points.len().saturating_sub(self.cap);
        self.points = points.into_iter().skip(skip).collect();
    }

    pub fn insert(&mut self, point: DisplayPoint) -> Merge {
        let Some(id) = point.id else {
            return Merge::Dropped;
        };

        let existing = match self.policy {
            MergePolicy::Tail => self
                .points
                .back()
                .filter(|last| last.id == Some(id))
                .map(|_| self.points.len() - 1),
            MergePolicy::DedupById => self.points.iter().rposition(|p| p.id == Some(id)),
        };

        if let Some(idx) = existing {
            self.points[idx] = point;
            return Merge::Replaced;
        }

        self.points.push_back(point);
        while self.points.len() > self.cap {
            self.points.pop_front();
        }
        Merge::Appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(id: Option<i64>, value: f64) -> DisplayPoint {
        DisplayPoint {
            id,
            value,
            iso_time: String::new(),
            label: "--:--".into(),
        }
    }

    fn ids(buf: &SensorBuffer) -> Vec<Option<i64>> {
        buf.iter().map(|p| p.id).collect()
    }

    #[test]
    fn same_id_as_tail_replaces() {
        let mut buf = SensorBuffer::new(10);
        buf.insert(pt(Some(1), 1.0));
        buf.insert(pt(Some(2), 2.0));

        assert_eq!(buf.insert(pt(Some(2), 2.5)), Merge::Replaced);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.latest().map(|p| p.value), Some(2.5));
    }

    #[test]
    fn new_id_appends_and_evicts_oldest_at_cap() {
        let mut buf = SensorBuffer::new(3);
        for id in 1..=3 {
            buf.insert(pt(Some(id), id as f64));
        }
        assert_eq!(buf.insert(pt(Some(4), 4.0)), Merge::Appended);
        assert_eq!(buf.len(), 3);
        assert_eq!(ids(&buf), vec![Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn point_without_id_is_dropped() {
        let mut buf = SensorBuffer::new(3);
        buf.insert(pt(Some(1), 1.0));
        let before = buf.to_vec();

        assert_eq!(buf.insert(pt(None, 9.0)), Merge::Dropped);
        assert_eq!(buf.to_vec(), before);
    }

    #[test]
    fn tail_policy_duplicates_non_tail_ids() {
        let mut buf = SensorBuffer::new(10);
        buf.insert(pt(Some(1), 1.0));
        buf.insert(pt(Some(2), 2.0));
        buf.insert(pt(Some(1), 1.5));

        assert_eq!(ids(&buf), vec![Some(1), Some(2), Some(1)]);
    }

    #[test]
    fn dedup_policy_replaces_in_place() {
        let mut buf = SensorBuffer::with_policy(10, MergePolicy::DedupById);
        buf.insert(pt(Some(1), 1.0));
        buf.insert(pt(Some(2), 2.0));

        assert_eq!(buf.insert(pt(Some(1), 1.5)), Merge::Replaced);
        assert_eq!(ids(&buf), vec![Some(1), Some(2)]);
        assert_eq!(buf.iter().next().map(|p| p.value), Some(1.5));
    }

    #[test]
    fn load_history_keeps_newest_points() {
        let mut buf = SensorBuffer::new(2);
        buf.load_history(vec![pt(Some(1), 1.0), pt(None, 2.0), pt(Some(3), 3.0)]);
        assert_eq!(ids(&buf), vec![None, Some(3)]);
    }

    #[test]
    fn recent_returns_tail_window() {
        let mut buf = SensorBuffer::new(10);
        for id in 1..=5 {
            buf.insert(pt(Some(id), 0.0));
        }
        let tail: Vec<_> = buf.recent(2).map(|p| p.id).collect();
        assert_eq!(tail, vec![Some(4), Some(5)]);
        assert_eq!(buf.recent(50).count(), 5);
    }
}
