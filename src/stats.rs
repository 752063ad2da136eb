//! ==============================================================================
//! stats.rs - min / max / avg over a buffer snapshot
//! ==============================================================================
//!
//! purpose:
//!     summarises the points currently held for one sensor. non-finite values
//!     (failed numeric coercion upstream) are skipped, so one bad reading
//!     cannot turn min/max/avg into NaN. `count` is the number of readings
//!     that actually contributed.
//!
//! relationships:
//!     - reads: domain.rs (DisplayPoint), via buffer.rs snapshots
//!     - used by: state.rs (sensor views), main.rs (periodic report)
//!
//! ==============================================================================

use crate::domain::DisplayPoint;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub count: usize,
}

impl Stats {
    /// single linear pass; `None` when there is no valid reading
    pub fn compute<'a>(points: impl IntoIterator<Item = &'a DisplayPoint>) -> Option<Self> {
        let mut values = points.into_iter().map(|p| p.value).filter(|v| v.is_finite());

        let first = values.next()?;
        let (mut min, mut max, mut sum, mut count) = (first, first, first, 1usize);
        for v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }

        Some(Self {
            min,
            max,
            avg: sum / count as f64,
            count,
        })
    }

    /// "min 10.0 °C · max 30.0 °C · avg 20.0 °C · 3 samples"
    pub fn describe(&self, unit: &str) -> String {
        format!(
            "min {:.1} {unit} · max {:.1} {unit} · avg {:.1} {unit} · {} samples",
            self.min, self.max, self.avg, self.count
        )
    }
}
