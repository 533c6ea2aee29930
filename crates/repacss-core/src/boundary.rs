// ── Boundary / timezone disambiguation ──
//
// Edge-hold extension is fine across a short polling gap but badly wrong
// when the query window was shifted by a timezone bug upstream. This is
// best-effort drift detection: large gaps between the requested window
// and the returned data disable extension.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{DataWindow, QueryWindow};
use crate::time::seconds_between;

pub const DEFAULT_HARD_GAP_SECS: f64 = 7200.0;
pub const DEFAULT_SOFT_GAP_SECS: f64 = 3600.0;
pub const DEFAULT_SPAN_RATIO: f64 = 2.0;

/// Thresholds for the drift heuristic.
///
/// A gap above `hard_gap_secs` on either side always disables boundaries.
/// A gap above `soft_gap_secs` disables them only when the data spans more
/// than `span_ratio` times the query duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPolicy {
    pub hard_gap_secs: f64,
    pub soft_gap_secs: f64,
    pub span_ratio: f64,
}

impl Default for BoundaryPolicy {
    fn default() -> Self {
        Self {
            hard_gap_secs: DEFAULT_HARD_GAP_SECS,
            soft_gap_secs: DEFAULT_SOFT_GAP_SECS,
            span_ratio: DEFAULT_SPAN_RATIO,
        }
    }
}

impl BoundaryPolicy {
    pub fn new(hard_gap_secs: f64, soft_gap_secs: f64, span_ratio: f64) -> Result<Self, CoreError> {
        let policy = Self {
            hard_gap_secs,
            soft_gap_secs,
            span_ratio,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in [
            ("hard_gap_secs", self.hard_gap_secs),
            ("soft_gap_secs", self.soft_gap_secs),
            ("span_ratio", self.span_ratio),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::validation(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.soft_gap_secs > self.hard_gap_secs {
            return Err(CoreError::validation(format!(
                "soft_gap_secs ({}) must not exceed hard_gap_secs ({})",
                self.soft_gap_secs, self.hard_gap_secs
            )));
        }
        Ok(())
    }

    /// Decide whether the query window can be trusted for edge extension.
    pub fn decide(
        &self,
        data: DataWindow,
        query_start: DateTime<Utc>,
        query_end: DateTime<Utc>,
    ) -> BoundaryDecision {
        let gap_before = seconds_between(query_start, data.start).max(0.0);
        let gap_after = seconds_between(data.end, query_end).max(0.0);
        let query_secs = seconds_between(query_start, query_end);
        let data_secs = data.duration_secs();

        let reason = if gap_before > self.hard_gap_secs {
            Some(DriftReason::GapBefore { gap_secs: gap_before })
        } else if gap_after > self.hard_gap_secs {
            Some(DriftReason::GapAfter { gap_secs: gap_after })
        } else if (gap_before > self.soft_gap_secs || gap_after > self.soft_gap_secs)
            && query_secs > 0.0
            && data_secs > self.span_ratio * query_secs
        {
            Some(DriftReason::SpanMismatch {
                query_secs,
                data_secs,
            })
        } else {
            None
        };

        match &reason {
            Some(reason) => warn!(
                %reason,
                query_start = %query_start,
                query_end = %query_end,
                data_start = %data.start,
                data_end = %data.end,
                "possible timezone mismatch, ignoring query boundaries"
            ),
            None => debug!(gap_before, gap_after, "query boundaries accepted"),
        }

        BoundaryDecision {
            use_boundaries: reason.is_none(),
            gap_before_secs: gap_before,
            gap_after_secs: gap_after,
            reason,
        }
    }
}

/// Why boundaries were discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriftReason {
    GapBefore { gap_secs: f64 },
    GapAfter { gap_secs: f64 },
    SpanMismatch { query_secs: f64, data_secs: f64 },
}

impl fmt::Display for DriftReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GapBefore { gap_secs } => {
                write!(f, "data starts {:.1}h after query start", gap_secs / 3600.0)
            }
            Self::GapAfter { gap_secs } => {
                write!(f, "data ends {:.1}h before query end", gap_secs / 3600.0)
            }
            Self::SpanMismatch {
                query_secs,
                data_secs,
            } => write!(
                f,
                "data spans {:.1}h against a {:.1}h query",
                data_secs / 3600.0,
                query_secs / 3600.0
            ),
        }
    }
}

/// Outcome of the drift heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundaryDecision {
    pub use_boundaries: bool,
    pub gap_before_secs: f64,
    pub gap_after_secs: f64,
    pub reason: Option<DriftReason>,
}

impl BoundaryDecision {
    /// The window to integrate with: the query window when trusted,
    /// otherwise none at all.
    pub fn window(&self, query: QueryWindow) -> QueryWindow {
        if self.use_boundaries {
            query
        } else {
            QueryWindow::unbounded()
        }
    }
}
