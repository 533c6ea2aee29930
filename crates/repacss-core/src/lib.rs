// repacss-core: Pure energy math over REPACSS power telemetry.
//
// Nothing in this crate touches the filesystem or a database. Callers hand
// in result sets (rows already fetched) and get back kWh figures, boundary
// decisions, and component breakdowns.

pub mod boundary;
pub mod breakdown;
pub mod catalog;
pub mod energy;
pub mod error;
pub mod model;
pub mod nodes;
pub mod relationship;
pub mod stats;
pub mod time;
pub mod units;

// ── Primary re-exports ──────────────────────────────────────────────
pub use boundary::{BoundaryDecision, BoundaryPolicy, DriftReason};
pub use breakdown::{CategoryEnergies, ComponentBreakdown, ComponentRow, MetricEnergy};
pub use catalog::Category;
pub use energy::{WindowEnergy, energy_for_window, energy_kwh, per_device_energy, total_series};
pub use error::CoreError;
pub use model::{
    Column, DataWindow, PowerSample, QueryWindow, RawSample, RawTimestamp, ResultSet, Series,
};
pub use nodes::{Database, NodeKind, NodeTarget, Rack};
pub use relationship::{Relationship, RelationshipStatus};
pub use stats::{CumulativePoint, PowerStats};
pub use units::{PowerUnit, UnitInfo};
