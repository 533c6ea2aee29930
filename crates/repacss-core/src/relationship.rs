// ── Metric relationship analysis ──
//
// Cross-checks metrics that should agree: variants within CPU, MEMORY, and
// SYSTEM, plus SystemOutputPower against the summed components.

use serde::Serialize;

use crate::breakdown::{CategoryEnergies, ComponentBreakdown};
use crate::catalog::{Category, SYSTEM_OUTPUT_METRIC};

/// Below this percentage two variants count as the same measurement.
pub const IDENTICAL_PERCENT: f64 = 5.0;

/// Below this percentage the components account for system output.
pub const MATCHES_PERCENT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RelationshipStatus {
    Identical,
    Different,
    Matches,
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    /// A category name, or `VALIDATION` for the system-vs-components row.
    pub category: String,
    pub metric1: String,
    pub metric2: String,
    pub energy1_kwh: f64,
    pub energy2_kwh: f64,
    pub difference_kwh: f64,
    pub difference_percent: f64,
    pub relationship: RelationshipStatus,
}

const COMPARED: [Category; 3] = [Category::Cpu, Category::Memory, Category::System];

/// Pairwise variant comparisons followed by the validation row.
pub fn analyze(energies: &CategoryEnergies, breakdown: &ComponentBreakdown) -> Vec<Relationship> {
    let mut out = Vec::new();

    for category in COMPARED {
        let metrics = energies.get(category);
        for (i, first) in metrics.iter().enumerate() {
            for second in metrics.iter().skip(i + 1) {
                let (e1, e2) = (first.energy_kwh, second.energy_kwh);
                if e1 <= 0.0 || e2 <= 0.0 {
                    continue;
                }
                let difference = (e1 - e2).abs();
                let percent = difference / e1.max(e2) * 100.0;
                out.push(Relationship {
                    category: category.to_string(),
                    metric1: first.metric.clone(),
                    metric2: second.metric.clone(),
                    energy1_kwh: e1,
                    energy2_kwh: e2,
                    difference_kwh: difference,
                    difference_percent: percent,
                    relationship: if percent < IDENTICAL_PERCENT {
                        RelationshipStatus::Identical
                    } else {
                        RelationshipStatus::Different
                    },
                });
            }
        }
    }

    if let Some(row) = validation(breakdown) {
        out.push(row);
    }
    out
}

/// SystemOutputPower against the component total, as a share of system output.
pub fn validation(breakdown: &ComponentBreakdown) -> Option<Relationship> {
    let system = breakdown.system_output;
    let components = breakdown.components_total();
    if system <= 0.0 || components <= 0.0 {
        return None;
    }
    let difference = (system - components).abs();
    let percent = difference / system * 100.0;
    Some(Relationship {
        category: "VALIDATION".into(),
        metric1: SYSTEM_OUTPUT_METRIC.into(),
        metric2: "Components_Total".into(),
        energy1_kwh: system,
        energy2_kwh: components,
        difference_kwh: difference,
        difference_percent: percent,
        relationship: if percent < MATCHES_PERCENT {
            RelationshipStatus::Matches
        } else {
            RelationshipStatus::Mismatch
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::breakdown::MetricEnergy;
    use crate::catalog::category_of;

    fn energies(pairs: &[(&str, f64)]) -> CategoryEnergies {
        pairs
            .iter()
            .map(|(m, kwh)| MetricEnergy::scalar(*m, category_of(m).unwrap(), *kwh))
            .collect()
    }

    #[test]
    fn close_variants_are_identical() {
        let e = energies(&[("CPUPower", 1.00), ("PkgPwr", 1.03)]);
        let rows = analyze(&e, &ComponentBreakdown::from_energies(&e));
        let cpu: Vec<_> = rows.iter().filter(|r| r.category == "CPU").collect();
        assert_eq!(cpu.len(), 1);
        assert_eq!(cpu[0].relationship, RelationshipStatus::Identical);
        assert!((cpu[0].difference_percent - 3.0 / 1.03).abs() < 1e-9);
    }

    #[test]
    fn distant_variants_are_different() {
        let e = energies(&[("DRAMPwr", 1.0), ("TotalMemoryPower", 2.0)]);
        let rows = analyze(&e, &ComponentBreakdown::from_energies(&e));
        assert_eq!(rows[0].relationship, RelationshipStatus::Different);
        assert_eq!(rows[0].difference_percent, 50.0);
    }

    #[test]
    fn zero_energy_pairs_are_skipped() {
        let e = energies(&[("CPUPower", 0.0), ("PkgPwr", 1.0), ("TotalCPUPower", 1.0)]);
        let rows = analyze(&e, &ComponentBreakdown::from_energies(&e));
        let cpu: Vec<_> = rows.iter().filter(|r| r.category == "CPU").collect();
        assert_eq!(cpu.len(), 1);
        assert_eq!(cpu[0].metric1, "PkgPwr");
    }

    #[test]
    fn gpu_and_fan_are_not_compared() {
        let e = energies(&[("PowerConsumption", 1.0), ("TotalFanPower", 1.0)]);
        let rows = analyze(&e, &ComponentBreakdown::from_energies(&e));
        assert!(rows.is_empty());
    }

    #[test]
    fn validation_matches_within_ten_percent() {
        let e = energies(&[("SystemOutputPower", 10.0), ("TotalCPUPower", 9.5)]);
        let row = validation(&ComponentBreakdown::from_energies(&e)).unwrap();
        assert_eq!(row.relationship, RelationshipStatus::Matches);
        assert_eq!(row.metric2, "Components_Total");
    }

    #[test]
    fn validation_mismatch_and_absence() {
        let e = energies(&[("SystemOutputPower", 10.0), ("TotalCPUPower", 5.0)]);
        let row = validation(&ComponentBreakdown::from_energies(&e)).unwrap();
        assert_eq!(row.relationship, RelationshipStatus::Mismatch);
        assert_eq!(row.difference_percent, 50.0);

        let e = energies(&[("TotalCPUPower", 5.0)]);
        assert!(validation(&ComponentBreakdown::from_energies(&e)).is_none());
    }
}
