// ── Metric catalog ──
//
// Which iDRAC / infrastructure metrics carry power, and how they group
// into component categories.

use serde::{Deserialize, Serialize};

use crate::units::PowerUnit;

/// Component category of a compute-node power metric.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Category {
    Cpu,
    Memory,
    Gpu,
    Fan,
    Storage,
    System,
}

impl Category {
    /// Categories that add up to the component total.
    pub const COMPONENTS: [Self; 5] = [Self::Cpu, Self::Memory, Self::Gpu, Self::Fan, Self::Storage];

    /// Metrics in this category, in preference order.
    pub fn metrics(self) -> &'static [&'static str] {
        match self {
            Self::Cpu => &["CPUPower", "PkgPwr", "TotalCPUPower"],
            Self::Memory => &["DRAMPwr", "TotalMemoryPower"],
            Self::Gpu => &["PowerConsumption"],
            Self::Fan => &["TotalFanPower"],
            Self::Storage => &["TotalStoragePower"],
            Self::System => &[
                "SystemInputPower",
                "SystemOutputPower",
                "SystemPowerConsumption",
                "WattsReading",
            ],
        }
    }

    /// The canonical aggregate metric, when the category has one.
    pub fn total_metric(self) -> Option<&'static str> {
        match self {
            Self::Cpu => Some("TotalCPUPower"),
            Self::Memory => Some("TotalMemoryPower"),
            Self::Fan => Some("TotalFanPower"),
            Self::Storage => Some("TotalStoragePower"),
            Self::Gpu | Self::System => None,
        }
    }

    /// Metrics in these categories are reported per FQDD.
    pub fn is_per_device(self) -> bool {
        matches!(self, Self::Cpu | Self::Gpu)
    }
}

pub const SYSTEM_OUTPUT_METRIC: &str = "SystemOutputPower";
pub const SYSTEM_INPUT_METRIC: &str = "SystemInputPower";

/// Cooling-infrastructure power metrics.
pub const IRC_METRICS: &[&str] = &[
    "CompressorPower",
    "CondenserFanPower",
    "CoolDemand",
    "CoolOutput",
    "TotalAirSideCoolingDemand",
    "TotalSensibleCoolingPower",
];

pub const PDU_METRICS: &[&str] = &["pdu"];

/// Remaining wattage, not consumption.
pub const EXCLUDED_METRICS: &[&str] = &["systemheadroominstantaneous"];

/// Computed from other metrics rather than measured.
pub const DERIVED_METRICS: &[&str] = &["computepower", "systemheadroominstantaneous"];

/// The category a metric belongs to, matched case-insensitively.
pub fn category_of(metric: &str) -> Option<Category> {
    use strum::IntoEnumIterator;

    Category::iter().find(|c| c.metrics().iter().any(|m| m.eq_ignore_ascii_case(metric)))
}

pub fn is_excluded(metric: &str) -> bool {
    EXCLUDED_METRICS.iter().any(|m| m.eq_ignore_ascii_case(metric))
}

pub fn is_derived(metric: &str) -> bool {
    DERIVED_METRICS.iter().any(|m| m.eq_ignore_ascii_case(metric))
}

/// Unit assumed when a series carries no unit tag. GPU power is reported
/// in milliwatts.
pub fn default_unit(metric: &str) -> PowerUnit {
    if metric.eq_ignore_ascii_case("PowerConsumption") {
        PowerUnit::MilliWatt
    } else {
        PowerUnit::Watt
    }
}

/// Every compute-node power metric, in category order.
pub fn compute_metrics() -> Vec<&'static str> {
    use strum::IntoEnumIterator;

    Category::iter().flat_map(|c| c.metrics().iter().copied()).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn categories_resolve_case_insensitively() {
        assert_eq!(category_of("TotalCPUPower"), Some(Category::Cpu));
        assert_eq!(category_of("totalcpupower"), Some(Category::Cpu));
        assert_eq!(category_of("DRAMPwr"), Some(Category::Memory));
        assert_eq!(category_of("PowerConsumption"), Some(Category::Gpu));
        assert_eq!(category_of("WattsReading"), Some(Category::System));
        assert_eq!(category_of("CompressorPower"), None);
    }

    #[test]
    fn category_names_are_uppercase() {
        assert_eq!(Category::Memory.to_string(), "MEMORY");
        assert_eq!("gpu".parse::<Category>().unwrap(), Category::Gpu);
    }

    #[test]
    fn gpu_defaults_to_milliwatts() {
        assert_eq!(default_unit("PowerConsumption"), PowerUnit::MilliWatt);
        assert_eq!(default_unit("TotalFanPower"), PowerUnit::Watt);
    }

    #[test]
    fn headroom_is_excluded_and_derived() {
        assert!(is_excluded("SystemHeadroomInstantaneous"));
        assert!(is_derived("computepower"));
        assert!(!is_excluded("SystemOutputPower"));
    }

    #[test]
    fn compute_metrics_cover_every_category() {
        let all = compute_metrics();
        assert_eq!(all.len(), 12);
        assert_eq!(all.first(), Some(&"CPUPower"));
        assert_eq!(all.last(), Some(&"WattsReading"));
    }

    #[test]
    fn only_cpu_and_gpu_are_per_device() {
        assert!(Category::Cpu.is_per_device());
        assert!(Category::Gpu.is_per_device());
        assert!(!Category::Fan.is_per_device());
        assert_eq!(Category::Gpu.total_metric(), None);
    }
}
