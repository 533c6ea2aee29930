// ── Component breakdown ──
//
// Rolls per-metric energies up into CPU / MEMORY / GPU / FAN / STORAGE and
// an "Other" residual against SystemOutputPower. Missing categories count
// as zero.

use indexmap::IndexMap;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::catalog::{self, Category, SYSTEM_INPUT_METRIC, SYSTEM_OUTPUT_METRIC};
use crate::energy::{per_device_energy, total_series};
use crate::error::CoreError;
use crate::model::{Column, QueryWindow, ResultSet, Series};
use crate::units::PowerUnit;

/// Energy of one metric on one host, optionally split by FQDD.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEnergy {
    pub metric: String,
    pub category: Category,
    pub energy_kwh: f64,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub devices: IndexMap<String, f64>,
}

impl MetricEnergy {
    pub fn scalar(metric: impl Into<String>, category: Category, energy_kwh: f64) -> Self {
        Self {
            metric: metric.into(),
            category,
            energy_kwh,
            devices: IndexMap::new(),
        }
    }

    /// The metric's energy is the sum of its devices. `aggregate_kwh` (the
    /// summed TOTAL series) stands in only when that sum is zero.
    pub fn per_device(
        metric: impl Into<String>,
        category: Category,
        devices: IndexMap<String, f64>,
        aggregate_kwh: f64,
    ) -> Self {
        let device_sum: f64 = devices.values().sum();
        Self {
            metric: metric.into(),
            category,
            energy_kwh: if device_sum > 0.0 {
                device_sum
            } else {
                aggregate_kwh
            },
            devices,
        }
    }

    pub fn has_devices(&self) -> bool {
        !self.devices.is_empty()
    }
}

/// Integrate one metric's result set for `hostname`.
///
/// CPU and GPU metrics carrying an fqdd column are integrated per device.
/// Everything else is integrated as one series in the set's unit, falling
/// back to the catalog default.
pub fn metric_energy(
    metric: &str,
    category: Category,
    set: &ResultSet,
    hostname: &str,
    window: QueryWindow,
) -> Result<MetricEnergy, CoreError> {
    let default_unit = catalog::default_unit(metric);
    let per_device = category.is_per_device()
        && set.has_column(Column::Fqdd)
        && set.rows().iter().any(|r| r.fqdd.is_some());

    if per_device {
        let devices = per_device_energy(set, &default_unit, hostname, window)?;
        let unit = set.unit().map_or(default_unit, PowerUnit::parse);
        let aggregate = total_series(set, &unit, hostname)?.energy_kwh(window);
        debug!(metric, devices = devices.len(), "per-device metric");
        return Ok(MetricEnergy::per_device(metric, category, devices, aggregate));
    }

    let unit = set.unit().map_or(default_unit, PowerUnit::parse);
    let series = Series::from_result_set(set, &unit, hostname)?;
    Ok(MetricEnergy::scalar(metric, category, series.energy_kwh(window)))
}

// ── Category collection ──────────────────────────────────────────────

/// Metric energies grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CategoryEnergies {
    by_category: IndexMap<Category, Vec<MetricEnergy>>,
}

impl CategoryEnergies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, energy: MetricEnergy) {
        self.by_category
            .entry(energy.category)
            .or_default()
            .push(energy);
    }

    /// Metrics of `category` in the order they were inserted.
    pub fn get(&self, category: Category) -> &[MetricEnergy] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn metric(&self, name: &str) -> Option<&MetricEnergy> {
        self.by_category
            .values()
            .flatten()
            .find(|m| m.metric.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricEnergy> {
        self.by_category.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.values().all(Vec::is_empty)
    }

    /// Metrics of `category` in catalog preference order.
    fn in_catalog_order(&self, category: Category) -> impl Iterator<Item = &MetricEnergy> {
        let present = self.get(category);
        category
            .metrics()
            .iter()
            .filter_map(move |name| present.iter().find(|m| m.metric.eq_ignore_ascii_case(name)))
    }
}

impl FromIterator<MetricEnergy> for CategoryEnergies {
    fn from_iter<I: IntoIterator<Item = MetricEnergy>>(iter: I) -> Self {
        let mut energies = Self::new();
        for energy in iter {
            energies.insert(energy);
        }
        energies
    }
}

// ── Breakdown ────────────────────────────────────────────────────────

/// One labelled line of a breakdown report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentRow {
    pub component: String,
    pub energy_kwh: f64,
}

impl ComponentRow {
    fn new(component: impl Into<String>, energy_kwh: f64) -> Self {
        Self {
            component: component.into(),
            energy_kwh,
        }
    }
}

/// Category totals for one host and window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComponentBreakdown {
    pub cpu: f64,
    pub memory: f64,
    pub gpu: f64,
    pub fan: f64,
    pub storage: f64,
    /// `max(system_output - components, 0)`.
    pub other: f64,
    pub system_output: f64,
    pub system_input: Option<f64>,
    pub cpu_devices: IndexMap<String, f64>,
    pub gpu_devices: IndexMap<String, f64>,
}

impl ComponentBreakdown {
    pub fn from_energies(energies: &CategoryEnergies) -> Self {
        let (cpu, cpu_devices) = preferred_total(energies, Category::Cpu);
        let (memory, _) = preferred_total(energies, Category::Memory);
        let (fan, _) = preferred_total(energies, Category::Fan);
        let (storage, _) = preferred_total(energies, Category::Storage);
        let (gpu, gpu_devices) = device_total(energies, Category::Gpu);

        let system_output = energies
            .metric(SYSTEM_OUTPUT_METRIC)
            .map_or(0.0, |m| m.energy_kwh);
        let system_input = energies.metric(SYSTEM_INPUT_METRIC).map(|m| m.energy_kwh);

        let components = cpu + memory + gpu + fan + storage;
        Self {
            cpu,
            memory,
            gpu,
            fan,
            storage,
            other: (system_output - components).max(0.0),
            system_output,
            system_input,
            cpu_devices,
            gpu_devices,
        }
    }

    /// Sum of the five named categories.
    pub fn components_total(&self) -> f64 {
        self.cpu + self.memory + self.gpu + self.fan + self.storage
    }

    pub fn category(&self, category: Category) -> f64 {
        match category {
            Category::Cpu => self.cpu,
            Category::Memory => self.memory,
            Category::Gpu => self.gpu,
            Category::Fan => self.fan,
            Category::Storage => self.storage,
            Category::System => self.system_output,
        }
    }

    /// Category name to kWh, with `Other` and the system references.
    pub fn to_map(&self) -> IndexMap<String, f64> {
        let mut map: IndexMap<String, f64> = Category::COMPONENTS
            .iter()
            .map(|c| (c.to_string(), self.category(*c)))
            .collect();
        map.insert("Other".into(), self.other);
        map.insert(SYSTEM_OUTPUT_METRIC.into(), self.system_output);
        if let Some(input) = self.system_input {
            map.insert(SYSTEM_INPUT_METRIC.into(), input);
        }
        map
    }

    /// Detailed rows: CPU, MEMORY, each GPU device, GPU Total, FAN, STORAGE,
    /// then the SystemOutputPower reference.
    pub fn detail_rows(&self) -> Vec<ComponentRow> {
        let mut rows = vec![
            ComponentRow::new("CPU", self.cpu),
            ComponentRow::new("MEMORY", self.memory),
        ];
        rows.extend(
            self.gpu_devices
                .iter()
                .map(|(fqdd, kwh)| ComponentRow::new(format!("GPU (fqdd={fqdd})"), *kwh)),
        );
        rows.push(ComponentRow::new("GPU Total", self.gpu));
        rows.push(ComponentRow::new("FAN", self.fan));
        rows.push(ComponentRow::new("STORAGE", self.storage));
        rows.push(ComponentRow::new(SYSTEM_OUTPUT_METRIC, self.system_output));
        rows
    }

    /// Top-level shares: GPU Total, CPU, MEMORY, FAN, STORAGE, Other.
    pub fn top_level_rows(&self) -> Vec<ComponentRow> {
        vec![
            ComponentRow::new("GPU Total", self.gpu),
            ComponentRow::new("CPU", self.cpu),
            ComponentRow::new("MEMORY", self.memory),
            ComponentRow::new("FAN", self.fan),
            ComponentRow::new("STORAGE", self.storage),
            ComponentRow::new("Other", self.other),
        ]
    }

    pub fn cpu_device_rows(&self) -> Vec<ComponentRow> {
        self.cpu_devices
            .iter()
            .map(|(fqdd, kwh)| ComponentRow::new(format!("CPU (fqdd={fqdd})"), *kwh))
            .collect()
    }
}

/// The canonical Total* metric if present; otherwise the first per-device
/// metric's device sum; otherwise the sum of whatever metrics exist.
fn preferred_total(energies: &CategoryEnergies, category: Category) -> (f64, IndexMap<String, f64>) {
    let devices = energies
        .in_catalog_order(category)
        .find(|m| m.has_devices())
        .map(|m| m.devices.clone())
        .unwrap_or_default();

    if let Some(total) = category
        .total_metric()
        .and_then(|name| energies.get(category).iter().find(|m| m.metric.eq_ignore_ascii_case(name)))
    {
        return (total.energy_kwh, devices);
    }
    if let Some(metric) = energies.in_catalog_order(category).find(|m| m.has_devices()) {
        return (metric.energy_kwh, devices);
    }
    (energies.get(category).iter().map(|m| m.energy_kwh).sum(), devices)
}

/// Sum of per-device energies across the category's metrics.
fn device_total(energies: &CategoryEnergies, category: Category) -> (f64, IndexMap<String, f64>) {
    let mut devices: IndexMap<String, f64> = IndexMap::new();
    for metric in energies.get(category) {
        for (fqdd, kwh) in &metric.devices {
            *devices.entry(fqdd.clone()).or_default() += kwh;
        }
    }
    let device_sum: f64 = devices.values().sum();
    if device_sum > 0.0 {
        (device_sum, devices)
    } else {
        (energies.get(category).iter().map(|m| m.energy_kwh).sum(), devices)
    }
}

/// Categories present in `energies`, in catalog order.
pub fn present_categories(energies: &CategoryEnergies) -> Vec<Category> {
    Category::iter()
        .filter(|c| !energies.get(*c).is_empty())
        .collect()
}
