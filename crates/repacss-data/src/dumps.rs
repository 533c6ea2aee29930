// ── Metric dump directories ──

use std::path::{Path, PathBuf};

use repacss_core::ResultSet;

use crate::error::{Error, Result};
use crate::result_set::load_result_set;

/// One `<MetricId>.csv` file in a dump directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDump {
    pub metric: String,
    pub path: PathBuf,
}

impl MetricDump {
    pub fn load(&self) -> Result<ResultSet> {
        load_result_set(&self.path)
    }
}

/// Every `*.csv` in `dir`, sorted by metric id.
pub fn discover_metric_dumps(dir: &Path) -> Result<Vec<MetricDump>> {
    if !dir.is_dir() {
        return Err(Error::NotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut dumps = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv || !path.is_file() {
            continue;
        }
        let Some(metric) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        dumps.push(MetricDump { metric, path });
    }
    dumps.sort_by(|a, b| a.metric.cmp(&b.metric));
    Ok(dumps)
}
