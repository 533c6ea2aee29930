// ── Result-set CSV loading ──
//
// Headers are matched case-insensitively; unknown columns are ignored.
// Empty cells are null, as is any value that is not a finite float. Timestamps
// stay as text so the core decides which ones parse.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use repacss_core::{Column, RawSample, RawTimestamp, ResultSet};
use tracing::debug;

use crate::error::{Error, Result};

/// Path argument meaning standard input.
pub const STDIN_PATH: &str = "-";

/// Read a result set from any CSV source with a header row.
pub fn read_result_set<R: Read>(reader: R) -> Result<ResultSet> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let layout: Vec<Option<Column>> = csv.headers()?.iter().map(Column::from_header).collect();
    let columns: BTreeSet<Column> = layout.iter().flatten().copied().collect();

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        let mut row = RawSample::default();
        for (cell, column) in record.iter().zip(&layout) {
            let Some(column) = column else { continue };
            if cell.is_empty() {
                continue;
            }
            match column {
                Column::Timestamp => row.timestamp = Some(RawTimestamp::Text(cell.to_owned())),
                Column::Hostname => row.hostname = Some(cell.to_owned()),
                Column::Value => row.value = cell.parse::<f64>().ok().filter(|v| v.is_finite()),
                Column::Units => row.units = Some(cell.to_owned()),
                Column::Fqdd => row.fqdd = Some(cell.to_owned()),
                Column::Source => row.source = Some(cell.to_owned()),
            }
        }
        rows.push(row);
    }

    debug!(rows = rows.len(), columns = columns.len(), "loaded result set");
    Ok(ResultSet::new(columns, rows))
}

/// Load a result set from `path`, or standard input for `-`.
pub fn load_result_set(path: &Path) -> Result<ResultSet> {
    if path.as_os_str() == STDIN_PATH {
        return read_result_set(io::stdin().lock());
    }
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    read_result_set(file)
}

/// Text of one cell; null is empty.
pub(crate) fn cell(row: &RawSample, column: Column) -> String {
    match column {
        Column::Timestamp => row
            .timestamp
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        Column::Hostname => row.hostname.clone().unwrap_or_default(),
        Column::Value => row.value.map(|v| v.to_string()).unwrap_or_default(),
        Column::Units => row.units.clone().unwrap_or_default(),
        Column::Fqdd => row.fqdd.clone().unwrap_or_default(),
        Column::Source => row.source.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use repacss_core::{PowerUnit, QueryWindow, Series};

    const EXPORT: &str = "\
Timestamp,Hostname,Value,Units,FQDD,metric
2025-05-01 10:00:00+00,rpg-93-1,100000,mW,GPU.1,PowerConsumption
2025-05-01 10:02:00+00,rpg-93-1,200000,,GPU.1,PowerConsumption
2025-05-01 10:04:00+00,rpg-93-1,n/a,,GPU.1,PowerConsumption
,rpg-93-1,5,,GPU.1,PowerConsumption
";

    #[test]
    fn headers_map_case_insensitively() {
        let set = read_result_set(EXPORT.as_bytes()).unwrap();
        assert_eq!(
            set.columns().iter().copied().collect::<Vec<_>>(),
            vec![
                Column::Timestamp,
                Column::Hostname,
                Column::Value,
                Column::Units,
                Column::Fqdd
            ]
        );
        assert_eq!(set.len(), 4);
        assert_eq!(set.unit(), Some("mW"));
    }

    #[test]
    fn empty_and_non_numeric_cells_are_null() {
        let set = read_result_set(EXPORT.as_bytes()).unwrap();
        assert_eq!(set.rows()[1].units, None);
        assert_eq!(set.rows()[2].value, None);
        assert_eq!(set.rows()[3].timestamp, None);
    }

    #[test]
    fn loaded_set_integrates() {
        let set = read_result_set(EXPORT.as_bytes()).unwrap();
        let series = Series::from_result_set(&set, &PowerUnit::MilliWatt, "rpg-93-1").unwrap();
        assert_eq!(series.len(), 2);
        let kwh = series.energy_kwh(QueryWindow::unbounded());
        assert!((kwh - 0.005).abs() < 1e-12);
    }

    #[test]
    fn missing_required_column_survives_loading() {
        let set = read_result_set("timestamp,value\n2025-05-01 10:00:00,1\n".as_bytes()).unwrap();
        assert_eq!(set.missing_required(), vec![Column::Hostname]);
    }

    #[test]
    fn non_finite_values_are_null() {
        let text = "timestamp,hostname,value\n\
            2025-05-01 10:00:00,h,100\n\
            2025-05-01 10:01:00,h,NaN\n\
            2025-05-01 10:02:00,h,inf\n\
            2025-05-01 10:03:00,h,100\n";
        let set = read_result_set(text.as_bytes()).unwrap();
        assert_eq!(set.rows()[1].value, None);
        assert_eq!(set.rows()[2].value, None);

        let series = Series::from_result_set(&set, &PowerUnit::Watt, "h").unwrap();
        assert_eq!(series.len(), 2);
        let kwh = series.energy_kwh(QueryWindow::unbounded());
        assert!((kwh - 0.005).abs() < 1e-12);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_result_set(Path::new("/nonexistent/repacss/metric.csv")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TotalFanPower.csv");
        std::fs::write(&path, EXPORT).unwrap();
        assert_eq!(load_result_set(&path).unwrap().len(), 4);
    }
}
