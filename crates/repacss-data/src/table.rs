// ── Energy-window tables ──
//
// Analyst-maintained CSVs listing `Start time` / `End time` windows (and
// optionally a `Rank`). Every column is carried through untouched; filling
// appends one `<Metric> (kWh)` column.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use repacss_core::{Column, ResultSet};
use tracing::debug;

use crate::error::{Error, Result};
use crate::result_set::cell;

pub const START_COLUMN: &str = "Start time";
pub const END_COLUMN: &str = "End time";
pub const RANK_COLUMN: &str = "Rank";

/// Header of the filled energy column for `metric`.
pub fn energy_column(metric: &str) -> String {
    format!("{metric} (kWh)")
}

/// `<dir>/<stem>_filled.csv` next to `input`.
pub fn filled_path(input: &Path) -> PathBuf {
    sibling(input, "filled")
}

/// `<dir>/<stem>_raw_data.csv` next to `input`.
pub fn raw_data_path(input: &Path) -> PathBuf {
    sibling(input, "raw_data")
}

fn sibling(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "table".into(), |s| s.to_string_lossy());
    input.with_file_name(format!("{stem}_{suffix}.csv"))
}

// ── Table ────────────────────────────────────────────────────────────

/// One window as written in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRow<'a> {
    pub index: usize,
    pub rank: Option<&'a str>,
    pub start: &'a str,
    pub end: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    start: usize,
    end: usize,
    rank: Option<usize>,
}

impl WindowTable {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Self::read(file, path)
    }

    /// Parse a table; `origin` names the source in errors.
    pub fn read<R: Read>(reader: R, origin: &Path) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = csv.headers()?.iter().map(str::to_owned).collect();

        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let missing = |name: &str| Error::MissingColumn {
            path: origin.to_path_buf(),
            column: name.to_owned(),
        };
        let start = find(START_COLUMN).ok_or_else(|| missing(START_COLUMN))?;
        let end = find(END_COLUMN).ok_or_else(|| missing(END_COLUMN))?;
        let rank = find(RANK_COLUMN);

        let mut rows = Vec::new();
        for record in csv.records() {
            let mut row: Vec<String> = record?.iter().map(str::to_owned).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        debug!(rows = rows.len(), path = %origin.display(), "loaded window table");
        Ok(Self {
            headers,
            rows,
            start,
            end,
            rank,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = WindowRow<'_>> {
        self.rows.iter().enumerate().map(|(index, row)| WindowRow {
            index,
            rank: self.rank.map(|i| row[i].trim()),
            start: row[self.start].trim(),
            end: row[self.end].trim(),
        })
    }

    /// Write `values` into `column`, appending it if absent. A `None`
    /// leaves the cell as it was, which is empty in a new column.
    pub fn fill(&mut self, column: &str, values: &[Option<f64>]) {
        let col = if let Some(col) = self.headers.iter().position(|h| h == column) {
            col
        } else {
            self.headers.push(column.to_owned());
            for row in &mut self.rows {
                row.push(String::new());
            }
            self.headers.len() - 1
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            if let Some(kwh) = value {
                row[col] = kwh.to_string();
            }
        }
    }

    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.headers)?;
        for row in &self.rows {
            csv.write_record(row)?;
        }
        csv.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        self.write(file)
    }
}

// ── Raw-data companion ───────────────────────────────────────────────

/// The samples that fed one filled row.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChunk {
    pub rank: String,
    pub query_start: String,
    pub query_end: String,
    pub set: ResultSet,
}

/// `Rank, Query_Start_Time, Query_End_Time` then every raw column seen
/// across the chunks. Empty chunks contribute nothing.
pub fn write_raw_data<W: Write>(writer: W, chunks: &[RawChunk]) -> Result<()> {
    let columns: BTreeSet<Column> = chunks
        .iter()
        .flat_map(|c| c.set.columns().iter().copied())
        .collect();

    let mut csv = csv::Writer::from_writer(writer);
    let mut header = vec!["Rank", "Query_Start_Time", "Query_End_Time"];
    header.extend(columns.iter().map(AsRef::<str>::as_ref));
    csv.write_record(&header)?;

    for chunk in chunks {
        for row in chunk.set.rows() {
            let mut record = vec![
                chunk.rank.clone(),
                chunk.query_start.clone(),
                chunk.query_end.clone(),
            ];
            record.extend(columns.iter().map(|c| cell(row, *c)));
            csv.write_record(&record)?;
        }
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn save_raw_data(path: &Path, chunks: &[RawChunk]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    write_raw_data(file, chunks)
}
