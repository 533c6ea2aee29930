// repacss-data: Data access collaborator for the energy core.
//
// Query results arrive as CSV exports. This crate turns them into core
// `ResultSet`s and handles the energy-window tables analysts fill in.

pub mod dumps;
pub mod error;
pub mod result_set;
pub mod table;

pub use dumps::{MetricDump, discover_metric_dumps};
pub use error::{Error, Result};
pub use result_set::{STDIN_PATH, load_result_set, read_result_set};
pub use table::{
    RawChunk, WindowRow, WindowTable, energy_column, filled_path, raw_data_path, save_raw_data,
    write_raw_data,
};
