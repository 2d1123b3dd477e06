//! Output module: run reporting and exports
//!
//! - `summary`: run summaries and archive statistics on stdout
//! - `dead_letter`: timestamped files of unrecoverable references
//! - `graph_export`: relationship graph as JSON

mod dead_letter;
mod graph_export;
mod summary;

pub use dead_letter::write_dead_letter_file;
pub use graph_export::export_graph;
pub use summary::{load_statistics, print_run_summary, print_statistics, IngestStatistics};
