pub mod engine;
pub mod export;
pub mod header;
pub mod mapped;
pub mod partition;
pub mod reader;
pub mod tally;

pub use engine::{compute_for_header, compute_histogram, EngineOptions, HistogramRun, WorkerReport};
pub use export::{export_csv, export_json, print_summary, write_csv};
pub use header::{parse_header, read_header, PgmHeader};
pub use mapped::count_mapped;
pub use partition::{partition, Span};
pub use reader::{read_and_tally, SpanTally, WorkerOutcome, DEFAULT_CHUNK_SIZE};
pub use tally::{GlobalHistogram, Histogram, LocalTally};
pub use pgm_histo_common::{HistoError, IoPolicy, Result};
