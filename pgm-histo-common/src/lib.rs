pub mod config;
pub use config::{Config, EngineConfig, IoPolicy, OutputConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid PGM header: {0}")]
    InvalidHeader(String),
    #[error("Only 8-bit images (maxval <= 255) are supported, got maxval {0}")]
    UnsupportedDepth(u32),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to spawn worker: {0}")]
    Spawn(String),
    #[error("Worker {worker} I/O error: {source}")]
    WorkerIo {
        worker: usize,
        source: std::io::Error,
    },
    #[error("Worker {worker} read {actual} of {expected} bytes before end of file")]
    ShortRead {
        worker: usize,
        expected: u64,
        actual: u64,
    },
    #[error("Worker {worker} could not allocate a tally of {len} counters")]
    Allocation { worker: usize, len: usize },
    #[error("Config error: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HistoError>;
