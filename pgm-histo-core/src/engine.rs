use crate::header::PgmHeader;
use crate::partition::{partition, Span};
use crate::reader::{read_and_tally, WorkerOutcome, DEFAULT_CHUNK_SIZE};
use crate::tally::{GlobalHistogram, Histogram};
use pgm_histo_common::{EngineConfig, HistoError, IoPolicy, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub workers: usize,
    pub chunk_size: usize,
    pub policy: IoPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            policy: IoPolicy::Lenient,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &EngineConfig, workers: usize) -> Self {
        Self {
            workers,
            chunk_size: config.chunk_size,
            policy: config.io_policy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReport {
    pub index: usize,
    pub span: Span,
    pub bytes_read: u64,
    pub outcome: WorkerOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramRun {
    pub histogram: Histogram,
    pub reports: Vec<WorkerReport>,
}

impl HistogramRun {
    /// True when every worker consumed its whole span.
    pub fn is_complete(&self) -> bool {
        self.reports.iter().all(|r| r.outcome.is_complete())
    }

    pub fn bytes_read(&self) -> u64 {
        self.reports.iter().map(|r| r.bytes_read).sum()
    }

    pub fn bytes_expected(&self) -> u64 {
        self.reports.iter().map(|r| r.span.length).sum()
    }

    pub fn incomplete_workers(&self) -> impl Iterator<Item = &WorkerReport> {
        self.reports.iter().filter(|r| !r.outcome.is_complete())
    }
}

struct WorkerOutput {
    report: WorkerReport,
    error: Option<std::io::Error>,
}

pub fn compute_for_header(
    path: &Path,
    header: &PgmHeader,
    options: &EngineOptions,
) -> Result<HistogramRun> {
    compute_histogram(
        path,
        header.pixel_bytes(),
        header.maxval,
        header.data_offset,
        options,
    )
}

/// Count byte values in `[header_size, header_size + total_bytes)` of `path`
/// using one thread per span.
///
/// Each worker reads its span through its own file handle into a private
/// tally and then merges it into the shared histogram under a lock. The
/// result is returned only after every worker has joined. Under
/// [`IoPolicy::Lenient`] worker I/O failures are logged and the affected
/// spans undercount; under [`IoPolicy::Strict`] the first failing worker (in
/// span order) fails the job.
pub fn compute_histogram(
    path: &Path,
    total_bytes: u64,
    maxval: u32,
    header_size: u64,
    options: &EngineOptions,
) -> Result<HistogramRun> {
    let maxval = u8::try_from(maxval).map_err(|_| HistoError::UnsupportedDepth(maxval))?;
    if options.chunk_size == 0 {
        return Err(HistoError::InvalidArgument(
            "chunk size must be at least 1".into(),
        ));
    }
    if header_size.checked_add(total_bytes).is_none() {
        return Err(HistoError::InvalidArgument(format!(
            "pixel data of {total_bytes} bytes at offset {header_size} overflows"
        )));
    }
    let workers = options.workers.max(1);
    let spans = partition(header_size, total_bytes, workers);
    log::debug!(
        "counting {total_bytes} bytes of {} from offset {header_size} with {workers} workers",
        path.display()
    );

    let global = GlobalHistogram::new(maxval);
    let chunk_size = options.chunk_size;
    let outputs = thread::scope(|s| -> Result<Vec<WorkerOutput>> {
        let global = &global;
        let mut handles = Vec::with_capacity(spans.len());
        let mut spawn_error = None;
        for (index, &span) in spans.iter().enumerate() {
            let spawned = thread::Builder::new()
                .name(format!("histo-worker-{index}"))
                .spawn_scoped(s, move || {
                    let read = read_and_tally(path, span, maxval, chunk_size);
                    if let Some(tally) = &read.tally {
                        global.merge(tally);
                    }
                    log::debug!(
                        "worker {index} span {}..{} read {} bytes ({:?})",
                        span.offset,
                        span.end(),
                        read.bytes_read,
                        read.outcome
                    );
                    WorkerOutput {
                        report: WorkerReport {
                            index,
                            span,
                            bytes_read: read.bytes_read,
                            outcome: read.outcome,
                            error: read.error.as_ref().map(|e| e.to_string()),
                        },
                        error: read.error,
                    }
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    spawn_error = Some(HistoError::Spawn(format!("worker {index}: {e}")));
                    break;
                }
            }
        }

        // join everything that did start before reporting a spawn failure
        let outputs = join_all(handles)?;
        match spawn_error {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    })?;

    let mut reports = Vec::with_capacity(outputs.len());
    for WorkerOutput { report, error } in outputs {
        if !report.outcome.is_complete() {
            match options.policy {
                IoPolicy::Strict => return Err(strict_error(&report, error, maxval)),
                IoPolicy::Lenient => log::warn!(
                    "worker {} recovered from {:?} after {} of {} bytes{}",
                    report.index,
                    report.outcome,
                    report.bytes_read,
                    report.span.length,
                    report
                        .error
                        .as_deref()
                        .map(|e| format!(": {e}"))
                        .unwrap_or_default()
                ),
            }
        }
        reports.push(report);
    }

    let run = HistogramRun {
        histogram: global.into_histogram(),
        reports,
    };
    log::info!(
        "histogram of {} done: {} of {} bytes counted by {} workers",
        path.display(),
        run.bytes_read(),
        run.bytes_expected(),
        run.reports.len()
    );
    Ok(run)
}

/// Join every handle, then report the first worker (in span order) that panicked.
fn join_all<T>(handles: Vec<thread::ScopedJoinHandle<'_, T>>) -> Result<Vec<T>> {
    let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
    let mut outputs = Vec::with_capacity(joined.len());
    for (index, result) in joined.into_iter().enumerate() {
        match result {
            Ok(output) => outputs.push(output),
            Err(_) => return Err(HistoError::Other(format!("worker {index} panicked"))),
        }
    }
    Ok(outputs)
}

fn strict_error(report: &WorkerReport, error: Option<std::io::Error>, maxval: u8) -> HistoError {
    let worker = report.index;
    match (report.outcome, error) {
        (WorkerOutcome::AllocFailed, _) => HistoError::Allocation {
            worker,
            len: usize::from(maxval) + 1,
        },
        (_, Some(source)) => HistoError::WorkerIo { worker, source },
        (_, None) => HistoError::ShortRead {
            worker,
            expected: report.span.length,
            actual: report.bytes_read,
        },
    }
}
