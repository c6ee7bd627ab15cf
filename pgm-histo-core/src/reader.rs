use crate::partition::Span;
use crate::tally::LocalTally;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

pub const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerOutcome {
    Complete,
    /// The source ended before the span did.
    ShortRead,
    OpenFailed,
    SeekFailed,
    ReadFailed,
    AllocFailed,
}

impl WorkerOutcome {
    pub fn is_complete(self) -> bool {
        self == WorkerOutcome::Complete
    }
}

/// What one worker got out of its span.
#[derive(Debug)]
pub struct SpanTally {
    /// `None` only when the tally itself could not be allocated.
    pub tally: Option<LocalTally>,
    pub bytes_read: u64,
    pub outcome: WorkerOutcome,
    pub error: Option<std::io::Error>,
}

impl SpanTally {
    fn stopped(
        tally: Option<LocalTally>,
        bytes_read: u64,
        outcome: WorkerOutcome,
        error: Option<std::io::Error>,
    ) -> Self {
        Self {
            tally,
            bytes_read,
            outcome,
            error,
        }
    }
}

/// Open `path` independently, seek to `span.offset` and tally up to
/// `span.length` bytes, reading at most `chunk_size` bytes at a time.
///
/// Failures never escape: an open or seek failure yields an empty tally, a
/// read failure or early end of file yields whatever was counted so far. The
/// outcome and the underlying error are returned alongside so the caller can
/// decide whether to accept a short span.
pub fn read_and_tally(path: &Path, span: Span, maxval: u8, chunk_size: usize) -> SpanTally {
    let Some(mut tally) = LocalTally::try_new(maxval) else {
        return SpanTally::stopped(None, 0, WorkerOutcome::AllocFailed, None);
    };
    if span.is_empty() {
        return SpanTally::stopped(Some(tally), 0, WorkerOutcome::Complete, None);
    }

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) => return SpanTally::stopped(Some(tally), 0, WorkerOutcome::OpenFailed, Some(e)),
    };
    if let Err(e) = file.seek(SeekFrom::Start(span.offset)) {
        return SpanTally::stopped(Some(tally), 0, WorkerOutcome::SeekFailed, Some(e));
    }

    let buf_len = usize::try_from(span.length)
        .unwrap_or(usize::MAX)
        .min(chunk_size.max(1));
    let mut buf = vec![0u8; buf_len];
    let mut remaining = span.length;
    let mut bytes_read = 0u64;
    while remaining > 0 {
        let want = usize::try_from(remaining).unwrap_or(usize::MAX).min(buf.len());
        match file.read(&mut buf[..want]) {
            Ok(0) => {
                return SpanTally::stopped(Some(tally), bytes_read, WorkerOutcome::ShortRead, None);
            }
            Ok(n) => {
                tally.record(&buf[..n]);
                bytes_read += n as u64;
                remaining -= n as u64;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return SpanTally::stopped(
                    Some(tally),
                    bytes_read,
                    WorkerOutcome::ReadFailed,
                    Some(e),
                );
            }
        }
    }
    SpanTally::stopped(Some(tally), bytes_read, WorkerOutcome::Complete, None)
}
