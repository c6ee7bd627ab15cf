use crate::header::PgmHeader;
use crate::tally::Histogram;
use memmap2::Mmap;
use pgm_histo_common::{HistoError, Result};
use rayon::prelude::*;
use std::fs::File;
use std::path::Path;

const PAR_CHUNK: usize = 64 * 1024;

/// Independent count of the pixel-data region from a memory map.
///
/// Used to cross-check the span engine. Bytes the header promises but the
/// file does not contain are simply not counted.
pub fn count_mapped(path: &Path, header: &PgmHeader) -> Result<Histogram> {
    header.ensure_8bit()?;
    let maxval = header.maxval as u8;
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let start = header.data_offset.min(file_len);
    let end = start.saturating_add(header.pixel_bytes()).min(file_len);
    if start == end {
        return Ok(Histogram::zeroed(maxval));
    }
    let to_index = |v: u64| {
        usize::try_from(v).map_err(|_| HistoError::Other(format!("offset {v} not addressable")))
    };
    let (start, end) = (to_index(start)?, to_index(end)?);

    // read-only map; the file is not expected to change while we count
    let mmap: Mmap = unsafe { Mmap::map(&file)? };
    let table = byte_table(&mmap[start..end]);
    Ok(Histogram::from_byte_table(&table, maxval))
}

fn byte_table(data: &[u8]) -> [u64; 256] {
    data.par_chunks(PAR_CHUNK)
        .fold(
            || [0u64; 256],
            |mut local, chunk| {
                for &b in chunk {
                    local[usize::from(b)] += 1;
                }
                local
            },
        )
        .reduce(
            || [0u64; 256],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b.iter()) {
                    *x += y;
                }
                a
            },
        )
}
