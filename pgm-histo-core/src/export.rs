use crate::engine::HistogramRun;
use crate::header::PgmHeader;
use crate::tally::Histogram;
use pgm_histo_common::{HistoError, Result};
use std::io::{BufWriter, Write};
use std::path::Path;

// --- headless summary output ---

pub fn print_summary(image: &Path, header: &PgmHeader, run: &HistogramRun) {
    let h = &run.histogram;
    println!("{:<16} {}", "Image:", image.display());
    println!("{:<16} {}x{}", "Size:", header.width, header.height);
    println!("{:<16} {}", "Maxval:", header.maxval);
    println!("{:<16} {}", "Workers:", run.reports.len());
    println!("{:<16} {} of {} bytes", "Counted:", run.bytes_read(), run.bytes_expected());
    if h.out_of_range() > 0 {
        println!("{:<16} {}", "Above maxval:", h.out_of_range());
    }
    let busiest = h.entries().max_by_key(|&(v, c)| (c, std::cmp::Reverse(v)));
    if let Some((value, count)) = busiest.filter(|&(_, c)| c > 0) {
        println!("{:<16} {value} ({count} samples)", "Mode:");
    }
    let incomplete: Vec<String> = run.incomplete_workers().map(|r| r.index.to_string()).collect();
    if !incomplete.is_empty() {
        println!("{:<16} {}", "Short workers:", incomplete.join(", "));
    }
}

// --- CSV export ---

/// One `value,count` line per value in `0..=maxval`, ascending.
pub fn write_csv<W: Write>(out: &mut W, histogram: &Histogram) -> Result<()> {
    for (value, count) in histogram.entries() {
        writeln!(out, "{value},{count}")?;
    }
    Ok(())
}

pub fn export_csv(output_path: &Path, histogram: &Histogram) -> Result<()> {
    let file = std::fs::File::create(output_path)?;
    let mut out = BufWriter::new(file);
    write_csv(&mut out, histogram)?;
    out.flush()?;
    Ok(())
}

// --- JSON export ---

pub fn export_json(output_path: &Path, header: &PgmHeader, run: &HistogramRun) -> Result<()> {
    let doc = serde_json::json!({
        "image": header,
        "total": run.histogram.total(),
        "out_of_range": run.histogram.out_of_range(),
        "complete": run.is_complete(),
        "counts": run.histogram.counts(),
        "workers": run.reports,
    });
    let file = std::fs::File::create(output_path)?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, &doc).map_err(|e| HistoError::Other(e.to_string()))?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
