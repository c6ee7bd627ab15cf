use pgm_histo_common::{HistoError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Bytes, Read};
use std::path::Path;

/// Binary PGM header fields plus the byte offset where pixel data starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgmHeader {
    pub data_offset: u64,
    pub width: u32,
    pub height: u32,
    pub maxval: u32,
}

impl PgmHeader {
    /// Size of the pixel-data region for one-byte samples.
    pub fn pixel_bytes(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn ensure_8bit(&self) -> Result<()> {
        if self.maxval > u32::from(u8::MAX) {
            return Err(HistoError::UnsupportedDepth(self.maxval));
        }
        Ok(())
    }
}

pub fn parse_header(path: &Path) -> Result<PgmHeader> {
    let file = File::open(path)
        .map_err(|e| HistoError::InvalidHeader(format!("{}: {e}", path.display())))?;
    read_header(BufReader::new(file))
}

/// Parse a `P5` header from the start of `reader`.
///
/// Comments (`#` to end of line) are accepted wherever whitespace is. Exactly
/// one whitespace byte separates maxval from the first sample.
pub fn read_header<R: Read>(reader: R) -> Result<PgmHeader> {
    let mut cur = HeaderCursor {
        bytes: reader.bytes(),
        offset: 0,
    };

    let magic = [cur.next()?, cur.next()?];
    if magic != [Some(b'P'), Some(b'5')] {
        return Err(HistoError::InvalidHeader("missing P5 magic number".into()));
    }
    let after_magic = cur.next()?;
    cur.expect_separator(after_magic, "magic number")?;

    let (width, term) = cur.read_field("width")?;
    cur.expect_separator(term, "width")?;
    let (height, term) = cur.read_field("height")?;
    cur.expect_separator(term, "height")?;
    let (maxval, term) = cur.read_field("maxval")?;
    match term {
        Some(b) if is_pgm_space(b) => {}
        Some(b) => {
            return Err(HistoError::InvalidHeader(format!(
                "unexpected byte 0x{b:02x} after maxval"
            )))
        }
        None => return Err(truncated("maxval")),
    }
    if maxval == 0 || maxval > u32::from(u16::MAX) {
        return Err(HistoError::InvalidHeader(format!(
            "maxval {maxval} out of range 1..=65535"
        )));
    }

    Ok(PgmHeader {
        data_offset: cur.offset,
        width,
        height,
        maxval,
    })
}

struct HeaderCursor<R> {
    bytes: Bytes<R>,
    offset: u64,
}

impl<R: Read> HeaderCursor<R> {
    fn next(&mut self) -> Result<Option<u8>> {
        let b = self.bytes.next().transpose()?;
        if b.is_some() {
            self.offset += 1;
        }
        Ok(b)
    }

    fn skip_comment(&mut self) -> Result<()> {
        while let Some(b) = self.next()? {
            if b == b'\n' || b == b'\r' {
                break;
            }
        }
        Ok(())
    }

    /// The byte that ended the previous token must be whitespace or open a comment.
    fn expect_separator(&mut self, term: Option<u8>, after: &str) -> Result<()> {
        match term {
            Some(b'#') => self.skip_comment(),
            Some(b) if is_pgm_space(b) => Ok(()),
            Some(b) => Err(HistoError::InvalidHeader(format!(
                "unexpected byte 0x{b:02x} after {after}"
            ))),
            None => Err(truncated(after)),
        }
    }

    fn skip_separators(&mut self) -> Result<Option<u8>> {
        loop {
            match self.next()? {
                Some(b'#') => self.skip_comment()?,
                Some(b) if is_pgm_space(b) => {}
                other => return Ok(other),
            }
        }
    }

    /// Returns the decimal value and the byte that terminated it.
    fn read_field(&mut self, name: &str) -> Result<(u32, Option<u8>)> {
        let first = self.skip_separators()?.ok_or_else(|| truncated(name))?;
        if !first.is_ascii_digit() {
            return Err(HistoError::InvalidHeader(format!(
                "expected {name}, found byte 0x{first:02x}"
            )));
        }
        let mut value = u32::from(first - b'0');
        loop {
            match self.next()? {
                Some(b) if b.is_ascii_digit() => {
                    value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(u32::from(b - b'0')))
                        .ok_or_else(|| HistoError::InvalidHeader(format!("{name} is too large")))?;
                }
                other => return Ok((value, other)),
            }
        }
    }
}

fn is_pgm_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn truncated(field: &str) -> HistoError {
    HistoError::InvalidHeader(format!("header truncated at {field}"))
}
