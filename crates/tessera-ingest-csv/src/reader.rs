//! Streaming row parser.
//!
//! Tokenizes a delimited byte source into rows of string cells and hands
//! each row to the caller before reading further input. The reader is
//! incremental: memory is bounded by one record, not the file. Rows with a
//! cell count different from their neighbours are fine (`flexible`); what
//! is not fine is input the tokenizer cannot decode, which fails the whole
//! run.
//!
//! A parser consumes its source. To re-read, open a new one.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::IngestError;

/// Parse `source` with the given one-byte delimiter, invoking `handler`
/// once per row.
///
/// The first row is handed over like any other; header skipping belongs to
/// the pipeline, which knows whether the mapper declares one.
pub fn parse_rows<R, F>(source: R, delimiter: u8, mut handler: F) -> Result<(), IngestError>
where
    R: Read,
    F: FnMut(&[String]),
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(source);

    let mut record = csv::StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {
                let cells: Vec<String> = record.iter().map(str::to_string).collect();
                handler(&cells);
            }
            Ok(false) => return Ok(()),
            Err(err) => return Err(IngestError::MalformedInput(err)),
        }
    }
}

/// File-backed variant of [`parse_rows`].
pub fn parse_rows_from_path<P, F>(path: P, delimiter: u8, handler: F) -> Result<(), IngestError>
where
    P: AsRef<Path>,
    F: FnMut(&[String]),
{
    let file = File::open(path)?;
    parse_rows(BufReader::new(file), delimiter, handler)
}
