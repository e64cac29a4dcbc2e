use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::record::{Record, RecordError};

pub const DEFAULT_DELIMITER: u8 = b';';

#[derive(Error, Debug)]
pub enum InputError {
    #[error("cannot open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("malformed input near line {line}: {source}")]
    Csv { line: u64, source: csv::Error },
    #[error("line {line}: {source}")]
    Row { line: u64, source: RecordError },
}

fn create_csv_builder(delimiter: u8) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    // short rows are reported per field by Record::parse
    builder.delimiter(delimiter).has_headers(true).flexible(true);
    builder
}

/// Reads every data row; the header line is skipped without being checked.
/// The first bad row fails the whole read.
pub fn read_from<R: Read>(rdr: R, delimiter: u8) -> Result<Vec<Record>, InputError> {
    let mut reader = create_csv_builder(delimiter).from_reader(rdr);
    let mut records = vec![];
    let mut row = csv::StringRecord::new();
    loop {
        let more = reader.read_record(&mut row).map_err(|source| InputError::Csv {
            line: source.position().map_or(0, |p| p.line()),
            source,
        })?;
        if !more {
            break;
        }
        let line = row.position().map_or(0, |p| p.line());
        if row.len() == 1 && row[0].trim().is_empty() {
            continue;
        }
        records.push(Record::parse(&row).map_err(|source| InputError::Row { line, source })?);
    }
    Ok(records)
}

pub fn read_records(path: &Path, delimiter: u8) -> Result<Vec<Record>, InputError> {
    let file = File::open(path).map_err(|source| InputError::Open { path: path.to_path_buf(), source })?;
    read_from(io::BufReader::new(file), delimiter)
}
