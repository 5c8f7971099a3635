//! CSV input loading, output initialisation, resume detection and
//! checkpointed appends.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use shopscribe_core::{ProductRecord, fields};
use tracing::{info, warn};

use crate::DescribeError;

const BOM: char = '\u{feff}';

/// A loaded input CSV: its header and one record per data row.
#[derive(Debug, Clone, Default)]
pub struct InputTable {
    pub fieldnames: Vec<String>,
    pub records: Vec<ProductRecord>,
}

impl InputTable {
    /// Output header: input columns plus the two synthetic columns, each
    /// appended only if the input does not already have it.
    pub fn output_fieldnames(&self) -> Vec<String> {
        let mut names = self.fieldnames.clone();
        for synthetic in [fields::NEW_DESCRIPTION, fields::GENERATION_STATUS] {
            if !names.iter().any(|n| n == synthetic) {
                names.push(synthetic.to_string());
            }
        }
        names
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>, DescribeError> {
    Ok(ReaderBuilder::new().flexible(true).from_path(path)?)
}

fn read_header(reader: &mut csv::Reader<File>) -> Result<Vec<String>, DescribeError> {
    Ok(reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches(BOM).to_string()
            } else {
                h.to_string()
            }
        })
        .collect())
}

/// Load every row of the input CSV.
pub fn load_input(path: &Path) -> Result<InputTable, DescribeError> {
    if !path.exists() {
        return Err(DescribeError::InputNotFound(path.to_path_buf()));
    }
    let mut reader = open_reader(path)?;
    let fieldnames = read_header(&mut reader)?;
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cells: Vec<&str> = row.iter().collect();
        records.push(ProductRecord::from_row(&fieldnames, &cells));
    }
    info!(path = %path.display(), rows = records.len(), "loaded input");
    Ok(InputTable {
        fieldnames,
        records,
    })
}

/// Identity keys already complete in an existing output file.
///
/// A key is complete when its row has a non-empty identity key and a
/// non-empty generated description. Errored rows are not complete. A missing
/// file yields the empty set.
pub fn load_completed(path: &Path) -> Result<HashSet<String>, DescribeError> {
    let mut completed = HashSet::new();
    if !path.exists() {
        return Ok(completed);
    }
    let mut reader = open_reader(path)?;
    let header = read_header(&mut reader)?;
    for row in reader.records() {
        let row = row?;
        let cells: Vec<&str> = row.iter().collect();
        let record = ProductRecord::from_row(&header, &cells);
        let key = record.identity_key();
        let done = record
            .get(fields::NEW_DESCRIPTION)
            .is_some_and(|d| !d.trim().is_empty());
        if !key.is_empty() && done {
            completed.insert(key.to_string());
        }
    }
    Ok(completed)
}

/// Make sure the output file exists with a header row.
///
/// Returns `true` when the header was written. A non-empty file is never
/// rewritten; rows will be appended under its current header, so a header
/// that differs from `fieldnames` is logged.
pub fn prepare_output(path: &Path, fieldnames: &[String]) -> Result<bool, DescribeError> {
    let has_content = std::fs::metadata(path).is_ok_and(|m| m.len() > 0);
    if has_content {
        let mut reader = open_reader(path)?;
        let existing = read_header(&mut reader)?;
        if existing.as_slice() != fieldnames {
            warn!(
                path = %path.display(),
                existing = ?existing,
                current = ?fieldnames,
                "output header differs from current columns; rows will be appended as-is"
            );
        }
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(fieldnames)?;
    writer.flush()?;
    info!(path = %path.display(), columns = fieldnames.len(), "initialised output file");
    Ok(true)
}

fn append_rows(
    path: &Path,
    fieldnames: &[String],
    rows: &[ProductRecord],
) -> Result<(), DescribeError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    for row in rows {
        writer.write_record(row.values_for(fieldnames))?;
    }
    writer.flush()?;
    Ok(())
}

/// Buffers augmented rows and appends them to the output file every
/// `threshold` rows.
///
/// At most `threshold - 1` rows are held in memory at any time; anything
/// still buffered is lost if the process dies before [`finish`](Self::finish).
pub struct CheckpointWriter {
    path: PathBuf,
    fieldnames: Vec<String>,
    threshold: usize,
    buffer: Vec<ProductRecord>,
    written: usize,
}

impl CheckpointWriter {
    pub fn new(path: impl Into<PathBuf>, fieldnames: Vec<String>, threshold: usize) -> Self {
        Self {
            path: path.into(),
            fieldnames,
            threshold: threshold.max(1),
            buffer: Vec::new(),
            written: 0,
        }
    }

    /// Buffer a row. Returns `true` when this push triggered a checkpoint.
    pub fn push(&mut self, record: ProductRecord) -> Result<bool, DescribeError> {
        self.buffer.push(record);
        if self.buffer.len() >= self.threshold {
            self.flush()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Append and clear whatever is buffered.
    pub fn flush(&mut self) -> Result<(), DescribeError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        append_rows(&self.path, &self.fieldnames, &self.buffer)?;
        self.written += self.buffer.len();
        self.buffer.clear();
        Ok(())
    }

    /// Flush the tail and return the total number of rows written.
    pub fn finish(mut self) -> Result<usize, DescribeError> {
        self.flush()?;
        Ok(self.written)
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn written(&self) -> usize {
        self.written
    }
}
