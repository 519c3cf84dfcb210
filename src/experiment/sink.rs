//! Trial log outputs.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::error::{GemsError, Result};
use crate::experiment::record::{DATA_COLUMNS, TrialRecord};

/// Receives each completed trial as soon as it is scored.
pub trait TrialSink {
    fn write_record(&mut self, record: &TrialRecord) -> Result<()>;

    /// Flush and release the underlying resource. Called once when the
    /// session ends, whether it completed, quit or failed.
    fn close(&mut self) -> Result<()>;
}

/// Per-subject log path: `{data_dir}/{subj_id}.csv`.
pub fn output_path(data_dir: &Path, subj_id: &str) -> PathBuf {
    data_dir.join(format!("{subj_id}.csv"))
}

/// Quote a field when it holds a comma, quote or line break.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Inverse of [`escape_field`] over one line.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => quoted = false,
            ('"', false) if field.is_empty() => quoted = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// CSV trial log. The header goes out once, ahead of the first row (or at
/// close if no trial finished).
pub struct CsvTrialLog<W: Write> {
    out: W,
    header_written: bool,
    closed: bool,
    rows: usize,
}

impl CsvTrialLog<BufWriter<File>> {
    /// Create `path`, refusing to overwrite an existing subject file.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(GemsError::Configuration(format!(
                "output file {} already exists",
                path.display()
            )));
        }
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        info!("writing trials to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> CsvTrialLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
            closed: false,
            rows: 0,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn writer(&mut self) -> Result<&mut W> {
        if self.closed {
            return Err(GemsError::Io(std::io::Error::other("trial log already closed")));
        }
        Ok(&mut self.out)
    }

    fn ensure_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        let header = DATA_COLUMNS.join(",");
        writeln!(self.writer()?, "{header}")?;
        self.header_written = true;
        Ok(())
    }
}

impl<W: Write> TrialSink for CsvTrialLog<W> {
    fn write_record(&mut self, record: &TrialRecord) -> Result<()> {
        self.ensure_header()?;
        let line = record
            .to_row()
            .iter()
            .map(|f| escape_field(f))
            .collect::<Vec<_>>()
            .join(",");
        let out = self.writer()?;
        writeln!(out, "{line}")?;
        // Rows hit the file as they are scored.
        out.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.ensure_header()?;
        self.writer()?.flush()?;
        self.closed = true;
        Ok(())
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<TrialRecord>,
    pub closed: bool,
}

impl TrialSink for MemorySink {
    fn write_record(&mut self, record: &TrialRecord) -> Result<()> {
        if self.closed {
            return Err(GemsError::Io(std::io::Error::other("sink already closed")));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
