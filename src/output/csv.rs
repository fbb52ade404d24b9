//! CSV output writer implementation

use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{FeatureRowWriter, OutputError, OutputResult, OutputWriter};
use crate::FeatureRow;

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Flush interval (rows between flushes)
const FLUSH_INTERVAL: u64 = 100;

/// CSV record for one feature row. Column order is the output contract:
/// organism_id, feature_id, source_id, fetched_object.
#[derive(Debug, Serialize)]
struct FeatureRecord<'a> {
    organism_id: i64,
    feature_id: &'a str,
    source_id: &'a str,
    fetched_object: String,
}

/// CSV writer for feature rows.
///
/// The fetched payload is serialized as canonical JSON (sorted keys,
/// non-ASCII preserved) into the `fetched_object` column.
pub struct CsvFeatureWriter {
    writer: Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvFeatureWriter {
    /// Create a new CSV feature writer.
    ///
    /// Creates parent directories as needed. Headers are written
    /// automatically on the first serialized row.
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;
        let buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let csv_writer = Writer::from_writer(buf_writer);

        Ok(Self {
            writer: csv_writer,
            rows_written: 0,
        })
    }

    /// Number of rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl FeatureRowWriter for CsvFeatureWriter {
    fn write_row(&mut self, row: &FeatureRow) -> OutputResult<()> {
        let fetched_object = row
            .canonical_fetched_object()
            .map_err(|e| OutputError::SerializationError(e.to_string()))?;

        let record = FeatureRecord {
            organism_id: row.organism_id,
            feature_id: &row.feature_id,
            source_id: &row.source_id,
            fetched_object,
        };

        self.writer
            .serialize(&record)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {e}")))?;

        self.rows_written += 1;
        if self.rows_written % FLUSH_INTERVAL == 0 {
            self.flush()?;
            debug!("Progress: {} rows written", self.rows_written);
        }

        Ok(())
    }
}

impl OutputWriter for CsvFeatureWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }

    fn close(mut self) -> OutputResult<()> {
        debug!("Closing CSV writer: {} total rows written", self.rows_written);

        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {e}")))?;
        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to flush buffer: {e}")))?;
        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {e}")))?;

        Ok(())
    }
}
