// ScenarioSleuth - core/export.rs
//
// CSV encoding of match records.
// Core layer: writes to any Write trait object.

use crate::core::model::MatchRecord;
use crate::util::constants;
use crate::util::error::ExportError;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Render a record as the nine output columns.
///
/// Columns: FilePath, Scenario, FirstLineNo, FirstLine,
/// MandatoryPatternLineNos, MandatoryPatternLines, SecondLineNo, SecondLine, Result
pub fn record_columns(record: &MatchRecord) -> [String; 9] {
    let line_nos = record
        .mandatory_line_nos
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(constants::LINE_NO_SEPARATOR);

    [
        record.file_path.display().to_string(),
        record.scenario_name.clone(),
        record.first_line_no.to_string(),
        record.first_line_text.clone(),
        line_nos,
        record
            .mandatory_line_texts
            .join(constants::LINE_TEXT_SEPARATOR),
        record.second_line_no.to_string(),
        record.second_line_text.clone(),
        record.outcome_message.clone(),
    ]
}

/// Row-at-a-time CSV writer for the output artifact.
///
/// The header is written on construction. Each `write_record` call emits one
/// complete row into the csv buffer; `flush` pushes buffered rows through to
/// the underlying writer, so the artifact is always well-formed up to the
/// last flushed row.
pub struct RecordWriter<W: Write> {
    csv: csv::Writer<W>,
    path: PathBuf,
    rows: usize,
}

impl<W: Write> RecordWriter<W> {
    /// Wrap `writer` and emit the header row.
    ///
    /// `path` is used for error messages only.
    pub fn new(writer: W, path: &Path) -> Result<Self, ExportError> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(constants::OUTPUT_HEADER)
            .map_err(|e| ExportError::Csv {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self {
            csv,
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    pub fn write_record(&mut self, record: &MatchRecord) -> Result<(), ExportError> {
        self.csv
            .write_record(record_columns(record))
            .map_err(|e| ExportError::Csv {
                path: self.path.clone(),
                source: e,
            })?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ExportError> {
        self.csv.flush().map_err(|e| ExportError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Flush and return the number of rows written.
    pub fn finish(mut self) -> Result<usize, ExportError> {
        self.flush()?;
        Ok(self.rows)
    }
}
