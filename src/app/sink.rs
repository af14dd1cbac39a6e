// ScenarioSleuth - app/sink.rs
//
// Single-writer fan-in for match records.
//
// Architecture:
//   - Any number of workers hold a `RecordSender` (a cloned mpsc::Sender).
//   - Exactly one consumer thread owns the `RecordWriter` and therefore the
//     output file handle; nothing else ever touches it, so no lock is needed.
//   - Each row is written whole by that one thread, so rows never interleave
//     or tear regardless of how many producers submit concurrently.
//   - The consumer stops on `SinkMessage::EndOfStream`, when every sender is
//     dropped, or when the cancel token is observed (checked once per dequeue
//     attempt). On cancellation it writes what is already queued and stops.

use crate::core::export::RecordWriter;
use crate::core::model::{CancelToken, MatchRecord};
use crate::util::constants;
use crate::util::error::ExportError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Messages accepted by the sink's consumer.
#[derive(Debug)]
pub enum SinkMessage {
    /// One row to append.
    Record(MatchRecord),
    /// All producers are done; drain and stop.
    EndOfStream,
}

/// What the consumer wrote before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub rows_written: usize,
    /// True when the consumer stopped because of cancellation rather than
    /// end-of-stream.
    pub cancelled: bool,
}

/// Producer handle. Cheap to clone; one per worker task.
#[derive(Debug, Clone)]
pub struct RecordSender {
    tx: mpsc::Sender<SinkMessage>,
}

impl RecordSender {
    /// Queue a record. Returns false if the consumer has already stopped
    /// (cancelled or failed); the record is dropped in that case.
    pub fn send(&self, record: MatchRecord) -> bool {
        self.tx.send(SinkMessage::Record(record)).is_ok()
    }
}

/// The running sink: a sender template plus the consumer thread handle.
pub struct ResultSink {
    tx: mpsc::Sender<SinkMessage>,
    handle: JoinHandle<Result<SinkReport, ExportError>>,
    path: PathBuf,
}

impl ResultSink {
    /// Write the header to `writer` and start the consumer thread.
    ///
    /// `path` names the artifact in errors and logs.
    pub fn spawn<W>(writer: W, path: &Path, cancel: CancelToken) -> Result<Self, ExportError>
    where
        W: Write + Send + 'static,
    {
        let record_writer = RecordWriter::new(writer, path)?;
        let (tx, rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("result-sink".to_string())
            .spawn(move || consume(rx, record_writer, cancel))
            .map_err(|e| ExportError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        tracing::debug!(output = %path.display(), "Result sink started");

        Ok(Self {
            tx,
            handle,
            path: path.to_path_buf(),
        })
    }

    /// A new producer handle.
    pub fn sender(&self) -> RecordSender {
        RecordSender {
            tx: self.tx.clone(),
        }
    }

    /// Signal end-of-stream, wait for the consumer to drain, and return what
    /// it wrote. The artifact is flushed before this returns.
    ///
    /// Call only after every producer has finished submitting.
    pub fn finish(self) -> Result<SinkReport, ExportError> {
        // A send error means the consumer already stopped; join reports why.
        let _ = self.tx.send(SinkMessage::EndOfStream);
        drop(self.tx);

        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(ExportError::WriterPanicked { path: self.path }),
        }
    }
}

/// Consumer loop. Sole owner of the writer.
fn consume<W: Write>(
    rx: mpsc::Receiver<SinkMessage>,
    mut writer: RecordWriter<W>,
    cancel: CancelToken,
) -> Result<SinkReport, ExportError> {
    let poll = Duration::from_millis(constants::SINK_POLL_INTERVAL_MS);
    let mut unflushed = 0usize;
    let mut cancelled = false;

    loop {
        if cancel.is_cancelled() {
            cancelled = true;
            drain_queued(&rx, &mut writer)?;
            break;
        }

        match rx.recv_timeout(poll) {
            Ok(SinkMessage::Record(record)) => {
                writer.write_record(&record)?;
                unflushed += 1;
                if unflushed >= constants::SINK_FLUSH_EVERY_ROWS {
                    writer.flush()?;
                    unflushed = 0;
                }
            }
            Ok(SinkMessage::EndOfStream) => break,
            Err(RecvTimeoutError::Timeout) => {
                // Idle: make rows written so far visible on disk.
                if unflushed > 0 {
                    writer.flush()?;
                    unflushed = 0;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let rows_written = writer.finish()?;
    tracing::debug!(rows = rows_written, cancelled, "Result sink stopped");

    Ok(SinkReport {
        rows_written,
        cancelled,
    })
}

/// Write whatever is already in the queue without waiting for more.
fn drain_queued<W: Write>(
    rx: &mpsc::Receiver<SinkMessage>,
    writer: &mut RecordWriter<W>,
) -> Result<(), ExportError> {
    loop {
        match rx.try_recv() {
            Ok(SinkMessage::Record(record)) => writer.write_record(&record)?,
            Ok(SinkMessage::EndOfStream) | Err(TryRecvError::Empty) => return Ok(()),
            Err(TryRecvError::Disconnected) => return Ok(()),
        }
    }
}
