// ScenarioSleuth - core/matcher.rs
//
// The per-file scenario automaton.
//
// A `ScenarioMatcher` walks the lines of one file for one scenario and holds
// at most one open window at a time:
//
//   Closed --start match--> Open --end match--> Closed (record emitted or dropped)
//
// A start match while a window is already open is ignored: the first start
// wins until an end is seen. A window still open at end-of-file is discarded.
//
// `scan_reader` drives the automaton over any `BufRead`; `scan_file` is the
// file boundary that turns open/read failures into a `ScanOutcome::Failed`
// so one bad file never stops the batch.

use crate::core::model::{MandatoryLogic, MatchRecord};
use crate::core::scenario::Scenario;
use crate::util::constants;
use crate::util::error::ScanError;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

// =============================================================================
// Window state
// =============================================================================

#[derive(Debug)]
enum Window {
    Closed,
    Open(OpenWindow),
}

/// An in-progress start→end span.
#[derive(Debug)]
struct OpenWindow {
    start_line: u64,
    start_text: String,
    /// Mandatory matches keyed by line number. Lines arrive in ascending
    /// order, so insertion order is also ascending line order.
    mandatory_lines: Vec<(u64, String)>,
    /// Which mandatory patterns (by index) have matched at least once.
    satisfied: Vec<bool>,
}

impl OpenWindow {
    fn new(start_line: u64, start_text: &str, pattern_count: usize) -> Self {
        Self {
            start_line,
            start_text: start_text.to_string(),
            mandatory_lines: Vec::new(),
            satisfied: vec![false; pattern_count],
        }
    }

    fn record_line(&mut self, line_no: u64, text: &str) {
        if self.mandatory_lines.last().map(|(n, _)| *n) != Some(line_no) {
            self.mandatory_lines.push((line_no, text.to_string()));
        }
    }

    fn satisfied_count(&self) -> usize {
        self.satisfied.iter().filter(|s| **s).count()
    }
}

// =============================================================================
// Matcher
// =============================================================================

/// Scenario automaton for a single (file, scenario) pair.
///
/// Each instance owns its window state, so two scenarios scanning the same
/// file never share anything mutable.
#[derive(Debug)]
pub struct ScenarioMatcher<'a> {
    file_path: &'a Path,
    scenario: &'a Scenario,
    window: Window,
}

impl<'a> ScenarioMatcher<'a> {
    pub fn new(file_path: &'a Path, scenario: &'a Scenario) -> Self {
        Self {
            file_path,
            scenario,
            window: Window::Closed,
        }
    }

    /// True while a start has been seen without a closing end.
    pub fn is_open(&self) -> bool {
        matches!(self.window, Window::Open(_))
    }

    /// Feed one line (without its terminator). Returns a record when this
    /// line closes a window that should be reported.
    pub fn feed(&mut self, line_no: u64, line: &str) -> Option<MatchRecord> {
        let scenario = self.scenario;

        if let Window::Closed = self.window {
            if !scenario.start.is_match(line) {
                return None;
            }
            tracing::trace!(
                scenario = %scenario.name,
                line = line_no,
                text = crate::util::logging::preview(line),
                "Window opened"
            );
            self.window = Window::Open(OpenWindow::new(
                line_no,
                line.trim(),
                scenario.mandatory.len(),
            ));
        }

        let Window::Open(window) = &mut self.window else {
            return None;
        };

        for (idx, pattern) in scenario.mandatory.iter().enumerate() {
            if pattern.is_match(line) {
                window.record_line(line_no, line.trim());
                window.satisfied[idx] = true;
                if scenario.logic == MandatoryLogic::Or {
                    break;
                }
            }
        }

        if !scenario.end.is_match(line) {
            return None;
        }

        let Window::Open(window) = std::mem::replace(&mut self.window, Window::Closed) else {
            return None;
        };
        self.close(window, line_no, line.trim())
    }

    /// Resolve a window against its end line.
    fn close(&self, window: OpenWindow, end_line: u64, end_text: &str) -> Option<MatchRecord> {
        let scenario = self.scenario;
        let success = match scenario.logic {
            // An empty mandatory list can never satisfy OR...
            MandatoryLogic::Or => !window.mandatory_lines.is_empty(),
            // ...but vacuously satisfies AND (0 of 0).
            MandatoryLogic::And => window.satisfied_count() == scenario.mandatory.len(),
        };

        tracing::trace!(
            scenario = %scenario.name,
            start = window.start_line,
            end = end_line,
            success,
            "Window closed"
        );

        if !success && !scenario.include_fails {
            return None;
        }

        let (mandatory_line_nos, mandatory_line_texts): (Vec<u64>, Vec<String>) =
            window.mandatory_lines.into_iter().unzip();

        Some(MatchRecord {
            file_path: self.file_path.to_path_buf(),
            scenario_name: scenario.name.clone(),
            first_line_no: window.start_line,
            first_line_text: window.start_text,
            mandatory_line_nos,
            mandatory_line_texts,
            second_line_no: end_line,
            second_line_text: end_text.to_string(),
            outcome_message: if success {
                scenario.success_message.clone()
            } else {
                scenario.fail_message.clone()
            },
        })
    }
}

// =============================================================================
// Driving the automaton
// =============================================================================

/// How a single (file, scenario) scan ended.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Reached end-of-file.
    Completed { lines: u64, records: usize },
    /// Stopped early because cancellation was observed.
    Cancelled { lines: u64, records: usize },
    /// The file could not be opened or read. Records emitted before the
    /// failure stay emitted.
    Failed {
        lines: u64,
        records: usize,
        error: ScanError,
    },
}

impl ScanOutcome {
    pub fn records(&self) -> usize {
        match self {
            Self::Completed { records, .. }
            | Self::Cancelled { records, .. }
            | Self::Failed { records, .. } => *records,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Lines read and records emitted by `scan_reader`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounts {
    pub lines: u64,
    pub records: usize,
    pub cancelled: bool,
}

/// Run one scenario over every line of `reader`.
///
/// Lines end at `\n`, `\r\n` or a lone `\r`, and are decoded as lossy
/// UTF-8, so a malformed byte sequence becomes U+FFFD instead of failing the
/// file. `is_cancelled` is polled once per line; when it returns true the
/// scan stops without emitting anything further.
///
/// On a read error, returns the error along with the line number reached.
pub fn scan_reader<R, E, C>(
    mut reader: R,
    file_path: &Path,
    scenario: &Scenario,
    mut emit: E,
    is_cancelled: C,
) -> Result<ScanCounts, (u64, io::Error)>
where
    R: BufRead,
    E: FnMut(MatchRecord),
    C: Fn() -> bool,
{
    let mut matcher = ScenarioMatcher::new(file_path, scenario);
    let mut counts = ScanCounts::default();
    let mut buf: Vec<u8> = Vec::with_capacity(256);

    'read: loop {
        if is_cancelled() {
            counts.cancelled = true;
            break;
        }

        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err((counts.lines, e)),
        }

        // `read_until` only splits on `\n`; old Mac files end lines with `\r`.
        for (idx, raw) in strip_terminator(&buf).split(|&b| b == b'\r').enumerate() {
            if idx > 0 && is_cancelled() {
                counts.cancelled = true;
                break 'read;
            }

            counts.lines += 1;
            let line = String::from_utf8_lossy(raw);

            if let Some(record) = matcher.feed(counts.lines, &line) {
                counts.records += 1;
                emit(record);
            }
        }
    }

    if matcher.is_open() && !counts.cancelled {
        tracing::trace!(
            file = %file_path.display(),
            scenario = %scenario.name,
            "Window still open at end of file, discarded"
        );
    }

    Ok(counts)
}

/// Scan one file for one scenario. Never returns an error: open and read
/// failures are reported through `ScanOutcome::Failed`.
pub fn scan_file<E, C>(
    file_path: &Path,
    scenario: &Scenario,
    mut emit: E,
    is_cancelled: C,
) -> ScanOutcome
where
    E: FnMut(MatchRecord),
    C: Fn() -> bool,
{
    let file = match File::open(file_path) {
        Ok(f) => f,
        Err(e) => {
            return ScanOutcome::Failed {
                lines: 0,
                records: 0,
                error: ScanError::Open {
                    file: PathBuf::from(file_path),
                    source: e,
                },
            }
        }
    };

    let reader = BufReader::with_capacity(constants::DEFAULT_READ_BUFFER_SIZE, file);

    // Count records through a wrapper so a mid-file failure still reports
    // how many rows were already handed to the sink.
    let mut emitted = 0usize;
    let result = scan_reader(
        reader,
        file_path,
        scenario,
        |record| {
            emitted += 1;
            emit(record);
        },
        is_cancelled,
    );

    match result {
        Ok(counts) if counts.cancelled => ScanOutcome::Cancelled {
            lines: counts.lines,
            records: counts.records,
        },
        Ok(counts) => ScanOutcome::Completed {
            lines: counts.lines,
            records: counts.records,
        },
        Err((line_number, source)) => ScanOutcome::Failed {
            lines: line_number,
            records: emitted,
            error: ScanError::Read {
                file: PathBuf::from(file_path),
                line_number,
                source,
            },
        },
    }
}

fn strip_terminator(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
