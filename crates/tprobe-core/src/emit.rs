//! Record emitter and output sinks.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::ProbeError;
use crate::location::Location;
use crate::record::DiagnosticRecord;
use crate::render::OutputFormat;

/// Counters kept by an [`Emitter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterStats {
    /// Records written to the sink.
    pub records_emitted: u64,
    /// Records lost to sink write errors.
    pub sink_write_failures: u64,
}

/// Renders records and writes them to the configured sink.
///
/// Each record is rendered to a full line before the sink lock is taken, so
/// concurrent hits never interleave partial lines. Write failures are counted
/// and logged, never returned.
pub struct Emitter {
    format: OutputFormat,
    sink: Mutex<Box<dyn Write + Send>>,
    records_emitted: AtomicU64,
    sink_write_failures: AtomicU64,
    last_error: Mutex<Option<ProbeError>>,
}

impl Emitter {
    pub fn new(format: OutputFormat, sink: impl Write + Send + 'static) -> Self {
        Self {
            format,
            sink: Mutex::new(Box::new(sink)),
            records_emitted: AtomicU64::new(0),
            sink_write_failures: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }

    /// Emitter writing to standard output.
    #[must_use]
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, std::io::stdout())
    }

    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render and write one record.
    pub fn emit(&self, location: &Location, record: &DiagnosticRecord) {
        let line = self.format.render(location, record);
        let result = {
            let mut sink = self.sink.lock();
            sink.write_all(line.as_bytes()).and_then(|()| sink.flush())
        };
        match result {
            Ok(()) => {
                self.records_emitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.sink_write_failures.fetch_add(1, Ordering::Relaxed);
                warn!(%location, "probe record dropped: {err}");
                *self.last_error.lock() = Some(ProbeError::SinkWriteError(err.to_string().into()));
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> EmitterStats {
        EmitterStats {
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
            sink_write_failures: self.sink_write_failures.load(Ordering::Relaxed),
        }
    }

    /// Most recent sink failure, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<ProbeError> {
        self.last_error.lock().clone()
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("format", &self.format)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// In-memory sink shared between the emitter and a reader.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, split into lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::value::{CapturedValue, Value};

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record() -> DiagnosticRecord {
        let mut record = DiagnosticRecord::new();
        record.push("x", CapturedValue::captured(Value::Int(1)));
        record
    }

    #[test]
    fn sink_failures_are_counted_not_raised() {
        let emitter = Emitter::new(OutputFormat::Text, BrokenPipe);
        emitter.emit(&Location::source("a.cpp", 1), &record());
        emitter.emit(&Location::source("a.cpp", 1), &record());
        assert_eq!(
            emitter.stats(),
            EmitterStats {
                records_emitted: 0,
                sink_write_failures: 2,
            }
        );
        assert_eq!(
            emitter.last_error(),
            Some(ProbeError::SinkWriteError("pipe closed".into()))
        );
    }

    #[test]
    fn writes_one_line_per_record() {
        let sink = MemorySink::new();
        let emitter = Emitter::new(OutputFormat::Text, sink.clone());
        emitter.emit(&Location::source("a.cpp", 1), &record());
        emitter.emit(&Location::source("a.cpp", 2), &record());
        assert_eq!(sink.lines(), ["[a.cpp:1] x: 1", "[a.cpp:2] x: 1"]);
        assert_eq!(emitter.stats().records_emitted, 2);
    }
}
