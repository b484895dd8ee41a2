//! Recorded hit traces in JSON Lines form.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as Json;
use tprobe_core::Location;

use crate::error::HostError;
use crate::frame::FrameSnapshot;

/// Thread id used when a line does not name one.
pub const MAIN_THREAD: u64 = 1;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHit {
    location: String,
    #[serde(default = "main_thread")]
    thread: u64,
    #[serde(default)]
    frame: Json,
}

fn main_thread() -> u64 {
    MAIN_THREAD
}

/// One recorded arrival at a location.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedHit {
    pub location: Location,
    pub thread: u64,
    pub frame: FrameSnapshot,
    /// 1-based line in the trace file.
    pub line: usize,
}

/// Hits in recorded order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitTrace {
    hits: Vec<RecordedHit>,
}

impl HitTrace {
    /// Parse JSON Lines text, skipping blank lines.
    pub fn parse(text: &str) -> Result<Self, HostError> {
        let mut hits = Vec::new();
        for (index, raw_line) in text.lines().enumerate() {
            let line = index + 1;
            if raw_line.trim().is_empty() {
                continue;
            }
            let invalid = |message: String| HostError::Trace {
                line,
                message: message.into(),
            };
            let raw: RawHit =
                serde_json::from_str(raw_line).map_err(|err| invalid(err.to_string()))?;
            let location = raw
                .location
                .parse::<Location>()
                .map_err(|err| invalid(err.to_string()))?;
            let frame = FrameSnapshot::from_json(raw.frame).map_err(|err| invalid(err.to_string()))?;
            hits.push(RecordedHit {
                location,
                thread: raw.thread,
                frame,
                line,
            });
        }
        tracing::debug!(hits = hits.len(), "parsed hit trace");
        Ok(Self { hits })
    }

    /// Read and parse a trace file.
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| HostError::Io(format!("{}: {err}", path.display()).into()))?;
        Self::parse(&text)
    }

    #[must_use]
    pub fn hits(&self) -> &[RecordedHit] {
        &self.hits
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Hits grouped by thread, threads in order of first appearance.
    #[must_use]
    pub fn by_thread(&self) -> IndexMap<u64, Vec<&RecordedHit>> {
        let mut threads: IndexMap<u64, Vec<&RecordedHit>> = IndexMap::new();
        for hit in &self.hits {
            threads.entry(hit.thread).or_default().push(hit);
        }
        threads
    }
}

impl IntoIterator for HitTrace {
    type Item = RecordedHit;
    type IntoIter = std::vec::IntoIter<RecordedHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}
