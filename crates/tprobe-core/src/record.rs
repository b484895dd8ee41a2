//! Diagnostic records produced by one probe firing.

#![allow(missing_docs)]

use smol_str::SmolStr;

use crate::value::CapturedValue;

/// One labelled capture.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEntry {
    pub label: SmolStr,
    pub value: CapturedValue,
}

/// Ordered `(label, value)` pairs captured by one firing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagnosticRecord {
    entries: Vec<RecordEntry>,
}

impl DiagnosticRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, label: impl Into<SmolStr>, value: CapturedValue) {
        self.entries.push(RecordEntry {
            label: label.into(),
            value,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    /// First entry with the given label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&CapturedValue> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| &entry.value)
    }

    /// Whether any read or derivation failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|entry| !entry.value.is_ok())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
