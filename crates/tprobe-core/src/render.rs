//! Record rendering and the matching line parser.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

use crate::location::Location;
use crate::record::DiagnosticRecord;
use crate::value::CapturedValue;

/// Output format for emitted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `[location] label: value, label: value`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl OutputFormat {
    /// Render a record as a single line, newline included.
    #[must_use]
    pub fn render(self, location: &Location, record: &DiagnosticRecord) -> String {
        let mut line = match self {
            OutputFormat::Text => render_text(location, record),
            OutputFormat::Json => render_json(location, record),
        };
        line.push('\n');
        line
    }
}

/// Render a record in the text format, without a trailing newline.
#[must_use]
pub fn render_text(location: &Location, record: &DiagnosticRecord) -> String {
    let mut line = format!("[{location}]");
    for (index, entry) in record.entries().iter().enumerate() {
        line.push_str(if index == 0 { " " } else { ", " });
        line.push_str(&entry.label);
        line.push_str(": ");
        match &entry.value {
            CapturedValue::Captured { text, .. } => push_text(&mut line, text),
            CapturedValue::Failed(err) => {
                line.push_str("<error: ");
                for c in err.to_string().chars() {
                    push_escaped(&mut line, c, '>');
                }
                line.push('>');
            }
        }
    }
    line
}

fn push_text(line: &mut String, text: &str) {
    let needs_quotes = text.is_empty()
        || text.starts_with(['<', '"'])
        || text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
        || text.contains([',', '"', '\\', '\n', '\r']);
    if !needs_quotes {
        line.push_str(text);
        return;
    }
    line.push('"');
    for c in text.chars() {
        push_escaped(line, c, '"');
    }
    line.push('"');
}

fn push_escaped(line: &mut String, c: char, delimiter: char) {
    match c {
        '\\' => line.push_str("\\\\"),
        '\n' => line.push_str("\\n"),
        '\r' => line.push_str("\\r"),
        c if c == delimiter => {
            line.push('\\');
            line.push(c);
        }
        c => line.push(c),
    }
}

/// Structured form of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRecord {
    pub location: String,
    pub entries: Vec<JsonEntry>,
}

/// Structured form of one record entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonEntry {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub ok: bool,
}

impl JsonRecord {
    #[must_use]
    pub fn new(location: &Location, record: &DiagnosticRecord) -> Self {
        let entries = record
            .entries()
            .iter()
            .map(|entry| match &entry.value {
                CapturedValue::Captured { text, .. } => JsonEntry {
                    label: entry.label.to_string(),
                    value: Some(text.clone()),
                    error: None,
                    ok: true,
                },
                CapturedValue::Failed(err) => JsonEntry {
                    label: entry.label.to_string(),
                    value: None,
                    error: Some(err.to_string()),
                    ok: false,
                },
            })
            .collect();
        Self {
            location: location.to_string(),
            entries,
        }
    }
}

fn render_json(location: &Location, record: &DiagnosticRecord) -> String {
    let json = JsonRecord::new(location, record);
    serde_json::to_string(&json)
        .unwrap_or_else(|err| format!("{{\"location\":\"{location}\",\"error\":\"{err}\"}}"))
}

/// Value as it appears in a rendered text record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedValue {
    Text(String),
    Error(String),
}

/// A text record line split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub location: Location,
    pub entries: Vec<(SmolStr, RenderedValue)>,
}

/// Failure to split a text record line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed record line at column {column}: {reason}")]
pub struct RecordParseError {
    pub column: usize,
    pub reason: &'static str,
}

/// Parse a line produced by [`render_text`].
pub fn parse_record_line(line: &str) -> Result<ParsedRecord, RecordParseError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let fail = |column, reason| RecordParseError { column, reason };
    let rest = line.strip_prefix('[').ok_or(fail(0, "expected '['"))?;
    let close = rest.find(']').ok_or(fail(1, "unterminated location"))?;
    let location = rest[..close]
        .parse::<Location>()
        .map_err(|_| fail(1, "invalid location"))?;

    let body = &rest[close + 1..];
    let base = close + 2;
    let chars: Vec<char> = body.chars().collect();
    let mut pos = 0;
    let mut entries = Vec::new();
    while pos < chars.len() {
        let separator = if entries.is_empty() { " " } else { ", " };
        for expected in separator.chars() {
            if chars.get(pos) != Some(&expected) {
                return Err(fail(base + pos, "expected entry separator"));
            }
            pos += 1;
        }
        let label_start = pos;
        while pos < chars.len() && chars[pos] != ':' {
            pos += 1;
        }
        if pos == label_start || pos >= chars.len() {
            return Err(fail(base + label_start, "expected label"));
        }
        let label: String = chars[label_start..pos].iter().collect();
        if chars.get(pos + 1) != Some(&' ') {
            return Err(fail(base + pos, "expected ': '"));
        }
        pos += 2;

        let value = if starts_with(&chars, pos, "<error: ") {
            pos += "<error: ".len();
            let (text, next) =
                read_escaped(&chars, pos, '>').ok_or(fail(base + pos, "unterminated error"))?;
            pos = next;
            RenderedValue::Error(text)
        } else if chars.get(pos) == Some(&'"') {
            let (text, next) = read_escaped(&chars, pos + 1, '"')
                .ok_or(fail(base + pos, "unterminated quoted value"))?;
            pos = next;
            RenderedValue::Text(text)
        } else {
            let start = pos;
            while pos < chars.len() && chars[pos] != ',' {
                pos += 1;
            }
            RenderedValue::Text(chars[start..pos].iter().collect())
        };
        entries.push((SmolStr::new(label), value));
    }
    Ok(ParsedRecord { location, entries })
}

fn starts_with(chars: &[char], pos: usize, prefix: &str) -> bool {
    let mut index = pos;
    for expected in prefix.chars() {
        if chars.get(index) != Some(&expected) {
            return false;
        }
        index += 1;
    }
    true
}

/// Read up to an unescaped delimiter, returning the text and the index after it.
fn read_escaped(chars: &[char], mut pos: usize, delimiter: char) -> Option<(String, usize)> {
    let mut text = String::new();
    while let Some(&c) = chars.get(pos) {
        pos += 1;
        match c {
            '\\' => {
                let escaped = *chars.get(pos)?;
                pos += 1;
                text.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    other => other,
                });
            }
            c if c == delimiter => return Some((text, pos)),
            c => text.push(c),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;
    use crate::error::ProbeError;
    use crate::value::Value;

    fn sample() -> DiagnosticRecord {
        let mut record = DiagnosticRecord::new();
        record.push("Cost", CapturedValue::captured(Value::Float(12.5)));
        record.push(
            "Curr_mid",
            CapturedValue::Failed(ProbeError::evaluation("this -> mid", "null pointer")),
        );
        record.push("Note", CapturedValue::captured(Value::Text("a, \"b\"".into())));
        record
    }

    #[test]
    fn text_rendering() {
        let location = Location::source("Algorithms.cpp", 120);
        expect![[r#"[Algorithms.cpp:120] Cost: 12.5, Curr_mid: <error: evaluation of 'this -\> mid' failed: null pointer>, Note: "a, \"b\"""#]]
            .assert_eq(&render_text(&location, &sample()));
    }

    #[test]
    fn json_rendering() {
        let location = Location::symbol("optimalSegmentation", 0);
        expect![[r#"{"location":"optimalSegmentation","entries":[{"label":"Cost","value":"12.5","ok":true},{"label":"Curr_mid","error":"evaluation of 'this -> mid' failed: null pointer","ok":false},{"label":"Note","value":"a, \"b\"","ok":true}]}"#]]
            .assert_eq(OutputFormat::Json.render(&location, &sample()).trim_end());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_record_line("no brackets").is_err());
        assert!(parse_record_line("[a.cpp:1] x 1").is_err());
        assert!(parse_record_line("[a.cpp:1] x: \"open").is_err());
    }
}
