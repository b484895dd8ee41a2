//! Session-definition parsing.
//!
//! A definition is a sequence of probe blocks, each closed by `DONE`:
//!
//! ```text
//! # cost and midpoint per iteration
//! probe Algorithms.cpp:120 segmentation-cost
//!   read currSplitCost as Cost
//!   eval this -> mid as Curr_mid
//!   policy resume
//! DONE
//! ```
//!
//! An `eval` without `as` is labelled with its expression, whitespace
//! removed and `:` `,` `"` replaced by `_`.

#![allow(missing_docs)]

use smol_str::SmolStr;

use crate::error::ProbeError;
use crate::location::Location;
use crate::probe::{
    expression_label, validate_label, ContinuationPolicy, DeriveOp, Derivation, Probe,
    ProbeBuilder, ReadSpec,
};

/// Terminator closing every probe block.
pub const TERMINATOR: &str = "DONE";

/// One parsed probe together with where it binds.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeDefinition {
    pub location: Location,
    pub probe: Probe,
    /// Line of the `probe` header.
    pub line: usize,
}

struct OpenProbe {
    line: usize,
    location: Location,
    builder: ProbeBuilder,
    labels: Vec<SmolStr>,
    has_reads: bool,
    has_derive: bool,
    has_condition: bool,
    has_policy: bool,
}

impl OpenProbe {
    fn add_label(&mut self, line: usize, label: &str) -> Result<SmolStr, ProbeError> {
        validate_label(label).map_err(|reason| ProbeError::malformed(line, reason))?;
        if self.labels.iter().any(|existing| existing == label) {
            return Err(ProbeError::malformed(
                line,
                format!("duplicate label '{label}'"),
            ));
        }
        let label = SmolStr::new(label);
        self.labels.push(label.clone());
        Ok(label)
    }
}

/// Parse a whole definition.
///
/// Either every probe parses or the call fails; a block still open at end of
/// input is an error.
pub fn parse_definition(
    text: &str,
    default_policy: ContinuationPolicy,
) -> Result<Vec<ProbeDefinition>, ProbeError> {
    let mut definitions = Vec::new();
    let mut open: Option<OpenProbe> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (directive, rest) = trimmed
            .split_once(char::is_whitespace)
            .map_or((trimmed, ""), |(directive, rest)| (directive, rest.trim()));

        if directive == TERMINATOR {
            if !rest.is_empty() {
                return Err(ProbeError::malformed(line, "unexpected text after DONE"));
            }
            let Some(probe) = open.take() else {
                return Err(ProbeError::malformed(line, "DONE without an open probe"));
            };
            if !probe.has_reads {
                return Err(ProbeError::malformed(line, "probe has no reads"));
            }
            let built = probe
                .builder
                .build()
                .map_err(|err| relocate(err, line))?;
            definitions.push(ProbeDefinition {
                location: probe.location,
                probe: built,
                line: probe.line,
            });
            continue;
        }

        if directive == "probe" {
            if let Some(previous) = &open {
                return Err(ProbeError::malformed(
                    line,
                    format!("missing DONE for probe opened at line {}", previous.line),
                ));
            }
            let (location, name) = rest
                .split_once(char::is_whitespace)
                .map_or((rest, None), |(location, name)| (location, Some(name.trim())));
            if location.is_empty() {
                return Err(ProbeError::malformed(line, "probe needs a location"));
            }
            let location = location
                .parse::<Location>()
                .map_err(|err| ProbeError::malformed(line, err.to_string()))?;
            let mut builder = Probe::builder().policy(default_policy);
            if let Some(name) = name {
                builder = builder.name(name);
            }
            open = Some(OpenProbe {
                line,
                location,
                builder,
                labels: Vec::new(),
                has_reads: false,
                has_derive: false,
                has_condition: false,
                has_policy: false,
            });
            continue;
        }

        let Some(probe) = open.as_mut() else {
            return Err(ProbeError::malformed(
                line,
                format!("'{directive}' outside a probe block"),
            ));
        };
        match directive {
            "read" => {
                let (name, label) = split_label(rest);
                if name.is_empty() || name.contains(char::is_whitespace) {
                    return Err(ProbeError::malformed(line, "read needs one variable name"));
                }
                let label = probe.add_label(line, label.unwrap_or(name))?;
                let spec = ReadSpec::variable(name).labelled(label);
                probe.builder = std::mem::take(&mut probe.builder).read(spec);
                probe.has_reads = true;
            }
            "eval" => {
                let (expr, label) = split_label(rest);
                if expr.is_empty() {
                    return Err(ProbeError::malformed(line, "eval needs an expression"));
                }
                let label = match label {
                    Some(label) => probe.add_label(line, label)?,
                    None => probe.add_label(line, &expression_label(expr))?,
                };
                let spec = ReadSpec::expression(expr).labelled(label);
                probe.builder = std::mem::take(&mut probe.builder).read(spec);
                probe.has_reads = true;
            }
            "derive" => {
                if probe.has_derive {
                    return Err(ProbeError::malformed(line, "only one derive per probe"));
                }
                let (operands, label) = split_label(rest);
                let parts: Vec<&str> = operands.split_whitespace().collect();
                let [op, left, right] = parts.as_slice() else {
                    return Err(ProbeError::malformed(
                        line,
                        "derive expects '<op> <label> <label>'",
                    ));
                };
                let op = op
                    .parse::<DeriveOp>()
                    .map_err(|err| relocate(err, line))?;
                for input in [left, right] {
                    if !probe.labels.iter().any(|existing| existing.as_str() == *input) {
                        return Err(ProbeError::malformed(
                            line,
                            format!("derive input '{input}' is not an earlier label"),
                        ));
                    }
                }
                let label = probe.add_label(line, label.unwrap_or(op.default_label()))?;
                let derivation = Derivation::new(op, *left, *right).labelled(label);
                probe.builder = std::mem::take(&mut probe.builder).derive(derivation);
                probe.has_derive = true;
            }
            "when" => {
                if probe.has_condition {
                    return Err(ProbeError::malformed(line, "only one when per probe"));
                }
                if rest.is_empty() {
                    return Err(ProbeError::malformed(line, "when needs an expression"));
                }
                probe.builder = std::mem::take(&mut probe.builder).when(rest);
                probe.has_condition = true;
            }
            "policy" => {
                if probe.has_policy {
                    return Err(ProbeError::malformed(line, "only one policy per probe"));
                }
                let policy = rest
                    .parse::<ContinuationPolicy>()
                    .map_err(|err| relocate(err, line))?;
                probe.builder = std::mem::take(&mut probe.builder).policy(policy);
                probe.has_policy = true;
            }
            other => {
                return Err(ProbeError::malformed(
                    line,
                    format!("unknown directive '{other}'"),
                ));
            }
        }
    }

    if let Some(probe) = open {
        return Err(ProbeError::malformed(
            probe.line,
            "probe is missing DONE before end of input",
        ));
    }
    Ok(definitions)
}

/// Split `<target> as <label>` on the last ` as `.
fn split_label(text: &str) -> (&str, Option<&str>) {
    match text.rsplit_once(" as ") {
        Some((target, label)) if !label.trim().is_empty() => (target.trim(), Some(label.trim())),
        _ => (text.trim(), None),
    }
}

fn relocate(err: ProbeError, line: usize) -> ProbeError {
    match err {
        ProbeError::MalformedProbeDefinition { reason, .. } => {
            ProbeError::MalformedProbeDefinition { line, reason }
        }
        other => ProbeError::malformed(line, other.to_string()),
    }
}
