//! Probe definitions and firing.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::accessor::ContextAccessor;
use crate::error::ProbeError;
use crate::record::DiagnosticRecord;
use crate::value::{CapturedValue, Value};

/// Label of the entry reporting a condition that failed to evaluate.
pub const CONDITION_LABEL: &str = "when";

/// One read step of a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadSpec {
    /// Named variable lookup in the current frame.
    Variable { name: SmolStr, label: SmolStr },
    /// Expression evaluated in the current frame.
    Expression { text: SmolStr, label: SmolStr },
}

impl ReadSpec {
    /// Read a variable, labelled with its own name.
    #[must_use]
    pub fn variable(name: impl Into<SmolStr>) -> Self {
        let name = name.into();
        Self::Variable {
            label: name.clone(),
            name,
        }
    }

    /// Evaluate an expression, labelled with its text made label-safe.
    #[must_use]
    pub fn expression(text: impl Into<SmolStr>) -> Self {
        let text = text.into();
        Self::Expression {
            label: expression_label(&text),
            text,
        }
    }

    /// Replace the label.
    #[must_use]
    pub fn labelled(self, label: impl Into<SmolStr>) -> Self {
        let label = label.into();
        match self {
            Self::Variable { name, .. } => Self::Variable { name, label },
            Self::Expression { text, .. } => Self::Expression { text, label },
        }
    }

    #[must_use]
    pub fn label(&self) -> &SmolStr {
        match self {
            Self::Variable { label, .. } | Self::Expression { label, .. } => label,
        }
    }

    fn read(&self, ctx: &mut dyn ContextAccessor) -> CapturedValue {
        match self {
            Self::Variable { name, .. } => ctx.read_variable(name).into(),
            Self::Expression { text, .. } => ctx.evaluate_expression(text).into(),
        }
    }
}

/// Arithmetic used to combine two captured values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeriveOp {
    Sum,
    Difference,
    Product,
}

impl DeriveOp {
    /// Label used when the definition does not name the derived entry.
    #[must_use]
    pub fn default_label(self) -> &'static str {
        match self {
            DeriveOp::Sum => "Sum",
            DeriveOp::Difference => "Difference",
            DeriveOp::Product => "Product",
        }
    }

    fn apply(self, left: &Value, right: &Value) -> Result<Value, ProbeError> {
        let overflow = || ProbeError::DerivationError(format!("{self} overflowed").into());
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => {
                let result = match self {
                    DeriveOp::Sum => a.checked_add(*b),
                    DeriveOp::Difference => a.checked_sub(*b),
                    DeriveOp::Product => a.checked_mul(*b),
                };
                result.map(Value::Int).ok_or_else(overflow)
            }
            (a, b) => {
                let (Some(a), Some(b)) = (as_float(a), as_float(b)) else {
                    return Err(ProbeError::DerivationError(
                        format!(
                            "cannot {self} {} and {}",
                            left.type_name(),
                            right.type_name()
                        )
                        .into(),
                    ));
                };
                let result = match self {
                    DeriveOp::Sum => a + b,
                    DeriveOp::Difference => a - b,
                    DeriveOp::Product => a * b,
                };
                if result.is_finite() {
                    Ok(Value::Float(result))
                } else {
                    Err(overflow())
                }
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(value) => Some(*value as f64),
        Value::Float(value) => Some(*value),
        _ => None,
    }
}

impl fmt::Display for DeriveOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeriveOp::Sum => "sum",
            DeriveOp::Difference => "difference",
            DeriveOp::Product => "product",
        })
    }
}

impl FromStr for DeriveOp {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Self::Sum),
            "difference" => Ok(Self::Difference),
            "product" => Ok(Self::Product),
            _ => Err(ProbeError::malformed(0, format!("unknown derivation '{s}'"))),
        }
    }
}

/// Derived value computed from two earlier entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub op: DeriveOp,
    pub left: SmolStr,
    pub right: SmolStr,
    pub label: SmolStr,
}

impl Derivation {
    /// Combine two labelled entries, naming the result after the operator.
    #[must_use]
    pub fn new(op: DeriveOp, left: impl Into<SmolStr>, right: impl Into<SmolStr>) -> Self {
        Self {
            op,
            left: left.into(),
            right: right.into(),
            label: op.default_label().into(),
        }
    }

    #[must_use]
    pub fn labelled(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    fn derive(&self, record: &DiagnosticRecord) -> CapturedValue {
        derive_input(record, &self.left)
            .and_then(|left| {
                let right = derive_input(record, &self.right)?;
                self.op.apply(left, right)
            })
            .into()
    }
}

fn derive_input<'r>(record: &'r DiagnosticRecord, label: &str) -> Result<&'r Value, ProbeError> {
    let entry = record
        .get(label)
        .ok_or_else(|| ProbeError::DerivationError(format!("input '{label}' missing").into()))?;
    entry
        .value()
        .ok_or_else(|| ProbeError::DerivationError(format!("input '{label}' failed").into()))
}

/// What the host should do once a probe has fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContinuationDecision {
    /// Continue the target process.
    #[default]
    Resume,
    /// Keep the target suspended for interactive inspection.
    Halt,
}

impl ContinuationDecision {
    /// Combine two decisions; a halt from either side wins.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        if self == Self::Halt || other == Self::Halt {
            Self::Halt
        } else {
            Self::Resume
        }
    }

    #[must_use]
    pub fn is_halt(self) -> bool {
        self == Self::Halt
    }
}

impl fmt::Display for ContinuationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resume => "resume",
            Self::Halt => "halt",
        })
    }
}

/// How a probe picks its continuation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContinuationPolicy {
    /// Resume regardless of read outcomes.
    #[default]
    AlwaysResume,
    /// Resume unless any entry of the record failed.
    ResumeUnlessError,
    /// Always keep the target suspended.
    AlwaysHalt,
}

impl ContinuationPolicy {
    /// Decision for a completed record.
    #[must_use]
    pub fn decide(self, record: &DiagnosticRecord) -> ContinuationDecision {
        match self {
            Self::AlwaysResume => ContinuationDecision::Resume,
            Self::ResumeUnlessError if record.has_failures() => ContinuationDecision::Halt,
            Self::ResumeUnlessError => ContinuationDecision::Resume,
            Self::AlwaysHalt => ContinuationDecision::Halt,
        }
    }
}

impl fmt::Display for ContinuationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlwaysResume => "resume",
            Self::ResumeUnlessError => "resume-unless-error",
            Self::AlwaysHalt => "halt",
        })
    }
}

impl FromStr for ContinuationPolicy {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resume" => Ok(Self::AlwaysResume),
            "resume-unless-error" => Ok(Self::ResumeUnlessError),
            "halt" => Ok(Self::AlwaysHalt),
            _ => Err(ProbeError::malformed(0, format!("unknown policy '{s}'"))),
        }
    }
}

/// Diagnostic unit bound to one location.
///
/// Built once at setup through [`ProbeBuilder`] and only fired afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    name: Option<SmolStr>,
    reads: Vec<ReadSpec>,
    derivation: Option<Derivation>,
    condition: Option<SmolStr>,
    policy: ContinuationPolicy,
}

impl Probe {
    #[must_use]
    pub fn builder() -> ProbeBuilder {
        ProbeBuilder::default()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn reads(&self) -> &[ReadSpec] {
        &self.reads
    }

    #[must_use]
    pub fn derivation(&self) -> Option<&Derivation> {
        self.derivation.as_ref()
    }

    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    #[must_use]
    pub fn policy(&self) -> ContinuationPolicy {
        self.policy
    }

    /// Evaluate the probe's condition, if any, in the suspended frame.
    pub fn condition_met(&self, ctx: &mut dyn ContextAccessor) -> Result<bool, ProbeError> {
        match &self.condition {
            None => Ok(true),
            Some(expr) => ctx.evaluate_expression(expr).map(|value| value.is_truthy()),
        }
    }

    /// Record for a hit whose condition could not be evaluated.
    ///
    /// The record holds a single failed entry labelled [`CONDITION_LABEL`];
    /// the probe's policy decides how to continue.
    #[must_use]
    pub fn condition_failure(&self, err: ProbeError) -> (DiagnosticRecord, ContinuationDecision) {
        let mut record = DiagnosticRecord::with_capacity(1);
        record.push(CONDITION_LABEL, CapturedValue::Failed(err));
        let decision = self.policy.decide(&record);
        (record, decision)
    }

    /// Run every read step, apply the derivation, and decide how to continue.
    ///
    /// Individual failures are recorded inline; firing itself never fails.
    pub fn fire(&self, ctx: &mut dyn ContextAccessor) -> (DiagnosticRecord, ContinuationDecision) {
        let mut record = DiagnosticRecord::with_capacity(
            self.reads.len() + usize::from(self.derivation.is_some()),
        );
        for spec in &self.reads {
            record.push(spec.label().clone(), spec.read(ctx));
        }
        if let Some(derivation) = &self.derivation {
            let derived = derivation.derive(&record);
            record.push(derivation.label.clone(), derived);
        }
        let decision = self.policy.decide(&record);
        (record, decision)
    }
}

/// Builder for [`Probe`].
#[derive(Debug, Clone, Default)]
pub struct ProbeBuilder {
    name: Option<SmolStr>,
    reads: Vec<ReadSpec>,
    derivation: Option<Derivation>,
    condition: Option<SmolStr>,
    policy: ContinuationPolicy,
}

impl ProbeBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn read(mut self, spec: ReadSpec) -> Self {
        self.reads.push(spec);
        self
    }

    #[must_use]
    pub fn derive(mut self, derivation: Derivation) -> Self {
        self.derivation = Some(derivation);
        self
    }

    #[must_use]
    pub fn when(mut self, condition: impl Into<SmolStr>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: ContinuationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate and freeze the probe.
    ///
    /// Errors are reported as [`ProbeError::MalformedProbeDefinition`] with
    /// line 0, since the probe did not come from a definition file.
    pub fn build(self) -> Result<Probe, ProbeError> {
        if self.reads.is_empty() {
            return Err(ProbeError::malformed(0, "probe has no reads"));
        }
        let mut labels: Vec<&SmolStr> = Vec::with_capacity(self.reads.len() + 1);
        let derived_label = self.derivation.as_ref().map(|derivation| &derivation.label);
        for label in self.reads.iter().map(ReadSpec::label).chain(derived_label) {
            validate_label(label).map_err(|reason| ProbeError::malformed(0, reason))?;
            if labels.contains(&label) {
                return Err(ProbeError::malformed(0, format!("duplicate label '{label}'")));
            }
            labels.push(label);
        }
        if let Some(derivation) = &self.derivation {
            for input in [&derivation.left, &derivation.right] {
                if !self.reads.iter().any(|spec| spec.label() == input) {
                    return Err(ProbeError::malformed(
                        0,
                        format!("derivation input '{input}' is not a read label"),
                    ));
                }
            }
        }
        Ok(Probe {
            name: self.name,
            reads: self.reads,
            derivation: self.derivation,
            condition: self.condition,
            policy: self.policy,
        })
    }
}

/// Default label for an expression: whitespace dropped, separators mapped
/// to `_`. `this -> mid` becomes `this->mid`.
pub(crate) fn expression_label(text: &str) -> SmolStr {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if matches!(c, ':' | ',' | '"') { '_' } else { c })
        .collect()
}

/// Labels are rendered unquoted, so they cannot contain record separators.
pub(crate) fn validate_label(label: &str) -> Result<(), String> {
    if label.is_empty() {
        return Err("empty label".to_string());
    }
    if label
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, ':' | ',' | '"'))
    {
        return Err(format!("label '{label}' contains whitespace, ':', ',' or '\"'"));
    }
    Ok(())
}
