//! `tprobe check`.

use std::path::Path;

use anyhow::Context;
use tprobe_core::{Probe, ReadSpec, SessionBuilder, SessionConfig};

pub fn run_check(definition: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(definition)
        .with_context(|| format!("failed to read {}", definition.display()))?;
    let mut builder = SessionBuilder::new(SessionConfig::default());
    let count = builder
        .load_definition(&text)
        .with_context(|| format!("{}", definition.display()))?;
    let registry = builder.registry();
    println!("{count} probe(s) at {} location(s)", registry.location_count());
    for (location, probes) in registry.iter() {
        for probe in probes {
            println!("{location} {}", describe(probe));
        }
    }
    Ok(())
}

fn describe(probe: &Probe) -> String {
    let mut parts: Vec<String> = probe
        .reads()
        .iter()
        .map(|spec| match spec {
            ReadSpec::Variable { name, label } if name == label => name.to_string(),
            ReadSpec::Variable { name, label } => format!("{name} as {label}"),
            ReadSpec::Expression { text, label } => format!("eval({text}) as {label}"),
        })
        .collect();
    if let Some(derivation) = probe.derivation() {
        parts.push(format!(
            "{}({}, {}) as {}",
            derivation.op, derivation.left, derivation.right, derivation.label
        ));
    }
    let mut line = format!(
        "{} [{}]: {}",
        probe.name().unwrap_or("-"),
        probe.policy(),
        parts.join(", ")
    );
    if let Some(condition) = probe.condition() {
        line.push_str(" when ");
        line.push_str(condition);
    }
    line
}
