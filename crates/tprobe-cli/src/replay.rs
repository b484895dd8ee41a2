//! `tprobe replay`.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use tprobe_core::{Emitter, OutputFormat, SessionBuilder, SessionConfig};
use tprobe_host::{replay, HitTrace, ReplayOptions};
use tracing::debug;

pub struct ReplayArgs {
    pub definition: PathBuf,
    pub trace: PathBuf,
    pub config: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub concurrent: bool,
    pub keep_going: bool,
}

pub fn run_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(output) = args.output {
        config.output.path = Some(output);
    }

    let text = std::fs::read_to_string(&args.definition)
        .with_context(|| format!("failed to read {}", args.definition.display()))?;
    let trace = HitTrace::load(&args.trace)?;

    let format = config.output.format;
    let emitter = match &config.output.path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Emitter::new(format, BufWriter::new(file))
        }
        None => Emitter::stdout(format),
    };

    let mut builder = SessionBuilder::new(config);
    let count = builder
        .load_definition(&text)
        .with_context(|| format!("{}", args.definition.display()))?;
    debug!(probes = count, hits = trace.len(), "replaying trace");

    let session = builder.arm(emitter);
    let summary = replay(
        &session,
        &trace,
        ReplayOptions {
            concurrent: args.concurrent,
            keep_going: args.keep_going,
        },
    );
    session.tear_down();

    let dispatch = session.dispatch_stats();
    let emitted = session.emitter_stats();
    eprintln!(
        "hits: {}, probes fired: {}, skipped: {}, condition failures: {}, halts: {}, records: {}, sink failures: {}",
        dispatch.hits,
        dispatch.probes_fired,
        dispatch.probes_skipped,
        dispatch.condition_failures,
        dispatch.halts,
        emitted.records_emitted,
        emitted.sink_write_failures
    );
    if summary.hits_skipped > 0 {
        eprintln!(
            "{} hit(s) not replayed after halt (use --keep-going to continue)",
            summary.hits_skipped
        );
    }
    Ok(())
}
