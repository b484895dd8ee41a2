mod common;

use std::sync::Arc;

use common::StubFrame;
use smol_str::SmolStr;
use tprobe_core::{
    parse_record_line, CapturedValue, ContextAccessor, ContinuationDecision, ContinuationPolicy,
    DeriveOp, Derivation, Dispatcher, Emitter, Location, MemorySink, OutputFormat, Probe,
    ProbeError, ProbeRegistry, ReadSpec, RenderedValue, Value, CONDITION_LABEL,
};

fn probe(label: &str, policy: ContinuationPolicy) -> Probe {
    Probe::builder()
        .name(label)
        .read(ReadSpec::variable("x").labelled(label))
        .policy(policy)
        .build()
        .unwrap()
}

fn dispatcher(registry: ProbeRegistry) -> (Dispatcher, MemorySink) {
    let sink = MemorySink::new();
    let emitter = Emitter::new(OutputFormat::Text, sink.clone());
    (Dispatcher::new(Arc::new(registry), Arc::new(emitter)), sink)
}

#[test]
fn hit_without_probes_resumes_silently() {
    let mut registry = ProbeRegistry::new();
    registry.register(
        Location::source("a.cpp", 1),
        probe("x", ContinuationPolicy::AlwaysHalt),
    );
    let (dispatcher, sink) = dispatcher(registry);

    let mut frame = StubFrame::new();
    let decision = dispatcher.on_hit(&Location::source("a.cpp", 2), &mut frame);

    assert_eq!(decision, ContinuationDecision::Resume);
    assert!(sink.lines().is_empty());
    assert!(frame.reads.is_empty());
    assert_eq!(dispatcher.emitter().stats().records_emitted, 0);
}

#[test]
fn probes_emit_once_each_in_registration_order() {
    let here = Location::source("Algorithms.cpp", 120);
    let mut registry = ProbeRegistry::new();
    for label in ["p1", "p2", "p3"] {
        registry.register(here.clone(), probe(label, ContinuationPolicy::AlwaysResume));
    }
    let (dispatcher, sink) = dispatcher(registry);

    let mut frame = StubFrame::new().var("x", Value::Int(5));
    dispatcher.on_hit(&here, &mut frame);

    let labels: Vec<String> = sink
        .lines()
        .iter()
        .map(|line| parse_record_line(line).unwrap().entries[0].0.to_string())
        .collect();
    assert_eq!(labels, ["p1", "p2", "p3"]);
    assert_eq!(dispatcher.stats().probes_fired, 3);
}

#[test]
fn halt_wins_regardless_of_order() {
    for policies in [
        [ContinuationPolicy::AlwaysResume, ContinuationPolicy::AlwaysHalt],
        [ContinuationPolicy::AlwaysHalt, ContinuationPolicy::AlwaysResume],
    ] {
        let here = Location::symbol("optimalSegmentation", 0);
        let mut registry = ProbeRegistry::new();
        registry.register(here.clone(), probe("p1", policies[0]));
        registry.register(here.clone(), probe("p2", policies[1]));
        let (dispatcher, sink) = dispatcher(registry);

        let mut frame = StubFrame::new().var("x", Value::Int(1));
        assert_eq!(dispatcher.on_hit(&here, &mut frame), ContinuationDecision::Halt);
        // The halting probe does not suppress its neighbour's output.
        assert_eq!(sink.lines().len(), 2);
        assert_eq!(dispatcher.stats().halts, 1);
    }
}

#[test]
fn failed_read_does_not_stop_later_reads_or_probes() {
    let here = Location::source("BaseSegmentation.cpp", 88);
    let mut registry = ProbeRegistry::new();
    registry.register(
        here.clone(),
        Probe::builder()
            .read(ReadSpec::variable("missing"))
            .read(ReadSpec::expression("this -> mid").labelled("Curr_mid"))
            .read(ReadSpec::variable("currSplitCost").labelled("Cost"))
            .build()
            .unwrap(),
    );
    registry.register(here.clone(), probe("after", ContinuationPolicy::AlwaysResume));
    let (dispatcher, sink) = dispatcher(registry);

    let mut frame = StubFrame::new()
        .var("currSplitCost", Value::Float(0.75))
        .var("x", Value::Int(9))
        .failing_expr("this -> mid", "null pointer dereference");
    let decision = dispatcher.on_hit(&here, &mut frame);

    assert_eq!(decision, ContinuationDecision::Resume);
    assert_eq!(frame.reads, ["missing", "this -> mid", "currSplitCost", "x"]);
    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    let first = parse_record_line(&lines[0]).unwrap();
    assert_eq!(
        first.entries,
        [
            (
                SmolStr::new("missing"),
                RenderedValue::Error("name not found 'missing'".to_string())
            ),
            (
                SmolStr::new("Curr_mid"),
                RenderedValue::Error(
                    "evaluation of 'this -> mid' failed: null pointer dereference".to_string()
                )
            ),
            (SmolStr::new("Cost"), RenderedValue::Text("0.75".to_string())),
        ]
    );
    assert_eq!(lines[1], "[BaseSegmentation.cpp:88] after: 9");
}

#[test]
fn resume_unless_error_halts_on_failed_read() {
    let here = Location::source("a.cpp", 3);
    let mut registry = ProbeRegistry::new();
    registry.register(
        here.clone(),
        probe("x", ContinuationPolicy::ResumeUnlessError),
    );
    let (dispatcher, _sink) = dispatcher(registry);

    let mut ok = StubFrame::new().var("x", Value::Int(1));
    assert_eq!(dispatcher.on_hit(&here, &mut ok), ContinuationDecision::Resume);
    let mut missing = StubFrame::new();
    assert_eq!(dispatcher.on_hit(&here, &mut missing), ContinuationDecision::Halt);
}

#[test]
fn sum_of_two_reads() {
    let probe = Probe::builder()
        .read(ReadSpec::variable("first").labelled("First"))
        .read(ReadSpec::variable("second").labelled("Second"))
        .derive(Derivation::new(DeriveOp::Sum, "First", "Second"))
        .build()
        .unwrap();

    let mut frame = StubFrame::new()
        .var("first", Value::Int(3))
        .var("second", Value::Int(4));
    let (record, decision) = probe.fire(&mut frame);
    assert_eq!(decision, ContinuationDecision::Resume);
    assert_eq!(record.get("Sum"), Some(&CapturedValue::captured(Value::Int(7))));
    assert_eq!(
        tprobe_core::render_text(&Location::source("Segment.cpp", 40), &record),
        "[Segment.cpp:40] First: 3, Second: 4, Sum: 7"
    );
}

#[test]
fn derivation_over_failed_input_is_recorded() {
    let probe = Probe::builder()
        .read(ReadSpec::variable("first").labelled("First"))
        .read(ReadSpec::variable("second").labelled("Second"))
        .derive(Derivation::new(DeriveOp::Sum, "First", "Second"))
        .build()
        .unwrap();

    let mut frame = StubFrame::new().var("first", Value::Int(3));
    let (record, decision) = probe.fire(&mut frame);
    assert_eq!(decision, ContinuationDecision::Resume);
    assert_eq!(record.len(), 3);
    assert_eq!(
        record.get("Sum").and_then(CapturedValue::error),
        Some(&ProbeError::DerivationError("input 'Second' failed".into()))
    );
}

#[test]
fn condition_gates_firing() {
    let here = Location::source("Cumsum.cpp", 12);
    let mut registry = ProbeRegistry::new();
    registry.register(
        here.clone(),
        Probe::builder()
            .read(ReadSpec::variable("x"))
            .when("x > 2")
            .policy(ContinuationPolicy::AlwaysHalt)
            .build()
            .unwrap(),
    );
    let (dispatcher, sink) = dispatcher(registry);

    let mut quiet = StubFrame::new()
        .var("x", Value::Int(1))
        .expr("x > 2", Value::Bool(false));
    assert_eq!(dispatcher.on_hit(&here, &mut quiet), ContinuationDecision::Resume);

    let mut broken = StubFrame::new().failing_expr("x > 2", "syntax error");
    assert_eq!(dispatcher.on_hit(&here, &mut broken), ContinuationDecision::Halt);
    assert!(broken.reads.iter().all(|read| read != "x"));

    let mut loud = StubFrame::new()
        .var("x", Value::Int(3))
        .expr("x > 2", Value::Bool(true));
    assert_eq!(dispatcher.on_hit(&here, &mut loud), ContinuationDecision::Halt);

    assert_eq!(
        sink.lines(),
        [
            "[Cumsum.cpp:12] when: <error: evaluation of 'x \\> 2' failed: syntax error>",
            "[Cumsum.cpp:12] x: 3",
        ]
    );
    let stats = dispatcher.stats();
    assert_eq!(
        (stats.hits, stats.probes_fired, stats.probes_skipped, stats.condition_failures),
        (3, 1, 1, 1)
    );
}

#[test]
fn failed_condition_is_reported_and_policy_decides() {
    let here = Location::source("Segment.cpp", 52);
    let mut registry = ProbeRegistry::new();
    registry.register(
        here.clone(),
        Probe::builder()
            .read(ReadSpec::variable("len"))
            .when("this -> ok")
            .policy(ContinuationPolicy::ResumeUnlessError)
            .build()
            .unwrap(),
    );
    registry.register(here.clone(), probe("x", ContinuationPolicy::AlwaysResume));
    let (dispatcher, sink) = dispatcher(registry);

    let mut frame = StubFrame::new()
        .var("len", Value::Int(2))
        .var("x", Value::Int(1))
        .failing_expr("this -> ok", "null pointer dereference");
    assert_eq!(dispatcher.on_hit(&here, &mut frame), ContinuationDecision::Halt);
    assert_eq!(frame.reads, ["this -> ok", "x"]);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    let failure = parse_record_line(&lines[0]).unwrap();
    assert_eq!(
        failure.entries,
        [(
            SmolStr::new(CONDITION_LABEL),
            RenderedValue::Error(
                "evaluation of 'this -> ok' failed: null pointer dereference".to_string()
            )
        )]
    );
    assert_eq!(lines[1], "[Segment.cpp:52] x: 1");
}

/// Accessor noting how many records were already written when each read ran.
struct SinkWatcher {
    sink: MemorySink,
    lines_at_read: Vec<usize>,
}

impl ContextAccessor for SinkWatcher {
    fn read_variable(&mut self, _name: &str) -> Result<Value, ProbeError> {
        self.lines_at_read.push(self.sink.lines().len());
        Ok(Value::Int(1))
    }

    fn evaluate_expression(&mut self, expr: &str) -> Result<Value, ProbeError> {
        Err(ProbeError::evaluation(expr, "not supported"))
    }
}

#[test]
fn each_record_is_written_before_next_probe_reads() {
    let here = Location::source("Algorithms.cpp", 120);
    let mut registry = ProbeRegistry::new();
    registry.register(here.clone(), probe("p1", ContinuationPolicy::AlwaysResume));
    registry.register(here.clone(), probe("p2", ContinuationPolicy::AlwaysResume));
    let (dispatcher, sink) = dispatcher(registry);

    let mut watcher = SinkWatcher {
        sink: sink.clone(),
        lines_at_read: Vec::new(),
    };
    dispatcher.on_hit(&here, &mut watcher);

    assert_eq!(watcher.lines_at_read, [0, 1]);
    assert_eq!(sink.lines().len(), 2);
}
