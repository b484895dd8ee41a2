use expect_test::expect;
use tprobe_core::{Emitter, MemorySink, OutputFormat, SessionBuilder, SessionConfig};
use tprobe_host::{replay, HitTrace, ReplayOptions, ReplaySummary};

const DEFINITION: &str = "\
# midpoint checks
probe Segment.cpp:40 mid
  read first
  read second
  eval this -> mid as Mid
  derive sum first second
DONE
probe Segment.cpp:52 stop-on-empty
  read len
  when len == 0
  policy halt
DONE
";

const TRACE: &str = r#"
{"location": "Segment.cpp:40", "frame": {"first": 3, "second": 4, "this": {"$ptr": "0x1000", "$target": {"$type": "Segment", "mid": 7}}}}
{"location": "Segment.cpp:52", "frame": {"len": 2}}
{"location": "Segment.cpp:40", "frame": {"first": 1, "this": {"$ptr": 0}}}
{"location": "Segment.cpp:52", "frame": {"len": 0}}
{"location": "Segment.cpp:40", "frame": {"first": 9, "second": 9}}
"#;

fn run(options: ReplayOptions) -> (Vec<String>, ReplaySummary) {
    let mut builder = SessionBuilder::new(SessionConfig::default());
    builder.load_definition(DEFINITION).unwrap();
    let sink = MemorySink::new();
    let session = builder.arm(Emitter::new(OutputFormat::Text, sink.clone()));
    let trace = HitTrace::parse(TRACE).unwrap();
    let summary = replay(&session, &trace, options);
    session.tear_down();
    (sink.lines(), summary)
}

#[test]
fn replay_stops_thread_at_halt() {
    let (lines, summary) = run(ReplayOptions::default());
    expect![[r#"
        [Segment.cpp:40] first: 3, second: 4, Mid: 7, Sum: 7
        [Segment.cpp:40] first: 1, second: <error: name not found 'second'>, Mid: <error: evaluation of 'this -\> mid' failed: null pointer dereference>, Sum: <error: derivation failed: input 'second' failed>
        [Segment.cpp:52] len: 0"#]]
    .assert_eq(&lines.join("\n"));
    assert_eq!(
        summary,
        ReplaySummary {
            hits_delivered: 4,
            hits_skipped: 1,
            threads_halted: 1,
        }
    );
}

#[test]
fn keep_going_delivers_every_hit() {
    let (lines, summary) = run(ReplayOptions {
        keep_going: true,
        ..ReplayOptions::default()
    });
    assert_eq!(lines.len(), 4);
    assert_eq!(summary.hits_delivered, 5);
    assert_eq!(summary.hits_skipped, 0);
    assert_eq!(summary.threads_halted, 1);
}

#[test]
fn concurrent_threads_replay_independently() {
    let trace = HitTrace::parse(concat!(
        "{\"location\": \"Segment.cpp:52\", \"thread\": 1, \"frame\": {\"len\": 0}}\n",
        "{\"location\": \"Segment.cpp:52\", \"thread\": 2, \"frame\": {\"len\": 5}}\n",
        "{\"location\": \"Segment.cpp:52\", \"thread\": 1, \"frame\": {\"len\": 0}}\n",
        "{\"location\": \"Segment.cpp:52\", \"thread\": 2, \"frame\": {\"len\": 0}}\n",
    ))
    .unwrap();
    let mut builder = SessionBuilder::new(SessionConfig::default());
    builder.load_definition(DEFINITION).unwrap();
    let sink = MemorySink::new();
    let session = builder.arm(Emitter::new(OutputFormat::Json, sink.clone()));
    let summary = replay(
        &session,
        &trace,
        ReplayOptions {
            concurrent: true,
            keep_going: false,
        },
    );
    assert_eq!(summary.hits_delivered, 3);
    assert_eq!(summary.hits_skipped, 1);
    assert_eq!(summary.threads_halted, 2);
    assert_eq!(sink.lines().len(), 2);
    assert_eq!(session.dispatch_stats().halts, 2);
}

struct ExplodingSink;

impl std::io::Write for ExplodingSink {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        panic!("sink exploded")
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
#[should_panic(expected = "sink exploded")]
fn panicking_replay_thread_reaches_caller() {
    let trace = HitTrace::parse(concat!(
        "{\"location\": \"Segment.cpp:52\", \"thread\": 1, \"frame\": {\"len\": 0}}\n",
        "{\"location\": \"Segment.cpp:52\", \"thread\": 2, \"frame\": {\"len\": 0}}\n",
    ))
    .unwrap();
    let mut builder = SessionBuilder::new(SessionConfig::default());
    builder.load_definition(DEFINITION).unwrap();
    let session = builder.arm(Emitter::new(OutputFormat::Text, ExplodingSink));
    replay(
        &session,
        &trace,
        ReplayOptions {
            concurrent: true,
            keep_going: true,
        },
    );
}
