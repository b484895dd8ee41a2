//! Drive a session with recorded hits.

use std::panic;
use std::thread;

use tprobe_core::{ContinuationDecision, Session};
use tracing::{debug, info, warn};

use crate::trace::{HitTrace, RecordedHit};

/// How a trace is fed to a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Replay each recorded thread on its own OS thread.
    pub concurrent: bool,
    /// Keep replaying a thread after a halt decision.
    pub keep_going: bool,
}

/// What a replay delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Hits handed to the session.
    pub hits_delivered: u64,
    /// Recorded hits never delivered because their thread halted.
    pub hits_skipped: u64,
    /// Recorded threads that stopped on a halt.
    pub threads_halted: u64,
}

impl ReplaySummary {
    fn merge(&mut self, other: Self) {
        self.hits_delivered += other.hits_delivered;
        self.hits_skipped += other.hits_skipped;
        self.threads_halted += other.threads_halted;
    }
}

/// Replay `trace` through `session`.
///
/// Hits of one recorded thread are delivered in trace order. Without
/// `keep_going`, a thread's remaining hits are dropped after the session
/// answers one of them with a halt. A panic on a replay thread is resumed on
/// the caller once every thread has finished.
pub fn replay(session: &Session, trace: &HitTrace, options: ReplayOptions) -> ReplaySummary {
    let threads = trace.by_thread();
    let mut summary = ReplaySummary::default();
    if options.concurrent && threads.len() > 1 {
        let results = thread::scope(|scope| {
            let handles: Vec<_> = threads
                .values()
                .map(|hits| scope.spawn(move || replay_thread(session, hits, options.keep_going)))
                .collect();
            let joined: Vec<_> = handles.into_iter().map(thread::ScopedJoinHandle::join).collect();
            joined
                .into_iter()
                .map(|result| {
                    result.unwrap_or_else(|payload| {
                        warn!("replay thread panicked");
                        panic::resume_unwind(payload)
                    })
                })
                .collect::<Vec<_>>()
        });
        for result in results {
            summary.merge(result);
        }
    } else {
        for hits in threads.values() {
            summary.merge(replay_thread(session, hits, options.keep_going));
        }
    }
    info!(
        delivered = summary.hits_delivered,
        skipped = summary.hits_skipped,
        halted = summary.threads_halted,
        "replay finished"
    );
    summary
}

fn replay_thread(session: &Session, hits: &[&RecordedHit], keep_going: bool) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    let mut halted = false;
    for (index, hit) in hits.iter().enumerate() {
        let mut frame = hit.frame.clone();
        summary.hits_delivered += 1;
        if session.on_hit(&hit.location, &mut frame) == ContinuationDecision::Halt {
            halted = true;
            debug!(thread = hit.thread, line = hit.line, location = %hit.location, "halt");
            if !keep_going {
                summary.hits_skipped = (hits.len() - index - 1) as u64;
                break;
            }
        }
    }
    if halted {
        summary.threads_halted = 1;
    }
    summary
}
