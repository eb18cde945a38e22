//! Ambient logging context and the carrier used to move it across threads
//!
//! The active case and phase are ordinary `tracing` spans. Anything logged
//! while a [`case_span`] and a [`phase_span`] are entered is attributed to
//! them by the queue layer, so call sites never pass context around.
//!
//! Spans and the default dispatcher are thread-local. A thread spawned by a
//! producer starts with neither, so the producer captures a [`LogContext`]
//! before spawning and the worker re-enters it:
//!
//! ```no_run
//! use regtest_trace::LogContext;
//!
//! let ctx = LogContext::capture();
//! std::thread::spawn(move || {
//!     ctx.in_scope(|| tracing::debug!("attributed to the producer's case"));
//! });
//! ```

use tracing::{
    Dispatch,
    Span,
    dispatcher,
};

/// Span carrying the `test_id` of the case being processed
pub fn case_span(test_id: &str) -> Span {
    tracing::info_span!(target: "regtest::context", "case", test_id = %test_id)
}

/// Span carrying the name of the active pipeline phase
pub fn phase_span(phase: &str) -> Span {
    tracing::info_span!(target: "regtest::context", "phase", phase = %phase)
}

/// Snapshot of the producer's dispatcher and current span.
#[derive(Debug, Clone)]
pub struct LogContext {
    dispatch: Dispatch,
    span: Span,
}

impl LogContext {
    /// Capture the context of the calling thread.
    pub fn capture() -> Self {
        Self {
            dispatch: dispatcher::get_default(Dispatch::clone),
            span: Span::current(),
        }
    }

    /// Run `f` with the captured dispatcher as default and the captured span entered.
    pub fn in_scope<T>(
        &self,
        f: impl FnOnce() -> T,
    ) -> T {
        dispatcher::with_default(&self.dispatch, || self.span.in_scope(f))
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
