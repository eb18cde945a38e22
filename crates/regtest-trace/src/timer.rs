//! Time formatting utilities

use std::time::{
    Duration,
    Instant,
};

/// Compact timer that shows the time elapsed since the sink was created
#[derive(Debug, Clone, Copy)]
pub(crate) struct CompactTimer {
    start: Instant,
}

impl CompactTimer {
    pub(crate) fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub(crate) fn elapsed(&self) -> String {
        format_elapsed(self.start.elapsed())
    }
}

/// Format as milliseconds, seconds or minutes depending on magnitude
/// (e.g. `" 56ms"`, `" 1.23s"`, `"2m05.00s"`)
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{:3}ms", millis)
    } else if millis < 60_000 {
        format!("{:5.2}s", millis as f64 / 1000.0)
    } else {
        let minutes = millis / 60_000;
        let remaining_ms = millis % 60_000;
        format!("{}m{:05.2}s", minutes, remaining_ms as f64 / 1000.0)
    }
}
