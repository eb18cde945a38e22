use crate::status::Timing;
use std::time::Instant;

/// Run `step`, recording its wall-clock seconds under `key` whatever it returns.
pub fn time_step<T>(
    key: &str,
    timing: &mut Timing,
    step: impl FnOnce() -> T,
) -> T {
    let start = Instant::now();
    let out = step();
    let elapsed = start.elapsed().as_secs_f64();
    timing.insert(key.to_string(), elapsed);
    tracing::info!("Step '{}' took {:.3} seconds", key, elapsed);
    out
}
