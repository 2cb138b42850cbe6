// ── Counter rate helpers ──

/// Per-second rate between two cumulative counter readings.
///
/// Returns `0.0` when the counter went backwards (device reboot or
/// counter wrap) or when the interval is not positive. Never negative.
#[allow(clippy::cast_precision_loss)]
pub fn calculate_rate(current: u64, previous: u64, interval_secs: f64) -> f64 {
    if interval_secs.is_nan() || interval_secs <= 0.0 {
        return 0.0;
    }
    match current.checked_sub(previous) {
        Some(delta) => delta as f64 / interval_secs,
        None => 0.0,
    }
}
