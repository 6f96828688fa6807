use std::time::Duration;

/// Converts two cumulative energy readings (joules) into average watts.
///
/// Yields 0 when either side is unmetered, when no time elapsed, or when
/// the counter went backwards (reset or wraparound).
pub fn watts(prev_joules: Option<f64>, now_joules: Option<f64>, elapsed: Duration) -> f32 {
	let (Some(prev), Some(now)) = (prev_joules, now_joules) else {
		return 0.0;
	};
	let secs = elapsed.as_secs_f64();
	if secs <= 0.0 {
		return 0.0;
	}

	let delta = now - prev;
	if !delta.is_finite() || delta <= 0.0 {
		return 0.0;
	}
	(delta / secs) as f32
}

/// Division that yields 0 for a zero or non-finite denominator
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
	if denominator == 0.0 || !denominator.is_finite() {
		return 0.0;
	}
	let value = numerator / denominator;
	if value.is_finite() { value } else { 0.0 }
}
