use std::fmt::Debug;
use std::thread;
use std::time::{Duration, Instant};

use crate::builder::{Baseline, build};
use crate::config::SamplerConfig;
use crate::error::{Result, SamplerError};
use crate::metrics::Metrics;
use crate::source::{TelemetrySource, open_source};
use crate::topology::SocInfo;

/// Time source for rate computation; timestamps are offsets from an origin
pub trait Clock: Debug + Send {
	fn now(&self) -> Duration;
}

/// Monotonic clock anchored when created
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
	origin: Instant,
}

impl MonotonicClock {
	pub fn new() -> Self {
		Self { origin: Instant::now() }
	}
}

impl Default for MonotonicClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for MonotonicClock {
	fn now(&self) -> Duration {
		self.origin.elapsed()
	}
}

/// Handle owning a telemetry source and the state needed to turn its
/// cumulative counters into rates.
///
/// `sample` takes `&mut self`, so calls on one sampler are serialized by the
/// borrow checker; share it across threads behind a `Mutex`. Separate
/// samplers share nothing.
///
/// [`Sampler::close`] releases the source early and may be called any number
/// of times; afterwards `sample` fails with [`SamplerError::InvalidHandle`].
/// Dropping the sampler closes it.
#[derive(Debug)]
pub struct Sampler {
	source: Option<Box<dyn TelemetrySource>>,
	clock: Box<dyn Clock>,
	topology: SocInfo,
	baseline: Option<Baseline>,
}

impl Sampler {
	/// Opens the platform backend configured from the environment
	pub fn new() -> Result<Self> {
		Self::with_config(&SamplerConfig::from_env()?)
	}

	pub fn with_config(config: &SamplerConfig) -> Result<Self> {
		Self::from_source(open_source(config)?)
	}

	/// Wraps an already opened source, caching its topology
	pub fn from_source(source: Box<dyn TelemetrySource>) -> Result<Self> {
		let topology = source
			.topology()
			.map_err(|e| SamplerError::unavailable(&format!("reading {} topology", source.name()), e))?;

		log::info!(
			"opened {} sampler for {} ({} E / {} P / {} GPU cores)",
			source.name(),
			topology.chip_name,
			topology.ecpu_cores,
			topology.pcpu_cores,
			topology.gpu_cores
		);

		Ok(Self {
			source: Some(source),
			clock: Box::new(MonotonicClock::new()),
			topology,
			baseline: None,
		})
	}

	/// Replaces the clock; any rate baseline taken with the old clock is dropped
	pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
		self.clock = clock;
		self.baseline = None;
		self
	}

	pub fn topology(&self) -> &SocInfo {
		&self.topology
	}

	pub fn is_closed(&self) -> bool {
		self.source.is_none()
	}

	/// Polls once and returns a snapshot of rates since the previous successful poll.
	///
	/// The first call after opening has no previous poll and reports 0 for every
	/// power and usage field. On failure the rate baseline is left as it was, so
	/// a retry measures from the last successful poll.
	pub fn sample(&mut self) -> Result<Metrics> {
		let source = self.source.as_mut().ok_or(SamplerError::InvalidHandle)?;

		let raw = source
			.poll()
			.map_err(|e| SamplerError::sample_failed(&format!("polling {}", source.name()), e))?;
		// Sources read energy last, so this timestamp brackets the energy counters
		let now = self.clock.now();

		let (metrics, baseline) = build(&self.topology, self.baseline.as_ref(), raw, now)?;
		self.baseline = Some(baseline);
		Ok(metrics)
	}

	/// Takes a baseline poll, waits `window`, and returns rates over that window
	pub fn sample_window(&mut self, window: Duration) -> Result<Metrics> {
		self.sample()?;
		thread::sleep(window);
		self.sample()
	}

	/// Releases the telemetry source. Safe to call more than once.
	pub fn close(&mut self) {
		if let Some(source) = self.source.take() {
			log::info!("closing {} sampler", source.name());
		}
		self.baseline = None;
	}
}

impl Drop for Sampler {
	fn drop(&mut self) {
		self.close();
	}
}
