pub mod linux;

use std::fmt::Debug;
use std::io;

use crate::config::SamplerConfig;
use crate::energy::EnergyReadings;
use crate::error::{Result, SamplerError};
use crate::metrics::Memory;
use crate::topology::{Cluster, SocInfo};

/// Which die a temperature sensor sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
	Cpu,
	Gpu,
}

/// One raw temperature reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
	pub kind: SensorKind,
	pub celsius: f32,
}

/// Cumulative activity counters of one core.
///
/// `active` counts busy ticks and `total` counts elapsed-equivalent ticks in
/// the same unit, so the busy fraction over an interval is
/// `Δactive / Δtotal`. `freq_mhz` is the instantaneous frequency, 0 when the
/// core reports none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreCounters {
	pub active: u64,
	pub total: u64,
	pub freq_mhz: u32,
}

/// Everything a single poll of the telemetry source yields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSample {
	pub temperatures: Vec<SensorReading>,
	pub energy: EnergyReadings,
	/// Per cluster, indexed by [`Cluster::index`], one entry per core
	pub clusters: [Vec<CoreCounters>; 3],
	pub memory: Memory,
}

impl RawSample {
	pub fn cores(&self, cluster: Cluster) -> &[CoreCounters] {
		&self.clusters[cluster.index()]
	}

	pub fn set_cores(&mut self, cluster: Cluster, cores: Vec<CoreCounters>) {
		self.clusters[cluster.index()] = cores;
	}
}

/// Platform backend the sampler polls.
///
/// Implementations own their OS resources; dropping the source releases
/// them.
pub trait TelemetrySource: Debug + Send {
	/// Short backend name for logs
	fn name(&self) -> &'static str;

	/// Static topology; core counts must match the per-core entries of every poll
	fn topology(&self) -> io::Result<SocInfo>;

	/// Reads every raw counter once.
	///
	/// Energy counters are read last; the sampler timestamps the poll when it
	/// returns, so energy and elapsed time cover the same interval.
	fn poll(&mut self) -> io::Result<RawSample>;
}

/// Opens the telemetry source for the running platform
pub fn open_source(config: &SamplerConfig) -> Result<Box<dyn TelemetrySource>> {
	let source =
		linux::LinuxSource::open(config).map_err(|e| SamplerError::unavailable("opening linux telemetry", e))?;
	Ok(Box::new(source))
}
