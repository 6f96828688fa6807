//! Telemetry sampler for heterogeneous SoCs.
//!
//! [`get_soc_info`] describes the chip: efficiency, performance and GPU
//! clusters with their core counts and frequency steps. A [`Sampler`] polls
//! the platform's counters and turns consecutive polls into a [`Metrics`]
//! snapshot of temperatures, memory, per-cluster usage and per-domain power.
//!
//! The same operations are exported over a C ABI from [`ffi`].

pub mod bounded;
pub(crate) mod builder;
pub mod config;
pub mod constants;
pub mod cpu_type;
pub mod display;
pub mod energy;
pub mod error;
pub mod ffi;
pub mod meter;
pub mod metrics;
pub mod power;
pub mod sampler;
pub mod source;
pub mod topology;
pub mod util;

pub use bounded::{FixedStr, FreqTable};
pub use config::{EnergyBackend, SamplerConfig};
pub use energy::{EnergyReadings, PowerDomain};
pub use error::{Result, SamplerError};
pub use metrics::{Memory, Metrics, Temperature, Usage};
pub use sampler::{Clock, MonotonicClock, Sampler};
pub use source::{CoreCounters, RawSample, SensorKind, SensorReading, TelemetrySource};
pub use topology::{Cluster, SocInfo};

/// Detects the topology of the running chip.
///
/// Independent of any sampler; calling it repeatedly returns the same
/// descriptor. An invalid environment fails here exactly as it fails
/// [`open_sampler`].
pub fn get_soc_info() -> Result<SocInfo> {
	SocInfo::detect(&SamplerConfig::from_env()?)
}

/// Opens a sampler configured from the environment
pub fn open_sampler() -> Result<Sampler> {
	Sampler::new()
}
