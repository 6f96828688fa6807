pub mod amd;
pub mod intel;
pub mod powercap;

use std::fmt::Debug;
use std::io;

use crate::config::{EnergyBackend, SamplerConfig};
use crate::cpu_type::{CpuVendor, detect_cpu_vendor};
use crate::energy::EnergyReadings;

/// A source of cumulative per-domain energy counters
pub trait EnergyMeter: Debug + Send {
	/// Short backend name for logs
	fn name(&self) -> &'static str;

	/// Reads every metered domain, in joules.
	///
	/// Readings are running totals that only move backwards when the
	/// hardware counter was genuinely reset.
	fn read(&mut self) -> io::Result<EnergyReadings>;
}

/// Turns one hardware counter that wraps at `modulus` into a running total.
///
/// Each counter is unwrapped on its own before anything is summed, so a
/// single wrapping core cannot drag a summed domain backwards. Without a
/// modulus a decrease is a reset: the total holds and counting resumes from
/// the new raw value.
#[derive(Debug, Clone, Default)]
pub(crate) struct WrappingCounter {
	modulus: Option<u64>,
	last: Option<u64>,
	total: u64,
}

impl WrappingCounter {
	pub fn new(modulus: Option<u64>) -> Self {
		Self {
			modulus,
			last: None,
			total: 0,
		}
	}

	/// Counter for registers that wrap at 32 bits
	pub fn u32() -> Self {
		Self::new(Some(1 << 32))
	}

	/// Feeds a raw reading, returning the running total in raw units
	pub fn update(&mut self, raw: u64) -> u64 {
		let delta = match (self.last, self.modulus) {
			(None, _) => raw,
			(Some(last), _) if raw >= last => raw - last,
			(Some(last), Some(modulus)) if last < modulus => modulus - last + raw,
			(Some(last), _) => {
				log::warn!("energy counter reset ({last} -> {raw})");
				0
			},
		};
		self.last = Some(raw);
		self.total = self.total.saturating_add(delta);
		self.total
	}
}

/// Meter for platforms without energy counters; meters nothing
#[derive(Debug, Clone, Default)]
pub struct NullMeter;

impl EnergyMeter for NullMeter {
	fn name(&self) -> &'static str {
		"none"
	}

	fn read(&mut self) -> io::Result<EnergyReadings> {
		Ok(EnergyReadings::new())
	}
}

/// Opens the energy meter selected by `config`.
///
/// `core_threads` lists the logical CPUs of every physical core, used by
/// backends with per-core counters.
pub fn open_meter(config: &SamplerConfig, core_threads: &[Vec<usize>]) -> io::Result<Box<dyn EnergyMeter>> {
	match config.energy_backend {
		EnergyBackend::Powercap => Ok(Box::new(powercap::PowercapMeter::open(config)?)),
		EnergyBackend::Msr => open_msr_meter(config, core_threads),
		EnergyBackend::None => Ok(Box::new(NullMeter)),
		EnergyBackend::Auto => {
			let powercap_err = match powercap::PowercapMeter::open(config) {
				Ok(meter) => return Ok(Box::new(meter)),
				Err(e) => e,
			};
			match open_msr_meter(config, core_threads) {
				Ok(meter) => Ok(meter),
				Err(msr_err) => {
					log::warn!("no energy counters (powercap: {powercap_err}; msr: {msr_err}), power will read 0");
					Ok(Box::new(NullMeter))
				},
			}
		},
	}
}

fn open_msr_meter(config: &SamplerConfig, core_threads: &[Vec<usize>]) -> io::Result<Box<dyn EnergyMeter>> {
	// SAFETY: geteuid has no preconditions and cannot fail
	if unsafe { libc::geteuid() } != 0 {
		return Err(io::Error::new(
			io::ErrorKind::PermissionDenied,
			"reading RAPL MSRs requires root",
		));
	}

	match detect_cpu_vendor(config) {
		CpuVendor::Intel => Ok(Box::new(intel::IntelMeter::open()?)),
		CpuVendor::Amd => Ok(Box::new(amd::AmdMeter::open(core_threads)?)),
		vendor => Err(io::Error::new(
			io::ErrorKind::Unsupported,
			format!("no RAPL MSRs on {vendor:?} CPUs"),
		)),
	}
}
