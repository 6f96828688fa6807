use std::fmt;

/// Independently metered power domains of the SoC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerDomain {
	/// CPU clusters
	Cpu,
	/// Graphics
	Gpu,
	/// Neural accelerator
	Ane,
	/// Memory
	Ram,
	/// Memory traffic attributed to the GPU
	GpuRam,
	/// Package-level channel ("all" of the compute domains)
	All,
	/// Whole-system channel
	Sys,
}

impl PowerDomain {
	pub const COUNT: usize = 7;

	pub const ALL: [PowerDomain; PowerDomain::COUNT] = [
		PowerDomain::Cpu,
		PowerDomain::Gpu,
		PowerDomain::Ane,
		PowerDomain::Ram,
		PowerDomain::GpuRam,
		PowerDomain::All,
		PowerDomain::Sys,
	];

	pub const fn index(self) -> usize {
		self as usize
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			PowerDomain::Cpu => "cpu",
			PowerDomain::Gpu => "gpu",
			PowerDomain::Ane => "ane",
			PowerDomain::Ram => "ram",
			PowerDomain::GpuRam => "gpu_ram",
			PowerDomain::All => "all",
			PowerDomain::Sys => "sys",
		}
	}
}

impl fmt::Display for PowerDomain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Point-in-time cumulative energy readings, in joules, per power domain.
///
/// A domain the backend does not meter is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyReadings {
	joules: [Option<f64>; PowerDomain::COUNT],
}

impl EnergyReadings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, domain: PowerDomain, joules: f64) -> Self {
		self.set(domain, joules);
		self
	}

	pub fn set(&mut self, domain: PowerDomain, joules: f64) {
		self.joules[domain.index()] = Some(joules);
	}

	/// Adds to a domain, starting it at zero if unmetered so far
	pub fn accumulate(&mut self, domain: PowerDomain, joules: f64) {
		let slot = &mut self.joules[domain.index()];
		*slot = Some(slot.unwrap_or(0.0) + joules);
	}

	pub fn get(&self, domain: PowerDomain) -> Option<f64> {
		self.joules[domain.index()]
	}

	pub fn is_metered(&self, domain: PowerDomain) -> bool {
		self.get(domain).is_some()
	}

	pub fn metered(&self) -> impl Iterator<Item = PowerDomain> + '_ {
		PowerDomain::ALL.into_iter().filter(|d| self.is_metered(*d))
	}
}
