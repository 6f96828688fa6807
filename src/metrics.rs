//! The snapshot returned by every successful sample.
//!
//! All types are `#[repr(C)]` plain values: a snapshot owns everything it
//! holds and keeps no reference to the sampler that produced it.

use crate::energy::PowerDomain;
use crate::topology::Cluster;

/// Average die temperatures in °C. 0 means no sensor reported.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Temperature {
	pub cpu_temp_avg: f32,
	pub gpu_temp_avg: f32,
}

/// Instantaneous memory occupancy in bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Memory {
	pub ram_total: u64,
	pub ram_usage: u64,
	pub swap_total: u64,
	pub swap_usage: u64,
}

/// Cluster activity: effective frequency in MHz and busy fraction in [0, 1]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Usage {
	pub frequency: u32,
	pub usage: f32,
}

/// One sampled snapshot. Power fields are watts.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
	pub temp: Temperature,
	pub memory: Memory,
	pub ecpu_usage: Usage,
	pub pcpu_usage: Usage,
	pub gpu_usage: Usage,
	pub cpu_power: f32,
	pub gpu_power: f32,
	pub ane_power: f32,
	pub all_power: f32,
	pub sys_power: f32,
	pub ram_power: f32,
	pub gpu_ram_power: f32,
}

impl Metrics {
	pub fn usage(&self, cluster: Cluster) -> Usage {
		match cluster {
			Cluster::Efficiency => self.ecpu_usage,
			Cluster::Performance => self.pcpu_usage,
			Cluster::Gpu => self.gpu_usage,
		}
	}

	pub(crate) fn usage_mut(&mut self, cluster: Cluster) -> &mut Usage {
		match cluster {
			Cluster::Efficiency => &mut self.ecpu_usage,
			Cluster::Performance => &mut self.pcpu_usage,
			Cluster::Gpu => &mut self.gpu_usage,
		}
	}

	pub fn power(&self, domain: PowerDomain) -> f32 {
		match domain {
			PowerDomain::Cpu => self.cpu_power,
			PowerDomain::Gpu => self.gpu_power,
			PowerDomain::Ane => self.ane_power,
			PowerDomain::Ram => self.ram_power,
			PowerDomain::GpuRam => self.gpu_ram_power,
			PowerDomain::All => self.all_power,
			PowerDomain::Sys => self.sys_power,
		}
	}

	pub(crate) fn power_mut(&mut self, domain: PowerDomain) -> &mut f32 {
		match domain {
			PowerDomain::Cpu => &mut self.cpu_power,
			PowerDomain::Gpu => &mut self.gpu_power,
			PowerDomain::Ane => &mut self.ane_power,
			PowerDomain::Ram => &mut self.ram_power,
			PowerDomain::GpuRam => &mut self.gpu_ram_power,
			PowerDomain::All => &mut self.all_power,
			PowerDomain::Sys => &mut self.sys_power,
		}
	}
}
