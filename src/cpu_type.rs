use std::collections::{HashMap, HashSet};
use std::fs;

use crate::config::SamplerConfig;
use crate::util::{parse_cpu_list, read_trimmed};

/// CPU vendors the sampler knows how to meter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuVendor {
	/// Intel CPU architecture
	Intel,
	/// AMD CPU architecture
	Amd,
	/// ARM SoCs (big.LITTLE / DynamIQ)
	Arm,
	/// Anything else
	Unsupported,
}

/// Represents the type of CPU core in hybrid architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreType {
	/// Performance core (P-core) - optimized for high performance
	PCore,
	/// Efficiency core (E-core) - optimized for power efficiency
	ECore,
	/// Unknown or standard core type (non-hybrid architecture)
	Unknown,
}

impl CoreType {
	/// Returns a human-readable string representation of the core type
	pub fn as_str(&self) -> &'static str {
		match self {
			CoreType::PCore => "P-core",
			CoreType::ECore => "E-core",
			CoreType::Unknown => "Core",
		}
	}
}

/// Detects the CPU vendor from `<procfs>/cpuinfo`
pub fn detect_cpu_vendor(config: &SamplerConfig) -> CpuVendor {
	let cpuinfo = fs::read_to_string(config.proc("cpuinfo")).unwrap_or_default();
	vendor_from_cpuinfo(&cpuinfo)
}

pub(crate) fn vendor_from_cpuinfo(cpuinfo: &str) -> CpuVendor {
	if cpuinfo.contains("GenuineIntel") {
		CpuVendor::Intel
	} else if cpuinfo.contains("AuthenticAMD") {
		CpuVendor::Amd
	} else if cpuinfo.contains("CPU implementer") {
		CpuVendor::Arm
	} else {
		CpuVendor::Unsupported
	}
}

/// Assigns a core type to every logical CPU in `cpu_ids`.
///
/// Sources are tried in order: the hybrid PMU cpu lists
/// (`devices/cpu_core/cpus`, `devices/cpu_atom/cpus`), then per-cpu
/// `cpu_capacity` (highest capacity is the performance cluster). CPUs
/// neither source can place are `Unknown`.
pub fn classify_cores(config: &SamplerConfig, cpu_ids: &[usize]) -> HashMap<usize, CoreType> {
	classify_from_hybrid_pmu(config, cpu_ids)
		.or_else(|| classify_from_capacity(config, cpu_ids))
		.unwrap_or_else(|| cpu_ids.iter().map(|&cpu_id| (cpu_id, CoreType::Unknown)).collect())
}

fn classify_from_hybrid_pmu(config: &SamplerConfig, cpu_ids: &[usize]) -> Option<HashMap<usize, CoreType>> {
	let pcores: HashSet<usize> = parse_cpu_list(&read_trimmed(&config.sys("devices/cpu_core/cpus")).ok()?)
		.into_iter()
		.collect();
	let ecores: HashSet<usize> = parse_cpu_list(&read_trimmed(&config.sys("devices/cpu_atom/cpus")).ok()?)
		.into_iter()
		.collect();

	Some(
		cpu_ids
			.iter()
			.map(|&cpu_id| {
				let core_type = if pcores.contains(&cpu_id) {
					CoreType::PCore
				} else if ecores.contains(&cpu_id) {
					CoreType::ECore
				} else {
					CoreType::Unknown
				};
				(cpu_id, core_type)
			})
			.collect(),
	)
}

fn classify_from_capacity(config: &SamplerConfig, cpu_ids: &[usize]) -> Option<HashMap<usize, CoreType>> {
	let mut capacities = HashMap::new();
	for &cpu_id in cpu_ids {
		let path = config.sys(&format!("devices/system/cpu/cpu{cpu_id}/cpu_capacity"));
		let capacity: u64 = read_trimmed(&path).ok()?.parse().ok()?;
		capacities.insert(cpu_id, capacity);
	}

	let max = capacities.values().copied().max()?;
	let distinct: HashSet<u64> = capacities.values().copied().collect();
	if distinct.len() < 2 {
		// Homogeneous cluster, capacity says nothing
		return None;
	}

	Some(
		capacities
			.into_iter()
			.map(|(cpu_id, capacity)| {
				let core_type = if capacity == max {
					CoreType::PCore
				} else {
					CoreType::ECore
				};
				(cpu_id, core_type)
			})
			.collect(),
	)
}
