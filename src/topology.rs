use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::path::PathBuf;
use std::{fs, io};

use crate::bounded::{FixedStr, FreqTable};
use crate::config::SamplerConfig;
use crate::constants::NAME_CAPACITY;
use crate::cpu_type::{CoreType, classify_cores};
use crate::error::{Result, SamplerError};
use crate::util::mem::read_meminfo;
use crate::util::{read_trimmed, read_u64};

/// Compute clusters the sampler reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cluster {
	/// Efficiency CPU cores
	Efficiency,
	/// Performance CPU cores
	Performance,
	/// Graphics cores
	Gpu,
}

impl Cluster {
	pub const ALL: [Cluster; 3] = [Cluster::Efficiency, Cluster::Performance, Cluster::Gpu];

	pub const fn index(self) -> usize {
		self as usize
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Cluster::Efficiency => "E-CPU",
			Cluster::Performance => "P-CPU",
			Cluster::Gpu => "GPU",
		}
	}
}

/// Static description of the chip. Immutable once built.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct SocInfo {
	pub mac_model: FixedStr<NAME_CAPACITY>,
	pub chip_name: FixedStr<NAME_CAPACITY>,
	pub memory_gb: u8,
	pub ecpu_cores: u8,
	pub pcpu_cores: u8,
	pub gpu_cores: u8,
	pub ecpu_freqs: FreqTable,
	pub pcpu_freqs: FreqTable,
	pub gpu_freqs: FreqTable,
}

impl SocInfo {
	pub fn new(chip_name: &str, mac_model: &str, memory_gb: u8) -> Self {
		Self {
			mac_model: FixedStr::new(mac_model),
			chip_name: FixedStr::new(chip_name),
			memory_gb,
			..Self::default()
		}
	}

	/// Sets core count and frequency steps (MHz) for one cluster
	pub fn with_cluster(mut self, cluster: Cluster, cores: u8, freqs: &[u32]) -> Self {
		let table = FreqTable::from_slice(freqs);
		match cluster {
			Cluster::Efficiency => {
				self.ecpu_cores = cores;
				self.ecpu_freqs = table;
			},
			Cluster::Performance => {
				self.pcpu_cores = cores;
				self.pcpu_freqs = table;
			},
			Cluster::Gpu => {
				self.gpu_cores = cores;
				self.gpu_freqs = table;
			},
		}
		self
	}

	pub fn cores(&self, cluster: Cluster) -> usize {
		match cluster {
			Cluster::Efficiency => self.ecpu_cores as usize,
			Cluster::Performance => self.pcpu_cores as usize,
			Cluster::Gpu => self.gpu_cores as usize,
		}
	}

	pub fn freqs(&self, cluster: Cluster) -> &FreqTable {
		match cluster {
			Cluster::Efficiency => &self.ecpu_freqs,
			Cluster::Performance => &self.pcpu_freqs,
			Cluster::Gpu => &self.gpu_freqs,
		}
	}

	/// Detects the running chip using the roots in `config`
	pub fn detect(config: &SamplerConfig) -> Result<Self> {
		CoreLayout::discover(config)
			.map(|layout| layout.info)
			.map_err(|e| SamplerError::unsupported("detecting SoC topology", e))
	}
}

impl Debug for SocInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SocInfo")
			.field("mac_model", &self.mac_model)
			.field("chip_name", &self.chip_name)
			.field("memory_gb", &self.memory_gb)
			.field("ecpu_cores", &self.ecpu_cores)
			.field("pcpu_cores", &self.pcpu_cores)
			.field("gpu_cores", &self.gpu_cores)
			.field("ecpu_freqs", &self.ecpu_freqs)
			.field("pcpu_freqs", &self.pcpu_freqs)
			.field("gpu_freqs", &self.gpu_freqs)
			.finish()
	}
}

/// Topology plus the OS identifiers needed to poll it
#[derive(Debug, Clone)]
pub(crate) struct CoreLayout {
	pub info: SocInfo,
	/// Per CPU cluster, one entry per physical core listing its logical CPUs
	pub ecpu: Vec<Vec<usize>>,
	pub pcpu: Vec<Vec<usize>>,
	/// DRM card directory of the integrated GPU
	pub gpu_dir: Option<PathBuf>,
}

impl CoreLayout {
	pub fn cpu_cores(&self, cluster: Cluster) -> &[Vec<usize>] {
		match cluster {
			Cluster::Efficiency => &self.ecpu,
			Cluster::Performance => &self.pcpu,
			Cluster::Gpu => &[],
		}
	}

	/// Reads chip identity, core layout and frequency steps from procfs/sysfs
	pub fn discover(config: &SamplerConfig) -> io::Result<Self> {
		let cpuinfo = fs::read_to_string(config.proc("cpuinfo"))?;
		let dt_model = read_trimmed(&config.sys("firmware/devicetree/base/model"))
			.ok()
			.map(|m| m.trim_end_matches('\0').to_string());
		let dmi_model = read_trimmed(&config.sys("devices/virtual/dmi/id/product_name")).ok();

		let chip_name = cpuinfo_value(&cpuinfo, "model name")
			.or_else(|| cpuinfo_value(&cpuinfo, "Hardware"))
			.map(str::to_string)
			.or_else(|| dt_model.clone())
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "cannot determine chip name"))?;
		let mac_model = dt_model.or(dmi_model).unwrap_or_else(|| chip_name.clone());

		let meminfo = read_meminfo(&config.proc("meminfo"))?;
		let mem_total = *meminfo
			.get("MemTotal")
			.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "meminfo has no MemTotal"))?;
		let memory_gb = (mem_total as f64 / (1u64 << 30) as f64).round().min(u8::MAX as f64) as u8;

		let core_to_threads = read_core_threads(config)?;
		let cpu_ids: Vec<usize> = core_to_threads.values().flatten().copied().collect();
		let types = classify_cores(config, &cpu_ids);
		let hybrid = types.values().any(|t| *t != CoreType::Unknown);

		let mut ecpu = Vec::new();
		let mut pcpu = Vec::new();
		for threads in core_to_threads.into_values() {
			let core_type = threads
				.iter()
				.filter_map(|cpu| types.get(cpu).copied())
				.find(|t| *t != CoreType::Unknown)
				.unwrap_or(CoreType::Unknown);
			log::debug!("cpus {threads:?}: {}", core_type.as_str());
			// Non-hybrid parts report everything as one performance cluster
			if hybrid && core_type == CoreType::ECore {
				ecpu.push(threads);
			} else {
				pcpu.push(threads);
			}
		}

		let ecpu_freqs = cluster_freq_steps(config, &ecpu);
		let pcpu_freqs = cluster_freq_steps(config, &pcpu);
		if ecpu_freqs.is_empty() && pcpu_freqs.is_empty() {
			return Err(io::Error::new(io::ErrorKind::NotFound, "cpufreq exposes no frequency steps"));
		}

		let gpu = find_integrated_gpu(config);
		let (gpu_dir, gpu_cores, gpu_freqs) = match gpu {
			Some((dir, freqs)) => (Some(dir), 1, freqs),
			None => (None, 0, Vec::new()),
		};

		let info = SocInfo::new(&chip_name, &mac_model, memory_gb)
			.with_cluster(Cluster::Efficiency, saturate_u8(ecpu.len()), &ecpu_freqs)
			.with_cluster(Cluster::Performance, saturate_u8(pcpu.len()), &pcpu_freqs)
			.with_cluster(Cluster::Gpu, gpu_cores, &gpu_freqs);

		Ok(Self {
			info,
			ecpu,
			pcpu,
			gpu_dir,
		})
	}
}

fn saturate_u8(n: usize) -> u8 {
	u8::try_from(n).unwrap_or(u8::MAX)
}

fn cpuinfo_value<'a>(cpuinfo: &'a str, key: &str) -> Option<&'a str> {
	cpuinfo.lines().find_map(|line| {
		let (k, v) = line.split_once(':')?;
		let v = v.trim();
		(k.trim() == key && !v.is_empty()).then_some(v)
	})
}

/// Maps (package, core) to the sorted logical CPUs of that physical core.
///
/// Offline CPUs are skipped. Without a sysfs topology every logical CPU
/// reported by `num_cpus` is its own core.
fn read_core_threads(config: &SamplerConfig) -> io::Result<BTreeMap<(usize, usize), Vec<usize>>> {
	let mut core_to_threads: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();

	if let Ok(entries) = fs::read_dir(config.sys("devices/system/cpu")) {
		for entry in entries.filter_map(|e| e.ok()) {
			let path = entry.path();
			let filename = entry.file_name().to_string_lossy().into_owned();

			// Look for cpuN directories
			let Some(cpu_id) = filename.strip_prefix("cpu").and_then(|n| n.parse::<usize>().ok()) else {
				continue;
			};
			if read_trimmed(&path.join("online")).is_ok_and(|v| v == "0") {
				continue;
			}

			let Ok(core_id) = read_u64(&path.join("topology/core_id")) else {
				continue;
			};
			let package_id = read_u64(&path.join("topology/physical_package_id")).unwrap_or(0);

			core_to_threads
				.entry((package_id as usize, core_id as usize))
				.or_default()
				.push(cpu_id);
		}
	}

	if core_to_threads.is_empty() {
		let threads = num_cpus::get();
		log::warn!("no sysfs cpu topology, assuming {threads} single-threaded cores");
		for cpu_id in 0..threads {
			core_to_threads.insert((0, cpu_id), vec![cpu_id]);
		}
	}

	for threads in core_to_threads.values_mut() {
		threads.sort_unstable();
	}

	Ok(core_to_threads)
}

/// Union of the cpufreq steps (MHz) of every CPU in the cluster
fn cluster_freq_steps(config: &SamplerConfig, cores: &[Vec<usize>]) -> Vec<u32> {
	let mut steps = Vec::new();

	for &cpu_id in cores.iter().flatten() {
		let dir = config.sys(&format!("devices/system/cpu/cpu{cpu_id}/cpufreq"));

		let available = read_trimmed(&dir.join("scaling_available_frequencies")).ok();
		let khz: Vec<u64> = match available {
			Some(list) => list.split_whitespace().filter_map(|f| f.parse().ok()).collect(),
			None => ["cpuinfo_min_freq", "cpuinfo_max_freq"]
				.iter()
				.filter_map(|name| read_u64(&dir.join(name)).ok())
				.collect(),
		};

		steps.extend(khz.into_iter().map(|f| (f / 1000) as u32));
	}

	// FreqTable sorts and deduplicates
	steps
}

/// Finds an i915-style integrated GPU and its RPn/RP1/RP0 frequency steps
fn find_integrated_gpu(config: &SamplerConfig) -> Option<(PathBuf, Vec<u32>)> {
	let mut cards: Vec<PathBuf> = fs::read_dir(config.sys("class/drm"))
		.ok()?
		.filter_map(|e| e.ok())
		.filter(|e| {
			let name = e.file_name();
			let name = name.to_string_lossy();
			name.starts_with("card") && !name.contains('-')
		})
		.map(|e| e.path())
		.collect();
	cards.sort();

	cards.into_iter().find_map(|card| {
		let freqs: Vec<u32> = ["gt_RPn_freq_mhz", "gt_RP1_freq_mhz", "gt_RP0_freq_mhz"]
			.iter()
			.filter_map(|name| read_u64(&card.join(name)).ok())
			.map(|f| f as u32)
			.collect();
		// Busy time is derived from RC6 residency; without it the GPU is not sampled
		let has_rc6 = card.join("power/rc6_residency_ms").exists();
		(has_rc6 && !freqs.is_empty()).then_some((card, freqs))
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cpuinfo_lookup_takes_first_non_empty() {
		let cpuinfo = "processor\t: 0\nmodel name\t: Intel(R) Core(TM) i7-1260P\nprocessor\t: 1\n";
		assert_eq!(cpuinfo_value(cpuinfo, "model name"), Some("Intel(R) Core(TM) i7-1260P"));
		assert_eq!(cpuinfo_value(cpuinfo, "Hardware"), None);
	}

	#[test]
	fn with_cluster_fills_matching_fields() {
		let info = SocInfo::new("Test Chip", "Test Board", 16)
			.with_cluster(Cluster::Efficiency, 4, &[600, 2064])
			.with_cluster(Cluster::Gpu, 8, &[396, 1398]);

		assert_eq!(info.cores(Cluster::Efficiency), 4);
		assert_eq!(info.cores(Cluster::Performance), 0);
		assert_eq!(info.cores(Cluster::Gpu), 8);
		assert_eq!(info.freqs(Cluster::Gpu).max(), Some(1398));
		assert_eq!(info.chip_name.as_str(), "Test Chip");
		assert_eq!(info.mac_model.as_str(), "Test Board");
	}

	#[test]
	fn names_are_truncated_to_capacity() {
		let long = "x".repeat(200);
		let info = SocInfo::new(&long, &long, 8);
		assert_eq!(info.chip_name.as_str().len(), NAME_CAPACITY - 1);
	}
}
