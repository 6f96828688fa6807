use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::SamplerConfig;
use crate::meter::{EnergyMeter, open_meter};
use crate::source::{CoreCounters, RawSample, SensorKind, SensorReading, TelemetrySource};
use crate::topology::{Cluster, CoreLayout, SocInfo};
use crate::util::cpu::{CpuStats, read_proc_stat};
use crate::util::mem::{memory_from_meminfo, read_meminfo};
use crate::util::{read_trimmed, read_u64};

const CPU_HWMON_DRIVERS: [&str; 6] = ["coretemp", "k10temp", "zenpower", "cpu_thermal", "cpu-thermal", "soc_thermal"];
const GPU_HWMON_DRIVERS: [&str; 5] = ["amdgpu", "radeon", "nouveau", "gpu_thermal", "gpu-thermal"];

/// Telemetry from procfs, sysfs and an energy meter
#[derive(Debug)]
pub struct LinuxSource {
	config: SamplerConfig,
	layout: CoreLayout,
	meter: Box<dyn EnergyMeter>,
	sensors: Vec<(SensorKind, PathBuf)>,
	gpu: Option<GpuCounters>,
}

impl LinuxSource {
	pub fn open(config: &SamplerConfig) -> io::Result<Self> {
		let layout = CoreLayout::discover(config)?;
		// Busy counters are mandatory for every poll
		read_proc_stat(&config.proc("stat"))?;

		let core_threads: Vec<Vec<usize>> = layout.ecpu.iter().chain(&layout.pcpu).cloned().collect();
		let meter = open_meter(config, &core_threads)?;
		let sensors = discover_sensors(config);
		let gpu = layout.gpu_dir.clone().map(GpuCounters::open).transpose()?;

		log::info!(
			"linux telemetry on {}: {} E + {} P cores, {} GPU, {} temperature sensors, energy via {}",
			layout.info.chip_name,
			layout.ecpu.len(),
			layout.pcpu.len(),
			if gpu.is_some() { "integrated" } else { "no" },
			sensors.len(),
			meter.name()
		);

		Ok(Self {
			config: config.clone(),
			layout,
			meter,
			sensors,
			gpu,
		})
	}

	fn core_counters(&self, threads: &[usize], stats: &HashMap<usize, CpuStats>) -> CoreCounters {
		let mut counters = CoreCounters::default();
		for cpu_id in threads {
			// A CPU missing from /proc/stat went offline; it contributes nothing
			if let Some(stat) = stats.get(cpu_id) {
				counters.active += stat.busy();
				counters.total += stat.total();
			}

			let cur_freq = self.config.sys(&format!("devices/system/cpu/cpu{cpu_id}/cpufreq/scaling_cur_freq"));
			if let Ok(khz) = read_u64(&cur_freq) {
				counters.freq_mhz = counters.freq_mhz.max((khz / 1000) as u32);
			}
		}
		counters
	}

	fn read_temperatures(&self) -> Vec<SensorReading> {
		self.sensors
			.iter()
			.filter_map(|(kind, path)| match read_millidegrees(path) {
				Ok(celsius) => Some(SensorReading { kind: *kind, celsius }),
				Err(e) => {
					log::debug!("skipping sensor {}: {e}", path.display());
					None
				},
			})
			.collect()
	}
}

impl TelemetrySource for LinuxSource {
	fn name(&self) -> &'static str {
		"linux"
	}

	fn topology(&self) -> io::Result<SocInfo> {
		Ok(self.layout.info)
	}

	fn poll(&mut self) -> io::Result<RawSample> {
		let stats = read_proc_stat(&self.config.proc("stat"))?;

		let mut sample = RawSample::default();
		for cluster in [Cluster::Efficiency, Cluster::Performance] {
			let cores = self
				.layout
				.cpu_cores(cluster)
				.iter()
				.map(|threads| self.core_counters(threads, &stats))
				.collect();
			sample.set_cores(cluster, cores);
		}
		if let Some(gpu) = &self.gpu {
			sample.set_cores(Cluster::Gpu, vec![gpu.read()?]);
		}

		sample.temperatures = self.read_temperatures();
		sample.memory = memory_from_meminfo(&read_meminfo(&self.config.proc("meminfo"))?)?;
		sample.energy = self.meter.read()?;

		Ok(sample)
	}
}

/// Busy time of an i915-style GPU derived from RC6 (idle) residency
#[derive(Debug)]
struct GpuCounters {
	dir: PathBuf,
	opened: Instant,
	rc6_at_open: u64,
}

impl GpuCounters {
	fn open(dir: PathBuf) -> io::Result<Self> {
		let rc6_at_open = read_u64(&dir.join("power/rc6_residency_ms"))?;
		Ok(Self {
			dir,
			opened: Instant::now(),
			rc6_at_open,
		})
	}

	fn read(&self) -> io::Result<CoreCounters> {
		let rc6 = read_u64(&self.dir.join("power/rc6_residency_ms"))?;
		let total = self.opened.elapsed().as_millis() as u64;
		let idle = rc6.saturating_sub(self.rc6_at_open);
		let freq_mhz = read_u64(&self.dir.join("gt_act_freq_mhz"))
			.or_else(|_| read_u64(&self.dir.join("gt_cur_freq_mhz")))
			.unwrap_or(0) as u32;

		Ok(CoreCounters {
			active: total.saturating_sub(idle),
			total,
			freq_mhz,
		})
	}
}

fn read_millidegrees(path: &Path) -> io::Result<f32> {
	let raw = read_trimmed(path)?;
	let millis: i64 = raw
		.parse()
		.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{}: {e}", path.display())))?;
	Ok(millis as f32 / 1000.0)
}

/// Finds CPU and GPU die sensors in hwmon, falling back to thermal zones for
/// any die hwmon does not cover
fn discover_sensors(config: &SamplerConfig) -> Vec<(SensorKind, PathBuf)> {
	let mut sensors = Vec::new();

	for dir in sorted_entries(&config.sys("class/hwmon")) {
		let Ok(name) = read_trimmed(&dir.join("name")) else {
			continue;
		};
		let kind = if CPU_HWMON_DRIVERS.contains(&name.as_str()) {
			SensorKind::Cpu
		} else if GPU_HWMON_DRIVERS.contains(&name.as_str()) {
			SensorKind::Gpu
		} else {
			continue;
		};

		for input in sorted_entries(&dir) {
			let file = input.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
			if file.starts_with("temp") && file.ends_with("_input") {
				sensors.push((kind, input));
			}
		}
	}

	let has = |sensors: &[(SensorKind, PathBuf)], kind| sensors.iter().any(|(k, _)| *k == kind);
	let need_cpu = !has(&sensors, SensorKind::Cpu);
	let need_gpu = !has(&sensors, SensorKind::Gpu);

	for zone in sorted_entries(&config.sys("class/thermal")) {
		let Ok(zone_type) = read_trimmed(&zone.join("type")) else {
			continue;
		};
		let zone_type = zone_type.to_ascii_lowercase();
		let kind = if zone_type == "x86_pkg_temp" || zone_type.contains("cpu") {
			SensorKind::Cpu
		} else if zone_type.contains("gpu") {
			SensorKind::Gpu
		} else {
			continue;
		};

		let wanted = match kind {
			SensorKind::Cpu => need_cpu,
			SensorKind::Gpu => need_gpu,
		};
		if wanted {
			sensors.push((kind, zone.join("temp")));
		}
	}

	sensors
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
	let mut entries: Vec<PathBuf> = fs::read_dir(dir)
		.map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
		.unwrap_or_default();
	entries.sort();
	entries
}
