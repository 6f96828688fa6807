#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use soc_power::{
	Clock, Cluster, CoreCounters, EnergyBackend, EnergyReadings, Memory, PowerDomain, RawSample, SamplerConfig,
	SocInfo, TelemetrySource,
};
use tempfile::TempDir;

/// Source that replays a queue of polls and counts how often it was dropped
#[derive(Debug)]
pub struct ScriptedSource {
	topology: SocInfo,
	polls: VecDeque<(Option<(ManualClock, Duration)>, io::Result<RawSample>)>,
	drops: Arc<AtomicUsize>,
}

impl ScriptedSource {
	pub fn new(topology: SocInfo) -> Self {
		Self {
			topology,
			polls: VecDeque::new(),
			drops: Arc::new(AtomicUsize::new(0)),
		}
	}

	pub fn then(mut self, sample: RawSample) -> Self {
		self.polls.push_back((None, Ok(sample)));
		self
	}

	/// Like [`ScriptedSource::then`], but the poll advances `clock` by `took`
	/// before returning, like a slow counter read
	pub fn then_slow(mut self, sample: RawSample, clock: &ManualClock, took: Duration) -> Self {
		self.polls.push_back((Some((clock.clone(), took)), Ok(sample)));
		self
	}

	pub fn then_fail(mut self, message: &str) -> Self {
		self.polls.push_back((None, Err(io::Error::other(message.to_string()))));
		self
	}

	pub fn drop_counter(&self) -> Arc<AtomicUsize> {
		Arc::clone(&self.drops)
	}
}

impl TelemetrySource for ScriptedSource {
	fn name(&self) -> &'static str {
		"scripted"
	}

	fn topology(&self) -> io::Result<SocInfo> {
		Ok(self.topology)
	}

	fn poll(&mut self) -> io::Result<RawSample> {
		let (delay, result) = self
			.polls
			.pop_front()
			.unwrap_or_else(|| (None, Err(io::Error::other("script exhausted"))));
		if let Some((clock, took)) = delay {
			clock.advance(took);
		}
		result
	}
}

impl Drop for ScriptedSource {
	fn drop(&mut self) {
		self.drops.fetch_add(1, Ordering::SeqCst);
	}
}

/// Clock advanced by hand, shared between the test and the sampler.
///
/// A ticking clock also advances by a fixed step on every read, which makes
/// windowed sampling deterministic despite its real sleep.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
	nanos: Arc<AtomicU64>,
	step_nanos: u64,
}

impl ManualClock {
	pub fn ticking(step: Duration) -> Self {
		Self {
			nanos: Arc::default(),
			step_nanos: step.as_nanos() as u64,
		}
	}

	pub fn advance(&self, by: Duration) {
		self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now(&self) -> Duration {
		let nanos = self.nanos.fetch_add(self.step_nanos, Ordering::SeqCst) + self.step_nanos;
		Duration::from_nanos(nanos)
	}
}

/// 2 E cores, 2 P cores, no GPU
pub fn cpu_only_topology() -> SocInfo {
	SocInfo::new("Test SoC", "Test Board", 16)
		.with_cluster(Cluster::Efficiency, 2, &[600, 972, 1332, 2064])
		.with_cluster(Cluster::Performance, 2, &[600, 1500, 3228])
}

pub fn core(active: u64, total: u64, freq_mhz: u32) -> CoreCounters {
	CoreCounters { active, total, freq_mhz }
}

pub fn memory() -> Memory {
	Memory {
		ram_total: 16 << 30,
		ram_usage: 6 << 30,
		swap_total: 2 << 30,
		swap_usage: 1 << 20,
	}
}

/// Poll for [`cpu_only_topology`] with the given cumulative counters
pub fn sample(cpu_joules: f64, busy_ticks: u64, total_ticks: u64) -> RawSample {
	let mut raw = RawSample {
		energy: EnergyReadings::new()
			.with(PowerDomain::Cpu, cpu_joules)
			.with(PowerDomain::All, cpu_joules * 2.0),
		memory: memory(),
		..RawSample::default()
	};
	raw.set_cores(Cluster::Efficiency, vec![core(busy_ticks, total_ticks, 972); 2]);
	raw.set_cores(Cluster::Performance, vec![core(busy_ticks, total_ticks, 1500); 2]);
	raw
}

/// Minimal sysfs/procfs tree of a hybrid laptop chip: one two-thread P core,
/// two E cores and an integrated GPU.
pub struct FakeTree {
	dir: TempDir,
}

impl FakeTree {
	pub fn new() -> Self {
		let tree = Self {
			dir: tempfile::tempdir().unwrap(),
		};

		tree.write(
			"proc/cpuinfo",
			"processor\t: 0\nvendor_id\t: GenuineIntel\nmodel name\t: Fake Hybrid CPU\n\n",
		);
		tree.write(
			"proc/meminfo",
			"MemTotal:       16777216 kB\nMemFree:         1048576 kB\nMemAvailable:   12582912 kB\nSwapTotal:       2097152 kB\nSwapFree:        2097152 kB\n",
		);
		tree.write("sys/devices/virtual/dmi/id/product_name", "Fake Laptop\n");

		// cpu0 and cpu1 are the two threads of P core 0
		for (cpu, core_id) in [(0, 0), (1, 0), (2, 8), (3, 9)] {
			tree.write(&format!("sys/devices/system/cpu/cpu{cpu}/topology/core_id"), &format!("{core_id}\n"));
			tree.write(&format!("sys/devices/system/cpu/cpu{cpu}/topology/physical_package_id"), "0\n");
		}
		for cpu in [0, 1] {
			tree.write(
				&format!("sys/devices/system/cpu/cpu{cpu}/cpufreq/scaling_available_frequencies"),
				"800000 2400000 4200000\n",
			);
		}
		for cpu in [2, 3] {
			tree.write(&format!("sys/devices/system/cpu/cpu{cpu}/cpufreq/cpuinfo_min_freq"), "800000\n");
			tree.write(&format!("sys/devices/system/cpu/cpu{cpu}/cpufreq/cpuinfo_max_freq"), "3000000\n");
		}
		tree.cur_freqs(&[2_400_000, 4_200_000, 1_800_000, 3_000_000]);
		tree.write("sys/devices/cpu_core/cpus", "0-1\n");
		tree.write("sys/devices/cpu_atom/cpus", "2-3\n");

		tree.write("sys/class/hwmon/hwmon0/name", "coretemp\n");
		tree.write("sys/class/hwmon/hwmon0/temp1_input", "45000\n");
		tree.write("sys/class/hwmon/hwmon0/temp2_input", "55000\n");
		tree.write("sys/class/hwmon/hwmon1/name", "acpitz\n");
		tree.write("sys/class/hwmon/hwmon1/temp1_input", "99000\n");
		// Covered by hwmon already, so never read
		tree.write("sys/class/thermal/thermal_zone0/type", "x86_pkg_temp\n");
		tree.write("sys/class/thermal/thermal_zone0/temp", "90000\n");

		tree.write("sys/class/drm/card0/gt_RPn_freq_mhz", "300\n");
		tree.write("sys/class/drm/card0/gt_RP1_freq_mhz", "700\n");
		tree.write("sys/class/drm/card0/gt_RP0_freq_mhz", "1450\n");
		tree.write("sys/class/drm/card0/gt_act_freq_mhz", "700\n");
		tree.write("sys/class/drm/card0/power/rc6_residency_ms", "0\n");
		tree.write("sys/class/drm/card0-eDP-1/status", "connected\n");

		tree.write("sys/class/powercap/intel-rapl:0/name", "package-0\n");
		tree.write("sys/class/powercap/intel-rapl:0:0/name", "core\n");
		tree.energy(100_000_000, 40_000_000);

		tree.stat(&[(0, 0); 4]);
		tree
	}

	pub fn root(&self) -> &Path {
		self.dir.path()
	}

	pub fn path(&self, relative: &str) -> PathBuf {
		self.root().join(relative)
	}

	pub fn write(&self, relative: &str, contents: &str) {
		let path = self.path(relative);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(path, contents).unwrap();
	}

	/// One (busy, idle) jiffy pair per logical CPU
	pub fn stat(&self, cpus: &[(u64, u64)]) {
		let total_busy: u64 = cpus.iter().map(|c| c.0).sum();
		let total_idle: u64 = cpus.iter().map(|c| c.1).sum();
		let mut content = format!("cpu  {total_busy} 0 0 {total_idle} 0 0 0 0 0 0\n");
		for (cpu, (busy, idle)) in cpus.iter().enumerate() {
			content.push_str(&format!("cpu{cpu} {busy} 0 0 {idle} 0 0 0 0 0 0\n"));
		}
		content.push_str("intr 0\nctxt 0\n");
		self.write("proc/stat", &content);
	}

	pub fn cur_freqs(&self, khz: &[u64]) {
		for (cpu, freq) in khz.iter().enumerate() {
			self.write(
				&format!("sys/devices/system/cpu/cpu{cpu}/cpufreq/scaling_cur_freq"),
				&format!("{freq}\n"),
			);
		}
	}

	pub fn energy(&self, package_uj: u64, core_uj: u64) {
		self.write("sys/class/powercap/intel-rapl:0/energy_uj", &format!("{package_uj}\n"));
		self.write("sys/class/powercap/intel-rapl:0:0/energy_uj", &format!("{core_uj}\n"));
	}

	pub fn config(&self, backend: EnergyBackend) -> SamplerConfig {
		SamplerConfig::default()
			.with_roots(self.path("sys"), self.path("proc"))
			.with_energy_backend(backend)
	}
}
