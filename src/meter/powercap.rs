use std::fs;
use std::io;
use std::path::PathBuf;

use crate::config::SamplerConfig;
use crate::energy::{EnergyReadings, PowerDomain};
use crate::meter::{EnergyMeter, WrappingCounter};
use crate::util::{read_trimmed, read_u64};

/// One RAPL zone exposed through the Linux powercap framework
#[derive(Debug, Clone)]
struct Zone {
	domain: PowerDomain,
	energy_path: PathBuf,
	counter: WrappingCounter,
}

/// Reads RAPL counters from `<sysfs>/class/powercap/intel-rapl:*`.
///
/// Zone names map onto domains as package -> all, core -> cpu,
/// uncore -> gpu, dram -> ram, psys -> sys. Zones of the same domain on
/// several packages are summed.
#[derive(Debug, Clone)]
pub struct PowercapMeter {
	zones: Vec<Zone>,
}

impl PowercapMeter {
	pub fn open(config: &SamplerConfig) -> io::Result<Self> {
		let root = config.sys("class/powercap");
		let mut zones = Vec::new();

		let mut entries: Vec<PathBuf> = fs::read_dir(&root)?
			.filter_map(|e| e.ok())
			.filter(|e| {
				let name = e.file_name();
				let name = name.to_string_lossy();
				name.starts_with("intel-rapl:")
			})
			.map(|e| e.path())
			.collect();
		entries.sort();

		for dir in entries {
			let Ok(name) = read_trimmed(&dir.join("name")) else {
				continue;
			};
			let Some(domain) = zone_domain(&name) else {
				log::debug!("ignoring powercap zone {} ({name})", dir.display());
				continue;
			};
			// energy_uj runs from 0 to max_energy_range_uj inclusive, then wraps
			let modulus = read_u64(&dir.join("max_energy_range_uj")).ok().map(|max| max + 1);
			zones.push(Zone {
				domain,
				energy_path: dir.join("energy_uj"),
				counter: WrappingCounter::new(modulus),
			});
		}

		if zones.is_empty() {
			return Err(io::Error::new(
				io::ErrorKind::NotFound,
				format!("no RAPL zones under {}", root.display()),
			));
		}

		let mut meter = Self { zones };
		// energy_uj is root-only on recent kernels; fail here rather than on every poll
		meter.read()?;
		Ok(meter)
	}

	pub fn domains(&self) -> impl Iterator<Item = PowerDomain> + '_ {
		self.zones.iter().map(|z| z.domain)
	}
}

fn zone_domain(name: &str) -> Option<PowerDomain> {
	match name {
		n if n.starts_with("package") => Some(PowerDomain::All),
		"core" => Some(PowerDomain::Cpu),
		"uncore" => Some(PowerDomain::Gpu),
		"dram" => Some(PowerDomain::Ram),
		"psys" => Some(PowerDomain::Sys),
		_ => None,
	}
}

impl EnergyMeter for PowercapMeter {
	fn name(&self) -> &'static str {
		"powercap"
	}

	fn read(&mut self) -> io::Result<EnergyReadings> {
		let mut readings = EnergyReadings::new();
		for zone in &mut self.zones {
			let microjoules = zone.counter.update(read_u64(&zone.energy_path)?);
			readings.accumulate(zone.domain, microjoules as f64 / 1e6);
		}
		Ok(readings)
	}
}
