use std::io;

use crate::constants::*;
use crate::energy::{EnergyReadings, PowerDomain};
use crate::meter::{EnergyMeter, WrappingCounter};
use crate::util::msr::{raw_to_joules, read_msr};

/// AMD RAPL meter: package energy plus the sum of per-core energy counters
#[derive(Debug, Clone)]
pub struct AmdMeter {
	energy_unit: u64,
	package: WrappingCounter,
	/// First logical CPU of every physical core with its own counter
	cores: Vec<(usize, WrappingCounter)>,
}

impl AmdMeter {
	pub fn open(core_threads: &[Vec<usize>]) -> io::Result<Self> {
		let unit_msr = read_msr(AMD_ENERGY_UNIT_MSR, 0)?;
		let energy_unit = (unit_msr >> 8) & 0x1F;

		// AMD: energy MSRs are per core, read through the first thread of each
		let cores = core_threads
			.iter()
			.filter_map(|threads| threads.first().copied())
			.filter(|&cpu| read_msr(AMD_ENERGY_CORE_MSR, cpu).is_ok())
			.map(|cpu| (cpu, WrappingCounter::u32()))
			.collect();

		read_msr(AMD_ENERGY_PKG_MSR, 0)?;
		Ok(Self {
			energy_unit,
			package: WrappingCounter::u32(),
			cores,
		})
	}
}

impl EnergyMeter for AmdMeter {
	fn name(&self) -> &'static str {
		"amd-msr"
	}

	fn read(&mut self) -> io::Result<EnergyReadings> {
		let mut readings = EnergyReadings::new();

		let package = self.package.update(read_msr(AMD_ENERGY_PKG_MSR, 0)? & 0xFFFF_FFFF);
		readings.set(PowerDomain::All, raw_to_joules(package, self.energy_unit));

		// Each core counter wraps on its own schedule; unwrap before summing
		let mut cores = 0u64;
		for (cpu, counter) in &mut self.cores {
			let raw = read_msr(AMD_ENERGY_CORE_MSR, *cpu)? & 0xFFFF_FFFF;
			cores = cores.saturating_add(counter.update(raw));
		}
		if !self.cores.is_empty() {
			readings.set(PowerDomain::Cpu, raw_to_joules(cores, self.energy_unit));
		}

		Ok(readings)
	}
}
