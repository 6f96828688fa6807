use std::io;

use crate::constants::*;
use crate::energy::{EnergyReadings, PowerDomain};
use crate::meter::{EnergyMeter, WrappingCounter};
use crate::util::msr::{raw_to_joules, read_msr};

/// Intel RAPL energy status registers and the domain each one feeds
const INTEL_DOMAINS: [(u32, PowerDomain); 5] = [
	(INTEL_PKG_ENERGY_MSR, PowerDomain::All),
	(INTEL_PP0_ENERGY_MSR, PowerDomain::Cpu),
	(INTEL_PP1_ENERGY_MSR, PowerDomain::Gpu),
	(INTEL_DRAM_ENERGY_MSR, PowerDomain::Ram),
	(INTEL_PLATFORM_ENERGY_MSR, PowerDomain::Sys),
];

/// Intel RAPL meter reading package-scope MSRs on CPU 0
#[derive(Debug, Clone)]
pub struct IntelMeter {
	energy_unit: u64,
	registers: Vec<(u32, PowerDomain, WrappingCounter)>,
}

impl IntelMeter {
	/// Reads the energy unit and keeps only the registers this part implements
	pub fn open() -> io::Result<Self> {
		let unit_msr = read_msr(INTEL_POWER_UNIT_MSR, 0)?;
		let energy_unit = (unit_msr >> 8) & 0x1F;

		let registers: Vec<(u32, PowerDomain, WrappingCounter)> = INTEL_DOMAINS
			.iter()
			.copied()
			.filter(|(msr, _)| read_msr(*msr, 0).is_ok())
			.map(|(msr, domain)| (msr, domain, WrappingCounter::u32()))
			.collect();

		if registers.is_empty() {
			return Err(io::Error::new(io::ErrorKind::NotFound, "no readable Intel RAPL energy MSRs"));
		}

		Ok(Self { energy_unit, registers })
	}
}

impl EnergyMeter for IntelMeter {
	fn name(&self) -> &'static str {
		"intel-msr"
	}

	fn read(&mut self) -> io::Result<EnergyReadings> {
		let mut readings = EnergyReadings::new();
		for (msr, domain, counter) in &mut self.registers {
			// Energy status counters are 32 bits wide
			let raw = read_msr(*msr, 0)? & 0xFFFF_FFFF;
			readings.set(*domain, raw_to_joules(counter.update(raw), self.energy_unit));
		}
		Ok(readings)
	}
}
