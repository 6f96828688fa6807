use std::io;

use msru::{Accessor, Msr};

/// Reads a value from a Model-Specific Register (MSR)
///
/// # Arguments
///
/// * `msr_address` - The address of the MSR to read
/// * `cpu_id` - The logical CPU to read the MSR from
///
/// # Returns
///
/// The value read from the MSR, or an io::Error if the read fails
pub fn read_msr(msr_address: u32, cpu_id: usize) -> io::Result<u64> {
	let cpu = u16::try_from(cpu_id)
		.map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("cpu id {cpu_id} out of range")))?;

	Msr::new(msr_address, cpu)
		.map_err(io::Error::other)?
		.read()
		.map_err(io::Error::other)
}

/// Converts a raw RAPL energy count into joules.
///
/// The energy status unit is a power of two: one count is `1 / 2^unit` J.
pub const fn raw_to_joules(raw: u64, energy_unit: u64) -> f64 {
	raw as f64 / (1u64 << (energy_unit & 0x1F)) as f64
}
