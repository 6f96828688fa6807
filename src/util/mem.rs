use std::collections::HashMap;
use std::path::Path;
use std::{fs, io};

use crate::metrics::Memory;

/// Parses `/proc/meminfo` into a key -> bytes map
pub fn read_meminfo(path: &Path) -> io::Result<HashMap<String, u64>> {
	let content = fs::read_to_string(path)?;
	Ok(parse_meminfo(&content))
}

fn parse_meminfo(content: &str) -> HashMap<String, u64> {
	content
		.lines()
		.filter_map(|line| {
			let (key, rest) = line.split_once(':')?;
			let mut fields = rest.split_whitespace();
			let value: u64 = fields.next()?.parse().ok()?;
			let bytes = match fields.next() {
				Some("kB") => value.saturating_mul(1024),
				_ => value,
			};
			Some((key.trim().to_string(), bytes))
		})
		.collect()
}

/// Occupancy from meminfo: used RAM is `MemTotal - MemAvailable`
/// (`MemFree` on kernels without `MemAvailable`), used swap is
/// `SwapTotal - SwapFree`.
pub fn memory_from_meminfo(info: &HashMap<String, u64>) -> io::Result<Memory> {
	let ram_total = *info
		.get("MemTotal")
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "meminfo has no MemTotal"))?;
	let available = info.get("MemAvailable").or_else(|| info.get("MemFree")).copied().unwrap_or(0);
	let swap_total = info.get("SwapTotal").copied().unwrap_or(0);
	let swap_free = info.get("SwapFree").copied().unwrap_or(swap_total);

	Ok(Memory {
		ram_total,
		ram_usage: ram_total.saturating_sub(available),
		swap_total,
		swap_usage: swap_total.saturating_sub(swap_free),
	})
}
