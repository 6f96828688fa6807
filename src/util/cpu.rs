use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Cumulative jiffy counters for a single logical CPU
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStats {
	pub user: u64,
	pub nice: u64,
	pub system: u64,
	pub idle: u64,
	pub iowait: u64,
	pub irq: u64,
	pub softirq: u64,
	pub steal: u64,
}

impl CpuStats {
	/// All accounted time
	pub fn total(&self) -> u64 {
		self.busy() + self.idle + self.iowait
	}

	/// Time spent doing work
	pub fn busy(&self) -> u64 {
		self.user + self.nice + self.system + self.irq + self.softirq + self.steal
	}
}

/// Reads per-CPU counters from a `/proc/stat` formatted file
pub fn read_proc_stat(path: &Path) -> io::Result<HashMap<usize, CpuStats>> {
	let file = fs::File::open(path)?;
	let stats = parse_proc_stat(BufReader::new(file))?;
	if stats.is_empty() {
		return Err(io::Error::new(
			io::ErrorKind::InvalidData,
			format!("no per-cpu lines in {}", path.display()),
		));
	}
	Ok(stats)
}

fn parse_proc_stat(reader: impl BufRead) -> io::Result<HashMap<usize, CpuStats>> {
	let mut stats = HashMap::new();

	for line in reader.lines() {
		let line = line?;
		// Skip the aggregate "cpu " line, keep "cpuN"
		if !line.starts_with("cpu") || line.starts_with("cpu ") {
			continue;
		}

		let parts: Vec<&str> = line.split_whitespace().collect();
		if parts.len() < 8 {
			continue;
		}
		let Ok(cpu_id) = parts[0][3..].parse::<usize>() else {
			continue;
		};

		let field = |i: usize| -> io::Result<u64> {
			match parts.get(i) {
				Some(value) => value.parse().map_err(|e| {
					io::Error::new(io::ErrorKind::InvalidData, format!("bad {} field {}: {}", parts[0], i, e))
				}),
				None => Ok(0),
			}
		};

		stats.insert(
			cpu_id,
			CpuStats {
				user: field(1)?,
				nice: field(2)?,
				system: field(3)?,
				idle: field(4)?,
				iowait: field(5)?,
				irq: field(6)?,
				softirq: field(7)?,
				steal: field(8)?,
			},
		);
	}

	Ok(stats)
}
