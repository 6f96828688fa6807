pub mod cpu;
pub mod mem;
pub mod msr;

use std::path::Path;
use std::{fs, io};

/// Reads a sysfs/procfs attribute with surrounding whitespace removed
pub fn read_trimmed(path: &Path) -> io::Result<String> {
	let raw = fs::read_to_string(path)?;
	let value = raw.trim();
	if value.is_empty() {
		return Err(io::Error::new(
			io::ErrorKind::InvalidData,
			format!("{} is empty", path.display()),
		));
	}
	Ok(value.to_string())
}

/// Reads a single unsigned integer attribute
pub fn read_u64(path: &Path) -> io::Result<u64> {
	read_trimmed(path)?.parse::<u64>().map_err(|e| {
		io::Error::new(
			io::ErrorKind::InvalidData,
			format!("{}: {}", path.display(), e),
		)
	})
}

/// Parses a kernel cpu list such as `0-3,8,10-11`
///
/// Malformed fragments are skipped.
pub fn parse_cpu_list(list: &str) -> Vec<usize> {
	let mut cpus = Vec::new();
	for part in list.trim().split(',').map(str::trim).filter(|p| !p.is_empty()) {
		match part.split_once('-') {
			Some((start, end)) => {
				if let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) {
					cpus.extend(start..=end);
				}
			},
			None => {
				if let Ok(cpu) = part.parse::<usize>() {
					cpus.push(cpu);
				}
			},
		}
	}
	cpus
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cpu_list_ranges_and_singles() {
		assert_eq!(parse_cpu_list("0-3,8,10-11\n"), vec![0, 1, 2, 3, 8, 10, 11]);
		assert_eq!(parse_cpu_list(""), Vec::<usize>::new());
		assert_eq!(parse_cpu_list("x,2"), vec![2]);
	}

	#[test]
	fn read_u64_rejects_garbage() {
		let dir = tempfile::tempdir().unwrap();
		let good = dir.path().join("good");
		let bad = dir.path().join("bad");
		fs::write(&good, "123456\n").unwrap();
		fs::write(&bad, "n/a\n").unwrap();

		assert_eq!(read_u64(&good).unwrap(), 123_456);
		assert_eq!(read_u64(&bad).unwrap_err().kind(), io::ErrorKind::InvalidData);
	}
}
