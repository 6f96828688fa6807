use std::io::{self, Write};

use crate::energy::PowerDomain;
use crate::metrics::Metrics;
use crate::topology::{Cluster, SocInfo};

const GIB: f64 = (1u64 << 30) as f64;

/// Lines of one snapshot as shown by [`display_metrics`]
pub fn metrics_lines(metrics: &Metrics, info: &SocInfo) -> Vec<String> {
	let mut lines = Vec::new();

	lines.push(format!(
		"Temp: CPU {:5.1} °C | GPU {:5.1} °C",
		metrics.temp.cpu_temp_avg, metrics.temp.gpu_temp_avg
	));
	lines.push(format!(
		"RAM: {:6.2} / {:6.2} GiB | Swap: {:6.2} / {:6.2} GiB",
		metrics.memory.ram_usage as f64 / GIB,
		metrics.memory.ram_total as f64 / GIB,
		metrics.memory.swap_usage as f64 / GIB,
		metrics.memory.swap_total as f64 / GIB
	));

	// Only clusters the chip actually has
	for cluster in Cluster::ALL {
		if info.cores(cluster) == 0 {
			continue;
		}
		let usage = metrics.usage(cluster);
		lines.push(format!(
			"{:<6} {:5.1}% @ {:4} MHz ({} cores)",
			cluster.as_str(),
			usage.usage * 100.0,
			usage.frequency,
			info.cores(cluster)
		));
	}

	let power: Vec<String> = PowerDomain::ALL
		.iter()
		.map(|&domain| format!("{domain}: {:6.2} W", metrics.power(domain)))
		.collect();
	for pair in power.chunks(2) {
		lines.push(pair.join(" | "));
	}

	lines
}

/// Number of lines [`display_metrics`] redraws for this chip
pub fn display_height(info: &SocInfo) -> usize {
	metrics_lines(&Metrics::default(), info).len()
}

/// Redraws a snapshot in place with ANSI cursor movement
pub fn display_metrics(metrics: &Metrics, info: &SocInfo) -> io::Result<()> {
	let lines = metrics_lines(metrics, info);
	let mut out = io::stdout().lock();

	write!(out, "\x1B[{}A", lines.len())?; // Move cursor up
	for line in &lines {
		write!(out, "\x1B[2K")?; // Clear line
		writeln!(out, "{line}")?;
	}

	out.flush()
}

/// Print empty lines to prepare for display
pub fn prepare_display_area(info: &SocInfo) -> io::Result<()> {
	let mut out = io::stdout().lock();
	for _ in 0..display_height(info) {
		writeln!(out)?;
	}
	out.flush()
}

/// Human-readable topology summary
pub fn soc_info_lines(info: &SocInfo) -> Vec<String> {
	let mut lines = vec![
		format!("Chip:   {}", info.chip_name),
		format!("Model:  {}", info.mac_model),
		format!("Memory: {} GB", info.memory_gb),
	];

	for cluster in Cluster::ALL {
		let freqs = info.freqs(cluster);
		let steps = match (freqs.min(), freqs.max()) {
			(Some(min), Some(max)) => format!("{min}-{max} MHz in {} steps", freqs.len()),
			_ => "no frequency table".to_string(),
		};
		lines.push(format!("{:<6} {:3} cores, {steps}", cluster.as_str(), info.cores(cluster)));
	}

	lines
}
