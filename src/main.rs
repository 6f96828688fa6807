use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use soc_power::constants::DEFAULT_CLI_INTERVAL_MS;
use soc_power::display::{display_metrics, prepare_display_area, soc_info_lines};
use soc_power::{EnergyBackend, Sampler, SamplerConfig, SamplerError};

#[derive(Parser, Debug)]
#[command(name = "soc-power")]
#[command(about = "Sample SoC temperatures, cluster usage and per-domain power")]
#[command(version)]
struct Args {
	/// Sampling interval in milliseconds
	#[arg(short, long, default_value_t = DEFAULT_CLI_INTERVAL_MS)]
	interval_ms: u64,

	/// Stop after this many snapshots (runs until interrupted by default)
	#[arg(short, long)]
	count: Option<u64>,

	/// Energy backend: auto, powercap, msr or none
	#[arg(short, long)]
	backend: Option<EnergyBackend>,

	/// Print the chip topology and exit
	#[arg(long)]
	info: bool,
}

fn run(args: &Args) -> Result<(), SamplerError> {
	let mut config = SamplerConfig::from_env()?;
	if let Some(backend) = args.backend {
		config = config.with_energy_backend(backend);
	}

	if args.info {
		let info = soc_power::SocInfo::detect(&config)?;
		for line in soc_info_lines(&info) {
			println!("{line}");
		}
		return Ok(());
	}

	let mut sampler = Sampler::with_config(&config)?;
	let info = *sampler.topology();
	println!(
		"Sampling {} every {} ms. Press Ctrl+C to stop.",
		info.chip_name, args.interval_ms
	);
	println!();
	prepare_display_area(&info).map_err(|e| SamplerError::SampleFailed(e.to_string()))?;

	let interval = Duration::from_millis(args.interval_ms);
	// Baseline poll so the first printed snapshot already has rates
	sampler.sample()?;

	let mut taken = 0u64;
	while args.count.is_none_or(|count| taken < count) {
		thread::sleep(interval);
		match sampler.sample() {
			Ok(metrics) => {
				display_metrics(&metrics, &info).map_err(|e| SamplerError::SampleFailed(e.to_string()))?;
				taken += 1;
			},
			// A single failed poll is retried on the next interval
			Err(SamplerError::SampleFailed(msg)) => log::warn!("sample failed: {msg}"),
			Err(e) => return Err(e),
		}
	}

	sampler.close();
	Ok(())
}

fn main() -> ExitCode {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

	let args = Args::parse();
	match run(&args) {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("soc-power: {e}");
			ExitCode::from(e.code() as u8)
		},
	}
}
