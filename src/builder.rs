//! Turns a raw poll plus the previous baseline into a [`Metrics`] snapshot.
//!
//! Everything here is a pure function of its inputs. The caller decides
//! whether to keep the returned baseline, which is what makes a failed
//! sample leave the handle untouched.

use std::time::Duration;

use crate::bounded::FreqTable;
use crate::constants::{MAX_VALID_TEMP_C, MIN_VALID_TEMP_C};
use crate::energy::{EnergyReadings, PowerDomain};
use crate::error::{Result, SamplerError};
use crate::metrics::{Metrics, Temperature, Usage};
use crate::power::{ratio, watts};
use crate::source::{CoreCounters, RawSample, SensorKind, SensorReading};
use crate::topology::{Cluster, SocInfo};

/// Cumulative readings of the last successful poll
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Baseline {
	pub at: Duration,
	pub energy: EnergyReadings,
	pub clusters: [Vec<CoreCounters>; 3],
}

/// Builds the snapshot for a poll taken at `now` and the baseline for the next call.
///
/// Without a previous baseline (or with zero elapsed time) every power and
/// usage field is 0; frequencies still reflect the instantaneous readings.
pub(crate) fn build(
	topology: &SocInfo,
	prev: Option<&Baseline>,
	raw: RawSample,
	now: Duration,
) -> Result<(Metrics, Baseline)> {
	for cluster in Cluster::ALL {
		let expected = topology.cores(cluster);
		let reported = raw.cores(cluster).len();
		if reported != expected {
			return Err(SamplerError::SampleFailed(format!(
				"{} reported {reported} cores, topology has {expected}",
				cluster.as_str()
			)));
		}
	}

	let elapsed = prev.map(|p| now.saturating_sub(p.at)).unwrap_or(Duration::ZERO);

	let mut metrics = Metrics {
		temp: Temperature {
			cpu_temp_avg: average_temperature(&raw.temperatures, SensorKind::Cpu),
			gpu_temp_avg: average_temperature(&raw.temperatures, SensorKind::Gpu),
		},
		memory: raw.memory,
		..Metrics::default()
	};

	if let Some(prev) = prev {
		for domain in PowerDomain::ALL {
			let (before, after) = (prev.energy.get(domain), raw.energy.get(domain));
			if let (Some(before), Some(after)) = (before, after) {
				if after < before {
					log::warn!("{domain} energy counter went backwards ({before:.3} J -> {after:.3} J)");
				}
			}
			*metrics.power_mut(domain) = watts(before, after, elapsed);
		}
	}

	for cluster in Cluster::ALL {
		let prev_cores = prev.map(|p| p.clusters[cluster.index()].as_slice());
		*metrics.usage_mut(cluster) = cluster_usage(raw.cores(cluster), prev_cores, topology.freqs(cluster), elapsed);
	}

	log::debug!(
		"built snapshot over {:?}: all {:.2} W, E {:.0}% P {:.0}% GPU {:.0}%",
		elapsed,
		metrics.all_power,
		metrics.ecpu_usage.usage * 100.0,
		metrics.pcpu_usage.usage * 100.0,
		metrics.gpu_usage.usage * 100.0
	);

	let baseline = Baseline {
		at: now,
		energy: raw.energy,
		clusters: raw.clusters,
	};
	Ok((metrics, baseline))
}

/// Mean of the plausible readings of one kind, 0 when there are none
fn average_temperature(readings: &[SensorReading], kind: SensorKind) -> f32 {
	let mut sum = 0.0f64;
	let mut count = 0usize;
	for reading in readings.iter().filter(|r| r.kind == kind) {
		let c = reading.celsius;
		if c.is_finite() && c > MIN_VALID_TEMP_C && c < MAX_VALID_TEMP_C {
			sum += c as f64;
			count += 1;
		} else {
			log::debug!("discarding {kind:?} sensor reading {c}");
		}
	}
	ratio(sum, count as f64) as f32
}

/// Aggregates one cluster.
///
/// Usage is `ΣΔactive / ΣΔtotal` over the cores, i.e. the average busy
/// fraction weighted by each core's elapsed ticks. Frequency is the mean of
/// the reported core frequencies weighted by Δactive, or the plain mean when
/// nothing was busy, then clamped into the cluster's table.
fn cluster_usage(now: &[CoreCounters], prev: Option<&[CoreCounters]>, table: &FreqTable, elapsed: Duration) -> Usage {
	if now.is_empty() {
		return Usage::default();
	}

	let mut active = 0.0f64;
	let mut total = 0.0f64;
	let mut weighted_freq = 0.0f64;
	let mut freq_weight = 0.0f64;
	let mut plain_freq = 0.0f64;
	let mut reporting = 0usize;

	let prev = prev.filter(|p| p.len() == now.len() && !elapsed.is_zero());

	for (i, core) in now.iter().enumerate() {
		let (da, dt) = match prev {
			Some(prev) => {
				// Reset counters read as no activity rather than negative activity
				let dt = core.total.saturating_sub(prev[i].total);
				let da = core.active.saturating_sub(prev[i].active).min(dt);
				(da as f64, dt as f64)
			},
			None => (0.0, 0.0),
		};
		active += da;
		total += dt;

		if core.freq_mhz > 0 {
			let freq = core.freq_mhz as f64;
			weighted_freq += freq * da;
			freq_weight += da;
			plain_freq += freq;
			reporting += 1;
		}
	}

	let freq = if freq_weight > 0.0 {
		weighted_freq / freq_weight
	} else {
		ratio(plain_freq, reporting as f64)
	};

	Usage {
		frequency: table.clamp(freq.round() as u32),
		usage: ratio(active, total).clamp(0.0, 1.0) as f32,
	}
}
