use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{ENV_BACKEND, ENV_PROCFS_ROOT, ENV_SYSFS_ROOT};
use crate::error::{Result, SamplerError};

/// Which energy counters feed the power domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnergyBackend {
	/// Powercap first, then MSRs
	#[default]
	Auto,
	/// Linux powercap RAPL zones under `<sysfs>/class/powercap`
	Powercap,
	/// RAPL model specific registers (needs root and the msr module)
	Msr,
	/// No energy meter; every power field reads 0
	None,
}

impl EnergyBackend {
	pub fn as_str(&self) -> &'static str {
		match self {
			EnergyBackend::Auto => "auto",
			EnergyBackend::Powercap => "powercap",
			EnergyBackend::Msr => "msr",
			EnergyBackend::None => "none",
		}
	}
}

impl FromStr for EnergyBackend {
	type Err = SamplerError;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_ascii_lowercase().as_str() {
			"auto" => Ok(EnergyBackend::Auto),
			"powercap" | "rapl" => Ok(EnergyBackend::Powercap),
			"msr" => Ok(EnergyBackend::Msr),
			"none" | "off" => Ok(EnergyBackend::None),
			other => Err(SamplerError::BackendUnavailable(format!("unknown energy backend '{other}'"))),
		}
	}
}

/// Options accepted when opening a sampler or detecting the topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
	pub energy_backend: EnergyBackend,
	pub sysfs_root: PathBuf,
	pub procfs_root: PathBuf,
}

impl Default for SamplerConfig {
	fn default() -> Self {
		Self {
			energy_backend: EnergyBackend::Auto,
			sysfs_root: PathBuf::from("/sys"),
			procfs_root: PathBuf::from("/proc"),
		}
	}
}

impl SamplerConfig {
	/// Defaults overlaid with `SOC_POWER_BACKEND`, `SOC_POWER_SYSFS` and `SOC_POWER_PROCFS`
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Same as [`SamplerConfig::from_env`] with an arbitrary variable lookup
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();
		if let Some(backend) = lookup(ENV_BACKEND) {
			config.energy_backend = backend.parse()?;
		}
		if let Some(root) = lookup(ENV_SYSFS_ROOT) {
			config.sysfs_root = PathBuf::from(root);
		}
		if let Some(root) = lookup(ENV_PROCFS_ROOT) {
			config.procfs_root = PathBuf::from(root);
		}
		Ok(config)
	}

	pub fn with_energy_backend(mut self, backend: EnergyBackend) -> Self {
		self.energy_backend = backend;
		self
	}

	pub fn with_roots(mut self, sysfs_root: impl Into<PathBuf>, procfs_root: impl Into<PathBuf>) -> Self {
		self.sysfs_root = sysfs_root.into();
		self.procfs_root = procfs_root.into();
		self
	}

	pub(crate) fn sys(&self, relative: &str) -> PathBuf {
		self.sysfs_root.join(relative)
	}

	pub(crate) fn proc(&self, relative: &str) -> PathBuf {
		self.procfs_root.join(relative)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_point_at_live_filesystems() {
		let config = SamplerConfig::default();
		assert_eq!(config.energy_backend, EnergyBackend::Auto);
		assert_eq!(config.sys("class/powercap"), PathBuf::from("/sys/class/powercap"));
		assert_eq!(config.proc("stat"), PathBuf::from("/proc/stat"));
	}

	#[test]
	fn lookup_overrides_defaults() {
		let config = SamplerConfig::from_lookup(|key| match key {
			ENV_BACKEND => Some("MSR".to_string()),
			ENV_SYSFS_ROOT => Some("/tmp/sys".to_string()),
			_ => None,
		})
		.unwrap();

		assert_eq!(config.energy_backend, EnergyBackend::Msr);
		assert_eq!(config.sysfs_root, PathBuf::from("/tmp/sys"));
		assert_eq!(config.procfs_root, PathBuf::from("/proc"));
	}

	#[test]
	fn unknown_backend_is_rejected() {
		let err = SamplerConfig::from_lookup(|key| (key == ENV_BACKEND).then(|| "smc".to_string())).unwrap_err();
		assert!(matches!(err, SamplerError::BackendUnavailable(_)));
		assert!(err.to_string().contains("smc"));
	}

	#[test]
	fn backend_names_round_trip() {
		for backend in [EnergyBackend::Auto, EnergyBackend::Powercap, EnergyBackend::Msr, EnergyBackend::None] {
			assert_eq!(backend.as_str().parse::<EnergyBackend>().unwrap(), backend);
		}
	}
}
