// AMD RAPL MSR addresses
pub const AMD_ENERGY_UNIT_MSR: u32 = 0xC001_0299;
pub const AMD_ENERGY_CORE_MSR: u32 = 0xC001_029A;
pub const AMD_ENERGY_PKG_MSR: u32 = 0xC001_029B;

// Intel RAPL MSR addresses
pub const INTEL_POWER_UNIT_MSR: u32 = 0x606;
pub const INTEL_PKG_ENERGY_MSR: u32 = 0x611;
pub const INTEL_DRAM_ENERGY_MSR: u32 = 0x619;
pub const INTEL_PP0_ENERGY_MSR: u32 = 0x639;
pub const INTEL_PP1_ENERGY_MSR: u32 = 0x641;
pub const INTEL_PLATFORM_ENERGY_MSR: u32 = 0x64D;

// Cross-boundary capacities
pub const FREQ_TABLE_CAPACITY: usize = 32;
pub const NAME_CAPACITY: usize = 64;

// Temperature readings outside this open interval (°C) are treated as bogus
pub const MIN_VALID_TEMP_C: f32 = 0.0;
pub const MAX_VALID_TEMP_C: f32 = 150.0;

// Sampling settings
pub const DEFAULT_CLI_INTERVAL_MS: u64 = 1000;

// Environment overrides for SamplerConfig::from_env
pub const ENV_BACKEND: &str = "SOC_POWER_BACKEND";
pub const ENV_SYSFS_ROOT: &str = "SOC_POWER_SYSFS";
pub const ENV_PROCFS_ROOT: &str = "SOC_POWER_PROCFS";
