mod common;

use std::ptr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use common::{FakeTree, ManualClock, ScriptedSource, cpu_only_topology, sample};
use soc_power::constants::{ENV_BACKEND, ENV_PROCFS_ROOT, ENV_SYSFS_ROOT};
use soc_power::ffi::{
	SamplerHandle, get_soc_info, metrics_free, sampler_free, sampler_get_metrics, sampler_get_metrics_window,
	sampler_last_error, sampler_new_with_status, soc_info_free,
};
use soc_power::{EnergyBackend, Sampler, SamplerError};

// Tests that read the process environment must not interleave
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Points the environment at `tree` with the given backend name until dropped
struct EnvGuard<'a> {
	_lock: MutexGuard<'a, ()>,
}

impl EnvGuard<'_> {
	fn new(tree: &FakeTree, backend: &str) -> Self {
		let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		// SAFETY: every test touching the environment holds ENV_LOCK
		unsafe {
			std::env::set_var(ENV_SYSFS_ROOT, tree.path("sys"));
			std::env::set_var(ENV_PROCFS_ROOT, tree.path("proc"));
			std::env::set_var(ENV_BACKEND, backend);
		}
		Self { _lock: lock }
	}
}

impl Drop for EnvGuard<'_> {
	fn drop(&mut self) {
		// SAFETY: ENV_LOCK is released only after this body runs
		unsafe {
			std::env::remove_var(ENV_SYSFS_ROOT);
			std::env::remove_var(ENV_PROCFS_ROOT);
			std::env::remove_var(ENV_BACKEND);
		}
	}
}

fn scripted_handle(source: ScriptedSource, clock: &ManualClock) -> *mut SamplerHandle {
	let sampler = Sampler::from_source(Box::new(source))
		.unwrap()
		.with_clock(Box::new(clock.clone()));
	SamplerHandle::into_raw(sampler)
}

#[test]
fn null_pointers_are_rejected() {
	unsafe {
		assert!(sampler_get_metrics(ptr::null_mut()).is_null());
		assert_eq!(sampler_last_error(ptr::null()), SamplerError::InvalidHandle.code());
		sampler_free(ptr::null_mut());
		metrics_free(ptr::null_mut());
		soc_info_free(ptr::null_mut());
	}
}

#[test]
fn metrics_round_trip_through_handle() {
	let clock = ManualClock::default();
	let source = ScriptedSource::new(cpu_only_topology())
		.then(sample(0.0, 0, 0))
		.then(sample(10.0, 25, 100));
	let handle = scripted_handle(source, &clock);

	unsafe {
		let first = sampler_get_metrics(handle);
		assert!(!first.is_null());
		assert_eq!((*first).cpu_power, 0.0);
		metrics_free(first);

		clock.advance(Duration::from_secs(2));
		let second = sampler_get_metrics(handle);
		assert!(!second.is_null());
		assert!(((*second).cpu_power - 5.0).abs() < 1e-5);
		assert!(((*second).ecpu_usage.usage - 0.25).abs() < 1e-6);
		assert_eq!(sampler_last_error(handle), 0);
		metrics_free(second);

		sampler_free(handle);
	}
}

#[test]
fn failed_sample_sets_last_error_until_next_success() {
	let clock = ManualClock::default();
	let source = ScriptedSource::new(cpu_only_topology())
		.then_fail("busy")
		.then(sample(0.0, 0, 0));
	let handle = scripted_handle(source, &clock);

	unsafe {
		assert!(sampler_get_metrics(handle).is_null());
		assert_eq!(sampler_last_error(handle), SamplerError::SampleFailed(String::new()).code());

		let metrics = sampler_get_metrics(handle);
		assert!(!metrics.is_null());
		assert_eq!(sampler_last_error(handle), 0);
		metrics_free(metrics);

		sampler_free(handle);
	}
}

#[test]
fn free_releases_the_source() {
	let clock = ManualClock::default();
	let source = ScriptedSource::new(cpu_only_topology());
	let drops = source.drop_counter();
	let handle = scripted_handle(source, &clock);

	unsafe { sampler_free(handle) };
	assert_eq!(drops.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn window_metrics_through_handle() {
	let clock = ManualClock::ticking(Duration::from_secs(2));
	let source = ScriptedSource::new(cpu_only_topology())
		.then(sample(0.0, 0, 0))
		.then(sample(10.0, 25, 100))
		.then(sample(14.0, 50, 200));
	let handle = scripted_handle(source, &clock);

	unsafe {
		let window = sampler_get_metrics_window(handle, 1);
		assert!(!window.is_null());
		assert!(((*window).cpu_power - 5.0).abs() < 1e-5);
		assert!(((*window).ecpu_usage.usage - 0.25).abs() < 1e-6);
		assert_eq!(sampler_last_error(handle), 0);
		metrics_free(window);

		// Rates continue from the window's closing poll
		let next = sampler_get_metrics(handle);
		assert!(!next.is_null());
		assert!(((*next).cpu_power - 2.0).abs() < 1e-5);
		metrics_free(next);

		assert!(sampler_get_metrics_window(ptr::null_mut(), 1).is_null());
		sampler_free(handle);
	}
}

#[test]
fn new_with_status_reports_success() {
	let tree = FakeTree::new();
	let _env = EnvGuard::new(&tree, "none");

	let mut status = -1;
	unsafe {
		let handle = sampler_new_with_status(&mut status);
		assert_eq!(status, 0);
		assert!(!handle.is_null());

		let metrics = sampler_get_metrics(handle);
		assert!(!metrics.is_null());
		assert_eq!((*metrics).all_power, 0.0);
		metrics_free(metrics);
		sampler_free(handle);
	}
}

#[test]
fn new_with_status_reports_unknown_backend() {
	let tree = FakeTree::new();
	let _env = EnvGuard::new(&tree, "bogus");

	let mut status = 0;
	unsafe {
		let handle = sampler_new_with_status(&mut status);
		assert!(handle.is_null());
		assert_eq!(status, SamplerError::BackendUnavailable(String::new()).code());
		assert_eq!(status, 2);

		// A null status pointer is tolerated
		assert!(sampler_new_with_status(ptr::null_mut()).is_null());
	}
}

#[test]
fn soc_info_from_environment() {
	let tree = FakeTree::new();
	let _env = EnvGuard::new(&tree, "none");

	let expected = soc_power::SocInfo::detect(&tree.config(EnergyBackend::None)).unwrap();
	assert_eq!(soc_power::get_soc_info().unwrap(), expected);

	let info = get_soc_info();
	assert!(!info.is_null());
	unsafe {
		assert_eq!(*info, expected);
		assert_eq!((*info).ecpu_cores, 2);
		soc_info_free(info);
	}
}

#[test]
fn soc_info_rejects_unknown_backend() {
	let tree = FakeTree::new();
	let _env = EnvGuard::new(&tree, "bogus");

	let err = soc_power::get_soc_info().unwrap_err();
	assert!(matches!(err, SamplerError::BackendUnavailable(_)));
	assert!(get_soc_info().is_null());
}
