//! C ABI over [`Sampler`] and [`SocInfo`].
//!
//! Every object handed out is heap allocated here and must be returned to
//! the matching `*_free` function exactly once. Null is the failure value for
//! pointer-returning functions; `sampler_last_error` tells a failed sample
//! apart from an invalid handle. Passing a pointer after freeing it is a
//! caller error.

use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::config::SamplerConfig;
use crate::error::SamplerError;
use crate::metrics::Metrics;
use crate::sampler::Sampler;
use crate::topology::SocInfo;

/// Opaque handle given to C callers. Calls on one handle are serialized.
#[derive(Debug)]
pub struct SamplerHandle {
	sampler: Mutex<Sampler>,
	last_error: AtomicI32,
}

impl SamplerHandle {
	/// Boxes a sampler for the C boundary; release with [`sampler_free`]
	pub fn into_raw(sampler: Sampler) -> *mut SamplerHandle {
		Box::into_raw(Box::new(SamplerHandle {
			sampler: Mutex::new(sampler),
			last_error: AtomicI32::new(0),
		}))
	}

	fn with_sampler<T>(&self, f: impl FnOnce(&mut Sampler) -> Result<T, SamplerError>) -> Option<T> {
		let mut sampler = self.sampler.lock().unwrap_or_else(PoisonError::into_inner);
		match f(&mut sampler) {
			Ok(value) => {
				self.last_error.store(0, Ordering::Relaxed);
				Some(value)
			},
			Err(e) => {
				log::warn!("{e}");
				self.last_error.store(e.code(), Ordering::Relaxed);
				None
			},
		}
	}
}

fn write_status(status: *mut i32, code: i32) {
	if !status.is_null() {
		// SAFETY: caller promises a non-null status points to writable memory
		unsafe { *status = code };
	}
}

/// Opens a sampler configured from the environment. Null on failure.
#[unsafe(no_mangle)]
pub extern "C" fn sampler_new() -> *mut SamplerHandle {
	// SAFETY: a null status pointer is never written
	unsafe { sampler_new_with_status(ptr::null_mut()) }
}

/// Like [`sampler_new`], also storing the status code in `status`.
///
/// # Safety
///
/// `status` must be null or valid for writing an `i32`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sampler_new_with_status(status: *mut i32) -> *mut SamplerHandle {
	match SamplerConfig::from_env().and_then(|config| Sampler::with_config(&config)) {
		Ok(sampler) => {
			write_status(status, 0);
			SamplerHandle::into_raw(sampler)
		},
		Err(e) => {
			log::warn!("{e}");
			write_status(status, e.code());
			ptr::null_mut()
		},
	}
}

/// Samples once. Null on failure; see [`sampler_last_error`].
///
/// # Safety
///
/// `sampler` must be null or a live pointer from `sampler_new*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sampler_get_metrics(sampler: *mut SamplerHandle) -> *mut Metrics {
	// SAFETY: forwarded caller contract
	let Some(handle) = (unsafe { sampler.as_ref() }) else {
		return ptr::null_mut();
	};
	match handle.with_sampler(Sampler::sample) {
		Some(metrics) => Box::into_raw(Box::new(metrics)),
		None => ptr::null_mut(),
	}
}

/// Samples over a fixed window of `window_ms` milliseconds, blocking meanwhile.
///
/// # Safety
///
/// `sampler` must be null or a live pointer from `sampler_new*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sampler_get_metrics_window(sampler: *mut SamplerHandle, window_ms: u32) -> *mut Metrics {
	// SAFETY: forwarded caller contract
	let Some(handle) = (unsafe { sampler.as_ref() }) else {
		return ptr::null_mut();
	};
	let window = Duration::from_millis(u64::from(window_ms));
	match handle.with_sampler(|s| s.sample_window(window)) {
		Some(metrics) => Box::into_raw(Box::new(metrics)),
		None => ptr::null_mut(),
	}
}

/// Status code of the last call on `sampler`: 0 on success, otherwise the
/// failing error's code. A null handle reports the invalid-handle code.
///
/// # Safety
///
/// `sampler` must be null or a live pointer from `sampler_new*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sampler_last_error(sampler: *const SamplerHandle) -> i32 {
	// SAFETY: forwarded caller contract
	match unsafe { sampler.as_ref() } {
		Some(handle) => handle.last_error.load(Ordering::Relaxed),
		None => SamplerError::InvalidHandle.code(),
	}
}

/// Closes and frees a sampler. Null is ignored.
///
/// # Safety
///
/// `sampler` must be null or a pointer from `sampler_new*` not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sampler_free(sampler: *mut SamplerHandle) {
	if !sampler.is_null() {
		// SAFETY: ownership returns from the caller exactly once
		drop(unsafe { Box::from_raw(sampler) });
	}
}

/// Frees a snapshot. Null is ignored.
///
/// # Safety
///
/// `metrics` must be null or a pointer from `sampler_get_metrics*` not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn metrics_free(metrics: *mut Metrics) {
	if !metrics.is_null() {
		// SAFETY: ownership returns from the caller exactly once
		drop(unsafe { Box::from_raw(metrics) });
	}
}

/// Detects the SoC topology. Null when the platform is unsupported or the
/// environment is invalid.
#[unsafe(no_mangle)]
pub extern "C" fn get_soc_info() -> *mut SocInfo {
	match crate::get_soc_info() {
		Ok(info) => Box::into_raw(Box::new(info)),
		Err(e) => {
			log::warn!("{e}");
			ptr::null_mut()
		},
	}
}

/// Frees a topology descriptor. Null is ignored.
///
/// # Safety
///
/// `info` must be null or a pointer from `get_soc_info` not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn soc_info_free(info: *mut SocInfo) {
	if !info.is_null() {
		// SAFETY: ownership returns from the caller exactly once
		drop(unsafe { Box::from_raw(info) });
	}
}
