//! Error types for the sampler boundary.
//!
//! Backend code works in `io::Result` the way register and sysfs reads
//! naturally do; the boundary operations (open, sample, topology) convert
//! into [`SamplerError`] with the context of what was being attempted.

use std::io;

use thiserror::Error;

/// Failure of a boundary operation.
#[derive(Debug, Error)]
pub enum SamplerError {
	/// Chip identity or core/frequency enumeration could not be determined.
	#[error("unsupported platform: {0}")]
	UnsupportedPlatform(String),

	/// The telemetry source could not be initialized.
	#[error("telemetry backend unavailable: {0}")]
	BackendUnavailable(String),

	/// A single poll failed. The handle's rate state is left untouched.
	#[error("sample failed: {0}")]
	SampleFailed(String),

	/// Operation attempted on a closed or null handle.
	#[error("invalid sampler handle")]
	InvalidHandle,
}

impl SamplerError {
	/// Stable status code used across the C boundary. Zero means success.
	pub const fn code(&self) -> i32 {
		match self {
			SamplerError::UnsupportedPlatform(_) => 1,
			SamplerError::BackendUnavailable(_) => 2,
			SamplerError::SampleFailed(_) => 3,
			SamplerError::InvalidHandle => 4,
		}
	}

	pub(crate) fn unsupported(context: &str, err: io::Error) -> Self {
		SamplerError::UnsupportedPlatform(format!("{context}: {err}"))
	}

	pub(crate) fn unavailable(context: &str, err: io::Error) -> Self {
		SamplerError::BackendUnavailable(format!("{context}: {err}"))
	}

	pub(crate) fn sample_failed(context: &str, err: io::Error) -> Self {
		SamplerError::SampleFailed(format!("{context}: {err}"))
	}
}

/// Result type alias for sampler operations.
pub type Result<T> = std::result::Result<T, SamplerError>;
