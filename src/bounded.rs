//! Fixed-capacity values that cross the C boundary without side allocations.

use std::fmt;

use crate::constants::FREQ_TABLE_CAPACITY;

/// Ordered set of supported frequency steps in MHz with an explicit valid count
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FreqTable {
	freqs: [u32; FREQ_TABLE_CAPACITY],
	count: u8,
}

impl FreqTable {
	pub const CAPACITY: usize = FREQ_TABLE_CAPACITY;

	pub const fn empty() -> Self {
		Self {
			freqs: [0; FREQ_TABLE_CAPACITY],
			count: 0,
		}
	}

	/// Builds a table from arbitrary steps: zeros dropped, sorted, deduplicated.
	///
	/// More steps than fit are thinned evenly; the lowest and highest step are
	/// always kept so `min`/`max` stay the real hardware limits.
	pub fn from_slice(steps: &[u32]) -> Self {
		let mut sorted: Vec<u32> = steps.iter().copied().filter(|&f| f > 0).collect();
		sorted.sort_unstable();
		sorted.dedup();

		let mut table = Self::empty();
		let n = sorted.len();
		if n <= FREQ_TABLE_CAPACITY {
			table.freqs[..n].copy_from_slice(&sorted);
			table.count = n as u8;
			return table;
		}

		// Index i * (n - 1) / (CAPACITY - 1) hits 0 and n - 1 and is strictly increasing
		let last = FREQ_TABLE_CAPACITY - 1;
		for (i, slot) in table.freqs.iter_mut().enumerate() {
			*slot = sorted[i * (n - 1) / last];
		}
		table.count = FREQ_TABLE_CAPACITY as u8;
		table
	}

	pub fn as_slice(&self) -> &[u32] {
		&self.freqs[..self.len()]
	}

	pub fn len(&self) -> usize {
		(self.count as usize).min(FREQ_TABLE_CAPACITY)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn min(&self) -> Option<u32> {
		self.as_slice().first().copied()
	}

	pub fn max(&self) -> Option<u32> {
		self.as_slice().last().copied()
	}

	/// Clamps `freq` into the table range; an empty table leaves it untouched
	pub fn clamp(&self, freq: u32) -> u32 {
		match (self.min(), self.max()) {
			(Some(lo), Some(hi)) => freq.clamp(lo, hi),
			_ => freq,
		}
	}
}

impl Default for FreqTable {
	fn default() -> Self {
		Self::empty()
	}
}

impl fmt::Debug for FreqTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.as_slice()).finish()
	}
}

/// NUL-terminated UTF-8 text in a fixed buffer of `N` bytes
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedStr<const N: usize> {
	bytes: [u8; N],
}

impl<const N: usize> FixedStr<N> {
	/// Copies `text`, truncated on a char boundary so a terminating NUL always fits
	pub fn new(text: &str) -> Self {
		let mut bytes = [0u8; N];
		let mut end = text.len().min(N.saturating_sub(1));
		while !text.is_char_boundary(end) {
			end -= 1;
		}
		bytes[..end].copy_from_slice(&text.as_bytes()[..end]);
		Self { bytes }
	}

	pub fn as_str(&self) -> &str {
		let end = self.bytes.iter().position(|&b| b == 0).unwrap_or(N);
		// Only ever filled from &str on a char boundary
		std::str::from_utf8(&self.bytes[..end]).unwrap_or_default()
	}

	pub fn is_empty(&self) -> bool {
		self.as_str().is_empty()
	}
}

impl<const N: usize> Default for FixedStr<N> {
	fn default() -> Self {
		Self { bytes: [0; N] }
	}
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self.as_str(), f)
	}
}

impl<const N: usize> fmt::Display for FixedStr<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
