//! Request counting, for diagnostics only.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counts round trips handed to the transport.
///
/// Clones share one count, so a counter can be passed to several clients or
/// kept by the caller to read later. Nothing depends on the value.
#[derive(Debug, Clone, Default)]
pub struct RequestCounter(Arc<AtomicU64>);

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one and return the new total.
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
