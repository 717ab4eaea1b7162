use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::ConfigError;

/// Immutable list of equivalent service endpoints used round-robin.
///
/// The cursor is owned by the ring and advanced atomically, so every call to
/// [`ShardRing::next`] moves exactly one step even when renders race.
pub struct ShardRing {
    endpoints: Arc<[String]>,
    cursor: AtomicUsize,
}

impl ShardRing {
    pub fn new(endpoints: Vec<String>) -> Result<Self, ConfigError> {
        if endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        if let Some(idx) = endpoints.iter().position(|e| e.is_empty()) {
            return Err(ConfigError::EmptyEndpoint(idx));
        }
        Ok(Self {
            endpoints: endpoints.into(),
            cursor: AtomicUsize::new(0),
        })
    }

    /// Selects the endpoint for this rotation step and advances the cursor.
    pub fn next(&self) -> &str {
        if self.endpoints.len() == 1 {
            return &self.endpoints[0];
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        &self.endpoints[idx % self.endpoints.len()]
    }

    pub fn all(&self) -> &[String] {
        &self.endpoints
    }
}

// A copy shares no rotation progress with its source.
impl Clone for ShardRing {
    fn clone(&self) -> Self {
        Self {
            endpoints: self.endpoints.iter().cloned().collect(),
            cursor: AtomicUsize::new(0),
        }
    }
}

impl std::fmt::Debug for ShardRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardRing")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}
