// ID Provider Port (for deterministic testing)

use std::sync::atomic::{AtomicU64, Ordering};

/// ID provider interface (allows deterministic IDs in tests)
///
/// Produces surrogate ids such as `APP-1f0c9a2b`. Recruitment ids are not
/// produced here; they come from the sequence allocator.
pub trait IdProvider: Send + Sync {
    /// Generate a new unique id with the given prefix (e.g. `"APP"`)
    fn generate_id(&self, prefix: &str) -> String;
}

/// UUID v4 provider (production)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self, prefix: &str) -> String {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}", prefix, &uuid[..8])
    }
}

/// Counter-based provider (`APP-1`, `APP-2`, ...)
#[derive(Default)]
pub struct SequentialIdProvider {
    counter: AtomicU64,
}

impl SequentialIdProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdProvider for SequentialIdProvider {
    fn generate_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", prefix, n)
    }
}
