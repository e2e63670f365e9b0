//! Backend registry: the scheme → backend table.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{VfsError, VfsResult};

/// Scheme that scheme-less paths route to.
pub const LOCAL_SCHEME: &str = "file";

/// Maps schemes to backend instances.
///
/// One shared instance per scheme for the process lifetime; lookups hand
/// back clones of the same `Arc`. The table is read-mostly: registration is
/// expected at startup, but reads and writes are safe to interleave — a
/// concurrent reader sees either the old or the new mapping, never a torn
/// entry.
///
/// The registry is an explicit object, not ambient global state. Construct
/// one per process (or per test) and hand it to [`Vfs::new`](crate::Vfs::new).
pub struct BackendRegistry {
    backends: RwLock<HashMap<String, Arc<dyn Backend>>>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(HashMap::new()),
        }
    }

    /// Register a backend for a scheme.
    ///
    /// Fails with [`VfsError::DuplicateScheme`] if the scheme is already
    /// taken; use [`register_replace`](Self::register_replace) to swap a
    /// backend deliberately.
    pub fn register(
        &self,
        scheme: impl Into<String>,
        backend: impl Backend + 'static,
    ) -> VfsResult<()> {
        self.register_arc(scheme, Arc::new(backend))
    }

    /// Register a backend (already wrapped in `Arc`) for a scheme.
    pub fn register_arc(
        &self,
        scheme: impl Into<String>,
        backend: Arc<dyn Backend>,
    ) -> VfsResult<()> {
        let scheme = scheme.into();
        let mut backends = self.backends.write();
        if backends.contains_key(&scheme) {
            return Err(VfsError::DuplicateScheme(scheme));
        }
        debug!(scheme = %scheme, "registering backend");
        backends.insert(scheme, backend);
        Ok(())
    }

    /// Register a backend, replacing any existing registration.
    pub fn register_replace(&self, scheme: impl Into<String>, backend: impl Backend + 'static) {
        let scheme = scheme.into();
        debug!(scheme = %scheme, "registering backend (replace)");
        self.backends.write().insert(scheme, Arc::new(backend));
    }

    /// Look up the backend for a scheme.
    pub fn lookup(&self, scheme: &str) -> Option<Arc<dyn Backend>> {
        self.backends.read().get(scheme).cloned()
    }

    /// All registered schemes, in no particular order.
    pub fn schemes(&self) -> Vec<String> {
        self.backends.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;

    #[test]
    fn test_lookup_after_register_returns_same_instance() {
        let registry = BackendRegistry::new();
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        registry.register_arc("mem", Arc::clone(&backend)).unwrap();

        let found = registry.lookup("mem").unwrap();
        assert!(Arc::ptr_eq(&found, &backend));
    }

    #[test]
    fn test_duplicate_register_fails() {
        let registry = BackendRegistry::new();
        registry.register("mem", MemoryBackend::new()).unwrap();

        let result = registry.register("mem", MemoryBackend::new());
        assert!(matches!(result, Err(VfsError::DuplicateScheme(s)) if s == "mem"));

        // Replace is the explicit escape hatch.
        registry.register_replace("mem", MemoryBackend::new());
        assert!(registry.lookup("mem").is_some());
    }

    #[test]
    fn test_lookup_unknown_scheme() {
        let registry = BackendRegistry::new();
        assert!(registry.lookup("nope").is_none());
    }

    #[test]
    fn test_schemes() {
        let registry = BackendRegistry::new();
        registry.register("a", MemoryBackend::new()).unwrap();
        registry.register("b", MemoryBackend::new()).unwrap();

        let mut schemes = registry.schemes();
        schemes.sort();
        assert_eq!(schemes, vec!["a", "b"]);
    }

    #[test]
    fn test_concurrent_lookups() {
        let registry = Arc::new(BackendRegistry::new());
        registry.register(LOCAL_SCHEME, MemoryBackend::new()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(registry.lookup(LOCAL_SCHEME).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
