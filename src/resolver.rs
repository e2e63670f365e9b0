//! Path resolution: scheme parsing and backend selection.

use std::sync::Arc;

use crate::backend::Backend;
use crate::error::{VfsError, VfsResult};
use crate::registry::{BackendRegistry, LOCAL_SCHEME};

/// Splits paths into scheme + backend-local path and selects the backend.
///
/// Resolution is a pure function of the path string: no I/O, no working
/// directory, and no caching (a path may describe a resource that does not
/// exist yet).
#[derive(Debug, Clone)]
pub struct PathResolver {
    registry: Arc<BackendRegistry>,
}

impl PathResolver {
    /// Create a resolver over the given registry.
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this resolver routes through.
    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Split a path on the first `://`.
    ///
    /// Returns `(scheme, backend_local_path)`; scheme is `None` when the
    /// separator is absent, and the local path is then the input unchanged.
    pub fn split_scheme(path: &str) -> (Option<&str>, &str) {
        match path.split_once("://") {
            Some((scheme, rest)) => (Some(scheme), rest),
            None => (None, path),
        }
    }

    /// Resolve a path to its backend and backend-local path.
    ///
    /// Scheme-less paths route to the [`LOCAL_SCHEME`] backend with the
    /// path passed through unmodified. A scheme with no registered backend
    /// is a hard [`VfsError::UnknownScheme`] failure — including the local
    /// scheme itself if nothing is registered for it.
    pub fn resolve(&self, path: &str) -> VfsResult<(Arc<dyn Backend>, String)> {
        let (scheme, local) = Self::split_scheme(path);
        let scheme = scheme.unwrap_or(LOCAL_SCHEME);
        match self.registry.lookup(scheme) {
            Some(backend) => Ok((backend, local.to_string())),
            None => Err(VfsError::unknown_scheme(scheme)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;

    fn resolver_with_local() -> (PathResolver, Arc<dyn Backend>) {
        let registry = Arc::new(BackendRegistry::new());
        let local: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        registry
            .register_arc(LOCAL_SCHEME, Arc::clone(&local))
            .unwrap();
        (PathResolver::new(registry), local)
    }

    #[test]
    fn test_split_scheme() {
        assert_eq!(
            PathResolver::split_scheme("mem://a/b.txt"),
            (Some("mem"), "a/b.txt")
        );
        assert_eq!(PathResolver::split_scheme("/tmp/x"), (None, "/tmp/x"));
        assert_eq!(
            PathResolver::split_scheme("nfs://host/share"),
            (Some("nfs"), "host/share")
        );
    }

    #[test]
    fn test_schemeless_routes_to_local_unmodified() {
        let (resolver, local) = resolver_with_local();

        for path in ["/tmp/file.txt", "relative/path", "no-slashes"] {
            let (backend, local_path) = resolver.resolve(path).unwrap();
            assert!(Arc::ptr_eq(&backend, &local));
            assert_eq!(local_path, path);
        }
    }

    #[test]
    fn test_scheme_stripped_for_backend() {
        let registry = Arc::new(BackendRegistry::new());
        registry.register("mem", MemoryBackend::new()).unwrap();
        let resolver = PathResolver::new(registry);

        let (_, local_path) = resolver.resolve("mem://dir/file.txt").unwrap();
        assert_eq!(local_path, "dir/file.txt");
    }

    #[test]
    fn test_unknown_scheme_is_hard_fail() {
        let (resolver, _) = resolver_with_local();
        let result = resolver.resolve("gopher://hole");
        assert!(matches!(result, Err(VfsError::UnknownScheme(s)) if s == "gopher"));
    }

    #[test]
    fn test_missing_local_backend() {
        let resolver = PathResolver::new(Arc::new(BackendRegistry::new()));
        let result = resolver.resolve("/tmp/file.txt");
        assert!(matches!(result, Err(VfsError::UnknownScheme(s)) if s == LOCAL_SCHEME));
    }
}
