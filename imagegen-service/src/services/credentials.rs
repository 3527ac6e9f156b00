//! Credential resolution for the provider API key.
//!
//! The key lives in the deployment environment, either as an environment
//! variable or as a mounted secret file. It is resolved lazily and cached
//! for the lifetime of the process; environment recycling is the only
//! invalidation.

use async_trait::async_trait;
use secrecy::Secret;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("secret {0} is not set")]
    Missing(String),

    #[error("failed to read secret from {0}: {1}")]
    Unreadable(String, String),
}

/// Supplies the provider API key from the secret store.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self) -> Result<Secret<String>, CredentialError>;
}

/// Resolver backed by a process environment variable.
pub struct EnvCredentialResolver {
    var_name: String,
}

impl EnvCredentialResolver {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }
}

#[async_trait]
impl CredentialResolver for EnvCredentialResolver {
    async fn resolve(&self) -> Result<Secret<String>, CredentialError> {
        match std::env::var(&self.var_name) {
            Ok(value) if !value.trim().is_empty() => Ok(Secret::new(value)),
            _ => Err(CredentialError::Missing(self.var_name.clone())),
        }
    }
}

/// Resolver backed by a mounted secret file (Docker/K8s secret volume).
pub struct FileCredentialResolver {
    path: PathBuf,
}

impl FileCredentialResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialResolver for FileCredentialResolver {
    async fn resolve(&self) -> Result<Secret<String>, CredentialError> {
        let location = self.path.display().to_string();

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CredentialError::Unreadable(location.clone(), e.to_string()))?;

        let key = contents.trim();
        if key.is_empty() {
            return Err(CredentialError::Missing(location));
        }

        Ok(Secret::new(key.to_string()))
    }
}

/// Caches the first successful resolution for the process lifetime.
///
/// Failures are not cached; the next request retries the inner resolver.
pub struct CachedCredentialResolver<R> {
    inner: R,
    cell: OnceCell<Secret<String>>,
}

impl<R> CachedCredentialResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cell: OnceCell::new(),
        }
    }
}

#[async_trait]
impl<R: CredentialResolver> CredentialResolver for CachedCredentialResolver<R> {
    async fn resolve(&self) -> Result<Secret<String>, CredentialError> {
        self.cell
            .get_or_try_init(|| self.inner.resolve())
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unique_var() -> String {
        format!("IMAGEGEN_TEST_KEY_{}", uuid::Uuid::new_v4().simple())
    }

    #[tokio::test]
    async fn env_resolver_returns_the_key() {
        let var = unique_var();
        std::env::set_var(&var, "sk-test");

        let key = EnvCredentialResolver::new(&var).resolve().await.unwrap();
        assert_eq!(key.expose_secret(), "sk-test");

        std::env::remove_var(&var);
    }

    #[tokio::test]
    async fn env_resolver_fails_when_unset_or_blank() {
        let var = unique_var();
        let resolver = EnvCredentialResolver::new(&var);
        assert!(matches!(
            resolver.resolve().await,
            Err(CredentialError::Missing(_))
        ));

        std::env::set_var(&var, "   ");
        assert!(matches!(
            resolver.resolve().await,
            Err(CredentialError::Missing(_))
        ));
        std::env::remove_var(&var);
    }

    #[tokio::test]
    async fn file_resolver_reads_and_trims_the_key() {
        let path = std::env::temp_dir().join(format!("key-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "sk-from-file\n").await.unwrap();

        let key = FileCredentialResolver::new(&path).resolve().await.unwrap();
        assert_eq!(key.expose_secret(), "sk-from-file");

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn file_resolver_fails_on_missing_file() {
        let path = std::env::temp_dir().join(format!("absent-{}", uuid::Uuid::new_v4()));
        assert!(matches!(
            FileCredentialResolver::new(&path).resolve().await,
            Err(CredentialError::Unreadable(_, _))
        ));
    }

    struct CountingResolver {
        calls: AtomicUsize,
        fail_first: AtomicUsize,
    }

    #[async_trait]
    impl CredentialResolver for CountingResolver {
        async fn resolve(&self) -> Result<Secret<String>, CredentialError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first.load(Ordering::SeqCst) > 0 {
                self.fail_first.fetch_sub(1, Ordering::SeqCst);
                return Err(CredentialError::Missing("counting".to_string()));
            }
            Ok(Secret::new("sk-counted".to_string()))
        }
    }

    #[tokio::test]
    async fn cached_resolver_resolves_once() {
        let resolver = CachedCredentialResolver::new(CountingResolver {
            calls: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
        });

        for _ in 0..3 {
            let key = resolver.resolve().await.unwrap();
            assert_eq!(key.expose_secret(), "sk-counted");
        }

        assert_eq!(resolver.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cached_resolver_retries_after_failure() {
        let resolver = CachedCredentialResolver::new(CountingResolver {
            calls: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(1),
        });

        assert!(resolver.resolve().await.is_err());
        assert!(resolver.resolve().await.is_ok());
        assert!(resolver.resolve().await.is_ok());

        // One failed attempt, one successful attempt, then the cache serves.
        assert_eq!(resolver.inner.calls.load(Ordering::SeqCst), 2);
    }
}
