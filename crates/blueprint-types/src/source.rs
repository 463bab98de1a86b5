//! Type-bundle sources
//!
//! A bundle is addressed by a file name derived from its source locator (see
//! [`bundle_file_name`]). Sources only know how to turn such a file name into
//! a parsed [`TypeBundle`]; merging into a registry is left to the caller.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use tracing::{debug, info, instrument};

use crate::descriptor::TypeBundle;
use crate::error::FetchError;
use crate::registry::TypeRegistry;

/// Extension of published bundle files
const BUNDLE_EXTENSION: &str = ".typeinfo";

/// Extension of the libraries type sources are named after
const LIBRARY_EXTENSION: &str = ".dll";

/// Derive the bundle file name for a source locator.
///
/// `flame_graphics.dll` becomes `flame_graphics.typeinfo`; a locator without
/// the library extension gets the bundle extension appended.
pub fn bundle_file_name(source: &str) -> String {
    let stem = source.strip_suffix(LIBRARY_EXTENSION).unwrap_or(source);
    format!("{}{}", stem, BUNDLE_EXTENSION)
}

/// Somewhere type bundles can be fetched from
#[async_trait]
pub trait BundleSource: Send + Sync + Debug {
    /// Fetch and parse the bundle stored under `file_name`
    async fn fetch(&self, file_name: &str) -> Result<TypeBundle, FetchError>;
}

/// Fetches bundles over HTTP relative to a base URL
#[derive(Debug, Clone)]
pub struct HttpBundleSource {
    /// Base URL bundles are served under
    base_url: String,

    /// HTTP client
    client: Client,
}

impl HttpBundleSource {
    /// Create a new source with the given request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Format the URL of a bundle file
    fn bundle_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), file_name)
    }
}

#[async_trait]
impl BundleSource for HttpBundleSource {
    #[instrument(skip(self))]
    async fn fetch(&self, file_name: &str) -> Result<TypeBundle, FetchError> {
        let url = self.bundle_url(file_name);
        debug!("Fetching type bundle from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Http {
            url: url.clone(),
            source,
        })?;

        TypeBundle::from_json(&body).map_err(|source| FetchError::Malformed {
            file: file_name.to_string(),
            source,
        })
    }
}

/// Reads bundles from a local directory
#[derive(Debug, Clone)]
pub struct DirBundleSource {
    root: PathBuf,
}

impl DirBundleSource {
    /// Create a source reading from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BundleSource for DirBundleSource {
    #[instrument(skip(self))]
    async fn fetch(&self, file_name: &str) -> Result<TypeBundle, FetchError> {
        let path = self.root.join(file_name);
        debug!("Reading type bundle from {}", path.display());

        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound(file_name.to_string()));
            }
            Err(source) => return Err(FetchError::Io { path, source }),
        };

        TypeBundle::from_json(&body).map_err(|source| FetchError::Malformed {
            file: file_name.to_string(),
            source,
        })
    }
}

/// Serves bundles held in memory.
///
/// Useful for embedding a fixed set of types and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticBundleSource {
    bundles: HashMap<String, TypeBundle>,
}

impl StaticBundleSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bundle under a file name
    pub fn with_bundle(mut self, file_name: impl Into<String>, bundle: TypeBundle) -> Self {
        self.bundles.insert(file_name.into(), bundle);
        self
    }
}

#[async_trait]
impl BundleSource for StaticBundleSource {
    async fn fetch(&self, file_name: &str) -> Result<TypeBundle, FetchError> {
        self.bundles
            .get(file_name)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(file_name.to_string()))
    }
}

/// Fetch every required bundle and merge them into a fresh registry.
///
/// All fetches run concurrently; the returned future completes only once
/// every one of them has, and fails as soon as any of them fails.
#[instrument(skip(source))]
pub async fn preload(source: &dyn BundleSource, sources: &[String]) -> Result<TypeRegistry, FetchError> {
    let fetches = sources.iter().map(|locator| async move {
        let file_name = bundle_file_name(locator);
        let bundle = source.fetch(&file_name).await?;
        Ok::<_, FetchError>((file_name, bundle))
    });

    let bundles = try_join_all(fetches).await?;

    let mut registry = TypeRegistry::new();
    for (file_name, bundle) in bundles {
        registry.register_bundle(&file_name, bundle);
    }

    info!(
        bundles = sources.len(),
        udts = registry.udt_count(),
        enums = registry.enum_count(),
        functions = registry.function_count(),
        "Preloaded type bundles"
    );

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_file_name() {
        assert_eq!(bundle_file_name("flame_graphics.dll"), "flame_graphics.typeinfo");
        assert_eq!(bundle_file_name("flame_foundation"), "flame_foundation.typeinfo");
        assert_eq!(bundle_file_name("plugins/ui.dll"), "plugins/ui.typeinfo");
    }

    #[test]
    fn test_bundle_url_joins_cleanly() {
        let source = HttpBundleSource::new("http://localhost:8000/types/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            source.bundle_url("flame_sound.typeinfo"),
            "http://localhost:8000/types/flame_sound.typeinfo"
        );
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticBundleSource::new().with_bundle("math.typeinfo", TypeBundle::default());

        assert!(source.fetch("math.typeinfo").await.is_ok());
        match source.fetch("other.typeinfo").await {
            Err(FetchError::NotFound(name)) => assert_eq!(name, "other.typeinfo"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
}
