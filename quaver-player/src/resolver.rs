//! Source resolution seam
//!
//! Turns an opaque source locator (URL or free-text query) into something
//! the engine can stream, plus display metadata. Real resolvers (search
//! APIs, extractors) plug in behind the trait; the shipped
//! [`DirectResolver`] passes the locator through unchanged.

use async_trait::async_trait;
use quaver_common::{Error, Result};

/// A resolved, playable source
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    /// Locator the engine can stream directly
    pub playable_url: String,
    /// Display title
    pub title: String,
    /// Length in seconds, when the resolver knows it
    pub duration: Option<u64>,
}

/// Locator/query resolution
///
/// Implementations may call out to the network; callers run them under a
/// bounded timeout.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    async fn resolve(&self, locator: &str) -> Result<ResolvedSource>;
}

/// Passthrough resolver: the locator is taken as both the playable URL
/// and the title
pub struct DirectResolver;

#[async_trait]
impl SourceResolver for DirectResolver {
    async fn resolve(&self, locator: &str) -> Result<ResolvedSource> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(Error::Resolve("empty source locator".to_string()));
        }

        Ok(ResolvedSource {
            playable_url: locator.to_string(),
            title: locator.to_string(),
            duration: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn direct_resolver_passes_locator_through() {
        let resolved = DirectResolver
            .resolve("https://example.com/song.mp3")
            .await
            .unwrap();
        assert_eq!(resolved.playable_url, "https://example.com/song.mp3");
        assert_eq!(resolved.title, "https://example.com/song.mp3");
        assert_eq!(resolved.duration, None);
    }

    #[tokio::test]
    async fn direct_resolver_rejects_empty_locator() {
        assert!(DirectResolver.resolve("   ").await.is_err());
    }
}
