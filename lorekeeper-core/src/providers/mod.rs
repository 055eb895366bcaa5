pub mod audiodb;
pub mod deezer;
pub mod discogs;
pub mod fanarttv;
pub mod lastfm;
pub mod musicbrainz;
pub mod wikidata;

use crate::errors::CoreResult;
use crate::models::{ArtistMetadata, ImageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ArtistSearchResult {
    pub provider_id: String,
    pub name: String,
    pub disambiguation: Option<String>,
    pub score: Option<u32>,
}

/// §4.2 provider adapter contract: four operations plus identity. Mirrors
/// the shape of the teacher's `InfoProvider` trait (`tasks/providers/mod.rs`)
/// generalized from release/cover-art lookups to full artist metadata.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;
    fn requires_auth(&self) -> bool;

    async fn search_artist(&self, name: &str) -> CoreResult<Vec<ArtistSearchResult>>;
    async fn get_artist(&self, id: &str) -> CoreResult<ArtistMetadata>;
    async fn get_images(&self, id: &str) -> CoreResult<Vec<ImageResult>>;
}

/// Write-once-at-startup, lock-free-read-thereafter provider registry.
/// Grounded on the `other_examples` media `ProviderRegistry` (HashMap keyed
/// by provider name, looked up by `get`), repurposed from media-asset
/// providers to artist-metadata providers.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        Self { providers }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

/// Extracts the leading run of ASCII digits from a string.
pub(crate) fn leading_digits(s: &str) -> Option<String> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// §4.2 ID back-fill helper: last path segment of a URL, with `?`/`#`
/// stripped first.
pub(crate) fn last_path_segment(url: &str) -> Option<&str> {
    let without_fragment = url.split(['?', '#']).next().unwrap_or(url);
    without_fragment.trim_end_matches('/').rsplit('/').next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_digits_extracts_numeric_prefix() {
        assert_eq!(leading_digits("24941-a-ha"), Some("24941".to_string()));
        assert_eq!(leading_digits("a-ha"), None);
    }

    #[test]
    fn last_path_segment_strips_query_and_fragment() {
        assert_eq!(
            last_path_segment("https://www.discogs.com/artist/24941-a-ha?x=1#y"),
            Some("24941-a-ha")
        );
        assert_eq!(
            last_path_segment("https://www.wikidata.org/wiki/Q44190"),
            Some("Q44190")
        );
    }
}
