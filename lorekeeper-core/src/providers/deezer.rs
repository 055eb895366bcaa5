use crate::errors::{CoreError, CoreResult};
use crate::http_client::{build_client, ADAPTER_TIMEOUT};
use crate::models::{ArtistMetadata, ImageResult, ImageType};
use crate::providers::{ArtistSearchResult, Provider};
use crate::rate_limiter::RateLimiterRegistry;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

const BASE_URL: &str = "https://api.deezer.com";

/// Deezer IDs are always numeric; adapters that don't search by MBID must
/// reject ids that don't match their native format with `NotFound` before
/// making any HTTP call, per §4.2.
fn is_native_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

/// Deezer falls back to a generic silhouette for artists with no photo;
/// those URLs contain the literal `/images/artist//` segment (empty id)
/// and must be filtered out rather than stored as real artwork.
fn is_default_photo(url: &str) -> bool {
    url.contains("/images/artist//")
}

pub struct DeezerProvider {
    client: ClientWithMiddleware,
}

impl DeezerProvider {
    pub fn new(registry: &Arc<RateLimiterRegistry>) -> Self {
        Self {
            client: build_client("deezer", registry, ADAPTER_TIMEOUT),
        }
    }
}

#[async_trait]
impl Provider for DeezerProvider {
    fn name(&self) -> &'static str {
        "deezer"
    }

    fn requires_auth(&self) -> bool {
        false
    }

    async fn search_artist(&self, name: &str) -> CoreResult<Vec<ArtistSearchResult>> {
        if name.is_empty() {
            return Err(CoreError::NotFound);
        }

        let response = self
            .client
            .get(format!("{BASE_URL}/search/artist"))
            .query(&[("q", name)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::from_status("deezer", status));
        }

        let body: DeezerSearchResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode deezer search response");
            CoreError::provider_unavailable("deezer")
        })?;

        Ok(body
            .data
            .into_iter()
            .map(|a| ArtistSearchResult {
                provider_id: a.id.to_string(),
                name: a.name,
                disambiguation: None,
                score: None,
            })
            .collect())
    }

    async fn get_artist(&self, id: &str) -> CoreResult<ArtistMetadata> {
        if !is_native_id(id) {
            return Err(CoreError::NotFound);
        }

        let response = self
            .client
            .get(format!("{BASE_URL}/artist/{id}"))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(CoreError::NotFound);
        }
        if !status.is_success() {
            return Err(CoreError::from_status("deezer", status));
        }

        let body: DeezerArtist = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode deezer artist response");
            CoreError::provider_unavailable("deezer")
        })?;

        if body.error.is_some() {
            return Err(CoreError::NotFound);
        }

        Ok(ArtistMetadata {
            name: Some(body.name),
            ..Default::default()
        })
    }

    async fn get_images(&self, id: &str) -> CoreResult<Vec<ImageResult>> {
        if !is_native_id(id) {
            return Err(CoreError::NotFound);
        }

        let response = self
            .client
            .get(format!("{BASE_URL}/artist/{id}"))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(vec![]);
        }
        if !status.is_success() {
            return Err(CoreError::from_status("deezer", status));
        }

        let body: DeezerArtist = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode deezer artist response");
            CoreError::provider_unavailable("deezer")
        })?;

        if body.error.is_some() {
            return Ok(vec![]);
        }

        let mut images = Vec::new();
        if let Some(url) = body.picture_big.filter(|u| !is_default_photo(u)) {
            images.push(ImageResult {
                url,
                image_type: ImageType::Thumb,
                width: None,
                height: None,
                likes: None,
                language: None,
                source: "deezer".to_string(),
            });
        }
        Ok(images)
    }
}

#[derive(Debug, Deserialize)]
struct DeezerSearchResponse {
    #[serde(default)]
    data: Vec<DeezerSearchArtist>,
}

#[derive(Debug, Deserialize)]
struct DeezerSearchArtist {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DeezerArtist {
    #[serde(default)]
    error: Option<DeezerError>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture_big: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeezerError {
    #[allow(dead_code)]
    #[serde(default)]
    message: String,
}
