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

const BASE_URL: &str = "https://api.discogs.com";

/// Discogs: requires a token in an `Authorization: Discogs token=…` header
/// plus a User-Agent (already set on the shared client), per §4.2.
/// Generalizes the teacher's `DiscogsProvider` (which only implemented
/// artist-photo search via free-text query) into the full adapter
/// contract, and borrows the auth-header mechanics from the
/// `other_examples` chorrosion Discogs client.
pub struct DiscogsProvider {
    client: ClientWithMiddleware,
    token: Option<String>,
}

impl DiscogsProvider {
    pub fn new(registry: &Arc<RateLimiterRegistry>, token: Option<String>) -> Self {
        Self {
            client: build_client("discogs", registry, ADAPTER_TIMEOUT),
            token,
        }
    }

    fn auth_header(&self) -> CoreResult<String> {
        self.token
            .as_ref()
            .map(|t| format!("Discogs token={t}"))
            .ok_or_else(|| CoreError::auth_required("discogs"))
    }
}

#[async_trait]
impl Provider for DiscogsProvider {
    fn name(&self) -> &'static str {
        "discogs"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn search_artist(&self, name: &str) -> CoreResult<Vec<ArtistSearchResult>> {
        if name.is_empty() {
            return Err(CoreError::NotFound);
        }
        let auth = self.auth_header()?;

        let response = self
            .client
            .get(format!("{BASE_URL}/database/search"))
            .header("Authorization", auth)
            .query(&[("q", name), ("type", "artist")])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(vec![]);
        }
        if !status.is_success() {
            return Err(CoreError::from_status("discogs", status));
        }

        let body: DiscogsSearchResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode discogs search response");
            CoreError::provider_unavailable("discogs")
        })?;

        Ok(body
            .results
            .into_iter()
            .map(|r| ArtistSearchResult {
                provider_id: r.id.to_string(),
                name: r.title,
                disambiguation: None,
                score: None,
            })
            .collect())
    }

    async fn get_artist(&self, id: &str) -> CoreResult<ArtistMetadata> {
        if id.is_empty() {
            return Err(CoreError::NotFound);
        }
        let auth = self.auth_header()?;

        let response = self
            .client
            .get(format!("{BASE_URL}/artists/{id}"))
            .header("Authorization", auth)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(CoreError::NotFound);
        }
        if !status.is_success() {
            return Err(CoreError::from_status("discogs", status));
        }

        let body: DiscogsArtistResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode discogs artist response");
            CoreError::provider_unavailable("discogs")
        })?;

        Ok(ArtistMetadata {
            name: Some(body.name),
            biography: body.profile,
            discogs_id: Some(id.to_string()),
            urls: body
                .urls
                .unwrap_or_default()
                .into_iter()
                .enumerate()
                .map(|(i, u)| (format!("discogs_link_{i}"), u))
                .collect(),
            ..Default::default()
        })
    }

    async fn get_images(&self, id: &str) -> CoreResult<Vec<ImageResult>> {
        if id.is_empty() {
            return Err(CoreError::NotFound);
        }
        let auth = self.auth_header()?;

        let response = self
            .client
            .get(format!("{BASE_URL}/artists/{id}"))
            .header("Authorization", auth)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(vec![]);
        }
        if !status.is_success() {
            return Err(CoreError::from_status("discogs", status));
        }

        let body: DiscogsArtistResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode discogs artist response");
            CoreError::provider_unavailable("discogs")
        })?;

        Ok(body
            .images
            .unwrap_or_default()
            .into_iter()
            .map(|img| ImageResult {
                url: img.uri,
                image_type: ImageType::Thumb,
                width: img.width,
                height: img.height,
                likes: None,
                language: None,
                source: "discogs".to_string(),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct DiscogsSearchResponse {
    #[serde(default)]
    results: Vec<DiscogsSearchResultItem>,
}

#[derive(Debug, Deserialize)]
struct DiscogsSearchResultItem {
    id: u64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct DiscogsArtistResponse {
    name: String,
    profile: Option<String>,
    #[serde(default)]
    urls: Option<Vec<String>>,
    #[serde(default)]
    images: Option<Vec<DiscogsImage>>,
}

#[derive(Debug, Deserialize)]
struct DiscogsImage {
    uri: String,
    width: Option<u32>,
    height: Option<u32>,
}
