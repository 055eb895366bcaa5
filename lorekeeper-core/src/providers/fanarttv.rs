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

const BASE_URL: &str = "https://webservice.fanart.tv/v3/music";

/// Fanart.tv: images only, keyed by MBID. No search and no artist metadata
/// per §4.2 — `search_artist`/`get_artist` return empty results, not
/// errors, matching "an adapter that has no data for an op returns an
/// empty result".
pub struct FanartTvProvider {
    client: ClientWithMiddleware,
    api_key: Option<String>,
}

impl FanartTvProvider {
    pub fn new(registry: &Arc<RateLimiterRegistry>, api_key: Option<String>) -> Self {
        Self {
            client: build_client("fanarttv", registry, ADAPTER_TIMEOUT),
            api_key,
        }
    }
}

#[async_trait]
impl Provider for FanartTvProvider {
    fn name(&self) -> &'static str {
        "fanarttv"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn search_artist(&self, _name: &str) -> CoreResult<Vec<ArtistSearchResult>> {
        Ok(vec![])
    }

    async fn get_artist(&self, _id: &str) -> CoreResult<ArtistMetadata> {
        Ok(ArtistMetadata::default())
    }

    async fn get_images(&self, mbid: &str) -> CoreResult<Vec<ImageResult>> {
        if mbid.is_empty() {
            return Err(CoreError::NotFound);
        }
        let Some(api_key) = &self.api_key else {
            return Err(CoreError::auth_required("fanarttv"));
        };

        let url = format!("{BASE_URL}/{mbid}");
        let response = self
            .client
            .get(url)
            .query(&[("api_key", api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(vec![]);
        }
        if !status.is_success() {
            return Err(CoreError::from_status("fanarttv", status));
        }

        let body: FanartResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode fanart.tv response");
            CoreError::provider_unavailable("fanarttv")
        })?;

        Ok(map_images(body))
    }
}

fn map_images(body: FanartResponse) -> Vec<ImageResult> {
    let mut images = Vec::new();
    push_bucket(&mut images, body.artistthumb, ImageType::Thumb);
    push_bucket(&mut images, body.artistbackground, ImageType::Fanart);
    push_bucket(&mut images, body.hdmusiclogo, ImageType::HdLogo);
    push_bucket(&mut images, body.musiclogo, ImageType::Logo);
    push_bucket(&mut images, body.musicbanner, ImageType::Banner);
    images
}

fn push_bucket(out: &mut Vec<ImageResult>, bucket: Option<Vec<FanartImage>>, image_type: ImageType) {
    for img in bucket.unwrap_or_default() {
        out.push(ImageResult {
            url: img.url,
            image_type,
            width: None,
            height: None,
            likes: img.likes.and_then(|l| l.parse().ok()),
            language: img.lang,
            source: "fanarttv".to_string(),
        });
    }
}

#[derive(Debug, Default, Deserialize)]
struct FanartResponse {
    #[serde(default)]
    artistthumb: Option<Vec<FanartImage>>,
    #[serde(default)]
    artistbackground: Option<Vec<FanartImage>>,
    #[serde(default)]
    hdmusiclogo: Option<Vec<FanartImage>>,
    #[serde(default)]
    musiclogo: Option<Vec<FanartImage>>,
    #[serde(default)]
    musicbanner: Option<Vec<FanartImage>>,
}

#[derive(Debug, Deserialize)]
struct FanartImage {
    url: String,
    likes: Option<String>,
    lang: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_response_buckets_to_image_types() {
        let body = FanartResponse {
            artistthumb: Some(vec![FanartImage {
                url: "https://example/thumb.jpg".to_string(),
                likes: Some("3".to_string()),
                lang: Some("en".to_string()),
            }]),
            artistbackground: Some(vec![FanartImage {
                url: "https://example/bg.jpg".to_string(),
                likes: None,
                lang: None,
            }]),
            hdmusiclogo: Some(vec![FanartImage {
                url: "https://example/hdlogo.png".to_string(),
                likes: None,
                lang: None,
            }]),
            musiclogo: None,
            musicbanner: None,
        };
        let images = map_images(body);
        assert_eq!(images.len(), 3);
        assert_eq!(images[0].image_type, ImageType::Thumb);
        assert_eq!(images[0].likes, Some(3));
        assert_eq!(images[1].image_type, ImageType::Fanart);
        assert_eq!(images[2].image_type, ImageType::HdLogo);
    }
}
