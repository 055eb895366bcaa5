use crate::errors::{CoreError, CoreResult};
use crate::http_client::{build_client, ADAPTER_TIMEOUT};
use crate::models::ArtistMetadata;
use crate::models::ImageResult;
use crate::providers::{ArtistSearchResult, Provider};
use crate::rate_limiter::RateLimiterRegistry;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

const BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Last.fm: `artist.search`/`artist.getinfo`, switching the `mbid` query
/// param in for `artist` once the id looks like a 36-char MusicBrainz UUID,
/// per §4.2. No image surface — `get_images` is always empty. Biographies
/// carry a trailing "Read more on Last.fm" attribution link that must be
/// stripped before the text is usable as a normalized field.
pub struct LastFmProvider {
    client: ClientWithMiddleware,
    api_key: Option<String>,
}

impl LastFmProvider {
    pub fn new(registry: &Arc<RateLimiterRegistry>, api_key: Option<String>) -> Self {
        Self {
            client: build_client("lastfm", registry, ADAPTER_TIMEOUT),
            api_key,
        }
    }

    fn key(&self) -> CoreResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| CoreError::auth_required("lastfm"))
    }
}

/// An MBID is a 36-char lowercase-hex UUID; anything else is treated as a
/// free-text artist name for the `artist` query param.
fn is_mbid(id: &str) -> bool {
    id.len() == 36 && id.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// Last.fm appends `<a href="...">Read more on Last.fm</a>` to bios; strip
/// it so the stored biography is plain prose.
fn strip_attribution(bio: &str) -> String {
    match bio.find("<a href=") {
        Some(idx) => bio[..idx].trim_end().to_string(),
        None => bio.trim().to_string(),
    }
}

#[async_trait]
impl Provider for LastFmProvider {
    fn name(&self) -> &'static str {
        "lastfm"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn search_artist(&self, name: &str) -> CoreResult<Vec<ArtistSearchResult>> {
        if name.is_empty() {
            return Err(CoreError::NotFound);
        }
        let key = self.key()?;

        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("method", "artist.search"),
                ("artist", name),
                ("api_key", key),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::from_status("lastfm", status));
        }

        let body: LfmSearchResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode last.fm search response");
            CoreError::provider_unavailable("lastfm")
        })?;

        Ok(body
            .results
            .matches
            .artist
            .into_iter()
            .map(|a| ArtistSearchResult {
                provider_id: a.name.clone(),
                name: a.name,
                disambiguation: None,
                score: None,
            })
            .collect())
    }

    async fn get_artist(&self, id: &str) -> CoreResult<ArtistMetadata> {
        if id.is_empty() {
            return Err(CoreError::NotFound);
        }
        let key = self.key()?;

        let query: Vec<(&str, &str)> = if is_mbid(id) {
            vec![
                ("method", "artist.getinfo"),
                ("mbid", id),
                ("api_key", key),
                ("format", "json"),
            ]
        } else {
            vec![
                ("method", "artist.getinfo"),
                ("artist", id),
                ("api_key", key),
                ("format", "json"),
            ]
        };

        let response = self.client.get(BASE_URL).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::from_status("lastfm", status));
        }

        let body: LfmArtistResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode last.fm artist response");
            CoreError::provider_unavailable("lastfm")
        })?;

        let Some(artist) = body.artist else {
            return Err(CoreError::NotFound);
        };

        Ok(ArtistMetadata {
            name: Some(artist.name),
            biography: artist.bio.map(|b| strip_attribution(&b.content)),
            genres: artist
                .tags
                .map(|t| t.tag.into_iter().map(|tag| tag.name).collect())
                .unwrap_or_default(),
            musicbrainz_id: artist.mbid.filter(|m| !m.is_empty()),
            ..Default::default()
        })
    }

    async fn get_images(&self, _id: &str) -> CoreResult<Vec<ImageResult>> {
        Ok(vec![])
    }
}

#[derive(Debug, Deserialize)]
struct LfmSearchResponse {
    results: LfmSearchResults,
}

#[derive(Debug, Deserialize)]
struct LfmSearchResults {
    #[serde(rename = "artistmatches")]
    matches: LfmArtistMatches,
}

#[derive(Debug, Default, Deserialize)]
struct LfmArtistMatches {
    #[serde(default)]
    artist: Vec<LfmSearchArtist>,
}

#[derive(Debug, Deserialize)]
struct LfmSearchArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct LfmArtistResponse {
    artist: Option<LfmArtist>,
}

#[derive(Debug, Deserialize)]
struct LfmArtist {
    name: String,
    mbid: Option<String>,
    bio: Option<LfmBio>,
    tags: Option<LfmTags>,
}

#[derive(Debug, Deserialize)]
struct LfmBio {
    content: String,
}

#[derive(Debug, Deserialize)]
struct LfmTags {
    #[serde(default)]
    tag: Vec<LfmTag>,
}

#[derive(Debug, Deserialize)]
struct LfmTag {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_36_char_uuid_as_mbid() {
        assert!(is_mbid("5b11f4ce-a62d-471e-81fc-a69a8278c7da"));
        assert!(!is_mbid("Radiohead"));
        assert!(!is_mbid("5b11f4ce-a62d-471e-81fc")); // too short
    }

    #[test]
    fn strips_trailing_lastfm_attribution_link() {
        let bio = "Radiohead are an English rock band. <a href=\"https://www.last.fm/music/Radiohead\">Read more on Last.fm</a>";
        assert_eq!(
            strip_attribution(bio),
            "Radiohead are an English rock band."
        );
    }

    #[test]
    fn strip_attribution_is_noop_without_link() {
        assert_eq!(strip_attribution("plain bio text"), "plain bio text");
    }
}
