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

const FREE_KEY: &str = "123";
const V1_BASE: &str = "https://www.theaudiodb.com/api/v1/json";
const V2_BASE: &str = "https://www.theaudiodb.com/api/v2/json";

/// AudioDB: the free key (the literal string "123") uses v1 with the key
/// in the path; any other configured key is treated as premium and
/// switches to v2 with the key in an `X-API-KEY` header, per §4.2.
pub struct AudioDbProvider {
    client: ClientWithMiddleware,
    key: String,
}

impl AudioDbProvider {
    pub fn new(registry: &Arc<RateLimiterRegistry>, key: Option<String>) -> Self {
        Self {
            client: build_client("audiodb", registry, ADAPTER_TIMEOUT),
            key: key.unwrap_or_else(|| FREE_KEY.to_string()),
        }
    }

    fn is_premium(&self) -> bool {
        self.key != FREE_KEY
    }

    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> CoreResult<reqwest::Response> {
        let request = if self.is_premium() {
            self.client
                .get(format!("{V2_BASE}/{endpoint}"))
                .header("X-API-KEY", &self.key)
        } else {
            self.client.get(format!("{V1_BASE}/{}/{endpoint}", self.key))
        };

        let response = request.query(query).send().await?;
        let status = response.status();
        if !status.is_success() && status.as_u16() != 404 {
            return Err(CoreError::from_status("audiodb", status));
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for AudioDbProvider {
    fn name(&self) -> &'static str {
        "audiodb"
    }

    fn requires_auth(&self) -> bool {
        false
    }

    async fn search_artist(&self, name: &str) -> CoreResult<Vec<ArtistSearchResult>> {
        if name.is_empty() {
            return Err(CoreError::NotFound);
        }

        let response = self.get("search.php", &[("s", name)]).await?;
        if response.status().as_u16() == 404 {
            return Ok(vec![]);
        }

        let body: AudioDbArtists = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode audiodb search response");
            CoreError::provider_unavailable("audiodb")
        })?;

        Ok(body
            .artists
            .unwrap_or_default()
            .into_iter()
            .map(|a| ArtistSearchResult {
                provider_id: a.id,
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

        let response = self.get("artist.php", &[("i", id)]).await?;
        if response.status().as_u16() == 404 {
            return Err(CoreError::NotFound);
        }

        let body: AudioDbArtists = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode audiodb artist response");
            CoreError::provider_unavailable("audiodb")
        })?;

        let artist = body.artists.unwrap_or_default().into_iter().next().ok_or(CoreError::NotFound)?;
        Ok(map_artist(artist))
    }

    async fn get_images(&self, id: &str) -> CoreResult<Vec<ImageResult>> {
        if id.is_empty() {
            return Err(CoreError::NotFound);
        }

        // AudioDB serves imagery bundled inside the artist record rather
        // than a dedicated images endpoint.
        let response = self.get("artist.php", &[("i", id)]).await?;
        if response.status().as_u16() == 404 {
            return Ok(vec![]);
        }

        let body: AudioDbArtists = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode audiodb artist response");
            CoreError::provider_unavailable("audiodb")
        })?;

        let Some(artist) = body.artists.unwrap_or_default().into_iter().next() else {
            return Ok(vec![]);
        };
        Ok(map_images(artist))
    }
}

fn map_images(a: AudioDbArtist) -> Vec<ImageResult> {
    let mut images = Vec::new();
    push_image(&mut images, a.thumb, ImageType::Thumb);
    push_image(&mut images, a.logo, ImageType::Logo);
    push_image(&mut images, a.fanart, ImageType::Fanart);
    push_image(&mut images, a.fanart2, ImageType::Fanart);
    push_image(&mut images, a.fanart3, ImageType::Fanart);
    push_image(&mut images, a.banner, ImageType::Banner);
    images
}

fn push_image(out: &mut Vec<ImageResult>, url: Option<String>, image_type: ImageType) {
    if let Some(url) = url {
        if !url.is_empty() {
            out.push(ImageResult {
                url,
                image_type,
                width: None,
                height: None,
                likes: None,
                language: None,
                source: "audiodb".to_string(),
            });
        }
    }
}

/// Splits an AudioDB `/`-separated provider string into a set (genre, style
/// or mood), trimming whitespace and dropping empties.
fn split_provider_string(s: Option<&str>) -> Vec<String> {
    s.unwrap_or_default()
        .split('/')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn map_artist(a: AudioDbArtist) -> ArtistMetadata {
    ArtistMetadata {
        name: Some(a.name),
        sort_name: None,
        kind: None,
        gender: a.gender,
        disambiguation: None,
        country: a.country,
        biography: a.biography_en,
        genres: split_provider_string(a.genre.as_deref()),
        styles: split_provider_string(a.style.as_deref()),
        moods: split_provider_string(a.mood.as_deref()),
        members: vec![],
        aliases: Default::default(),
        urls: Default::default(),
        born: None,
        formed: a.formed_year,
        died: None,
        disbanded: None,
        musicbrainz_id: a.mbid,
        audiodb_id: Some(a.id),
        discogs_id: None,
        wikidata_id: None,
    }
}

#[derive(Debug, Default, Deserialize)]
struct AudioDbArtists {
    artists: Option<Vec<AudioDbArtist>>,
}

#[derive(Debug, Deserialize)]
struct AudioDbArtist {
    #[serde(rename = "idArtist")]
    id: String,
    #[serde(rename = "strArtist")]
    name: String,
    #[serde(rename = "strGenre")]
    genre: Option<String>,
    #[serde(rename = "strStyle")]
    style: Option<String>,
    #[serde(rename = "strMood")]
    mood: Option<String>,
    #[serde(rename = "strCountry")]
    country: Option<String>,
    #[serde(rename = "strGender")]
    gender: Option<String>,
    #[serde(rename = "strBiographyEN")]
    biography_en: Option<String>,
    #[serde(rename = "intFormedYear")]
    formed_year: Option<String>,
    #[serde(rename = "strMusicBrainzID")]
    mbid: Option<String>,
    #[serde(rename = "strArtistThumb")]
    thumb: Option<String>,
    #[serde(rename = "strArtistLogo")]
    logo: Option<String>,
    #[serde(rename = "strArtistFanart")]
    fanart: Option<String>,
    #[serde(rename = "strArtistFanart2")]
    fanart2: Option<String>,
    #[serde(rename = "strArtistFanart3")]
    fanart3: Option<String>,
    #[serde(rename = "strArtistBanner")]
    banner: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_key_is_not_premium() {
        let registry = Arc::new(RateLimiterRegistry::new());
        let provider = AudioDbProvider::new(&registry, None);
        assert!(!provider.is_premium());
        let provider = AudioDbProvider::new(&registry, Some("123".to_string()));
        assert!(!provider.is_premium());
    }

    #[test]
    fn any_other_key_is_premium() {
        let registry = Arc::new(RateLimiterRegistry::new());
        let provider = AudioDbProvider::new(&registry, Some("real-key".to_string()));
        assert!(provider.is_premium());
    }

    #[test]
    fn splits_slash_separated_provider_strings() {
        assert_eq!(
            split_provider_string(Some("Rock/Alternative Rock/Indie")),
            vec!["Rock", "Alternative Rock", "Indie"]
        );
        assert_eq!(split_provider_string(None), Vec::<String>::new());
    }

    #[test]
    fn maps_artist_record_image_fields_to_results() {
        let artist = AudioDbArtist {
            id: "111239".to_string(),
            name: "Coldplay".to_string(),
            genre: None,
            style: None,
            mood: None,
            country: None,
            gender: None,
            biography_en: None,
            formed_year: None,
            mbid: None,
            thumb: Some("https://example/thumb.jpg".to_string()),
            logo: Some("https://example/logo.png".to_string()),
            fanart: Some("https://example/fanart1.jpg".to_string()),
            fanart2: Some("https://example/fanart2.jpg".to_string()),
            fanart3: None,
            banner: None,
        };
        let images = map_images(artist);
        assert_eq!(images.len(), 4);
        assert_eq!(images[0].image_type, ImageType::Thumb);
        assert_eq!(images[1].image_type, ImageType::Logo);
        assert_eq!(images[2].image_type, ImageType::Fanart);
        assert_eq!(images[3].image_type, ImageType::Fanart);
    }

    #[test]
    fn empty_image_urls_are_skipped() {
        let mut images = Vec::new();
        push_image(&mut images, Some(String::new()), ImageType::Thumb);
        push_image(&mut images, None, ImageType::Logo);
        assert!(images.is_empty());
    }
}
