use crate::errors::{CoreError, CoreResult};
use crate::http_client::{build_client, ADAPTER_TIMEOUT};
use crate::models::{ArtistKind, ArtistMetadata, ImageResult, Member};
use crate::providers::{ArtistSearchResult, Provider};
use crate::rate_limiter::RateLimiterRegistry;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

const BASE_URL: &str = "https://musicbrainz.org/ws/2";

/// MusicBrainz adapter, hand-rolled directly against the JSON API (rather
/// than through an opinionated client crate) because the contract in §4.2
/// needs raw `url-rels`/`artist-rels` relation data — `member of band`
/// relations with instruments and join/leave dates — that a typed release-
/// search wrapper doesn't expose. The generic-GET-with-status-mapping shape
/// follows `other_examples`' chorrosion MusicBrainz client.
pub struct MusicBrainzProvider {
    client: ClientWithMiddleware,
}

impl MusicBrainzProvider {
    pub fn new(registry: &Arc<RateLimiterRegistry>) -> Self {
        Self {
            client: build_client("musicbrainz", registry, ADAPTER_TIMEOUT),
        }
    }
}

#[async_trait]
impl Provider for MusicBrainzProvider {
    fn name(&self) -> &'static str {
        "musicbrainz"
    }

    fn requires_auth(&self) -> bool {
        false
    }

    async fn search_artist(&self, name: &str) -> CoreResult<Vec<ArtistSearchResult>> {
        if name.is_empty() {
            return Err(CoreError::NotFound);
        }

        let url = format!("{BASE_URL}/artist");
        let response = self
            .client
            .get(url)
            .query(&[("query", name), ("fmt", "json")])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(vec![]);
        }
        if !status.is_success() {
            return Err(CoreError::from_status("musicbrainz", status));
        }

        let body: MbSearchResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode musicbrainz search response");
            CoreError::provider_unavailable("musicbrainz")
        })?;

        Ok(body
            .artists
            .into_iter()
            .map(|a| ArtistSearchResult {
                provider_id: a.id,
                name: a.name,
                disambiguation: a.disambiguation,
                score: a.score,
            })
            .collect())
    }

    async fn get_artist(&self, id: &str) -> CoreResult<ArtistMetadata> {
        if id.is_empty() {
            return Err(CoreError::NotFound);
        }

        let url = format!("{BASE_URL}/artist/{id}");
        let response = self
            .client
            .get(url)
            .query(&[
                ("inc", "aliases+genres+tags+ratings+url-rels+artist-rels"),
                ("fmt", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::from_status("musicbrainz", status));
        }

        let body: MbArtist = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode musicbrainz artist response");
            CoreError::provider_unavailable("musicbrainz")
        })?;

        Ok(map_artist(body))
    }

    /// MusicBrainz itself carries no image bytes; cover/artist imagery
    /// lives behind Fanart.tv and the Cover Art Archive. No data for this
    /// op is not an error per §4.2.
    async fn get_images(&self, _id: &str) -> CoreResult<Vec<ImageResult>> {
        Ok(vec![])
    }
}

fn map_artist(body: MbArtist) -> ArtistMetadata {
    let kind = body.artist_type.as_deref().map(|t| match t {
        "Person" => ArtistKind::Solo,
        "Group" => ArtistKind::Group,
        "Orchestra" => ArtistKind::Orchestra,
        "Choir" => ArtistKind::Choir,
        _ => ArtistKind::Group,
    });

    let is_person = matches!(kind, Some(ArtistKind::Solo));

    let (born, died, formed, disbanded) = match (&body.life_span, is_person) {
        (Some(ls), true) => (ls.begin.clone(), ls.end.clone(), None, None),
        (Some(ls), false) => (None, None, ls.begin.clone(), ls.end.clone()),
        (None, _) => (None, None, None, None),
    };

    let genres: Vec<String> = body
        .genres
        .unwrap_or_default()
        .into_iter()
        .map(|g| g.name)
        .collect();

    let aliases = body
        .aliases
        .unwrap_or_default()
        .into_iter()
        .map(|a| a.name)
        .collect();

    let mut urls = BTreeMap::new();
    let mut members = Vec::new();

    for rel in body.relations.unwrap_or_default() {
        match rel.rel_type.as_str() {
            "member of band" => {
                if let Some(artist) = rel.artist {
                    members.push(Member {
                        name: artist.name,
                        mbid: Some(artist.id),
                        instruments: rel
                            .attributes
                            .unwrap_or_default()
                            .into_iter()
                            .filter(|a| !a.eq_ignore_ascii_case("founder"))
                            .collect(),
                        active: rel.ended != Some(true),
                    });
                }
            }
            _ => {
                if let Some(kind) = categorize_url_relation(&rel.rel_type) {
                    if let Some(url) = rel.url.map(|u| u.resource) {
                        urls.entry(kind.to_string()).or_insert(url);
                    }
                }
            }
        }
    }

    ArtistMetadata {
        name: Some(body.name),
        sort_name: body.sort_name,
        kind,
        gender: body.gender,
        disambiguation: body.disambiguation,
        country: body.country,
        biography: None,
        genres,
        styles: vec![],
        moods: vec![],
        members,
        aliases,
        urls,
        born,
        formed,
        died,
        disbanded,
        musicbrainz_id: Some(body.id),
        audiodb_id: None,
        discogs_id: None,
        wikidata_id: None,
    }
}

/// Closed map of MusicBrainz url-relationship type strings to the urls[]
/// kinds used by `ArtistMetadata` (§3).
fn categorize_url_relation(rel_type: &str) -> Option<&'static str> {
    match rel_type {
        "official homepage" => Some("official"),
        "wikipedia" => Some("wikipedia"),
        "wikidata" => Some("wikidata"),
        "discogs" => Some("discogs"),
        "bandcamp" => Some("bandcamp"),
        "last.fm" => Some("lastfm"),
        "streaming music" | "free streaming" | "soundcloud" => Some("streaming"),
        _ => {
            debug!(rel_type, "unrecognized musicbrainz url relation kind");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct MbSearchResponse {
    #[serde(default)]
    artists: Vec<MbSearchArtist>,
}

#[derive(Debug, Deserialize)]
struct MbSearchArtist {
    id: String,
    name: String,
    disambiguation: Option<String>,
    score: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MbArtist {
    id: String,
    name: String,
    #[serde(rename = "sort-name")]
    sort_name: Option<String>,
    #[serde(rename = "type")]
    artist_type: Option<String>,
    gender: Option<String>,
    disambiguation: Option<String>,
    country: Option<String>,
    #[serde(rename = "life-span")]
    life_span: Option<MbLifeSpan>,
    #[serde(default)]
    genres: Option<Vec<MbGenre>>,
    #[serde(default)]
    aliases: Option<Vec<MbAlias>>,
    #[serde(default)]
    relations: Option<Vec<MbRelation>>,
}

#[derive(Debug, Deserialize)]
struct MbLifeSpan {
    begin: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MbAlias {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MbRelation {
    #[serde(rename = "type")]
    rel_type: String,
    #[serde(default)]
    attributes: Option<Vec<String>>,
    #[serde(default)]
    ended: Option<bool>,
    artist: Option<MbRelatedArtist>,
    url: Option<MbUrl>,
}

#[derive(Debug, Deserialize)]
struct MbRelatedArtist {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MbUrl {
    resource: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_person_life_span_to_born_died() {
        let body = MbArtist {
            id: "mbid-1".to_string(),
            name: "Thom Yorke".to_string(),
            sort_name: Some("Yorke, Thom".to_string()),
            artist_type: Some("Person".to_string()),
            gender: Some("male".to_string()),
            disambiguation: None,
            country: Some("GB".to_string()),
            life_span: Some(MbLifeSpan {
                begin: Some("1968-10-07".to_string()),
                end: None,
            }),
            genres: None,
            aliases: None,
            relations: None,
        };
        let meta = map_artist(body);
        assert_eq!(meta.born.as_deref(), Some("1968-10-07"));
        assert_eq!(meta.died, None);
        assert_eq!(meta.formed, None);
    }

    #[test]
    fn maps_group_life_span_to_formed_disbanded() {
        let body = MbArtist {
            id: "mbid-2".to_string(),
            name: "Radiohead".to_string(),
            sort_name: None,
            artist_type: Some("Group".to_string()),
            gender: None,
            disambiguation: None,
            country: Some("GB".to_string()),
            life_span: Some(MbLifeSpan {
                begin: Some("1985".to_string()),
                end: None,
            }),
            genres: Some(vec![MbGenre { name: "rock".to_string() }]),
            aliases: None,
            relations: None,
        };
        let meta = map_artist(body);
        assert_eq!(meta.formed.as_deref(), Some("1985"));
        assert_eq!(meta.born, None);
        assert_eq!(meta.genres, vec!["rock".to_string()]);
    }

    #[test]
    fn extracts_band_members_from_backward_relations() {
        let body = MbArtist {
            id: "mbid-3".to_string(),
            name: "Radiohead".to_string(),
            sort_name: None,
            artist_type: Some("Group".to_string()),
            gender: None,
            disambiguation: None,
            country: None,
            life_span: None,
            genres: None,
            aliases: None,
            relations: Some(vec![MbRelation {
                rel_type: "member of band".to_string(),
                attributes: Some(vec!["guitar".to_string()]),
                ended: Some(false),
                artist: Some(MbRelatedArtist {
                    id: "member-mbid".to_string(),
                    name: "Jonny Greenwood".to_string(),
                }),
                url: None,
            }]),
        };
        let meta = map_artist(body);
        assert_eq!(meta.members.len(), 1);
        assert_eq!(meta.members[0].name, "Jonny Greenwood");
        assert_eq!(meta.members[0].instruments, vec!["guitar".to_string()]);
        assert!(meta.members[0].active);
    }

    #[test]
    fn categorizes_url_relations_into_closed_map() {
        assert_eq!(categorize_url_relation("discogs"), Some("discogs"));
        assert_eq!(categorize_url_relation("wikidata"), Some("wikidata"));
        assert_eq!(categorize_url_relation("some unknown kind"), None);
    }
}
