use crate::errors::{CoreError, CoreResult};
use crate::http_client::{build_client, SPARQL_TIMEOUT};
use crate::models::{ArtistMetadata, ImageResult};
use crate::providers::{ArtistSearchResult, Provider};
use crate::rate_limiter::RateLimiterRegistry;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

const SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";

/// Inception (formed/founded), dissolution, country, genre.
const QUERY: &str = r#"SELECT ?item ?inception ?dissolution ?countryLabel ?genreLabel WHERE {
  ?item wdt:P434 "%MBID%" .
  OPTIONAL { ?item wdt:P571 ?inception . }
  OPTIONAL { ?item wdt:P576 ?dissolution . }
  OPTIONAL { ?item wdt:P495 ?country . }
  OPTIONAL { ?item wdt:P136 ?genre . }
  SERVICE wikibase:label { bd:serviceParam wikibase:language "en". }
}"#;

/// Wikidata: SPARQL over HTTP, one parametrized query keyed by MBID
/// (property P434), per §4.2. No search or image surface.
pub struct WikidataProvider {
    client: ClientWithMiddleware,
}

impl WikidataProvider {
    pub fn new(registry: &Arc<RateLimiterRegistry>) -> Self {
        Self {
            client: build_client("wikidata", registry, SPARQL_TIMEOUT),
        }
    }
}

#[async_trait]
impl Provider for WikidataProvider {
    fn name(&self) -> &'static str {
        "wikidata"
    }

    fn requires_auth(&self) -> bool {
        false
    }

    async fn search_artist(&self, _name: &str) -> CoreResult<Vec<ArtistSearchResult>> {
        Ok(vec![])
    }

    async fn get_artist(&self, mbid: &str) -> CoreResult<ArtistMetadata> {
        if mbid.is_empty() {
            return Err(CoreError::NotFound);
        }

        let query = QUERY.replace("%MBID%", mbid);
        let response = self
            .client
            .get(SPARQL_ENDPOINT)
            .header("Accept", "application/sparql-results+json")
            .query(&[("query", query.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::from_status("wikidata", status));
        }

        let body: SparqlResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "could not decode wikidata sparql response");
            CoreError::provider_unavailable("wikidata")
        })?;

        if body.results.bindings.is_empty() {
            return Err(CoreError::NotFound);
        }

        Ok(map_bindings(body.results.bindings))
    }

    async fn get_images(&self, _id: &str) -> CoreResult<Vec<ImageResult>> {
        Ok(vec![])
    }
}

/// Every row carries the same item/inception/dissolution/country; genres
/// fan out into one row per value, so they must be deduplicated across
/// all bindings rather than taken from a single row.
fn map_bindings(bindings: Vec<SparqlBinding>) -> ArtistMetadata {
    let mut genres = BTreeSet::new();
    let mut item_id = None;
    let mut formed = None;
    let mut disbanded = None;
    let mut country = None;

    for binding in bindings {
        if item_id.is_none() {
            item_id = binding.item.map(|v| v.value).and_then(|uri| {
                uri.trim_end_matches('/').rsplit('/').next().map(|s| s.to_string())
            });
        }
        if formed.is_none() {
            formed = binding.inception.map(|v| v.value);
        }
        if disbanded.is_none() {
            disbanded = binding.dissolution.map(|v| v.value);
        }
        if country.is_none() {
            country = binding.country_label.map(|v| v.value);
        }
        if let Some(genre) = binding.genre_label {
            genres.insert(genre.value);
        }
    }

    ArtistMetadata {
        formed,
        disbanded,
        country,
        genres: genres.into_iter().collect(),
        wikidata_id: item_id,
        ..Default::default()
    }
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<SparqlBinding>,
}

#[derive(Debug, Deserialize)]
struct SparqlBinding {
    item: Option<SparqlValue>,
    inception: Option<SparqlValue>,
    dissolution: Option<SparqlValue>,
    #[serde(rename = "countryLabel")]
    country_label: Option<SparqlValue>,
    #[serde(rename = "genreLabel")]
    genre_label: Option<SparqlValue>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(item: &str, genre: Option<&str>) -> SparqlBinding {
        SparqlBinding {
            item: Some(SparqlValue {
                value: item.to_string(),
            }),
            inception: Some(SparqlValue {
                value: "1985-01-01T00:00:00Z".to_string(),
            }),
            dissolution: None,
            country_label: Some(SparqlValue {
                value: "United Kingdom".to_string(),
            }),
            genre_label: genre.map(|g| SparqlValue {
                value: g.to_string(),
            }),
        }
    }

    #[test]
    fn dedupes_genre_labels_across_multiple_bindings() {
        let bindings = vec![
            binding("http://www.wikidata.org/entity/Q169590", Some("rock")),
            binding("http://www.wikidata.org/entity/Q169590", Some("alternative rock")),
            binding("http://www.wikidata.org/entity/Q169590", Some("rock")),
        ];
        let meta = map_bindings(bindings);
        assert_eq!(meta.genres, vec!["alternative rock", "rock"]);
        assert_eq!(meta.wikidata_id.as_deref(), Some("Q169590"));
        assert_eq!(meta.formed.as_deref(), Some("1985-01-01T00:00:00Z"));
        assert_eq!(meta.country.as_deref(), Some("United Kingdom"));
    }

    #[test]
    fn extracts_q_item_from_entity_uri() {
        let meta = map_bindings(vec![binding("http://www.wikidata.org/entity/Q44190", None)]);
        assert_eq!(meta.wikidata_id.as_deref(), Some("Q44190"));
    }
}
