use crate::models::{ArtistMetadata, FetchResult, FieldSource, ImageResult, ImageType, ProviderHealth};
use crate::providers::{last_path_segment, leading_digits, ArtistSearchResult, ProviderRegistry};
use crate::settings::SettingsStore;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Memoized per-provider result for one `FetchMetadata` call, guarded by a
/// fetch-scoped mutex per §4.3 — never shared across calls.
#[derive(Clone, Default)]
struct ProviderResult {
    meta: Option<ArtistMetadata>,
    images: Vec<ImageResult>,
    errored: bool,
}

/// One provider's unmerged contribution to a `fetch_field_from_providers`
/// call: its raw metadata/images for the requested field plus whatever
/// error it hit, with no cross-provider merge applied.
#[derive(Debug, Clone)]
pub struct ProviderFieldResult {
    pub provider: String,
    pub metadata: Option<ArtistMetadata>,
    pub images: Vec<ImageResult>,
    pub error: Option<String>,
}

/// One provider's unmerged search matches from a `search_for_linking` call.
#[derive(Debug, Clone)]
pub struct ProviderSearchResult {
    pub provider: String,
    pub matches: Vec<ArtistSearchResult>,
    pub error: Option<String>,
}

/// §4.3: loads the ordered `FieldPriority` list, walks each field's
/// enabled providers in order, and applies the field policy. Generalizes
/// the teacher's per-field MusicBrainz-then-Discogs fallback
/// (`update_genre`/`update_song_cover_art`) into a data-driven walk, and
/// its `wrap_err` skip-on-error idiom into "log and continue" per provider.
pub struct Orchestrator {
    providers: Arc<ProviderRegistry>,
    settings: Arc<SettingsStore>,
    health: Mutex<HashMap<String, ProviderHealth>>,
}

impl Orchestrator {
    pub fn new(providers: Arc<ProviderRegistry>, settings: Arc<SettingsStore>) -> Self {
        Self {
            providers,
            settings,
            health: Mutex::new(HashMap::new()),
        }
    }

    pub async fn health_snapshot(&self) -> Vec<ProviderHealth> {
        self.health.lock().await.values().cloned().collect()
    }

    async fn record(&self, provider: &str, ok: bool) {
        let mut health = self.health.lock().await;
        let entry = health.entry(provider.to_string()).or_insert_with(|| ProviderHealth {
            name: provider.to_string(),
            successes: 0,
            failures: 0,
        });
        if ok {
            entry.successes += 1;
        } else {
            entry.failures += 1;
        }
    }

    /// Fetches and merges artist metadata across every enabled provider for
    /// every known field. Never returns a hard error: a totally-failed
    /// fetch still yields an empty `FetchResult` with a populated `errors`
    /// list, per §4.3's failure semantics.
    pub async fn fetch_metadata(&self, mbid: Option<&str>, name: Option<&str>) -> FetchResult {
        let priorities = self.settings.get_priorities().await;
        let mut cache: HashMap<String, ProviderResult> = HashMap::new();
        let mut result = FetchResult::default();
        let mut attempted: Vec<String> = Vec::new();

        for priority in &priorities {
            let providers = priority.enabled_providers();
            match priority.field.as_str() {
                "biography" | "formed" | "born" | "died" | "disbanded" => {
                    self.apply_scalar(&priority.field, &providers, mbid, name, &mut cache, &mut result, &mut attempted).await;
                }
                "genres" | "styles" | "moods" | "members" | "aliases" => {
                    self.apply_collection(&priority.field, &providers, mbid, name, &mut cache, &mut result, &mut attempted).await;
                }
                "thumb" | "fanart" | "logo" | "banner" => {
                    self.apply_image(&priority.field, &providers, mbid, &mut cache, &mut result, &mut attempted).await;
                }
                other => warn!(field = other, "unrecognized field priority entry"),
            }
        }

        let fetched_metas: Vec<&ArtistMetadata> = cache.values().filter_map(|r| r.meta.as_ref()).collect();
        apply_cross_field_merges(&mut result.metadata, &fetched_metas);
        result.attempted_providers = attempted;
        result
    }

    /// §4.3 scaling variant: every enabled provider's value for one field,
    /// side by side, with no merge applied — for UI comparison. Reuses the
    /// same per-provider `lookup` as `fetch_metadata`, just without the
    /// first-non-empty-wins field policy.
    pub async fn fetch_field_from_providers(&self, field: &str, mbid: Option<&str>, name: Option<&str>) -> Vec<ProviderFieldResult> {
        let priorities = self.settings.get_priorities().await;
        let Some(priority) = priorities.iter().find(|p| p.field == field) else {
            return vec![];
        };

        let mut cache: HashMap<String, ProviderResult> = HashMap::new();
        let mut out = Vec::new();
        for provider_name in priority.enabled_providers() {
            let entry = self.lookup(provider_name, mbid, name, &mut cache).await;
            out.push(ProviderFieldResult {
                provider: provider_name.to_string(),
                metadata: entry.meta,
                images: entry.images,
                error: entry.errored.then(|| format!("{provider_name}: provider error fetching {field}")),
            });
        }
        out
    }

    /// §4.3 variant: queries only a caller-supplied provider list, used to
    /// let a user pick which candidate match a provider link actually
    /// refers to. Unlike `fetch_metadata` this never consults
    /// `FieldPriority` — the caller names exactly which providers to ask.
    pub async fn search_for_linking(&self, name: &str, providers: &[&str]) -> Vec<ProviderSearchResult> {
        let mut out = Vec::with_capacity(providers.len());
        for provider_name in providers {
            let Some(provider) = self.providers.get(provider_name) else {
                out.push(ProviderSearchResult {
                    provider: provider_name.to_string(),
                    matches: vec![],
                    error: Some(format!("{provider_name}: unknown provider")),
                });
                continue;
            };
            match provider.search_artist(name).await {
                Ok(matches) => out.push(ProviderSearchResult { provider: provider_name.to_string(), matches, error: None }),
                Err(e) => {
                    warn!(provider = *provider_name, error = %e, "provider search failed");
                    out.push(ProviderSearchResult { provider: provider_name.to_string(), matches: vec![], error: Some(e.to_string()) });
                }
            }
        }
        out
    }

    async fn lookup(&self, provider_name: &str, mbid: Option<&str>, name: Option<&str>, cache: &mut HashMap<String, ProviderResult>) -> ProviderResult {
        if let Some(cached) = cache.get(provider_name) {
            return cached.clone();
        }

        let Some(provider) = self.providers.get(provider_name) else {
            return ProviderResult::default();
        };

        let id = mbid.or(name);
        let Some(id) = id else {
            return ProviderResult::default();
        };

        let meta_result = provider.get_artist(id).await;
        let ok = meta_result.is_ok();
        self.record(provider_name, ok).await;

        let meta = match meta_result {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(provider = provider_name, error = %e, "provider failed, skipping for this field");
                None
            }
        };

        let images = if let Some(mbid) = mbid {
            match provider.get_images(mbid).await {
                Ok(images) => images,
                Err(e) => {
                    warn!(provider = provider_name, error = %e, "provider image lookup failed");
                    vec![]
                }
            }
        } else {
            vec![]
        };

        let entry = ProviderResult {
            meta,
            images,
            errored: !ok,
        };
        cache.insert(provider_name.to_string(), entry.clone());
        entry
    }

    async fn apply_scalar(
        &self,
        field: &str,
        providers: &[&str],
        mbid: Option<&str>,
        name: Option<&str>,
        cache: &mut HashMap<String, ProviderResult>,
        result: &mut FetchResult,
        attempted: &mut Vec<String>,
    ) {
        for provider_name in providers {
            attempted.push(provider_name.to_string());
            let entry = self.lookup(provider_name, mbid, name, cache).await;
            if entry.errored {
                result.errors.push(format!("{provider_name}: provider error fetching {field}"));
                continue;
            }
            let Some(meta) = &entry.meta else { continue };
            let value = scalar_field(meta, field);
            if let Some(value) = value {
                set_scalar_field(&mut result.metadata, field, value);
                result.sources.push(FieldSource {
                    field: field.to_string(),
                    provider: provider_name.to_string(),
                });
                return;
            }
        }
    }

    async fn apply_collection(
        &self,
        field: &str,
        providers: &[&str],
        mbid: Option<&str>,
        name: Option<&str>,
        cache: &mut HashMap<String, ProviderResult>,
        result: &mut FetchResult,
        attempted: &mut Vec<String>,
    ) {
        for provider_name in providers {
            attempted.push(provider_name.to_string());
            let entry = self.lookup(provider_name, mbid, name, cache).await;
            if entry.errored {
                result.errors.push(format!("{provider_name}: provider error fetching {field}"));
                continue;
            }
            let Some(meta) = &entry.meta else { continue };
            if !set_collection_field(&mut result.metadata, field, meta) {
                continue;
            }
            result.sources.push(FieldSource {
                field: field.to_string(),
                provider: provider_name.to_string(),
            });
            return;
        }
    }

    async fn apply_image(
        &self,
        field: &str,
        providers: &[&str],
        mbid: Option<&str>,
        cache: &mut HashMap<String, ProviderResult>,
        result: &mut FetchResult,
        attempted: &mut Vec<String>,
    ) {
        let Some(target_type) = image_type_for_field(field) else { return };

        for provider_name in providers {
            attempted.push(provider_name.to_string());
            let entry = self.lookup(provider_name, mbid, None, cache).await;
            if entry.errored {
                result.errors.push(format!("{provider_name}: provider error fetching {field}"));
                continue;
            }
            let matching: Vec<ImageResult> = entry
                .images
                .iter()
                .filter(|img| img.image_type.normalized() == target_type)
                .cloned()
                .collect();
            if matching.is_empty() {
                continue;
            }
            result.images.extend(matching);
            result.sources.push(FieldSource {
                field: field.to_string(),
                provider: provider_name.to_string(),
            });
            return;
        }
    }
}

fn image_type_for_field(field: &str) -> Option<ImageType> {
    match field {
        "thumb" => Some(ImageType::Thumb),
        "fanart" => Some(ImageType::Fanart),
        "logo" => Some(ImageType::Logo),
        "banner" => Some(ImageType::Banner),
        _ => None,
    }
}

fn scalar_field(meta: &ArtistMetadata, field: &str) -> Option<String> {
    match field {
        "biography" => meta.biography.clone(),
        "formed" => meta.formed.clone(),
        "born" => meta.born.clone(),
        "died" => meta.died.clone(),
        "disbanded" => meta.disbanded.clone(),
        _ => None,
    }
    .filter(|v| !v.is_empty())
}

fn set_scalar_field(target: &mut ArtistMetadata, field: &str, value: String) {
    match field {
        "biography" => target.biography = Some(value),
        "formed" => target.formed = Some(value),
        "born" => target.born = Some(value),
        "died" => target.died = Some(value),
        "disbanded" => target.disbanded = Some(value),
        _ => {}
    }
}

/// Returns true and replaces wholesale when `meta`'s collection for `field`
/// is non-empty; never unions across providers.
fn set_collection_field(target: &mut ArtistMetadata, field: &str, meta: &ArtistMetadata) -> bool {
    match field {
        "genres" if !meta.genres.is_empty() => {
            target.genres = meta.genres.clone();
            true
        }
        "styles" if !meta.styles.is_empty() => {
            target.styles = meta.styles.clone();
            true
        }
        "moods" if !meta.moods.is_empty() => {
            target.moods = meta.moods.clone();
            true
        }
        "members" if !meta.members.is_empty() => {
            target.members = meta.members.clone();
            true
        }
        "aliases" if !meta.aliases.is_empty() => {
            target.aliases = meta.aliases.clone();
            true
        }
        _ => false,
    }
}

/// §4.3 cross-field merges, applied after the field loop regardless of
/// which provider won which field: non-empty provider ids, `name` if still
/// empty, url-map entries for keys not yet present, deduplicated aliases,
/// then the §4.2 ID back-fill.
fn apply_cross_field_merges(meta: &mut ArtistMetadata, fetched: &[&ArtistMetadata]) {
    for other in fetched {
        if meta.name.is_none() {
            meta.name = other.name.clone();
        }
        if meta.musicbrainz_id.is_none() {
            meta.musicbrainz_id = other.musicbrainz_id.clone();
        }
        if meta.audiodb_id.is_none() {
            meta.audiodb_id = other.audiodb_id.clone();
        }
        if meta.discogs_id.is_none() {
            meta.discogs_id = other.discogs_id.clone();
        }
        if meta.wikidata_id.is_none() {
            meta.wikidata_id = other.wikidata_id.clone();
        }
        merge_urls(&mut meta.urls, &other.urls);
        for alias in &other.aliases {
            meta.aliases.insert(alias.clone());
        }
    }

    backfill_discogs_id(meta);
    backfill_wikidata_id(meta);
}

/// `DiscogsID` empty but `urls["discogs"]` set: extract the leading numeric
/// run from the last path segment.
fn backfill_discogs_id(meta: &mut ArtistMetadata) {
    if meta.discogs_id.is_some() {
        return;
    }
    let Some(url) = meta.urls.get("discogs") else { return };
    let Some(segment) = last_path_segment(url) else { return };
    meta.discogs_id = leading_digits(segment);
}

/// `WikidataID` empty but `urls["wikidata"]` set: the last path segment
/// must start with `Q`, and that whole segment is the id.
fn backfill_wikidata_id(meta: &mut ArtistMetadata) {
    if meta.wikidata_id.is_some() {
        return;
    }
    let Some(url) = meta.urls.get("wikidata") else { return };
    let Some(segment) = last_path_segment(url) else { return };
    if segment.starts_with('Q') {
        meta.wikidata_id = Some(segment.to_string());
    }
}

/// §4.3 merged url map: keys from `extra` not already present in `base`
/// are copied over. Exposed for fixers/tests that merge provider DTOs
/// outside the orchestrator's own per-field walk.
pub fn merge_urls(base: &mut BTreeMap<String, String>, extra: &BTreeMap<String, String>) {
    for (k, v) in extra {
        base.entry(k.clone()).or_insert_with(|| v.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreResult;
    use crate::models::ArtistMetadata;
    use crate::providers::Provider;
    use crate::settings::{InMemoryBackend, NoOpCipher, SettingsStore};
    use async_trait::async_trait;
    use std::collections::BTreeSet;

    struct StubProvider {
        name: &'static str,
        bio: Option<&'static str>,
        fails: bool,
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn requires_auth(&self) -> bool {
            false
        }

        async fn search_artist(&self, name: &str) -> CoreResult<Vec<crate::providers::ArtistSearchResult>> {
            if self.fails {
                return Err(crate::errors::CoreError::NotFound);
            }
            Ok(vec![crate::providers::ArtistSearchResult {
                provider_id: format!("{}-1", self.name),
                name: name.to_string(),
                disambiguation: None,
                score: Some(100),
            }])
        }

        async fn get_artist(&self, _id: &str) -> CoreResult<ArtistMetadata> {
            if self.fails {
                return Err(crate::errors::CoreError::NotFound);
            }
            Ok(ArtistMetadata {
                biography: self.bio.map(|b| b.to_string()),
                ..Default::default()
            })
        }

        async fn get_images(&self, _id: &str) -> CoreResult<Vec<ImageResult>> {
            Ok(vec![])
        }
    }

    fn orchestrator_with(providers: Vec<Arc<dyn Provider>>) -> Orchestrator {
        let available: BTreeSet<String> = providers.iter().map(|p| p.name().to_string()).collect();
        let registry = Arc::new(ProviderRegistry::new(providers));
        let settings = Arc::new(SettingsStore::new(Box::new(InMemoryBackend::new()), Box::new(NoOpCipher), available));
        Orchestrator::new(registry, settings)
    }

    #[tokio::test]
    async fn fetch_field_from_providers_returns_every_enabled_provider_unmerged() {
        let orchestrator = orchestrator_with(vec![
            Arc::new(StubProvider { name: "musicbrainz", bio: None, fails: false }),
            Arc::new(StubProvider { name: "lastfm", bio: Some("English rock band."), fails: false }),
        ]);

        let results = orchestrator.fetch_field_from_providers("biography", None, Some("Radiohead")).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].provider, "musicbrainz");
        assert_eq!(results[0].metadata.as_ref().unwrap().biography, None);
        assert_eq!(results[1].provider, "lastfm");
        assert_eq!(results[1].metadata.as_ref().unwrap().biography.as_deref(), Some("English rock band."));
    }

    #[tokio::test]
    async fn fetch_field_from_providers_records_per_provider_errors_without_stopping() {
        let orchestrator = orchestrator_with(vec![
            Arc::new(StubProvider { name: "musicbrainz", bio: None, fails: true }),
            Arc::new(StubProvider { name: "lastfm", bio: Some("ok"), fails: false }),
        ]);

        let results = orchestrator.fetch_field_from_providers("biography", None, Some("Radiohead")).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].error.is_some());
        assert!(results[1].error.is_none());
    }

    #[tokio::test]
    async fn search_for_linking_only_queries_the_caller_supplied_providers() {
        let orchestrator = orchestrator_with(vec![
            Arc::new(StubProvider { name: "musicbrainz", bio: None, fails: false }),
            Arc::new(StubProvider { name: "discogs", bio: None, fails: false }),
        ]);

        let results = orchestrator.search_for_linking("Radiohead", &["discogs"]).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].provider, "discogs");
        assert_eq!(results[0].matches.len(), 1);
        assert_eq!(results[0].matches[0].provider_id, "discogs-1");
    }

    #[test]
    fn backfills_discogs_id_from_url_last_path_segment() {
        let mut meta = ArtistMetadata {
            urls: [("discogs".to_string(), "https://www.discogs.com/artist/24941-a-ha".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        backfill_discogs_id(&mut meta);
        assert_eq!(meta.discogs_id.as_deref(), Some("24941"));
    }

    #[test]
    fn backfills_wikidata_id_only_when_segment_starts_with_q() {
        let mut meta = ArtistMetadata {
            urls: [("wikidata".to_string(), "https://www.wikidata.org/wiki/Q44190".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        backfill_wikidata_id(&mut meta);
        assert_eq!(meta.wikidata_id.as_deref(), Some("Q44190"));

        let mut meta = ArtistMetadata {
            urls: [("wikidata".to_string(), "https://www.wikidata.org/wiki/not-a-q-item".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        backfill_wikidata_id(&mut meta);
        assert_eq!(meta.wikidata_id, None);
    }

    #[test]
    fn existing_provider_ids_are_not_overwritten_by_backfill() {
        let mut meta = ArtistMetadata {
            discogs_id: Some("99999".to_string()),
            urls: [("discogs".to_string(), "https://www.discogs.com/artist/24941-a-ha".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        backfill_discogs_id(&mut meta);
        assert_eq!(meta.discogs_id.as_deref(), Some("99999"));
    }

    #[test]
    fn cross_field_merge_fills_ids_and_name_from_any_fetched_provider() {
        let mut merged = ArtistMetadata::default();
        let mb = ArtistMetadata {
            name: Some("Radiohead".to_string()),
            musicbrainz_id: Some("a74b1b7f".to_string()),
            ..Default::default()
        };
        let discogs = ArtistMetadata {
            discogs_id: Some("24941".to_string()),
            ..Default::default()
        };
        apply_cross_field_merges(&mut merged, &[&mb, &discogs]);
        assert_eq!(merged.name.as_deref(), Some("Radiohead"));
        assert_eq!(merged.musicbrainz_id.as_deref(), Some("a74b1b7f"));
        assert_eq!(merged.discogs_id.as_deref(), Some("24941"));
    }

    #[test]
    fn merge_urls_does_not_overwrite_existing_keys() {
        let mut base: BTreeMap<String, String> = [("official".to_string(), "https://a".to_string())].into_iter().collect();
        let extra: BTreeMap<String, String> = [
            ("official".to_string(), "https://b".to_string()),
            ("wikipedia".to_string(), "https://c".to_string()),
        ]
        .into_iter()
        .collect();
        merge_urls(&mut base, &extra);
        assert_eq!(base.get("official").map(|s| s.as_str()), Some("https://a"));
        assert_eq!(base.get("wikipedia").map(|s| s.as_str()), Some("https://c"));
    }
}
