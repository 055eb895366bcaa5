use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// §3 ArtistRecord — the core's input, owned by the scanner (external
/// collaborator). Mutated in place by fixers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistRecord {
    pub id: String,
    pub path: String,
    pub name: String,
    pub musicbrainz_id: Option<String>,
    pub provider_ids: BTreeMap<String, String>,
    pub is_classical: bool,
}

impl ArtistRecord {
    pub fn provider_id(&self, provider: &str) -> Option<&str> {
        if provider == "musicbrainz" {
            return self.musicbrainz_id.as_deref();
        }
        self.provider_ids.get(provider).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtistKind {
    Solo,
    Group,
    Orchestra,
    Choir,
    Character,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub mbid: Option<String>,
    #[serde(default)]
    pub instruments: Vec<String>,
    pub active: bool,
}

/// §3 ArtistMetadata — the wire-level normalized DTO every provider adapter
/// returns and the orchestrator merges field-by-field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtistMetadata {
    pub name: Option<String>,
    pub sort_name: Option<String>,
    pub kind: Option<ArtistKind>,
    pub gender: Option<String>,
    pub disambiguation: Option<String>,
    pub country: Option<String>,
    pub biography: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub moods: Vec<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    #[serde(default)]
    pub urls: BTreeMap<String, String>,
    pub born: Option<String>,
    pub formed: Option<String>,
    pub died: Option<String>,
    pub disbanded: Option<String>,

    pub musicbrainz_id: Option<String>,
    pub audiodb_id: Option<String>,
    pub discogs_id: Option<String>,
    pub wikidata_id: Option<String>,
}

impl ArtistMetadata {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.biography.is_none()
            && self.genres.is_empty()
            && self.styles.is_empty()
            && self.moods.is_empty()
            && self.members.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Thumb,
    Fanart,
    Logo,
    HdLogo,
    Banner,
    Background,
    WideThumb,
}

impl ImageType {
    /// Pre-threshold normalization: hdlogo->logo, background->fanart, widethumb->thumb.
    pub fn normalized(self) -> ImageType {
        match self {
            ImageType::HdLogo => ImageType::Logo,
            ImageType::Background => ImageType::Fanart,
            ImageType::WideThumb => ImageType::Thumb,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Thumb => "thumb",
            ImageType::Fanart => "fanart",
            ImageType::Logo => "logo",
            ImageType::HdLogo => "hdlogo",
            ImageType::Banner => "banner",
            ImageType::Background => "background",
            ImageType::WideThumb => "widethumb",
        }
    }
}

/// §3 ImageResult.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    pub url: String,
    #[serde(rename = "type")]
    pub image_type: ImageType,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub likes: Option<u32>,
    pub language: Option<String>,
    pub source: String,
}

/// §3 FieldPriority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldPriority {
    pub field: String,
    pub providers: Vec<String>,
    #[serde(default)]
    pub disabled: BTreeSet<String>,
}

impl FieldPriority {
    /// `providers \ disabled`, preserving order.
    pub fn enabled_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|p| !self.disabled.contains(*p))
            .map(|s| s.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// §3 Rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub enabled: bool,
    pub config: RuleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub severity: Option<Severity>,
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            severity: None,
            thresholds: BTreeMap::new(),
        }
    }
}

/// §3 Violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    pub detail: Option<String>,
}

/// §3 EvaluationResult. `health_score` invariant lives in `rules::mod`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub artist_id: String,
    pub rules_total: u32,
    pub rules_passed: u32,
    pub violations: Vec<Violation>,
    pub health_score: f64,
}

/// §3 FieldSource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSource {
    pub field: String,
    pub provider: String,
}

/// §3 FetchResult.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchResult {
    pub metadata: ArtistMetadata,
    pub images: Vec<ImageResult>,
    pub sources: Vec<FieldSource>,
    pub errors: Vec<String>,
    pub attempted_providers: Vec<String>,
}

/// §3 FixOutcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixStatus {
    Fixed,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixOutcome {
    pub rule_id: String,
    pub fixer: String,
    pub status: FixStatus,
    pub detail: Option<String>,
}

/// Supplemental, observability-only snapshot of a provider's rolling
/// success/failure counts (§4.3's "Provider health" note). Never gates
/// whether the orchestrator calls a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub name: String,
    pub successes: u64,
    pub failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_providers_excludes_disabled_but_preserves_order() {
        let priority = FieldPriority {
            field: "biography".to_string(),
            providers: vec!["musicbrainz".into(), "lastfm".into(), "discogs".into()],
            disabled: ["lastfm".to_string()].into_iter().collect(),
        };
        assert_eq!(priority.enabled_providers(), vec!["musicbrainz", "discogs"]);
    }

    #[test]
    fn image_type_normalization() {
        assert_eq!(ImageType::HdLogo.normalized(), ImageType::Logo);
        assert_eq!(ImageType::Background.normalized(), ImageType::Fanart);
        assert_eq!(ImageType::WideThumb.normalized(), ImageType::Thumb);
        assert_eq!(ImageType::Thumb.normalized(), ImageType::Thumb);
    }
}
