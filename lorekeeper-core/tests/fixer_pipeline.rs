//! Exercises the orchestrator -> rule engine -> fixer pipeline chain
//! end-to-end against a mock provider and a tempdir-backed artist
//! directory. No real network calls.

use async_trait::async_trait;
use lorekeeper_core::errors::CoreResult;
use lorekeeper_core::fixers::nfo::NfoFixer;
use lorekeeper_core::fixers::{FixContext, FixerPipeline};
use lorekeeper_core::models::{ArtistMetadata, ArtistRecord, ImageResult, Rule, RuleConfig};
use lorekeeper_core::orchestrator::Orchestrator;
use lorekeeper_core::providers::{ArtistSearchResult, Provider, ProviderRegistry};
use lorekeeper_core::rules::{ArtistContext, CheckerRegistry};
use lorekeeper_core::settings::{InMemoryBackend, NoOpCipher, SettingsStore};
use std::collections::BTreeMap;
use std::sync::Arc;

struct MockMusicBrainz;

#[async_trait]
impl Provider for MockMusicBrainz {
    fn name(&self) -> &'static str {
        "musicbrainz"
    }

    fn requires_auth(&self) -> bool {
        false
    }

    async fn search_artist(&self, _name: &str) -> CoreResult<Vec<ArtistSearchResult>> {
        Ok(vec![])
    }

    async fn get_artist(&self, _id: &str) -> CoreResult<ArtistMetadata> {
        Ok(ArtistMetadata {
            name: Some("Radiohead".to_string()),
            sort_name: Some("Radiohead".to_string()),
            musicbrainz_id: Some("a74b1b7f-71a5-4011-9441-d0b5e4122711".to_string()),
            genres: vec!["rock".to_string()],
            ..Default::default()
        })
    }

    async fn get_images(&self, _id: &str) -> CoreResult<Vec<ImageResult>> {
        Ok(vec![])
    }
}

struct MockLastFm;

#[async_trait]
impl Provider for MockLastFm {
    fn name(&self) -> &'static str {
        "lastfm"
    }

    fn requires_auth(&self) -> bool {
        false
    }

    async fn search_artist(&self, _name: &str) -> CoreResult<Vec<ArtistSearchResult>> {
        Ok(vec![])
    }

    async fn get_artist(&self, _id: &str) -> CoreResult<ArtistMetadata> {
        Ok(ArtistMetadata {
            biography: Some("English rock band formed in Abingdon.".to_string()),
            ..Default::default()
        })
    }

    async fn get_images(&self, _id: &str) -> CoreResult<Vec<ImageResult>> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn fetched_metadata_flows_through_rules_and_nfo_fixer() {
    let dir = tempfile::tempdir().unwrap();

    let registry = Arc::new(ProviderRegistry::new(vec![Arc::new(MockMusicBrainz), Arc::new(MockLastFm)]));
    let settings = Arc::new(SettingsStore::new(
        Box::new(InMemoryBackend::new()),
        Box::new(NoOpCipher),
        ["musicbrainz".to_string(), "lastfm".to_string()].into_iter().collect(),
    ));
    let orchestrator = Orchestrator::new(registry, settings);

    let record = ArtistRecord {
        id: "1".to_string(),
        path: dir.path().display().to_string(),
        name: "Radiohead".to_string(),
        musicbrainz_id: None,
        provider_ids: BTreeMap::new(),
        is_classical: false,
    };

    // Nothing on disk yet: nfo.exists and bio.exists both fire.
    let checkers = CheckerRegistry::builtin();
    let rules = vec![
        Rule { id: "nfo.exists".to_string(), enabled: true, config: RuleConfig::default() },
        Rule { id: "bio.exists".to_string(), enabled: true, config: RuleConfig::default() },
    ];
    let ctx = ArtistContext { record: Some(record.clone()), is_classical: false, ..Default::default() };
    let first_pass = lorekeeper_core::rules::evaluate(&record.id, &rules, &checkers, &ctx);
    assert_eq!(first_pass.violations.len(), 2);
    assert_eq!(first_pass.health_score, 0.0);

    let fetched = orchestrator.fetch_metadata(None, Some(&record.name)).await;
    assert_eq!(fetched.metadata.biography.as_deref(), Some("English rock band formed in Abingdon."));
    assert_eq!(fetched.metadata.musicbrainz_id.as_deref(), Some("a74b1b7f-71a5-4011-9441-d0b5e4122711"));

    let pipeline = FixerPipeline::new(vec![Box::new(NfoFixer)]);
    let mut fix_ctx = FixContext {
        dir: dir.path().to_path_buf(),
        record: record.clone(),
        metadata: fetched.metadata.clone(),
        kodi_numbering: false,
        use_symlinks: false,
    };
    let outcomes = pipeline.run(&mut fix_ctx, &first_pass.violations).await;
    assert_eq!(outcomes.len(), 1, "only nfo.exists is claimed by NfoFixer; bio.exists has no fixer wired here");
    assert!(dir.path().join("artist.nfo").exists());

    let nfo_bytes = std::fs::read(dir.path().join("artist.nfo")).unwrap();
    let nfo_text = String::from_utf8(nfo_bytes).unwrap();
    assert!(nfo_text.contains("<name>Radiohead</name>"));
    assert!(nfo_text.contains("English rock band formed in Abingdon."));

    // Re-evaluating against the now-written NFO clears nfo.exists.
    let reevaluated_ctx = ArtistContext { record: Some(record.clone()), nfo_present: true, nfo_has_mbid: true, ..Default::default() };
    let second_pass = lorekeeper_core::rules::evaluate(&record.id, &rules, &checkers, &reevaluated_ctx);
    assert!(second_pass.violations.iter().all(|v| v.rule_id != "nfo.exists"));
}
