use super::{nfo, FixContext, Fixer};
use crate::models::{FixOutcome, FixStatus, Violation};
use crate::orchestrator::{merge_urls, Orchestrator};
use async_trait::async_trait;
use std::sync::Arc;

/// Handles `bio.exists` and `nfo.has_mbid` by calling `Orchestrator`'s
/// provider fetch and filling in whatever fields are still empty on the
/// artist's metadata, then regenerating `artist.nfo` through the NFO
/// writer. Mirrors `MetadataFixer` (§4.6): provider ids already set on
/// disk are never overwritten, matching the orchestrator's own
/// cross-field-merge policy.
pub struct MetadataFixer {
    orchestrator: Arc<Orchestrator>,
}

impl MetadataFixer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Fixer for MetadataFixer {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn handles(&self, rule_id: &str) -> bool {
        matches!(rule_id, "bio.exists" | "nfo.has_mbid")
    }

    async fn fix(&self, ctx: &mut FixContext, violation: &Violation) -> FixOutcome {
        let mbid = ctx.record.musicbrainz_id.clone();
        let fetched = self
            .orchestrator
            .fetch_metadata(mbid.as_deref(), Some(&ctx.record.name))
            .await;

        if fetched.metadata.is_empty() && mbid.is_none() {
            return FixOutcome {
                rule_id: violation.rule_id.clone(),
                fixer: self.name().to_string(),
                status: FixStatus::Skipped,
                detail: Some("no provider returned usable metadata".to_string()),
            };
        }

        apply_empty_fields(ctx, &fetched.metadata);

        match nfo::render_nfo(&ctx.metadata).and_then(|bytes| crate::fs::write_file_atomic(&ctx.dir.join("artist.nfo"), &bytes)) {
            Ok(()) => FixOutcome {
                rule_id: violation.rule_id.clone(),
                fixer: self.name().to_string(),
                status: FixStatus::Fixed,
                detail: None,
            },
            Err(e) => FixOutcome {
                rule_id: violation.rule_id.clone(),
                fixer: self.name().to_string(),
                status: FixStatus::Failed,
                detail: Some(e.to_string()),
            },
        }
    }
}

/// Only fills fields that are currently empty — never overwrites
/// whatever the artist record already has, per §4.6.
fn apply_empty_fields(ctx: &mut FixContext, fetched: &crate::models::ArtistMetadata) {
    let meta = &mut ctx.metadata;

    if meta.name.is_none() {
        meta.name = fetched.name.clone();
    }
    if meta.sort_name.is_none() {
        meta.sort_name = fetched.sort_name.clone();
    }
    if meta.biography.is_none() {
        meta.biography = fetched.biography.clone();
    }
    if meta.disambiguation.is_none() {
        meta.disambiguation = fetched.disambiguation.clone();
    }
    if meta.country.is_none() {
        meta.country = fetched.country.clone();
    }
    if meta.formed.is_none() {
        meta.formed = fetched.formed.clone();
    }
    if meta.born.is_none() {
        meta.born = fetched.born.clone();
    }
    if meta.died.is_none() {
        meta.died = fetched.died.clone();
    }
    if meta.disbanded.is_none() {
        meta.disbanded = fetched.disbanded.clone();
    }
    if meta.genres.is_empty() {
        meta.genres = fetched.genres.clone();
    }
    if meta.styles.is_empty() {
        meta.styles = fetched.styles.clone();
    }
    if meta.moods.is_empty() {
        meta.moods = fetched.moods.clone();
    }
    if meta.members.is_empty() {
        meta.members = fetched.members.clone();
    }
    if meta.musicbrainz_id.is_none() {
        meta.musicbrainz_id = fetched.musicbrainz_id.clone();
    }
    if meta.audiodb_id.is_none() {
        meta.audiodb_id = fetched.audiodb_id.clone();
    }
    if meta.discogs_id.is_none() {
        meta.discogs_id = fetched.discogs_id.clone();
    }
    if meta.wikidata_id.is_none() {
        meta.wikidata_id = fetched.wikidata_id.clone();
    }
    for alias in &fetched.aliases {
        meta.aliases.insert(alias.clone());
    }
    merge_urls(&mut meta.urls, &fetched.urls);

    if let Some(mbid) = &meta.musicbrainz_id {
        if ctx.record.musicbrainz_id.is_none() {
            ctx.record.musicbrainz_id = Some(mbid.clone());
        }
    }
}
