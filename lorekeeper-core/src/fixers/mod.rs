pub mod image_fixer;
pub mod metadata;
pub mod nfo;

use crate::models::{ArtistMetadata, ArtistRecord, FixOutcome, Violation};
use async_trait::async_trait;
use std::path::PathBuf;

/// Mutable state a fixer run shares across the fixer chain for one artist:
/// the directory the artist's files live in, its DB record, and the
/// currently-merged metadata (grown in place as `MetadataFixer` fetches
/// more of it). Platform naming/symlink knobs ride along since every
/// fixer that writes to disk needs them.
pub struct FixContext {
    pub dir: PathBuf,
    pub record: ArtistRecord,
    pub metadata: ArtistMetadata,
    pub kodi_numbering: bool,
    pub use_symlinks: bool,
}

/// §4.6: a fixer owns a subset of rule ids it can repair.
#[async_trait]
pub trait Fixer: Send + Sync {
    fn name(&self) -> &'static str;
    fn handles(&self, rule_id: &str) -> bool;
    async fn fix(&self, ctx: &mut FixContext, violation: &Violation) -> FixOutcome;
}

/// Dispatches every violation to every fixer that claims its rule id,
/// collecting one `FixOutcome` per (violation, claiming fixer) pair.
/// Re-evaluation after the pipeline runs is the caller's job (§4.6) — it
/// needs a fresh on-disk scan the pipeline itself has no access to.
pub struct FixerPipeline {
    fixers: Vec<Box<dyn Fixer>>,
}

impl FixerPipeline {
    pub fn new(fixers: Vec<Box<dyn Fixer>>) -> Self {
        Self { fixers }
    }

    pub async fn run(&self, ctx: &mut FixContext, violations: &[Violation]) -> Vec<FixOutcome> {
        let mut outcomes = Vec::new();
        for violation in violations {
            for fixer in &self.fixers {
                if fixer.handles(&violation.rule_id) {
                    outcomes.push(fixer.fix(ctx, violation).await);
                }
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FixStatus, Severity};

    struct AlwaysFixes(&'static str);

    #[async_trait]
    impl Fixer for AlwaysFixes {
        fn name(&self) -> &'static str {
            self.0
        }

        fn handles(&self, rule_id: &str) -> bool {
            rule_id == "nfo.exists"
        }

        async fn fix(&self, _ctx: &mut FixContext, violation: &Violation) -> FixOutcome {
            FixOutcome {
                rule_id: violation.rule_id.clone(),
                fixer: self.0.to_string(),
                status: FixStatus::Fixed,
                detail: None,
            }
        }
    }

    fn sample_ctx() -> FixContext {
        FixContext {
            dir: PathBuf::from("/tmp/does-not-matter"),
            record: ArtistRecord {
                id: "1".to_string(),
                path: "/tmp".to_string(),
                name: "Radiohead".to_string(),
                musicbrainz_id: None,
                provider_ids: Default::default(),
                is_classical: false,
            },
            metadata: ArtistMetadata::default(),
            kodi_numbering: false,
            use_symlinks: false,
        }
    }

    #[tokio::test]
    async fn only_claiming_fixers_run_for_a_given_violation() {
        let pipeline = FixerPipeline::new(vec![Box::new(AlwaysFixes("a")), Box::new(AlwaysFixes("b"))]);
        let mut ctx = sample_ctx();
        let violations = vec![
            Violation { rule_id: "nfo.exists".to_string(), severity: Severity::Error, detail: None },
            Violation { rule_id: "bio.exists".to_string(), severity: Severity::Info, detail: None },
        ];
        let outcomes = pipeline.run(&mut ctx, &violations).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.rule_id == "nfo.exists"));
    }
}
