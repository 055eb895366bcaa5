pub mod checkers;

use crate::models::{ArtistMetadata, ArtistRecord, EvaluationResult, Rule, Violation};
use std::collections::{BTreeMap, HashMap};

/// A single probed image file: dimensions and format, the minimum a
/// checker needs without touching the filesystem itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProbe {
    pub width: u32,
    pub height: u32,
    pub is_png: bool,
}

/// Everything a checker needs to evaluate one artist, assembled by the
/// caller (scanner/fixer pipeline) from on-disk state — checkers
/// themselves never touch the filesystem, keeping them pure functions
/// per §4.5.
#[derive(Debug, Clone, Default)]
pub struct ArtistContext {
    pub record: Option<ArtistRecord>,
    pub metadata: ArtistMetadata,
    pub nfo_present: bool,
    pub nfo_has_mbid: bool,
    pub images: BTreeMap<&'static str, ImageProbe>,
    /// Files in the artist directory not matched by any configured
    /// fanart/thumb/logo/banner/nfo naming pattern.
    pub extraneous_files: Vec<String>,
    pub is_classical: bool,
    pub classical_mode_skip: bool,
    /// Provider ids read back from the on-disk NFO, for `artist.id_mismatch`.
    pub on_disk_ids: BTreeMap<String, String>,
}

/// A pure function `(context, rule_config) -> Violation?`. `None` means
/// pass.
pub trait Checker: Send + Sync {
    fn id(&self) -> &'static str;
    fn check(&self, ctx: &ArtistContext, config: &crate::models::RuleConfig) -> Option<Violation>;
}

/// Closed registry keyed by rule id, the way `ProviderRegistry` (§4.2) is
/// keyed by provider name.
pub struct CheckerRegistry {
    checkers: HashMap<&'static str, Box<dyn Checker>>,
}

impl CheckerRegistry {
    pub fn builtin() -> Self {
        let list: Vec<Box<dyn Checker>> = vec![
            Box::new(checkers::NfoExists),
            Box::new(checkers::NfoHasMbid),
            Box::new(checkers::ThumbExists),
            Box::new(checkers::ThumbSquare),
            Box::new(checkers::ThumbMinRes),
            Box::new(checkers::FanartExists),
            Box::new(checkers::FanartMinRes),
            Box::new(checkers::FanartAspect),
            Box::new(checkers::LogoExists),
            Box::new(checkers::LogoMinRes),
            Box::new(checkers::BannerExists),
            Box::new(checkers::BannerMinRes),
            Box::new(checkers::BioExists),
            Box::new(checkers::ArtistIdMismatch),
            Box::new(checkers::ExtraneousImages),
        ];
        let checkers = list.into_iter().map(|c| (c.id(), c)).collect();
        Self { checkers }
    }

    pub fn get(&self, id: &str) -> Option<&dyn Checker> {
        self.checkers.get(id).map(|b| b.as_ref())
    }
}

impl Default for CheckerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Evaluates `rules` in the order given (insertion order from the rule
/// store) against `ctx`. Short-circuits to a perfect score when the
/// artist is classical and the "classical mode" setting is `skip`, per
/// §4.5.
pub fn evaluate(
    artist_id: &str,
    rules: &[Rule],
    registry: &CheckerRegistry,
    ctx: &ArtistContext,
) -> EvaluationResult {
    if ctx.is_classical && ctx.classical_mode_skip {
        return EvaluationResult {
            artist_id: artist_id.to_string(),
            rules_total: 0,
            rules_passed: 0,
            violations: vec![],
            health_score: 100.0,
        };
    }

    let mut rules_total = 0u32;
    let mut rules_passed = 0u32;
    let mut violations = Vec::new();

    for rule in rules {
        if !rule.enabled {
            continue;
        }
        let Some(checker) = registry.get(&rule.id) else {
            continue;
        };
        rules_total += 1;
        match checker.check(ctx, &rule.config) {
            Some(mut violation) => {
                // Checkers emit a sensible default severity; an explicit
                // rule config always wins.
                if let Some(configured) = rule.config.severity {
                    violation.severity = configured;
                }
                violations.push(violation);
            }
            None => rules_passed += 1,
        }
    }

    EvaluationResult {
        artist_id: artist_id.to_string(),
        rules_total,
        rules_passed,
        violations,
        health_score: health_score(rules_total, rules_passed),
    }
}

/// `round(100 * rules_passed / rules_total, 1)`, with `rules_total == 0`
/// defined as 100.0 per §3's EvaluationResult invariant.
fn health_score(rules_total: u32, rules_passed: u32) -> f64 {
    if rules_total == 0 {
        return 100.0;
    }
    (100.0 * rules_passed as f64 / rules_total as f64 * 10.0).round() / 10.0
}
