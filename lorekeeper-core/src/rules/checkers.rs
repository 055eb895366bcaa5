use super::{ArtistContext, Checker};
use crate::models::{RuleConfig, Severity, Violation};

fn violation(rule_id: &str, severity: Severity, detail: impl Into<String>) -> Violation {
    Violation {
        rule_id: rule_id.to_string(),
        severity,
        detail: Some(detail.into()),
    }
}

/// `nfo.exists`: artist.nfo present in dir.
pub struct NfoExists;
impl Checker for NfoExists {
    fn id(&self) -> &'static str {
        "nfo.exists"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        if ctx.nfo_present {
            None
        } else {
            Some(violation(self.id(), Severity::Error, "artist.nfo missing"))
        }
    }
}

/// `nfo.has_mbid`: nfo contains a MusicBrainz id tag.
pub struct NfoHasMbid;
impl Checker for NfoHasMbid {
    fn id(&self) -> &'static str {
        "nfo.has_mbid"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        if !ctx.nfo_present {
            return None;
        }
        if ctx.nfo_has_mbid {
            None
        } else {
            Some(violation(self.id(), Severity::Warning, "nfo has no MusicBrainz id"))
        }
    }
}

pub(crate) const THUMB_MIN_WIDTH: u32 = 500;
pub(crate) const THUMB_MIN_HEIGHT: u32 = 500;
pub(crate) const FANART_MIN_WIDTH: u32 = 960;
pub(crate) const FANART_MIN_HEIGHT: u32 = 540;
pub(crate) const LOGO_MIN_WIDTH: u32 = 400;
pub(crate) const LOGO_MIN_HEIGHT: u32 = 155;
pub(crate) const BANNER_MIN_WIDTH: u32 = 758;
pub(crate) const BANNER_MIN_HEIGHT: u32 = 140;

/// Aspect-ratio tolerance applied to both `thumb.square` (1:1) and
/// `fanart.aspect` (16:9).
const ASPECT_TOLERANCE: f64 = 0.05;

pub struct ThumbExists;
impl Checker for ThumbExists {
    fn id(&self) -> &'static str {
        "thumb.exists"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        if ctx.images.contains_key("thumb") {
            None
        } else {
            Some(violation(self.id(), Severity::Error, "no thumbnail"))
        }
    }
}

pub struct ThumbSquare;
impl Checker for ThumbSquare {
    fn id(&self) -> &'static str {
        "thumb.square"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        let Some(probe) = ctx.images.get("thumb") else { return None };
        let ratio = probe.width as f64 / probe.height as f64;
        if (ratio - 1.0).abs() <= ASPECT_TOLERANCE {
            None
        } else {
            Some(violation(
                self.id(),
                Severity::Warning,
                format!("thumbnail is {}x{}, not square", probe.width, probe.height),
            ))
        }
    }
}

pub struct ThumbMinRes;
impl Checker for ThumbMinRes {
    fn id(&self) -> &'static str {
        "thumb.min_res"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        let Some(probe) = ctx.images.get("thumb") else { return None };
        if probe.width >= THUMB_MIN_WIDTH && probe.height >= THUMB_MIN_HEIGHT {
            None
        } else {
            Some(violation(
                self.id(),
                Severity::Warning,
                format!("thumbnail {}x{} below minimum {THUMB_MIN_WIDTH}x{THUMB_MIN_HEIGHT}", probe.width, probe.height),
            ))
        }
    }
}

pub struct FanartExists;
impl Checker for FanartExists {
    fn id(&self) -> &'static str {
        "fanart.exists"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        if ctx.images.contains_key("fanart") {
            None
        } else {
            Some(violation(self.id(), Severity::Warning, "no fanart"))
        }
    }
}

pub struct FanartMinRes;
impl Checker for FanartMinRes {
    fn id(&self) -> &'static str {
        "fanart.min_res"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        let Some(probe) = ctx.images.get("fanart") else { return None };
        if probe.width >= FANART_MIN_WIDTH && probe.height >= FANART_MIN_HEIGHT {
            None
        } else {
            Some(violation(
                self.id(),
                Severity::Warning,
                format!("fanart {}x{} below minimum {FANART_MIN_WIDTH}x{FANART_MIN_HEIGHT}", probe.width, probe.height),
            ))
        }
    }
}

pub struct FanartAspect;
impl Checker for FanartAspect {
    fn id(&self) -> &'static str {
        "fanart.aspect"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        let Some(probe) = ctx.images.get("fanart") else { return None };
        let ratio = probe.width as f64 / probe.height as f64;
        let target = 16.0 / 9.0;
        if (ratio - target).abs() / target <= ASPECT_TOLERANCE {
            None
        } else {
            Some(violation(
                self.id(),
                Severity::Info,
                format!("fanart {}x{} is not 16:9", probe.width, probe.height),
            ))
        }
    }
}

pub struct LogoExists;
impl Checker for LogoExists {
    fn id(&self) -> &'static str {
        "logo.exists"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        if ctx.images.contains_key("logo") {
            None
        } else {
            Some(violation(self.id(), Severity::Info, "no logo"))
        }
    }
}

pub struct LogoMinRes;
impl Checker for LogoMinRes {
    fn id(&self) -> &'static str {
        "logo.min_res"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        let Some(probe) = ctx.images.get("logo") else { return None };
        if !probe.is_png {
            return Some(violation(self.id(), Severity::Warning, "logo must be PNG"));
        }
        if probe.width >= LOGO_MIN_WIDTH && probe.height >= LOGO_MIN_HEIGHT {
            None
        } else {
            Some(violation(
                self.id(),
                Severity::Warning,
                format!("logo {}x{} below minimum {LOGO_MIN_WIDTH}x{LOGO_MIN_HEIGHT}", probe.width, probe.height),
            ))
        }
    }
}

pub struct BannerExists;
impl Checker for BannerExists {
    fn id(&self) -> &'static str {
        "banner.exists"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        if ctx.images.contains_key("banner") {
            None
        } else {
            Some(violation(self.id(), Severity::Info, "no banner"))
        }
    }
}

pub struct BannerMinRes;
impl Checker for BannerMinRes {
    fn id(&self) -> &'static str {
        "banner.min_res"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        let Some(probe) = ctx.images.get("banner") else { return None };
        if probe.width >= BANNER_MIN_WIDTH && probe.height >= BANNER_MIN_HEIGHT {
            None
        } else {
            Some(violation(
                self.id(),
                Severity::Warning,
                format!("banner {}x{} below minimum {BANNER_MIN_WIDTH}x{BANNER_MIN_HEIGHT}", probe.width, probe.height),
            ))
        }
    }
}

pub struct BioExists;
impl Checker for BioExists {
    fn id(&self) -> &'static str {
        "bio.exists"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        if ctx.metadata.biography.as_deref().is_some_and(|b| !b.is_empty()) {
            None
        } else {
            Some(violation(self.id(), Severity::Info, "no biography"))
        }
    }
}

/// `artist.id_mismatch`: on-disk ids disagree with DB ids.
pub struct ArtistIdMismatch;
impl Checker for ArtistIdMismatch {
    fn id(&self) -> &'static str {
        "artist.id_mismatch"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        let Some(record) = &ctx.record else { return None };
        for (provider, on_disk_id) in &ctx.on_disk_ids {
            if let Some(db_id) = record.provider_id(provider) {
                if db_id != on_disk_id {
                    return Some(violation(
                        self.id(),
                        Severity::Error,
                        format!("{provider} id mismatch: disk={on_disk_id} db={db_id}"),
                    ));
                }
            }
        }
        None
    }
}

/// `extraneous.images`: files in dir not referenced by any configured
/// naming pattern.
pub struct ExtraneousImages;
impl Checker for ExtraneousImages {
    fn id(&self) -> &'static str {
        "extraneous.images"
    }

    fn check(&self, ctx: &ArtistContext, _config: &RuleConfig) -> Option<Violation> {
        if ctx.extraneous_files.is_empty() {
            None
        } else {
            Some(violation(
                self.id(),
                Severity::Info,
                format!("unreferenced files: {}", ctx.extraneous_files.join(", ")),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ImageProbe;
    use std::collections::BTreeMap;

    fn ctx_with_image(kind: &'static str, probe: ImageProbe) -> ArtistContext {
        let mut images = BTreeMap::new();
        images.insert(kind, probe);
        ArtistContext {
            images,
            ..Default::default()
        }
    }

    #[test]
    fn nfo_exists_fails_when_absent() {
        let ctx = ArtistContext::default();
        assert!(NfoExists.check(&ctx, &RuleConfig::default()).is_some());
    }

    #[test]
    fn nfo_has_mbid_passes_when_no_nfo_at_all() {
        let ctx = ArtistContext::default();
        assert!(NfoHasMbid.check(&ctx, &RuleConfig::default()).is_none());
    }

    #[test]
    fn thumb_square_tolerates_small_deviation() {
        let ctx = ctx_with_image("thumb", ImageProbe { width: 500, height: 505, is_png: false });
        assert!(ThumbSquare.check(&ctx, &RuleConfig::default()).is_none());
    }

    #[test]
    fn thumb_square_flags_clearly_non_square() {
        let ctx = ctx_with_image("thumb", ImageProbe { width: 500, height: 900, is_png: false });
        assert!(ThumbSquare.check(&ctx, &RuleConfig::default()).is_some());
    }

    #[test]
    fn thumb_min_res_flags_undersized_image() {
        let ctx = ctx_with_image("thumb", ImageProbe { width: 200, height: 200, is_png: false });
        assert!(ThumbMinRes.check(&ctx, &RuleConfig::default()).is_some());
    }

    #[test]
    fn logo_min_res_requires_png_even_at_sufficient_resolution() {
        let ctx = ctx_with_image("logo", ImageProbe { width: 500, height: 200, is_png: false });
        let v = LogoMinRes.check(&ctx, &RuleConfig::default()).unwrap();
        assert!(v.detail.unwrap().contains("PNG"));
    }

    #[test]
    fn fanart_aspect_accepts_true_16_9() {
        let ctx = ctx_with_image("fanart", ImageProbe { width: 1920, height: 1080, is_png: false });
        assert!(FanartAspect.check(&ctx, &RuleConfig::default()).is_none());
    }

    #[test]
    fn bio_exists_fails_on_empty_string() {
        let mut ctx = ArtistContext::default();
        ctx.metadata.biography = Some(String::new());
        assert!(BioExists.check(&ctx, &RuleConfig::default()).is_some());
    }

    #[test]
    fn extraneous_images_reports_unreferenced_files() {
        let ctx = ArtistContext {
            extraneous_files: vec!["cover_old.jpg".to_string()],
            ..Default::default()
        };
        let v = ExtraneousImages.check(&ctx, &RuleConfig::default()).unwrap();
        assert!(v.detail.unwrap().contains("cover_old.jpg"));
    }

    #[test]
    fn artist_id_mismatch_detects_disagreement() {
        use crate::models::ArtistRecord;
        use std::collections::BTreeMap as Map;

        let record = ArtistRecord {
            id: "1".to_string(),
            path: "/music/Radiohead".to_string(),
            name: "Radiohead".to_string(),
            musicbrainz_id: Some("aaaa".to_string()),
            provider_ids: Map::new(),
            is_classical: false,
        };
        let ctx = ArtistContext {
            record: Some(record),
            on_disk_ids: [("musicbrainz".to_string(), "bbbb".to_string())].into_iter().collect(),
            ..Default::default()
        };
        assert!(ArtistIdMismatch.check(&ctx, &RuleConfig::default()).is_some());
    }
}
