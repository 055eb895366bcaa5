use super::{FixContext, Fixer};
use crate::errors::{CoreError, CoreResult};
use crate::fs::{fanart, image_ops, save};
use crate::models::{FixOutcome, FixStatus, ImageResult, ImageType, Violation};
use crate::orchestrator::Orchestrator;
use crate::rules::checkers::{
    BANNER_MIN_HEIGHT, BANNER_MIN_WIDTH, FANART_MIN_HEIGHT, FANART_MIN_WIDTH, LOGO_MIN_HEIGHT, LOGO_MIN_WIDTH,
    THUMB_MIN_HEIGHT, THUMB_MIN_WIDTH,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_middleware::ClientWithMiddleware;
use std::sync::Arc;

/// Maximum box an image is downsampled into after the minimum-resolution
/// check passes, to keep on-disk artwork a sane size. Not spec'd as a
/// literal constant; chosen generously above every checker's minimum.
const MAX_BOX_WIDTH: u32 = 4000;
const MAX_BOX_HEIGHT: u32 = 4000;

/// Below this many bytes a response can't plausibly decode to a real photo,
/// whatever its `Content-Length` claims; used only when the streamed probe
/// couldn't decode dimensions from the capped read.
const MIN_PLAUSIBLE_BYTES: u64 = 1024;

/// Handles every `*.exists`/`*.min_res`/`*.square`/`*.aspect` image
/// violation: pulls the orchestrator's priority-ordered image list for
/// that type, probes remote dimensions (capped read, `Content-Length`
/// fallback), rejects anything under the type's minimum, then downloads,
/// resizes, and saves the first image that clears the bar.
pub struct ImageFixer {
    orchestrator: Arc<Orchestrator>,
    client: ClientWithMiddleware,
}

impl ImageFixer {
    pub fn new(orchestrator: Arc<Orchestrator>, client: ClientWithMiddleware) -> Self {
        Self { orchestrator, client }
    }

    async fn fetch_bytes(&self, url: &str) -> CoreResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let bytes = response.bytes().await.map_err(CoreError::from)?;
        Ok(bytes.to_vec())
    }

    /// Cheap pre-download gate: streams only up to `MAX_PROBE_BYTES` of the
    /// body and tries to decode dimensions from the partial read. When the
    /// format can't be decoded from a partial read (e.g. a progressive
    /// encoding that needs more of the file), falls back to rejecting on
    /// `Content-Length` alone when it's implausibly small; otherwise lets
    /// the candidate through for the full download to settle it.
    async fn probe_dimensions(&self, url: &str) -> CoreResult<Option<(u32, u32)>> {
        let response = self.client.get(url).send().await?;
        let content_length = response.content_length();

        let mut buf = Vec::new();
        let mut stream = response.bytes_stream();
        while buf.len() < image_ops::MAX_PROBE_BYTES {
            match stream.next().await {
                Some(chunk) => buf.extend_from_slice(&chunk.map_err(CoreError::from)?),
                None => break,
            }
        }
        buf.truncate(image_ops::MAX_PROBE_BYTES);

        match image_ops::probe_dimensions(&buf) {
            Ok(dims) => Ok(Some(dims)),
            Err(_) => match content_length {
                Some(len) if len < MIN_PLAUSIBLE_BYTES => Err(CoreError::Validation(format!(
                    "content-length {len} below plausible image size and dimensions unreadable from probe"
                ))),
                _ => Ok(None),
            },
        }
    }
}

fn image_type_and_minimum(rule_id: &str) -> Option<(ImageType, &'static str, u32, u32)> {
    match rule_id {
        "thumb.exists" | "thumb.min_res" | "thumb.square" => Some((ImageType::Thumb, "thumb", THUMB_MIN_WIDTH, THUMB_MIN_HEIGHT)),
        "fanart.exists" | "fanart.min_res" | "fanart.aspect" => Some((ImageType::Fanart, "fanart", FANART_MIN_WIDTH, FANART_MIN_HEIGHT)),
        "logo.exists" | "logo.min_res" => Some((ImageType::Logo, "logo", LOGO_MIN_WIDTH, LOGO_MIN_HEIGHT)),
        "banner.exists" | "banner.min_res" => Some((ImageType::Banner, "banner", BANNER_MIN_WIDTH, BANNER_MIN_HEIGHT)),
        _ => None,
    }
}

fn target_filenames(ctx: &FixContext, kind: &str) -> Vec<String> {
    match kind {
        "thumb" => vec!["folder.jpg".to_string()],
        "logo" => vec!["logo.png".to_string()],
        "banner" => vec!["banner.jpg".to_string()],
        "fanart" => {
            let primary = if ctx.kodi_numbering { "fanart.jpg" } else { "backdrop.jpg" };
            let max = fanart::max_fanart_index(&ctx.dir, primary);
            let index = fanart::next_fanart_index(max, ctx.kodi_numbering);
            vec![fanart::fanart_filename(primary, index, ctx.kodi_numbering)]
        }
        _ => vec![],
    }
}

#[async_trait]
impl Fixer for ImageFixer {
    fn name(&self) -> &'static str {
        "image"
    }

    fn handles(&self, rule_id: &str) -> bool {
        image_type_and_minimum(rule_id).is_some()
    }

    async fn fix(&self, ctx: &mut FixContext, violation: &Violation) -> FixOutcome {
        let Some((target_type, kind, min_width, min_height)) = image_type_and_minimum(&violation.rule_id) else {
            return FixOutcome {
                rule_id: violation.rule_id.clone(),
                fixer: self.name().to_string(),
                status: FixStatus::Skipped,
                detail: Some("no image fixer for this rule".to_string()),
            };
        };

        let mbid = ctx.record.musicbrainz_id.clone();
        let fetched = self.orchestrator.fetch_metadata(mbid.as_deref(), Some(&ctx.record.name)).await;
        let candidates: Vec<&ImageResult> = fetched.images.iter().filter(|img| img.image_type.normalized() == target_type).collect();

        for candidate in candidates {
            match self.try_candidate(ctx, candidate, kind, min_width, min_height).await {
                Ok(()) => {
                    return FixOutcome {
                        rule_id: violation.rule_id.clone(),
                        fixer: self.name().to_string(),
                        status: FixStatus::Fixed,
                        detail: None,
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %candidate.url, error = %e, "candidate image rejected or failed to save");
                }
            }
        }

        FixOutcome {
            rule_id: violation.rule_id.clone(),
            fixer: self.name().to_string(),
            status: FixStatus::Skipped,
            detail: Some("no candidate image met the minimum resolution".to_string()),
        }
    }
}

impl ImageFixer {
    async fn try_candidate(&self, ctx: &FixContext, candidate: &ImageResult, kind: &str, min_width: u32, min_height: u32) -> CoreResult<()> {
        if let Some((width, height)) = self.probe_dimensions(&candidate.url).await? {
            if width < min_width || height < min_height {
                return Err(CoreError::Validation(format!(
                    "image {}x{} below minimum {min_width}x{min_height}",
                    width, height
                )));
            }
        }

        let bytes = self.fetch_bytes(&candidate.url).await?;
        let (width, height) = image_ops::probe_dimensions(&bytes)?;
        if width < min_width || height < min_height {
            return Err(CoreError::Validation(format!(
                "image {}x{} below minimum {min_width}x{min_height}",
                width, height
            )));
        }

        let decoded = image_ops::decode(&bytes)?;
        let source_is_webp = crate::fs::format::detect(&bytes) == Some(crate::fs::format::ImageFormat::WebP);
        let (resized_bytes, _) = image_ops::resize(&decoded, MAX_BOX_WIDTH, MAX_BOX_HEIGHT, source_is_webp)?;

        let file_names = target_filenames(ctx, kind);
        save::save(&ctx.dir, kind, &resized_bytes, &file_names, ctx.use_symlinks)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_rule_ids_to_image_type_and_minimum() {
        assert_eq!(image_type_and_minimum("thumb.min_res").unwrap().0, ImageType::Thumb);
        assert_eq!(image_type_and_minimum("banner.exists").unwrap().2, BANNER_MIN_WIDTH);
        assert!(image_type_and_minimum("bio.exists").is_none());
    }

    #[test]
    fn fanart_target_filename_uses_kodi_or_emby_primary() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = FixContext {
            dir: dir.path().to_path_buf(),
            record: crate::models::ArtistRecord {
                id: "1".to_string(),
                path: dir.path().display().to_string(),
                name: "Radiohead".to_string(),
                musicbrainz_id: None,
                provider_ids: Default::default(),
                is_classical: false,
            },
            metadata: crate::models::ArtistMetadata::default(),
            kodi_numbering: true,
            use_symlinks: false,
        };
        assert_eq!(target_filenames(&ctx, "fanart"), vec!["fanart.jpg".to_string()]);
    }
}
