use super::{FixContext, Fixer};
use crate::errors::CoreResult;
use crate::models::{ArtistMetadata, FixOutcome, FixStatus, Violation};
use async_trait::async_trait;
use serde::Serialize;

/// Kodi-compatible `artist.nfo`. Field order here IS the on-disk element
/// order — `quick_xml`'s serde serializer walks struct fields in
/// declaration order, the way `api/format.rs`'s `XmlSubsonicResponse`
/// relies on field order for its envelope. Every field is
/// skip-on-empty so unset values are omitted rather than written as
/// empty elements.
#[derive(Serialize)]
#[serde(rename = "artist")]
struct ArtistNfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sortname: Option<String>,
    #[serde(rename = "musicBrainzArtistID", skip_serializing_if = "Option::is_none")]
    musicbrainz_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    biography: Option<String>,
    #[serde(rename = "genre", skip_serializing_if = "Vec::is_empty")]
    genres: Vec<String>,
    #[serde(rename = "style", skip_serializing_if = "Vec::is_empty")]
    styles: Vec<String>,
    #[serde(rename = "mood", skip_serializing_if = "Vec::is_empty")]
    moods: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    formed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disbanded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    born: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    died: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disambiguation: Option<String>,
    #[serde(rename = "member", skip_serializing_if = "Vec::is_empty")]
    members: Vec<MemberXml>,
    #[serde(rename = "alias", skip_serializing_if = "Vec::is_empty")]
    aliases: Vec<String>,
    #[serde(rename = "url", skip_serializing_if = "Vec::is_empty")]
    urls: Vec<UrlXml>,
}

#[derive(Serialize)]
struct MemberXml {
    #[serde(rename = "@active")]
    active: bool,
    #[serde(rename = "$text")]
    name: String,
}

#[derive(Serialize)]
struct UrlXml {
    #[serde(rename = "@type")]
    url_type: String,
    #[serde(rename = "$text")]
    value: String,
}

impl From<&ArtistMetadata> for ArtistNfo {
    fn from(meta: &ArtistMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            sortname: meta.sort_name.clone(),
            musicbrainz_id: meta.musicbrainz_id.clone(),
            biography: meta.biography.clone(),
            genres: meta.genres.clone(),
            styles: meta.styles.clone(),
            moods: meta.moods.clone(),
            formed: meta.formed.clone(),
            disbanded: meta.disbanded.clone(),
            born: meta.born.clone(),
            died: meta.died.clone(),
            country: meta.country.clone(),
            disambiguation: meta.disambiguation.clone(),
            members: meta
                .members
                .iter()
                .map(|m| MemberXml { active: m.active, name: m.name.clone() })
                .collect(),
            aliases: meta.aliases.iter().cloned().collect(),
            urls: meta
                .urls
                .iter()
                .map(|(k, v)| UrlXml { url_type: k.clone(), value: v.clone() })
                .collect(),
        }
    }
}

/// Renders `metadata` to the Kodi `artist.nfo` XML byte form. Idempotent:
/// identical metadata always produces identical bytes, since every
/// collection field sources from a deterministically-ordered container
/// (`BTreeSet`/`BTreeMap` for aliases/urls, insertion order preserved
/// for genres/styles/moods/members).
pub fn render_nfo(metadata: &ArtistMetadata) -> CoreResult<Vec<u8>> {
    let nfo = ArtistNfo::from(metadata);
    let mut bytes = Vec::new();
    quick_xml::se::to_writer(&mut bytes, &nfo)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Handles `nfo.exists` and `nfo.has_mbid` by (re)writing `artist.nfo`
/// from whatever metadata is currently on the `FixContext`, atomically.
pub struct NfoFixer;

#[async_trait]
impl Fixer for NfoFixer {
    fn name(&self) -> &'static str {
        "nfo"
    }

    fn handles(&self, rule_id: &str) -> bool {
        matches!(rule_id, "nfo.exists" | "nfo.has_mbid")
    }

    async fn fix(&self, ctx: &mut FixContext, violation: &Violation) -> FixOutcome {
        match write_nfo(ctx) {
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

fn write_nfo(ctx: &FixContext) -> CoreResult<()> {
    let bytes = render_nfo(&ctx.metadata)?;
    crate::fs::write_file_atomic(&ctx.dir.join("artist.nfo"), &bytes)
}
