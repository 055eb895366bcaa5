use std::path::{Path, PathBuf};

/// §4.7 fanart indexing. `kodi_numbering=false` (Emby/Jellyfin/Plex):
/// index 0 is `primary`, index i≥1 is `{base}{i+1}{ext}` (first extra is
/// `backdrop2.jpg`). `kodi_numbering=true`: index i≥1 is `{base}{i}{ext}`
/// (first extra is `fanart1.jpg`).
pub fn fanart_filename(primary: &str, index: u32, kodi_numbering: bool) -> String {
    if index == 0 {
        return primary.to_string();
    }
    let (base, ext) = split_stem_ext(primary);
    let suffix = if kodi_numbering { index } else { index + 1 };
    format!("{base}{suffix}{ext}")
}

fn split_stem_ext(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) => (&filename[..idx], &filename[idx..]),
        None => (filename, ""),
    }
}

const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

struct FanartMatch {
    index: u32,
    path: PathBuf,
    ext_matches_primary: bool,
}

/// Returns the sorted, deduplicated list of existing fanart paths in `dir`.
/// Case-insensitive on base name and extension. Index 0 requires exact
/// `base` equality; index ≥1 requires `{base}{digits}` with a positive
/// integer. When multiple files share an index, the one whose extension
/// matches `primary`'s sorts first; the rest are deduplicated out.
pub fn discover_fanart(dir: &Path, primary: &str) -> Vec<PathBuf> {
    let (base, primary_ext) = split_stem_ext(primary);
    let base_lower = base.to_lowercase();
    let primary_ext_lower = primary_ext.trim_start_matches('.').to_lowercase();

    let Ok(entries) = std::fs::read_dir(dir) else {
        return vec![];
    };

    let mut matches: Vec<FanartMatch> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(filename) = path.file_name().and_then(|f| f.to_str()) else { continue };
        let (stem, ext) = split_stem_ext(filename);
        let ext = ext.trim_start_matches('.').to_lowercase();
        if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        let stem_lower = stem.to_lowercase();
        let index = if stem_lower == base_lower {
            Some(0)
        } else if let Some(digits) = stem_lower.strip_prefix(&base_lower) {
            digits.parse::<u32>().ok().filter(|n| *n > 0)
        } else {
            None
        };

        if let Some(index) = index {
            matches.push(FanartMatch {
                index,
                path,
                ext_matches_primary: ext == primary_ext_lower,
            });
        }
    }

    matches.sort_by(|a, b| {
        a.index
            .cmp(&b.index)
            .then_with(|| b.ext_matches_primary.cmp(&a.ext_matches_primary))
    });

    let mut out = Vec::new();
    let mut seen_index = None;
    for m in matches {
        if seen_index == Some(m.index) {
            continue;
        }
        seen_index = Some(m.index);
        out.push(m.path);
    }
    out
}

/// −1 if no match, 0 if only the primary, else the largest numeric suffix.
pub fn max_fanart_index(dir: &Path, primary: &str) -> i64 {
    let (base, _) = split_stem_ext(primary);
    let base_lower = base.to_lowercase();

    let found = discover_fanart(dir, primary);
    if found.is_empty() {
        return -1;
    }

    found
        .into_iter()
        .filter_map(|p| {
            let filename = p.file_name()?.to_str()?.to_string();
            let (stem, _) = split_stem_ext(&filename);
            let stem_lower = stem.to_lowercase();
            if stem_lower == base_lower {
                Some(0i64)
            } else {
                stem_lower.strip_prefix(&base_lower)?.parse::<i64>().ok()
            }
        })
        .max()
        .unwrap_or(-1)
}

/// Next insertion index so existing files are never overwritten, even
/// across numbering gaps. Kodi's on-disk suffix equals the abstract index,
/// so the next one is `max + 1`. Emby/Jellyfin/Plex's on-disk suffix is
/// already `index + 1` (see `fanart_filename`), so `max` itself — not
/// `max + 1` — is the next unused abstract index; `fanart_filename` adds
/// its own `+1` offset when rendering the filename.
pub fn next_fanart_index(max: i64, kodi: bool) -> u32 {
    if kodi {
        (max + 1).max(0) as u32
    } else {
        max.max(0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_index_0_is_always_primary() {
        assert_eq!(fanart_filename("backdrop.jpg", 0, false), "backdrop.jpg");
        assert_eq!(fanart_filename("fanart.jpg", 0, true), "fanart.jpg");
    }

    #[test]
    fn emby_numbering_offsets_by_one() {
        assert_eq!(fanart_filename("backdrop.jpg", 2, false), "backdrop3.jpg");
    }

    #[test]
    fn kodi_numbering_matches_index_directly() {
        assert_eq!(fanart_filename("fanart.jpg", 3, true), "fanart3.jpg");
    }

    #[test]
    fn scenario_s2_emby_fanart_numbering() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("backdrop.jpg"), b"1").unwrap();
        std::fs::write(dir.path().join("backdrop2.jpg"), b"2").unwrap();

        let max = max_fanart_index(dir.path(), "backdrop.jpg");
        assert_eq!(max, 2);
        let next = next_fanart_index(max, false);
        assert_eq!(next, 2);
        assert_eq!(fanart_filename("backdrop.jpg", next, false), "backdrop3.jpg");
    }

    #[test]
    fn scenario_s3_kodi_fanart_numbering() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fanart.jpg"), b"1").unwrap();
        std::fs::write(dir.path().join("fanart1.jpg"), b"2").unwrap();
        std::fs::write(dir.path().join("fanart2.jpg"), b"3").unwrap();

        let max = max_fanart_index(dir.path(), "fanart.jpg");
        assert_eq!(max, 2);
        let next = next_fanart_index(max, true);
        assert_eq!(next, 3);
        assert_eq!(fanart_filename("fanart.jpg", next, true), "fanart3.jpg");
    }

    #[test]
    fn max_fanart_index_is_negative_one_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(max_fanart_index(dir.path(), "backdrop.jpg"), -1);
    }

    #[test]
    fn discover_fanart_dedupes_same_index_preferring_primary_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("backdrop.jpg"), b"1").unwrap();
        std::fs::write(dir.path().join("backdrop.png"), b"2").unwrap();

        let found = discover_fanart(dir.path(), "backdrop.jpg");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name().unwrap().to_str().unwrap(), "backdrop.jpg");
    }
}
