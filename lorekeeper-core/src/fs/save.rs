use crate::errors::CoreResult;
use crate::fs::{format, image_ops};
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFLICTING_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// §4.7 `Save`. Detects the incoming format, coerces logos to PNG, rewrites
/// every target's extension to match the actual format, cleans up
/// conflicting siblings, writes atomically, and optionally fans extra
/// targets out as relative symlinks to the first. Returns the final,
/// deduplicated list of filenames actually written.
pub fn save(
    dir: &Path,
    image_type: &str,
    data: &[u8],
    file_names: &[String],
    use_symlinks: bool,
) -> CoreResult<Vec<String>> {
    let detected = format::detect(data);
    let decoded = image_ops::decode(data)?;

    let (bytes, extension) = if image_type == "logo" && detected != Some(format::ImageFormat::Png) {
        let mut buf = std::io::Cursor::new(Vec::new());
        decoded.write_to(&mut buf, image::ImageFormat::Png)?;
        (buf.into_inner(), "png")
    } else {
        let ext = detected.map(|f| f.extension()).unwrap_or("jpg");
        (data.to_vec(), ext)
    };

    let mut targets: Vec<String> = Vec::new();
    for name in file_names {
        let rewritten = rewrite_extension(name, extension);
        if !targets.contains(&rewritten) {
            targets.push(rewritten);
        }
    }

    for target in &targets {
        cleanup_conflicting_formats(dir, target);
        crate::fs::write_file_atomic(&dir.join(target), &bytes)?;
    }

    if use_symlinks && image_type != "fanart" {
        if let Some((first, rest)) = targets.split_first() {
            for extra in rest {
                let extra_path = dir.join(extra);
                let _ = std::fs::remove_file(&extra_path);
                if let Err(e) = std::os::unix::fs::symlink(first, &extra_path) {
                    warn!(target = %extra, error = %e, "failed to create fanart-style symlink");
                }
            }
        }
    }

    Ok(targets)
}

fn rewrite_extension(file_name: &str, extension: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) => format!("{}.{}", &file_name[..idx], extension),
        None => format!("{file_name}.{extension}"),
    }
}

/// §4.7 `CleanupConflictingFormats`: removes siblings sharing `target`'s base
/// name but a different known image extension. Never removes `target` itself.
pub fn cleanup_conflicting_formats(dir: &Path, target_name: &str) {
    let base = match target_name.rfind('.') {
        Some(idx) => &target_name[..idx],
        None => target_name,
    };

    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(filename) = path.file_name().and_then(|f| f.to_str()) else { continue };
        if filename == target_name {
            continue;
        }
        let Some(idx) = filename.rfind('.') else { continue };
        let (stem, ext) = (&filename[..idx], filename[idx + 1..].to_lowercase());
        if stem == base && CONFLICTING_EXTENSIONS.contains(&ext.as_str()) {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(file = %filename, error = %e, "failed to remove conflicting image format");
            }
        }
    }
}

/// §4.7 symlink support probe: create a temp file, symlink it, `readlink` to
/// verify, then remove both. Any failure means "unsupported" and callers
/// should skip the symlink branch of `save`.
pub fn probe_symlink_support(dir: &Path) -> bool {
    let probe = dir.join(".lorekeeper-symlink-probe");
    let link = dir.join(".lorekeeper-symlink-probe-link");
    let _ = std::fs::remove_file(&probe);
    let _ = std::fs::remove_file(&link);

    let result = (|| -> std::io::Result<bool> {
        std::fs::write(&probe, b"probe")?;
        std::os::unix::fs::symlink(probe.file_name().unwrap(), &link)?;
        let target = std::fs::read_link(&link)?;
        Ok(target == PathBuf::from(probe.file_name().unwrap()))
    })();

    let _ = std::fs::remove_file(&probe);
    let _ = std::fs::remove_file(&link);

    result.unwrap_or(false)
}
