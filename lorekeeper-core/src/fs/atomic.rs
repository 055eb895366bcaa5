use crate::errors::CoreResult;
use std::io;
use std::path::{Path, PathBuf};

/// §4.7 `WriteFileAtomic`: `mkdir -p` the parent, write `path.tmp`, back up
/// any existing `path` to `path.bak`, rename `path.tmp -> path`, then
/// remove `path.bak`. On any failure after the backup step, `path.bak` is
/// restored to `path` before the error surfaces. No teacher file writes
/// images/NFO atomically (it streams blobs into sqlite instead); authored
/// fresh against the literal step list.
///
/// Known limitation (§9 OQ2): the cross-device rename fallback does not
/// fsync the parent directory after the rename; durability across an
/// unclean shutdown on that path is host-dependent and intentionally not
/// addressed here.
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling_with_suffix(path, "tmp");
    let bak_path = sibling_with_suffix(path, "bak");

    std::fs::write(&tmp_path, bytes)?;

    let had_existing = path.exists();
    if had_existing {
        std::fs::rename(path, &bak_path)?;
    }

    match rename_or_copy(&tmp_path, path) {
        Ok(()) => {
            if had_existing {
                let _ = std::fs::remove_file(&bak_path);
            }
            Ok(())
        }
        Err(e) => {
            if had_existing {
                let _ = std::fs::rename(&bak_path, path);
            }
            let _ = std::fs::remove_file(&tmp_path);
            Err(e.into())
        }
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Rename, falling back to copy+fsync+delete on cross-device errors
/// (`EXDEV`), per §4.7.
fn rename_or_copy(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc_exdev()) => {
            std::fs::copy(from, to)?;
            let file = std::fs::File::open(to)?;
            file.sync_all()?;
            std::fs::remove_file(from)?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// `EXDEV` ("cross-device link") — hardcoded rather than pulling in the
/// `libc` crate for one constant.
fn libc_exdev() -> i32 {
    18
}
