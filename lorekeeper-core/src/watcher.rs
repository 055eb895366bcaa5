use crate::events::EventBus;
use notify::EventKind;
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, warn};

/// Debounce window before a burst of filesystem events is delivered as one
/// batch — generous enough to absorb a scanner's own writes (NFO/image
/// saves) without re-triggering a rescan of what this process just wrote.
const DEBOUNCE_WINDOW: Duration = Duration::from_secs(2);

/// §2's filesystem watcher: observes the music library root and publishes
/// `fs.dir.created`/`fs.dir.removed` onto the event bus whenever an artist
/// directory appears or disappears. Only directory-level create/remove is
/// surfaced — file-level churn inside an artist directory is the
/// scanner's concern (an external collaborator per §1), not this
/// crate's.
pub struct LibraryWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher, RecommendedCache>,
}

impl LibraryWatcher {
    pub fn start(root: &Path, bus: std::sync::Arc<EventBus>) -> notify::Result<Self> {
        let mut debouncer = new_debouncer(DEBOUNCE_WINDOW, None, move |result: DebounceEventResult| match result {
            Ok(events) => {
                for event in events {
                    handle_event(&event.event.kind, &event.event.paths, &bus);
                }
            }
            Err(errors) => {
                for e in errors {
                    error!(error = %e, "filesystem watcher error");
                }
            }
        })?;

        debouncer.watch(root, notify::RecursiveMode::Recursive)?;

        Ok(Self { _debouncer: debouncer })
    }
}

fn handle_event(kind: &EventKind, paths: &[PathBuf], bus: &EventBus) {
    for path in paths {
        // Depth check only — a path's own existence already tells us
        // create vs remove; `is_dir()` on a remove event is always false,
        // so removals are inferred from the event kind instead.
        match kind {
            EventKind::Create(_) if path.is_dir() => {
                bus.publish("fs.dir.created", json!({ "path": path.display().to_string() }));
            }
            EventKind::Remove(_) => {
                bus.publish("fs.dir.removed", json!({ "path": path.display().to_string() }));
            }
            _ => {}
        }
    }
}

/// Probes whether symlinks are usable on `dir`'s filesystem, for wiring
/// into the `use_symlinks` flag fixers read off `FixContext`. Delegates to
/// the `fs::save` probe; kept here so callers wire watcher startup and
/// symlink-capability detection from one place at process init.
pub fn probe_symlink_support(dir: &Path) -> bool {
    let supported = crate::fs::save::probe_symlink_support(dir);
    if !supported {
        warn!(dir = %dir.display(), "symlinks unsupported on this filesystem, image fixer will write regular files only");
    }
    supported
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn watcher_publishes_dir_created_event() {
        let dir = tempfile::tempdir().unwrap();
        let received = Arc::new(std::sync::Mutex::new(Vec::new()));
        let r = received.clone();
        let subscriber: Arc<dyn crate::events::Subscriber> = Arc::new(move |event: &crate::events::Event| {
            r.lock().unwrap().push(event.event_type.clone());
        });
        let bus = Arc::new(EventBus::new(vec![subscriber]));

        let _watcher = LibraryWatcher::start(dir.path(), bus.clone()).unwrap();
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        std::fs::create_dir(dir.path().join("New Artist")).unwrap();
        tokio::time::sleep(StdDuration::from_secs(3)).await;

        assert!(received.lock().unwrap().contains(&"fs.dir.created".to_string()));
    }
}
