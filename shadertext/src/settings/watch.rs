use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info, trace, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches a settings file and raises a flag when its content changes.
///
/// The notify callback runs on notify's own thread and only touches the
/// flag; the owner polls [`SettingsWatcher::take_changed`] between frames
/// and re-imports the file itself.
pub struct SettingsWatcher {
    changed: Arc<AtomicBool>,
    _watcher: RecommendedWatcher,
}

impl SettingsWatcher {
    pub fn start(path: PathBuf) -> Result<Self, notify::Error> {
        let changed = Arc::new(AtomicBool::new(false));
        let changed_flag = changed.clone();
        let initial_hash = file_content_hash(&path).ok();
        let last_seen_hash = Arc::new(Mutex::new(initial_hash));
        let settings_path = path.clone();
        let watch_dir = settings_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        info!(
            "watching settings file '{}' via directory '{}'",
            settings_path.display(),
            watch_dir.display()
        );

        let mut watcher = notify::recommended_watcher(move |result| {
            let event: Event = match result {
                Ok(event) => event,
                Err(err) => {
                    warn!(
                        "settings watcher failed for '{}': {}",
                        settings_path.display(),
                        err
                    );
                    return;
                }
            };

            trace!(
                "settings watcher event for '{}': {:?} {:?}",
                settings_path.display(),
                event.kind,
                event.paths
            );

            if !settings_changed(&event, &settings_path) {
                return;
            }

            let file_hash = match file_content_hash(&settings_path) {
                Ok(hash) => hash,
                Err(err) => {
                    trace!(
                        "settings change event before readable file '{}': {}",
                        settings_path.display(),
                        err
                    );
                    return;
                }
            };

            if let Ok(mut guard) = last_seen_hash.lock() {
                if guard.is_some_and(|existing| existing == file_hash) {
                    debug!(
                        "settings content unchanged; skipping reload: {}",
                        settings_path.display()
                    );
                    return;
                }
                *guard = Some(file_hash);
            }

            changed_flag.store(true, Ordering::SeqCst);
        })?;

        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            changed,
            _watcher: watcher,
        })
    }

    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::SeqCst)
    }
}

fn file_content_hash(path: &Path) -> Result<u64, std::io::Error> {
    let bytes = fs::read(path)?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Ok(hasher.finish())
}

fn settings_changed(event: &Event, settings_path: &Path) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }

    if event.paths.is_empty() {
        return true;
    }

    event
        .paths
        .iter()
        .any(|path| path_matches_target(path, settings_path))
}

fn path_matches_target(path: &Path, target: &Path) -> bool {
    if path == target {
        return true;
    }

    if path.file_name() == target.file_name() {
        return true;
    }

    let path_canon = path.canonicalize().ok();
    let target_canon = target.canonicalize().ok();

    match (path_canon, target_canon) {
        (Some(path_canon), Some(target_canon)) => path_canon == target_canon,
        _ => false,
    }
}
