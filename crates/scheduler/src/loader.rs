//! Filesystem-backed subscription store with optional hot-reload.
//!
//! Scans a directory (recursively) for `*.yml` / `*.yaml` settings
//! documents — one file per user, each listing that user's notification
//! opt-ins — and maintains an in-memory map keyed by file stem. Parse
//! errors are reported per-file and never abort the scan.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tracing::{info, warn};

use nudge_core::{Subscription, UserRef};

use crate::store::{StoreError, SubscriptionStore};

/// One user's notification settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsDocument {
    pub user: UserRef,
    #[serde(default)]
    pub notifications: Vec<NotificationSetting>,
}

/// A single opt-in inside a settings document.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSetting {
    pub kind: String,
    pub schedule: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SettingsDocument {
    fn subscriptions(&self) -> impl Iterator<Item = Subscription> + '_ {
        self.notifications.iter().map(|n| Subscription {
            user: self.user.clone(),
            kind: n.kind.clone(),
            schedule: n.schedule.clone(),
            enabled: n.enabled,
        })
    }
}

/// Outcome of loading a single settings file.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

#[derive(Debug)]
pub enum LoadStatus {
    Loaded { user_id: String },
    Skipped { reason: String },
    Failed { error: String },
}

type SharedDocuments = Arc<RwLock<HashMap<String, SettingsDocument>>>;

/// Filesystem-backed subscription source with optional hot-reload.
pub struct SubscriptionLoader {
    dir: PathBuf,
    documents: SharedDocuments,
    /// Active filesystem watcher (held to keep it alive).
    _watcher: Option<RecommendedWatcher>,
}

impl SubscriptionLoader {
    /// Create a loader for the given directory, creating it (and parents)
    /// if missing.
    pub fn new(dir: PathBuf) -> Self {
        if !dir.exists() {
            if let Err(e) = fs::create_dir_all(&dir) {
                warn!(path = %dir.display(), error = %e, "failed to create subscriptions directory");
            }
        }
        Self {
            dir,
            documents: Arc::new(RwLock::new(HashMap::new())),
            _watcher: None,
        }
    }

    /// Recursively scan the directory and load every YAML settings file.
    ///
    /// Dotfiles and non-YAML files are skipped; per-file parse errors are
    /// reported in the results without aborting the scan.
    pub fn load_all(&self) -> Result<Vec<LoadResult>, StoreError> {
        let mut results = Vec::new();
        Self::scan_dir(&self.dir, &self.documents, &mut results)?;
        Ok(results)
    }

    fn scan_dir(
        dir: &Path,
        documents: &SharedDocuments,
        results: &mut Vec<LoadResult>,
    ) -> Result<(), StoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    continue;
                }
            }

            if path.is_dir() {
                Self::scan_dir(&path, documents, results)?;
                continue;
            }

            if !is_yaml(&path) {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a YAML file".to_string(),
                    },
                });
                continue;
            }

            match Self::load_file(&path, documents) {
                Ok(user_id) => {
                    info!(user_id = %user_id, path = %path.display(), "loaded subscription settings");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded { user_id },
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load settings file");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed { error: e },
                    });
                }
            }
        }
        Ok(())
    }

    fn load_file(path: &Path, documents: &SharedDocuments) -> Result<String, String> {
        let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let doc: SettingsDocument = serde_yaml::from_str(&contents).map_err(|e| e.to_string())?;
        let user_id = doc.user.id.clone();
        documents
            .write()
            .expect("documents lock poisoned")
            .insert(file_stem(path), doc);
        Ok(user_id)
    }

    /// Start watching the directory: created/modified files are re-parsed
    /// and upserted, deleted files removed. A file that fails to parse
    /// keeps its previous version.
    pub fn watch(&mut self) -> Result<(), StoreError> {
        let documents = Arc::clone(&self.documents);
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            match event {
                Ok(event) => handle_fs_event(&event, &documents),
                Err(e) => warn!(error = %e, "subscription watcher error"),
            }
        })
        .map_err(|e| StoreError::Watch(e.to_string()))?;

        watcher
            .watch(&self.dir, RecursiveMode::Recursive)
            .map_err(|e| StoreError::Watch(e.to_string()))?;

        info!(path = %self.dir.display(), "watching subscriptions directory for changes");
        self._watcher = Some(watcher);
        Ok(())
    }

    /// Number of subscriptions currently loaded (enabled or not).
    pub fn subscription_count(&self) -> usize {
        self.documents
            .read()
            .expect("documents lock poisoned")
            .values()
            .map(|d| d.notifications.len())
            .sum()
    }

    /// Snapshot of every loaded subscription, active or not.
    pub fn all_subscriptions(&self) -> Vec<Subscription> {
        self.documents
            .read()
            .expect("documents lock poisoned")
            .values()
            .flat_map(|d| d.subscriptions().collect::<Vec<_>>())
            .collect()
    }
}

#[async_trait]
impl SubscriptionStore for SubscriptionLoader {
    async fn enabled_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .all_subscriptions()
            .into_iter()
            .filter(|s| s.is_active())
            .collect())
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Handle one filesystem event from the notify watcher.
fn handle_fs_event(event: &Event, documents: &SharedDocuments) {
    for path in &event.paths {
        if !is_yaml(path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.starts_with('.') {
                continue;
            }
        }

        match &event.kind {
            EventKind::Create(CreateKind::File)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_)) => {
                match SubscriptionLoader::load_file(path, documents) {
                    Ok(user_id) => {
                        info!(user_id = %user_id, path = %path.display(), "hot-reloaded subscription settings");
                    }
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "failed to parse settings during hot-reload, keeping previous version"
                        );
                    }
                }
            }
            EventKind::Remove(RemoveKind::File) => {
                let removed = documents
                    .write()
                    .expect("documents lock poisoned")
                    .remove(&file_stem(path));
                if removed.is_some() {
                    info!(path = %path.display(), "removed subscriptions after file deletion");
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    const VALID: &str = r#"
user:
  id: u-1
  email: pat@example.com
  name: Pat
notifications:
  - kind: weekly-digest
    schedule: "0 8 * * 1"
  - kind: task-reminder
    schedule: "30 7 * * *"
    enabled: false
"#;

    #[test]
    fn load_all_reads_yaml_documents() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "pat.yml", VALID);

        let loader = SubscriptionLoader::new(tmp.path().to_path_buf());
        let results = loader.load_all().unwrap();

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].status, LoadStatus::Loaded { .. }));
        assert_eq!(loader.subscription_count(), 2);
    }

    #[test]
    fn parse_error_does_not_abort_scan() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "bad.yml", "user: [not a map");
        write(tmp.path(), "pat.yml", VALID);

        let loader = SubscriptionLoader::new(tmp.path().to_path_buf());
        let results = loader.load_all().unwrap();

        let failed = results
            .iter()
            .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
            .count();
        assert_eq!(failed, 1);
        assert_eq!(loader.subscription_count(), 2);
    }

    #[test]
    fn non_yaml_and_dotfiles_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "notes.txt", "nothing");
        write(tmp.path(), ".hidden.yml", VALID);

        let loader = SubscriptionLoader::new(tmp.path().to_path_buf());
        let results = loader.load_all().unwrap();

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].status, LoadStatus::Skipped { .. }));
        assert_eq!(loader.subscription_count(), 0);
    }

    #[test]
    fn scans_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("team-a")).unwrap();
        write(&tmp.path().join("team-a"), "pat.yml", VALID);

        let loader = SubscriptionLoader::new(tmp.path().to_path_buf());
        loader.load_all().unwrap();
        assert_eq!(loader.subscription_count(), 2);
    }

    #[tokio::test]
    async fn enabled_subscriptions_filters_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "pat.yml", VALID);

        let loader = SubscriptionLoader::new(tmp.path().to_path_buf());
        loader.load_all().unwrap();

        let subs = loader.enabled_subscriptions().await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].kind, "weekly-digest");
        assert_eq!(subs[0].user.email, "pat@example.com");
    }
}
