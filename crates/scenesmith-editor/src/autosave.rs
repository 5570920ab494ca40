//! Periodic snapshots of the committed session state.
//!
//! Autosave serializes the session through the recipe codec on a fixed
//! interval and hands the document to a [`SnapshotStore`]. Snapshots cover
//! committed state only, like any export; an interrupted session resumes
//! with previews gone but nothing committed lost.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use scenesmith_recipe::{RecipeDoc, RecipeError};

use crate::cache::GenerationCache;
use crate::codec::{self, ImportResult};
use crate::session::EditorSession;

/// A session shared with the autosave task.
pub type SharedSession = Arc<Mutex<EditorSession>>;

/// Default snapshot interval when the option is absent or malformed.
pub const DEFAULT_INTERVAL_MS: u64 = 30_000;

/// Autosave settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Time between snapshots.
    pub interval: Duration,
}

impl AutosaveConfig {
    /// Config with an explicit interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Reads the `autosave_interval_ms` option from a key-value option
    /// set. Absent or unparsable values fall back to the default with a
    /// warning.
    pub fn from_options(options: &HashMap<String, String>) -> Self {
        let interval_ms = match options.get("autosave_interval_ms") {
            None => DEFAULT_INTERVAL_MS,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(
                    "unparsable autosave_interval_ms {:?}, using {} ms",
                    raw, DEFAULT_INTERVAL_MS
                );
                DEFAULT_INTERVAL_MS
            }),
        };
        Self::with_interval(Duration::from_millis(interval_ms))
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self::with_interval(Duration::from_millis(DEFAULT_INTERVAL_MS))
    }
}

/// Where snapshots go. File-backed in the editor; in-memory in tests.
pub trait SnapshotStore: Send + Sync {
    /// Persists a snapshot, replacing any previous one.
    fn save(&self, doc: &RecipeDoc) -> Result<(), RecipeError>;

    /// Reads the last snapshot back, if one exists.
    fn load(&self) -> Result<Option<RecipeDoc>, RecipeError>;
}

/// Snapshot store writing one JSON file, replaced atomically via a
/// temporary sibling so a crash mid-write never corrupts the snapshot.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, doc: &RecipeDoc) -> Result<(), RecipeError> {
        let json = doc.to_json_pretty()?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<RecipeDoc>, RecipeError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(RecipeDoc::from_json(&json)?))
    }
}

/// Handle to a running autosave task.
pub struct Autosave {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Autosave {
    /// Spawns the snapshot task. It serializes the session every
    /// `config.interval` and keeps running until [`shutdown`](Self::shutdown).
    /// A failed save is logged and retried next tick.
    pub fn spawn(
        session: SharedSession,
        store: Arc<dyn SnapshotStore>,
        config: AutosaveConfig,
    ) -> Self {
        let (shutdown, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first interval tick is immediate; skip it so snapshots
            // land a full interval after spawn.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let doc = {
                            let session = session.lock().unwrap_or_else(|e| e.into_inner());
                            codec::serialize(session.scene(), session.materials())
                        };
                        match store.save(&doc) {
                            Ok(()) => debug!("autosave wrote {} nodes", doc.scene.len()),
                            Err(err) => warn!("autosave failed: {}", err),
                        }
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });
        Self { shutdown, handle }
    }

    /// Stops the task and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

/// Rebuilds session state from the last snapshot, if any. Returns the
/// import result so the caller can issue the pending regenerations.
pub fn resume(
    store: &dyn SnapshotStore,
    cache: &GenerationCache,
) -> Result<Option<ImportResult>, RecipeError> {
    match store.load()? {
        Some(doc) => Ok(Some(codec::deserialize(&doc, cache)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use scenesmith_recipe::TargetSlotType;

    use crate::material::MapBinding;

    use super::*;

    fn sample_session() -> EditorSession {
        let mut session = EditorSession::new();
        let root = session.scene().root();
        let node = session
            .add_node(root, Some("floor.mesh".into()), &[TargetSlotType::Floor])
            .unwrap();
        let slot = session.scene().node(node).unwrap().slot_refs[0];
        session
            .apply_material(
                slot,
                MapBinding::Static {
                    path: "wet_cobble.png".into(),
                },
            )
            .unwrap();
        session.commit_material(slot).unwrap();
        session
    }

    #[test]
    fn file_store_round_trips_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("autosave.json"));
        assert!(store.load().unwrap().is_none());

        let session = sample_session();
        let doc = codec::serialize(session.scene(), session.materials());
        store.save(&doc).unwrap();
        assert_eq!(store.load().unwrap(), Some(doc));
    }

    #[test]
    fn config_falls_back_on_bad_option() {
        let mut options = HashMap::new();
        options.insert("autosave_interval_ms".to_string(), "soon".to_string());
        assert_eq!(
            AutosaveConfig::from_options(&options),
            AutosaveConfig::default()
        );

        options.insert("autosave_interval_ms".to_string(), "250".to_string());
        assert_eq!(
            AutosaveConfig::from_options(&options).interval,
            Duration::from_millis(250)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn autosave_writes_and_resume_restores() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileSnapshotStore::new(dir.path().join("autosave.json")));
        let session = Arc::new(Mutex::new(sample_session()));

        let autosave = Autosave::spawn(
            session.clone(),
            store.clone(),
            AutosaveConfig::with_interval(Duration::from_millis(10)),
        );
        // A few intervals worth of wall time.
        tokio::time::sleep(Duration::from_millis(100)).await;
        autosave.shutdown().await;

        let cache = GenerationCache::new();
        let restored = resume(store.as_ref(), &cache).unwrap().unwrap();
        let session = session.lock().unwrap();
        assert!(restored.warnings.is_empty());
        assert_eq!(
            codec::serialize(&restored.scene, &restored.materials),
            codec::serialize(session.scene(), session.materials())
        );
    }
}
