//! Mirrors the `transcribing` flag to a small JSON file so an external
//! CLI invocation or GUI helper process can flip dictation on/off for
//! a running `talkie` process without sending it a signal.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use talkie_foundation::StateManager;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StateFileContents {
    pub transcribing: bool,
}

pub fn default_state_file_path() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join("talkie.state")
}

pub fn write_state(path: &Path, transcribing: bool) -> std::io::Result<()> {
    let contents = StateFileContents { transcribing };
    let json = serde_json::to_string(&contents)?;
    std::fs::write(path, json)
}

pub fn read_state(path: &Path) -> std::io::Result<StateFileContents> {
    let json = std::fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Polls `path` at the default 500ms interval, applying any externally
/// written `transcribing` value onto `state`.
pub fn spawn_watcher(path: PathBuf, state: Arc<StateManager>) -> JoinHandle<()> {
    spawn_watcher_with_interval(path, state, POLL_INTERVAL)
}

pub fn spawn_watcher_with_interval(path: PathBuf, state: Arc<StateManager>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_seen = state.transcribing();
        loop {
            tokio::time::sleep(interval).await;
            match read_state(&path) {
                Ok(contents) if contents.transcribing != last_seen => {
                    last_seen = contents.transcribing;
                    state.set_transcribing(contents.transcribing);
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(error = %e, "failed to read talkie state file"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use talkie_foundation::AppState;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("talkie.state");
        write_state(&path, true).unwrap();
        let contents = read_state(&path).unwrap();
        assert!(contents.transcribing);
    }

    #[test]
    fn missing_file_is_a_not_found_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.state");
        let err = read_state(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn watcher_applies_external_state_change() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("talkie.state");

        let sm = StateManager::new();
        sm.transition(AppState::Running).unwrap();
        sm.set_transcribing(false);
        let sm = Arc::new(sm);

        write_state(&path, true).unwrap();
        let handle = spawn_watcher_with_interval(path.clone(), sm.clone(), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sm.transcribing());
        handle.abort();
    }
}
