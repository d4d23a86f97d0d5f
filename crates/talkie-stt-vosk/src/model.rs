//! Model path resolution: an env var, when set, takes priority over
//! the configured path.

use std::path::{Path, PathBuf};

pub const MODEL_ENV_VAR: &str = "VOSK_MODEL_PATH";

pub fn resolve_model_path(configured: &Path) -> PathBuf {
    if let Ok(p) = std::env::var(MODEL_ENV_VAR) {
        return PathBuf::from(p);
    }
    configured.to_path_buf()
}
