use crate::error::EngineError;
use std::io::ErrorKind;
use std::path::Path;

/// Reads the whole script as UTF-8 text.
pub async fn load_script(path: &Path) -> Result<String, EngineError> {
    tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => EngineError::ScriptNotFound(path.to_path_buf()),
        _ => EngineError::ScriptUnreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })
}
