use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::KeyValueStore;
use crate::error::AuthError;

/// JSON-object file store.
///
/// The whole document is rewritten on every `set`, so a token set is never
/// half written relative to its siblings. On Unix the file is owner-only.
///
/// # Example
/// ```no_run
/// use armt_auth::storage::FileStore;
///
/// let store = FileStore::new_default();
/// println!("{}", store.path().display());
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    io_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    pub fn new_default() -> Self {
        Self::new(Self::default_path())
    }

    /// `~/.armt/store.json`.
    pub fn default_path() -> PathBuf {
        default_armt_dir().join("store.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(AuthError::Storage(err.to_string())),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(AuthError::Storage(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, AuthError> {
        let _guard = self
            .io_lock
            .lock()
            .map_err(|_| AuthError::Storage("file store lock poisoned".to_string()))?;
        Ok(self.read_document()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), AuthError> {
        let _guard = self
            .io_lock
            .lock()
            .map_err(|_| AuthError::Storage("file store lock poisoned".to_string()))?;
        let mut document = self.read_document()?;
        if value.is_null() {
            document.remove(key);
        } else {
            document.insert(key.to_string(), value);
        }
        self.write_document(&document)
    }
}

fn default_armt_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".armt"))
        .unwrap_or_else(|| PathBuf::from(".armt"))
}
