//! Per-device parameter store backed by `hwparam.json`.
//!
//! Values discovered on a device (identity, SoC id, ...) are cached across
//! tool runs in a flat JSON object. The document is tagged with the hex
//! device identity under the `identity` key; opening it for a different
//! identity discards everything else it holds. Values written by this crate
//! are strings; other JSON values found in the document are kept as-is.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Name of the parameter document inside the storage directory.
pub const PARAM_FILE_NAME: &str = "hwparam.json";
/// Storage directory used when none is configured.
pub const DEFAULT_PARAM_DIR: &str = "logs";
/// Key holding the device identity the document belongs to.
pub const IDENTITY_KEY: &str = "identity";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cannot write parameter store {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Parameter store {path} is not a valid document: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Key '{0}' is reserved for the device identity")]
    ReservedKey(String),
}

/// How the document came to be when the store was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOrigin {
    /// No document existed; a fresh one was written.
    Created,
    /// An existing document for the same identity was loaded.
    Loaded,
    /// An existing document belonged to another identity and was reset.
    Invalidated,
}

/// Parameter store scoped to one device identity.
#[derive(Debug)]
pub struct ParamStore {
    dir: PathBuf,
    path: PathBuf,
    identity: String,
    settings: Map<String, Value>,
    origin: StoreOrigin,
}

impl ParamStore {
    /// Open the store in `dir` for `identity`.
    ///
    /// The identity comparison is byte-exact. If the document is new or was
    /// invalidated, the re-seeded document is written before returning.
    /// A document that exists but does not parse is reported as
    /// [`StoreError::Parse`] and left untouched on disk.
    #[instrument(level = "debug", skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(identity: &str, dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(PARAM_FILE_NAME);

        let (settings, origin) = match read_document(&path)? {
            Some(doc) if doc.get(IDENTITY_KEY).and_then(Value::as_str) == Some(identity) => {
                debug!(keys = doc.len(), "Loaded parameter store");
                (doc, StoreOrigin::Loaded)
            }
            Some(doc) => {
                warn!(
                    stored = doc.get(IDENTITY_KEY).and_then(serde_json::Value::as_str).unwrap_or("<none>"),
                    requested = identity,
                    "Parameter store belongs to another device, discarding"
                );
                (seed(identity), StoreOrigin::Invalidated)
            }
            None => (seed(identity), StoreOrigin::Created),
        };

        let store = Self {
            dir,
            path,
            identity: identity.to_string(),
            settings,
            origin,
        };
        if origin != StoreOrigin::Loaded {
            store.write_document()?;
            info!(
                path = %store.path.display(),
                origin = ?store.origin,
                "Wrote fresh parameter store"
            );
        }
        Ok(store)
    }

    /// Read a string value from memory. Never touches the disk.
    ///
    /// Keys holding a non-string JSON value read as absent; see [`raw`](Self::raw).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(Value::as_str)
    }

    /// Read any value from memory, as stored in the document.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Set `key` and rewrite the whole document before returning.
    ///
    /// [`IDENTITY_KEY`] is fixed when the store is opened and cannot be set.
    #[instrument(level = "debug", skip(self, value))]
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if key == IDENTITY_KEY {
            return Err(StoreError::ReservedKey(key.to_string()));
        }
        self.settings
            .insert(key.to_string(), Value::String(value.to_string()));
        self.write_document()
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn origin(&self) -> StoreOrigin {
        self.origin
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.settings.keys().map(String::as_str)
    }

    /// Write to a sibling temp file, then rename it over the document.
    fn write_document(&self) -> Result<(), StoreError> {
        let storage_err = |source: io::Error| StoreError::Storage {
            path: self.path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(storage_err)?;
        let content = serde_json::to_string_pretty(&self.settings)
            .map_err(|e| storage_err(e.into()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(storage_err)?;
        fs::rename(&tmp, &self.path).map_err(storage_err)?;
        Ok(())
    }
}

fn seed(identity: &str) -> Map<String, Value> {
    let mut doc = Map::new();
    doc.insert(IDENTITY_KEY.to_string(), Value::String(identity.to_string()));
    doc
}

/// Parse the document. Anything but a JSON object is malformed.
fn read_document(path: &Path) -> Result<Option<Map<String, Value>>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Storage {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
