//! Versioned JSON documents on disk.
//!
//! Both reminder stores keep their whole state in one file. Loading never
//! fails: a missing, unreadable or foreign file is replaced by an empty
//! document. Writing always rewrites the full document through a temporary
//! file that is renamed over the target, so readers never see a partial write.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, error, warn};

use crate::StoreError;

/// Current schema version of every reminder document.
pub const DOCUMENT_VERSION: u32 = 1;

/// A top-level document with a schema version.
pub trait Document: Default + Serialize + DeserializeOwned {
    /// Version recorded in the loaded document.
    fn version(&self) -> u32;
}

/// Load a document, healing the file to an empty document when it is missing or unusable.
pub async fn load_or_heal<D: Document>(path: &Path) -> D {
    match read::<D>(path).await {
        Ok(Some(doc)) if doc.version() <= DOCUMENT_VERSION => {
            debug!(path = %path.display(), "loaded document");
            return doc;
        }
        Ok(Some(doc)) => {
            warn!(
                path = %path.display(),
                version = doc.version(),
                supported = DOCUMENT_VERSION,
                "document has unsupported version, resetting"
            );
        }
        Ok(None) => {
            debug!(path = %path.display(), "no document found, creating empty one");
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read document, resetting");
        }
    }

    let doc = D::default();
    if let Err(e) = write_atomic(path, &doc).await {
        error!(path = %path.display(), error = %e, "failed to persist empty document");
    }
    doc
}

async fn read<D: Document>(path: &Path) -> Result<Option<D>, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Serialize `doc` and atomically replace the file at `path`.
pub async fn write_atomic<D: Serialize>(path: &Path, doc: &D) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(doc)?;
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let tmp_path = temp_path(path);
    fs::write(&tmp_path, &bytes).await.map_err(io_err)?;
    fs::rename(&tmp_path, path).await.map_err(io_err)?;

    debug!(path = %path.display(), bytes = bytes.len(), "wrote document");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
