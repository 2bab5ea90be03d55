//! File-backed session store.
//!
//! Persists the key/value map as a single CBOR document. Writes go to a
//! sibling temporary file which is then renamed over the original, so a
//! crash mid-write leaves either the old or the new map on disk.

use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs,
    io::{self, BufReader, BufWriter},
    path::{Path, PathBuf},
};

use keygate_core::{SessionStore, StoreError};
use serde::{Deserialize, Serialize};

/// On-disk format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    entries: BTreeMap<String, String>,
}

/// Session store backed by a CBOR file.
///
/// Clones refer to the same file. A missing file reads as an empty store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store persisting to `path`. Nothing is touched until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling the next write goes to before it is renamed into place.
    ///
    /// The suffix is appended to the full file name, so it never collides
    /// with the session file itself or with a sibling of another extension.
    fn temp_path(&self) -> Result<PathBuf, StoreError> {
        let mut name = self.path.file_name().map(OsString::from).ok_or_else(|| {
            StoreError::Unavailable {
                reason: format!("{} is not a file path", self.path.display()),
            }
        })?;
        name.push(".tmp");
        Ok(self.path.with_file_name(name))
    }

    fn load(&self) -> Result<SessionFile, StoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SessionFile::default()),
            Err(e) => return Err(e.into()),
        };

        ciborium::from_reader(BufReader::new(file))
            .map_err(|e| StoreError::Corrupt { reason: e.to_string() })
    }

    fn save(&self, session: &SessionFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path()?;
        {
            let file = fs::File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            ciborium::into_writer(session, &mut writer)
                .map_err(|e| StoreError::Unavailable { reason: e.to_string() })?;
            writer.into_inner().map_err(io::IntoInnerError::into_error)?.sync_all()?;
        }

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut session = self.load()?;
        session.entries.insert(key.to_string(), value.to_string());
        self.save(&session)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut session = self.load()?;
        if session.entries.remove(key).is_some() {
            self.save(&session)?;
        }
        Ok(())
    }
}
