//! JsonStateFile - JSON ファイルへの状態保存
//!
//! 同じディレクトリの一時ファイルに書いてから rename する。
//! 書き込み途中で落ちても壊れたドキュメントは残らない。

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::{PersistError, StateDocument};
use crate::ports::StatePersistence;

#[derive(Debug, Clone)]
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatePersistence for JsonStateFile {
    fn load(&self) -> Result<StateDocument, PersistError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StateDocument::new()),
            Err(e) => return Err(PersistError::Io(e)),
        };
        if raw.trim().is_empty() {
            return Ok(StateDocument::new());
        }
        serde_json::from_str(&raw).map_err(|source| PersistError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, document: &StateDocument) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(document).map_err(PersistError::Encode)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
