use crate::config::atomic_rename;
use crate::model::SaveRecord;
use anyhow::{Context, Result};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// The single save file. Only the running game touches it.
pub(crate) struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the record, creating the file with defaults when there is none.
    /// A file that doesn't parse is moved aside to `*.corrupt` and replaced.
    pub(crate) fn load(&self) -> Result<SaveRecord> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no save file, writing defaults");
                return self.init_default();
            }
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };

        match serde_json::from_slice::<SaveRecord>(&bytes) {
            Ok(record) => {
                debug!(kind = %record.creature_kind, age = record.age, "save loaded");
                Ok(record)
            }
            Err(e) => {
                let aside = self.path.with_extension("json.corrupt");
                warn!(error = %e, moved_to = %aside.display(), "save file is unreadable");
                atomic_rename(&self.path, &aside)?;
                self.init_default()
            }
        }
    }

    pub(crate) fn save(&self, record: &SaveRecord) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(record)?;
        fs::write(&tmp, data).with_context(|| format!("write {}", tmp.display()))?;
        atomic_rename(&tmp, &self.path)?;
        debug!(age = record.age, "saved");
        Ok(())
    }

    /// Returns whether there was a file to delete.
    pub(crate) fn delete(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("delete {}", self.path.display())),
        }
    }

    fn init_default(&self) -> Result<SaveRecord> {
        let record = SaveRecord::default();
        self.save(&record).context("could not create save file")?;
        Ok(record)
    }
}
