use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps: u32,
    /// Edge of the square game screen, in pixels.
    pub(crate) screen_size: u32,
    pub(crate) eggs_per_row: usize,
    pub(crate) title_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps: 16,
            screen_size: 240,
            eggs_per_row: 3,
            title_ms: 1000,
        }
    }
}

pub(crate) struct Paths {
    pub(crate) save_path: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

impl Paths {
    pub(crate) fn in_dir(dir: &Path) -> Self {
        Self {
            save_path: dir.join("save.json"),
            settings_path: dir.join("settings.json"),
            log_path: dir.join("pocket_friends.log"),
        }
    }
}

pub(crate) fn project_paths() -> Result<Paths> {
    let base = BaseDirs::new().context("could not resolve home directory")?;
    let dir = base.home_dir().join(".pocket_friends");
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(Paths::in_dir(&dir))
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(v) = serde_json::from_str::<Settings>(&s) {
            return v;
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    // rename(2) replaces the target in one step on the same filesystem
    fs::rename(from, to).with_context(|| format!("replace {}", to.display()))?;
    Ok(())
}
