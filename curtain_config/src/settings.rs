//! On-disk schema of the mutable settings record and its file store.
//!
//! The file is TOML with a `[version]` table. A major-version mismatch means the
//! layout is not understood and the caller falls back to defaults; minor bumps
//! only ever add fields with serde defaults.
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::StepperKind;

pub const SETTINGS_MAJOR: u16 = 1;
pub const SETTINGS_MINOR: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsVersion {
    pub major: u16,
    pub minor: u16,
}

impl Default for SettingsVersion {
    fn default() -> Self {
        Self {
            major: SETTINGS_MAJOR,
            minor: SETTINGS_MINOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredPosition {
    pub left: f32,
    pub previous: f32,
    pub current: f32,
    pub right: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredMotor {
    pub kind: StepperKind,
    pub acceleration: f32,
    pub max_speed: f32,
    pub steps_per_revolution: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSettings {
    pub version: SettingsVersion,
    pub position: StoredPosition,
    pub motor: StoredMotor,
    pub api_key: String,
}

/// Result of reading the settings file.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(StoredSettings),
    /// No file yet (first boot).
    Missing,
    /// File written by an incompatible major version.
    VersionMismatch { found: SettingsVersion },
    /// File present but unreadable as settings.
    Corrupt(String),
}

#[derive(Deserialize)]
struct VersionProbe {
    version: SettingsVersion,
}

/// Settings persisted as a single TOML file.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> eyre::Result<LoadOutcome> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LoadOutcome::Missing),
            Err(e) => eyre::bail!("read settings {:?}: {}", self.path, e),
        };
        Ok(parse_settings(&text))
    }

    pub fn save(&self, settings: &StoredSettings) -> eyre::Result<()> {
        let text = toml::to_string_pretty(settings)
            .map_err(|e| eyre::eyre!("serialize settings: {}", e))?;
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)
                .map_err(|e| eyre::eyre!("create settings dir {:?}: {}", dir, e))?;
        }
        write_atomic(&self.path, text.as_bytes())
            .map_err(|e| eyre::eyre!("write settings {:?}: {}", self.path, e))
    }
}

/// Classify settings text; never fails, corrupt input is reported as such.
pub fn parse_settings(text: &str) -> LoadOutcome {
    let probe = match toml::from_str::<VersionProbe>(text) {
        Ok(p) => p,
        Err(e) => return LoadOutcome::Corrupt(e.to_string()),
    };
    if probe.version.major != SETTINGS_MAJOR {
        return LoadOutcome::VersionMismatch {
            found: probe.version,
        };
    }
    match toml::from_str::<StoredSettings>(text) {
        Ok(s) => LoadOutcome::Loaded(s),
        Err(e) => LoadOutcome::Corrupt(e.to_string()),
    }
}

/// Temp file + fsync + rename: readers see either the old or the new file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(tmp, path)
}
