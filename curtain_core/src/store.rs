//! Persistence seam for the settings record.

use curtain_config::{LoadOutcome, SettingsFile, StoredSettings};
use eyre::WrapErr;

use crate::error::{CurtainError, Result};
use crate::settings::Settings;

/// Synchronous key-value style persistence of the whole settings record.
pub trait SettingsStore {
    /// `Ok(None)` means "nothing usable stored; start from factory settings".
    fn load(&mut self) -> Result<Option<Settings>>;
    fn save(&mut self, settings: &Settings) -> Result<()>;
}

impl SettingsStore for SettingsFile {
    fn load(&mut self) -> Result<Option<Settings>> {
        let outcome = SettingsFile::load(self)
            .map_err(|e| CurtainError::Persistence(format!("{e:#}")))
            .wrap_err_with(|| format!("load settings from {:?}", self.path()))?;
        Ok(match outcome {
            LoadOutcome::Loaded(s) => {
                tracing::debug!(path = ?self.path(), "settings loaded");
                Some(s.into())
            }
            LoadOutcome::Missing => {
                tracing::info!(path = ?self.path(), "no stored settings, using factory defaults");
                None
            }
            LoadOutcome::VersionMismatch { found } => {
                tracing::warn!(
                    path = ?self.path(),
                    found_major = found.major,
                    found_minor = found.minor,
                    expected_major = curtain_config::SETTINGS_MAJOR,
                    "settings version mismatch, using factory defaults"
                );
                None
            }
            LoadOutcome::Corrupt(reason) => {
                tracing::warn!(path = ?self.path(), %reason, "settings unreadable, using factory defaults");
                None
            }
        })
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        let stored = StoredSettings::from(settings);
        SettingsFile::save(self, &stored)
            .map_err(|e| CurtainError::Persistence(format!("{e:#}")))
            .wrap_err_with(|| format!("save settings to {:?}", self.path()))
    }
}

impl<T: SettingsStore + ?Sized> SettingsStore for Box<T> {
    fn load(&mut self) -> Result<Option<Settings>> {
        (**self).load()
    }
    fn save(&mut self, settings: &Settings) -> Result<()> {
        (**self).save(settings)
    }
}
