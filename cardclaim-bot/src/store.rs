use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cardclaim_engine::{BotSettings, ConfigStore, ProbabilityTable, SharedSettings};

/// Settings backed by a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
    settings: SharedSettings,
}

impl FileSettingsStore {
    /// Load settings from `path`, writing the defaults first if the file is missing.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            write_settings(path, &BotSettings::default())?;
            log::info!("Created default settings at {}", path.display());
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings = BotSettings::from_json(&json)
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        log::info!("Loaded settings from {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            settings: SharedSettings::new(settings),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> BotSettings {
        self.settings.snapshot()
    }

    pub fn probabilities(&self) -> ProbabilityTable {
        self.settings.probabilities()
    }

    pub fn save(&self) -> Result<()> {
        write_settings(&self.path, &self.settings.snapshot())
    }

    /// Update one probability category and persist it.
    ///
    /// The in-memory table is restored if the file cannot be written.
    pub fn set_probability(&self, category: &str, value: f64) -> Result<String> {
        let before = self.settings.probabilities();
        let message = self.settings.set_probability(category, value)?;
        if let Err(err) = self.save() {
            self.settings.replace_probabilities(before);
            return Err(err.context(format!("probability for {category} not saved")));
        }
        log::info!("{message}");
        Ok(message)
    }
}

impl ConfigStore for FileSettingsStore {
    fn probability_table(&self) -> ProbabilityTable {
        self.settings.probability_table()
    }

    fn preferred_names(&self) -> Vec<String> {
        self.settings.preferred_names()
    }

    fn claim_delay_ms(&self) -> u64 {
        self.settings.claim_delay_ms()
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        self.settings.is_allowed(sender_id)
    }
}

fn write_settings(path: &Path, settings: &BotSettings) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = settings.to_json_pretty()?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
