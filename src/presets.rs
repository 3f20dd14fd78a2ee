use crate::error::ConfigError;
use crate::settings::ControllerSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A named set of controller gains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningPreset {
    pub name: String,
    pub description: String,
    pub controller: ControllerSettings,
}

impl TuningPreset {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        kp: f64,
        ki: f64,
        kd: f64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            controller: ControllerSettings {
                kp,
                ki,
                kd,
                target: ControllerSettings::default().target,
            },
        }
    }
}

/// Manager for loading and saving tuning presets
pub struct PresetManager {
    /// Built-in presets that ship with the app
    pub builtin: Vec<TuningPreset>,
    /// User-created presets loaded from disk
    pub user: Vec<TuningPreset>,
    dir: Option<PathBuf>,
}

impl Default for PresetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetManager {
    /// Presets from the user config directory
    pub fn new() -> Self {
        Self::with_dir(Self::default_dir())
    }

    /// Presets from an explicit directory (None = built-ins only)
    pub fn with_dir(dir: Option<PathBuf>) -> Self {
        let mut manager = Self {
            builtin: builtin_presets(),
            user: Vec::new(),
            dir,
        };
        manager.load_user_presets();
        manager
    }

    fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("motion-lab").join("presets"))
    }

    /// Load user presets from disk, skipping unreadable files
    fn load_user_presets(&mut self) {
        let Some(dir) = self.dir.as_deref() else {
            return;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        let mut loaded = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(ConfigError::from)
                .and_then(|content| serde_json::from_str::<TuningPreset>(&content).map_err(ConfigError::from))
            {
                Ok(preset) => loaded.push(preset),
                Err(err) => warn!(path = %path.display(), %err, "skipping preset"),
            }
        }
        loaded.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = loaded.len(), "user presets loaded");
        self.user = loaded;
    }

    fn file_for(dir: &Path, name: &str) -> PathBuf {
        let filename = name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect::<String>();
        dir.join(format!("{}.json", filename))
    }

    /// Save a preset to disk, replacing a user preset of the same name
    pub fn save_preset(&mut self, preset: TuningPreset) -> Result<PathBuf, ConfigError> {
        let dir = self.dir.clone().ok_or(ConfigError::NoConfigDir)?;
        fs::create_dir_all(&dir)?;

        let path = Self::file_for(&dir, &preset.name);
        fs::write(&path, serde_json::to_string_pretty(&preset)?)?;

        match self.user.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => *existing = preset,
            None => self.user.push(preset),
        }
        Ok(path)
    }

    /// Delete a user preset
    pub fn delete_preset(&mut self, name: &str) -> Result<(), ConfigError> {
        let dir = self.dir.clone().ok_or(ConfigError::NoConfigDir)?;
        self.user.retain(|p| p.name != name);

        let path = Self::file_for(&dir, name);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Get all presets (builtin + user)
    pub fn all_presets(&self) -> impl Iterator<Item = &TuningPreset> {
        self.builtin.iter().chain(self.user.iter())
    }

    pub fn len(&self) -> usize {
        self.builtin.len() + self.user.len()
    }

    /// Preset at a position in `all_presets` order, wrapping around
    pub fn get_wrapped(&self, index: usize) -> Option<&TuningPreset> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        self.all_presets().nth(index % len)
    }

    /// Find a preset by name
    pub fn find(&self, name: &str) -> Option<&TuningPreset> {
        self.all_presets().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Get preset names for display
    pub fn preset_names(&self) -> Vec<&str> {
        self.all_presets().map(|p| p.name.as_str()).collect()
    }
}

fn builtin_presets() -> Vec<TuningPreset> {
    vec![
        TuningPreset::new("P only", "Springy; settles just below the setpoint", 0.5, 0.0, 0.0),
        TuningPreset::new("PI", "Integral removes the steady-state offset", 0.5, 0.03, 0.0),
        TuningPreset::new("PD", "Damped approach, small offset remains", 0.8, 0.0, 1.5),
        TuningPreset::new("PID", "Balanced hover", 1.2, 0.02, 2.0),
        TuningPreset::new("Aggressive", "Fast rise with visible overshoot", 2.0, 0.05, 0.5),
        TuningPreset::new("Overdamped", "Slow creep toward the setpoint", 0.3, 0.0, 4.0),
    ]
}
