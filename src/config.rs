use crate::error::ConfigError;
use crate::settings::{AnimationSettings, ControllerSettings, GridSettings, PhysicsSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Complete application configuration for export/import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    /// Pathfinding grid layout
    #[serde(default)]
    pub grid: GridSettings,
    /// Hover physics constants
    #[serde(default)]
    pub physics: PhysicsSettings,
    /// Initial gains and setpoint
    #[serde(default)]
    pub controller: ControllerSettings,
    /// Frame pacing (app-level)
    #[serde(default)]
    pub animation: AnimationSettings,
}

impl AppConfig {
    /// Reject settings the engines cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.physics.validate()
    }

    /// Export config to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Import and validate config from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        info!(path = %path.display(), "config loaded");
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            grid: GridSettings::default(),
            physics: PhysicsSettings::default(),
            controller: ControllerSettings::default(),
            animation: AnimationSettings::default(),
        }
    }
}
