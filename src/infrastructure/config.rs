use crate::domain::{config::{HexLinkConfig, HexPreset}, error::{HexLinkError, HexLinkResult}};
use std::path::{Path, PathBuf};
use std::fs;

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> HexLinkResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Load configuration from files.
    ///
    /// Global settings come from the user file; a project file overrides
    /// them and appends its presets.
    pub fn load_config(&self) -> HexLinkResult<HexLinkConfig> {
        let mut config = HexLinkConfig::default();

        if self.global_config_path.exists() {
            config = self.load_config_from_path(&self.global_config_path)?;
        }

        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                let project_config = self.load_config_from_path(project_path)?;
                let mut presets = std::mem::take(&mut config.presets);
                presets.extend(project_config.presets.iter().cloned());
                config = HexLinkConfig {
                    presets,
                    ..project_config
                };
            }
        }

        Ok(config)
    }

    /// Get global configuration path
    fn get_global_config_path() -> HexLinkResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| HexLinkError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("hexlink").join("config.toml"))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(".hexlink").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> HexLinkResult<HexLinkConfig> {
        let content = fs::read_to_string(path).map_err(|e| HexLinkError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| HexLinkError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &HexLinkConfig) -> HexLinkResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| HexLinkError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| HexLinkError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create default project configuration
    pub fn init_project_config(&self, path: &Path) -> HexLinkResult<PathBuf> {
        let config_dir = path.join(".hexlink");
        let config_file = config_dir.join("config.toml");

        if config_file.exists() {
            return Err(HexLinkError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        fs::create_dir_all(&config_dir).map_err(|e| HexLinkError::Config {
            message: format!("Failed to create .hexlink directory: {}", e),
        })?;

        let default_config = HexLinkConfig {
            presets: vec![HexPreset {
                name: "Relay3 ON".to_string(),
                description: "Example project preset".to_string(),
                code: "A0 03 01 A4".to_string(),
            }],
            ..HexLinkConfig::default()
        };

        self.save_config_to_path(&config_file, &default_config)?;

        Ok(config_file)
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}
