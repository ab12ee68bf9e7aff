//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/copyforge/config.toml)
//! 3. Project config (.copyforge/config.toml)
//! 4. Environment variables (COPYFORGE_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{CopyError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_layers(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Resolve the chain from explicit file locations
    pub fn load_layers(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // COPYFORGE_AI__TEXT_MODEL -> ai.text_model
        figment = figment.merge(Env::prefixed("COPYFORGE_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| CopyError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| CopyError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/copyforge/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("copyforge"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    pub fn project_dir() -> PathBuf {
        PathBuf::from(".copyforge")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| CopyError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            CopyError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_config(&global_dir, Self::default_global_config(), force)
    }

    /// Initialize project configuration in the current directory
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::write_config(&Self::project_dir(), Self::default_project_config(), force)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn write_config(dir: &Path, contents: &str, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, contents)?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    fn default_global_config() -> &'static str {
        r#"# CopyForge Global Configuration
# User-wide defaults. Project settings in .copyforge/config.toml override these.
# The API key is read from $API_KEY (or $GEMINI_API_KEY); avoid storing it here.

version = "1.0"

[ai]
provider = "gemini"
text_model = "gemini-3-flash-preview"
image_model = "gemini-2.5-flash-image"
video_model = "veo-3.1-fast-generate-preview"
sanitizer_model = "gemini-2.5-flash-lite"
timeout_secs = 120

[retry]
max_attempts = 4
base_delay_ms = 1000
max_delay_secs = 30

# "sequential" keeps image batches under tight per-minute quotas
[batch]
mode = "sequential"
pause_ms = 1000
max_in_flight = 5
"#
    }

    fn default_project_config() -> &'static str {
        r#"# CopyForge Project Configuration
# Project-specific settings that override global defaults.

version = "1.0"

[sanitizer]
enabled = true
min_chars = 3

[video]
resolution = "720p"
aspect_ratio = "16:9"

[output]
dir = "copyforge-output"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchMode;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_files_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_layers(None, &temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.retry.max_attempts, 4);
    }

    #[test]
    fn test_project_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("project.toml");
        fs::write(&global, "[batch]\nmode = \"concurrent\"\n[retry]\nmax_attempts = 2\n").unwrap();
        fs::write(&project, "[retry]\nmax_attempts = 6\n").unwrap();

        let config = ConfigLoader::load_layers(Some(&global), &project).unwrap();
        assert_eq!(config.batch.mode, BatchMode::Concurrent);
        assert_eq!(config.retry.max_attempts, 6);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[retry]\nmax_attempts = 0\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(CopyError::Config(_))
        ));
    }

    #[test]
    fn test_default_templates_parse() {
        let temp_dir = TempDir::new().unwrap();
        let global = ConfigLoader::write_config(
            &temp_dir.path().join("global"),
            ConfigLoader::default_global_config(),
            false,
        )
        .unwrap();
        let project = ConfigLoader::write_config(
            &temp_dir.path().join("project"),
            ConfigLoader::default_project_config(),
            false,
        )
        .unwrap();

        assert!(ConfigLoader::load_from_file(&global).is_ok());
        assert!(ConfigLoader::load_from_file(&project).is_ok());
    }

    #[test]
    fn test_write_config_respects_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::write_config(temp_dir.path(), "version = \"1.0\"\n", false).unwrap();
        ConfigLoader::write_config(temp_dir.path(), "version = \"2.0\"\n", false).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("1.0"));

        ConfigLoader::write_config(temp_dir.path(), "version = \"2.0\"\n", true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("2.0"));
    }

    #[test]
    fn test_env_override() {
        let temp_dir = TempDir::new().unwrap();
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("COPYFORGE_AI__TEXT_MODEL", "test-model");
        }
        let config = ConfigLoader::load_layers(None, &temp_dir.path().join("none.toml")).unwrap();
        assert_eq!(config.ai.text_model, "test-model");
        unsafe {
            std::env::remove_var("COPYFORGE_AI__TEXT_MODEL");
        }
    }
}
