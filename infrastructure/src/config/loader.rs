//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "docfiller";
const PROJECT_FILES: [&str; 2] = ["docfiller.toml", ".docfiller.toml"];
const ENV_PREFIX: &str = "DOCFILLER_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `DOCFILLER_*` environment variables (`DOCFILLER_PIPELINE__CONSENSUS=true`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./docfiller.toml` or `./.docfiller.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/docfiller/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(
            Self::global_config_path().as_deref(),
            Path::new("."),
            config_path.map(PathBuf::as_path),
        )
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// File layers only, without the environment
    fn figment(global: Option<&Path>, project_dir: &Path, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        if let Some(path) = Self::find_project_config(project_dir) {
            figment = figment.merge(Toml::file(path));
        }

        // Explicit path is the highest-priority file
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/docfiller/config.toml if set,
    /// otherwise falls back to ~/.config/docfiller/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        Self::find_project_config(Path::new("."))
    }

    fn find_project_config(dir: &Path) -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Describe the config file locations being used, in priority order
    pub fn describe_sources(explicit: Option<&PathBuf>) -> Vec<String> {
        let mut lines = Vec::new();

        if let Some(path) = explicit {
            lines.push(format!("[FOUND] Explicit: {}", path.display()));
        }

        match Self::project_config_path() {
            Some(path) => lines.push(format!("[FOUND] Project: {}", path.display())),
            None => lines.push("[     ] Project: ./docfiller.toml or ./.docfiller.toml".to_string()),
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "     " };
            lines.push(format!("[{}] Global:  {}", mark, path.display()));
        }

        lines.push("[     ] Default: built-in defaults".to_string());
        lines
    }
}
