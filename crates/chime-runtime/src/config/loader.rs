//! Configuration loader using figment.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. Built-in defaults, then any config passed to [`ConfigLoader::merge`]
//! 2. Main config file (`chime.toml` / `chime.yaml`)
//! 3. Profile-specific config file (`chime.{profile}.toml` / `chime.{profile}.yaml`)
//! 4. Environment variables (`CHIME_*`)
//! 5. Keys set with [`ConfigLoader::set`]
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML files (`chime.toml`, `config.toml`)
//! - `yaml-config`: enables YAML files (`chime.yaml`, `chime.yml`)
//!
//! # Environment Variable Mapping
//!
//! Variables use the `CHIME_` prefix with `__` as the nesting separator:
//!
//! - `CHIME_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `CHIME_DISPATCHER__PREFIXES='["!", "?"]'` → `dispatcher.prefixes = ["!", "?"]`
//! - `CHIME_COOLDOWN__SWEEP_INTERVAL_SECS=0` → sweeping disabled
//!
//! # Example
//!
//! ```rust,ignore
//! use chime_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/chime.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::ChimeConfig;
use super::validation::validate_config;

/// Environment variable naming the active profile.
pub const PROFILE_ENV: &str = "CHIME_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Reads [`PROFILE_ENV`], defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }

    fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    base: Figment,
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            base: Figment::new(),
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to search for config files.
    ///
    /// Without any, the current directory and `<user config dir>/chime` are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads this file instead of searching; it must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Uses `config` in place of the built-in defaults.
    pub fn merge(mut self, config: ChimeConfig) -> Self {
        self.base = self.base.merge(Serialized::defaults(config));
        self
    }

    /// Overrides a single dotted key after every other source.
    ///
    /// ```rust,ignore
    /// ConfigLoader::new().set("logging.level", "debug").load()?;
    /// ```
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<ChimeConfig> {
        let profile = self.profile.clone();
        let config: ChimeConfig = self.build_figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            prefixes = ?config.dispatcher.prefixes,
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(ChimeConfig::default()))
            .merge(std::mem::take(&mut self.base));

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with CHIME_ prefix");
            figment = figment.merge(Env::prefixed("CHIME_").split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    /// Merges a single config file, dispatching on its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("chime"));
        }
        paths
    }

    /// Finds the first base file among `search_paths × base_names`, merges it,
    /// then merges its profile-specific sibling if present.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let base_path = search_path.join(base_name);
                if !base_path.exists() {
                    continue;
                }
                info!(path = %base_path.display(), "Loading configuration file");
                figment = merge_fn(figment, &base_path);

                if let Some((stem, ext)) = base_name.rsplit_once('.') {
                    let profile_path =
                        search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                    if profile_path.exists() {
                        debug!(path = %profile_path.display(), "Loading profile-specific config");
                        figment = merge_fn(figment, &profile_path);
                    }
                }
                return (figment, true);
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["chime.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["chime.yaml", "chime.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<ChimeConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from one file plus environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<ChimeConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogLevel, LogOutput};
    use figment::Jail;

    fn load_in(jail: &Jail, loader: ConfigLoader) -> figment::error::Result<ChimeConfig> {
        loader
            .search_path(jail.directory())
            .load()
            .map_err(|e| e.to_string().into())
    }

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = load_in(jail, ConfigLoader::new().without_env())?;
            assert_eq!(config, ChimeConfig::default());
            assert_eq!(config.logging.level.as_str(), "info");
            assert_eq!(config.dispatcher.prefixes, ["!"]);
            Ok(())
        });
    }

    #[test]
    fn test_file_then_profile_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "chime.toml",
                r#"
                [logging]
                level = "debug"

                [dispatcher]
                prefixes = ["!", "?"]

                [cooldown]
                sweep_interval_secs = 60
                "#,
            )?;
            jail.create_file(
                "chime.production.toml",
                r#"
                [logging]
                level = "warn"
                "#,
            )?;
            jail.set_env("CHIME_COOLDOWN__SWEEP_INTERVAL_SECS", 0);

            let config = load_in(jail, ConfigLoader::new().profile("prod"))?;
            assert_eq!(config.logging.level, LogLevel::Warn);
            assert_eq!(config.dispatcher.prefixes, ["!", "?"]);
            assert!(config.dispatcher.ignore_bots);
            assert_eq!(config.cooldown.sweep_interval(), None);

            let config = load_in(jail, ConfigLoader::new().profile("dev"))?;
            assert_eq!(config.logging.level, LogLevel::Debug);
            Ok(())
        });
    }

    #[test]
    fn test_set_overrides_env() {
        Jail::expect_with(|jail| {
            jail.set_env("CHIME_LOGGING__LEVEL", "trace");
            let config = load_in(jail, ConfigLoader::new().set("logging.level", "error"))?;
            assert_eq!(config.logging.level, LogLevel::Error);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_config_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("chime.toml", "[logging]\noutput = \"file\"\n")?;
            let result = ConfigLoader::new()
                .without_env()
                .search_path(jail.directory())
                .load();
            assert!(matches!(result, Err(ConfigError::ValidationError { .. })));

            jail.create_file(
                "chime.toml",
                "[logging]\noutput = \"file\"\nfile_path = \"chime.log\"\n",
            )?;
            let config = load_in(jail, ConfigLoader::new().without_env())?;
            assert_eq!(config.logging.output, LogOutput::File);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new().file("does/not/exist.toml").load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_profile_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env(PROFILE_ENV, "production");
            assert_eq!(Profile::from_env(), Profile::Production);
            jail.set_env(PROFILE_ENV, "Staging");
            assert_eq!(Profile::from_env(), Profile::Custom("staging".into()));
            Ok(())
        });
    }
}
