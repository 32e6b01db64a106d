//! Layered configuration loading with figment.
//!
//! Sources, lowest priority first:
//!
//! 1. [`JibberConfig::default`]
//! 2. `jibber.<profile>.<ext>` next to the chosen file, if present
//! 3. the chosen file
//! 4. `JIBBER_*` environment variables
//! 5. configs passed to [`ConfigLoader::merge`]
//!
//! Without an explicit [`ConfigLoader::file`], the first `jibber.<ext>` found
//! in the search paths is used. The search paths default to the working
//! directory and then `<user config dir>/jibber`. Which extensions count
//! depends on the enabled features: `toml-config` (default), `yaml-config`
//! and `json-config`.
//!
//! Nested keys in the environment are separated by `__`:
//!
//! - `JIBBER_LOGGING__LEVEL=debug` sets `logging.level`
//! - `JIBBER_CLIENT__NICKNAME=jibber` sets `client.nickname`
//! - `JIBBER_CLIENT__COMMANDS_MAX_MATCH=2` sets `client.commands_max_match`
//!
//! ```rust,ignore
//! use jibber_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./jibber.toml")
//!     .profile("production")
//!     .load()?;
//! ```

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config", feature = "json-config"))]
use figment::providers::Format;
#[cfg(feature = "json-config")]
use figment::providers::Json;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::JibberConfig;

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "JIBBER_PROFILE";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "JIBBER_";

const FILE_STEM: &str = "jibber";

/// Extensions looked for during the search, in order.
const SEARCHED_EXTENSIONS: &[&str] = &[
    #[cfg(feature = "toml-config")]
    "toml",
    #[cfg(feature = "yaml-config")]
    "yaml",
    #[cfg(feature = "yaml-config")]
    "yml",
    #[cfg(feature = "json-config")]
    "json",
];

/// Name of the settings overlay merged under the main file.
///
/// `dev` and `prod` are short for `development` and `production`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile(String);

impl Profile {
    pub fn new(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "dev" => Self("development".into()),
            "prod" => Self("production".into()),
            _ => Self(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// `JIBBER_PROFILE`, or `development` when unset.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|name| Self::new(&name))
            .unwrap_or_default()
    }

    /// `dir/jibber.toml` becomes `dir/jibber.<profile>.toml`.
    fn overlay_for(&self, path: &Path) -> Option<PathBuf> {
        let stem = path.file_stem().and_then(OsStr::to_str)?;
        let ext = path.extension().and_then(OsStr::to_str)?;
        Some(path.with_file_name(format!("{stem}.{}.{ext}", self.0)))
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self("development".into())
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collects configuration sources and extracts a [`JibberConfig`].
pub struct ConfigLoader {
    profile: Profile,
    file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    read_env: bool,
    overrides: Vec<JibberConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Profile from the environment, default search paths, env vars on.
    pub fn new() -> Self {
        Self {
            profile: Profile::from_env(),
            file: None,
            search_paths: Vec::new(),
            read_env: true,
            overrides: Vec::new(),
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::new(profile.as_ref());
        self
    }

    /// Adds a directory to search. Giving any replaces the defaults.
    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file; a missing file is an error.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Merges `config` over every other source. Later calls win.
    pub fn merge(mut self, config: JibberConfig) -> Self {
        self.overrides.push(config);
        self
    }

    pub fn load(self) -> ConfigResult<JibberConfig> {
        let mut figment = Figment::from(Serialized::defaults(JibberConfig::default()));

        match self.locate()? {
            Some(path) => {
                if let Some(overlay) = self.profile.overlay_for(&path).filter(|p| p.is_file()) {
                    debug!(path = %overlay.display(), profile = %self.profile, "Loading profile overlay");
                    figment = merge_file(figment, &overlay)?;
                }
                info!(path = %path.display(), "Loading configuration file");
                figment = merge_file(figment, &path)?;
            }
            None => warn!("No configuration file found, using defaults"),
        }

        if self.read_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["PROFILE"]).split("__"));
        }
        for config in self.overrides {
            figment = figment.merge(Serialized::defaults(config));
        }

        let config: JibberConfig = figment.extract()?;
        debug!(
            profile = %self.profile,
            nickname = %config.client.nickname,
            packages = config.client.packages.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// The explicit file, or the first candidate found while searching.
    fn locate(&self) -> ConfigResult<Option<PathBuf>> {
        if let Some(file) = &self.file {
            return if file.is_file() {
                Ok(Some(file.clone()))
            } else {
                Err(ConfigError::FileNotFound(file.clone()))
            };
        }

        let found = self.directories().into_iter().find_map(|dir| {
            SEARCHED_EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{FILE_STEM}.{ext}")))
                .find(|candidate| candidate.is_file())
        });
        Ok(found)
    }

    fn directories(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join(FILE_STEM)))
            .collect()
    }
}

/// Merges one file, picking the provider from its extension.
fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    let merged = match ext {
        #[cfg(feature = "toml-config")]
        "toml" => figment.merge(Toml::file(path)),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => figment.merge(Yaml::file(path)),
        #[cfg(feature = "json-config")]
        "json" => figment.merge(Json::file(path)),
        _ => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
    };
    Ok(merged)
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<JibberConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, with environment overrides.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<JibberConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jibber_framework::ClientConfig;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("jibber-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_files() {
        let config = ConfigLoader::new()
            .search_path("/nonexistent/jibber")
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level.as_str(), "info");
        assert_eq!(config.client.commentary_qsize, 2);
    }

    #[test]
    fn test_later_overrides_win() {
        let named = |nickname: &str| JibberConfig {
            client: ClientConfig {
                nickname: nickname.into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = ConfigLoader::new()
            .search_path("/nonexistent/jibber")
            .without_env()
            .merge(named("first"))
            .merge(named("second"))
            .load()
            .unwrap();

        assert_eq!(config.client.nickname, "second");
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new().file("/nonexistent/jibber.toml").load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_unknown_extension() {
        let path = scratch_dir("ext").join("jibber.ini");
        std::fs::write(&path, "nickname = bot\n").unwrap();

        let result = ConfigLoader::new().file(&path).without_env().load();
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_main_file_over_profile_overlay() {
        let dir = scratch_dir("profile");
        std::fs::write(
            dir.join("jibber.toml"),
            "[client]\nnickname = \"main\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("jibber.staging.toml"),
            "[client]\nnickname = \"overlay\"\ncommentary_qsize = 5\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .search_path(&dir)
            .profile("Staging")
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.client.nickname, "main");
        assert_eq!(config.client.commentary_qsize, 5);
    }

    #[test]
    fn test_profile_names() {
        assert_eq!(Profile::new("prod").name(), "production");
        assert_eq!(Profile::new("Dev").name(), "development");
        assert_eq!(Profile::new("staging").name(), "staging");
        assert_eq!(Profile::default(), Profile::new("development"));
    }
}
