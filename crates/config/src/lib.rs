//! Configuration loading and validation.
//!
//! Settings are merged from, in increasing order of precedence:
//!
//! 1. built-in defaults,
//! 2. `wisp.toml`, `wisp.yaml` and `wisp.json` in the user configuration
//!    directory,
//! 3. a configuration file given explicitly (on the command line),
//! 4. `WISP_` environment variables, with `__` separating nested keys
//!    (`WISP_HISTORY__BUDGET=1048576`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of configuration files (without extension) and of the application
/// directories.
pub const APPLICATION: &str = "wisp";
/// Prefix of environment variables that override configuration files.
pub const ENV_PREFIX: &str = "WISP_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Where the history is stored. Defaults to the platform data directory.
    pub directory: Option<PathBuf>,
    /// Name of the storage slot holding the history.
    pub slot: String,
    /// Maximum total size of remembered workflows, in bytes.
    pub budget: u64,
}
impl Default for HistoryConfig {
    fn default() -> Self {
        Self { directory: None, slot: wisp_history::DEFAULT_SLOT.to_string(), budget: wisp_history::DEFAULT_BUDGET }
    }
}
impl HistoryConfig {
    /// The configured history directory, or the platform data directory.
    pub fn directory(&self) -> Result<PathBuf> {
        match &self.directory {
            Some(directory) => Ok(directory.clone()),
            None => project_dirs().map(|dirs| dirs.data_dir().to_path_buf()).ok_or_raise(|| ErrorKind::NoDataDirectory),
        }
    }
}

impl Config {
    /// Load configuration from the user configuration directory, `explicit`
    /// (if given) and the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let dirs = project_dirs();
        Self::load_from(dirs.as_ref().map(ProjectDirs::config_dir), explicit)
    }

    /// Same as [`load`](Self::load), but looking for configuration files in
    /// `config_dir` instead of the user configuration directory.
    pub fn load_from(config_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dir) = config_dir {
            debug!(directory = %dir.display(), "looking for configuration files");
            figment = figment
                .merge(Toml::file(dir.join(format!("{APPLICATION}.toml"))))
                .merge(Yaml::file(dir.join(format!("{APPLICATION}.yaml"))))
                .merge(Json::file(dir.join(format!("{APPLICATION}.json"))));
        }
        if let Some(path) = explicit {
            figment = merge_file(figment, path)?;
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment.extract().or_raise(|| ErrorKind::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history.slot.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidValue { key: "history.slot", reason: "must not be empty" });
        }
        if self.history.budget == 0 {
            exn::bail!(ErrorKind::InvalidValue { key: "history.budget", reason: "must be greater than zero" });
        }
        if let Some(directory) = &self.history.directory
            && !directory.is_absolute()
        {
            exn::bail!(ErrorKind::InvalidValue { key: "history.directory", reason: "must be an absolute path" });
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
    }
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    debug!(path = %path.display(), "loading configuration file");
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn defaults() {
        Jail::expect_with(|jail| {
            let config = Config::load_from(Some(jail.directory()), None).unwrap();
            assert_eq!(config, Config::default());
            assert_eq!(config.history.slot, "comfyuiMermaidHistory");
            assert_eq!(config.history.budget, 10 * 1024 * 1024);
            Ok(())
        });
    }

    #[test]
    fn files_then_environment() {
        Jail::expect_with(|jail| {
            jail.create_file("wisp.toml", "[history]\nslot = \"from-toml\"\nbudget = 1024\n")?;
            jail.create_file("wisp.json", r#"{"history": {"budget": 2048}}"#)?;
            let config = Config::load_from(Some(jail.directory()), None).unwrap();
            assert_eq!(config.history.slot, "from-toml");
            assert_eq!(config.history.budget, 2048);

            jail.set_env("WISP_HISTORY__SLOT", "from-env");
            jail.set_env("WISP_HISTORY__DIRECTORY", "/var/lib/wisp");
            let config = Config::load_from(Some(jail.directory()), None).unwrap();
            assert_eq!(config.history.slot, "from-env");
            assert_eq!(config.history.budget, 2048);
            assert_eq!(config.history.directory().unwrap(), PathBuf::from("/var/lib/wisp"));
            Ok(())
        });
    }

    #[test]
    fn explicit_file_overrides_config_dir() {
        Jail::expect_with(|jail| {
            jail.create_file("wisp.yaml", "history:\n  slot: from-dir\n  budget: 10\n")?;
            jail.create_file("custom.yml", "history:\n  slot: explicit\n")?;
            let explicit = jail.directory().join("custom.yml");
            let config = Config::load_from(Some(jail.directory()), Some(&explicit)).unwrap();
            assert_eq!(config.history.slot, "explicit");
            assert_eq!(config.history.budget, 10);
            Ok(())
        });
    }

    #[test]
    fn explicit_file_must_exist() {
        Jail::expect_with(|jail| {
            let missing = jail.directory().join("missing.toml");
            let err = Config::load_from(None, Some(&missing)).unwrap_err();
            assert_eq!(*err, ErrorKind::NotFound(missing));
            Ok(())
        });
    }

    #[test]
    fn explicit_file_must_have_known_extension() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("wisp.ini");
        std::fs::write(&path, "slot=x").unwrap();
        let err = Config::load_from(None, Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFormat(path));
    }

    #[test]
    fn malformed_values() {
        Jail::expect_with(|jail| {
            jail.create_file("wisp.toml", "[history]\nbudget = \"lots\"\n")?;
            let err = Config::load_from(Some(jail.directory()), None).unwrap_err();
            assert_eq!(*err, ErrorKind::Malformed);
            Ok(())
        });
    }

    #[rstest]
    #[case::empty_slot("[history]\nslot = \"  \"\n", "history.slot")]
    #[case::zero_budget("[history]\nbudget = 0\n", "history.budget")]
    #[case::relative_directory("[history]\ndirectory = \"relative/dir\"\n", "history.directory")]
    fn invalid_values(#[case] contents: &str, #[case] expected_key: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("wisp.toml", contents)?;
            let err = Config::load_from(Some(jail.directory()), None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::InvalidValue { key, .. } if *key == expected_key));
            Ok(())
        });
    }
}
