use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DashgenError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "dashgen.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub grafana: GrafanaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("dist"),
            grafana: GrafanaConfig::default(),
        }
    }
}

/// Where and how generated dashboards are uploaded. Without a `url` nothing
/// is uploaded.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrafanaConfig {
    pub url: Option<String>,
    pub folder_uid: Option<String>,
    /// Prepended to uids and titles so test uploads never replace real dashboards
    pub prefix: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_token: Option<String>,
    pub session: Option<String>,
}

impl Config {
    /// Load the config file (a missing file means defaults), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.is_some();
        let config_path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(config_path).map_err(|e| {
                DashgenError::Config(format!(
                    "Failed to read config file '{}': {}",
                    config_path.display(),
                    e
                ))
            })?;
            Self::from_toml(&content)?
        } else if explicit {
            return Err(DashgenError::Config(format!(
                "Config file '{}' does not exist",
                config_path.display()
            )));
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from environment-style lookups. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(dir) = get("DASHGEN_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        let grafana = &mut self.grafana;
        let overrides: [(&str, &mut Option<String>); 7] = [
            ("GRAFANA_URL", &mut grafana.url),
            ("GRAFANA_FOLDER_UID", &mut grafana.folder_uid),
            ("DASHGEN_PREFIX", &mut grafana.prefix),
            ("GRAFANA_USERNAME", &mut grafana.username),
            ("GRAFANA_PASSWORD", &mut grafana.password),
            ("GRAFANA_API_TOKEN", &mut grafana.api_token),
            ("GRAFANA_SESSION", &mut grafana.session),
        ];
        for (key, field) in overrides {
            if let Some(value) = get(key) {
                *field = Some(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.output_dir, PathBuf::from("dist"));
        assert!(config.grafana.url.is_none());
    }

    #[test]
    fn test_parse_grafana_section() {
        let config = Config::from_toml(
            r#"
output_dir = "out"

[grafana]
url = "http://grafana:3000"
folder_uid = "generated"
prefix = "dev"
"#,
        )
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.grafana.url.as_deref(), Some("http://grafana:3000"));
        assert_eq!(config.grafana.folder_uid.as_deref(), Some("generated"));
        assert_eq!(config.grafana.prefix.as_deref(), Some("dev"));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml("[grafana]\nurl = \"http://file\"\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("GRAFANA_URL", "http://env"),
            ("GRAFANA_API_TOKEN", "token"),
            ("GRAFANA_SESSION", ""),
            ("DASHGEN_OUTPUT_DIR", "build"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.grafana.url.as_deref(), Some("http://env"));
        assert_eq!(config.grafana.api_token.as_deref(), Some("token"));
        assert!(config.grafana.session.is_none());
        assert_eq!(config.output_dir, PathBuf::from("build"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = Config::from_toml("output_dir = [").unwrap_err();
        assert!(matches!(err, DashgenError::Toml(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "output_dir = \"from-file\"").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        // DASHGEN_OUTPUT_DIR may be set in the environment running the tests
        if std::env::var("DASHGEN_OUTPUT_DIR").is_err() {
            assert_eq!(config.output_dir, PathBuf::from("from-file"));
        }
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, DashgenError::Config(_)));
    }
}
