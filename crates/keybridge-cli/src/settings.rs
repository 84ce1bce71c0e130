/*
[INPUT]:  Optional YAML configuration file, KEYBRIDGE__* environment variables
[OUTPUT]: Settings for the keybridge binary
[POS]:    Configuration layer - CLI startup
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use keybridge_core::{CoreConfig, ProviderConfig, SessionConfig};

const ENV_PREFIX: &str = "KEYBRIDGE";
const APP_DIR: &str = "keybridge";

/// Top-level configuration for the keybridge binary
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Where accounts, sessions and the token-signing key live
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub session: SessionConfig,
    /// Provider credentials; required for `link` and `contacts`
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
}

impl Settings {
    /// Layer the YAML file (if any) under `KEYBRIDGE__*` variables,
    /// e.g. `KEYBRIDGE__PROVIDER__API_ID=12345`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Self = builder
            .build()
            .context("read configuration sources")?
            .try_deserialize()
            .context("parse configuration")?;
        settings.session.validate().context("invalid session settings")?;
        Ok(settings)
    }

    pub fn core(&self) -> CoreConfig {
        CoreConfig {
            session: self.session.clone(),
            provider: self.provider.clone(),
        }
    }

    /// Command-line override, then the configured directory, then the platform data dir
    pub fn resolve_data_dir(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = cli_override.or(self.data_dir.as_deref()) {
            return Ok(dir.to_path_buf());
        }
        let base = dirs::data_dir().context("no platform data directory; pass --data-dir")?;
        Ok(base.join(APP_DIR))
    }

    /// YAML dump with the api hash masked
    pub fn to_redacted_yaml(&self) -> Result<String> {
        let mut shown = self.clone();
        if let Some(provider) = shown.provider.as_mut() {
            if !provider.api_hash.is_empty() {
                provider.api_hash = "<redacted>".to_string();
            }
        }
        serde_yaml::to_string(&shown).context("render settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("keybridge-settings-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::default();
        assert!(settings.provider.is_none());
        assert_eq!(settings.session.ttl_secs, 7 * 24 * 60 * 60);
        assert!(settings.core().provider().is_err());
    }

    #[test]
    fn test_load_yaml_file() {
        let path = write_config(
            "data_dir: /tmp/keybridge-test\nprovider:\n  api_id: 12345\n  api_hash: abcdef\n  timeout_secs: 5\n",
        );
        let settings = Settings::load(Some(&path)).unwrap();
        let provider = settings.provider.as_ref().unwrap();
        assert_eq!(provider.api_id, 12345);
        assert_eq!(provider.timeout_secs, 5);
        assert_eq!(provider.code_ttl_secs, 300);
        assert!(settings.core().provider().is_ok());
        assert_eq!(
            settings.resolve_data_dir(None).unwrap(),
            PathBuf::from("/tmp/keybridge-test")
        );
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("missing-{}.yaml", uuid::Uuid::new_v4()));
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_cli_override_wins() {
        let settings = Settings {
            data_dir: Some(PathBuf::from("/from/config")),
            ..Settings::default()
        };
        let dir = settings.resolve_data_dir(Some(Path::new("/from/cli"))).unwrap();
        assert_eq!(dir, PathBuf::from("/from/cli"));
    }

    #[test]
    fn test_redacted_yaml_hides_hash() {
        let settings = Settings {
            provider: Some(ProviderConfig::new(1, "super-secret")),
            ..Settings::default()
        };
        let yaml = settings.to_redacted_yaml().unwrap();
        assert!(!yaml.contains("super-secret"));
        assert!(yaml.contains("api_id: 1"));
    }
}
