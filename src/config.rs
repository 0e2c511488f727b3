/// Backend settings
///
/// Read from `config.toml` in the user's config directory:
/// - Linux: ~/.config/test-case-board/config.toml
/// - macOS: ~/Library/Application Support/test-case-board/config.toml
/// - Windows: %APPDATA%\test-case-board\config.toml
///
/// Environment variables take precedence over the file.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_TABLE: &str = "test_cases";
const DEFAULT_SCHEMA: &str = "public";
const DEFAULT_EVENTS_PER_SECOND: u32 = 5;

pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_TABLE: &str = "TEST_CASE_TABLE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "missing backend credentials: set SUPABASE_URL and SUPABASE_ANON_KEY \
         or add them to config.toml"
    )]
    MissingCredentials,

    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Contents of `config.toml`; every field is optional
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub table: Option<String>,
    pub schema: Option<String>,
    pub events_per_second: Option<u32>,
}

/// Resolved settings for the Supabase backend
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Project URL, e.g. https://xyz.supabase.co
    pub url: String,
    pub anon_key: String,
    pub table: String,
    pub schema: String,
    /// Rate hint passed to the realtime server
    pub events_per_second: u32,
}

impl Settings {
    /// Load settings from the default config file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let file = match Self::config_path() {
            Some(path) if path.exists() => Some(read_file(&path)?),
            _ => None,
        };
        Self::resolve(file.unwrap_or_default(), |key| std::env::var(key).ok())
    }

    /// Merge file settings with environment overrides
    pub fn resolve(
        file: FileSettings,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |value: Option<String>| {
            value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };

        let url = non_empty(env(ENV_URL)).or_else(|| non_empty(file.url));
        let anon_key = non_empty(env(ENV_ANON_KEY)).or_else(|| non_empty(file.anon_key));
        let (Some(url), Some(anon_key)) = (url, anon_key) else {
            return Err(ConfigError::MissingCredentials);
        };

        Ok(Settings {
            url,
            anon_key,
            table: non_empty(env(ENV_TABLE))
                .or_else(|| non_empty(file.table))
                .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            schema: non_empty(file.schema).unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            events_per_second: file.events_per_second.unwrap_or(DEFAULT_EVENTS_PER_SECOND),
        })
    }

    /// Where `config.toml` is expected
    pub fn config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("test-case-board");
        path.push("config.toml");
        Some(path)
    }
}

fn read_file(path: &Path) -> Result<FileSettings, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_credentials() {
        let err = Settings::resolve(FileSettings::default(), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));

        // A blank key counts as missing
        let err = Settings::resolve(
            FileSettings::default(),
            env_of(&[(ENV_URL, "https://x.supabase.co"), (ENV_ANON_KEY, "  ")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn test_defaults_from_env_only() {
        let settings = Settings::resolve(
            FileSettings::default(),
            env_of(&[(ENV_URL, "https://x.supabase.co"), (ENV_ANON_KEY, "anon")]),
        )
        .unwrap();
        assert_eq!(settings.table, "test_cases");
        assert_eq!(settings.schema, "public");
        assert_eq!(settings.events_per_second, 5);
    }

    #[test]
    fn test_env_overrides_file() {
        let file: FileSettings = toml::from_str(
            r#"
            url = "https://file.supabase.co"
            anon_key = "file-key"
            table = "cases"
            events_per_second = 10
            "#,
        )
        .unwrap();
        let env = env_of(&[(ENV_URL, "https://env.supabase.co")]);
        let settings = Settings::resolve(file, env).unwrap();
        assert_eq!(settings.url, "https://env.supabase.co");
        assert_eq!(settings.anon_key, "file-key");
        assert_eq!(settings.table, "cases");
        assert_eq!(settings.events_per_second, 10);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "url = [").unwrap();
        assert!(matches!(read_file(&path), Err(ConfigError::Parse { .. })));
    }
}
