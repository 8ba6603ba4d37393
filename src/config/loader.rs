use crate::config::{ConfigurationBuilder, StaticFiles};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable replacing `api_prefix` when set.
pub const API_PREFIX_ENV: &str = "ACTIONWIRE_API_PREFIX";

/// The serializable part of a configuration.
///
/// ```toml
/// root_file = "app/main.rs"
/// api_prefix = "/api"
///
/// [[static_files]]
/// path = "/"
/// directory = ["public"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub root_file: PathBuf,
    pub api_prefix: String,
    #[serde(default)]
    pub static_files: Vec<StaticFiles>,
}

impl ConfigFile {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&source)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(prefix) = lookup(API_PREFIX_ENV) {
            tracing::debug!("{} overrides the api prefix with '{}'", API_PREFIX_ENV, prefix);
            self.api_prefix = prefix;
        }
        self
    }

    pub fn into_builder(self) -> ConfigurationBuilder {
        let builder = ConfigurationBuilder::default()
            .root_file(self.root_file)
            .api_prefix(self.api_prefix);
        self.static_files
            .into_iter()
            .fold(builder, ConfigurationBuilder::static_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SOURCE: &str = r#"
        root_file = "app/main.rs"
        api_prefix = "/api"

        [[static_files]]
        path = "/admin"
        directory = ["public", "admin"]
        subdomain = "admin"
        disable_index_router = true

        [static_files.rate_limit]
        requests_per_second = 5.0
        burst = 10

        [[static_files]]
        path = "/"
        directory = ["public"]
        index_file_name = "app.html"
    "#;

    #[test]
    fn test_parses_static_rules() {
        let file = ConfigFile::from_toml_str(SOURCE).unwrap();

        assert_eq!(file.api_prefix, "/api");
        assert_eq!(file.static_files.len(), 2);

        let admin = &file.static_files[0];
        assert_eq!(admin.directory, vec!["public", "admin"]);
        assert_eq!(admin.subdomain.as_deref(), Some("admin"));
        assert!(admin.disable_index_router);
        assert_eq!(admin.rate_limit.unwrap().burst, 10);
        assert!(admin.options.append_index_html_on_directories);

        assert_eq!(file.static_files[1].index_file(), "app.html");
    }

    #[test]
    fn test_missing_prefix_is_a_parse_error() {
        let result = ConfigFile::from_toml_str(r#"root_file = "main.rs""#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_override_replaces_prefix() {
        let file = ConfigFile::from_toml_str(SOURCE)
            .unwrap()
            .with_overrides(|key| (key == API_PREFIX_ENV).then(|| "/v2".to_string()));
        assert_eq!(file.api_prefix, "/v2");
    }

    #[test]
    fn test_load_and_build() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SOURCE.as_bytes()).unwrap();

        let configuration = ConfigFile::load(file.path())
            .unwrap()
            .into_builder()
            .build()
            .unwrap();

        assert_eq!(configuration.api_prefix(), "/api");
        assert_eq!(configuration.root(), Path::new("app"));
        assert_eq!(configuration.extension(), Some("rs"));
        assert_eq!(configuration.static_files().len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ConfigFile::load("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
