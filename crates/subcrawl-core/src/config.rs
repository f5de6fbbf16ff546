use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_extensions_file")]
    pub extensions_file: PathBuf,
    #[serde(default = "default_languages_file")]
    pub languages_file: PathBuf,
    /// English name of the subtitle language, looked up in `languages_file`.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Enables catalog lookups against OMDb when set.
    #[serde(default)]
    pub omdb_api_key: Option<String>,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("media.db")
}

fn default_extensions_file() -> PathBuf {
    PathBuf::from("resources/file-extensions.txt")
}

fn default_languages_file() -> PathBuf {
    PathBuf::from("resources/iso-639-2.json")
}

fn default_language() -> String {
    "Albanian".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            extensions_file: default_extensions_file(),
            languages_file: default_languages_file(),
            language: default_language(),
            ignore_patterns: Vec::new(),
            omdb_api_key: None,
        }
    }
}

/// Reads `Config.toml` (optional) and `SUBCRAWL_*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("SUBCRAWL")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_uses_defaults() {
        let config = Config::builder()
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>()
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("media.db"));
        assert_eq!(config.language, "Albanian");
        assert!(config.ignore_patterns.is_empty());
        assert!(config.omdb_api_key.is_none());
    }

    #[test]
    fn test_toml_source_overrides_fields() {
        let config = Config::builder()
            .add_source(config::File::from_str(
                "database_path = \"library.db\"\nlanguage = \"English\"\nignore_patterns = [\"*/Samples\"]",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>()
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("library.db"));
        assert_eq!(config.language, "English");
        assert_eq!(config.ignore_patterns, vec!["*/Samples".to_string()]);
    }
}
