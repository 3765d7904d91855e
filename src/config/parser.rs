use super::Config;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAMES: [&str; 2] = ["itenv.yaml", "itenv.yml"];

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Find a config file starting from the current directory.
    ///
    /// Unlike an explicit `--config`, a missing file is not an error: the
    /// built-in defaults apply.
    pub fn find_config_file(&self) -> Result<Option<PathBuf>> {
        let current_dir = std::env::current_dir()?;
        Ok(Self::find_config_in_dir(&current_dir))
    }

    pub fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        // Try parent directory
        dir.parent().and_then(Self::find_config_in_dir)
    }

    /// Load config from file path
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<Config> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        self.parse_config(&content)
    }

    /// Parse config from YAML string
    pub fn parse_config(&self, content: &str) -> Result<Config> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }

        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| Error::Parse(format!("Failed to parse YAML config: {}", e)))?;

        config.settings.validate()?;
        Ok(config)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_simple_config() {
        let yaml = r#"
prefix: myapp_test
stop_timeout: 15s
default_services: [postgres, cache]
ports:
  postgres: 15432
services:
  cache:
    image: cache:7
    port: { container: "6379", host: 6379 }
    connection_template: "cache://localhost:{port}"
"#;
        let config = Parser::new().parse_config(yaml).unwrap();
        assert_eq!(config.settings.prefix, "myapp_test");
        assert_eq!(config.settings.stop_timeout, Duration::from_secs(15));
        assert_eq!(config.settings.default_services, vec!["postgres", "cache"]);
        assert_eq!(config.settings.ports.get("postgres"), Some(&15432));
        assert!(config.services.contains_key("cache"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Parser::new().parse_config("  \n").unwrap();
        assert_eq!(config.settings.prefix, "itest");
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = Parser::new().parse_config("prefix: [unclosed").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let err = Parser::new()
            .parse_config("max_parallel_starts: 0\n")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_find_config_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("itenv.yml"), "prefix: walk\n").unwrap();

        let found = Parser::find_config_in_dir(&nested).unwrap();
        assert_eq!(found, dir.path().join("itenv.yml"));

        let config = Parser::new().load_config(&found).unwrap();
        assert_eq!(config.settings.prefix, "walk");
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Parser::new()
            .load_config(dir.path().join("nope.yaml"))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
