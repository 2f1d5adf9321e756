//! Bridge configuration
//!
//! Loaded from a TOML file (named by `JEVRESP_CONFIG`) or defaults. The
//! runtime section drives classpath assembly and JVM options; the logging
//! section feeds `logging::LogConfig`.

use crate::logging::{parse_level, LogConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Environment variable naming an optional configuration file
pub const CONFIG_ENV_VAR: &str = "JEVRESP_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Variable whose value is prepended to `CLASSPATH`
    #[serde(default = "default_classpath_var")]
    pub classpath_var: String,

    /// Variable forwarded to the runtime as a system property
    #[serde(default = "default_passthrough_var")]
    pub passthrough_var: String,

    /// Upper bound (bytes) of the assembled class-path option
    #[serde(default = "default_max_classpath_len")]
    pub max_classpath_len: usize,

    /// Additional runtime option strings, passed verbatim
    #[serde(default)]
    pub extra_options: Vec<String>,

    #[serde(default = "default_true")]
    pub ignore_unrecognized: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub json: bool,

    #[serde(default)]
    pub file: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            classpath_var: default_classpath_var(),
            passthrough_var: default_passthrough_var(),
            max_classpath_len: default_max_classpath_len(),
            extra_options: Vec::new(),
            ignore_unrecognized: true,
        }
    }
}

fn default_classpath_var() -> String {
    "JEVRESP_CLASSPATH".to_string()
}

fn default_passthrough_var() -> String {
    "SEEDRESP".to_string()
}

fn default_max_classpath_len() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

impl BridgeConfig {
    /// Load from the file named by `JEVRESP_CONFIG`, or defaults
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.max_classpath_len == 0 {
            return Err(ConfigError::Invalid("runtime.max_classpath_len must be positive".into()));
        }
        if let Some(level) = &self.logging.level {
            if parse_level(level).is_none() {
                return Err(ConfigError::Invalid(format!("unknown log level '{}'", level)));
            }
        }
        Ok(())
    }

    /// Logging configuration: file settings first, environment on top
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::default();
        if let Some(level) = self.logging.level.as_deref().and_then(parse_level) {
            config.level = level;
        }
        config.json_format = self.logging.json;
        config.log_path = self.logging.file.clone();

        let env = LogConfig::from_env();
        if std::env::var("JEVRESP_LOG_LEVEL").is_ok() {
            config.level = env.level;
        }
        if env.log_path.is_some() {
            config.log_path = env.log_path;
        }
        config.json_format |= env.json_format;
        config
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "Failed to read config: {}", msg),
            Self::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
            Self::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.runtime.classpath_var, "JEVRESP_CLASSPATH");
        assert_eq!(config.runtime.passthrough_var, "SEEDRESP");
        assert_eq!(config.runtime.max_classpath_len, 1024);
        assert!(config.runtime.ignore_unrecognized);
    }

    #[test]
    fn test_partial_toml() {
        let config = BridgeConfig::from_toml_str(
            r#"
            [runtime]
            classpath_var = "MY_CP"
            extra_options = ["-Xmx256m"]

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.runtime.classpath_var, "MY_CP");
        assert_eq!(config.runtime.passthrough_var, "SEEDRESP");
        assert_eq!(config.runtime.extra_options, vec!["-Xmx256m".to_string()]);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_invalid_values() {
        let err = BridgeConfig::from_toml_str("[runtime]\nmax_classpath_len = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = BridgeConfig::from_toml_str("[logging]\nlevel = \"loud\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = BridgeConfig::from_toml_str("runtime = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runtime]\npassthrough_var = \"RESPDIR\"").unwrap();

        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.runtime.passthrough_var, "RESPDIR");

        let missing = BridgeConfig::from_file("/nonexistent/jevresp.toml");
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
