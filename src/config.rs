//! Runtime configuration for the panel.
//!
//! Values come from the process environment, mirroring how the model name has
//! always been picked up from `LLM_MODEL`. A project `.env` file can supply
//! the same variables, API keys included, through [`load_env_file`]. Every
//! knob has a default so an empty environment yields a working configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Model used when `LLM_MODEL` is not set.
pub const DEFAULT_LLM_MODEL: &str = "anthropic/claude-3-5-haiku-latest";

/// Upper bound on specialists consulted per request.
pub const DEFAULT_MAX_EXPERTS: usize = 3;

/// Specialists consulted when the router output cannot be parsed.
pub const DEFAULT_SPECIALISTS: &[&str] = &["simon_sinek", "julie_zhuo", "roger_martin"];

/// Per-unit generation timeout in seconds.
pub const DEFAULT_UNIT_TIMEOUT_SECS: u64 = 180;

/// Well-known name of the persisted response artifact.
pub const DEFAULT_OUTPUT_FILE: &str = "panel_response.md";

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("failed to load environment file {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Panel configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelConfig {
    /// Model string for every unit without a per-specialist override,
    /// e.g. `anthropic/claude-3-5-haiku-latest` or `gpt-4o-mini`.
    pub llm_model: String,
    /// Maximum number of specialists per request.
    pub max_experts: usize,
    /// Fallback selection for unparseable router output.
    pub default_specialists: Vec<String>,
    /// Timeout around each unit invocation. `None` disables it.
    pub unit_timeout: Option<Duration>,
    /// Where the final response is written.
    pub output_file: PathBuf,
    /// Optional replacement for the embedded specialist definitions.
    pub specialists_file: Option<PathBuf>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            max_experts: DEFAULT_MAX_EXPERTS,
            default_specialists: DEFAULT_SPECIALISTS.iter().map(|s| s.to_string()).collect(),
            unit_timeout: Some(Duration::from_secs(DEFAULT_UNIT_TIMEOUT_SECS)),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            specialists_file: None,
        }
    }
}

impl PanelConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build the configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        if let Some(model) = get("LLM_MODEL") {
            config.llm_model = model.to_string();
        }

        if let Some(raw) = get("PANEL_MAX_EXPERTS") {
            let n: usize = raw
                .parse()
                .map_err(|_| invalid("PANEL_MAX_EXPERTS", raw, "expected a positive integer"))?;
            if n == 0 {
                return Err(invalid("PANEL_MAX_EXPERTS", raw, "must be at least 1"));
            }
            config.max_experts = n;
        }

        if let Some(raw) = get("PANEL_DEFAULT_EXPERTS") {
            let ids: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if ids.is_empty() {
                return Err(invalid("PANEL_DEFAULT_EXPERTS", raw, "no specialist ids listed"));
            }
            config.default_specialists = ids;
        }

        if let Some(raw) = get("PANEL_UNIT_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| invalid("PANEL_UNIT_TIMEOUT_SECS", raw, "expected whole seconds"))?;
            config.unit_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(path) = get("PANEL_OUTPUT_FILE") {
            config.output_file = PathBuf::from(path);
        }

        if let Some(path) = get("PANEL_SPECIALISTS_FILE") {
            config.specialists_file = Some(PathBuf::from(path));
        }

        log::debug!(
            "Panel config: model={}, max_experts={}, timeout={:?}",
            config.llm_model,
            config.max_experts,
            config.unit_timeout
        );

        Ok(config)
    }
}

/// Load a `.env` file into the process environment. Variables that are
/// already set keep their values.
///
/// With `None`, the working directory and its parents are searched and a
/// missing file is not an error. Returns the file that was loaded.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path)
            .map(|()| path.to_path_buf())
            .map_err(|source| ConfigError::EnvFile {
                path: path.to_path_buf(),
                source,
            })?,
        None => match dotenvy::dotenv() {
            Ok(path) => path,
            Err(err) if err.not_found() => return Ok(None),
            Err(source) => {
                return Err(ConfigError::EnvFile {
                    path: PathBuf::from(".env"),
                    source,
                })
            }
        },
    };
    log::debug!("Loaded environment from {}", loaded.display());
    Ok(Some(loaded))
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_from_empty_env() {
        let config = PanelConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config, PanelConfig::default());
        assert_eq!(config.llm_model, "anthropic/claude-3-5-haiku-latest");
        assert_eq!(config.max_experts, 3);
        assert_eq!(
            config.default_specialists,
            vec!["simon_sinek", "julie_zhuo", "roger_martin"]
        );
        assert_eq!(config.output_file, PathBuf::from("panel_response.md"));
    }

    #[test]
    fn test_overrides() {
        let config = PanelConfig::from_vars(&vars(&[
            ("LLM_MODEL", "gpt-4o-mini"),
            ("PANEL_MAX_EXPERTS", "2"),
            ("PANEL_DEFAULT_EXPERTS", "chris_voss, satya_nadella"),
            ("PANEL_UNIT_TIMEOUT_SECS", "0"),
            ("PANEL_OUTPUT_FILE", "out/reply.md"),
        ]))
        .unwrap();
        assert_eq!(config.llm_model, "gpt-4o-mini");
        assert_eq!(config.max_experts, 2);
        assert_eq!(config.default_specialists, vec!["chris_voss", "satya_nadella"]);
        assert_eq!(config.unit_timeout, None);
        assert_eq!(config.output_file, PathBuf::from("out/reply.md"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = PanelConfig::from_vars(&vars(&[("LLM_MODEL", "   ")])).unwrap();
        assert_eq!(config.llm_model, DEFAULT_LLM_MODEL);
    }

    #[test]
    fn test_rejects_zero_experts() {
        let err = PanelConfig::from_vars(&vars(&[("PANEL_MAX_EXPERTS", "0")])).unwrap_err();
        assert!(err.to_string().contains("PANEL_MAX_EXPERTS"));
    }

    #[test]
    fn test_env_file_feeds_from_env_without_overriding() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# panel settings").unwrap();
        writeln!(file, "PANEL_OUTPUT_FILE=from-dotenv/reply.md").unwrap();
        writeln!(file, "EXPERT_PANEL_DOTENV_KEEP=from-file").unwrap();
        std::env::set_var("EXPERT_PANEL_DOTENV_KEEP", "from-process");

        let loaded = load_env_file(Some(file.path())).unwrap();
        assert_eq!(loaded.as_deref(), Some(file.path()));

        let config = PanelConfig::from_env().unwrap();
        assert_eq!(config.output_file, PathBuf::from("from-dotenv/reply.md"));
        assert_eq!(std::env::var("EXPERT_PANEL_DOTENV_KEEP").unwrap(), "from-process");
    }

    #[test]
    fn test_missing_explicit_env_file_is_an_error() {
        let err = load_env_file(Some(Path::new("/definitely/not/here.env"))).unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile { .. }));
        assert!(err.to_string().contains("/definitely/not/here.env"));
    }

    #[test]
    fn test_rejects_non_numeric_timeout() {
        assert!(PanelConfig::from_vars(&vars(&[("PANEL_UNIT_TIMEOUT_SECS", "soon")])).is_err());
    }
}
