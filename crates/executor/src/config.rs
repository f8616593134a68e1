use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use super::error::Error;
use common::numeric_kernel::NumericPolicy;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QueryConfig {
    /// Base currency of a quotes file.
    pub base: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            base: "USD".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub engine: NumericPolicy,
    pub query: QueryConfig,
}

/// Loads configuration from a file and environment variables.
///
/// An explicit `path` must exist. Without one, `crates/executor/Config.toml`
/// under the current directory is used when present. Variables such as
/// `FXARB_ENGINE__GAIN_TOLERANCE` override file values.
pub fn load_config(path: Option<&Path>) -> Result<Config, Error> {
    let (config_file_path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (default_config_path()?, false),
    };

    if required && !config_file_path.exists() {
        return Err(Error::ConfigLoadError(format!(
            "Configuration file not found at {}",
            config_file_path.display()
        )));
    }

    let s = ConfigLoader::builder()
        .add_source(File::from(config_file_path.as_path()).required(required))
        .add_source(
            Environment::with_prefix("FXARB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| Error::ConfigLoadError(e.to_string()))?;

    let app_config: Config = s
        .try_deserialize()
        .map_err(|e| Error::ConfigLoadError(format!("Failed to deserialize config: {}", e)))?;

    app_config.engine.validate()?;

    Ok(app_config)
}

fn default_config_path() -> Result<PathBuf, Error> {
    let base_path = env::current_dir().map_err(|e| {
        Error::ConfigLoadError(format!("Failed to determine current directory: {}", e))
    })?;

    Ok(base_path
        .join("crates")
        .join("executor")
        .join("Config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write config");
        file
    }

    #[test]
    fn reads_engine_and_query_sections() {
        let file = write_config(
            "[engine]\nweight_quantum = 1e-10\ngain_tolerance = 1e-4\n\n[query]\nbase = \"EUR\"\n",
        );

        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(config.engine.weight_quantum, 1e-10);
        assert_eq!(config.engine.gain_tolerance, 1e-4);
        assert_eq!(config.query.base, "EUR");
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let file = write_config("[engine]\ngain_tolerance = 1e-3\n");

        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(
            config.engine.weight_quantum,
            NumericPolicy::default().weight_quantum
        );
        assert_eq!(config.engine.gain_tolerance, 1e-3);
        assert_eq!(config.query.base, "USD");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = load_config(Some(Path::new("no_such_config.toml")));
        assert!(matches!(result, Err(Error::ConfigLoadError(_))));
    }

    #[test]
    fn degenerate_policy_is_rejected() {
        let file = write_config("[engine]\nweight_quantum = 0.0\n");

        let result = load_config(Some(file.path()));
        assert!(matches!(result, Err(Error::GraphError(_))));
    }
}
