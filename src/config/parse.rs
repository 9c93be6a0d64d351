use super::types::*;
use crate::config::{env_var_pattern, expand_env_vars};
use std::fs::File;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parse and validate config from a YAML string.
///
/// An empty document yields the defaults.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(yaml);

    check_unexpanded_vars(&yaml_string)?;

    let config: Config = if yaml_string.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&yaml_string)?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Override the listen port from `PORT`, used when no config file was found.
pub fn apply_port_override(config: &mut Config, port: Option<&str>) -> Result<(), ConfigError> {
    let Some(port) = port else {
        return Ok(());
    };

    let port: u16 = port
        .trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("PORT '{}' is not a valid port", port)))?;

    let host = config
        .web
        .listen
        .rsplit_once(':')
        .map(|(host, _)| host.to_string())
        .unwrap_or_else(|| "0.0.0.0".to_string());
    config.web.listen = format!("{}:{}", host, port);
    Ok(())
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<String> = env_var_pattern()
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        unexpanded_vars.join(", ")
    )))
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    let dispatcher = &config.dispatcher;
    if dispatcher.batch_size == 0 {
        errors.push("dispatcher.batch_size must be at least 1".to_string());
    }
    if dispatcher.poll_interval.is_zero() {
        errors.push("dispatcher.poll_interval must be greater than zero".to_string());
    }
    if dispatcher.error_backoff.is_zero() {
        errors.push("dispatcher.error_backoff must be greater than zero".to_string());
    }

    let work_unit = &config.work_unit;
    if work_unit.min_latency > work_unit.max_latency {
        errors.push(format!(
            "work_unit.min_latency ({:?}) exceeds work_unit.max_latency ({:?})",
            work_unit.min_latency, work_unit.max_latency
        ));
    }
    if !(0.0..=1.0).contains(&work_unit.failure_rate) {
        errors.push(format!(
            "work_unit.failure_rate must be between 0 and 1, got {}",
            work_unit.failure_rate
        ));
    }

    if config.web.listen.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "web.listen '{}' is not a valid socket address",
            config.web.listen
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
