use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::error::ConfigError;
use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("CORPUS_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.config_path()
            .parent()
            .map(|dir| dir.join("secrets.yaml"))
            .unwrap_or_else(|| self.paths.user_data_dir.join("secrets.yaml"))
    }

    /// Loads `.env`, the YAML files and environment overrides, then validates.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = load_from_files(&self.config_path(), &self.secrets_path())?;
        apply_env_overrides(&mut config, |key| env::var(key).ok());
        validate_config(&config)?;
        Ok(config)
    }
}

pub fn load_from_files(config_path: &Path, secrets_path: &Path) -> Result<AppConfig, ConfigError> {
    let public_config = load_yaml_file(config_path)?;
    let secrets_config = load_yaml_file(secrets_path)?;
    let merged = deep_merge(&public_config, &secrets_config);
    serde_json::from_value(merged).map_err(ConfigError::Shape)
}

/// Environment always wins over file values.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup("GOOGLE_API_KEY").filter(|v| !v.trim().is_empty()) {
        config.gemini.api_key = Some(key);
    }
    if let Some(host) = lookup("HOST").filter(|v| !v.trim().is_empty()) {
        config.server.host = host;
    }
    if let Some(port) = lookup("PORT").and_then(|v| v.parse::<u16>().ok()) {
        config.server.port = port;
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let value = serde_yaml::from_str::<Value>(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ConfigError::invalid("root", "expected a mapping")),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}
