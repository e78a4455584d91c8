//! Layered service configuration
//!
//! Precedence, lowest first: built-in defaults, the TOML file (`--config` or
//! `config/<service>.toml`), `KRUSHI_*` variables, the plain `HOST`, `PORT`,
//! `ALLOWED_ORIGINS`, `FLASK_ENV` and `FLASK_DEBUG` variables, then CLI flags.

use crate::errors::ServiceError;
use config::{Config, File as ConfigFile};
use krushi_ai_core::RecommenderKind;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Process environment snapshot; injected so loading stays testable
pub type EnvMap = HashMap<String, String>;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
    Testing,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Testing => "testing",
        }
    }
}

/// CORS origins the service answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Comma-separated list; `*` or nothing allows any origin
    pub fn parse(csv: &str) -> Self {
        let origins: Vec<String> = csv
            .split(',')
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }
}

/// Resolved settings for one service process
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub kind: RecommenderKind,
    pub host: String,
    pub port: u16,
    pub model_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub allowed_origins: AllowedOrigins,
    pub debug: bool,
    pub top_k: Option<usize>,
    pub log_level: String,
}

impl ServiceConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Values given on the command line; `None` leaves lower layers in effect
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub allowed_origins: Option<String>,
    pub debug: Option<bool>,
    pub top_k: Option<usize>,
    pub log_level: Option<String>,
}

/// Configuration manager
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ServiceConfig,
    environment: Environment,
}

impl ConfigManager {
    /// Load using the current process environment
    pub fn from_process_env(
        kind: RecommenderKind,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ServiceError> {
        let env: EnvMap = std::env::vars().collect();
        Self::load(kind, overrides, &env)
    }

    pub fn load(
        kind: RecommenderKind,
        overrides: &ConfigOverrides,
        env: &EnvMap,
    ) -> Result<Self, ServiceError> {
        let environment = Self::detect_environment(env)?;
        let config_path = Self::resolve_config_path(kind, overrides.config_path.as_deref())?;

        let mut builder = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", i64::from(kind.default_port()))?
            .set_default("model_dir", format!("models/{kind}"))?
            .set_default("allowed_origins", "*")?
            .set_default("log_level", "info")?;

        if let Some(path) = &config_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }

        let prefixed: config::Map<String, String> = env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        builder = builder.add_source(config::Environment::with_prefix("KRUSHI").source(Some(prefixed)));

        let layered = builder.build()?;

        let mut config = ServiceConfig {
            kind,
            host: get_string_value(&layered, "host").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_port(get_string_value(&layered, "port"))?.unwrap_or(kind.default_port()),
            model_dir: get_string_value(&layered, "model_dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(format!("models/{kind}"))),
            static_dir: get_string_value(&layered, "static_dir").map(PathBuf::from),
            allowed_origins: AllowedOrigins::parse(
                &get_string_value(&layered, "allowed_origins").unwrap_or_default(),
            ),
            debug: get_string_value(&layered, "debug")
                .and_then(|v| Self::parse_bool(&v))
                .unwrap_or(environment == Environment::Development),
            top_k: parse_top_k(get_string_value(&layered, "top_k"))?,
            log_level: get_string_value(&layered, "log_level").unwrap_or_else(|| "info".to_string()),
        };

        Self::apply_env_overrides(&mut config, env)?;
        Self::apply_cli_overrides(&mut config, overrides);

        Ok(Self {
            config,
            environment,
        })
    }

    pub fn get_config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn into_config(self) -> ServiceConfig {
        self.config
    }

    pub fn get_environment(&self) -> Environment {
        self.environment
    }

    fn detect_environment(env: &EnvMap) -> Result<Environment, ServiceError> {
        let env_str = env
            .get("KRUSHI_ENV")
            .or_else(|| env.get("ENVIRONMENT"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "staging" | "stage" => Ok(Environment::Staging),
            "testing" | "test" => Ok(Environment::Testing),
            "development" | "dev" => Ok(Environment::Development),
            _ => Err(ServiceError::UnknownEnvironment(env_str)),
        }
    }

    fn resolve_config_path(
        kind: RecommenderKind,
        explicit: Option<&Path>,
    ) -> Result<Option<PathBuf>, ServiceError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ServiceError::MissingConfigFile(path.display().to_string()));
            }
            return Ok(Some(path.to_path_buf()));
        }
        let default_path = PathBuf::from(format!("config/{kind}.toml"));
        Ok(default_path.exists().then_some(default_path))
    }

    fn apply_env_overrides(config: &mut ServiceConfig, env: &EnvMap) -> Result<(), ServiceError> {
        let plain = |key: &str| {
            env.get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(host) = plain("HOST") {
            config.host = host;
        }

        if let Some(port) = parse_port(plain("PORT"))? {
            config.port = port;
        }

        if let Some(origins) = env.get("ALLOWED_ORIGINS") {
            config.allowed_origins = AllowedOrigins::parse(origins);
        }

        if plain("FLASK_ENV").is_some_and(|v| v.eq_ignore_ascii_case("development")) {
            config.debug = true;
        }

        if let Some(parsed) = plain("FLASK_DEBUG").and_then(|v| Self::parse_bool(&v)) {
            config.debug = parsed;
        }

        Ok(())
    }

    fn apply_cli_overrides(config: &mut ServiceConfig, overrides: &ConfigOverrides) {
        if let Some(host) = &overrides.host {
            config.host = host.clone();
        }
        if let Some(port) = overrides.port {
            config.port = port;
        }
        if let Some(dir) = &overrides.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(dir) = &overrides.static_dir {
            config.static_dir = Some(dir.clone());
        }
        if let Some(origins) = &overrides.allowed_origins {
            config.allowed_origins = AllowedOrigins::parse(origins);
        }
        if let Some(debug) = overrides.debug {
            config.debug = debug;
        }
        if let Some(k) = overrides.top_k {
            config.top_k = Some(k);
        }
        if let Some(level) = &overrides.log_level {
            config.log_level = level.clone();
        }
    }

    pub fn parse_bool(value: &str) -> Option<bool> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("true")
            || value.eq_ignore_ascii_case("yes")
            || value.eq_ignore_ascii_case("y")
            || value == "1"
        {
            Some(true)
        } else if value.eq_ignore_ascii_case("false")
            || value.eq_ignore_ascii_case("no")
            || value.eq_ignore_ascii_case("n")
            || value == "0"
        {
            Some(false)
        } else {
            None
        }
    }
}

fn get_string_value(config: &Config, key: &str) -> Option<String> {
    config
        .get_string(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_port(raw: Option<String>) -> Result<Option<u16>, ServiceError> {
    raw.map(|value| {
        value
            .parse::<u16>()
            .map_err(|_| ServiceError::ConfigError(format!("invalid port: {value}")))
    })
    .transpose()
}

fn parse_top_k(raw: Option<String>) -> Result<Option<usize>, ServiceError> {
    raw.map(|value| match value.parse::<usize>() {
        Ok(k) if k > 0 => Ok(k),
        _ => Err(ServiceError::ConfigError(format!("invalid top_k: {value}"))),
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(kind: RecommenderKind, pairs: &[(&str, &str)]) -> ConfigManager {
        ConfigManager::load(kind, &ConfigOverrides::default(), &env(pairs)).unwrap()
    }

    #[test]
    fn defaults_follow_service_kind() {
        let manager = load(RecommenderKind::Fertilizer, &[]);
        let config = manager.get_config();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5001);
        assert_eq!(config.model_dir, PathBuf::from("models/fertilizer"));
        assert_eq!(config.allowed_origins, AllowedOrigins::Any);
        assert!(config.debug);
        assert_eq!(manager.get_environment(), Environment::Development);
    }

    #[test]
    fn production_disables_debug_by_default() {
        let config = load(RecommenderKind::Crop, &[("KRUSHI_ENV", "production")]).into_config();
        assert!(!config.debug);
        let config = load(
            RecommenderKind::Crop,
            &[("ENVIRONMENT", "prod"), ("FLASK_ENV", "development")],
        )
        .into_config();
        assert!(config.debug);
    }

    #[test]
    fn plain_variables_override_prefixed_ones() {
        let config = load(
            RecommenderKind::Crop,
            &[
                ("KRUSHI_PORT", "7000"),
                ("KRUSHI_MODEL_DIR", "/srv/models/crop"),
                ("PORT", "8000"),
                ("HOST", "127.0.0.1"),
                ("FLASK_DEBUG", "0"),
                ("ALLOWED_ORIGINS", "http://localhost:8501, http://localhost:3000"),
            ],
        )
        .into_config();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.model_dir, PathBuf::from("/srv/models/crop"));
        assert!(!config.debug);
        assert_eq!(
            config.allowed_origins,
            AllowedOrigins::List(vec![
                "http://localhost:8501".into(),
                "http://localhost:3000".into()
            ])
        );
        assert_eq!(config.listen_addr(), "127.0.0.1:8000");
    }

    #[test]
    fn config_file_sits_below_environment_and_cli() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crop.toml");
        fs::write(
            &path,
            "port = 6100\nstatic_dir = \"frontend\"\ntop_k = 5\nlog_level = \"debug\"\n",
        )
        .unwrap();

        let overrides = ConfigOverrides {
            config_path: Some(path.clone()),
            ..Default::default()
        };
        let config = ConfigManager::load(RecommenderKind::Crop, &overrides, &env(&[]))
            .unwrap()
            .into_config();
        assert_eq!(config.port, 6100);
        assert_eq!(config.static_dir, Some(PathBuf::from("frontend")));
        assert_eq!(config.top_k, Some(5));
        assert_eq!(config.log_level, "debug");

        let overrides = ConfigOverrides {
            config_path: Some(path),
            port: Some(9000),
            debug: Some(false),
            ..Default::default()
        };
        let config = ConfigManager::load(RecommenderKind::Crop, &overrides, &env(&[("PORT", "8000")]))
            .unwrap()
            .into_config();
        assert_eq!(config.port, 9000);
        assert!(!config.debug);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ConfigManager::load(
            RecommenderKind::Crop,
            &ConfigOverrides::default(),
            &env(&[("PORT", "http")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid port"));

        let missing = ConfigOverrides {
            config_path: Some(PathBuf::from("/nonexistent/krushi.toml")),
            ..Default::default()
        };
        assert!(matches!(
            ConfigManager::load(RecommenderKind::Crop, &missing, &env(&[])),
            Err(ServiceError::MissingConfigFile(_))
        ));

        assert!(matches!(
            ConfigManager::load(
                RecommenderKind::Crop,
                &ConfigOverrides::default(),
                &env(&[("KRUSHI_ENV", "moon")])
            ),
            Err(ServiceError::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn allowed_origins_wildcard() {
        assert_eq!(AllowedOrigins::parse(""), AllowedOrigins::Any);
        assert_eq!(AllowedOrigins::parse("*"), AllowedOrigins::Any);
        assert_eq!(
            AllowedOrigins::parse("https://krushi.example"),
            AllowedOrigins::List(vec!["https://krushi.example".into()])
        );
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(ConfigManager::parse_bool("Yes"), Some(true));
        assert_eq!(ConfigManager::parse_bool("0"), Some(false));
        assert_eq!(ConfigManager::parse_bool("maybe"), None);
    }
}
