//! # LWES Configuration
//!
//! Layered settings for emitters, listeners and logging.
//!
//! Layers, later wins:
//! 1. Built-in defaults
//! 2. `config/lwes.yaml`
//! 3. `config/<LWES_ENV>.yaml` (`LWES_ENV` defaults to `production`)
//! 4. `LWES_*` environment variables, `__` separating sections
//!    (`LWES_EMITTER__HEARTBEAT_SECS=5`)

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

mod emitter;
mod error;
mod listener;
mod telemetry;
mod validation;

pub use emitter::EmitterConfig;
pub use error::ConfigError;
pub use listener::ListenerConfig;
pub use telemetry::TelemetryConfig;
pub use validator::Validate;

const BASE_FILE: &str = "config/lwes.yaml";
const ENV_PREFIX: &str = "LWES_";

#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct LwesConfig {
    #[validate(nested)]
    #[serde(default)]
    pub emitter: EmitterConfig,

    #[validate(nested)]
    #[serde(default)]
    pub listener: ListenerConfig,

    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl LwesConfig {
    /// Loads every layer from the working directory and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_over(Self::default())
    }

    /// Like [`LwesConfig::load`], with `defaults` as the bottom layer.
    pub fn load_over(defaults: Self) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(defaults));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        } else {
            info!("{BASE_FILE} not found, using default configuration");
        }

        let env = std::env::var("LWES_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{env}.yaml");
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Loads one explicit file over the defaults, then the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_from_path_over(path, Self::default())
    }

    /// Like [`LwesConfig::load_from_path`], with `defaults` as the bottom layer.
    pub fn load_from_path_over<P: AsRef<Path>>(path: P, defaults: Self) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        Self::extract(
            Figment::from(Serialized::defaults(defaults))
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_validate() {
        let config = LwesConfig::default();
        config.validate().expect("default config should validate");
        assert_eq!(config.emitter.address, "224.2.2.22:12345");
        assert_eq!(config.listener.address, "224.2.2.22:12345");
        assert!(config.emitter.handle_interrupt);
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        Jail::expect_with(|_jail| {
            assert_eq!(LwesConfig::load().unwrap(), LwesConfig::default());
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_yaml() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/lwes.yaml",
                "emitter:\n  address: \"127.0.0.1:9191\"\n  heartbeat_secs: 10\n",
            )?;
            jail.set_env("LWES_EMITTER__HEARTBEAT_SECS", "5");

            let config = LwesConfig::load().unwrap();
            assert_eq!(config.emitter.address, "127.0.0.1:9191");
            assert_eq!(config.emitter.heartbeat_secs, 5);
            assert_eq!(config.emitter.ttl, 1);
            Ok(())
        });
    }

    #[test]
    fn caller_defaults_yield_to_files_and_environment() {
        let quiet = || {
            let mut defaults = LwesConfig::default();
            defaults.emitter.heartbeat_secs = 0;
            defaults
        };
        Jail::expect_with(|jail| {
            assert_eq!(LwesConfig::load_over(quiet()).unwrap().emitter.heartbeat_secs, 0);

            jail.create_dir("config")?;
            jail.create_file("config/lwes.yaml", "emitter:\n  heartbeat_secs: 4\n")?;
            assert_eq!(LwesConfig::load_over(quiet()).unwrap().emitter.heartbeat_secs, 4);

            jail.set_env("LWES_EMITTER__HEARTBEAT_SECS", "9");
            assert_eq!(LwesConfig::load_over(quiet()).unwrap().emitter.heartbeat_secs, 9);
            assert_eq!(
                LwesConfig::load_from_path_over("config/lwes.yaml", quiet())
                    .unwrap()
                    .emitter
                    .heartbeat_secs,
                9
            );
            Ok(())
        });
    }

    #[test]
    fn environment_file_layers_over_base() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file("config/lwes.yaml", "telemetry:\n  log_level: debug\n")?;
            jail.create_file("config/staging.yaml", "telemetry:\n  json: true\n")?;
            jail.set_env("LWES_ENV", "staging");

            let config = LwesConfig::load().unwrap();
            assert_eq!(config.telemetry.log_level, "debug");
            assert!(config.telemetry.json);
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_reported_by_field() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "bad.yaml",
                "listener:\n  address: \"tcp://host:1\"\ntelemetry:\n  log_level: loud\n",
            )?;
            let err = LwesConfig::load_from_path("bad.yaml").unwrap_err();
            let message = err.to_string();
            assert!(matches!(err, ConfigError::Validation(_)));
            assert!(message.contains("listener.address"), "{message}");
            assert!(message.contains("telemetry.log_level"), "{message}");
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        Jail::expect_with(|_jail| {
            assert!(matches!(
                LwesConfig::load_from_path("absent.yaml"),
                Err(ConfigError::FileNotFound(_))
            ));
            Ok(())
        });
    }
}
