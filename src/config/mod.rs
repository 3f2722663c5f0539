//! Application configuration

mod app_config;

pub use app_config::{
    legacy_env_defaults, AppConfig, CacheSettings, GatewaySettings, LogFormat, LoggingConfig,
    StoreSettings,
};
