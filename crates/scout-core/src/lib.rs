pub mod app_config;
pub mod config;
pub mod places;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use places::{
    ApiCredentials, BusinessResult, Continuation, Coordinate, PageCursor, ProviderKind,
    SearchRequest,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
