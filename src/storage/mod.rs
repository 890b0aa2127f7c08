//! Storage for configuration and credentials.

pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{
    Config, ConfigSource, ConfigSources, ENV_BASE_URL, ENV_CONFIG, ENV_CREDENTIALS, ENV_LOCALE,
    ENV_TIMEOUT, ResolvedConfig,
};
pub use credentials::FileCredentialStore;
pub use paths::AppPaths;
