//! Config loading and persistence.

mod error;
mod load;
mod merge;
mod schema;

pub use error::ConfigError;
pub use load::{config_path, load, load_from, load_layer, project_config_path, write_config};
pub use merge::{apply_env_overrides, merge_layers};
pub use schema::{
    CalendarConfig, CalendarConfigOverride, CommitsConfig, CommitsConfigOverride, Config,
    ConfigLayer, FileLoggingConfig, FileLoggingConfigOverride, IdentityConfig, LogFormat,
    LogRotation, LoggingConfig, LoggingConfigOverride, PublishConfig, PublishConfigOverride,
    RepositoryConfig, RepositoryConfigOverride,
};
