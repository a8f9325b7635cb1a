//! Retry settings loading and provider resolution

mod loader;
mod manager;
mod registry;

pub use loader::{
    RetrySettingsLoader, ENV_COMMAND_NUMBER_OF_TRIES, ENV_COMMAND_RETRY_METHOD,
    ENV_CONNECTION_NUMBER_OF_TRIES, ENV_CONNECTION_RETRY_METHOD,
};
pub use manager::{resolve_section, RetryLogicManager, RetrySection};
pub use registry::{RetryMethod, RetryMethodRegistry};
