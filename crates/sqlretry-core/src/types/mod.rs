//! Type definitions for retry options and settings

mod retry_options;
mod retry_settings;

pub use retry_options::*;
pub use retry_settings::*;
