//! Configuration Module
//!
//! Engine configuration loaded from environment variables.

mod settings;

pub use settings::{
    ConfigError, EngineConfig, SchedulerSettings, ServerSettings, SourceSettings,
};
