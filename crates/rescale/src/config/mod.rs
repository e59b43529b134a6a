//! Configuration and profile management
//!
// Allow nested config module - this is intentional for the config subsystem
#![allow(clippy::module_inception)]
//!
//! # Features
//!
//! - Multiple named profiles, `default` when none is given
//! - `RESCALE_API_KEY` / `RESCALE_API_URL` environment overrides
//! - Environment variable expansion in the config file
//! - Per-profile retry, pagination and polling settings

pub mod config;
pub mod error;
pub mod settings;

pub use config::{
    API_KEY_ENV, API_URL_ENV, Config, Credentials, DEFAULT_API_URL, DEFAULT_PROFILE, Profile,
};
pub use error::{ConfigError, Result};
pub use settings::{ClientSettings, PollConfig, RetryConfig};
