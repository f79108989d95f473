//! SFin Common - Shared configuration and logging for the SFin toolchain.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Logging setup and noise filtering

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;

pub use config::{
    CacheConfig, Config, CredentialsConfig, DataServiceConfig, NetworkConfig,
    ObservabilityConfig, UpstreamConfig,
};
pub use logging::init_logging;
