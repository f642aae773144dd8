// src/utils/mod.rs
//! Shared configuration and error types

pub mod config;
pub mod errors;

pub use config::{ProxyConfig, ProxySettings};
pub use errors::{BoxError, ProxyError, Result};
