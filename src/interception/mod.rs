// src/interception/mod.rs
//! Interceptor extension point
//!
//! - **Interceptor**: the policy trait (`can_handle` / `intercept`)
//! - **PassThrough**: identity interceptor
//! - **Adapters**: closure-backed interceptors and member filters
//!
//! # Flow
//!
//! ```text
//! Proxy ─▶ can_handle? ── no ──▶ proceed() ─────────────┐
//!              │                                         ▼
//!             yes ─▶ intercept() ─▶ [proceed()] ─▶ return value / error
//! ```

pub mod adapters;
pub mod interceptor;

// Re-export commonly used types
pub use adapters::{from_fn, Filtered, FnInterceptor};
pub use interceptor::{Interceptor, PassThrough};
