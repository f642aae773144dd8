// src/lib.rs
//! Dynproxy
//!
//! Transparent interception of calls made through trait objects. A proxy
//! implements the same trait as a real instance and routes each call
//! through a pluggable [`Interceptor`], which may observe, rewrite or
//! replace it.
//!
//! # Architecture
//!
//! The crate is structured into several key modules:
//!
//! - **invocation**: per-call record, arguments and member descriptors
//! - **interception**: the interceptor contract and adapters
//! - **proxy**: proxy engine, forwarding generator, factory and registry
//! - **observability**: tracing and metrics setup
//! - **utils**: configuration and errors

// Public module exports
pub mod interception;
pub mod invocation;
pub mod observability;
pub mod proxy;
pub mod utils;

// Re-export commonly used types
pub use interception::{from_fn, Filtered, FnInterceptor, Interceptor, PassThrough};
pub use invocation::{
    ArgCursor, ArgValue, Argument, Arguments, CallResult, ContractInfo, Invocation, MethodInfo,
    ParamInfo, ReturnShape,
};
pub use proxy::{Completion, Contract, ContractRegistry, DispatchPath, Proxy, ProxyFactory};
pub use utils::config::{ProxyConfig, ProxySettings};
pub use utils::errors::{BoxError, ProxyError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
