// src/proxy/mod.rs
//! Proxy construction and dispatch
//!
//! - **Engine**: [`Proxy`] and per-call dispatch
//! - **Contract**: the [`Contract`] trait and `intercept_contract!`
//! - **Factory**: constructors with shared settings
//! - **Registry**: name-based construction for contracts known at runtime
//!
//! # Architecture
//!
//! ```text
//! Caller ─▶ Arc<dyn Trait> (Proxy) ─▶ Invocation ─▶ Interceptor ─▶ real instance
//!    ▲                                                                    │
//!    └──────────── return value / original error ◀────────────────────────┘
//! ```

pub mod contract;
pub mod engine;
pub mod factory;
pub mod registry;

// Re-export commonly used types
pub use contract::Contract;
pub use engine::{Completion, DispatchPath, Proxy};
pub use factory::ProxyFactory;
pub use registry::{ContractRegistry, ErasedInstance};
