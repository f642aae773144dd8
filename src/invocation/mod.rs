// src/invocation/mod.rs
//! Call capture
//!
//! - **Method**: static descriptors of contracts, members and parameters
//! - **Arguments**: ordered, name- and index-addressable argument values
//! - **Record**: the per-call [`Invocation`] handed to interceptors
//!
//! ```text
//! caller ─ args ─▶ Arguments::bind ─▶ Invocation ─ proceed() ─▶ real method
//!                                         ▲                         │
//!                                         └── return value / error ─┘
//! ```

pub mod arguments;
pub mod method;
pub mod record;

// Re-export commonly used types
pub use arguments::{ArgCursor, ArgValue, Argument, Arguments};
pub use method::{ContractInfo, MethodInfo, ParamInfo, ReturnShape};
pub use record::{CallResult, Forward, Invocation};
