// src/interception/interceptor.rs
//! The interceptor contract
//!
//! An interceptor is supplied once when a proxy is built and then sees every
//! call made through that proxy. It is shared by all calls, possibly from
//! several threads at once, so any state it keeps must be synchronized.

use crate::invocation::Invocation;

/// Cross-cutting policy applied to proxied calls
pub trait Interceptor: Send + Sync + 'static {
    /// Name reported when this interceptor fails
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether `intercept` should see this call at all
    ///
    /// Returning `false` makes the proxy call the real method directly.
    /// Implementations should not have side effects.
    fn can_handle(&self, _invocation: &Invocation<'_>) -> bool {
        true
    }

    /// Run around (or instead of) the real method
    ///
    /// An `Err` here means the interceptor itself broke; the proxy reports it
    /// to the caller as an interceptor failure. To make the call fail with a
    /// domain error, store it with [`Invocation::set_error`] and return
    /// `Ok(())`.
    fn intercept(&self, invocation: &mut Invocation<'_>) -> anyhow::Result<()> {
        invocation.proceed();
        Ok(())
    }
}

/// Identity interceptor: always proceeds, never alters the outcome
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Interceptor for PassThrough {}
