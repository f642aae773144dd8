// src/invocation/record.rs
//! Per-call invocation record
//!
//! An [`Invocation`] is created for every proxied call and dropped once the
//! outcome has been handed back to the caller. It never outlives the call.

use crate::invocation::arguments::{ArgValue, Arguments};
use crate::invocation::method::{MethodInfo, ReturnShape};
use crate::utils::errors::{BoxError, ProxyError, Result};
use std::any::{Any, TypeId};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::trace;

/// Outcome of forwarding to the real method
///
/// `Ok(None)` is a completed unit member.
pub type CallResult = std::result::Result<Option<Box<dyn Any + Send>>, BoxError>;

/// Erased call into the real method with the current arguments
pub type Forward<'a> = dyn Fn(&Arguments) -> CallResult + 'a;

/// One in-flight call
pub struct Invocation<'a> {
    method: &'static MethodInfo,
    target: &'a (dyn Any + Send + Sync),
    arguments: Arguments,
    error: Option<BoxError>,
    return_value: Option<Box<dyn Any + Send>>,
    elapsed: Option<Duration>,
    proceed_count: u32,
    forwarding: bool,
    forward: &'a Forward<'a>,
}

impl<'a> Invocation<'a> {
    /// Capture a call
    ///
    /// `values` must match the declared parameters of `method` in count and
    /// type.
    pub fn new(
        method: &'static MethodInfo,
        target: &'a (dyn Any + Send + Sync),
        values: Vec<Box<dyn ArgValue>>,
        forward: &'a Forward<'a>,
    ) -> Result<Self> {
        let arguments = Arguments::bind(method, values)?;

        Ok(Self {
            method,
            target,
            arguments,
            error: None,
            return_value: None,
            elapsed: None,
            proceed_count: 0,
            forwarding: false,
            forward,
        })
    }

    pub fn method(&self) -> &'static MethodInfo {
        self.method
    }

    /// The instance the call will run against (the proxy's `Arc<dyn Trait>`)
    pub fn target(&self) -> &'a (dyn Any + Send + Sync) {
        self.target
    }

    /// Downcast the target
    pub fn target_as<T: Any>(&self) -> Option<&'a T> {
        self.target.downcast_ref::<T>()
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Arguments may be rewritten before `proceed`
    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    /// Invoke the real method with the current arguments
    ///
    /// Success stores the return value and clears the error; failure stores
    /// the error exactly as the real method produced it and clears the
    /// return value. Only this call is timed. A panic in the real method
    /// unwinds out of `proceed` unchanged.
    pub fn proceed(&mut self) {
        let started = Instant::now();
        self.forwarding = true;
        let outcome = (self.forward)(&self.arguments);
        self.forwarding = false;
        let elapsed = started.elapsed();

        self.elapsed = Some(elapsed);
        self.proceed_count += 1;

        match outcome {
            Ok(value) => {
                self.return_value = if self.method.returns.is_unit() {
                    None
                } else {
                    value
                };
                self.error = None;
            }
            Err(err) => {
                self.return_value = None;
                self.error = Some(err);
            }
        }

        trace!(
            "Proceeded {} in {:?} (failed: {})",
            self.method,
            elapsed,
            self.error.is_some()
        );
    }

    /// True while the real method is running, and after it panicked
    pub(crate) fn in_real_call(&self) -> bool {
        self.forwarding
    }

    /// Number of times `proceed` ran
    pub fn proceed_count(&self) -> u32 {
        self.proceed_count
    }

    pub fn has_proceeded(&self) -> bool {
        self.proceed_count > 0
    }

    /// Duration of the last `proceed`
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn error(&self) -> Option<&BoxError> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Downcast the stored error
    pub fn error_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.error.as_ref().and_then(|err| err.downcast_ref::<E>())
    }

    /// Replace the outcome with a failure
    pub fn set_error(&mut self, error: impl Into<BoxError>) {
        self.return_value = None;
        self.error = Some(error.into());
    }

    /// Remove the stored error, suppressing it
    pub fn take_error(&mut self) -> Option<BoxError> {
        self.error.take()
    }

    /// Borrow the stored return value as `T`
    pub fn return_value<T: Any>(&self) -> Option<&T> {
        self.return_value
            .as_ref()
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn has_return_value(&self) -> bool {
        self.return_value.is_some()
    }

    /// Substitute the outcome with a value
    ///
    /// Clears any stored error. `T` must be the declared return type (the
    /// `Ok` type for fallible members). Ignored for unit members.
    pub fn set_return_value<T: Any + Send>(&mut self, value: T) -> Result<()> {
        if self.method.returns.is_unit() {
            self.error = None;
            return Ok(());
        }

        if !self.method.returns.accepts(TypeId::of::<T>()) {
            return Err(ProxyError::ReturnTypeMismatch {
                method: self.method.to_string(),
                expected: self.method.returns.value_type_name(),
            });
        }

        self.error = None;
        self.return_value = Some(Box::new(value));
        Ok(())
    }

    pub fn clear_return_value(&mut self) {
        self.return_value = None;
    }

    pub fn return_shape(&self) -> ReturnShape {
        self.method.returns
    }

    /// Consume the record, yielding `(error, return_value, elapsed)`
    pub(crate) fn into_outcome(
        self,
    ) -> (Option<BoxError>, Option<Box<dyn Any + Send>>, Option<Duration>) {
        (self.error, self.return_value, self.elapsed)
    }
}

impl fmt::Display for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.method, self.arguments)
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("method", &self.method.to_string())
            .field("arguments", &self.arguments)
            .field("error", &self.error)
            .field("has_return_value", &self.return_value.is_some())
            .field("elapsed", &self.elapsed)
            .finish()
    }
}
