// src/proxy/engine.rs
//! Proxy engine
//!
//! A [`Proxy`] stands in for a real instance of a contract. Every intercepted
//! member call goes through [`Proxy::dispatch`]:
//!
//! ```text
//! Dispatched ─▶ Skipped (can_handle = false, proceed directly)
//!           └─▶ Handled (intercept; interceptor errors are wrapped)
//!                   ─▶ Completed(return value) | Completed(error)
//! ```
//!
//! Real-method errors reach the caller as the original value, and panics in
//! the real method unwind unchanged. Only failures of the interceptor itself
//! (an `Err` or a panic outside `proceed`) are wrapped, as
//! [`ProxyError::InterceptorFailed`].

use crate::interception::Interceptor;
use crate::invocation::{ArgValue, Arguments, CallResult, Invocation, MethodInfo};
use crate::observability::{CALLS_TOTAL, CALL_DURATION_SECONDS, INTERCEPTOR_FAILURES_TOTAL};
use crate::proxy::contract::Contract;
use crate::utils::config::ProxySettings;
use crate::utils::errors::{BoxError, ProxyError};
use metrics::{counter, histogram};
use std::any::{Any, TypeId};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Route a call took through the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPath {
    /// Interceptor declined; real method called directly
    Skipped,

    /// Interceptor ran
    Handled,
}

impl DispatchPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchPath::Skipped => "skipped",
            DispatchPath::Handled => "handled",
        }
    }
}

/// Stand-in for a real instance of contract `I`
///
/// Holds the target and interceptor for its whole life; both are shared,
/// never mutated. Implements `I` through `intercept_contract!`.
pub struct Proxy<I: ?Sized> {
    target: Arc<I>,
    interceptor: Arc<dyn Interceptor>,
    settings: ProxySettings,
}

impl<I: Contract + ?Sized> Proxy<I> {
    /// Build a proxy with default settings
    pub fn new(target: Arc<I>, interceptor: Arc<dyn Interceptor>) -> Self {
        Self::with_settings(target, interceptor, ProxySettings::default())
    }

    pub fn with_settings(
        target: Arc<I>,
        interceptor: Arc<dyn Interceptor>,
        settings: ProxySettings,
    ) -> Self {
        debug!(
            "Creating proxy for {} with interceptor {}",
            I::info().name,
            interceptor.name()
        );

        Self {
            target,
            interceptor,
            settings,
        }
    }

    /// The real instance
    pub fn target(&self) -> &I {
        &self.target
    }

    pub fn target_arc(&self) -> &Arc<I> {
        &self.target
    }

    pub fn interceptor(&self) -> &Arc<dyn Interceptor> {
        &self.interceptor
    }

    pub fn settings(&self) -> ProxySettings {
        self.settings
    }

    /// Turn the proxy into a drop-in `Arc<I>`
    pub fn into_contract(self) -> Arc<I> {
        I::wrap(self)
    }

    /// Route one member call through the interceptor
    ///
    /// `call` forwards to the real method with the (possibly rewritten)
    /// arguments.
    pub fn dispatch(
        &self,
        method: &'static MethodInfo,
        values: Vec<Box<dyn ArgValue>>,
        call: &dyn Fn(&I, &Arguments) -> CallResult,
    ) -> Completion {
        let target: &I = &self.target;
        let forward = move |args: &Arguments| call(target, args);

        let mut invocation = match Invocation::new(method, &self.target, values, &forward) {
            Ok(invocation) => invocation,
            Err(err) => {
                error!("Failed to capture call to {}: {}", method, err);
                return Completion::failed(method, err.into());
            }
        };

        if self.settings.trace_arguments {
            trace!("Dispatching {}", invocation);
        }

        let path = if self.interceptor.can_handle(&invocation) {
            let interceptor = &self.interceptor;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                interceptor.intercept(&mut invocation)
            }));

            let failure: Option<BoxError> = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err.into()),
                Err(payload) if invocation.in_real_call() => panic::resume_unwind(payload),
                Err(payload) => Some(format!("panicked: {}", panic_message(&*payload)).into()),
            };

            if let Some(source) = failure {
                let interceptor = self.interceptor.name();
                warn!("Interceptor {} failed on {}: {}", interceptor, method, source);

                if self.settings.metrics_enabled {
                    counter!(INTERCEPTOR_FAILURES_TOTAL, "interceptor" => interceptor).increment(1);
                }

                invocation.set_error(ProxyError::InterceptorFailed {
                    interceptor,
                    method: method.to_string(),
                    source,
                });
            }
            DispatchPath::Handled
        } else {
            invocation.proceed();
            DispatchPath::Skipped
        };

        let (error, return_value, elapsed) = invocation.into_outcome();
        self.observe(method, path, elapsed, error.is_some());

        Completion {
            method,
            path,
            error,
            return_value,
            elapsed,
        }
    }

    fn observe(
        &self,
        method: &'static MethodInfo,
        path: DispatchPath,
        elapsed: Option<Duration>,
        failed: bool,
    ) {
        trace!(
            "{} completed via {} path (failed: {})",
            method,
            path.as_str(),
            failed
        );

        if self.settings.metrics_enabled {
            counter!(
                CALLS_TOTAL,
                "contract" => method.contract,
                "method" => method.name,
                "path" => path.as_str()
            )
            .increment(1);

            if let Some(elapsed) = elapsed {
                histogram!(
                    CALL_DURATION_SECONDS,
                    "contract" => method.contract,
                    "method" => method.name
                )
                .record(elapsed.as_secs_f64());
            }
        }

        if let (Some(threshold), Some(elapsed)) = (self.settings.slow_call_threshold, elapsed) {
            if elapsed > threshold {
                warn!("Slow call to {}: {:?} (threshold {:?})", method, elapsed, threshold);
            }
        }
    }
}

impl<I: ?Sized> Clone for Proxy<I> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            interceptor: Arc::clone(&self.interceptor),
            settings: self.settings,
        }
    }
}

impl<I: Contract + ?Sized> fmt::Debug for Proxy<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("contract", &I::info().name)
            .field("interceptor", &self.interceptor.name())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Final state of a dispatched call
pub struct Completion {
    method: &'static MethodInfo,
    path: DispatchPath,
    error: Option<BoxError>,
    return_value: Option<Box<dyn Any + Send>>,
    elapsed: Option<Duration>,
}

impl Completion {
    fn failed(method: &'static MethodInfo, error: BoxError) -> Self {
        Self {
            method,
            path: DispatchPath::Skipped,
            error: Some(error),
            return_value: None,
            elapsed: None,
        }
    }

    pub fn method(&self) -> &'static MethodInfo {
        self.method
    }

    pub fn path(&self) -> DispatchPath {
        self.path
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Outcome for a member declared `-> Result<T, E>`
    ///
    /// The real method's own `E` comes back unchanged. Anything else
    /// (interceptor failure, missing value, an error of another type set by
    /// the interceptor) is converted through `E: From<ProxyError>`.
    pub fn into_result<T, E>(self) -> Result<T, E>
    where
        T: Any,
        E: std::error::Error + From<ProxyError> + Send + Sync + 'static,
    {
        let method = self.method;
        self.into_outcome::<T>()
            .map_err(|err| recover::<E>(method, err))
    }

    /// Outcome for a member returning a plain `T`
    ///
    /// Such members have no error channel, so a stored error is re-raised as
    /// a panic carrying the [`BoxError`] as payload.
    pub fn into_value<T: Any>(self) -> T {
        let method = self.method;
        match self.into_outcome::<T>() {
            Ok(value) => value,
            Err(err) => raise(method, err),
        }
    }

    /// Outcome for a unit member; a stored error is re-raised as a panic
    pub fn into_unit(self) {
        if let Some(err) = self.error {
            raise(self.method, err);
        }
    }

    fn into_outcome<T: Any>(self) -> Result<T, BoxError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let value = match self.return_value {
            Some(value) => value,
            None if TypeId::of::<T>() == TypeId::of::<()>() => Box::new(()) as Box<dyn Any + Send>,
            None => {
                return Err(ProxyError::MissingReturnValue {
                    method: self.method.to_string(),
                }
                .into())
            }
        };

        value.downcast::<T>().map(|value| *value).map_err(|_| {
            ProxyError::ReturnTypeMismatch {
                method: self.method.to_string(),
                expected: self.method.returns.value_type_name(),
            }
            .into()
        })
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("method", &self.method.to_string())
            .field("path", &self.path)
            .field("error", &self.error)
            .field("has_return_value", &self.return_value.is_some())
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

fn recover<E>(method: &'static MethodInfo, err: BoxError) -> E
where
    E: std::error::Error + From<ProxyError> + Send + Sync + 'static,
{
    match err.downcast::<E>() {
        Ok(err) => *err,
        Err(err) => match err.downcast::<ProxyError>() {
            Ok(err) => E::from(*err),
            Err(source) => E::from(ProxyError::Foreign {
                method: method.to_string(),
                source,
            }),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

fn raise(method: &'static MethodInfo, err: BoxError) -> ! {
    error!("Call to {} failed: {}", method, err);
    std::panic::panic_any(err)
}
