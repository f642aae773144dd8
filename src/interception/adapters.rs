// src/interception/adapters.rs
//! Small building blocks for writing interceptors

use crate::interception::interceptor::Interceptor;
use crate::invocation::{Invocation, MethodInfo};
use std::collections::HashSet;
use std::fmt;

/// Interceptor backed by a closure
pub struct FnInterceptor<F> {
    name: &'static str,
    intercept: F,
}

/// Build an interceptor from a closure
pub fn from_fn<F>(intercept: F) -> FnInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    FnInterceptor {
        name: std::any::type_name::<FnInterceptor<F>>(),
        intercept,
    }
}

impl<F> FnInterceptor<F> {
    /// Override the reported name (closure type names are unreadable)
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn intercept(&self, invocation: &mut Invocation<'_>) -> anyhow::Result<()> {
        (self.intercept)(invocation)
    }
}

impl<F> fmt::Debug for FnInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInterceptor").field("name", &self.name).finish()
    }
}

type MethodPredicate = dyn Fn(&MethodInfo) -> bool + Send + Sync;

/// Restricts an interceptor to a subset of members
///
/// Calls outside the subset skip interception entirely. Failures are still
/// reported under the inner interceptor's name.
pub struct Filtered<C> {
    inner: C,
    predicate: Box<MethodPredicate>,
}

impl<C: Interceptor> Filtered<C> {
    /// Intercept only members accepted by `predicate`
    pub fn new<P>(inner: C, predicate: P) -> Self
    where
        P: Fn(&MethodInfo) -> bool + Send + Sync + 'static,
    {
        Self {
            inner,
            predicate: Box::new(predicate),
        }
    }

    /// Intercept only the named members
    pub fn only_methods<I, S>(inner: C, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let methods: HashSet<String> = methods.into_iter().map(Into::into).collect();
        Self::new(inner, move |method| methods.contains(method.name))
    }

    /// Intercept every member except the named ones
    pub fn except_methods<I, S>(inner: C, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let methods: HashSet<String> = methods.into_iter().map(Into::into).collect();
        Self::new(inner, move |method| !methods.contains(method.name))
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Interceptor> Interceptor for Filtered<C> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn can_handle(&self, invocation: &Invocation<'_>) -> bool {
        (self.predicate)(invocation.method()) && self.inner.can_handle(invocation)
    }

    fn intercept(&self, invocation: &mut Invocation<'_>) -> anyhow::Result<()> {
        self.inner.intercept(invocation)
    }
}

impl<C: fmt::Debug> fmt::Debug for Filtered<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filtered").field("inner", &self.inner).finish()
    }
}
