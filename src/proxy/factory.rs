// src/proxy/factory.rs
//! Convenience constructors binding a real instance and an interceptor

use crate::interception::Interceptor;
use crate::proxy::contract::Contract;
use crate::proxy::engine::Proxy;
use crate::proxy::registry::{ContractRegistry, ErasedInstance};
use crate::utils::config::{ProxyConfig, ProxySettings};
use crate::utils::errors::{ProxyError, Result};
use std::sync::Arc;
use tracing::{debug, error};

/// Creates proxies with shared settings
#[derive(Clone)]
pub struct ProxyFactory {
    settings: ProxySettings,
    registry: Arc<ContractRegistry>,
}

impl ProxyFactory {
    /// Factory using the global contract registry
    pub fn new(config: &ProxyConfig) -> Self {
        Self::with_registry(config, ContractRegistry::global())
    }

    pub fn with_registry(config: &ProxyConfig, registry: Arc<ContractRegistry>) -> Self {
        Self {
            settings: config.settings(),
            registry,
        }
    }

    pub fn settings(&self) -> ProxySettings {
        self.settings
    }

    pub fn registry(&self) -> &Arc<ContractRegistry> {
        &self.registry
    }

    /// Proxy a statically known contract
    pub fn create<I: Contract + ?Sized>(
        &self,
        target: Arc<I>,
        interceptor: Arc<dyn Interceptor>,
    ) -> Arc<I> {
        Proxy::with_settings(target, interceptor, self.settings).into_contract()
    }

    /// Proxy a statically known contract, taking the interceptor by value
    pub fn create_with<I, C>(&self, target: Arc<I>, interceptor: C) -> Arc<I>
    where
        I: Contract + ?Sized,
        C: Interceptor,
    {
        self.create(target, Arc::new(interceptor))
    }

    /// Proxy a contract known only by name
    ///
    /// `instance` must hold the real instance as `Arc<dyn Trait>`; the
    /// returned box holds the proxy as the same type. Construction errors
    /// are returned as-is.
    pub fn create_dynamic(
        &self,
        contract: &str,
        interceptor: Arc<dyn Interceptor>,
        instance: ErasedInstance,
    ) -> Result<ErasedInstance> {
        if contract.trim().is_empty() {
            return Err(ProxyError::InvalidArgument(
                "contract name must not be empty".to_string(),
            ));
        }

        debug!("Creating proxy for contract {} by name", contract);

        self.registry
            .build(contract, instance, interceptor, self.settings)
            .map_err(|err| {
                error!("Failed to create proxy for {}: {}", contract, err);
                err
            })
    }

    /// Typed front-end to [`create_dynamic`](Self::create_dynamic) for a
    /// registered contract
    pub fn create_registered<I: Contract + ?Sized>(
        &self,
        target: Arc<I>,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<Arc<I>> {
        let name = I::info().path;
        let built = self.create_dynamic(name, interceptor, Box::new(target))?;

        built
            .downcast::<Arc<I>>()
            .map(|proxy| *proxy)
            .map_err(|_| ProxyError::ContractMismatch {
                contract: name,
                expected: std::any::type_name::<Arc<I>>(),
            })
    }
}

impl Default for ProxyFactory {
    fn default() -> Self {
        Self::new(&ProxyConfig::default())
    }
}
