// src/proxy/registry.rs
//! Contract registry for name-based proxy construction
//!
//! Maps contract paths to type-erased builders so a proxy can be created
//! when the contract is only known at runtime. Entries are keyed by the
//! module-qualified trait path; a bare trait name resolves only while it is
//! unambiguous.

use crate::interception::Interceptor;
use crate::invocation::ContractInfo;
use crate::proxy::contract::Contract;
use crate::proxy::engine::Proxy;
use crate::utils::config::ProxySettings;
use crate::utils::errors::{ProxyError, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Type-erased instance or proxy (holds an `Arc<dyn Trait>`)
pub type ErasedInstance = Box<dyn Any + Send + Sync>;

type Builder = fn(ErasedInstance, Arc<dyn Interceptor>, ProxySettings) -> Result<ErasedInstance>;

#[derive(Clone, Copy)]
struct ContractEntry {
    info: &'static ContractInfo,
    type_id: TypeId,
    build: Builder,
}

static GLOBAL: Lazy<Arc<ContractRegistry>> = Lazy::new(|| Arc::new(ContractRegistry::new()));

/// Registry of proxyable contracts
pub struct ContractRegistry {
    entries: RwLock<HashMap<&'static str, ContractEntry>>,
}

impl ContractRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide registry
    pub fn global() -> Arc<ContractRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Register contract `I`
    ///
    /// Re-registering the same contract is a no-op. A different trait
    /// claiming an already registered path is rejected.
    pub fn register<I: Contract + ?Sized>(&self) -> Result<()> {
        let info = I::info();
        let type_id = TypeId::of::<I>();
        let mut entries = self.entries.write();

        if let Some(existing) = entries.get(info.path) {
            if existing.type_id == type_id {
                debug!("Contract {} already registered", info.path);
                return Ok(());
            }

            warn!("Rejected contract {}: path already taken", info.path);
            return Err(ProxyError::ContractConflict(info.path));
        }

        entries.insert(
            info.path,
            ContractEntry {
                info,
                type_id,
                build: build_erased::<I>,
            },
        );
        info!("Registered contract {} ({} members)", info.path, info.methods.len());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    /// Descriptor of a registered contract, by path or unambiguous name
    pub fn get(&self, name: &str) -> Option<&'static ContractInfo> {
        self.resolve(name).ok().map(|entry| entry.info)
    }

    /// All registered contracts, sorted by path
    pub fn contracts(&self) -> Vec<&'static ContractInfo> {
        let mut contracts: Vec<_> = self.entries.read().values().map(|entry| entry.info).collect();
        contracts.sort_by_key(|info| info.path);
        contracts
    }

    /// Build a proxy for the contract called `name`
    ///
    /// `name` is a contract path or a bare trait name shared by no other
    /// registered contract. `instance` must hold an `Arc<dyn Trait>` of that
    /// contract; the result holds the proxy as the same type.
    pub fn build(
        &self,
        name: &str,
        instance: ErasedInstance,
        interceptor: Arc<dyn Interceptor>,
        settings: ProxySettings,
    ) -> Result<ErasedInstance> {
        let entry = self.resolve(name)?;
        (entry.build)(instance, interceptor, settings)
    }

    fn resolve(&self, name: &str) -> Result<ContractEntry> {
        let entries = self.entries.read();

        if let Some(entry) = entries.get(name) {
            return Ok(*entry);
        }

        let mut found: Vec<ContractEntry> = entries
            .values()
            .filter(|entry| entry.info.name == name)
            .copied()
            .collect();

        match found.len() {
            0 => Err(ProxyError::NotAContract(name.to_string())),
            1 => Ok(found.remove(0)),
            _ => {
                let mut candidates: Vec<_> = found.iter().map(|entry| entry.info.path).collect();
                candidates.sort_unstable();
                Err(ProxyError::AmbiguousContract {
                    name: name.to_string(),
                    candidates,
                })
            }
        }
    }
}

impl Default for ContractRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn build_erased<I: Contract + ?Sized>(
    instance: ErasedInstance,
    interceptor: Arc<dyn Interceptor>,
    settings: ProxySettings,
) -> Result<ErasedInstance> {
    let target = instance
        .downcast::<Arc<I>>()
        .map_err(|_| ProxyError::ContractMismatch {
            contract: I::info().path,
            expected: std::any::type_name::<Arc<I>>(),
        })?;

    let proxy = Proxy::with_settings(*target, interceptor, settings).into_contract();
    Ok(Box::new(proxy))
}
