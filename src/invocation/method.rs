// src/invocation/method.rs
//! Static descriptors for contracts and their members
//!
//! Descriptors are generated once per member by `intercept_contract!` and
//! live in `static`s, so every invocation refers to them by `&'static`.

use std::any::TypeId;
use std::fmt;

/// Declared parameter of a contract member
#[derive(Debug, Clone, Copy)]
pub struct ParamInfo {
    /// Declared parameter name
    pub name: &'static str,

    /// Declared type, as written
    pub type_name: &'static str,

    /// Type identity of the declared type
    pub type_id: fn() -> TypeId,
}

impl ParamInfo {
    /// Check whether a value of `id` may be bound to this parameter
    pub fn accepts(&self, id: TypeId) -> bool {
        (self.type_id)() == id
    }
}

/// Declared return shape of a contract member
#[derive(Debug, Clone, Copy)]
pub enum ReturnShape {
    /// Member returns `()`
    Unit,

    /// Member returns a plain value
    Value {
        type_name: &'static str,
        type_id: fn() -> TypeId,
    },

    /// Member returns `Result<T, E>`; the stored return value is the `T`
    Fallible {
        ok_name: &'static str,
        ok_id: fn() -> TypeId,
        err_name: &'static str,
    },
}

impl ReturnShape {
    pub fn is_unit(&self) -> bool {
        matches!(self, ReturnShape::Unit)
    }

    pub fn is_fallible(&self) -> bool {
        matches!(self, ReturnShape::Fallible { .. })
    }

    /// Name of the type stored as the return value
    pub fn value_type_name(&self) -> &'static str {
        match self {
            ReturnShape::Unit => "()",
            ReturnShape::Value { type_name, .. } => type_name,
            ReturnShape::Fallible { ok_name, .. } => ok_name,
        }
    }

    /// Check whether a stored return value of type `id` fits this shape
    pub fn accepts(&self, id: TypeId) -> bool {
        match self {
            ReturnShape::Unit => id == TypeId::of::<()>(),
            ReturnShape::Value { type_id, .. } => type_id() == id,
            ReturnShape::Fallible { ok_id, .. } => ok_id() == id,
        }
    }
}

/// Identity of one contract member
#[derive(Debug)]
pub struct MethodInfo {
    /// Declaring contract
    pub contract: &'static str,

    /// Member name
    pub name: &'static str,

    /// Parameters in declared order (receiver excluded)
    pub params: &'static [ParamInfo],

    /// Return shape
    pub returns: ReturnShape,
}

impl MethodInfo {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Position of the parameter called `name`, ignoring case
    pub fn param_position(&self, name: &str) -> Option<usize> {
        self.params
            .iter()
            .position(|param| names_match(param.name, name))
    }
}

/// Unicode case-insensitive comparison of parameter names
pub(crate) fn names_match(declared: &str, requested: &str) -> bool {
    declared
        .chars()
        .flat_map(char::to_lowercase)
        .eq(requested.chars().flat_map(char::to_lowercase))
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.contract, self.name)
    }
}

/// Descriptor of an interface contract
#[derive(Debug)]
pub struct ContractInfo {
    /// Contract (trait) name
    pub name: &'static str,

    /// Module-qualified trait path, unique per contract
    pub path: &'static str,

    /// Intercepted members, in declaration order
    pub methods: &'static [MethodInfo],

    /// Members forwarded without interception
    pub passthrough: &'static [&'static str],
}

impl ContractInfo {
    /// Find an intercepted member by name
    pub fn method(&self, name: &str) -> Option<&'static MethodInfo> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// True if `name` is forwarded without interception
    pub fn is_passthrough(&self, name: &str) -> bool {
        self.passthrough.contains(&name)
    }
}
