// src/invocation/arguments.rs
//! Ordered, name- and index-addressable argument collection
//!
//! Values are boxed behind [`ArgValue`] so an interceptor can inspect,
//! render and rewrite them without knowing the member's signature.

use crate::invocation::method::{names_match, MethodInfo, ParamInfo};
use crate::utils::errors::{ProxyError, Result};
use std::any::{Any, TypeId};
use std::fmt;

/// A value that can travel as a call argument
pub trait ArgValue: Any + fmt::Debug + Send {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn clone_value(&self) -> Box<dyn ArgValue>;
}

impl<T> ArgValue for T
where
    T: Any + fmt::Debug + Clone + Send,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_value(&self) -> Box<dyn ArgValue> {
        Box::new(self.clone())
    }
}

/// One actual argument of an invocation
pub struct Argument {
    method: &'static MethodInfo,
    position: usize,
    param: &'static ParamInfo,
    value: Box<dyn ArgValue>,
}

impl Argument {
    /// Zero-based declared position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Declared parameter name
    pub fn name(&self) -> &'static str {
        self.param.name
    }

    /// Declared parameter type
    pub fn declared_type(&self) -> &'static str {
        self.param.type_name
    }

    /// Borrow the value as `T`
    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow the value as `T`
    pub fn value_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.value.as_any_mut().downcast_mut::<T>()
    }

    /// Replace the value; `T` must be the declared parameter type
    pub fn set_value<T: ArgValue>(&mut self, value: T) -> Result<()> {
        if !self.param.accepts(TypeId::of::<T>()) {
            return Err(self.type_mismatch());
        }

        self.value = Box::new(value);
        Ok(())
    }

    fn type_mismatch(&self) -> ProxyError {
        ProxyError::ArgumentTypeMismatch {
            method: self.method.to_string(),
            parameter: self.param.name,
            expected: self.param.type_name,
        }
    }

    /// Debug rendering of the current value
    pub fn debug_value(&self) -> String {
        format!("{:?}", self.value)
    }
}

impl Clone for Argument {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            position: self.position,
            param: self.param,
            value: self.value.clone_value(),
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("position", &self.position)
            .field("name", &self.param.name)
            .field("declared_type", &self.param.type_name)
            .field("value", &self.value)
            .finish()
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:?}", self.param.name, self.value)
    }
}

/// Arguments of one invocation, in declared parameter order
#[derive(Debug, Clone)]
pub struct Arguments {
    items: Vec<Argument>,
}

impl Arguments {
    /// Bind call-site values to the parameters of `method`
    ///
    /// Fails if the count or any value type differs from the declaration.
    pub fn bind(method: &'static MethodInfo, values: Vec<Box<dyn ArgValue>>) -> Result<Self> {
        if values.len() != method.params.len() {
            return Err(ProxyError::ArgumentCountMismatch {
                method: method.to_string(),
                expected: method.params.len(),
                actual: values.len(),
            });
        }

        let items = method
            .params
            .iter()
            .zip(values)
            .enumerate()
            .map(|(position, (param, value))| {
                if !param.accepts(value.as_any().type_id()) {
                    return Err(ProxyError::ArgumentTypeMismatch {
                        method: method.to_string(),
                        parameter: param.name,
                        expected: param.type_name,
                    });
                }
                Ok(Argument {
                    method,
                    position,
                    param,
                    value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.items.iter()
    }

    /// Argument at `index`
    pub fn get(&self, index: usize) -> Result<&Argument> {
        let len = self.items.len();
        self.items
            .get(index)
            .ok_or(ProxyError::ArgumentIndexOutOfRange { index, len })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Argument> {
        let len = self.items.len();
        self.items
            .get_mut(index)
            .ok_or(ProxyError::ArgumentIndexOutOfRange { index, len })
    }

    /// Argument whose declared name matches `name`, ignoring case
    pub fn by_name(&self, name: &str) -> Result<&Argument> {
        self.items
            .iter()
            .find(|arg| names_match(arg.name(), name))
            .ok_or_else(|| ProxyError::UnknownArgument(name.to_string()))
    }

    pub fn by_name_mut(&mut self, name: &str) -> Result<&mut Argument> {
        self.items
            .iter_mut()
            .find(|arg| names_match(arg.name(), name))
            .ok_or_else(|| ProxyError::UnknownArgument(name.to_string()))
    }

    /// Typed borrow of the value at `index`
    pub fn value<T: Any>(&self, index: usize) -> Result<&T> {
        let arg = self.get(index)?;
        arg.value::<T>().ok_or_else(|| arg.type_mismatch())
    }

    /// Replace the value at `index`
    pub fn set<T: ArgValue>(&mut self, index: usize, value: T) -> Result<()> {
        self.get_mut(index)?.set_value(value)
    }

    /// Sequential typed reader used when forwarding to the real method
    pub fn cursor(&self) -> ArgCursor<'_> {
        ArgCursor {
            items: self.items.iter(),
            consumed: 0,
            len: self.items.len(),
        }
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a Argument;
    type IntoIter = std::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}

/// Reads cloned argument values in declared order
pub struct ArgCursor<'a> {
    items: std::slice::Iter<'a, Argument>,
    consumed: usize,
    len: usize,
}

impl ArgCursor<'_> {
    /// Clone out the next argument as `T`
    pub fn take_next<T: Any + Clone>(&mut self) -> Result<T> {
        let index = self.consumed;
        let arg = self
            .items
            .next()
            .ok_or(ProxyError::ArgumentIndexOutOfRange {
                index,
                len: self.len,
            })?;
        self.consumed += 1;

        arg.value::<T>().cloned().ok_or_else(|| arg.type_mismatch())
    }
}
