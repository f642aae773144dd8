// src/proxy/contract.rs
//! Interface contracts and the forwarding generator
//!
//! A contract is a trait used as `dyn Trait`. [`intercept_contract!`]
//! generates, for one such trait, its [`Contract`] descriptor and an
//! implementation of the trait for [`Proxy<dyn Trait>`] that sends every
//! member call through [`Proxy::dispatch`].
//!
//! # Example
//!
//! ```
//! use dynproxy::{intercept_contract, PassThrough, Proxy, ProxyError};
//! use std::sync::Arc;
//!
//! #[derive(Debug, thiserror::Error)]
//! pub enum MathError {
//!     #[error("division by zero")]
//!     DivideByZero,
//!     #[error(transparent)]
//!     Proxy(#[from] ProxyError),
//! }
//!
//! pub trait Calculator: Send + Sync {
//!     fn add(&self, a: i32, b: i32) -> i32;
//!     fn divide(&self, a: i32, b: i32) -> Result<i32, MathError>;
//!     fn reset(&self);
//!     fn kind(&self) -> &'static str;
//! }
//!
//! intercept_contract! {
//!     dyn Calculator {
//!         fn add(&self, a: i32, b: i32) -> i32;
//!         fn divide(&self, a: i32, b: i32) -> Result<i32, MathError>;
//!         fn reset(&self);
//!         passthrough fn kind(&self) -> &'static str;
//!     }
//! }
//!
//! struct Basic;
//!
//! impl Calculator for Basic {
//!     fn add(&self, a: i32, b: i32) -> i32 { a + b }
//!     fn divide(&self, a: i32, b: i32) -> Result<i32, MathError> {
//!         if b == 0 { Err(MathError::DivideByZero) } else { Ok(a / b) }
//!     }
//!     fn reset(&self) {}
//!     fn kind(&self) -> &'static str { std::any::type_name::<Self>() }
//! }
//!
//! let real: Arc<dyn Calculator> = Arc::new(Basic);
//! let calc = Proxy::new(real, Arc::new(PassThrough)).into_contract();
//! assert_eq!(calc.add(2, 3), 5);
//! assert!(matches!(calc.divide(1, 0), Err(MathError::DivideByZero)));
//! ```
//!
//! # Member forms
//!
//! - `fn m(&self, ..);` unit member
//! - `fn m(&self, ..) -> T;` value member
//! - `fn m(&self, ..) -> Result<T, E>;` fallible member; `E` must implement
//!   `std::error::Error + From<ProxyError> + Send + Sync`
//! - `passthrough fn m(&self, ..) -> T;` forwarded straight to the target,
//!   never intercepted
//!
//! Intercepted members take owned arguments that are `Clone + Debug + Send +
//! 'static` and return `Send + 'static` values. The trait itself must have
//! `Send + Sync` as supertraits.

use crate::invocation::ContractInfo;
use crate::proxy::engine::Proxy;
use std::sync::Arc;

/// A trait object type that can be proxied
///
/// Implemented for `dyn Trait` by [`intercept_contract!`].
pub trait Contract: Send + Sync + 'static {
    /// Descriptor of the contract and its members
    fn info() -> &'static ContractInfo;

    /// Erase a proxy into the contract's trait object
    fn wrap(proxy: Proxy<Self>) -> Arc<Self>;
}

/// Generate the proxy implementation of a contract trait
///
/// See the [module documentation](crate::proxy::contract).
#[macro_export]
macro_rules! intercept_contract {
    (dyn $contract:ident { $($members:tt)* }) => {
        $crate::intercept_contract!(@munch $contract [0] [] [] [] $($members)*);
    };

    (@munch $contract:ident [$($idx:tt)*] [$($infos:tt)*] [$($pass:tt)*] [$($impls:tt)*]) => {
        impl $crate::Contract for dyn $contract {
            fn info() -> &'static $crate::ContractInfo {
                static INFO: $crate::ContractInfo = $crate::ContractInfo {
                    name: ::std::stringify!($contract),
                    path: ::std::concat!(::std::module_path!(), "::", ::std::stringify!($contract)),
                    methods: &[$($infos)*],
                    passthrough: &[$($pass)*],
                };
                &INFO
            }

            fn wrap(proxy: $crate::Proxy<Self>) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new(proxy)
            }
        }

        impl $contract for $crate::Proxy<dyn $contract> {
            $($impls)*
        }
    };

    // Forwarded without interception
    (@munch $contract:ident [$($idx:tt)*] [$($infos:tt)*] [$($pass:tt)*] [$($impls:tt)*]
        $(#[$meta:meta])*
        passthrough fn $name:ident(&self $(, $arg:ident : $ty:ty)*) $(-> $ret:ty)?;
        $($rest:tt)*
    ) => {
        $crate::intercept_contract!(@munch $contract [$($idx)*] [$($infos)*]
            [$($pass)* ::std::stringify!($name),]
            [$($impls)*
                $(#[$meta])*
                fn $name(&self $(, $arg: $ty)*) $(-> $ret)? {
                    self.target().$name($($arg),*)
                }
            ]
            $($rest)*
        );
    };

    // -> Result<T, E>
    (@munch $contract:ident [$($idx:tt)*] [$($infos:tt)*] [$($pass:tt)*] [$($impls:tt)*]
        $(#[$meta:meta])*
        fn $name:ident(&self $(, $arg:ident : $ty:ty)*) -> Result<$ok:ty, $err:ty>;
        $($rest:tt)*
    ) => {
        $crate::intercept_contract!(@munch $contract [$($idx)* + 1]
            [$($infos)*
                $crate::intercept_contract!(@info $contract $name [$($arg: $ty),*]
                    $crate::ReturnShape::Fallible {
                        ok_name: ::std::stringify!($ok),
                        ok_id: ::std::any::TypeId::of::<$ok>,
                        err_name: ::std::stringify!($err),
                    }
                ),
            ]
            [$($pass)*]
            [$($impls)*
                $(#[$meta])*
                fn $name(&self $(, $arg: $ty)*) -> ::std::result::Result<$ok, $err> {
                    let method = &<dyn $contract as $crate::Contract>::info().methods[$($idx)*];
                    self.dispatch(
                        method,
                        ::std::vec![$(::std::boxed::Box::new($arg) as ::std::boxed::Box<dyn $crate::ArgValue>),*],
                        &|target, args| {
                            $crate::intercept_contract!(@bind args $($arg: $ty),*);
                            match target.$name($($arg),*) {
                                ::std::result::Result::Ok(value) => ::std::result::Result::Ok(
                                    ::std::option::Option::Some(
                                        ::std::boxed::Box::new(value) as ::std::boxed::Box<dyn ::std::any::Any + ::std::marker::Send>,
                                    ),
                                ),
                                ::std::result::Result::Err(err) => ::std::result::Result::Err(
                                    ::std::boxed::Box::new(err) as $crate::BoxError,
                                ),
                            }
                        },
                    )
                    .into_result::<$ok, $err>()
                }
            ]
            $($rest)*
        );
    };

    // -> T
    (@munch $contract:ident [$($idx:tt)*] [$($infos:tt)*] [$($pass:tt)*] [$($impls:tt)*]
        $(#[$meta:meta])*
        fn $name:ident(&self $(, $arg:ident : $ty:ty)*) -> $ret:ty;
        $($rest:tt)*
    ) => {
        $crate::intercept_contract!(@munch $contract [$($idx)* + 1]
            [$($infos)*
                $crate::intercept_contract!(@info $contract $name [$($arg: $ty),*]
                    $crate::ReturnShape::Value {
                        type_name: ::std::stringify!($ret),
                        type_id: ::std::any::TypeId::of::<$ret>,
                    }
                ),
            ]
            [$($pass)*]
            [$($impls)*
                $(#[$meta])*
                fn $name(&self $(, $arg: $ty)*) -> $ret {
                    let method = &<dyn $contract as $crate::Contract>::info().methods[$($idx)*];
                    self.dispatch(
                        method,
                        ::std::vec![$(::std::boxed::Box::new($arg) as ::std::boxed::Box<dyn $crate::ArgValue>),*],
                        &|target, args| {
                            $crate::intercept_contract!(@bind args $($arg: $ty),*);
                            let value = target.$name($($arg),*);
                            ::std::result::Result::Ok(::std::option::Option::Some(
                                ::std::boxed::Box::new(value) as ::std::boxed::Box<dyn ::std::any::Any + ::std::marker::Send>,
                            ))
                        },
                    )
                    .into_value::<$ret>()
                }
            ]
            $($rest)*
        );
    };

    // unit
    (@munch $contract:ident [$($idx:tt)*] [$($infos:tt)*] [$($pass:tt)*] [$($impls:tt)*]
        $(#[$meta:meta])*
        fn $name:ident(&self $(, $arg:ident : $ty:ty)*);
        $($rest:tt)*
    ) => {
        $crate::intercept_contract!(@munch $contract [$($idx)* + 1]
            [$($infos)*
                $crate::intercept_contract!(@info $contract $name [$($arg: $ty),*]
                    $crate::ReturnShape::Unit
                ),
            ]
            [$($pass)*]
            [$($impls)*
                $(#[$meta])*
                fn $name(&self $(, $arg: $ty)*) {
                    let method = &<dyn $contract as $crate::Contract>::info().methods[$($idx)*];
                    self.dispatch(
                        method,
                        ::std::vec![$(::std::boxed::Box::new($arg) as ::std::boxed::Box<dyn $crate::ArgValue>),*],
                        &|target, args| {
                            $crate::intercept_contract!(@bind args $($arg: $ty),*);
                            target.$name($($arg),*);
                            ::std::result::Result::Ok(::std::option::Option::None)
                        },
                    )
                    .into_unit()
                }
            ]
            $($rest)*
        );
    };

    (@info $contract:ident $name:ident [$($arg:ident : $ty:ty),*] $returns:expr) => {
        $crate::MethodInfo {
            contract: ::std::stringify!($contract),
            name: ::std::stringify!($name),
            params: &[$(
                $crate::ParamInfo {
                    name: ::std::stringify!($arg),
                    type_name: ::std::stringify!($ty),
                    type_id: ::std::any::TypeId::of::<$ty>,
                }
            ),*],
            returns: $returns,
        }
    };

    (@bind $args:ident $($arg:ident : $ty:ty),*) => {
        #[allow(unused_mut, unused_variables)]
        let mut cursor = $args.cursor();
        $(let $arg: $ty = cursor.take_next::<$ty>()?;)*
    };
}

#[cfg(test)]
mod tests {
    use crate::interception::{from_fn, PassThrough};
    use crate::proxy::{Contract, Proxy};
    use crate::utils::errors::ProxyError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, thiserror::Error)]
    enum LedgerError {
        #[error("insufficient funds: {0}")]
        Insufficient(u64),

        #[error(transparent)]
        Proxy(#[from] ProxyError),
    }

    trait Ledger: Send + Sync {
        fn deposit(&self, account: String, amount: u64) -> u64;
        fn withdraw(&self, account: String, amount: u64) -> Result<u64, LedgerError>;
        fn clear(&self);
        fn backend(&self) -> &'static str;
    }

    crate::intercept_contract! {
        dyn Ledger {
            /// Adds funds
            fn deposit(&self, account: String, amount: u64) -> u64;
            fn withdraw(&self, account: String, amount: u64) -> Result<u64, LedgerError>;
            fn clear(&self);
            passthrough fn backend(&self) -> &'static str;
        }
    }

    #[derive(Default)]
    struct MemoryLedger {
        balance: AtomicUsize,
    }

    impl Ledger for MemoryLedger {
        fn deposit(&self, _account: String, amount: u64) -> u64 {
            (self.balance.fetch_add(amount as usize, Ordering::SeqCst) + amount as usize) as u64
        }

        fn withdraw(&self, _account: String, amount: u64) -> Result<u64, LedgerError> {
            let balance = self.balance.load(Ordering::SeqCst) as u64;
            if amount > balance {
                return Err(LedgerError::Insufficient(balance));
            }
            self.balance.fetch_sub(amount as usize, Ordering::SeqCst);
            Ok(balance - amount)
        }

        fn clear(&self) {
            self.balance.store(0, Ordering::SeqCst);
        }

        fn backend(&self) -> &'static str {
            "memory"
        }
    }

    fn ledger_proxy() -> Arc<dyn Ledger> {
        let real: Arc<dyn Ledger> = Arc::new(MemoryLedger::default());
        Proxy::new(real, Arc::new(PassThrough)).into_contract()
    }

    #[test]
    fn test_contract_info() {
        let info = <dyn Ledger as Contract>::info();

        assert_eq!(info.name, "Ledger");
        assert!(info.path.ends_with("::tests::Ledger"));
        assert_eq!(info.methods.len(), 3);
        assert_eq!(info.methods[1].name, "withdraw");
        assert!(info.methods[1].returns.is_fallible());
        assert!(info.methods[2].returns.is_unit());
        assert_eq!(info.methods[0].params[1].name, "amount");
        assert_eq!(info.methods[0].params[1].type_name, "u64");
        assert!(info.is_passthrough("backend"));
        assert!(info.method("backend").is_none());
    }

    #[test]
    fn test_forwarding() {
        let ledger = ledger_proxy();

        assert_eq!(ledger.deposit("acc".into(), 10), 10);
        assert_eq!(ledger.withdraw("acc".into(), 4).unwrap(), 6);
        assert!(matches!(
            ledger.withdraw("acc".into(), 100),
            Err(LedgerError::Insufficient(6))
        ));

        ledger.clear();
        assert_eq!(ledger.deposit("acc".into(), 1), 1);
        assert_eq!(ledger.backend(), "memory");
    }

    #[test]
    fn test_members_share_contract_descriptors() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let interceptor = from_fn(move |invocation| {
            sink.lock().push(invocation.method() as *const _ as usize);
            invocation.proceed();
            Ok(())
        });

        let real: Arc<dyn Ledger> = Arc::new(MemoryLedger::default());
        let ledger = Proxy::new(real, Arc::new(interceptor)).into_contract();
        ledger.deposit("acc".into(), 1);
        ledger.clear();

        let info = <dyn Ledger as Contract>::info();
        let expected = vec![
            &info.methods[0] as *const _ as usize,
            &info.methods[2] as *const _ as usize,
        ];
        assert_eq!(*seen.lock(), expected);
    }
}
