// tests/contract_proxy.rs
//! End-to-end behavior of proxies built from outside the crate

use dynproxy::{
    from_fn, intercept_contract, ArgValue, Arguments, Contract, ContractRegistry, Filtered,
    Interceptor, Invocation, PassThrough, Proxy, ProxyConfig, ProxyError, ProxyFactory,
};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    #[error("division by zero")]
    DivideByZero,

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

pub trait Calculator: Send + Sync {
    fn reset(&self);
    fn add(&self, a: i32, b: i32) -> i32;
    fn divide(&self, a: i32, b: i32) -> Result<i32, CalcError>;
    fn explode(&self) -> i32;
    fn transfer(&self, amount: u64, currency: String) -> Result<String, CalcError>;
    fn fetch(&self, id: u32) -> BoxFuture<'static, u32>;
    fn runtime_type(&self) -> &'static str;
}

intercept_contract! {
    dyn Calculator {
        fn reset(&self);
        fn add(&self, a: i32, b: i32) -> i32;
        fn divide(&self, a: i32, b: i32) -> Result<i32, CalcError>;
        fn explode(&self) -> i32;
        fn transfer(&self, amount: u64, currency: String) -> Result<String, CalcError>;
        fn fetch(&self, id: u32) -> BoxFuture<'static, u32>;
        passthrough fn runtime_type(&self) -> &'static str;
    }
}

#[derive(Default)]
struct BasicCalculator {
    calls: AtomicUsize,
    resets: AtomicUsize,
    last_a: AtomicI32,
}

impl BasicCalculator {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Calculator for BasicCalculator {
    fn reset(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn add(&self, a: i32, b: i32) -> i32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_a.store(a, Ordering::SeqCst);
        a + b
    }

    fn divide(&self, a: i32, b: i32) -> Result<i32, CalcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if b == 0 {
            return Err(CalcError::DivideByZero);
        }
        Ok(a / b)
    }

    fn explode(&self) -> i32 {
        panic!("calculator exploded")
    }

    fn transfer(&self, amount: u64, currency: String) -> Result<String, CalcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{} {}", amount, currency))
    }

    fn fetch(&self, id: u32) -> BoxFuture<'static, u32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            tokio::task::yield_now().await;
            id * 10
        })
    }

    fn runtime_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

fn proxied(interceptor: impl Interceptor) -> (Arc<BasicCalculator>, Arc<dyn Calculator>) {
    let real = Arc::new(BasicCalculator::default());
    let target: Arc<dyn Calculator> = real.clone();
    let proxy = Proxy::new(target, Arc::new(interceptor)).into_contract();
    (real, proxy)
}

/// Counts `intercept` calls and always proceeds; clones share the count
#[derive(Clone, Default)]
struct CountingInterceptor {
    intercepted: Arc<AtomicUsize>,
}

impl Interceptor for CountingInterceptor {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> anyhow::Result<()> {
        self.intercepted.fetch_add(1, Ordering::SeqCst);
        invocation.proceed();
        Ok(())
    }
}

/// Declines every call
struct NeverHandles {
    intercepted: Arc<AtomicUsize>,
}

impl Interceptor for NeverHandles {
    fn can_handle(&self, _invocation: &Invocation<'_>) -> bool {
        false
    }

    fn intercept(&self, invocation: &mut Invocation<'_>) -> anyhow::Result<()> {
        self.intercepted.fetch_add(1, Ordering::SeqCst);
        invocation.proceed();
        Ok(())
    }
}

/// Breaks before the real method runs
struct FaultyInterceptor;

impl Interceptor for FaultyInterceptor {
    fn intercept(&self, _invocation: &mut Invocation<'_>) -> anyhow::Result<()> {
        anyhow::bail!("audit sink unavailable")
    }
}

#[test]
fn test_transparency_unit_member() {
    let (real, calc) = proxied(PassThrough);

    calc.reset();
    calc.reset();

    assert_eq!(real.resets.load(Ordering::SeqCst), 2);
}

#[test]
fn test_transparency_value_member() {
    let (_, calc) = proxied(PassThrough);
    let direct = BasicCalculator::default();

    for (a, b) in [(2, 3), (-7, 7), (i32::MAX - 1, 1)] {
        assert_eq!(calc.add(a, b), direct.add(a, b));
    }
}

#[test]
fn test_transparency_fallible_member() {
    let (_, calc) = proxied(PassThrough);

    assert_eq!(calc.divide(9, 3).unwrap(), 3);
    assert!(matches!(calc.divide(1, 0), Err(CalcError::DivideByZero)));
}

#[test]
fn test_real_method_panic_unwinds_unchanged() {
    let (_, calc) = proxied(PassThrough);

    let payload = catch_unwind(AssertUnwindSafe(|| calc.explode())).unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"calculator exploded"));
}

#[test]
fn test_skip_path() {
    let intercepted = Arc::new(AtomicUsize::new(0));
    let (real, calc) = proxied(NeverHandles {
        intercepted: Arc::clone(&intercepted),
    });

    assert_eq!(calc.add(1, 2), 3);
    assert!(matches!(calc.divide(1, 0), Err(CalcError::DivideByZero)));
    calc.reset();

    assert_eq!(real.calls(), 3);
    assert_eq!(intercepted.load(Ordering::SeqCst), 0);
}

#[test]
fn test_substitution_without_proceed() {
    let (real, calc) = proxied(from_fn(|invocation| {
        match invocation.method().name {
            "add" => invocation.set_return_value(100i32)?,
            "divide" => invocation.set_return_value(-1i32)?,
            _ => invocation.proceed(),
        }
        Ok(())
    }));

    assert_eq!(calc.add(1, 2), 100);
    assert_eq!(calc.divide(1, 0).unwrap(), -1);
    assert_eq!(real.calls(), 0);
}

#[test]
fn test_substituted_value_of_wrong_type_is_rejected() {
    let (real, calc) = proxied(from_fn(|invocation| {
        invocation.set_return_value("not a number")?;
        Ok(())
    }));

    match calc.divide(4, 2) {
        Err(CalcError::Proxy(err)) => assert!(err.failing_interceptor().is_some()),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(real.calls(), 0);
}

#[test]
fn test_error_fidelity() {
    let (_, calc) = proxied(PassThrough);
    let direct = BasicCalculator::default();

    let proxied_err = calc.divide(1, 0).unwrap_err();
    let direct_err = direct.divide(1, 0).unwrap_err();

    assert!(matches!(proxied_err, CalcError::DivideByZero));
    assert_eq!(proxied_err.to_string(), direct_err.to_string());
}

#[test]
fn test_interceptor_may_suppress_real_error() {
    let (_, calc) = proxied(from_fn(|invocation| {
        invocation.proceed();
        if invocation.error_as::<CalcError>().is_some() {
            invocation.set_return_value(0i32)?;
        }
        Ok(())
    }));

    assert_eq!(calc.divide(1, 0).unwrap(), 0);
}

#[test]
fn test_interceptor_failure_isolation() {
    let (real, calc) = proxied(FaultyInterceptor);

    match calc.divide(4, 2) {
        Err(CalcError::Proxy(err)) => {
            let interceptor = err.failing_interceptor().unwrap();
            assert!(interceptor.ends_with("FaultyInterceptor"));
            assert!(err.to_string().contains("FaultyInterceptor"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(real.calls(), 0);
}

#[test]
fn test_interceptor_failure_after_proceed_masks_real_outcome() {
    let (real, calc) = proxied(
        from_fn(|invocation| {
            invocation.proceed();
            anyhow::bail!("post-processing failed")
        })
        .named("post"),
    );

    match calc.divide(1, 0) {
        Err(CalcError::Proxy(err)) => assert_eq!(err.failing_interceptor(), Some("post")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(real.calls(), 1);
}

#[test]
fn test_argument_mutation() {
    let (real, calc) = proxied(from_fn(|invocation| {
        if invocation.method().name == "add" {
            let a = invocation.arguments_mut().by_name_mut("a")?;
            assert_eq!(a.value::<i32>(), Some(&2));
            a.set_value(5i32)?;
        }
        invocation.proceed();
        Ok(())
    }));

    assert_eq!(calc.add(2, 3), 8);
    assert_eq!(real.last_a.load(Ordering::SeqCst), 5);
}

#[test]
fn test_argument_lookup() {
    let method = <dyn Calculator as Contract>::info().method("transfer").unwrap();
    let values: Vec<Box<dyn ArgValue>> = vec![Box::new(250u64), Box::new("EUR".to_string())];
    let args = Arguments::bind(method, values).unwrap();

    for name in ["Amount", "amount", "AMOUNT"] {
        let by_name = args.by_name(name).unwrap();
        let by_index = args.get(0).unwrap();
        assert_eq!(by_name.position(), by_index.position());
        assert_eq!(by_name.value::<u64>(), Some(&250));
        assert_eq!(by_index.value::<u64>(), Some(&250));
    }

    assert!(args.by_name("Unknown").unwrap_err().is_range_error());
    assert!(args.get(5).unwrap_err().is_range_error());
}

#[test]
fn test_argument_lookup_inside_interceptor() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let (_, calc) = proxied(from_fn(move |invocation| {
        let currency = invocation.arguments().by_name("Currency")?;
        sink.lock().push(currency.to_string());
        invocation.proceed();
        Ok(())
    }));

    assert_eq!(calc.transfer(10, "USD".into()).unwrap(), "10 USD");
    assert_eq!(*seen.lock(), vec!["currency = \"USD\"".to_string()]);
}

#[test]
fn test_runtime_type_bypasses_interception() {
    let counting = CountingInterceptor::default();
    let (_, calc) = proxied(counting.clone());

    let runtime_type = calc.runtime_type();

    assert!(runtime_type.ends_with("BasicCalculator"));
    assert_eq!(counting.intercepted.load(Ordering::SeqCst), 0);
    assert!(<dyn Calculator as Contract>::info().is_passthrough("runtime_type"));
}

#[tokio::test]
async fn test_async_member_passes_future_through() {
    let counting = CountingInterceptor::default();
    let (real, calc) = proxied(counting.clone());

    let pending = calc.fetch(4);
    assert_eq!(counting.intercepted.load(Ordering::SeqCst), 1);
    assert_eq!(real.calls(), 1);

    assert_eq!(pending.await, 40);
}

#[tokio::test]
async fn test_async_member_substituted_future() {
    let (real, calc) = proxied(from_fn(|invocation| {
        let ready: BoxFuture<'static, u32> = Box::pin(async { 7 });
        invocation.set_return_value(ready)?;
        Ok(())
    }));

    assert_eq!(calc.fetch(1).await, 7);
    assert_eq!(real.calls(), 0);
}

#[test]
fn test_concurrent_calls_share_interceptor() {
    let counting = CountingInterceptor::default();
    let (real, calc) = proxied(counting.clone());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let calc = Arc::clone(&calc);
            thread::spawn(move || {
                for i in 0..100 {
                    assert_eq!(calc.add(worker, i), worker + i);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counting.intercepted.load(Ordering::SeqCst), 800);
    assert_eq!(real.calls(), 800);
}

#[test]
fn test_filtered_interceptor() {
    let counting = CountingInterceptor::default();
    let (real, calc) = proxied(Filtered::only_methods(counting.clone(), ["divide"]));

    calc.add(1, 1);
    calc.divide(4, 2).unwrap();

    assert_eq!(counting.intercepted.load(Ordering::SeqCst), 1);
    assert_eq!(real.calls(), 2);
}

#[test]
fn test_factory_dynamic_creation() {
    let registry = Arc::new(ContractRegistry::new());
    registry.register::<dyn Calculator>().unwrap();
    let factory = ProxyFactory::with_registry(&ProxyConfig::default(), registry);

    let counting = CountingInterceptor::default();
    let real: Arc<dyn Calculator> = Arc::new(BasicCalculator::default());

    let built = factory
        .create_dynamic("Calculator", Arc::new(counting.clone()), Box::new(real))
        .unwrap();
    let calc = built.downcast::<Arc<dyn Calculator>>().unwrap();

    assert_eq!(calc.add(20, 22), 42);
    assert_eq!(counting.intercepted.load(Ordering::SeqCst), 1);

    let missing = factory.create_dynamic(
        "Scheduler",
        Arc::new(PassThrough),
        Box::new(Arc::new(BasicCalculator::default()) as Arc<dyn Calculator>),
    );
    assert!(matches!(missing, Err(ProxyError::NotAContract(name)) if name == "Scheduler"));
}

#[test]
fn test_factory_from_config_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "metrics_enabled = false").unwrap();
    writeln!(file, "slow_call_threshold_ms = 1").unwrap();

    let config = ProxyConfig::from_file(file.path()).unwrap();
    let factory = ProxyFactory::new(&config);
    assert!(!factory.settings().metrics_enabled);

    let real: Arc<dyn Calculator> = Arc::new(BasicCalculator::default());
    let calc = factory.create_with(real, PassThrough);
    assert_eq!(calc.add(1, 1), 2);
}

#[test]
fn test_interceptor_panic_is_isolated_from_real_outcome() {
    let (real, calc) = proxied(
        from_fn(|invocation| {
            let fourth = invocation.arguments().get(3).unwrap();
            let _ = fourth.value::<String>();
            invocation.proceed();
            Ok(())
        })
        .named("argument-audit"),
    );

    match calc.transfer(10, "USD".into()) {
        Err(CalcError::Proxy(err)) => {
            assert_eq!(err.failing_interceptor(), Some("argument-audit"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(real.calls(), 0);
}

#[test]
fn test_real_method_panic_passes_through_counting_interceptor() {
    let counting = CountingInterceptor::default();
    let (_, calc) = proxied(counting.clone());

    let payload = catch_unwind(AssertUnwindSafe(|| calc.explode())).unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"calculator exploded"));
    assert_eq!(counting.intercepted.load(Ordering::SeqCst), 1);
}

mod billing {
    pub trait Service: Send + Sync {
        fn charge(&self, cents: u64) -> u64;
    }

    dynproxy::intercept_contract! {
        dyn Service {
            fn charge(&self, cents: u64) -> u64;
        }
    }

    pub struct Flat;

    impl Service for Flat {
        fn charge(&self, cents: u64) -> u64 {
            cents + 30
        }
    }
}

mod shipping {
    pub trait Service: Send + Sync {
        fn quote(&self, grams: u64) -> u64;
    }

    dynproxy::intercept_contract! {
        dyn Service {
            fn quote(&self, grams: u64) -> u64;
        }
    }

    pub struct ByWeight;

    impl Service for ByWeight {
        fn quote(&self, grams: u64) -> u64 {
            grams * 2
        }
    }
}

#[test]
fn test_factory_keeps_same_named_contracts_apart() {
    let registry = Arc::new(ContractRegistry::new());
    registry.register::<dyn billing::Service>().unwrap();
    registry.register::<dyn shipping::Service>().unwrap();
    let factory = ProxyFactory::with_registry(&ProxyConfig::default(), registry);

    let real: Arc<dyn shipping::Service> = Arc::new(shipping::ByWeight);
    let quotes = factory.create_registered(real, Arc::new(PassThrough)).unwrap();
    assert_eq!(quotes.quote(4), 8);

    let real: Arc<dyn billing::Service> = Arc::new(billing::Flat);
    let charges = factory.create_registered(real, Arc::new(PassThrough)).unwrap();
    assert_eq!(charges.charge(10), 40);

    let real: Arc<dyn billing::Service> = Arc::new(billing::Flat);
    let ambiguous = factory.create_dynamic("Service", Arc::new(PassThrough), Box::new(real));
    assert!(matches!(ambiguous, Err(ProxyError::AmbiguousContract { .. })));
}
