use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::registry::panic_message;
use crate::{
    Attribute, Context, DependencyProvider, Discovery, FactoryRegistry, Injectable,
    ProviderHandle, RegistryError, Resolution, ResolveError, TypeKey,
};

/// Lazy, type-keyed dependency resolution engine.
///
/// The injector discovers its provider on first use, indexes the provider's
/// factory operations by produced type and resolves dependencies on demand.
/// It is meant to be created once by the host and shared, usually behind an
/// `Arc`.
///
/// Resolution never fails the caller: a missing provider, an unknown type or
/// a failing factory all end up as [`Resolution::NotFound`] or
/// [`Resolution::Failed`], and injection reports `false`.
///
/// # Examples
///
/// ```rust
/// use ferrule::{Context, DEPENDENCY_PROVIDER_KEY, DependencyProvider, Discovery};
/// use ferrule::{Factories, FactoryRegistryBuilder, Injector, StdError};
///
/// #[derive(Debug, PartialEq)]
/// struct Port(u16);
///
/// struct AppProvider;
///
/// impl DependencyProvider for AppProvider {
///     fn new(_ctx: &Context) -> Result<Self, StdError> {
///         Ok(Self)
///     }
/// }
///
/// impl Factories for AppProvider {
///     fn factories(registry: &mut FactoryRegistryBuilder<Self>) {
///         registry.factory("port", |_provider: &Self| Port(8080));
///     }
/// }
///
/// let injector = Injector::new(Discovery::new().with::<AppProvider>("app.AppProvider"));
/// let ctx = Context::builder("app")
///     .metadata(DEPENDENCY_PROVIDER_KEY, ".AppProvider")
///     .build();
///
/// assert_eq!(injector.get::<Port>(&ctx), Some(Port(8080)));
/// assert_eq!(injector.get::<String>(&ctx), None);
/// injector.teardown();
/// ```
pub struct Injector {
    discovery: Discovery,
    initialized: AtomicBool,
    init_lock: Mutex<()>,
    state: RwLock<Option<Arc<State>>>,
}

struct State {
    provider: Option<ProviderHandle>,
    registry: FactoryRegistry,
}

impl State {
    fn empty() -> Self {
        Self {
            provider: None,
            registry: FactoryRegistry::default(),
        }
    }
}

impl Injector {
    pub fn new(discovery: Discovery) -> Self {
        Self {
            discovery,
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            state: RwLock::new(None),
        }
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Discovers the provider and builds the registry, once.
    ///
    /// Concurrent callers block until the first one finishes and then observe
    /// the complete registry. Calls after initialization only read an atomic
    /// flag.
    pub fn ensure_initialized(&self, ctx: &Context) {
        if self.initialized.load(Ordering::Acquire) {
            return;
        }
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.initialized.load(Ordering::Acquire) {
            return;
        }
        let state = self.initialize(ctx);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(state));
        self.initialized.store(true, Ordering::Release);
    }

    fn initialize(&self, ctx: &Context) -> State {
        let span = tracing::info_span!("injector", package = ctx.package());
        let provider = match self.discovery.discover(ctx) {
            Some(v) => v,
            None => {
                tracing::warn!(parent: &span, "Injector initialized without provider");
                return State::empty();
            }
        };
        let registry = catch_unwind(AssertUnwindSafe(|| provider.registry())).unwrap_or_else(
            |payload| {
                Err(RegistryError::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            },
        );
        match registry {
            Ok(registry) => {
                tracing::info!(
                    parent: &span,
                    provider = provider.name(),
                    factories = registry.len(),
                    "Injector initialized"
                );
                State {
                    provider: Some(provider),
                    registry,
                }
            }
            Err(err) => {
                tracing::error!(
                    parent: &span,
                    provider = provider.name(),
                    error = %err,
                    "Cannot index dependency provider"
                );
                release(&provider);
                State::empty()
            }
        }
    }

    fn current_state(&self, ctx: &Context) -> Option<Arc<State>> {
        self.ensure_initialized(ctx);
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolves a value of type `T`.
    ///
    /// Failures are logged and returned, never cached: the next call invokes
    /// the factory again.
    pub fn resolve<T>(&self, ctx: &Context) -> Resolution<T>
    where
        T: 'static,
    {
        match self.resolve_erased(ctx, TypeKey::of::<T>()) {
            Resolution::Found((operation, value)) => match value.downcast::<T>() {
                Ok(v) => Resolution::Found(*v),
                Err(_) => {
                    let err = ResolveError::TypeMismatch {
                        operation,
                        expected: TypeKey::of::<T>().name(),
                    };
                    tracing::error!(operation, error = %err, "No valid dependency factory");
                    Resolution::Failed(err)
                }
            },
            Resolution::NotFound => Resolution::NotFound,
            Resolution::Failed(err) => Resolution::Failed(err),
        }
    }

    /// Resolves a value of type `T`, discarding the failure cause.
    pub fn get<T>(&self, ctx: &Context) -> Option<T>
    where
        T: 'static,
    {
        self.resolve(ctx).ok()
    }

    fn resolve_erased(
        &self,
        ctx: &Context,
        key: TypeKey,
    ) -> Resolution<(&'static str, Box<dyn Any>)> {
        let state = match self.current_state(ctx) {
            Some(v) => v,
            None => return Resolution::NotFound,
        };
        if state.provider.is_none() {
            return Resolution::NotFound;
        }
        let factory = match state.registry.get(&key) {
            Some(v) => v,
            None => return Resolution::NotFound,
        };
        match factory.invoke(ctx) {
            Ok(value) => Resolution::Found((factory.name(), value)),
            Err(err) => {
                tracing::error!(
                    operation = factory.name(),
                    type_name = key.name(),
                    error = %err,
                    "No valid dependency factory"
                );
                Resolution::Failed(err)
            }
        }
    }

    /// Resolves the declared type of `attribute` and binds it on `target`.
    ///
    /// Returns `true` only if a value was both resolved and bound.
    pub fn inject_into<T>(&self, ctx: &Context, target: &mut T, attribute: &Attribute<T>) -> bool
    where
        T: 'static,
    {
        match self.resolve_erased(ctx, attribute.key()) {
            Resolution::Found((_, value)) => attribute.bind(target, value),
            Resolution::NotFound | Resolution::Failed(_) => false,
        }
    }

    /// Injects every attribute of `target`, returning the number bound.
    pub fn inject<T>(&self, ctx: &Context, target: &mut T) -> usize
    where
        T: Injectable,
    {
        let mut injected = 0;
        for attribute in T::attributes() {
            if self.inject_into(ctx, target, &attribute) {
                injected += 1;
            }
        }
        injected
    }

    /// Returns the current provider as its concrete type.
    ///
    /// Does not trigger initialization.
    pub fn provider<P>(&self) -> Option<Arc<P>>
    where
        P: DependencyProvider,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.as_ref()?.provider.as_ref()?.downcast::<P>()
    }

    /// Types resolvable in the current initialization cycle.
    pub fn registered_types(&self) -> Vec<TypeKey> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match state.as_ref() {
            Some(v) => v.registry.keys().collect(),
            None => Vec::new(),
        }
    }

    /// Releases the provider and returns to the uninitialized state.
    ///
    /// The next [`ensure_initialized`](Self::ensure_initialized) discovers
    /// the provider again. Must not race with resolutions in progress:
    /// those keep using the released provider until they return.
    pub fn teardown(&self) {
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.initialized.store(false, Ordering::Release);
        if let Some(provider) = state.as_ref().and_then(|v| v.provider.as_ref()) {
            release(provider);
        }
    }
}

impl Drop for Injector {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn release(provider: &ProviderHandle) {
    match catch_unwind(AssertUnwindSafe(|| provider.close())) {
        Ok(Ok(())) => {
            tracing::debug!(provider = provider.name(), "Dependency provider released");
        }
        Ok(Err(err)) => {
            tracing::error!(
                provider = provider.name(),
                error = %err,
                "Cannot release dependency provider"
            );
        }
        Err(payload) => {
            tracing::error!(
                provider = provider.name(),
                panic = %panic_message(payload.as_ref()),
                "Dependency provider panicked on release"
            );
        }
    }
}
