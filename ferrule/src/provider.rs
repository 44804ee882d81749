use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::{Context, FactoryRegistry, FactoryRegistryBuilder, RegistryError};

/// Type alias for boxed errors that can be sent across threads.
///
/// Used for every failure produced by user code: provider construction,
/// factory operations and the release hook.
pub type StdError = Box<dyn std::error::Error + Send + Sync>;

/// Registers the factory operations of a provider.
///
/// Implement it by hand or generate it with the `#[provider]` attribute on an
/// inherent `impl` block.
///
/// # Examples
///
/// ```rust
/// use ferrule::{Context, Factories, FactoryRegistryBuilder};
///
/// struct Greeting(String);
/// struct AppProvider;
///
/// impl Factories for AppProvider {
///     fn factories(registry: &mut FactoryRegistryBuilder<Self>) {
///         registry.contextual("greeting", |_provider, ctx: &Context| {
///             Greeting(format!("hello from {}", ctx.package()))
///         });
///     }
/// }
/// ```
pub trait Factories: Send + Sync + Sized + 'static {
    fn factories(registry: &mut FactoryRegistryBuilder<Self>);
}

/// The single object supplying factory operations to an [`Injector`](crate::Injector).
///
/// A provider is constructed by [`Discovery`](crate::Discovery) with the
/// application-scoped context and released with [`close`](Self::close) on
/// teardown.
///
/// # Examples
///
/// ```rust
/// use ferrule::{Context, DependencyProvider, Factories, FactoryRegistryBuilder, StdError};
///
/// struct Database {
///     url: String,
/// }
///
/// struct AppProvider {
///     url: String,
/// }
///
/// impl DependencyProvider for AppProvider {
///     fn new(ctx: &Context) -> Result<Self, StdError> {
///         let url = ctx.metadata("database_url").ok_or("database_url is not set")?;
///         Ok(Self { url: url.to_string() })
///     }
/// }
///
/// impl Factories for AppProvider {
///     fn factories(registry: &mut FactoryRegistryBuilder<Self>) {
///         registry.factory("database", |provider: &Self| Database {
///             url: provider.url.clone(),
///         });
///     }
/// }
/// ```
pub trait DependencyProvider: Factories {
    /// Constructs the provider from the application-scoped context.
    fn new(ctx: &Context) -> Result<Self, StdError>;

    /// Releases the resources owned by the provider.
    ///
    /// Called once per teardown. Errors and panics are logged by the injector.
    fn close(&self) -> Result<(), StdError> {
        Ok(())
    }
}

/// Type-erased, shared handle to a constructed provider.
#[derive(Clone)]
pub struct ProviderHandle {
    inner: Arc<dyn DynProvider>,
}

impl ProviderHandle {
    pub(crate) fn new<P>(provider: P) -> Self
    where
        P: DependencyProvider,
    {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Type name of the provider implementation.
    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    /// Returns the provider as its concrete type.
    pub fn downcast<P>(&self) -> Option<Arc<P>>
    where
        P: DependencyProvider,
    {
        self.inner.clone().into_any().downcast::<P>().ok()
    }

    pub(crate) fn registry(&self) -> Result<FactoryRegistry, RegistryError> {
        self.inner.clone().registry()
    }

    pub(crate) fn close(&self) -> Result<(), StdError> {
        self.inner.close()
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProviderHandle").field(&self.name()).finish()
    }
}

trait DynProvider: Send + Sync {
    fn registry(self: Arc<Self>) -> Result<FactoryRegistry, RegistryError>;

    fn close(&self) -> Result<(), StdError>;

    fn name(&self) -> &'static str;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T> DynProvider for T
where
    T: DependencyProvider,
{
    fn registry(self: Arc<Self>) -> Result<FactoryRegistry, RegistryError> {
        FactoryRegistry::build(self)
    }

    fn close(&self) -> Result<(), StdError> {
        T::close(self)
    }

    fn name(&self) -> &'static str {
        type_name::<T>()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
