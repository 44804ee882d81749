use std::any::{Any, TypeId, type_name};
use std::collections::{HashMap, hash_map};
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::{Context, Factories, ResolveError, StdError};

/// Identifier of a produced or requested type.
///
/// Keys compare by [`TypeId`]; the type name is kept for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

type ErasedValue = Result<Box<dyn Any>, StdError>;

enum Invoker {
    Nullary(Box<dyn Fn() -> ErasedValue + Send + Sync>),
    Contextual(Box<dyn Fn(&Context) -> ErasedValue + Send + Sync>),
    Unsupported { arity: usize },
}

/// A factory operation indexed by the type it produces.
pub struct Factory {
    name: &'static str,
    produces: TypeKey,
    invoker: Invoker,
}

impl Factory {
    /// Creates a one-parameter factory whose value type is only known at run time.
    ///
    /// The produced value is not checked against `produces` here; the
    /// injector reports a mismatch when the value is consumed.
    pub fn erased<F>(name: &'static str, produces: TypeKey, f: F) -> Self
    where
        F: Fn(&Context) -> Result<Box<dyn Any>, StdError> + Send + Sync + 'static,
    {
        Self {
            name,
            produces,
            invoker: Invoker::Contextual(Box::new(f)),
        }
    }

    /// Operation name used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn produces(&self) -> TypeKey {
        self.produces
    }

    /// Number of parameters the operation declares besides the provider itself.
    pub fn arity(&self) -> usize {
        match &self.invoker {
            Invoker::Nullary(_) => 0,
            Invoker::Contextual(_) => 1,
            Invoker::Unsupported { arity } => *arity,
        }
    }

    pub(crate) fn invoke(&self, ctx: &Context) -> Result<Box<dyn Any>, ResolveError> {
        let result = match &self.invoker {
            Invoker::Nullary(f) => catch_unwind(AssertUnwindSafe(|| f())),
            Invoker::Contextual(f) => catch_unwind(AssertUnwindSafe(|| f(ctx))),
            Invoker::Unsupported { arity } => {
                return Err(ResolveError::UnsupportedArity {
                    operation: self.name,
                    type_name: self.produces.name(),
                    arity: *arity,
                });
            }
        };
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(ResolveError::Factory {
                operation: self.name,
                type_name: self.produces.name(),
                source,
            }),
            Err(payload) => Err(ResolveError::Panicked {
                operation: self.name,
                type_name: self.produces.name(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("name", &self.name)
            .field("produces", &self.produces)
            .field("arity", &self.arity())
            .finish()
    }
}

/// Collects the factory operations of provider `P`.
///
/// Every registered closure captures a shared handle to the provider, so
/// operations stay callable for as long as the registry lives.
pub struct FactoryRegistryBuilder<P> {
    provider: Arc<P>,
    factories: Vec<Factory>,
}

impl<P> FactoryRegistryBuilder<P>
where
    P: Send + Sync + 'static,
{
    /// The provider the operations are registered for.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Registers an operation without parameters.
    pub fn factory<T, F>(&mut self, name: &'static str, f: F) -> &mut Self
    where
        T: 'static,
        F: Fn(&P) -> T + Send + Sync + 'static,
    {
        self.try_factory(name, move |provider: &P| Ok::<_, Infallible>(f(provider)))
    }

    /// Registers a fallible operation without parameters.
    pub fn try_factory<T, E, F>(&mut self, name: &'static str, f: F) -> &mut Self
    where
        T: 'static,
        E: Into<StdError>,
        F: Fn(&P) -> Result<T, E> + Send + Sync + 'static,
    {
        let provider = self.provider.clone();
        self.insert(Factory {
            name,
            produces: TypeKey::of::<T>(),
            invoker: Invoker::Nullary(Box::new(move || {
                f(&provider)
                    .map(|v| Box::new(v) as Box<dyn Any>)
                    .map_err(Into::into)
            })),
        })
    }

    /// Registers an operation taking the caller's context.
    pub fn contextual<T, F>(&mut self, name: &'static str, f: F) -> &mut Self
    where
        T: 'static,
        F: Fn(&P, &Context) -> T + Send + Sync + 'static,
    {
        self.try_contextual(name, move |provider: &P, ctx: &Context| {
            Ok::<_, Infallible>(f(provider, ctx))
        })
    }

    /// Registers a fallible operation taking the caller's context.
    pub fn try_contextual<T, E, F>(&mut self, name: &'static str, f: F) -> &mut Self
    where
        T: 'static,
        E: Into<StdError>,
        F: Fn(&P, &Context) -> Result<T, E> + Send + Sync + 'static,
    {
        let provider = self.provider.clone();
        self.insert(Factory {
            name,
            produces: TypeKey::of::<T>(),
            invoker: Invoker::Contextual(Box::new(move |ctx: &Context| {
                f(&provider, ctx)
                    .map(|v| Box::new(v) as Box<dyn Any>)
                    .map_err(Into::into)
            })),
        })
    }

    /// Indexes an operation with a shape the injector cannot call.
    ///
    /// Resolving `T` through it always fails with
    /// [`ResolveError::UnsupportedArity`].
    pub fn unsupported<T>(&mut self, name: &'static str, arity: usize) -> &mut Self
    where
        T: ?Sized + 'static,
    {
        self.insert(Factory {
            name,
            produces: TypeKey::of::<T>(),
            invoker: Invoker::Unsupported { arity },
        })
    }

    pub fn insert(&mut self, factory: Factory) -> &mut Self {
        self.factories.push(factory);
        self
    }

    fn finish(self) -> Result<FactoryRegistry, RegistryError> {
        let mut factories = HashMap::with_capacity(self.factories.len());
        for factory in self.factories {
            match factories.entry(factory.produces) {
                hash_map::Entry::Occupied(v) => {
                    let first: &Factory = v.get();
                    return Err(RegistryError::Ambiguous {
                        type_name: factory.produces.name(),
                        first: first.name,
                        second: factory.name,
                    });
                }
                hash_map::Entry::Vacant(v) => {
                    v.insert(factory);
                }
            }
        }
        Ok(FactoryRegistry { factories })
    }
}

/// Immutable index from produced type to factory operation.
#[derive(Debug, Default)]
pub struct FactoryRegistry {
    factories: HashMap<TypeKey, Factory>,
}

impl FactoryRegistry {
    /// Indexes the factory operations of `provider`.
    ///
    /// Two operations producing the same type are rejected with
    /// [`RegistryError::Ambiguous`].
    pub fn build<P>(provider: Arc<P>) -> Result<Self, RegistryError>
    where
        P: Factories,
    {
        let mut builder = FactoryRegistryBuilder {
            provider,
            factories: Vec::new(),
        };
        P::factories(&mut builder);
        builder.finish()
    }

    pub fn get(&self, key: &TypeKey) -> Option<&Factory> {
        self.factories.get(key)
    }

    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.factories.contains_key(&TypeKey::of::<T>())
    }

    pub fn keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.factories.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Errors raised while indexing a provider.
#[derive(Debug)]
pub enum RegistryError {
    /// Two operations produce the same type.
    Ambiguous {
        type_name: &'static str,
        first: &'static str,
        second: &'static str,
    },
    /// Registration of the factory operations panicked.
    Panicked { message: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Ambiguous {
                type_name,
                first,
                second,
            } => write!(
                f,
                "Ambiguous factories for {type_name}: {first} and {second}"
            ),
            RegistryError::Panicked { message } => {
                write!(f, "Factory registration panicked: {message}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(v) = payload.downcast_ref::<&'static str>() {
        (*v).to_string()
    } else if let Some(v) = payload.downcast_ref::<String>() {
        v.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
