use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, HashMap, hash_map};
use std::fmt;
use std::sync::Arc;

/// Opaque host handle passed to provider discovery and to factory operations.
///
/// A context is cheap to clone. The root context is application-scoped and
/// owns the host metadata and components; child contexts created with
/// [`Context::child`] are component-scoped and share everything with the root.
///
/// # Examples
///
/// ```rust
/// use ferrule::{Context, DEPENDENCY_PROVIDER_KEY};
///
/// let app = Context::builder("com.example")
///     .metadata(DEPENDENCY_PROVIDER_KEY, ".AppProvider")
///     .add_component(8080u16)
///     .build();
///
/// let screen = app.child("main-screen");
/// assert!(!screen.is_application());
/// assert!(screen.application().is_application());
/// assert_eq!(screen.get_component::<u16>(), Some(8080));
/// ```
#[derive(Clone)]
pub struct Context {
    host: Arc<Host>,
    scope: Scope,
}

struct Host {
    package: String,
    metadata: BTreeMap<String, String>,
    components: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

/// Lifetime scope of a [`Context`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Lives as long as the host process.
    Application,
    /// Short-lived host component such as a screen or a request.
    Component(Arc<str>),
}

impl Context {
    /// Creates a builder for an application-scoped context.
    pub fn builder(package: impl Into<String>) -> ContextBuilder {
        ContextBuilder {
            package: package.into(),
            metadata: BTreeMap::new(),
            components: HashMap::new(),
        }
    }

    /// Creates a component-scoped context sharing this context's host.
    pub fn child(&self, name: impl Into<Arc<str>>) -> Context {
        Context {
            host: self.host.clone(),
            scope: Scope::Component(name.into()),
        }
    }

    /// Returns the application-scoped context of this host.
    pub fn application(&self) -> Context {
        Context {
            host: self.host.clone(),
            scope: Scope::Application,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_application(&self) -> bool {
        self.scope == Scope::Application
    }

    /// Namespace used to resolve relative names.
    pub fn package(&self) -> &str {
        &self.host.package
    }

    /// Returns a host metadata entry.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.host.metadata.get(key).map(String::as_str)
    }

    /// Returns `true` when both contexts belong to the same host.
    pub fn same_host(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.host, &other.host)
    }

    pub fn get_component<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.get_component_ref().cloned()
    }

    pub fn get_component_ref<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.host
            .components
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    pub fn has_component<T>(&self) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.host.components.contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("package", &self.host.package)
            .field("scope", &self.scope)
            .field("metadata", &self.host.metadata)
            .finish_non_exhaustive()
    }
}

/// Builder for the application-scoped [`Context`].
pub struct ContextBuilder {
    package: String,
    metadata: BTreeMap<String, String>,
    components: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ContextBuilder {
    /// Sets a host metadata entry, replacing any previous value.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Adds a host component.
    ///
    /// # Panics
    ///
    /// Panics if a component of the same type has already been added.
    pub fn add_component<T>(mut self, component: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        match self.components.entry(TypeId::of::<T>()) {
            hash_map::Entry::Occupied(_) => panic!("Component {} already added", type_name::<T>()),
            hash_map::Entry::Vacant(v) => {
                v.insert(Box::new(component));
            }
        };
        self
    }

    pub fn build(self) -> Context {
        Context {
            host: Arc::new(Host {
                package: self.package,
                metadata: self.metadata,
                components: self.components,
            }),
            scope: Scope::Application,
        }
    }
}
