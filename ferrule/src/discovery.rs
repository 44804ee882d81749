use std::collections::{HashMap, hash_map};
use std::error::Error as _;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::registry::panic_message;
use crate::{Context, DependencyProvider, ProviderHandle, StdError};

/// Metadata key naming the dependency provider of the host.
pub const DEPENDENCY_PROVIDER_KEY: &str = "ferrule_dependency_provider";

type Constructor = fn(&Context) -> Result<ProviderHandle, StdError>;

/// Catalog of provider implementations the host can select by name.
///
/// The host metadata entry [`DEPENDENCY_PROVIDER_KEY`] picks one of the
/// registered names. Names starting with `.` are relative to the host
/// package.
///
/// # Examples
///
/// ```rust
/// use ferrule::{Context, DEPENDENCY_PROVIDER_KEY, DependencyProvider, Discovery};
/// use ferrule::{Factories, FactoryRegistryBuilder, StdError};
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
///     fn factories(_registry: &mut FactoryRegistryBuilder<Self>) {}
/// }
///
/// let discovery = Discovery::new().with::<AppProvider>("com.example.AppProvider");
/// let ctx = Context::builder("com.example")
///     .metadata(DEPENDENCY_PROVIDER_KEY, ".AppProvider")
///     .build();
///
/// let provider = discovery.discover(&ctx).unwrap();
/// assert!(provider.downcast::<AppProvider>().is_some());
/// ```
#[derive(Default)]
pub struct Discovery {
    constructors: HashMap<String, Constructor>,
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers provider `P` under its fully qualified name.
    ///
    /// # Panics
    ///
    /// Panics if the name has already been registered.
    pub fn register<P>(&mut self, name: impl Into<String>) -> &mut Self
    where
        P: DependencyProvider,
    {
        match self.constructors.entry(name.into()) {
            hash_map::Entry::Occupied(v) => panic!("Provider {} already registered", v.key()),
            hash_map::Entry::Vacant(v) => {
                v.insert(construct::<P>);
            }
        };
        self
    }

    /// Same as [`register`](Self::register), by value.
    pub fn with<P>(mut self, name: impl Into<String>) -> Self
    where
        P: DependencyProvider,
    {
        self.register::<P>(name);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Expands a relative provider name against the host package.
    pub fn resolve_name(ctx: &Context, name: &str) -> String {
        if name.starts_with('.') {
            format!("{}{}", ctx.package(), name)
        } else {
            name.to_string()
        }
    }

    /// Locates and constructs the configured provider.
    ///
    /// The provider receives the application-scoped context regardless of
    /// the scope of `ctx`.
    pub fn try_discover(&self, ctx: &Context) -> Result<ProviderHandle, DiscoveryError> {
        let name = ctx
            .metadata(DEPENDENCY_PROVIDER_KEY)
            .ok_or(DiscoveryError::MissingConfiguration)?;
        let name = Self::resolve_name(ctx, name);
        let constructor = match self.constructors.get(&name) {
            Some(v) => v,
            None => return Err(DiscoveryError::UnknownProvider { name }),
        };
        let application = ctx.application();
        match catch_unwind(AssertUnwindSafe(|| constructor(&application))) {
            Ok(Ok(provider)) => Ok(provider),
            Ok(Err(source)) => Err(DiscoveryError::Construction { name, source }),
            Err(payload) => Err(DiscoveryError::Panicked {
                name,
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    /// Same as [`try_discover`](Self::try_discover), logging failures instead
    /// of returning them.
    pub fn discover(&self, ctx: &Context) -> Option<ProviderHandle> {
        match self.try_discover(ctx) {
            Ok(provider) => {
                tracing::debug!(provider = provider.name(), "Dependency provider discovered");
                Some(provider)
            }
            Err(DiscoveryError::MissingConfiguration) => {
                tracing::error!(
                    key = DEPENDENCY_PROVIDER_KEY,
                    "No dependency provider configured in host metadata"
                );
                None
            }
            Err(err) => {
                tracing::error!(error = %err, "Not a valid dependency provider");
                if let Some(source) = err.source() {
                    tracing::debug!(error = ?source, "Dependency provider construction error");
                }
                None
            }
        }
    }
}

fn construct<P>(ctx: &Context) -> Result<ProviderHandle, StdError>
where
    P: DependencyProvider,
{
    Ok(ProviderHandle::new(<P as DependencyProvider>::new(ctx)?))
}

/// Reasons discovery did not produce a provider.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The host metadata does not name a provider.
    MissingConfiguration,
    /// No provider is registered under the configured name.
    UnknownProvider { name: String },
    /// The provider constructor returned an error.
    Construction { name: String, source: StdError },
    /// The provider constructor panicked.
    Panicked { name: String, message: String },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::MissingConfiguration => write!(
                f,
                "Missing \"{DEPENDENCY_PROVIDER_KEY}\" entry in host metadata"
            ),
            DiscoveryError::UnknownProvider { name } => write!(f, "Unknown provider: {name}"),
            DiscoveryError::Construction { name, source } => {
                write!(f, "Cannot construct provider {name}: {source}")
            }
            DiscoveryError::Panicked { name, message } => {
                write!(f, "Provider {name} panicked during construction: {message}")
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::Construction { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
