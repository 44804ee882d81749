use std::error::Error as _;
use std::sync::Arc;

use ferrule::{
    Context, DEPENDENCY_PROVIDER_KEY, DependencyProvider, Discovery, DiscoveryError, Factories,
    FactoryRegistry, FactoryRegistryBuilder, RegistryError, Scope, StdError, TypeKey,
};

struct AppProvider {
    scope: Scope,
}

impl DependencyProvider for AppProvider {
    fn new(ctx: &Context) -> Result<Self, StdError> {
        Ok(Self {
            scope: ctx.scope().clone(),
        })
    }
}

impl Factories for AppProvider {
    fn factories(registry: &mut FactoryRegistryBuilder<Self>) {
        registry
            .factory("port", |_provider: &Self| 8080u16)
            .contextual("package", |_provider: &Self, ctx: &Context| {
                ctx.package().to_string()
            })
            .unsupported::<Vec<u8>>("payload", 3);
    }
}

struct FailingProvider;

impl DependencyProvider for FailingProvider {
    fn new(ctx: &Context) -> Result<Self, StdError> {
        match ctx.metadata("mode") {
            Some("panic") => panic!("Constructor panic"),
            _ => Err("Database is not available".into()),
        }
    }
}

impl Factories for FailingProvider {
    fn factories(_registry: &mut FactoryRegistryBuilder<Self>) {}
}

fn new_discovery() -> Discovery {
    Discovery::new()
        .with::<AppProvider>("com.example.AppProvider")
        .with::<FailingProvider>("com.example.FailingProvider")
}

fn new_context(provider: Option<&str>) -> Context {
    let mut builder = Context::builder("com.example");
    if let Some(provider) = provider {
        builder = builder.metadata(DEPENDENCY_PROVIDER_KEY, provider);
    }
    builder.build()
}

#[test]
fn test_resolve_name() {
    let ctx = new_context(None);
    assert_eq!(
        Discovery::resolve_name(&ctx, ".AppProvider"),
        "com.example.AppProvider"
    );
    assert_eq!(
        Discovery::resolve_name(&ctx, "com.other.Provider"),
        "com.other.Provider"
    );
    assert_eq!(Discovery::resolve_name(&ctx, "."), "com.example.");
}

#[test]
fn test_discover_relative_and_absolute() {
    let discovery = new_discovery();
    for name in [".AppProvider", "com.example.AppProvider"] {
        let provider = discovery.try_discover(&new_context(Some(name))).unwrap();
        assert!(provider.name().ends_with("AppProvider"));
        assert!(provider.downcast::<AppProvider>().is_some());
        assert!(provider.downcast::<FailingProvider>().is_none());
    }
}

#[test]
fn test_discover_uses_application_scope() {
    let discovery = new_discovery();
    let ctx = new_context(Some(".AppProvider")).child("screen");
    let provider = discovery.discover(&ctx).unwrap();
    assert_eq!(provider.downcast::<AppProvider>().unwrap().scope, Scope::Application);
}

#[test]
fn test_discover_missing_configuration() {
    let discovery = new_discovery();
    let ctx = new_context(None);
    assert!(matches!(
        discovery.try_discover(&ctx),
        Err(DiscoveryError::MissingConfiguration)
    ));
    assert!(discovery.discover(&ctx).is_none());
}

#[test]
fn test_discover_unknown_provider() {
    let discovery = new_discovery();
    let ctx = new_context(Some(".MissingProvider"));
    match discovery.try_discover(&ctx) {
        Err(DiscoveryError::UnknownProvider { name }) => {
            assert_eq!(name, "com.example.MissingProvider");
        }
        other => panic!("Unexpected discovery: {other:?}"),
    }
    assert!(discovery.discover(&ctx).is_none());
}

#[test]
fn test_discover_constructor_error() {
    let discovery = new_discovery();
    let ctx = new_context(Some(".FailingProvider"));
    let err = discovery.try_discover(&ctx).unwrap_err();
    assert!(matches!(err, DiscoveryError::Construction { .. }));
    assert_eq!(
        err.source().map(|v| v.to_string()).as_deref(),
        Some("Database is not available")
    );
    assert!(discovery.discover(&ctx).is_none());
}

#[test]
fn test_discover_constructor_panic() {
    let discovery = new_discovery();
    let ctx = Context::builder("com.example")
        .metadata(DEPENDENCY_PROVIDER_KEY, ".FailingProvider")
        .metadata("mode", "panic")
        .build();
    match discovery.try_discover(&ctx) {
        Err(DiscoveryError::Panicked { name, message }) => {
            assert_eq!(name, "com.example.FailingProvider");
            assert_eq!(message, "Constructor panic");
        }
        other => panic!("Unexpected discovery: {other:?}"),
    }
}

#[test]
#[should_panic(expected = "already registered")]
fn test_register_duplicate_name() {
    let mut discovery = Discovery::new();
    discovery
        .register::<AppProvider>("com.example.AppProvider")
        .register::<FailingProvider>("com.example.AppProvider");
}

#[test]
fn test_registry_build() {
    let registry = FactoryRegistry::build(Arc::new(AppProvider {
        scope: Scope::Application,
    }))
    .unwrap();

    assert_eq!(registry.len(), 3);
    assert!(registry.contains::<u16>());
    assert!(registry.contains::<String>());
    assert!(!registry.contains::<u32>());

    let port = registry.get(&TypeKey::of::<u16>()).unwrap();
    assert_eq!(port.name(), "port");
    assert_eq!(port.arity(), 0);
    assert_eq!(registry.get(&TypeKey::of::<String>()).unwrap().arity(), 1);

    let payload = registry.get(&TypeKey::of::<Vec<u8>>()).unwrap();
    assert_eq!(payload.arity(), 3);
    assert_eq!(payload.produces(), TypeKey::of::<Vec<u8>>());
}

struct DuplicateProvider;

impl Factories for DuplicateProvider {
    fn factories(registry: &mut FactoryRegistryBuilder<Self>) {
        registry
            .factory("first", |_provider: &Self| 1u8)
            .factory("second", |_provider: &Self| 2u8);
    }
}

#[test]
fn test_registry_rejects_duplicates() {
    match FactoryRegistry::build(Arc::new(DuplicateProvider)) {
        Err(err @ RegistryError::Ambiguous { .. }) => {
            assert_eq!(err.to_string(), "Ambiguous factories for u8: first and second");
        }
        other => panic!("Unexpected registry: {other:?}"),
    }
}

#[test]
fn test_type_key() {
    assert_eq!(TypeKey::of::<u8>(), TypeKey::of::<u8>());
    assert_ne!(TypeKey::of::<u8>(), TypeKey::of::<u16>());
    assert_eq!(TypeKey::of::<String>().to_string(), "alloc::string::String");
}

#[test]
fn test_context_scopes() {
    let ctx = Context::builder("com.example")
        .metadata("region", "eu")
        .add_component(Arc::new(5u32))
        .build();
    let child = ctx.child("screen");

    assert!(ctx.is_application());
    assert_eq!(*child.scope(), Scope::Component("screen".into()));
    assert!(child.same_host(&ctx));
    assert!(!ctx.same_host(&Context::builder("com.example").build()));
    assert_eq!(child.package(), "com.example");
    assert_eq!(child.metadata("region"), Some("eu"));
    assert_eq!(child.metadata("missing"), None);
    assert_eq!(*child.get_component::<Arc<u32>>().unwrap(), 5);
    assert!(!child.has_component::<u32>());
}

#[test]
#[should_panic(expected = "already added")]
fn test_context_duplicate_component() {
    Context::builder("com.example")
        .add_component(1u8)
        .add_component(2u8);
}
