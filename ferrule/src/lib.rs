//! # ferrule
//!
//! A lazy, type-keyed dependency resolution engine. An [`Injector`] discovers
//! the single dependency provider configured for the host, indexes the
//! provider's factory operations by the type they produce and resolves
//! dependencies for arbitrary consumers on demand.
//!
//! ## Core Concepts
//!
//! - **Context**: Opaque host handle carrying the package name, metadata and host components
//! - **DependencyProvider**: The user type supplying factory operations
//! - **Discovery**: Catalog selecting the provider named in host metadata
//! - **FactoryRegistry**: Index from produced type to factory operation
//! - **Injector**: Initializes once, resolves by type, populates attributes, tears down
//! - **Attribute**: A named, typed slot on a consumer, populated by the injector
//!
//! ## Basic Usage
//!
//! ```rust
//! use ferrule::{Context, DEPENDENCY_PROVIDER_KEY, DependencyProvider, Discovery};
//! use ferrule::{Factories, FactoryRegistryBuilder, Injector, StdError};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct AppProvider {
//!     database: Arc<Database>,
//! }
//!
//! impl DependencyProvider for AppProvider {
//!     fn new(ctx: &Context) -> Result<Self, StdError> {
//!         let url = format!("sqlite://{}.db", ctx.package());
//!         Ok(Self {
//!             database: Arc::new(Database { url }),
//!         })
//!     }
//! }
//!
//! impl Factories for AppProvider {
//!     fn factories(registry: &mut FactoryRegistryBuilder<Self>) {
//!         registry.factory("database", |provider: &Self| provider.database.clone());
//!     }
//! }
//!
//! let injector = Injector::new(Discovery::new().with::<AppProvider>("com.example.AppProvider"));
//! let ctx = Context::builder("com.example")
//!     .metadata(DEPENDENCY_PROVIDER_KEY, ".AppProvider")
//!     .build();
//!
//! let database = injector.get::<Arc<Database>>(&ctx).unwrap();
//! assert_eq!(database.url, "sqlite://com.example.db");
//! injector.teardown();
//! ```
//!
//! ## Using Macros
//!
//! With the `macros` feature enabled, factory operations are collected from an
//! `impl` block and attributes from struct fields:
//!
//! ```rust
//! use ferrule::{Context, DEPENDENCY_PROVIDER_KEY, DependencyProvider, Discovery};
//! use ferrule::{Inject, Injector, StdError, provider};
//!
//! #[derive(Clone)]
//! struct Greeting(String);
//!
//! struct AppProvider;
//!
//! impl DependencyProvider for AppProvider {
//!     fn new(_ctx: &Context) -> Result<Self, StdError> {
//!         Ok(Self)
//!     }
//! }
//!
//! #[provider]
//! impl AppProvider {
//!     pub fn greeting(&self, ctx: &Context) -> Greeting {
//!         Greeting(format!("Hello from {}", ctx.package()))
//!     }
//! }
//!
//! #[derive(Default, Inject)]
//! struct Screen {
//!     #[inject]
//!     greeting: Option<Greeting>,
//! }
//!
//! let injector = Injector::new(Discovery::new().with::<AppProvider>("demo.AppProvider"));
//! let ctx = Context::builder("demo")
//!     .metadata(DEPENDENCY_PROVIDER_KEY, ".AppProvider")
//!     .build();
//!
//! let mut screen = Screen::default();
//! assert_eq!(injector.inject(&ctx.child("screen"), &mut screen), 1);
//! assert_eq!(screen.greeting.unwrap().0, "Hello from demo");
//! ```
//!
//! ## Features
//!
//! - `macros` (default): Enables `#[provider]` and `#[derive(Inject)]`

mod attribute;
mod context;
mod discovery;
mod injector;
mod provider;
mod registry;
mod resolution;

pub use attribute::*;
pub use context::*;
pub use discovery::*;
pub use injector::*;
pub use provider::*;
pub use registry::{Factory, FactoryRegistry, FactoryRegistryBuilder, RegistryError, TypeKey};
pub use resolution::*;

#[cfg(feature = "macros")]
pub use ferrule_macros::*;
