//! # ferrule-base
//!
//! Host-side utilities for ferrule: JSON configuration sections, building the
//! injector [`Context`](ferrule::Context) from configuration and tracing
//! subscriber setup.
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrule::{Context, DEPENDENCY_PROVIDER_KEY};
//! use ferrule_base::{Config, InjectorConfig, Tracing};
//!
//! # fn main() -> Result<(), ferrule::StdError> {
//! let config = Config::parse(
//!     r#"{
//!         "injector": { "package": "com.example", "provider": ".AppProvider" },
//!         "tracing": { "level": "warn" }
//!     }"#,
//! )?;
//!
//! Tracing::init(&config)?;
//!
//! let ctx: Context = config
//!     .section::<InjectorConfig>()?
//!     .unwrap_or_default()
//!     .context();
//! assert_eq!(ctx.metadata(DEPENDENCY_PROVIDER_KEY), Some(".AppProvider"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `macros` (default): Enables `#[config_section]`

mod config;
mod injector;
mod tracing;

pub use config::*;
pub use injector::*;
pub use tracing::*;

#[cfg(feature = "macros")]
pub use ferrule_base_macros::*;
