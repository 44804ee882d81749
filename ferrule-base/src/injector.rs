use std::collections::BTreeMap;

use ferrule::{Context, ContextBuilder, DEPENDENCY_PROVIDER_KEY};
use serde::{Deserialize, Serialize};

use crate::ConfigSection;

/// Host identity and metadata used to build the injector [`Context`].
///
/// ```json
/// {
///     "injector": {
///         "package": "com.example",
///         "provider": ".AppProvider",
///         "metadata": { "database_url": "sqlite::memory:" }
///     }
/// }
/// ```
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct InjectorConfig {
    pub package: String,
    /// Provider name, stored as the dependency provider metadata entry.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ConfigSection for InjectorConfig {
    fn key() -> &'static str {
        "injector"
    }
}

impl InjectorConfig {
    /// Starts an application context builder, so that host components can
    /// still be added.
    pub fn context_builder(&self) -> ContextBuilder {
        let mut builder = Context::builder(self.package.clone());
        for (key, value) in &self.metadata {
            builder = builder.metadata(key.clone(), value.clone());
        }
        if let Some(provider) = &self.provider {
            builder = builder.metadata(DEPENDENCY_PROVIDER_KEY, provider.clone());
        }
        builder
    }

    pub fn context(&self) -> Context {
        self.context_builder().build()
    }
}
