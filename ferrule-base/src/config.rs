use std::collections::BTreeMap;
use std::path::Path;

use ferrule::StdError;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Host configuration made of named JSON sections.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub(crate) sections: BTreeMap<String, serde_json::Value>,
}

/// A typed configuration section stored under a fixed key.
pub trait ConfigSection: DeserializeOwned {
    fn key() -> &'static str;
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserializes the value stored under `name`; a missing entry reads as `null`.
    pub fn get<T>(&self, name: impl AsRef<str>) -> Result<T, StdError>
    where
        T: DeserializeOwned,
    {
        let value = self
            .sections
            .get(name.as_ref())
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    /// Reads section `T`, returning `None` when it is absent.
    pub fn section<T>(&self) -> Result<Option<T>, StdError>
    where
        T: ConfigSection,
    {
        self.get::<Option<T>>(T::key())
    }

    /// Merges `other` into this config: objects merge by key, arrays are
    /// concatenated and any other value replaces the current one.
    pub fn merge_from(&mut self, other: Self) {
        for (key, value) in other.sections {
            let entry = self.sections.entry(key).or_insert(serde_json::Value::Null);
            merge_json(entry, value);
        }
    }

    pub fn parse(text: impl AsRef<str>) -> Result<Self, StdError> {
        Ok(serde_json::from_str(text.as_ref())?)
    }

    pub async fn parse_file(path: impl AsRef<Path>) -> Result<Self, StdError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading config file");
        let text = tokio::fs::read_to_string(path).await?;
        Self::parse(text)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }
}

fn merge_json(lhs: &mut serde_json::Value, rhs: serde_json::Value) {
    match (lhs, rhs) {
        (serde_json::Value::Object(l), serde_json::Value::Object(r)) => {
            for (key, value) in r {
                merge_json(l.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (serde_json::Value::Array(l), serde_json::Value::Array(r)) => l.extend(r),
        (lhs, rhs) => *lhs = rhs,
    }
}
