use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::convention;
use crate::error::{Error, Result};
use crate::provider::{ProviderConfig, ProviderRegistry};

/// Which attribute maps of a batch are enriched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContextId {
    /// The attributes of each resource.
    #[default]
    Resource,
    /// The attributes of each span, metric data point or log record.
    Record,
}

impl FromStr for ContextId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "resource" => Ok(ContextId::Resource),
            "record" => Ok(ContextId::Record),
            other => Err(Error::UnknownContext(other.to_string())),
        }
    }
}

impl TryFrom<String> for ContextId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ContextId> for String {
    fn from(context: ContextId) -> Self {
        context.to_string()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextId::Resource => write!(f, "resource"),
            ContextId::Record => write!(f, "record"),
        }
    }
}

/// The candidate attribute keys probed when none are configured.
pub fn default_attributes() -> Vec<String> {
    vec![
        convention::SOURCE_ADDRESS.to_string(),
        convention::CLIENT_ADDRESS.to_string(),
    ]
}

/// Processor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub context: ContextId,

    /// Ordered candidate keys holding the source IP. The first key with a
    /// usable address wins.
    #[serde(default = "default_attributes")]
    pub attributes: Vec<String>,

    /// Raw configuration per provider type name.
    #[serde(default)]
    pub providers: BTreeMap<String, serde_json::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context: ContextId::default(),
            attributes: default_attributes(),
            providers: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a configuration file. `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_yaml_str(&contents),
        }
    }

    /// Set the raw configuration of a provider, replacing any previous entry.
    pub fn with_provider(mut self, name: impl Into<String>, raw: serde_json::Value) -> Self {
        self.providers.insert(name.into(), raw);
        self
    }

    /// The single configured provider entry.
    pub fn active_provider(&self) -> Result<(&str, &serde_json::Value)> {
        let mut entries = self.providers.iter();
        match (entries.next(), entries.next()) {
            (Some((name, raw)), None) => Ok((name.as_str(), raw)),
            _ => Err(Error::ProviderCount {
                count: self.providers.len(),
            }),
        }
    }

    /// Validates the configuration against the factories in `registry`.
    ///
    /// Returns the name of the active provider and its decoded configuration.
    pub fn validate(
        &self,
        registry: &ProviderRegistry,
    ) -> Result<(&str, Box<dyn ProviderConfig>)> {
        if self.attributes.is_empty() {
            return Err(Error::EmptyAttributes);
        }
        let (name, raw) = self.active_provider()?;
        let provider_config = registry.get(name)?.unmarshal_config(raw.clone())?;
        provider_config.validate()?;
        Ok((name, provider_config))
    }
}
