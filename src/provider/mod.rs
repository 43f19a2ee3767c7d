use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use tokio_util::sync::CancellationToken;

use crate::attributes::AttributeSet;
use crate::error::{Error, Result};

pub mod maxmind;

/// Configuration of a single provider type.
pub trait ProviderConfig: fmt::Debug + Send + Sync {
    /// Reports whether the configuration is usable.
    fn validate(&self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Resolves the autonomous system an IP address belongs to.
///
/// Implementations are shared across concurrently processed batches and
/// must be safe for concurrent read-only use.
pub trait AsProvider: fmt::Debug + Send + Sync {
    /// Returns the autonomous system attributes for `ip`.
    ///
    /// [`Error::NoMetadataFound`] signals that the address is valid but the
    /// provider holds nothing for it. Providers backed by slow I/O should
    /// return [`Error::Cancelled`] once `cancel` fires.
    fn autonomous_system(&self, cancel: &CancellationToken, ip: IpAddr) -> Result<AttributeSet>;
}

/// Host settings handed to factories at creation time.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Identifier of the processor instance, used in log events.
    pub id: String,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            id: "asenrich".to_string(),
        }
    }
}

/// Creates provider configurations and providers of one type.
pub trait ProviderFactory: Send + Sync {
    /// Creates the default configuration for the provider.
    fn create_default_config(&self) -> Box<dyn ProviderConfig>;

    /// Decodes a raw configuration body. `null` yields the default config.
    fn unmarshal_config(&self, raw: serde_json::Value) -> Result<Box<dyn ProviderConfig>>;

    /// Creates a provider from a configuration produced by this factory.
    ///
    /// `cancel` bounds any setup work, such as opening or fetching a database.
    fn create_provider(
        &self,
        cancel: &CancellationToken,
        settings: &ProcessorSettings,
        config: &dyn ProviderConfig,
    ) -> Result<Box<dyn AsProvider>>;
}

/// Registry of provider factories keyed by provider type name.
///
/// Built once while composing the process and only read afterwards.
pub struct ProviderRegistry {
    factories: HashMap<String, Box<dyn ProviderFactory>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("factories", &self.names())
            .finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .factories
            .insert(maxmind::TYPE_STR.to_string(), Box::new(maxmind::Factory));
        registry
    }
}

impl ProviderRegistry {
    /// A registry without any built-in factories.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a new factory under a unique name.
    pub fn register(&mut self, name: impl Into<String>, factory: Box<dyn ProviderFactory>) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::DuplicateProvider { name });
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Get the factory registered under `name`.
    pub fn get(&self, name: &str) -> Result<&dyn ProviderFactory> {
        self.factories
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| Error::UnknownProvider {
                name: name.to_string(),
            })
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Macro to register a provider factory.
///
/// # Examples
///
/// ```
/// # use asenrich::register_provider;
/// # use asenrich::provider::{maxmind, ProviderRegistry};
/// let mut registry = ProviderRegistry::empty();
/// register_provider!(registry, "maxmind", maxmind::Factory).unwrap();
/// assert_eq!(registry.names(), vec!["maxmind".to_string()]);
/// ```
#[macro_export]
macro_rules! register_provider {
    ($registry:expr, $name:expr, $factory:expr) => {
        $registry.register($name, Box::new($factory))
    };
}
