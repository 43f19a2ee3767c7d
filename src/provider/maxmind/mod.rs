//! Provider backed by a local MaxMind ASN or ISP database.

use std::any::Any;
use std::net::IpAddr;
use std::path::Path;

use maxminddb::{Mmap, Reader};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::attributes::AttributeSet;
use crate::error::{Error, Result};
use crate::provider::{AsProvider, ProcessorSettings, ProviderConfig, ProviderFactory};

pub mod database;

pub use database::{AsnDatabase, AsnLookup, AsnRecord};

#[cfg(test)]
pub(crate) mod mmdb_writer;

/// Name of the provider in the `providers` configuration mapping.
pub const TYPE_STR: &str = "maxmind";

/// Configuration of the MaxMind provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Path to a `GeoLite2-ASN` or `GeoIP2-ISP` database file.
    #[serde(default)]
    pub database_path: String,
}

impl ProviderConfig for Config {
    fn validate(&self) -> Result<()> {
        if self.database_path.is_empty() {
            return Err(Error::InvalidProviderConfig {
                name: TYPE_STR.to_string(),
                reason: "a local asn database path must be provided".to_string(),
            });
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory for the MaxMind provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct Factory;

impl ProviderFactory for Factory {
    fn create_default_config(&self) -> Box<dyn ProviderConfig> {
        Box::new(Config::default())
    }

    fn unmarshal_config(&self, raw: serde_json::Value) -> Result<Box<dyn ProviderConfig>> {
        if raw.is_null() {
            return Ok(self.create_default_config());
        }
        let config: Config = serde_json::from_value(raw)?;
        Ok(Box::new(config))
    }

    fn create_provider(
        &self,
        cancel: &CancellationToken,
        settings: &ProcessorSettings,
        config: &dyn ProviderConfig,
    ) -> Result<Box<dyn AsProvider>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let config = config
            .as_any()
            .downcast_ref::<Config>()
            .ok_or_else(|| Error::InvalidProviderConfig {
                name: TYPE_STR.to_string(),
                reason: format!("unexpected configuration type {:?}", config),
            })?;

        let provider = MaxMindProvider::open(&config.database_path)?;
        tracing::info!(
            processor = %settings.id,
            database_type = provider.database_type(),
            path = %config.database_path,
            "opened asn database"
        );
        Ok(Box::new(provider))
    }
}

/// Autonomous system provider over a MaxMind format database.
///
/// The database handle is owned by the provider and released on drop.
#[derive(Debug)]
pub struct MaxMindProvider<D = Reader<Mmap>> {
    lookup: AsnLookup<D>,
}

impl MaxMindProvider<Reader<Mmap>> {
    /// Memory-map the database at `path`.
    ///
    /// The file must not be truncated or rewritten in place while the
    /// provider is alive. Database updates are expected to replace the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        // SAFETY: the mapping is only read, and the file is not modified in
        // place for the lifetime of the reader (see above).
        let reader = unsafe { Reader::open_mmap(path) }.map_err(|source| Error::DatabaseOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_database(reader))
    }
}

impl<D: AsnDatabase> MaxMindProvider<D> {
    pub fn from_database(db: D) -> Self {
        Self {
            lookup: AsnLookup::new(db),
        }
    }

    pub fn database_type(&self) -> &str {
        self.lookup.database_type()
    }
}

impl<D: AsnDatabase> AsProvider for MaxMindProvider<D> {
    fn autonomous_system(&self, cancel: &CancellationToken, ip: IpAddr) -> Result<AttributeSet> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.lookup.resolve(ip)
    }
}
