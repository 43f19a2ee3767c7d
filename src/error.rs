use std::net::IpAddr;
use std::path::PathBuf;

/// Error types for the asenrich library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured context is neither `resource` nor `record`.
    #[error("unknown context {0:?}, expected \"resource\" or \"record\"")]
    UnknownContext(String),

    /// No candidate attribute keys were configured.
    #[error("attributes must list at least one candidate key")]
    EmptyAttributes,

    /// The providers mapping must hold exactly one entry.
    #[error("exactly one provider must be configured, found {count}")]
    ProviderCount { count: usize },

    /// Provider was not found in the registry.
    #[error("unknown provider: {name}")]
    UnknownProvider { name: String },

    /// A factory is already registered under this name.
    #[error("provider already registered: {name}")]
    DuplicateProvider { name: String },

    /// Provider specific configuration was rejected.
    #[error("invalid configuration for provider {name}: {reason}")]
    InvalidProviderConfig { name: String, reason: String },

    /// The MMDB database could not be opened.
    #[error("could not open asn database {path}")]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: maxminddb::MaxMindDbError,
    },

    /// The database declares a type the lookup adapter cannot read.
    #[error("unsupported geo IP database type: {database_type}")]
    UnsupportedDatabaseType { database_type: String },

    /// The IP is valid but no autonomous system metadata exists for it.
    #[error("no asn metadata found")]
    NoMetadataFound,

    /// IP address lookup failed in the MMDB database.
    #[error("lookup failed for {ip}")]
    LookupFailed {
        ip: IpAddr,
        #[source]
        source: maxminddb::MaxMindDbError,
    },

    /// The lookup was cancelled by the caller.
    #[error("lookup cancelled")]
    Cancelled,

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A YAML configuration document failed to parse.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON document failed to parse.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is a fatal configuration problem found before any
    /// telemetry is processed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownContext(_)
                | Error::EmptyAttributes
                | Error::ProviderCount { .. }
                | Error::UnknownProvider { .. }
                | Error::DuplicateProvider { .. }
                | Error::InvalidProviderConfig { .. }
                | Error::Yaml(_)
                | Error::Json(_)
        )
    }
}

/// Convenience type alias for Results using the library error.
pub type Result<T> = std::result::Result<T, Error>;
