//! The asenrich library for autonomous system enrichment of telemetry.
//!
//! This library adds `as.number` and `as.organization.name` attributes to
//! OpenTelemetry traces, metrics and logs, resolved from a source IP
//! address found in resource or record attributes.
//!
//! # Examples
//!
//! Building a processor around the MaxMind provider:
//!
//! ```rust,no_run
//! use asenrich::{AsProcessor, Config, ProcessorSettings, ProviderRegistry};
//! use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = Config::from_yaml_str(
//!     r#"
//! context: record
//! providers:
//!   maxmind:
//!     database_path: /usr/share/GeoIP/GeoLite2-ASN.mmdb
//! "#,
//! )?;
//!
//! let registry = ProviderRegistry::default();
//! let cancel = CancellationToken::new();
//! let processor = AsProcessor::new(&cancel, &config, &registry, ProcessorSettings::default())?;
//!
//! let mut traces = ExportTraceServiceRequest::default();
//! processor.process_traces(&cancel, &mut traces)?;
//! # Ok::<(), asenrich::Error>(())
//! ```

pub mod attributes;
pub mod config;
pub mod convention;
pub mod error;
pub mod input;
pub mod processor;
pub mod provider;
pub mod resolver;
pub mod walker;

pub use crate::attributes::AttributeSet;
pub use crate::config::{Config, ContextId};
pub use crate::error::{Error, Result};
pub use crate::processor::AsProcessor;
pub use crate::provider::{
    AsProvider, ProcessorSettings, ProviderConfig, ProviderFactory, ProviderRegistry,
};
