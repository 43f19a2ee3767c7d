use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ContextId};
use crate::error::Result;
use crate::provider::{AsProvider, ProcessorSettings, ProviderRegistry};
use crate::resolver;
use crate::walker::{self, ResourceNode};

/// Enriches telemetry batches with autonomous system attributes.
///
/// Batches are mutated in place. On error the batch keeps the changes made
/// before the failing node. A processor may be shared across threads.
#[derive(Debug)]
pub struct AsProcessor {
    settings: ProcessorSettings,
    context: ContextId,
    attributes: Vec<String>,
    provider: Box<dyn AsProvider>,
}

impl AsProcessor {
    /// Validates `config` and instantiates its single configured provider
    /// from `registry`. `cancel` bounds the provider's setup.
    pub fn new(
        cancel: &CancellationToken,
        config: &Config,
        registry: &ProviderRegistry,
        settings: ProcessorSettings,
    ) -> Result<Self> {
        let (name, provider_config) = config.validate(registry)?;
        let factory = registry.get(name)?;
        let provider = factory.create_provider(cancel, &settings, provider_config.as_ref())?;

        tracing::debug!(
            processor = %settings.id,
            provider = name,
            context = %config.context,
            attributes = ?config.attributes,
            "created as processor"
        );

        Ok(Self::with_provider(
            settings,
            config.context,
            config.attributes.clone(),
            provider,
        ))
    }

    /// Builds a processor around an already created provider.
    pub fn with_provider(
        settings: ProcessorSettings,
        context: ContextId,
        attributes: Vec<String>,
        provider: Box<dyn AsProvider>,
    ) -> Self {
        Self {
            settings,
            context,
            attributes,
            provider,
        }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn process_traces(
        &self,
        cancel: &CancellationToken,
        traces: &mut ExportTraceServiceRequest,
    ) -> Result<()> {
        self.process(cancel, &mut traces.resource_spans, "traces")
    }

    pub fn process_metrics(
        &self,
        cancel: &CancellationToken,
        metrics: &mut ExportMetricsServiceRequest,
    ) -> Result<()> {
        self.process(cancel, &mut metrics.resource_metrics, "metrics")
    }

    pub fn process_logs(
        &self,
        cancel: &CancellationToken,
        logs: &mut ExportLogsServiceRequest,
    ) -> Result<()> {
        self.process(cancel, &mut logs.resource_logs, "logs")
    }

    fn process<R: ResourceNode>(
        &self,
        cancel: &CancellationToken,
        groups: &mut [R],
        signal: &'static str,
    ) -> Result<()> {
        walker::walk(groups, self.context, |attrs| {
            resolver::resolve(cancel, attrs, &self.attributes, self.provider.as_ref())
        })
        .inspect_err(|err| {
            tracing::warn!(
                processor = %self.settings.id,
                signal,
                error = %err,
                "failed to enrich batch"
            );
        })
    }
}
