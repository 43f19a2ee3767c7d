//! Traversal of OTLP batches.
//!
//! Traces, metrics and logs share the resource → scope → record layout, so
//! a single [`walk`] drives all three through the [`ResourceNode`] and
//! [`ScopeNode`] traits.

use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::metrics::v1::{
    metric::Data, ExponentialHistogramDataPoint, HistogramDataPoint, NumberDataPoint,
    ResourceMetrics, ScopeMetrics, SummaryDataPoint,
};
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span};

use crate::config::ContextId;
use crate::error::Result;

/// A resource-scoped group of a batch.
pub trait ResourceNode {
    type Scope: ScopeNode;

    /// The resource attribute map, `None` when the group carries no resource.
    fn attributes_mut(&mut self) -> Option<&mut Vec<KeyValue>>;

    fn scopes_mut(&mut self) -> &mut [Self::Scope];
}

/// An instrumentation-scoped group of records.
pub trait ScopeNode {
    /// Calls `f` with the attribute map of every record, stopping at the
    /// first error.
    fn try_for_each_record<F>(&mut self, f: F) -> Result<()>
    where
        F: FnMut(&mut Vec<KeyValue>) -> Result<()>;
}

/// Calls `visit` on every attribute map selected by `context`.
///
/// The first error aborts the walk. Maps visited before the failure keep
/// their modifications.
pub fn walk<R, F>(groups: &mut [R], context: ContextId, mut visit: F) -> Result<()>
where
    R: ResourceNode,
    F: FnMut(&mut Vec<KeyValue>) -> Result<()>,
{
    for group in groups {
        match context {
            ContextId::Resource => {
                if let Some(attrs) = group.attributes_mut() {
                    visit(attrs)?;
                }
            }
            ContextId::Record => {
                for scope in group.scopes_mut() {
                    scope.try_for_each_record(&mut visit)?;
                }
            }
        }
    }
    Ok(())
}

trait Attributed {
    fn attributes_mut(&mut self) -> &mut Vec<KeyValue>;
}

macro_rules! impl_attributed {
    ($($ty:ty),*) => {
        $(
            impl Attributed for $ty {
                fn attributes_mut(&mut self) -> &mut Vec<KeyValue> {
                    &mut self.attributes
                }
            }
        )*
    };
}

impl_attributed!(
    Span,
    LogRecord,
    NumberDataPoint,
    HistogramDataPoint,
    ExponentialHistogramDataPoint,
    SummaryDataPoint
);

fn each_record<T, F>(records: &mut [T], f: &mut F) -> Result<()>
where
    T: Attributed,
    F: FnMut(&mut Vec<KeyValue>) -> Result<()>,
{
    records.iter_mut().try_for_each(|r| f(r.attributes_mut()))
}

impl ResourceNode for ResourceSpans {
    type Scope = ScopeSpans;

    fn attributes_mut(&mut self) -> Option<&mut Vec<KeyValue>> {
        self.resource.as_mut().map(|r| &mut r.attributes)
    }

    fn scopes_mut(&mut self) -> &mut [ScopeSpans] {
        &mut self.scope_spans
    }
}

impl ScopeNode for ScopeSpans {
    fn try_for_each_record<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Vec<KeyValue>) -> Result<()>,
    {
        each_record(&mut self.spans, &mut f)
    }
}

impl ResourceNode for ResourceLogs {
    type Scope = ScopeLogs;

    fn attributes_mut(&mut self) -> Option<&mut Vec<KeyValue>> {
        self.resource.as_mut().map(|r| &mut r.attributes)
    }

    fn scopes_mut(&mut self) -> &mut [ScopeLogs] {
        &mut self.scope_logs
    }
}

impl ScopeNode for ScopeLogs {
    fn try_for_each_record<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Vec<KeyValue>) -> Result<()>,
    {
        each_record(&mut self.log_records, &mut f)
    }
}

impl ResourceNode for ResourceMetrics {
    type Scope = ScopeMetrics;

    fn attributes_mut(&mut self) -> Option<&mut Vec<KeyValue>> {
        self.resource.as_mut().map(|r| &mut r.attributes)
    }

    fn scopes_mut(&mut self) -> &mut [ScopeMetrics] {
        &mut self.scope_metrics
    }
}

/// Metric records are the data points of every metric in the scope.
impl ScopeNode for ScopeMetrics {
    fn try_for_each_record<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Vec<KeyValue>) -> Result<()>,
    {
        for metric in &mut self.metrics {
            match metric.data.as_mut() {
                Some(Data::Gauge(gauge)) => each_record(&mut gauge.data_points, &mut f)?,
                Some(Data::Sum(sum)) => each_record(&mut sum.data_points, &mut f)?,
                Some(Data::Histogram(histogram)) => {
                    each_record(&mut histogram.data_points, &mut f)?
                }
                Some(Data::ExponentialHistogram(histogram)) => {
                    each_record(&mut histogram.data_points, &mut f)?
                }
                Some(Data::Summary(summary)) => each_record(&mut summary.data_points, &mut f)?,
                None => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use opentelemetry_proto::tonic::common::v1::{any_value::Value, AnyValue};
    use opentelemetry_proto::tonic::metrics::v1::{
        ExponentialHistogram, Gauge, Histogram, Metric, Sum, Summary,
    };
    use opentelemetry_proto::tonic::resource::v1::Resource;

    fn tag(n: i64) -> Vec<KeyValue> {
        vec![KeyValue {
            key: "n".to_string(),
            value: Some(AnyValue {
                value: Some(Value::IntValue(n)),
            }),
        }]
    }

    fn span(n: i64) -> Span {
        Span {
            attributes: tag(n),
            ..Default::default()
        }
    }

    fn spans(resources: usize, scopes: usize, per_scope: usize) -> Vec<ResourceSpans> {
        (0..resources)
            .map(|_| ResourceSpans {
                resource: Some(Resource::default()),
                scope_spans: (0..scopes)
                    .map(|_| ScopeSpans {
                        spans: (0..per_scope as i64).map(span).collect(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn resource_context_visits_each_resource_once() {
        let mut batch = spans(3, 2, 4);
        let mut visits = 0;
        walk(&mut batch, ContextId::Resource, |_| {
            visits += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(visits, 3);
    }

    #[test]
    fn record_context_visits_every_span() {
        let mut batch = spans(3, 2, 4);
        let mut visits = 0;
        walk(&mut batch, ContextId::Record, |_| {
            visits += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(visits, 24);
    }

    #[test]
    fn missing_resource_is_skipped() {
        let mut batch = vec![ResourceLogs::default()];
        let mut visits = 0;
        walk(&mut batch, ContextId::Resource, |_| {
            visits += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(visits, 0);
    }

    #[test]
    fn first_error_stops_the_walk_and_keeps_earlier_changes() {
        let mut batch = spans(1, 1, 3);
        let mut visits = 0;
        let result = walk(&mut batch, ContextId::Record, |attrs| {
            visits += 1;
            if visits == 2 {
                return Err(Error::Cancelled);
            }
            attrs.clear();
            Ok(())
        });

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(visits, 2);
        let records = &batch[0].scope_spans[0].spans;
        assert!(records[0].attributes.is_empty());
        assert_eq!(records[1].attributes, tag(1));
        assert_eq!(records[2].attributes, tag(2));
    }

    #[test]
    fn every_metric_data_point_kind_is_a_record() {
        let metric = |data: Data| Metric {
            data: Some(data),
            ..Default::default()
        };
        let mut batch = vec![ResourceMetrics {
            scope_metrics: vec![ScopeMetrics {
                metrics: vec![
                    metric(Data::Gauge(Gauge {
                        data_points: vec![NumberDataPoint::default(); 2],
                    })),
                    metric(Data::Sum(Sum {
                        data_points: vec![NumberDataPoint::default()],
                        ..Default::default()
                    })),
                    metric(Data::Histogram(Histogram {
                        data_points: vec![HistogramDataPoint::default()],
                        ..Default::default()
                    })),
                    metric(Data::ExponentialHistogram(ExponentialHistogram {
                        data_points: vec![ExponentialHistogramDataPoint::default()],
                        ..Default::default()
                    })),
                    metric(Data::Summary(Summary {
                        data_points: vec![SummaryDataPoint::default()],
                    })),
                    Metric::default(),
                ],
                ..Default::default()
            }],
            ..Default::default()
        }];

        let mut visits = 0;
        walk(&mut batch, ContextId::Record, |attrs| {
            visits += 1;
            attrs.extend(tag(visits));
            Ok(())
        })
        .unwrap();
        assert_eq!(visits, 6);

        let metrics = &batch[0].scope_metrics[0].metrics;
        match &metrics[4].data {
            Some(Data::Summary(summary)) => assert_eq!(summary.data_points[0].attributes, tag(6)),
            other => panic!("unexpected data {:?}", other),
        }
    }
}
