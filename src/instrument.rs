// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Instrumented methods: logs, latency, and spans around each call.
//!
//! Every call of an [`InstrumentedMethod`] runs the same linear pipeline:
//!
//! 1. Build the target metadata (caller metadata + target descriptor)
//! 2. Log `attempting <export>.<method>` (if logs are configured)
//! 3. Open a child span of the caller's parent span (if tracing is configured
//!    and a parent span was supplied)
//! 4. Call the original operation with the caller's exact params
//! 5. Emit the `latency` gauge (if metrics are configured)
//! 6. On failure, log `<export>.<method> failed` and tag the span `error=true`
//! 7. Finish the span
//! 8. Hand the untouched result and the target metadata back to the caller

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
#[cfg(feature = "telemetry")]
use tracing::debug;
use tracing::warn;

use crate::error::{InstrumentError, TelemetryError};
use crate::metadata::{object, target_metadata};
use crate::target::{instrumented_name, Operation, Target};
use crate::telemetry::{FailurePolicy, Telemetry};
use crate::types::{
    CallContext, CallOutcome, Gauge, LogLevel, Params, ResultContext, TargetDescriptor,
    DEFAULT_EXPORT, DOCUMENT_CLIENT_EXPORT,
};

/// Name of the gauge emitted after every call.
pub const LATENCY_METRIC: &str = "latency";

/// Unit of the latency gauge.
pub const LATENCY_UNIT: &str = "ms";

/// Install an instrumented method on `target` for each name in `methods`.
///
/// `getItem` is installed as `instrumentedGetItem`, and so on. A name with
/// no matching operation still installs; calling it fails with
/// [`InstrumentError::MethodNotFound`]. `export` defaults to `"DynamoDB"`.
pub fn instrument<S: AsRef<str>>(
    mut target: Target,
    version: &str,
    methods: &[S],
    telemetry: &Telemetry,
    export: Option<&str>,
) -> Target {
    let export = export.unwrap_or(DEFAULT_EXPORT);
    for method in methods {
        let method = method.as_ref();
        let instrumented = InstrumentedMethod::new(
            TargetDescriptor::new(version, export, method),
            target.get(method),
            telemetry.clone(),
        );
        target.install(instrumented_name(method), instrumented);
    }
    target
}

/// [`instrument`] for document clients, labeled `"DynamoDB.DocumentClient"`.
pub fn instrument_document_client<S: AsRef<str>>(
    target: Target,
    version: &str,
    methods: &[S],
    telemetry: &Telemetry,
) -> Target {
    instrument(target, version, methods, telemetry, Some(DOCUMENT_CLIENT_EXPORT))
}

/// An operation wrapped with telemetry.
pub struct InstrumentedMethod {
    descriptor: TargetDescriptor,
    qualified_name: String,
    operation: Option<Arc<dyn Operation>>,
    telemetry: Telemetry,
}

impl InstrumentedMethod {
    /// Wrap `operation`, described by `descriptor`.
    ///
    /// `None` models a method name the target does not have.
    pub fn new(
        descriptor: TargetDescriptor,
        operation: Option<Arc<dyn Operation>>,
        telemetry: Telemetry,
    ) -> Self {
        let qualified_name = descriptor.qualified_name();
        Self {
            descriptor,
            qualified_name,
            operation,
            telemetry,
        }
    }

    pub fn descriptor(&self) -> &TargetDescriptor {
        &self.descriptor
    }

    /// `export.method`.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Call the wrapped operation.
    ///
    /// `Ok` carries the operation's own result, success or failure, plus the
    /// target metadata. `Err` means the call could not be completed: the
    /// method does not exist, or a collaborator failed under
    /// [`FailurePolicy::Propagate`].
    pub async fn call(
        &self,
        params: Params,
        context: CallContext,
    ) -> Result<CallOutcome, InstrumentError> {
        let name = self.qualified_name.as_str();
        let target_metadata = target_metadata(context.metadata.as_ref(), &self.descriptor);
        let logged_args = context
            .params_to_log
            .clone()
            .unwrap_or_else(|| params.as_ref().clone());

        if let Some(logs) = &self.telemetry.logs {
            self.emit(
                "logs",
                logs.log(
                    LogLevel::Info,
                    &format!("attempting {name}"),
                    &target_metadata,
                    args_extra(&logged_args),
                ),
            )?;
        }

        let span = match (&self.telemetry.tracing, &context.parent_span) {
            (Some(_), Some(parent)) => self.emit("tracing", parent.child_span(name))?,
            _ => None,
        };

        let operation = self
            .operation
            .as_ref()
            .ok_or_else(|| InstrumentError::MethodNotFound(self.descriptor.method.clone()))?;

        #[cfg(feature = "telemetry")]
        debug!(method = %name, traced = span.is_some(), "Invoking instrumented method");

        let start = Instant::now();
        let result = operation.call(params).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        #[cfg(feature = "telemetry")]
        debug!(
            method = %name,
            duration_ms = elapsed_ms,
            success = result.is_ok(),
            "Instrumented method completed"
        );

        if let Some(metrics) = &self.telemetry.metrics {
            let gauge = Gauge {
                unit: LATENCY_UNIT.to_string(),
                value: elapsed_ms,
                metadata: target_metadata.clone(),
            };
            self.emit("metrics", metrics.gauge(LATENCY_METRIC, gauge))?;
        }

        if let Err(error) = &result {
            if let Some(logs) = &self.telemetry.logs {
                let mut extra = args_extra(&logged_args);
                extra.insert("error".to_string(), Value::String(error.to_string()));
                extra.insert("stack".to_string(), Value::String(format!("{error:?}")));
                self.emit(
                    "logs",
                    logs.log(LogLevel::Error, &format!("{name} failed"), &target_metadata, extra),
                )?;
            }
            if let Some(span) = &span {
                self.emit("tracing", span.tag("error", Value::Bool(true)))?;
            }
        }

        if let Some(span) = &span {
            self.emit("tracing", span.finish())?;
        }

        Ok(CallOutcome {
            result,
            context: ResultContext { target_metadata },
        })
    }

    /// Call the wrapped operation and deliver the outcome to `callback`.
    ///
    /// `callback` runs exactly once, after every telemetry side effect, unless
    /// the call itself fails with an [`InstrumentError`].
    pub async fn call_with_callback<F>(
        &self,
        params: Params,
        context: CallContext,
        callback: F,
    ) -> Result<(), InstrumentError>
    where
        F: FnOnce(anyhow::Result<Value>, ResultContext),
    {
        let outcome = self.call(params, context).await?;
        callback(outcome.result, outcome.context);
        Ok(())
    }

    /// Apply the failure policy to one collaborator call.
    fn emit<T>(
        &self,
        collaborator: &'static str,
        result: Result<T, TelemetryError>,
    ) -> Result<Option<T>, InstrumentError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) => match self.telemetry.failure_policy {
                FailurePolicy::Propagate => Err(err.into()),
                FailurePolicy::Isolate => {
                    warn!(
                        method = %self.qualified_name,
                        collaborator,
                        error = %err,
                        "Telemetry emission failed, continuing"
                    );
                    Ok(None)
                }
            },
        }
    }
}

impl std::fmt::Debug for InstrumentedMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedMethod")
            .field("descriptor", &self.descriptor)
            .field("resolved", &self.operation.is_some())
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

fn args_extra(args: &Value) -> crate::types::Metadata {
    object(json!({"target": {"args": [args]}}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::events::{EventTracing, TelemetryEvents};
    use crate::telemetry::{MockLogs, MockMetrics, MockTraceSpan, TraceSpan, TracingTracer};
    use crate::types::Metadata;
    use anyhow::anyhow;
    use mockall::Sequence;

    const VERSION: &str = "0.0.0";

    async fn item(_: Params) -> anyhow::Result<Value> {
        Ok(json!({"Item": 1}))
    }

    async fn boom(_: Params) -> anyhow::Result<Value> {
        Err(anyhow!("boom"))
    }

    fn target_with<O: Operation + 'static>(operation: O) -> Target {
        Target::builder().operation("getItem", operation).build()
    }

    fn some_metadata() -> Metadata {
        object(json!({"some": "metadata"}))
    }

    fn get_item(target: &Target) -> Arc<InstrumentedMethod> {
        target.instrumented("instrumentedGetItem").unwrap()
    }

    #[test]
    fn test_instrument_installs_named_methods() {
        let target = Target::builder()
            .operation("getItem", item)
            .operation("putItem", item)
            .build();
        let target = instrument(target, VERSION, &["getItem", "putItem"], &Telemetry::new(), None);

        assert_eq!(
            target.instrumented_names(),
            vec!["instrumentedGetItem", "instrumentedPutItem"]
        );
        assert_eq!(get_item(&target).qualified_name(), "DynamoDB.getItem");
        assert!(target.contains("getItem"));
    }

    #[test]
    fn test_document_client_export_label() {
        let target = Target::builder().operation("get", item).build();
        let target = instrument_document_client(target, VERSION, &["get"], &Telemetry::new());

        let method = target.instrumented("instrumentedGet").unwrap();
        assert_eq!(method.descriptor().export, "DynamoDB.DocumentClient");
        assert_eq!(method.qualified_name(), "DynamoDB.DocumentClient.get");
    }

    #[tokio::test]
    async fn test_no_collaborators_passes_result_through() {
        let target = instrument(target_with(item), "1.0", &["getItem"], &Telemetry::new(), None);

        let outcome = get_item(&target)
            .call(Arc::new(json!({"Key": {"id": "x"}})), CallContext::new())
            .await
            .unwrap();

        assert_eq!(outcome.result.unwrap(), json!({"Item": 1}));
        assert_eq!(
            Value::Object(outcome.context.target_metadata),
            json!({"target": {"module": "aws-sdk", "version": "1.0", "export": "DynamoDB", "method": "getItem"}})
        );
    }

    #[tokio::test]
    async fn test_success_emits_attempt_log_and_latency() {
        let mut seq = Sequence::new();
        let mut logs = MockLogs::new();
        let mut metrics = MockMetrics::new();

        logs.expect_log()
            .withf(|level, message, base, extra| {
                *level == LogLevel::Info
                    && message == "attempting DynamoDB.getItem"
                    && base.get("some") == Some(&json!("metadata"))
                    && extra.get("target") == Some(&json!({"args": [{"Key": {"id": "x"}}]}))
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(()));
        metrics
            .expect_gauge()
            .withf(|name, gauge| {
                name == "latency"
                    && gauge.unit == "ms"
                    && gauge.value >= 0.0
                    && gauge.metadata.get("some") == Some(&json!("metadata"))
                    && gauge.metadata["target"]["method"] == "getItem"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let telemetry = Telemetry::new()
            .with_logs(Arc::new(logs))
            .with_metrics(Arc::new(metrics));
        let target = instrument(target_with(item), VERSION, &["getItem"], &telemetry, None);

        let outcome = get_item(&target)
            .call(
                Arc::new(json!({"Key": {"id": "x"}})),
                CallContext::new().with_metadata(some_metadata()),
            )
            .await
            .unwrap();

        assert!(!outcome.is_error());
    }

    #[tokio::test]
    async fn test_failure_side_effects_run_in_order() {
        let mut seq = Sequence::new();
        let mut logs = MockLogs::new();
        let mut metrics = MockMetrics::new();
        let mut parent = MockTraceSpan::new();
        let mut child = MockTraceSpan::new();

        logs.expect_log()
            .withf(|level, _, _, _| *level == LogLevel::Info)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(()));
        metrics
            .expect_gauge()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        logs.expect_log()
            .withf(|level, message, _, extra| {
                *level == LogLevel::Error
                    && message == "DynamoDB.getItem failed"
                    && extra.get("error") == Some(&json!("boom"))
                    && extra.get("stack").and_then(Value::as_str).is_some_and(|s| !s.is_empty())
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(()));
        child
            .expect_tag()
            .withf(|key, value| key == "error" && *value == json!(true))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        child
            .expect_finish()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        parent
            .expect_child_span()
            .withf(|name| name == "DynamoDB.getItem")
            .times(1)
            .return_once(move |_| Ok(Box::new(child)));

        let parent: Arc<dyn TraceSpan> = Arc::new(parent);
        let telemetry = Telemetry::new()
            .with_logs(Arc::new(logs))
            .with_metrics(Arc::new(metrics))
            .with_tracing(Arc::new(TracingTracer::new()));
        let target = instrument(target_with(boom), VERSION, &["getItem"], &telemetry, None);

        let outcome = get_item(&target)
            .call(Arc::new(json!({})), CallContext::new().with_parent_span(parent))
            .await
            .unwrap();

        assert_eq!(outcome.result.unwrap_err().to_string(), "boom");
    }

    #[tokio::test]
    async fn test_no_span_without_parent() {
        let hub = Arc::new(TelemetryEvents::new("test-package", "0.0.0"));
        let mut events = hub.subscribe();
        let telemetry = Telemetry::new().with_tracing(Arc::new(EventTracing::new(Arc::clone(&hub))));
        let target = instrument(target_with(boom), VERSION, &["getItem"], &telemetry, None);

        let outcome = get_item(&target)
            .call(Arc::new(json!({})), CallContext::new())
            .await
            .unwrap();
        assert!(outcome.is_error());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_span_without_tracing() {
        let mut parent = MockTraceSpan::new();
        parent.expect_child_span().never();
        let parent: Arc<dyn TraceSpan> = Arc::new(parent);

        let target = instrument(target_with(item), VERSION, &["getItem"], &Telemetry::new(), None);
        get_item(&target)
            .call(Arc::new(json!({})), CallContext::new().with_parent_span(parent))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_success_finishes_span_without_error_tag() {
        let mut parent = MockTraceSpan::new();
        let mut child = MockTraceSpan::new();
        child.expect_tag().never();
        child.expect_finish().times(1).returning(|| Ok(()));
        parent
            .expect_child_span()
            .times(1)
            .return_once(move |_| Ok(Box::new(child)));

        let telemetry = Telemetry::new().with_tracing(Arc::new(TracingTracer::new()));
        let target = instrument(target_with(item), VERSION, &["getItem"], &telemetry, None);

        get_item(&target)
            .call(Arc::new(json!({})), CallContext::new().with_parent_span(Arc::new(parent)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_method_fails_at_call_time() {
        let target = instrument(Target::new(), VERSION, &["getItem"], &Telemetry::new(), None);
        assert_eq!(target.instrumented_names(), vec!["instrumentedGetItem"]);

        let result = get_item(&target).call(Arc::new(json!({})), CallContext::new()).await;
        assert!(matches!(result, Err(InstrumentError::MethodNotFound(name)) if name == "getItem"));
    }

    #[tokio::test]
    async fn test_telemetry_failure_propagates() {
        let mut logs = MockLogs::new();
        logs.expect_log()
            .times(1)
            .returning(|_, _, _, _| Err(TelemetryError::emit("logs", "sink down")));

        let telemetry = Telemetry::new().with_logs(Arc::new(logs));
        let target = instrument(target_with(item), VERSION, &["getItem"], &telemetry, None);

        let mut delivered = false;
        let result = get_item(&target)
            .call_with_callback(Arc::new(json!({})), CallContext::new(), |_, _| delivered = true)
            .await;

        assert!(matches!(result, Err(InstrumentError::Telemetry(_))));
        assert!(!delivered);
    }

    #[tokio::test]
    async fn test_telemetry_failure_isolated() {
        let mut metrics = MockMetrics::new();
        metrics
            .expect_gauge()
            .times(1)
            .returning(|_, _| Err(TelemetryError::emit("metrics", "aggregator down")));

        let telemetry = Telemetry::new()
            .with_metrics(Arc::new(metrics))
            .with_failure_policy(FailurePolicy::Isolate);
        let target = instrument(target_with(item), VERSION, &["getItem"], &telemetry, None);

        let mut delivered = None;
        get_item(&target)
            .call_with_callback(Arc::new(json!({})), CallContext::new(), |result, context| {
                delivered = Some((result.unwrap(), context.target().unwrap().method));
            })
            .await
            .unwrap();

        assert_eq!(delivered, Some((json!({"Item": 1}), "getItem".to_string())));
    }

    #[tokio::test]
    async fn test_params_to_log_replaces_logged_args_only() {
        let mut logs = MockLogs::new();
        logs.expect_log()
            .withf(|_, _, _, extra| extra["target"]["args"] == json!([{"log": "me"}]))
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let telemetry = Telemetry::new().with_logs(Arc::new(logs));
        let params = Arc::new(json!({"secret": "value"}));
        let expected = Arc::clone(&params);
        let target = Target::builder()
            .operation("getItem", move |received: Params| {
                let same = Arc::ptr_eq(&received, &expected);
                async move { anyhow::Ok(json!(same)) }
            })
            .build();
        let target = instrument(target, VERSION, &["getItem"], &telemetry, None);

        let outcome = get_item(&target)
            .call(params, CallContext::new().with_params_to_log(json!({"log": "me"})))
            .await
            .unwrap();

        assert_eq!(outcome.result.unwrap(), json!(true));
    }
}
