// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Dynamo Instrument demo - runs an instrumented in-memory table and prints
//! the telemetry it emits.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use colored::Colorize;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::TryRecvError;

use dynamo_instrument::config::{self, InstrumentConfig};
use dynamo_instrument::error::TelemetryError;
use dynamo_instrument::memory::{MemoryTable, OPERATIONS};
use dynamo_instrument::metadata::object;
use dynamo_instrument::telemetry::events::{EventLogs, EventMetrics, EventTracing, TelemetryEvents};
use dynamo_instrument::telemetry::{
    init_logging, metrics, FailurePolicy, LogConfig, Metrics, Telemetry, TraceSpan,
};
use dynamo_instrument::types::Gauge;
use dynamo_instrument::{instrumented_name, CallContext};

/// Library version reported when no config file supplies one.
const DEFAULT_SDK_VERSION: &str = "2.1.0";

/// Dynamo Instrument - telemetry for DynamoDB-style client methods.
#[derive(Parser)]
#[command(name = "dynamo-instrument")]
#[command(author, version, about = "Run an instrumented in-memory table and print its telemetry", long_about = None)]
struct Cli {
    /// Instrumentation config file (JSON or YAML)
    #[arg(short, long, env = "DYNAMO_INSTRUMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Log redacted params instead of the real ones
    #[arg(long)]
    redact: bool,

    /// Run every call under a root trace span
    #[arg(long)]
    trace: bool,

    /// Keep going when a telemetry collaborator fails
    #[arg(long)]
    isolate: bool,

    /// Simulated latency per table operation, in milliseconds
    #[arg(long, default_value_t = 5)]
    latency_ms: u64,

    /// Increase diagnostic output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Forwards every gauge to each inner collaborator.
struct Fanout(Vec<Arc<dyn Metrics>>);

impl Metrics for Fanout {
    fn gauge(&self, name: &str, gauge: Gauge) -> Result<(), TelemetryError> {
        for metrics in &self.0 {
            metrics.gauge(name, gauge.clone())?;
        }
        Ok(())
    }
}

/// One scripted call.
struct Step {
    method: &'static str,
    params: Value,
}

fn script() -> Vec<Step> {
    vec![
        Step {
            method: "putItem",
            params: json!({"TableName": "demo", "Item": {"id": "42", "answer": "forty-two"}}),
        },
        Step {
            method: "getItem",
            params: json!({"TableName": "demo", "Key": {"id": "42"}}),
        },
        Step {
            method: "deleteItem",
            params: json!({"TableName": "demo", "Key": {"id": "42"}}),
        },
        Step {
            method: "getItem",
            params: json!({"TableName": "demo", "Key": {}}),
        },
    ]
}

/// Params with item contents and key values masked.
fn redacted(params: &Value) -> Value {
    let mut masked = params.clone();
    for field in ["Item", "Key"] {
        if let Some(Value::Object(map)) = masked.get_mut(field) {
            for value in map.values_mut() {
                *value = json!("[redacted]");
            }
        }
    }
    masked
}

fn resolve_config(cli: &Cli) -> anyhow::Result<InstrumentConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => {
            let cwd = std::env::current_dir()?;
            config::load_config(&cwd)?
                .unwrap_or_else(|| InstrumentConfig::new(DEFAULT_SDK_VERSION, OPERATIONS.iter().copied()))
        }
    };
    if cli.isolate {
        config.failure_policy = FailurePolicy::Isolate;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&LogConfig::for_verbosity(cli.verbose))?;

    let config = resolve_config(&cli)?;
    tracing::info!(
        version = %config.version,
        export = %config.export_label(),
        methods = ?config.methods,
        "Instrumenting in-memory table"
    );

    let hub = Arc::new(TelemetryEvents::for_crate());
    let mut events = hub.subscribe();
    let tracer = EventTracing::new(Arc::clone(&hub));
    let latency = metrics::global();

    let telemetry = Telemetry::new()
        .with_logs(Arc::new(EventLogs::new(Arc::clone(&hub))))
        .with_metrics(Arc::new(Fanout(vec![
            Arc::new(EventMetrics::new(Arc::clone(&hub))) as Arc<dyn Metrics>,
            latency.clone() as Arc<dyn Metrics>,
        ])))
        .with_tracing(Arc::new(tracer.clone()));

    let table = MemoryTable::new().with_latency(Duration::from_millis(cli.latency_ms));
    let target = config.apply(table.into_target(), &telemetry);

    let root = cli
        .trace
        .then(|| tracer.root("dynamo-instrument demo", object(json!({"demo": true})), object(json!({"run": "demo"}))));

    for (index, step) in script().into_iter().enumerate() {
        let name = instrumented_name(step.method);
        let mut context =
            CallContext::new().with_metadata(object(json!({"demo": {"step": index + 1}})));
        if cli.redact {
            context = context.with_params_to_log(redacted(&step.params));
        }
        if let Some(root) = &root {
            context = context.with_parent_span(root.clone());
        }

        match target.call_instrumented(&name, Arc::new(step.params), context).await {
            Ok(outcome) => {
                if !cli.json {
                    match &outcome.result {
                        Ok(data) => println!("{} {} -> {}", "ok".green().bold(), name, data),
                        Err(err) => println!("{} {} -> {}", "err".red().bold(), name, err),
                    }
                }
            }
            Err(err) if err.is_telemetry() => {
                eprintln!("{} {}: {}", "telemetry".yellow().bold(), name, err);
            }
            Err(err) => {
                eprintln!("{} {}: {}", "skipped".dimmed(), name, err);
            }
        }
    }

    if let Some(root) = &root {
        root.finish()?;
    }

    loop {
        match events.try_recv() {
            Ok(event) => print_event(&event, cli.json)?,
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event subscriber lagged");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    if !cli.json {
        println!("\n{}", latency.snapshot().format_report());
    }

    Ok(())
}

fn print_event(event: &Value, json_lines: bool) -> anyhow::Result<()> {
    if json_lines {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    let text = |key: &str| event[key].as_str().unwrap_or_default().to_string();
    match event["type"].as_str() {
        Some("log") if event["level"] == "error" => {
            println!("{} {} ({})", "log".red(), text("message"), text("error"));
        }
        Some("log") => println!("{} {}", "log".green(), text("message")),
        Some("metric") => println!(
            "{} {} {:.3} {} [{}.{}]",
            "metric".cyan(),
            text("name"),
            event["value"].as_f64().unwrap_or_default(),
            text("unit"),
            event["target"]["export"].as_str().unwrap_or_default(),
            event["target"]["method"].as_str().unwrap_or_default(),
        ),
        Some("trace") => {
            let mut line = format!("{} {} trace={}", "span".yellow(), text("name"), text("traceId"));
            if event["tags"]["error"] == true {
                line.push_str(&format!(" {}", "error".red()));
            }
            println!("{line}");
        }
        _ => println!("{event}"),
    }
    Ok(())
}
