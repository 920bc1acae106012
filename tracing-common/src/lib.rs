use std::{collections::HashMap, time::Duration};

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use opentelemetry_otlp::WithExportConfig;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

const DEFAULT_FILTER: &str = "warn,server=trace,db=debug,tower_http=debug";
const HONEYCOMB_ENDPOINT: &str = "https://api.honeycomb.io/v1/traces";

/// Where spans go. Read once at startup from `RUST_LOG` and `HONEYCOMB_API_KEY`.
#[derive(Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub filter: String,
    pub dataset: String,
    honeycomb_key: Option<String>,
}

impl std::fmt::Debug for TracingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingConfig")
            .field("filter", &self.filter)
            .field("dataset", &self.dataset)
            .field("honeycomb", &self.honeycomb_key.is_some())
            .finish()
    }
}

impl TracingConfig {
    pub fn new(dataset: &str, filter: Option<String>, honeycomb_key: Option<String>) -> Self {
        Self {
            filter: filter
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            dataset: dataset.to_string(),
            honeycomb_key: honeycomb_key.filter(|key| !key.is_empty()),
        }
    }

    pub fn from_env(dataset: &str) -> Self {
        Self::new(
            dataset,
            std::env::var("RUST_LOG").ok(),
            std::env::var("HONEYCOMB_API_KEY").ok(),
        )
    }

    pub fn exports_to_honeycomb(&self) -> bool {
        self.honeycomb_key.is_some()
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::builder()
            .parse(&self.filter)
            .wrap_err_with(|| format!("Couldn't create env filter from {}", self.filter))
    }

    fn honeycomb_headers(&self, key: &str) -> HashMap<String, String> {
        HashMap::from([
            ("x-honeycomb-team".to_string(), key.to_string()),
            ("x-honeycomb-dataset".to_string(), self.dataset.clone()),
        ])
    }
}

pub fn setup_tracing(service_name: &str) -> Result<()> {
    init(&TracingConfig::from_env(service_name))
}

pub fn init(config: &TracingConfig) -> Result<()> {
    let env_filter = config.env_filter()?;

    let opentelemetry_layer = if let Some(key) = &config.honeycomb_key {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .http()
                    .with_endpoint(HONEYCOMB_ENDPOINT)
                    .with_timeout(Duration::from_secs(3))
                    .with_headers(config.honeycomb_headers(key)),
            )
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .wrap_err("Couldn't install the OTLP trace pipeline")?;

        Some(OpenTelemetryLayer::new(tracer))
    } else {
        None
    };

    let hierarchical = HierarchicalLayer::default()
        .with_writer(std::io::stdout)
        .with_indent_lines(true)
        .with_indent_amount(2)
        .with_thread_names(true)
        .with_thread_ids(true)
        .with_verbose_exit(true)
        .with_verbose_entry(true)
        .with_targets(true);

    Registry::default()
        .with(hierarchical)
        .with(opentelemetry_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| eyre!("Couldn't install the tracing subscriber: {e}"))?;

    tracing::debug!(?config, "Tracing initialized");

    Ok(())
}
