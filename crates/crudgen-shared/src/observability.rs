//! Observability features: structured logging and generator metrics

use metrics::{counter, histogram, Label};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::{LoggingConfig, MetricsConfig, ObservabilityConfig};

/// Global observability system
static OBSERVABILITY: OnceCell<ObservabilitySystem> = OnceCell::new();

/// Observability system for centralized logging and metrics
pub struct ObservabilitySystem {
    metrics_enabled: bool,
}

impl ObservabilitySystem {
    /// Initialize the observability system
    ///
    /// Must run inside a tokio runtime when metrics are enabled.
    pub fn init(config: &ObservabilityConfig) -> anyhow::Result<()> {
        let system = Self {
            metrics_enabled: config.metrics.enabled,
        };

        Self::init_logging(&config.logging)?;

        if config.metrics.enabled {
            Self::init_metrics(&config.metrics)?;
        }

        OBSERVABILITY
            .set(system)
            .map_err(|_| anyhow::anyhow!("Observability system already initialized"))?;

        info!("Observability system initialized");
        Ok(())
    }

    fn level(name: &str) -> Level {
        match name.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Initialize structured logging
    fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
        let env_filter = EnvFilter::builder()
            .with_default_directive(Self::level(&config.level).into())
            .from_env_lossy();

        let registry = tracing_subscriber::registry().with(env_filter);

        // stdout carries command output, logs go to stderr
        match config.format.to_lowercase().as_str() {
            "json" => {
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE);
                registry.with(json_layer).try_init()?;
            }
            _ => {
                let pretty_layer = tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE);
                registry.with(pretty_layer).try_init()?;
            }
        }

        Ok(())
    }

    /// Initialize the Prometheus exporter
    fn init_metrics(config: &MetricsConfig) -> anyhow::Result<()> {
        let bind_addr: SocketAddr = config.bind_address.parse()?;

        PrometheusBuilder::new()
            .with_http_listener(bind_addr)
            .install()?;

        info!("Prometheus metrics initialized on {}", bind_addr);
        Ok(())
    }

    /// Get the global observability system
    pub fn get() -> Option<&'static ObservabilitySystem> {
        OBSERVABILITY.get()
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }
}

/// Generator metrics
pub struct GeneratorMetrics;

impl GeneratorMetrics {
    /// Record a parse attempt
    pub fn sql_parsed(success: bool) {
        let status = if success { "success" } else { "error" };
        counter!("crudgen_sql_parsed_total", "status" => status).increment(1);
    }

    /// Record a completed module
    pub fn module_generated(module: &str, files: usize) {
        counter!("crudgen_modules_generated_total").increment(1);
        counter!("crudgen_files_written_total", "module" => module.to_string())
            .increment(files as u64);
    }

    /// Record a failed run by error code
    pub fn generation_failed(code: &str) {
        counter!("crudgen_generation_failed_total", "code" => code.to_string()).increment(1);
    }

    /// Record how long an operation took
    pub fn operation_duration(operation: &str, duration: Duration) {
        histogram!("crudgen_operation_duration_seconds", "operation" => operation.to_string())
            .record(duration.as_secs_f64());
    }

    /// Timer recording into `crudgen_phase_duration_seconds{phase}`
    pub fn phase_timer(phase: &str) -> PerfTimer {
        PerfTimer::new(PHASE_DURATION_METRIC).with_label("phase", phase)
    }
}

/// Histogram of generator phase durations
pub const PHASE_DURATION_METRIC: &str = "crudgen_phase_duration_seconds";

/// Performance timer helper
///
/// Records into a histogram when finished or dropped, whichever comes first.
pub struct PerfTimer {
    start: Instant,
    metric_name: String,
    labels: Vec<(String, String)>,
    recorded: bool,
}

impl PerfTimer {
    pub fn new(metric_name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            metric_name: metric_name.into(),
            labels: Vec::new(),
            recorded: false,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record now and return the elapsed time.
    pub fn finish(mut self) -> Duration {
        self.record()
    }

    fn record(&mut self) -> Duration {
        let duration = self.start.elapsed();
        if !self.recorded {
            let labels: Vec<Label> = self
                .labels
                .iter()
                .map(|(k, v)| Label::new(k.clone(), v.clone()))
                .collect();
            histogram!(self.metric_name.clone(), labels).record(duration.as_secs_f64());
            self.recorded = true;
        }
        duration
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.record();
        }
    }
}
