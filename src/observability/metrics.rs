use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

pub static ORIGIN_CACHE: &str = "cache";
pub static ORIGIN_REMOTE: &str = "remote";
pub static OP_LOOKUP: &str = "lookup";
pub static OP_STORE: &str = "store";
pub static OP_MKDIR: &str = "mkdir";
pub static RESULT_REGISTERED: &str = "registered";

/// Metrics of one client. Owned by the client, no process-wide registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // Token metrics
    pub token_requests: IntCounterVec,
    pub token_failures: IntCounterVec,

    // Cache metrics
    pub cache_failures: IntCounterVec,

    // Registration metrics
    pub registration_attempts: IntCounter,
    pub registration_results: IntCounterVec,
    pub registration_duration: Histogram,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("boleto".into()), None)?;

        let metrics = Self {
            token_requests: IntCounterVec::new(Opts::new("token_requests_total", "Tokens handed out by origin"), &["origin"])?,
            token_failures: IntCounterVec::new(Opts::new("token_failures_total", "Token acquisition failures by reason"), &["reason"])?,
            cache_failures: IntCounterVec::new(Opts::new("cache_failures_total", "Token cache I/O failures by operation"), &["operation"])?,
            registration_attempts: IntCounter::new("registration_attempts_total", "Registration requests sent")?,
            registration_results: IntCounterVec::new(Opts::new("registration_results_total", "Registration outcomes"), &["result"])?,
            registration_duration: Histogram::with_opts(HistogramOpts::new("registration_duration_seconds", "Duration of a full registration call").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0]))?,
            registry,
        };

        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_requests.clone()))?;
        reg.register(Box::new(metrics.token_failures.clone()))?;
        reg.register(Box::new(metrics.cache_failures.clone()))?;
        reg.register(Box::new(metrics.registration_attempts.clone()))?;
        reg.register(Box::new(metrics.registration_results.clone()))?;
        reg.register(Box::new(metrics.registration_duration.clone()))?;

        Ok(metrics)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of everything registered.
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
