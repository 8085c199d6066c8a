//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

/// Augmentation metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub augment_total: IntCounter,
    pub augment_success: IntCounter,
    pub augment_failed: IntCounterVec,
    pub lookup_tables_resolved: IntCounter,
    pub referral_instructions_created: IntCounter,

    // Histograms
    pub augment_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let augment_total = IntCounter::with_opts(Opts::new(
            "augment_total",
            "Total number of augmentation requests",
        ))?;

        let augment_success = IntCounter::with_opts(Opts::new(
            "augment_success_total",
            "Number of transactions successfully augmented",
        ))?;

        let augment_failed = IntCounterVec::new(
            Opts::new("augment_failed_total", "Number of failed augmentations"),
            &["category"],
        )?;

        let lookup_tables_resolved = IntCounter::with_opts(Opts::new(
            "lookup_tables_resolved_total",
            "Number of address lookup tables fetched and parsed",
        ))?;

        let referral_instructions_created = IntCounter::with_opts(Opts::new(
            "referral_instructions_created_total",
            "Number of referral token account creations injected",
        ))?;

        let augment_latency = Histogram::with_opts(
            HistogramOpts::new("augment_latency_seconds", "End-to-end augmentation latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        )?;

        registry.register(Box::new(augment_total.clone()))?;
        registry.register(Box::new(augment_success.clone()))?;
        registry.register(Box::new(augment_failed.clone()))?;
        registry.register(Box::new(lookup_tables_resolved.clone()))?;
        registry.register(Box::new(referral_instructions_created.clone()))?;
        registry.register(Box::new(augment_latency.clone()))?;

        Ok(Self {
            registry,
            augment_total,
            augment_success,
            augment_failed,
            lookup_tables_resolved,
            referral_instructions_created,
            augment_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one failed augmentation under its error category
    pub fn record_failure(&self, category: &str) {
        self.augment_failed.with_label_values(&[category]).inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn gather_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
