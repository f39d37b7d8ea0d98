// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Store queries issued through units of work, per query shape
// - Loader requests (outcome, duration, rows fetched) per strategy
// - Unit of work commits and rollbacks
// - Order state transitions
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Store Metrics
    pub store_queries: IntCounterVec,

    // Loader Metrics
    pub loader_requests: IntCounterVec,
    pub loader_duration: HistogramVec,
    pub loader_rows_fetched: IntCounterVec,

    // Unit of Work Metrics
    pub unit_of_work: IntCounterVec,

    // Domain Metrics
    pub order_transitions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Store Metrics
        let store_queries = IntCounterVec::new(
            Opts::new("store_queries_total", "Total store queries issued, by query shape"),
            &["query"],
        )?;
        registry.register(Box::new(store_queries.clone()))?;

        // Loader Metrics
        let loader_requests = IntCounterVec::new(
            Opts::new("loader_requests_total", "Total loader requests"),
            &["strategy", "outcome"],
        )?;
        registry.register(Box::new(loader_requests.clone()))?;

        let loader_duration = HistogramVec::new(
            HistogramOpts::new("loader_duration_seconds", "Loader request duration")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["strategy"],
        )?;
        registry.register(Box::new(loader_duration.clone()))?;

        let loader_rows_fetched = IntCounterVec::new(
            Opts::new("loader_rows_fetched_total", "Total rows returned to loaders by the store"),
            &["strategy"],
        )?;
        registry.register(Box::new(loader_rows_fetched.clone()))?;

        // Unit of Work Metrics
        let unit_of_work = IntCounterVec::new(
            Opts::new("unit_of_work_total", "Units of work finished, by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(unit_of_work.clone()))?;

        // Domain Metrics
        let order_transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Order state transitions"),
            &["transition"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        Ok(Self {
            registry,
            store_queries,
            loader_requests,
            loader_duration,
            loader_rows_fetched,
            unit_of_work,
            order_transitions,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a store query
    pub fn record_store_query(&self, query: &str) {
        self.store_queries.with_label_values(&[query]).inc();
    }

    /// Helper to record a loader request
    pub fn record_load(&self, strategy: &str, duration_secs: f64, rows: usize, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.loader_requests.with_label_values(&[strategy, outcome]).inc();
        self.loader_duration.with_label_values(&[strategy]).observe(duration_secs);
        self.loader_rows_fetched
            .with_label_values(&[strategy])
            .inc_by(rows as u64);
    }

    /// Helper to record how a unit of work ended
    pub fn record_unit_of_work(&self, outcome: &str) {
        self.unit_of_work.with_label_values(&[outcome]).inc();
    }

    /// Helper to record an order state transition
    pub fn record_transition(&self, transition: &str) {
        self.order_transitions.with_label_values(&[transition]).inc();
    }
}
