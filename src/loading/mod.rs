// ============================================================================
// Loading - Strategies for materializing order aggregates
// ============================================================================
//
// - NaiveLoader: root query, then one query per relation instance (1 + R×N)
// - FetchJoinLoader: one join query, rows collapsed by order id
// - BatchLoader: paged to-one join, then collections by batched id sets
// - projection: transfer shapes selected directly (1 + N, two-step, flat)
//
// Every loader runs inside a caller-provided `UnitOfWork`, which counts the
// queries it issues and keeps one instance per order, member and item id.
//
// ============================================================================

mod batch;
mod config;
mod errors;
mod fetch_join;
mod fetch_plan;
mod grouping;
mod naive;
pub mod projection;

use std::time::Instant;

use crate::store::{Store, UnitOfWork};

pub use batch::BatchLoader;
pub use config::{LoaderConfig, MAX_BATCH_SIZE};
pub use errors::LoadError;
pub use fetch_join::{group_join_rows, FetchJoinLoader, JoinedOrder};
pub use fetch_plan::{Cardinality, FetchPlan, Relation};
pub use grouping::{distinct, group_by_first_appearance, group_by_parent};
pub use naive::NaiveLoader;

/// Logs and records one loader request against the unit of work it ran in
pub(crate) struct LoadSpan {
    strategy: &'static str,
    started: Instant,
    queries_before: usize,
    rows_before: usize,
}

impl LoadSpan {
    pub fn start<S: Store + ?Sized>(uow: &UnitOfWork<'_, S>, strategy: &'static str) -> Self {
        tracing::debug!(strategy, unit_of_work = %uow.id(), "Loading orders");
        Self {
            strategy,
            started: Instant::now(),
            queries_before: uow.stats().total(),
            rows_before: uow.stats().rows(),
        }
    }

    pub fn finish<S: Store + ?Sized, T>(self, uow: &UnitOfWork<'_, S>, result: &Result<Vec<T>, LoadError>) {
        let elapsed = self.started.elapsed();
        let queries = uow.stats().total() - self.queries_before;
        let rows = uow.stats().rows() - self.rows_before;

        match result {
            Ok(loaded) => tracing::info!(
                strategy = self.strategy,
                orders = loaded.len(),
                queries,
                rows,
                duration_ms = elapsed.as_millis() as u64,
                "Orders loaded"
            ),
            Err(e) => tracing::warn!(
                strategy = self.strategy,
                queries,
                error = %e,
                "Loading orders failed"
            ),
        }

        if let Some(metrics) = uow.metrics() {
            metrics.record_load(self.strategy, elapsed.as_secs_f64(), rows, result.is_ok());
        }
    }
}
