//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges the transfer lifecycle reports.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across the lifecycle manager.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    transfers_added_total: IntCounter,
    transfers_removed_total: IntCounter,
    transfers_finalized_total: IntCounter,
    finalize_file_failures_total: IntCounter,
    status_query_failures_total: IntCounter,
    metadata_save_failures_total: IntCounter,
    active_transfers: IntGauge,
}

/// Snapshot of every collector, for status output and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Transfers currently registered.
    pub active_transfers: i64,
    /// Transfers added since start.
    pub transfers_added_total: u64,
    /// Transfers removed since start.
    pub transfers_removed_total: u64,
    /// Transfers whose files left staging.
    pub transfers_finalized_total: u64,
    /// Individual files that failed to finalize.
    pub finalize_file_failures_total: u64,
    /// Status queries that failed.
    pub status_query_failures_total: u64,
    /// Metadata saves that failed.
    pub metadata_save_failures_total: u64,
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register(registry: &Registry, name: &'static str, counter: &IntCounter) -> Result<()> {
    registry
        .register(Box::new(counter.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

impl Metrics {
    /// Construct a new registry with every collector registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let transfers_added_total =
            counter("transfers_added_total", "Transfers registered with the engine")?;
        let transfers_removed_total =
            counter("transfers_removed_total", "Transfers removed on request")?;
        let transfers_finalized_total = counter(
            "transfers_finalized_total",
            "Transfers whose files were moved out of staging",
        )?;
        let finalize_file_failures_total = counter(
            "finalize_file_failures_total",
            "Files that could not be moved out of staging",
        )?;
        let status_query_failures_total = counter(
            "status_query_failures_total",
            "Engine status queries that failed",
        )?;
        let metadata_save_failures_total = counter(
            "metadata_save_failures_total",
            "Metadata file writes that failed",
        )?;
        let active_transfers =
            IntGauge::with_opts(Opts::new("active_transfers", "Registered transfers")).map_err(
                |source| TelemetryError::MetricsCollector {
                    name: "active_transfers",
                    source,
                },
            )?;

        register(&registry, "transfers_added_total", &transfers_added_total)?;
        register(&registry, "transfers_removed_total", &transfers_removed_total)?;
        register(
            &registry,
            "transfers_finalized_total",
            &transfers_finalized_total,
        )?;
        register(
            &registry,
            "finalize_file_failures_total",
            &finalize_file_failures_total,
        )?;
        register(
            &registry,
            "status_query_failures_total",
            &status_query_failures_total,
        )?;
        register(
            &registry,
            "metadata_save_failures_total",
            &metadata_save_failures_total,
        )?;
        registry
            .register(Box::new(active_transfers.clone()))
            .map_err(|source| TelemetryError::MetricsRegister {
                name: "active_transfers",
                source,
            })?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                transfers_added_total,
                transfers_removed_total,
                transfers_finalized_total,
                finalize_file_failures_total,
                status_query_failures_total,
                metadata_save_failures_total,
                active_transfers,
            }),
        })
    }

    /// Count a successful add.
    pub fn inc_transfers_added(&self) {
        self.inner.transfers_added_total.inc();
    }

    /// Count a successful removal.
    pub fn inc_transfers_removed(&self) {
        self.inner.transfers_removed_total.inc();
    }

    /// Count a completed finalize.
    pub fn inc_transfers_finalized(&self) {
        self.inner.transfers_finalized_total.inc();
    }

    /// Count files that failed to finalize.
    pub fn add_finalize_file_failures(&self, count: usize) {
        self.inner
            .finalize_file_failures_total
            .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
    }

    /// Count a failed status query.
    pub fn inc_status_query_failures(&self) {
        self.inner.status_query_failures_total.inc();
    }

    /// Count a failed metadata save.
    pub fn inc_metadata_save_failures(&self) {
        self.inner.metadata_save_failures_total.inc();
    }

    /// Set the registered transfer gauge.
    pub fn set_active_transfers(&self, count: usize) {
        self.inner
            .active_transfers
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of every collector.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_transfers: self.inner.active_transfers.get(),
            transfers_added_total: self.inner.transfers_added_total.get(),
            transfers_removed_total: self.inner.transfers_removed_total.get(),
            transfers_finalized_total: self.inner.transfers_finalized_total.get(),
            finalize_file_failures_total: self.inner.finalize_file_failures_total.get(),
            status_query_failures_total: self.inner.status_query_failures_total.get(),
            metadata_save_failures_total: self.inner.metadata_save_failures_total.get(),
        }
    }
}
