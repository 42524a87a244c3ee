// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the export service.

use crate::error::ExportError;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Service metrics, registered on a private registry.
pub struct Metrics {
    registry: Registry,

    /// Rate limiter decisions by outcome (allowed/limited).
    pub rate_limit_decisions: IntCounterVec,

    /// Export attempts by outcome (`ok` or an error kind).
    pub exports: IntCounterVec,

    /// CSV rows written across all exports.
    pub export_rows: IntCounter,

    /// Upstream fetch plus parse duration.
    pub fetch_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let rate_limit_decisions = IntCounterVec::new(
            Opts::new("rate_limit_decisions_total", "Rate limiter decisions"),
            &["outcome"],
        )?;
        registry.register(Box::new(rate_limit_decisions.clone()))?;

        let exports = IntCounterVec::new(
            Opts::new("exports_total", "Export requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(exports.clone()))?;

        let export_rows = IntCounter::new("export_rows_total", "CSV rows written")?;
        registry.register(Box::new(export_rows.clone()))?;

        let fetch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("feed_fetch_duration_seconds", "Feed fetch and parse duration in seconds")
                .buckets(prometheus::exponential_buckets(0.01, 2.0, 12)?),
        )?;
        registry.register(Box::new(fetch_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            rate_limit_decisions,
            exports,
            export_rows,
            fetch_duration_seconds,
        })
    }

    /// Record one rate limiter decision.
    pub fn record_rate_limit(&self, allowed: bool) {
        let outcome = if allowed { "allowed" } else { "limited" };
        self.rate_limit_decisions.with_label_values(&[outcome]).inc();
    }

    /// Record a completed export.
    pub fn record_export(&self, rows: usize) {
        self.exports.with_label_values(&["ok"]).inc();
        self.export_rows.inc_by(rows as u64);
    }

    /// Record a failed export under its error kind.
    pub fn record_export_failure(&self, err: &ExportError) {
        self.exports.with_label_values(&[err.kind()]).inc();
    }

    pub fn observe_fetch(&self, duration_secs: f64) {
        self.fetch_duration_seconds.observe(duration_secs);
    }

    /// Encode all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
