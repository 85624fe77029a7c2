//! Non-panicking series updates.
//!
//! `with_label_values` panics on an arity mismatch; telemetry calls must never
//! fail, so a mismatch is logged and the update dropped instead.

use prometheus::{GaugeVec, HistogramVec, IntCounterVec, IntGaugeVec};

pub(crate) fn inc_counter(vec: &IntCounterVec, values: &[&str]) {
    match vec.get_metric_with_label_values(values) {
        Ok(counter) => counter.inc(),
        Err(err) => tracing::warn!(error = %err, "dropped counter update"),
    }
}

pub(crate) fn add_gauge(vec: &IntGaugeVec, values: &[&str], delta: i64) {
    match vec.get_metric_with_label_values(values) {
        Ok(gauge) => gauge.add(delta),
        Err(err) => tracing::warn!(error = %err, "dropped gauge update"),
    }
}

pub(crate) fn set_gauge(vec: &GaugeVec, values: &[&str], value: f64) {
    match vec.get_metric_with_label_values(values) {
        Ok(gauge) => gauge.set(value),
        Err(err) => tracing::warn!(error = %err, "dropped gauge update"),
    }
}

pub(crate) fn observe(vec: &HistogramVec, values: &[&str], value: f64) {
    match vec.get_metric_with_label_values(values) {
        Ok(histogram) => histogram.observe(value),
        Err(err) => tracing::warn!(error = %err, "dropped histogram observation"),
    }
}
