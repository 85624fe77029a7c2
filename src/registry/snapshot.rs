//! Read-only point-in-time view over gathered metric families.
//!
//! Series are keyed by family name plus their label pairs sorted by label
//! name, so lookups do not depend on the order callers list labels in.

use std::collections::HashMap;

use prometheus::proto::{MetricFamily, MetricType};
use serde::{Deserialize, Serialize};

/// Snapshot of all series at a point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, f64>,
    pub gauges: HashMap<String, f64>,
    pub histograms: HashMap<String, HistogramSummary>,
}

/// Summary of a histogram series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub count: u64,
    pub sum: f64,
}

impl MetricsSnapshot {
    pub(crate) fn from_families(families: &[MetricFamily]) -> Self {
        let mut snapshot = Self::default();

        for family in families {
            let name = family.get_name();
            for metric in family.get_metric() {
                let labels: Vec<(&str, &str)> = metric
                    .get_label()
                    .iter()
                    .map(|pair| (pair.get_name(), pair.get_value()))
                    .collect();
                let key = series_key(name, &labels);

                match family.get_field_type() {
                    MetricType::COUNTER => {
                        snapshot.counters.insert(key, metric.get_counter().get_value());
                    }
                    MetricType::GAUGE => {
                        snapshot.gauges.insert(key, metric.get_gauge().get_value());
                    }
                    MetricType::HISTOGRAM => {
                        let histogram = metric.get_histogram();
                        snapshot.histograms.insert(
                            key,
                            HistogramSummary {
                                count: histogram.get_sample_count(),
                                sum: histogram.get_sample_sum(),
                            },
                        );
                    }
                    _ => {}
                }
            }
        }

        snapshot
    }

    /// Counter value, or `None` if the series has never been touched.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.counters.get(&series_key(name, labels)).copied()
    }

    /// Counter value, treating untouched series as zero.
    pub fn counter_or_zero(&self, name: &str, labels: &[(&str, &str)]) -> f64 {
        self.counter(name, labels).unwrap_or(0.0)
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.gauges.get(&series_key(name, labels)).copied()
    }

    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Option<HistogramSummary> {
        self.histograms.get(&series_key(name, labels)).copied()
    }

    /// Sum of every counter series in a family.
    pub fn counter_family_total(&self, name: &str) -> f64 {
        self.counters
            .iter()
            .filter(|(key, _)| family_of(key) == name)
            .map(|(_, value)| value)
            .sum()
    }
}

fn series_key(name: &str, labels: &[(&str, &str)]) -> String {
    let mut sorted = labels.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let body = sorted
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect::<Vec<_>>()
        .join(",");
    format!("{name}{{{body}}}")
}

fn family_of(key: &str) -> &str {
    key.split('{').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_key_ignores_label_order() {
        assert_eq!(
            series_key("m", &[("b", "2"), ("a", "1")]),
            series_key("m", &[("a", "1"), ("b", "2")])
        );
    }

    #[test]
    fn series_key_without_labels() {
        assert_eq!(series_key("build_info", &[]), "build_info{}");
        assert_eq!(family_of("build_info{}"), "build_info");
    }
}
