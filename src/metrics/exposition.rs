//! Text exposition format
//!
//! Converts a [`Snapshot`] into prometheus `MetricFamily` protos and encodes
//! them with [`TextEncoder`]. Encoding is a pure function of the snapshot:
//! identical snapshots always produce identical bytes.

use prometheus::proto::{self, LabelPair, MetricFamily, MetricType};
use prometheus::TextEncoder;

use super::registry::{FamilySnapshot, MetricKind, Snapshot};

/// Convert every family that has at least one series.
///
/// The text encoder rejects families without metrics, so a labeled family
/// that was never written is left out.
pub fn families(snapshot: &Snapshot) -> Vec<MetricFamily> {
    snapshot
        .families
        .iter()
        .map(family)
        .filter(|mf| !mf.get_metric().is_empty())
        .collect()
}

/// Encode the snapshot in the text format
pub fn render(encoder: &TextEncoder, snapshot: &Snapshot) -> prometheus::Result<String> {
    encoder.encode_to_string(&families(snapshot))
}

fn family(snapshot: &FamilySnapshot) -> MetricFamily {
    let desc = &snapshot.desc;
    let mut mf = MetricFamily::default();
    mf.set_name(desc.name.clone());
    mf.set_help(desc.help.clone());

    let metrics = match desc.kind {
        // The text format has no info type; info is a gauge fixed at 1.
        MetricKind::Info => {
            mf.set_field_type(MetricType::GAUGE);
            snapshot
                .info
                .as_ref()
                .map(|pairs| {
                    let labels = pairs.iter().map(|(k, v)| label(k, v)).collect();
                    vec![gauge(labels, 1.0)]
                })
                .unwrap_or_default()
        }
        MetricKind::Gauge => {
            mf.set_field_type(MetricType::GAUGE);
            series(snapshot)
                .map(|(labels, value)| gauge(labels, value))
                .collect()
        }
        MetricKind::Counter => {
            mf.set_field_type(MetricType::COUNTER);
            series(snapshot)
                .map(|(labels, value)| counter(labels, value))
                .collect()
        }
    };
    mf.set_metric(metrics);
    mf
}

fn series(snapshot: &FamilySnapshot) -> impl Iterator<Item = (Vec<LabelPair>, f64)> + '_ {
    snapshot.series.iter().map(|(values, value)| {
        let labels = snapshot
            .desc
            .label_names
            .iter()
            .zip(values)
            .map(|(name, value)| label(name, value))
            .collect();
        (labels, *value)
    })
}

fn label(name: &str, value: &str) -> LabelPair {
    let mut pair = LabelPair::default();
    pair.set_name(name.to_string());
    pair.set_value(value.to_string());
    pair
}

fn gauge(labels: Vec<LabelPair>, value: f64) -> proto::Metric {
    let mut g = proto::Gauge::default();
    g.set_value(value);
    let mut m = proto::Metric::from_gauge(g);
    m.set_label(labels);
    m
}

fn counter(labels: Vec<LabelPair>, value: f64) -> proto::Metric {
    let mut c = proto::Counter::default();
    c.set_value(value);
    let mut m = proto::Metric::from_label(labels);
    m.set_counter(c);
    m
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::catalog;
    use crate::metrics::registry::{MetricDesc, Registry};
    use prometheus::Encoder;
    use proptest::prelude::*;

    fn sample_registry() -> Registry {
        let registry = Registry::new();
        registry
            .declare(MetricDesc::info("custom_exporter_info", "Exporter info"))
            .unwrap();
        registry
            .declare(
                MetricDesc::gauge("weather_temperature_celsius", "Current temperature")
                    .with_labels(&["city", "country"]),
            )
            .unwrap();
        registry
            .declare(MetricDesc::gauge("crypto_btc_usd", "Bitcoin price USD"))
            .unwrap();
        registry
            .declare(MetricDesc::counter(
                "custom_exporter_requests_total",
                "Total external requests",
            ))
            .unwrap();
        registry
    }

    fn encode(registry: &Registry) -> String {
        render(&TextEncoder::new(), &registry.snapshot()).unwrap()
    }

    #[test]
    fn test_every_declared_family_has_a_series_before_writes() {
        let registry = Registry::new();
        catalog::declare_all(&registry).unwrap();
        catalog::seed_defaults(&registry, "Astana", "Kazakhstan").unwrap();
        catalog::seed_sources(&registry, ["weather", "prices"]).unwrap();
        registry
            .set_info(catalog::EXPORTER_INFO, &[("version", "1.0")])
            .unwrap();

        let output = encode(&registry);
        for desc in catalog::descriptors() {
            assert!(
                output.contains(&format!("# TYPE {} ", desc.name)),
                "{} has no TYPE line",
                desc.name
            );
            assert!(
                output.lines().any(|l| !l.starts_with('#') && l.starts_with(&desc.name)),
                "{} has no series",
                desc.name
            );
        }
        assert!(output
            .contains("weather_temperature_celsius{city=\"Astana\",country=\"Kazakhstan\"} 0\n"));
        assert!(output.contains("custom_exporter_fetch_failures_total{source=\"weather\"} 0\n"));
        assert!(output.contains("custom_exporter_source_up{source=\"prices\"} 0\n"));
    }

    #[test]
    fn test_unwritten_labeled_family_is_left_out() {
        let registry = sample_registry();
        let output = encode(&registry);

        assert!(output.contains("# HELP crypto_btc_usd Bitcoin price USD\n"));
        assert!(output.contains("# TYPE crypto_btc_usd gauge\n"));
        assert!(output.contains("crypto_btc_usd 0\n"));
        assert!(output.contains("# TYPE custom_exporter_requests_total counter\n"));
        assert!(output.contains("custom_exporter_requests_total 0\n"));
        assert!(!output.contains("weather_temperature_celsius"));
        assert_eq!(families(&registry.snapshot()).len(), 2);
    }

    #[test]
    fn test_render_labeled_series() {
        let registry = sample_registry();
        registry
            .set("weather_temperature_celsius", &["Astana", "Kazakhstan"], -12.5)
            .unwrap();

        let output = encode(&registry);
        assert!(output
            .contains("weather_temperature_celsius{city=\"Astana\",country=\"Kazakhstan\"} -12.5\n"));
    }

    #[test]
    fn test_render_info_as_single_series() {
        let registry = sample_registry();
        registry
            .set_info(
                "custom_exporter_info",
                &[("version", "1.0"), ("author", "Student")],
            )
            .unwrap();

        let output = encode(&registry);
        assert!(output.contains("# TYPE custom_exporter_info gauge\n"));
        assert!(output.contains("custom_exporter_info{version=\"1.0\",author=\"Student\"} 1\n"));
    }

    #[test]
    fn test_family_kinds() {
        let registry = sample_registry();
        registry.set_info("custom_exporter_info", &[("version", "1.0")]).unwrap();

        let families = families(&registry.snapshot());
        let kind = |name: &str| {
            families
                .iter()
                .find(|mf| mf.get_name() == name)
                .map(|mf| mf.get_field_type())
        };
        assert_eq!(kind("custom_exporter_info"), Some(MetricType::GAUGE));
        assert_eq!(kind("crypto_btc_usd"), Some(MetricType::GAUGE));
        assert_eq!(kind("custom_exporter_requests_total"), Some(MetricType::COUNTER));
    }

    #[test]
    fn test_render_header_order() {
        let output = encode(&sample_registry());
        let help = output.find("# HELP crypto_btc_usd").unwrap();
        let type_line = output.find("# TYPE crypto_btc_usd").unwrap();
        let sample = output.find("crypto_btc_usd 0").unwrap();
        assert!(help < type_line && type_line < sample);
    }

    #[test]
    fn test_label_values_are_escaped() {
        let registry = sample_registry();
        registry
            .set("weather_temperature_celsius", &["a\"b\\c", "x\ny"], 1.0)
            .unwrap();

        let output = encode(&registry);
        assert!(output
            .contains("weather_temperature_celsius{city=\"a\\\"b\\\\c\",country=\"x\\ny\"} 1\n"));
    }

    #[test]
    fn test_content_type() {
        let encoder = TextEncoder::new();
        assert!(encoder.format_type().starts_with("text/plain"));
        assert!(encoder.format_type().contains("version=0.0.4"));
    }

    proptest! {
        /// Rendering twice with no intervening write yields identical bytes.
        #[test]
        fn prop_render_is_idempotent(
            values in prop::collection::vec(-1.0e9f64..1.0e9, 1..20),
            cities in prop::collection::vec("[A-Za-z]{1,8}", 1..20),
        ) {
            let registry = sample_registry();
            for (value, city) in values.iter().zip(cities.iter()) {
                registry
                    .set("weather_temperature_celsius", &[city.as_str(), "KZ"], *value)
                    .unwrap();
                registry.set("crypto_btc_usd", &[], *value).unwrap();
            }

            let first = encode(&registry);
            let second = encode(&registry);
            prop_assert_eq!(first, second);
        }
    }
}
