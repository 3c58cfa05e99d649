//! Metric Registry
//!
//! Owns every metric family declared at startup. Families are indexed by
//! name; each family maps a label-value tuple to one value.
//!
//! A single `parking_lot::RwLock` guards the whole registry: a write touches
//! one series under the write lock, and [`Registry::snapshot`] copies all
//! families under the read lock. Rendering works on the copy, so no lock is
//! held while a response is being built and no family is ever observed
//! half-updated.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::RegistryError;

/// Result alias for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

// =============================================================================
// Metric Kind
// =============================================================================

/// Kind of a metric family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Arbitrary finite value, last write wins
    Gauge,
    /// Monotonically non-decreasing
    Counter,
    /// Static key/value metadata, set once
    Info,
}

impl MetricKind {
    fn name(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Info => "info",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Family Descriptor
// =============================================================================

/// Immutable identity of a metric family
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDesc {
    /// Metric name, unique within the registry
    pub name: String,
    /// Help text
    pub help: String,
    /// Kind
    pub kind: MetricKind,
    /// Label names, in order
    pub label_names: Vec<String>,
}

impl MetricDesc {
    /// Describe a family
    pub fn new(name: &str, help: &str, kind: MetricKind, label_names: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// Unlabeled gauge
    pub fn gauge(name: &str, help: &str) -> Self {
        Self::new(name, help, MetricKind::Gauge, &[])
    }

    /// Unlabeled counter
    pub fn counter(name: &str, help: &str) -> Self {
        Self::new(name, help, MetricKind::Counter, &[])
    }

    /// Info family
    pub fn info(name: &str, help: &str) -> Self {
        Self::new(name, help, MetricKind::Info, &[])
    }

    /// Attach label names
    pub fn with_labels(mut self, label_names: &[&str]) -> Self {
        self.label_names = label_names.iter().map(|l| l.to_string()).collect();
        self
    }
}

// =============================================================================
// Snapshot Types
// =============================================================================

/// Point-in-time copy of one family
#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    /// Family identity
    pub desc: MetricDesc,
    /// Label-value tuple to value, ordered for stable rendering
    pub series: BTreeMap<Vec<String>, f64>,
    /// Info key/value pairs (info families only)
    pub info: Option<Vec<(String, String)>>,
}

/// Point-in-time copy of the whole registry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Families in declaration order
    pub families: Vec<FamilySnapshot>,
}

impl Snapshot {
    /// Look up a family by name
    pub fn family(&self, name: &str) -> Option<&FamilySnapshot> {
        self.families.iter().find(|f| f.desc.name == name)
    }

    /// Value of one series, if it exists
    pub fn value(&self, name: &str, label_values: &[&str]) -> Option<f64> {
        let family = self.family(name)?;
        let key: Vec<String> = label_values.iter().map(|v| v.to_string()).collect();
        family.series.get(&key).copied()
    }

    /// Total number of series across all families
    pub fn series_count(&self) -> usize {
        self.families
            .iter()
            .map(|f| if f.info.is_some() { 1 } else { f.series.len() })
            .sum()
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Default)]
struct RegistryState {
    families: Vec<FamilySnapshot>,
    index: HashMap<String, usize>,
}

impl RegistryState {
    fn family_mut(&mut self, name: &str) -> RegistryResult<&mut FamilySnapshot> {
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| RegistryError::UnknownMetric(name.to_string()))?;
        Ok(&mut self.families[idx])
    }
}

/// Thread-safe registry of metric families
#[derive(Debug, Default)]
pub struct Registry {
    state: RwLock<RegistryState>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a family.
    ///
    /// Unlabeled gauges and counters get a zero-valued series immediately so
    /// the family is exposed before its first write.
    pub fn declare(&self, desc: MetricDesc) -> RegistryResult<()> {
        let mut state = self.state.write();
        if state.index.contains_key(&desc.name) {
            return Err(RegistryError::DuplicateMetric(desc.name));
        }

        let mut series = BTreeMap::new();
        if desc.label_names.is_empty() && desc.kind != MetricKind::Info {
            series.insert(Vec::new(), 0.0);
        }

        let idx = state.families.len();
        state.index.insert(desc.name.clone(), idx);
        state.families.push(FamilySnapshot {
            desc,
            series,
            info: None,
        });
        Ok(())
    }

    /// Set a gauge series, creating it on first write
    pub fn set(&self, name: &str, label_values: &[&str], value: f64) -> RegistryResult<()> {
        let mut state = self.state.write();
        let family = state.family_mut(name)?;
        check_kind(family, MetricKind::Gauge, "set")?;
        check_arity(family, label_values)?;
        if !value.is_finite() {
            return Err(RegistryError::NonFiniteValue {
                name: name.to_string(),
                value,
            });
        }

        family.series.insert(owned(label_values), value);
        Ok(())
    }

    /// Add a non-negative delta to a counter series
    pub fn increment(&self, name: &str, label_values: &[&str], delta: f64) -> RegistryResult<()> {
        let mut state = self.state.write();
        let family = state.family_mut(name)?;
        check_kind(family, MetricKind::Counter, "increment")?;
        check_arity(family, label_values)?;
        if !delta.is_finite() {
            return Err(RegistryError::NonFiniteValue {
                name: name.to_string(),
                value: delta,
            });
        }
        if delta < 0.0 {
            return Err(RegistryError::InvalidDelta {
                name: name.to_string(),
                delta,
            });
        }

        *family.series.entry(owned(label_values)).or_insert(0.0) += delta;
        Ok(())
    }

    /// Record the key/value pairs of an info family. Allowed once.
    pub fn set_info(&self, name: &str, pairs: &[(&str, &str)]) -> RegistryResult<()> {
        let mut state = self.state.write();
        let family = state.family_mut(name)?;
        check_kind(family, MetricKind::Info, "set_info")?;
        if family.info.is_some() {
            return Err(RegistryError::InfoAlreadySet(name.to_string()));
        }

        family.info = Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        Ok(())
    }

    /// Current value of one series
    pub fn get(&self, name: &str, label_values: &[&str]) -> Option<f64> {
        let state = self.state.read();
        let idx = *state.index.get(name)?;
        state.families[idx].series.get(&owned(label_values)).copied()
    }

    /// Whether a family with this name is declared
    pub fn contains(&self, name: &str) -> bool {
        self.state.read().index.contains_key(name)
    }

    /// Number of declared families
    pub fn len(&self) -> usize {
        self.state.read().families.len()
    }

    /// Whether no family has been declared
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consistent copy of every family
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            families: state.families.clone(),
        }
    }
}

fn owned(label_values: &[&str]) -> Vec<String> {
    label_values.iter().map(|v| v.to_string()).collect()
}

fn check_kind(
    family: &FamilySnapshot,
    expected: MetricKind,
    operation: &'static str,
) -> RegistryResult<()> {
    if family.desc.kind != expected {
        return Err(RegistryError::KindMismatch {
            name: family.desc.name.clone(),
            kind: family.desc.kind.name(),
            operation,
        });
    }
    Ok(())
}

fn check_arity(family: &FamilySnapshot, label_values: &[&str]) -> RegistryResult<()> {
    let expected = family.desc.label_names.len();
    if label_values.len() != expected {
        return Err(RegistryError::LabelArity {
            name: family.desc.name.clone(),
            expected,
            got: label_values.len(),
        });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn registry() -> Registry {
        let registry = Registry::new();
        registry
            .declare(MetricDesc::gauge("temp", "Temperature").with_labels(&["city", "country"]))
            .unwrap();
        registry
            .declare(MetricDesc::counter("requests_total", "Requests"))
            .unwrap();
        registry.declare(MetricDesc::gauge("up", "Up")).unwrap();
        registry
            .declare(MetricDesc::info("build_info", "Build"))
            .unwrap();
        registry
    }

    #[test]
    fn test_declare_duplicate() {
        let registry = registry();
        let err = registry
            .declare(MetricDesc::gauge("up", "Again"))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateMetric("up".into()));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_unlabeled_families_start_at_zero() {
        let registry = registry();
        assert_eq!(registry.get("up", &[]), Some(0.0));
        assert_eq!(registry.get("requests_total", &[]), Some(0.0));
        // Labeled families have no series until first write
        assert_eq!(registry.get("temp", &["Astana", "Kazakhstan"]), None);
    }

    #[test]
    fn test_set_last_write_wins() {
        let registry = registry();
        registry.set("temp", &["Astana", "Kazakhstan"], -3.5).unwrap();
        registry.set("temp", &["Astana", "Kazakhstan"], 1.25).unwrap();
        registry.set("temp", &["Almaty", "Kazakhstan"], 7.0).unwrap();

        assert_eq!(registry.get("temp", &["Astana", "Kazakhstan"]), Some(1.25));
        assert_eq!(registry.get("temp", &["Almaty", "Kazakhstan"]), Some(7.0));
        assert_eq!(registry.snapshot().family("temp").unwrap().series.len(), 2);
    }

    #[test]
    fn test_set_unknown_metric() {
        let registry = registry();
        assert_matches!(
            registry.set("missing", &[], 1.0),
            Err(RegistryError::UnknownMetric(name)) if name == "missing"
        );
    }

    #[test]
    fn test_set_label_arity() {
        let registry = registry();
        assert_matches!(
            registry.set("temp", &["Astana"], 1.0),
            Err(RegistryError::LabelArity { expected: 2, got: 1, .. })
        );
        assert_matches!(
            registry.set("up", &["extra"], 1.0),
            Err(RegistryError::LabelArity { expected: 0, got: 1, .. })
        );
    }

    #[test]
    fn test_set_rejects_non_finite() {
        let registry = registry();
        assert_matches!(
            registry.set("up", &[], f64::NAN),
            Err(RegistryError::NonFiniteValue { .. })
        );
        assert_eq!(registry.get("up", &[]), Some(0.0));
    }

    #[test]
    fn test_sentinel_is_a_valid_gauge_value() {
        let registry = registry();
        registry.set("up", &[], -1.0).unwrap();
        assert_eq!(registry.get("up", &[]), Some(-1.0));
    }

    #[test]
    fn test_increment() {
        let registry = registry();
        registry.increment("requests_total", &[], 1.0).unwrap();
        registry.increment("requests_total", &[], 2.0).unwrap();
        registry.increment("requests_total", &[], 0.0).unwrap();
        assert_eq!(registry.get("requests_total", &[]), Some(3.0));
    }

    #[test]
    fn test_increment_negative_delta() {
        let registry = registry();
        assert_matches!(
            registry.increment("requests_total", &[], -1.0),
            Err(RegistryError::InvalidDelta { .. })
        );
        assert_eq!(registry.get("requests_total", &[]), Some(0.0));
    }

    #[test]
    fn test_kind_mismatch() {
        let registry = registry();
        assert_matches!(
            registry.set("requests_total", &[], 5.0),
            Err(RegistryError::KindMismatch { operation: "set", kind: "counter", .. })
        );
        assert_matches!(
            registry.increment("up", &[], 1.0),
            Err(RegistryError::KindMismatch { operation: "increment", kind: "gauge", .. })
        );
        assert_matches!(
            registry.set_info("up", &[("a", "b")]),
            Err(RegistryError::KindMismatch { .. })
        );
    }

    #[test]
    fn test_info_set_once() {
        let registry = registry();
        registry
            .set_info("build_info", &[("version", "1.0")])
            .unwrap();
        assert_matches!(
            registry.set_info("build_info", &[("version", "2.0")]),
            Err(RegistryError::InfoAlreadySet(_))
        );

        let snapshot = registry.snapshot();
        let info = snapshot.family("build_info").unwrap().info.as_ref().unwrap();
        assert_eq!(info, &vec![("version".to_string(), "1.0".to_string())]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = registry();
        registry.set("up", &[], 1.0).unwrap();
        let snapshot = registry.snapshot();
        registry.set("up", &[], 0.0).unwrap();

        assert_eq!(snapshot.value("up", &[]), Some(1.0));
        assert_eq!(registry.get("up", &[]), Some(0.0));
    }

    #[test]
    fn test_snapshot_preserves_declaration_order() {
        let snapshot = registry().snapshot();
        let names: Vec<&str> = snapshot
            .families
            .iter()
            .map(|f| f.desc.name.as_str())
            .collect();
        assert_eq!(names, vec!["temp", "requests_total", "up", "build_info"]);
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let registry = Arc::new(registry());
        let mut handles = Vec::new();

        for t in 0..4 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    registry.increment("requests_total", &[], 1.0).unwrap();
                    registry.set("up", &[], t as f64).unwrap();
                }
            }));
        }
        for _ in 0..2 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    let snapshot = registry.snapshot();
                    assert_eq!(snapshot.families.len(), 4);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.get("requests_total", &[]), Some(4000.0));
    }
}
