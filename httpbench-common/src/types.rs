use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category names in report order
pub const CATEGORY_TRANSFER: &str = "transfer";
pub const CATEGORY_REQUESTS: &str = "requests";
pub const CATEGORY_LATENCIES: &str = "latencies";

pub const CATEGORIES: [&str; 3] = [CATEGORY_TRANSFER, CATEGORY_REQUESTS, CATEGORY_LATENCIES];

/// Bytes moved during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferMetrics {
    /// Total bytes transferred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Bytes per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

/// Request counters for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestMetrics {
    /// Total requests completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Requests per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
}

/// Latency distribution, in whatever time unit the load generator reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LatencyMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdev: Option<f64>,
}

/// Canonical result of a single load test.
///
/// Every category and field may be absent. Absent values are omitted from the
/// serialized form rather than written as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<RequestMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latencies: Option<LatencyMetrics>,
}

/// A single field value. Counters stay integral so large totals compare exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Count(u64),
    Measure(f64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Count(count) => count as f64,
            MetricValue::Measure(value) => value,
        }
    }

    pub fn is_finite(self) -> bool {
        match self {
            MetricValue::Count(_) => true,
            MetricValue::Measure(value) => value.is_finite(),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(count) => write!(f, "{}", count),
            MetricValue::Measure(value) => write!(f, "{}", value),
        }
    }
}

/// Present fields of one category, keyed by field name
pub type CategoryFields = BTreeMap<&'static str, MetricValue>;

impl MetricsRecord {
    /// Field view of a single category, `None` when the category is absent.
    pub fn category(&self, name: &str) -> Option<CategoryFields> {
        let mut fields = CategoryFields::new();
        match name {
            CATEGORY_TRANSFER => {
                let transfer = self.transfer.as_ref()?;
                insert(&mut fields, "total", transfer.total.map(MetricValue::Count));
                insert(&mut fields, "rate", transfer.rate.map(MetricValue::Measure));
            }
            CATEGORY_REQUESTS => {
                let requests = self.requests.as_ref()?;
                insert(&mut fields, "total", requests.total.map(MetricValue::Count));
                insert(&mut fields, "avg", requests.avg.map(MetricValue::Measure));
            }
            CATEGORY_LATENCIES => {
                let latencies = self.latencies.as_ref()?;
                insert(&mut fields, "min", latencies.min.map(MetricValue::Measure));
                insert(&mut fields, "max", latencies.max.map(MetricValue::Measure));
                insert(&mut fields, "avg", latencies.avg.map(MetricValue::Measure));
                insert(&mut fields, "stdev", latencies.stdev.map(MetricValue::Measure));
            }
            _ => return None,
        }
        Some(fields)
    }

    /// All present categories in report order
    pub fn categories(&self) -> Vec<(&'static str, CategoryFields)> {
        CATEGORIES
            .iter()
            .filter_map(|&name| self.category(name).map(|fields| (name, fields)))
            .collect()
    }

    /// Check that every present value is finite.
    pub fn validate(&self) -> Result<(), String> {
        for (category, fields) in self.categories() {
            for (field, value) in fields {
                if !value.is_finite() {
                    return Err(format!("{}.{} is not a finite number ({})", category, field, value));
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.transfer.is_none() && self.requests.is_none() && self.latencies.is_none()
    }
}

fn insert(fields: &mut CategoryFields, name: &'static str, value: Option<MetricValue>) {
    if let Some(value) = value {
        fields.insert(name, value);
    }
}

impl fmt::Display for MetricsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (category, fields) in self.categories() {
            for (field, value) in fields {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}.{}={}", category, field, value)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MetricsRecord {
        MetricsRecord {
            transfer: Some(TransferMetrics { total: Some(1_048_576), rate: Some(1_048_576.0) }),
            requests: Some(RequestMetrics { total: Some(1000), avg: Some(33.3) }),
            latencies: Some(LatencyMetrics {
                min: Some(1.0),
                max: Some(50.0),
                avg: Some(10.0),
                stdev: Some(5.0),
            }),
        }
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let record = MetricsRecord {
            requests: Some(RequestMetrics { total: Some(10), avg: None }),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"requests":{"total":10}}"#);
    }

    #[test]
    fn test_category_view_order() {
        let names: Vec<_> = sample().categories().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["transfer", "requests", "latencies"]);

        let latencies = sample().category("latencies").unwrap();
        let fields: Vec<_> = latencies.keys().copied().collect();
        assert_eq!(fields, vec!["avg", "max", "min", "stdev"]);
    }

    #[test]
    fn test_missing_category() {
        let record = MetricsRecord::default();
        assert!(record.is_empty());
        assert!(record.category("transfer").is_none());
        assert!(record.category("bogus").is_none());
    }

    #[test]
    fn test_totals_stay_integral() {
        let record = MetricsRecord {
            requests: Some(RequestMetrics { total: Some(u64::MAX), avg: Some(1.5) }),
            ..Default::default()
        };
        let requests = record.category("requests").unwrap();
        assert_eq!(requests["total"], MetricValue::Count(u64::MAX));
        assert_eq!(requests["avg"], MetricValue::Measure(1.5));
        assert_eq!(record.to_string(), format!("requests.avg=1.5, requests.total={}", u64::MAX));
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut record = sample();
        assert!(record.validate().is_ok());
        record.latencies.as_mut().unwrap().max = Some(f64::INFINITY);
        let err = record.validate().unwrap_err();
        assert!(err.contains("latencies.max"));
    }
}
