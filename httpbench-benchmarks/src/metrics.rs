//! Normalization of load generator reports into [`MetricsRecord`]s
//!
//! Two report layouts are understood: a nested one with `transfer`,
//! `requests` and `latencies` objects, and the flat key layout printed by
//! `rewrk --json` (`transfer_total`, `latency_std_deviation`, ...).

use httpbench_common::{
    HarnessError, LatencyMetrics, MetricsRecord, RequestMetrics, Result, TransferMetrics,
    CATEGORIES,
};
use serde_json::{Map, Value};
use tracing::debug;

/// Flat report keys, mapped to (category, field)
const FLAT_KEYS: &[(&str, &str, &str)] = &[
    ("transfer_total", "transfer", "total"),
    ("transfer_rate", "transfer", "rate"),
    ("requests_total", "requests", "total"),
    ("requests_avg", "requests", "avg"),
    ("latency_min", "latencies", "min"),
    ("latency_max", "latencies", "max"),
    ("latency_avg", "latencies", "avg"),
    ("latency_std_deviation", "latencies", "stdev"),
];

/// Parse raw load generator output into a metrics record.
///
/// Absent fields stay absent; nothing is defaulted to zero.
pub fn normalize(raw: &str) -> Result<MetricsRecord> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| HarnessError::Parse(format!("output is not valid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| HarnessError::Parse("output is not a JSON object".to_string()))?;

    let nested = CATEGORIES.iter().any(|category| object.contains_key(*category));
    let categories = if nested {
        debug!("Normalizing nested report");
        nested_categories(object)?
    } else {
        debug!("Normalizing flat report");
        flat_categories(object)
    };

    let missing: Vec<&str> = CATEGORIES
        .iter()
        .copied()
        .filter(|category| !categories.contains_key(*category))
        .collect();
    if !missing.is_empty() {
        return Err(HarnessError::Parse(format!(
            "report is missing expected fields: {}",
            missing.join(", ")
        )));
    }

    let record = MetricsRecord {
        transfer: Some(TransferMetrics {
            total: total_field(&categories["transfer"], "transfer.total")?,
            rate: number_field(&categories["transfer"], "transfer.rate")?,
        }),
        requests: Some(RequestMetrics {
            total: total_field(&categories["requests"], "requests.total")?,
            avg: number_field(&categories["requests"], "requests.avg")?,
        }),
        latencies: Some(LatencyMetrics {
            min: number_field(&categories["latencies"], "latencies.min")?,
            max: number_field(&categories["latencies"], "latencies.max")?,
            avg: number_field(&categories["latencies"], "latencies.avg")?,
            stdev: number_field(&categories["latencies"], "latencies.stdev")?,
        }),
    };
    record.validate().map_err(HarnessError::Parse)?;
    Ok(record)
}

type Categories = std::collections::HashMap<&'static str, Map<String, Value>>;

fn nested_categories(object: &Map<String, Value>) -> Result<Categories> {
    let mut categories = Categories::new();
    for category in CATEGORIES {
        match object.get(category) {
            Some(Value::Object(fields)) => {
                categories.insert(category, fields.clone());
            }
            Some(other) => {
                return Err(HarnessError::Parse(format!(
                    "{} must be an object, found {}",
                    category,
                    type_name(other)
                )))
            }
            None => {}
        }
    }
    Ok(categories)
}

fn flat_categories(object: &Map<String, Value>) -> Categories {
    let mut categories = Categories::new();
    for (key, category, field) in FLAT_KEYS {
        if let Some(value) = object.get(*key) {
            categories
                .entry(*category)
                .or_default()
                .insert(field.to_string(), value.clone());
        }
    }
    categories
}

fn field<'a>(fields: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let name = path.rsplit('.').next().unwrap_or(path);
    fields.get(name).filter(|value| !value.is_null())
}

fn number_field(fields: &Map<String, Value>, path: &str) -> Result<Option<f64>> {
    match field(fields, path) {
        None => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            HarnessError::Parse(format!("{} must be a number, found {}", path, type_name(value)))
        }),
    }
}

fn total_field(fields: &Map<String, Value>, path: &str) -> Result<Option<u64>> {
    match field(fields, path) {
        None => Ok(None),
        Some(value) => {
            if let Some(total) = value.as_u64() {
                return Ok(Some(total));
            }
            match value.as_f64() {
                Some(total) if total >= 0.0 && total.fract() == 0.0 && total <= u64::MAX as f64 => {
                    Ok(Some(total as u64))
                }
                _ => Err(HarnessError::Parse(format!(
                    "{} must be a non-negative integer, found {}",
                    path, value
                ))),
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
