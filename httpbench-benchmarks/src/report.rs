//! Comparison reports between benchmark runs
//!
//! Reports are Markdown so they can be pasted into review comments as-is.
//! Row order is fixed (categories in report order, fields sorted by name),
//! which keeps repeated runs over the same data byte-identical.

use crate::utils::{format_bytes, format_delta, format_number};
use httpbench_common::{HarnessError, MetricValue, MetricsRecord, CATEGORIES, CATEGORY_TRANSFER};
use std::collections::BTreeSet;
use std::fmt;
use tabled::builder::Builder;
use tabled::settings::Style;

/// How a report is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// The benchmark that was just run: Old, New and Diff columns
    Active,
    /// A previously recorded benchmark shown for context: a single Value column
    Historical,
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportMode::Active => write!(f, "active"),
            ReportMode::Historical => write!(f, "historical"),
        }
    }
}

/// Direction of a change between two runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// New value is larger
    Plus,
    /// New value is smaller
    Minus,
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sign::Plus => write!(f, "+"),
            Sign::Minus => write!(f, "-"),
        }
    }
}

/// One aligned field of a comparison
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub category: &'static str,
    pub field: &'static str,
    /// Formatted previous value, `None` renders blank
    pub old: Option<String>,
    /// Formatted current value, `None` renders blank
    pub new: Option<String>,
    /// Formatted absolute difference, only when both sides exist and differ
    pub delta: Option<String>,
    pub sign: Option<Sign>,
}

impl ComparisonRow {
    pub fn label(&self) -> String {
        format!("{}.{}", self.category, self.field)
    }

    fn diff_cell(&self) -> String {
        match (&self.delta, self.sign) {
            (Some(delta), Some(sign)) => format!("{} {}", sign, delta),
            _ => String::new(),
        }
    }
}

fn format_value(category: &str, value: MetricValue) -> String {
    match value {
        _ if category == CATEGORY_TRANSFER => format_bytes(value.as_f64()),
        MetricValue::Count(count) => count.to_string(),
        MetricValue::Measure(value) => format_number(value),
    }
}

/// Formatted absolute difference and its direction, `None` when equal
fn difference(category: &str, old: MetricValue, new: MetricValue) -> Option<(String, Sign)> {
    if old == new {
        return None;
    }

    match (old, new) {
        (MetricValue::Count(old), MetricValue::Count(new)) => {
            let sign = if new > old { Sign::Plus } else { Sign::Minus };
            let delta = old.abs_diff(new);
            let text = if category == CATEGORY_TRANSFER {
                format_bytes(delta as f64)
            } else {
                delta.to_string()
            };
            Some((text, sign))
        }
        _ => {
            let (old, new) = (old.as_f64(), new.as_f64());
            if old == new {
                return None;
            }
            let sign = if new > old { Sign::Plus } else { Sign::Minus };
            let text = if category == CATEGORY_TRANSFER {
                format_bytes((new - old).abs())
            } else {
                format_delta(old, new)
            };
            Some((text, sign))
        }
    }
}

/// Align two records field by field.
///
/// Covers every category present in either record and, within each, every
/// field present in either. A delta is only computed when both values exist
/// and differ.
pub fn compare(previous: Option<&MetricsRecord>, current: &MetricsRecord) -> Vec<ComparisonRow> {
    let mut rows = Vec::new();

    for category in CATEGORIES {
        let old_fields = previous.and_then(|record| record.category(category));
        let new_fields = current.category(category);
        if old_fields.is_none() && new_fields.is_none() {
            continue;
        }

        let field_names: BTreeSet<&'static str> = old_fields
            .iter()
            .chain(new_fields.iter())
            .flat_map(|fields| fields.keys().copied())
            .collect();

        for field in field_names {
            let old = old_fields.as_ref().and_then(|fields| fields.get(field).copied());
            let new = new_fields.as_ref().and_then(|fields| fields.get(field).copied());

            let (delta, sign) = match (old, new) {
                (Some(old), Some(new)) => match difference(category, old, new) {
                    Some((delta, sign)) => (Some(delta), Some(sign)),
                    None => (None, None),
                },
                _ => (None, None),
            };

            rows.push(ComparisonRow {
                category,
                field,
                old: old.map(|v| format_value(category, v)),
                new: new.map(|v| format_value(category, v)),
                delta,
                sign,
            });
        }
    }

    rows
}

/// Render one benchmark's report as a Markdown section.
///
/// In [`ReportMode::Historical`] only `current` is shown; `previous` is
/// ignored.
pub fn render_report(
    name: &str,
    mode: ReportMode,
    previous: Option<&MetricsRecord>,
    current: &MetricsRecord,
) -> String {
    let mut builder = Builder::default();

    match mode {
        ReportMode::Active => {
            builder.push_record(header(&["Stat", "Old", "New", "Diff"]));
            for row in compare(previous, current) {
                builder.push_record(vec![
                    row.label(),
                    row.old.clone().unwrap_or_default(),
                    row.new.clone().unwrap_or_default(),
                    row.diff_cell(),
                ]);
            }
        }
        ReportMode::Historical => {
            builder.push_record(header(&["Stat", "Value"]));
            for row in compare(None, current) {
                builder.push_record(vec![row.label(), row.new.unwrap_or_default()]);
            }
        }
    }

    let mut table = builder.build();
    table.with(Style::markdown());

    format!("{}\n\n{}\n", heading(name, mode), table)
}

/// Render the inline section for an entry that could not be reported
pub fn render_entry_error(name: &str, error: &HarnessError) -> String {
    format!("### {}\n\n> Unable to render this entry: {}\n", name, error)
}

fn heading(name: &str, mode: ReportMode) -> String {
    match mode {
        ReportMode::Active => format!("### {} (active)", name),
        ReportMode::Historical => format!("### {}", name),
    }
}

fn header(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}
