//! Typed aggregation queries
//!
//! Every identifier in the generated SQL comes from the enums below, so no
//! caller-supplied text ever reaches the statement.

use serde_json::Value;

/// Groupable stored column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Label,
    Gender,
    Faf,
    Smoke,
    Favc,
    FamilyHistory,
    Caec,
    Calc,
    Mtrans,
}

impl Column {
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            Column::Label => "prediction",
            Column::Gender => "gender",
            Column::Faf => "faf",
            Column::Smoke => "smoke",
            Column::Favc => "favc",
            Column::FamilyHistory => "family_history_with_overweight",
            Column::Caec => "caec",
            Column::Calc => "calc",
            Column::Mtrans => "mtrans",
        }
    }

    fn is_integer(&self) -> bool {
        matches!(self, Column::Faf)
    }
}

/// Numeric stored column usable in averages and buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericColumn {
    Age,
    Height,
    Weight,
    Faf,
}

impl NumericColumn {
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            NumericColumn::Age => "age",
            NumericColumn::Height => "height",
            NumericColumn::Weight => "weight",
            NumericColumn::Faf => "faf",
        }
    }
}

/// One grouping dimension
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// Distinct values of a column
    Column(Column),
    /// Bucket index of a numeric column. Values below `upper_bounds[i]`
    /// (and not below an earlier bound) land in bucket `i`; anything at or
    /// above the last bound lands in bucket `upper_bounds.len()`.
    Bucket {
        column: NumericColumn,
        upper_bounds: Vec<i64>,
    },
}

impl GroupKey {
    pub fn column(column: Column) -> Self {
        GroupKey::Column(column)
    }

    pub fn bucket(column: NumericColumn, upper_bounds: impl Into<Vec<i64>>) -> Self {
        GroupKey::Bucket {
            column,
            upper_bounds: upper_bounds.into(),
        }
    }

    pub(crate) fn is_integer(&self) -> bool {
        match self {
            GroupKey::Column(column) => column.is_integer(),
            GroupKey::Bucket { .. } => true,
        }
    }

    fn sql(&self) -> String {
        match self {
            GroupKey::Column(column) => column.sql().to_string(),
            GroupKey::Bucket { column, upper_bounds } => {
                if upper_bounds.is_empty() {
                    return "0".to_string();
                }
                let mut expr = String::from("CASE");
                for (i, bound) in upper_bounds.iter().enumerate() {
                    expr.push_str(&format!(" WHEN {} < {} THEN {}", column.sql(), bound, i));
                }
                expr.push_str(&format!(" ELSE {} END", upper_bounds.len()));
                expr
            }
        }
    }
}

/// Value computed per group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Count,
    Average(NumericColumn),
    /// Every value of the column within the group
    Collect(Column),
}

impl Metric {
    fn sql(&self) -> String {
        match self {
            Metric::Count => "COUNT(*)".to_string(),
            Metric::Average(column) => format!("AVG({})", column.sql()),
            Metric::Collect(column) => format!("json_group_array({})", column.sql()),
        }
    }
}

/// Grouped aggregation over the prediction history: one or two grouping
/// keys and any number of metrics. Groups come back in ascending key order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    keys: Vec<GroupKey>,
    metrics: Vec<Metric>,
}

impl AggregateQuery {
    /// Group by a single key
    pub fn by(key: GroupKey) -> Self {
        Self {
            keys: vec![key],
            metrics: Vec::new(),
        }
    }

    /// Group by a composite of two keys
    pub fn by_pair(first: GroupKey, second: GroupKey) -> Self {
        Self {
            keys: vec![first, second],
            metrics: Vec::new(),
        }
    }

    pub fn count(mut self) -> Self {
        self.metrics.push(Metric::Count);
        self
    }

    pub fn average(mut self, column: NumericColumn) -> Self {
        self.metrics.push(Metric::Average(column));
        self
    }

    pub fn collect(mut self, column: Column) -> Self {
        self.metrics.push(Metric::Collect(column));
        self
    }

    pub fn keys(&self) -> &[GroupKey] {
        &self.keys
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub(crate) fn to_sql(&self, table: &str) -> String {
        let mut select = Vec::with_capacity(self.keys.len() + self.metrics.len());
        let mut group = Vec::with_capacity(self.keys.len());
        for (i, key) in self.keys.iter().enumerate() {
            select.push(format!("{} AS k{}", key.sql(), i));
            group.push(format!("k{}", i));
        }
        for (i, metric) in self.metrics.iter().enumerate() {
            select.push(format!("{} AS m{}", metric.sql(), i));
        }
        // Collected lists follow insertion order only when rows reach the
        // aggregate in id order; SQLite keeps a subquery ORDER BY under an
        // aggregate outer query.
        let source = if self.metrics.iter().any(|m| matches!(m, Metric::Collect(_))) {
            format!("(SELECT * FROM {} ORDER BY id)", table)
        } else {
            table.to_string()
        };
        let group = group.join(", ");
        format!(
            "SELECT {} FROM {} GROUP BY {} ORDER BY {}",
            select.join(", "),
            source,
            group,
            group
        )
    }
}

/// Grouping value of one result row
#[derive(Debug, Clone, PartialEq)]
pub enum GroupValue {
    Text(String),
    Int(i64),
}

impl GroupValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            GroupValue::Text(s) => Some(s),
            GroupValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            GroupValue::Int(i) => Some(*i),
            GroupValue::Text(_) => None,
        }
    }
}

/// Metric value of one result row, in the order the metrics were added
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Count(i64),
    Average(f64),
    Values(Vec<Value>),
}

/// One group of an aggregation result
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub keys: Vec<GroupValue>,
    pub metrics: Vec<MetricValue>,
}

impl AggregateRow {
    /// First count metric of the row
    pub fn count(&self) -> i64 {
        self.metrics
            .iter()
            .find_map(|m| match m {
                MetricValue::Count(c) => Some(*c),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// First average metric of the row
    pub fn average(&self) -> Option<f64> {
        self.metrics.iter().find_map(|m| match m {
            MetricValue::Average(a) => Some(*a),
            _ => None,
        })
    }

    /// First collected value list of the row
    pub fn values(&self) -> &[Value] {
        self.metrics
            .iter()
            .find_map(|m| match m {
                MetricValue::Values(v) => Some(v.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}
