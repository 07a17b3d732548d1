use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One table row as returned by the service. Key order is the column order.
pub type Record = serde_json::Map<String, Value>;

/// Normalized payload of one successful query response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub chart: Option<ChartSeries>,
    #[serde(default)]
    pub table: Vec<Record>,
    #[serde(default)]
    pub total_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// What a result set asks to be shown. Suggestions win over everything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload<'a> {
    Suggestions(&'a [String]),
    Results {
        summary: Option<&'a str>,
        chart: Option<&'a ChartSeries>,
        table: &'a [Record],
    },
    Empty,
}

impl ResultSet {
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.is_empty())
    }

    /// `None` for an absent chart and for the empty `{}` chart object.
    pub fn chart(&self) -> Option<&ChartSeries> {
        self.chart.as_ref().filter(|c| !c.datasets.is_empty())
    }

    pub fn suggestions(&self) -> Option<&[String]> {
        self.suggestions.as_deref().filter(|s| !s.is_empty())
    }

    /// Reported row count, falling back to the number of rows received.
    pub fn total_rows(&self) -> usize {
        match self.total_rows {
            Some(n) if n > 0 => n as usize,
            _ => self.table.len(),
        }
    }

    /// Column names in the key order of the first record.
    pub fn columns(&self) -> Vec<String> {
        self.table
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn payload(&self) -> Payload<'_> {
        if let Some(suggestions) = self.suggestions() {
            return Payload::Suggestions(suggestions);
        }

        let summary = self.summary();
        let chart = self.chart();
        if summary.is_none() && chart.is_none() && self.table.is_empty() {
            return Payload::Empty;
        }

        Payload::Results {
            summary,
            chart,
            table: &self.table,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub label: String,
    /// `data[i]` belongs to `labels[i]`; `None` is a gap.
    #[serde(default)]
    pub data: Vec<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub border_dash: Vec<f32>,
}

/// Structured error body of a rejected request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub error: String,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
}

impl std::fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub data_loaded: bool,
    #[serde(default)]
    pub total_records: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaList {
    #[serde(default)]
    pub areas: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub areas: Vec<String>,
}

/// Text form of a scalar cell: null is empty, whole floats print without a fraction.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => number_text(f),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn number_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}
