//! Tabular query results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rows and columns returned by a query, cells kept as JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Build from rows of `(column, value)` pairs in select-list order.
    ///
    /// Columns are matched by position, so repeated names (`?column?`, two
    /// `name` columns from a join) keep their own values.
    pub fn from_pairs(pairs: Vec<Vec<(String, Value)>>) -> Self {
        let columns: Vec<String> = pairs
            .first()
            .map(|first| first.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default();

        let rows = pairs
            .into_iter()
            .map(|row| row.into_iter().map(|(_, value)| value).collect())
            .collect();

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at `(row, column)`, if both exist.
    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Markdown table, used to feed intermediate results back to the model.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("| ");
        out.push_str(&self.columns.join(" | "));
        out.push_str(" |\n|");
        for _ in &self.columns {
            out.push_str(" --- |");
        }
        out.push('\n');

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|v| render_cell(v).replace('|', "\\|").replace('\n', " "))
                .collect();
            out.push_str("| ");
            out.push_str(&cells.join(" | "));
            out.push_str(" |\n");
        }
        out
    }
}

/// Plain-text rendering of a cell: strings unquoted, SQL NULL as `NULL`.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
