//! Text rendering of MySQL result rows.

use mysql_async::{Row, Value};

/// A result row with every value rendered as text.
///
/// The migrator only reads names, DDL text and history metadata, so a
/// text view of each column is all it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRow {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

impl TextRow {
    /// Build a row from column names and values.
    pub fn new(columns: Vec<String>, values: Vec<Option<String>>) -> Self {
        Self { columns, values }
    }

    /// Convert a driver row.
    pub fn from_row(row: Row) -> Self {
        let columns = row
            .columns_ref()
            .iter()
            .map(|c| c.name_str().to_string())
            .collect();
        let values = row.unwrap().into_iter().map(value_to_text).collect();
        Self { columns, values }
    }

    /// Value at a column index; `None` for NULL or out of range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// Value of a column by name, compared case-insensitively.
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|i| self.get(i))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Render a driver value as MySQL would print it.
pub fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Int(i) => Some(i.to_string()),
        Value::UInt(u) => Some(u.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Double(d) => Some(d.to_string()),
        Value::Date(year, month, day, hour, minute, second, micro) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if micro > 0 {
                text.push_str(&format!(".{micro:06}"));
            }
            Some(text)
        }
        Value::Time(is_neg, days, hours, minutes, seconds, micro) => {
            let sign = if is_neg { "-" } else { "" };
            let mut text = format!(
                "{}{:02}:{:02}:{:02}",
                sign,
                days * 24 + u32::from(hours),
                minutes,
                seconds
            );
            if micro > 0 {
                text.push_str(&format!(".{micro:06}"));
            }
            Some(text)
        }
    }
}
