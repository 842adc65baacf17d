use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A single cell of a query result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Text(String),
    Number(f64),
    Null,
}

impl Datum {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Number(n) => Some(*n),
            Datum::Text(s) => s.parse::<f64>().ok(),
            Datum::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Display form used for category labels and series keys.
    pub fn label(&self) -> String {
        match self {
            Datum::Text(s) => s.clone(),
            Datum::Number(n) => format_number(*n),
            Datum::Null => "null".to_string(),
        }
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Datum::Text(s.clone())),
            Value::Number(n) => n
                .as_f64()
                .map(Datum::Number)
                .ok_or_else(|| anyhow!("Numeric cell out of f64 range: {}", n)),
            Value::Null => Ok(Datum::Null),
            Value::Bool(b) => Ok(Datum::Text(b.to_string())),
            other => Err(anyhow!("Unsupported cell type: {}", other)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Datum::Text(s) => Value::String(s.clone()),
            Datum::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Datum::Null => Value::Null,
        }
    }
}

impl Serialize for Datum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Datum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Datum::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Format a number without a trailing ".0" ("3" not "3.0", "0.5" kept).
pub fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One query result row: column name -> scalar, in column order.
pub type Row = IndexMap<String, Datum>;

/// Build rows from a JSON array of objects (the host's row contract).
pub fn rows_from_json(value: &Value) -> Result<Vec<Row>> {
    let array = value
        .as_array()
        .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

    let mut rows = Vec::with_capacity(array.len());
    for item in array {
        let obj = item
            .as_object()
            .ok_or_else(|| anyhow!("Items in array must be objects"))?;

        let mut row = Row::new();
        for (key, val) in obj {
            row.insert(key.clone(), Datum::from_json(val)?);
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Build rows from CSV headers + string cells, sniffing numerics.
pub fn rows_from_csv(headers: &[String], records: &[Vec<String>]) -> Vec<Row> {
    records
        .iter()
        .map(|record| {
            let mut row = Row::new();
            for (i, header) in headers.iter().enumerate() {
                let cell = record.get(i).map(|s| s.as_str()).unwrap_or("");
                let datum = if cell.is_empty() {
                    Datum::Null
                } else if let Ok(n) = cell.parse::<f64>() {
                    Datum::Number(n)
                } else {
                    Datum::Text(cell.to_string())
                };
                row.insert(header.clone(), datum);
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_from_json() {
        let value = json!([
            {"month": "Jan'24", "sales": 10.5},
            {"month": "Feb'24", "sales": null},
        ]);
        let rows = rows_from_json(&value).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["month"], Datum::Text("Jan'24".to_string()));
        assert_eq!(rows[0]["sales"], Datum::Number(10.5));
        assert_eq!(rows[1]["sales"], Datum::Null);
    }

    #[test]
    fn test_rows_from_json_rejects_non_array() {
        let value = json!({"a": 1});
        assert!(rows_from_json(&value).is_err());
    }

    #[test]
    fn test_rows_from_csv_sniffs_numbers() {
        let headers = vec!["x".to_string(), "y".to_string()];
        let records = vec![vec!["A".to_string(), "3.5".to_string()]];
        let rows = rows_from_csv(&headers, &records);
        assert_eq!(rows[0]["x"], Datum::Text("A".to_string()));
        assert_eq!(rows[0]["y"], Datum::Number(3.5));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-2.0), "-2");
    }
}
