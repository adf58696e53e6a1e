//! In-memory columnar tables
//!
//! Every layer handed to a sink is a [`Table`]: named, typed, nullable columns
//! of equal length. Tables are small (one planet catalog) and fully
//! materialized.

use serde_json::Value;

use crate::error::{EtlError, Result};
use crate::extract::Record;

/// Logical column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int64,
    Float64,
    Utf8,
    Utf8List,
}

/// Column values, one entry per row
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Utf8(Vec<Option<String>>),
    Utf8List(Vec<Option<Vec<Option<String>>>>),
}

impl ColumnData {
    pub fn empty(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Int64 => ColumnData::Int64(Vec::new()),
            ColumnKind::Float64 => ColumnData::Float64(Vec::new()),
            ColumnKind::Utf8 => ColumnData::Utf8(Vec::new()),
            ColumnKind::Utf8List => ColumnData::Utf8List(Vec::new()),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Int64(_) => ColumnKind::Int64,
            ColumnData::Float64(_) => ColumnKind::Float64,
            ColumnData::Utf8(_) => ColumnKind::Utf8,
            ColumnData::Utf8List(_) => ColumnKind::Utf8List,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Utf8(v) => v.len(),
            ColumnData::Utf8List(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a JSON value, coerced to this column's type.
    ///
    /// Values that do not fit the type become null, except for text columns,
    /// which take the JSON rendering of non-string scalars.
    pub fn push_value(&mut self, value: Option<&Value>) {
        let value = value.filter(|v| !v.is_null());
        match self {
            ColumnData::Int64(v) => v.push(value.and_then(Value::as_i64)),
            ColumnData::Float64(v) => v.push(value.and_then(Value::as_f64)),
            ColumnData::Utf8(v) => v.push(value.map(text_of)),
            ColumnData::Utf8List(v) => v.push(value.map(|value| match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| (!item.is_null()).then(|| text_of(item)))
                    .collect(),
                scalar => vec![Some(text_of(scalar))],
            })),
        }
    }
}

/// String form of a JSON value as stored in text columns.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A named set of equal-length columns
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Build a table, checking that all columns have the same length and
    /// distinct names.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        let num_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);

        for (i, column) in columns.iter().enumerate() {
            if column.data.len() != num_rows {
                return Err(EtlError::malformed_table(
                    &name,
                    format!(
                        "column '{}' has {} rows, expected {}",
                        column.name,
                        column.data.len(),
                        num_rows
                    ),
                ));
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(EtlError::malformed_table(
                    &name,
                    format!("duplicate column '{}'", column.name),
                ));
            }
        }

        Ok(Self {
            name,
            columns,
            num_rows,
        })
    }

    /// Project `records` onto an explicit schema. Missing fields are null.
    pub fn from_schema(
        name: impl Into<String>,
        schema: &[(&str, ColumnKind)],
        records: &[&Record],
    ) -> Result<Self> {
        let columns = schema
            .iter()
            .map(|(field, kind)| {
                let mut data = ColumnData::empty(*kind);
                for record in records {
                    data.push_value(record.get(*field));
                }
                Column::new(*field, data)
            })
            .collect();

        Self::new(name, columns)
    }

    /// Build a table from free-form records, inferring one type per column.
    ///
    /// Columns appear in first-seen field order. A column is `Int64` when every
    /// non-null value is an integer, `Float64` when every non-null value is a
    /// number, `Utf8List` when every non-null value is an array, and `Utf8`
    /// otherwise (including all-null columns).
    pub fn from_records(name: impl Into<String>, records: &[Record]) -> Result<Self> {
        let mut fields: Vec<&str> = Vec::new();
        for record in records {
            for field in record.keys() {
                if !fields.contains(&field.as_str()) {
                    fields.push(field);
                }
            }
        }

        let schema: Vec<(&str, ColumnKind)> = fields
            .iter()
            .map(|field| (*field, infer_kind(records.iter().filter_map(|r| r.get(*field)))))
            .collect();

        let refs: Vec<&Record> = records.iter().collect();
        Self::from_schema(name, &schema, &refs)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;

    for value in values {
        let this = match value {
            Value::Null => continue,
            Value::Number(n) if n.is_i64() || n.is_u64() => ColumnKind::Int64,
            Value::Number(_) => ColumnKind::Float64,
            Value::Array(_) => ColumnKind::Utf8List,
            _ => ColumnKind::Utf8,
        };

        kind = Some(match (kind, this) {
            (None, this) => this,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Int64), ColumnKind::Float64)
            | (Some(ColumnKind::Float64), ColumnKind::Int64) => ColumnKind::Float64,
            _ => return ColumnKind::Utf8,
        });
    }

    kind.unwrap_or(ColumnKind::Utf8)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let err = Table::new(
            "t",
            vec![
                Column::new("a", ColumnData::Int64(vec![Some(1), Some(2)])),
                Column::new("b", ColumnData::Utf8(vec![None])),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("column 'b' has 1 rows, expected 2"));
    }

    #[test]
    fn test_new_rejects_duplicate_names() {
        let err = Table::new(
            "t",
            vec![
                Column::new("a", ColumnData::Int64(vec![])),
                Column::new("a", ColumnData::Utf8(vec![])),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, EtlError::MalformedTable { .. }));
    }

    #[test]
    fn test_from_records_infers_types() {
        let rows = records(json!([
            {"planet_id": 1, "name": "Tatooine", "diameter_num": 10465.0, "terrain_list": ["desert"], "note": null},
            {"planet_id": 2, "name": "Alderaan", "diameter_num": null, "terrain_list": ["grasslands", "mountains"], "extra": true}
        ]));

        let table = Table::from_records("planets_clean", &rows).unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.column_names(),
            vec!["planet_id", "name", "diameter_num", "terrain_list", "note", "extra"]
        );
        assert_eq!(
            table.column("planet_id").unwrap().data,
            ColumnData::Int64(vec![Some(1), Some(2)])
        );
        assert_eq!(
            table.column("diameter_num").unwrap().data,
            ColumnData::Float64(vec![Some(10465.0), None])
        );
        assert_eq!(
            table.column("terrain_list").unwrap().data,
            ColumnData::Utf8List(vec![
                Some(vec![Some("desert".to_string())]),
                Some(vec![Some("grasslands".to_string()), Some("mountains".to_string())]),
            ])
        );
        assert_eq!(table.column("note").unwrap().data, ColumnData::Utf8(vec![None, None]));
        assert_eq!(
            table.column("extra").unwrap().data,
            ColumnData::Utf8(vec![None, Some("true".to_string())])
        );
    }

    #[test]
    fn test_mixed_column_falls_back_to_text() {
        let rows = records(json!([{"v": 1}, {"v": "two"}, {"v": 3.5}]));
        let table = Table::from_records("t", &rows).unwrap();
        assert_eq!(
            table.column("v").unwrap().data,
            ColumnData::Utf8(vec![
                Some("1".to_string()),
                Some("two".to_string()),
                Some("3.5".to_string())
            ])
        );
    }

    #[test]
    fn test_list_column_keeps_null_elements() {
        let rows = records(json!([{"residents": ["Luke", null]}, {"residents": null}]));
        let table = Table::from_records("t", &rows).unwrap();
        assert_eq!(
            table.column("residents").unwrap().data,
            ColumnData::Utf8List(vec![Some(vec![Some("Luke".to_string()), None]), None])
        );
    }
}
