//! Tabular results decoded from statement output, and the per-dialect code
//! templates that serialize a remote dataframe into a decodable form.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{LivyError, Result};
use crate::models::SessionKind;

/// A column-named, row-ordered in-memory dataset decoded from remote output.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl DataFrame {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// A row keyed by column name, for convenience.
    pub fn row_as_map(&self, row_idx: usize) -> Option<HashMap<String, Value>> {
        let row = self.rows.get(row_idx)?;
        let mut map = HashMap::with_capacity(self.columns.len());
        for (column, value) in self.columns.iter().zip(row) {
            map.insert(column.clone(), value.clone());
        }
        Some(map)
    }

    /// Decodes line-delimited JSON: one object record per non-empty line.
    ///
    /// Columns are the union of record keys in first-encountered order;
    /// cells absent from a record become JSON null. Used for the non-SQL
    /// dialects, whose capture code prints one record per line.
    pub fn from_json_lines(text: &str) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        let mut records: Vec<serde_json::Map<String, Value>> = Vec::new();

        for line in text.split('\n') {
            if line.is_empty() {
                continue;
            }
            let malformed = || LivyError::MalformedRecord {
                line: line.to_string(),
            };
            let value: Value = serde_json::from_str(line).map_err(|_| malformed())?;
            let Value::Object(record) = value else {
                return Err(malformed());
            };
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
            records.push(record);
        }

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|column| record.remove(column).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Decodes the columnar shape SQL statements return:
    /// `{"schema": {"fields": [{"name": ...}, ...]}, "data": [[...], ...]}`.
    pub fn from_sql_output(json: &Value) -> Result<Self> {
        let fields = json
            .get("schema")
            .and_then(|schema| schema.get("fields"))
            .and_then(Value::as_array)
            .ok_or(LivyError::InvalidSqlOutput)?;
        let data = json
            .get("data")
            .and_then(Value::as_array)
            .ok_or(LivyError::InvalidSqlOutput)?;

        let columns = fields
            .iter()
            .map(|field| {
                field
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or(LivyError::InvalidSqlOutput)
            })
            .collect::<Result<Vec<_>>>()?;
        let rows = data
            .iter()
            .map(|row| row.as_array().cloned().ok_or(LivyError::InvalidSqlOutput))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { columns, rows })
    }
}

/// Code that serializes the named remote dataframe to JSON lines on stdout,
/// in the session's dialect. SQL sessions need no capture code (queries
/// already return the columnar shape), so `Sql` is an explicit error.
pub fn capture_code(dataframe_name: &str, kind: SessionKind) -> Result<String> {
    match kind {
        SessionKind::Spark => Ok(format!(
            "{dataframe_name}.toJSON.collect.foreach(println)"
        )),
        SessionKind::PySpark | SessionKind::PySpark3 => Ok(format!(
            "for _livy_client_serialised_row in {dataframe_name}.toJSON().collect():\n    \
             print(_livy_client_serialised_row)\n"
        )),
        SessionKind::SparkR => Ok(format!(
            "cat(unlist(collect(toJSON({dataframe_name}))), sep = '\\n')\n"
        )),
        SessionKind::Sql => Err(LivyError::UnsupportedKind {
            operation: "read",
            kind,
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_lines_decode_rows_in_order() {
        let frame = DataFrame::from_json_lines("{\"a\":1}\n{\"a\":2}\n").unwrap();
        assert_eq!(frame.columns(), ["a"]);
        assert_eq!(frame.rows(), [vec![json!(1)], vec![json!(2)]]);
    }

    #[test]
    fn json_lines_empty_input_is_empty_frame() {
        let frame = DataFrame::from_json_lines("").unwrap();
        assert!(frame.is_empty());
        assert!(frame.columns().is_empty());
    }

    #[test]
    fn json_lines_union_columns_with_null_fill() {
        let frame =
            DataFrame::from_json_lines("{\"a\":1}\n{\"b\":\"x\",\"a\":2}\n{\"b\":\"y\"}").unwrap();
        assert_eq!(frame.columns(), ["a", "b"]);
        assert_eq!(frame.rows()[0], vec![json!(1), Value::Null]);
        assert_eq!(frame.rows()[1], vec![json!(2), json!("x")]);
        assert_eq!(frame.rows()[2], vec![Value::Null, json!("y")]);
        assert_eq!(
            frame.row_as_map(1).unwrap().get("b"),
            Some(&json!("x"))
        );
    }

    #[test]
    fn json_lines_reject_non_object_records() {
        let err = DataFrame::from_json_lines("[1, 2]").unwrap_err();
        assert!(matches!(err, LivyError::MalformedRecord { .. }));
        let err = DataFrame::from_json_lines("{\"a\":1}\nnot json").unwrap_err();
        assert!(matches!(err, LivyError::MalformedRecord { .. }));
    }

    #[test]
    fn sql_output_decodes_columns_from_schema() {
        let output = json!({
            "schema": {"fields": [{"name": "x"}]},
            "data": [[1], [2]],
        });
        let frame = DataFrame::from_sql_output(&output).unwrap();
        assert_eq!(frame.columns(), ["x"]);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.column_index("x"), Some(0));
    }

    #[test]
    fn sql_output_missing_data_is_structural_error() {
        let output = json!({"schema": {"fields": [{"name": "x"}]}});
        assert!(matches!(
            DataFrame::from_sql_output(&output),
            Err(LivyError::InvalidSqlOutput)
        ));
        let output = json!({"data": [[1]]});
        assert!(matches!(
            DataFrame::from_sql_output(&output),
            Err(LivyError::InvalidSqlOutput)
        ));
    }

    #[test]
    fn capture_code_per_dialect() {
        assert_eq!(
            capture_code("df", SessionKind::Spark).unwrap(),
            "df.toJSON.collect.foreach(println)"
        );
        let pyspark = capture_code("df", SessionKind::PySpark).unwrap();
        assert!(pyspark.contains("df.toJSON().collect()"));
        assert_eq!(pyspark, capture_code("df", SessionKind::PySpark3).unwrap());
        assert!(capture_code("df", SessionKind::SparkR)
            .unwrap()
            .contains("toJSON(df)"));
    }

    #[test]
    fn capture_code_rejects_sql_sessions() {
        assert!(matches!(
            capture_code("df", SessionKind::Sql),
            Err(LivyError::UnsupportedKind {
                operation: "read",
                kind: SessionKind::Sql,
            })
        ));
    }
}
