//! Flattening of nested JSON records into single-level rows.

use serde_json::{Map, Value};

use crate::error::{ConvertError, Result};
use crate::table::Table;

/// Separator placed between the parts of a nested key path
pub const PATH_SEPARATOR: &str = ".";

/// Flatten one record into a map from dotted key path to leaf value.
///
/// Nested objects are walked recursively; arrays and scalars are leaves
/// and are kept as they are. An empty nested object leaves no trace.
pub fn flatten_record(record: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    flatten_into(None, record, &mut out);
    out
}

fn flatten_into(prefix: Option<&str>, object: &Map<String, Value>, out: &mut Map<String, Value>) {
    for (key, value) in object {
        let path = match prefix {
            Some(p) => format!("{p}{PATH_SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) => flatten_into(Some(&path), inner, out),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

/// Flatten every record and collect the rows into a table.
///
/// Every record must be a JSON object; the first one that is not fails
/// the whole batch.
pub fn flatten_records(records: &[Value]) -> Result<Table> {
    let rows = records
        .iter()
        .enumerate()
        .map(|(index, record)| match record {
            Value::Object(object) => Ok(flatten_record(object)),
            _ => Err(ConvertError::NotAnObject { index }),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Table::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat(value: Value) -> Map<String, Value> {
        flatten_record(value.as_object().unwrap())
    }

    #[test]
    fn test_flatten_nested_objects() {
        let row = flat(json!({
            "_id": {"$oid": "5ff1e1eacfcf6c399c274ae6"},
            "createdDate": {"$date": 1609687530554_i64},
            "role": "consumer",
            "active": true
        }));
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, ["_id.$oid", "createdDate.$date", "role", "active"]);
        assert_eq!(row["createdDate.$date"], json!(1609687530554_i64));
    }

    #[test]
    fn test_arrays_are_leaves() {
        let row = flat(json!({"items": [{"a": 1}, {"a": 2}], "deep": {"list": [1, 2]}}));
        assert_eq!(row["items"], json!([{"a": 1}, {"a": 2}]));
        assert_eq!(row["deep.list"], json!([1, 2]));
    }

    #[test]
    fn test_empty_object_has_no_column() {
        let row = flat(json!({"a": {}, "b": {"c": {}}, "d": null}));
        assert_eq!(row.len(), 1);
        assert_eq!(row["d"], Value::Null);
    }

    #[test]
    fn test_flatten_records_builds_table() {
        let records = vec![json!({"a": {"b": 1}}), json!({"a": {"c": 2}, "d": "x"})];
        let table = flatten_records(&records).unwrap();
        assert_eq!(table.columns(), ["a.b", "a.c", "d"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let records = vec![json!({"a": 1}), json!([1, 2])];
        assert!(matches!(
            flatten_records(&records),
            Err(ConvertError::NotAnObject { index: 1 })
        ));
    }
}
