use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// In-memory tabular data headed for a CSV seed file.
///
/// Rows always hold exactly one cell per column; `None` marks a value the
/// source record never had and is written as an empty field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<Value>>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from flat rows. Columns appear in the order they are
    /// first seen across all rows.
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in &rows {
            for key in row.keys() {
                if !index.contains_key(key) {
                    index.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|row| {
                let mut cells = vec![None; width];
                for (key, value) in row {
                    cells[index[&key]] = Some(value);
                }
                cells
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<Value>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Cell lookup by column name, mostly useful for assertions.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col)?.as_ref()
    }

    /// Append a row, padding or cutting it to the table width.
    pub fn push_row(&mut self, mut cells: Vec<Option<Value>>) {
        cells.resize(self.columns.len(), None);
        self.rows.push(cells);
    }

    /// Rename every column with `rename`.
    ///
    /// Columns that end up with the same name are merged into the first
    /// one; per row, the first non-empty cell in column order is kept.
    pub fn rename_columns<F>(&mut self, rename: F)
    where
        F: Fn(&str) -> String,
    {
        let mut columns: Vec<String> = Vec::with_capacity(self.columns.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut mapping: Vec<usize> = Vec::with_capacity(self.columns.len());

        for column in &self.columns {
            let renamed = rename(column);
            let target = match index.get(&renamed) {
                Some(&i) => i,
                None => {
                    index.insert(renamed.clone(), columns.len());
                    columns.push(renamed);
                    columns.len() - 1
                }
            };
            mapping.push(target);
        }

        if columns.len() == self.columns.len() {
            self.columns = columns;
            return;
        }

        let width = columns.len();
        for row in &mut self.rows {
            let mut merged: Vec<Option<Value>> = vec![None; width];
            for (old, cell) in row.drain(..).enumerate() {
                let slot = &mut merged[mapping[old]];
                if is_blank(slot) && !is_blank(&cell) {
                    *slot = cell;
                }
            }
            *row = merged;
        }
        self.columns = columns;
    }

    /// Remove the column named exactly `name`. Returns whether it existed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(position) = self.columns.iter().position(|c| c == name) else {
            return false;
        };
        self.columns.remove(position);
        for row in &mut self.rows {
            row.remove(position);
        }
        true
    }

    /// Cut string cells longer than `max_chars` characters down to that
    /// length. Non-string cells are left alone. Returns how many cells
    /// were truncated.
    pub fn truncate_strings(&mut self, max_chars: usize) -> usize {
        let mut truncated = 0;
        for cell in self.rows.iter_mut().flatten() {
            if let Some(Value::String(s)) = cell {
                if let Some((byte_index, _)) = s.char_indices().nth(max_chars) {
                    s.truncate(byte_index);
                    truncated += 1;
                }
            }
        }
        truncated
    }

    /// Write the table as CSV: header row first, no index column and
    /// quotes only where a field needs them.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(writer);

        // A table without columns has nothing to write, not even a header
        if self.columns.is_empty() {
            csv_writer.flush()?;
            return Ok(());
        }

        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(|cell| render_cell(cell.as_ref()).into_owned()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write the table to `path`, creating parent directories as needed.
    pub fn write_csv_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        self.write_csv(BufWriter::new(file))
    }
}

fn is_blank(cell: &Option<Value>) -> bool {
    matches!(cell, None | Some(Value::Null))
}

/// Text written for a single cell.
///
/// Booleans use `True`/`False` so existing seed files keep their spelling;
/// nested arrays and objects are written as compact JSON.
pub fn render_cell(cell: Option<&Value>) -> Cow<'_, str> {
    match cell {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
        Some(Value::Bool(true)) => Cow::Borrowed("True"),
        Some(Value::Bool(false)) => Cow::Borrowed("False"),
        Some(Value::Number(n)) => Cow::Owned(n.to_string()),
        Some(other) => Cow::Owned(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(values: Vec<Value>) -> Table {
        let rows = values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        Table::from_rows(rows)
    }

    fn to_csv(table: &Table) -> String {
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_columns_in_first_seen_order() {
        let t = table(vec![json!({"b": 1, "a": 2}), json!({"c": 3, "a": 4})]);
        assert_eq!(t.columns(), ["b", "a", "c"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.cell(1, "b"), None);
        assert_eq!(t.cell(1, "c"), Some(&json!(3)));
    }

    #[test]
    fn test_rename_merges_collisions() {
        let mut t = table(vec![
            json!({"userId": "a", "user_id": "b"}),
            json!({"userId": null, "user_id": "c"}),
            json!({"user_id": "d"}),
        ]);
        t.rename_columns(crate::normalize::to_snake_case);
        assert_eq!(t.columns(), ["user_id"]);
        assert_eq!(t.cell(0, "user_id"), Some(&json!("a")));
        assert_eq!(t.cell(1, "user_id"), Some(&json!("c")));
        assert_eq!(t.cell(2, "user_id"), Some(&json!("d")));
    }

    #[test]
    fn test_drop_column() {
        let mut t = table(vec![json!({"a": 1, "b": 2, "c": 3})]);
        assert!(t.drop_column("b"));
        assert!(!t.drop_column("b"));
        assert_eq!(t.columns(), ["a", "c"]);
        assert_eq!(t.rows()[0], vec![Some(json!(1)), Some(json!(3))]);
    }

    #[test]
    fn test_truncate_counts_characters() {
        let mut t = table(vec![
            json!({"s": "héllo wörld", "n": 1234567}),
            json!({"s": "hey"}),
        ]);
        assert_eq!(t.truncate_strings(5), 1);
        assert_eq!(t.cell(0, "s"), Some(&json!("héllo")));
        assert_eq!(t.cell(0, "n"), Some(&json!(1234567)));
        assert_eq!(t.cell(1, "s"), Some(&json!("hey")));
    }

    #[test]
    fn test_csv_minimal_quoting() {
        let t = table(vec![
            json!({"name": "plain", "note": "has, comma", "flag": true}),
            json!({"name": "say \"hi\"", "note": "two\nlines", "flag": false}),
        ]);
        assert_eq!(
            to_csv(&t),
            "name,note,flag\nplain,\"has, comma\",True\n\"say \"\"hi\"\"\",\"two\nlines\",False\n"
        );
    }

    #[test]
    fn test_csv_renders_missing_and_nested() {
        let t = table(vec![
            json!({"a": 1.5, "tags": ["x", "y"]}),
            json!({"a": null}),
        ]);
        assert_eq!(to_csv(&t), "a,tags\n1.5,\"[\"\"x\"\",\"\"y\"\"]\"\n,\n");
    }

    #[test]
    fn test_header_written_for_empty_table() {
        let t = Table::new(vec!["a".to_string(), "b".to_string()]);
        assert!(t.is_empty());
        assert_eq!(to_csv(&t), "a,b\n");
    }

    #[test]
    fn test_push_row_pads_to_width() {
        let mut t = Table::new(vec!["a".to_string(), "b".to_string()]);
        t.push_row(vec![Some(json!("x"))]);
        assert_eq!(t.rows()[0], vec![Some(json!("x")), None]);
    }
}
