//! Row representation for cursor results.

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::DriverError;

/// A row fetched from a cursor, in column emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<Column>,
    values: Vec<Value>,
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name as reported by the database.
    pub name: String,
    /// Zero-based column index.
    pub index: usize,
}

impl Row {
    /// Create a row from parallel column and value lists.
    #[must_use]
    pub fn new(columns: Vec<Column>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Create a row from a JSON object, preserving field order.
    #[must_use]
    pub fn from_object(object: Map<String, Value>) -> Self {
        let mut columns = Vec::with_capacity(object.len());
        let mut values = Vec::with_capacity(object.len());
        for (index, (name, value)) in object.into_iter().enumerate() {
            columns.push(Column { name, index });
            values.push(value);
        }
        Self { columns, values }
    }

    /// Get the raw value by column index.
    #[must_use]
    pub fn get_raw(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get the raw value by column name (case-insensitive).
    #[must_use]
    pub fn get_raw_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }

    /// Deserialize the whole row into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DriverError> {
        serde_json::from_value(self.to_json())
            .map_err(|e| DriverError::Cursor(format!("row decode: {e}")))
    }

    /// Render the row as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.columns.len());
        for (column, value) in self.iter() {
            object.insert(column.name.clone(), value.clone());
        }
        Value::Object(object)
    }

    /// Number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column metadata.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Iterate over (column, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Column, &Value)> {
        self.columns.iter().zip(self.values.iter())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(&column.name, value)?;
        }
        map.end()
    }
}
