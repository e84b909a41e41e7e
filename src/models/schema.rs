//! Schema-related data models.
//!
//! This module defines the normalized schema document produced by introspection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Index participation reported for a column (MySQL `COLUMN_KEY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    Primary,
    Unique,
    /// Non-unique index leading column
    Multiple,
}

impl KeyRole {
    /// Parse the information-schema key code; empty or unknown means no role.
    pub fn from_column_key(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "PRI" => Some(Self::Primary),
            "UNI" => Some(Self::Unique),
            "MUL" => Some(Self::Multiple),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type as reported by the information schema (e.g., `int`, `character varying`)
    pub data_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub key_role: Option<KeyRole>,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            key_role: None,
        }
    }

    /// Set the key role.
    pub fn with_key_role(mut self, key_role: Option<KeyRole>) -> Self {
        self.key_role = key_role;
        self
    }
}

/// Parse an information-schema `IS_NULLABLE` value.
pub fn parse_nullable(value: &str) -> bool {
    value.eq_ignore_ascii_case("YES")
}

/// Table name to ordered column descriptors. Produced fresh per introspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDocument(BTreeMap<String, Vec<ColumnDescriptor>>);

impl SchemaDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, columns: Vec<ColumnDescriptor>) {
        self.0.insert(table.into(), columns);
    }

    pub fn table(&self, name: &str) -> Option<&[ColumnDescriptor]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&String, &Vec<ColumnDescriptor>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
