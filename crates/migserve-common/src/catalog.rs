use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};

/// One entry of the served listing: a migration script and where to find it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub id: String,
    pub name: String,
    pub location: String,
}

impl MigrationRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
        }
    }
}

/// JSON key used for a record's location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationField {
    #[default]
    File,
    Url,
}

impl LocationField {
    pub fn as_str(self) -> &'static str {
        match self {
            LocationField::File => "file",
            LocationField::Url => "url",
        }
    }
}

impl fmt::Display for LocationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(LocationField::File),
            "url" => Ok(LocationField::Url),
            other => Err(Error::InvalidInput(format!(
                "unknown location field `{other}` (expected `file` or `url`)"
            ))),
        }
    }
}

/// Serializes a record with its location under the chosen key.
struct RecordView<'a> {
    record: &'a MigrationRecord,
    field: LocationField,
}

impl Serialize for RecordView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("MigrationRecord", 3)?;
        s.serialize_field("id", &self.record.id)?;
        s.serialize_field("name", &self.record.name)?;
        s.serialize_field(self.field.as_str(), &self.record.location)?;
        s.end()
    }
}

/// The fixed, ordered set of migration descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    records: Vec<MigrationRecord>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            records: vec![
                MigrationRecord::new(
                    "001",
                    "Initial schema",
                    "migrations/001_initial_schema.sql",
                ),
                MigrationRecord::new(
                    "002",
                    "Add users table",
                    "migrations/002_add_users_table.sql",
                ),
                MigrationRecord::new(
                    "003",
                    "Add products table",
                    "migrations/003_add_products_table.sql",
                ),
                MigrationRecord::new(
                    "004",
                    "Create indexes",
                    "migrations/004_create_indexes.sql",
                ),
                MigrationRecord::new("005", "Seed data", "migrations/005_seed_data.sql"),
            ],
        }
    }

    pub fn records(&self) -> &[MigrationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Encode the catalog as a compact JSON array terminated by a newline.
    pub fn to_json(&self, field: LocationField) -> Result<Vec<u8>> {
        let views: Vec<RecordView<'_>> = self
            .records
            .iter()
            .map(|record| RecordView { record, field })
            .collect();
        let mut body = serde_json::to_vec(&views)?;
        body.push(b'\n');
        Ok(body)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
