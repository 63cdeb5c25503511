//! Declared store schema
//!
//! Keyspace creation, table creation and the insert statement are all derived
//! from one [`TableSchema`], so the column list, the keyspace name and the
//! placeholder count cannot drift apart.

use crate::error::{Result, UserflowError};

/// Default keyspace for user rows.
pub const DEFAULT_KEYSPACE: &str = "spark_streams";

/// Default table for user rows.
pub const DEFAULT_TABLE: &str = "created_users";

/// CQL column types used by the user table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Text,
}

impl ColumnType {
    pub fn as_cql(self) -> &'static str {
        match self {
            ColumnType::Uuid => "UUID",
            ColumnType::Text => "TEXT",
        }
    }
}

/// One column of the declared table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    pub primary_key: bool,
    /// Whether an incoming record must carry this field to be accepted
    pub required: bool,
}

impl Column {
    const fn key(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnType::Uuid,
            primary_key: true,
            required: true,
        }
    }

    const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnType::Text,
            primary_key: false,
            required: true,
        }
    }

    const fn optional_text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnType::Text,
            primary_key: false,
            required: false,
        }
    }
}

/// Columns of the user table, in insert order.
///
/// `dob` is stored but not required: records from producers that predate it
/// are still accepted.
pub const USER_COLUMNS: &[Column] = &[
    Column::key("id"),
    Column::text("first_name"),
    Column::text("last_name"),
    Column::text("gender"),
    Column::text("address"),
    Column::text("post_code"),
    Column::text("email"),
    Column::text("username"),
    Column::optional_text("dob"),
    Column::text("registered_date"),
    Column::text("phone"),
    Column::text("picture"),
];

/// A keyspace-qualified table and its columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    keyspace: String,
    table: String,
    columns: &'static [Column],
}

impl TableSchema {
    /// The user table under the given keyspace and table names.
    ///
    /// Names are interpolated into CQL, so only `[A-Za-z0-9_]` is accepted.
    pub fn users(keyspace: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        let keyspace = keyspace.into();
        let table = table.into();
        validate_identifier("keyspace", &keyspace)?;
        validate_identifier("table", &table)?;

        Ok(Self {
            keyspace,
            table,
            columns: USER_COLUMNS,
        })
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    /// `keyspace.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.keyspace, self.table)
    }

    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the fields an incoming record must carry
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().filter(|c| c.required).map(|c| c.name)
    }

    pub fn create_keyspace_cql(&self, replication_factor: u32) -> String {
        format!(
            "CREATE KEYSPACE IF NOT EXISTS {} \
             WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': '{}'}}",
            self.keyspace, replication_factor
        )
    }

    pub fn create_table_cql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                if c.primary_key {
                    format!("{} {} PRIMARY KEY", c.name, c.kind.as_cql())
                } else {
                    format!("{} {}", c.name, c.kind.as_cql())
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.qualified_name(),
            columns
        )
    }

    /// Insert statement with exactly one bind marker per column
    pub fn insert_cql(&self) -> String {
        let names = self
            .columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ");
        let markers = vec!["?"; self.columns.len()].join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualified_name(),
            names,
            markers
        )
    }
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            keyspace: DEFAULT_KEYSPACE.to_string(),
            table: DEFAULT_TABLE.to_string(),
            columns: USER_COLUMNS,
        }
    }
}

fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 48
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());

    if valid {
        Ok(())
    } else {
        Err(UserflowError::invalid_setting(
            kind,
            format!("'{name}' is not a valid CQL identifier"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::record::RECORD_FIELDS;

    #[test]
    fn test_insert_has_one_marker_per_column() {
        let schema = TableSchema::default();
        let cql = schema.insert_cql();

        assert_eq!(cql.matches('?').count(), USER_COLUMNS.len());
        assert!(cql.starts_with("INSERT INTO spark_streams.created_users ("));
    }

    #[test]
    fn test_ddl_and_insert_share_keyspace() {
        let schema = TableSchema::users("demo_ks", "users").unwrap();

        assert!(schema.create_keyspace_cql(1).contains("IF NOT EXISTS demo_ks "));
        assert!(schema.create_table_cql().contains("IF NOT EXISTS demo_ks.users ("));
        assert!(schema.insert_cql().contains("INTO demo_ks.users ("));
    }

    #[test]
    fn test_keyspace_uses_simple_strategy() {
        let cql = TableSchema::default().create_keyspace_cql(1);
        assert!(cql.contains("'class': 'SimpleStrategy'"));
        assert!(cql.contains("'replication_factor': '1'"));
    }

    #[test]
    fn test_table_declares_every_published_field() {
        let schema = TableSchema::default();
        let ddl = schema.create_table_cql();

        for field in RECORD_FIELDS {
            assert!(schema.column(field).is_some(), "no column for {field}");
        }
        assert!(ddl.contains("id UUID PRIMARY KEY"));
        assert!(ddl.contains("dob TEXT"));
        assert_eq!(schema.columns().len(), RECORD_FIELDS.len());
    }

    #[test]
    fn test_required_fields_exclude_dob() {
        let required: Vec<_> = TableSchema::default().required_fields().collect();
        assert_eq!(required.len(), 11);
        assert!(!required.contains(&"dob"));
    }

    #[test]
    fn test_rejects_injected_identifiers() {
        assert!(TableSchema::users("ks; DROP KEYSPACE x", "t").is_err());
        assert!(TableSchema::users("ks", "").is_err());
        assert!(TableSchema::users("1ks", "t").is_err());
    }
}
