//! Column store
//!
//! Opens a session, creates the keyspace and table if they are missing and
//! inserts one row per record. Every statement comes from the same
//! [`TableSchema`].

use async_trait::async_trait;
use scylla::frame::response::result::CqlValue;
use scylla::prepared_statement::PreparedStatement;
use scylla::{Session, SessionBuilder};
use tracing::{debug, info};
use userflow_common::schema::ColumnType;
use userflow_common::{TableSchema, UserflowError};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::payload::UserRow;

/// Anything that can persist a validated row
#[async_trait]
pub trait RowWriter: Send + Sync {
    async fn insert(&self, row: &UserRow) -> Result<(), StoreError>;
}

/// Bind values for `row`, one per schema column in insert order
pub fn bind_values(
    schema: &TableSchema,
    row: &UserRow,
) -> Result<Vec<Option<CqlValue>>, UserflowError> {
    schema
        .columns()
        .iter()
        .map(|column| match column.kind {
            ColumnType::Uuid if column.primary_key => Ok(Some(CqlValue::Uuid(row.id))),
            ColumnType::Uuid => Err(UserflowError::UnknownColumn(column.name.to_string())),
            ColumnType::Text => Ok(row
                .text(column.name)?
                .map(|value| CqlValue::Text(value.to_string()))),
        })
        .collect()
}

/// Store backed by a Cassandra-compatible cluster
pub struct CassandraStore {
    session: Session,
    schema: TableSchema,
    insert: PreparedStatement,
}

impl CassandraStore {
    /// Connect, make sure the keyspace and table exist, and prepare the insert
    pub async fn connect(config: &StoreConfig, schema: TableSchema) -> Result<Self, StoreError> {
        let mut builder = SessionBuilder::new().known_nodes(&config.nodes);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.user(username, password);
        }

        let session = builder
            .build()
            .await
            .map_err(|source| StoreError::Connection {
                nodes: config.nodes.join(","),
                source,
            })?;

        info!(nodes = ?config.nodes, "Connected to store");

        create_keyspace(&session, &schema, config.replication_factor).await?;
        create_table(&session, &schema).await?;

        let insert_cql = schema.insert_cql();
        let insert = session
            .prepare(insert_cql.clone())
            .await
            .map_err(|source| StoreError::Schema {
                statement: insert_cql,
                source,
            })?;

        Ok(Self {
            session,
            schema,
            insert,
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }
}

#[async_trait]
impl RowWriter for CassandraStore {
    async fn insert(&self, row: &UserRow) -> Result<(), StoreError> {
        let values = bind_values(&self.schema, row)?;

        self.session
            .execute_unpaged(&self.insert, values)
            .await
            .map_err(|e| StoreError::RowInsert {
                id: row.id,
                reason: e.to_string(),
            })?;

        debug!(id = %row.id, "Row inserted");
        Ok(())
    }
}

async fn create_keyspace(
    session: &Session,
    schema: &TableSchema,
    replication_factor: u32,
) -> Result<(), StoreError> {
    run_ddl(session, schema.create_keyspace_cql(replication_factor)).await?;
    info!(keyspace = schema.keyspace(), "Keyspace ready");
    Ok(())
}

async fn create_table(session: &Session, schema: &TableSchema) -> Result<(), StoreError> {
    run_ddl(session, schema.create_table_cql()).await?;
    info!(table = %schema.qualified_name(), "Table ready");
    Ok(())
}

async fn run_ddl(session: &Session, statement: String) -> Result<(), StoreError> {
    session
        .query_unpaged(statement.clone(), ())
        .await
        .map_err(|source| StoreError::Schema { statement, source })?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn row(dob: Option<&str>) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            gender: "female".into(),
            address: "12 Main St, London, England, UK".into(),
            post_code: "W1".into(),
            email: "ada@x.com".into(),
            username: "ada12".into(),
            dob: dob.map(str::to_string),
            registered_date: "2020-01-01".into(),
            phone: "555-1234".into(),
            picture: "http://x/ada.jpg".into(),
        }
    }

    #[test]
    fn test_one_value_per_insert_marker() {
        let schema = TableSchema::default();
        let values = bind_values(&schema, &row(Some("1815-12-10"))).unwrap();

        assert_eq!(values.len(), schema.insert_cql().matches('?').count());
    }

    #[test]
    fn test_values_follow_column_order() {
        let schema = TableSchema::default();
        let user = row(Some("1815-12-10"));
        let values = bind_values(&schema, &user).unwrap();

        assert_eq!(values[0], Some(CqlValue::Uuid(user.id)));
        assert_eq!(values[1], Some(CqlValue::Text("Ada".into())));

        let dob = schema.columns().iter().position(|c| c.name == "dob").unwrap();
        assert_eq!(values[dob], Some(CqlValue::Text("1815-12-10".into())));
    }

    #[test]
    fn test_missing_dob_binds_null() {
        let schema = TableSchema::default();
        let values = bind_values(&schema, &row(None)).unwrap();

        let dob = schema.columns().iter().position(|c| c.name == "dob").unwrap();
        assert_eq!(values[dob], None);
        assert_eq!(values.iter().filter(|v| v.is_none()).count(), 1);
    }
}
