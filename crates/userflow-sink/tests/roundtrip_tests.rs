//! Producer payload -> sink row tests
//!
//! Records are encoded exactly as the producer publishes them and decoded by
//! the sink, without a broker or a store in between.

use async_trait::async_trait;
use futures::stream;
use std::sync::Mutex;
use userflow_common::record::RECORD_FIELDS;
use userflow_common::{NormalizedUserRecord, TableSchema};
use userflow_sink::store::bind_values;
use userflow_sink::{decode_payload, RowWriter, SinkPipeline, StoreError, UserRow};
use uuid::Uuid;

/// Field set validated by the reference stream job, which has no `dob`
const REFERENCE_FIELDS: [&str; 11] = [
    "id",
    "first_name",
    "last_name",
    "gender",
    "address",
    "post_code",
    "email",
    "username",
    "registered_date",
    "phone",
    "picture",
];

fn ada() -> NormalizedUserRecord {
    NormalizedUserRecord {
        id: Uuid::new_v4(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        gender: "female".into(),
        address: "12 Main St, London, England, UK".into(),
        post_code: "W1".into(),
        email: "ada@x.com".into(),
        username: "ada12".into(),
        dob: "1815-12-10".into(),
        registered_date: "2020-01-01".into(),
        phone: "555-1234".into(),
        picture: "http://x/ada.jpg".into(),
    }
}

#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<UserRow>>,
}

#[async_trait]
impl RowWriter for MemoryStore {
    async fn insert(&self, row: &UserRow) -> Result<(), StoreError> {
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }
}

#[test]
fn test_producer_payload_decodes_with_every_field_as_string() {
    let record = ada();
    let payload = record.to_payload().unwrap();

    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(&payload).unwrap();
    for field in REFERENCE_FIELDS {
        assert!(object[field].is_string(), "{field} is not a string");
    }

    let row = decode_payload(Some(&payload)).unwrap();
    assert_eq!(row.id, record.id);
    assert_eq!(row.first_name, record.first_name);
    assert_eq!(row.address, record.address);
    assert_eq!(row.post_code, record.post_code);
    assert_eq!(row.picture, record.picture);
}

#[test]
fn test_reference_field_set_drops_dob() {
    // The published record carries dob but the reference schema does not.
    // The declared table keeps it as an optional column instead of losing it.
    assert!(RECORD_FIELDS.contains(&"dob"));
    assert!(!REFERENCE_FIELDS.contains(&"dob"));
    assert_eq!(RECORD_FIELDS.len(), REFERENCE_FIELDS.len() + 1);

    let schema = TableSchema::default();
    let required: Vec<_> = schema.required_fields().collect();
    assert_eq!(required, REFERENCE_FIELDS.to_vec());

    let dob = schema.column("dob").expect("dob column");
    assert!(!dob.required);

    let row = decode_payload(Some(&ada().to_payload().unwrap())).unwrap();
    assert_eq!(row.dob.as_deref(), Some("1815-12-10"));
}

#[test]
fn test_decoded_row_binds_every_column() {
    let schema = TableSchema::default();
    let row = decode_payload(Some(&ada().to_payload().unwrap())).unwrap();

    let values = bind_values(&schema, &row).unwrap();
    assert_eq!(values.len(), schema.columns().len());
    assert!(values.iter().all(Option::is_some));
}

#[tokio::test]
async fn test_pipeline_stores_published_records() {
    let store = MemoryStore::default();
    let records = [ada(), ada(), ada()];
    let messages = stream::iter(
        records
            .iter()
            .map(|r| Ok::<_, String>(Some(r.to_payload().unwrap())))
            .chain(std::iter::once(Ok(Some(b"{\"id\":\"nope\"}".to_vec()))))
            .collect::<Vec<_>>(),
    );

    let report = SinkPipeline::new(&store)
        .drain(messages, None, std::future::pending())
        .await;

    assert_eq!(report.received, 4);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.rejected, 1);

    let stored: Vec<Uuid> = store.rows.lock().unwrap().iter().map(|r| r.id).collect();
    let published: Vec<Uuid> = records.iter().map(|r| r.id).collect();
    assert_eq!(stored, published);
}
