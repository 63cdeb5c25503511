//! The normalized user record published on the `users_created` topic.
//!
//! The producer builds one of these per fetched identity and hands its JSON
//! encoding to the broker. The sink decodes the same flat object on the other
//! side, so the field names here are the wire contract.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Every field of [`NormalizedUserRecord`], in publish order.
pub const RECORD_FIELDS: [&str; 12] = [
    "id",
    "first_name",
    "last_name",
    "gender",
    "address",
    "post_code",
    "email",
    "username",
    "dob",
    "registered_date",
    "phone",
    "picture",
];

/// A user identity flattened into a stable shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUserRecord {
    /// Generated at normalization time, never derived from the source
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    /// `"{number} {street}, {city}, {state}, {country}"`
    pub address: String,
    pub post_code: String,
    pub email: String,
    pub username: String,
    /// Date of birth as reported by the source
    pub dob: String,
    pub registered_date: String,
    pub phone: String,
    /// Picture URL
    pub picture: String,
}

impl NormalizedUserRecord {
    /// Encode as the UTF-8 JSON object sent over the topic
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a payload produced by [`NormalizedUserRecord::to_payload`]
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> NormalizedUserRecord {
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

    #[test]
    fn test_payload_is_flat_object_with_every_field() {
        let payload = sample().to_payload().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), RECORD_FIELDS.len());
        for field in RECORD_FIELDS {
            assert!(object[field].is_string(), "{field} should be a string");
        }
    }

    #[test]
    fn test_payload_decodes_back() {
        let record = sample();
        let decoded = NormalizedUserRecord::from_payload(&record.to_payload().unwrap()).unwrap();
        assert_eq!(decoded, record);
    }
}
