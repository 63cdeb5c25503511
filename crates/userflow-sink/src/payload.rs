//! Consumer-side decoding of `users_created` payloads.
//!
//! A payload is accepted only if it is a flat JSON object in which every
//! required field is present and a string, and `id` is a valid UUID. `dob` is
//! optional so records without it still land in the table.

use serde::Deserialize;
use userflow_common::UserflowError;
use uuid::Uuid;

use crate::error::SinkError;

/// One validated row, ready to insert
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub address: String,
    pub post_code: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub dob: Option<String>,
    pub registered_date: String,
    pub phone: String,
    pub picture: String,
}

impl UserRow {
    /// Text value for a column, `None` for a null optional column
    pub fn text(&self, column: &str) -> Result<Option<&str>, UserflowError> {
        let value = match column {
            "first_name" => &self.first_name,
            "last_name" => &self.last_name,
            "gender" => &self.gender,
            "address" => &self.address,
            "post_code" => &self.post_code,
            "email" => &self.email,
            "username" => &self.username,
            "dob" => return Ok(self.dob.as_deref()),
            "registered_date" => &self.registered_date,
            "phone" => &self.phone,
            "picture" => &self.picture,
            other => return Err(UserflowError::UnknownColumn(other.to_string())),
        };
        Ok(Some(value))
    }
}

/// Decode and validate one message payload.
///
/// Messages without a payload (tombstones) are rejected like any other
/// malformed input.
pub fn decode_payload(payload: Option<&[u8]>) -> Result<UserRow, SinkError> {
    let bytes = payload.ok_or_else(|| SinkError::invalid_payload("message has no payload"))?;

    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| SinkError::invalid_payload(format!("not JSON: {e}")))?;

    if !value.is_object() {
        return Err(SinkError::invalid_payload("payload is not a JSON object"));
    }

    UserRow::deserialize(value).map_err(|e| SinkError::invalid_payload(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> serde_json::Value {
        json!({
            "id": "7f1b5d2e-3c4a-4b7e-9d8f-1a2b3c4d5e6f",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "gender": "female",
            "address": "12 Main St, London, England, UK",
            "post_code": "W1",
            "email": "ada@x.com",
            "username": "ada12",
            "dob": "1815-12-10",
            "registered_date": "2020-01-01",
            "phone": "555-1234",
            "picture": "http://x/ada.jpg"
        })
    }

    fn decode(value: &serde_json::Value) -> Result<UserRow, SinkError> {
        decode_payload(Some(&serde_json::to_vec(value).unwrap()))
    }

    #[test]
    fn test_decodes_valid_payload() {
        let row = decode(&valid()).unwrap();
        assert_eq!(row.first_name, "Ada");
        assert_eq!(row.dob.as_deref(), Some("1815-12-10"));
        assert_eq!(row.text("address").unwrap(), Some("12 Main St, London, England, UK"));
    }

    #[test]
    fn test_dob_is_optional() {
        let mut value = valid();
        value.as_object_mut().unwrap().remove("dob");

        let row = decode(&value).unwrap();
        assert_eq!(row.dob, None);
        assert_eq!(row.text("dob").unwrap(), None);
    }

    #[test]
    fn test_rejects_missing_field() {
        let mut value = valid();
        value.as_object_mut().unwrap().remove("email");

        let err = decode(&value).unwrap_err();
        assert!(err.to_string().contains("email"), "{err}");
    }

    #[test]
    fn test_rejects_non_string_field() {
        let mut value = valid();
        value["post_code"] = json!(12345);

        assert!(matches!(
            decode(&value),
            Err(SinkError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_uuid() {
        let mut value = valid();
        value["id"] = json!("not-a-uuid");
        assert!(decode(&value).is_err());
    }

    #[test]
    fn test_rejects_non_object_and_garbage() {
        assert!(decode(&json!(["a", "b"])).is_err());
        assert!(decode_payload(Some(b"{not json")).is_err());
        assert!(decode_payload(None).is_err());
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let row = decode(&valid()).unwrap();
        assert!(matches!(
            row.text("nickname"),
            Err(UserflowError::UnknownColumn(name)) if name == "nickname"
        ));
    }
}
