//! Record normalization
//!
//! Maps a raw random-user identity onto [`NormalizedUserRecord`]. The only
//! side effect is generating the record's UUID.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use userflow_common::NormalizedUserRecord;
use uuid::Uuid;

use crate::source::RawIdentityRecord;

/// The raw record lacks a required field or has one of the wrong shape
#[derive(Error, Debug)]
#[error("Malformed identity record: {reason}")]
pub struct MalformedRecordError {
    reason: String,
}

impl MalformedRecordError {
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Deserialize)]
struct RawUser {
    name: RawName,
    gender: String,
    location: RawLocation,
    email: String,
    login: RawLogin,
    dob: RawDated,
    registered: RawDated,
    phone: String,
    picture: RawPicture,
}

#[derive(Deserialize)]
struct RawName {
    first: String,
    last: String,
}

#[derive(Deserialize)]
struct RawLocation {
    street: RawStreet,
    city: String,
    state: String,
    country: String,
    postcode: Scalar,
}

#[derive(Deserialize)]
struct RawStreet {
    number: Scalar,
    name: String,
}

#[derive(Deserialize)]
struct RawLogin {
    username: String,
}

#[derive(Deserialize)]
struct RawDated {
    date: String,
}

#[derive(Deserialize)]
struct RawPicture {
    medium: String,
}

/// Street numbers and postcodes come back as numbers for some countries and
/// strings for others.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Normalize a raw identity into the published record shape.
///
/// Generates exactly one fresh v4 UUID per call. Nothing is returned when any
/// required field is missing or mistyped.
pub fn normalize(raw: &RawIdentityRecord) -> Result<NormalizedUserRecord, MalformedRecordError> {
    let user = RawUser::deserialize(raw.as_value()).map_err(|e| MalformedRecordError {
        reason: e.to_string(),
    })?;

    let location = user.location;
    let address = format!(
        "{} {}, {}, {}, {}",
        location.street.number,
        location.street.name,
        location.city,
        location.state,
        location.country
    );

    Ok(NormalizedUserRecord {
        id: Uuid::new_v4(),
        first_name: user.name.first,
        last_name: user.name.last,
        gender: user.gender,
        address,
        post_code: location.postcode.to_string(),
        email: user.email,
        username: user.login.username,
        dob: user.dob.date,
        registered_date: user.registered.date,
        phone: user.phone,
        picture: user.picture.medium,
    })
}
