//! Bearer credential parsing and claim inspection.
//!
//! A credential is a `header.payload.signature` string. Only the shape and the
//! payload claims are inspected here; the signature is the backend's concern.

use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose},
    Engine,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

use super::storage::StorageError;

/// Separator between the three credential segments.
pub const SEGMENT_DELIMITER: char = '.';

/// Number of segments in a well-formed credential.
pub const SEGMENT_COUNT: usize = 3;

/// Upper bound on the encoded payload segment.
/// Anything larger is treated as undecodable rather than parsed.
const MAX_PAYLOAD_LEN: usize = 16 * 1024;

/// Base64url decoder that accepts payloads with or without `=` padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    general_purpose::NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Malformed credential: expected 3 segments, found {0}")]
    MalformedCredential(usize),

    #[error("Failed to store credential: {0}")]
    Storage(#[from] StorageError),
}

/// Why a payload could not be turned into [`Claims`].
#[derive(Error, Debug)]
pub enum ClaimsError {
    #[error("credential has no payload segment")]
    MissingPayload,

    #[error("payload segment exceeds the size limit")]
    PayloadTooLarge,

    #[error("payload is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a JSON claims object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of checking a stored credential at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Malformed,
    Expired,
    Valid,
}

/// Claims decoded from the payload segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,

    /// Issued-at, seconds since the Unix epoch
    #[serde(default, deserialize_with = "numeric_date")]
    pub iat: Option<i64>,

    #[serde(default, deserialize_with = "subject_id")]
    user_id: Option<String>,

    #[serde(default, deserialize_with = "subject_id")]
    sub: Option<String>,
}

impl Claims {
    /// Subject identifier, preferring `user_id` over the registered `sub` claim.
    pub fn subject(&self) -> Option<&str> {
        self.user_id.as_deref().or(self.sub.as_deref())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|iat| DateTime::from_timestamp(iat, 0))
    }

    /// Whether the claims are expired at `now_secs` (whole seconds).
    /// Claims without `exp` never expire.
    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        matches!(self.exp, Some(exp) if exp < now_secs)
    }
}

/// Accepts integer or fractional NumericDate values, truncated to whole seconds.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.map(|secs| secs.floor() as i64))
}

/// Subjects arrive as strings from some backends and as integers from others.
fn subject_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A bearer credential that passed format and expiry checks when it was read.
///
/// Only [`TokenStore`](super::TokenStore) constructs these, so holding one
/// means it was valid at the moment of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    raw: String,
    claims: Claims,
    validity: Validity,
}

impl Credential {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.expires_at()
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.subject()
    }
}

/// Count the delimiter-separated segments of `raw`.
fn segment_count(raw: &str) -> usize {
    raw.split(SEGMENT_DELIMITER).count()
}

/// Syntactic shape check: exactly three segments. Payload decodability is
/// not considered here.
pub fn check_format(raw: &str) -> Result<(), TokenError> {
    match segment_count(raw) {
        SEGMENT_COUNT => Ok(()),
        found => Err(TokenError::MalformedCredential(found)),
    }
}

pub fn is_well_formed(raw: &str) -> bool {
    check_format(raw).is_ok()
}

/// Decode the claims carried in the payload segment.
///
/// The payload must be a JSON object; arrays and scalars are rejected.
pub fn decode_claims(raw: &str) -> Result<Claims, ClaimsError> {
    let payload = raw
        .split(SEGMENT_DELIMITER)
        .nth(1)
        .ok_or(ClaimsError::MissingPayload)?;

    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ClaimsError::PayloadTooLarge);
    }

    let bytes = PAYLOAD_ENGINE.decode(payload)?;
    let object: Map<String, Value> = serde_json::from_slice(&bytes)?;
    Ok(serde_json::from_value(Value::Object(object))?)
}

/// Expiry instant of any credential string, if it decodes and carries `exp`.
///
/// Diagnostic only: no format or expiry judgement is made.
pub fn expiry_of(raw: &str) -> Option<DateTime<Utc>> {
    decode_claims(raw).ok()?.expires_at()
}

/// Full read-time evaluation. Decode failures count as expired.
pub(crate) fn evaluate(raw: &str, now_secs: i64) -> Result<Credential, Validity> {
    if !is_well_formed(raw) {
        return Err(Validity::Malformed);
    }

    let claims = decode_claims(raw).map_err(|_| Validity::Expired)?;
    if claims.is_expired_at(now_secs) {
        return Err(Validity::Expired);
    }

    Ok(Credential {
        raw: raw.to_string(),
        claims,
        validity: Validity::Valid,
    })
}
