//! Helpers shared by unit tests.

use base64::{engine::general_purpose, Engine};

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// A three-segment token whose payload is `claims`.
pub(crate) fn token_with(claims: serde_json::Value) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(HEADER);
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// Same as [`token_with`], with `=` padding kept on the payload.
pub(crate) fn token_with_padded_payload(claims: serde_json::Value) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(HEADER);
    let payload = general_purpose::URL_SAFE.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
