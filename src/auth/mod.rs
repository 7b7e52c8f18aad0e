//! Token → role extraction.
//!
//! The core treats the JWT library itself as an external collaborator; this
//! module is the thin edge that turns "whatever is in the `token` query
//! parameter" into a [`Role`], per `original_source/server.py`'s
//! `authenticate()`: decode, read the `role` claim, and on *any* failure —
//! bad signature, malformed token, missing claim, even an empty token —
//! fall back to [`Role::User`]. No error is ever surfaced to the caller.

use aviary_client_api_proto::Role;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    role: Option<String>,
}

/// Decodes `token` and extracts its `role` claim, defaulting to
/// [`Role::User`] whenever the token cannot be trusted or is silent on
/// the matter.
#[must_use]
pub fn role_of(token: &str, secret: &[u8]) -> Role {
    if token.is_empty() {
        return Role::User;
    }

    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    // The original only checks the signature and reads `role`; it never
    // requires an `exp` claim, so a token without one must not be
    // rejected here either.
    validation.validate_exp = false;

    jsonwebtoken::decode::<Claims>(token, &key, &validation)
        .ok()
        .and_then(|data| data.claims.role)
        .and_then(|role| match role.as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        })
        .unwrap_or(Role::User)
}
