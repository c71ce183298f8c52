//! Request signatures and MD5 digests
//!
//! The server recomputes `api_sig` itself, so the concatenation order and the
//! lowercase hex encoding here are part of the wire contract.

use md5::{Digest, Md5};

/// Lowercase hex MD5 of `input`.
pub fn md5_hex(input: impl AsRef<[u8]>) -> String {
    hex::encode(Md5::digest(input.as_ref()))
}

/// Compute `api_sig` for a signed call.
///
/// `md5(access_token + client_id + secret + api_key)`. Callers must only sign
/// once the session is established; an empty token or secret means it is not.
pub fn sign(access_token: &str, client_id: &str, secret: &str, api_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(access_token.as_bytes());
    hasher.update(client_id.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a cleartext password the way `login_login` expects it.
pub fn hash_password(password: &str) -> String {
    md5_hex(password)
}
