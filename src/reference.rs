//! Pseudo-reference tokens for cross-entity references.
//!
//! The `entity` command does not resolve the entity it names. Instead it emits a
//! token that has the shape of an entity id, so a later merge step can find it
//! and substitute the real id of the entity defined under that key.

use sha1::{Digest, Sha1};

/// Prefix shared by every pseudo-reference token.
pub const PSEUDO_REF_PREFIX: &str = "pseudo-ref-";

const DIGEST_HEX_LEN: usize = 40;

/// Derive the pseudo-reference token for an entity key.
///
/// The token is the prefix followed by the lowercase hex SHA-1 of the key, so
/// equal keys always give the same token and distinct keys do not collide.
pub fn pseudo_reference(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    format!("{}{:x}", PSEUDO_REF_PREFIX, hasher.finalize())
}

/// Whether a value has the shape of a pseudo-reference token.
pub fn is_pseudo_reference(value: &str) -> bool {
    value
        .strip_prefix(PSEUDO_REF_PREFIX)
        .map(|digest| {
            digest.len() == DIGEST_HEX_LEN
                && digest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        })
        .unwrap_or(false)
}
