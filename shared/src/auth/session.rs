//! # Opaque Token Minting & Hashing
//!
//! Session tokens and API keys share one mechanism: 32 cryptographically
//! random bytes are URL-safe base64 (no padding) encoded as the plaintext
//! the caller sees exactly once; a BLAKE3 digest of those same 32 raw bytes,
//! also URL-safe base64 (no padding) encoded, is the only form ever
//! persisted or looked up against. The plaintext is never stored.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

const TOKEN_BYTES: usize = 32;

/// A freshly minted token: `plaintext` is returned to the caller once
/// (cookie body or JSON response), `hash` is what gets persisted.
pub struct MintedToken {
    pub plaintext: String,
    pub hash: String,
}

/// Generates 32 cryptographically random bytes and encodes both the
/// plaintext and its hash.
pub fn mint_token() -> MintedToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    MintedToken {
        plaintext: URL_SAFE_NO_PAD.encode(bytes),
        hash: hash_raw(&bytes),
    }
}

/// Hashes a plaintext token (as received from a cookie or `X-API-KEY`
/// header) for lookup against stored hashes. Returns `None` if the
/// plaintext isn't valid base64 for a 32-byte token — callers treat that
/// the same as "no matching session", never as an error.
pub fn hash_token(plaintext: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(plaintext).ok()?;
    if bytes.len() != TOKEN_BYTES {
        return None;
    }
    Some(hash_raw(&bytes))
}

fn hash_raw(bytes: &[u8]) -> String {
    let digest = blake3::hash(bytes);
    URL_SAFE_NO_PAD.encode(digest.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn plaintext_and_hash_differ() {
        let minted = mint_token();
        assert_ne!(minted.plaintext, minted.hash);
    }

    #[test]
    fn hash_token_reproduces_mint_hash() {
        let minted = mint_token();
        assert_eq!(hash_token(&minted.plaintext), Some(minted.hash));
    }

    #[test]
    fn malformed_plaintext_hashes_to_none() {
        assert_eq!(hash_token("not valid base64!!"), None);
        assert_eq!(hash_token(""), None);
    }

    #[test]
    fn tokens_are_indistinguishable_at_scale() {
        let mut seen = HashSet::with_capacity(100_000);
        for _ in 0..100_000 {
            let minted = mint_token();
            assert!(seen.insert(minted.plaintext), "token collision");
        }
    }
}
