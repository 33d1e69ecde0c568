//! Key-material utilities: public-only JWKs from raw key bytes,
//! deterministic key identifiers, Multikey documents and `did:key` handling.
//!
//! Nothing in this module ever emits private key parameters.

use std::collections::HashMap;
use std::sync::RwLock;

use ring::digest;
use serde::{Deserialize, Serialize};

use crate::der;
use crate::encoding::{bytes_to_hex, hex_to_bytes, multibase_decode, multibase_encode};
use crate::error::Error;
use crate::jwk::{ED25519_KEY_LENGTH, JWK};

/// Multicodec prefix for an Ed25519 public key (varint 0xed).
pub const MULTICODEC_ED25519_PUB: [u8; 2] = [0xed, 0x01];

pub const DID_KEY_PREFIX: &str = "did:key:";

/// JSON-LD contexts of a Multikey verification-method document.
pub const MULTIKEY_CONTEXTS: [&str; 2] = [
    "https://www.w3.org/ns/credentials/v2",
    "https://w3id.org/security/multikey/v1",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    Ed25519,
}

/// Build a public-only JWK from raw public key bytes.
///
/// For RSA the bytes are a DER-encoded `RSAPublicKey` (bare PKCS#1 or
/// SubjectPublicKeyInfo); for Ed25519 they are the 32-byte point.
pub fn public_key_to_jwk(bytes: &[u8], key_type: KeyType) -> Result<JWK, Error> {
    match key_type {
        KeyType::Ed25519 => {
            if bytes.len() != ED25519_KEY_LENGTH {
                return Err(Error::key_format("wrong Ed25519 public key length")
                    .with("expected", ED25519_KEY_LENGTH)
                    .with("found", bytes.len()));
            }
            Ok(JWK::ed25519_public(bytes.to_vec()))
        }
        KeyType::Rsa => {
            let key = der::parse_rsa_public_key(bytes)?;
            Ok(JWK::rsa_public(key.modulus.0, key.public_exponent.0))
        }
    }
}

/// Deterministic identifier for a public key: `key-` plus the first 16 hex
/// digits of the SHA-256 of the key bytes. Same input, same output, always.
pub fn generate_key_id(public_key: &[u8]) -> String {
    let hash = digest::digest(&digest::SHA256, public_key);
    format!("key-{}", &bytes_to_hex(hash.as_ref())[..16])
}

/// Explicit memoization cache for key identifiers.
///
/// Owned and sized by the caller and injected where needed; read-mostly, so
/// a `RwLock` map is enough for concurrent issuance.
#[derive(Debug, Default)]
pub struct KeyIdCache {
    inner: RwLock<HashMap<Vec<u8>, String>>,
}

impl KeyIdCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_id(&self, public_key: &[u8]) -> String {
        if let Some(id) = self
            .inner
            .read()
            .ok()
            .and_then(|map| map.get(public_key).cloned())
        {
            return id;
        }
        let id = generate_key_id(public_key);
        if let Ok(mut map) = self.inner.write() {
            map.insert(public_key.to_vec(), id.clone());
        }
        id
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }
}

/// DID-oriented public key document, served at `{controller}/keys/{key_id}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MultikeyDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub controller: String,
    #[serde(rename = "publicKeyMultibase")]
    pub public_key_multibase: String,
}

/// Build a Multikey document for a hex-encoded Ed25519 public key.
pub fn generate_multikey_document(
    public_key_hex: &str,
    key_id: &str,
    controller_url: &str,
) -> Result<MultikeyDocument, Error> {
    if controller_url.is_empty() {
        return Err(Error::configuration("empty controller URL").with("field", "controllerUrl"));
    }
    if !controller_url.starts_with("http://") && !controller_url.starts_with("https://") {
        return Err(Error::configuration("controller URL must be absolute http(s)")
            .with("field", "controllerUrl")
            .with("found", controller_url));
    }
    if key_id.is_empty() {
        return Err(Error::configuration("empty key id").with("field", "keyId"));
    }
    let public_key = hex_to_bytes(public_key_hex)
        .map_err(|err| Error::key_format("public key is not valid hex").with("cause", err))?;
    if public_key.len() != ED25519_KEY_LENGTH {
        return Err(Error::key_format("wrong Ed25519 public key length")
            .with("expected", ED25519_KEY_LENGTH)
            .with("found", public_key.len()));
    }
    Ok(MultikeyDocument {
        context: MULTIKEY_CONTEXTS.iter().map(|c| c.to_string()).collect(),
        id: format!("{}/keys/{}", controller_url.trim_end_matches('/'), key_id),
        type_: "Multikey".to_string(),
        controller: controller_url.trim_end_matches('/').to_string(),
        public_key_multibase: multibase_encode(
            &[&MULTICODEC_ED25519_PUB[..], &public_key].concat(),
        ),
    })
}

/// Parse a `did:key:z...` string back into raw Ed25519 public key bytes.
pub fn did_key_to_public_key(did: &str) -> Result<Vec<u8>, Error> {
    let method_specific_id = did
        .strip_prefix(DID_KEY_PREFIX)
        .ok_or_else(|| Error::key_format("not a did:key").with("found", did))?;
    let data = multibase_decode(method_specific_id)
        .map_err(|err| Error::key_format("invalid did:key encoding").with("cause", err))?;
    if data.len() < MULTICODEC_ED25519_PUB.len() || data[..2] != MULTICODEC_ED25519_PUB {
        return Err(Error::key_format("unsupported did:key multicodec prefix"));
    }
    let public_key = &data[MULTICODEC_ED25519_PUB.len()..];
    if public_key.len() != ED25519_KEY_LENGTH {
        return Err(Error::key_format("wrong Ed25519 public key length in did:key")
            .with("expected", ED25519_KEY_LENGTH)
            .with("found", public_key.len()));
    }
    Ok(public_key.to_vec())
}

/// Inverse of [`did_key_to_public_key`].
pub fn did_key_from_public_key(public_key: &[u8]) -> Result<String, Error> {
    if public_key.len() != ED25519_KEY_LENGTH {
        return Err(Error::key_format("wrong Ed25519 public key length")
            .with("expected", ED25519_KEY_LENGTH)
            .with("found", public_key.len()));
    }
    let encoded = multibase_encode(&[&MULTICODEC_ED25519_PUB[..], public_key].concat());
    Ok(format!("{}{}", DID_KEY_PREFIX, encoded))
}
