//! Compact JWS primitives for the two algorithms the engine ships:
//! RS256 for VC-JWTs and EdDSA for key self-tests.
//!
//! RFC 7515 - JSON Web Signature (JWS)

use std::convert::TryFrom;

use crate::error::Error;
use crate::jwk::{Algorithm, Params, JWK};

pub fn base64url_encode(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

pub fn base64url_decode(data: &str) -> Result<Vec<u8>, Error> {
    Ok(base64::decode_config(data, base64::URL_SAFE_NO_PAD)?)
}

/// Sign raw bytes with the given key. Any failure here is a
/// [`Error::Signing`] unless the key itself is unusable.
pub fn sign_bytes(algorithm: Algorithm, data: &[u8], key: &JWK) -> Result<Vec<u8>, Error> {
    match (&key.params, algorithm) {
        (Params::RSA(rsa_params), Algorithm::RS256) => {
            let key_pair = ring::signature::RsaKeyPair::try_from(rsa_params)?;
            let mut signature = vec![0u8; key_pair.public_modulus_len()];
            let rng = ring::rand::SystemRandom::new();
            key_pair
                .sign(&ring::signature::RSA_PKCS1_SHA256, &rng, data, &mut signature)
                .map_err(|_| Error::signing("RSA signing failed"))?;
            Ok(signature)
        }
        (Params::OKP(okp), Algorithm::EdDSA) => {
            let keypair = ed25519_dalek::Keypair::try_from(okp)?;
            use ed25519_dalek::Signer;
            Ok(keypair.sign(data).to_bytes().to_vec())
        }
        _ => Err(Error::signing("algorithm does not match key type")
            .with("algorithm", format!("{:?}", algorithm))),
    }
}

/// Verify raw bytes against a signature. A mismatch raises
/// [`Error::Verification`]; callers wanting a boolean catch it.
pub fn verify_bytes(
    algorithm: Algorithm,
    data: &[u8],
    key: &JWK,
    signature: &[u8],
) -> Result<(), Error> {
    if let Some(key_algorithm) = key.algorithm {
        if key_algorithm != algorithm {
            return Err(Error::verification("algorithm in JWS header does not match key")
                .with("header", format!("{:?}", algorithm))
                .with("key", format!("{:?}", key_algorithm)));
        }
    }
    match (&key.params, algorithm) {
        (Params::RSA(rsa_params), Algorithm::RS256) => {
            let public_key =
                ring::signature::RsaPublicKeyComponents::<Vec<u8>>::try_from(rsa_params)?;
            public_key
                .verify(&ring::signature::RSA_PKCS1_2048_8192_SHA256, data, signature)
                .map_err(|_| Error::verification("RSA signature check failed"))
        }
        (Params::OKP(okp), Algorithm::EdDSA) => {
            let public_key = ed25519_dalek::PublicKey::try_from(okp)?;
            let signature = {
                use ed25519_dalek::ed25519::signature::Signature;
                ed25519_dalek::Signature::from_bytes(signature)
                    .map_err(|_| Error::verification("malformed Ed25519 signature"))?
            };
            use ed25519_dalek::Verifier;
            public_key
                .verify(data, &signature)
                .map_err(|_| Error::verification("Ed25519 signature check failed"))
        }
        _ => Err(Error::verification("algorithm does not match key type")
            .with("algorithm", format!("{:?}", algorithm))),
    }
}

/// Split a compact JWS into its three base64url segments.
pub fn split_jws(jws: &str) -> Result<(&str, &str, &str), Error> {
    let mut parts = jws.splitn(4, '.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok((header, payload, signature))
        }
        _ => Err(Error::verification("compact JWS must have three segments")),
    }
}
