//! Data-Integrity proofs: the `eddsa-rdfc-2022` cryptosuite over a
//! pluggable canonicalization strategy.
//!
//! The two verification conventions in this engine differ on purpose:
//! checking a Data-Integrity proof is a routine question about untrusted
//! input, so [`DataIntegrity::verify`] answers with a boolean and reserves
//! errors for input that cannot be checked at all (no proof), while the JWT
//! verifier in [`crate::jwt`] treats a failed check as an exceptional event
//! and raises.

use chrono::Utc;
use log::{debug, warn};
use ring::digest;
use serde_json::Value;

use crate::credential::{ensure_absolute_iri, Credential, Proof};
use crate::encoding::{multibase_decode, multibase_encode};
use crate::error::Error;
use crate::jsonld::{self, ContextSet};
use crate::jwk::ED25519_KEY_LENGTH;
use crate::urdna2015;

pub const PROOF_TYPE_DATA_INTEGRITY: &str = "DataIntegrityProof";
pub const CRYPTOSUITE_EDDSA_RDFC_2022: &str = "eddsa-rdfc-2022";
pub const PROOF_PURPOSE_ASSERTION: &str = "assertionMethod";

/// Strategy producing the canonical byte form of a JSON-LD document.
///
/// Injected rather than inlined so the normalization algorithm can be
/// swapped without touching the signer.
pub trait Canonicalizer {
    fn canonicalize(&self, document: &Value) -> Result<Vec<u8>, Error>;
    fn name(&self) -> &'static str;
}

/// RDF dataset canonicalization over the pinned context set; the default,
/// matching the `eddsa-rdfc-2022` cryptosuite identifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct Urdna2015Canonicalizer;

impl Canonicalizer for Urdna2015Canonicalizer {
    fn canonicalize(&self, document: &Value) -> Result<Vec<u8>, Error> {
        let contexts = ContextSet::for_document(document);
        let dataset = jsonld::to_dataset(document, &contexts)?;
        let normalized = urdna2015::normalize(&dataset)?;
        debug!("canonicalized document into {} quads", normalized.len());
        Ok(normalized.to_nquads().into_bytes())
    }

    fn name(&self) -> &'static str {
        "urdna2015"
    }
}

/// JSON Canonicalization Scheme (RFC 8785), the lighter alternate strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct JcsCanonicalizer;

impl Canonicalizer for JcsCanonicalizer {
    fn canonicalize(&self, document: &Value) -> Result<Vec<u8>, Error> {
        Ok(serde_jcs::to_string(document)?.into_bytes())
    }

    fn name(&self) -> &'static str {
        "jcs"
    }
}

/// Ed25519 Data-Integrity signer and verifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataIntegrity<C = Urdna2015Canonicalizer> {
    canonicalizer: C,
}

impl DataIntegrity<Urdna2015Canonicalizer> {
    pub fn new() -> Self {
        DataIntegrity {
            canonicalizer: Urdna2015Canonicalizer,
        }
    }
}

impl<C: Canonicalizer> DataIntegrity<C> {
    pub fn with_canonicalizer(canonicalizer: C) -> Self {
        DataIntegrity { canonicalizer }
    }

    /// Sign a credential, attaching a `proof` array of length one.
    ///
    /// The signing input is the cryptosuite hash pair: SHA-256 over the
    /// canonical proof configuration concatenated with SHA-256 over the
    /// canonical proofless credential.
    pub fn sign(
        &self,
        credential: &Credential,
        private_key: &[u8],
        verification_method: &str,
    ) -> Result<Credential, Error> {
        if private_key.is_empty() {
            return Err(Error::configuration("empty private key").with("field", "privateKey"));
        }
        if verification_method.is_empty() {
            return Err(Error::configuration("empty verification method")
                .with("field", "verificationMethod"));
        }
        ensure_absolute_iri("verificationMethod", verification_method)?;
        if credential.is_signed() {
            return Err(Error::signing("credential already carries a proof"));
        }
        let secret = ed25519_dalek::SecretKey::from_bytes(private_key).map_err(|_| {
            Error::key_format("invalid Ed25519 private key")
                .with("expected", ED25519_KEY_LENGTH)
                .with("found", private_key.len())
        })?;
        let public = ed25519_dalek::PublicKey::from(&secret);

        let proof = Proof {
            type_: PROOF_TYPE_DATA_INTEGRITY.to_string(),
            cryptosuite: Some(CRYPTOSUITE_EDDSA_RDFC_2022.to_string()),
            created: Some(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            verification_method: Some(verification_method.to_string()),
            proof_purpose: Some(PROOF_PURPOSE_ASSERTION.to_string()),
            proof_value: None,
            property_set: None,
        };

        let document = credential.to_json()?;
        let signing_input =
            self.signing_input(&document, &serde_json::to_value(&proof)?)?;

        let signature =
            ed25519_dalek::ExpandedSecretKey::from(&secret).sign(&signing_input, &public);

        let mut signed = credential.clone();
        signed.proof = Some(vec![Proof {
            proof_value: Some(multibase_encode(&signature.to_bytes())),
            ..proof
        }]);
        Ok(signed)
    }

    /// Check the proof on a signed credential.
    ///
    /// Returns `Ok(false)` for every cryptographic mismatch — a truncated
    /// or altered `proofValue` is an answer, not an exception. A credential
    /// with no proof (or `proof: []`) cannot be checked and raises
    /// `Error::Verification`.
    pub fn verify(&self, credential: &Credential, public_key: &[u8]) -> Result<bool, Error> {
        self.verify_json(&credential.to_json()?, public_key)
    }

    /// Untyped variant of [`DataIntegrity::verify`] for callers holding the
    /// stored JSON artifact.
    pub fn verify_json(&self, credential: &Value, public_key: &[u8]) -> Result<bool, Error> {
        let proofs = match credential.get("proof") {
            Some(Value::Array(proofs)) if !proofs.is_empty() => proofs,
            _ => {
                return Err(Error::verification(
                    "credential has no proof to verify",
                ));
            }
        };
        if proofs.len() > 1 {
            warn!("credential carries {} proofs; checking the first", proofs.len());
        }
        let proof = match proofs[0].as_object() {
            Some(proof) => proof,
            None => return Err(Error::verification("proof is not an object")),
        };

        if proof.get("type").and_then(Value::as_str) != Some(PROOF_TYPE_DATA_INTEGRITY)
            || proof.get("cryptosuite").and_then(Value::as_str)
                != Some(CRYPTOSUITE_EDDSA_RDFC_2022)
        {
            debug!("proof type or cryptosuite mismatch");
            return Ok(false);
        }
        let proof_value = match proof.get("proofValue").and_then(Value::as_str) {
            Some(proof_value) => proof_value,
            None => {
                debug!("proof has no proofValue");
                return Ok(false);
            }
        };
        let signature_bytes = match multibase_decode(proof_value) {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!("proofValue is not valid multibase");
                return Ok(false);
            }
        };

        let mut document = credential.clone();
        if let Some(root) = document.as_object_mut() {
            root.remove("proof");
        }
        let mut proof_config = Value::Object(proof.clone());
        if let Some(config) = proof_config.as_object_mut() {
            config.remove("proofValue");
        }
        let signing_input = self.signing_input(&document, &proof_config)?;

        let public = ed25519_dalek::PublicKey::from_bytes(public_key).map_err(|_| {
            Error::key_format("invalid Ed25519 public key")
                .with("expected", ED25519_KEY_LENGTH)
                .with("found", public_key.len())
        })?;
        let signature = {
            use ed25519_dalek::ed25519::signature::Signature;
            match ed25519_dalek::Signature::from_bytes(&signature_bytes) {
                Ok(signature) => signature,
                Err(_) => {
                    debug!("proofValue has wrong signature length");
                    return Ok(false);
                }
            }
        };
        use ed25519_dalek::Verifier;
        match public.verify(&signing_input, &signature) {
            Ok(()) => Ok(true),
            Err(_) => {
                debug!("Data-Integrity signature check failed");
                Ok(false)
            }
        }
    }

    /// `sha256(canon(proof config)) || sha256(canon(document))`. The proof
    /// configuration is interpreted against the document's own context; the
    /// stored proof never carries one.
    fn signing_input(&self, document: &Value, proof_config: &Value) -> Result<Vec<u8>, Error> {
        let mut options = proof_config.clone();
        if let (Some(options), Some(context)) =
            (options.as_object_mut(), document.get("@context"))
        {
            options.insert("@context".to_string(), context.clone());
        }
        let options_canonical = self.canonicalizer.canonicalize(&options)?;
        let document_canonical = self.canonicalizer.canonicalize(document)?;
        let options_digest = digest::digest(&digest::SHA256, &options_canonical);
        let document_digest = digest::digest(&digest::SHA256, &document_canonical);
        Ok([options_digest.as_ref(), document_digest.as_ref()].concat())
    }
}
