use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::der::{Der, Integer, RsaPrivateKey};
use crate::error::Error;

// RFC 7517 - JSON Web Key (JWK)
// RFC 7518 - JSON Web Algorithms (JWA)
// RFC 8037 - CFRG Elliptic Curve Signatures in JOSE

/// Raw Ed25519 public keys are always exactly this long.
pub const ED25519_KEY_LENGTH: usize = 32;

/// The two signature algorithms the engine issues credentials with.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    RS256,
    EdDSA,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JWK {
    #[serde(rename = "use")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_use: Option<String>,
    #[serde(rename = "key_ops")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_operations: Option<Vec<String>>,
    #[serde(rename = "alg")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<Algorithm>,
    #[serde(rename = "kid")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(flatten)]
    pub params: Params,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kty")]
pub enum Params {
    RSA(RsaParams),
    OKP(OctetParams),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct RsaParams {
    #[serde(rename = "n")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modulus: Option<Base64urlUInt>,
    #[serde(rename = "e")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exponent: Option<Base64urlUInt>,
    #[serde(rename = "d")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_exponent: Option<Base64urlUInt>,
    #[serde(rename = "p")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_prime_factor: Option<Base64urlUInt>,
    #[serde(rename = "q")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_prime_factor: Option<Base64urlUInt>,
    #[serde(rename = "dp")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_prime_factor_crt_exponent: Option<Base64urlUInt>,
    #[serde(rename = "dq")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_prime_factor_crt_exponent: Option<Base64urlUInt>,
    #[serde(rename = "qi")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_crt_coefficient: Option<Base64urlUInt>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OctetParams {
    #[serde(rename = "crv")]
    pub curve: String,
    #[serde(rename = "x")]
    pub public_key: Base64urlUInt,
    #[serde(rename = "d")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<Base64urlUInt>,
}

/// Big-endian unsigned integer, serialized as base64url without padding.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct Base64urlUInt(pub Vec<u8>);

impl TryFrom<String> for Base64urlUInt {
    type Error = Error;
    fn try_from(data: String) -> Result<Self, Self::Error> {
        Ok(Base64urlUInt(base64::decode_config(
            data,
            base64::URL_SAFE_NO_PAD,
        )?))
    }
}

impl From<Base64urlUInt> for String {
    fn from(data: Base64urlUInt) -> String {
        base64::encode_config(&data.0, base64::URL_SAFE_NO_PAD)
    }
}

impl JWK {
    pub fn rsa_public(modulus: Vec<u8>, exponent: Vec<u8>) -> Self {
        JWK {
            params: Params::RSA(RsaParams {
                modulus: Some(Base64urlUInt(modulus)),
                exponent: Some(Base64urlUInt(exponent)),
                ..RsaParams::default()
            }),
            public_key_use: None,
            key_operations: None,
            algorithm: Some(Algorithm::RS256),
            key_id: None,
        }
    }

    pub fn ed25519_public(public_key: Vec<u8>) -> Self {
        JWK {
            params: Params::OKP(OctetParams {
                curve: "Ed25519".to_string(),
                public_key: Base64urlUInt(public_key),
                private_key: None,
            }),
            public_key_use: None,
            key_operations: None,
            algorithm: Some(Algorithm::EdDSA),
            key_id: None,
        }
    }

    /// Project the key onto its public parameters. Everything this engine
    /// publishes (JWT headers, the `kid` dereference document, Multikey
    /// documents) goes through here.
    pub fn to_public(&self) -> Self {
        let mut key = self.clone();
        key.params = match &self.params {
            Params::RSA(rsa) => Params::RSA(RsaParams {
                modulus: rsa.modulus.clone(),
                exponent: rsa.exponent.clone(),
                ..RsaParams::default()
            }),
            Params::OKP(okp) => Params::OKP(OctetParams {
                curve: okp.curve.clone(),
                public_key: okp.public_key.clone(),
                private_key: None,
            }),
        };
        key
    }

    pub fn is_public(&self) -> bool {
        match &self.params {
            Params::RSA(rsa) => {
                rsa.private_exponent.is_none()
                    && rsa.first_prime_factor.is_none()
                    && rsa.second_prime_factor.is_none()
                    && rsa.first_prime_factor_crt_exponent.is_none()
                    && rsa.second_prime_factor_crt_exponent.is_none()
                    && rsa.first_crt_coefficient.is_none()
            }
            Params::OKP(okp) => okp.private_key.is_none(),
        }
    }
}

impl RsaParams {
    /// ring verifies RSA 2048-8192; reject anything outside that range
    /// before handing the key over.
    pub fn validate_key_size(&self) -> Result<(), Error> {
        let modulus = self
            .modulus
            .as_ref()
            .ok_or_else(|| Error::key_format("missing modulus in RSA key"))?;
        let bits = modulus.0.len() * 8;
        if !(2048..=8192).contains(&bits) {
            return Err(Error::key_format("unsupported RSA modulus size")
                .with("bits", bits));
        }
        Ok(())
    }

    fn private_der(&self) -> Result<Der, Error> {
        let int = |param: &Option<Base64urlUInt>, name: &'static str| {
            param
                .as_ref()
                .map(|p| Integer(p.0.clone()))
                .ok_or_else(|| Error::key_format("missing RSA private parameter").with("parameter", name))
        };
        let key = RsaPrivateKey {
            modulus: int(&self.modulus, "n")?,
            public_exponent: int(&self.exponent, "e")?,
            private_exponent: int(&self.private_exponent, "d")?,
            prime1: int(&self.first_prime_factor, "p")?,
            prime2: int(&self.second_prime_factor, "q")?,
            exponent1: int(&self.first_prime_factor_crt_exponent, "dp")?,
            exponent2: int(&self.second_prime_factor_crt_exponent, "dq")?,
            coefficient: int(&self.first_crt_coefficient, "qi")?,
        };
        Ok(Der::from(&key))
    }
}

impl TryFrom<&RsaParams> for ring::signature::RsaKeyPair {
    type Error = Error;
    fn try_from(params: &RsaParams) -> Result<Self, Self::Error> {
        params.validate_key_size()?;
        let der = params.private_der()?;
        ring::signature::RsaKeyPair::from_der(&der)
            .map_err(|err| Error::key_format("RSA private key rejected").with("cause", format!("{:?}", err)))
    }
}

impl TryFrom<&RsaParams> for ring::signature::RsaPublicKeyComponents<Vec<u8>> {
    type Error = Error;
    fn try_from(params: &RsaParams) -> Result<Self, Self::Error> {
        params.validate_key_size()?;
        let n = params
            .modulus
            .as_ref()
            .ok_or_else(|| Error::key_format("missing modulus in RSA key"))?;
        let e = params
            .exponent
            .as_ref()
            .ok_or_else(|| Error::key_format("missing exponent in RSA key"))?;
        Ok(ring::signature::RsaPublicKeyComponents {
            n: n.0.clone(),
            e: e.0.clone(),
        })
    }
}

impl TryFrom<&OctetParams> for ed25519_dalek::PublicKey {
    type Error = Error;
    fn try_from(params: &OctetParams) -> Result<Self, Self::Error> {
        if params.curve != "Ed25519" {
            return Err(Error::key_format("unsupported OKP curve").with("curve", &params.curve));
        }
        ed25519_dalek::PublicKey::from_bytes(&params.public_key.0)
            .map_err(|err| Error::key_format("invalid Ed25519 public key").with("cause", err))
    }
}

impl TryFrom<&OctetParams> for ed25519_dalek::Keypair {
    type Error = Error;
    fn try_from(params: &OctetParams) -> Result<Self, Self::Error> {
        if params.curve != "Ed25519" {
            return Err(Error::key_format("unsupported OKP curve").with("curve", &params.curve));
        }
        let private = params
            .private_key
            .as_ref()
            .ok_or_else(|| Error::key_format("missing Ed25519 private key"))?;
        let secret = ed25519_dalek::SecretKey::from_bytes(&private.0)
            .map_err(|err| Error::key_format("invalid Ed25519 private key").with("cause", err))?;
        let public = ed25519_dalek::PublicKey::from(&secret);
        if public.as_bytes()[..] != params.public_key.0[..] {
            return Err(Error::key_format("Ed25519 public key does not match private key"));
        }
        Ok(ed25519_dalek::Keypair { secret, public })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_test_key() -> JWK {
        serde_json::from_str(include_str!("../tests/rsa2048-rfc7515-a2.json")).unwrap()
    }

    #[test]
    fn to_public_strips_private_parameters() {
        let key = rsa_test_key();
        assert!(!key.is_public());
        let public = key.to_public();
        assert!(public.is_public());
        let json = serde_json::to_value(&public).unwrap();
        for param in &["d", "p", "q", "dp", "dq", "qi"] {
            assert!(json.get(param).is_none(), "private parameter {} leaked", param);
        }
        assert!(json.get("n").is_some());
        assert!(json.get("e").is_some());
    }

    #[test]
    fn rsa_key_size_is_validated() {
        let params = RsaParams {
            modulus: Some(Base64urlUInt(vec![0xff; 64])),
            exponent: Some(Base64urlUInt(vec![1, 0, 1])),
            ..RsaParams::default()
        };
        assert!(matches!(params.validate_key_size(), Err(Error::KeyFormat(_))));
    }

    #[test]
    fn rsa_signing_key_from_jwk() {
        let key = rsa_test_key();
        if let Params::RSA(params) = &key.params {
            ring::signature::RsaKeyPair::try_from(params).unwrap();
        } else {
            panic!("expected RSA params");
        }
    }

    #[test]
    fn okp_keypair_round_trip() {
        let secret = ed25519_dalek::SecretKey::from_bytes(&[7u8; 32]).unwrap();
        let public = ed25519_dalek::PublicKey::from(&secret);
        let params = OctetParams {
            curve: "Ed25519".to_string(),
            public_key: Base64urlUInt(public.as_bytes().to_vec()),
            private_key: Some(Base64urlUInt(secret.as_bytes().to_vec())),
        };
        ed25519_dalek::Keypair::try_from(&params).unwrap();
    }

    #[test]
    fn okp_rejects_unknown_curve() {
        let params = OctetParams {
            curve: "X25519".to_string(),
            public_key: Base64urlUInt(vec![0; 32]),
            private_key: None,
        };
        assert!(ed25519_dalek::PublicKey::try_from(&params).is_err());
    }
}
