//! VC-JWT issuance and verification for OpenBadges 3.0.
//!
//! The payload *is* the credential: every OB field stays at the top level
//! next to the registered claims, never under a `vc` wrapper. The header
//! carries a dereferenceable `kid` (absolute URL, no fragment) and the
//! inline public JWK.
//!
//! RFC 7519 - JSON Web Token (JWT)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credential::{parse_timestamp, Credential};
use crate::error::Error;
use crate::jwk::{Algorithm, JWK};
use crate::jws;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Header {
    pub alg: Algorithm,
    pub typ: String,
    pub kid: String,
    pub jwk: JWK,
}

/// Where the signing key lives: `kid` becomes
/// `{controller_url}/keys/{key_id}`.
#[derive(Debug, Clone)]
pub struct JwtSignOptions {
    pub controller_url: String,
    pub key_id: String,
}

impl JwtSignOptions {
    fn kid(&self) -> Result<String, Error> {
        if self.controller_url.is_empty() {
            return Err(Error::configuration("empty controller URL").with("field", "controllerUrl"));
        }
        if !self.controller_url.starts_with("http://")
            && !self.controller_url.starts_with("https://")
        {
            return Err(Error::configuration("controller URL must be absolute http(s)")
                .with("field", "controllerUrl")
                .with("found", &self.controller_url));
        }
        if self.key_id.is_empty() {
            return Err(Error::configuration("empty key id").with("field", "keyId"));
        }
        let kid = format!(
            "{}/keys/{}",
            self.controller_url.trim_end_matches('/'),
            self.key_id
        );
        // kid must dereference as a plain URL; fragments would make it a
        // document-relative pointer
        if kid.contains('#') {
            return Err(Error::configuration("kid must not contain a fragment")
                .with("kid", &kid));
        }
        Ok(kid)
    }
}

/// Derive the `sub` claim from the credential subject id. Bare e-mail
/// addresses become `mailto:` URIs.
fn subject_claim(subject_id: &str) -> String {
    if subject_id.contains('@') && !subject_id.contains(':') {
        format!("mailto:{}", subject_id)
    } else {
        subject_id.to_string()
    }
}

/// Sign a credential as an RS256 VC-JWT.
pub fn sign_credential_jwt(
    credential: &Credential,
    key: &JWK,
    options: &JwtSignOptions,
) -> Result<String, Error> {
    let kid = options.kid()?;
    // the inline header jwk is exactly {kty, n, e}: public parameters, no
    // key metadata
    let mut public_jwk = key.to_public();
    public_jwk.public_key_use = None;
    public_jwk.key_operations = None;
    public_jwk.algorithm = None;
    public_jwk.key_id = None;
    if !matches!(public_jwk.params, crate::jwk::Params::RSA(_)) {
        return Err(Error::configuration("RS256 signing requires an RSA key"));
    }

    let header = Header {
        alg: Algorithm::RS256,
        typ: "JWT".to_string(),
        kid,
        jwk: public_jwk,
    };

    let mut payload = match credential.to_json()? {
        Value::Object(payload) => payload,
        _ => return Err(Error::configuration("credential did not serialize to an object")),
    };
    payload.insert("iss".to_string(), Value::String(credential.issuer.id.clone()));
    payload.insert("jti".to_string(), Value::String(credential.id.clone()));
    payload.insert(
        "sub".to_string(),
        Value::String(subject_claim(&credential.credential_subject.id)),
    );
    let not_before = parse_timestamp("validFrom", &credential.valid_from)?;
    payload.insert("nbf".to_string(), Value::from(not_before.timestamp()));
    if let Some(valid_until) = &credential.valid_until {
        let expiry = parse_timestamp("validUntil", valid_until)?;
        payload.insert("exp".to_string(), Value::from(expiry.timestamp()));
    }

    let header_b64 = jws::base64url_encode(serde_json::to_string(&header)?.as_bytes());
    let payload_b64 =
        jws::base64url_encode(serde_json::to_string(&Value::Object(payload))?.as_bytes());
    let signing_input = format!("{}.{}", header_b64, payload_b64);
    let signature = jws::sign_bytes(Algorithm::RS256, signing_input.as_bytes(), key)?;
    Ok(format!("{}.{}", signing_input, jws::base64url_encode(&signature)))
}

/// Verify an RS256 VC-JWT and decode its credential.
///
/// Every mismatch raises `Error::Verification`: a tampered segment is an
/// exceptional, loggable event, unlike the routine boolean answer of the
/// Data-Integrity verifier.
pub fn verify_credential_jwt(jwt: &str, key: &JWK) -> Result<Credential, Error> {
    let (payload, _header) = verify_jwt_segments(jwt, key)?;
    let credential: Credential = serde_json::from_value(payload)
        .map_err(|err| Error::verification("JWT payload is not an OpenBadges credential")
            .with("cause", err))?;
    Ok(credential)
}

/// Shared verification core: checks structure and signature, returns the
/// decoded payload and header.
pub fn verify_jwt_segments(jwt: &str, key: &JWK) -> Result<(Value, Header), Error> {
    let (header_b64, payload_b64, signature_b64) = jws::split_jws(jwt)?;
    let header_json = jws::base64url_decode(header_b64)
        .map_err(|_| Error::verification("JWT header is not base64url"))?;
    let header: Header = serde_json::from_slice(&header_json)
        .map_err(|err| Error::verification("malformed JWT header").with("cause", err))?;
    if header.alg != Algorithm::RS256 {
        return Err(Error::verification("unexpected JWT algorithm")
            .with("alg", format!("{:?}", header.alg)));
    }

    let signature = jws::base64url_decode(signature_b64)
        .map_err(|_| Error::verification("JWT signature is not base64url"))?;
    let signing_input = format!("{}.{}", header_b64, payload_b64);
    jws::verify_bytes(Algorithm::RS256, signing_input.as_bytes(), key, &signature)?;

    let payload_json = jws::base64url_decode(payload_b64)
        .map_err(|_| Error::verification("JWT payload is not base64url"))?;
    let payload: Value = serde_json::from_slice(&payload_json)
        .map_err(|err| Error::verification("malformed JWT payload").with("cause", err))?;
    Ok((payload, header))
}

/// Structural test for compact-JWS shape: three non-empty base64url
/// segments, the first decoding from `eyJ` (a JSON object header).
pub fn is_jwt_shaped(candidate: &str) -> bool {
    if !candidate.starts_with("eyJ") {
        return false;
    }
    let segments: Vec<&str> = candidate.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

/// Decode without checking the signature, for reporting surfaces that fold
/// verification failures into a result object.
pub fn decode_unverified(jwt: &str) -> Result<Value, Error> {
    let (_header_b64, payload_b64, _signature_b64) = jws::split_jws(jwt)?;
    let payload_json = jws::base64url_decode(payload_b64)?;
    Ok(serde_json::from_slice(&payload_json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::tests::test_config;
    use crate::credential::CredentialConfig;

    fn rsa_key() -> JWK {
        serde_json::from_str(include_str!("../tests/rsa2048-rfc7515-a2.json")).unwrap()
    }

    fn options() -> JwtSignOptions {
        JwtSignOptions {
            controller_url: "https://conference.example/api/badge".to_string(),
            key_id: "key-1".to_string(),
        }
    }

    fn dated_config() -> CredentialConfig {
        let mut config = test_config();
        config.valid_from = "2010-01-01T00:00:00Z".to_string();
        config.valid_until = Some("2030-01-01T00:00:00Z".to_string());
        config
    }

    #[test]
    fn jwt_shape_and_claims() {
        let credential = dated_config().build().unwrap();
        let key = rsa_key();
        let jwt = sign_credential_jwt(&credential, &key, &options()).unwrap();

        assert!(jwt.starts_with("eyJ"));
        let segments: Vec<&str> = jwt.split('.').collect();
        assert_eq!(segments.len(), 3);

        let header: Value =
            serde_json::from_slice(&jws::base64url_decode(segments[0]).unwrap()).unwrap();
        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["typ"], "JWT");
        assert_eq!(header["kid"], "https://conference.example/api/badge/keys/key-1");
        assert!(!header["kid"].as_str().unwrap().contains('#'));
        assert_eq!(header["jwk"]["kty"], "RSA");
        for private in &["d", "p", "q", "dp", "dq", "qi"] {
            assert!(header["jwk"].get(private).is_none(), "{} leaked into header", private);
        }
        let jwk_keys: Vec<&String> = header["jwk"].as_object().unwrap().keys().collect();
        assert_eq!(jwk_keys, ["e", "kty", "n"]);

        let payload: Value =
            serde_json::from_slice(&jws::base64url_decode(segments[1]).unwrap()).unwrap();
        assert!(payload.get("vc").is_none());
        assert_eq!(payload["iss"], payload["issuer"]["id"]);
        assert_eq!(payload["jti"], payload["id"]);
        assert_eq!(payload["sub"], "mailto:speaker@example.org");
        assert_eq!(payload["nbf"], 1262304000);
        assert_eq!(payload["exp"], 1893456000);
        assert_eq!(payload["type"][1], "OpenBadgeCredential");
    }

    #[test]
    fn verify_round_trip_preserves_credential() {
        let credential = dated_config().build().unwrap();
        let key = rsa_key();
        let jwt = sign_credential_jwt(&credential, &key, &options()).unwrap();
        let decoded = verify_credential_jwt(&jwt, &key.to_public()).unwrap();
        assert_eq!(decoded.id, credential.id);
        assert_eq!(decoded.issuer.id, credential.issuer.id);
        assert_eq!(
            decoded.credential_subject.achievement.as_ref().unwrap().name,
            "Conference Speaker"
        );
        // registered claims survive in the open property set
        let extras = decoded.property_set.unwrap();
        assert!(extras.contains_key("iss"));
        assert!(extras.contains_key("nbf"));
    }

    #[test]
    fn tampered_payload_raises() {
        let credential = dated_config().build().unwrap();
        let key = rsa_key();
        let jwt = sign_credential_jwt(&credential, &key, &options()).unwrap();
        let segments: Vec<&str> = jwt.split('.').collect();

        let mut forged: Value =
            serde_json::from_slice(&jws::base64url_decode(segments[1]).unwrap()).unwrap();
        forged["name"] = Value::String("Forged Badge".to_string());
        let forged_b64 = jws::base64url_encode(forged.to_string().as_bytes());
        let tampered = format!("{}.{}.{}", segments[0], forged_b64, segments[2]);

        let err = verify_credential_jwt(&tampered, &key).unwrap_err();
        assert!(matches!(err, Error::Verification(_)));
    }

    #[test]
    fn tampered_signature_raises() {
        let credential = dated_config().build().unwrap();
        let key = rsa_key();
        let jwt = sign_credential_jwt(&credential, &key, &options()).unwrap();
        let mut tampered = jwt;
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert!(verify_credential_jwt(&tampered, &key).is_err());
    }

    #[test]
    fn malformed_structure_raises() {
        let key = rsa_key();
        for bad in &["", "eyJ", "one.two", "a.b.c.d"] {
            assert!(matches!(
                verify_credential_jwt(bad, &key),
                Err(Error::Verification(_))
            ));
        }
    }

    #[test]
    fn non_email_subject_is_left_alone() {
        assert_eq!(subject_claim("did:example:abc"), "did:example:abc");
        assert_eq!(subject_claim("user@example.org"), "mailto:user@example.org");
        assert_eq!(
            subject_claim("mailto:user@example.org"),
            "mailto:user@example.org"
        );
    }

    #[test]
    fn sign_rejects_bad_options() {
        let credential = dated_config().build().unwrap();
        let key = rsa_key();
        let mut bad = options();
        bad.controller_url = "ftp://conference.example".to_string();
        assert!(matches!(
            sign_credential_jwt(&credential, &key, &bad),
            Err(Error::Configuration(_))
        ));
        let mut fragment = options();
        fragment.key_id = "key#1".to_string();
        assert!(matches!(
            sign_credential_jwt(&credential, &key, &fragment),
            Err(Error::Configuration(_))
        ));
    }
}
