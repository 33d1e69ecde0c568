//! Byte-level encodings shared by the key utilities and proof suites:
//! lowercase hex and multibase base58btc (`z` prefix).

use multibase::Base;

use crate::error::Error;

/// Multibase prefix character for base58btc.
pub const MULTIBASE_BASE58BTC_PREFIX: char = 'z';

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, Error> {
    if s.len() % 2 != 0 {
        return Err(Error::encoding("odd-length hex string").with("length", s.len()));
    }
    hex::decode(s).map_err(|err| match err {
        hex::FromHexError::InvalidHexCharacter { c, index } => {
            Error::encoding("invalid hex character")
                .with("character", c)
                .with("index", index)
        }
        other => Error::encoding("invalid hex string").with("cause", other),
    })
}

/// Encode bytes as base58btc with the `z` multibase prefix.
pub fn multibase_encode(bytes: &[u8]) -> String {
    multibase::encode(Base::Base58Btc, bytes)
}

/// Decode a `z`-prefixed base58btc multibase string.
///
/// Other multibase alphabets are rejected: every multibase value this engine
/// produces or consumes (proofValue, publicKeyMultibase, did:key) is
/// base58btc.
pub fn multibase_decode(s: &str) -> Result<Vec<u8>, Error> {
    match s.chars().next() {
        None => return Err(Error::encoding("empty multibase string")),
        Some(MULTIBASE_BASE58BTC_PREFIX) => {}
        Some(prefix) => {
            return Err(Error::encoding("unexpected multibase prefix")
                .with("expected", MULTIBASE_BASE58BTC_PREFIX)
                .with("found", prefix));
        }
    }
    let (base, bytes) = multibase::decode(s)?;
    if base != Base::Base58Btc {
        return Err(Error::encoding("unexpected multibase alphabet"));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let bytes = vec![0x00, 0x01, 0xab, 0xff];
        let hex = bytes_to_hex(&bytes);
        assert_eq!(hex, "0001abff");
        assert_eq!(hex_to_bytes(&hex).unwrap(), bytes);
    }

    #[test]
    fn hex_rejects_odd_length() {
        let err = hex_to_bytes("abc").unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        assert_eq!(err.context().get("length").map(String::as_str), Some("3"));
    }

    #[test]
    fn hex_rejects_bad_character() {
        let err = hex_to_bytes("zz").unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn multibase_round_trip() {
        let bytes = b"hello world".to_vec();
        let encoded = multibase_encode(&bytes);
        assert!(encoded.starts_with('z'));
        assert_eq!(multibase_decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn multibase_rejects_wrong_prefix() {
        let err = multibase_decode("uAAAA").unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        assert_eq!(err.context().get("found").map(String::as_str), Some("u"));
    }

    #[test]
    fn multibase_rejects_bad_alphabet() {
        // 0, O, I and l are not in the base58btc alphabet.
        assert!(multibase_decode("z0OIl").is_err());
    }
}
