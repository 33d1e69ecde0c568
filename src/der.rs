// RFC 8017 appendix A: RSAPrivateKey and RSAPublicKey ASN.1 structures.
// Encoding is hand-rolled DER (tag-length-value); decoding goes through
// simple_asn1 since incoming key material may be either the bare PKCS#1
// structure or a SubjectPublicKeyInfo wrapper.

use num_bigint::{BigInt, Sign};
use simple_asn1::ASN1Block;

use crate::error::Error;

const TAG_INTEGER: u8 = 0x02;
const TAG_SEQUENCE: u8 = 0x10;

pub type Der = Vec<u8>;

/// RFC 8017 RSAPrivateKey, two-prime form. All integers are unsigned
/// big-endian magnitudes as found in JWK parameters.
#[derive(Debug, Clone)]
pub struct RsaPrivateKey {
    pub modulus: Integer,
    pub public_exponent: Integer,
    pub private_exponent: Integer,
    pub prime1: Integer,
    pub prime2: Integer,
    pub exponent1: Integer,
    pub exponent2: Integer,
    pub coefficient: Integer,
}

/// RFC 8017 RSAPublicKey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub modulus: Integer,
    pub public_exponent: Integer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integer(pub Vec<u8>);

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b != 0) {
        Some(n) => &bytes[n..],
        None => &bytes[bytes.len().saturating_sub(1)..],
    }
}

fn tlv(tag: u8, constructed: bool, contents: Vec<u8>) -> Vec<u8> {
    let id = if constructed { tag | 0x20 } else { tag };
    let len = contents.len();
    if len <= 127 {
        let mut out = vec![id, len as u8];
        out.extend(contents);
        return out;
    }
    let len_bytes = strip_leading_zeros(&len.to_be_bytes()).to_vec();
    let mut out = vec![id, 0x80 | len_bytes.len() as u8];
    out.extend(len_bytes);
    out.extend(contents);
    out
}

impl Integer {
    /// DER INTEGER encoding: two's complement, so a magnitude with the high
    /// bit set gets a leading zero octet.
    fn to_der(&self) -> Vec<u8> {
        let magnitude = strip_leading_zeros(&self.0);
        let mut contents = Vec::with_capacity(magnitude.len() + 1);
        if magnitude.first().map_or(true, |&b| b & 0x80 != 0) {
            contents.push(0);
        }
        if magnitude.is_empty() {
            // empty JWK parameter encodes as INTEGER 0
        } else {
            contents.extend_from_slice(magnitude);
        }
        tlv(TAG_INTEGER, false, contents)
    }
}

impl From<&RsaPrivateKey> for Der {
    fn from(key: &RsaPrivateKey) -> Der {
        let version = Integer(vec![0]);
        tlv(
            TAG_SEQUENCE,
            true,
            [
                version.to_der(),
                key.modulus.to_der(),
                key.public_exponent.to_der(),
                key.private_exponent.to_der(),
                key.prime1.to_der(),
                key.prime2.to_der(),
                key.exponent1.to_der(),
                key.exponent2.to_der(),
                key.coefficient.to_der(),
            ]
            .concat(),
        )
    }
}

impl From<&RsaPublicKey> for Der {
    fn from(key: &RsaPublicKey) -> Der {
        tlv(
            TAG_SEQUENCE,
            true,
            [key.modulus.to_der(), key.public_exponent.to_der()].concat(),
        )
    }
}

fn integer_bytes(int: &BigInt) -> Result<Vec<u8>, Error> {
    let (sign, magnitude) = int.to_bytes_be();
    if sign == Sign::Minus {
        return Err(Error::key_format("negative integer in RSA key"));
    }
    Ok(strip_leading_zeros(&magnitude).to_vec())
}

fn sequence_blocks(block: &ASN1Block) -> Option<&[ASN1Block]> {
    match block {
        ASN1Block::Sequence(_, blocks) => Some(blocks),
        _ => None,
    }
}

/// Parse a DER RSAPublicKey. Accepts both the bare PKCS#1 structure
/// (`SEQUENCE { n, e }`) and a SubjectPublicKeyInfo wrapping one.
pub fn parse_rsa_public_key(der: &[u8]) -> Result<RsaPublicKey, Error> {
    let blocks = simple_asn1::from_der(der)
        .map_err(|err| Error::key_format("invalid DER in RSA public key").with("cause", err))?;
    let outer = blocks
        .first()
        .and_then(sequence_blocks)
        .ok_or_else(|| Error::key_format("RSA public key is not a DER sequence"))?;
    match outer {
        [ASN1Block::Integer(_, n), ASN1Block::Integer(_, e)] => Ok(RsaPublicKey {
            modulus: Integer(integer_bytes(n)?),
            public_exponent: Integer(integer_bytes(e)?),
        }),
        [ASN1Block::Sequence(..), ASN1Block::BitString(_, _, bits)] => {
            // SubjectPublicKeyInfo: recurse into the wrapped bit string.
            parse_rsa_public_key(bits)
        }
        _ => Err(Error::key_format("unrecognized RSA public key structure")
            .with("elements", outer.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_zero() {
        // INTEGER 0: tag, length 1, content 0x00
        assert_eq!(Integer(vec![0]).to_der(), vec![0x02, 0x01, 0x00]);
    }

    #[test]
    fn integer_small() {
        assert_eq!(Integer(vec![5]).to_der(), vec![0x02, 0x01, 0x05]);
    }

    #[test]
    fn integer_high_bit_gets_padding() {
        // 0x80 would read as negative without the leading zero octet.
        assert_eq!(Integer(vec![0x80]).to_der(), vec![0x02, 0x02, 0x00, 0x80]);
    }

    #[test]
    fn long_form_length() {
        let contents = vec![0u8; 200];
        let der = tlv(TAG_SEQUENCE, true, contents);
        assert_eq!(&der[..3], &[0x30, 0x81, 200]);
    }

    #[test]
    fn public_key_round_trip() {
        let key = RsaPublicKey {
            modulus: Integer(vec![0xc3, 0x41, 0x99, 0x01]),
            public_exponent: Integer(vec![0x01, 0x00, 0x01]),
        };
        let der = Der::from(&key);
        assert_eq!(parse_rsa_public_key(&der).unwrap(), key);
    }
}
