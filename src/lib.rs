//! OpenBadges 3.0 verifiable-credential engine.
//!
//! This library covers the protocol-level core of badge issuance for the
//! conference platform: building OpenBadges 3.0 credentials, signing them
//! with either of two independent schemes, verifying and structurally
//! validating them, and baking signed credentials into SVG images.
//!
//! - [`credential`] assembles an unsigned credential from configuration and
//!   validates every input; [`schema`] checks structural OB 3.0 compliance.
//! - [`jwt`] secures a credential as an RS256 VC-JWT whose payload *is* the
//!   credential (no `vc` wrapper), with a dereferenceable `kid` and inline
//!   public JWK in the header.
//! - [`ldp`] attaches an Ed25519 `DataIntegrityProof`
//!   (`eddsa-rdfc-2022`) over a canonicalized form of the credential;
//!   canonicalization ([`jsonld`] + [`urdna2015`]) runs entirely against
//!   the pinned context documents in `openbadges-contexts` — never the
//!   network.
//! - [`baking`] embeds either signed artifact into an SVG and extracts it
//!   back out; [`verification`] is the non-throwing report surface over
//!   both verifiers.
//! - [`keys`] and [`jwk`] handle key material and guarantee that private
//!   parameters never appear in anything the engine publishes.
//!
//! Everything is synchronous and CPU-bound; the only shared state is the
//! explicitly injected [`keys::KeyIdCache`].

pub mod baking;
pub mod credential;
pub mod der;
pub mod encoding;
pub mod error;
pub mod jsonld;
pub mod jwk;
pub mod jws;
pub mod jwt;
pub mod keys;
pub mod ldp;
pub mod one_or_many;
pub mod rdf;
pub mod schema;
pub mod urdna2015;
pub mod verification;

pub use baking::{bake, extract, is_baked_svg, BakedCredential};
pub use credential::{
    Achievement, AchievementSubject, Credential, CredentialConfig, Criteria, Profile, Proof,
};
pub use error::Error;
pub use jwk::{Algorithm, JWK};
pub use jwt::{sign_credential_jwt, verify_credential_jwt, JwtSignOptions};
pub use keys::{
    did_key_from_public_key, did_key_to_public_key, generate_key_id, generate_multikey_document,
    public_key_to_jwk, KeyIdCache, KeyType,
};
pub use ldp::{Canonicalizer, DataIntegrity, JcsCanonicalizer, Urdna2015Canonicalizer};
pub use one_or_many::OneOrMany;
pub use schema::{assert_valid, validate, ValidationReport};
pub use verification::{verify_stored, VerificationReport, VerifierKeys};
