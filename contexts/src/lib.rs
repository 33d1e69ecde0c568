//! Pinned JSON-LD context documents.
//!
//! Canonicalization must be deterministic and offline: these documents are
//! vendored at build time and looked up by URL, never fetched. The OB 3.0.3
//! document is a flattened working subset of the published context covering
//! every term the engine's data model emits.

/// <https://www.w3.org/ns/credentials/v2>
pub const CREDENTIALS_V2: &str = include_str!("../w3c-credentials-v2.jsonld");
/// <https://purl.imsglobal.org/spec/ob/v3p0/context-3.0.3.json>
pub const OB_V3: &str = include_str!("../imsglobal-ob-v3p0-3.0.3.jsonld");
/// <https://w3id.org/security/multikey/v1>
pub const MULTIKEY_V1: &str = include_str!("../w3id-multikey-v1.jsonld");
