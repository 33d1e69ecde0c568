//! OpenBadges 3.0 credential data model and the issuance-side builder.
//!
//! The model is deliberately open-world: every entity carries a flattened
//! `property_set` so extension properties from conforming issuers survive
//! deserialize/serialize round trips untouched.

use std::collections::HashMap as Map;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::one_or_many::OneOrMany;

/// W3C Verifiable Credentials Data Model v2 context.
pub const CONTEXT_CREDENTIALS_V2: &str = "https://www.w3.org/ns/credentials/v2";
/// OpenBadges 3.0.3 context.
pub const CONTEXT_OB_V3: &str =
    "https://purl.imsglobal.org/spec/ob/v3p0/context-3.0.3.json";

pub const TYPE_VERIFIABLE_CREDENTIAL: &str = "VerifiableCredential";
pub const TYPE_OPEN_BADGE_CREDENTIAL: &str = "OpenBadgeCredential";
pub const TYPE_ACHIEVEMENT_SUBJECT: &str = "AchievementSubject";
pub const TYPE_ACHIEVEMENT: &str = "Achievement";
pub const TYPE_PROFILE: &str = "Profile";

/// One entry of a credential `@context`: a URI or an inline definition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Context {
    Uri(String),
    Object(Map<String, Value>),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(rename = "@context")]
    pub context: Vec<Context>,
    pub id: String,
    #[serde(rename = "type")]
    pub type_: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    pub issuer: Profile,
    /// RFC 3339 timestamp; kept textual so the signed byte form never
    /// shifts under re-serialization.
    pub valid_from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
    pub credential_subject: AchievementSubject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<Evidence>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_schema: Option<OneOrMany<CredentialSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_service: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endorsement: Option<Vec<Value>>,
    /// Absent while unsigned; a non-empty array once signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<Vec<Proof>>,
    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_set: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_identifier: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_org: Option<Box<Profile>>,
    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_set: Option<Map<String, Value>>,
}

impl Profile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Profile {
            id: id.into(),
            type_: vec![TYPE_PROFILE.to_string()],
            name: Some(name.into()),
            url: None,
            email: None,
            phone: None,
            description: None,
            image: None,
            address: None,
            other_identifier: None,
            parent_org: None,
            property_set: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AchievementSubject {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement: Option<Achievement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_set: Option<Map<String, Value>>,
}

impl AchievementSubject {
    pub fn new(id: impl Into<String>) -> Self {
        AchievementSubject {
            id: id.into(),
            type_: vec![TYPE_ACHIEVEMENT_SUBJECT.to_string()],
            achievement: None,
            identifier: None,
            result: None,
            narrative: None,
            property_set: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: Vec<String>,
    pub name: String,
    pub description: String,
    pub criteria: Criteria,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<Box<Profile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_set: Option<Map<String, Value>>,
}

impl Achievement {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        criteria: Criteria,
    ) -> Self {
        Achievement {
            id: id.into(),
            type_: vec![TYPE_ACHIEVEMENT.to_string()],
            name: name.into(),
            description: description.into(),
            criteria,
            creator: None,
            image: None,
            achievement_type: None,
            tag: None,
            alignment: None,
            human_code: None,
            field_of_study: None,
            specialization: None,
            property_set: None,
        }
    }
}

/// How the achievement is earned: a narrative, a dereferenceable id, or both.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_set: Option<Map<String, Value>>,
}

impl Criteria {
    pub fn narrative(text: impl Into<String>) -> Self {
        Criteria {
            narrative: Some(text.into()),
            ..Criteria::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_set: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSchema {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
}

/// Embedded Data-Integrity proof. Never carries its own `@context`; only
/// the root credential does.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cryptosuite: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,
    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_set: Option<Map<String, Value>>,
}

impl Credential {
    /// Signed means at least one embedded proof. JWT-secured credentials
    /// carry their protection outside the document and stay `false` here.
    pub fn is_signed(&self) -> bool {
        self.proof.as_ref().map_or(false, |proofs| !proofs.is_empty())
    }

    pub fn to_json(&self) -> Result<Value, Error> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Issuance-side configuration for one credential.
///
/// `build` validates and assembles; it never fills a missing required field
/// with a default.
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    pub credential_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub issuer: Profile,
    pub subject: AchievementSubject,
    pub achievement: Achievement,
    pub valid_from: String,
    pub valid_until: Option<String>,
    pub image: Option<Image>,
    pub evidence: Option<Vec<Evidence>>,
}

impl CredentialConfig {
    pub fn build(self) -> Result<Credential, Error> {
        let CredentialConfig {
            credential_id,
            name,
            description,
            issuer,
            mut subject,
            mut achievement,
            valid_from,
            valid_until,
            image,
            evidence,
        } = self;

        ensure_absolute_iri("credentialId", &credential_id)?;
        ensure_absolute_iri("issuer.id", &issuer.id)?;
        if issuer.type_.is_empty() {
            return Err(Error::configuration("issuer type array is empty").with("field", "issuer.type"));
        }
        if issuer.name.as_deref().map_or(true, str::is_empty) {
            return Err(Error::configuration("issuer name is required").with("field", "issuer.name"));
        }
        if achievement.name.is_empty() {
            return Err(Error::configuration("achievement name is required")
                .with("field", "achievement.name"));
        }
        if achievement.description.is_empty() {
            return Err(Error::configuration("achievement description is required")
                .with("field", "achievement.description"));
        }
        if achievement.criteria.id.is_none() && achievement.criteria.narrative.is_none() {
            return Err(Error::configuration("achievement criteria needs an id or a narrative")
                .with("field", "achievement.criteria"));
        }
        if subject.id.is_empty() {
            return Err(Error::configuration("subject id is required").with("field", "subject.id"));
        }
        if subject.type_.is_empty() {
            return Err(Error::configuration("subject type array is empty")
                .with("field", "subject.type"));
        }
        let from = parse_timestamp("validFrom", &valid_from)?;
        if let Some(until) = &valid_until {
            let until = parse_timestamp("validUntil", until)?;
            if until <= from {
                return Err(Error::configuration("validUntil precedes validFrom")
                    .with("validFrom", &valid_from)
                    .with("validUntil", until));
            }
        }

        // The issuing organisation authored the achievement unless the
        // caller says otherwise.
        if achievement.creator.is_none() {
            achievement.creator = Some(Box::new(issuer.clone()));
        }
        subject.achievement = Some(achievement);

        Ok(Credential {
            context: vec![
                Context::Uri(CONTEXT_CREDENTIALS_V2.to_string()),
                Context::Uri(CONTEXT_OB_V3.to_string()),
            ],
            id: credential_id,
            type_: vec![
                TYPE_VERIFIABLE_CREDENTIAL.to_string(),
                TYPE_OPEN_BADGE_CREDENTIAL.to_string(),
            ],
            name,
            description,
            image,
            issuer,
            valid_from,
            valid_until,
            credential_subject: subject,
            evidence,
            credential_schema: None,
            credential_status: None,
            refresh_service: None,
            endorsement: None,
            proof: None,
            property_set: None,
        })
    }
}

pub(crate) fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<FixedOffset>, Error> {
    DateTime::parse_from_rfc3339(value).map_err(|err| {
        Error::configuration("invalid RFC 3339 timestamp")
            .with("field", field)
            .with("found", value)
            .with("cause", err)
    })
}

pub(crate) fn ensure_absolute_iri(field: &'static str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::configuration("empty identifier").with("field", field));
    }
    iref::Iri::new(value).map_err(|_| {
        Error::configuration("not an absolute IRI")
            .with("field", field)
            .with("found", value)
    })?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_config() -> CredentialConfig {
        CredentialConfig {
            credential_id: "https://conference.example/api/badge/42".to_string(),
            name: Some("Speaker 2026".to_string()),
            description: None,
            issuer: Profile::new("https://conference.example/about", "Example Conference"),
            subject: AchievementSubject::new("mailto:speaker@example.org"),
            achievement: Achievement::new(
                "https://conference.example/achievements/speaker",
                "Conference Speaker",
                "Delivered a session at the conference.",
                Criteria::narrative("Hold a session accepted by the programme committee."),
            ),
            valid_from: "2026-05-01T09:00:00Z".to_string(),
            valid_until: None,
            image: None,
            evidence: None,
        }
    }

    #[test]
    fn build_produces_fixed_contexts_and_types() {
        let credential = test_config().build().unwrap();
        assert_eq!(
            credential.context[0],
            Context::Uri(CONTEXT_CREDENTIALS_V2.to_string())
        );
        assert_eq!(credential.context[1], Context::Uri(CONTEXT_OB_V3.to_string()));
        assert!(credential.type_.contains(&TYPE_VERIFIABLE_CREDENTIAL.to_string()));
        assert!(credential.type_.contains(&TYPE_OPEN_BADGE_CREDENTIAL.to_string()));
        assert!(!credential.is_signed());
        // no vc wrapper, ever
        let json = credential.to_json().unwrap();
        assert!(json.get("vc").is_none());
    }

    #[test]
    fn build_defaults_creator_to_issuer() {
        let credential = test_config().build().unwrap();
        let achievement = credential.credential_subject.achievement.unwrap();
        assert_eq!(achievement.creator.unwrap().id, "https://conference.example/about");
    }

    #[test]
    fn build_rejects_bad_issuer_url() {
        let mut config = test_config();
        config.issuer.id = "not a url".to_string();
        let err = config.build().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(err.context().get("field").map(String::as_str), Some("issuer.id"));
    }

    #[test]
    fn build_rejects_empty_achievement_name() {
        let mut config = test_config();
        config.achievement.name = String::new();
        assert!(matches!(config.build(), Err(Error::Configuration(_))));
    }

    #[test]
    fn build_rejects_unparseable_timestamps() {
        let mut config = test_config();
        config.valid_from = "yesterday".to_string();
        let err = config.build().unwrap_err();
        assert_eq!(err.context().get("field").map(String::as_str), Some("validFrom"));
    }

    #[test]
    fn build_rejects_inverted_validity_window() {
        let mut config = test_config();
        config.valid_until = Some("2020-01-01T00:00:00Z".to_string());
        assert!(matches!(config.build(), Err(Error::Configuration(_))));
    }

    #[test]
    fn build_rejects_empty_subject_type() {
        let mut config = test_config();
        config.subject.type_.clear();
        let err = config.build().unwrap_err();
        assert_eq!(err.context().get("field").map(String::as_str), Some("subject.type"));
    }

    #[test]
    fn extension_properties_survive_round_trip() {
        let json = serde_json::json!({
            "@context": [CONTEXT_CREDENTIALS_V2, CONTEXT_OB_V3],
            "id": "urn:uuid:4cc4ef6f-4e2f-4b74-9be1-ba6ab03057b1",
            "type": ["VerifiableCredential", "OpenBadgeCredential"],
            "issuer": {
                "id": "https://conference.example/about",
                "type": ["Profile"],
                "name": "Example Conference"
            },
            "validFrom": "2026-05-01T09:00:00Z",
            "credentialSubject": {
                "id": "did:example:abc",
                "type": ["AchievementSubject"]
            },
            "ext:customExtension": {"claims": 3}
        });
        let credential: Credential = serde_json::from_value(json.clone()).unwrap();
        let out = credential.to_json().unwrap();
        assert_eq!(out["ext:customExtension"], json["ext:customExtension"]);
    }
}
