//! Structural compliance checks for OpenBadges 3.0 credentials.
//!
//! `validate` is total: any JSON input produces a report, never a panic or
//! an error. The schema is open — unrecognized properties are allowed, and
//! JWT registered claims (`iss`, `jti`, `sub`, `nbf`, `exp`) may be present
//! at the top level of a decoded payload.

use serde::Serialize;
use serde_json::Value;

use crate::credential::{
    CONTEXT_CREDENTIALS_V2, CONTEXT_OB_V3, TYPE_PROFILE, TYPE_VERIFIABLE_CREDENTIAL,
};
use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<SchemaError>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<SchemaError>) -> Self {
        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Check one credential against the OB 3.0 structural constraints.
pub fn validate(credential: &Value) -> ValidationReport {
    let mut errors = Vec::new();

    let root = match credential.as_object() {
        Some(root) => root,
        None => {
            errors.push(SchemaError {
                path: "$".to_string(),
                message: "credential is not a JSON object".to_string(),
            });
            return ValidationReport::from_errors(errors);
        }
    };

    check_context(root.get("@context"), &mut errors);
    check_type_array(root.get("type"), "type", Some(TYPE_VERIFIABLE_CREDENTIAL), &mut errors);

    let subject = check_object(root.get("credentialSubject"), "credentialSubject", &mut errors);
    if let Some(subject) = subject {
        check_string(subject.get("id"), "credentialSubject.id", &mut errors);
        check_type_array(subject.get("type"), "credentialSubject.type", None, &mut errors);
        let achievement = check_object(
            subject.get("achievement"),
            "credentialSubject.achievement",
            &mut errors,
        );
        if let Some(achievement) = achievement {
            check_achievement(achievement, &mut errors);
        }
    }

    check_profile(root.get("issuer"), "issuer", &mut errors);

    ValidationReport::from_errors(errors)
}

/// Asserting variant: thin wrapper that raises `Error::Validation` carrying
/// the first few failing paths in context.
pub fn assert_valid(credential: &Value) -> Result<(), Error> {
    let report = validate(credential);
    if report.valid {
        return Ok(());
    }
    let mut err = Error::validation("credential does not conform to OpenBadges 3.0")
        .with("errors", report.errors.len());
    for (i, schema_error) in report.errors.iter().take(5).enumerate() {
        let keys: [&'static str; 5] = ["error_0", "error_1", "error_2", "error_3", "error_4"];
        err = err.with(keys[i], format!("{}: {}", schema_error.path, schema_error.message));
    }
    Err(err)
}

fn push(errors: &mut Vec<SchemaError>, path: &str, message: impl Into<String>) {
    errors.push(SchemaError {
        path: path.to_string(),
        message: message.into(),
    });
}

fn check_context(value: Option<&Value>, errors: &mut Vec<SchemaError>) {
    let entries = match value.and_then(Value::as_array) {
        Some(entries) => entries,
        None => {
            push(errors, "@context", "missing or not an array");
            return;
        }
    };
    for required in &[CONTEXT_CREDENTIALS_V2, CONTEXT_OB_V3] {
        if !entries.iter().any(|entry| entry.as_str() == Some(required)) {
            push(errors, "@context", format!("missing required context {}", required));
        }
    }
}

fn check_type_array(
    value: Option<&Value>,
    path: &str,
    required: Option<&str>,
    errors: &mut Vec<SchemaError>,
) {
    let entries = match value.and_then(Value::as_array) {
        Some(entries) => entries,
        None => {
            push(errors, path, "missing or not an array");
            return;
        }
    };
    if entries.is_empty() {
        push(errors, path, "type array is empty");
        return;
    }
    if let Some(required) = required {
        if !entries.iter().any(|entry| entry.as_str() == Some(required)) {
            push(errors, path, format!("missing required type {}", required));
        }
    }
}

fn check_object<'a>(
    value: Option<&'a Value>,
    path: &str,
    errors: &mut Vec<SchemaError>,
) -> Option<&'a serde_json::Map<String, Value>> {
    match value.and_then(Value::as_object) {
        Some(object) => Some(object),
        None => {
            push(errors, path, "missing or not an object");
            None
        }
    }
}

fn check_string(value: Option<&Value>, path: &str, errors: &mut Vec<SchemaError>) {
    match value.and_then(Value::as_str) {
        Some(s) if !s.is_empty() => {}
        Some(_) => push(errors, path, "must not be empty"),
        None => push(errors, path, "missing or not a string"),
    }
}

fn check_profile(value: Option<&Value>, path: &str, errors: &mut Vec<SchemaError>) {
    let profile = match check_object(value, path, errors) {
        Some(profile) => profile,
        None => return,
    };
    check_string(profile.get("id"), &format!("{}.id", path), errors);
    check_type_array(
        profile.get("type"),
        &format!("{}.type", path),
        Some(TYPE_PROFILE),
        errors,
    );
    check_string(profile.get("name"), &format!("{}.name", path), errors);
}

fn check_achievement(
    achievement: &serde_json::Map<String, Value>,
    errors: &mut Vec<SchemaError>,
) {
    let path = "credentialSubject.achievement";
    check_string(achievement.get("id"), &format!("{}.id", path), errors);
    check_type_array(achievement.get("type"), &format!("{}.type", path), None, errors);
    check_string(achievement.get("name"), &format!("{}.name", path), errors);
    check_string(
        achievement.get("description"),
        &format!("{}.description", path),
        errors,
    );
    // criteria content (narrative and/or id) is free-form; presence is enough
    let _ = check_object(achievement.get("criteria"), &format!("{}.criteria", path), errors);
    check_profile(achievement.get("creator"), &format!("{}.creator", path), errors);
}
