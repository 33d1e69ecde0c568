use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Structured context attached to an error: field names, offending values,
/// expected/found pairs. Ordered so log output is stable.
pub type ErrorContext = BTreeMap<&'static str, String>;

/// Message plus context for one error kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detail {
    pub message: String,
    pub context: ErrorContext,
}

impl Detail {
    fn new(message: impl Into<String>) -> Self {
        Detail {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.context.is_empty() {
            let pairs = self
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<String>>()
                .join(", ");
            write!(f, " ({})", pairs)?;
        }
        Ok(())
    }
}

/// Closed set of error kinds shared by every component of the engine.
///
/// Callers branch on the kind: configuration and format errors are caller
/// mistakes and never retried; `Verification` is raised by the JWT verifier
/// on tamper, while the Data-Integrity verifier reports a failed check as
/// `Ok(false)` and reserves `Verification` for structurally unverifiable
/// input (no proof at all).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(Detail),
    #[error("encoding error: {0}")]
    Encoding(Detail),
    #[error("key format error: {0}")]
    KeyFormat(Detail),
    #[error("signing error: {0}")]
    Signing(Detail),
    #[error("verification error: {0}")]
    Verification(Detail),
    #[error("validation error: {0}")]
    Validation(Detail),
    #[error("baking error: {0}")]
    Baking(Detail),
    #[error("extraction error: {0}")]
    Extraction(Detail),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(Detail::new(message))
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Error::Encoding(Detail::new(message))
    }

    pub fn key_format(message: impl Into<String>) -> Self {
        Error::KeyFormat(Detail::new(message))
    }

    pub fn signing(message: impl Into<String>) -> Self {
        Error::Signing(Detail::new(message))
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Error::Verification(Detail::new(message))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(Detail::new(message))
    }

    pub fn baking(message: impl Into<String>) -> Self {
        Error::Baking(Detail::new(message))
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Error::Extraction(Detail::new(message))
    }

    /// Attach one context entry, builder-style.
    pub fn with(mut self, key: &'static str, value: impl ToString) -> Self {
        self.detail_mut().context.insert(key, value.to_string());
        self
    }

    /// Stable machine-readable code for the kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration_error",
            Error::Encoding(_) => "encoding_error",
            Error::KeyFormat(_) => "key_format_error",
            Error::Signing(_) => "signing_error",
            Error::Verification(_) => "verification_error",
            Error::Validation(_) => "validation_error",
            Error::Baking(_) => "baking_error",
            Error::Extraction(_) => "extraction_error",
        }
    }

    pub fn context(&self) -> &ErrorContext {
        &self.detail().context
    }

    pub fn message(&self) -> &str {
        &self.detail().message
    }

    fn detail(&self) -> &Detail {
        match self {
            Error::Configuration(d)
            | Error::Encoding(d)
            | Error::KeyFormat(d)
            | Error::Signing(d)
            | Error::Verification(d)
            | Error::Validation(d)
            | Error::Baking(d)
            | Error::Extraction(d) => d,
        }
    }

    fn detail_mut(&mut self) -> &mut Detail {
        match self {
            Error::Configuration(d)
            | Error::Encoding(d)
            | Error::KeyFormat(d)
            | Error::Signing(d)
            | Error::Verification(d)
            | Error::Validation(d)
            | Error::Baking(d)
            | Error::Extraction(d) => d,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::encoding("invalid JSON").with("cause", err)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Error {
        Error::encoding("invalid base64url").with("cause", err)
    }
}

impl From<multibase::Error> for Error {
    fn from(err: multibase::Error) -> Error {
        Error::encoding("invalid multibase").with("cause", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_ordered_and_displayed() {
        let err = Error::configuration("issuer id must be an absolute URL")
            .with("field", "issuer.id")
            .with("found", "not-a-url");
        assert_eq!(err.code(), "configuration_error");
        assert_eq!(err.context().get("field").map(String::as_str), Some("issuer.id"));
        let display = err.to_string();
        assert!(display.contains("issuer id must be an absolute URL"));
        assert!(display.contains("field=issuer.id"));
    }

    #[test]
    fn kinds_are_distinguishable() {
        let verification = Error::verification("signature mismatch");
        assert!(matches!(verification, Error::Verification(_)));
        assert_ne!(verification.code(), Error::signing("x").code());
    }
}
