//! Deterministic JSON-LD to RDF translation over a pinned context set.
//!
//! Context documents are resolved exclusively from the vendored set in
//! `openbadges-contexts` — canonicalization must never fetch anything, or
//! signature verification would depend on the network. Scoped (nested)
//! contexts are flattened into one term table per document; terms that no
//! loaded context defines fall back to the credentials/v2 `@vocab`
//! namespace so extension properties remain under the signature, and a term
//! resolvable in no way at all is dropped exactly as a JSON-LD processor
//! would drop it.

use std::collections::HashMap;

use log::warn;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::rdf::{
    BlankLabel, DataSet, IriRef, Literal, Object, Predicate, Statement, Subject, RDF_TYPE,
    XSD_BOOLEAN, XSD_DOUBLE, XSD_INTEGER, XSD_STRING,
};

/// URL -> vendored document body.
static PINNED_CONTEXTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(
        "https://www.w3.org/ns/credentials/v2",
        openbadges_contexts::CREDENTIALS_V2,
    );
    map.insert(
        "https://purl.imsglobal.org/spec/ob/v3p0/context-3.0.3.json",
        openbadges_contexts::OB_V3,
    );
    map.insert(
        "https://purl.imsglobal.org/spec/ob/v3p0/context.json",
        openbadges_contexts::OB_V3,
    );
    map.insert(
        "https://w3id.org/security/multikey/v1",
        openbadges_contexts::MULTIKEY_V1,
    );
    map
});

#[derive(Debug, Clone)]
struct TermDef {
    /// Possibly compact; expanded lazily against the full table.
    iri: String,
    type_coercion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Coercion {
    Id,
    Vocab,
    Datatype(String),
}

/// Merged term table for one document's `@context`.
#[derive(Debug, Clone, Default)]
pub struct ContextSet {
    terms: HashMap<String, TermDef>,
    vocab: Option<String>,
}

impl ContextSet {
    /// Build the term table for a document from its `@context` entry.
    /// Entries may be pinned URLs or inline definition objects.
    pub fn for_document(document: &Value) -> ContextSet {
        let mut set = ContextSet::default();
        match document.get("@context") {
            Some(Value::String(url)) => set.load_url(url),
            Some(Value::Array(entries)) => {
                for entry in entries {
                    match entry {
                        Value::String(url) => set.load_url(url),
                        Value::Object(definitions) => set.load_definitions(definitions),
                        _ => warn!("ignoring non-string, non-object @context entry"),
                    }
                }
            }
            Some(Value::Object(definitions)) => set.load_definitions(definitions),
            _ => warn!("document has no usable @context; only @vocab-free terms will resolve"),
        }
        set
    }

    fn load_url(&mut self, url: &str) {
        let body = match PINNED_CONTEXTS.get(url) {
            Some(body) => *body,
            None => {
                warn!("context {} is not pinned; its terms fall back to @vocab", url);
                return;
            }
        };
        let document: Value = match serde_json::from_str(body) {
            Ok(document) => document,
            Err(err) => {
                // vendored documents are checked by tests; this is unreachable
                warn!("pinned context {} failed to parse: {}", url, err);
                return;
            }
        };
        if let Some(definitions) = document.get("@context").and_then(Value::as_object) {
            self.load_definitions(definitions);
        }
    }

    fn load_definitions(&mut self, definitions: &Map<String, Value>) {
        for (term, definition) in definitions {
            match (term.as_str(), definition) {
                ("@protected", _) => {}
                ("@vocab", Value::String(vocab)) => self.vocab = Some(vocab.clone()),
                (_, Value::String(mapped)) => {
                    if mapped.starts_with('@') {
                        // keyword alias ("id": "@id"); handled structurally
                        continue;
                    }
                    self.terms.insert(
                        term.to_string(),
                        TermDef {
                            iri: mapped.clone(),
                            type_coercion: None,
                        },
                    );
                }
                (_, Value::Object(definition)) => {
                    let iri = match definition.get("@id").and_then(Value::as_str) {
                        Some(iri) => iri.to_string(),
                        None => continue,
                    };
                    let type_coercion = definition
                        .get("@type")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    // nested scoped contexts are flattened: load their term
                    // definitions into the same table
                    if let Some(scoped) = definition.get("@context").and_then(Value::as_object) {
                        self.load_definitions(scoped);
                    }
                    self.terms.insert(term.to_string(), TermDef { iri, type_coercion });
                }
                _ => {}
            }
        }
    }

    /// Expand a term, compact IRI, or absolute IRI. `None` means the value
    /// is not expandable (an unknown bare term).
    fn expand_iri(&self, value: &str) -> Option<String> {
        if let Some(def) = self.terms.get(value) {
            return self.expand_definition_iri(&def.iri);
        }
        if value.starts_with('@') {
            return None;
        }
        if let Some(colon) = value.find(':') {
            let (prefix, rest) = value.split_at(colon);
            let suffix = &rest[1..];
            if !suffix.starts_with("//") {
                if let Some(def) = self.terms.get(prefix) {
                    return self
                        .expand_definition_iri(&def.iri)
                        .map(|base| format!("{}{}", base, suffix));
                }
            }
            // absolute IRI with a scheme (https:, did:, mailto:, urn:)
            return Some(value.to_string());
        }
        None
    }

    fn expand_definition_iri(&self, iri: &str) -> Option<String> {
        if let Some(colon) = iri.find(':') {
            let (prefix, rest) = iri.split_at(colon);
            let suffix = &rest[1..];
            if !suffix.starts_with("//") {
                if let Some(def) = self.terms.get(prefix) {
                    if def.iri != iri {
                        return self
                            .expand_definition_iri(&def.iri)
                            .map(|base| format!("{}{}", base, suffix));
                    }
                }
            }
            return Some(iri.to_string());
        }
        None
    }

    /// Resolve a node property to a predicate IRI plus value coercion.
    fn resolve_property(&self, key: &str) -> Option<(String, Option<Coercion>)> {
        if let Some(def) = self.terms.get(key) {
            let iri = self.expand_definition_iri(&def.iri)?;
            let coercion = def.type_coercion.as_deref().and_then(|t| match t {
                "@id" => Some(Coercion::Id),
                "@vocab" => Some(Coercion::Vocab),
                other => self.expand_iri(other).map(Coercion::Datatype),
            });
            return Some((iri, coercion));
        }
        if key.contains(':') {
            return self.expand_iri(key).map(|iri| (iri, None));
        }
        if let Some(vocab) = &self.vocab {
            return Some((format!("{}{}", vocab, key), None));
        }
        warn!("dropping term {} defined by no loaded context", key);
        None
    }

    /// Expand a `type` entry or other vocab-coerced value.
    fn expand_type(&self, value: &str) -> Option<String> {
        if let Some(iri) = self.expand_iri(value) {
            return Some(iri);
        }
        if let Some(vocab) = &self.vocab {
            return Some(format!("{}{}", vocab, value));
        }
        warn!("dropping type {} defined by no loaded context", value);
        None
    }
}

/// Translate one JSON-LD document into an RDF dataset using the given
/// context set. Blank labels follow traversal order; serde_json maps
/// iterate key-sorted, so the result depends only on document content.
pub fn to_dataset(document: &Value, contexts: &ContextSet) -> Result<DataSet, Error> {
    let root = document
        .as_object()
        .ok_or_else(|| Error::encoding("JSON-LD document must be an object"))?;
    let mut translator = Translator {
        contexts,
        dataset: DataSet::new(),
        blank_counter: 0,
    };
    translator.translate_node(root)?;
    Ok(translator.dataset)
}

struct Translator<'a> {
    contexts: &'a ContextSet,
    dataset: DataSet,
    blank_counter: u64,
}

impl<'a> Translator<'a> {
    fn fresh_blank(&mut self) -> Subject {
        let label = format!("_:b{}", self.blank_counter);
        self.blank_counter += 1;
        Subject::Blank(BlankLabel(label))
    }

    fn translate_node(&mut self, node: &Map<String, Value>) -> Result<Subject, Error> {
        let subject = match node
            .get("id")
            .or_else(|| node.get("@id"))
            .and_then(Value::as_str)
        {
            Some(id) if !id.is_empty() => Subject::Iri(IriRef(id.to_string())),
            _ => self.fresh_blank(),
        };

        for type_value in node
            .get("type")
            .or_else(|| node.get("@type"))
            .map(collect_strings)
            .unwrap_or_default()
        {
            if let Some(iri) = self.contexts.expand_type(&type_value) {
                self.emit(&subject, RDF_TYPE.to_string(), Object::Iri(IriRef(iri)));
            }
        }

        for (key, value) in node {
            if matches!(key.as_str(), "@context" | "id" | "@id" | "type" | "@type") {
                continue;
            }
            let (predicate, coercion) = match self.contexts.resolve_property(key) {
                Some(resolved) => resolved,
                None => continue,
            };
            self.translate_values(&subject, &predicate, coercion.as_ref(), value)?;
        }

        Ok(subject)
    }

    fn translate_values(
        &mut self,
        subject: &Subject,
        predicate: &str,
        coercion: Option<&Coercion>,
        value: &Value,
    ) -> Result<(), Error> {
        match value {
            Value::Array(values) => {
                for value in values {
                    self.translate_values(subject, predicate, coercion, value)?;
                }
            }
            Value::Null => {}
            Value::Object(object) => {
                if object.contains_key("@value") {
                    if let Some(literal) = value_object_literal(self.contexts, object) {
                        self.emit(subject, predicate.to_string(), Object::Literal(literal));
                    }
                } else {
                    let child = self.translate_node(object)?;
                    let object = match child {
                        Subject::Iri(iri) => Object::Iri(iri),
                        Subject::Blank(blank) => Object::Blank(blank),
                    };
                    self.emit(subject, predicate.to_string(), object);
                }
            }
            Value::String(s) => {
                let object = match coercion {
                    Some(Coercion::Id) => Object::Iri(IriRef(s.clone())),
                    Some(Coercion::Vocab) => match self.contexts.expand_type(s) {
                        Some(iri) => Object::Iri(IriRef(iri)),
                        None => Object::Literal(Literal::Simple(s.clone())),
                    },
                    Some(Coercion::Datatype(datatype)) if datatype != XSD_STRING => {
                        Object::Literal(Literal::Typed {
                            value: s.clone(),
                            datatype: IriRef(datatype.clone()),
                        })
                    }
                    _ => Object::Literal(Literal::Simple(s.clone())),
                };
                self.emit(subject, predicate.to_string(), object);
            }
            Value::Bool(b) => {
                self.emit(
                    subject,
                    predicate.to_string(),
                    Object::Literal(Literal::Typed {
                        value: b.to_string(),
                        datatype: IriRef(XSD_BOOLEAN.to_string()),
                    }),
                );
            }
            Value::Number(n) => {
                let literal = match coercion {
                    Some(Coercion::Datatype(datatype)) if datatype != XSD_STRING => {
                        Literal::Typed {
                            value: n.to_string(),
                            datatype: IriRef(datatype.clone()),
                        }
                    }
                    _ if n.is_i64() || n.is_u64() => Literal::Typed {
                        value: n.to_string(),
                        datatype: IriRef(XSD_INTEGER.to_string()),
                    },
                    _ => Literal::Typed {
                        value: format!("{:E}", n.as_f64().unwrap_or_default()),
                        datatype: IriRef(XSD_DOUBLE.to_string()),
                    },
                };
                self.emit(subject, predicate.to_string(), Object::Literal(literal));
            }
        }
        Ok(())
    }

    fn emit(&mut self, subject: &Subject, predicate: String, object: Object) {
        self.dataset.add(Statement {
            subject: subject.clone(),
            predicate: Predicate(IriRef(predicate)),
            object,
            graph_label: None,
        });
    }
}

fn collect_strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn value_object_literal(contexts: &ContextSet, object: &Map<String, Value>) -> Option<Literal> {
    let value = object.get("@value")?;
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if let Some(lang) = object.get("@language").and_then(Value::as_str) {
        return Some(Literal::LangTagged {
            value: text,
            lang: lang.to_string(),
        });
    }
    if let Some(datatype) = object.get("@type").and_then(Value::as_str) {
        if let Some(datatype) = contexts.expand_iri(datatype) {
            return Some(Literal::Typed {
                value: text,
                datatype: IriRef(datatype),
            });
        }
    }
    Some(Literal::Simple(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{CONTEXT_CREDENTIALS_V2, CONTEXT_OB_V3};
    use serde_json::json;

    fn contexts_for(document: &Value) -> ContextSet {
        ContextSet::for_document(document)
    }

    #[test]
    fn expands_vc_terms() {
        let document = json!({"@context": [CONTEXT_CREDENTIALS_V2, CONTEXT_OB_V3]});
        let contexts = contexts_for(&document);
        let (iri, coercion) = contexts.resolve_property("issuer").unwrap();
        assert_eq!(iri, "https://www.w3.org/2018/credentials#issuer");
        assert_eq!(coercion, Some(Coercion::Id));
        let (iri, coercion) = contexts.resolve_property("validFrom").unwrap();
        assert_eq!(iri, "https://www.w3.org/2018/credentials#validFrom");
        assert_eq!(
            coercion,
            Some(Coercion::Datatype(
                "http://www.w3.org/2001/XMLSchema#dateTime".to_string()
            ))
        );
    }

    #[test]
    fn expands_ob_types() {
        let document = json!({"@context": [CONTEXT_CREDENTIALS_V2, CONTEXT_OB_V3]});
        let contexts = contexts_for(&document);
        assert_eq!(
            contexts.expand_type("OpenBadgeCredential").unwrap(),
            "https://purl.imsglobal.org/spec/vc/ob/vocab.html#OpenBadgeCredential"
        );
    }

    #[test]
    fn unknown_terms_fall_back_to_vocab() {
        let document = json!({"@context": [CONTEXT_CREDENTIALS_V2]});
        let contexts = contexts_for(&document);
        let (iri, _) = contexts.resolve_property("favouriteColour").unwrap();
        assert_eq!(
            iri,
            "https://www.w3.org/ns/credentials/issuer-dependent#favouriteColour"
        );
    }

    #[test]
    fn translation_is_insensitive_to_key_order() {
        let a: Value = serde_json::from_str(
            r#"{"@context": ["https://www.w3.org/ns/credentials/v2"], "id": "urn:ex:1", "name": "A", "description": "B"}"#,
        )
        .unwrap();
        let b: Value = serde_json::from_str(
            r#"{"description": "B", "name": "A", "id": "urn:ex:1", "@context": ["https://www.w3.org/ns/credentials/v2"]}"#,
        )
        .unwrap();
        let contexts = contexts_for(&a);
        let quads_a = to_dataset(&a, &contexts).unwrap().to_nquads();
        let quads_b = to_dataset(&b, &contexts).unwrap().to_nquads();
        assert_eq!(quads_a, quads_b);
        assert!(quads_a.contains("<https://schema.org/name> \"A\""));
    }

    #[test]
    fn nested_nodes_become_linked_subjects() {
        let document = json!({
            "@context": [CONTEXT_CREDENTIALS_V2, CONTEXT_OB_V3],
            "id": "urn:ex:credential",
            "type": ["VerifiableCredential"],
            "issuer": {
                "id": "https://conference.example/about",
                "type": ["Profile"],
                "name": "Example Conference"
            }
        });
        let contexts = contexts_for(&document);
        let nquads = to_dataset(&document, &contexts).unwrap().to_nquads();
        assert!(nquads.contains(
            "<urn:ex:credential> <https://www.w3.org/2018/credentials#issuer> <https://conference.example/about>"
        ));
        assert!(nquads.contains(
            "<https://conference.example/about> <https://schema.org/name> \"Example Conference\""
        ));
    }

    #[test]
    fn datetime_terms_are_typed() {
        let document = json!({
            "@context": [CONTEXT_CREDENTIALS_V2],
            "id": "urn:ex:1",
            "validFrom": "2026-05-01T09:00:00Z"
        });
        let contexts = contexts_for(&document);
        let nquads = to_dataset(&document, &contexts).unwrap().to_nquads();
        assert!(nquads.contains(
            "\"2026-05-01T09:00:00Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime>"
        ));
    }

    #[test]
    fn pinned_documents_parse() {
        for (url, body) in PINNED_CONTEXTS.iter() {
            let parsed: Value = serde_json::from_str(*body)
                .unwrap_or_else(|err| panic!("pinned context {} is invalid: {}", url, err));
            assert!(parsed.get("@context").is_some(), "{} has no @context", url);
        }
    }
}
