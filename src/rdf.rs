//! RDF dataset model with N-Quads serialization.
//!
//! Only what canonicalization needs: quads built from JSON-LD translation
//! (`jsonld`), relabeled by the canonicalizer (`urdna2015`), and serialized
//! as sorted N-Quads lines.
//!
//! See <https://www.w3.org/TR/n-quads/#terminals> for the escaping rules.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSet {
    statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub subject: Subject,
    pub predicate: Predicate,
    pub object: Object,
    pub graph_label: Option<GraphLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Iri(IriRef),
    Blank(BlankLabel),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate(pub IriRef);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Iri(IriRef),
    Blank(BlankLabel),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphLabel {
    Iri(IriRef),
    Blank(BlankLabel),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IriRef(pub String);

/// A blank node label including the `_:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlankLabel(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Simple(String),
    Typed { value: String, datatype: IriRef },
    LangTagged { value: String, lang: String },
}

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

impl fmt::Display for IriRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        for c in self.0.chars() {
            match c {
                '\x00'..='\x20' | '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => {
                    write!(f, "\\u{:04X}", u32::from(c))?;
                }
                _ => write!(f, "{}", c)?,
            }
        }
        f.write_str(">")
    }
}

impl fmt::Display for BlankLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // labels are only ever constructed internally, no escaping needed
        f.write_str(&self.0)
    }
}

fn write_escaped_string(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in value.chars() {
        match c {
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            _ => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Simple(value) => write_escaped_string(f, value),
            Literal::Typed { value, datatype } => {
                write_escaped_string(f, value)?;
                write!(f, "^^{}", datatype)
            }
            Literal::LangTagged { value, lang } => {
                write_escaped_string(f, value)?;
                write!(f, "@{}", lang)
            }
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Iri(iri) => iri.fmt(f),
            Subject::Blank(blank) => blank.fmt(f),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Iri(iri) => iri.fmt(f),
            Object::Blank(blank) => blank.fmt(f),
            Object::Literal(literal) => literal.fmt(f),
        }
    }
}

impl fmt::Display for GraphLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphLabel::Iri(iri) => iri.fmt(f),
            GraphLabel::Blank(blank) => blank.fmt(f),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(graph_label) = &self.graph_label {
            write!(f, " {}", graph_label)?;
        }
        f.write_str(" .\n")
    }
}

impl Statement {
    /// Blank node labels appearing in this quad.
    pub fn blank_components(&self) -> Vec<&BlankLabel> {
        self.blank_components_with_position()
            .into_iter()
            .map(|(label, _)| label)
            .collect()
    }

    /// Blank node labels with their position code: `s`ubject, `o`bject,
    /// `g`raph.
    pub fn blank_components_with_position(&self) -> Vec<(&BlankLabel, char)> {
        let mut components = Vec::new();
        if let Subject::Blank(label) = &self.subject {
            components.push((label, 's'));
        }
        if let Object::Blank(label) = &self.object {
            components.push((label, 'o'));
        }
        if let Some(GraphLabel::Blank(label)) = &self.graph_label {
            components.push((label, 'g'));
        }
        components
    }

    pub fn blank_components_mut(&mut self) -> Vec<&mut BlankLabel> {
        let mut components = Vec::new();
        if let Subject::Blank(label) = &mut self.subject {
            components.push(label);
        }
        if let Object::Blank(label) = &mut self.object {
            components.push(label);
        }
        if let Some(GraphLabel::Blank(label)) = &mut self.graph_label {
            components.push(label);
        }
        components
    }
}

impl DataSet {
    pub fn new() -> Self {
        DataSet::default()
    }

    pub fn add(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Serialize as N-Quads with lines in code point order, the serialized
    /// form hashed by the canonicalizer.
    pub fn to_nquads(&self) -> String {
        let mut lines: Vec<String> = self.statements.iter().map(Statement::to_string).collect();
        lines.sort();
        lines.dedup();
        lines.join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_string_literals() {
        let literal = Literal::Simple("line\nbreak \"quoted\" back\\slash".to_string());
        assert_eq!(
            literal.to_string(),
            "\"line\\nbreak \\\"quoted\\\" back\\\\slash\""
        );
    }

    #[test]
    fn escapes_iri_control_characters() {
        let iri = IriRef("urn:ex:a b".to_string());
        assert_eq!(iri.to_string(), "<urn:ex:a\\u0020b>");
    }

    #[test]
    fn statement_line_shape() {
        let statement = Statement {
            subject: Subject::Blank(BlankLabel("_:c14n0".to_string())),
            predicate: Predicate(IriRef(RDF_TYPE.to_string())),
            object: Object::Iri(IriRef("http://example.org/vocab#Foo".to_string())),
            graph_label: None,
        };
        assert_eq!(
            statement.to_string(),
            "_:c14n0 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.org/vocab#Foo> .\n"
        );
    }

    #[test]
    fn nquads_are_sorted() {
        let mut dataset = DataSet::new();
        let make = |s: &str| Statement {
            subject: Subject::Iri(IriRef(s.to_string())),
            predicate: Predicate(IriRef(RDF_TYPE.to_string())),
            object: Object::Literal(Literal::Simple("x".to_string())),
            graph_label: None,
        };
        dataset.add(make("urn:ex:b"));
        dataset.add(make("urn:ex:a"));
        let nquads = dataset.to_nquads();
        let first = nquads.lines().next().unwrap();
        assert!(first.starts_with("<urn:ex:a>"));
    }
}
