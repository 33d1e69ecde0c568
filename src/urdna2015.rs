//! RDF dataset canonicalization (URDNA2015, later standardized as RDFC-1.0).
//!
//! Deterministically relabels blank nodes so that the serialized N-Quads
//! form of a dataset is independent of the labels and ordering the
//! JSON-LD translation happened to produce.
//!
//! Algorithm steps follow <https://www.w3.org/TR/rdf-canon/>.

use std::collections::{BTreeMap, HashSet};

use ring::digest;

use crate::error::Error;
use crate::rdf::{DataSet, Statement};

const CANONICAL_PREFIX: &str = "_:c14n";
const TEMPORARY_PREFIX: &str = "_:b";

/// Issues stable identifiers for blank nodes in first-come order.
#[derive(Debug, Clone, Default)]
struct Labeler {
    prefix: &'static str,
    counter: u64,
    /// (existing label, issued label), insertion-ordered.
    issued: Vec<(String, String)>,
}

impl Labeler {
    fn new(prefix: &'static str) -> Self {
        Labeler {
            prefix,
            counter: 0,
            issued: Vec::new(),
        }
    }

    fn issued_for(&self, existing: &str) -> Option<&str> {
        self.issued
            .iter()
            .find(|(e, _)| e == existing)
            .map(|(_, issued)| issued.as_str())
    }

    fn issue(&mut self, existing: &str) -> String {
        if let Some(issued) = self.issued_for(existing) {
            return issued.to_string();
        }
        let issued = format!("{}{}", self.prefix, self.counter);
        self.counter += 1;
        self.issued.push((existing.to_string(), issued.clone()));
        issued
    }
}

struct C14n<'a> {
    /// blank node label -> every quad mentioning it
    mentions: BTreeMap<String, Vec<&'a Statement>>,
    canonical: Labeler,
}

fn sha256_hex(data: &str) -> String {
    hex::encode(digest::digest(&digest::SHA256, data.as_bytes()).as_ref())
}

/// All orderings of `items`. Related-blank-node groups are tiny in
/// practice, so a simple recursive generator is enough.
fn permutations(items: &[String]) -> Vec<Vec<String>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            let mut permutation = Vec::with_capacity(items.len());
            permutation.push(head.clone());
            permutation.append(&mut tail);
            out.push(permutation);
        }
    }
    out
}

impl<'a> C14n<'a> {
    /// Hash First Degree Quads: every quad mentioning the node, with the
    /// reference node as `_:a` and every other blank as `_:z`.
    fn first_degree_hash(&self, reference: &str) -> String {
        let mut nquads: Vec<String> = Vec::new();
        if let Some(quads) = self.mentions.get(reference) {
            for quad in quads {
                let mut quad: Statement = (*quad).clone();
                for label in quad.blank_components_mut() {
                    label.0 = if label.0 == reference {
                        "_:a".to_string()
                    } else {
                        "_:z".to_string()
                    };
                }
                nquads.push(quad.to_string());
            }
        }
        nquads.sort();
        sha256_hex(&nquads.join(""))
    }

    /// Hash Related Blank Node.
    fn related_hash(
        &self,
        related: &str,
        quad: &Statement,
        labeler: &Labeler,
        position: char,
    ) -> String {
        let identifier = match self.canonical.issued_for(related) {
            Some(id) => id.to_string(),
            None => match labeler.issued_for(related) {
                Some(id) => id.to_string(),
                None => self.first_degree_hash(related),
            },
        };
        let mut input = position.to_string();
        if position != 'g' {
            input.push('<');
            input.push_str(&(quad.predicate.0).0);
            input.push('>');
        }
        input.push_str(&identifier);
        sha256_hex(&input)
    }

    /// Hash N-Degree Quads. Takes and returns the scoped labeler by value;
    /// the chosen copy survives.
    fn n_degree_hash(&self, identifier: &str, labeler: Labeler) -> Result<(String, Labeler), Error> {
        let mut hash_to_related: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(quads) = self.mentions.get(identifier) {
            for quad in quads {
                for (component, position) in quad.blank_components_with_position() {
                    if component.0 != identifier {
                        let hash = self.related_hash(&component.0, quad, &labeler, position);
                        hash_to_related.entry(hash).or_default().push(component.0.clone());
                    }
                }
            }
        }

        let mut labeler = labeler;
        let mut data_to_hash = String::new();
        for (related_hash, related_list) in hash_to_related {
            data_to_hash.push_str(&related_hash);
            let mut chosen_path = String::new();
            let mut chosen_labeler: Option<Labeler> = None;

            'permutation: for permutation in permutations(&related_list) {
                let mut labeler_copy = labeler.clone();
                let mut path = String::new();
                let mut recursion_list: Vec<String> = Vec::new();

                for related in &permutation {
                    if let Some(canonical_id) = self.canonical.issued_for(related) {
                        path.push_str(canonical_id);
                    } else {
                        if labeler_copy.issued_for(related).is_none() {
                            recursion_list.push(related.clone());
                        }
                        path.push_str(&labeler_copy.issue(related));
                    }
                    if !chosen_path.is_empty()
                        && path.len() >= chosen_path.len()
                        && path > chosen_path
                    {
                        continue 'permutation;
                    }
                }

                for related in &recursion_list {
                    let (hash, returned) = self.n_degree_hash(related, labeler_copy)?;
                    labeler_copy = returned;
                    path.push_str(&labeler_copy.issue(related));
                    path.push('<');
                    path.push_str(&hash);
                    path.push('>');
                    if !chosen_path.is_empty()
                        && path.len() >= chosen_path.len()
                        && path > chosen_path
                    {
                        continue 'permutation;
                    }
                }

                if chosen_path.is_empty() || path < chosen_path {
                    chosen_path = path;
                    chosen_labeler = Some(labeler_copy);
                }
            }

            data_to_hash.push_str(&chosen_path);
            labeler = chosen_labeler
                .ok_or_else(|| Error::encoding("canonicalization chose no identifier issuer"))?;
        }

        Ok((sha256_hex(&data_to_hash), labeler))
    }
}

/// Canonicalize a dataset: returns an equivalent dataset whose blank nodes
/// carry `_:c14n*` labels in canonical order.
pub fn normalize(input: &DataSet) -> Result<DataSet, Error> {
    let mut c14n = C14n {
        mentions: BTreeMap::new(),
        canonical: Labeler::new(CANONICAL_PREFIX),
    };
    for quad in input.statements() {
        for label in quad.blank_components() {
            c14n.mentions.entry(label.0.clone()).or_default().push(quad);
        }
    }

    let mut non_normalized: HashSet<String> = c14n.mentions.keys().cloned().collect();

    // Issue canonical identifiers for nodes with unique first-degree
    // hashes, repeating until a fixpoint.
    let mut simple = true;
    while simple {
        simple = false;
        let mut hash_to_blanks: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for id in &non_normalized {
            hash_to_blanks
                .entry(c14n.first_degree_hash(id))
                .or_default()
                .push(id.clone());
        }
        for (_hash, ids) in hash_to_blanks {
            if ids.len() == 1 {
                c14n.canonical.issue(&ids[0]);
                non_normalized.remove(&ids[0]);
                simple = true;
            }
        }
    }

    // Remaining nodes share first-degree hashes; break ties with the
    // n-degree walk, in hash order.
    let mut hash_to_blanks: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in &non_normalized {
        hash_to_blanks
            .entry(c14n.first_degree_hash(id))
            .or_default()
            .push(id.clone());
    }
    for (_hash, ids) in hash_to_blanks {
        let mut hash_path_list: Vec<(String, Labeler)> = Vec::new();
        for id in ids {
            if c14n.canonical.issued_for(&id).is_some() {
                continue;
            }
            let mut temporary = Labeler::new(TEMPORARY_PREFIX);
            temporary.issue(&id);
            hash_path_list.push(c14n.n_degree_hash(&id, temporary)?);
        }
        hash_path_list.sort_by(|a, b| a.0.cmp(&b.0));
        for (_hash, labeler) in hash_path_list {
            for (existing, _issued) in labeler.issued {
                c14n.canonical.issue(&existing);
            }
        }
    }

    // Relabel.
    let mut normalized = DataSet::new();
    for quad in input.statements() {
        let mut quad = quad.clone();
        for label in quad.blank_components_mut() {
            match c14n.canonical.issued_for(&label.0) {
                Some(canonical_id) => label.0 = canonical_id.to_string(),
                None => {
                    return Err(Error::encoding("blank node missed canonicalization")
                        .with("label", &label.0));
                }
            }
        }
        normalized.add(quad);
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{BlankLabel, IriRef, Literal, Object, Predicate, Subject};

    fn blank_quad(subject: &str, predicate: &str, object: &str) -> Statement {
        Statement {
            subject: Subject::Blank(BlankLabel(subject.to_string())),
            predicate: Predicate(IriRef(predicate.to_string())),
            object: Object::Literal(Literal::Simple(object.to_string())),
            graph_label: None,
        }
    }

    fn link_quad(subject: &str, predicate: &str, object: &str) -> Statement {
        Statement {
            subject: Subject::Blank(BlankLabel(subject.to_string())),
            predicate: Predicate(IriRef(predicate.to_string())),
            object: Object::Blank(BlankLabel(object.to_string())),
            graph_label: None,
        }
    }

    #[test]
    fn relabeling_is_independent_of_input_labels() {
        let mut a = DataSet::new();
        a.add(blank_quad("_:x", "urn:ex:p", "one"));
        a.add(blank_quad("_:y", "urn:ex:q", "two"));

        let mut b = DataSet::new();
        b.add(blank_quad("_:first", "urn:ex:q", "two"));
        b.add(blank_quad("_:second", "urn:ex:p", "one"));

        assert_eq!(
            normalize(&a).unwrap().to_nquads(),
            normalize(&b).unwrap().to_nquads()
        );
    }

    #[test]
    fn canonical_labels_are_assigned() {
        let mut dataset = DataSet::new();
        dataset.add(blank_quad("_:b99", "urn:ex:p", "v"));
        let nquads = normalize(&dataset).unwrap().to_nquads();
        assert_eq!(nquads, "_:c14n0 <urn:ex:p> \"v\" .\n");
    }

    #[test]
    fn shared_hash_nodes_get_distinct_labels() {
        // two blank nodes with identical first-degree shapes, linked so the
        // n-degree pass must disambiguate
        let mut dataset = DataSet::new();
        dataset.add(link_quad("_:a", "urn:ex:linked", "_:b"));
        dataset.add(link_quad("_:b", "urn:ex:linked", "_:a"));
        dataset.add(blank_quad("_:a", "urn:ex:p", "left"));
        dataset.add(blank_quad("_:b", "urn:ex:p", "right"));
        let normalized = normalize(&dataset).unwrap();
        let nquads = normalized.to_nquads();
        assert!(nquads.contains("_:c14n0"));
        assert!(nquads.contains("_:c14n1"));
        // run twice: deterministic
        assert_eq!(nquads, normalize(&dataset).unwrap().to_nquads());
    }

    #[test]
    fn permutations_cover_all_orderings() {
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let perms = permutations(&items);
        assert_eq!(perms.len(), 6);
        let unique: std::collections::HashSet<Vec<String>> = perms.into_iter().collect();
        assert_eq!(unique.len(), 6);
    }
}
