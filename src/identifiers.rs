//! §4.3 Identifier Mapping & Skolemization.
//!
//! `toExternal`/`toInternal` rewrite the `trellis:` scheme to/from a
//! deployment's `baseUrl`; quad/triple mappers apply the rewrite to
//! subject and object only — the predicate is never touched (invariant
//! I5 talks about *resource* identifiers, not properties). Skolemization
//! of blank nodes is delegated to [`crate::services::ResourceService`].

pub const INTERNAL_SCHEME: &str = "trellis:";

/// `trellis:<partition>/<path>` -> `<baseUrl>/<partition>/<path>`. Terms
/// that don't start with the internal scheme pass through unchanged.
pub fn to_external(term: &str, base_url: &str) -> String {
    match term.strip_prefix(INTERNAL_SCHEME) {
        Some(rest) => format!("{base_url}/{rest}"),
        None => term.to_string(),
    }
}

/// Inverse of [`to_external`]. Terms that don't start with `baseUrl` pass
/// through unchanged.
pub fn to_internal(term: &str, base_url: &str) -> String {
    let prefix = format!("{base_url}/");
    match term.strip_prefix(&prefix) {
        Some(rest) => format!("{INTERNAL_SCHEME}{rest}"),
        None => term.to_string(),
    }
}

/// Rewrite an [`oxrdf::Quad`]'s subject and object through `mapper`,
/// leaving predicate and graph name untouched.
pub fn map_quad(quad: &oxrdf::Quad, base_url: &str, mapper: fn(&str, &str) -> String) -> oxrdf::Quad {
    use oxrdf::{NamedNode, Subject, Term};

    let subject = match &quad.subject {
        Subject::NamedNode(n) => {
            Subject::NamedNode(NamedNode::new_unchecked(mapper(n.as_str(), base_url)))
        }
        other => other.clone(),
    };
    let object = match &quad.object {
        Term::NamedNode(n) => Term::NamedNode(NamedNode::new_unchecked(mapper(n.as_str(), base_url))),
        other => other.clone(),
    };
    oxrdf::Quad::new(subject, quad.predicate.clone(), object, quad.graph_name.clone())
}

pub fn quad_to_external(quad: &oxrdf::Quad, base_url: &str) -> oxrdf::Quad {
    map_quad(quad, base_url, to_external)
}

pub fn quad_to_internal(quad: &oxrdf::Quad, base_url: &str) -> oxrdf::Quad {
    map_quad(quad, base_url, to_internal)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://host";

    #[test]
    fn to_external_rewrites_internal_scheme() {
        assert_eq!(to_external("trellis:a/b", BASE), "http://host/a/b");
    }

    #[test]
    fn to_external_passes_through_unrelated_terms() {
        assert_eq!(to_external("http://other/x", BASE), "http://other/x");
    }

    #[test]
    fn to_internal_is_inverse_of_to_external() {
        assert_eq!(to_internal("http://host/a/b", BASE), "trellis:a/b");
    }

    #[test]
    fn round_trip_external_then_internal() {
        let original = "trellis:a/b";
        assert_eq!(to_internal(&to_external(original, BASE), BASE), original);
    }

    #[test]
    fn round_trip_internal_then_external() {
        let original = format!("{BASE}/a/b");
        assert_eq!(to_external(&to_internal(&original, BASE), BASE), original);
    }
}
