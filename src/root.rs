//! §4.9 Root Resource: a single read-only discovery endpoint listing
//! configured partitions as `ldp:contains` triples plus deployment
//! metadata.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use oxrdf::{GraphName, Literal, NamedNode, Quad, Subject, Term};

use crate::error::LdpError;
use crate::negotiation::{negotiate, Negotiated};

/// Deployment-configured metadata rendered on the root resource. URL-like
/// values are emitted as IRIs; everything else as a plain literal.
#[derive(Debug, Clone, Default)]
pub struct RootMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub label: Option<String>,
    pub comment: Option<String>,
    pub see_also: Option<String>,
}

fn is_url_like(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn property_term(value: &str) -> Term {
    if is_url_like(value) {
        Term::NamedNode(NamedNode::new_unchecked(value))
    } else {
        Term::Literal(Literal::new_simple_literal(value))
    }
}

fn build_quads(base_url: &str, partitions: &[String], metadata: &RootMetadata) -> Vec<Quad> {
    let graph = GraphName::NamedNode(NamedNode::new_unchecked(crate::model::PreferGraph::UserManaged.iri()));
    let subject = Subject::NamedNode(NamedNode::new_unchecked(base_url));

    let mut quads: Vec<Quad> = partitions
        .iter()
        .map(|partition| {
            Quad::new(
                subject.clone(),
                NamedNode::new_unchecked("http://www.w3.org/ns/ldp#contains"),
                Term::NamedNode(NamedNode::new_unchecked(format!("{base_url}/{partition}"))),
                graph.clone(),
            )
        })
        .collect();

    let metadata_props: [(&str, &Option<String>); 6] = [
        ("http://purl.org/dc/terms/title", &metadata.title),
        ("http://purl.org/dc/terms/description", &metadata.description),
        ("http://purl.org/dc/terms/publisher", &metadata.publisher),
        ("http://www.w3.org/2000/01/rdf-schema#label", &metadata.label),
        ("http://www.w3.org/2000/01/rdf-schema#comment", &metadata.comment),
        ("http://www.w3.org/2000/01/rdf-schema#seeAlso", &metadata.see_also),
    ];
    for (predicate, value) in metadata_props {
        if let Some(value) = value {
            quads.push(Quad::new(
                subject.clone(),
                NamedNode::new_unchecked(predicate),
                property_term(value),
                graph.clone(),
            ));
        }
    }

    quads
}

#[tracing::instrument(skip_all)]
pub fn handle(
    io: &dyn crate::services::IOService,
    base_url: &str,
    partitions: &[String],
    metadata: &RootMetadata,
    accept: &[String],
) -> Result<Response, LdpError> {
    let (negotiated, profile) = negotiate(accept, None, base_url)?;
    let syntax = match negotiated {
        Negotiated::Rdf(syntax) => syntax,
        Negotiated::Binary => unreachable!("root resource has no binary MIME to negotiate against"),
    };

    let quads = build_quads(base_url, partitions, metadata);
    let triples: Vec<oxrdf::Triple> = quads.into_iter().map(|q| oxrdf::Triple::new(q.subject, q.predicate, q.object)).collect();
    let body = io.write(&triples, syntax, &profile)?;

    let type_link = format!(
        "<{}>; rel=\"type\", <{}>; rel=\"type\"",
        crate::model::InteractionModel::Resource.iri(),
        crate::model::InteractionModel::RDFSource.iri()
    );

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, syntax.media_type())
        .header(header::ALLOW, "GET, HEAD, OPTIONS");
    if let Ok(value) = header::HeaderValue::from_str(&type_link) {
        response = response.header(header::LINK, value);
    }
    response.body(Body::from(body)).map_err(|e| LdpError::Internal(e.to_string()))
}
