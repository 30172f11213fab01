//! §4.6 Memento Engine: TimeMap/TimeGate construction and memento `Link`
//! header assembly.

use crate::headers::link::Link;
use crate::model::{Instant, VersionRange};

/// RFC 1123 rendering used by `datetime=".."` parameters (matches scenario 3).
pub fn rfc1123(instant: Instant) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `<identifier>; rel="original timegate"`, common to TimeMap, TimeGate and
/// a mementoed GET (§4.7.1 step 6).
pub fn original_timegate_link(identifier: &str) -> Link {
    Link::new(identifier).with_param("rel", "original timegate")
}

/// One `rel="memento"; datetime=..` link per `VersionRange`, keyed by the
/// range's `from` instant (§4.6 TimeMap).
pub fn memento_links(identifier: &str, mementos: &[VersionRange]) -> Vec<Link> {
    mementos
        .iter()
        .map(|range| {
            Link::new(format!("{identifier}?version={}", range.from.timestamp_millis()))
                .with_param("rel", "memento")
                .with_param("datetime", rfc1123(range.from))
        })
        .collect()
}

/// `rel="timemap"` link summarizing the full version range.
pub fn timemap_link(identifier: &str, mementos: &[VersionRange]) -> Option<Link> {
    let from = mementos.iter().map(|r| r.from).min()?;
    let until = mementos.iter().map(|r| r.until).max()?;
    Some(
        Link::new(format!("{identifier}?timemap=true"))
            .with_param("rel", "timemap")
            .with_param("type", "application/link-format")
            .with_param("from", rfc1123(from))
            .with_param("until", rfc1123(until)),
    )
}

/// Render the TimeMap body as `application/link-format`: one `Link:` line
/// per link, in the order §4.6 specifies (original-timegate, then each
/// memento, then the timemap summary).
pub fn timemap_link_format_body(identifier: &str, mementos: &[VersionRange]) -> String {
    let mut lines = vec![format!("{}", original_timegate_link(identifier))];
    lines.extend(memento_links(identifier, mementos).iter().map(|l| l.to_string()));
    if let Some(timemap) = timemap_link(identifier, mementos) {
        lines.push(timemap.to_string());
    }
    lines.join(",\n")
}

/// Encode the TimeMap as quads in `PreferUserManaged`, for RDF-negotiated
/// TimeMap responses: `prov:startedAtTime`/`prov:endedAtTime` per memento,
/// `prov:atTime` for the map as a whole.
pub fn timemap_quads(identifier: &str, mementos: &[VersionRange]) -> Vec<oxrdf::Quad> {
    use oxrdf::{GraphName, Literal, NamedNode, Quad, Subject};

    let graph = GraphName::NamedNode(NamedNode::new_unchecked(
        crate::model::PreferGraph::UserManaged.iri(),
    ));
    let subject = Subject::NamedNode(NamedNode::new_unchecked(identifier));
    let started = NamedNode::new_unchecked("http://www.w3.org/ns/prov#startedAtTime");
    let ended = NamedNode::new_unchecked("http://www.w3.org/ns/prov#endedAtTime");

    mementos
        .iter()
        .flat_map(|range| {
            let memento_iri = format!("{identifier}?version={}", range.from.timestamp_millis());
            let memento_subject = Subject::NamedNode(NamedNode::new_unchecked(memento_iri));
            vec![
                Quad::new(
                    memento_subject.clone(),
                    started.clone(),
                    Literal::new_typed_literal(
                        rfc1123(range.from),
                        NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#dateTime"),
                    ),
                    graph.clone(),
                ),
                Quad::new(
                    memento_subject,
                    ended.clone(),
                    Literal::new_typed_literal(
                        rfc1123(range.until),
                        NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#dateTime"),
                    ),
                    graph.clone(),
                ),
            ]
        })
        .chain(mementos.iter().min_by_key(|r| r.from).map(|first| {
            Quad::new(
                subject,
                NamedNode::new_unchecked("http://www.w3.org/ns/prov#atTime"),
                Literal::new_typed_literal(
                    rfc1123(first.from),
                    NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#dateTime"),
                ),
                graph,
            )
        }))
        .collect()
}

/// §4.6 TimeGate: `Location` for the 302 redirect.
pub fn timegate_location(identifier: &str, at: Instant) -> String {
    format!("{identifier}?version={}", at.timestamp_millis())
}

/// §4.6 Versioned GET: find the memento range containing `when`, if any.
pub fn closest_memento(mementos: &[VersionRange], when: Instant) -> Option<VersionRange> {
    mementos.iter().copied().find(|range| range.contains(when))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant(secs: i64) -> Instant {
        chrono::Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn renders_rfc1123() {
        assert_eq!(rfc1123(instant(1)), "Thu, 01 Jan 1970 00:00:01 GMT");
    }

    #[test]
    fn memento_links_one_per_range() {
        let mementos = vec![VersionRange::new(instant(1), instant(2)), VersionRange::new(instant(2), instant(3))];
        let links = memento_links("http://host/a/b", &mementos);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].target, "http://host/a/b?version=1000");
        assert_eq!(links[0].param("datetime"), Some("Thu, 01 Jan 1970 00:00:01 GMT"));
    }

    #[test]
    fn closest_memento_finds_containing_range() {
        let mementos = vec![VersionRange::new(instant(1000), instant(2000)), VersionRange::new(instant(2000), instant(3000))];
        assert_eq!(closest_memento(&mementos, instant(1500)), Some(mementos[0]));
        assert_eq!(closest_memento(&mementos, instant(2500)), Some(mementos[1]));
        assert_eq!(closest_memento(&mementos, instant(500)), None);
    }
}
