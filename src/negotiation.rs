//! §4.2 Content Negotiation: map an ordered `Accept` list plus an optional
//! resource MIME type to an [`RdfSyntax`] (or the binary pass-through
//! sentinel), with profile extraction.

use crate::error::LdpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RdfSyntax {
    Turtle,
    JsonLd,
    NTriples,
    RdfaHtml,
}

impl RdfSyntax {
    pub const fn media_type(&self) -> &'static str {
        match self {
            Self::Turtle => "text/turtle",
            Self::JsonLd => "application/ld+json",
            Self::NTriples => "application/n-triples",
            Self::RdfaHtml => "text/html",
        }
    }

    /// Known variant table, in the order §4.2 step 3 walks it.
    pub const fn known() -> [Self; 4] {
        [Self::Turtle, Self::JsonLd, Self::NTriples, Self::RdfaHtml]
    }
}

/// Result of content negotiation: either an RDF syntax to serialize with,
/// or the "no RDF syntax" binary pass-through sentinel (§4.2 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negotiated {
    Rdf(RdfSyntax),
    Binary,
}

/// Default profile for a negotiated syntax, before an explicit `profile`
/// parameter in the `Accept` entry overrides it.
pub fn default_profile(syntax: RdfSyntax, identifier: &str) -> String {
    match syntax {
        RdfSyntax::JsonLd => "http://www.w3.org/ns/json-ld#expanded".to_string(),
        RdfSyntax::RdfaHtml => identifier.to_string(),
        _ => String::new(),
    }
}

fn media_range(accept_entry: &str) -> &str {
    accept_entry.split(';').next().unwrap_or(accept_entry).trim()
}

fn compatible(range: &str, candidate: &str) -> bool {
    if range == "*/*" {
        return true;
    }
    let Some((range_type, range_subtype)) = range.split_once('/') else {
        return false;
    };
    let Some((cand_type, cand_subtype)) = candidate.split_once('/') else {
        return false;
    };
    (range_type == "*" || range_type == cand_type) && (range_subtype == "*" || range_subtype == cand_subtype)
}

fn profile_param(accept_entry: &str) -> Option<String> {
    accept_entry.split(';').skip(1).find_map(|param| {
        let param = param.trim();
        param.strip_prefix("profile=").map(|v| {
            let v = v.trim();
            v.split_whitespace().next().unwrap_or(v).trim_matches('"').to_string()
        })
    })
}

/// §4.2. `accept` is the ordered, already-split list of media ranges from
/// the `Accept` header (q-value ordering is the caller's responsibility —
/// this function walks the list in the order given). `resource_mime` is
/// `Some` only for a `NonRDFSource`.
pub fn negotiate(
    accept: &[String],
    resource_mime: Option<&str>,
    identifier: &str,
) -> Result<(Negotiated, String), LdpError> {
    if accept.is_empty() && resource_mime.is_none() {
        let syntax = RdfSyntax::Turtle;
        return Ok((Negotiated::Rdf(syntax), default_profile(syntax, identifier)));
    }

    for entry in accept {
        let range = media_range(entry);
        if let Some(mime) = resource_mime {
            if compatible(range, mime) {
                return Ok((Negotiated::Binary, String::new()));
            }
        }
        for syntax in RdfSyntax::known() {
            if compatible(range, syntax.media_type()) {
                let profile = profile_param(entry).unwrap_or_else(|| default_profile(syntax, identifier));
                return Ok((Negotiated::Rdf(syntax), profile));
            }
        }
    }

    if accept.is_empty() {
        if let Some(mime) = resource_mime {
            let _ = mime;
            return Ok((Negotiated::Binary, String::new()));
        }
    }

    Err(LdpError::NotAcceptable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_accept_and_no_mime_defaults_to_turtle() {
        let (negotiated, _) = negotiate(&[], None, "http://x").unwrap();
        assert_eq!(negotiated, Negotiated::Rdf(RdfSyntax::Turtle));
    }

    #[test]
    fn empty_accept_with_binary_mime_passes_through() {
        let (negotiated, _) = negotiate(&[], Some("image/png"), "http://x").unwrap();
        assert_eq!(negotiated, Negotiated::Binary);
    }

    #[test]
    fn compatible_binary_mime_wins_before_rdf_syntax() {
        let accept = vec!["image/png".to_string(), "text/turtle".to_string()];
        let (negotiated, _) = negotiate(&accept, Some("image/png"), "http://x").unwrap();
        assert_eq!(negotiated, Negotiated::Binary);
    }

    #[test]
    fn falls_back_to_known_rdf_syntax() {
        let accept = vec!["application/ld+json".to_string()];
        let (negotiated, profile) = negotiate(&accept, None, "http://x").unwrap();
        assert_eq!(negotiated, Negotiated::Rdf(RdfSyntax::JsonLd));
        assert_eq!(profile, "http://www.w3.org/ns/json-ld#expanded");
    }

    #[test]
    fn rdfa_html_profile_defaults_to_identifier() {
        let accept = vec!["text/html".to_string()];
        let (_, profile) = negotiate(&accept, None, "http://host/a/b").unwrap();
        assert_eq!(profile, "http://host/a/b");
    }

    #[test]
    fn explicit_profile_param_overrides_default() {
        let accept = vec![r#"application/ld+json;profile="http://custom""#.to_string()];
        let (_, profile) = negotiate(&accept, None, "http://x").unwrap();
        assert_eq!(profile, "http://custom");
    }

    #[test]
    fn no_match_is_not_acceptable() {
        let accept = vec!["application/xml".to_string()];
        assert!(matches!(negotiate(&accept, None, "http://x"), Err(LdpError::NotAcceptable)));
    }
}
