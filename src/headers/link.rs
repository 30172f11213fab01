//! `Link`, §4.1. Grammar: `<uri>; rel=".."; type=".."`, with an arbitrary
//! set of `name=value` parameters. Used both to parse request `Link`
//! headers (§4.7.3 POST type resolution) and to assemble response `Link`
//! headers (LDP type chain, Memento links, `constrainedBy`, ...).

use std::fmt;

use crate::error::LdpError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub target: String,
    pub params: Vec<(String, String)>,
}

impl Link {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into(), params: Vec::new() }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn rel(&self) -> Option<&str> {
        self.param("rel")
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Parse a single `Link` header value. A request may carry several
    /// comma-separated link-values; callers split on top-level commas
    /// themselves since commas can appear inside quoted parameter values.
    pub fn parse(value: &str) -> Result<Self, LdpError> {
        let value = value.trim();
        let rest = value
            .strip_prefix('<')
            .ok_or_else(|| LdpError::BadRequest(format!("malformed Link header: {value}")))?;
        let (target, mut rest) = rest
            .split_once('>')
            .ok_or_else(|| LdpError::BadRequest(format!("malformed Link header: {value}")))?;

        let mut params = Vec::new();
        rest = rest.trim_start();
        while let Some(stripped) = rest.strip_prefix(';') {
            rest = stripped.trim_start();
            let (name, remainder) = rest
                .split_once('=')
                .ok_or_else(|| LdpError::BadRequest(format!("malformed Link header: {value}")))?;
            let remainder = remainder.trim_start();
            let (val, remainder) = if let Some(quoted) = remainder.strip_prefix('"') {
                let end = quoted
                    .find('"')
                    .ok_or_else(|| LdpError::BadRequest(format!("malformed Link header: {value}")))?;
                (&quoted[..end], quoted[end + 1..].trim_start())
            } else {
                match remainder.split_once(';') {
                    Some((val, remainder)) => (val.trim_end(), remainder),
                    None => (remainder, ""),
                }
            };
            params.push((name.trim().to_string(), val.to_string()));
            rest = remainder.trim_start();
        }

        Ok(Self { target: target.to_string(), params })
    }

    /// Split a raw header value on commas that are not inside `<...>` or
    /// `"..."`, then parse each resulting link-value.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, LdpError> {
        split_link_values(value).into_iter().map(|v| Self::parse(v.trim())).collect()
    }
}

fn split_link_values(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut start = 0usize;
    for (i, c) in value.char_indices() {
        match c {
            '<' if !in_quotes => depth += 1,
            '>' if !in_quotes => depth -= 1,
            '"' => in_quotes = !in_quotes,
            ',' if depth == 0 && !in_quotes => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.target)?;
        for (name, value) in &self.params {
            write!(f, "; {name}=\"{value}\"")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_link() {
        let link = Link::parse(r#"<http://example.com/a>; rel="type""#).unwrap();
        assert_eq!(link.target, "http://example.com/a");
        assert_eq!(link.rel(), Some("type"));
    }

    #[test]
    fn parses_multiple_params() {
        let link = Link::parse(r#"<http://x>; rel="memento"; datetime="Thu, 01 Jan 1970 00:00:01 GMT""#).unwrap();
        assert_eq!(link.rel(), Some("memento"));
        assert_eq!(link.param("datetime"), Some("Thu, 01 Jan 1970 00:00:01 GMT"));
    }

    #[test]
    fn splits_multiple_link_values() {
        let links = Link::parse_list(r#"<http://a>; rel="type", <http://b>; rel="describedby""#).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].target, "http://b");
    }

    #[test]
    fn rejects_missing_angle_brackets() {
        assert!(Link::parse("http://example.com").is_err());
    }

    #[test]
    fn round_trips_through_display() {
        let link = Link::new("http://x").with_param("rel", "type");
        assert_eq!(link.to_string(), r#"<http://x>; rel="type""#);
    }
}
