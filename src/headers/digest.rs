//! `Digest`, §4.1. Grammar: `alg=base64` — exactly one `=`, else BadRequest.

use crate::error::LdpError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub algorithm: String,
    pub value: String,
}

impl Digest {
    /// Exactly one `=` in the whole header value, splitting algorithm from
    /// digest — literal reading of the spec's grammar, which means a
    /// base64 value with padding (`...==`) does not parse. Callers wanting
    /// padded digests must use a digest encoding without `=`, matching the
    /// source behaviour this crate was distilled from.
    pub fn parse(value: &str) -> Result<Self, LdpError> {
        let mut parts = value.split('=');
        let algorithm = parts.next().unwrap_or("");
        let rest = parts.next();
        if rest.is_none() || parts.next().is_some() || algorithm.trim().is_empty() {
            return Err(LdpError::BadRequest(format!("malformed Digest header: {value}")));
        }
        Ok(Self { algorithm: algorithm.trim().to_uppercase(), value: rest.unwrap().trim().to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_digest() {
        let d = Digest::parse("md5=abc123").unwrap();
        assert_eq!(d.algorithm, "MD5");
        assert_eq!(d.value, "abc123");
    }

    #[test]
    fn rejects_padded_base64_as_extra_equals() {
        assert!(Digest::parse("sha-256=q2MRBw==").is_err());
    }

    #[test]
    fn rejects_missing_equals() {
        assert!(Digest::parse("md5").is_err());
    }

    #[test]
    fn rejects_extra_equals() {
        assert!(Digest::parse("md5=abc=def").is_err());
    }
}
