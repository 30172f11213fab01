//! `Range`, §4.1. Grammar: literal prefix `bytes=`, exactly one `from-to`
//! pair, both non-negative, `from < to` — else BadRequest (P4).

use crate::error::LdpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub from: u64,
    pub to: u64,
}

impl Range {
    pub fn parse(value: &str) -> Result<Self, LdpError> {
        let spec = value
            .strip_prefix("bytes=")
            .ok_or_else(|| LdpError::BadRequest(format!("malformed Range header: {value}")))?;
        let (from, to) = spec
            .split_once('-')
            .ok_or_else(|| LdpError::BadRequest(format!("malformed Range header: {value}")))?;
        let from: u64 = from
            .trim()
            .parse()
            .map_err(|_| LdpError::BadRequest(format!("malformed Range header: {value}")))?;
        let to: u64 = to
            .trim()
            .parse()
            .map_err(|_| LdpError::BadRequest(format!("malformed Range header: {value}")))?;
        if to <= from {
            return Err(LdpError::BadRequest(format!("malformed Range header: {value}")));
        }
        Ok(Self { from, to })
    }

    /// Clamp `to` to `len` when it overruns the binary's actual length
    /// (§10.6 Open Question 2 — lenient, not a 416).
    pub fn clamp(&self, len: u64) -> Self {
        Self { from: self.from.min(len), to: self.to.min(len) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_range() {
        assert_eq!(Range::parse("bytes=10-49").unwrap(), Range { from: 10, to: 49 });
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(Range::parse("10-49").is_err());
    }

    #[test]
    fn rejects_from_not_less_than_to() {
        assert!(Range::parse("bytes=49-10").is_err());
        assert!(Range::parse("bytes=10-10").is_err());
    }

    #[test]
    fn rejects_negative_values() {
        assert!(Range::parse("bytes=-5-10").is_err());
    }

    #[test]
    fn clamps_overrun_to_length() {
        assert_eq!(Range { from: 10, to: 200 }.clamp(100), Range { from: 10, to: 100 });
    }
}
