//! `Accept-Datetime`, §4.1. Grammar: RFC 1123 HTTP-date, producing an
//! [`crate::model::Instant`].

use chrono::{DateTime, Utc};

use crate::error::LdpError;
use crate::model::Instant;

pub fn parse(value: &str) -> Result<Instant, LdpError> {
    DateTime::parse_from_rfc2822(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| LdpError::BadRequest(format!("malformed Accept-Datetime header: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc1123_date() {
        let instant = parse("Thu, 01 Jan 1970 00:00:01 GMT").unwrap();
        assert_eq!(instant.timestamp(), 1);
    }

    #[test]
    fn rejects_malformed_date() {
        assert!(parse("not a date").is_err());
    }
}
