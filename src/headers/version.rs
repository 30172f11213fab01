//! `Version`, §4.1. Grammar: decimal epoch milliseconds, producing an
//! [`crate::model::Instant`]. The one grammar that fails with `NotFound`
//! rather than `BadRequest` — a malformed version parameter reads as "no
//! such memento" to the client.

use chrono::{TimeZone, Utc};

use crate::error::LdpError;
use crate::model::Instant;

pub fn parse(value: &str) -> Result<Instant, LdpError> {
    let millis: i64 = value.trim().parse().map_err(|_| LdpError::NotFound)?;
    match Utc.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(instant) => Ok(instant),
        _ => Err(LdpError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_epoch_millis() {
        let instant = parse("1700000000000").unwrap();
        assert_eq!(instant.timestamp(), 1_700_000_000);
    }

    #[test]
    fn malformed_version_is_not_found() {
        assert!(matches!(parse("yesterday"), Err(LdpError::NotFound)));
    }
}
