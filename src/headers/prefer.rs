//! `Prefer` (RFC 7240), §4.1.

use crate::error::LdpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    Minimal,
    Representation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    Lenient,
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefer {
    pub preference: Option<Preference>,
    pub handling: Option<Handling>,
    pub wait: Option<u64>,
    pub include: Vec<String>,
    pub omit: Vec<String>,
    pub respond_async: bool,
    pub depth_noroot: bool,
}

impl Prefer {
    /// Parse a raw `Prefer` header value.
    ///
    /// Grammar: `;`-separated tokens, trimmed; a token with `=` is a
    /// key/value pair (quoted values have their surrounding quotes
    /// stripped), a token without `=` is a flag. Unknown fields are simply
    /// ignored — they're "preserved as opaque params" per the spec, and
    /// since this crate never echoes `Prefer` verbatim there's nowhere
    /// useful to keep them.
    pub fn parse(value: &str) -> Result<Self, LdpError> {
        let mut prefer = Prefer::default();
        for raw_token in value.split(';') {
            let token = raw_token.trim();
            if token.is_empty() {
                continue;
            }
            match token.split_once('=') {
                Some((key, val)) => {
                    let key = key.trim();
                    let val = unquote(val.trim());
                    match key {
                        "return" => {
                            prefer.preference = Some(match val.as_str() {
                                "minimal" => Preference::Minimal,
                                "representation" => Preference::Representation,
                                other => {
                                    return Err(LdpError::BadRequest(format!(
                                        "invalid Prefer return value: {other}"
                                    )))
                                }
                            });
                        }
                        "handling" => {
                            prefer.handling = Some(match val.as_str() {
                                "lenient" => Handling::Lenient,
                                "strict" => Handling::Strict,
                                other => {
                                    return Err(LdpError::BadRequest(format!(
                                        "invalid Prefer handling value: {other}"
                                    )))
                                }
                            });
                        }
                        "wait" => {
                            prefer.wait = Some(val.parse().map_err(|_| {
                                LdpError::BadRequest(format!("invalid Prefer wait value: {val}"))
                            })?);
                        }
                        "include" => {
                            prefer.include = val.split_whitespace().map(str::to_string).collect();
                        }
                        "omit" => {
                            prefer.omit = val.split_whitespace().map(str::to_string).collect();
                        }
                        _ => {}
                    }
                }
                None => match token {
                    "respond-async" => prefer.respond_async = true,
                    "depth-noroot" => prefer.depth_noroot = true,
                    _ => {}
                },
            }
        }
        Ok(prefer)
    }

    /// Default representation of the include set before `include`/`omit`
    /// are applied — §4.7.7.
    pub fn is_minimal(&self) -> bool {
        self.preference == Some(Preference::Minimal)
    }

    pub fn is_representation(&self) -> bool {
        self.preference == Some(Preference::Representation)
    }
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_return_minimal() {
        let p = Prefer::parse("return=minimal").unwrap();
        assert_eq!(p.preference, Some(Preference::Minimal));
    }

    #[test]
    fn parses_full_header() {
        let p = Prefer::parse(
            r#"return=representation; include="http://a http://b"; omit="http://b"; handling=strict; respond-async; depth-noroot"#,
        )
        .unwrap();
        assert_eq!(p.preference, Some(Preference::Representation));
        assert_eq!(p.handling, Some(Handling::Strict));
        assert_eq!(p.include, vec!["http://a", "http://b"]);
        assert_eq!(p.omit, vec!["http://b"]);
        assert!(p.respond_async);
        assert!(p.depth_noroot);
    }

    #[test]
    fn rejects_unknown_return_value() {
        assert!(Prefer::parse("return=sideways").is_err());
    }

    #[test]
    fn wait_must_be_an_integer() {
        assert!(Prefer::parse("wait=five").is_err());
        assert_eq!(Prefer::parse("wait=5").unwrap().wait, Some(5));
    }
}
