//! `Want-Digest` (RFC 3230), §4.1.

use crate::error::LdpError;

#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmPreference {
    pub algorithm: String,
    pub q: f64,
}

/// Algorithms the client asked for a `Digest` of, ascending by `q` per the
/// spec's Open Question resolution (RFC 3230 itself would sort descending).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WantDigest {
    pub algorithms: Vec<AlgorithmPreference>,
}

impl WantDigest {
    pub fn parse(value: &str) -> Result<Self, LdpError> {
        let mut algorithms: Vec<AlgorithmPreference> = value
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                let mut parts = token.split(';');
                let algorithm = parts.next().unwrap_or("").trim().to_uppercase();
                let q = parts
                    .find_map(|param| {
                        let param = param.trim();
                        param.strip_prefix("q=")
                    })
                    .map(|q| q.trim().parse::<f64>().unwrap_or(0.0))
                    .unwrap_or(1.0);
                AlgorithmPreference { algorithm, q }
            })
            .collect();
        algorithms.sort_by(|a, b| a.q.partial_cmp(&b.q).unwrap_or(std::cmp::Ordering::Equal));
        Ok(Self { algorithms })
    }

    /// The client's most-preferred algorithm among those the binary service
    /// actually supports, per §4.7.1 step 4 ("first supported algorithm").
    pub fn first_supported<'a>(&'a self, known: &[String]) -> Option<&'a str> {
        self.algorithms
            .iter()
            .rev()
            .find(|pref| known.iter().any(|k| k.eq_ignore_ascii_case(&pref.algorithm)))
            .map(|pref| pref.algorithm.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_q_to_one() {
        let wd = WantDigest::parse("md5").unwrap();
        assert_eq!(wd.algorithms, vec![AlgorithmPreference { algorithm: "MD5".into(), q: 1.0 }]);
    }

    #[test]
    fn invalid_q_becomes_zero() {
        let wd = WantDigest::parse("md5;q=banana").unwrap();
        assert_eq!(wd.algorithms[0].q, 0.0);
    }

    #[test]
    fn sorts_ascending_by_q() {
        let wd = WantDigest::parse("sha-256;q=0.3, md5;q=0.9, sha-512;q=0.1").unwrap();
        let names: Vec<_> = wd.algorithms.iter().map(|a| a.algorithm.as_str()).collect();
        assert_eq!(names, vec!["SHA-512", "SHA-256", "MD5"]);
    }
}
