//! §10.1 Configuration: loaded the way the teacher's `ConfigFile` is
//! loaded — a `config` crate builder stacking a JSON file source over an
//! environment-variable source, against a fixed list of candidate
//! locations when no `--config` flag is given.

use std::collections::HashSet;
use std::fmt::Display;
use std::io::ErrorKind;

use gethostname::gethostname;
use serde::{Deserialize, Serialize};

const CONFIG_LOCATIONS: &[&str] = &["./trellis.json", "~/.config/trellis.json"];

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Reported in logs and the root resource's deployment metadata.
    pub hostname: String,
    /// No trailing slash (§10.6 Open Question 3).
    pub base_url: String,
    pub bind_address: String,
    pub port: u16,
    pub partitions: Vec<String>,
    #[serde(default = "default_reserved_partitions")]
    pub reserved_partitions: HashSet<String>,
    pub admin_role: String,
    #[serde(default = "default_challenges")]
    pub www_authenticate_challenges: Vec<String>,
    pub cache_max_age: u64,
    pub known_algorithms: Vec<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_reserved_partitions() -> HashSet<String> {
    ["bnode", "admin"].into_iter().map(String::from).collect()
}

fn default_challenges() -> Vec<String> {
    vec!["Basic".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: gethostname().into_string().unwrap_or_else(|_| "localhost".to_string()),
            base_url: "http://localhost:8080".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            partitions: vec!["default".to_string()],
            reserved_partitions: default_reserved_partitions(),
            admin_role: "admin".to_string(),
            www_authenticate_challenges: default_challenges(),
            cache_max_age: 86400,
            known_algorithms: vec!["MD5".to_string(), "SHA-256".to_string()],
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Load from an explicit path, or the fixed [`CONFIG_LOCATIONS`] list,
    /// each checked with `~` expanded via `shellexpand`.
    pub fn try_from(config_path: Option<&str>) -> Result<Self, std::io::Error> {
        let candidates: Vec<String> = match config_path {
            Some(path) => vec![path.to_string()],
            None => CONFIG_LOCATIONS.iter().map(|s| s.to_string()).collect(),
        };

        for candidate in &candidates {
            let expanded = shellexpand::tilde(candidate).into_owned();
            if !std::path::Path::new(&expanded).exists() {
                continue;
            }
            let builder = config::Config::builder()
                .add_source(config::File::new(&expanded, config::FileFormat::Json))
                .add_source(config::Environment::with_prefix("TRELLIS"));
            match builder.build().and_then(|c| c.try_deserialize::<Self>()) {
                Ok(config) => {
                    tracing::info!(path = %expanded, "loaded configuration");
                    return Ok(config);
                }
                Err(err) => tracing::warn!(path = %expanded, error = %err, "failed to parse config file"),
            }
        }

        if config_path.is_some() {
            return Err(std::io::Error::new(ErrorKind::NotFound, "config file not found or unreadable"));
        }

        tracing::info!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Collects every validation error rather than stopping at the first,
    /// mirroring the teacher's `check_config`.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.base_url.ends_with('/') {
            errors.push("base_url must not end with a trailing slash".to_string());
        }
        if let Err(err) = url::Url::parse(&self.base_url) {
            errors.push(format!("base_url is not a valid URL: {err}"));
        }
        if self.partitions.is_empty() {
            errors.push("at least one partition must be configured".to_string());
        }
        for partition in &self.partitions {
            if self.reserved_partitions.contains(partition) {
                errors.push(format!("partition {partition:?} collides with a reserved partition name"));
            }
        }
        if self.www_authenticate_challenges.is_empty() {
            errors.push("www_authenticate_challenges must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Display for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hostname={:?} base_url={:?} bind={}:{} partitions={:?} log_level={:?}",
            self.hostname, self.base_url, self.bind_address, self.port, self.partitions, self.log_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn trailing_slash_base_url_is_rejected() {
        let mut config = ServerConfig::default();
        config.base_url = "http://host/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partition_colliding_with_reserved_name_is_rejected() {
        let mut config = ServerConfig::default();
        config.partitions = vec!["admin".to_string()];
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("admin")));
    }
}
