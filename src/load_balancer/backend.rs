//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single warehouse node the proxy forwards to
//! - Parse `host:port` or `http://host:port` endpoint strings
//! - Build the absolute URL for a forwarded path and query

use std::fmt;
use url::Url;

/// A single backend node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Pre-parsed base URL, scheme and authority only.
    pub base_url: Url,
}

impl Backend {
    /// Parse an endpoint. A missing scheme means plain HTTP.
    pub fn parse(endpoint: &str) -> Result<Self, url::ParseError> {
        let endpoint = endpoint.trim();
        let raw = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        };

        let mut base_url = Url::parse(&raw)?;
        if base_url.host_str().is_none() {
            return Err(url::ParseError::EmptyHost);
        }
        base_url.set_path("");
        base_url.set_query(None);
        base_url.set_fragment(None);
        Ok(Self { base_url })
    }

    /// `host:port` of the backend, for logs and metrics.
    pub fn authority(&self) -> String {
        match (self.base_url.host_str(), self.base_url.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => self.base_url.to_string(),
        }
    }

    /// Absolute URL for `path_and_query` on this backend.
    pub fn url_for(&self, path_and_query: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        if path_and_query.starts_with('/') {
            format!("{}{}", base, path_and_query)
        } else {
            format!("{}/{}", base, path_and_query)
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_authority() {
        let b = Backend::parse("127.0.0.1:8082").unwrap();
        assert_eq!(b.authority(), "127.0.0.1:8082");
        assert_eq!(b.url_for("/employee/1"), "http://127.0.0.1:8082/employee/1");
    }

    #[test]
    fn test_parse_url_drops_path() {
        let b = Backend::parse("http://localhost:8081/ignored?x=1").unwrap();
        assert_eq!(b.authority(), "localhost:8081");
        assert_eq!(
            b.url_for("/employees?offset=0&limit=10"),
            "http://localhost:8081/employees?offset=0&limit=10"
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Backend::parse("").is_err());
        assert!(Backend::parse("http://").is_err());
    }
}
