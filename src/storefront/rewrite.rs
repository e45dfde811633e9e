//! API path rewriting.
//!
//! `/api/<rest>?<query>` is sent to `<backend_url>/<rest>?<query>`. A base
//! path on the backend URL is kept in front of `<rest>`.

use serde::Serialize;
use url::Url;

#[derive(Debug, Clone)]
pub struct RewriteRule {
    prefix: String,
    destination: Url,
}

/// Next.js-style description of a rule, for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteDescriptor {
    pub source: String,
    pub destination: String,
}

impl RewriteRule {
    pub fn new(prefix: &str, destination: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            destination: Url::parse(destination)?,
        })
    }

    pub fn destination(&self) -> &Url {
        &self.destination
    }

    /// Map a request path (with optional query) to its backend URL.
    ///
    /// Returns `None` for paths outside the prefix.
    pub fn rewrite(&self, path_and_query: &str) -> Option<Url> {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };

        let rest = path.strip_prefix(self.prefix.as_str())?;
        if !rest.is_empty() && !rest.starts_with('/') {
            // "/apiary" is not under "/api".
            return None;
        }

        let base = self.destination.path().trim_end_matches('/');
        let joined = match (base.is_empty(), rest.is_empty()) {
            (true, true) => "/".to_string(),
            _ => format!("{}{}", base, rest),
        };

        let mut target = self.destination.clone();
        target.set_path(&joined);
        target.set_query(query);
        Some(target)
    }

    pub fn describe(&self) -> RewriteDescriptor {
        let base = self.destination.as_str().trim_end_matches('/');
        RewriteDescriptor {
            source: format!("{}/:path*", self.prefix),
            destination: format!("{}/:path*", base),
        }
    }
}
