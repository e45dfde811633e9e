//! Image host allow-list.

use std::collections::BTreeSet;

use url::Url;

#[derive(Debug, Clone, Default)]
pub struct ImagePolicy {
    domains: BTreeSet<String>,
}

impl ImagePolicy {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    /// Whether an image at `url` may be served. Host match is exact.
    pub fn is_allowed(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => self.domains.contains(&host.to_ascii_lowercase()),
            None => false,
        }
    }

    pub fn is_allowed_str(&self, url: &str) -> bool {
        Url::parse(url).map(|u| self.is_allowed(&u)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ImagePolicy {
        ImagePolicy::new(["medusa-public-images.s3.eu-west-1.amazonaws.com", "localhost"])
    }

    #[test]
    fn allows_listed_hosts() {
        let p = policy();
        assert!(p.is_allowed_str(
            "https://medusa-public-images.s3.eu-west-1.amazonaws.com/tee-black-front.png"
        ));
        assert!(p.is_allowed_str("http://localhost:9000/uploads/a.png"));
        assert!(p.is_allowed_str("http://LOCALHOST/a.png"));
    }

    #[test]
    fn rejects_other_hosts_and_garbage() {
        let p = policy();
        assert!(!p.is_allowed_str("https://evil.example.com/a.png"));
        assert!(!p.is_allowed_str("https://localhost.evil.example.com/a.png"));
        assert!(!p.is_allowed_str("not a url"));
    }

    #[test]
    fn ignores_blank_entries() {
        let p = ImagePolicy::new(["", "  ", "cdn.example.com"]);
        assert_eq!(p.domains().collect::<Vec<_>>(), vec!["cdn.example.com"]);
    }
}
