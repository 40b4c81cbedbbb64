//! Managed-domain filtering
//!
//! Several bridge instances may consume the same request stream, each
//! responsible for a subset of domains. [`DomainMatcher`] decides whether
//! a request belongs to this instance.

/// Decides whether this instance is responsible for a domain
#[derive(Debug, Clone, Default)]
pub struct DomainMatcher {
    /// Lower-cased, trimmed managed domains without the root dot
    managed: Vec<String>,
}

impl DomainMatcher {
    /// Create a matcher from the configured managed domains
    ///
    /// Entries are trimmed, lower-cased and stripped of a trailing root
    /// dot; blank entries are ignored.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut managed: Vec<String> = domains
            .into_iter()
            .map(|d| normalize(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();
        managed.sort();
        managed.dedup();

        Self { managed }
    }

    /// A matcher that accepts everything
    pub fn all() -> Self {
        Self::default()
    }

    /// `true` when no managed domains are configured
    pub fn handles_all(&self) -> bool {
        self.managed.is_empty()
    }

    /// The normalized managed domains
    pub fn managed_domains(&self) -> &[String] {
        &self.managed
    }

    /// Whether this instance should handle `candidate`
    ///
    /// Matches a managed domain exactly or as a proper subdomain: managing
    /// `example.com` covers `sub.example.com` but not `notexample.com`.
    pub fn should_handle(&self, candidate: &str) -> bool {
        if self.managed.is_empty() {
            return true;
        }

        let candidate = normalize(candidate);
        if candidate.is_empty() {
            return false;
        }

        self.managed.iter().any(|managed| {
            candidate == *managed
                || candidate
                    .strip_suffix(managed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

fn normalize(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_lowercase()
}
