//! Compiles domain and proxy lists into PAC script fragments.
//!
//! Each domain becomes one clause that tests the request host against
//! `(?:^|\.)<domain>$` and selects the `+PACHost` profile on a match.
//!
//! Only `.` is escaped. A domain holding other regex metacharacters
//! compiles to a pattern with a different meaning; such entries are
//! logged but emitted unchanged.

use crate::domains::DomainSet;
use crate::proxies::ProxyList;
use tracing::warn;

/// Profile the template routes matching hosts to.
pub const PROXY_PROFILE: &str = "+PACHost";

/// Separator between clauses, matching the template's indentation.
const CLAUSE_SEPARATOR: &str = "\n        ";

const REGEX_METACHARACTERS: &[char] = &[
    '\\', '^', '$', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '/',
];

/// A single host-suffix rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRule<'a> {
    domain: &'a str,
}

impl<'a> DomainRule<'a> {
    pub fn new(domain: &'a str) -> Self {
        Self { domain }
    }

    /// Regex source matching the domain and any of its subdomains.
    pub fn pattern(&self) -> String {
        format!(r"(?:^|\.){}$", self.domain.replace('.', r"\."))
    }

    /// The PAC clause for this rule.
    pub fn to_js(&self) -> String {
        format!(
            r#"if (/{}/.test(host)) return "{}";"#,
            self.pattern(),
            PROXY_PROFILE
        )
    }

    /// Whether the domain contains characters that are not escaped.
    pub fn has_unescaped_metacharacters(&self) -> bool {
        self.domain.contains(REGEX_METACHARACTERS)
    }
}

/// Compiles the domain set into PAC clauses, one per domain, in order.
///
/// An empty set compiles to an empty string.
pub fn compile_domain_rules(domains: &DomainSet) -> String {
    domains
        .iter()
        .map(DomainRule::new)
        .map(|rule| {
            if rule.has_unescaped_metacharacters() {
                warn!(domain = rule.domain, "Domain contains unescaped regex metacharacters");
            }
            rule.to_js()
        })
        .collect::<Vec<_>>()
        .join(CLAUSE_SEPARATOR)
}

/// Serializes the proxy list into a PAC proxy string.
pub fn compile_proxy_defines(proxies: &ProxyList) -> String {
    proxies.iter().collect::<Vec<_>>().join(";")
}
