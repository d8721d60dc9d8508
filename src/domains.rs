//! Domain constraints attached to filters, and their classification into
//! the include and exclude lists the target format understands.

use crate::pattern::to_ascii_hostname;

/// The domain constraint of a filter, as handed over by the parser.
///
/// Hosts map to `true` (filter applies there) or `false` (filter does not).
/// `applies_by_default` plays the role of the grammar's empty-key entry: it
/// records whether the filter applies on hosts that are not listed, which
/// is the case exactly when no host is included explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainMap {
    entries: Vec<(String, bool)>,
    applies_by_default: bool,
}

impl DomainMap {
    /// An unconstrained map: the filter applies everywhere.
    pub fn unconstrained() -> DomainMap {
        DomainMap {
            entries: Vec::new(),
            applies_by_default: true,
        }
    }

    /// Builds a map from `(host, included)` pairs.
    pub fn from_entries(entries: Vec<(String, bool)>) -> DomainMap {
        let applies_by_default = !entries.iter().any(|(_, included)| *included);
        DomainMap {
            entries,
            applies_by_default,
        }
    }

    /// Parses a `|`-separated domain option, `~` marking exclusions.
    pub fn parse(option_value: &str, separator: char) -> DomainMap {
        let entries = option_value
            .split(separator)
            .filter(|domain| !domain.is_empty() && *domain != "~")
            .map(|domain| match domain.strip_prefix('~') {
                Some(excluded) => (excluded.to_string(), false),
                None => (domain.to_string(), true),
            })
            .collect();
        DomainMap::from_entries(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no host is explicitly included, making the filter generic.
    pub fn is_generic(&self) -> bool {
        self.applies_by_default
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries
            .iter()
            .map(|(domain, included)| (domain.as_str(), *included))
    }
}

/// Include and exclude lists produced from one filter's [`DomainMap`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedDomains {
    pub included: Vec<String>,
    pub excluded: Vec<String>,
}

/// Splits a domain constraint into included and excluded hosts, lowercased
/// and punycoded.
///
/// Hosts marked included are only reported when the map does not already
/// apply by default; in that case listing them adds nothing.
pub fn classify_domains(domains: &DomainMap) -> ClassifiedDomains {
    let mut classified = ClassifiedDomains::default();

    for (domain, included) in domains.iter() {
        let domain = to_ascii_hostname(&domain.to_lowercase());
        if !included {
            classified.excluded.push(domain);
        } else if !domains.is_generic() {
            classified.included.push(domain);
        }
    }

    classified
}

/// Collects the labels under which members of `list` are subdomains of
/// `domain`: for `domain` `"example.com"`, an entry `"ads.example.com"`
/// contributes `"ads"`.
pub fn find_subdomains_in_list<'a>(domain: &str, list: &'a [String]) -> Vec<&'a str> {
    let mut subdomains = Vec::new();
    let suffix_len = domain.len() + 1;

    for name in list {
        if name.len() > suffix_len
            && name.ends_with(domain)
            && name.as_bytes()[name.len() - suffix_len] == b'.'
        {
            subdomains.push(&name[..name.len() - suffix_len]);
        }
    }

    subdomains
}

#[cfg(test)]
#[path = "../tests/unit/domains.rs"]
mod unit_tests;
