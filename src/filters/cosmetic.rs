//! Parsing of element hiding filters (`##`) and their exceptions (`#@#`).

use crate::domains::DomainMap;
use crate::filters::{Filter, FilterError};

/// A parsed element hiding filter or element hiding exception.
#[derive(Debug, Clone, PartialEq)]
pub struct ElemHideFilter {
    /// The CSS selector to hide, exactly as written in the filter.
    pub selector: String,
    /// Domain prefix of the filter, e.g. `example.com,~ads.example.com`.
    pub domains: DomainMap,
}

impl ElemHideFilter {
    /// Parses `line` into a [`Filter::ElementHide`] or
    /// [`Filter::ElementHideException`] record. `sharp_index` is the
    /// position of the `#` introducing the separator, as found during line
    /// classification.
    pub fn parse(line: &str, sharp_index: usize) -> Result<Filter, FilterError> {
        let after_sharp = &line[sharp_index + 1..];

        let (is_exception, suffix_start) = if after_sharp.starts_with('#') {
            (false, sharp_index + 2)
        } else if after_sharp.starts_with("@#") {
            (true, sharp_index + 3)
        } else {
            return Err(FilterError::FilterParseError);
        };

        let selector = line[suffix_start..].trim();
        if selector.is_empty() {
            return Err(FilterError::FilterParseError);
        }

        // Emulation selectors cannot run in a declarative rule set.
        if selector.contains(":-abp-") {
            return Err(FilterError::NotSupported);
        }

        let domains = if sharp_index > 0 {
            DomainMap::parse(&line[..sharp_index], ',')
        } else {
            DomainMap::unconstrained()
        };

        let filter = ElemHideFilter {
            selector: selector.to_string(),
            domains,
        };

        if is_exception {
            Ok(Filter::ElementHideException(filter))
        } else {
            Ok(Filter::ElementHide(filter))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/cosmetic.rs"]
mod unit_tests;
