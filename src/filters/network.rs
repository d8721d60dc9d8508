//! Parsing of blocking and exception filters: anchors, pattern span and the
//! `$option` list.

use crate::content_types::ContentTypes;
use crate::domains::DomainMap;
use crate::filters::{Filter, FilterError};

/// A parsed blocking or exception filter. Which of the two it is lives in
/// the [`Filter`] variant wrapping it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFilter {
    /// The URL pattern, still in filter syntax. May be empty for filters
    /// that consist of options only.
    pub pattern: String,
    pub content_type: ContentTypes,
    pub match_case: bool,
    /// `Some(true)` restricts to third-party requests, `Some(false)` to
    /// first-party ones, `None` matches both.
    pub third_party: Option<bool>,
    pub domains: DomainMap,
    /// Filters restricted by `$sitekey` cannot be expressed in the target
    /// format; the compiler drops them.
    pub sitekeys: bool,
}

impl RequestFilter {
    /// Parses `line` into a [`Filter::Blocking`] or [`Filter::Whitelist`]
    /// record.
    pub fn parse(line: &str) -> Result<Filter, FilterError> {
        let mut filter_index_start = 0;
        let mut filter_index_end = line.len();

        let is_exception = line.starts_with("@@");
        if is_exception {
            filter_index_start += 2;
        }

        let mut content_type_positive = ContentTypes::NONE;
        let mut content_type_negative = ContentTypes::DEFAULT_TYPES;
        let mut match_case = false;
        let mut third_party = None;
        let mut domains = DomainMap::unconstrained();
        let mut sitekeys = false;

        // filter$options — the options list follows the last `$`.
        if let Some(options_index) = line.rfind('$') {
            if options_index >= filter_index_start && options_index + 1 < line.len() {
                filter_index_end = options_index;

                for raw_option in line[options_index + 1..].split(',') {
                    let negation = raw_option.starts_with('~');
                    let option = raw_option.trim_start_matches('~');
                    let (option, value) = match option.split_once('=') {
                        Some((option, value)) => (option, value),
                        None => (option, ""),
                    };

                    match (option, negation) {
                        ("domain", _) => domains = DomainMap::parse(value, '|'),
                        ("sitekey", _) => sitekeys = true,
                        ("match-case", true) => return Err(FilterError::NegatedOption),
                        ("match-case", false) => match_case = true,
                        ("third-party", negated) => third_party = Some(!negated),
                        ("first-party", negated) => third_party = Some(negated),
                        // Recognised but without a counterpart in the
                        // target format's trigger model.
                        ("important", false) | ("collapse", _) => {}
                        ("important", true) => return Err(FilterError::NegatedOption),
                        ("badfilter", _) => return Err(FilterError::BadFilter),
                        ("csp", _) | ("rewrite", _) | ("redirect", _) | ("redirect-rule", _)
                        | ("removeparam", _) => return Err(FilterError::NotSupported),
                        _ => {
                            let option_type = ContentTypes::from_option(option)
                                .ok_or(FilterError::UnrecognisedOption)?;

                            if option_type.intersects(
                                ContentTypes::ELEMHIDE
                                    | ContentTypes::GENERICHIDE
                                    | ContentTypes::GENERICBLOCK,
                            ) && !is_exception
                            {
                                return Err(FilterError::WhitelistOnlyOption);
                            }

                            if negation {
                                content_type_negative.remove(option_type);
                            } else {
                                content_type_positive.insert(option_type);
                            }
                        }
                    }
                }
            }
        }

        let content_type = if content_type_positive.is_empty() {
            content_type_negative
        } else if content_type_negative == ContentTypes::DEFAULT_TYPES {
            content_type_positive
        } else {
            content_type_positive & content_type_negative
        };

        let pattern = &line[filter_index_start..filter_index_end];

        // Literal regular expression filters cannot be lowered.
        if pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/') {
            return Err(FilterError::RegexNotSupported);
        }

        let filter = RequestFilter {
            pattern: pattern.to_string(),
            content_type,
            match_case,
            third_party,
            domains,
            sitekeys,
        };

        if is_exception {
            Ok(Filter::Whitelist(filter))
        } else {
            Ok(Filter::Blocking(filter))
        }
    }

    /// A filter is generic when no domain is explicitly included.
    pub fn is_generic(&self) -> bool {
        !self.sitekeys && self.domains.is_generic()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/network.rs"]
mod unit_tests;
