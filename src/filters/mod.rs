//! Parsed filter records, one variant per filter category the compiler
//! understands.

pub mod cosmetic;
pub mod network;

use thiserror::Error;

use crate::domains::DomainMap;
pub use cosmetic::ElemHideFilter;
pub use network::RequestFilter;

/// Why a filter line was rejected. Rejected filters never reach the
/// compiler; the line simply produces no output rules.
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("filter is empty")]
    Empty,
    #[error("filter could not be parsed")]
    FilterParseError,
    #[error("filter type is not supported")]
    NotSupported,
    #[error("unrecognised filter option")]
    UnrecognisedOption,
    #[error("option is only allowed on exception filters")]
    WhitelistOnlyOption,
    #[error("negating this option does not make sense")]
    NegatedOption,
    #[error("$badfilter is not supported")]
    BadFilter,
    #[error("regular expression filters are not supported")]
    RegexNotSupported,
}

/// One classified filter, as handed to the compiler.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Blocking(RequestFilter),
    Whitelist(RequestFilter),
    ElementHide(ElemHideFilter),
    ElementHideException(ElemHideFilter),
}

impl Filter {
    /// The domain constraint of the filter, whichever variant it is.
    pub fn domains(&self) -> &DomainMap {
        match self {
            Filter::Blocking(filter) | Filter::Whitelist(filter) => &filter.domains,
            Filter::ElementHide(filter) | Filter::ElementHideException(filter) => &filter.domains,
        }
    }
}
