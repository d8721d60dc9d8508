//! `ab2cb` converts declarative ad-blocking filter lists (the line-oriented
//! Adblock Plus / EasyList syntax) into WebKit content blocker JSON rule
//! sets.
//!
//! The pipeline is one-directional: filter lines are parsed into classified
//! records ([`lists`], [`filters`]), patterns are lowered into the target
//! regular expression dialect with hostname extraction and punycoding
//! ([`pattern`], [`domains`]), rules are emitted per filter category
//! ([`compiler`]) and finally merged and pruned to fit the engine's size
//! budget ([`optimizer`]).
//!
//! ```
//! use ab2cb::compiler::CompileOptions;
//! use ab2cb::FilterSet;
//!
//! let mut filters = FilterSet::new();
//! filters.add_filters(["||example.com^$third-party", "##.ad-banner"]);
//! let rules = filters.into_content_blocking(CompileOptions::default());
//! assert_eq!(rules.len(), 3);
//! ```

#[macro_use]
extern crate bitflags;

pub mod compiler;
pub mod content_types;
pub mod domains;
pub mod filters;
pub mod lists;
pub mod optimizer;
pub mod pattern;
pub mod rules;
pub mod scheduler;

pub use compiler::{CbRuleCompiler, CompileOptions};
pub use lists::FilterSet;
pub use optimizer::MergePolicy;
pub use rules::{CbRule, CbTrigger};
