//! Filter list input surface: line classification and the [`FilterSet`]
//! collecting parsed filters for compilation.

use crate::compiler::{CbRuleCompiler, CompileOptions};
use crate::filters::{cosmetic::ElemHideFilter, network::RequestFilter, Filter, FilterError};
use crate::rules::CbRule;

#[derive(Debug, PartialEq)]
enum LineType {
    Ignored,
    ElementHiding { sharp_index: usize },
    Network,
}

/// Pre-classifies one trimmed line before the specific parsers run.
fn classify_line(filter: &str) -> LineType {
    // Comments, section headers, hosts-file style comments.
    if filter.len() == 1
        || filter.starts_with('!')
        || filter.starts_with('[')
        || (filter.starts_with('#') && filter[1..].starts_with(char::is_whitespace))
    {
        return LineType::Ignored;
    }

    if filter.starts_with('|') || filter.starts_with("@@|") {
        return LineType::Network;
    }

    // Adguard HTML filtering.
    if filter.contains("$$") {
        return LineType::Ignored;
    }

    if let Some(sharp_index) = filter.find('#') {
        let after_sharp = &filter[sharp_index + 1..];

        // Snippets, emulation and the Adguard variants have no
        // content-blocker counterpart.
        if after_sharp.starts_with("@$#")
            || after_sharp.starts_with("@%#")
            || after_sharp.starts_with("@?#")
            || after_sharp.starts_with("$#")
            || after_sharp.starts_with("%#")
            || after_sharp.starts_with("?#")
        {
            return LineType::Ignored;
        }
        if after_sharp.starts_with('#') || after_sharp.starts_with("@#") {
            return LineType::ElementHiding { sharp_index };
        }
    }

    LineType::Network
}

/// Parses one line of a filter list into a [`Filter`] record.
pub fn parse_filter(line: &str) -> Result<Filter, FilterError> {
    let filter = line.trim();
    if filter.is_empty() {
        return Err(FilterError::Empty);
    }

    match classify_line(filter) {
        LineType::Ignored => Err(FilterError::NotSupported),
        LineType::ElementHiding { sharp_index } => ElemHideFilter::parse(filter, sharp_index),
        LineType::Network => RequestFilter::parse(filter),
    }
}

/// An ordered collection of filters, fed line by line and compiled in one
/// go. Lines that cannot be represented are dropped silently, matching the
/// compiler's error model.
#[derive(Default)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new() -> FilterSet {
        FilterSet::default()
    }

    /// Parses and adds one line. The error reports why a line was dropped;
    /// callers that only care about the output may ignore it.
    pub fn add_filter(&mut self, line: &str) -> Result<(), FilterError> {
        let filter = parse_filter(line)?;
        self.filters.push(filter);
        Ok(())
    }

    /// Adds every line of `lines`, dropping unsupported ones.
    pub fn add_filters<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) {
        for line in lines {
            let _ = self.add_filter(line);
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Compiles the collected filters into a content blocker rule list.
    pub fn into_content_blocking(self, options: CompileOptions) -> Vec<CbRule> {
        let mut compiler = CbRuleCompiler::new();
        for filter in self.filters {
            compiler.add_filter(filter);
        }
        compiler.generate_rules(options)
    }
}

#[cfg(test)]
#[path = "../tests/unit/lists.rs"]
mod unit_tests;
