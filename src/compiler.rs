//! The compiler core: collects classified filters into category buckets and
//! turns them into a content blocker rule set.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::content_types::{ContentTypes, HTTP_SCHEME};
use crate::domains::{classify_domains, find_subdomains_in_list};
use crate::filters::{ElemHideFilter, Filter, RequestFilter};
use crate::optimizer::{merge_rules, MergePolicy, AUTO_MERGE_THRESHOLD};
use crate::pattern::{lower_pattern, match_domain, LoweredPattern};
use crate::rules::{
    ignore_previous_fp_documents, CbAction, CbActionType, CbRule, CbTrigger, LoadType, ResourceType,
};
use crate::scheduler::Pacer;

/// Maximum number of comma-joined selectors per `css-display-none` rule.
pub const SELECTOR_LIMIT: usize = 5000;

/// Options controlling rule generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    pub merge: MergePolicy,
}

/// Compiles filters into content blocker rules.
///
/// Filters go in one at a time through [`add_filter`] and are kept in
/// per-category buckets; [`generate_rules`] produces the final ordered rule
/// list. Unsupported and degenerate filters are dropped silently: the only
/// visible effect is that no rule comes out for them.
///
/// [`add_filter`]: CbRuleCompiler::add_filter
/// [`generate_rules`]: CbRuleCompiler::generate_rules
#[derive(Default)]
pub struct CbRuleCompiler {
    request_filters: Vec<RequestFilter>,
    request_exceptions: Vec<RequestFilter>,
    elemhide_filters: Vec<ElemHideFilter>,
    elemhide_exceptions: Vec<RequestFilter>,
    generichide_exceptions: Vec<RequestFilter>,
    genericblock_exceptions: Vec<RequestFilter>,
    elemhide_selector_exceptions: HashSet<String>,
}

impl CbRuleCompiler {
    pub fn new() -> CbRuleCompiler {
        CbRuleCompiler::default()
    }

    /// Files one filter into the buckets it contributes to. An exception
    /// filter can land in several: `$document,elemhide` bypasses request
    /// blocking and element hiding at once.
    pub fn add_filter(&mut self, filter: Filter) {
        match filter {
            Filter::Blocking(filter) => {
                if !filter.sitekeys {
                    self.request_filters.push(filter);
                }
            }
            Filter::Whitelist(filter) => {
                if filter.sitekeys {
                    return;
                }
                let content_type = filter.content_type;
                if content_type.intersects(
                    ContentTypes::DOCUMENT | ContentTypes::WHITELISTABLE_REQUEST_TYPES,
                ) {
                    self.request_exceptions.push(filter.clone());
                }
                if content_type.intersects(ContentTypes::ELEMHIDE) {
                    self.elemhide_exceptions.push(filter.clone());
                }
                if content_type.intersects(ContentTypes::GENERICHIDE) {
                    self.generichide_exceptions.push(filter.clone());
                }
                if content_type.intersects(ContentTypes::GENERICBLOCK) {
                    self.genericblock_exceptions.push(filter);
                }
            }
            Filter::ElementHide(filter) => self.elemhide_filters.push(filter),
            Filter::ElementHideException(filter) => {
                self.elemhide_selector_exceptions.insert(filter.selector);
            }
        }
    }

    /// Generates the rule set: element hiding rules, element hiding
    /// exceptions, blocking rules, then blocking exceptions.
    pub fn generate_rules(&self, options: CompileOptions) -> Vec<CbRule> {
        let mut css_rules = Vec::new();
        let mut css_exception_rules = Vec::new();
        let mut blocking_rules = Vec::new();
        let mut blocking_exception_rules = Vec::new();

        self.generate_css_rules(&mut css_rules);

        // Element hiding exceptions with more than a hostname cannot be
        // expressed through domain lists; they become rules of their own,
        // without resource types.
        for filter in &self.elemhide_exceptions {
            let parsed = lower_request_pattern(filter);
            if !parsed.hostname_only {
                convert_filter_add_rules(
                    &mut css_exception_rules,
                    filter,
                    RuleContext {
                        is_exception: true,
                        action: CbActionType::IgnorePreviousRules,
                        with_resource_types: false,
                        exception_domains: &[],
                    },
                    None,
                );
            }
        }

        // Hostnames whitelisted via $genericblock poke holes into every
        // generic blocking rule.
        let mut generic_block_exception_domains = Vec::new();
        for filter in &self.genericblock_exceptions {
            if let Some(hostname) = lower_request_pattern(filter).hostname {
                generic_block_exception_domains.push(hostname);
            }
        }

        for filter in &self.request_filters {
            let exception_domains: &[String] = if filter.is_generic() {
                &generic_block_exception_domains
            } else {
                &[]
            };
            convert_filter_add_rules(
                &mut blocking_rules,
                filter,
                RuleContext {
                    is_exception: false,
                    action: CbActionType::Block,
                    with_resource_types: true,
                    exception_domains,
                },
                None,
            );
        }

        for filter in &self.request_exceptions {
            convert_filter_add_rules(
                &mut blocking_exception_rules,
                filter,
                RuleContext {
                    is_exception: true,
                    action: CbActionType::IgnorePreviousRules,
                    with_resource_types: true,
                    exception_domains: &[],
                },
                None,
            );
        }

        let mut buckets = [
            css_rules,
            css_exception_rules,
            blocking_rules,
            blocking_exception_rules,
        ];

        // A trigger that kept non-ASCII text cannot be loaded by the engine.
        for bucket in buckets.iter_mut() {
            bucket.retain(CbRule::has_ascii_trigger);
        }

        let total: usize = buckets.iter().map(Vec::len).sum();
        let exhaustive = match options.merge {
            MergePolicy::Off => None,
            MergePolicy::Auto => (total > AUTO_MERGE_THRESHOLD).then_some(false),
            MergePolicy::All => Some(true),
        };
        if let Some(exhaustive) = exhaustive {
            let mut pacer = Pacer::new();
            for bucket in buckets.iter_mut() {
                let rules = std::mem::take(bucket);
                *bucket = merge_rules(rules, exhaustive, &mut pacer);
            }
        }

        let had_blocking_rules = !buckets[2].is_empty();
        let mut rules: Vec<CbRule> = buckets.into_iter().flatten().collect();

        // Over-broad raw patterns must never cancel top-level navigation.
        if had_blocking_rules {
            rules.push(ignore_previous_fp_documents());
        }

        rules
    }

    /// Element hiding: selectors are collated per domain, chunked under the
    /// selector cap, and emitted as `css-display-none` rules.
    fn generate_css_rules(&self, css_rules: &mut Vec<CbRule>) {
        let mut generic_selectors = Vec::new();
        let mut group_of_domain: HashMap<String, usize> = HashMap::new();
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();

        for filter in &self.elemhide_filters {
            let classified = classify_domains(&filter.domains);

            // A single excluded domain disqualifies the filter: the rule
            // format cannot scope one selector out of one domain.
            if !classified.excluded.is_empty() {
                continue;
            }
            if self.elemhide_selector_exceptions.contains(&filter.selector) {
                continue;
            }

            if classified.included.is_empty() {
                generic_selectors.push(filter.selector.clone());
            } else {
                for domain in classified.included {
                    match group_of_domain.get(&domain) {
                        Some(&group) => grouped[group].1.push(filter.selector.clone()),
                        None => {
                            group_of_domain.insert(domain.clone(), grouped.len());
                            grouped.push((domain, vec![filter.selector.clone()]));
                        }
                    }
                }
            }
        }

        // Hostname-only $elemhide exceptions bypass all hiding on their
        // domain; $generichide ones bypass only the generic rules.
        let elemhide_exception_domains = extract_filter_domains(&self.elemhide_exceptions);
        let mut generic_exception_domains = extract_filter_domains(&self.generichide_exceptions);
        for domain in &elemhide_exception_domains {
            if !generic_exception_domains.contains(domain) {
                generic_exception_domains.push(domain.clone());
            }
        }

        add_css_rules(
            css_rules,
            &generic_selectors,
            None,
            &generic_exception_domains,
        );

        for (domain, selectors) in &grouped {
            if elemhide_exception_domains.contains(domain) {
                continue;
            }
            add_css_rules(
                css_rules,
                selectors,
                Some(domain),
                &elemhide_exception_domains,
            );
        }
    }
}

/// How one filter is being converted: which action it produces, whether
/// resource types are attached, and which extra domains are excluded.
#[derive(Clone, Copy)]
struct RuleContext<'a> {
    is_exception: bool,
    action: CbActionType,
    with_resource_types: bool,
    exception_domains: &'a [String],
}

fn lower_request_pattern(filter: &RequestFilter) -> LoweredPattern {
    let schemes = filter.content_type.url_schemes();
    lower_pattern(&filter.pattern, schemes.first().copied().unwrap_or(HTTP_SCHEME))
}

/// Converts one blocking or exception filter into rules, appending them to
/// `rules`. `content_type_override` is set on recursive calls that split
/// the filter across URL scheme families.
fn convert_filter_add_rules(
    rules: &mut Vec<CbRule>,
    filter: &RequestFilter,
    context: RuleContext<'_>,
    content_type_override: Option<ContentTypes>,
) {
    let top_level = content_type_override.is_none();
    let content_type = content_type_override.unwrap_or(filter.content_type);

    // A $document exception on a bare hostname bypasses every earlier rule
    // on that domain; one catch-all rule expresses it exactly.
    if top_level && context.is_exception && content_type.intersects(ContentTypes::DOCUMENT) {
        let parsed = lower_request_pattern(filter);
        if let (Some(hostname), true) = (&parsed.hostname, parsed.hostname_only) {
            rules.push(CbRule::new(
                CbTrigger {
                    url_filter: ".*".to_string(),
                    if_domain: Some(vec![format!("*{}", hostname)]),
                    ..Default::default()
                },
                CbActionType::IgnorePreviousRules,
            ));
            if !content_type.intersects(ContentTypes::WHITELISTABLE_REQUEST_TYPES) {
                return;
            }
        }
    }

    let web_socket = content_type.intersects(ContentTypes::WEBSOCKET);
    let web_rtc = content_type.intersects(ContentTypes::WEBRTC);
    let http = content_type.intersects(ContentTypes::HTTP_REQUEST_TYPES);

    // WebSocket or WebRTC mixed with plain HTTP types (but not covered by
    // the wildcard scheme) must not share one rule: the scheme prefix would
    // quietly widen to request types it was never meant for. Emit one rule
    // per scheme family instead.
    if http && (web_socket || web_rtc) && !(web_socket && web_rtc) {
        if web_socket {
            convert_filter_add_rules(
                rules,
                filter,
                context,
                Some(content_type & !(ContentTypes::WEBRTC | ContentTypes::HTTP_REQUEST_TYPES)),
            );
        }
        if web_rtc {
            convert_filter_add_rules(
                rules,
                filter,
                context,
                Some(content_type & !(ContentTypes::WEBSOCKET | ContentTypes::HTTP_REQUEST_TYPES)),
            );
        }
        convert_filter_add_rules(
            rules,
            filter,
            context,
            Some(content_type & !(ContentTypes::WEBSOCKET | ContentTypes::WEBRTC)),
        );
        return;
    }

    let url_schemes = content_type.url_schemes();
    let url_scheme = url_schemes.first().copied().unwrap_or(HTTP_SCHEME);
    let parsed = lower_pattern(&filter.pattern, url_scheme);

    let mut trigger = CbTrigger {
        url_filter: parsed.regexp,
        ..Default::default()
    };

    // Anchor the expression at the URL start. `||` and `|` lowerings are
    // anchored already; an explicit scheme only needs the anchor itself;
    // everything else gets scheme plus wildcard prepended.
    let scheme_substitutable;
    if trigger.url_filter.starts_with('^') {
        scheme_substitutable = trigger.url_filter[1..].starts_with(url_scheme);
    } else if starts_with_literal_scheme(&trigger.url_filter) {
        trigger.url_filter.insert(0, '^');
        scheme_substitutable = false;
    } else {
        trigger.url_filter = format!("^{}.*{}", url_scheme, trigger.url_filter);
        scheme_substitutable = true;
    }

    // A hostname is matched lowercased; the whole expression may follow
    // suit unless the path part contains letters.
    if parsed.case_insensitive_safe && !filter.match_case {
        trigger.url_filter = trigger.url_filter.to_lowercase();
    }
    if parsed.case_insensitive_safe || filter.match_case {
        trigger.url_filter_is_case_sensitive = Some(true);
    }

    let mut classified = classify_domains(&filter.domains);
    classified
        .excluded
        .extend(context.exception_domains.iter().cloned());

    if context.with_resource_types {
        let mut resource_types = content_type.resource_types();

        // The format cannot tell subdocument loads apart from top-level
        // documents. A pattern with no hostname part would block whole page
        // loads, so it loses the document type.
        if !context.is_exception && parsed.hostname.is_none() {
            resource_types.retain(|resource_type| *resource_type != ResourceType::Document);
        }

        if resource_types.is_empty() {
            return;
        }
        trigger.resource_type = Some(resource_types);
    }

    if let Some(third_party) = filter.third_party {
        trigger.load_type = Some(vec![if third_party {
            LoadType::ThirdParty
        } else {
            LoadType::FirstParty
        }]);
    }

    if !classified.included.is_empty() {
        let mut if_domain = Vec::new();
        for name in &classified.included {
            // A blocking filter excluding subdomains must pin the bare
            // domain (plus www) instead of using the subdomain wildcard.
            let not_subdomains = if context.is_exception {
                Vec::new()
            } else {
                find_subdomains_in_list(name, &classified.excluded)
            };
            if !not_subdomains.is_empty() {
                if_domain.push(name.clone());
                if !not_subdomains.contains(&"www") {
                    if_domain.push(format!("www.{}", name));
                }
            } else {
                if_domain.push(format!("*{}", name));
            }
        }
        trigger.if_domain = Some(if_domain);
    } else if !classified.excluded.is_empty() {
        trigger.unless_domain = Some(
            classified
                .excluded
                .iter()
                .map(|name| format!("*{}", name))
                .collect(),
        );
    } else if !context.is_exception
        && content_type.intersects(ContentTypes::SUBDOCUMENT)
        && parsed.hostname.is_some()
    {
        // Keep blocking subdocuments from this host, but let top-level
        // navigation to it through.
        trigger.unless_top_url = Some(vec![trigger.url_filter.clone()]);
        if trigger.url_filter_is_case_sensitive == Some(true) {
            trigger.top_url_filter_is_case_sensitive = Some(true);
        }
    }

    let rule = CbRule {
        trigger,
        action: CbAction {
            action_type: context.action,
            selector: None,
        },
    };
    rules.push(rule.clone());

    // Further scheme patterns of the same family become rule copies with
    // the scheme prefix swapped out.
    if scheme_substitutable {
        let anchored_scheme = format!("^{}", url_scheme);
        if let Some(rest) = rule.trigger.url_filter.strip_prefix(&anchored_scheme) {
            for scheme in url_schemes.iter().skip(1) {
                let mut copy = rule.clone();
                copy.trigger.url_filter = format!("^{}{}", scheme, rest);
                if copy.trigger.unless_top_url.is_some() {
                    copy.trigger.unless_top_url = Some(vec![copy.trigger.url_filter.clone()]);
                }
                rules.push(copy);
            }
        }
    }
}

/// Hostnames of all hostname-only patterns in `filters`, deduplicated,
/// first-seen order.
fn extract_filter_domains(filters: &[RequestFilter]) -> Vec<String> {
    let mut domains = Vec::new();
    for filter in filters {
        let parsed = lower_request_pattern(filter);
        if let (Some(hostname), true) = (parsed.hostname, parsed.hostname_only) {
            if !domains.contains(&hostname) {
                domains.push(hostname);
            }
        }
    }
    domains
}

/// Emits the `css-display-none` rules for one selector group, chunked
/// under [`SELECTOR_LIMIT`].
fn add_css_rules(
    rules: &mut Vec<CbRule>,
    selectors: &[String],
    domain: Option<&str>,
    exception_domains: &[String],
) {
    let unless_domain: Vec<String> = exception_domains
        .iter()
        .filter(|name| match domain {
            // Generic rules carry every exception domain; domain rules only
            // those underneath their own domain.
            None => true,
            Some(domain) => is_subdomain_of(name.as_str(), domain),
        })
        .map(|name| format!("*{}", name))
        .collect();

    for chunk in selectors.chunks(SELECTOR_LIMIT) {
        let selector = convert_id_selectors_to_attribute_selectors(&chunk.iter().join(", "));

        let mut trigger = CbTrigger {
            url_filter: match_domain(domain),
            url_filter_is_case_sensitive: Some(true),
            ..Default::default()
        };
        if !unless_domain.is_empty() {
            trigger.unless_domain = Some(unless_domain.clone());
        }

        rules.push(CbRule {
            trigger,
            action: CbAction {
                action_type: CbActionType::CssDisplayNone,
                selector: Some(selector),
            },
        });
    }
}

/// Scheme prefixes a pattern can carry literally, one per scheme family the
/// emitter generates. A lowered expression starting with one of these is
/// anchored with a bare `^`; prepending a scheme pattern would duplicate
/// the scheme and the rule could never match.
const LITERAL_SCHEMES: [&str; 8] = [
    "https://", "http://", "wss://", "ws://", "stuns:", "stun:", "turns:", "turn:",
];

fn starts_with_literal_scheme(url_filter: &str) -> bool {
    LITERAL_SCHEMES.iter().any(|scheme| {
        url_filter
            .get(..scheme.len())
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

fn is_subdomain_of(name: &str, domain: &str) -> bool {
    name.len() > domain.len() + 1
        && name.ends_with(domain)
        && name.as_bytes()[name.len() - domain.len() - 1] == b'.'
}

/// Rewrites `#id` selector parts into `[id=id]` attribute form, because the
/// target engine case-folds ID selectors. The scan skips quoted sections
/// and escaped characters; an ID run covers `[-_0-9A-Za-z]` and any
/// non-ASCII byte.
fn convert_id_selectors_to_attribute_selectors(selector: &str) -> String {
    let bytes = selector.as_bytes();

    // ID runs start at an ASCII `#` and end before an ASCII byte, so every
    // recorded boundary is a character boundary.
    let mut positions: Vec<(usize, usize)> = Vec::new();
    let mut quote: Option<u8> = None;
    let mut start: Option<usize> = None;

    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte == b'\\' {
            i += 2;
            continue;
        }
        match quote {
            Some(q) if byte == q => quote = None,
            Some(_) => {}
            None => {
                if byte == b'"' || byte == b'\'' {
                    quote = Some(byte);
                } else if let Some(run_start) = start {
                    if !(byte == b'-' || byte == b'_' || byte.is_ascii_alphanumeric() || byte >= 0x80)
                    {
                        positions.push((run_start, i));
                        start = None;
                    }
                } else if byte == b'#' {
                    start = Some(i);
                }
            }
        }
        i += 1;
    }
    if let Some(run_start) = start {
        positions.push((run_start, bytes.len()));
    }

    let mut converted = String::with_capacity(selector.len());
    let mut last = 0;
    for (run_start, run_end) in positions {
        converted.push_str(&selector[last..run_start]);
        converted.push_str("[id=");
        converted.push_str(&selector[run_start + 1..run_end]);
        converted.push(']');
        last = run_end;
    }
    converted.push_str(&selector[last..]);
    converted
}

#[cfg(test)]
#[path = "../tests/unit/compiler.rs"]
mod unit_tests;
