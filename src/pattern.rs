//! Lowers filter patterns into the target engine's regular expression
//! dialect.
//!
//! The filter pattern language is not a regular expression: `*` is a
//! wildcard, `^` a separator placeholder, `|` an anchor and `||` a hostname
//! anchor. Lowering rewrites those operators, extracts and punycodes the
//! hostname part, and decides whether the produced expression can safely be
//! matched in lowercase.

use crate::content_types::HTTP_SCHEME;

/// Matches any character that may not appear inside a URL component: every
/// ASCII byte outside `-`, `_`, `.`, `%` and the alphanumerics. Spelled as
/// hex ranges with lowercase digits so that lowercasing a generated
/// expression leaves the class intact.
const SEPARATOR_CLASS: &str =
    "[\\x00-\\x24\\x26-\\x2c\\x2f\\x3a-\\x40\\x5b-\\x5e\\x60\\x7b-\\x7f]";

/// The result of lowering one filter pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredPattern {
    /// Regular expression fragment in the target dialect.
    pub regexp: String,
    /// True when the expression matches a lowercased URL without loss:
    /// everything after the hostname anchor is caseless.
    pub case_insensitive_safe: bool,
    /// Hostname extracted from a `||` or `://` anchor, already lowercased
    /// and punycoded.
    pub hostname: Option<String>,
    /// True when the pattern consists of nothing but the hostname, plus at
    /// most one trailing anchor or separator.
    pub hostname_only: bool,
}

/// Character span of the hostname part of a pattern, in character (not
/// byte) indices.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HostnameSpan {
    start: usize,
    end: usize,
}

/// First pass: locate the hostname span, if the pattern has one.
///
/// The span begins after a leading `||` or after the first `://`, and runs
/// until the first `*`, `^`, `?`, `/` or `|`, or the end of the pattern.
fn find_hostname_span(chars: &[char]) -> Option<HostnameSpan> {
    let start = if chars.len() >= 2 && chars[0] == '|' && chars[1] == '|' {
        Some(2)
    } else {
        chars
            .windows(3)
            .position(|w| w == [':', '/', '/'])
            .map(|p| p + 3)
    };

    start.map(|start| {
        let end = chars[start..]
            .iter()
            .position(|c| matches!(c, '*' | '^' | '?' | '/' | '|'))
            .map_or(chars.len(), |p| start + p);
        HostnameSpan { start, end }
    })
}

/// Escapes everything the target regular expression dialect treats
/// specially.
pub(crate) fn escape_regexp(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '.' | '*' | '+' | '?' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '[' | ']' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds the `url-filter` expression matching a whole domain, as used by
/// element hiding rules.
pub(crate) fn match_domain(domain: Option<&str>) -> String {
    match domain {
        None => format!("^{}", HTTP_SCHEME),
        Some(domain) => format!(
            "^{}([^/:]*\\.)?{}[/:]",
            HTTP_SCHEME,
            escape_regexp(domain).to_lowercase()
        ),
    }
}

/// Punycodes one hostname, leaving it untouched if conversion fails. A
/// hostname that stays non-ASCII is caught by the final rule validation.
pub(crate) fn to_ascii_hostname(host: &str) -> String {
    idna::domain_to_ascii(host).unwrap_or_else(|_| host.to_string())
}

/// Percent-encodes a non-ASCII character, one `%XX` per UTF-8 byte.
fn push_percent_encoded(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    for byte in c.encode_utf8(&mut buf).bytes() {
        out.push_str(&format!("%{:02X}", byte));
    }
}

/// Second pass: lower `pattern` into a regular expression fragment against
/// the given primary URL scheme pattern.
///
/// Iteration is by Unicode scalar value, so that anchor position checks
/// (first character, last character) see multi-byte characters as single
/// units.
pub fn lower_pattern(pattern: &str, url_scheme: &str) -> LoweredPattern {
    let chars: Vec<char> = pattern.chars().collect();
    let span = find_hostname_span(&chars);

    let mut regexp = String::new();
    let mut hostname = None;
    let mut hostname_only = false;
    let mut case_insensitive_safe = false;
    let mut hostname_finished = false;

    let last_index = chars.len().saturating_sub(1);
    let mut i = 0;

    while i < chars.len() {
        if let Some(sp) = span {
            if i == sp.start && !hostname_finished {
                if sp.end > sp.start {
                    let raw: String = chars[sp.start..sp.end].iter().collect();
                    let host = to_ascii_hostname(&raw.to_lowercase());
                    regexp.push_str(&escape_regexp(&host));
                    hostname_only = sp.end + 1 >= chars.len();
                    hostname = Some(host);
                }
                hostname_finished = true;
                i = sp.end;
                if i >= chars.len() {
                    break;
                }
                // The terminator character itself still gets lowered below.
            }
        }

        let c = chars[i];
        match c {
            '*' => {
                // Leading, trailing and repeated wildcards are meaningless
                // in an unanchored expression.
                if !regexp.is_empty() && i < last_index && chars[i + 1] != '*' {
                    regexp.push_str(".*");
                }
            }
            '^' => {
                if i == 0 {
                    regexp.push('^');
                    regexp.push_str(url_scheme);
                    regexp.push_str("(.*");
                    regexp.push_str(SEPARATOR_CLASS);
                    regexp.push_str(")?");
                } else if i == last_index {
                    regexp.push('(');
                    regexp.push_str(SEPARATOR_CLASS);
                    regexp.push_str(".*)?$");
                } else {
                    regexp.push_str(SEPARATOR_CLASS);
                }
            }
            '|' => {
                if i == 0 {
                    regexp.push('^');
                } else if i == last_index {
                    regexp.push('$');
                } else if i == 1 && chars[0] == '|' {
                    // Hostname anchor: the URL scheme plus any chain of
                    // subdomain labels.
                    regexp.push_str(url_scheme);
                    regexp.push_str("([^/]+\\.)?");
                    case_insensitive_safe = true;
                } else {
                    regexp.push_str("\\|");
                }
            }
            '/' => {
                if !hostname_finished && i >= 2 && chars[i - 1] == '/' && chars[i - 2] == ':' {
                    // Crossing an explicit scheme prefix; the hostname that
                    // follows is matched in lowercase.
                    case_insensitive_safe = true;
                }
                regexp.push('/');
            }
            '.' | '+' | '?' | '$' | '{' | '}' | '(' | ')' | '[' | ']' | '\\' => {
                regexp.push('\\');
                regexp.push(c);
            }
            _ => {
                if hostname_finished && c.is_ascii_alphabetic() {
                    // A letter in the path part must keep its case.
                    case_insensitive_safe = false;
                }
                if (c as u32) > 127 {
                    push_percent_encoded(&mut regexp, c);
                } else {
                    regexp.push(c);
                }
            }
        }

        i += 1;
    }

    LoweredPattern {
        regexp,
        case_insensitive_safe,
        hostname,
        hostname_only,
    }
}

#[cfg(test)]
#[path = "../tests/unit/pattern.rs"]
mod unit_tests;
