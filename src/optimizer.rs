//! Rule set optimizer.
//!
//! Runs per rule category and never merges across categories. Three passes:
//!
//! 1. prefix redundancy elimination on `url-filter`: a pattern that merely
//!    extends another pattern of the same group matches a subset of it and
//!    is dropped;
//! 2. approximate merging on `url-filter`: patterns one edit apart are
//!    fused into a single expression using alternation and optional groups;
//! 3. array field merging: rules identical up to `resource-type` or
//!    `if-domain` are collapsed into one rule carrying the union.
//!
//! Rules are never mutated while being compared; bookkeeping lives in side
//! tables indexed by rule position, and dropped rules are filtered out at
//! the end.

use std::collections::HashMap;

use crate::rules::CbRule;
use crate::scheduler::Pacer;

/// How far ahead of a rule the heuristic mode looks for merge candidates.
/// Close matches overwhelmingly come from neighbouring lines of the filter
/// list, so a bounded window keeps the pass near-linear.
const HEURISTIC_RANGE: usize = 1000;

/// When to run the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Never optimize.
    Off,
    /// Optimize with the heuristic candidate window, but only when the rule
    /// set is large enough for size to matter.
    #[default]
    Auto,
    /// Always optimize, considering every later rule as a candidate.
    All,
}

/// Rule count above which `MergePolicy::Auto` starts optimizing.
pub const AUTO_MERGE_THRESHOLD: usize = 50_000;

/// Optimizes one rule category, yielding to `pacer` between groups.
pub fn merge_rules(mut rules: Vec<CbRule>, exhaustive: bool, pacer: &mut Pacer) -> Vec<CbRule> {
    let mut dropped = vec![false; rules.len()];

    for group in group_by_mergeable_field(&rules, &dropped, MergeableField::UrlFilter) {
        eliminate_redundant_by_url_filter(&rules, &group, &mut dropped);
        pacer.tick();
        merge_close_matches(&mut rules, &group, &mut dropped, exhaustive);
        pacer.tick();
    }

    for field in [MergeableField::ResourceType, MergeableField::IfDomain] {
        for group in group_by_mergeable_field(&rules, &dropped, field) {
            merge_array_field(&mut rules, &group, &mut dropped, field);
            pacer.tick();
        }
    }

    rules
        .into_iter()
        .zip(dropped)
        .filter(|(_, dropped)| !dropped)
        .map(|(rule, _)| rule)
        .collect()
}

/// The single field a grouping pass ignores when testing rule equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeableField {
    UrlFilter,
    ResourceType,
    IfDomain,
}

/// Groups rules that are identical except for `field`. Groups preserve
/// first-seen order and singleton groups are discarded. For the array
/// fields, rules without the field are left out entirely: absence means
/// "unrestricted", which must not be unioned with a restriction.
fn group_by_mergeable_field(
    rules: &[CbRule],
    dropped: &[bool],
    field: MergeableField,
) -> Vec<Vec<usize>> {
    let mut group_of_key: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (index, rule) in rules.iter().enumerate() {
        if dropped[index] {
            continue;
        }

        let mut key_rule = rule.clone();
        match field {
            MergeableField::UrlFilter => key_rule.trigger.url_filter = String::new(),
            MergeableField::ResourceType => {
                if rule.trigger.resource_type.is_none() {
                    continue;
                }
                key_rule.trigger.resource_type = None;
            }
            MergeableField::IfDomain => {
                if rule.trigger.if_domain.is_none() {
                    continue;
                }
                key_rule.trigger.if_domain = None;
            }
        }

        let key =
            serde_json::to_string(&key_rule).expect("rule records always serialize");
        match group_of_key.get(&key) {
            Some(&group) => groups[group].push(index),
            None => {
                group_of_key.insert(key, groups.len());
                groups.push(vec![index]);
            }
        }
    }

    groups.retain(|group| group.len() > 1);
    groups
}

/// Pass 1: within a group, drop every rule whose `url-filter` extends
/// another rule's `url-filter`. The shorter pattern is unanchored at the
/// end, so it already matches everything the longer one would.
///
/// Sorting the group makes every prefix adjacent to its extensions, so one
/// scan against the last survivor finds all of them.
fn eliminate_redundant_by_url_filter(rules: &[CbRule], group: &[usize], dropped: &mut [bool]) {
    let mut order = group.to_vec();
    order.sort_by(|a, b| {
        rules[*a]
            .trigger
            .url_filter
            .cmp(&rules[*b].trigger.url_filter)
    });

    let mut survivor: Option<usize> = None;
    for &index in &order {
        if let Some(kept) = survivor {
            if rules[index]
                .trigger
                .url_filter
                .starts_with(&rules[kept].trigger.url_filter)
            {
                dropped[index] = true;
                continue;
            }
        }
        survivor = Some(index);
    }
}

/// A single edit transforming a base string into another string.
#[derive(Debug, Clone, PartialEq)]
enum Edit {
    /// Base byte at `index` replaced by `byte`.
    Substitute { index: usize, byte: u8 },
    /// Base byte at `index` missing from the other string.
    Delete { index: usize },
    /// The other string carries `byte` inserted before base index `index`.
    Insert { index: usize, byte: u8 },
    /// The other string carries `bytes` inserted before base index `index`.
    InsertRange { index: usize, bytes: Vec<u8> },
    /// Base bytes `[index, index + len)` missing from the other string.
    DeleteRange { index: usize, len: usize },
}

/// Regular expression metacharacters that must not appear in the differing
/// span of a close match: rewriting around them would corrupt the pattern.
fn is_meta(byte: u8) -> bool {
    matches!(
        byte,
        b'.' | b'+' | b'$' | b'?' | b'{' | b'}' | b'(' | b')' | b'[' | b']' | b'\\'
    )
}

/// Tests whether `other` can be produced from `base` by exactly one edit,
/// and returns that edit. Multi-byte range edits are only considered when
/// `single_byte_only` is false.
///
/// URL filters are ASCII by the time the optimizer runs, so byte indices
/// are character indices.
fn close_match(base: &str, other: &str, single_byte_only: bool) -> Option<Edit> {
    let s = base.as_bytes();
    let t = other.as_bytes();

    let prefix = s.iter().zip(t).take_while(|(a, b)| a == b).count();
    let max_suffix = s.len().min(t.len()) - prefix;
    let mut suffix = 0;
    while suffix < max_suffix && s[s.len() - 1 - suffix] == t[t.len() - 1 - suffix] {
        suffix += 1;
    }

    let ds = &s[prefix..s.len() - suffix];
    let dt = &t[prefix..t.len() - suffix];

    if ds.iter().chain(dt).copied().any(is_meta) {
        return None;
    }

    match (ds.len(), dt.len()) {
        (1, 1) => Some(Edit::Substitute {
            index: prefix,
            byte: dt[0],
        }),
        (1, 0) => Some(Edit::Delete { index: prefix }),
        (0, 1) => Some(Edit::Insert {
            index: prefix,
            byte: dt[0],
        }),
        (len, 0) if len > 1 && !single_byte_only => Some(Edit::DeleteRange { index: prefix, len }),
        (0, _) if dt.len() > 1 && !single_byte_only => Some(Edit::InsertRange {
            index: prefix,
            bytes: dt.to_vec(),
        }),
        _ => None,
    }
}

/// Matches found for one base rule: single-byte matches bucketed by edit
/// position, plus at most one multi-byte range match.
#[derive(Default)]
struct CandidateMatches {
    /// Edits consuming the base byte at the keyed index.
    at_byte: HashMap<usize, BytePosition>,
    /// Insertions in front of the keyed base index.
    at_gap: HashMap<usize, GapPosition>,
    multi: Option<(usize, Edit)>,
}

#[derive(Default)]
struct BytePosition {
    substitutions: Vec<(usize, u8)>,
    deletions: Vec<usize>,
}

#[derive(Default)]
struct GapPosition {
    insertions: Vec<(usize, u8)>,
}

impl CandidateMatches {
    fn largest_set(&self) -> usize {
        let at_byte = self
            .at_byte
            .values()
            .map(|p| p.substitutions.len() + p.deletions.len())
            .max()
            .unwrap_or(0);
        let at_gap = self
            .at_gap
            .values()
            .map(|p| p.insertions.len())
            .max()
            .unwrap_or(0);
        at_byte.max(at_gap)
    }
}

/// Pass 2: fuse close-matching `url-filter`s within a group.
///
/// Candidates with the largest single-position match sets merge first, so
/// that wide alternations win over many narrow ones. Every rule takes part
/// in at most one merger per pass: once consumed, it is skipped both as a
/// base and as a participant.
fn merge_close_matches(
    rules: &mut [CbRule],
    group: &[usize],
    dropped: &mut [bool],
    exhaustive: bool,
) {
    let live: Vec<usize> = group
        .iter()
        .copied()
        .filter(|&index| !dropped[index])
        .collect();

    // Gather matches rule by rule, looking forward only.
    let mut candidates: Vec<(usize, CandidateMatches)> = Vec::with_capacity(live.len());
    for (position, &index) in live.iter().enumerate() {
        let mut matches = CandidateMatches::default();
        let limit = if exhaustive {
            live.len()
        } else {
            live.len().min(position + 1 + HEURISTIC_RANGE)
        };

        for &other in &live[position + 1..limit] {
            let single_only = matches.multi.is_some();
            let edit = close_match(
                &rules[index].trigger.url_filter,
                &rules[other].trigger.url_filter,
                single_only,
            );
            match edit {
                Some(Edit::Substitute { index: at, byte }) => matches
                    .at_byte
                    .entry(at)
                    .or_default()
                    .substitutions
                    .push((other, byte)),
                Some(Edit::Delete { index: at }) => {
                    matches.at_byte.entry(at).or_default().deletions.push(other)
                }
                Some(Edit::Insert { index: at, byte }) => matches
                    .at_gap
                    .entry(at)
                    .or_default()
                    .insertions
                    .push((other, byte)),
                Some(edit @ (Edit::InsertRange { .. } | Edit::DeleteRange { .. })) => {
                    matches.multi = Some((other, edit));
                }
                None => {}
            }
        }
        candidates.push((index, matches));
    }

    // Stable sort keeps iteration order among equals.
    candidates.sort_by(|a, b| b.1.largest_set().cmp(&a.1.largest_set()));

    let mut taken = vec![false; rules.len()];

    for (base, matches) in candidates {
        if taken[base] || dropped[base] {
            continue;
        }

        if let Some(fused) = fuse_best_position(rules, base, &matches, &taken, dropped) {
            for &participant in &fused.participants {
                taken[participant] = true;
                dropped[participant] = true;
            }
            taken[base] = true;
            rules[base].trigger.url_filter = fused.url_filter;
        }
    }
}

struct Fusion {
    url_filter: String,
    participants: Vec<usize>,
}

/// Picks the edit position with the most still-unconsumed participants and
/// builds the fused expression for it. Falls back to the multi-byte match
/// when no single-byte participant is left.
fn fuse_best_position(
    rules: &[CbRule],
    base: usize,
    matches: &CandidateMatches,
    taken: &[bool],
    dropped: &[bool],
) -> Option<Fusion> {
    let usable = |other: &usize| !taken[*other] && !dropped[*other];
    let base_filter = rules[base].trigger.url_filter.as_bytes();

    // Best position by participant count; byte positions win ties over
    // gaps, and lower indices over higher ones, purely for determinism.
    let mut best: Option<(usize, Fusion)> = None;

    let mut byte_positions: Vec<usize> = matches.at_byte.keys().copied().collect();
    byte_positions.sort_unstable();
    for at in byte_positions {
        let position = &matches.at_byte[&at];
        let substitutions: Vec<(usize, u8)> = position
            .substitutions
            .iter()
            .filter(|(other, _)| usable(other))
            .copied()
            .collect();
        let deletions: Vec<usize> = position
            .deletions
            .iter()
            .copied()
            .filter(|other| usable(other))
            .collect();

        let count = substitutions.len() + deletions.len();
        if count == 0 || best.as_ref().map_or(false, |(n, _)| *n >= count) {
            continue;
        }

        let mut alternatives: Vec<u8> = substitutions.iter().map(|(_, byte)| *byte).collect();
        alternatives.push(base_filter[at]);
        let rendered = render_alternatives(&mut alternatives, !deletions.is_empty());

        let mut url_filter = String::with_capacity(base_filter.len() + rendered.len());
        url_filter.push_str(&rules[base].trigger.url_filter[..at]);
        url_filter.push_str(&rendered);
        url_filter.push_str(&rules[base].trigger.url_filter[at + 1..]);

        let participants = substitutions
            .iter()
            .map(|(other, _)| *other)
            .chain(deletions)
            .collect();
        best = Some((
            count,
            Fusion {
                url_filter,
                participants,
            },
        ));
    }

    let mut gap_positions: Vec<usize> = matches.at_gap.keys().copied().collect();
    gap_positions.sort_unstable();
    for at in gap_positions {
        let position = &matches.at_gap[&at];
        let insertions: Vec<(usize, u8)> = position
            .insertions
            .iter()
            .filter(|(other, _)| usable(other))
            .copied()
            .collect();

        let count = insertions.len();
        if count == 0 || best.as_ref().map_or(false, |(n, _)| *n >= count) {
            continue;
        }

        let mut alternatives: Vec<u8> = insertions.iter().map(|(_, byte)| *byte).collect();
        let rendered = render_alternatives(&mut alternatives, true);

        let mut url_filter = String::with_capacity(base_filter.len() + rendered.len());
        url_filter.push_str(&rules[base].trigger.url_filter[..at]);
        url_filter.push_str(&rendered);
        url_filter.push_str(&rules[base].trigger.url_filter[at..]);

        best = Some((
            count,
            Fusion {
                url_filter,
                participants: insertions.iter().map(|(other, _)| *other).collect(),
            },
        ));
    }

    if let Some((_, fusion)) = best {
        return Some(fusion);
    }

    // No single-byte merger left; try the one recorded range edit.
    if let Some((other, edit)) = &matches.multi {
        if usable(other) {
            let filter = &rules[base].trigger.url_filter;
            let url_filter = match edit {
                Edit::InsertRange { index, bytes } => format!(
                    "{}({})?{}",
                    &filter[..*index],
                    std::str::from_utf8(bytes).expect("ascii span"),
                    &filter[*index..]
                ),
                Edit::DeleteRange { index, len } => format!(
                    "{}({})?{}",
                    &filter[..*index],
                    &filter[*index..*index + *len],
                    &filter[*index + *len..]
                ),
                _ => unreachable!("multi slot only holds range edits"),
            };
            return Some(Fusion {
                url_filter,
                participants: vec![*other],
            });
        }
    }

    None
}

/// Renders a byte alternation: one byte becomes the bare character, more
/// become a bracket class with `-` hoisted to the front so it cannot form a
/// range. A trailing `?` marks the whole alternation optional.
fn render_alternatives(alternatives: &mut Vec<u8>, optional: bool) -> String {
    alternatives.sort_unstable();
    alternatives.dedup();

    let mut rendered = String::with_capacity(alternatives.len() + 3);
    if alternatives.len() == 1 {
        rendered.push(alternatives[0] as char);
    } else {
        rendered.push('[');
        if let Some(hyphen) = alternatives.iter().position(|b| *b == b'-') {
            alternatives.remove(hyphen);
            rendered.push('-');
        }
        for byte in alternatives.iter() {
            rendered.push(*byte as char);
        }
        rendered.push(']');
    }
    if optional {
        rendered.push('?');
    }
    rendered
}

/// Pass 3: rules identical up to one array-valued trigger field collapse
/// into the group's first rule, which takes the union of the values.
fn merge_array_field(
    rules: &mut [CbRule],
    group: &[usize],
    dropped: &mut [bool],
    field: MergeableField,
) {
    let first = group[0];

    match field {
        MergeableField::ResourceType => {
            let mut union: Vec<_> = group
                .iter()
                .flat_map(|&index| {
                    rules[index]
                        .trigger
                        .resource_type
                        .clone()
                        .unwrap_or_default()
                })
                .collect();
            union.sort_unstable();
            union.dedup();
            rules[first].trigger.resource_type = Some(union);
        }
        MergeableField::IfDomain => {
            let mut union: Vec<_> = group
                .iter()
                .flat_map(|&index| rules[index].trigger.if_domain.clone().unwrap_or_default())
                .collect();
            union.sort_unstable();
            union.dedup();
            rules[first].trigger.if_domain = Some(union);
        }
        MergeableField::UrlFilter => unreachable!("url-filter is not an array field"),
    }

    for &index in &group[1..] {
        dropped[index] = true;
    }
}

#[cfg(test)]
#[path = "../tests/unit/optimizer.rs"]
mod unit_tests;
