//! The content blocker rule format: triggers, actions and the enumerations
//! they use. Serialization mirrors the target engine's JSON dialect, so a
//! rule list can be fed to it without further processing.

use serde::{Deserialize, Serialize};

/// Resource types understood by the target engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Image,
    StyleSheet,
    Script,
    Font,
    Media,
    Popup,
    Raw,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadType {
    FirstParty,
    ThirdParty,
}

/// The condition part of a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CbTrigger {
    /// Regular expression matched against the full request URL.
    #[serde(rename = "url-filter")]
    pub url_filter: String,
    #[serde(
        rename = "url-filter-is-case-sensitive",
        skip_serializing_if = "Option::is_none"
    )]
    pub url_filter_is_case_sensitive: Option<bool>,
    #[serde(rename = "resource-type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<Vec<ResourceType>>,
    #[serde(rename = "load-type", skip_serializing_if = "Option::is_none")]
    pub load_type: Option<Vec<LoadType>>,
    /// Domains the rule is limited to. Mutually exclusive with
    /// `unless_domain`.
    #[serde(rename = "if-domain", skip_serializing_if = "Option::is_none")]
    pub if_domain: Option<Vec<String>>,
    /// Domains the rule does not apply on. Mutually exclusive with
    /// `if_domain`.
    #[serde(rename = "unless-domain", skip_serializing_if = "Option::is_none")]
    pub unless_domain: Option<Vec<String>>,
    /// Top-level URLs the rule does not apply under; used to exempt
    /// top-level navigation from subdocument blocking.
    #[serde(rename = "unless-top-url", skip_serializing_if = "Option::is_none")]
    pub unless_top_url: Option<Vec<String>>,
    #[serde(
        rename = "top-url-filter-is-case-sensitive",
        skip_serializing_if = "Option::is_none"
    )]
    pub top_url_filter_is_case_sensitive: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CbActionType {
    Block,
    IgnorePreviousRules,
    CssDisplayNone,
}

/// The effect part of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CbAction {
    #[serde(rename = "type")]
    pub action_type: CbActionType,
    /// Selector hidden by a `css-display-none` action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// One rule of the generated rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CbRule {
    pub trigger: CbTrigger,
    pub action: CbAction,
}

impl CbRule {
    pub fn new(trigger: CbTrigger, action_type: CbActionType) -> CbRule {
        CbRule {
            trigger,
            action: CbAction {
                action_type,
                selector: None,
            },
        }
    }

    /// True when every trigger field is pure ASCII. URL patterns are
    /// percent-encoded and hostnames punycoded during lowering; a rule
    /// where that failed cannot be loaded by the target engine and is
    /// dropped. Selectors may stay non-ASCII; serialization escapes them.
    pub fn has_ascii_trigger(&self) -> bool {
        let domain_lists = [
            &self.trigger.if_domain,
            &self.trigger.unless_domain,
            &self.trigger.unless_top_url,
        ];

        self.trigger.url_filter.is_ascii()
            && domain_lists.iter().all(|list| {
                list.as_ref()
                    .map_or(true, |entries| entries.iter().all(|entry| entry.is_ascii()))
            })
    }
}

/// Serializes a rule list, escaping any non-ASCII character as `\uXXXX` so
/// the emitted JSON contains no byte above 0x7F.
pub fn to_json(rules: &[CbRule], pretty: bool) -> serde_json::Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(rules)?
    } else {
        serde_json::to_string(rules)?
    };
    Ok(escape_non_ascii(&rendered))
}

/// JSON structure is ASCII, so every non-ASCII character necessarily sits
/// inside a string literal and may be replaced by a `\u` escape wholesale.
fn escape_non_ascii(json: &str) -> String {
    if json.is_ascii() {
        return json.to_string();
    }

    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    escaped
}

/// The rule appended after all blocking rules so that top-level first-party
/// documents are never blocked by over-broad URL patterns.
pub fn ignore_previous_fp_documents() -> CbRule {
    CbRule::new(
        CbTrigger {
            url_filter: ".*".to_string(),
            resource_type: Some(vec![ResourceType::Document]),
            load_type: Some(vec![LoadType::FirstParty]),
            ..Default::default()
        },
        CbActionType::IgnorePreviousRules,
    )
}

#[cfg(test)]
#[path = "../tests/unit/rules.rs"]
mod unit_tests;
