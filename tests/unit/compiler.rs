#[cfg(test)]
mod conversion_tests {
    use super::super::*;
    use crate::lists::parse_filter;

    fn convert_with(lines: &[&str], merge: MergePolicy) -> Vec<CbRule> {
        let mut compiler = CbRuleCompiler::new();
        for line in lines {
            compiler.add_filter(parse_filter(line).expect("filter under test must parse"));
        }
        let mut rules = compiler.generate_rules(CompileOptions { merge });
        // The trailing first-party document bypass is covered separately.
        if rules.last() == Some(&ignore_previous_fp_documents()) {
            rules.pop();
        }
        rules
    }

    fn test_convert(lines: &[&str], expected: &str) {
        assert_eq!(
            convert_with(lines, MergePolicy::Off),
            serde_json::from_str::<Vec<CbRule>>(expected)
                .expect("expected rules under test could not be deserialized"),
            "conversion of {:?}",
            lines
        );
    }

    #[test]
    fn generic_element_hiding() {
        test_convert(
            &["##.whatever"],
            r####"[{
            "trigger": {
                "url-filter": "^https?://",
                "url-filter-is-case-sensitive": true
            },
            "action": {
                "type": "css-display-none",
                "selector": ".whatever"
            }
        }]"####,
        );
    }

    #[test]
    fn domain_specific_element_hiding() {
        test_convert(
            &["test.com##.whatever"],
            r####"[{
            "trigger": {
                "url-filter": "^https?://([^/:]*\\.)?test\\.com[/:]",
                "url-filter-is-case-sensitive": true
            },
            "action": {
                "type": "css-display-none",
                "selector": ".whatever"
            }
        }]"####,
        );
    }

    #[test]
    fn id_selectors_use_attribute_form() {
        test_convert(
            &["###example"],
            r####"[{
            "trigger": {
                "url-filter": "^https?://",
                "url-filter-is-case-sensitive": true
            },
            "action": {
                "type": "css-display-none",
                "selector": "[id=example]"
            }
        }]"####,
        );
    }

    #[test]
    fn document_whitelist_becomes_catch_all_bypass() {
        test_convert(
            &["@@||example.com^$document"],
            r####"[{
            "trigger": {
                "url-filter": ".*",
                "if-domain": ["*example.com"]
            },
            "action": {
                "type": "ignore-previous-rules"
            }
        }]"####,
        );
    }

    #[test]
    fn hostname_blocking_keeps_document_with_top_url_exception() {
        test_convert(
            &["||example.com"],
            r####"[{
            "trigger": {
                "url-filter": "^[^:]+:(//)?([^/]+\\.)?example\\.com",
                "url-filter-is-case-sensitive": true,
                "resource-type": ["image", "style-sheet", "script", "font", "media", "raw", "document"],
                "unless-top-url": ["^[^:]+:(//)?([^/]+\\.)?example\\.com"],
                "top-url-filter-is-case-sensitive": true
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn websocket_only_filter() {
        test_convert(
            &["foo$websocket"],
            r####"[{
            "trigger": {
                "url-filter": "^wss?://.*foo",
                "resource-type": ["raw"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn webrtc_filter_covers_both_schemes() {
        test_convert(
            &["foo$webrtc"],
            r####"[{
            "trigger": {
                "url-filter": "^stuns?:.*foo",
                "resource-type": ["raw"]
            },
            "action": {
                "type": "block"
            }
        }, {
            "trigger": {
                "url-filter": "^turns?:.*foo",
                "resource-type": ["raw"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn hostname_anchored_websocket_filter_keeps_one_scheme() {
        test_convert(
            &["||example.com^$websocket"],
            r####"[{
            "trigger": {
                "url-filter": "^wss?://([^/]+\\.)?example\\.com([\\x00-\\x24\\x26-\\x2c\\x2f\\x3a-\\x40\\x5b-\\x5e\\x60\\x7b-\\x7f].*)?$",
                "url-filter-is-case-sensitive": true,
                "resource-type": ["raw"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn literal_scheme_patterns_are_anchored_without_a_second_scheme() {
        test_convert(
            &["ws://push.example.com$websocket"],
            r####"[{
            "trigger": {
                "url-filter": "^ws://push\\.example\\.com",
                "url-filter-is-case-sensitive": true,
                "resource-type": ["raw"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
        test_convert(
            &["https://cdn.example.com/ad$script"],
            r####"[{
            "trigger": {
                "url-filter": "^https://cdn\\.example\\.com/ad",
                "resource-type": ["script"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn websocket_mixed_with_http_types_splits_per_scheme() {
        test_convert(
            &["foo$websocket,image"],
            r####"[{
            "trigger": {
                "url-filter": "^wss?://.*foo",
                "resource-type": ["raw"]
            },
            "action": {
                "type": "block"
            }
        }, {
            "trigger": {
                "url-filter": "^https?://.*foo",
                "resource-type": ["image"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn subdomain_exception_pins_bare_domain_and_www() {
        test_convert(
            &["1$domain=foo.com|~bar.foo.com"],
            r####"[{
            "trigger": {
                "url-filter": "^[^:]+:(//)?.*1",
                "resource-type": ["image", "style-sheet", "script", "font", "media", "raw"],
                "if-domain": ["foo.com", "www.foo.com"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn excluded_www_suppresses_the_www_entry() {
        test_convert(
            &["1$domain=foo.com|~www.foo.com"],
            r####"[{
            "trigger": {
                "url-filter": "^[^:]+:(//)?.*1",
                "resource-type": ["image", "style-sheet", "script", "font", "media", "raw"],
                "if-domain": ["foo.com"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn excluded_domains_become_unless_domain() {
        test_convert(
            &["||dt00.net^$third-party,domain=~marketgid.com|~mgid.com"],
            r####"[{
            "trigger": {
                "url-filter": "^[^:]+:(//)?([^/]+\\.)?dt00\\.net([\\x00-\\x24\\x26-\\x2c\\x2f\\x3a-\\x40\\x5b-\\x5e\\x60\\x7b-\\x7f].*)?$",
                "url-filter-is-case-sensitive": true,
                "resource-type": ["image", "style-sheet", "script", "font", "media", "raw", "document"],
                "load-type": ["third-party"],
                "unless-domain": ["*marketgid.com", "*mgid.com"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn whitelist_with_domains() {
        test_convert(
            &["@@||google.com/recaptcha/$domain=mediafire.com"],
            r####"[{
            "trigger": {
                "url-filter": "^[^:]+:(//)?([^/]+\\.)?google\\.com/recaptcha/",
                "resource-type": ["image", "style-sheet", "script", "font", "media", "raw", "document"],
                "if-domain": ["*mediafire.com"]
            },
            "action": {
                "type": "ignore-previous-rules"
            }
        }]"####,
        );
    }

    #[test]
    fn first_party_whitelist() {
        test_convert(
            &["@@||advertising.autotrader.co.uk^$~third-party"],
            r####"[{
            "trigger": {
                "url-filter": "^[^:]+:(//)?([^/]+\\.)?advertising\\.autotrader\\.co\\.uk([\\x00-\\x24\\x26-\\x2c\\x2f\\x3a-\\x40\\x5b-\\x5e\\x60\\x7b-\\x7f].*)?$",
                "url-filter-is-case-sensitive": true,
                "resource-type": ["image", "style-sheet", "script", "font", "media", "raw", "document"],
                "load-type": ["first-party"]
            },
            "action": {
                "type": "ignore-previous-rules"
            }
        }]"####,
        );
    }

    #[test]
    fn match_case_sets_the_flag_without_lowercasing() {
        test_convert(
            &["FooBar$match-case,script"],
            r####"[{
            "trigger": {
                "url-filter": "^https?://.*FooBar",
                "url-filter-is-case-sensitive": true,
                "resource-type": ["script"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn uppercase_hostname_is_lowercased() {
        test_convert(
            &["||EXAMPLE.com/$image"],
            r####"[{
            "trigger": {
                "url-filter": "^https?://([^/]+\\.)?example\\.com/",
                "url-filter-is-case-sensitive": true,
                "resource-type": ["image"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn genericblock_excludes_domains_from_generic_rules_only() {
        test_convert(
            &[
                "@@||example.com^$genericblock",
                "ad",
                "tracker$domain=a.com",
            ],
            r####"[{
            "trigger": {
                "url-filter": "^[^:]+:(//)?.*ad",
                "resource-type": ["image", "style-sheet", "script", "font", "media", "raw"],
                "unless-domain": ["*example.com"]
            },
            "action": {
                "type": "block"
            }
        }, {
            "trigger": {
                "url-filter": "^[^:]+:(//)?.*tracker",
                "resource-type": ["image", "style-sheet", "script", "font", "media", "raw"],
                "if-domain": ["*a.com"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn elemhide_and_generichide_whitelists_bypass_hiding() {
        test_convert(
            &[
                "##.generic",
                "site.com##.scoped",
                "@@||allowed.com^$elemhide",
                "@@||generless.com^$generichide",
            ],
            r####"[{
            "trigger": {
                "url-filter": "^https?://",
                "url-filter-is-case-sensitive": true,
                "unless-domain": ["*generless.com", "*allowed.com"]
            },
            "action": {
                "type": "css-display-none",
                "selector": ".generic"
            }
        }, {
            "trigger": {
                "url-filter": "^https?://([^/:]*\\.)?site\\.com[/:]",
                "url-filter-is-case-sensitive": true
            },
            "action": {
                "type": "css-display-none",
                "selector": ".scoped"
            }
        }]"####,
        );
    }

    #[test]
    fn elemhide_whitelist_drops_matching_domain_groups() {
        test_convert(
            &[
                "allowed.com##.x",
                "site.com##.y",
                "@@||allowed.com^$elemhide",
                "@@||sub.site.com^$elemhide",
            ],
            r####"[{
            "trigger": {
                "url-filter": "^https?://([^/:]*\\.)?site\\.com[/:]",
                "url-filter-is-case-sensitive": true,
                "unless-domain": ["*sub.site.com"]
            },
            "action": {
                "type": "css-display-none",
                "selector": ".y"
            }
        }]"####,
        );
    }

    #[test]
    fn non_hostname_elemhide_whitelist_becomes_a_rule() {
        test_convert(
            &["##.ad", "@@||allowed.com/path^$elemhide"],
            r####"[{
            "trigger": {
                "url-filter": "^https?://",
                "url-filter-is-case-sensitive": true
            },
            "action": {
                "type": "css-display-none",
                "selector": ".ad"
            }
        }, {
            "trigger": {
                "url-filter": "^https?://([^/]+\\.)?allowed\\.com/path([\\x00-\\x24\\x26-\\x2c\\x2f\\x3a-\\x40\\x5b-\\x5e\\x60\\x7b-\\x7f].*)?$"
            },
            "action": {
                "type": "ignore-previous-rules"
            }
        }]"####,
        );
    }

    #[test]
    fn selector_exceptions_drop_hiding_filters() {
        assert_eq!(convert_with(&["##.ad", "#@#.ad"], MergePolicy::Off), vec![]);
        assert_eq!(
            convert_with(&["example.com##.ad", "other.com#@#.ad"], MergePolicy::Off),
            vec![]
        );
    }

    #[test]
    fn excluded_domains_disqualify_hiding_filters() {
        assert_eq!(
            convert_with(&["~www.example.com##.ad"], MergePolicy::Off),
            vec![]
        );
    }

    #[test]
    fn sitekey_filters_are_dropped() {
        assert_eq!(
            convert_with(&["foo$sitekey=abc", "@@bar$sitekey=abc"], MergePolicy::Off),
            vec![]
        );
    }

    #[test]
    fn document_blocking_without_subdocument_is_degenerate() {
        // DOCUMENT maps to no resource type; nothing can come out.
        assert_eq!(convert_with(&["foo$document"], MergePolicy::Off), vec![]);
    }

    #[test]
    fn unicode_domains_and_patterns_are_encoded() {
        test_convert(
            &["foo$domain=🐈.cat,image"],
            r####"[{
            "trigger": {
                "url-filter": "^https?://.*foo",
                "resource-type": ["image"],
                "if-domain": ["*xn--zn8h.cat"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
        test_convert(
            &["🐈$image"],
            r####"[{
            "trigger": {
                "url-filter": "^https?://.*%F0%9F%90%88",
                "resource-type": ["image"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn merge_fuses_single_substitutions() {
        test_merge(
            &["/ads", "/adv"],
            r####"[{
            "trigger": {
                "url-filter": "^[^:]+:(//)?.*/ad[sv]",
                "resource-type": ["image", "style-sheet", "script", "font", "media", "raw"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn merge_eliminates_prefix_redundancy() {
        test_merge(
            &["/ad", "/ads", "/advertisement"],
            r####"[{
            "trigger": {
                "url-filter": "^[^:]+:(//)?.*/ad",
                "resource-type": ["image", "style-sheet", "script", "font", "media", "raw"]
            },
            "action": {
                "type": "block"
            }
        }]"####,
        );
    }

    #[test]
    fn merge_rejects_metacharacter_deltas() {
        let rules = convert_with(&["/ads?q", "/adsq"], MergePolicy::All);
        assert_eq!(rules.len(), 2);
    }

    fn test_merge(lines: &[&str], expected: &str) {
        assert_eq!(
            convert_with(lines, MergePolicy::All),
            serde_json::from_str::<Vec<CbRule>>(expected)
                .expect("expected rules under test could not be deserialized"),
            "merged conversion of {:?}",
            lines
        );
    }
}

#[cfg(test)]
mod id_selector_tests {
    use super::super::convert_id_selectors_to_attribute_selectors as convert;

    #[test]
    fn rewrites_ids() {
        assert_eq!(convert("#foo"), "[id=foo]");
        assert_eq!(convert("#foo .bar"), "[id=foo] .bar");
        assert_eq!(convert("div#a > #b-c_1"), "div[id=a] > [id=b-c_1]");
        assert_eq!(convert("#a, #b"), "[id=a], [id=b]");
    }

    #[test]
    fn leaves_quoted_text_alone() {
        assert_eq!(convert(r##"a[href="#anchor"]"##), r##"a[href="#anchor"]"##);
        assert_eq!(convert(r##"a[href='#x'] #y"##), r##"a[href='#x'] [id=y]"##);
    }

    #[test]
    fn skips_escaped_characters() {
        assert_eq!(convert(r"\#literal"), r"\#literal");
    }

    #[test]
    fn non_ascii_id_characters_extend_the_run() {
        assert_eq!(convert("#héllo"), "[id=héllo]");
    }

    #[test]
    fn run_may_reach_the_end_of_the_selector() {
        assert_eq!(convert("div > #end"), "div > [id=end]");
    }
}

#[cfg(test)]
mod selector_chunking_tests {
    use super::super::*;

    #[test]
    fn selectors_are_chunked_under_the_limit() {
        let selectors: Vec<String> = (0..SELECTOR_LIMIT + 1).map(|i| format!(".c{}", i)).collect();
        let mut rules = Vec::new();
        add_css_rules(&mut rules, &selectors, None, &[]);

        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules[1].action.selector.as_deref(),
            Some(format!(".c{}", SELECTOR_LIMIT).as_str())
        );
        let first = rules[0].action.selector.as_ref().unwrap();
        assert_eq!(first.matches(", ").count(), SELECTOR_LIMIT - 1);
    }
}
