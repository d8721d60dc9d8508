#[cfg(test)]
mod close_match_tests {
    use super::super::*;

    #[test]
    fn substitution() {
        assert_eq!(
            close_match("/ads", "/adv", false),
            Some(Edit::Substitute { index: 3, byte: b'v' })
        );
    }

    #[test]
    fn single_insert_and_delete() {
        assert_eq!(
            close_match("/ads", "/advs", false),
            Some(Edit::Insert { index: 3, byte: b'v' })
        );
        assert_eq!(
            close_match("/adts", "/ads", false),
            Some(Edit::Delete { index: 3 })
        );
    }

    #[test]
    fn range_edits() {
        assert_eq!(
            close_match("/ads", "/adxis", false),
            Some(Edit::InsertRange {
                index: 3,
                bytes: b"xi".to_vec()
            })
        );
        assert_eq!(
            close_match("/adxsi", "/ai", false),
            Some(Edit::DeleteRange { index: 2, len: 3 })
        );
    }

    #[test]
    fn range_edits_respect_the_single_byte_restriction() {
        assert_eq!(close_match("/ads", "/adxis", true), None);
        assert_eq!(close_match("/adxsi", "/ai", true), None);
        assert_eq!(
            close_match("/ads", "/adv", true),
            Some(Edit::Substitute { index: 3, byte: b'v' })
        );
    }

    #[test]
    fn more_than_one_edit_is_no_match() {
        assert_eq!(close_match("/abc", "/xbz", false), None);
        assert_eq!(close_match("/abcd", "/dcba", false), None);
        // A range substitution is two edits, not one.
        assert_eq!(close_match("/adxy", "/adzw", false), None);
    }

    #[test]
    fn equal_strings_are_no_match() {
        assert_eq!(close_match("/ads", "/ads", false), None);
    }

    #[test]
    fn metacharacters_in_the_delta_refuse_the_match() {
        assert_eq!(close_match("/ads\\?q", "/adsq", false), None);
        assert_eq!(close_match("/ad.s", "/ados", false), None);
        assert_eq!(close_match("/ads", "/ad$s", false), None);
        // Metacharacters in the common part are fine.
        assert_eq!(
            close_match("/a\\.ds", "/a\\.dv", false),
            Some(Edit::Substitute { index: 5, byte: b'v' })
        );
    }
}

#[cfg(test)]
mod merge_tests {
    use super::super::*;
    use crate::rules::{CbActionType, CbTrigger, LoadType, ResourceType};
    use crate::scheduler::Pacer;

    fn block_rule(url_filter: &str) -> CbRule {
        CbRule::new(
            CbTrigger {
                url_filter: url_filter.to_string(),
                ..Default::default()
            },
            CbActionType::Block,
        )
    }

    fn merged(url_filters: &[&str]) -> Vec<String> {
        let rules = url_filters.iter().map(|f| block_rule(f)).collect();
        merge_rules(rules, true, &mut Pacer::new())
            .into_iter()
            .map(|rule| rule.trigger.url_filter)
            .collect()
    }

    #[test]
    fn substitutions_become_alternations() {
        assert_eq!(merged(&["/ads", "/adv"]), vec!["/ad[sv]"]);
    }

    #[test]
    fn insertions_become_optional_characters() {
        assert_eq!(merged(&["/ads", "/advs"]), vec!["/adv?s"]);
    }

    #[test]
    fn deletions_make_the_alternation_optional() {
        assert_eq!(merged(&["/adts", "/advs", "/ads"]), vec!["/ad[tv]?s"]);
    }

    #[test]
    fn range_edits_become_optional_groups() {
        assert_eq!(merged(&["/ads", "/adxis"]), vec!["/ad(xi)?s"]);
        assert_eq!(merged(&["/adxsi", "/ai"]), vec!["/a(dxs)?i"]);
    }

    #[test]
    fn hyphen_is_hoisted_in_alternations() {
        assert_eq!(merged(&["/ads", "/ad-"]), vec!["/ad[-s]"]);
    }

    #[test]
    fn wider_alternations_win() {
        // Two wide rules beat three narrow ones.
        assert_eq!(
            merged(&["adsi", "advi", "adxi", "bdsi", "bdvi", "bdxi"]),
            vec!["ad[svx]i", "bd[svx]i"]
        );
    }

    #[test]
    fn prefix_redundancy_is_eliminated_first() {
        assert_eq!(merged(&["/ad", "/ads", "/advertisement"]), vec!["/ad"]);
    }

    #[test]
    fn rules_participate_in_at_most_one_merger() {
        // Same-position matches land in one wide alternation.
        assert_eq!(merged(&["/ads", "/adv", "/adx"]), vec!["/ad[svx]"]);

        // /bds can only merge at a different position; once one merger has
        // consumed the base, the leftover rule stays as it is.
        assert_eq!(merged(&["/ads", "/adv", "/bds"]).len(), 2);
    }

    #[test]
    fn different_triggers_never_merge() {
        let mut first = block_rule("/ads");
        first.trigger.load_type = Some(vec![LoadType::ThirdParty]);
        let second = block_rule("/adv");

        let rules = merge_rules(vec![first, second], true, &mut Pacer::new());
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn different_actions_never_merge() {
        let first = block_rule("/ads");
        let second = CbRule::new(
            CbTrigger {
                url_filter: "/adv".to_string(),
                ..Default::default()
            },
            CbActionType::IgnorePreviousRules,
        );

        let rules = merge_rules(vec![first, second], true, &mut Pacer::new());
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn resource_types_union() {
        let mut first = block_rule("/ads");
        first.trigger.resource_type = Some(vec![ResourceType::Image]);
        let mut second = block_rule("/ads2");
        second.trigger.resource_type = Some(vec![ResourceType::Script]);
        // Same url-filter is required for the resource-type pass to group
        // them; give them one.
        second.trigger.url_filter = "/ads".to_string();

        let rules = merge_rules(vec![first, second], true, &mut Pacer::new());
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].trigger.resource_type,
            Some(vec![ResourceType::Image, ResourceType::Script])
        );
    }

    #[test]
    fn if_domains_union() {
        let mut first = block_rule("/ads");
        first.trigger.if_domain = Some(vec!["*b.com".to_string()]);
        let mut second = block_rule("/ads");
        second.trigger.if_domain = Some(vec!["*a.com".to_string(), "*b.com".to_string()]);

        let rules = merge_rules(vec![first, second], true, &mut Pacer::new());
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].trigger.if_domain,
            Some(vec!["*a.com".to_string(), "*b.com".to_string()])
        );
    }

    #[test]
    fn rules_without_the_field_stay_out_of_array_merges() {
        let first = block_rule("/ads");
        let mut second = block_rule("/ads");
        second.trigger.resource_type = Some(vec![ResourceType::Image]);

        // url-filter equality would let pass 1 drop the duplicate, so make
        // the rules differ there.
        let mut rules = vec![first, second];
        rules[0].trigger.url_filter = "/other".to_string();

        let rules = merge_rules(rules, true, &mut Pacer::new());
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].trigger.resource_type, None);
    }

    #[test]
    fn merging_is_idempotent() {
        let once = merged(&["/adts", "/advs", "/ads", "/ad-", "/xyz"]);
        let rules = once.iter().map(|f| block_rule(f)).collect();
        let twice: Vec<String> = merge_rules(rules, true, &mut Pacer::new())
            .into_iter()
            .map(|rule| rule.trigger.url_filter)
            .collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn heuristic_window_limits_candidates() {
        // Doubling every digit keeps any two fillers more than one edit
        // apart, so none of them merge with anything.
        fn filler(i: usize) -> String {
            let mut filter = "/".to_string();
            for digit in format!("{:04}", i).chars() {
                filter.push(digit);
                filter.push(digit);
            }
            filter
        }

        // 1001 unrelated rules between two mergeable ones push the partner
        // out of the heuristic window.
        let mut filters = vec!["/ads".to_string()];
        for i in 0..HEURISTIC_RANGE + 1 {
            filters.push(filler(i));
        }
        filters.push("/adv".to_string());

        let rules: Vec<CbRule> = filters.iter().map(|f| block_rule(f)).collect();

        let heuristic = merge_rules(rules.clone(), false, &mut Pacer::new());
        assert_eq!(heuristic.len(), filters.len());

        let exhaustive = merge_rules(rules, true, &mut Pacer::new());
        assert_eq!(exhaustive.len(), filters.len() - 1);
    }
}
