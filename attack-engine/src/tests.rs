//! Property-based tests for attack payload construction

#[cfg(test)]
mod tests {
    use crate::generator::AttackGenerator;
    use crate::payload::*;
    use mock_common::{OutboundRule, RequestSignature, Rule};
    use proptest::prelude::*;

    prop_compose! {
        fn arb_query()
            (names in prop::collection::vec("[a-z]{1,8}", 1..6),
             values in prop::collection::vec("[a-zA-Z0-9]{0,8}", 6))
        -> (Vec<String>, String) {
            let query = names
                .iter()
                .zip(values.iter())
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("&");
            (names, query)
        }
    }

    prop_compose! {
        fn arb_ipv4()
            (octets in prop::array::uniform4(0u8..=255))
        -> String {
            format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
        }
    }

    proptest! {
        #[test]
        fn query_xss_keeps_base_and_first_seen_names(
            base in "/[a-z]{1,10}",
            (names, query) in arb_query()
        ) {
            let req = RequestSignature::new("GET", format!("{}?{}", base, query));
            let injected = inject_query_xss(&req).unwrap();

            let (new_base, new_query) = injected.path.split_once('?').unwrap();
            prop_assert_eq!(new_base, base.as_str());
            prop_assert!(!new_query.ends_with('&'));

            let mut expected: Vec<&str> = Vec::new();
            for name in &names {
                if !expected.contains(&name.as_str()) {
                    expected.push(name);
                }
            }
            let rebuilt: Vec<String> = expected
                .iter()
                .map(|name| format!("{}={}", name, XSS_PAYLOAD))
                .collect();
            prop_assert_eq!(new_query, rebuilt.join("&"));
        }

        #[test]
        fn robustness_yields_three_rules_per_distinct_target(
            targets in prop::collection::vec(arb_ipv4(), 0..8)
        ) {
            let rules: Vec<Rule> = targets
                .iter()
                .map(|ip| Rule::Outbound(OutboundRule::once(
                    RequestSignature::new("GET", format!("http://{}/", ip)),
                )))
                .collect();
            let mut distinct = targets.clone();
            distinct.sort();
            distinct.dedup();

            let mut generator = AttackGenerator::new(rules);
            prop_assert_eq!(generator.robustness_attacks(), distinct.len() * 3);
            prop_assert_eq!(generator.request_splitting_attack(), distinct.len());
        }

        #[test]
        fn extracted_addresses_are_distinct(
            targets in prop::collection::vec(arb_ipv4(), 0..10)
        ) {
            let rules: Vec<Rule> = targets
                .iter()
                .map(|ip| Rule::Outbound(OutboundRule::once(RequestSignature::new("POST", ip.clone()))))
                .collect();
            let found = extract_ip_addresses(&rules);
            let mut deduped = found.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(found.len(), deduped.len());
            for ip in &targets {
                prop_assert!(found.contains(ip));
            }
        }
    }
}
