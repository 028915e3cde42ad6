//! Attack campaign generation
//!
//! An [`AttackGenerator`] reads a rule corpus and appends outbound rules for
//! each campaign it is asked to run. Campaigns are not deduplicated: running
//! one twice on the same corpus yields its rules twice.

use crate::error::AttackResult;
use crate::payload::{
    empty_verb_rule, extract_ip_addresses, flood_rule, generate_flood_payload, has_host, inject_body_xss,
    inject_header_xss, inject_query_xss, special_char_rule, splitting_rule, verb_not_exist_rule,
};
use crate::types::{AttackConfig, AttackKind};
use mock_common::{OutboundRule, RequestSignature, Rule};
use std::sync::Arc;
use tracing::{debug, info};

/// Builds attack rules from an existing rule corpus
pub struct AttackGenerator {
    rules: Vec<Rule>,
    attack_rules: Vec<OutboundRule>,
    config: AttackConfig,
    /// Built on first use, then shared read-only by every flood rule
    flood_payload: Option<Arc<str>>,
}

impl AttackGenerator {
    /// Create a generator over a copy of the corpus
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            attack_rules: Vec::new(),
            config: AttackConfig::default(),
            flood_payload: None,
        }
    }

    pub fn with_config(mut self, config: AttackConfig) -> Self {
        self.config = config;
        self
    }

    /// Rules produced so far, in generation order
    pub fn attack_rules(&self) -> &[OutboundRule] {
        &self.attack_rules
    }

    pub fn into_attack_rules(self) -> Vec<OutboundRule> {
        self.attack_rules
    }

    /// Addresses the flood, splitting and robustness campaigns aim at
    pub fn targets(&self) -> Vec<String> {
        extract_ip_addresses(&self.rules)
    }

    /// Run one campaign (or all of them) and return how many rules it added
    pub fn run(&mut self, kind: AttackKind) -> AttackResult<usize> {
        let before = self.attack_rules.len();
        match kind {
            AttackKind::All => {
                self.xss_attacks();
                self.http_flood_attack()?;
                self.robustness_attacks();
                self.request_splitting_attack();
            }
            AttackKind::Xss => {
                self.xss_attacks();
            }
            AttackKind::HttpFlood => {
                self.http_flood_attack()?;
            }
            AttackKind::Robustness => {
                self.robustness_attacks();
            }
            AttackKind::ReqSplitting => {
                self.request_splitting_attack();
            }
        }
        let added = self.attack_rules.len() - before;
        info!(campaign = %kind, added, "Attack campaign generated");
        Ok(added)
    }

    /// Query, header and body XSS passes, in that order
    pub fn xss_attacks(&mut self) -> usize {
        self.xss_attack() + self.xss_headers() + self.xss_body()
    }

    /// Inject the XSS payload into every query parameter
    ///
    /// Rules without a query component or without a host are skipped; the
    /// rest of the corpus is still processed.
    pub fn xss_attack(&mut self) -> usize {
        self.inject_each("query", inject_query_xss)
    }

    /// Inject the XSS payload into every header value
    pub fn xss_headers(&mut self) -> usize {
        self.inject_each("header", inject_header_xss)
    }

    /// Inject the XSS payload as the request body
    pub fn xss_body(&mut self) -> usize {
        self.inject_each("body", inject_body_xss)
    }

    fn inject_each<F>(&mut self, position: &str, inject: F) -> usize
    where
        F: Fn(&RequestSignature) -> AttackResult<RequestSignature>,
    {
        let mut added = 0;
        for rule in &self.rules {
            if !has_host(&rule.request().path) {
                debug!(position, path = %rule.request().path, "Skipping rule without a host");
                continue;
            }
            match inject(rule.request()) {
                Ok(request) => {
                    self.attack_rules.push(OutboundRule::once(request));
                    added += 1;
                }
                Err(e) => debug!(position, "Skipping rule for XSS: {}", e),
            }
        }
        added
    }

    /// One large POST per target, repeated `flood_repeat_count` times
    pub fn http_flood_attack(&mut self) -> AttackResult<usize> {
        let targets = self.targets();
        if targets.is_empty() {
            debug!("No target address found, skipping HTTP flood");
            return Ok(0);
        }

        let payload = self.flood_payload()?;
        for target in &targets {
            self.attack_rules
                .push(flood_rule(target, &payload, self.config.flood_repeat_count));
        }
        Ok(targets.len())
    }

    fn flood_payload(&mut self) -> AttackResult<Arc<str>> {
        if let Some(payload) = &self.flood_payload {
            return Ok(Arc::clone(payload));
        }

        info!(
            size = self.config.flood_payload_size,
            "Generating HTTP flood payload"
        );
        let payload = generate_flood_payload(self.config.flood_payload_size)?;
        self.flood_payload = Some(Arc::clone(&payload));
        Ok(payload)
    }

    pub fn request_splitting_attack(&mut self) -> usize {
        self.per_target(splitting_rule)
    }

    /// Invalid verb, empty verb and special-character campaigns
    pub fn robustness_attacks(&mut self) -> usize {
        self.verb_not_exist() + self.empty_verb() + self.special_char()
    }

    pub fn verb_not_exist(&mut self) -> usize {
        self.per_target(verb_not_exist_rule)
    }

    pub fn empty_verb(&mut self) -> usize {
        self.per_target(empty_verb_rule)
    }

    pub fn special_char(&mut self) -> usize {
        self.per_target(special_char_rule)
    }

    fn per_target<F>(&mut self, build: F) -> usize
    where
        F: Fn(&str) -> OutboundRule,
    {
        let targets = self.targets();
        self.attack_rules
            .extend(targets.iter().map(|target| build(target)));
        targets.len()
    }
}
