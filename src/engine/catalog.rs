// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::Arc;

use crate::engine::rule::Rule;
use crate::engine::rule_set::RuleSet;
use crate::traits::Executor;

/// The parsed rule graph of one configuration revision.
///
/// Immutable once built; executions share it through an `Arc` and look rules up by id.
#[derive(Default)]
pub struct Catalog {
    revision: u64,
    rules: Vec<Arc<Rule>>,
    rule_sets: Vec<Arc<RuleSet>>,
}

impl Catalog {
    pub fn new(revision: u64, rules: Vec<Arc<Rule>>, rule_sets: Vec<Arc<RuleSet>>) -> Self {
        Self {
            revision,
            rules,
            rule_sets,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    pub fn rule_sets(&self) -> &[Arc<RuleSet>] {
        &self.rule_sets
    }

    pub fn rule(&self, id: &str) -> Option<&Arc<Rule>> {
        self.rules.iter().find(|rule| rule.id() == id)
    }

    pub fn rule_set(&self, id: &str) -> Option<&Arc<RuleSet>> {
        self.rule_sets.iter().find(|rule_set| rule_set.id() == id)
    }

    /// A copy of this catalog with `rule` added, replacing any rule with the same id.
    ///
    /// Used to validate or preview a candidate rule against the rules already installed.
    pub fn with_rule(&self, rule: Arc<Rule>) -> Self {
        let mut rules: Vec<Arc<Rule>> = self
            .rules
            .iter()
            .filter(|existing| existing.id() != rule.id())
            .cloned()
            .collect();
        rules.push(rule);
        Self {
            revision: self.revision,
            rules,
            rule_sets: self.rule_sets.clone(),
        }
    }

    /// A copy of this catalog with `rule_set` added, replacing any rule set with the same id.
    pub fn with_rule_set(&self, rule_set: Arc<RuleSet>) -> Self {
        let mut rule_sets: Vec<Arc<RuleSet>> = self
            .rule_sets
            .iter()
            .filter(|existing| existing.id() != rule_set.id())
            .cloned()
            .collect();
        rule_sets.push(rule_set);
        Self {
            revision: self.revision,
            rules: self.rules.clone(),
            rule_sets,
        }
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("revision", &self.revision)
            .field("rules", &self.rules.iter().map(|r| r.id()).collect::<Vec<_>>())
            .field(
                "rule_sets",
                &self.rule_sets.iter().map(|r| r.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
