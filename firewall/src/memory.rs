// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! In-memory rule table, for tests.

use crate::{FirewallError, ForwardRule, RuleTable};
use std::sync::{Mutex, PoisonError};

/// A rule table which only records the rules appended to it.
#[derive(Debug, Default)]
pub struct MemoryRuleTable {
    rules: Mutex<Vec<ForwardRule>>,
}

impl MemoryRuleTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The rules of the chain, in order (duplicates included).
    #[must_use]
    pub fn rules(&self) -> Vec<ForwardRule> {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RuleTable for MemoryRuleTable {
    async fn contains(&self, rule: &ForwardRule) -> Result<bool, FirewallError> {
        Ok(self
            .rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(rule))
    }

    async fn append(&self, rule: &ForwardRule) -> Result<(), FirewallError> {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*rule);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::MemoryRuleTable;
    use crate::{ForwardRule, RuleTable};

    #[tokio::test]
    async fn append_unique_never_duplicates() {
        let table = MemoryRuleTable::new();
        let rules = ForwardRule::accept_subnet("10.1.0.0/24".parse().unwrap());
        for _ in 0..3 {
            for rule in &rules {
                table.append_unique(rule).await.unwrap();
            }
        }
        assert_eq!(table.rules(), rules.to_vec());
    }

    #[tokio::test]
    async fn append_unique_reports_insertion() {
        let table = MemoryRuleTable::new();
        let [rule, _] = ForwardRule::accept_subnet("10.1.0.0/24".parse().unwrap());
        assert!(table.append_unique(&rule).await.unwrap());
        assert!(!table.append_unique(&rule).await.unwrap());
        table.append(&rule).await.unwrap();
        assert_eq!(table.rules().len(), 2);
    }
}
