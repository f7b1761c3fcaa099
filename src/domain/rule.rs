//! Match rules and the validated rule set installed on the stream.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// Rule length limit of the filtered stream API (essential access).
pub const MAX_RULE_LENGTH: usize = 512;

/// A query expression plus the tag echoed back on matching tweets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchRule {
    /// Query expression, e.g. `paris lang:fr`.
    pub value: String,
    /// Free-form label copied onto every record the rule matches.
    pub tag: String,
}

impl MatchRule {
    pub fn new(value: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            tag: tag.into(),
        }
    }
}

/// Non-empty, ordered, validated collection of match rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<MatchRule>,
}

impl RuleSet {
    /// Validate `rules` against the remote API's limits.
    ///
    /// # Errors
    /// `AdapterError::Configuration` if the set is empty, a value is
    /// blank or longer than `max_length` characters, or two rules share
    /// the same value.
    pub fn new(rules: Vec<MatchRule>, max_length: usize) -> Result<Self, AdapterError> {
        if rules.is_empty() {
            return Err(AdapterError::Configuration(
                "at least one match rule is required".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(rules.len());
        for (i, rule) in rules.iter().enumerate() {
            let len = rule.value.chars().count();
            if rule.value.trim().is_empty() {
                return Err(AdapterError::Configuration(format!(
                    "rule {i} ({}) has an empty value",
                    rule.tag
                )));
            }
            if len > max_length {
                return Err(AdapterError::Configuration(format!(
                    "rule {i} ({}) is {len} characters, limit is {max_length}",
                    rule.tag
                )));
            }
            if !seen.insert(rule.value.as_str()) {
                return Err(AdapterError::Configuration(format!(
                    "rule {i} duplicates value {:?}",
                    rule.value
                )));
            }
        }

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Always false: construction rejects empty sets.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn as_slice(&self) -> &[MatchRule] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchRule> {
        self.rules.iter()
    }

    /// Tag of the rule whose query is exactly `value`.
    pub fn tag_for_value(&self, value: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.value == value)
            .map(|r| r.tag.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paris_rules() -> Vec<MatchRule> {
        vec![
            MatchRule::new("paris lang:fr", "Paris fr"),
            MatchRule::new("paris lang:en", "Paris en"),
        ]
    }

    #[test]
    fn test_valid_rule_set_keeps_order() {
        let set = RuleSet::new(paris_rules(), MAX_RULE_LENGTH).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice()[0].tag, "Paris fr");
        assert_eq!(set.tag_for_value("paris lang:en"), Some("Paris en"));
    }

    #[test]
    fn test_empty_rule_set_rejected() {
        let err = RuleSet::new(vec![], MAX_RULE_LENGTH).unwrap_err();
        assert!(matches!(err, AdapterError::Configuration(_)));
    }

    #[test]
    fn test_overlong_rule_rejected() {
        let rules = vec![MatchRule::new("a".repeat(MAX_RULE_LENGTH + 1), "long")];
        let err = RuleSet::new(rules, MAX_RULE_LENGTH).unwrap_err();
        assert!(matches!(err, AdapterError::Configuration(_)));
    }

    #[test]
    fn test_rule_at_limit_accepted() {
        let rules = vec![MatchRule::new("é".repeat(MAX_RULE_LENGTH), "accented")];
        assert!(RuleSet::new(rules, MAX_RULE_LENGTH).is_ok());
    }

    #[test]
    fn test_blank_and_duplicate_rules_rejected() {
        let blank = vec![MatchRule::new("   ", "blank")];
        assert!(RuleSet::new(blank, MAX_RULE_LENGTH).is_err());

        let dup = vec![MatchRule::new("rust", "a"), MatchRule::new("rust", "b")];
        assert!(RuleSet::new(dup, MAX_RULE_LENGTH).is_err());
    }
}
