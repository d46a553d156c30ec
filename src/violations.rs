// src/violations.rs

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;

/// Session-scoped record of fined plates. Deduplicates by exact string and
/// preserves first-seen order; entries are never removed within a session.
pub struct ViolationAggregator {
    pattern: Regex,
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl ViolationAggregator {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .with_context(|| format!("invalid plate pattern `{}`", pattern))?;
        Ok(Self {
            pattern,
            seen: HashSet::new(),
            ordered: Vec::new(),
        })
    }

    /// Record `text` iff it is non-empty, matches the plate format, and has
    /// not been recorded this session. Returns whether a new entry was
    /// appended; a duplicate is a no-op, not an error.
    pub fn try_record(&mut self, text: &str) -> bool {
        if text.is_empty() || !self.pattern.is_match(text) || self.seen.contains(text) {
            return false;
        }
        self.seen.insert(text.to_string());
        self.ordered.push(text.to_string());
        true
    }

    /// All recorded violations in first-seen order.
    pub fn snapshot(&self) -> &[String] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Start a fresh session.
    pub fn reset(&mut self) {
        self.seen.clear();
        self.ordered.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator() -> ViolationAggregator {
        ViolationAggregator::new("^[A-Z]{2} [0-9]{3,4}$").unwrap()
    }

    #[test]
    fn test_record_then_duplicate() {
        let mut agg = aggregator();
        assert!(agg.try_record("AB 1234"));
        assert!(!agg.try_record("AB 1234"));
        assert_eq!(agg.snapshot(), &["AB 1234".to_string()]);
    }

    #[test]
    fn test_format_validation() {
        let mut agg = aggregator();
        assert!(agg.try_record("AB 123"));
        assert!(agg.try_record("CD 1234"));
        assert!(!agg.try_record(""));
        assert!(!agg.try_record("ab 123"));
        assert!(!agg.try_record("AB  123"));
        assert!(!agg.try_record("AB 12"));
        assert!(!agg.try_record("AB 12345"));
        assert!(!agg.try_record("AB NN34"));
        assert!(!agg.try_record("A1 234"));
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn test_first_seen_order() {
        let mut agg = aggregator();
        agg.try_record("ZZ 999");
        agg.try_record("AA 111");
        agg.try_record("ZZ 999");
        agg.try_record("MM 555");
        assert_eq!(
            agg.snapshot(),
            &[
                "ZZ 999".to_string(),
                "AA 111".to_string(),
                "MM 555".to_string()
            ]
        );
    }

    #[test]
    fn test_reset_starts_fresh() {
        let mut agg = aggregator();
        agg.try_record("AB 1234");
        agg.reset();
        assert!(agg.is_empty());
        assert!(agg.try_record("AB 1234"));
    }

    #[test]
    fn test_invalid_pattern_is_construction_error() {
        assert!(ViolationAggregator::new("[unclosed").is_err());
    }
}
