//! Stub registry
//!
//! Ordered set of stub rules with finite-use budgets. The first matching
//! rule with uses left wins; later rules are never consulted for the same
//! URL even if they would match too.

use crate::pattern::{same_pattern, SharedPattern};
use serde_json::Value;
use std::rc::Rc;

/// Default number of times a rule fires
pub const DEFAULT_USES: u32 = 1;

/// Default URL parameter carrying the callback name
pub const DEFAULT_CALLBACK_KEY: &str = "cbfn";

/// A registered stub
#[derive(Debug, Clone)]
pub struct StubRule {
    /// URL pattern to match
    pub pattern: SharedPattern,
    /// Data delivered to the callback
    pub payload: Value,
    /// Remaining times this rule may fire
    pub remaining_uses: u32,
    /// URL parameter holding the callback name
    pub callback_key: String,
}

impl StubRule {
    /// Create a one-shot rule reading the callback from `cbfn`
    #[must_use]
    pub fn new(pattern: SharedPattern, payload: Value) -> Self {
        Self {
            pattern,
            payload,
            remaining_uses: DEFAULT_USES,
            callback_key: DEFAULT_CALLBACK_KEY.to_string(),
        }
    }

    /// Set how many times this rule should fire
    #[must_use]
    pub const fn uses(mut self, n: u32) -> Self {
        self.remaining_uses = n;
        self
    }

    /// Set the callback parameter name
    #[must_use]
    pub fn callback_key(mut self, key: &str) -> Self {
        self.callback_key = key.to_string();
        self
    }

    /// Check if this rule applies to `url` and has uses left
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.remaining_uses > 0 && self.pattern.matches(url)
    }

    /// Check if rule is exhausted
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining_uses == 0
    }
}

/// What a dispatch took from the registry
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumedRule {
    /// Payload to deliver
    pub payload: Value,
    /// Callback parameter to look up
    pub callback_key: String,
    /// Uses left after this one
    pub remaining_uses: u32,
}

/// Ordered collection of stub rules keyed by pattern identity
#[derive(Debug, Default)]
pub struct StubRegistry {
    rules: Vec<StubRule>,
}

impl StubRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule, replacing any rule keyed by the same pattern object
    ///
    /// A replaced rule keeps its position in iteration order.
    pub fn register(&mut self, rule: StubRule) {
        match self
            .rules
            .iter_mut()
            .find(|existing| same_pattern(&existing.pattern, &rule.pattern))
        {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    /// Remove the rule keyed by `pattern`
    pub fn unregister<P: ?Sized>(&mut self, pattern: &Rc<P>) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| !same_pattern(&rule.pattern, pattern));
        self.rules.len() != before
    }

    /// Remove every rule
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Find the first live rule matching `url` and spend one use
    ///
    /// Matching and decrementing happen in one step so a one-shot rule can
    /// never be consumed twice.
    pub fn consume(&mut self, url: &str) -> Option<ConsumedRule> {
        self.rules
            .iter_mut()
            .find(|rule| rule.matches(url))
            .map(Self::spend)
    }

    /// Patterns of rules with uses left, in priority order
    ///
    /// Lets callers evaluate patterns without holding a borrow of the
    /// registry, then spend the winner with [`Self::consume_pattern`].
    #[must_use]
    pub fn live_patterns(&self) -> Vec<SharedPattern> {
        self.rules
            .iter()
            .filter(|rule| !rule.is_exhausted())
            .map(|rule| Rc::clone(&rule.pattern))
            .collect()
    }

    /// Spend one use of the rule keyed by `pattern`, if it has any left
    pub fn consume_pattern<P: ?Sized>(&mut self, pattern: &Rc<P>) -> Option<ConsumedRule> {
        self.rules
            .iter_mut()
            .find(|rule| !rule.is_exhausted() && same_pattern(&rule.pattern, pattern))
            .map(Self::spend)
    }

    fn spend(rule: &mut StubRule) -> ConsumedRule {
        rule.remaining_uses -= 1;
        ConsumedRule {
            payload: rule.payload.clone(),
            callback_key: rule.callback_key.clone(),
            remaining_uses: rule.remaining_uses,
        }
    }

    /// Remaining uses of the rule keyed by `pattern`
    #[must_use]
    pub fn remaining_uses<P: ?Sized>(&self, pattern: &Rc<P>) -> Option<u32> {
        self.rules
            .iter()
            .find(|rule| same_pattern(&rule.pattern, pattern))
            .map(|rule| rule.remaining_uses)
    }

    /// Iterate rules in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &StubRule> {
        self.rules.iter()
    }

    /// Get rule count
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if there are no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check if no rule can fire again
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.rules.iter().all(StubRule::is_exhausted)
    }
}
