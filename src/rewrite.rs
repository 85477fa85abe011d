//! First rewrite stage: ordered regex rule application.

use crate::context::RewriteContext;
use crate::rules::RuleSet;

/// Result of one regex pass over a file's text.
///
/// Carries explicit per-rule success signaling so the orchestrator can
/// decide whether the structural fallback is still needed, instead of
/// re-deriving that from the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewritePass {
    /// Text after all rules were applied in order.
    pub text: String,
    /// Ids of rules that matched at least once.
    pub matched: Vec<&'static str>,
    /// Ids of rules that did not match but carry a block fallback
    /// signature; candidates for the structural scanner.
    pub unresolved: Vec<&'static str>,
}

/// Applies the ordered rule set to file text in a single pass per rule.
///
/// Later rules see the effect of earlier ones. A non-matching rule is a
/// silent no-op; absence of one obsolete pattern does not block correction
/// of others. The input is never mutated.
pub struct RegexRewriter<'r> {
    rules: &'r RuleSet,
}

impl<'r> RegexRewriter<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    pub fn apply(&self, input: &str, ctx: &RewriteContext) -> RewritePass {
        let mut text = input.to_string();
        let mut matched = Vec::new();
        let mut unresolved = Vec::new();

        for rule in self.rules.iter() {
            if rule.is_match(&text) {
                text = rule.apply(&text, ctx).into_owned();
                matched.push(rule.id);
            } else if rule.block_signature().is_some() {
                unresolved.push(rule.id);
            }
        }

        RewritePass {
            text,
            matched,
            unresolved,
        }
    }
}
