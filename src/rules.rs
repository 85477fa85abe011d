//! Declarative find/replace rules.
//!
//! A [`RuleSet`] is an ordered list of [`PatternRule`]s built once at process
//! start from a static table and immutable for the rest of the run. Each rule
//! pairs a regex matcher with a replacement template; a rule whose target can
//! span multiple lines with nested braces additionally carries a block start
//! signature for the structural fallback scanner.

use crate::context::RewriteContext;
use regex::Regex;
use std::borrow::Cow;

/// The obsolete construct whose presence triggers transformation.
///
/// Agent pages predating the live agent API either imported this helper from
/// the shared `simulatedResponses` module or defined a local copy inline.
pub const OBSOLETE_MARKER: &str = "simulateAgentResponse";

/// Canonical replacement for a local simulated-response definition.
///
/// `{agent_id}` and `{greeting}` are bound per target by [`RewriteContext`];
/// the remaining braces are object literals in the emitted code.
const CANONICAL_RESPONDER: &str = "\
const requestAgentReply = async (message: string): Promise<string> => {
  const response = await fetch('/api/agents/{agent_id}/chat', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ message }),
  })
  if (!response.ok) {
    return \"{greeting}\"
  }
  const payload = await response.json()
  return payload.reply ?? \"{greeting}\"
}";

/// A single declarative find/replace rule.
pub struct PatternRule {
    pub id: &'static str,
    matcher: Regex,
    template: &'static str,
    /// Replace only the first match instead of every match.
    pub applies_once: bool,
    /// Start-signature line for the structural fallback. When set and the
    /// matcher finds nothing, the block scanner locates the full construct
    /// by brace depth and replaces the span with the rendered template.
    block_signature: Option<Regex>,
}

impl PatternRule {
    fn new(
        id: &'static str,
        pattern: &str,
        template: &'static str,
        applies_once: bool,
        block_signature: Option<&str>,
    ) -> Self {
        Self {
            id,
            matcher: Regex::new(pattern).expect("builtin rule pattern must compile"),
            template,
            applies_once,
            block_signature: block_signature
                .map(|sig| Regex::new(sig).expect("builtin block signature must compile")),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }

    pub fn block_signature(&self) -> Option<&Regex> {
        self.block_signature.as_ref()
    }

    /// Render this rule's template with the target's context bound.
    pub fn rendered_template(&self, ctx: &RewriteContext) -> String {
        ctx.render(self.template)
    }

    /// Apply this rule to `text`, substituting numbered captures and context
    /// placeholders into the template. A non-matching rule returns the input
    /// unchanged (borrowed).
    ///
    /// Context values are bound via the dollar-escaping render so roster
    /// text like `$5.99` passes through the regex replacement literally
    /// instead of being read as a capture-group reference.
    pub fn apply<'t>(&self, text: &'t str, ctx: &RewriteContext) -> Cow<'t, str> {
        let template = ctx.render_for_replacement(self.template);
        if self.applies_once {
            self.matcher.replace(text, template.as_str())
        } else {
            self.matcher.replace_all(text, template.as_str())
        }
    }
}

/// Ordered rule list. Application order is significant: later rules see the
/// effect of earlier ones.
pub struct RuleSet {
    rules: Vec<PatternRule>,
}

impl RuleSet {
    /// Rules for the main agent-page repair, in application order.
    pub fn builtin() -> Self {
        let rules = vec![
            // Shared-module import of the obsolete helper.
            PatternRule::new(
                "import-swap",
                r"(?m)^import\s*\{\s*simulateAgentResponse\s*\}\s*from\s*'(.*)/simulatedResponses'$",
                "import { requestAgentReply } from '$1/agentClient'",
                true,
                None,
            ),
            // Call sites: swap the helper name, leave arguments alone.
            // The definition line spells `simulateAgentResponse = (` and is
            // deliberately not matched here.
            PatternRule::new(
                "call-site",
                r"\bsimulateAgentResponse\(",
                "requestAgentReply(",
                false,
                None,
            ),
            // Local definition of the helper. The regex form covers the
            // trivial one-line arrow definition; multi-line bodies with
            // nested braces are beyond a single pattern and fall back to the
            // block scanner keyed on the same signature.
            PatternRule::new(
                "local-def",
                r"(?m)^const simulateAgentResponse = (?:async )?\([^)]*\)(?::\s*[A-Za-z_][\w<>\[\] .]*)? => [^{].*$",
                CANONICAL_RESPONDER,
                true,
                Some(r"^const simulateAgentResponse\s*="),
            ),
        ];
        Self { rules }
    }

    /// Single-line type/annotation stripping for the standalone variant.
    ///
    /// A strict subset of the main pipeline: no context placeholders, no
    /// structural fallback. The matchers are line-local by construction and
    /// deliberately naive about TypeScript's grammar.
    pub fn annotation_stripper() -> Self {
        let rules = vec![
            PatternRule::new("import-type", r"(?m)^import type [^\n]*\n", "", false, None),
            PatternRule::new(
                "return-annotation-arrow",
                r"\)\s*:\s*(?:Promise<[^>]*>|[A-Za-z_][\w.]*(?:\[\])?)\s*=>",
                ") =>",
                false,
                None,
            ),
            PatternRule::new(
                "return-annotation-body",
                r"\)\s*:\s*(?:Promise<[^>]*>|[A-Za-z_][\w.]*(?:\[\])?)\s*\{",
                ") {",
                false,
                None,
            ),
            PatternRule::new(
                "param-annotation",
                r"([(,]\s*[A-Za-z_]\w*\??)\s*:\s*(?:string|number|boolean|any|unknown|[A-Z][\w.]*(?:<[^>]*>)?)(?:\[\])?",
                "$1",
                false,
                None,
            ),
            PatternRule::new(
                "var-annotation",
                r"(?m)^(\s*(?:const|let|var)\s+[A-Za-z_]\w*)\s*:\s*[A-Za-z_][\w.]*(?:<[^>]*>)?(?:\[\])?\s*=",
                "$1 =",
                false,
                None,
            ),
            PatternRule::new(
                "as-cast",
                r"\s+as\s+(?:const|[A-Za-z_][\w.]*(?:<[^>]*>)?(?:\[\])?)",
                "",
                false,
                None,
            ),
        ];
        Self { rules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternRule> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PLACEHOLDERS;

    /// Every `{placeholder}` token in a template must be bound by the
    /// context. Brace pairs with inner whitespace are emitted code, not
    /// placeholders.
    fn assert_placeholders_bound(set: &RuleSet) {
        let token = Regex::new(r"\{([a-z_]+)\}").unwrap();
        for rule in set.iter() {
            for cap in token.captures_iter(rule.template) {
                let name = cap.get(1).unwrap().as_str();
                assert!(
                    PLACEHOLDERS.contains(&name),
                    "rule '{}' template references unbound placeholder '{{{}}}'",
                    rule.id,
                    name
                );
            }
        }
    }

    #[test]
    fn test_builtin_templates_use_only_bound_placeholders() {
        assert_placeholders_bound(&RuleSet::builtin());
    }

    #[test]
    fn test_stripper_templates_carry_no_placeholders() {
        assert_placeholders_bound(&RuleSet::annotation_stripper());
        let token = Regex::new(r"\{[a-z_]+\}").unwrap();
        for rule in RuleSet::annotation_stripper().iter() {
            assert!(!token.is_match(rule.template));
        }
    }

    #[test]
    fn test_import_swap_rewrites_module_path() {
        let set = RuleSet::builtin();
        let rule = set.iter().find(|r| r.id == "import-swap").unwrap();
        let ctx = RewriteContext::empty();
        let input = "import { simulateAgentResponse } from '../../../utils/simulatedResponses'\n";
        let out = rule.apply(input, &ctx);
        assert_eq!(
            out,
            "import { requestAgentReply } from '../../../utils/agentClient'\n"
        );
    }

    #[test]
    fn test_call_site_skips_definition_line() {
        let set = RuleSet::builtin();
        let rule = set.iter().find(|r| r.id == "call-site").unwrap();
        let ctx = RewriteContext::empty();
        let input = "const simulateAgentResponse = (message: string): string => {\n  return simulateAgentResponse(message)\n}\n";
        let out = rule.apply(input, &ctx);
        assert!(out.contains("const simulateAgentResponse = (message"));
        assert!(out.contains("return requestAgentReply(message)"));
    }

    #[test]
    fn test_local_def_rule_matches_one_liner_only() {
        let set = RuleSet::builtin();
        let rule = set.iter().find(|r| r.id == "local-def").unwrap();
        let one_liner = "const simulateAgentResponse = (message: string): string => canned(message)\n";
        let multi_line = "const simulateAgentResponse = (message: string): string => {\n  return 'hi'\n}\n";
        assert!(rule.is_match(one_liner));
        assert!(!rule.is_match(multi_line));
        assert!(rule.block_signature().unwrap().is_match("const simulateAgentResponse = (message: string): string => {"));
    }

    #[test]
    fn test_local_def_replacement_binds_context() {
        let set = RuleSet::builtin();
        let rule = set.iter().find(|r| r.id == "local-def").unwrap();
        let ctx = RewriteContext::new("voice", "Voice", "Say something!");
        let rendered = rule.rendered_template(&ctx);
        assert!(rendered.contains("fetch('/api/agents/voice/chat'"));
        assert!(rendered.contains("payload.reply ?? \"Say something!\""));
        assert!(!rendered.contains("{agent_id}"));
        assert!(!rendered.contains("{greeting}"));
    }

    #[test]
    fn test_dollar_in_greeting_is_spliced_literally() {
        let set = RuleSet::builtin();
        let rule = set.iter().find(|r| r.id == "local-def").unwrap();
        let ctx = RewriteContext::new("diner", "Diner", "Today's special is $5.99!");
        let input = "const simulateAgentResponse = (message: string): string => canned(message)\n";
        let out = rule.apply(input, &ctx);
        assert!(
            out.contains("payload.reply ?? \"Today's special is $5.99!\""),
            "greeting mangled: {out}"
        );
    }

    #[test]
    fn test_non_matching_rule_is_silent_noop() {
        let set = RuleSet::builtin();
        let ctx = RewriteContext::empty();
        let input = "const x = 1\n";
        for rule in set.iter() {
            assert_eq!(rule.apply(input, &ctx), input);
        }
    }
}
