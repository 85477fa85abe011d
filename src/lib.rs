//! Pagefix: idempotent repair of agent pages that still use the obsolete
//! simulated-response helper.
//!
//! # Architecture
//!
//! The rewrite engine is a two-stage pipeline. Stage one runs an ordered
//! list of declarative regex rules ([`rules::RuleSet`]) over the file text;
//! stage two is a structural fallback ([`scanner`]) that locates a
//! multi-line definition by line/brace-depth tracking when a rule's pattern
//! cannot express it. A byte-for-byte change detector gates every
//! write-back, so running the tool twice is always safe: the second run
//! reports every previously-fixed page as already clean.
//!
//! No attempt is made to parse the target language; the tool operates on
//! raw text with line and brace-depth heuristics only.
//!
//! # Example
//!
//! ```
//! use pagefix::context::RewriteContext;
//! use pagefix::pipeline::{transform_text, Transformed};
//! use pagefix::rules::RuleSet;
//!
//! let rules = RuleSet::builtin();
//! let ctx = RewriteContext::new("voice", "Voice", "Say something!");
//! let page = "const reply = simulateAgentResponse(message)\n";
//!
//! match transform_text(&rules, page, &ctx) {
//!     Transformed::Fixed(text) => assert!(text.contains("requestAgentReply")),
//!     other => panic!("expected Fixed, got {other:?}"),
//! }
//! ```

pub mod config;
pub mod context;
pub mod pipeline;
pub mod rewrite;
pub mod rules;
pub mod scanner;
pub mod strip;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, Roster, TargetEntry};
pub use context::RewriteContext;
pub use pipeline::{
    detect_change, transform_text, Change, Orchestrator, Outcome, OutcomeTally, Transformed,
};
pub use rewrite::{RegexRewriter, RewritePass};
pub use rules::{PatternRule, RuleSet, OBSOLETE_MARKER};
pub use scanner::{find_block, replace_block, BlockSpan, ScanResult};
pub use strip::{strip_annotations, strip_file, StripError, StripOutcome};
