//! End-to-end tests for the batch repair pipeline against a real
//! directory tree: outcomes, isolation, idempotency, write-back behavior.

use pagefix::config::load_from_str;
use pagefix::context::RewriteContext;
use pagefix::pipeline::{transform_text, Orchestrator, Outcome, OutcomeTally, Transformed};
use pagefix::rules::{RuleSet, OBSOLETE_MARKER};
use proptest::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ROSTER: &str = r#"
[meta]
name = "agent page repair"
pages_root = "frontend/app/agents"

[[targets]]
id = "bishop-burger"
display_name = "Bishop Burger"
greeting = "Welcome to the diagonal kitchen!"

[[targets]]
id = "voice"
display_name = "Voice Agent"
greeting = "Say something and I'll listen."

[[targets]]
id = "retired-agent"
"#;

fn obsolete_page_with_import() -> &'static str {
    "\
'use client'

import Link from 'next/link'
import { simulateAgentResponse } from '../../../utils/simulatedResponses'

const reply = simulateAgentResponse(message)

export default function Page() {
  return <div>{reply}</div>
}
"
}

fn obsolete_page_with_local_def() -> &'static str {
    "\
'use client'

const simulateAgentResponse = (message: string): string => {
  const lower = message.toLowerCase()
  if (lower.includes('menu')) {
    if (lower.includes('special')) {
      return 'Our special today is the Diagonal Deluxe!'
    }
    return 'Here is our menu.'
  }
  return 'How can I help?'
}

const reply = simulateAgentResponse(message)
"
}

fn clean_page() -> &'static str {
    "\
'use client'

import { requestAgentReply } from '../../../utils/agentClient'

const reply = requestAgentReply(message)
"
}

/// Create `<root>/frontend/app/agents/<id>/page.tsx` with `content`.
fn write_page(root: &Path, id: &str, content: &str) {
    let dir = root.join("frontend/app/agents").join(id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("page.tsx"), content).unwrap();
}

fn read_page(root: &Path, id: &str) -> String {
    fs::read_to_string(root.join("frontend/app/agents").join(id).join("page.tsx")).unwrap()
}

#[test]
fn test_batch_outcomes_are_isolated() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_page(root, "bishop-burger", obsolete_page_with_local_def());
    write_page(root, "voice", clean_page());
    // retired-agent's page intentionally does not exist.

    let roster = load_from_str(ROSTER).unwrap();
    let orchestrator = Orchestrator::new(&roster, root);
    let results = orchestrator.fix(&roster.target_ids());

    assert!(matches!(results[0].1, Outcome::Fixed { .. }));
    assert!(matches!(results[1].1, Outcome::AlreadyClean { .. }));
    assert!(matches!(results[2].1, Outcome::NotFound { .. }));

    let tally = OutcomeTally::count(&results);
    assert_eq!(tally.fixed, 1);
    assert_eq!(tally.already_clean, 1);
    assert_eq!(tally.not_found, 1);
    assert!(!tally.has_defects());

    // The missing target did not disturb the valid ones.
    let fixed = read_page(root, "bishop-burger");
    assert!(!fixed.contains(OBSOLETE_MARKER));
    assert!(fixed.contains("fetch('/api/agents/bishop-burger/chat'"));
    assert!(fixed.contains("Welcome to the diagonal kitchen!"));
    assert_eq!(read_page(root, "voice"), clean_page());
}

#[test]
fn test_second_run_reports_already_clean() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_page(root, "bishop-burger", obsolete_page_with_import());

    let roster = load_from_str(ROSTER).unwrap();
    let orchestrator = Orchestrator::new(&roster, root);
    let ids = vec!["bishop-burger".to_string()];

    let first = orchestrator.fix(&ids);
    assert!(matches!(first[0].1, Outcome::Fixed { .. }));
    let after_first = read_page(root, "bishop-burger");

    let second = orchestrator.fix(&ids);
    assert!(matches!(second[0].1, Outcome::AlreadyClean { .. }));
    assert_eq!(read_page(root, "bishop-burger"), after_first);
}

#[test]
fn test_target_missing_from_roster_gets_default_text() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_page(root, "mystery-agent", obsolete_page_with_local_def());

    let roster = load_from_str(ROSTER).unwrap();
    let orchestrator = Orchestrator::new(&roster, root);
    let results = orchestrator.fix(&["mystery-agent".to_string()]);

    assert!(matches!(results[0].1, Outcome::Fixed { .. }));
    let fixed = read_page(root, "mystery-agent");
    assert!(fixed.contains("fetch('/api/agents/mystery-agent/chat'"));
    assert!(fixed.contains("Hello! You're chatting with Mystery Agent."));
}

#[test]
fn test_check_never_writes() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_page(root, "bishop-burger", obsolete_page_with_import());

    let roster = load_from_str(ROSTER).unwrap();
    let orchestrator = Orchestrator::new(&roster, root);
    let results = orchestrator.check(&["bishop-burger".to_string()]);

    assert!(matches!(results[0].1, Outcome::Fixed { .. }));
    assert_eq!(read_page(root, "bishop-burger"), obsolete_page_with_import());
}

#[test]
fn test_no_match_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    // Unterminated definition: marker present, block never closes.
    let broken = "const simulateAgentResponse = (m: string): string => {\n  if (x) {\n";
    write_page(root, "voice", broken);

    let roster = load_from_str(ROSTER).unwrap();
    let orchestrator = Orchestrator::new(&roster, root);
    let results = orchestrator.fix(&["voice".to_string()]);

    assert!(matches!(results[0].1, Outcome::NoMatch { .. }));
    assert_eq!(read_page(root, "voice"), broken);
    assert!(OutcomeTally::count(&results).has_defects());
}

#[test]
fn test_unreadable_page_reports_failed_without_aborting_batch() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_page(root, "bishop-burger", obsolete_page_with_import());
    // Not valid UTF-8: reading this page fails, for this target only.
    let page_dir = root.join("frontend/app/agents/voice");
    fs::create_dir_all(&page_dir).unwrap();
    fs::write(page_dir.join("page.tsx"), [0xC3u8, 0x28, 0xFF]).unwrap();

    let roster = load_from_str(ROSTER).unwrap();
    let orchestrator = Orchestrator::new(&roster, root);
    let results = orchestrator.fix(&["bishop-burger".to_string(), "voice".to_string()]);

    assert!(matches!(results[0].1, Outcome::Fixed { .. }));
    assert!(matches!(results[1].1, Outcome::Failed { .. }));

    let tally = OutcomeTally::count(&results);
    assert_eq!(tally.fixed, 1);
    assert_eq!(tally.failed, 1);
    assert!(tally.has_defects());
}

#[test]
fn test_dollar_in_roster_greeting_survives_repair() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    // One-line definition: repaired by the regex pass, where a bare `$`
    // would be read as a capture-group reference.
    let page = "\
'use client'

const simulateAgentResponse = (message: string): string => canned(message)

const reply = simulateAgentResponse(message)
";
    write_page(root, "diner", page);

    let roster = load_from_str(
        r#"
[[targets]]
id = "diner"
display_name = "Diner"
greeting = "Today's special is $5.99!"
"#,
    )
    .unwrap();
    let orchestrator = Orchestrator::new(&roster, root);
    let results = orchestrator.fix(&["diner".to_string()]);
    assert!(matches!(results[0].1, Outcome::Fixed { .. }));

    let fixed = read_page(root, "diner");
    assert!(!fixed.contains(OBSOLETE_MARKER));
    assert!(
        fixed.contains("payload.reply ?? \"Today's special is $5.99!\""),
        "greeting mangled: {fixed}"
    );
}

/// Synthesize an obsolete page with a configurable definition nesting depth
/// and surrounding filler, then require the transformation to be idempotent
/// and marker-eliminating.
fn synthetic_page(levels: usize, filler: &str, with_import: bool) -> String {
    let mut page = String::from("'use client'\n\n");
    if with_import {
        page.push_str("import { simulateAgentResponse } from '../../utils/simulatedResponses'\n\n");
    } else {
        page.push_str("const simulateAgentResponse = (message: string): string => {\n");
        for i in 0..levels {
            page.push_str(&format!("  if (message.includes('k{i}')) {{\n"));
        }
        page.push_str("    return 'canned'\n");
        for _ in 0..levels {
            page.push_str("  }\n");
        }
        page.push_str("}\n\n");
    }
    page.push_str(filler);
    page.push_str("\nconst reply = simulateAgentResponse(message)\n");
    page
}

proptest! {
    #[test]
    fn prop_transform_is_idempotent(
        levels in 0usize..6,
        with_import in any::<bool>(),
        filler in "[a-z ()=>.\n]{0,80}",
    ) {
        let rules = RuleSet::builtin();
        let ctx = RewriteContext::new("voice", "Voice", "Say something!");
        let page = synthetic_page(levels, &filler, with_import);

        let once = match transform_text(&rules, &page, &ctx) {
            Transformed::Fixed(text) => text,
            other => {
                prop_assert!(false, "expected Fixed on obsolete page, got {:?}", other);
                unreachable!()
            }
        };
        prop_assert!(!once.contains(OBSOLETE_MARKER));
        prop_assert_eq!(transform_text(&rules, &once, &ctx), Transformed::Clean);
    }
}
